use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};

const WAIT_POLL: Duration = Duration::from_millis(20);

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Kill hook a running component lends to the stage controller.
pub(crate) trait Cancel: Send + Sync {
    /// Returns `true` when something was actually signalled.
    fn cancel(&self) -> bool;
}

/// Holds the pid of the one external process a component is running.
/// Empty whenever no process is alive. Once closed, any process registered
/// later is killed on the spot.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProcessSlot {
    inner: Arc<Mutex<SlotState>>,
}

#[derive(Debug, Default)]
struct SlotState {
    pid: Option<u32>,
    closed: bool,
}

impl ProcessSlot {
    /// Returns `false` when the slot was already closed and the process has
    /// been killed instead of tracked.
    pub(crate) fn register(&self, pid: u32) -> bool {
        let mut state = self.lock();
        if state.closed {
            kill_process_tree(pid);
            state.pid = Some(pid);
            return false;
        }
        state.pid = Some(pid);
        true
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> Option<u32> {
        self.lock().pid
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Kills the tracked process, if any. The slot stays open for the next one.
    pub(crate) fn kill(&self) -> bool {
        let state = self.lock();
        match state.pid {
            Some(pid) => {
                kill_process_tree(pid);
                true
            }
            None => false,
        }
    }

    /// Kills the tracked process and refuses any later one.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.lock();
        state.closed = true;
        match state.pid {
            Some(pid) => {
                kill_process_tree(pid);
                true
            }
            None => false,
        }
    }

    /// Polls `child` until it exits. Reaping and clearing the slot happen
    /// under the same lock, so a kill never signals a reaped pid.
    pub(crate) fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        loop {
            {
                let mut state = self.lock();
                match child.try_wait() {
                    Ok(Some(status)) => {
                        state.pid = None;
                        return Ok(status);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        state.pid = None;
                        return Err(err).context("wait for process");
                    }
                }
            }
            std::thread::sleep(WAIT_POLL);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cancel for ProcessSlot {
    fn cancel(&self) -> bool {
        self.close()
    }
}

/// Spawns `command` as the leader of a new process group with both output
/// streams piped.
pub(crate) fn spawn_in_own_group(command: &mut Command) -> Result<Child> {
    command
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {:?}", command.get_program()))
}

fn kill_process_tree(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: getpgid/getpgrp/kill have no memory-safety preconditions; the
    // pid belongs to a child that has not been reaped yet.
    unsafe {
        let pgid = libc::getpgid(pid);
        if pgid > 0 && pgid != libc::getpgrp() {
            tracing::debug!(pid, pgid, "killing process group");
            libc::kill(-pgid, libc::SIGKILL);
        } else {
            tracing::debug!(pid, "killing process");
            libc::kill(pid, libc::SIGKILL);
        }
    }
}

extern "C" fn on_interrupt(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Routes SIGINT, SIGTERM and SIGHUP into a flag the event loop polls.
pub(crate) fn install_interrupt_handlers() {
    let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
    for signal in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP] {
        // SAFETY: the handler only stores into an atomic, which is
        // async-signal-safe.
        unsafe {
            libc::signal(signal, handler);
        }
    }
}

pub(crate) fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}
