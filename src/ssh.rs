use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use ssh2::Session;

use crate::model::SessionParams;

pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SSH_PORT: u16 = 22;
const COPY_BUFFER_SIZE: usize = 8192;

// Host keys are not checked against known_hosts.
/// Connects and authenticates within `CONNECT_TIMEOUT`. Afterwards socket and
/// session I/O use `io_timeout`; `None` lets transfers block indefinitely.
pub(crate) fn connect_ssh(params: &SessionParams, io_timeout: Option<Duration>) -> Result<Session> {
    let address = format!("{}:{SSH_PORT}", params.host);
    let mut last_err = None;
    let mut tcp = None;
    for addr in address.to_socket_addrs().context("resolve address")? {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                tcp = Some(stream);
                break;
            }
            Err(err) => last_err = Some(err),
        }
    }
    let tcp = tcp.ok_or_else(|| {
        let err = last_err.unwrap_or_else(|| io::Error::other("no address resolved"));
        anyhow::anyhow!("connect tcp failed: {err}")
    })?;
    tcp.set_read_timeout(Some(CONNECT_TIMEOUT)).ok();
    tcp.set_write_timeout(Some(CONNECT_TIMEOUT)).ok();
    let socket = tcp.try_clone().context("clone tcp stream")?;

    let mut session = Session::new().context("create session")?;
    session.set_timeout(session_timeout_ms(Some(CONNECT_TIMEOUT)));
    session.set_tcp_stream(tcp);
    session.handshake().context("ssh handshake")?;
    session
        .userauth_password(&params.user, &params.secret)
        .context("password auth")?;

    if !session.authenticated() {
        anyhow::bail!("Authentication failed");
    }

    socket.set_read_timeout(io_timeout).context("set read timeout")?;
    socket.set_write_timeout(io_timeout).context("set write timeout")?;
    session.set_timeout(session_timeout_ms(io_timeout));
    Ok(session)
}

/// libssh2 reads 0 as "no timeout".
fn session_timeout_ms(timeout: Option<Duration>) -> u32 {
    timeout
        .map(|timeout| u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX).max(1))
        .unwrap_or(0)
}

pub(crate) fn probe(params: &SessionParams) -> Result<()> {
    let session = connect_ssh(params, Some(CONNECT_TIMEOUT)).context("connecting to server")?;
    session.disconnect(None, "probe complete", None).ok();
    Ok(())
}

/// Copies `local_path` into a file of the same base name in the login's
/// default directory. Returns the number of bytes written.
pub(crate) fn upload_to_home(
    session: &Session,
    local_path: &Path,
    cancel: &AtomicBool,
    on_bytes: &mut dyn FnMut(u64),
) -> Result<u64> {
    let name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("missing source filename"))?;
    let sftp = session.sftp().context("start sftp")?;
    let mut local = File::open(local_path)
        .with_context(|| format!("open local file {}", local_path.display()))?;
    let mut remote = sftp
        .open_mode(
            Path::new(&name),
            ssh2::OpenFlags::CREATE | ssh2::OpenFlags::TRUNCATE | ssh2::OpenFlags::WRITE,
            0o644,
            ssh2::OpenType::File,
        )
        .with_context(|| format!("create remote file {name}"))?;
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        if cancel.load(Ordering::SeqCst) {
            anyhow::bail!("transfer cancelled");
        }
        let read = local.read(&mut buffer).context("read local file")?;
        if read == 0 {
            break;
        }
        remote
            .write_all(&buffer[..read])
            .with_context(|| format!("copy file {name}"))?;
        total = total.saturating_add(read as u64);
        on_bytes(read as u64);
    }
    remote.flush().context("flush remote file")?;
    drop(remote);
    drop(sftp);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfers_without_io_timeout_never_time_out() {
        assert_eq!(session_timeout_ms(None), 0);
    }

    #[test]
    fn probe_timeout_is_kept_in_millis() {
        assert_eq!(session_timeout_ms(Some(CONNECT_TIMEOUT)), 5000);
        assert_eq!(session_timeout_ms(Some(Duration::from_micros(10))), 1);
    }
}
