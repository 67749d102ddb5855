use std::path::Path;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use crate::model::SessionParams;
use crate::ssh::{connect_ssh, upload_to_home};

#[cfg(test)]
use std::collections::{HashSet, VecDeque};

pub(crate) trait SshBackend: Send + Sync {
    fn probe(&self, params: &SessionParams) -> Result<()>;
    /// Opens a fresh session for this one file and closes it before returning.
    fn upload_file(
        &self,
        params: &SessionParams,
        local_path: &Path,
        cancel: &AtomicBool,
        on_bytes: &mut dyn FnMut(u64),
    ) -> Result<u64>;
}

#[derive(Debug, Default)]
pub(crate) struct RealSshBackend;

impl SshBackend for RealSshBackend {
    fn probe(&self, params: &SessionParams) -> Result<()> {
        crate::ssh::probe(params)
    }

    fn upload_file(
        &self,
        params: &SessionParams,
        local_path: &Path,
        cancel: &AtomicBool,
        on_bytes: &mut dyn FnMut(u64),
    ) -> Result<u64> {
        let session = connect_ssh(params, None)?;
        let result = upload_to_home(&session, local_path, cancel, on_bytes);
        session.disconnect(None, "upload complete", None).ok();
        result
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct MockSshBackend {
    probe_results: std::sync::Mutex<VecDeque<Option<String>>>,
    probe_calls: std::sync::Mutex<usize>,
    failing_uploads: std::sync::Mutex<HashSet<String>>,
    uploads: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSshBackend {
    pub(crate) fn push_probe(&self, result: Result<()>) {
        self.probe_results
            .lock()
            .unwrap()
            .push_back(result.err().map(|err| err.to_string()));
    }

    pub(crate) fn probe_calls(&self) -> usize {
        *self.probe_calls.lock().unwrap()
    }

    pub(crate) fn fail_upload(&self, name: &str) {
        self.failing_uploads.lock().unwrap().insert(name.to_string());
    }

    pub(crate) fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl SshBackend for MockSshBackend {
    fn probe(&self, _params: &SessionParams) -> Result<()> {
        *self.probe_calls.lock().unwrap() += 1;
        match self.probe_results.lock().unwrap().pop_front().flatten() {
            Some(err) => Err(anyhow::anyhow!(err)),
            None => Ok(()),
        }
    }

    fn upload_file(
        &self,
        _params: &SessionParams,
        local_path: &Path,
        _cancel: &AtomicBool,
        on_bytes: &mut dyn FnMut(u64),
    ) -> Result<u64> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.uploads.lock().unwrap().push(name.clone());
        if self.failing_uploads.lock().unwrap().contains(&name) {
            anyhow::bail!("create remote file {name}: permission denied");
        }
        let size = std::fs::metadata(local_path)?.len();
        on_bytes(size);
        Ok(size)
    }
}
