use std::path::{Path, PathBuf};

use tempfile::TempPath;

/// The downloaded payload on disk.
///
/// Downloads live in a scratch file that is deleted when this value is
/// dropped, whether the run succeeded or not. Local sources are referenced in
/// place and left alone.
#[derive(Debug)]
pub struct ScratchPayload {
    path: PathBuf,
    len: u64,
    _scratch: Option<TempPath>,
}

impl ScratchPayload {
    pub(crate) fn scratch(temp: TempPath, len: u64) -> Self {
        Self {
            path: temp.to_path_buf(),
            len,
            _scratch: Some(temp),
        }
    }

    pub(crate) fn local(path: PathBuf, len: u64) -> Self {
        Self {
            path,
            len,
            _scratch: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` if the payload is owned by this value and removed on drop.
    pub fn is_scratch(&self) -> bool {
        self._scratch.is_some()
    }
}
