use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Directory that staged uploads are written to. Provisioned once at
/// startup from configuration.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn provision(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        if !root.is_dir() {
            return Err(Error::validation(format!(
                "upload path '{}' is not a directory",
                root.display()
            )));
        }

        tracing::info!(path = %root.display(), "upload directory ready");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` to a fresh file in the directory. The file is removed
    /// when the returned guard is released or dropped.
    pub fn stage(&self, file_name: &str, bytes: &[u8]) -> Result<StagedUpload> {
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.root)?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!(path = %file.path().display(), size = bytes.len(), "upload staged");
        Ok(StagedUpload { file })
    }
}

/// A staged upload on disk. Deleted on drop.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Opens an independent read handle from the start of the file.
    pub fn open(&self) -> Result<File> {
        Ok(self.file.reopen()?)
    }

    /// Deletes the file now, logging instead of failing if that goes wrong.
    pub fn release(self) {
        let path = self.file.path().to_path_buf();
        if let Err(err) = self.file.close() {
            tracing::error!(path = %path.display(), error = %err, "failed to remove staged upload");
        }
    }
}
