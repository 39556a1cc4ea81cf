use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use uuid::Uuid;

/// Local scratch space where uploads wait for their import worker.
#[derive(Debug, Clone)]
pub struct ScratchStorage {
    dir: PathBuf,
}

impl ScratchStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Durably copy upload bytes into a uniquely named file tied to `job_id`.
    pub async fn stage(&self, job_id: Uuid, bytes: Vec<u8>) -> Result<ScratchFile, StorageError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            let mut file = tempfile::Builder::new()
                .prefix("persons-import-")
                .suffix(&format!("-{}.csv", job_id))
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            file.as_file().sync_all()?;
            Ok::<_, StorageError>(ScratchFile {
                path: file.into_temp_path(),
            })
        })
        .await?
    }
}

/// A staged upload owned by exactly one worker. The file is removed when the
/// handle is deleted or dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now, reporting failures instead of swallowing them.
    pub fn delete(self) -> std::io::Result<()> {
        self.path.close()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to store uploaded file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Staging task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
