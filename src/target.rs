use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The single file a run patches: read once, overwritten at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    path: PathBuf,
    content: String,
    permissions: fs::Permissions,
}

#[derive(Error, Debug)]
pub enum TargetError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TargetFile {
    /// Read the whole file into memory.
    ///
    /// A missing file is a read error; nothing is created.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TargetError> {
        let path = path.as_ref().to_path_buf();
        let read_err = |source| TargetError::Read {
            path: path.clone(),
            source,
        };
        let content = fs::read_to_string(&path).map_err(read_err)?;
        let permissions = fs::metadata(&path).map_err(read_err)?.permissions();
        Ok(Self {
            path,
            content,
            permissions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Overwrite the file with `content` atomically, keeping its permissions.
    ///
    /// The file is left untouched if `content` equals what was loaded.
    pub fn persist(self, content: &str) -> Result<bool, TargetError> {
        if content == self.content {
            return Ok(false);
        }
        atomic_write(&self.path, content.as_bytes(), &self.permissions).map_err(|source| {
            TargetError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        Ok(true)
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the original file is left as it was.
fn atomic_write(path: &Path, content: &[u8], permissions: &fs::Permissions) -> std::io::Result<()> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().set_permissions(permissions.clone())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
