//! File-based storage implementation.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{ProfileSearchError, Result};
use crate::storage::traits::{Storage, StorageConfig, StorageError};

/// A file-based storage rooted at a single directory.
///
/// Writes go to a sibling `<name>.tmp` file which is flushed (and fsynced when
/// `sync_writes` is set) before being renamed over the target, so a crash
/// mid-write leaves the previous version intact.
#[derive(Debug)]
pub struct FileStorage {
    /// The root directory for storage.
    directory: PathBuf,
    /// Storage configuration.
    config: StorageConfig,
}

impl FileStorage {
    /// Create a new file storage in the given directory.
    pub fn new<P: AsRef<Path>>(directory: P, config: StorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            std::fs::create_dir_all(&directory).map_err(|e| {
                ProfileSearchError::storage(format!("Failed to create directory: {e}"))
            })?;
        }

        if !directory.is_dir() {
            return Err(ProfileSearchError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(FileStorage { directory, config })
    }

    /// The directory this storage writes into.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(
                StorageError::InvalidOperation(format!("Invalid file name: {name:?}")).into(),
            );
        }
        Ok(self.directory.join(name))
    }
}

impl Storage for FileStorage {
    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.file_path(name)?;
        let mut file = File::open(&path).map_err(|e| StorageError::from_io(name, e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| StorageError::from_io(name, e))?;
        Ok(data)
    }

    fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(name)?;
        let temp_path = self.file_path(&format!("{name}.tmp"))?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| StorageError::from_io(name, e))?;

        let mut writer = BufWriter::with_capacity(self.config.buffer_size, file);
        writer
            .write_all(data)
            .map_err(|e| StorageError::from_io(name, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| StorageError::IoError(format!("{name}: {}", e.error())))?;
        if self.config.sync_writes {
            file.sync_all().map_err(|e| StorageError::from_io(name, e))?;
        }
        drop(file);

        std::fs::rename(&temp_path, &path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            StorageError::IoError(format!("Failed to rename {name}: {e}"))
        })?;

        Ok(())
    }

    fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        let path = self.file_path(name)?;
        let metadata = path.metadata().map_err(|e| StorageError::from_io(name, e))?;
        Ok(metadata.len())
    }
}
