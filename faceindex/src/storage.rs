use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::IndexError;

/// Stable storage for persisted per-course index blobs.
///
/// One opaque blob per course, always written and read wholesale.
/// Implementations must be safe for concurrent use.
pub trait IndexStorage: Send + Sync {
    /// Read the blob for a course. Returns `None` if nothing was persisted.
    fn read(&self, course_id: &str) -> Result<Option<Vec<u8>>, IndexError>;

    /// Replace the blob for a course.
    fn write(&self, course_id: &str, blob: &[u8]) -> Result<(), IndexError>;

    /// Remove the blob for a course. No error if it does not exist.
    fn remove(&self, course_id: &str) -> Result<(), IndexError>;
}

/// Directory-backed [`IndexStorage`], one `index_{course}.bin` file per course.
///
/// Writes go to a temporary file that is renamed over the previous blob, so a
/// reader never observes a half-written index.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the blob for a course.
    pub fn path(&self, course_id: &str) -> PathBuf {
        self.dir.join(format!("index_{course_id}.bin"))
    }

    fn tmp_path(&self, course_id: &str) -> PathBuf {
        self.dir.join(format!(".index_{course_id}.bin.tmp"))
    }
}

impl IndexStorage for FileStorage {
    fn read(&self, course_id: &str) -> Result<Option<Vec<u8>>, IndexError> {
        match fs::read(self.path(course_id)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, course_id: &str, blob: &[u8]) -> Result<(), IndexError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.tmp_path(course_id);
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(blob)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, self.path(course_id))?;
        Ok(())
    }

    fn remove(&self, course_id: &str) -> Result<(), IndexError> {
        match fs::remove_file(self.path(course_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory [`IndexStorage`]. Data is lost on drop; intended for tests.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return true if a blob is stored for the course.
    pub fn contains(&self, course_id: &str) -> bool {
        self.blobs.lock().contains_key(course_id)
    }
}

impl IndexStorage for MemoryStorage {
    fn read(&self, course_id: &str) -> Result<Option<Vec<u8>>, IndexError> {
        Ok(self.blobs.lock().get(course_id).cloned())
    }

    fn write(&self, course_id: &str, blob: &[u8]) -> Result<(), IndexError> {
        self.blobs.lock().insert(course_id.to_string(), blob.to_vec());
        Ok(())
    }

    fn remove(&self, course_id: &str) -> Result<(), IndexError> {
        self.blobs.lock().remove(course_id);
        Ok(())
    }
}
