use relative_path::{Component, RelativePath, RelativePathBuf};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

/// File extension used by [`FileStore`] for stored snapshots.
pub const SNAPSHOT_EXTENSION: &str = "snap";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Snapshot not found: {0}")]
    NotFound(SnapshotId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid snapshot directory: {0}")]
    InvalidSnapshotDir(PathBuf),
}

/// Identifier of a stored snapshot, derived from the test's class or name.
///
/// Always a normalized relative path such as `acceptance/UserEmails`, so it
/// can double as a location below a store root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(RelativePathBuf);

impl SnapshotId {
    pub fn new(id: impl AsRef<str>) -> Result<Self, ConfigurationError> {
        let raw = id.as_ref();
        let invalid = |reason| ConfigurationError::InvalidSnapshotId {
            id: raw.to_string(),
            reason,
        };

        let mut normalized = RelativePathBuf::new();
        for component in RelativePath::new(raw.trim()).components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("parent components are not allowed")),
                Component::Normal(part) => normalized.push(part),
            }
        }

        if normalized.as_str().is_empty() {
            return Err(invalid("identifier is empty"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Location of this snapshot relative to a store root.
    pub fn file_path(&self) -> RelativePathBuf {
        RelativePathBuf::from(format!("{}.{SNAPSHOT_EXTENSION}", self.0))
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Whole-blob persistence for snapshots.
pub trait SnapshotStore {
    fn exists(&self, id: &SnapshotId) -> Result<bool, StoreError>;
    fn load(&self, id: &SnapshotId) -> Result<String, StoreError>;
    fn save(&mut self, id: &SnapshotId, text: &str) -> Result<(), StoreError>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for &mut T {
    fn exists(&self, id: &SnapshotId) -> Result<bool, StoreError> {
        (**self).exists(id)
    }

    fn load(&self, id: &SnapshotId) -> Result<String, StoreError> {
        (**self).load(id)
    }

    fn save(&mut self, id: &SnapshotId, text: &str) -> Result<(), StoreError> {
        (**self).save(id, text)
    }
}

/// In-memory store, sorted by id.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    snapshots: BTreeMap<SnapshotId, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &SnapshotId) -> Option<&str> {
        self.snapshots.get(id).map(String::as_str)
    }

    pub fn insert(&mut self, id: SnapshotId, text: impl Into<String>) {
        self.snapshots.insert(id, text.into());
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn exists(&self, id: &SnapshotId) -> Result<bool, StoreError> {
        Ok(self.snapshots.contains_key(id))
    }

    fn load(&self, id: &SnapshotId) -> Result<String, StoreError> {
        self.snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn save(&mut self, id: &SnapshotId, text: &str) -> Result<(), StoreError> {
        self.snapshots.insert(id.clone(), text.to_string());
        Ok(())
    }
}

/// Stores each snapshot as `<root>/<id>.snap`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(StoreError::InvalidSnapshotDir(root));
        }
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &SnapshotId) -> PathBuf {
        id.file_path().to_path(&self.root)
    }
}

impl SnapshotStore for FileStore {
    fn exists(&self, id: &SnapshotId) -> Result<bool, StoreError> {
        Ok(self.path_for(id).is_file())
    }

    fn load(&self, id: &SnapshotId) -> Result<String, StoreError> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(fs::read_to_string(path)?)
    }

    fn save(&mut self, id: &SnapshotId, text: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        log::debug!("Writing snapshot {id} to {}", path.display());
        fs::write(&path, text)?;
        Ok(())
    }
}
