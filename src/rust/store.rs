use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::classifier::{parse_corpus_json, ClassifierError, Snapshot, TrainingExample};

const SNAPSHOT_EXTENSION: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Snapshot not found: {0}")]
    NotFound(String),
    #[error("Invalid snapshot name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Keeps classifier snapshots as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshots_dir: PathBuf,
}

impl SnapshotStore {
    /// Creates a new SnapshotStore in the default snapshots directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_snapshots_dir())
    }

    /// Returns the default snapshots directory path
    pub fn get_default_snapshots_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("BRAIN_TEXT_HOME") {
            return PathBuf::from(path).join("snapshots");
        }

        // 2. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("brain-text").join("snapshots");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".local").join("share").join("brain-text").join("snapshots");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("brain-text").join("snapshots")
    }

    pub fn new<P: AsRef<Path>>(snapshots_dir: P) -> io::Result<Self> {
        let snapshots_dir = snapshots_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshots_dir)?;
        Ok(Self { snapshots_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.snapshots_dir
    }

    pub fn get_snapshot_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !name.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.snapshots_dir.join(format!("{}.{}", name, SNAPSHOT_EXTENSION)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.get_snapshot_path(name).map(|p| p.exists()).unwrap_or(false)
    }

    /// Writes the snapshot, replacing any previous one with the same name.
    /// The file is written next to its destination first and then renamed,
    /// so readers never see a half-written snapshot.
    pub fn save(&self, name: &str, snapshot: &Snapshot) -> Result<PathBuf, StoreError> {
        let path = self.get_snapshot_path(name)?;
        let json = snapshot.to_json_pretty()?;
        let tmp_path = path.with_extension("json.tmp");
        log::info!("Writing {} bytes to {:?}", json.len(), tmp_path);
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;
        log::info!("Snapshot '{}' saved to {:?}", name, path);
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Snapshot, StoreError> {
        let path = self.get_snapshot_path(name)?;
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        log::info!("Loading snapshot '{}' from {:?}", name, path);
        let json = fs::read_to_string(&path)?;
        Ok(Snapshot::from_json(&json)?)
    }

    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        let path = self.get_snapshot_path(name)?;
        if path.exists() {
            fs::remove_file(&path)?;
            log::info!("Removed snapshot '{}'", name);
        }
        Ok(())
    }

    /// Names of all stored snapshots, sorted
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.snapshots_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Reads a corpus file in the `{label: [texts]}` format
    pub fn read_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<TrainingExample>, StoreError> {
        let path = path.as_ref();
        log::info!("Reading corpus from {:?}", path);
        let json = fs::read_to_string(path)?;
        Ok(parse_corpus_json(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshots_dir() {
        // Test with environment variable
        env::set_var("BRAIN_TEXT_HOME", "/tmp/test-brain-text");
        let path = SnapshotStore::get_default_snapshots_dir();
        assert!(path.to_str().unwrap().contains("/tmp/test-brain-text/snapshots"));
        env::remove_var("BRAIN_TEXT_HOME");

        // Test without environment variable
        let path = SnapshotStore::get_default_snapshots_dir();
        assert!(path.to_str().unwrap().contains("snapshots"));
    }

    #[test]
    fn test_snapshot_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        assert!(store.get_snapshot_path("lights-v2").is_ok());
        assert!(matches!(store.get_snapshot_path("../escape"), Err(StoreError::InvalidName(_))));
        assert!(matches!(store.get_snapshot_path(""), Err(StoreError::InvalidName(_))));
        assert!(matches!(store.get_snapshot_path(".hidden"), Err(StoreError::InvalidName(_))));
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        assert!(!store.exists("nothing"));
        assert!(matches!(store.load("nothing"), Err(StoreError::NotFound(_))));
        assert!(store.remove("nothing").is_ok());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_read_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        fs::write(&path, r#"{"on": ["turn it on"], "off": ["turn it off", "lights off"]}"#).unwrap();
        let examples = SnapshotStore::read_corpus(&path).unwrap();
        assert_eq!(examples.len(), 3);

        fs::write(&path, "{").unwrap();
        assert!(matches!(
            SnapshotStore::read_corpus(&path),
            Err(StoreError::Classifier(ClassifierError::Usage(_)))
        ));
    }
}
