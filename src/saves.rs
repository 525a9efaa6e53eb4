//! Save files on disk.
//!
//! A [`SaveStore`] is a flat directory of `<name>.save.json` or
//! `<name>.save.bin` files, one per saved session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::serialization::{decode_snapshot, encode_snapshot, BinaryError, GameSnapshot, SnapshotError};

const JSON_SUFFIX: &str = ".save.json";
const BINARY_SUFFIX: &str = ".save.bin";

#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("invalid binary save: {0}")]
    Binary(#[from] BinaryError),
    #[error("invalid save name {0:?}")]
    InvalidName(String),
    #[error("no save named {0:?}")]
    NotFound(String),
    #[error("unrecognised save file {0}")]
    UnknownFormat(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Json,
    Binary,
}

impl SaveFormat {
    pub fn suffix(self) -> &'static str {
        match self {
            SaveFormat::Json => JSON_SUFFIX,
            SaveFormat::Binary => BINARY_SUFFIX,
        }
    }

    /// Detect the format from a file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(JSON_SUFFIX) {
            Some(SaveFormat::Json)
        } else if name.ends_with(BINARY_SUFFIX) {
            Some(SaveFormat::Binary)
        } else {
            None
        }
    }

    fn other(self) -> Self {
        match self {
            SaveFormat::Json => SaveFormat::Binary,
            SaveFormat::Binary => SaveFormat::Json,
        }
    }
}

/// Read and validate a save file; the format comes from its name.
pub fn read_snapshot_file<P: AsRef<Path>>(path: P) -> Result<GameSnapshot, SaveError> {
    let path = path.as_ref();
    let format = SaveFormat::from_path(path).ok_or_else(|| SaveError::UnknownFormat(path.to_path_buf()))?;
    match format {
        SaveFormat::Json => Ok(GameSnapshot::from_json(&fs::read_to_string(path)?)?),
        SaveFormat::Binary => Ok(decode_snapshot(&fs::read(path)?)?),
    }
}

/// Write a save file; the format comes from its name.
pub fn write_snapshot_file<P: AsRef<Path>>(path: P, snapshot: &GameSnapshot) -> Result<(), SaveError> {
    let path = path.as_ref();
    let format = SaveFormat::from_path(path).ok_or_else(|| SaveError::UnknownFormat(path.to_path_buf()))?;
    let bytes = match format {
        SaveFormat::Json => snapshot.to_json()?.into_bytes(),
        SaveFormat::Binary => encode_snapshot(snapshot)?,
    };
    fs::write(path, bytes)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SaveStore {
    dir: PathBuf,
    format: SaveFormat,
}

impl SaveStore {
    pub fn new(dir: impl Into<PathBuf>, format: SaveFormat) -> Self { Self { dir: dir.into(), format } }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn format(&self) -> SaveFormat { self.format }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, SaveError> {
        check_name(name)?;
        Ok(self.dir.join(format!("{name}{}", self.format.suffix())))
    }

    /// Write `snapshot` under `name`, creating the directory if needed.
    pub fn save(&self, name: &str, snapshot: &GameSnapshot) -> Result<PathBuf, SaveError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;
        write_snapshot_file(&path, snapshot)?;
        debug!(path = %path.display(), "saved session");
        Ok(path)
    }

    /// Load `name`, preferring this store's format when both files exist.
    pub fn load(&self, name: &str) -> Result<GameSnapshot, SaveError> {
        check_name(name)?;
        for format in [self.format, self.format.other()] {
            let path = self.dir.join(format!("{name}{}", format.suffix()));
            if path.is_file() {
                return read_snapshot_file(&path);
            }
        }
        Err(SaveError::NotFound(name.to_string()))
    }

    /// Names of every save in the directory, sorted and deduplicated.
    /// A missing directory has no saves.
    pub fn list(&self) -> Result<Vec<String>, SaveError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else { continue };
            let stem = file_name.strip_suffix(JSON_SUFFIX).or_else(|| file_name.strip_suffix(BINARY_SUFFIX));
            if let Some(stem) = stem {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Delete every file saved under `name`. Returns false if there was none.
    pub fn remove(&self, name: &str) -> Result<bool, SaveError> {
        check_name(name)?;
        let mut removed = false;
        for format in [SaveFormat::Json, SaveFormat::Binary] {
            let path = self.dir.join(format!("{name}{}", format.suffix()));
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

fn check_name(name: &str) -> Result<(), SaveError> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name.chars().all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '));
    if ok { Ok(()) } else { Err(SaveError::InvalidName(name.to_string())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::GridSnapshot;
    use tempfile::tempdir;

    fn snapshot(name: &str) -> GameSnapshot {
        GameSnapshot {
            remaining_lives: 3,
            grid_width: 2,
            grid_height: 2,
            goal: 2048,
            player_name: name.to_string(),
            accepted_spawnables: vec![2, 4],
            max_undos: 4,
            undo_chain: vec![GridSnapshot { cells: vec![vec![2, 0], vec![0, 4]], score: 0 }],
        }
    }

    #[test]
    fn save_creates_dir_and_loads_back() {
        let tmp = tempdir().unwrap();
        let store = SaveStore::new(tmp.path().join("saves"), SaveFormat::Json);
        let path = store.save("ada", &snapshot("ada")).unwrap();
        assert!(path.ends_with("ada.save.json"));
        assert_eq!(store.load("ada").unwrap(), snapshot("ada"));
    }

    #[test]
    fn binary_store_round_trip() {
        let tmp = tempdir().unwrap();
        let store = SaveStore::new(tmp.path(), SaveFormat::Binary);
        let path = store.save("bin", &snapshot("bin")).unwrap();
        assert_eq!(SaveFormat::from_path(&path), Some(SaveFormat::Binary));
        assert_eq!(read_snapshot_file(&path).unwrap(), snapshot("bin"));

        // a JSON store still finds binary saves
        let json_store = SaveStore::new(tmp.path(), SaveFormat::Json);
        assert_eq!(json_store.load("bin").unwrap(), snapshot("bin"));
    }

    #[test]
    fn list_and_remove() {
        let tmp = tempdir().unwrap();
        let store = SaveStore::new(tmp.path(), SaveFormat::Json);
        assert!(store.list().unwrap().is_empty());
        store.save("zed", &snapshot("zed")).unwrap();
        store.save("amy", &snapshot("amy")).unwrap();
        SaveStore::new(tmp.path(), SaveFormat::Binary).save("amy", &snapshot("amy")).unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["amy".to_string(), "zed".to_string()]);
        assert!(store.remove("amy").unwrap());
        assert!(!store.remove("amy").unwrap());
        assert_eq!(store.list().unwrap(), vec!["zed".to_string()]);
        assert!(matches!(store.load("amy"), Err(SaveError::NotFound(_))));
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let tmp = tempdir().unwrap();
        let store = SaveStore::new(tmp.path().join("nope"), SaveFormat::Json);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_names() {
        let store = SaveStore::new("unused", SaveFormat::Json);
        for name in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(store.path_for(name), Err(SaveError::InvalidName(_))), "{name:?}");
        }
    }

    #[test]
    fn corrupt_files_are_errors() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("bad.save.json"), "{\"remainingLives\": 1}").unwrap();
        fs::write(tmp.path().join("bad2.save.bin"), [1u8, 2, 3]).unwrap();
        let store = SaveStore::new(tmp.path(), SaveFormat::Json);
        assert!(matches!(store.load("bad"), Err(SaveError::Snapshot(_))));
        assert!(matches!(store.load("bad2"), Err(SaveError::Binary(_))));
        assert!(matches!(read_snapshot_file(tmp.path().join("x.txt")), Err(SaveError::UnknownFormat(_))));
    }
}
