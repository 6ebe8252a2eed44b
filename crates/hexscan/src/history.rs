//! Append-only match history.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::HistoryConfig;
use crate::scoring::MatchRecord;

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("history i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Single-writer record store.
pub trait HistoryStore: Send {
    fn append(&mut self, record: MatchRecord) -> Result<(), HistoryError>;

    /// Oldest first, at most the store's cap. File stores read unreadable
    /// or corrupt data as an empty history.
    fn read_all(&self) -> Result<Vec<MatchRecord>, HistoryError>;

    fn clear(&mut self) -> Result<(), HistoryError>;
}

/// In-memory store.
#[derive(Clone, Debug)]
pub struct MemoryHistory {
    records: Vec<MatchRecord>,
    cap: usize,
}

impl MemoryHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            records: Vec::new(),
            cap: cap.max(1),
        }
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default().cap)
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, record: MatchRecord) -> Result<(), HistoryError> {
        self.records.push(record);
        keep_latest(&mut self.records, self.cap);
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<MatchRecord>, HistoryError> {
        Ok(self.records.clone())
    }

    fn clear(&mut self) -> Result<(), HistoryError> {
        self.records.clear();
        Ok(())
    }
}

/// JSON array on disk.
///
/// Unparseable content reads as an empty history. When the primary file
/// holds no records, the legacy file (if any) is read instead and copied
/// over.
#[derive(Clone, Debug)]
pub struct JsonFileHistory {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
    cap: usize,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            legacy_path: None,
            cap: cap.max(1),
        }
    }

    pub fn with_legacy(mut self, legacy: impl Into<PathBuf>) -> Self {
        self.legacy_path = Some(legacy.into());
        self
    }

    pub fn from_config(cfg: &HistoryConfig) -> Self {
        let store = Self::new(&cfg.path, cfg.cap);
        match &cfg.legacy_path {
            Some(legacy) => store.with_legacy(legacy),
            None => store,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, records: &[MatchRecord]) -> Result<(), HistoryError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| HistoryError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Records in `path`. Missing, unreadable or corrupt files read as empty.
fn read_records(path: &Path) -> Vec<MatchRecord> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            log::warn!("history {} is unreadable ({e}), starting empty", path.display());
            return Vec::new();
        }
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        log::warn!("history {} is corrupt ({e}), starting empty", path.display());
        Vec::new()
    })
}

fn keep_latest(records: &mut Vec<MatchRecord>, cap: usize) {
    if records.len() > cap {
        records.drain(..records.len() - cap);
    }
}

impl HistoryStore for JsonFileHistory {
    fn append(&mut self, record: MatchRecord) -> Result<(), HistoryError> {
        let mut records = self.read_all()?;
        records.push(record);
        keep_latest(&mut records, self.cap);
        self.write(&records)
    }

    fn read_all(&self) -> Result<Vec<MatchRecord>, HistoryError> {
        let mut records = read_records(&self.path);
        if records.is_empty() {
            if let Some(legacy) = &self.legacy_path {
                let old = read_records(legacy);
                if !old.is_empty() {
                    log::info!(
                        "migrating {} records from {}",
                        old.len(),
                        legacy.display()
                    );
                    if let Err(e) = self.write(&old) {
                        log::warn!("history migration not saved: {e}");
                    }
                    records = old;
                }
            }
        }
        keep_latest(&mut records, self.cap);
        Ok(records)
    }

    fn clear(&mut self) -> Result<(), HistoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(HistoryError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
