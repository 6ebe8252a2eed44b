//! JSON scanner configuration.

use std::fs;
use std::path::{Path, PathBuf};

use hexscan_board::{BoardError, BoardLayout, BoardSpec};
use hexscan_color::{BlobParams, ColorEngine, ColorError, ColorTable, SamplingParams};
use hexscan_localize::{
    build_localizer, CanonicalFrame, LocalizeParamsError, Localizer, LocalizerParams,
    StabilityParams,
};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Localize(#[from] LocalizeParamsError),
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error("history cap must be positive")]
    InvalidHistoryCap,
}

/// Where match records are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    /// Older history file, migrated when `path` holds no records.
    pub legacy_path: Option<PathBuf>,
    /// Only the most recent `cap` records are kept.
    pub cap: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("hexscan_history.json"),
            legacy_path: None,
            cap: 50,
        }
    }
}

/// Everything a [`crate::Scanner`] needs. Missing sections take their
/// defaults, so `{}` is a complete config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub board: BoardSpec,
    pub localizer: LocalizerParams,
    pub stability: StabilityParams,
    pub colors: ColorTable,
    pub sampling: SamplingParams,
    pub blob: BlobParams,
    pub history: HistoryConfig,
}

impl ScannerConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn build_layout(&self) -> Result<BoardLayout, ConfigError> {
        Ok(BoardLayout::new(self.board.clone())?)
    }

    pub fn build_localizer(
        &self,
        layout: &BoardLayout,
    ) -> Result<Box<dyn Localizer>, ConfigError> {
        let canonical = CanonicalFrame::new(layout, self.localizer.raster_size);
        Ok(build_localizer(&self.localizer, canonical)?)
    }

    pub fn build_color_engine(&self) -> Result<ColorEngine, ConfigError> {
        Ok(ColorEngine::new(
            self.colors.clone(),
            self.sampling,
            self.blob,
            self.board.marker_diameter_mm,
        )?)
    }

    /// Check every section without keeping the built parts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = self.build_layout()?;
        self.build_localizer(&layout)?;
        self.stability.validate()?;
        self.build_color_engine()?;
        if self.history.cap == 0 {
            return Err(ConfigError::InvalidHistoryCap);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexscan_board::SampleStrategy;
    use hexscan_color::ColorTableError;
    use hexscan_localize::LocalizerKind;

    #[test]
    fn empty_object_is_default_config() {
        let cfg: ScannerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.board.pins.len(), 37);
        assert_eq!(cfg.stability.lock_threshold, 5);
        assert_eq!(cfg.colors.len(), 4);
        assert_eq!(cfg.history.cap, 50);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_sections_override_defaults() {
        let raw = r#"{
            "board": { "sample_strategy": { "kind": "hex_partition", "line_count": 7 } },
            "localizer": { "kind": "bounding_box", "raster_size": 300 },
            "stability": { "failure_penalty": 3 }
        }"#;
        let cfg: ScannerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(
            cfg.board.sample_strategy,
            SampleStrategy::HexPartition { line_count: 7 }
        );
        assert_eq!(cfg.board.pins.len(), 37);
        assert_eq!(cfg.localizer.kind, LocalizerKind::BoundingBox);
        assert_eq!(cfg.localizer.raster_size, 300);
        assert_eq!(cfg.stability.failure_penalty, 3);
        assert_eq!(cfg.stability.lock_threshold, 5);
    }

    #[test]
    fn json_file_round_trip_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner.json");
        let mut cfg = ScannerConfig::default();
        cfg.colors.profiles[1].hue_low = 140;
        cfg.colors.profiles[1].hue_high = 150;
        cfg.write_json(&path).unwrap();

        let loaded = ScannerConfig::load_json(&path).unwrap();
        assert_eq!(loaded.colors, cfg.colors);
        assert!(matches!(
            loaded.validate(),
            Err(ConfigError::Color(ColorError::Table(
                ColorTableError::Overlap { .. }
            )))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScannerConfig::load_json("/nonexistent/hexscan.json").unwrap_err();
        assert!(matches!(err, ConfigIoError::Io(_)));
    }
}
