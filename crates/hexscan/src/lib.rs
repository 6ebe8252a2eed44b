//! Hexagonal pegboard scanner.
//!
//! This crate ties the `hexscan-*` crates together:
//! - [`ScannerConfig`]: one JSON file for board geometry, localizer,
//!   stability gate, color table, sampling, blob mode and history;
//! - [`Scanner`]: explicit session context that runs periodic localization
//!   ticks and one-shot analyses;
//! - [`CaptureSession`]: camera ownership, a cancellable detection thread
//!   and capture gating;
//! - [`Roster`], [`score_match`] and [`MatchRecord`] for results;
//! - [`HistoryStore`] with file and in-memory backends;
//! - `detect` (feature `image`): helpers for `image::RgbImage` stills.
//!
//! ## Quickstart
//!
//! ```no_run
//! use hexscan::{detect, Scanner, ScannerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = detect::load_rgb("board.jpg")?;
//! let mut scanner = Scanner::new(ScannerConfig::default())?;
//! let result = detect::scan_image(&mut scanner, &img)?;
//! for p in &result.outcome.ranking {
//!     println!("{} ({}): {}", p.name, p.color, p.score);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `hexscan::core`: image views, homographies, polygon geometry, logger.
//! - `hexscan::board`: pin grid, adjacency, sample points.
//! - `hexscan::localize`: localizers, canonical frame, stability tracker.
//! - `hexscan::color`: HSV table, sampler, blob counter, color engine.

pub use hexscan_board as board;
pub use hexscan_color as color;
pub use hexscan_core as core;
pub use hexscan_localize as localize;

mod config;
mod history;
mod scanner;
mod scoring;
mod session;

pub use config::{ConfigError, ConfigIoError, HistoryConfig, ScannerConfig};
pub use history::{HistoryError, HistoryStore, JsonFileHistory, MemoryHistory};
pub use scanner::{CaptureError, ScanResult, ScanStatus, Scanner, ScannerError, TransformSource};
pub use scoring::{
    score_match, HistoryStats, MatchOutcome, MatchRecord, Player, PlayerScore, Roster,
    RosterError, MAX_PLAYERS, MIN_PLAYERS,
};
pub use session::{CameraError, CameraStatus, CaptureSession, FrameSource, SessionStatus};

pub use hexscan_localize::DetectionState;

#[cfg(feature = "image")]
pub mod detect;
