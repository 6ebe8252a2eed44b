//! Scanner context: localizer, stability gate, color engine and roster.

use chrono::Utc;
use hexscan_board::BoardLayout;
use hexscan_color::{ColorAnalysis, ColorEngine};
use hexscan_core::RgbImageView;
use hexscan_localize::{BoardTransform, DetectionState, Localizer, StabilityTracker};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::{ConfigError, ScannerConfig};
use crate::scoring::{score_match, MatchOutcome, MatchRecord, Roster, RosterError};
use crate::session::CameraError;

/// Reasons a capture produces no result.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("board not locked (state {0:?})")]
    NotLocked(DetectionState),
    #[error("a capture is already running")]
    Busy,
    #[error("no board transform available for analysis")]
    NoBoard,
}

#[derive(thiserror::Error, Debug)]
pub enum ScannerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Roster(#[from] RosterError),
}

/// Detection state plus the hint shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScanStatus {
    pub state: DetectionState,
    pub counter: u32,
    pub hint: &'static str,
}

/// Which transform the analysis used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSource {
    /// Localized on the analysed frame itself.
    Fresh,
    /// Last transform from the detection loop.
    LastGood,
}

/// Everything one capture produced.
#[derive(Clone, Debug, Serialize)]
pub struct ScanResult {
    pub outcome: MatchOutcome,
    pub record: MatchRecord,
    pub analysis: ColorAnalysis,
    pub transform: BoardTransform,
    pub transform_source: TransformSource,
}

/// Explicit scanning context. Owns every piece of per-session state.
pub struct Scanner {
    config: ScannerConfig,
    layout: BoardLayout,
    localizer: Box<dyn Localizer>,
    tracker: StabilityTracker,
    engine: ColorEngine,
    roster: Roster,
    last_good: Option<BoardTransform>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("localizer", &self.localizer.name())
            .field("state", &self.tracker.state())
            .field("roster", &self.roster)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Build every stage from `config` with the default two-player roster.
    pub fn new(config: ScannerConfig) -> Result<Self, ScannerError> {
        config.validate()?;
        let layout = config.build_layout()?;
        let localizer = config.build_localizer(&layout)?;
        let engine = config.build_color_engine()?;
        let roster = Roster::new(config.colors.ids().map(str::to_string).collect())?;
        log::info!(
            "scanner ready: {} localizer, {} sample points, {} colors",
            localizer.name(),
            layout.sample_points().len(),
            engine.table().len()
        );
        Ok(Self {
            tracker: StabilityTracker::new(config.stability),
            config,
            layout,
            localizer,
            engine,
            roster,
            last_good: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    #[inline]
    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    #[inline]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[inline]
    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    #[inline]
    pub fn state(&self) -> DetectionState {
        self.tracker.state()
    }

    pub fn status(&self) -> ScanStatus {
        ScanStatus {
            state: self.tracker.state(),
            counter: self.tracker.counter(),
            hint: self.tracker.hint(),
        }
    }

    #[inline]
    pub fn last_transform(&self) -> Option<&BoardTransform> {
        self.last_good.as_ref()
    }

    /// One periodic localization attempt.
    pub fn tick(&mut self, frame: &RgbImageView<'_>, timestamp_ms: u64) -> DetectionState {
        let found = self.localizer.localize(frame, timestamp_ms);
        let success = found.is_some();
        if let Some(t) = found {
            self.last_good = Some(t);
        }
        self.tracker.record(success)
    }

    /// Back to `Searching`; the cached transform is dropped.
    pub fn reset_detection(&mut self) {
        self.tracker.reset();
        self.last_good = None;
    }

    /// Localize `frame` again (falling back to the last good transform),
    /// warp it, count colors and score the roster.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, frame),
            fields(width = frame.width, height = frame.height)
        )
    )]
    pub fn analyze(
        &mut self,
        frame: &RgbImageView<'_>,
        timestamp_ms: u64,
    ) -> Result<ScanResult, CaptureError> {
        let (transform, transform_source) = match self.localizer.localize(frame, timestamp_ms) {
            Some(t) => {
                self.last_good = Some(t);
                (t, TransformSource::Fresh)
            }
            None => {
                let t = self.last_good.ok_or(CaptureError::NoBoard)?;
                log::debug!(
                    "capture frame not localized, reusing transform from {} ms",
                    t.timestamp_ms
                );
                (t, TransformSource::LastGood)
            }
        };
        let raster = transform.warp(frame);
        let analysis = self.engine.analyze(&raster, &self.layout);
        let outcome = score_match(&self.roster, |color| analysis.count_of(color));
        let record = outcome.to_record(Utc::now());
        log::info!(
            "capture: {} (winner {})",
            record.details(),
            record.winner_name.as_deref().unwrap_or("-")
        );
        Ok(ScanResult {
            outcome,
            record,
            analysis,
            transform,
            transform_source,
        })
    }
}
