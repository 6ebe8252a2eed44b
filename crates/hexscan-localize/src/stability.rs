//! Confidence gating over successive localization attempts.

use serde::{Deserialize, Serialize};

use crate::params::LocalizeParamsError;

/// Alignment confidence reported to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    Searching,
    Aligning,
    Locked,
}

impl DetectionState {
    /// Short instruction for the current state.
    pub fn hint(self) -> &'static str {
        match self {
            Self::Searching => "Point the camera at the board",
            Self::Aligning => "Hold steady, aligning",
            Self::Locked => "Board locked, ready to scan",
        }
    }
}

/// Counter thresholds and the detection cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityParams {
    /// Counter value at which the state becomes `Locked` (`K`).
    pub lock_threshold: u32,
    /// Amount subtracted on every failed attempt; at least 2.
    pub failure_penalty: u32,
    /// Upper bound of the counter; `None` means `lock_threshold`.
    pub counter_cap: Option<u32>,
    /// Pause between detection attempts.
    pub interval_ms: u64,
}

impl Default for StabilityParams {
    fn default() -> Self {
        Self {
            lock_threshold: 5,
            failure_penalty: 2,
            counter_cap: None,
            interval_ms: 160,
        }
    }
}

impl StabilityParams {
    pub fn validate(&self) -> Result<(), LocalizeParamsError> {
        if self.lock_threshold == 0 {
            return Err(LocalizeParamsError::InvalidLockThreshold);
        }
        if self.failure_penalty < 2 {
            return Err(LocalizeParamsError::InvalidPenalty);
        }
        if self.cap() < self.lock_threshold {
            return Err(LocalizeParamsError::InvalidCounterCap);
        }
        Ok(())
    }

    #[inline]
    fn cap(&self) -> u32 {
        self.counter_cap.unwrap_or(self.lock_threshold)
    }
}

/// Stability counter `c` and the state derived from it.
///
/// Success adds one (up to the cap), failure subtracts the penalty (down to
/// zero). `c == 0` is `Searching`, `c >= K` is `Locked`, anything between
/// is `Aligning`.
#[derive(Clone, Debug)]
pub struct StabilityTracker {
    params: StabilityParams,
    counter: u32,
    state: DetectionState,
}

impl StabilityTracker {
    pub fn new(params: StabilityParams) -> Self {
        Self {
            params,
            counter: 0,
            state: DetectionState::Searching,
        }
    }

    #[inline]
    pub fn params(&self) -> &StabilityParams {
        &self.params
    }

    #[inline]
    pub fn state(&self) -> DetectionState {
        self.state
    }

    #[inline]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    #[inline]
    pub fn hint(&self) -> &'static str {
        self.state.hint()
    }

    /// Capture is only allowed while locked.
    #[inline]
    pub fn can_capture(&self) -> bool {
        self.state == DetectionState::Locked
    }

    /// Feed one localization outcome and return the new state.
    pub fn record(&mut self, success: bool) -> DetectionState {
        self.counter = if success {
            (self.counter + 1).min(self.params.cap())
        } else {
            self.counter.saturating_sub(self.params.failure_penalty)
        };
        let next = self.derive_state();
        if next != self.state {
            log::info!(
                "detection {:?} -> {:?} (counter {})",
                self.state,
                next,
                self.counter
            );
            self.state = next;
        }
        self.state
    }

    /// Back to `Searching` with a zero counter.
    pub fn reset(&mut self) {
        if self.state != DetectionState::Searching {
            log::info!("detection reset from {:?}", self.state);
        }
        self.counter = 0;
        self.state = DetectionState::Searching;
    }

    fn derive_state(&self) -> DetectionState {
        if self.counter == 0 {
            DetectionState::Searching
        } else if self.counter >= self.params.lock_threshold {
            DetectionState::Locked
        } else {
            DetectionState::Aligning
        }
    }

    #[cfg(test)]
    fn with_counter(params: StabilityParams, counter: u32) -> Self {
        let mut t = Self::new(params);
        t.counter = counter;
        t.state = t.derive_state();
        t
    }
}
