//! Configured marker colors.

use serde::{Deserialize, Serialize};

use crate::hsv::{rgb_to_hsv, Hsv};

/// Hue values run 0..=180.
pub const HUE_MAX: u8 = 180;

/// One marker color as an HSV box. `hue_low > hue_high` wraps through red.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorProfile {
    pub id: String,
    /// Human readable name.
    #[serde(default)]
    pub name: String,
    /// Swatch for result display, `#RRGGBB`.
    #[serde(default)]
    pub display: String,
    pub hue_low: u8,
    pub hue_high: u8,
    pub sat_min: u8,
    #[serde(default = "full")]
    pub sat_max: u8,
    pub val_min: u8,
    #[serde(default = "full")]
    pub val_max: u8,
}

fn full() -> u8 {
    255
}

impl ColorProfile {
    #[inline]
    pub fn matches_hue(&self, h: u8) -> bool {
        if self.hue_low <= self.hue_high {
            h >= self.hue_low && h <= self.hue_high
        } else {
            h >= self.hue_low || h <= self.hue_high
        }
    }

    #[inline]
    pub fn matches(&self, hsv: Hsv) -> bool {
        (self.sat_min..=self.sat_max).contains(&hsv.s)
            && (self.val_min..=self.val_max).contains(&hsv.v)
            && self.matches_hue(hsv.h)
    }

    fn hue_set(&self) -> [bool; HUE_MAX as usize + 1] {
        std::array::from_fn(|h| self.matches_hue(h as u8))
    }

    fn overlaps(&self, other: &ColorProfile) -> bool {
        let ranges_meet = |a0: u8, a1: u8, b0: u8, b1: u8| a0 <= b1 && b0 <= a1;
        if !ranges_meet(self.sat_min, self.sat_max, other.sat_min, other.sat_max)
            || !ranges_meet(self.val_min, self.val_max, other.val_min, other.val_max)
        {
            return false;
        }
        let (a, b) = (self.hue_set(), other.hue_set());
        a.iter().zip(b.iter()).any(|(x, y)| *x && *y)
    }
}

/// Color table validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorTableError {
    #[error("color table is empty")]
    Empty,
    #[error("duplicate color id {0:?}")]
    DuplicateId(String),
    #[error("color {id:?}: hue bounds must be <= 180")]
    HueOutOfRange { id: String },
    #[error("color {id:?}: saturation or value range is inverted")]
    InvertedRange { id: String },
    #[error("colors {a:?} and {b:?} overlap")]
    Overlap { a: String, b: String },
}

/// Ordered, pairwise disjoint set of marker colors plus the floors below
/// which a sample counts as empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorTable {
    pub profiles: Vec<ColorProfile>,
    pub sat_floor: u8,
    pub val_floor: u8,
}

impl Default for ColorTable {
    fn default() -> Self {
        let p = |id: &str, name: &str, display: &str, h: (u8, u8), s: u8, v: u8| ColorProfile {
            id: id.to_string(),
            name: name.to_string(),
            display: display.to_string(),
            hue_low: h.0,
            hue_high: h.1,
            sat_min: s,
            sat_max: 255,
            val_min: v,
            val_max: 255,
        };
        Self {
            profiles: vec![
                p("magenta", "Magenta", "#E91E63", (135, 175), 60, 60),
                p("yellow", "Yellow", "#FFEB3B", (15, 40), 80, 80),
                p("blue", "Blue", "#2196F3", (95, 130), 80, 60),
                p("green", "Green", "#4CAF50", (41, 85), 60, 50),
            ],
            sat_floor: 40,
            val_floor: 40,
        }
    }
}

impl ColorTable {
    pub fn validate(&self) -> Result<(), ColorTableError> {
        if self.profiles.is_empty() {
            return Err(ColorTableError::Empty);
        }
        for (i, p) in self.profiles.iter().enumerate() {
            if p.hue_low > HUE_MAX || p.hue_high > HUE_MAX {
                return Err(ColorTableError::HueOutOfRange { id: p.id.clone() });
            }
            if p.sat_min > p.sat_max || p.val_min > p.val_max {
                return Err(ColorTableError::InvertedRange { id: p.id.clone() });
            }
            for q in &self.profiles[..i] {
                if q.id == p.id {
                    return Err(ColorTableError::DuplicateId(p.id.clone()));
                }
                if q.overlaps(p) {
                    return Err(ColorTableError::Overlap {
                        a: q.id.clone(),
                        b: p.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ColorProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.id.as_str())
    }

    /// Index of the first matching profile; `None` for empty or unknown.
    pub fn classify_hsv(&self, hsv: Hsv) -> Option<usize> {
        if hsv.s < self.sat_floor || hsv.v < self.val_floor {
            return None;
        }
        self.profiles.iter().position(|p| p.matches(hsv))
    }

    #[inline]
    pub fn classify(&self, rgb: [u8; 3]) -> Option<usize> {
        self.classify_hsv(rgb_to_hsv(rgb))
    }
}
