//! Output quality setting.
//!
//! A single user-facing percentage owned by the session. The pipeline reads it
//! once per job at the moment the job starts converting.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Highest accepted quality percentage.
pub const MAX_QUALITY: u8 = 100;

/// Step size of the quality slider.
pub const QUALITY_STEP: u8 = 5;

/// Default quality percentage.
pub const DEFAULT_QUALITY: u8 = 80;

/// Largest value ever displayed, so 100% never reads as lossless output.
pub const DISPLAY_CAP: f32 = 99.9;

/// Amount subtracted from the encoder factor to stay off the lossless path.
const LOSSLESS_GUARD: f32 = 0.001;

/// Quality percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Create a quality value, clamping into `0..=100`.
    pub fn new(value: u8) -> Self {
        Self(value.min(MAX_QUALITY))
    }

    /// Create a quality value snapped to the nearest slider step.
    pub fn snapped(value: u8) -> Self {
        let value = value.min(MAX_QUALITY);
        let snapped = (value + QUALITY_STEP / 2) / QUALITY_STEP * QUALITY_STEP;
        Self::new(snapped)
    }

    /// Raw percentage.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Value shown to the user, capped at [`DISPLAY_CAP`].
    pub fn display_value(self) -> f32 {
        f32::from(self.0).min(DISPLAY_CAP)
    }

    /// Coarse label for the current value.
    pub fn tier(self) -> QualityTier {
        match self.0 {
            0..=49 => QualityTier::Low,
            50..=79 => QualityTier::Average,
            _ => QualityTier::High,
        }
    }

    /// Encoder factor in `0.0..1.0`.
    ///
    /// Computed as `max(quality / 100 - 0.001, 0)`, so even 100% asks the
    /// encoder for 0.999.
    pub fn effective_factor(self) -> f32 {
        (f32::from(self.0) / 100.0 - LOSSLESS_GUARD).max(0.0)
    }

    /// [`effective_factor`](Self::effective_factor) on libwebp's 0-100 scale.
    pub fn encoder_quality(self) -> f32 {
        self.effective_factor() * 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.display_value())
    }
}

/// Three-tier quality label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Low,
    Average,
    High,
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Average => "Average",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

/// Session-owned quality setting.
///
/// Observers subscribe to changes; the pipeline only calls [`get`](Self::get).
pub struct QualitySetting {
    tx: watch::Sender<Quality>,
}

impl QualitySetting {
    pub fn new(initial: Quality) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Current quality.
    pub fn get(&self) -> Quality {
        *self.tx.borrow()
    }

    /// Store a new quality and notify subscribers. Returns the clamped value.
    pub fn set(&self, value: u8) -> Quality {
        let quality = Quality::new(value);
        let previous = self.tx.send_replace(quality);
        if previous != quality {
            tracing::debug!(from = previous.value(), to = quality.value(), "Quality changed");
        }
        quality
    }

    /// Watch for quality changes.
    pub fn subscribe(&self) -> watch::Receiver<Quality> {
        self.tx.subscribe()
    }
}

impl Default for QualitySetting {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}
