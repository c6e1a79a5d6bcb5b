//! Selection tuning knobs.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Shape of the recency and source-balance cooldown curves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayCurve {
    /// Zero weight until the cooldown elapses, then full weight.
    Step,
    /// Weight grows linearly across the cooldown.
    Linear,
    /// Weight approaches full exponentially, reaching ≈0.63 at one
    /// cooldown.
    #[default]
    Exponential,
}

impl DecayCurve {
    /// Returns the curve name as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Linear => "linear",
            Self::Exponential => "exponential",
        }
    }
}

impl Display for DecayCurve {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecayCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "step" => Ok(Self::Step),
            "linear" => Ok(Self::Linear),
            "exponential" | "exp" => Ok(Self::Exponential),
            _ => Err(format!("Invalid decay curve: {s}")),
        }
    }
}

/// Tuning for the multi-factor selection weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Days until a shown image's recency penalty returns to neutral.
    pub recency_cooldown_days: f64,
    /// Days until a shown source's balance penalty returns to neutral.
    pub source_cooldown_days: f64,
    /// Cooldown curve shared by the recency and source factors.
    pub decay: DecayCurve,
    /// Multiplier applied to favorite images.
    pub favorite_boost: f64,
    /// Multiplier applied to never-shown images.
    pub new_image_boost: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            recency_cooldown_days: 7.0,
            source_cooldown_days: 1.0,
            decay: DecayCurve::default(),
            favorite_boost: 2.0,
            new_image_boost: 2.0,
        }
    }
}

/// Caller-supplied constraints for one selection call.
#[derive(Debug, Clone, Default)]
pub struct SelectionConstraints {
    /// Restrict candidates to these sources.
    pub source_ids: Option<Vec<String>>,
    /// Only favorite images.
    pub favorites_only: bool,
    /// Minimum aspect ratio (inclusive).
    pub min_aspect: Option<f64>,
    /// Maximum aspect ratio (inclusive).
    pub max_aspect: Option<f64>,
    /// Short cooldown: skip images shown within this many hours.
    pub exclude_shown_within_hours: Option<f64>,
    /// Color-aware weighting context.
    pub color: Option<ColorContext>,
}

/// Target temperature for color-aware weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorContext {
    /// Desired warm/cool balance, `[-1, +1]`.
    pub target_temperature: f64,
    /// Temperature distance at which a candidate's color factor reaches
    /// zero. The default of 2.0 spans the whole range, so nothing is
    /// excluded outright.
    pub tolerance: f64,
}

impl Default for ColorContext {
    fn default() -> Self {
        Self {
            target_temperature: 0.0,
            tolerance: 2.0,
        }
    }
}
