use serde::{Deserialize, Serialize};

use crate::config::ValleyConfig;
use crate::error::{Result, ValleyError};

// Valley cross-section as a function of normalized distance x = distance / scale.
// Curves must not increase as x shrinks toward the path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CarveCurve {
    // gain * x^2 + offset, rising away from the path
    Quadratic { gain: f64, offset: f64 },
    // Same level everywhere inside the threshold
    Flat { level: f64 },
}

impl Default for CarveCurve {
    // 2 * (2x)^2 / 3.5 - 1.3
    fn default() -> Self {
        CarveCurve::Quadratic {
            gain: 8.0 / 3.5,
            offset: -1.3,
        }
    }
}

impl CarveCurve {
    pub fn eval(&self, x: f64) -> f64 {
        match *self {
            CarveCurve::Quadratic { gain, offset } => gain * x * x + offset,
            CarveCurve::Flat { level } => level,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            CarveCurve::Quadratic { gain, offset } => {
                if !gain.is_finite() || gain < 0.0 || !offset.is_finite() {
                    return Err(ValleyError::invalid(format!(
                        "quadratic curve needs finite non-negative gain and finite offset, got gain {} offset {}",
                        gain, offset
                    )));
                }
            }
            CarveCurve::Flat { level } => {
                if !level.is_finite() {
                    return Err(ValleyError::invalid("flat curve level must be finite"));
                }
            }
        }
        Ok(())
    }
}

/// Turns path distance into a terrain height and merges it so terrain only
/// ever goes down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValleyBlender {
    curve: CarveCurve,
    scale: f64,
    floor: f32,
}

impl ValleyBlender {
    pub fn new(curve: CarveCurve, scale: f64, floor: f32) -> Result<Self> {
        curve.validate()?;
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(ValleyError::invalid(format!(
                "carve scale must be positive, got {}",
                scale
            )));
        }
        if !floor.is_finite() {
            return Err(ValleyError::invalid("carve floor must be finite"));
        }
        Ok(Self {
            curve,
            scale,
            floor,
        })
    }

    pub fn from_config(config: &ValleyConfig) -> Result<Self> {
        Self::new(config.curve, config.carve_scale, config.carve_floor)
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    // Height the valley asks for at this distance, never below the floor
    pub fn carve_value(&self, distance: f64) -> f32 {
        let x = distance / self.scale;
        (self.curve.eval(x) as f32).max(self.floor)
    }

    // Lower `existing` toward the valley profile when within `threshold`.
    // A NaN distance leaves the cell alone.
    #[inline]
    pub fn blend(&self, existing: f32, distance: f64, threshold: f64) -> f32 {
        if distance.is_nan() || distance >= threshold {
            return existing;
        }
        existing.min(self.carve_value(distance))
    }
}
