//! Run configuration for the valley pipeline.
//!
//! Every tunable of a run lives here. Configs load from JSON; missing fields
//! fall back to the defaults.

use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::blend::CarveCurve;
use crate::distance::DistanceMetric;
use crate::error::{Result, ValleyError};
use crate::path::{CoordinateMode, PerturbAxes};

/// Rectangle of noise space sampled by the field builder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl SampleBounds {
    pub const fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

impl Default for SampleBounds {
    fn default() -> Self {
        Self::new(6.0, 10.0, 1.0, 5.0)
    }
}

/// Parameters of the base noise field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub seed: u32,
    /// Number of summed Perlin layers
    pub octaves: usize,
    pub frequency: f64,
    /// Amplitude falloff per octave
    pub persistence: f64,
    pub lacunarity: f64,
    pub width: usize,
    pub height: usize,
    pub bounds: SampleBounds,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            frequency: 1.0,
            persistence: 0.3,
            lacunarity: 2.0,
            width: 256,
            height: 256,
            bounds: SampleBounds::default(),
        }
    }
}

/// Full configuration of one carving run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValleyConfig {
    /// Seed for the path perturbation RNG
    pub seed: u64,
    /// Subdivision depth; the path holds `depth * depth` points
    pub depth: u32,
    pub start: DVec2,
    pub end: DVec2,
    /// Offset bound at the root before decay is applied
    pub max_amplitude: f64,
    /// Per-level shrink factor of the offset bound, in (0, 1)
    pub decay_factor: f64,
    /// Cells at or beyond this distance keep their height
    pub carve_threshold: f64,
    /// Distance divisor before the carve curve is evaluated
    pub carve_scale: f64,
    /// Lowest value the carve curve may produce
    pub carve_floor: f32,
    pub curve: CarveCurve,
    pub axes: PerturbAxes,
    pub coordinates: CoordinateMode,
    pub metric: DistanceMetric,
    pub noise: NoiseConfig,
}

impl Default for ValleyConfig {
    fn default() -> Self {
        Self {
            seed: 2025,
            depth: 5,
            start: DVec2::new(5.0, 100.0),
            end: DVec2::new(250.0, 100.0),
            max_amplitude: 300.0,
            decay_factor: 0.5,
            carve_threshold: 40.0,
            carve_scale: 20.0,
            carve_floor: -1.0,
            curve: CarveCurve::default(),
            axes: PerturbAxes::default(),
            coordinates: CoordinateMode::default(),
            metric: DistanceMetric::default(),
            noise: NoiseConfig::default(),
        }
    }
}

impl ValleyConfig {
    /// Read a JSON config file. Fields left out keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: ValleyConfig = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded config");
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every option before anything is allocated.
    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 {
            return Err(ValleyError::invalid("depth must be at least 1"));
        }
        if self.depth == 1 && self.start != self.end {
            return Err(ValleyError::invalid(
                "depth 1 holds a single point, so start and end must coincide",
            ));
        }
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ValleyError::invalid("path endpoints must be finite"));
        }
        if !self.max_amplitude.is_finite() || self.max_amplitude < 0.0 {
            return Err(ValleyError::invalid(format!(
                "max_amplitude must be finite and non-negative, got {}",
                self.max_amplitude
            )));
        }
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(ValleyError::invalid(format!(
                "decay_factor must lie in (0, 1), got {}",
                self.decay_factor
            )));
        }
        if !(self.carve_threshold > 0.0) {
            return Err(ValleyError::invalid("carve_threshold must be positive"));
        }
        if !(self.carve_scale > 0.0) {
            return Err(ValleyError::invalid("carve_scale must be positive"));
        }
        if !self.carve_floor.is_finite() {
            return Err(ValleyError::invalid("carve_floor must be finite"));
        }
        self.curve.validate()?;

        let noise = &self.noise;
        if noise.width == 0 || noise.height == 0 {
            return Err(ValleyError::invalid(format!(
                "field size must be non-zero, got {}x{}",
                noise.width, noise.height
            )));
        }
        if noise.octaves == 0 {
            return Err(ValleyError::invalid("noise needs at least one octave"));
        }
        if !(noise.bounds.width() > 0.0) || !(noise.bounds.height() > 0.0) {
            return Err(ValleyError::invalid(format!(
                "sample bounds are empty or inverted: {:?}",
                noise.bounds
            )));
        }
        Ok(())
    }
}
