use glam::DVec2;

use crate::blend::ValleyBlender;
use crate::config::ValleyConfig;
use crate::distance::{DistanceMetric, min_distance_to_polyline_with};
use crate::error::{Result, ValleyError};
use crate::field::HeightField;
use crate::path::Polyline;

/// Summary of one carving pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CarveStats {
    pub cells: usize,
    // Cells whose value went down
    pub lowered: usize,
    pub deepest: Option<f32>,
}

/// Lowers every cell of a height field near a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightmapCarver {
    blender: ValleyBlender,
    threshold: f64, // cells at or beyond this distance are left alone
    metric: DistanceMetric,
}

impl HeightmapCarver {
    pub fn new(blender: ValleyBlender, threshold: f64) -> Result<Self> {
        if !(threshold > 0.0) {
            return Err(ValleyError::invalid(format!(
                "carve threshold must be positive, got {}",
                threshold
            )));
        }
        Ok(Self {
            blender,
            threshold,
            metric: DistanceMetric::default(),
        })
    }

    pub fn from_config(config: &ValleyConfig) -> Result<Self> {
        Ok(Self::new(ValleyBlender::from_config(config)?, config.carve_threshold)?
            .with_metric(config.metric))
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn blender(&self) -> &ValleyBlender {
        &self.blender
    }

    // In-place carve of `field` along `path`, cell (x, y) sits at point (x, y)
    pub fn carve(&self, field: &mut HeightField, path: &Polyline) -> Result<CarveStats> {
        if field.is_empty() {
            return Err(ValleyError::CollaboratorUnavailable(
                "height field has not been built".into(),
            ));
        }

        // Cells outside the path box grown by the threshold cannot be reached
        let (lo, hi) = path.bounds();
        let reach_lo = lo - DVec2::splat(self.threshold);
        let reach_hi = hi + DVec2::splat(self.threshold);
        let width = field.width() as f64;
        let height = field.height() as f64;
        if reach_hi.x < 0.0 || reach_hi.y < 0.0 || reach_lo.x > width || reach_lo.y > height {
            tracing::warn!(?lo, ?hi, width, height, "path does not come near the field");
        }

        let mut stats = CarveStats::default();
        for (y, row) in field.rows_mut().enumerate() {
            let py = y as f64;
            for (x, cell) in row.iter_mut().enumerate() {
                stats.cells += 1;
                let p = DVec2::new(x as f64, py);
                if p.cmplt(reach_lo).any() || p.cmpgt(reach_hi).any() {
                    continue;
                }
                let distance = min_distance_to_polyline_with(self.metric, p, path);
                let carved = self.blender.blend(*cell, distance, self.threshold);
                if carved < *cell {
                    stats.lowered += 1;
                    stats.deepest = Some(stats.deepest.map_or(carved, |d| d.min(carved)));
                }
                *cell = carved;
            }
        }

        tracing::info!(
            cells = stats.cells,
            lowered = stats.lowered,
            deepest = ?stats.deepest,
            "carved valley"
        );
        Ok(stats)
    }
}
