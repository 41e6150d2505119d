use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::path::Polyline;

// How the final point-to-point gap is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    // |dx| + |dy|; widens the valley along the diagonals
    Manhattan,
}

impl DistanceMetric {
    #[inline]
    pub fn between(self, a: DVec2, b: DVec2) -> f64 {
        match self {
            DistanceMetric::Euclidean => a.distance(b),
            DistanceMetric::Manhattan => (a - b).abs().element_sum(),
        }
    }
}

// Closest point of segment [a, b] to p
#[inline]
pub fn closest_point_on_segment(p: DVec2, a: DVec2, b: DVec2) -> DVec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return a;
    }
    // Projection parameter onto the infinite line through a and b
    let t = (p - a).dot(ab) / len_sq;
    if t < 0.0 {
        a
    } else if t > 1.0 {
        b
    } else {
        a + t * ab
    }
}

/// Euclidean distance from `p` to the segment `[a, b]`.
pub fn distance_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    distance_to_segment_with(DistanceMetric::Euclidean, p, a, b)
}

pub fn distance_to_segment_with(metric: DistanceMetric, p: DVec2, a: DVec2, b: DVec2) -> f64 {
    metric.between(p, closest_point_on_segment(p, a, b))
}

/// Smallest Euclidean distance from `p` to any segment of the polyline.
pub fn min_distance_to_polyline(p: DVec2, polyline: &Polyline) -> f64 {
    min_distance_to_polyline_with(DistanceMetric::Euclidean, p, polyline)
}

pub fn min_distance_to_polyline_with(
    metric: DistanceMetric,
    p: DVec2,
    polyline: &Polyline,
) -> f64 {
    // A lone point has no segments
    if polyline.len() == 1 {
        return metric.between(p, polyline.start());
    }
    polyline
        .segments()
        .map(|(a, b)| distance_to_segment_with(metric, p, a, b))
        .fold(f64::INFINITY, f64::min)
}
