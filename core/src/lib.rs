// core holds the path generator, the distance field, the valley blender
// and the carver, plus the noise field and image export they work with
pub mod blend;
pub mod carve;
pub mod config;
pub mod distance;
pub mod error;
pub mod field;
pub mod path;
pub mod pipeline;
pub mod render;

pub use blend::{CarveCurve, ValleyBlender};
pub use carve::{CarveStats, HeightmapCarver};
pub use config::{NoiseConfig, SampleBounds, ValleyConfig};
pub use distance::{DistanceMetric, distance_to_segment, min_distance_to_polyline};
pub use error::{Result, ValleyError};
pub use field::{HeightField, PlaneFieldBuilder, perlin_source};
pub use path::{CoordinateMode, PathGenerator, PerturbAxes, Polyline};
pub use pipeline::{ValleyOutput, ValleyPipeline};

pub use glam::DVec2 as Point2D;

// Scalar 2D noise sampled by the field builder.
// Anything implementing `noise::NoiseFn<f64, 2>` qualifies.
pub trait NoiseSource {
    fn sample(&self, x: f64, y: f64) -> f64;
}

impl<N: noise::NoiseFn<f64, 2>> NoiseSource for N {
    #[inline]
    fn sample(&self, x: f64, y: f64) -> f64 {
        self.get([x, y])
    }
}
