use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ValleyConfig;
use crate::error::{Result, ValleyError, try_alloc};

// Which axes of a midpoint receive the random offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerturbAxes {
    Both,
    // Only y moves; the path keeps its horizontal spacing
    #[default]
    Vertical,
    Horizontal,
}

impl PerturbAxes {
    // Draw an offset in [-amplitude, +amplitude] for each selected axis,
    // as a unit draw scaled by the amplitude
    fn offset<R: Rng + ?Sized>(self, amplitude: f64, rng: &mut R) -> DVec2 {
        let mut draw = || {
            if amplitude > 0.0 {
                rng.gen_range(-1.0_f64..=1.0) * amplitude
            } else {
                0.0
            }
        };
        match self {
            PerturbAxes::Both => {
                let dx = draw();
                let dy = draw();
                DVec2::new(dx, dy)
            }
            PerturbAxes::Vertical => DVec2::new(0.0, draw()),
            PerturbAxes::Horizontal => DVec2::new(draw(), 0.0),
        }
    }
}

// How computed points are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateMode {
    #[default]
    Continuous,
    // Integer grid: every computed coordinate is truncated toward zero
    Lattice,
}

impl CoordinateMode {
    #[inline]
    fn snap(self, p: DVec2) -> DVec2 {
        match self {
            CoordinateMode::Continuous => p,
            CoordinateMode::Lattice => p.trunc(),
        }
    }
}

/// Ordered, non-empty sequence of path points.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    points: Vec<DVec2>,
}

impl Polyline {
    pub fn new(points: Vec<DVec2>) -> Result<Self> {
        if points.is_empty() {
            return Err(ValleyError::invalid("a polyline needs at least one point"));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> DVec2 {
        self.points[0]
    }

    pub fn end(&self) -> DVec2 {
        self.points[self.points.len() - 1]
    }

    // Consecutive point pairs, len - 1 of them
    pub fn segments(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    // Axis-aligned (min, max) corners
    pub fn bounds(&self) -> (DVec2, DVec2) {
        self.points.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(lo, hi), &p| (lo.min(p), hi.max(p)),
        )
    }
}

// Index range still waiting for its midpoint
#[derive(Debug, Clone, Copy)]
struct Span {
    before: usize,
    after: usize,
    depth: u32,
}

/// Midpoint-displacement path generator.
///
/// A path of `depth * depth` points is built between two endpoints. Each
/// subdivision writes the midpoint of `[before, after]` at index
/// `(before + after) / 2`, displaced by a random offset whose bound shrinks
/// geometrically with the subdivision level.
///
/// Intervals whose endpoints are adjacent indices are not subdivided: their
/// floor midpoint would land on `before` and overwrite a point that is already
/// set, including the start point. With that rule every slot is written
/// exactly once, because `depth * depth - 1 <= 2^depth` for every depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathGenerator {
    max_amplitude: f64,
    decay_factor: f64,
    axes: PerturbAxes,
    coordinates: CoordinateMode,
}

impl PathGenerator {
    pub fn new(max_amplitude: f64, decay_factor: f64) -> Self {
        Self {
            max_amplitude,
            decay_factor,
            axes: PerturbAxes::default(),
            coordinates: CoordinateMode::default(),
        }
    }

    pub fn from_config(config: &ValleyConfig) -> Self {
        Self::new(config.max_amplitude, config.decay_factor)
            .with_axes(config.axes)
            .with_coordinates(config.coordinates)
    }

    pub fn with_axes(mut self, axes: PerturbAxes) -> Self {
        self.axes = axes;
        self
    }

    pub fn with_coordinates(mut self, coordinates: CoordinateMode) -> Self {
        self.coordinates = coordinates;
        self
    }

    // Offset bound at a subdivision level: max * decay^(level + 1)
    pub fn amplitude(&self, depth: u32) -> f64 {
        self.max_amplitude * self.decay_factor.powf(f64::from(depth) + 1.0)
    }

    /// Build the path for `depth` between `start` and `end`.
    ///
    /// Fails with `InvalidArgument` for depth 0, for a depth whose square
    /// overflows, and for depth 1 when `start != end`: a single slot cannot
    /// keep both endpoints. `AllocationFailure` is returned when the point
    /// buffer cannot be reserved.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        depth: u32,
        start: DVec2,
        end: DVec2,
        rng: &mut R,
    ) -> Result<Polyline> {
        if depth == 0 {
            return Err(ValleyError::invalid("path depth must be at least 1"));
        }
        let len = (depth as usize)
            .checked_mul(depth as usize)
            .ok_or_else(|| ValleyError::invalid(format!("path depth {} is too large", depth)))?;
        if len == 1 && start != end {
            return Err(ValleyError::invalid(
                "depth 1 holds a single point, so start and end must coincide",
            ));
        }

        let mut points: Vec<DVec2> = try_alloc(len, "path points")?;
        points.resize(len, DVec2::ZERO);
        let mut assigned: Vec<bool> = try_alloc(len, "path slot flags")?;
        assigned.resize(len, false);

        points[0] = start;
        points[len - 1] = end;
        assigned[0] = true;
        assigned[len - 1] = true;

        // LIFO worklist, left pushed last so draws follow node-left-right order
        let mut work = vec![Span {
            before: 0,
            after: len - 1,
            depth: 0,
        }];
        let mut placed = 0usize;
        while let Some(span) = work.pop() {
            if span.depth >= depth || span.after - span.before < 2 {
                continue;
            }
            let mid = span.before + (span.after - span.before) / 2;
            let midpoint = self
                .coordinates
                .snap((points[span.before] + points[span.after]) / 2.0);
            let amplitude = self.amplitude(span.depth);
            let offset = self.axes.offset(amplitude, rng);

            debug_assert!(!assigned[mid], "slot {} written twice", mid);
            points[mid] = self.coordinates.snap(midpoint + offset);
            assigned[mid] = true;
            placed += 1;

            work.push(Span {
                before: mid,
                after: span.after,
                depth: span.depth + 1,
            });
            work.push(Span {
                before: span.before,
                after: mid,
                depth: span.depth + 1,
            });
        }

        if let Some(index) = assigned.iter().position(|&set| !set) {
            return Err(ValleyError::IncompletePath { index });
        }

        tracing::debug!(
            depth,
            points = len,
            displaced = placed,
            root_amplitude = self.amplitude(0),
            "generated path"
        );
        Polyline::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn skeleton_x(depth: u32, start: f64, end: f64) -> Vec<f64> {
        let generator = PathGenerator::new(0.0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        generator
            .generate(depth, DVec2::new(start, 0.0), DVec2::new(end, 0.0), &mut rng)
            .unwrap()
            .points()
            .iter()
            .map(|p| p.x)
            .collect()
    }

    #[test]
    fn path_point_count_and_endpoints() {
        let generator = PathGenerator::new(300.0, 0.5).with_axes(PerturbAxes::Both);
        let start = DVec2::new(5.0, 100.0);
        let end = DVec2::new(250.0, 100.0);
        for depth in 2..=9 {
            let mut rng = ChaCha8Rng::seed_from_u64(depth as u64);
            let path = generator.generate(depth, start, end, &mut rng).unwrap();
            assert_eq!(path.len(), (depth * depth) as usize);
            assert_eq!(path.start(), start, "start moved at depth {}", depth);
            assert_eq!(path.end(), end, "end moved at depth {}", depth);
        }
    }

    #[test]
    fn path_depth_one_is_single_point() {
        let generator = PathGenerator::new(300.0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let p = DVec2::new(3.0, 4.0);
        let path = generator.generate(1, p, p, &mut rng).unwrap();
        assert_eq!(path.points(), &[p]);
        assert_eq!(path.segments().count(), 0);

        let err = generator
            .generate(1, p, DVec2::new(9.0, 9.0), &mut rng)
            .unwrap_err();
        assert!(matches!(err, ValleyError::InvalidArgument(_)));
    }

    #[test]
    fn path_zero_depth_rejected() {
        let generator = PathGenerator::new(300.0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = generator
            .generate(0, DVec2::ZERO, DVec2::ONE, &mut rng)
            .unwrap_err();
        assert!(matches!(err, ValleyError::InvalidArgument(_)));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn path_unreservable_buffer_is_allocation_failure() {
        let generator = PathGenerator::new(1.0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = generator
            .generate(u32::MAX, DVec2::ZERO, DVec2::ONE, &mut rng)
            .unwrap_err();
        assert!(matches!(err, ValleyError::AllocationFailure { .. }));
    }

    #[test]
    fn path_huge_amplitude_does_not_panic() {
        let cfg = ValleyConfig {
            max_amplitude: f64::MAX,
            decay_factor: 0.9,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let path = PathGenerator::from_config(&cfg)
            .with_axes(PerturbAxes::Both)
            .generate(cfg.depth, cfg.start, cfg.end, &mut rng)
            .unwrap();
        assert_eq!(path.len(), 25);
        assert_eq!(path.start(), cfg.start);
        assert_eq!(path.end(), cfg.end);
    }

    #[test]
    fn path_amplitude_decays() {
        let generator = PathGenerator::new(300.0, 0.5);
        assert_eq!(generator.amplitude(0), 150.0);
        assert_eq!(generator.amplitude(1), 75.0);
        for d in 1..20 {
            assert!(generator.amplitude(d) < generator.amplitude(d - 1));
        }
    }

    #[test]
    fn path_zero_amplitude_is_straight_skeleton() {
        let xs = skeleton_x(3, 0.0, 10.0);
        assert_eq!(xs, vec![0.0, 1.25, 2.5, 3.75, 5.0, 6.25, 7.5, 8.75, 10.0]);
    }

    #[test]
    fn path_same_seed_same_points() {
        let generator = PathGenerator::new(300.0, 0.5).with_axes(PerturbAxes::Both);
        let a = generator
            .generate(5, DVec2::ZERO, DVec2::new(256.0, 0.0), &mut ChaCha8Rng::seed_from_u64(42))
            .unwrap();
        let b = generator
            .generate(5, DVec2::ZERO, DVec2::new(256.0, 0.0), &mut ChaCha8Rng::seed_from_u64(42))
            .unwrap();
        let c = generator
            .generate(5, DVec2::ZERO, DVec2::new(256.0, 0.0), &mut ChaCha8Rng::seed_from_u64(43))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn path_vertical_offsets_keep_horizontal_spacing() {
        let generator = PathGenerator::new(300.0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let path = generator
            .generate(4, DVec2::new(0.0, 100.0), DVec2::new(15.0, 100.0), &mut rng)
            .unwrap();
        let expected = skeleton_x(4, 0.0, 15.0);
        // Every displacement is bounded by the sum of all level amplitudes
        let bound: f64 = (0..4).map(|d| generator.amplitude(d)).sum();
        for (p, x) in path.points().iter().zip(expected) {
            assert_eq!(p.x, x);
            assert!((p.y - 100.0).abs() <= bound);
        }
        assert!(path.points().iter().any(|p| p.y != 100.0));
    }

    #[test]
    fn path_horizontal_offsets_keep_height() {
        let generator = PathGenerator::new(10.0, 0.5).with_axes(PerturbAxes::Horizontal);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let path = generator
            .generate(5, DVec2::new(0.0, 7.0), DVec2::new(100.0, 7.0), &mut rng)
            .unwrap();
        assert!(path.points().iter().all(|p| p.y == 7.0));
    }

    #[test]
    fn path_root_midpoint_within_first_amplitude() {
        let generator = PathGenerator::new(300.0, 0.5).with_axes(PerturbAxes::Both);
        for seed in 0..32 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let path = generator
                .generate(3, DVec2::ZERO, DVec2::new(80.0, 0.0), &mut rng)
                .unwrap();
            let mid = path.points()[4];
            assert!((mid.x - 40.0).abs() <= 150.0);
            assert!(mid.y.abs() <= 150.0);
        }
    }

    #[test]
    fn path_lattice_points_are_integers() {
        let generator = PathGenerator::new(300.0, 0.5)
            .with_axes(PerturbAxes::Both)
            .with_coordinates(CoordinateMode::Lattice);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let path = generator
            .generate(5, DVec2::new(5.0, 5.0), DVec2::new(400.0, 400.0), &mut rng)
            .unwrap();
        for p in path.points() {
            assert_eq!(p.x.fract(), 0.0);
            assert_eq!(p.y.fract(), 0.0);
        }
    }

    #[test]
    fn polyline_reverse_and_bounds() {
        let line = Polyline::new(vec![
            DVec2::new(0.0, 2.0),
            DVec2::new(4.0, -1.0),
            DVec2::new(6.0, 3.0),
        ])
        .unwrap();
        let rev = line.reversed();
        assert_eq!(rev.start(), line.end());
        assert_eq!(rev.end(), line.start());
        assert_eq!(line.segments().count(), 2);
        assert_eq!(line.bounds(), (DVec2::new(0.0, -1.0), DVec2::new(6.0, 3.0)));
        assert!(Polyline::new(Vec::new()).is_err());
    }
}
