use noise::{Fbm, MultiFractal, Perlin};

use crate::NoiseSource;
use crate::config::{NoiseConfig, SampleBounds};
use crate::error::{Result, ValleyError, try_alloc};

// 2D height field: row-major, width × height, access as (x, y).
// Values conventionally sit in [-1, +1].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

fn cell_count(width: usize, height: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .ok_or_else(|| ValleyError::invalid(format!("field {}x{} is too large", width, height)))
}

impl HeightField {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Result<Self> {
        let len = cell_count(width, height)?;
        let mut values = try_alloc(len, "height values")?;
        values.resize(len, value);
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Result<Self> {
        let len = cell_count(width, height)?;
        if values.len() != len {
            return Err(ValleyError::invalid(format!(
                "{} values cannot fill a {}x{} field",
                values.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    // From nested rows `rows[y][x]`; every row must be the same length
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some(y) = rows.iter().position(|row| row.len() != width) {
            return Err(ValleyError::invalid(format!(
                "row {} has {} values, expected {}",
                y,
                rows[y].len(),
                width
            )));
        }
        let values = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Self::from_values(width, height, values)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    // No cells: nothing has been built into this field yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn value(&self, x: usize, y: usize) -> Option<f32> {
        self.index(x, y).map(|i| self.values[i])
    }

    pub fn set_value(&mut self, x: usize, y: usize, value: f32) -> Result<()> {
        let i = self.index(x, y).ok_or_else(|| {
            ValleyError::invalid(format!(
                "cell ({}, {}) is outside the {}x{} field",
                x, y, self.width, self.height
            ))
        })?;
        self.values[i] = value;
        Ok(())
    }

    // Flat row-major view
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.width.max(1))
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.values.chunks_exact_mut(self.width.max(1))
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        if self.values.is_empty() {
            return None;
        }
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &v in &self.values {
            min = min.min(v);
            max = max.max(v);
        }
        Some((min, max))
    }
}

// Fractal Perlin noise with the configured octaves, frequency and persistence
pub fn perlin_source(config: &NoiseConfig) -> Fbm<Perlin> {
    Fbm::<Perlin>::new(config.seed)
        .set_octaves(config.octaves)
        .set_frequency(config.frequency)
        .set_persistence(config.persistence)
        .set_lacunarity(config.lacunarity)
}

/// Samples a noise source over a rectangle of noise space, one sample per
/// field cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFieldBuilder {
    width: usize,
    height: usize,
    bounds: SampleBounds,
}

impl PlaneFieldBuilder {
    pub fn new(width: usize, height: usize, bounds: SampleBounds) -> Self {
        Self {
            width,
            height,
            bounds,
        }
    }

    pub fn from_config(config: &NoiseConfig) -> Self {
        Self::new(config.width, config.height, config.bounds)
    }

    pub fn build<S: NoiseSource + ?Sized>(&self, source: &S) -> Result<HeightField> {
        if self.width == 0 || self.height == 0 {
            return Err(ValleyError::invalid(format!(
                "cannot build a {}x{} field",
                self.width, self.height
            )));
        }
        let mut field = HeightField::new(self.width, self.height)?;
        // Cell (x, y) samples the lower-left corner of its slice of the bounds
        let step_x = self.bounds.width() / self.width as f64;
        let step_y = self.bounds.height() / self.height as f64;
        for (y, row) in field.rows_mut().enumerate() {
            let ny = self.bounds.y_min + y as f64 * step_y;
            for (x, cell) in row.iter_mut().enumerate() {
                let nx = self.bounds.x_min + x as f64 * step_x;
                *cell = source.sample(nx, ny) as f32;
            }
        }
        if let Some((min, max)) = field.min_max() {
            tracing::debug!(
                width = self.width,
                height = self.height,
                min,
                max,
                "built noise field"
            );
        }
        Ok(field)
    }
}
