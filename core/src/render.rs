//! Bitmap export of a finished height field.
//!
//! Grayscale maps [-1, +1] straight to luminance. The color renderer runs each
//! height through a gradient and can shade it with a fixed 45° light, using
//! neighbouring heights as the slope. The format of the written file follows
//! its extension.

use std::path::Path;

use glam::DVec2;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use palette::{Gradient, LinSrgb};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValleyError};
use crate::field::HeightField;
use crate::path::Polyline;

const LIGHT_AZIMUTH: f32 = std::f32::consts::FRAC_PI_4; // 45°
const LIGHT_ELEVATION: f32 = std::f32::consts::FRAC_PI_4; // 45°

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub threshold: f32,
    pub color: [u8; 3],
}

/// Ordered color stops over height values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorGradient {
    stops: Vec<GradientStop>,
}

impl ColorGradient {
    pub fn new(stops: Vec<GradientStop>) -> Result<Self> {
        if stops.len() < 2 {
            return Err(ValleyError::invalid("a gradient needs at least two stops"));
        }
        if let Some(w) = stops
            .windows(2)
            .find(|w| !(w[0].threshold < w[1].threshold))
        {
            return Err(ValleyError::invalid(format!(
                "gradient thresholds must increase, got {} then {}",
                w[0].threshold, w[1].threshold
            )));
        }
        Ok(Self { stops })
    }

    // Deep water through shore, sand, grass, dirt and rock up to snow
    pub fn terrain() -> Self {
        let stop = |threshold, color| GradientStop { threshold, color };
        Self {
            stops: vec![
                stop(-1.0000, [0, 0, 128]),     // deeps
                stop(-0.2500, [0, 0, 255]),     // shallow
                stop(0.0000, [0, 128, 255]),    // shore
                stop(0.0625, [240, 240, 64]),   // sand
                stop(0.1250, [32, 160, 0]),     // grass
                stop(0.3750, [224, 224, 0]),    // dirt
                stop(0.7500, [128, 128, 128]),  // rock
                stop(1.0000, [255, 255, 255]),  // snow
            ],
        }
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    fn to_palette(&self) -> Gradient<LinSrgb> {
        Gradient::with_domain(
            self.stops
                .iter()
                .map(|s| {
                    let [r, g, b] = s.color;
                    (
                        s.threshold,
                        LinSrgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0),
                    )
                })
                .collect(),
        )
    }
}

/// Directional shading; contrast scales slopes, brightness scales the result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lighting {
    pub contrast: f32,
    pub brightness: f32,
}

impl Default for Lighting {
    // Flat ground comes out at exactly the gradient color with these
    fn default() -> Self {
        Self {
            contrast: 3.0,
            brightness: 2.0,
        }
    }
}

impl Lighting {
    // Light factor from the heights left/right and below/above a cell
    fn intensity(&self, left: f32, right: f32, down: f32, up: f32) -> f32 {
        let (sin_el, cos_el) = LIGHT_ELEVATION.sin_cos();
        let (sin_az, cos_az) = LIGHT_AZIMUTH.sin_cos();
        let ambient = std::f32::consts::SQRT_2 * sin_el / 2.0;
        let tilt = (1.0 - ambient) * self.contrast * std::f32::consts::SQRT_2 * cos_el;
        let ix = tilt * cos_az;
        let iy = tilt * sin_az;
        let lambert = (ix * (left - right) + iy * (down - up) + ambient).max(0.0);
        lambert * self.brightness
    }
}

fn ensure_built(field: &HeightField) -> Result<(u32, u32)> {
    if field.is_empty() {
        return Err(ValleyError::CollaboratorUnavailable(
            "nothing to export: height field is empty".into(),
        ));
    }
    let w = u32::try_from(field.width())
        .map_err(|_| ValleyError::invalid("field is too wide for an image"))?;
    let h = u32::try_from(field.height())
        .map_err(|_| ValleyError::invalid("field is too tall for an image"))?;
    Ok((w, h))
}

#[inline]
fn to_gray(v: f32) -> u8 {
    ((v.clamp(-1.0, 1.0) + 1.0) * 0.5 * 255.0).round() as u8
}

// [-1, +1] to 0..=255, values outside are clamped
pub fn render_grayscale(field: &HeightField) -> Result<GrayImage> {
    let (w, h) = ensure_built(field)?;
    let mut img = GrayImage::new(w, h);
    for (y, row) in field.rows().enumerate() {
        for (x, &v) in row.iter().enumerate() {
            img.put_pixel(x as u32, y as u32, Luma([to_gray(v)]));
        }
    }
    Ok(img)
}

pub fn render_color(
    field: &HeightField,
    gradient: &ColorGradient,
    lighting: Option<Lighting>,
) -> Result<RgbImage> {
    let (w, h) = ensure_built(field)?;
    let palette = gradient.to_palette();
    let (fw, fh) = (field.width(), field.height());
    let at = |x: usize, y: usize| field.values()[y * fw + x];

    let mut img = RgbImage::new(w, h);
    for y in 0..fh {
        for x in 0..fw {
            let v = at(x, y);
            let col: LinSrgb = palette.get(v);
            let rgb = col.into_format::<u8>();
            let light = match lighting {
                Some(l) => {
                    // Edge cells reuse their own height for the missing neighbour
                    let left = at(x.saturating_sub(1), y);
                    let right = at((x + 1).min(fw - 1), y);
                    let down = at(x, y.saturating_sub(1));
                    let up = at(x, (y + 1).min(fh - 1));
                    l.intensity(left, right, down, up)
                }
                None => 1.0,
            };
            let shade = |c: u8| (c as f32 * light).round().clamp(0.0, 255.0) as u8;
            img.put_pixel(
                x as u32,
                y as u32,
                Rgb([shade(rgb.red), shade(rgb.green), shade(rgb.blue)]),
            );
        }
    }
    Ok(img)
}

// Draw the path as a one-pixel line strip; parts off the image are skipped
pub fn overlay_path(img: &mut RgbImage, path: &Polyline, color: [u8; 3]) {
    let (w, h) = img.dimensions();
    let mut plot = |x: f64, y: f64| {
        let (px, py) = (x.round(), y.round());
        if px >= 0.0 && py >= 0.0 && px < w as f64 && py < h as f64 {
            img.put_pixel(px as u32, py as u32, Rgb(color));
        }
    };
    if path.len() == 1 {
        let p = path.start();
        plot(p.x, p.y);
        return;
    }
    let (lo, hi) = (DVec2::ZERO, DVec2::new(f64::from(w) - 1.0, f64::from(h) - 1.0));
    for (a, b) in path.segments() {
        let Some((a, b)) = clip_segment(a, b, lo, hi) else {
            continue;
        };
        let delta = b - a;
        let steps = delta.abs().max_element().ceil().max(1.0) as usize;
        for i in 0..=steps {
            let p = a + delta * (i as f64 / steps as f64);
            plot(p.x, p.y);
        }
    }
}

// Liang-Barsky clip of [a, b] to the box [lo, hi]
fn clip_segment(a: DVec2, b: DVec2, lo: DVec2, hi: DVec2) -> Option<(DVec2, DVec2)> {
    if !a.is_finite() || !b.is_finite() || hi.x < lo.x || hi.y < lo.y {
        return None;
    }
    let d = b - a;
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-d.x, a.x - lo.x),
        (d.x, hi.x - a.x),
        (-d.y, a.y - lo.y),
        (d.y, hi.y - a.y),
    ] {
        if p == 0.0 {
            // Parallel to this edge and outside it
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }
    }
    Some((a + d * t0, a + d * t1))
}

pub fn save(image: impl Into<DynamicImage>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    image.into().save(path)?;
    tracing::info!(path = %path.display(), "saved image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_grayscale_maps_unit_range() {
        let field = HeightField::from_values(4, 1, vec![-1.0, 0.0, 1.0, 3.0]).unwrap();
        let img = render_grayscale(&field).unwrap();
        assert_eq!(img.dimensions(), (4, 1));
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 128);
        assert_eq!(img.get_pixel(2, 0)[0], 255);
        // Clamped
        assert_eq!(img.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn render_color_hits_stop_colors() {
        let field = HeightField::from_values(2, 1, vec![-1.0, 1.0]).unwrap();
        let img = render_color(&field, &ColorGradient::terrain(), None).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 128]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn render_flat_light_keeps_color() {
        let field = HeightField::filled(5, 5, 0.75).unwrap();
        let lit = render_color(&field, &ColorGradient::terrain(), Some(Lighting::default())).unwrap();
        let unlit = render_color(&field, &ColorGradient::terrain(), None).unwrap();
        assert_eq!(lit, unlit);
    }

    #[test]
    fn render_slope_changes_shading() {
        // Ramp rising to the right faces away from a light in the +x +y quadrant
        let values: Vec<f32> = (0..25).map(|i| (i % 5) as f32 * 0.1 - 0.2).collect();
        let field = HeightField::from_values(5, 5, values).unwrap();
        let lit = render_color(&field, &ColorGradient::terrain(), Some(Lighting::default())).unwrap();
        let unlit = render_color(&field, &ColorGradient::terrain(), None).unwrap();
        assert_ne!(lit.get_pixel(2, 2), unlit.get_pixel(2, 2));
    }

    #[test]
    fn render_empty_field_unavailable() {
        let err = render_grayscale(&HeightField::default()).unwrap_err();
        assert!(matches!(err, ValleyError::CollaboratorUnavailable(_)));
    }

    #[test]
    fn gradient_rejects_unordered_stops() {
        let stops = vec![
            GradientStop {
                threshold: 0.5,
                color: [0, 0, 0],
            },
            GradientStop {
                threshold: 0.5,
                color: [255, 255, 255],
            },
        ];
        assert!(ColorGradient::new(stops).is_err());
        assert!(ColorGradient::new(ColorGradient::terrain().stops().to_vec()).is_ok());
    }

    #[test]
    fn overlay_draws_connected_strip() {
        let mut img = RgbImage::new(10, 10);
        let path = Polyline::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(9.0, 0.0),
            DVec2::new(9.0, 9.0),
            DVec2::new(20.0, 9.0),
        ])
        .unwrap();
        overlay_path(&mut img, &path, [255, 0, 0]);
        for x in 0..10 {
            assert_eq!(img.get_pixel(x, 0).0, [255, 0, 0]);
        }
        for y in 0..10 {
            assert_eq!(img.get_pixel(9, y).0, [255, 0, 0]);
        }
        assert_eq!(img.get_pixel(4, 4).0, [0, 0, 0]);
    }

    #[test]
    fn overlay_clips_far_segments() {
        let mut img = RgbImage::new(10, 10);
        let path = Polyline::new(vec![
            DVec2::new(-1e12, 5.0),
            DVec2::new(1e12, 5.0),
            DVec2::new(1e12, -1e12),
        ])
        .unwrap();
        overlay_path(&mut img, &path, [255, 0, 0]);
        for (x, y, px) in img.enumerate_pixels() {
            let expected = if y == 5 { [255, 0, 0] } else { [0, 0, 0] };
            assert_eq!(px.0, expected, "pixel ({}, {})", x, y);
        }
    }

    #[test]
    fn save_writes_bmp_and_png() {
        let field = HeightField::filled(6, 4, 0.1).unwrap();
        let dir = std::env::temp_dir();
        let bmp = dir.join("valley_core_render_test.bmp");
        let png = dir.join("valley_core_render_test.png");
        save(render_grayscale(&field).unwrap(), &bmp).unwrap();
        save(render_color(&field, &ColorGradient::terrain(), None).unwrap(), &png).unwrap();
        let back = image::open(&png).unwrap();
        assert_eq!((back.width(), back.height()), (6, 4));
        assert!(std::fs::metadata(&bmp).unwrap().len() > 0);
        let _ = std::fs::remove_file(bmp);
        let _ = std::fs::remove_file(png);
    }
}
