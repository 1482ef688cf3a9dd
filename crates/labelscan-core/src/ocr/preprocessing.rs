//! Image preprocessing for label photos.
//!
//! Produces a single-channel image with the text dark-on-light where possible,
//! deskewed, sharpened, denoised and locally contrast-equalized. No resizing
//! happens here.

use image::{DynamicImage, GenericImageView, GrayImage, Luma, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::{bilateral_filter, filter3x3};
use imageproc::hough::{detect_lines, LineDetectionOptions};
use ndarray::Array3;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::PreprocessConfig;

const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Background classification of a label photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundKind {
    /// Dark print on a light background.
    Light,
    /// Light print on a predominantly red background.
    Red,
    /// Light print on a dark background.
    Dark,
}

impl BackgroundKind {
    fn needs_inversion(&self) -> bool {
        !matches!(self, BackgroundKind::Light)
    }
}

/// Image preprocessor for the label pipeline.
#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    /// Create a preprocessor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom configuration.
    pub fn with_config(mut self, config: PreprocessConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the full preprocessing chain.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<GrayImage, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!(
                "empty image: {}x{}",
                width, height
            )));
        }

        debug!("Preprocessing image: {}x{}", width, height);

        let (gray, background) = self.to_gray(image);
        debug!("Background classified as {:?}", background);

        let deskewed = self.deskew(&gray);
        let sharpened = self.sharpen(&deskewed);
        let denoised = self.bilateral_filter(&sharpened);
        let enhanced = self.clahe(&denoised);

        Ok(enhanced)
    }

    /// Classify the background from the color image.
    pub fn classify_background(&self, rgb: &RgbImage) -> BackgroundKind {
        let total = rgb.width() as u64 * rgb.height() as u64;
        if total == 0 {
            return BackgroundKind::Light;
        }

        let red = rgb.pixels().filter(|p| is_red(p.0)).count() as u64;
        let red_ratio = red as f32 / total as f32;
        if red_ratio > self.config.red_ratio_threshold {
            debug!("Red pixel ratio {:.2}", red_ratio);
            return BackgroundKind::Red;
        }

        let gray = DynamicImage::ImageRgb8(rgb.clone()).to_luma8();
        let brightness = mean_brightness(&gray);
        if brightness < self.config.dark_brightness_threshold {
            debug!("Mean brightness {:.1}", brightness);
            return BackgroundKind::Dark;
        }

        BackgroundKind::Light
    }

    /// Grayscale conversion, inverted for red or dark backgrounds.
    pub fn to_gray(&self, image: &DynamicImage) -> (GrayImage, BackgroundKind) {
        let background = self.classify_background(&image.to_rgb8());
        let mut gray = image.to_luma8();
        if background.needs_inversion() {
            for p in gray.pixels_mut() {
                p.0[0] = 255 - p.0[0];
            }
        }
        (gray, background)
    }

    /// Rotate the image so that the dominant near-horizontal lines are level.
    pub fn deskew(&self, gray: &GrayImage) -> GrayImage {
        let edges = canny(gray, self.config.canny_low, self.config.canny_high);
        let lines = detect_lines(
            &edges,
            LineDetectionOptions {
                vote_threshold: self.config.hough_vote_threshold,
                suppression_radius: 8,
            },
        );

        // Hough angles are line normals: 90 is horizontal.
        let mut angles: Vec<f32> = lines
            .iter()
            .map(|l| l.angle_in_degrees as f32 - 90.0)
            .filter(|a| a.abs() < 45.0)
            .collect();

        let Some(angle) = median(&mut angles) else {
            debug!("No text lines found for skew estimation");
            return gray.clone();
        };

        if angle.abs() < self.config.min_skew_degrees {
            return gray.clone();
        }

        info!("Skew corrected: {:.2} degrees ({} lines)", angle, angles.len());
        rotate_about_center(gray, -angle)
    }

    /// High-pass sharpening blended with the original.
    pub fn sharpen(&self, gray: &GrayImage) -> GrayImage {
        let original_weight = self.config.sharpen_original_weight;
        let sharpened = filter3x3::<_, f32, u8>(gray, &SHARPEN_KERNEL);

        let mut out = gray.clone();
        for (pixel, sharp) in out.pixels_mut().zip(sharpened.pixels()) {
            let blended = pixel[0] as f32 * original_weight + sharp[0] as f32 * (1.0 - original_weight);
            pixel[0] = blended.round().clamp(0.0, 255.0) as u8;
        }

        out
    }

    /// Edge-preserving smoothing.
    pub fn bilateral_filter(&self, gray: &GrayImage) -> GrayImage {
        bilateral_filter(
            gray,
            self.config.bilateral_diameter,
            self.config.bilateral_sigma_color,
            self.config.bilateral_sigma_space,
        )
    }

    /// Contrast-limited adaptive histogram equalization.
    pub fn clahe(&self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return gray.clone();
        }

        let tiles_x = self.config.clahe_grid.clamp(1, width) as usize;
        let tiles_y = self.config.clahe_grid.clamp(1, height) as usize;
        let bounds = |tile: usize, tiles: usize, size: u32| -> (u32, u32) {
            let size = size as usize;
            ((tile * size / tiles) as u32, ((tile + 1) * size / tiles) as u32)
        };

        let mut luts = Array3::<u8>::zeros((tiles_y, tiles_x, 256));
        for ty in 0..tiles_y {
            let (y0, y1) = bounds(ty, tiles_y, height);
            for tx in 0..tiles_x {
                let (x0, x1) = bounds(tx, tiles_x, width);

                let mut hist = [0u32; 256];
                for y in y0..y1 {
                    for x in x0..x1 {
                        hist[gray.get_pixel(x, y)[0] as usize] += 1;
                    }
                }

                let area = (x1 - x0) * (y1 - y0);
                let limit = ((self.config.clahe_clip_limit * area as f32 / 256.0) as u32).max(1);
                clip_histogram(&mut hist, limit);

                let scale = 255.0 / area.max(1) as f32;
                let mut cdf = 0u32;
                for (value, count) in hist.iter().enumerate() {
                    cdf += count;
                    luts[[ty, tx, value]] = (cdf as f32 * scale).round().min(255.0) as u8;
                }
            }
        }

        let tile_w = width as f32 / tiles_x as f32;
        let tile_h = height as f32 / tiles_y as f32;
        let mut out = GrayImage::new(width, height);

        for y in 0..height {
            let (ty0, ty1, ay) = neighbor_tiles(y, tile_h, tiles_y);
            for x in 0..width {
                let (tx0, tx1, ax) = neighbor_tiles(x, tile_w, tiles_x);
                let v = gray.get_pixel(x, y)[0] as usize;

                let top = luts[[ty0, tx0, v]] as f32 * (1.0 - ax) + luts[[ty0, tx1, v]] as f32 * ax;
                let bottom = luts[[ty1, tx0, v]] as f32 * (1.0 - ax) + luts[[ty1, tx1, v]] as f32 * ax;
                let value = top * (1.0 - ay) + bottom * ay;
                out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
            }
        }

        out
    }
}

/// Red hue bands (0-20 and 340-360 degrees) with minimum saturation and value of 50/255.
fn is_red([r, g, b]: [u8; 3]) -> bool {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max < 50 || max == min {
        return false;
    }

    let saturation = (max - min) as f32 * 255.0 / max as f32;
    if saturation < 50.0 {
        return false;
    }

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let delta = (max - min) as f32;
    let hue = if max as f32 == r {
        60.0 * ((g - b) / delta)
    } else if max as f32 == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let hue = hue.rem_euclid(360.0);

    hue <= 20.0 || hue >= 340.0
}

fn mean_brightness(gray: &GrayImage) -> f32 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    sum as f32 / count as f32
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Pixel value with coordinates clamped to the image (edge replication).
fn clamped(gray: &GrayImage, x: i64, y: i64) -> f32 {
    let x = x.clamp(0, gray.width() as i64 - 1) as u32;
    let y = y.clamp(0, gray.height() as i64 - 1) as u32;
    gray.get_pixel(x, y)[0] as f32
}

fn bilinear(gray: &GrayImage, x: f32, y: f32) -> f32 {
    let max_x = (gray.width() - 1) as f32;
    let max_y = (gray.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let p00 = clamped(gray, x0 as i64, y0 as i64);
    let p10 = clamped(gray, x0 as i64 + 1, y0 as i64);
    let p01 = clamped(gray, x0 as i64, y0 as i64 + 1);
    let p11 = clamped(gray, x0 as i64 + 1, y0 as i64 + 1);

    let top = p00 * (1.0 - fx) + p10 * fx;
    let bottom = p01 * (1.0 - fx) + p11 * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Rotate clockwise about the image center by `degrees`, replicating edge pixels.
pub fn rotate_about_center(gray: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let sx = cos * dx + sin * dy + cx;
            let sy = -sin * dx + cos * dy + cy;
            let value = bilinear(gray, sx, sy);
            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}

/// Clip histogram bins at `limit` and spread the excess evenly.
fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let share = excess / 256;
    let mut residual = excess % 256;
    for count in hist.iter_mut() {
        *count += share;
    }

    if residual > 0 {
        let step = (256 / residual as usize).max(1);
        for count in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *count += 1;
            residual -= 1;
        }
    }
}

/// Surrounding tile indices and interpolation weight for a pixel coordinate.
fn neighbor_tiles(pos: u32, tile_size: f32, tiles: usize) -> (usize, usize, f32) {
    let f = (pos as f32 + 0.5) / tile_size - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let t0 = (f.floor() as usize).min(tiles - 1);
    let t1 = (t0 + 1).min(tiles - 1);
    let weight = if t0 == t1 { 0.0 } else { f - t0 as f32 };
    (t0, t1, weight)
}
