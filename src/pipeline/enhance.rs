//! Fixed enhancement chain applied to every page before OCR.
//!
//! The chain turns a scanned page into a clean black-on-white raster:
//!
//! 1. grayscale
//! 2. auto-contrast (min/max stretch)
//! 3. 5×5 median filter
//! 4. hard threshold at 150
//! 5. 3×3 max filter
//! 6. sharpen
//! 7. contrast ×2.5 around the mean
//!
//! Parameters are fixed. The chain never fails past its boundary: if a step
//! cannot run, [`enhance`] returns the image as of the last completed step
//! together with an [`EnhanceError`] naming the step.

use crate::error::EnhanceError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::median_filter;
use imageproc::morphology::{grayscale_dilate, Mask};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Binarisation cut-off: intensities below become black, the rest white.
pub const BINARIZE_THRESHOLD: u8 = 150;

/// Median window radius. Radius 2 is a 5×5 window.
pub const MEDIAN_RADIUS: u32 = 2;

/// Max-filter reach under the L∞ norm. Reach 1 is a 3×3 window.
pub const MAX_FILTER_RADIUS: u8 = 1;

/// Contrast factor applied in the last step.
pub const CONTRAST_FACTOR: f32 = 2.5;

/// Sharpen kernel, applied with divisor [`SHARPEN_DIVISOR`].
const SHARPEN_KERNEL: [[i32; 3]; 3] = [[-2, -2, -2], [-2, 32, -2], [-2, -2, -2]];
const SHARPEN_DIVISOR: i32 = 16;

/// One step of the enhancement chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnhanceStep {
    Grayscale,
    AutoContrast,
    MedianFilter,
    Binarize,
    MaxFilter,
    Sharpen,
    Contrast,
}

impl EnhanceStep {
    /// Every step, in the order the chain runs them.
    pub const CHAIN: [EnhanceStep; 7] = [
        EnhanceStep::Grayscale,
        EnhanceStep::AutoContrast,
        EnhanceStep::MedianFilter,
        EnhanceStep::Binarize,
        EnhanceStep::MaxFilter,
        EnhanceStep::Sharpen,
        EnhanceStep::Contrast,
    ];

    /// Run this step on a grayscale image.
    ///
    /// `Grayscale` is the identity here; the colour conversion happens once
    /// at the start of [`enhance`].
    pub fn apply(self, image: &GrayImage) -> GrayImage {
        match self {
            EnhanceStep::Grayscale => image.clone(),
            EnhanceStep::AutoContrast => autocontrast(image),
            EnhanceStep::MedianFilter => median_filter(image, MEDIAN_RADIUS, MEDIAN_RADIUS),
            EnhanceStep::Binarize => binarize(image, BINARIZE_THRESHOLD),
            EnhanceStep::MaxFilter => max_filter(image),
            EnhanceStep::Sharpen => sharpen(image),
            EnhanceStep::Contrast => contrast(image, CONTRAST_FACTOR),
        }
    }
}

impl fmt::Display for EnhanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnhanceStep::Grayscale => "grayscale",
            EnhanceStep::AutoContrast => "auto-contrast",
            EnhanceStep::MedianFilter => "median filter",
            EnhanceStep::Binarize => "binarize",
            EnhanceStep::MaxFilter => "max filter",
            EnhanceStep::Sharpen => "sharpen",
            EnhanceStep::Contrast => "contrast",
        };
        f.write_str(name)
    }
}

/// Result of running the chain on one page.
#[derive(Debug, Clone)]
pub struct Enhanced {
    /// Output of the last step that completed.
    pub image: GrayImage,
    /// Steps that ran successfully, in order.
    pub completed: Vec<EnhanceStep>,
    /// Why the chain stopped early, if it did.
    pub error: Option<EnhanceError>,
}

impl Enhanced {
    /// True when all seven steps ran.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.completed.len() == EnhanceStep::CHAIN.len()
    }
}

/// Run the full enhancement chain on `image`.
///
/// Never panics and never returns an error; see [`Enhanced::error`].
pub fn enhance(image: &DynamicImage) -> Enhanced {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        warn!("Skipping enhancement of empty {}x{} image", width, height);
        return Enhanced {
            image: GrayImage::new(width, height),
            completed: Vec::new(),
            error: Some(EnhanceError::EmptyImage { width, height }),
        };
    }

    let mut completed = Vec::with_capacity(EnhanceStep::CHAIN.len());

    let mut current = match run_step(EnhanceStep::Grayscale, || image.to_luma8()) {
        Ok(gray) => gray,
        Err(e) => {
            warn!("Enhancement failed: {}", e);
            return Enhanced {
                image: fallback_gray(image),
                completed,
                error: Some(e),
            };
        }
    };
    completed.push(EnhanceStep::Grayscale);

    for step in EnhanceStep::CHAIN.into_iter().skip(1) {
        match run_step(step, || step.apply(&current)) {
            Ok(next) => {
                current = next;
                completed.push(step);
            }
            Err(e) => {
                warn!("Enhancement stopped after {} step(s): {}", completed.len(), e);
                return Enhanced {
                    image: current,
                    completed,
                    error: Some(e),
                };
            }
        }
    }

    debug!("Enhanced {}x{} image", width, height);
    Enhanced {
        image: current,
        completed,
        error: None,
    }
}

/// The input itself as L8, for when the grayscale step failed.
///
/// Normalised pages are RGB8 or L8; both are converted here without going
/// through the image library. Any other layout yields a blank white page.
fn fallback_gray(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageRgb8(rgb) => {
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                let l = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
                Luma([l as u8])
            })
        }
        other => GrayImage::from_pixel(other.width(), other.height(), Luma([255])),
    }
}

/// Run one step, turning a panic inside an image library into an error.
fn run_step<F>(step: EnhanceStep, f: F) -> Result<GrayImage, EnhanceError>
where
    F: FnOnce() -> GrayImage,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| EnhanceError::StepPanicked {
        step,
        detail: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ── Steps ────────────────────────────────────────────────────────────────

/// Stretch the observed intensity range to 0–255. Flat images are returned
/// unchanged.
pub fn autocontrast(image: &GrayImage) -> GrayImage {
    let mut lo = u8::MAX;
    let mut hi = u8::MIN;
    for p in image.pixels() {
        lo = lo.min(p[0]);
        hi = hi.max(p[0]);
    }
    if hi <= lo {
        return image.clone();
    }

    let (lo, span) = (usize::from(lo), usize::from(hi - lo));
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = (i.saturating_sub(lo) * 255 / span).min(255) as u8;
    }
    map_pixels(image, &lut)
}

/// Hard threshold: `< threshold` → 0, otherwise 255.
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = if i < usize::from(threshold) { 0 } else { 255 };
    }
    map_pixels(image, &lut)
}

/// 3×3 max filter: every pixel becomes the brightest value in its
/// neighbourhood. Pixels outside the image are ignored.
pub fn max_filter(image: &GrayImage) -> GrayImage {
    grayscale_dilate(image, &Mask::square(MAX_FILTER_RADIUS))
}

/// Sharpen with a fixed 3×3 kernel. The one-pixel border is copied as-is.
pub fn sharpen(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = 0i32;
            for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let px = image.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1)[0];
                    acc += weight * i32::from(px);
                }
            }
            let v = (acc / SHARPEN_DIVISOR).clamp(0, 255) as u8;
            out.put_pixel(x, y, Luma([v]));
        }
    }
    out
}

/// Scale each pixel's distance from the rounded mean intensity by `factor`.
pub fn contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return image.clone();
    }
    let sum: u64 = image.pixels().map(|p| u64::from(p[0])).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;

    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = (mean + factor * (i as f32 - mean)).round().clamp(0.0, 255.0) as u8;
    }
    map_pixels(image, &lut)
}

fn map_pixels(image: &GrayImage, lut: &[u8; 256]) -> GrayImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        p[0] = lut[usize::from(p[0])];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 7 + y * 13) % 256) as u8])
        })
    }

    #[test]
    fn binarize_boundary_is_150() {
        let img = GrayImage::from_raw(4, 1, vec![0, 149, 150, 255]).unwrap();
        let out = binarize(&img, BINARIZE_THRESHOLD);
        assert_eq!(out.into_raw(), vec![0, 0, 255, 255]);
    }

    #[test]
    fn autocontrast_stretches_range() {
        let img = GrayImage::from_raw(3, 1, vec![50, 75, 100]).unwrap();
        let out = autocontrast(&img).into_raw();
        assert_eq!(out[0], 0);
        assert_eq!(out[2], 255);
        assert!(out[1] > 100 && out[1] < 140, "got {}", out[1]);
    }

    #[test]
    fn autocontrast_leaves_flat_image_alone() {
        let img = GrayImage::from_pixel(4, 4, Luma([90]));
        assert_eq!(autocontrast(&img), img);
    }

    #[test]
    fn max_filter_grows_white_pixel_to_3x3() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, Luma([255]));
        let out = max_filter(&img);
        let white = out.pixels().filter(|p| p[0] == 255).count();
        assert_eq!(white, 9);
        assert_eq!(out.get_pixel(1, 1)[0], 255);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn sharpen_copies_border_and_keeps_flat_interior() {
        let img = GrayImage::from_pixel(4, 4, Luma([200]));
        let out = sharpen(&img);
        assert_eq!(out, img);
    }

    #[test]
    fn sharpen_tiny_image_is_identity() {
        let img = gradient(2, 2);
        assert_eq!(sharpen(&img), img);
    }

    #[test]
    fn contrast_spreads_values_around_mean() {
        let img = GrayImage::from_raw(2, 1, vec![100, 140]).unwrap();
        let out = contrast(&img, CONTRAST_FACTOR).into_raw();
        // mean 120: 120 ± 2.5 * 20
        assert_eq!(out, vec![70, 170]);
    }

    #[test]
    fn full_chain_produces_binary_output() {
        let img = DynamicImage::ImageLuma8(gradient(40, 30));
        let enhanced = enhance(&img);
        assert!(enhanced.is_complete(), "error: {:?}", enhanced.error);
        assert_eq!(enhanced.completed, EnhanceStep::CHAIN.to_vec());
        assert_eq!(enhanced.image.dimensions(), (40, 30));
        assert!(enhanced.image.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn colour_input_is_accepted() {
        let rgb = image::RgbImage::from_fn(10, 10, |x, _| image::Rgb([x as u8 * 20, 0, 255]));
        let enhanced = enhance(&DynamicImage::ImageRgb8(rgb));
        assert!(enhanced.is_complete());
    }

    #[test]
    fn empty_image_is_reported_not_panicked() {
        let enhanced = enhance(&DynamicImage::new_luma8(0, 0));
        assert_eq!(
            enhanced.error,
            Some(EnhanceError::EmptyImage {
                width: 0,
                height: 0
            })
        );
        assert!(enhanced.completed.is_empty());
    }

    #[test]
    fn single_pixel_image_runs_every_step() {
        let enhanced = enhance(&DynamicImage::new_luma8(1, 1));
        assert!(enhanced.is_complete(), "error: {:?}", enhanced.error);
        assert_eq!(enhanced.image.dimensions(), (1, 1));
    }

    #[test]
    fn panicking_step_is_caught() {
        let err = run_step(EnhanceStep::Sharpen, || panic!("kernel exploded")).unwrap_err();
        match err {
            EnhanceError::StepPanicked { step, detail } => {
                assert_eq!(step, EnhanceStep::Sharpen);
                assert!(detail.contains("kernel exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn step_display_names() {
        assert_eq!(EnhanceStep::MedianFilter.to_string(), "median filter");
        assert_eq!(EnhanceStep::AutoContrast.to_string(), "auto-contrast");
    }

    #[test]
    fn max_filter_takes_neighbourhood_maximum() {
        let img = GrayImage::from_raw(3, 1, vec![10, 20, 30]).unwrap();
        assert_eq!(max_filter(&img).into_raw(), vec![20, 30, 30]);

        let img = GrayImage::from_raw(3, 3, vec![5, 0, 0, 0, 90, 0, 0, 0, 40]).unwrap();
        assert_eq!(
            max_filter(&img).into_raw(),
            vec![90, 90, 90, 90, 90, 90, 90, 90, 90]
        );
        let img = GrayImage::from_raw(4, 1, vec![0, 0, 0, 70]).unwrap();
        assert_eq!(max_filter(&img).into_raw(), vec![0, 0, 70, 70]);
    }

    #[test]
    fn fallback_keeps_the_input_pixels() {
        let gray = GrayImage::from_raw(2, 1, vec![12, 200]).unwrap();
        assert_eq!(fallback_gray(&DynamicImage::ImageLuma8(gray.clone())), gray);

        let rgb = image::RgbImage::from_raw(2, 1, vec![255, 255, 255, 100, 0, 0]).unwrap();
        assert_eq!(
            fallback_gray(&DynamicImage::ImageRgb8(rgb)).into_raw(),
            vec![255, 29]
        );
    }
}
