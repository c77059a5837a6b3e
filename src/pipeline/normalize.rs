//! Colour-mode normalisation before enhancement.
//!
//! Decoders and pdfium hand back whatever pixel layout the source had. The
//! enhancer only needs to know it is working with full colour or grayscale,
//! so everything else is folded into one of those two.

use image::DynamicImage;

/// Colour family of a page image after normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// 8-bit RGB.
    Rgb,
    /// 8-bit luminance.
    Gray,
    /// Anything else (alpha, 16-bit, float).
    Other,
}

impl ColorMode {
    pub fn of(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(_) => ColorMode::Rgb,
            DynamicImage::ImageLuma8(_) => ColorMode::Gray,
            _ => ColorMode::Other,
        }
    }
}

/// Bring `image` into RGB8 or L8.
///
/// RGB8 and L8 pass through untouched. Layouts carrying an alpha channel
/// (palette images arrive here already expanded to RGBA) become RGB8 with the
/// alpha dropped. Everything else becomes L8. Never fails; idempotent.
pub fn normalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => image,
        ref img if img.color().has_alpha() => DynamicImage::ImageRgb8(img.to_rgb8()),
        img => DynamicImage::ImageLuma8(img.to_luma8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, LumaA, Rgb, Rgba};

    #[test]
    fn rgb_and_gray_pass_through() {
        let rgb = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(2, 2, Rgb([1, 2, 3])));
        let out = normalize(rgb.clone());
        assert_eq!(out, rgb);

        let gray = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(2, 2, Luma([7])));
        assert_eq!(normalize(gray.clone()), gray);
    }

    #[test]
    fn alpha_becomes_rgb() {
        let rgba = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(2, 2, Rgba([10, 20, 30, 0])));
        let out = normalize(rgba);
        assert_eq!(ColorMode::of(&out), ColorMode::Rgb);
        assert_eq!(out.to_rgb8().get_pixel(0, 0), &Rgb([10, 20, 30]));

        let la = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(1, 1, LumaA([5, 255])));
        assert_eq!(ColorMode::of(&normalize(la)), ColorMode::Rgb);
    }

    #[test]
    fn other_layouts_become_gray() {
        let wide = DynamicImage::ImageRgb16(ImageBuffer::from_pixel(2, 1, Rgb([0u16, 0, 0])));
        assert_eq!(ColorMode::of(&wide), ColorMode::Other);
        assert_eq!(ColorMode::of(&normalize(wide)), ColorMode::Gray);

        let luma16 = DynamicImage::ImageLuma16(ImageBuffer::from_pixel(1, 1, Luma([60000u16])));
        assert_eq!(ColorMode::of(&normalize(luma16)), ColorMode::Gray);
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = vec![
            DynamicImage::new_rgba8(3, 3),
            DynamicImage::new_rgb16(3, 3),
            DynamicImage::new_luma8(3, 3),
            DynamicImage::new_luma_a16(3, 3),
        ];
        for img in inputs {
            let once = normalize(img);
            let twice = normalize(once.clone());
            assert_eq!(ColorMode::of(&once), ColorMode::of(&twice));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn empty_image_does_not_fail() {
        let out = normalize(DynamicImage::new_rgba8(0, 0));
        assert_eq!(out.width(), 0);
    }
}
