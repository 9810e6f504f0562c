//! Image normalisation: bound the size and flatten to opaque RGB.
//!
//! Vision models charge per image tile, so a 3000 × 4000 phone photo costs
//! many times more than the same page at 768 × 1024 while reading no better.
//! Capping both dimensions keeps each request inside a predictable token
//! budget. The JPEG encoder that follows has no alpha channel, so
//! transparency is composited onto white first (transparent scans otherwise
//! come out black).

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tracing::debug;

/// Target dimensions for an image that exceeds `max_width` × `max_height`.
///
/// Returns `None` when the image already fits. Otherwise both sides are
/// scaled by `min(max_w / w, max_h / h)` and rounded down, never below 1 px.
/// The limiting side lands exactly on its bound; the other side is computed
/// in integers so rounding cannot lose a pixel to float error.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> Option<(u32, u32)> {
    if width <= max_width && height <= max_height {
        return None;
    }
    let (w, h) = (width as u64, height as u64);
    let (max_w, max_h) = (max_width as u64, max_height as u64);

    let (new_w, new_h) = if max_w * h <= max_h * w {
        (max_w, h * max_w / w)
    } else {
        (w * max_h / h, max_h)
    };
    Some((new_w.max(1) as u32, new_h.max(1) as u32))
}

/// Downscale with Lanczos3 when the image exceeds the bounds.
///
/// Images that already fit are returned as-is, without resampling.
pub fn resize_if_needed(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    match fit_within(width, height, max_width, max_height) {
        None => image,
        Some((new_width, new_height)) => {
            debug!(
                "Resizing image from {}x{} to {}x{}",
                width, height, new_width, new_height
            );
            image.resize_exact(new_width, new_height, FilterType::Lanczos3)
        }
    }
}

/// Convert any colour mode to 8-bit RGB, compositing alpha onto white.
pub fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        *dst = Rgb([blend(r), blend(g), blend(b)]);
    }
    out
}

/// Flatten then bound: the full normalisation applied before encoding.
pub fn normalize(image: &DynamicImage, max_width: u32, max_height: u32) -> RgbImage {
    let rgb = DynamicImage::ImageRgb8(flatten_to_rgb(image));
    resize_if_needed(rgb, max_width, max_height).into_rgb8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn within_bounds_passes_through() {
        assert_eq!(fit_within(800, 600, 1024, 1024), None);
        assert_eq!(fit_within(1024, 1024, 1024, 1024), None);

        let img = DynamicImage::new_rgb8(640, 480);
        let out = resize_if_needed(img, 1024, 1024);
        assert_eq!(out.dimensions(), (640, 480));
    }

    #[test]
    fn oversized_respects_bounds_and_aspect() {
        for &(w, h) in &[(2000, 1000), (1000, 3000), (1654, 2339), (4097, 4096), (5000, 7)] {
            let (nw, nh) = fit_within(w, h, 1024, 1024).expect("needs resize");
            assert!(nw <= 1024 && nh <= 1024, "{w}x{h} → {nw}x{nh}");
            // Aspect ratio preserved within one pixel of rounding.
            let expected_h = nw as f64 * h as f64 / w as f64;
            assert!(
                (nh as f64 - expected_h).abs() <= 1.0,
                "{w}x{h} → {nw}x{nh}, expected height ≈ {expected_h}"
            );
        }
    }

    #[test]
    fn rounding_is_floor() {
        // Height-limited: 1654 * 1024 / 2339 = 724.1
        assert_eq!(fit_within(1654, 2339, 1024, 1024), Some((724, 1024)));
        assert_eq!(fit_within(2000, 1000, 1024, 1024), Some((1024, 512)));
        assert_eq!(fit_within(3000, 1001, 1024, 1024), Some((1024, 341)));
    }

    #[test]
    fn extreme_aspect_never_reaches_zero() {
        assert_eq!(fit_within(100_000, 10, 1024, 1024), Some((1024, 1)));
    }

    #[test]
    fn resize_produces_target_dimensions() {
        let img = DynamicImage::new_rgb8(2048, 1024);
        let out = resize_if_needed(img, 1024, 1024);
        assert_eq!(out.dimensions(), (1024, 512));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let rgb = flatten_to_rgb(&img);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn opaque_pixels_are_unchanged() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(flatten_to_rgb(&img).get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn half_alpha_blends_toward_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let Rgb([r, g, b]) = *flatten_to_rgb(&img).get_pixel(0, 0);
        assert_eq!((r, g, b), (127, 127, 127));
    }

    #[test]
    fn grayscale_converts_to_rgb() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([200])));
        let rgb = normalize(&img, 1024, 1024);
        assert_eq!(rgb.dimensions(), (3, 3));
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([200, 200, 200]));
    }
}
