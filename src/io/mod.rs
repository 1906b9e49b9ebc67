//! Loading and saving linear-light images.
//!
//! Files on disk hold display-encoded 8-bit samples. On load they are
//! normalized to [0, 1] and raised to [`DECODE_GAMMA`]; on save the inverse
//! curve is applied and the result rounded back to 8 bits.

mod overlay;

pub use overlay::{draw_segment, save_match_overlay};

use std::path::Path;

use image::{ColorType, DynamicImage, GenericImageView, RgbImage};

use crate::error::{EvalError, Result};
use crate::LinearImage;

/// Exponent used to linearize display-encoded samples.
pub const DECODE_GAMMA: f32 = 2.2;

/// Decode one 8-bit display sample to linear light.
#[inline]
pub fn decode_sample(value: u8) -> f32 {
    (value as f32 / 255.0).powf(DECODE_GAMMA)
}

/// Encode one linear sample to 8-bit display space.
///
/// Values outside [0, 1] are clamped first; NaN encodes as 0.
#[inline]
pub fn encode_sample(value: f32) -> u8 {
    (value.clamp(0.0, 1.0).powf(1.0 / DECODE_GAMMA) * 255.0).round() as u8
}

/// ITU-R 601-2 luma with the fixed-point rounding common imaging libraries use.
#[inline]
pub fn luma_601(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(u32::from);
    ((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8
}

/// Convert an already-decoded image to linear light.
///
/// With `grayscale` set, the result has one luminance channel. Otherwise the
/// source channel layout (L, LA, RGB or RGBA) is kept. Samples wider than
/// 8 bits are reduced to 8 bits first.
pub fn decode_linear(image: &DynamicImage, grayscale: bool) -> LinearImage {
    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);

    let (channels, samples) = if grayscale {
        let rgb = image.to_rgb8();
        let luma: Vec<u8> = rgb.pixels().map(|p| luma_601(p.0)).collect();
        (1, luma)
    } else {
        match image.color().channel_count() {
            1 => (1, image.to_luma8().into_raw()),
            2 => (2, image.to_luma_alpha8().into_raw()),
            3 => (3, image.to_rgb8().into_raw()),
            _ => (4, image.to_rgba8().into_raw()),
        }
    };

    let lut: Vec<f32> = (0..=255u8).map(decode_sample).collect();
    LinearImage::from_fn(height, width, channels, |y, x, c| {
        lut[samples[(y * width + x) * channels + c] as usize]
    })
}

/// Load an image file as linear light.
///
/// # Errors
///
/// Returns [`EvalError::Image`] when the file is missing or cannot be decoded.
pub fn load_linear<P: AsRef<Path>>(path: P, grayscale: bool) -> Result<LinearImage> {
    let path = path.as_ref();
    let decoded = image::open(path)?;
    let linear = decode_linear(&decoded, grayscale);
    log::info!(
        "Loaded {} ({}, grayscale={})",
        path.display(),
        linear.shape(),
        grayscale
    );
    Ok(linear)
}

/// Encode every sample of a linear image to 8-bit display space, row-major.
pub fn to_display_bytes(image: &LinearImage) -> Vec<u8> {
    image.data().iter().map(|&v| encode_sample(v)).collect()
}

/// Encode a linear image to an 8-bit RGB image.
///
/// Single-channel images are replicated to three channels; an alpha channel
/// is dropped. An image without channels encodes as black.
pub fn to_display_rgb(image: &LinearImage) -> RgbImage {
    let channels = image.channels();
    RgbImage::from_fn(image.width() as u32, image.height() as u32, |x, y| {
        if channels == 0 {
            return image::Rgb([0, 0, 0]);
        }
        let (x, y) = (x as usize, y as usize);
        let sample = |c: usize| encode_sample(image.get(y, x, c.min(channels - 1)));
        if channels < 3 {
            let v = sample(0);
            image::Rgb([v, v, v])
        } else {
            image::Rgb([sample(0), sample(1), sample(2)])
        }
    })
}

/// Save a linear image, re-encoding it to display space.
///
/// The file format is chosen from the extension. Existing files are
/// overwritten.
///
/// # Errors
///
/// Returns [`EvalError::InvalidParameter`] for channel counts other than
/// 1 to 4, and [`EvalError::Image`] when encoding or writing fails.
pub fn save_srgb<P: AsRef<Path>>(image: &LinearImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let color = match image.channels() {
        1 => ColorType::L8,
        2 => ColorType::La8,
        3 => ColorType::Rgb8,
        4 => ColorType::Rgba8,
        n => {
            return Err(EvalError::InvalidParameter(format!(
                "cannot save image with {} channels",
                n
            )))
        }
    };

    let bytes = to_display_bytes(image);
    image::save_buffer(
        path,
        &bytes,
        image.width() as u32,
        image.height() as u32,
        color,
    )?;

    log::info!("Wrote {} ({})", path.display(), image.shape());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_gamma_round_trip_all_values() {
        for value in 0..=255u8 {
            let back = encode_sample(decode_sample(value));
            assert!(
                (back as i32 - value as i32).abs() <= 1,
                "{} came back as {}",
                value,
                back
            );
        }
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        assert_eq!(encode_sample(-3.0), 0);
        assert_eq!(encode_sample(42.0), 255);
        assert_eq!(encode_sample(f32::NAN), 0);
    }

    #[test]
    fn test_decode_endpoints() {
        assert_eq!(decode_sample(0), 0.0);
        assert!((decode_sample(255) - 1.0).abs() < 1e-6);
        // Mid gray is darker in linear light
        assert!(decode_sample(128) < 0.25);
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma_601([255, 0, 0]), 76);
        assert_eq!(luma_601([0, 255, 0]), 150);
        assert_eq!(luma_601([0, 0, 255]), 29);
        assert_eq!(luma_601([200, 200, 200]), 200);
    }

    #[test]
    fn test_decode_linear_keeps_channels() {
        let rgba = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255]));
        let dynamic = DynamicImage::ImageRgba8(rgba);

        let color = decode_linear(&dynamic, false);
        assert_eq!(color.channels(), 4);
        assert_eq!(color.height(), 2);
        assert_eq!(color.width(), 3);
        assert!((color.get(1, 2, 0) - 1.0).abs() < 1e-6);

        let gray = decode_linear(&dynamic, true);
        assert_eq!(gray.channels(), 1);
        assert!((gray.get(0, 0, 0) - decode_sample(76)).abs() < 1e-6);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.png");
        let resaved = dir.path().join("resaved.png");

        let original = image::RgbImage::from_fn(16, 8, |x, y| {
            Rgb([(x * 16) as u8, (y * 32) as u8, ((x + y) * 7) as u8])
        });
        original.save(&source).unwrap();

        let linear = load_linear(&source, false).unwrap();
        assert_eq!(linear.channels(), 3);
        save_srgb(&linear, &resaved).unwrap();

        let reloaded = image::open(&resaved).unwrap().to_rgb8();
        for (a, b) in original.pixels().zip(reloaded.pixels()) {
            for c in 0..3 {
                assert!((a.0[c] as i32 - b.0[c] as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_grayscale_save_is_single_channel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gray.png");

        let gray = GrayImage::from_pixel(4, 4, Luma([128]));
        DynamicImage::ImageLuma8(gray).save(&path).unwrap();

        let linear = load_linear(&path, true).unwrap();
        save_srgb(&linear, &path).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.color(), ColorType::L8);
        assert_eq!(reloaded.to_luma8().get_pixel(2, 2).0[0], 128);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = load_linear("no/such/capture.png", true);
        assert!(matches!(result, Err(EvalError::Image(_))));
    }

    #[test]
    fn test_save_rejects_unusual_channel_count() {
        let dir = TempDir::new().unwrap();
        let image = LinearImage::filled(2, 2, 5, 0.5);
        let result = save_srgb(&image, dir.path().join("five.png"));
        assert!(matches!(result, Err(EvalError::InvalidParameter(_))));
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let image = LinearImage::filled(2, 2, 1, 0.5);
        let result = save_srgb(&image, dir.path().join("missing/out.png"));
        assert!(matches!(result, Err(EvalError::Image(_))));
    }

    #[test]
    fn test_to_display_rgb_without_channels_is_black() {
        let image = LinearImage::filled(2, 3, 0, 0.0);
        let rgb = to_display_rgb(&image);
        assert_eq!(rgb.dimensions(), (3, 2));
        assert!(rgb.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_to_display_rgb_replicates_gray() {
        let image = LinearImage::filled(2, 2, 1, 1.0);
        let rgb = to_display_rgb(&image);
        assert_eq!(rgb.get_pixel(1, 1).0, [255, 255, 255]);
    }
}
