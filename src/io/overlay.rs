//! Pattern-match overlay rendering.

use std::path::Path;

use image::{Rgb, RgbImage};

use super::to_display_rgb;
use crate::error::Result;
use crate::metrics::MatchSegment;
use crate::LinearImage;

/// Colour used for displacement segments.
const SEGMENT_COLOR: Rgb<u8> = Rgb([255, 32, 32]);

/// Draw a segment with Bresenham's algorithm. Pixels outside the image are skipped.
pub fn draw_segment(canvas: &mut RgbImage, segment: &MatchSegment, color: Rgb<u8>) {
    let (mut x0, mut y0) = (segment.from.0.round() as i64, segment.from.1.round() as i64);
    let (x1, y1) = (segment.to.0.round() as i64, segment.to.1.round() as i64);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && y0 >= 0 && (x0 as u32) < canvas.width() && (y0 as u32) < canvas.height() {
            canvas.put_pixel(x0 as u32, y0 as u32, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Render match segments over the display-encoded reference and save it.
pub fn save_match_overlay<P: AsRef<Path>>(
    reference: &LinearImage,
    segments: &[MatchSegment],
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let mut canvas = to_display_rgb(reference);
    for segment in segments {
        draw_segment(&mut canvas, segment, SEGMENT_COLOR);
    }
    canvas.save(path)?;
    log::info!(
        "Wrote match overlay {} ({} segments)",
        path.display(),
        segments.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_segment() {
        let mut canvas = RgbImage::new(8, 4);
        let segment = MatchSegment {
            from: (1.0, 2.0),
            to: (5.0, 2.0),
        };
        draw_segment(&mut canvas, &segment, SEGMENT_COLOR);

        for x in 1..=5 {
            assert_eq!(*canvas.get_pixel(x, 2), SEGMENT_COLOR);
        }
        assert_eq!(canvas.get_pixel(0, 2).0, [0, 0, 0]);
        assert_eq!(canvas.get_pixel(6, 2).0, [0, 0, 0]);
    }

    #[test]
    fn test_segment_clipped_to_canvas() {
        let mut canvas = RgbImage::new(4, 4);
        let segment = MatchSegment {
            from: (-3.0, -3.0),
            to: (6.0, 6.0),
        };
        draw_segment(&mut canvas, &segment, SEGMENT_COLOR);
        for i in 0..4 {
            assert_eq!(*canvas.get_pixel(i, i), SEGMENT_COLOR);
        }
    }

    #[test]
    fn test_save_overlay() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("overlay.png");
        let reference = LinearImage::filled(6, 6, 1, 0.0);
        let segments = vec![MatchSegment {
            from: (0.0, 0.0),
            to: (5.0, 0.0),
        }];

        save_match_overlay(&reference, &segments, &path).unwrap();
        let saved = image::open(&path).unwrap().to_rgb8();
        assert_eq!(*saved.get_pixel(3, 0), SEGMENT_COLOR);
        assert_eq!(saved.get_pixel(3, 3).0, [0, 0, 0]);
    }
}
