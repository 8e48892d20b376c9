//! Grayscale conversion and glyph-aspect resizing.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use crate::error::PlaybackError;

/// Output rows for a `src_w` x `src_h` frame scaled to `target_w` columns.
///
/// Console cells are roughly twice as tall as they are wide, so the
/// aspect-preserving height is halved. Never returns less than one row.
pub fn output_height(src_w: u32, src_h: u32, target_w: u32) -> u32 {
    if src_w == 0 {
        return 1;
    }
    // floor(target_w / (src_w / src_h) / 2) without going through floats
    let rows = (target_w as u64 * src_h as u64) / (2 * src_w as u64);
    rows.clamp(1, u32::MAX as u64) as u32
}

/// Collapse an RGB frame to a single luminance channel.
pub fn to_luma(frame: &RgbImage) -> GrayImage {
    imageops::grayscale(frame)
}

/// Resize a luminance frame to `target_w` columns and the halved height.
pub fn resize_luma(frame: GrayImage, target_w: u32) -> Result<GrayImage, PlaybackError> {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return Err(PlaybackError::EmptyFrame);
    }
    let target_w = target_w.max(1);
    let target_h = output_height(w, h, target_w);

    if (w, h) == (target_w, target_h) {
        return Ok(frame);
    }
    Ok(imageops::resize(&frame, target_w, target_h, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn halves_aspect_preserving_height() {
        // 16:9 at 120 columns -> 120 / (16/9) / 2 = 33.75
        assert_eq!(output_height(1920, 1080, 120), 33);
        // 4:3 at 120 columns -> 45
        assert_eq!(output_height(640, 480, 120), 45);
        // square source
        assert_eq!(output_height(100, 100, 80), 40);
    }

    #[test]
    fn clamps_degenerate_heights_to_one_row() {
        assert_eq!(output_height(10_000, 10, 120), 1);
        assert_eq!(output_height(640, 480, 1), 1);
        assert_eq!(output_height(0, 480, 120), 1);
    }

    #[test]
    fn resized_frame_has_exact_target_dimensions() {
        let cases = [(640, 480, 120), (1920, 1080, 80), (33, 700, 50), (5000, 3, 120)];
        for (w, h, tw) in cases {
            let frame = GrayImage::from_pixel(w, h, Luma([90]));
            let out = resize_luma(frame, tw).unwrap();
            assert_eq!(out.dimensions(), (tw, output_height(w, h, tw)), "{w}x{h} -> {tw}");
        }
    }

    #[test]
    fn already_sized_frame_is_untouched() {
        // 4x1 at 4 columns clamps to one row, so nothing changes
        let frame = GrayImage::from_fn(4, 1, |x, _| Luma([x as u8 * 60]));
        let out = resize_luma(frame.clone(), 4).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn empty_frame_is_rejected() {
        let frame = GrayImage::new(0, 0);
        assert!(matches!(resize_luma(frame, 120), Err(PlaybackError::EmptyFrame)));
    }

    #[test]
    fn grayscale_keeps_black_and_white() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([0, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([255, 255, 255]));
        let luma = to_luma(&rgb);
        assert_eq!(luma.get_pixel(0, 0)[0], 0);
        assert_eq!(luma.get_pixel(1, 0)[0], 255);
    }
}
