//! Window transforms for cropping labeled images to their ROI.

use super::point::Point;
use super::rect::Rect;
use super::{Normalized, Pixel, Size};

/// Rounds `value` down to a multiple of `align`. An `align` of 0 returns
/// the value unchanged.
#[inline]
pub fn align_down(value: u32, align: u32) -> u32 {
    if align == 0 {
        value
    } else {
        value - value % align
    }
}

/// Re-expresses normalized points in the frame of `window`, itself given in
/// normalized coordinates of the same image.
///
/// A point at the window's top-left maps to `(0, 0)` and one at its
/// bottom-right maps to `(1, 1)`. Degenerate windows leave the points as
/// they are.
pub fn points_in_window(points: &[Point<Normalized>], window: &Rect<Normalized>) -> Vec<Point<Normalized>> {
    if window.is_degenerate() {
        return points.to_vec();
    }
    points
        .iter()
        .map(|p| {
            Point::new(
                (p.x - window.x) / window.width,
                (p.y - window.y) / window.height,
            )
        })
        .collect()
}

/// Computes the crop window for an ROI.
///
/// The ROI is converted to pixels, grown by `extend_px` on every side,
/// clipped to the image, and its width and height are rounded down to a
/// multiple of 4. The result is returned normalized by `size`.
pub fn roi_crop_window(roi: &Rect<Normalized>, size: Size, extend_px: u32) -> Rect<Normalized> {
    let frame = Rect::<Pixel>::from_size(size);
    let mut r = roi.to_pixel(size).dilate(extend_px as f64).intersect(&frame);

    let x = r.x.floor();
    let y = r.y.floor();
    r.width = align_down((r.right() - x).max(0.0) as u32, 4) as f64;
    r.height = align_down((r.bottom() - y).max(0.0) as u32, 4) as f64;
    r.x = x;
    r.y = y;

    r.to_normalized(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_down_rounds_to_multiple() {
        assert_eq!(align_down(58, 4), 56);
        assert_eq!(align_down(56, 4), 56);
        assert_eq!(align_down(3, 4), 0);
        assert_eq!(align_down(7, 0), 7);
    }

    #[test]
    fn crop_window_is_aligned_and_inside_image() {
        let size = Size::new(100, 100);
        let roi = Rect::new(0.25, 0.25, 0.5, 0.5);
        let w = roi_crop_window(&roi, size, 4);
        let px = w.to_pixel(size);
        assert!((px.x - 21.0).abs() < 1e-9);
        assert!((px.y - 21.0).abs() < 1e-9);
        assert_eq!(px.width.round() as u32 % 4, 0);
        assert_eq!(px.height.round() as u32 % 4, 0);
        assert!((px.width - 56.0).abs() < 1e-9);
        assert!(w.is_normalized());
    }

    #[test]
    fn crop_window_clipped_by_image_border() {
        let size = Size::new(100, 60);
        let roi = Rect::one();
        let w = roi_crop_window(&roi, size, 4);
        let px = w.to_pixel(size);
        assert!((px.x).abs() < 1e-9);
        assert!((px.width - 100.0).abs() < 1e-9);
        assert!((px.height - 60.0).abs() < 1e-9);
    }

    #[test]
    fn points_map_into_window_frame() {
        let window = Rect::new(0.25, 0.25, 0.5, 0.5);
        let pts = vec![Point::new(0.25, 0.25), Point::new(0.5, 0.75)];
        let mapped = points_in_window(&pts, &window);
        assert_eq!(mapped[0], Point::new(0.0, 0.0));
        assert_eq!(mapped[1], Point::new(0.5, 1.0));
    }
}
