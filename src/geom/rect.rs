//! Axis-aligned rectangles in XYWH form.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use super::point::Point;
use super::{Normalized, Pixel, Size};

/// An axis-aligned rectangle: top-left corner plus width and height.
///
/// Like the points it is built from, a rectangle is tagged with its
/// coordinate space. Negative widths or heights are representable so that
/// malformed input can be reported instead of rejected at construction.
pub struct Rect<TSpace> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Rect<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            _space: PhantomData,
        }
    }

    /// Creates a rectangle from its two extreme corners.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self::new(xmin, ymin, xmax - xmin, ymax - ymin)
    }

    /// Creates a rectangle from its center and dimensions.
    ///
    /// This is the layout of Darknet label rows.
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    /// Returns `(center_x, center_y, width, height)`.
    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        let c = self.center();
        (c.x, c.y, self.width, self.height)
    }

    /// Smallest rectangle containing every point, or `None` for no points.
    pub fn bounding(points: &[Point<TSpace>]) -> Option<Self> {
        let first = points.first()?;
        let (mut xmin, mut ymin, mut xmax, mut ymax) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            xmin = xmin.min(p.x);
            ymin = ymin.min(p.y);
            xmax = xmax.max(p.x);
            ymax = ymax.max(p.y);
        }
        Some(Self::from_xyxy(xmin, ymin, xmax, ymax))
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Point<TSpace> {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Area of the rectangle. May be negative for malformed rectangles.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Width divided by height; infinite for zero-height rectangles.
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0.0 {
            f64::INFINITY
        } else {
            self.width / self.height
        }
    }

    /// Returns true if width or height is not positive.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// The four corners clockwise from the top-left.
    pub fn vertexes(&self) -> Vec<Point<TSpace>> {
        vec![
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ]
    }

    /// Returns true if `p` lies inside or on the border.
    pub fn contains(&self, p: &Point<TSpace>) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Returns true if `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlap of two rectangles. Disjoint rectangles yield an empty
    /// (zero width or height) rectangle rather than a negative one.
    pub fn intersect(&self, other: &Self) -> Self {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Self::new(x, y, (right - x).max(0.0), (bottom - y).max(0.0))
    }

    /// Smallest rectangle containing both.
    pub fn unite(&self, other: &Self) -> Self {
        Self::from_xyxy(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Grows the rectangle by `n` units on every side.
    pub fn dilate(&self, n: f64) -> Self {
        Self::new(self.x - n, self.y - n, self.width + 2.0 * n, self.height + 2.0 * n)
    }

    /// Moves the rectangle so that `origin` becomes `(0, 0)`.
    pub fn relative_to(&self, origin: &Point<TSpace>) -> Self {
        Self::new(self.x - origin.x, self.y - origin.y, self.width, self.height)
    }
}

impl Rect<Pixel> {
    /// The full frame of an image of `size`.
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width as f64, size.height as f64)
    }

    /// Converts to coordinates normalized by `size`.
    pub fn to_normalized(&self, size: Size) -> Rect<Normalized> {
        let (w, h) = (size.width as f64, size.height as f64);
        Rect::new(self.x / w, self.y / h, self.width / w, self.height / h)
    }
}

impl Rect<Normalized> {
    /// The full unit frame.
    pub fn one() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Converts to pixel coordinates for an image of `size`.
    pub fn to_pixel(&self, size: Size) -> Rect<Pixel> {
        let (w, h) = (size.width as f64, size.height as f64);
        Rect::new(self.x * w, self.y * h, self.width * w, self.height * h)
    }

    /// Returns true if the rectangle lies inside the unit square.
    pub fn is_normalized(&self) -> bool {
        Self::one().contains_rect(self) && self.width >= 0.0 && self.height >= 0.0
    }
}

/// Intersection over union of two rectangles.
///
/// Returns 0 for disjoint rectangles and whenever the union has no area,
/// so degenerate inputs never divide by zero.
pub fn iou<TSpace>(r1: &Rect<TSpace>, r2: &Rect<TSpace>) -> f64 {
    let inter = r1.intersect(r2).area().max(0.0);
    let union = r1.area().max(0.0) + r2.area().max(0.0) - inter;
    if union <= 0.0 || !union.is_finite() {
        return 0.0;
    }
    inter / union
}

/// Anything with an axis-aligned bounding rectangle.
pub trait HasRect<TSpace> {
    fn rect(&self) -> Rect<TSpace>;
}

impl<TSpace> HasRect<TSpace> for Rect<TSpace> {
    fn rect(&self) -> Rect<TSpace> {
        *self
    }
}

impl<TSpace> Clone for Rect<TSpace> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TSpace> Copy for Rect<TSpace> {}

impl<TSpace> PartialEq for Rect<TSpace> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.width == other.width
            && self.height == other.height
    }
}

impl<TSpace> std::fmt::Debug for Rect<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rect")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<TSpace> Default for Rect<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

// Custom serde implementation to avoid TSpace: Serialize/Deserialize bounds
impl<TSpace> Serialize for Rect<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Rect", 4)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.end()
    }
}

impl<'de, TSpace> Deserialize<'de> for Rect<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RectData {
            x: f64,
            y: f64,
            width: f64,
            height: f64,
        }
        let data = RectData::deserialize(deserializer)?;
        Ok(Rect::new(data.x, data.y, data.width, data.height))
    }
}
