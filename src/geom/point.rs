//! Typed 2D points.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Add, Sub};

use super::{Normalized, Pixel, Size};

/// A 2D point tagged with its coordinate space.
///
/// `TSpace` is either [`Pixel`] or [`Normalized`]; arithmetic is only
/// defined between points of the same space.
pub struct Point<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Point<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Squared euclidean distance to `other`.
    #[inline]
    pub fn distance2(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance2(other).sqrt()
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Point<Pixel> {
    /// Converts to normalized coordinates relative to `size`.
    pub fn to_normalized(&self, size: Size) -> Point<Normalized> {
        Point::new(self.x / size.width as f64, self.y / size.height as f64)
    }
}

impl Point<Normalized> {
    /// Converts to pixel coordinates for an image of `size`.
    pub fn to_pixel(&self, size: Size) -> Point<Pixel> {
        Point::new(self.x * size.width as f64, self.y * size.height as f64)
    }

    /// Returns true if the point lies inside the unit square.
    #[inline]
    pub fn is_normalized(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

// Manual impls keep these free of `TSpace` bounds.
impl<TSpace> Clone for Point<TSpace> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TSpace> Copy for Point<TSpace> {}

impl<TSpace> PartialEq for Point<TSpace> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl<TSpace> Add for Point<TSpace> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<TSpace> Sub for Point<TSpace> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<TSpace> std::fmt::Debug for Point<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Point({}, {})", self.x, self.y)
    }
}

impl<TSpace> Default for Point<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

// Points are stored as `[x, y]` pairs; custom impls avoid TSpace bounds.
impl<TSpace> Serialize for Point<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.x, self.y).serialize(serializer)
    }
}

impl<'de, TSpace> Deserialize<'de> for Point<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (x, y) = <(f64, f64)>::deserialize(deserializer)?;
        Ok(Point::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_stays_in_space() {
        let a: Point<Normalized> = Point::new(0.25, 0.5);
        let b: Point<Normalized> = Point::new(0.25, 0.25);
        assert_eq!(a + b, Point::new(0.5, 0.75));
        assert_eq!(a - b, Point::new(0.0, 0.25));
        assert_eq!(a.distance2(&b), 0.0625);
    }

    #[test]
    fn pixel_and_normalized_are_inverse() {
        let size = Size::new(200, 100);
        let p: Point<Pixel> = Point::new(50.0, 25.0);
        let n = p.to_normalized(size);
        assert_eq!(n, Point::new(0.25, 0.25));
        assert_eq!(n.to_pixel(size), p);
    }

    #[test]
    fn serializes_as_pair() {
        let p: Point<Normalized> = Point::new(0.5, 0.125);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[0.5,0.125]");
        let back: Point<Normalized> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn is_finite_detects_nan() {
        let p: Point<Pixel> = Point::new(f64::NAN, 1.0);
        assert!(!p.is_finite());
    }
}
