//! Coordinate space marker types.
//!
//! Every geometric value carries one of these zero-sized types so that
//! normalized and pixel coordinates cannot be mixed without an explicit
//! transform.

use std::fmt;

/// Marker for absolute pixel coordinates.
///
/// `(0, 0)` is the top-left corner of the image and one unit is one pixel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker for normalized coordinates in `[0, 1] x [0, 1]`, relative to the
/// image width and height.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
