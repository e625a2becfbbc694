//! Geometry kernel for annotation polygons.
//!
//! Every point and rectangle carries a coordinate space marker, either
//! [`Pixel`] or [`Normalized`]. Labels are stored normalized to `[0, 1]`
//! relative to the image size; conversions to and from pixels always go
//! through an explicit [`Size`].
//!
//! # Example
//!
//! ```
//! use hoplabel::geom::{iou, Normalized, Rect};
//!
//! let a: Rect<Normalized> = Rect::new(0.0, 0.0, 1.0, 1.0);
//! let b: Rect<Normalized> = Rect::new(0.5, 0.5, 1.0, 1.0);
//! assert!((iou(&a, &b) - 0.25 / 1.75).abs() < 1e-12);
//! ```

mod point;
pub mod polygon;
mod rect;
mod size;
mod space;
pub mod transform;

pub use point::Point;
pub use polygon::{closest_point, contains_point, insert_best, Closest, Polygon};
pub use rect::{iou, HasRect, Rect};
pub use size::Size;
pub use space::{Normalized, Pixel};
pub use transform::{align_down, points_in_window, roi_crop_window};
