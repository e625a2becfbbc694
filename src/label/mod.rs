//! Annotation model: objects, their categories and properties, and the
//! per-image label that owns them.
//!
//! All geometry is stored normalized to the image size.
//!
//! # Example
//!
//! ```
//! use hoplabel::geom::Point;
//! use hoplabel::label::{Category, ImageLabel};
//!
//! let mut label = ImageLabel::only_roi("example", 0);
//! let ob = label.new_object(Point::new(0.5, 0.5));
//! ob.category.value = Category::Objective(2);
//! assert_eq!(label.next_id().as_i64(), 2);
//! ```

mod category;
mod image;
mod object;
mod prob;

pub use category::{
    Category, ObjectId, CAT_ERROR, CAT_EXCLUDED, CAT_PENDING, CAT_ROI, MAX_CLASS_ID,
};
pub use image::{ImageLabel, DEFAULT_EXTEND_PX, LABEL_VERSION};
pub use object::ObjectLabel;
pub use prob::{ProbKind, ProbValue, CONF_ERROR, CONF_EXCLUDED, CONF_MANUAL};

use std::path::PathBuf;

/// An image file and its label.
pub type ImageLabelPair = (PathBuf, ImageLabel);

/// Local time as an RFC 3339 string, used for label time stamps.
pub fn now_iso_string() -> String {
    chrono::Local::now().to_rfc3339()
}
