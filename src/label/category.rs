//! Object ids and categories.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HoplabelError;

/// Identifier of an object within one image label.
///
/// `0` means "not assigned yet"; real ids start at 1.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub i64);

impl ObjectId {
    pub const UNASSIGNED: ObjectId = ObjectId(0);

    #[inline]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.0 > 0
    }

    /// The id following this one.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire value of [`Category::Roi`].
pub const CAT_ROI: i32 = -9;
/// Wire value of [`Category::Error`].
pub const CAT_ERROR: i32 = -3;
/// Wire value of [`Category::Excluded`].
pub const CAT_EXCLUDED: i32 = -2;
/// Wire value of [`Category::Pending`].
pub const CAT_PENDING: i32 = -1;
/// Largest class index that fits the integer wire form. Readers of
/// external formats reject anything above it.
pub const MAX_CLASS_ID: u32 = i32::MAX as u32;

/// The category of an object.
///
/// Only [`Category::Objective`] denotes a real, trainable object class; the
/// other variants mark the region of interest or objects that still need a
/// decision. On disk a category is a single integer, with the special
/// variants encoded as negative numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Category {
    Objective(u32),
    Roi,
    Excluded,
    Pending,
    Error,
}

impl Category {
    /// The integer stored on disk and used as meta category id.
    ///
    /// Objective classes never exceed [`MAX_CLASS_ID`].
    pub fn id(&self) -> i32 {
        match self {
            Category::Objective(id) => *id as i32,
            Category::Roi => CAT_ROI,
            Category::Error => CAT_ERROR,
            Category::Excluded => CAT_EXCLUDED,
            Category::Pending => CAT_PENDING,
        }
    }

    /// Decodes a wire value. Negative values other than the four special
    /// markers are rejected.
    pub fn from_id(value: i32) -> Result<Self, HoplabelError> {
        match value {
            v if v >= 0 => Ok(Category::Objective(v as u32)),
            CAT_ROI => Ok(Category::Roi),
            CAT_ERROR => Ok(Category::Error),
            CAT_EXCLUDED => Ok(Category::Excluded),
            CAT_PENDING => Ok(Category::Pending),
            other => Err(HoplabelError::InvalidCategory(other)),
        }
    }

    /// Returns true for real object classes.
    #[inline]
    pub fn is_objective(&self) -> bool {
        matches!(self, Category::Objective(_))
    }

    /// Class index of an objective category.
    #[inline]
    pub fn class_index(&self) -> Option<u32> {
        match self {
            Category::Objective(id) => Some(*id),
            _ => None,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Pending
    }
}

impl TryFrom<i32> for Category {
    type Error = HoplabelError;

    fn try_from(value: i32) -> Result<Self, HoplabelError> {
        Category::from_id(value)
    }
}

impl From<Category> for i32 {
    fn from(category: Category) -> i32 {
        category.id()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Objective(id) => write!(f, "{id}"),
            Category::Roi => write!(f, "roi"),
            Category::Excluded => write!(f, "excluded"),
            Category::Pending => write!(f, "pending"),
            Category::Error => write!(f, "error"),
        }
    }
}
