//! Values paired with a confidence.

use serde::{Deserialize, Serialize};

use super::category::{Category, CAT_ERROR, CAT_EXCLUDED, CAT_PENDING};

/// Confidence stored with an excluded value.
pub const CONF_EXCLUDED: f64 = -1.0;
/// Confidence stored with an erroneous value.
pub const CONF_ERROR: f64 = -2.0;
/// Confidence of a value set by hand; above 1.0 on purpose.
pub const CONF_MANUAL: f64 = 2.0;

/// Confidences at or above this percentage are not shown in titles.
const PROB_THR: i64 = 80;

/// Value types that carry the excluded/error/pending markers.
pub trait ProbKind: Copy {
    fn excluded() -> Self;
    fn error() -> Self;
    fn pending() -> Self;
    /// Returns true for ordinary, non-marker values.
    fn is_normal(&self) -> bool;
}

impl ProbKind for i32 {
    fn excluded() -> Self {
        CAT_EXCLUDED
    }

    fn error() -> Self {
        CAT_ERROR
    }

    fn pending() -> Self {
        CAT_PENDING
    }

    fn is_normal(&self) -> bool {
        *self >= 0
    }
}

impl ProbKind for Category {
    fn excluded() -> Self {
        Category::Excluded
    }

    fn error() -> Self {
        Category::Error
    }

    fn pending() -> Self {
        Category::Pending
    }

    fn is_normal(&self) -> bool {
        self.is_objective()
    }
}

/// A classification result: a value and how sure we are about it.
///
/// Property values use `ProbValue<i32>`; an object's category uses
/// `ProbValue<Category>`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbValue<T = i32> {
    pub value: T,
    pub conf: f64,
}

impl<T> ProbValue<T> {
    #[inline]
    pub fn new(value: T, conf: f64) -> Self {
        Self { value, conf }
    }

    /// Confidence as `(NN)` percent, empty when between 80% and 100%.
    pub fn conf_str(&self) -> String {
        let c = (self.conf * 100.0) as i64;
        if c < PROB_THR || c > 100 {
            format!("({c})")
        } else {
            String::new()
        }
    }

    /// Rounds the confidence to `n` decimal places.
    pub fn round(self, n: i32) -> Self {
        let scale = 10f64.powi(n);
        Self {
            value: self.value,
            conf: (self.conf * scale).round() / scale,
        }
    }
}

impl<T: ProbKind> ProbValue<T> {
    pub fn exclude() -> Self {
        Self::new(T::excluded(), CONF_EXCLUDED)
    }

    pub fn error() -> Self {
        Self::new(T::error(), CONF_ERROR)
    }

    pub fn pending() -> Self {
        Self::new(T::pending(), 0.0)
    }

    pub fn is_normal(&self) -> bool {
        self.value.is_normal()
    }
}

impl ProbValue<i32> {
    pub fn is_excluded(&self) -> bool {
        self.value == CAT_EXCLUDED
    }
}

impl ProbValue<Category> {
    pub fn is_excluded(&self) -> bool {
        self.value == Category::Excluded
    }
}
