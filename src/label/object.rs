//! A single annotated object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::category::{Category, ObjectId};
use super::prob::{ProbValue, CONF_MANUAL};
use crate::geom::{HasRect, Normalized, Point, Polygon, Rect};

/// Id given to ROI objects in the legacy layout.
const ROI_OBJECT_ID: i64 = -9;

/// One object: a polygon plus a category and named properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectLabel {
    pub id: ObjectId,
    #[serde(rename = "prob_class")]
    pub category: ProbValue<Category>,
    pub polygon: Polygon<Normalized>,
    #[serde(default)]
    pub properties: BTreeMap<String, ProbValue>,
}

impl ObjectLabel {
    pub fn new(id: ObjectId, category: Category, conf: f64, polygon: Polygon<Normalized>) -> Self {
        Self {
            id,
            category: ProbValue::new(category, conf),
            polygon,
            properties: BTreeMap::new(),
        }
    }

    /// An ROI object covering `polygon`.
    pub fn new_roi(polygon: Polygon<Normalized>) -> Self {
        Self::new(ObjectId::new(ROI_OBJECT_ID), Category::Roi, 0.0, polygon)
    }

    /// Bounding rectangle of the polygon; empty for an empty polygon.
    pub fn rect(&self) -> Rect<Normalized> {
        Rect::bounding(&self.polygon).unwrap_or_default()
    }

    /// Replaces the polygon with the corners of `r`.
    pub fn set_rect(&mut self, r: Rect<Normalized>) {
        self.polygon = r.vertexes();
    }

    pub fn center(&self) -> Point<Normalized> {
        self.rect().center()
    }

    /// Replaces the polygon with its bounding rectangle and returns it.
    pub fn polygon_to_rect(&mut self) -> Rect<Normalized> {
        let r = self.rect();
        self.set_rect(r);
        r
    }

    #[inline]
    pub fn is_roi(&self) -> bool {
        self.category.value == Category::Roi
    }

    #[inline]
    pub fn is_objective(&self) -> bool {
        self.category.value.is_objective()
    }

    /// Property `name`, or `(0, 0.0)` when unset.
    pub fn prop(&self, name: &str) -> ProbValue {
        self.properties
            .get(name)
            .copied()
            .unwrap_or(ProbValue::new(0, 0.0))
    }

    pub fn set_prop(&mut self, name: &str, value: i32, conf: f64) {
        self.properties
            .insert(name.to_string(), ProbValue::new(value, conf));
    }

    /// Sets a property chosen by hand.
    pub fn set_prop_manual(&mut self, name: &str, value: i32) {
        self.set_prop(name, value, CONF_MANUAL);
    }

    pub fn remove_prop(&mut self, name: &str) -> Option<ProbValue> {
        self.properties.remove(name)
    }

    /// Lowest confidence of the category and every property.
    ///
    /// Non-objective objects are always considered certain (1.0).
    pub fn min_conf(&self) -> f64 {
        if !self.is_objective() {
            return 1.0;
        }
        self.properties
            .values()
            .map(|p| p.conf)
            .fold(self.category.conf, f64::min)
    }

    /// Translates every vertex by `offset`. Keeping the result inside the
    /// unit frame is up to the caller.
    pub fn move_by(&mut self, offset: Point<Normalized>) {
        crate::geom::polygon::translate(&mut self.polygon, offset);
    }
}

impl HasRect<Normalized> for ObjectLabel {
    fn rect(&self) -> Rect<Normalized> {
        ObjectLabel::rect(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object() -> ObjectLabel {
        ObjectLabel::new(
            ObjectId::new(1),
            Category::Objective(0),
            0.5,
            vec![
                Point::new(0.2, 0.1),
                Point::new(0.4, 0.3),
                Point::new(0.1, 0.4),
            ],
        )
    }

    #[test]
    fn rect_and_polygon_to_rect() {
        let mut ob = object();
        let r = ob.polygon_to_rect();
        assert!((r.x - 0.1).abs() < 1e-12);
        assert!((r.y - 0.1).abs() < 1e-12);
        assert!((r.width - 0.3).abs() < 1e-12);
        assert_eq!(ob.polygon.len(), 4);
        assert_eq!(ob.polygon, r.vertexes());
    }

    #[test]
    fn min_conf_over_category_and_properties() {
        let mut ob = object();
        assert_eq!(ob.min_conf(), 0.5);
        ob.set_prop("color", 1, 0.3);
        ob.set_prop("size", 0, 0.9);
        assert_eq!(ob.min_conf(), 0.3);

        ob.category.value = Category::Pending;
        assert_eq!(ob.min_conf(), 1.0);
    }

    #[test]
    fn props_get_set_remove() {
        let mut ob = object();
        assert_eq!(ob.prop("color"), ProbValue::new(0, 0.0));
        ob.set_prop_manual("color", 3);
        assert_eq!(ob.prop("color"), ProbValue::new(3, CONF_MANUAL));
        assert!(ob.remove_prop("color").is_some());
        assert!(ob.remove_prop("color").is_none());
    }

    #[test]
    fn move_translates_every_vertex() {
        let mut ob = object();
        let before = ob.polygon.clone();
        ob.move_by(Point::new(0.1, 0.0));
        for (a, b) in before.iter().zip(&ob.polygon) {
            assert!((b.x - a.x - 0.1).abs() < 1e-12);
            assert_eq!(a.y, b.y);
        }
    }

    #[test]
    fn json_shape() {
        let mut ob = object();
        ob.set_prop("color", 1, 0.25);
        let v = serde_json::to_value(&ob).unwrap();
        assert_eq!(v["id"], 1);
        assert_eq!(v["prob_class"]["value"], 0);
        assert_eq!(v["polygon"][0][0], 0.2);
        assert_eq!(v["properties"]["color"]["conf"], 0.25);
    }

    #[test]
    fn roi_object() {
        let roi = ObjectLabel::new_roi(Rect::one().vertexes());
        assert!(roi.is_roi());
        assert!(!roi.is_objective());
    }
}
