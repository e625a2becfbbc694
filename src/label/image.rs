//! Everything annotated on one image.

use serde::{Deserialize, Serialize};

use super::category::ObjectId;
use super::object::ObjectLabel;
use super::prob::CONF_MANUAL;
use super::{now_iso_string, Category};
use crate::geom::{contains_point, points_in_window, roi_crop_window};
use crate::geom::{Normalized, Point, Polygon, Rect, Size};
use crate::meta::LabelMeta;

/// Current label schema version.
pub const LABEL_VERSION: f64 = 1.0;

/// Default pixel margin added around the ROI when cropping.
pub const DEFAULT_EXTEND_PX: u32 = 4;

fn default_version() -> f64 {
    LABEL_VERSION
}

/// The label of one image: bookkeeping fields, the region of interest and
/// the objects inside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageLabel {
    #[serde(default = "default_version")]
    pub version: f64,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub sensor: i32,
    /// Region of interest. `None` means the whole frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<Polygon<Normalized>>,
    #[serde(default)]
    pub objects: Vec<ObjectLabel>,
}

impl ImageLabel {
    /// A label created now, without ROI.
    pub fn new(user_agent: &str, objects: Vec<ObjectLabel>) -> Self {
        let date = now_iso_string();
        Self {
            version: LABEL_VERSION,
            user_agent: user_agent.to_string(),
            last_modified: date.clone(),
            date,
            host: String::new(),
            sensor: 0,
            roi: None,
            objects,
        }
    }

    /// An empty label whose ROI is the full frame.
    pub fn only_roi(user_agent: &str, sensor: i32) -> Self {
        let mut label = Self::new(user_agent, Vec::new());
        label.sensor = sensor;
        label.roi = Some(Rect::one().vertexes());
        label
    }

    /// The ROI polygon, the full frame when none is set.
    pub fn roi_polygon(&self) -> Polygon<Normalized> {
        self.roi.clone().unwrap_or_else(|| Rect::one().vertexes())
    }

    /// Bounding rectangle of the ROI.
    pub fn roi_rect(&self) -> Rect<Normalized> {
        self.roi
            .as_deref()
            .and_then(Rect::bounding)
            .unwrap_or_else(Rect::one)
    }

    /// Union of the rectangles of all objective objects.
    pub fn objects_rect(&self) -> Option<Rect<Normalized>> {
        self.objects
            .iter()
            .filter(|o| o.is_objective())
            .map(|o| o.rect())
            .reduce(|a, b| a.unite(&b))
    }

    /// One past the largest object id, at least 1.
    pub fn next_id(&self) -> ObjectId {
        let max = self
            .objects
            .iter()
            .map(|o| o.id)
            .max()
            .unwrap_or(ObjectId::UNASSIGNED);
        max.next().max(ObjectId::new(1))
    }

    pub fn find_object(&self, id: ObjectId) -> Option<&ObjectLabel> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn find_object_mut(&mut self, id: ObjectId) -> Option<&mut ObjectLabel> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Appends a single-vertex pending object at `p` and returns it.
    pub fn new_object(&mut self, p: Point<Normalized>) -> &mut ObjectLabel {
        let id = self.next_id();
        self.objects
            .push(ObjectLabel::new(id, Category::Pending, CONF_MANUAL, vec![p]));
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    /// Appends copies of `objects`, renumbered from [`next_id`](Self::next_id).
    /// ROI objects are not copied. Returns the number of objects added.
    pub fn extend_objects(&mut self, objects: &[ObjectLabel]) -> usize {
        let mut id = self.next_id();
        let mut added = 0;
        for ob in objects.iter().filter(|o| !o.is_roi()) {
            let mut copy = ob.clone();
            copy.id = id;
            self.objects.push(copy);
            id = id.next();
            added += 1;
        }
        added
    }

    /// Moves an ROI stored as an object (older label files) into
    /// [`roi`](Self::roi). Only the first such object is kept.
    pub fn hoist_roi_object(&mut self) {
        if let Some(pos) = self.objects.iter().position(|o| o.is_roi()) {
            let roi = self.objects.remove(pos);
            if self.roi.is_none() {
                self.roi = Some(roi.polygon);
            }
            self.objects.retain(|o| !o.is_roi());
        }
    }

    /// Drops objects rejected by their category filter and objects whose
    /// center lies outside the ROI. Never fails; every drop is logged.
    ///
    /// Returns the number of dropped objects.
    pub fn clean(&mut self, meta: &LabelMeta) -> usize {
        let roi = self.roi_polygon();
        let before = self.objects.len();

        self.objects.retain(|ob| {
            if let Ok(cat) = meta.cat_meta(ob.category.value.id()) {
                if let Err(err) = cat.check(ob) {
                    log::info!("dropping object {}: {}", ob.id, err);
                    return false;
                }
            } else {
                log::debug!(
                    "object {} has category {} without meta entry, not filtered",
                    ob.id,
                    ob.category.value
                );
            }
            if !ob.is_roi() && !contains_point(&roi, &ob.center()) {
                log::info!("dropping object {}: center outside ROI", ob.id);
                return false;
            }
            true
        });

        before - self.objects.len()
    }

    /// Lowest [`ObjectLabel::min_conf`] over all objects, 1.0 when empty.
    pub fn min_conf(&self) -> f64 {
        self.objects
            .iter()
            .map(ObjectLabel::min_conf)
            .fold(1.0, f64::min)
    }

    /// Crops the label to its ROI.
    ///
    /// Returns the crop window (normalized in the original image) and a
    /// copy of the label whose polygons, ROI included, are expressed in
    /// the window's frame.
    pub fn crop_by_roi(&self, image_size: Size, extend_px: u32) -> (Rect<Normalized>, ImageLabel) {
        let window = roi_crop_window(&self.roi_rect(), image_size, extend_px);

        let mut label = self.clone();
        if let Some(roi) = label.roi.as_mut() {
            *roi = points_in_window(roi, &window);
        }
        for ob in label.objects.iter_mut() {
            ob.polygon = points_in_window(&ob.polygon, &window);
        }
        (window, label)
    }

    /// Marks the label as modified now by `user_agent`.
    pub fn stamp(&mut self, user_agent: &str) {
        self.last_modified = now_iso_string();
        self.user_agent = user_agent.to_string();
    }
}

impl Default for ImageLabel {
    fn default() -> Self {
        Self::new("", Vec::new())
    }
}
