//! Overlay rendering of a label onto a [`Canvas`].

use super::host::Canvas;
use crate::geom::{Normalized, Pixel, Point};
use crate::label::{Category, ImageLabel, ObjectLabel};
use crate::meta::{Color, LabelMeta};

/// Where the status line starts, in pixels.
const STATUS_ORIGIN: (f64, f64) = (8.0, 32.0);
const CROSS_RADIUS: u32 = 7;
const CROSS_THICKNESS: u32 = 3;

fn to_pixels(polygon: &[Point<Normalized>], canvas: &dyn Canvas) -> Vec<Point<Pixel>> {
    let size = canvas.size();
    polygon.iter().map(|p| p.to_pixel(size)).collect()
}

/// Overlay title of `ob`.
///
/// Title style 0 shows nothing, 1 the category name and property signs,
/// 2 adds confidences outside the 80-100% range.
pub fn object_title(ob: &ObjectLabel, meta: &LabelMeta) -> String {
    let style = meta.label.title_style;
    if style == 0 {
        return String::new();
    }
    let detailed = style >= 2;
    let cat_id = ob.category.value.id();

    let mut title = match meta.cat_meta(cat_id) {
        Ok(cat) => cat.name.clone(),
        Err(_) => ob.category.value.to_string(),
    };
    if detailed {
        title.push_str(&ob.category.conf_str());
    }

    for (name, value) in &ob.properties {
        match meta.prop_value_sign(cat_id, name, value.value) {
            Ok(sign) if !sign.is_empty() => {
                title.push(' ');
                title.push_str(sign);
                if detailed {
                    title.push_str(&value.conf_str());
                }
            }
            Ok(_) => {}
            Err(err) => log::debug!("no sign for object {} property {}: {}", ob.id, name, err),
        }
    }
    title
}

/// Draws the ROI shading and every object passing `cat_filter` in its
/// category color, with its bounding box and title.
pub fn draw_label(canvas: &mut dyn Canvas, label: &ImageLabel, meta: &LabelMeta, cat_filter: Option<Category>) {
    if let Some(roi) = &label.roi {
        let roi = to_pixels(roi, canvas);
        canvas.shade_outside(&roi);
    }

    let size = canvas.size();
    let thickness = meta.label.thickness;
    for ob in &label.objects {
        if ob.is_roi() {
            let roi = to_pixels(&ob.polygon, canvas);
            canvas.shade_outside(&roi);
            continue;
        }
        if cat_filter.is_some_and(|c| c != ob.category.value) {
            continue;
        }

        let color = meta
            .cat_meta(ob.category.value.id())
            .map_or(Color::WHITE, |cat| cat.display_color());
        let polygon = to_pixels(&ob.polygon, canvas);
        canvas.polyline(&polygon, true, color, thickness);
        canvas.rectangle(ob.rect().to_pixel(size), color, thickness, &object_title(ob, meta));
    }
}

/// Highlights the selected object in white and marks the selected vertex.
pub fn draw_selection(canvas: &mut dyn Canvas, polygon: &[Point<Normalized>], vertex: Option<Point<Normalized>>) {
    let points = to_pixels(polygon, canvas);
    canvas.polyline(&points, true, Color::WHITE, 1);
    if let Some(v) = vertex {
        let center = v.to_pixel(canvas.size());
        canvas.cross(center, CROSS_RADIUS, Color::YELLOW_GREEN, CROSS_THICKNESS);
    }
}

/// Session flags shown in the status line.
#[derive(Clone, Copy, Debug, Default)]
pub struct Status {
    pub labeled: bool,
    pub roi_locked: bool,
    pub dirty: bool,
    pub selected: bool,
}

/// The status line for `status`.
pub fn status_text(status: Status) -> String {
    let mut parts = Vec::new();
    if status.labeled {
        parts.push("Labeled");
    }
    parts.push(if status.roi_locked {
        "[f]UnlockROI"
    } else {
        "[f]LockROI"
    });
    if status.dirty {
        parts.push("[ ]Save [x]Cancel");
    }
    if status.selected {
        parts.push("[e]RemoveObject [r]RectifyPolygon");
    }
    parts.join("   ")
}

pub fn draw_status(canvas: &mut dyn Canvas, status: Status) {
    let (x, y) = STATUS_ORIGIN;
    canvas.text(&status_text(status), Point::new(x, y), Color::LIME);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;
    use crate::label::ObjectId;

    const META: &str = r#"{
        "id": 1,
        "name": "vehicles",
        "label": {"title_style": 2},
        "categories": [
            {"id": 0, "name": "car", "color": "RED", "properties": ["color"]}
        ],
        "properties": [
            {"id": 1, "name": "color", "values": [
                {"id": 0, "name": "red", "sign": "R"},
                {"id": 1, "name": "blue"}
            ]}
        ]
    }"#;

    fn car(conf: f64) -> ObjectLabel {
        ObjectLabel::new(
            ObjectId::new(1),
            Category::Objective(0),
            conf,
            Rect::new(0.1, 0.1, 0.2, 0.2).vertexes(),
        )
    }

    #[test]
    fn titles_follow_style() {
        let mut meta = LabelMeta::from_json_str(META).unwrap();
        let mut ob = car(0.5);
        ob.set_prop("color", 0, 0.9);
        assert_eq!(object_title(&ob, &meta), "car(50) R");

        meta.label.title_style = 1;
        assert_eq!(object_title(&ob, &meta), "car R");

        meta.label.title_style = 0;
        assert_eq!(object_title(&ob, &meta), "");
    }

    #[test]
    fn unknown_categories_use_their_display_form() {
        let meta = LabelMeta::from_json_str(META).unwrap();
        let mut ob = car(1.0);
        ob.category.value = Category::Pending;
        ob.set_prop("color", 0, 1.0);
        assert_eq!(object_title(&ob, &meta), Category::Pending.to_string());
    }

    #[test]
    fn status_line() {
        assert_eq!(status_text(Status::default()), "[f]LockROI");
        let all = Status {
            labeled: true,
            roi_locked: true,
            dirty: true,
            selected: true,
        };
        assert_eq!(
            status_text(all),
            "Labeled   [f]UnlockROI   [ ]Save [x]Cancel   [e]RemoveObject [r]RectifyPolygon"
        );
    }
}
