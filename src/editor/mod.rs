//! Interactive polygon editing.
//!
//! An [`Editor`] is one editing session over a list of image records. A
//! window host drives it with pointer, key and draw events (see [`host`])
//! and displays the [`EditorMessage`] each event returns. Labels are read
//! and written through a [`LabelStore`].
//!
//! Clicks work on the selected object:
//! - with no selection, a click creates an object of the current category
//! - near one of its vertices, a click selects that vertex, and a second
//!   click on the selected vertex deletes it
//! - elsewhere, a click inserts a vertex where the perimeter grows least
//!
//! Shift-click toggles the selection to the nearest object.

pub mod config;
pub mod draw;
pub mod host;
pub mod records;
pub mod store;

pub use config::{load_editor_config, EditorConfig, KeyMap, NEAR_R2};
pub use host::{Canvas, Key, Modifiers, Viewer};
pub use records::{load_records, LabelFilter, LabelRecord};
pub use store::{current_label, HopStore, LabelStore};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::Level;

use crate::geom::{closest_point, insert_best, Normalized, Pixel, Point, Polygon};
use crate::label::{Category, ImageLabel, ObjectId, ObjectLabel};
use crate::meta::LabelMeta;
use draw::{draw_label, draw_selection, draw_status, Status};

/// Feedback for the user after an event. It is logged when created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorMessage {
    pub level: Level,
    pub text: String,
}

impl EditorMessage {
    pub fn info(text: impl Into<String>) -> Self {
        let text = text.into();
        log::info!("{text}");
        Self {
            level: Level::Info,
            text,
        }
    }

    /// A refused or failed action; the session state is unchanged.
    pub fn warn(text: impl Into<String>) -> Self {
        let text = text.into();
        log::warn!("{text}");
        Self {
            level: Level::Warn,
            text,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.level == Level::Warn
    }
}

impl fmt::Display for EditorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One editing session.
pub struct Editor {
    meta: LabelMeta,
    config: EditorConfig,
    store: Box<dyn LabelStore>,
    /// Dataset root; snapshots go below it.
    folder: PathBuf,
    records: Vec<LabelRecord>,
    index: Option<usize>,

    label: ImageLabel,
    selected_object: Option<ObjectId>,
    selected_vertex: Option<Point<Normalized>>,
    current_category: Category,
    show_all: bool,
    /// ROI forced onto every image loaded while set.
    roi_lock: Option<Polygon<Normalized>>,
    /// Objects of the last saved label.
    previous_objects: Option<Vec<ObjectLabel>>,
    dirty: bool,
    /// True if the label came from the store rather than an import or the
    /// ROI-only default.
    labeled: bool,
}

impl Editor {
    pub fn new(
        meta: LabelMeta,
        config: EditorConfig,
        store: Box<dyn LabelStore>,
        folder: &Path,
        records: Vec<LabelRecord>,
    ) -> Self {
        let current_category = meta
            .categories
            .iter()
            .map(|c| c.id)
            .filter(|id| *id >= 0)
            .min()
            .map_or(Category::Pending, |id| Category::Objective(id as u32));
        for (key, what, cat_id) in config.keys.conflicts(&meta) {
            log::warn!(
                "key '{}' is bound to both \"{what}\" and category {cat_id}",
                key.escape_default()
            );
        }
        let label = ImageLabel::only_roi(&config.user_agent, 0);
        Self {
            meta,
            config,
            store,
            folder: folder.to_path_buf(),
            records,
            index: None,
            label,
            selected_object: None,
            selected_vertex: None,
            current_category,
            show_all: true,
            roi_lock: None,
            previous_objects: None,
            dirty: false,
            labeled: false,
        }
    }

    pub fn records(&self) -> &[LabelRecord] {
        &self.records
    }

    pub fn current_record(&self) -> Option<&LabelRecord> {
        self.index.and_then(|i| self.records.get(i))
    }

    pub fn current_image_file(&self) -> Option<&Path> {
        self.current_record().map(|r| r.image.as_path())
    }

    pub fn label(&self) -> &ImageLabel {
        &self.label
    }

    pub fn selected_object(&self) -> Option<&ObjectLabel> {
        self.selected_object.and_then(|id| self.label.find_object(id))
    }

    pub fn selected_vertex(&self) -> Option<Point<Normalized>> {
        self.selected_vertex
    }

    pub fn current_category(&self) -> Category {
        self.current_category
    }

    pub fn shows_all_categories(&self) -> bool {
        self.show_all
    }

    pub fn roi_lock(&self) -> Option<&Polygon<Normalized>> {
        self.roi_lock.as_ref()
    }

    pub fn previous_objects(&self) -> Option<&[ObjectLabel]> {
        self.previous_objects.as_deref()
    }

    /// True if the label has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_labeled(&self) -> bool {
        self.labeled
    }

    /// Key and mouse help, followed by the category keys of the meta.
    pub fn help_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Mouse:".to_string(),
            "  [click] create object / select vertex / insert vertex".to_string(),
            "  [click selected vertex] delete vertex".to_string(),
            "  [shift+click] select/deselect object".to_string(),
            "Keys:".to_string(),
        ];
        lines.extend(self.config.keys.help_lines());
        lines.push("Categories:".to_string());
        lines.extend(self.meta.cat_key_strs());
        lines
    }

    /// Switches to record `index` and loads its label: the saved one, else
    /// the imported one, else an ROI-only default. A locked ROI replaces the
    /// loaded one. Unsaved changes of the previous image are dropped.
    pub fn on_change_image(&mut self, index: usize) -> EditorMessage {
        if index >= self.records.len() {
            return EditorMessage::warn(format!(
                "no record #{index} ({} records)",
                self.records.len()
            ));
        }
        self.index = Some(index);
        self.reload();
        let image = self.records[index].image.display();
        EditorMessage::info(format!(
            "#{index} {image}: {} object(s){}",
            self.label.objects.len(),
            if self.labeled { ", labeled" } else { "" }
        ))
    }

    fn reload(&mut self) {
        let Some(image) = self.current_image_file().map(Path::to_path_buf) else {
            return;
        };
        let (mut label, labeled) = current_label(self.store.as_ref(), &image, &self.config.user_agent);
        if let Some(roi) = &self.roi_lock {
            label.roi = Some(roi.clone());
            log::debug!("locked ROI applied to {}", image.display());
        }
        self.label = label;
        self.labeled = labeled;
        self.clear_selection();
        self.dirty = false;
    }

    fn clear_selection(&mut self) {
        self.selected_object = None;
        self.selected_vertex = None;
    }

    fn selected_mut(&mut self) -> Option<&mut ObjectLabel> {
        let id = self.selected_object?;
        self.label.find_object_mut(id)
    }

    /// Handles a key. Returns `None` if the key is not an editor key and
    /// the host should handle it, e.g. to change images.
    ///
    /// Move keys only count as editor keys while an object is selected.
    /// Bindings are tried in order: move keys, taxonomy category keys, then
    /// the other commands, so a category key shadows a command bound to the
    /// same character.
    pub fn on_key(&mut self, key: Key, viewer: &dyn Viewer) -> Option<EditorMessage> {
        let keys = self.config.keys.clone();

        if let Some((dx, dy, fast)) = keys.direction(key) {
            if self.selected_object.is_none() {
                return None;
            }
            return Some(self.move_selected(dx, dy, fast, viewer));
        }

        if let Key::Char(c) = key {
            if let Some(cat_id) = self.meta.key_to_category(c) {
                return Some(self.set_category(cat_id));
            }
        }

        let c = key.as_char();
        let message = if c == keys.toggle_filter {
            self.toggle_filter()
        } else if c == keys.lock_roi {
            self.toggle_roi_lock()
        } else if c == keys.copy_previous {
            self.copy_previous()
        } else if c == keys.save {
            self.save()
        } else if c == keys.cancel {
            self.cancel()
        } else if c == keys.delete_label {
            self.delete_label()
        } else if c == keys.snapshot {
            self.take_snapshot(viewer)
        } else if c == keys.remove_object {
            self.remove_object()
        } else if c == keys.rectify {
            self.rectify()
        } else if c == keys.fill_roi {
            self.fill_roi()
        } else {
            return None;
        };
        Some(message)
    }

    fn move_selected(&mut self, dx: i32, dy: i32, fast: bool, viewer: &dyn Viewer) -> EditorMessage {
        let step = if fast { self.config.fast_step_px as f64 } else { 1.0 };
        let offset = Point::<Pixel>::new(dx as f64 * step, dy as f64 * step).to_normalized(viewer.frame_size());
        let Some(ob) = self.selected_mut() else {
            return EditorMessage::warn("no object selected");
        };
        ob.move_by(offset);
        let id = ob.id;
        self.selected_vertex = self.selected_vertex.map(|v| v + offset);
        self.dirty = true;
        log::debug!("moved object {id} by ({dx}, {dy}) x {step}");
        EditorMessage::info(format!("object {id} moved"))
    }

    fn set_category(&mut self, cat_id: i32) -> EditorMessage {
        let category = match Category::from_id(cat_id) {
            Ok(category) => category,
            Err(err) => return EditorMessage::warn(err.to_string()),
        };
        self.current_category = category;
        let Some(ob) = self.selected_mut() else {
            return EditorMessage::info(format!("current category: {category}"));
        };
        ob.category.value = category;
        let id = ob.id;
        self.dirty = true;
        EditorMessage::info(format!("object {id} category: {category}"))
    }

    fn toggle_filter(&mut self) -> EditorMessage {
        self.show_all = !self.show_all;
        if self.show_all {
            EditorMessage::info("showing all categories")
        } else {
            EditorMessage::info(format!("showing category {}", self.current_category))
        }
    }

    fn toggle_roi_lock(&mut self) -> EditorMessage {
        if self.roi_lock.take().is_some() {
            EditorMessage::info("ROI unlocked")
        } else {
            self.roi_lock = Some(self.label.roi_polygon());
            EditorMessage::info("ROI locked; following images use it")
        }
    }

    fn copy_previous(&mut self) -> EditorMessage {
        let Some(previous) = &self.previous_objects else {
            return EditorMessage::warn("no previous objects to copy");
        };
        let added = self.label.extend_objects(previous);
        self.dirty = true;
        EditorMessage::info(format!("copied {added} previous object(s)"))
    }

    fn save(&mut self) -> EditorMessage {
        let Some(image) = self.current_image_file().map(Path::to_path_buf) else {
            return EditorMessage::warn("no image to save a label for");
        };
        self.label.stamp(&self.config.user_agent);
        let dropped = self.label.clean(&self.meta);
        match self.store.save(&image, &self.label) {
            Ok(path) => {
                self.clear_selection();
                self.dirty = false;
                self.labeled = true;
                self.previous_objects = Some(self.label.objects.clone());
                if let Some(record) = self.index.and_then(|i| self.records.get_mut(i)) {
                    record.label = self.label.clone();
                    record.labeled = true;
                }
                EditorMessage::info(format!(
                    "saved {} ({} object(s), {} dropped)",
                    path.display(),
                    self.label.objects.len(),
                    dropped
                ))
            }
            Err(err) => EditorMessage::warn(format!("save failed: {err}")),
        }
    }

    fn cancel(&mut self) -> EditorMessage {
        self.reload();
        EditorMessage::info("changes discarded")
    }

    /// Deletes the saved label. The in-memory label is kept.
    fn delete_label(&mut self) -> EditorMessage {
        let Some(image) = self.current_image_file().map(Path::to_path_buf) else {
            return EditorMessage::warn("no image selected");
        };
        match self.store.delete(&image) {
            Ok(true) => {
                self.labeled = false;
                if let Some(record) = self.index.and_then(|i| self.records.get_mut(i)) {
                    record.labeled = false;
                }
                EditorMessage::info(format!("label of {} deleted", image.display()))
            }
            Ok(false) => EditorMessage::warn(format!("{} has no saved label", image.display())),
            Err(err) => EditorMessage::warn(format!("delete failed: {err}")),
        }
    }

    fn take_snapshot(&self, viewer: &dyn Viewer) -> EditorMessage {
        let Some(name) = self.current_image_file().and_then(Path::file_name) else {
            return EditorMessage::warn("no image selected");
        };
        let dir = self.folder.join(&self.config.snapshot_dir);
        if let Err(err) = fs::create_dir_all(&dir) {
            return EditorMessage::warn(format!("snapshot failed: {err}"));
        }
        let path = dir.join(name);
        match viewer.canvas().save(&path) {
            Ok(()) => EditorMessage::info(format!("snapshot {}", path.display())),
            Err(err) => EditorMessage::warn(format!("snapshot failed: {err}")),
        }
    }

    fn remove_object(&mut self) -> EditorMessage {
        let Some(id) = self.selected_object else {
            return EditorMessage::warn("no object selected");
        };
        if let Some(i) = self.label.objects.iter().position(|o| o.id == id) {
            self.label.objects.remove(i);
        }
        self.clear_selection();
        self.dirty = true;
        EditorMessage::info(format!("object {id} removed"))
    }

    fn rectify(&mut self) -> EditorMessage {
        let Some(ob) = self.selected_mut() else {
            return EditorMessage::warn("no object selected");
        };
        let r = ob.polygon_to_rect();
        self.selected_vertex = None;
        self.dirty = true;
        EditorMessage::info(format!("polygon replaced by rectangle {r:?}"))
    }

    fn fill_roi(&mut self) -> EditorMessage {
        let roi = self.label.roi_polygon();
        let Some(ob) = self.selected_mut() else {
            return EditorMessage::warn("no object selected");
        };
        ob.polygon = roi;
        self.selected_vertex = None;
        self.dirty = true;
        EditorMessage::info("object fills the ROI")
    }

    /// Handles a left click at `cursor`, in frame pixels.
    pub fn on_left_button_down(&mut self, cursor: Point<Pixel>, modifiers: Modifiers, viewer: &dyn Viewer) -> EditorMessage {
        let cursor = cursor.to_normalized(viewer.frame_size());

        if modifiers.shift {
            let hit = self.closest_object(&cursor);
            self.selected_object = if hit == self.selected_object { None } else { hit };
            self.selected_vertex = None;
            return match self.selected_object {
                Some(id) => EditorMessage::info(format!("object {id} selected")),
                None => EditorMessage::info("selection cleared"),
            };
        }

        let Some(id) = self.selected_object else {
            return self.new_object(cursor);
        };
        let near_r2 = self.config.near_r2;
        let Some(ob) = self.label.find_object(id) else {
            self.clear_selection();
            return EditorMessage::warn(format!("object {id} no longer exists"));
        };

        match closest_point(&cursor, &ob.polygon).filter(|c| c.distance2 < near_r2) {
            Some(hit) if Some(hit.point) == self.selected_vertex => self.remove_vertex(hit.index),
            Some(hit) => {
                self.selected_vertex = Some(hit.point);
                EditorMessage::info(format!("vertex {} selected", hit.index))
            }
            None => self.insert_vertex(cursor),
        }
    }

    /// The object with a vertex nearest to `cursor`, within the proximity
    /// radius. The earliest object wins ties.
    fn closest_object(&self, cursor: &Point<Normalized>) -> Option<ObjectId> {
        let mut best: Option<(f64, ObjectId)> = None;
        for ob in &self.label.objects {
            let Some(hit) = closest_point(cursor, &ob.polygon) else {
                continue;
            };
            if hit.distance2 < self.config.near_r2 && best.map_or(true, |(d2, _)| hit.distance2 < d2) {
                best = Some((hit.distance2, ob.id));
            }
        }
        best.map(|(_, id)| id)
    }

    fn new_object(&mut self, cursor: Point<Normalized>) -> EditorMessage {
        let category = self.current_category;
        let ob = self.label.new_object(cursor);
        ob.category.value = category;
        let id = ob.id;
        self.selected_object = Some(id);
        self.selected_vertex = Some(cursor);
        self.dirty = true;
        EditorMessage::info(format!("new object {id} ({category})"))
    }

    /// Deletes vertex `index` of the selected object and selects the vertex
    /// that moves into its place. Refused unless at least two vertices would
    /// remain.
    fn remove_vertex(&mut self, index: usize) -> EditorMessage {
        let Some(ob) = self.selected_mut() else {
            return EditorMessage::warn("no object selected");
        };
        if ob.polygon.len() < 3 {
            return EditorMessage::warn("cannot delete: a polygon keeps at least 2 vertices");
        }
        ob.polygon.remove(index);
        let next = ob.polygon[index % ob.polygon.len()];
        self.selected_vertex = Some(next);
        self.dirty = true;
        EditorMessage::info(format!("vertex {index} deleted"))
    }

    fn insert_vertex(&mut self, cursor: Point<Normalized>) -> EditorMessage {
        let Some(ob) = self.selected_mut() else {
            return EditorMessage::warn("no object selected");
        };
        let index = insert_best(&mut ob.polygon, cursor);
        self.selected_vertex = Some(cursor);
        self.dirty = true;
        EditorMessage::info(format!("vertex inserted at {index}"))
    }

    /// Draws the label overlays, the selection and the status line.
    pub fn on_draw(&self, canvas: &mut dyn Canvas) {
        let filter = if self.show_all {
            None
        } else {
            Some(self.current_category)
        };
        draw_label(canvas, &self.label, &self.meta, filter);

        if let Some(ob) = self.selected_object() {
            draw_selection(canvas, &ob.polygon, self.selected_vertex);
        }
        draw_status(
            canvas,
            Status {
                labeled: self.labeled,
                roi_locked: self.roi_lock.is_some(),
                dirty: self.dirty,
                selected: self.selected_object.is_some(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HoplabelError;
    use crate::geom::{Rect, Size};
    use crate::meta::Color;

    const META: &str = r#"{
        "id": 1,
        "name": "vehicles",
        "categories": [
            {"id": 0, "name": "car", "keys": "1", "color": "RED"},
            {"id": 1, "name": "bus", "keys": "2", "color": "BLUE"}
        ]
    }"#;

    #[derive(Default)]
    struct TestCanvas {
        texts: Vec<String>,
        polylines: usize,
    }

    impl Canvas for TestCanvas {
        fn size(&self) -> Size {
            Size::new(100, 100)
        }
        fn polyline(&mut self, _: &[Point<Pixel>], _: bool, _: Color, _: u32) {
            self.polylines += 1;
        }
        fn rectangle(&mut self, _: Rect<Pixel>, _: Color, _: u32, title: &str) {
            self.texts.push(title.to_string());
        }
        fn cross(&mut self, _: Point<Pixel>, _: u32, _: Color, _: u32) {}
        fn text(&mut self, text: &str, _: Point<Pixel>, _: Color) {
            self.texts.push(text.to_string());
        }
        fn shade_outside(&mut self, _: &[Point<Pixel>]) {}
        fn save(&self, path: &Path) -> Result<(), HoplabelError> {
            fs::write(path, b"snapshot").map_err(HoplabelError::Io)
        }
    }

    struct TestViewer {
        canvas: TestCanvas,
    }

    impl Viewer for TestViewer {
        fn frame_size(&self) -> Size {
            Size::new(100, 100)
        }
        fn canvas(&self) -> &dyn Canvas {
            &self.canvas
        }
    }

    fn viewer() -> TestViewer {
        TestViewer {
            canvas: TestCanvas::default(),
        }
    }

    fn editor(root: &Path, stems: &[&str]) -> Editor {
        editor_with_meta(root, stems, META)
    }

    fn editor_with_meta(root: &Path, stems: &[&str], meta: &str) -> Editor {
        let records = stems
            .iter()
            .map(|stem| LabelRecord {
                image: root.join(format!("image/{stem}.jpg")),
                label: ImageLabel::default(),
                labeled: false,
            })
            .collect();
        let meta = LabelMeta::from_json_str(meta).unwrap();
        Editor::new(
            meta,
            EditorConfig::default(),
            Box::new(HopStore::new(1)),
            root,
            records,
        )
    }

    fn click(editor: &mut Editor, x: f64, y: f64, v: &TestViewer) -> EditorMessage {
        editor.on_left_button_down(Point::new(x, y), Modifiers::NONE, v)
    }

    #[test]
    fn clicks_build_a_polygon() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a"]);
        ed.on_change_image(0);
        assert!(!ed.is_dirty());

        click(&mut ed, 10.0, 10.0, &v);
        assert!(ed.is_dirty());
        let ob = ed.selected_object().unwrap();
        assert_eq!(ob.id, ObjectId::new(1));
        assert_eq!(ob.category.value, Category::Objective(0));
        assert_eq!(ob.polygon.len(), 1);

        click(&mut ed, 50.0, 10.0, &v);
        click(&mut ed, 50.0, 50.0, &v);
        assert_eq!(ed.selected_object().unwrap().polygon.len(), 3);
        assert_eq!(ed.selected_vertex(), Some(Point::new(0.5, 0.5)));
    }

    #[test]
    fn second_click_on_selected_vertex_deletes_it() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a"]);
        ed.on_change_image(0);
        click(&mut ed, 10.0, 10.0, &v);
        click(&mut ed, 50.0, 10.0, &v);

        // Two vertices: the selected one can not be deleted.
        let msg = click(&mut ed, 50.0, 10.0, &v);
        assert!(msg.is_warning());
        assert_eq!(ed.selected_object().unwrap().polygon.len(), 2);

        click(&mut ed, 50.0, 50.0, &v);
        click(&mut ed, 10.0, 10.0, &v);
        assert_eq!(ed.selected_vertex(), Some(Point::new(0.1, 0.1)));
        let msg = click(&mut ed, 10.0, 10.0, &v);
        assert!(!msg.is_warning());
        let polygon = &ed.selected_object().unwrap().polygon;
        assert_eq!(polygon.len(), 2);
        assert_eq!(ed.selected_vertex(), Some(polygon[0]));
    }

    #[test]
    fn shift_click_toggles_selection() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a"]);
        ed.on_change_image(0);
        click(&mut ed, 10.0, 10.0, &v);

        ed.on_left_button_down(Point::new(11.0, 10.0), Modifiers::SHIFT, &v);
        assert!(ed.selected_object().is_none());
        ed.on_left_button_down(Point::new(11.0, 10.0), Modifiers::SHIFT, &v);
        assert_eq!(ed.selected_object().unwrap().id, ObjectId::new(1));
        ed.on_left_button_down(Point::new(90.0, 90.0), Modifiers::SHIFT, &v);
        assert!(ed.selected_object().is_none());
    }

    #[test]
    fn category_key_shadows_command_key() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let meta = r#"{"id": 1, "name": "m", "categories": [
            {"id": 0, "name": "car", "keys": "1"},
            {"id": 1, "name": "bus", "keys": "2r"}
        ]}"#;
        let mut ed = editor_with_meta(temp.path(), &["a"], meta);
        ed.on_change_image(0);
        click(&mut ed, 10.0, 10.0, &v);
        click(&mut ed, 50.0, 10.0, &v);
        click(&mut ed, 30.0, 50.0, &v);

        ed.on_key(Key::Char('r'), &v);
        let ob = ed.selected_object().unwrap();
        assert_eq!(ob.category.value, Category::Objective(1));
        // Still a triangle: "polygon to rectangle" did not run.
        assert_eq!(ob.polygon.len(), 3);
    }

    #[test]
    fn keys_move_and_recategorize() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a"]);
        ed.on_change_image(0);

        // Nothing selected: move keys belong to the host.
        assert!(ed.on_key(Key::Char('d'), &v).is_none());
        assert!(ed.on_key(Key::Char('2'), &v).is_some());
        assert_eq!(ed.current_category(), Category::Objective(1));

        click(&mut ed, 10.0, 10.0, &v);
        assert_eq!(ed.selected_object().unwrap().category.value, Category::Objective(1));
        ed.on_key(Key::Char('D'), &v).unwrap();
        ed.on_key(Key::Char('s'), &v).unwrap();
        let p = ed.selected_object().unwrap().polygon[0];
        assert!((p.x - 0.2).abs() < 1e-9 && (p.y - 0.11).abs() < 1e-9);
        assert_eq!(ed.selected_vertex(), Some(p));

        ed.on_key(Key::Char('1'), &v).unwrap();
        assert_eq!(ed.selected_object().unwrap().category.value, Category::Objective(0));
        assert!(ed.on_key(Key::Char('?'), &v).is_none());
    }

    #[test]
    fn object_commands() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a"]);
        ed.on_change_image(0);
        assert!(ed.on_key(Key::Char('r'), &v).unwrap().is_warning());

        click(&mut ed, 10.0, 10.0, &v);
        click(&mut ed, 30.0, 20.0, &v);
        click(&mut ed, 20.0, 40.0, &v);
        ed.on_key(Key::Char('r'), &v).unwrap();
        let rect = ed.selected_object().unwrap().rect();
        assert_eq!(ed.selected_object().unwrap().polygon, rect.vertexes());
        assert!(ed.selected_vertex().is_none());

        ed.on_key(Key::Char('z'), &v).unwrap();
        assert_eq!(ed.selected_object().unwrap().polygon, Rect::one().vertexes());

        ed.on_key(Key::Char('e'), &v).unwrap();
        assert!(ed.label().objects.is_empty());
        assert!(ed.selected_object().is_none());
    }

    #[test]
    fn save_cancel_and_copy_previous() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a", "b"]);
        ed.on_change_image(0);
        assert!(ed.on_key(Key::Char('c'), &v).unwrap().is_warning());

        click(&mut ed, 10.0, 10.0, &v);
        click(&mut ed, 30.0, 30.0, &v);
        ed.on_key(Key::Space, &v).unwrap();
        assert!(!ed.is_dirty());
        assert!(ed.is_labeled());
        assert!(temp.path().join("hop_m1/a.json").is_file());
        assert_eq!(ed.previous_objects().unwrap().len(), 1);

        // Edits after saving are discarded by cancel.
        click(&mut ed, 80.0, 80.0, &v);
        assert_eq!(ed.label().objects.len(), 2);
        ed.on_key(Key::Char('x'), &v).unwrap();
        assert_eq!(ed.label().objects.len(), 1);
        assert!(!ed.is_dirty());

        ed.on_change_image(1);
        assert!(!ed.is_labeled());
        assert!(ed.label().objects.is_empty());
        ed.on_key(Key::Char('c'), &v).unwrap();
        assert_eq!(ed.label().objects.len(), 1);
        assert_eq!(ed.label().objects[0].id, ObjectId::new(1));
        assert!(ed.is_dirty());

        // Changing images drops unsaved changes.
        ed.on_change_image(1);
        assert!(ed.label().objects.is_empty());
    }

    #[test]
    fn roi_lock_applies_to_later_images() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a", "b"]);
        ed.on_change_image(0);
        let roi = Rect::new(0.2, 0.2, 0.5, 0.5).vertexes();
        ed.label.roi = Some(roi.clone());

        ed.on_key(Key::Char('f'), &v).unwrap();
        ed.on_change_image(1);
        assert_eq!(ed.label().roi.as_ref(), Some(&roi));

        ed.on_key(Key::Char('f'), &v).unwrap();
        ed.on_change_image(1);
        assert_eq!(ed.label().roi, Some(Rect::one().vertexes()));
    }

    #[test]
    fn delete_and_snapshot() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a"]);
        ed.on_change_image(0);
        assert!(ed.on_key(Key::Backspace, &v).unwrap().is_warning());

        click(&mut ed, 10.0, 10.0, &v);
        click(&mut ed, 30.0, 30.0, &v);
        ed.on_key(Key::Space, &v).unwrap();
        ed.on_key(Key::Backspace, &v).unwrap();
        assert!(!temp.path().join("hop_m1/a.json").exists());
        assert!(!ed.is_labeled());
        assert_eq!(ed.label().objects.len(), 1);

        ed.on_key(Key::Char('j'), &v).unwrap();
        assert!(temp.path().join("snapshot/a.jpg").is_file());
    }

    #[test]
    fn draw_renders_objects_and_status() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let v = viewer();
        let mut ed = editor(temp.path(), &["a"]);
        ed.on_change_image(0);
        click(&mut ed, 10.0, 10.0, &v);
        click(&mut ed, 30.0, 30.0, &v);

        let mut canvas = TestCanvas::default();
        ed.on_draw(&mut canvas);
        // Object outline plus the white selection outline.
        assert_eq!(canvas.polylines, 2);
        let texts = &canvas.texts;
        assert!(texts.contains(&"car".to_string()));
        assert_eq!(
            texts.last().unwrap(),
            "[f]LockROI   [ ]Save [x]Cancel   [e]RemoveObject [r]RectifyPolygon"
        );
    }

    #[test]
    fn out_of_range_image_is_refused() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut ed = editor(temp.path(), &["a"]);
        assert!(ed.on_change_image(3).is_warning());
        assert!(ed.current_image_file().is_none());
    }
}
