#![allow(dead_code)]

use std::fs;
use std::path::Path;

use hoplabel::geom::{Normalized, Rect};
use hoplabel::label::{Category, ImageLabel, ObjectId, ObjectLabel};

/// Taxonomy with id 1: car (0) with a color property and a size filter,
/// bus (1), and truck (3) leaving id 2 unused.
pub const SAMPLE_META: &str = r##"{
    "id": 1,
    "name": "vehicles",
    "label": {"title_style": 1, "thickness": 2},
    "categories": [
        {"id": 0, "name": "car", "keys": "1", "color": "RED",
         "properties": ["color"],
         "filter": {"aspect_radio": [0.2, 5.0], "area": [0.0001, 0.9]}},
        {"id": 1, "name": "bus", "keys": "2", "color": "#00FF00"},
        {"id": 3, "name": "truck", "keys": "4", "color": "BLUE"}
    ],
    "properties": [
        {"id": 1, "name": "color", "values": [
            {"id": 0, "name": "red", "keys": "r", "sign": "R"},
            {"id": 1, "name": "blue", "keys": "b", "sign": "B"}
        ]}
    ]
}"##;

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// Writes `meta/m1.json` under `root`.
pub fn write_meta(root: &Path) {
    fs::create_dir_all(root.join("meta")).expect("create meta dir");
    fs::write(root.join("meta/m1.json"), SAMPLE_META).expect("write meta");
}

pub fn object(id: i64, category: Category, rect: Rect<Normalized>) -> ObjectLabel {
    ObjectLabel::new(ObjectId::new(id), category, 1.0, rect.vertexes())
}

/// A car, a bus and a pending object.
pub fn sample_label() -> ImageLabel {
    let mut car = object(1, Category::Objective(0), Rect::new(0.1, 0.2, 0.2, 0.3));
    car.set_prop("color", 1, 0.9);
    let bus = object(2, Category::Objective(1), Rect::new(0.5, 0.5, 0.25, 0.25));
    let pending = object(3, Category::Pending, Rect::new(0.7, 0.1, 0.1, 0.1));
    ImageLabel::new("test", vec![car, bus, pending])
}

pub fn assert_rect_close(a: Rect<Normalized>, b: Rect<Normalized>, eps: f64) {
    assert!(
        (a.x - b.x).abs() < eps
            && (a.y - b.y).abs() < eps
            && (a.width - b.width).abs() < eps
            && (a.height - b.height).abs() < eps,
        "{a:?} != {b:?}"
    );
}
