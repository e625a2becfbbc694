//! KITTI object labels.
//!
//! A KITTI set pairs `image_2/` with `label_2/`. Each label line has 15
//! space-separated fields:
//!
//! ```text
//! type truncated occluded alpha left top right bottom h w l x y z rotation_y
//! ```
//!
//! Only the class name and the 2D pixel box are mapped; every 3D and
//! orientation field is written as zero. Class names resolve through the
//! set's class-name list (category names ordered by id), falling back to
//! `class_N`. `DontCare` regions map to [`Category::Excluded`].

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::files::{
    collect_files_with_extensions, find_image_for_label, place_image, read_image_size, rel_string,
    stem_string,
};
use super::{LabelFormat, LabelSet, LoadedPairs, SaveSummary, SetOptions};
use crate::error::HoplabelError;
use crate::geom::{Normalized, Pixel, Rect, Size};
use crate::label::{Category, ImageLabel, ImageLabelPair, ObjectId, ObjectLabel, MAX_CLASS_ID};

pub const IMAGES_DIR: &str = "image_2";
pub const LABELS_DIR: &str = "label_2";
/// KITTI class for ignored regions.
pub const DONT_CARE: &str = "DontCare";
pub const KITTI_AGENT: &str = "kitti";
const LABEL_EXTENSION: &str = "txt";
const CLASS_PREFIX: &str = "class_";
const FIELD_COUNT: usize = 15;

/// One KITTI label line.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KittiRow {
    pub class: String,
    pub truncated: f64,
    pub occluded: f64,
    pub alpha: f64,
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub height: f64,
    pub width: f64,
    pub length: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotation_y: f64,
}

impl KittiRow {
    /// A row with only the class and box set.
    pub fn new(class: &str, bbox: Rect<Pixel>) -> Self {
        Self {
            class: class.to_string(),
            left: bbox.x,
            top: bbox.y,
            right: bbox.right(),
            bottom: bbox.bottom(),
            ..Default::default()
        }
    }

    pub fn bbox(&self) -> Rect<Pixel> {
        Rect::from_xyxy(self.left, self.top, self.right, self.bottom)
    }
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

fn kitti_parse_error(path: &Path, err: csv::Error) -> HoplabelError {
    let line = err.position().map_or(0, |p| p.line() as usize);
    HoplabelError::KittiParse {
        path: path.to_path_buf(),
        line,
        message: err.to_string(),
    }
}

fn rows_from_reader<R: Read>(reader: R, path: &Path) -> Result<Vec<KittiRow>, HoplabelError> {
    let mut csv_reader = reader_builder().from_reader(reader);
    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|err| kitti_parse_error(path, err))?;
        if record.len() != FIELD_COUNT {
            return Err(HoplabelError::KittiParse {
                path: path.to_path_buf(),
                line: record.position().map_or(0, |p| p.line() as usize),
                message: format!("expected {FIELD_COUNT} fields, found {}", record.len()),
            });
        }
        let row: KittiRow = record
            .deserialize(None)
            .map_err(|err| kitti_parse_error(path, err))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Reads every row of a label file. The first malformed line fails the file.
pub fn read_kitti_file(path: &Path) -> Result<Vec<KittiRow>, HoplabelError> {
    let file = File::open(path).map_err(HoplabelError::Io)?;
    rows_from_reader(BufReader::new(file), path)
}

pub fn from_kitti_str(text: &str) -> Result<Vec<KittiRow>, HoplabelError> {
    rows_from_reader(text.as_bytes(), Path::new("<string>"))
}

pub fn from_kitti_slice(bytes: &[u8]) -> Result<Vec<KittiRow>, HoplabelError> {
    rows_from_reader(bytes, Path::new("<bytes>"))
}

fn writer_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.delimiter(b' ').has_headers(false);
    builder
}

pub fn write_kitti_file(path: &Path, rows: &[KittiRow]) -> Result<(), HoplabelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(HoplabelError::Io)?;
    }
    let file = File::create(path).map_err(HoplabelError::Io)?;
    let mut csv_writer = writer_builder().from_writer(BufWriter::new(file));
    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(|err| HoplabelError::Io(std::io::Error::other(err.to_string())))?;
    }
    csv_writer.flush().map_err(HoplabelError::Io)
}

pub fn to_kitti_string(rows: &[KittiRow]) -> Result<String, HoplabelError> {
    let mut csv_writer = writer_builder().from_writer(Vec::new());
    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(|err| HoplabelError::Io(std::io::Error::other(err.to_string())))?;
    }
    let bytes = csv_writer
        .into_inner()
        .map_err(|err| HoplabelError::Io(std::io::Error::other(err.to_string())))?;
    String::from_utf8(bytes).map_err(|err| HoplabelError::Io(std::io::Error::other(err.to_string())))
}

/// Class index of a KITTI class name.
pub fn class_index_of(class_names: &[String], name: &str) -> Option<u32> {
    if let Some(pos) = class_names
        .iter()
        .position(|n| n.eq_ignore_ascii_case(name))
    {
        return Some(pos as u32);
    }
    name.strip_prefix(CLASS_PREFIX)?
        .parse::<u32>()
        .ok()
        .filter(|c| *c <= MAX_CLASS_ID)
}

/// KITTI class name of a class index.
pub fn class_name_of(class_names: &[String], class: u32) -> String {
    class_names
        .get(class as usize)
        .cloned()
        .unwrap_or_else(|| format!("{CLASS_PREFIX}{class}"))
}

/// Objects of a label file, numbered from 1 in line order.
pub fn rows_to_objects(
    rows: &[KittiRow],
    size: Size,
    class_names: &[String],
    path: &Path,
) -> Result<Vec<ObjectLabel>, HoplabelError> {
    let mut objects = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let category = if row.class == DONT_CARE {
            Category::Excluded
        } else {
            let class = class_index_of(class_names, &row.class).ok_or_else(|| {
                HoplabelError::KittiParse {
                    path: path.to_path_buf(),
                    line: i + 1,
                    message: format!("unknown class '{}'", row.class),
                }
            })?;
            Category::Objective(class)
        };
        let rect: Rect<Normalized> = row.bbox().to_normalized(size);
        objects.push(ObjectLabel::new(
            ObjectId::new(i as i64 + 1),
            category,
            1.0,
            rect.vertexes(),
        ));
    }
    Ok(objects)
}

/// Rows for every exportable object of `label`. Returns the rows and the
/// number of skipped objects.
pub fn label_to_rows(label: &ImageLabel, size: Size, class_names: &[String]) -> (Vec<KittiRow>, usize) {
    let mut rows = Vec::with_capacity(label.objects.len());
    let mut skipped = 0;
    for ob in &label.objects {
        let class = match ob.category.value {
            Category::Objective(class) => class_name_of(class_names, class),
            Category::Excluded => DONT_CARE.to_string(),
            _ => {
                skipped += 1;
                continue;
            }
        };
        rows.push(KittiRow::new(&class, ob.rect().to_pixel(size)));
    }
    (rows, skipped)
}

/// KITTI dataset rooted at a folder.
#[derive(Clone, Debug)]
pub struct KittiSet {
    folder: PathBuf,
    opts: SetOptions,
}

impl KittiSet {
    pub fn new(folder: &Path, opts: SetOptions) -> Self {
        Self {
            folder: folder.to_path_buf(),
            opts,
        }
    }

    pub fn valid_set(folder: &Path, _meta_id: u32) -> bool {
        folder.join(IMAGES_DIR).is_dir() && folder.join(LABELS_DIR).is_dir()
    }

    pub fn images_dir(&self) -> PathBuf {
        self.folder.join(IMAGES_DIR)
    }

    pub fn labels_dir(&self) -> PathBuf {
        self.folder.join(LABELS_DIR)
    }

    fn label_files(&self) -> Result<Vec<PathBuf>, HoplabelError> {
        let dir = self.labels_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let files = collect_files_with_extensions(&dir, &[LABEL_EXTENSION])?;
        Ok(files
            .into_iter()
            .filter(|f| self.opts.accepts_stem(&stem_string(f)))
            .collect())
    }

    fn load_pair(&self, label_file: &Path) -> Result<ImageLabelPair, HoplabelError> {
        let labels_dir = self.labels_dir();
        let label_rel = label_file.strip_prefix(&labels_dir).unwrap_or(label_file);
        let image = find_image_for_label(&self.images_dir(), label_rel).ok_or_else(|| {
            HoplabelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "no image for label '{}' in {}",
                    rel_string(&labels_dir, label_file),
                    self.images_dir().display()
                ),
            ))
        })?;
        let size = read_image_size(&image)?;
        let rows = read_kitti_file(label_file)?;
        let objects = rows_to_objects(&rows, size, &self.opts.class_names, label_file)?;
        Ok((image, ImageLabel::new(KITTI_AGENT, objects)))
    }
}

impl LabelSet for KittiSet {
    fn format(&self) -> LabelFormat {
        LabelFormat::Kitti
    }

    fn folder(&self) -> &Path {
        &self.folder
    }

    fn len(&self) -> usize {
        self.label_files().map(|f| f.len()).unwrap_or(0)
    }

    fn find_pairs(&self) -> Result<LoadedPairs, HoplabelError> {
        let mut loaded = LoadedPairs::default();
        for label_file in self.label_files()? {
            match self.load_pair(&label_file) {
                Ok(pair) => loaded.pairs.push(pair),
                Err(err) => loaded.fail(&label_file, &err),
            }
        }
        log::info!(
            "loaded {} KITTI label(s) from {}",
            loaded.pairs.len(),
            self.labels_dir().display()
        );
        Ok(loaded)
    }

    fn save(&self, pairs: &[ImageLabelPair]) -> Result<SaveSummary, HoplabelError> {
        let labels_dir = self.labels_dir();
        fs::create_dir_all(self.images_dir()).map_err(HoplabelError::Io)?;
        fs::create_dir_all(&labels_dir).map_err(HoplabelError::Io)?;

        let mut summary = SaveSummary::default();
        let images_dir = self.images_dir();
        for (image, label) in pairs {
            let stem = stem_string(image);
            let path = labels_dir.join(&stem).with_extension(LABEL_EXTENSION);
            if let Err(err) = place_image(image, &images_dir, &stem) {
                summary.fail(image, &err);
            }
            let size = match read_image_size(image) {
                Ok(size) => size,
                Err(err) => {
                    summary.fail(&path, &err);
                    continue;
                }
            };
            let (rows, skipped) = label_to_rows(label, size, &self.opts.class_names);
            match write_kitti_file(&path, &rows) {
                Ok(()) => {
                    summary.labels += 1;
                    summary.objects += rows.len();
                    summary.skipped_objects += skipped;
                }
                Err(err) => summary.fail(&path, &err),
            }
        }
        Ok(summary)
    }
}

/// Fuzz-only entrypoint for KITTI label parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_kitti(bytes: &[u8]) -> Result<(), HoplabelError> {
    let _ = from_kitti_slice(bytes)?;
    Ok(())
}
