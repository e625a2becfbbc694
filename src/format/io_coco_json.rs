//! COCO JSON reader and writer.
//!
//! COCO keeps a whole dataset in one file with `images`, `categories` and
//! `annotations` arrays. Boxes are `[x, y, width, height]` in absolute
//! pixels, so converting to labels needs each image's size, which COCO
//! stores alongside the file name.
//!
//! Category ids map to objective classes in one of two ways:
//! - without a class-name list, COCO id `c` becomes class `c - 1` (id 0 is
//!   not mappable);
//! - with a list, a category maps to the index of its name in the list and
//!   categories not in the list are dropped.
//!
//! A category named `pending` always maps to [`Category::Pending`].
//!
//! The writer sorts every list by id so output is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::files::{place_image, read_image_size, rel_string, stem_string};
use super::{FileFailure, LabelFormat, LabelSet, LoadedPairs, SaveSummary, SetOptions};
use crate::error::HoplabelError;
use crate::geom::{Pixel, Point, Rect, Size};
use crate::label::{
    Category, ImageLabel, ImageLabelPair, ObjectId, ObjectLabel, MAX_CLASS_ID,
};

/// File name of the annotation file inside a COCO set folder.
pub const ANNOTATIONS_FILE: &str = "annotations.json";
/// Name of the COCO category that marks an image as not yet labeled.
pub const PENDING_CATEGORY: &str = "pending";
pub const COCO_AGENT: &str = "coco";

// ============================================================================
// COCO Schema Types
// ============================================================================

/// Top-level COCO dataset structure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default)]
    pub images: Vec<CocoImage>,

    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,

    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub file_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u64,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,

    /// `[x, y, width, height]` with `(x, y)` the top-left corner.
    pub bbox: [f64; 4],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iscrowd: Option<u8>,

    /// Polygons or RLE; accepted but ignored on read.
    #[serde(default)]
    pub segmentation: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl CocoAnnotation {
    pub fn rect(&self) -> Rect<Pixel> {
        let [x, y, w, h] = self.bbox;
        Rect::new(x, y, w, h)
    }
}

impl CocoDataset {
    /// Id of the category called `name`.
    pub fn find_cat(&self, name: &str) -> Option<u64> {
        self.categories.iter().find(|c| c.name == name).map(|c| c.id)
    }

    /// COCO category id to class index, see the module docs.
    pub fn class_map(&self, class_names: Option<&[String]>) -> BTreeMap<u64, u32> {
        self.categories
            .iter()
            .filter(|c| c.name != PENDING_CATEGORY)
            .filter_map(|c| {
                let class = match class_names {
                    Some(names) => names.iter().position(|n| *n == c.name)? as u32,
                    None => u32::try_from(c.id.checked_sub(1)?)
                        .ok()
                        .filter(|class| *class <= MAX_CLASS_ID)?,
                };
                Some((c.id, class))
            })
            .collect()
    }

    /// Annotations grouped by image id, in annotation id order.
    fn annotations_by_image(&self) -> BTreeMap<u64, Vec<&CocoAnnotation>> {
        let mut grouped: BTreeMap<u64, Vec<&CocoAnnotation>> = BTreeMap::new();
        for ann in &self.annotations {
            grouped.entry(ann.image_id).or_default().push(ann);
        }
        for anns in grouped.values_mut() {
            anns.sort_by_key(|a| a.id);
        }
        grouped
    }
}

// ============================================================================
// Public API
// ============================================================================

pub fn read_coco_json(path: &Path) -> Result<CocoDataset, HoplabelError> {
    let file = File::open(path).map_err(HoplabelError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| HoplabelError::CocoJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `coco` with every list sorted by id.
pub fn write_coco_json(path: &Path, coco: &CocoDataset) -> Result<(), HoplabelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(HoplabelError::Io)?;
    }
    let file = File::create(path).map_err(HoplabelError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, &sorted(coco)).map_err(|source| {
        HoplabelError::CocoJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

pub fn from_coco_str(json: &str) -> Result<CocoDataset, serde_json::Error> {
    serde_json::from_str(json)
}

/// Useful for fuzzing raw bytes without UTF-8 validation.
pub fn from_coco_slice(bytes: &[u8]) -> Result<CocoDataset, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn to_coco_string(coco: &CocoDataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&sorted(coco))
}

fn sorted(coco: &CocoDataset) -> CocoDataset {
    let mut coco = coco.clone();
    coco.images.sort_by_key(|i| i.id);
    coco.categories.sort_by_key(|c| c.id);
    coco.annotations.sort_by_key(|a| a.id);
    coco
}

// ============================================================================
// Conversion: COCO -> labels
// ============================================================================

/// Converts every COCO image into a label. Image paths are `file_name`
/// joined to `image_root`.
pub fn coco_to_labels(
    coco: &CocoDataset,
    image_root: &Path,
    class_names: Option<&[String]>,
) -> Vec<ImageLabelPair> {
    let class_map = coco.class_map(class_names);
    let pending = coco.find_cat(PENDING_CATEGORY);
    let mut by_image = coco.annotations_by_image();

    let mut images: Vec<&CocoImage> = coco.images.iter().collect();
    images.sort_by_key(|i| i.id);

    images
        .into_iter()
        .map(|image| {
            let size = Size::new(image.width, image.height);
            let anns = by_image.remove(&image.id).unwrap_or_default();
            let mut objects = Vec::with_capacity(anns.len());

            for ann in anns {
                let category = if Some(ann.category_id) == pending {
                    Category::Pending
                } else if let Some(class) = class_map.get(&ann.category_id) {
                    Category::Objective(*class)
                } else {
                    log::debug!(
                        "annotation {} has unmapped category {}, skipped",
                        ann.id,
                        ann.category_id
                    );
                    continue;
                };
                if size.is_empty() {
                    log::warn!("image {} has no size, annotation {} skipped", image.id, ann.id);
                    continue;
                }
                let id = ObjectId::new(objects.len() as i64 + 1);
                let rect = ann.rect().to_normalized(size);
                objects.push(ObjectLabel::new(
                    id,
                    category,
                    ann.score.unwrap_or(1.0),
                    rect.vertexes(),
                ));
            }

            (
                image_root.join(&image.file_name),
                ImageLabel::new(COCO_AGENT, objects),
            )
        })
        .collect()
}

// ============================================================================
// Conversion: labels -> COCO
// ============================================================================

/// Builds a COCO dataset from labels and their image sizes.
///
/// Category ids are `class + 1`, named from `class_names` when known.
/// Only objective objects are written. File names are relative to
/// `image_root` when the image lies under it.
pub fn labels_to_coco(
    labeled: &[(ImageLabelPair, Size)],
    image_root: &Path,
    class_names: &[String],
) -> CocoDataset {
    let mut coco = CocoDataset::default();
    let mut used_classes: BTreeSet<u32> = BTreeSet::new();
    let mut next_ann_id = 1u64;

    for (index, ((image, label), size)) in labeled.iter().enumerate() {
        let image_id = index as u64 + 1;
        coco.images.push(CocoImage {
            id: image_id,
            width: size.width,
            height: size.height,
            file_name: rel_string(image_root, image),
        });

        for ob in &label.objects {
            let Some(class) = ob.category.value.class_index() else {
                continue;
            };
            used_classes.insert(class);
            let r = ob.rect().to_pixel(*size);
            coco.annotations.push(CocoAnnotation {
                id: next_ann_id,
                image_id,
                category_id: class as u64 + 1,
                bbox: [r.x, r.y, r.width, r.height],
                area: Some(r.area()),
                iscrowd: Some(0),
                segmentation: serde_json::Value::Array(vec![]),
                score: Some(ob.category.conf),
            });
            next_ann_id += 1;
        }
    }

    let class_count =
        (class_names.len() as u32).max(used_classes.last().map_or(0, |max| max + 1));
    coco.categories = (0..class_count)
        .map(|class| CocoCategory {
            id: class as u64 + 1,
            name: class_names
                .get(class as usize)
                .cloned()
                .unwrap_or_else(|| format!("class_{class}")),
            supercategory: None,
        })
        .collect();
    coco
}

// ============================================================================
// COCO -> Darknet
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct CocoToDarknetOptions {
    /// Target class names; `None` maps COCO id `c` to class `c - 1`.
    pub class_names: Option<Vec<String>>,
    /// Pixel region the output is restricted to.
    pub crop: Option<Rect<Pixel>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CocoToDarknetReport {
    /// COCO category id to Darknet class.
    pub class_map: BTreeMap<u64, u32>,
    pub images_written: usize,
    /// File names of images skipped for carrying a pending annotation.
    pub images_skipped: Vec<String>,
    pub annotations_written: usize,
    pub annotations_unmapped: usize,
    pub annotations_outside_crop: usize,
    /// Images or labels that could not be written.
    pub failures: Vec<FileFailure>,
}

/// Writes a COCO file as a Darknet set under `out_dir`.
///
/// Label files are named after the COCO image id (`0007.txt`) and each
/// source image, resolved next to the COCO file, is placed beside it as
/// `images/0007.<ext>`. Images that carry any pending annotation are
/// skipped. With a crop, annotations not fully inside it are dropped and the
/// rest are expressed relative to the crop and normalized by its size; the
/// image itself is placed uncropped. A file that cannot be written is
/// recorded in the report and the run goes on.
pub fn coco_to_darknet(
    coco_path: &Path,
    out_dir: &Path,
    opts: &CocoToDarknetOptions,
) -> Result<CocoToDarknetReport, HoplabelError> {
    let coco = read_coco_json(coco_path)?;

    if let Some(crop) = &opts.crop {
        if crop.is_degenerate() || !crop.is_finite() {
            return Err(HoplabelError::Validation {
                message: format!("invalid crop rect {crop:?}"),
            });
        }
    }

    let mut report = CocoToDarknetReport {
        class_map: coco.class_map(opts.class_names.as_deref()),
        ..Default::default()
    };
    log::info!("class map: {:?}", report.class_map);

    let source_dir = coco_path.parent().unwrap_or_else(|| Path::new(""));
    let images_dir = out_dir.join(super::io_darknet::IMAGES_DIR);
    fs::create_dir_all(&images_dir).map_err(HoplabelError::Io)?;
    let labels_dir = out_dir.join(super::io_darknet::LABELS_DIR);
    fs::create_dir_all(&labels_dir).map_err(HoplabelError::Io)?;

    let pending = coco.find_cat(PENDING_CATEGORY);
    let mut by_image = coco.annotations_by_image();
    let mut images: Vec<&CocoImage> = coco.images.iter().collect();
    images.sort_by_key(|i| i.id);

    for image in images {
        let anns = by_image.remove(&image.id).unwrap_or_default();
        if pending.is_some() && anns.iter().any(|a| Some(a.category_id) == pending) {
            log::info!("skipping {}: has pending annotations", image.file_name);
            report.images_skipped.push(image.file_name.clone());
            continue;
        }

        let (origin, size) = match &opts.crop {
            Some(crop) => (
                Point::new(crop.x, crop.y),
                Size::new(crop.width as u32, crop.height as u32),
            ),
            None => (Point::new(0.0, 0.0), Size::new(image.width, image.height)),
        };
        if size.is_empty() {
            log::warn!("skipping {}: image has no size", image.file_name);
            report.images_skipped.push(image.file_name.clone());
            continue;
        }

        let stem = format!("{:04}", image.id);
        let source = source_dir.join(&image.file_name);
        if let Err(err) = place_image(&source, &images_dir, &stem) {
            log::warn!("skipping {}: {}", image.file_name, err);
            report.failures.push(FileFailure::new(&source, &err));
            continue;
        }

        let mut lines = String::new();
        let mut written = 0;
        for ann in anns {
            let Some(class) = report.class_map.get(&ann.category_id).copied() else {
                report.annotations_unmapped += 1;
                continue;
            };
            let r = ann.rect();
            if let Some(crop) = &opts.crop {
                if !crop.contains_rect(&r) {
                    log::warn!(
                        "{}: annotation {} lies outside the crop, dropped",
                        image.file_name,
                        ann.id
                    );
                    report.annotations_outside_crop += 1;
                    continue;
                }
            }
            let (cx, cy, w, h) = r.relative_to(&origin).to_normalized(size).to_cxcywh();
            lines.push_str(&format!("{class} {cx:.6} {cy:.6} {w:.6} {h:.6}\n"));
            written += 1;
        }

        let label_path = labels_dir.join(format!("{stem}.txt"));
        if let Err(err) = fs::write(&label_path, lines) {
            let err = HoplabelError::Io(err);
            log::warn!("failed to write {}: {}", label_path.display(), err);
            report.failures.push(FileFailure::new(&label_path, &err));
            continue;
        }
        report.annotations_written += written;
        report.images_written += 1;
    }

    Ok(report)
}

// ============================================================================
// COCO set
// ============================================================================

/// A folder holding `annotations.json`, with image paths relative to the
/// folder.
#[derive(Clone, Debug)]
pub struct CocoSet {
    folder: PathBuf,
    opts: SetOptions,
}

impl CocoSet {
    pub fn new(folder: &Path, opts: SetOptions) -> Self {
        Self {
            folder: folder.to_path_buf(),
            opts,
        }
    }

    pub fn valid_set(folder: &Path, _meta_id: u32) -> bool {
        folder.join(ANNOTATIONS_FILE).is_file()
    }

    pub fn annotations_path(&self) -> PathBuf {
        self.folder.join(ANNOTATIONS_FILE)
    }

    fn class_names(&self) -> Option<&[String]> {
        if self.opts.class_names.is_empty() {
            None
        } else {
            Some(&self.opts.class_names)
        }
    }
}

impl LabelSet for CocoSet {
    fn format(&self) -> LabelFormat {
        LabelFormat::Coco
    }

    fn folder(&self) -> &Path {
        &self.folder
    }

    fn len(&self) -> usize {
        read_coco_json(&self.annotations_path())
            .map(|coco| coco.images.len())
            .unwrap_or(0)
    }

    fn find_pairs(&self) -> Result<LoadedPairs, HoplabelError> {
        let coco = read_coco_json(&self.annotations_path())?;
        let pairs = coco_to_labels(&coco, &self.folder, self.class_names())
            .into_iter()
            .filter(|(image, _)| self.opts.accepts_stem(&stem_string(image)))
            .collect();
        Ok(LoadedPairs {
            pairs,
            failures: Vec::new(),
        })
    }

    fn save(&self, pairs: &[ImageLabelPair]) -> Result<SaveSummary, HoplabelError> {
        let mut summary = SaveSummary::default();
        let mut labeled = Vec::with_capacity(pairs.len());
        for (image, label) in pairs {
            match read_image_size(image) {
                Ok(size) => labeled.push(((image.clone(), label.clone()), size)),
                Err(err) => summary.fail(image, &err),
            }
        }

        let coco = labels_to_coco(&labeled, &self.folder, &self.opts.class_names);
        write_coco_json(&self.annotations_path(), &coco)?;

        summary.labels = coco.images.len();
        summary.objects = coco.annotations.len();
        summary.skipped_objects = labeled
            .iter()
            .map(|((_, label), _)| label.objects.len())
            .sum::<usize>()
            - coco.annotations.len();
        Ok(summary)
    }
}

/// Fuzz-only entrypoint for COCO JSON parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_coco_json(bytes: &[u8]) -> Result<(), serde_json::Error> {
    let coco = from_coco_slice(bytes)?;
    let _ = coco_to_labels(&coco, Path::new(""), None);
    Ok(())
}
