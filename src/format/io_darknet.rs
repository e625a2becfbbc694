//! Darknet text labels.
//!
//! A Darknet set pairs `images/` with `labels/`. Each label file holds one
//! line per object:
//!
//! ```text
//! <class> <x_center> <y_center> <width> <height>
//! ```
//!
//! with the box normalized to the image size. Only objective categories can
//! be written; everything else is skipped on export. Writing a set also
//! places each source image under `images/` so the output reads back.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::files::{
    collect_files_with_extensions, find_image_for_label, place_image, read_image_size, rel_string,
    stem_string,
};
use super::{FileFailure, LabelFormat, LabelSet, LoadedPairs, SaveSummary, SetOptions};
use crate::error::HoplabelError;
use crate::geom::{Normalized, Pixel, Rect};
use crate::label::{
    Category, ImageLabel, ImageLabelPair, ObjectId, ObjectLabel, DEFAULT_EXTEND_PX, MAX_CLASS_ID,
};

const LABEL_EXTENSION: &str = "txt";
pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";
/// Sidecar written next to `labels/` when labels were cropped to their ROI:
/// image stem to the pixel crop window the labels are relative to.
pub const CROP_WINDOWS_FILE: &str = "crop_windows.json";
/// User agent stamped on labels read from Darknet files.
pub const DARKNET_AGENT: &str = "darknet";
/// Confidence given to imported Darknet objects.
const IMPORT_CONF: f64 = 1.0;

/// One parsed label line.
#[derive(Clone, Debug, PartialEq)]
pub struct DarknetRow {
    pub class_id: u32,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl DarknetRow {
    pub fn rect(&self) -> Rect<Normalized> {
        Rect::from_cxcywh(self.cx, self.cy, self.w, self.h)
    }

    /// Row for an objective object; `None` for every other category.
    pub fn from_object(ob: &ObjectLabel) -> Option<Self> {
        let class_id = ob.category.value.class_index()?;
        let (cx, cy, w, h) = ob.rect().to_cxcywh();
        Some(Self {
            class_id,
            cx,
            cy,
            w,
            h,
        })
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.cx, self.cy, self.w, self.h
        )
    }
}

/// Parses one label line. Blank lines yield `None`.
pub fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<DarknetRow>, HoplabelError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take at most 6 tokens so pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();

    if tokens.len() != 5 {
        return Err(HoplabelError::DarknetParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: if tokens.len() > 5 {
                "expected 5 tokens, found more".to_string()
            } else {
                format!("expected 5 tokens, found {}", tokens.len())
            },
        });
    }

    let class_id = tokens[0]
        .parse::<u32>()
        .ok()
        .filter(|c| *c <= MAX_CLASS_ID)
        .ok_or_else(|| HoplabelError::DarknetParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!(
                "invalid class_id '{}'; expected integer in 0..={MAX_CLASS_ID}",
                tokens[0]
            ),
        })?;

    let cx = parse_f64_token(tokens[1], "x_center", file_path, line_num)?;
    let cy = parse_f64_token(tokens[2], "y_center", file_path, line_num)?;
    let w = parse_f64_token(tokens[3], "width", file_path, line_num)?;
    let h = parse_f64_token(tokens[4], "height", file_path, line_num)?;

    Ok(Some(DarknetRow { class_id, cx, cy, w, h }))
}

fn parse_f64_token(
    raw: &str,
    field_name: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, HoplabelError> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| HoplabelError::DarknetParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("invalid {field_name} '{raw}'; expected floating-point number"),
        })?;
    if !value.is_finite() {
        return Err(HoplabelError::DarknetParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("{field_name} '{raw}' is not finite"),
        });
    }
    Ok(value)
}

/// Reads every row of a label file. The first malformed line fails the file.
pub fn read_darknet_file(path: &Path) -> Result<Vec<DarknetRow>, HoplabelError> {
    let content = fs::read_to_string(path).map_err(HoplabelError::Io)?;
    let mut rows = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if let Some(row) = parse_label_line(line, path, line_idx + 1)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Objects of a label file, numbered from 1 in line order.
pub fn rows_to_objects(rows: &[DarknetRow]) -> Vec<ObjectLabel> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            ObjectLabel::new(
                ObjectId::new(i as i64 + 1),
                Category::Objective(row.class_id),
                IMPORT_CONF,
                row.rect().vertexes(),
            )
        })
        .collect()
}

/// Writes the rows of every objective object in `label`. Returns
/// `(written, skipped)` object counts.
pub fn write_darknet_file(path: &Path, label: &ImageLabel) -> Result<(usize, usize), HoplabelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(HoplabelError::Io)?;
    }
    let mut file = fs::File::create(path).map_err(HoplabelError::Io)?;

    let mut written = 0;
    let mut skipped = 0;
    for ob in &label.objects {
        match DarknetRow::from_object(ob) {
            Some(row) => {
                writeln!(file, "{}", row.to_line()).map_err(HoplabelError::Io)?;
                written += 1;
            }
            None => {
                log::debug!(
                    "{}: object {} has category {}, not exported",
                    path.display(),
                    ob.id,
                    ob.category.value
                );
                skipped += 1;
            }
        }
    }
    Ok((written, skipped))
}

/// Writes the class list as `data.yaml`.
pub fn write_data_yaml(output_root: &Path, class_names: &[String]) -> Result<(), HoplabelError> {
    let mut yaml = format!("nc: {}\nnames:\n", class_names.len());
    for (idx, name) in class_names.iter().enumerate() {
        yaml.push_str(&format!("  {}: {}\n", idx, yaml_single_quoted(name)));
    }

    let path = output_root.join("data.yaml");
    fs::write(&path, yaml).map_err(HoplabelError::Io)
}

fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

/// Darknet dataset rooted at a folder.
#[derive(Clone, Debug)]
pub struct DarknetSet {
    folder: PathBuf,
    opts: SetOptions,
}

impl DarknetSet {
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

        let rows = read_darknet_file(label_file)?;
        Ok((image, ImageLabel::new(DARKNET_AGENT, rows_to_objects(&rows))))
    }

    /// Crops `label` to its ROI when the image size is readable.
    fn crop_label(&self, image: &Path, label: &ImageLabel) -> Option<(Rect<Pixel>, ImageLabel)> {
        match read_image_size(image) {
            Ok(size) => {
                let (window, cropped) = label.crop_by_roi(size, DEFAULT_EXTEND_PX);
                Some((window.to_pixel(size), cropped))
            }
            Err(err) => {
                log::warn!("not cropping {}: {}", image.display(), err);
                None
            }
        }
    }
}

impl LabelSet for DarknetSet {
    fn format(&self) -> LabelFormat {
        LabelFormat::Darknet
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
            "loaded {} Darknet label(s) from {}",
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
        let mut windows: BTreeMap<String, Rect<Pixel>> = BTreeMap::new();
        let images_dir = self.images_dir();

        for (image, label) in pairs {
            let stem = stem_string(image);
            let path = labels_dir.join(&stem).with_extension(LABEL_EXTENSION);
            if let Err(err) = place_image(image, &images_dir, &stem) {
                summary.fail(image, &err);
            }

            let cropped = if self.opts.crop_roi {
                self.crop_label(image, label)
            } else {
                None
            };
            let to_write = match &cropped {
                Some((window, cropped)) => {
                    windows.insert(stem, *window);
                    cropped
                }
                None => label,
            };

            match write_darknet_file(&path, to_write) {
                Ok((written, skipped)) => {
                    summary.labels += 1;
                    summary.objects += written;
                    summary.skipped_objects += skipped;
                }
                Err(err) => summary.fail(&path, &err),
            }
        }

        if !windows.is_empty() {
            let path = self.folder.join(CROP_WINDOWS_FILE);
            let json = serde_json::to_string_pretty(&windows).map_err(|source| {
                HoplabelError::CropWindowsWrite {
                    path: path.clone(),
                    source,
                }
            })?;
            if let Err(err) = fs::write(&path, json) {
                summary
                    .failures
                    .push(FileFailure::new(&path, &HoplabelError::Io(err)));
            }
        }

        if !self.opts.class_names.is_empty() {
            write_data_yaml(&self.folder, &self.opts.class_names)?;
        }

        Ok(summary)
    }
}

/// Fuzz-only entrypoint for Darknet single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), HoplabelError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}
