//! Dataset formats and format detection.
//!
//! Each on-disk layout is a [`LabelFormat`] variant with one [`LabelSet`]
//! implementation. A folder's format is either given explicitly or detected
//! by probing the marker directories of each format in a fixed order:
//!
//! 1. native (`hop_m{meta_id}/`)
//! 2. Darknet (`images/` + `labels/`)
//! 3. KITTI (`image_2/` + `label_2/`)
//!
//! COCO is a single JSON file and is only used when asked for explicitly.

pub mod files;
pub mod io_coco_json;
pub mod io_darknet;
pub mod io_hop_json;
pub mod io_kitti;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::HoplabelError;
use crate::label::ImageLabelPair;

pub use io_coco_json::CocoSet;
pub use io_darknet::DarknetSet;
pub use io_hop_json::HopSet;
pub use io_kitti::KittiSet;

/// Supported dataset layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabelFormat {
    /// Native per-image JSON labels.
    Hop,
    Darknet,
    Coco,
    Kitti,
}

impl LabelFormat {
    pub const ALL: [LabelFormat; 4] = [
        LabelFormat::Hop,
        LabelFormat::Darknet,
        LabelFormat::Coco,
        LabelFormat::Kitti,
    ];

    /// Parses a format name, case-insensitively. Accepts a few aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hop" | "native" | "json" => Some(LabelFormat::Hop),
            "darknet" | "yolo" => Some(LabelFormat::Darknet),
            "coco" | "coco-json" => Some(LabelFormat::Coco),
            "kitti" => Some(LabelFormat::Kitti),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LabelFormat::Hop => "hop",
            LabelFormat::Darknet => "darknet",
            LabelFormat::Coco => "coco",
            LabelFormat::Kitti => "kitti",
        }
    }
}

impl fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options shared by every label set.
#[derive(Clone, Debug, Default)]
pub struct SetOptions {
    /// Taxonomy id; selects `hop_m{id}` and `ias_m{id}` folders.
    pub meta_id: u32,
    /// Class names indexed by objective category, for formats that store
    /// names (KITTI) or write a class list (Darknet `data.yaml`).
    pub class_names: Vec<String>,
    /// Crop each label to its ROI when writing Darknet sets.
    pub crop_roi: bool,
    /// Wildcard on image stems; `None` keeps everything.
    pub pattern: Option<String>,
}

impl SetOptions {
    pub fn new(meta_id: u32) -> Self {
        Self {
            meta_id,
            ..Default::default()
        }
    }

    /// Returns true if `stem` passes the stem pattern.
    pub fn accepts_stem(&self, stem: &str) -> bool {
        self.pattern
            .as_deref()
            .map_or(true, |p| files::wildcard_match(p, stem))
    }
}

/// A file that could not be read or written during a batch operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

impl FileFailure {
    pub fn new(path: impl Into<PathBuf>, err: &HoplabelError) -> Self {
        Self {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of reading a whole set: every label that loaded, plus the files
/// that did not.
#[derive(Debug, Default)]
pub struct LoadedPairs {
    pub pairs: Vec<ImageLabelPair>,
    pub failures: Vec<FileFailure>,
}

impl LoadedPairs {
    /// Records a failed file and logs it.
    pub(crate) fn fail(&mut self, path: &Path, err: &HoplabelError) {
        log::warn!("skipping {}: {}", path.display(), err);
        self.failures.push(FileFailure::new(path, err));
    }
}

/// Counts from writing a set.
#[derive(Debug, Default, PartialEq)]
pub struct SaveSummary {
    /// Label files written.
    pub labels: usize,
    /// Objects written across all label files.
    pub objects: usize,
    /// Objects not representable in the target format.
    pub skipped_objects: usize,
    pub failures: Vec<FileFailure>,
}

impl SaveSummary {
    pub(crate) fn fail(&mut self, path: &Path, err: &HoplabelError) {
        log::warn!("failed to write {}: {}", path.display(), err);
        self.failures.push(FileFailure::new(path, err));
    }
}

/// A dataset folder in one format.
pub trait LabelSet {
    fn format(&self) -> LabelFormat;

    fn folder(&self) -> &Path;

    /// Number of label files in the set.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads every image/label pair. Per-file errors are collected, not
    /// returned; only a missing or unreadable set fails the call.
    fn find_pairs(&self) -> Result<LoadedPairs, HoplabelError>;

    /// Writes `pairs` into this set's folder, creating it as needed.
    fn save(&self, pairs: &[ImageLabelPair]) -> Result<SaveSummary, HoplabelError>;
}

/// Marker check for one detectable format.
type ValidSetFn = fn(&Path, u32) -> bool;

/// Detection order; the first format whose marker matches wins.
const DETECTION_TABLE: [(LabelFormat, ValidSetFn); 3] = [
    (LabelFormat::Hop, HopSet::valid_set),
    (LabelFormat::Darknet, DarknetSet::valid_set),
    (LabelFormat::Kitti, KittiSet::valid_set),
];

/// Detects the format of `folder`.
pub fn detect_format(folder: &Path, meta_id: u32) -> Result<LabelFormat, HoplabelError> {
    DETECTION_TABLE
        .iter()
        .find(|(_, valid)| valid(folder, meta_id))
        .map(|(format, _)| *format)
        .ok_or_else(|| HoplabelError::FormatNotFound {
            path: folder.to_path_buf(),
            meta_id,
        })
}

/// Creates the set of `format` rooted at `folder` without probing it.
pub fn label_set_for(format: LabelFormat, folder: &Path, opts: &SetOptions) -> Box<dyn LabelSet> {
    match format {
        LabelFormat::Hop => Box::new(HopSet::new(folder, opts.clone())),
        LabelFormat::Darknet => Box::new(DarknetSet::new(folder, opts.clone())),
        LabelFormat::Coco => Box::new(CocoSet::new(folder, opts.clone())),
        LabelFormat::Kitti => Box::new(KittiSet::new(folder, opts.clone())),
    }
}

/// Opens an existing set. An explicit `format` skips detection.
pub fn open_label_set(
    folder: &Path,
    format: Option<LabelFormat>,
    opts: &SetOptions,
) -> Result<Box<dyn LabelSet>, HoplabelError> {
    let format = match format {
        Some(format) => format,
        None => detect_format(folder, opts.meta_id)?,
    };
    log::debug!("opening {} as {}", folder.display(), format);
    Ok(label_set_for(format, folder, opts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_names_and_aliases() {
        assert_eq!(LabelFormat::parse("HOP"), Some(LabelFormat::Hop));
        assert_eq!(LabelFormat::parse("yolo"), Some(LabelFormat::Darknet));
        assert_eq!(LabelFormat::parse("coco-json"), Some(LabelFormat::Coco));
        assert_eq!(LabelFormat::parse("kitti"), Some(LabelFormat::Kitti));
        assert_eq!(LabelFormat::parse("voc"), None);
        for f in LabelFormat::ALL {
            assert_eq!(LabelFormat::parse(f.name()), Some(f));
        }
    }

    #[test]
    fn detection_follows_priority() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path();

        assert!(matches!(
            detect_format(root, 1),
            Err(HoplabelError::FormatNotFound { meta_id: 1, .. })
        ));

        fs::create_dir_all(root.join("image_2")).expect("mkdir");
        fs::create_dir_all(root.join("label_2")).expect("mkdir");
        assert_eq!(detect_format(root, 1).unwrap(), LabelFormat::Kitti);

        fs::create_dir_all(root.join("images")).expect("mkdir");
        fs::create_dir_all(root.join("labels")).expect("mkdir");
        assert_eq!(detect_format(root, 1).unwrap(), LabelFormat::Darknet);

        fs::create_dir_all(root.join("hop_m1")).expect("mkdir");
        assert_eq!(detect_format(root, 1).unwrap(), LabelFormat::Hop);
        // Another meta id does not see the native marker.
        assert_eq!(detect_format(root, 2).unwrap(), LabelFormat::Darknet);
    }

    #[test]
    fn explicit_format_skips_detection() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let set = open_label_set(temp.path(), Some(LabelFormat::Coco), &SetOptions::new(1))
            .expect("open set");
        assert_eq!(set.format(), LabelFormat::Coco);
        assert!(open_label_set(temp.path(), None, &SetOptions::new(1)).is_err());
    }

    #[test]
    fn stem_pattern() {
        let mut opts = SetOptions::new(0);
        assert!(opts.accepts_stem("x"));
        opts.pattern = Some("cam1*".to_string());
        assert!(opts.accepts_stem("cam1_01"));
        assert!(!opts.accepts_stem("cam2_01"));
    }
}
