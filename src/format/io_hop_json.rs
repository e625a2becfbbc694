//! Native per-image JSON labels.
//!
//! A native dataset keeps images and labels side by side:
//!
//! ```text
//! <root>/image/<stem>.jpg
//! <root>/hop_m{meta_id}/<stem>.json   labels written by the editor
//! <root>/ias_m{meta_id}/<stem>.json   labels imported from an external system
//! ```
//!
//! Both label folders use the same schema, the serde form of
//! [`ImageLabel`].

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::files::{collect_files_with_extensions, place_image, stem_string, IMAGE_EXTENSIONS};
use super::{LabelFormat, LabelSet, LoadedPairs, SaveSummary, SetOptions};
use crate::error::HoplabelError;
use crate::label::{ImageLabel, ImageLabelPair};
use crate::meta::meta_fix;

/// Folder prefix of labels written by the editor.
pub const HOP_PREFIX: &str = "hop";
/// Folder prefix of imported labels.
pub const IAS_PREFIX: &str = "ias";
/// Image folder of a native dataset.
pub const IMAGE_DIR: &str = "image";
const LABEL_EXTENSION: &str = "json";

/// Reads a label file. Labels that store their ROI as an object are
/// converted to the top-level ROI form.
pub fn read_hop_json(path: &Path) -> Result<ImageLabel, HoplabelError> {
    let file = File::open(path).map_err(HoplabelError::Io)?;
    let reader = BufReader::new(file);

    let mut label: ImageLabel =
        serde_json::from_reader(reader).map_err(|source| HoplabelError::HopJsonParse {
            path: path.to_path_buf(),
            source,
        })?;
    label.hoist_roi_object();
    Ok(label)
}

/// Writes a label file, creating parent folders as needed.
pub fn write_hop_json(path: &Path, label: &ImageLabel) -> Result<(), HoplabelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(HoplabelError::Io)?;
    }
    let file = File::create(path).map_err(HoplabelError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, label).map_err(|source| HoplabelError::HopJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a label from a JSON string.
pub fn from_hop_str(json: &str) -> Result<ImageLabel, serde_json::Error> {
    let mut label: ImageLabel = serde_json::from_str(json)?;
    label.hoist_roi_object();
    Ok(label)
}

/// Parses a label from raw bytes.
pub fn from_hop_slice(bytes: &[u8]) -> Result<ImageLabel, serde_json::Error> {
    let mut label: ImageLabel = serde_json::from_slice(bytes)?;
    label.hoist_roi_object();
    Ok(label)
}

pub fn to_hop_string(label: &ImageLabel) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(label)
}

/// Label folder name for `prefix` and `meta_id`, e.g. `hop_m3`.
pub fn label_dir_name(prefix: &str, meta_id: u32) -> String {
    format!("{prefix}_{}", meta_fix(meta_id))
}

/// Label path next to an image: `<root>/image/a.jpg` maps to
/// `<root>/{prefix}_m{meta_id}/a.json`.
pub fn label_path_of(image_file: &Path, prefix: &str, meta_id: u32) -> PathBuf {
    let root = image_file
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""));
    root.join(label_dir_name(prefix, meta_id))
        .join(stem_string(image_file))
        .with_extension(LABEL_EXTENSION)
}

pub fn hop_label_path_of(image_file: &Path, meta_id: u32) -> PathBuf {
    label_path_of(image_file, HOP_PREFIX, meta_id)
}

pub fn ias_label_path_of(image_file: &Path, meta_id: u32) -> PathBuf {
    label_path_of(image_file, IAS_PREFIX, meta_id)
}

/// Native dataset rooted at a folder.
#[derive(Clone, Debug)]
pub struct HopSet {
    folder: PathBuf,
    opts: SetOptions,
}

impl HopSet {
    pub fn new(folder: &Path, opts: SetOptions) -> Self {
        Self {
            folder: folder.to_path_buf(),
            opts,
        }
    }

    /// Returns true if `folder` has the `hop_m{meta_id}` marker folder.
    pub fn valid_set(folder: &Path, meta_id: u32) -> bool {
        folder.join(label_dir_name(HOP_PREFIX, meta_id)).is_dir()
    }

    pub fn label_dir(&self) -> PathBuf {
        self.folder
            .join(label_dir_name(HOP_PREFIX, self.opts.meta_id))
    }

    pub fn image_dir(&self) -> PathBuf {
        self.folder.join(IMAGE_DIR)
    }

    fn label_files(&self) -> Result<Vec<PathBuf>, HoplabelError> {
        let dir = self.label_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let files = collect_files_with_extensions(&dir, &[LABEL_EXTENSION])?;
        Ok(files
            .into_iter()
            .filter(|f| self.opts.accepts_stem(&stem_string(f)))
            .collect())
    }

    /// Image for a label stem; `.jpg` when no image exists yet.
    fn image_for_stem(&self, stem: &str) -> PathBuf {
        let image_dir = self.image_dir();
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| image_dir.join(stem).with_extension(ext))
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| image_dir.join(stem).with_extension("jpg"))
    }
}

impl LabelSet for HopSet {
    fn format(&self) -> LabelFormat {
        LabelFormat::Hop
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
            match read_hop_json(&label_file) {
                Ok(label) => {
                    let image = self.image_for_stem(&stem_string(&label_file));
                    loaded.pairs.push((image, label));
                }
                Err(err) => loaded.fail(&label_file, &err),
            }
        }
        log::info!(
            "loaded {} native label(s) from {}",
            loaded.pairs.len(),
            self.label_dir().display()
        );
        Ok(loaded)
    }

    fn save(&self, pairs: &[ImageLabelPair]) -> Result<SaveSummary, HoplabelError> {
        let dir = self.label_dir();
        fs::create_dir_all(&dir).map_err(HoplabelError::Io)?;
        fs::create_dir_all(self.image_dir()).map_err(HoplabelError::Io)?;

        let mut summary = SaveSummary::default();
        let image_dir = self.image_dir();
        for (image, label) in pairs {
            let stem = stem_string(image);
            let path = dir.join(&stem).with_extension(LABEL_EXTENSION);
            // Native labels do not need their image; place it when there is one.
            if image.is_file() {
                if let Err(err) = place_image(image, &image_dir, &stem) {
                    summary.fail(image, &err);
                }
            }
            match write_hop_json(&path, label) {
                Ok(()) => {
                    summary.labels += 1;
                    summary.objects += label.objects.len();
                }
                Err(err) => summary.fail(&path, &err),
            }
        }
        Ok(summary)
    }
}

/// Fuzz-only entrypoint for native label parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_hop_json(bytes: &[u8]) -> Result<(), serde_json::Error> {
    let _ = from_hop_slice(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Point, Rect};
    use crate::label::{Category, ObjectId, ObjectLabel};

    fn sample_label() -> ImageLabel {
        let mut label = ImageLabel::only_roi("test", 1);
        let mut ob = ObjectLabel::new(
            ObjectId::new(1),
            Category::Objective(2),
            0.75,
            Rect::new(0.125, 0.25, 0.25, 0.5).vertexes(),
        );
        ob.set_prop("color", 1, 0.5);
        label.objects.push(ob);
        label
    }

    #[test]
    fn string_roundtrip_is_lossless() {
        let label = sample_label();
        let json = to_hop_string(&label).unwrap();
        assert_eq!(from_hop_str(&json).unwrap(), label);
    }

    #[test]
    fn json_has_documented_keys() {
        let v = serde_json::to_value(sample_label()).unwrap();
        for key in ["version", "user_agent", "date", "last_modified", "host", "sensor", "roi", "objects"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["objects"][0]["prob_class"]["value"], 2);
    }

    #[test]
    fn legacy_roi_object_is_hoisted() {
        let json = r#"{
            "user_agent": "old", "date": "", "last_modified": "", "host": "", "sensor": 0,
            "objects": [
                {"id": -9, "prob_class": {"value": -9, "conf": 0}, "polygon": [[0.1,0.1],[0.9,0.1],[0.9,0.9],[0.1,0.9]]},
                {"id": 1, "prob_class": {"value": 0, "conf": 1}, "polygon": [[0.5,0.5]]}
            ]
        }"#;
        let label = from_hop_str(json).unwrap();
        assert_eq!(label.objects.len(), 1);
        assert_eq!(label.roi.as_ref().map(Vec::len), Some(4));
        assert_eq!(label.version, 1.0);
    }

    #[test]
    fn label_paths_sit_next_to_image_dir() {
        let image = Path::new("/data/set/image/0001.jpg");
        assert_eq!(
            hop_label_path_of(image, 3),
            Path::new("/data/set/hop_m3/0001.json")
        );
        assert_eq!(
            ias_label_path_of(image, 3),
            Path::new("/data/set/ias_m3/0001.json")
        );
    }

    #[test]
    fn set_save_then_find_pairs() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let set = HopSet::new(temp.path(), SetOptions::new(5));
        let image = temp.path().join("image/a.jpg");
        let summary = set.save(&[(image.clone(), sample_label())]).expect("save");
        assert_eq!(summary.labels, 1);
        assert!(HopSet::valid_set(temp.path(), 5));
        assert_eq!(set.len(), 1);

        let loaded = set.find_pairs().expect("find pairs");
        assert!(loaded.failures.is_empty());
        assert_eq!(loaded.pairs.len(), 1);
        assert_eq!(loaded.pairs[0].0, image);
        assert!(!image.exists());
        assert_eq!(loaded.pairs[0].1, sample_label_with_dates(&loaded.pairs[0].1));
    }

    #[test]
    fn set_save_places_source_images() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = temp.path().join("elsewhere/images/a.png");
        fs::create_dir_all(source.parent().unwrap()).expect("create source dir");
        fs::write(&source, b"png").expect("write image");

        let out = temp.path().join("native");
        let set = HopSet::new(&out, SetOptions::new(5));
        let summary = set.save(&[(source, sample_label())]).expect("save");
        assert!(summary.failures.is_empty());

        let loaded = set.find_pairs().expect("find pairs");
        assert_eq!(loaded.pairs[0].0, out.join("image/a.png"));
        assert!(loaded.pairs[0].0.is_file());
    }

    fn sample_label_with_dates(other: &ImageLabel) -> ImageLabel {
        let mut label = sample_label();
        label.date = other.date.clone();
        label.last_modified = other.last_modified.clone();
        label
    }

    #[test]
    fn corrupt_file_is_reported_not_fatal() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("hop_m1");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("bad.json"), "{ nope").expect("write bad");
        write_hop_json(&dir.join("good.json"), &sample_label()).expect("write good");

        let set = HopSet::new(temp.path(), SetOptions::new(1));
        let loaded = set.find_pairs().expect("find pairs");
        assert_eq!(loaded.pairs.len(), 1);
        assert_eq!(loaded.failures.len(), 1);
        assert!(loaded.failures[0].path.ends_with("bad.json"));
    }

    #[test]
    fn new_object_point_roundtrips() {
        let mut label = ImageLabel::default();
        label.new_object(Point::new(0.125, 0.5));
        let back = from_hop_str(&to_hop_string(&label).unwrap()).unwrap();
        assert_eq!(back.objects[0].polygon[0], Point::new(0.125, 0.5));
    }
}
