//! The image list an editing session walks through.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::store::{current_label, LabelStore};
use crate::error::HoplabelError;
use crate::format::files::{has_extension, stem_string, wildcard_match, IMAGE_EXTENSIONS};
use crate::format::io_hop_json::IMAGE_DIR;
use crate::label::ImageLabel;

/// Which images of a dataset to edit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LabelFilter {
    /// Every image.
    All,
    /// Images with an imported label.
    #[default]
    Export,
    /// Images with a saved label.
    Labeled,
}

/// One image and the label it would open with.
#[derive(Clone, Debug)]
pub struct LabelRecord {
    pub image: PathBuf,
    pub label: ImageLabel,
    /// True if `label` is the saved label.
    pub labeled: bool,
}

/// Lists `<folder>/image/*` records passing `filter` and `pattern` (a
/// wildcard on the image stem) whose label's lowest confidence is at most
/// `conf_thr`. Records are sorted by file name.
pub fn load_records(
    folder: &Path,
    store: &dyn LabelStore,
    filter: LabelFilter,
    pattern: Option<&str>,
    conf_thr: f64,
) -> Result<Vec<LabelRecord>, HoplabelError> {
    let image_dir = folder.join(IMAGE_DIR);
    let mut images = Vec::new();
    for entry in WalkDir::new(&image_dir).max_depth(1) {
        let entry = entry.map_err(|source| {
            HoplabelError::Io(std::io::Error::other(format!(
                "failed to list '{}': {source}",
                image_dir.display()
            )))
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && has_extension(path, &IMAGE_EXTENSIONS)
            && pattern.map_or(true, |p| wildcard_match(p, &stem_string(path)))
        {
            images.push(path.to_path_buf());
        }
    }
    images.sort();

    let mut records = Vec::new();
    for image in images {
        let keep = match filter {
            LabelFilter::All => true,
            LabelFilter::Export => store.import(&image).map_or(false, |l| l.is_some()),
            LabelFilter::Labeled => store.load(&image).map_or(false, |l| l.is_some()),
        };
        if !keep {
            continue;
        }
        let (label, labeled) = current_label(store, &image, "");
        if label.min_conf() <= conf_thr {
            records.push(LabelRecord {
                image,
                label,
                labeled,
            });
        }
    }
    log::info!(
        "{} record(s) in {} ({:?})",
        records.len(),
        image_dir.display(),
        filter
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::store::HopStore;
    use crate::format::io_hop_json::{ias_label_path_of, write_hop_json};
    use crate::geom::Rect;
    use crate::label::{Category, ObjectId, ObjectLabel};
    use std::fs;

    fn label_with_conf(conf: f64) -> ImageLabel {
        let ob = ObjectLabel::new(
            ObjectId::new(1),
            Category::Objective(0),
            conf,
            Rect::new(0.1, 0.1, 0.2, 0.2).vertexes(),
        );
        ImageLabel::new("test", vec![ob])
    }

    fn seed(root: &Path) -> HopStore {
        let store = HopStore::new(1);
        fs::create_dir_all(root.join("image")).unwrap();
        for stem in ["a", "b", "c", "d"] {
            fs::write(root.join(format!("image/{stem}.jpg")), b"").unwrap();
        }
        fs::write(root.join("image/notes.txt"), b"").unwrap();
        let image = |stem: &str| root.join(format!("image/{stem}.jpg"));

        write_hop_json(&ias_label_path_of(&image("a"), 1), &label_with_conf(0.4)).unwrap();
        write_hop_json(&ias_label_path_of(&image("b"), 1), &label_with_conf(0.9)).unwrap();
        store.save(&image("c"), &label_with_conf(2.0)).unwrap();
        store
    }

    fn stems(records: &[LabelRecord]) -> Vec<String> {
        records.iter().map(|r| stem_string(&r.image)).collect()
    }

    #[test]
    fn filters_select_images() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let store = seed(temp.path());

        let all = load_records(temp.path(), &store, LabelFilter::All, None, 1.0).unwrap();
        // Label confidence is capped at 1.0, so manual labels pass.
        assert_eq!(stems(&all), vec!["a", "b", "c", "d"]);

        let export = load_records(temp.path(), &store, LabelFilter::Export, None, 1.0).unwrap();
        assert_eq!(stems(&export), vec!["a", "b"]);

        let labeled = load_records(temp.path(), &store, LabelFilter::Labeled, None, 2.0).unwrap();
        assert_eq!(stems(&labeled), vec!["c"]);
        assert!(labeled[0].labeled);
    }

    #[test]
    fn confidence_and_pattern() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let store = seed(temp.path());

        let unsure = load_records(temp.path(), &store, LabelFilter::Export, None, 0.5).unwrap();
        assert_eq!(stems(&unsure), vec!["a"]);

        let matched = load_records(temp.path(), &store, LabelFilter::All, Some("[bd]"), 2.0);
        // Only `*` and `?` are wildcards.
        assert!(matched.unwrap().is_empty());
        let matched = load_records(temp.path(), &store, LabelFilter::All, Some("?"), 2.0).unwrap();
        assert_eq!(stems(&matched), vec!["a", "b", "c", "d"]);
    }
}
