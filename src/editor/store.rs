//! Where the editor reads and writes labels.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::HoplabelError;
use crate::format::io_hop_json::{hop_label_path_of, ias_label_path_of, read_hop_json, write_hop_json};
use crate::label::ImageLabel;

/// Label persistence keyed by image file.
pub trait LabelStore {
    /// The saved label of `image`, `None` if there is none.
    fn load(&self, image: &Path) -> Result<Option<ImageLabel>, HoplabelError>;

    /// A label imported from an external system, `None` if there is none.
    fn import(&self, image: &Path) -> Result<Option<ImageLabel>, HoplabelError>;

    /// Saves `label` and returns the written path.
    fn save(&self, image: &Path, label: &ImageLabel) -> Result<PathBuf, HoplabelError>;

    /// Deletes the saved label. Returns false if there was none.
    fn delete(&self, image: &Path) -> Result<bool, HoplabelError>;
}

/// Native dataset store: `hop_m{id}` for saved labels, `ias_m{id}` for
/// imported ones.
#[derive(Clone, Copy, Debug)]
pub struct HopStore {
    pub meta_id: u32,
}

impl HopStore {
    pub fn new(meta_id: u32) -> Self {
        Self { meta_id }
    }
}

fn read_if_exists(path: &Path) -> Result<Option<ImageLabel>, HoplabelError> {
    if !path.is_file() {
        return Ok(None);
    }
    read_hop_json(path).map(Some)
}

impl LabelStore for HopStore {
    fn load(&self, image: &Path) -> Result<Option<ImageLabel>, HoplabelError> {
        read_if_exists(&hop_label_path_of(image, self.meta_id))
    }

    fn import(&self, image: &Path) -> Result<Option<ImageLabel>, HoplabelError> {
        read_if_exists(&ias_label_path_of(image, self.meta_id))
    }

    fn save(&self, image: &Path, label: &ImageLabel) -> Result<PathBuf, HoplabelError> {
        let path = hop_label_path_of(image, self.meta_id);
        write_hop_json(&path, label)?;
        Ok(path)
    }

    fn delete(&self, image: &Path) -> Result<bool, HoplabelError> {
        let path = hop_label_path_of(image, self.meta_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("deleted label {}", path.display());
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(HoplabelError::Io(err)),
        }
    }
}

/// The label to edit for `image`: the saved one, else the imported one,
/// else an ROI-only label. The flag is true when the saved label was used.
///
/// Unreadable label files are logged and skipped.
pub fn current_label(store: &dyn LabelStore, image: &Path, user_agent: &str) -> (ImageLabel, bool) {
    match store.load(image) {
        Ok(Some(label)) => return (label, true),
        Ok(None) => {}
        Err(err) => log::warn!("ignoring saved label of {}: {}", image.display(), err),
    }
    match store.import(image) {
        Ok(Some(label)) => return (label, false),
        Ok(None) => {}
        Err(err) => log::warn!("ignoring imported label of {}: {}", image.display(), err),
    }
    (ImageLabel::only_roi(user_agent, 0), false)
}
