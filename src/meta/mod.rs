//! Taxonomy meta: which categories and properties exist, how they are keyed
//! in the editor, how they render, and which objects each category accepts.
//!
//! A meta file lives at `meta/m{meta_id}.json` somewhere above the dataset
//! folder and is located with [`find_meta`].

mod color;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HoplabelError;
use crate::geom::{HasRect, Normalized, Size};

pub use color::Color;

/// Name of the property whose values are shared by every other property.
pub const COMMON_PROPERTY: &str = "common";

/// Default confidence of a manually chosen value.
pub const MANUAL_CONF: f64 = 2.0;

/// Returns the `m{meta_id}` tag used in meta file and label folder names.
pub fn meta_fix(meta_id: u32) -> String {
    format!("m{meta_id}")
}

/// Sample generation settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleCfg {
    #[serde(default)]
    pub size: Size,
    /// Fill color for pixels outside the ROI.
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub properties: Vec<String>,
}

/// Overlay title settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelCfg {
    /// 0 = no title, 1 = brief, 2 = detailed.
    #[serde(default = "default_title_style")]
    pub title_style: u8,
    #[serde(default = "default_thickness")]
    pub thickness: u32,
}

fn default_title_style() -> u8 {
    1
}

fn default_thickness() -> u32 {
    1
}

fn default_conf() -> f64 {
    MANUAL_CONF
}

fn default_prop_color() -> String {
    "WHITE".to_string()
}

impl Default for LabelCfg {
    fn default() -> Self {
        Self {
            title_style: default_title_style(),
            thickness: default_thickness(),
        }
    }
}

/// One legal value of a property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueCfg {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Characters that select this value in the editor.
    #[serde(default)]
    pub keys: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sign: String,
    /// Confidence stored when the value is chosen manually.
    #[serde(default = "default_conf")]
    pub conf: f64,
}

impl ValueCfg {
    /// Short symbol shown in overlay titles; falls back to the name.
    pub fn sign(&self) -> &str {
        if self.sign.is_empty() {
            &self.name
        } else {
            &self.sign
        }
    }
}

/// A property type and its legal values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropMeta {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Input size of the property classifier.
    #[serde(default)]
    pub size: Size,
    #[serde(default = "default_prop_color")]
    pub color: String,
    #[serde(default)]
    pub values: Vec<ValueCfg>,
}

impl PropMeta {
    pub fn value_meta(&self, value_id: i32) -> Result<&ValueCfg, HoplabelError> {
        self.values
            .iter()
            .find(|v| v.id == value_id)
            .ok_or_else(|| {
                HoplabelError::MetaLookup(format!(
                    "property '{}' has no value {}",
                    self.name, value_id
                ))
            })
    }

    /// The value bound to `key`, if any.
    pub fn value_cfg_of_key(&self, key: char) -> Option<&ValueCfg> {
        self.values.iter().find(|v| v.keys.contains(key))
    }
}

/// A property declared on a category: the name it is stored under and the
/// [`PropMeta`] that defines its values.
///
/// Meta files may write either `"color"` or `{"name": "color", "type": "paint"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "PropVarRepr")]
pub struct PropVar {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PropVarRepr {
    Name(String),
    Full {
        name: String,
        #[serde(rename = "type", default)]
        type_name: Option<String>,
    },
}

impl From<PropVarRepr> for PropVar {
    fn from(repr: PropVarRepr) -> Self {
        match repr {
            PropVarRepr::Name(name) => PropVar {
                type_name: name.clone(),
                name,
            },
            PropVarRepr::Full { name, type_name } => PropVar {
                type_name: type_name.unwrap_or_else(|| name.clone()),
                name,
            },
        }
    }
}

/// Acceptance ranges for objects of one category. Absent ranges always pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCfg {
    /// Accepted width / height range of the bounding rectangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_radio: Option<[f64; 2]>,
    /// Accepted normalized area range of the bounding rectangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<[f64; 2]>,
}

fn in_range(value: f64, range: Option<[f64; 2]>) -> bool {
    match range {
        None => true,
        Some([min, max]) => min <= value && value <= max,
    }
}

impl FilterCfg {
    /// Rejects `ob` if its rectangle's aspect ratio or area is out of range.
    pub fn check<T: HasRect<Normalized> + ?Sized>(&self, ob: &T) -> Result<(), HoplabelError> {
        let rect = ob.rect();

        let aspect = rect.aspect_ratio();
        if !in_range(aspect, self.aspect_radio) {
            return Err(HoplabelError::Validation {
                message: format!("aspect ratio {aspect:.4} outside {:?}", self.aspect_radio),
            });
        }

        let area = rect.area();
        if !in_range(area, self.area) {
            return Err(HoplabelError::Validation {
                message: format!("area {area:.6} outside {:?}", self.area),
            });
        }
        Ok(())
    }
}

/// A category entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatMeta {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keys: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub properties: Vec<PropVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterCfg>,
}

impl CatMeta {
    /// Property type declared under `name`, if the category declares it.
    pub fn prop_type(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.type_name.as_str())
    }

    pub fn check<T: HasRect<Normalized> + ?Sized>(&self, ob: &T) -> Result<(), HoplabelError> {
        match &self.filter {
            Some(filter) => filter.check(ob),
            None => Ok(()),
        }
    }

    /// Display color, white when the configured name is unknown.
    pub fn display_color(&self) -> Color {
        Color::parse(&self.color).unwrap_or(Color::WHITE)
    }
}

/// Root of a meta file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelMeta {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub view_size: Size,
    #[serde(default)]
    pub object_size: Size,
    #[serde(default)]
    pub sample: SampleCfg,
    #[serde(default)]
    pub label: LabelCfg,
    #[serde(default)]
    pub auto_save: bool,
    pub categories: Vec<CatMeta>,
    #[serde(default)]
    pub properties: Vec<PropMeta>,
}

impl LabelMeta {
    /// Parses meta JSON and applies the common-value merge.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let mut meta: LabelMeta = serde_json::from_str(json)?;
        meta.merge_common_values();
        Ok(meta)
    }

    /// Prepends the values of the [`COMMON_PROPERTY`] to every other
    /// property. Applied once, at load time.
    fn merge_common_values(&mut self) {
        let Some(common) = self
            .properties
            .iter()
            .find(|p| p.name == COMMON_PROPERTY)
            .map(|p| p.values.clone())
        else {
            return;
        };

        for prop in self.properties.iter_mut() {
            if prop.name != COMMON_PROPERTY {
                let own = std::mem::take(&mut prop.values);
                prop.values = common.iter().cloned().chain(own).collect();
            }
        }
    }

    pub fn cat_meta(&self, id: i32) -> Result<&CatMeta, HoplabelError> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| HoplabelError::MetaLookup(format!("unknown category id {id}")))
    }

    pub fn cat_meta_by_name(&self, name: &str) -> Result<&CatMeta, HoplabelError> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| HoplabelError::MetaLookup(format!("unknown category '{name}'")))
    }

    /// The property meta behind property `name` of category `cat_id`.
    ///
    /// Fails if the category is unknown or does not declare the property.
    pub fn prop_meta(&self, cat_id: i32, name: &str) -> Result<&PropMeta, HoplabelError> {
        let cat = self.cat_meta(cat_id)?;
        let type_name = cat.prop_type(name).ok_or_else(|| {
            HoplabelError::MetaLookup(format!(
                "category '{}' does not declare property '{name}'",
                cat.name
            ))
        })?;
        self.properties
            .iter()
            .find(|p| p.name == type_name)
            .ok_or_else(|| HoplabelError::MetaLookup(format!("unknown property type '{type_name}'")))
    }

    pub fn prop_value_name(&self, cat_id: i32, name: &str, value_id: i32) -> Result<&str, HoplabelError> {
        Ok(self.prop_meta(cat_id, name)?.value_meta(value_id)?.name.as_str())
    }

    pub fn prop_value_sign(&self, cat_id: i32, name: &str, value_id: i32) -> Result<&str, HoplabelError> {
        Ok(self.prop_meta(cat_id, name)?.value_meta(value_id)?.sign())
    }

    /// Help lines of the form `  [keys] description`, one per category.
    pub fn cat_key_strs(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| {
                let text = if c.description.is_empty() {
                    &c.name
                } else {
                    &c.description
                };
                format!("  [{}] {}", c.keys, text)
            })
            .collect()
    }

    /// Category id bound to `key`, if any.
    pub fn key_to_category(&self, key: char) -> Option<i32> {
        self.categories
            .iter()
            .find(|c| c.keys.contains(key))
            .map(|c| c.id)
    }

    /// Value bound to `key` among the properties declared by `cat_id`.
    ///
    /// Returns the property name the value belongs to with it.
    pub fn value_cfg_of_key(&self, cat_id: i32, key: char) -> Option<(&str, &ValueCfg)> {
        let cat = self.cat_meta(cat_id).ok()?;
        cat.properties.iter().find_map(|var| {
            let prop = self.properties.iter().find(|p| p.name == var.type_name)?;
            prop.value_cfg_of_key(key).map(|v| (var.name.as_str(), v))
        })
    }

    /// Class list of index-based formats: entry `i` names objective
    /// category `i`. Gaps in the id range are named `class_{i}`.
    pub fn class_names(&self) -> Vec<String> {
        let count = self
            .categories
            .iter()
            .filter(|c| c.id >= 0)
            .map(|c| c.id as usize + 1)
            .max()
            .unwrap_or(0);
        (0..count)
            .map(|i| {
                self.categories
                    .iter()
                    .find(|c| c.id == i as i32)
                    .map_or_else(|| format!("class_{i}"), |c| c.name.clone())
            })
            .collect()
    }
}

/// Loads a meta file.
pub fn load_meta(path: &Path) -> Result<LabelMeta, HoplabelError> {
    let json = fs::read_to_string(path).map_err(HoplabelError::Io)?;
    LabelMeta::from_json_str(&json).map_err(|source| HoplabelError::MetaJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Path of `meta/m{meta_id}.json` in `folder` or its nearest ancestor.
pub fn find_meta_path(meta_id: u32, folder: &Path) -> Result<PathBuf, HoplabelError> {
    let name = Path::new("meta").join(format!("{}.json", meta_fix(meta_id)));
    folder
        .ancestors()
        .map(|dir| dir.join(&name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| HoplabelError::MetaNotFound {
            name: name.to_string_lossy().replace('\\', "/"),
            folder: folder.to_path_buf(),
        })
}

/// Finds and loads the meta for `meta_id`, searching `folder` and each of
/// its ancestors.
pub fn find_meta(meta_id: u32, folder: &Path) -> Result<LabelMeta, HoplabelError> {
    let path = find_meta_path(meta_id, folder)?;
    log::debug!("meta file: {}", path.display());
    load_meta(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;

    const META: &str = r##"{
        "id": 1,
        "name": "vehicles",
        "view_size": {"width": 1280, "height": 720},
        "label": {"title_style": 2, "thickness": 2},
        "categories": [
            {"id": -9, "name": "roi", "color": "GRAY"},
            {"id": 0, "name": "car", "keys": "1q", "color": "RED",
             "properties": ["color", {"name": "state", "type": "motion"}],
             "filter": {"aspect_radio": [0.5, 2.0], "area": [0.001, 0.5]}},
            {"id": 1, "name": "bus", "keys": "2", "color": "#00FF00"}
        ],
        "properties": [
            {"id": 0, "name": "common", "values": [
                {"id": -2, "name": "excluded", "keys": "-"}
            ]},
            {"id": 1, "name": "color", "values": [
                {"id": 0, "name": "red", "keys": "r", "sign": "R", "conf": 1.0},
                {"id": 1, "name": "blue", "keys": "b"}
            ]},
            {"id": 2, "name": "motion", "values": [
                {"id": 0, "name": "moving", "keys": "m"}
            ]}
        ]
    }"##;

    fn meta() -> LabelMeta {
        LabelMeta::from_json_str(META).expect("parse meta")
    }

    #[test]
    fn common_values_are_prepended() {
        let meta = meta();
        let color = &meta.properties[1];
        let ids: Vec<i32> = color.values.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![-2, 0, 1]);
        assert_eq!(meta.properties[0].values.len(), 1);
        assert_eq!(meta.properties[2].values.len(), 2);
    }

    #[test]
    fn value_defaults() {
        let meta = meta();
        let blue = meta.properties[1].value_meta(1).unwrap();
        assert_eq!(blue.conf, MANUAL_CONF);
        assert_eq!(blue.sign(), "blue");
        assert_eq!(meta.properties[1].value_meta(0).unwrap().sign(), "R");
        assert_eq!(meta.properties[1].color, "WHITE");
    }

    #[test]
    fn prop_var_accepts_both_forms() {
        let meta = meta();
        let car = meta.cat_meta(0).unwrap();
        assert_eq!(car.prop_type("color"), Some("color"));
        assert_eq!(car.prop_type("state"), Some("motion"));
        assert_eq!(car.prop_type("size"), None);
    }

    #[test]
    fn key_lookups() {
        let meta = meta();
        assert_eq!(meta.key_to_category('q'), Some(0));
        assert_eq!(meta.key_to_category('2'), Some(1));
        assert_eq!(meta.key_to_category('z'), None);

        let (name, value) = meta.value_cfg_of_key(0, 'm').unwrap();
        assert_eq!(name, "state");
        assert_eq!(value.name, "moving");
        assert!(meta.value_cfg_of_key(1, 'm').is_none());
    }

    #[test]
    fn prop_lookups_report_missing_entries() {
        let meta = meta();
        assert_eq!(meta.prop_value_sign(0, "color", 0).unwrap(), "R");
        assert_eq!(meta.prop_value_name(0, "state", 0).unwrap(), "moving");
        assert!(matches!(
            meta.prop_meta(1, "color"),
            Err(HoplabelError::MetaLookup(_))
        ));
        assert!(matches!(meta.cat_meta(42), Err(HoplabelError::MetaLookup(_))));
        assert!(meta.prop_value_sign(0, "color", 9).is_err());
    }

    #[test]
    fn filter_checks_aspect_and_area() {
        let meta = meta();
        let car = meta.cat_meta(0).unwrap();
        let ok: Rect<Normalized> = Rect::new(0.1, 0.1, 0.2, 0.2);
        let too_wide: Rect<Normalized> = Rect::new(0.1, 0.1, 0.5, 0.1);
        let too_small: Rect<Normalized> = Rect::new(0.1, 0.1, 0.01, 0.01);
        assert!(car.check(&ok).is_ok());
        assert!(matches!(
            car.check(&too_wide),
            Err(HoplabelError::Validation { .. })
        ));
        assert!(car.check(&too_small).is_err());
        // Categories without a filter accept anything.
        assert!(meta.cat_meta(1).unwrap().check(&too_small).is_ok());
    }

    #[test]
    fn class_names_skip_special_categories() {
        assert_eq!(meta().class_names(), vec!["car", "bus"]);

        let mut sparse = meta();
        sparse.categories[2].id = 3;
        assert_eq!(sparse.class_names(), vec!["car", "class_1", "class_2", "bus"]);
    }

    #[test]
    fn cat_key_strs_lists_every_category() {
        let lines = meta().cat_key_strs();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "  [1q] car");
    }

    #[test]
    fn find_meta_searches_ancestors() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("meta")).expect("create meta dir");
        fs::write(temp.path().join("meta/m1.json"), META).expect("write meta");
        let deep = temp.path().join("a/b/c");
        fs::create_dir_all(&deep).expect("create nested dir");

        let meta = find_meta(1, &deep).expect("find meta");
        assert_eq!(meta.name, "vehicles");

        let err = find_meta(2, &deep).unwrap_err();
        assert!(matches!(err, HoplabelError::MetaNotFound { .. }));
    }

    #[test]
    fn load_meta_reports_bad_json() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("m1.json");
        fs::write(&path, "{not json").expect("write meta");
        assert!(matches!(
            load_meta(&path),
            Err(HoplabelError::MetaJsonParse { .. })
        ));
    }
}
