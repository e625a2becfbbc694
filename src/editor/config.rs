//! Editor settings and key bindings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::host::Key;
use crate::error::HoplabelError;
use crate::meta::LabelMeta;

/// Default squared proximity radius, in normalized units.
pub const NEAR_R2: f64 = 0.025 * 0.025;

/// Single-character key bindings of the editor commands.
///
/// Move keys also move fast when typed upper-case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMap {
    pub left: char,
    pub right: char,
    pub up: char,
    pub down: char,
    pub toggle_filter: char,
    pub lock_roi: char,
    pub copy_previous: char,
    pub save: char,
    pub cancel: char,
    pub delete_label: char,
    pub snapshot: char,
    pub remove_object: char,
    pub rectify: char,
    pub fill_roi: char,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            left: 'a',
            right: 'd',
            up: 'w',
            down: 's',
            toggle_filter: '`',
            lock_roi: 'f',
            copy_previous: 'c',
            save: ' ',
            cancel: 'x',
            delete_label: '\u{8}',
            snapshot: 'j',
            remove_object: 'e',
            rectify: 'r',
            fill_roi: 'z',
        }
    }
}

impl KeyMap {
    /// Pixel direction and speed of a move key: `(dx, dy, fast)`.
    pub fn direction(&self, key: Key) -> Option<(i32, i32, bool)> {
        let Key::Char(c) = key else {
            return None;
        };
        let fast = c.is_uppercase();
        let c = c.to_lowercase().next()?;
        let (dx, dy) = if c == self.left {
            (-1, 0)
        } else if c == self.right {
            (1, 0)
        } else if c == self.up {
            (0, -1)
        } else if c == self.down {
            (0, 1)
        } else {
            return None;
        };
        Some((dx, dy, fast))
    }

    /// Help lines, one per binding.
    pub fn help_lines(&self) -> Vec<String> {
        self.bindings()
            .into_iter()
            .map(|(c, what)| format!("  [{}] {}", key_name(c), what))
            .collect()
    }

    /// Bindings that share a key with a taxonomy category, with the
    /// category id. Move keys win over category keys and category keys win
    /// over every other command.
    pub fn conflicts(&self, meta: &LabelMeta) -> Vec<(char, &'static str, i32)> {
        self.bindings()
            .into_iter()
            .filter_map(|(c, what)| meta.key_to_category(c).map(|id| (c, what, id)))
            .collect()
    }

    fn bindings(&self) -> [(char, &'static str); 14] {
        [
            (self.left, "move left"),
            (self.right, "move right"),
            (self.up, "move up"),
            (self.down, "move down"),
            (self.save, "save label"),
            (self.cancel, "discard changes"),
            (self.delete_label, "delete saved label"),
            (self.snapshot, "save snapshot"),
            (self.remove_object, "remove object"),
            (self.rectify, "polygon to rectangle"),
            (self.lock_roi, "lock/unlock ROI"),
            (self.fill_roi, "object fills ROI"),
            (self.copy_previous, "copy previous objects"),
            (self.toggle_filter, "show all/current category"),
        ]
    }
}

fn key_name(c: char) -> String {
    match Key::from_char(c) {
        Key::Space => "SPACE".to_string(),
        Key::Backspace => "BACKSPACE".to_string(),
        Key::Escape => "ESC".to_string(),
        Key::Char(c) => c.to_string(),
    }
}

/// Editor settings, loadable from JSON. Missing fields take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Written into every saved label.
    pub user_agent: String,
    /// Squared radius, in normalized units, within which a click hits a
    /// vertex or an object.
    pub near_r2: f64,
    /// Snapshot folder, relative to the dataset root.
    pub snapshot_dir: String,
    /// Pixels moved by a fast (upper-case) move key.
    pub fast_step_px: u32,
    pub keys: KeyMap,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            user_agent: "hoplabel_editor".to_string(),
            near_r2: NEAR_R2,
            snapshot_dir: "snapshot".to_string(),
            fast_step_px: 10,
            keys: KeyMap::default(),
        }
    }
}

/// Loads an editor config file.
pub fn load_editor_config(path: &Path) -> Result<EditorConfig, HoplabelError> {
    let json = fs::read_to_string(path).map_err(HoplabelError::Io)?;
    serde_json::from_str(&json).map_err(|source| HoplabelError::ConfigJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"fast_step_px": 25, "keys": {"save": "v"}}"#).unwrap();
        assert_eq!(config.fast_step_px, 25);
        assert_eq!(config.keys.save, 'v');
        assert_eq!(config.keys.cancel, 'x');
        assert_eq!(config.near_r2, NEAR_R2);
    }

    #[test]
    fn directions() {
        let keys = KeyMap::default();
        assert_eq!(keys.direction(Key::Char('a')), Some((-1, 0, false)));
        assert_eq!(keys.direction(Key::Char('S')), Some((0, 1, true)));
        assert_eq!(keys.direction(Key::Char('q')), None);
        assert_eq!(keys.direction(Key::Space), None);
    }

    #[test]
    fn help_names_special_keys() {
        let lines = KeyMap::default().help_lines();
        assert!(lines.iter().any(|l| l == "  [SPACE] save label"));
        assert!(lines.iter().any(|l| l == "  [BACKSPACE] delete saved label"));
    }

    #[test]
    fn category_keys_shadowing_commands_are_reported() {
        let meta = LabelMeta::from_json_str(
            r#"{"id": 1, "name": "m", "categories": [
                {"id": 0, "name": "car", "keys": "1c"},
                {"id": 1, "name": "van", "keys": "2r"}
            ]}"#,
        )
        .unwrap();
        let conflicts = KeyMap::default().conflicts(&meta);
        assert_eq!(
            conflicts,
            vec![('r', "polygon to rectangle", 1), ('c', "copy previous objects", 0)]
        );

        let mut keys = KeyMap::default();
        keys.copy_previous = 'v';
        keys.rectify = 'y';
        assert!(keys.conflicts(&meta).is_empty());
    }

    #[test]
    fn load_reports_bad_json() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("editor.json");
        fs::write(&path, "{").expect("write config");
        assert!(matches!(
            load_editor_config(&path),
            Err(HoplabelError::ConfigJsonParse { .. })
        ));
    }
}
