//! The boundary between the editor and the window host that owns the event
//! loop and the pixels.
//!
//! The host delivers events to [`Editor`](super::Editor) and gives it a
//! [`Canvas`] to draw overlays on. Nothing here renders anything itself.

use std::path::Path;

use crate::error::HoplabelError;
use crate::geom::{Pixel, Point, Rect, Size};
use crate::meta::Color;

/// A key press, as delivered by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Backspace,
    Escape,
}

impl Key {
    /// Maps a character to a key. Space, backspace (`\u{8}`) and escape
    /// (`\u{1b}`) get their own variants.
    pub fn from_char(c: char) -> Self {
        match c {
            ' ' => Key::Space,
            '\u{8}' => Key::Backspace,
            '\u{1b}' => Key::Escape,
            c => Key::Char(c),
        }
    }

    /// The character this key types; the inverse of [`Key::from_char`].
    pub fn as_char(&self) -> char {
        match self {
            Key::Char(c) => *c,
            Key::Space => ' ',
            Key::Backspace => '\u{8}',
            Key::Escape => '\u{1b}',
        }
    }
}

/// Modifier keys held during a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
    };
}

/// A drawing surface in pixel space.
pub trait Canvas {
    fn size(&self) -> Size;

    fn polyline(&mut self, points: &[Point<Pixel>], closed: bool, color: Color, thickness: u32);

    /// Draws a rectangle with an optional title above it.
    fn rectangle(&mut self, rect: Rect<Pixel>, color: Color, thickness: u32, title: &str);

    fn cross(&mut self, center: Point<Pixel>, radius: u32, color: Color, thickness: u32);

    fn text(&mut self, text: &str, origin: Point<Pixel>, color: Color);

    /// Dims everything outside `polygon`.
    fn shade_outside(&mut self, polygon: &[Point<Pixel>]);

    /// Writes the current canvas contents to an image file.
    fn save(&self, path: &Path) -> Result<(), HoplabelError>;
}

/// What the host exposes back to the editor.
pub trait Viewer {
    /// Size of the displayed image in pixels.
    fn frame_size(&self) -> Size;

    /// The most recently rendered canvas.
    fn canvas(&self) -> &dyn Canvas;
}
