//! Display colors named in meta files.

use std::fmt;

/// An RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const YELLOW_GREEN: Color = Color::rgb(154, 205, 50);
    pub const LIME: Color = Color::rgb(0, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses a named color (case-insensitive) or a `#RRGGBB` hex string.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return None;
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            return Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?));
        }

        let color = match raw.to_ascii_uppercase().as_str() {
            "WHITE" => Self::WHITE,
            "BLACK" => Self::BLACK,
            "RED" => Self::rgb(255, 0, 0),
            "GREEN" => Self::rgb(0, 128, 0),
            "LIME" => Self::LIME,
            "BLUE" => Self::rgb(0, 0, 255),
            "YELLOW" => Self::rgb(255, 255, 0),
            "CYAN" => Self::rgb(0, 255, 255),
            "MAGENTA" => Self::rgb(255, 0, 255),
            "ORANGE" => Self::rgb(255, 165, 0),
            "PURPLE" => Self::rgb(128, 0, 128),
            "PINK" => Self::rgb(255, 192, 203),
            "GRAY" | "GREY" => Self::rgb(128, 128, 128),
            "SILVER" => Self::rgb(192, 192, 192),
            "YELLOW_GREEN" => Self::YELLOW_GREEN,
            _ => return None,
        };
        Some(color)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}
