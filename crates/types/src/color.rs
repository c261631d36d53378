use crate::page::ParseError;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::str::FromStr;

fn opaque() -> u8 {
    255
}

fn is_opaque(alpha: &u8) -> bool {
    *alpha == 255
}

/// An sRGB color with straight (non-premultiplied) 8-bit alpha.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(skip_serializing_if = "is_opaque", default = "opaque")]
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn gray(value: u8) -> Self {
        Self::rgb(value, value, value)
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Components scaled to `0.0..=1.0`, as PDF and PostScript operators expect.
    pub fn unit_rgb(&self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    /// `#rrggbb`, ignoring alpha.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse a hex color string (#RGB, #RRGGBB or #RRGGBBAA format)
    fn parse_hex(s: &str) -> Result<Color, ParseError> {
        let s = s.trim();
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ParseError::Color(format!("color must start with #, got: {}", s)))?;
        let component = |range: std::ops::Range<usize>, double: bool| {
            let digits = &hex[range];
            let digits = if double { digits.repeat(2) } else { digits.to_string() };
            u8::from_str_radix(&digits, 16)
                .map_err(|e| ParseError::Color(format!("invalid component in '{}': {}", s, e)))
        };

        match hex.len() {
            3 => Ok(Color::rgb(
                component(0..1, true)?,
                component(1..2, true)?,
                component(2..3, true)?,
            )),
            6 => Ok(Color::rgb(
                component(0..2, false)?,
                component(2..4, false)?,
                component(4..6, false)?,
            )),
            8 => Ok(Color::rgba(
                component(0..2, false)?,
                component(2..4, false)?,
                component(4..6, false)?,
                component(6..8, false)?,
            )),
            n => Err(ParseError::Color(format!(
                "invalid hex color length: expected 3, 6 or 8, got {}",
                n
            ))),
        }
    }
}

impl FromStr for Color {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Ok(Color::BLACK),
            "white" => Ok(Color::WHITE),
            "gray" | "grey" => Ok(Color::gray(128)),
            "red" => Ok(Color::rgb(255, 0, 0)),
            "green" => Ok(Color::rgb(0, 128, 0)),
            "blue" => Ok(Color::rgb(0, 0, 255)),
            _ => Self::parse_hex(s),
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ColorDef {
            Str(String),
            Map {
                r: u8,
                g: u8,
                b: u8,
                #[serde(default = "opaque")]
                a: u8,
            },
        }

        match ColorDef::deserialize(deserializer)? {
            ColorDef::Str(s) => s.parse().map_err(de::Error::custom),
            ColorDef::Map { r, g, b, a } => Ok(Color { r, g, b, a }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("#102030".parse::<Color>().unwrap(), Color::rgb(16, 32, 48));
        assert_eq!("#10203080".parse::<Color>().unwrap(), Color::rgba(16, 32, 48, 128));
    }

    #[test]
    fn rejects_missing_hash() {
        assert!("102030".parse::<Color>().is_err());
    }

    #[test]
    fn deserializes_from_string_or_map() {
        let c: Color = serde_json::from_str(r##""#ff0000""##).unwrap();
        assert_eq!(c, Color::rgb(255, 0, 0));
        let c: Color = serde_json::from_str(r#"{"r": 1, "g": 2, "b": 3}"#).unwrap();
        assert_eq!(c, Color::rgb(1, 2, 3));
    }
}
