use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown orientation '{0}', expected Portrait or Landscape")]
    Orientation(String),
    #[error("unknown page size '{0}'")]
    PageSize(String),
    #[error("invalid color: {0}")]
    Color(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("portrait") {
            Ok(Orientation::Portrait)
        } else if s.trim().eq_ignore_ascii_case("landscape") {
            Ok(Orientation::Landscape)
        } else {
            Err(ParseError::Orientation(s.to_string()))
        }
    }
}

const MM_TO_PT: f32 = 72.0 / 25.4;

/// A named paper size. Dimensions are reported in PostScript points, portrait side up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSize {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    B4,
    B5,
    Letter,
    Legal,
    Tabloid,
    Executive,
    /// Alias of A4 kept for documents written by older editors.
    International,
}

impl PageSize {
    pub const ALL: [PageSize; 14] = [
        PageSize::A0,
        PageSize::A1,
        PageSize::A2,
        PageSize::A3,
        PageSize::A4,
        PageSize::A5,
        PageSize::A6,
        PageSize::B4,
        PageSize::B5,
        PageSize::Letter,
        PageSize::Legal,
        PageSize::Tabloid,
        PageSize::Executive,
        PageSize::International,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PageSize::A0 => "A0",
            PageSize::A1 => "A1",
            PageSize::A2 => "A2",
            PageSize::A3 => "A3",
            PageSize::A4 => "A4",
            PageSize::A5 => "A5",
            PageSize::A6 => "A6",
            PageSize::B4 => "B4",
            PageSize::B5 => "B5",
            PageSize::Letter => "Letter",
            PageSize::Legal => "Legal",
            PageSize::Tabloid => "Tabloid",
            PageSize::Executive => "Executive",
            PageSize::International => "International",
        }
    }

    /// Portrait width and height in points.
    pub fn portrait_points(&self) -> (f32, f32) {
        match self {
            PageSize::A0 => (841.0 * MM_TO_PT, 1189.0 * MM_TO_PT),
            PageSize::A1 => (594.0 * MM_TO_PT, 841.0 * MM_TO_PT),
            PageSize::A2 => (420.0 * MM_TO_PT, 594.0 * MM_TO_PT),
            PageSize::A3 => (297.0 * MM_TO_PT, 420.0 * MM_TO_PT),
            PageSize::A4 | PageSize::International => (210.0 * MM_TO_PT, 297.0 * MM_TO_PT),
            PageSize::A5 => (148.0 * MM_TO_PT, 210.0 * MM_TO_PT),
            PageSize::A6 => (105.0 * MM_TO_PT, 148.0 * MM_TO_PT),
            PageSize::B4 => (250.0 * MM_TO_PT, 353.0 * MM_TO_PT),
            PageSize::B5 => (176.0 * MM_TO_PT, 250.0 * MM_TO_PT),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Executive => (522.0, 756.0),
        }
    }

    /// Width and height in points with the long side placed according to `orientation`.
    pub fn oriented_points(&self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.portrait_points();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("ledger") {
            return Ok(PageSize::Tabloid);
        }
        PageSize::ALL
            .iter()
            .find(|size| size.name().eq_ignore_ascii_case(token))
            .copied()
            .ok_or_else(|| ParseError::PageSize(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_tokens_are_case_insensitive() {
        assert_eq!("a4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!(" LETTER ".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert_eq!("Ledger".parse::<PageSize>().unwrap(), PageSize::Tabloid);
        assert!(matches!("Folio".parse::<PageSize>(), Err(ParseError::PageSize(_))));
    }

    #[test]
    fn a4_in_points() {
        let (w, h) = PageSize::A4.portrait_points();
        assert!((w - 595.28).abs() < 0.01);
        assert!((h - 841.89).abs() < 0.01);
    }

    #[test]
    fn landscape_swaps_sides() {
        assert_eq!(PageSize::Letter.oriented_points(Orientation::Landscape), (792.0, 612.0));
    }

    #[test]
    fn orientation_parsing() {
        assert_eq!("landscape".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert_eq!("Portrait".parse::<Orientation>().unwrap(), Orientation::Portrait);
        assert!("sideways".parse::<Orientation>().is_err());
    }
}
