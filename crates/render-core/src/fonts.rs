//! Font lookup and text metrics shared by every backend.
//!
//! `FontCatalog` resolves a `FontSpec` to an installed face when the
//! `system-fonts` feature is enabled. When no face can be found, metrics fall
//! back to the built-in Helvetica (or Courier) AFM widths, which are also the
//! fonts PostScript and PDF viewers substitute for the standard font names.

use sdexport_types::FontSpec;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Vertical metrics of a font at a given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub leading: f32,
}

impl FontMetrics {
    /// Distance between two consecutive baselines.
    pub fn height(&self) -> f32 {
        self.ascent + self.descent + self.leading
    }

    fn rounded(self) -> Self {
        Self {
            ascent: self.ascent.ceil(),
            descent: self.descent.ceil(),
            leading: self.leading.round(),
        }
    }
}

/// How a backend reports metrics: raster devices snap to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricRounding {
    Fractional,
    WholePixels,
}

/// Where a measurer takes advances and vertical metrics from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    /// The installed face the catalog resolves, falling back to the AFM tables.
    Installed,
    /// Always the AFM tables, for output that names the standard Type 1 fonts
    /// instead of embedding the installed face.
    StandardType1,
}

/// Raw bytes of one face inside a font file.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    index: u32,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("data_len", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

impl FontFace {
    pub fn new(data: Arc<Vec<u8>>, index: u32) -> Self {
        Self { data, index }
    }

    /// Parses the face tables. Cheap; done on demand to avoid self-referential storage.
    pub fn parse(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.index).ok()
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct FaceKey {
    family: String,
    bold: bool,
    italic: bool,
}

impl FaceKey {
    fn new(font: &FontSpec) -> Self {
        Self {
            family: font.family.to_lowercase(),
            bold: font.bold,
            italic: font.italic,
        }
    }
}

/// Resolves font requests to faces and caches the result (including misses).
pub struct FontCatalog {
    #[cfg(feature = "system-fonts")]
    db: RwLock<fontdb::Database>,
    faces: RwLock<HashMap<FaceKey, Option<FontFace>>>,
}

impl fmt::Debug for FontCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.faces.read().map(|faces| faces.len()).unwrap_or(0);
        f.debug_struct("FontCatalog").field("cached_faces", &cached).finish()
    }
}

impl Default for FontCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FontCatalog {
    /// An empty catalog; every lookup uses the built-in metrics.
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "system-fonts")]
            db: RwLock::new(fontdb::Database::new()),
            faces: RwLock::new(HashMap::new()),
        }
    }

    /// A catalog populated with the fonts installed on this machine.
    #[cfg(feature = "system-fonts")]
    pub fn with_system_fonts() -> Self {
        let catalog = Self::new();
        if let Ok(mut db) = catalog.db.write() {
            db.load_system_fonts();
            log::debug!("Loaded {} system font faces", db.len());
        }
        catalog
    }

    /// Without `system-fonts` there is nothing to load.
    #[cfg(not(feature = "system-fonts"))]
    pub fn with_system_fonts() -> Self {
        log::debug!("system-fonts feature disabled, using built-in metrics only");
        Self::new()
    }

    /// Registers a font file from memory, replacing cached lookups.
    #[cfg(feature = "system-fonts")]
    pub fn add_font_data(&self, data: Vec<u8>) {
        if let Ok(mut db) = self.db.write() {
            db.load_font_data(data);
        }
        if let Ok(mut faces) = self.faces.write() {
            faces.clear();
        }
    }

    /// The face used to draw `font`, if any installed face matches.
    pub fn face(&self, font: &FontSpec) -> Option<FontFace> {
        let key = FaceKey::new(font);
        if let Ok(faces) = self.faces.read() {
            if let Some(cached) = faces.get(&key) {
                return cached.clone();
            }
        }
        let face = self.lookup(font);
        if face.is_none() {
            log::debug!("No installed face for '{}', using built-in metrics", font.family);
        }
        if let Ok(mut faces) = self.faces.write() {
            faces.insert(key, face.clone());
        }
        face
    }

    #[cfg(feature = "system-fonts")]
    fn lookup(&self, font: &FontSpec) -> Option<FontFace> {
        let db = self.db.read().ok()?;
        let family = match logical_family(&font.family) {
            LogicalFamily::Serif => fontdb::Family::Serif,
            LogicalFamily::Monospace => fontdb::Family::Monospace,
            LogicalFamily::SansSerif => fontdb::Family::SansSerif,
            LogicalFamily::Named => fontdb::Family::Name(&font.family),
        };
        let query = fontdb::Query {
            families: &[family, fontdb::Family::SansSerif],
            weight: if font.bold { fontdb::Weight::BOLD } else { fontdb::Weight::NORMAL },
            stretch: fontdb::Stretch::Normal,
            style: if font.italic { fontdb::Style::Italic } else { fontdb::Style::Normal },
        };
        let id = db.query(&query).or_else(|| db.faces().next().map(|info| info.id))?;
        db.with_face_data(id, |data, index| FontFace::new(Arc::new(data.to_vec()), index))
    }

    #[cfg(not(feature = "system-fonts"))]
    fn lookup(&self, _font: &FontSpec) -> Option<FontFace> {
        None
    }
}

/// Broad family class of a requested font name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalFamily {
    SansSerif,
    Serif,
    Monospace,
    Named,
}

pub fn logical_family(family: &str) -> LogicalFamily {
    match family.to_ascii_lowercase().as_str() {
        "sansserif" | "sans-serif" | "sans" | "dialog" | "helvetica" | "arial" => LogicalFamily::SansSerif,
        "serif" | "times" | "times new roman" | "times-roman" => LogicalFamily::Serif,
        "monospaced" | "monospace" | "dialoginput" | "courier" | "courier new" => LogicalFamily::Monospace,
        _ => LogicalFamily::Named,
    }
}

/// Metrics front-end handed to surfaces and metrics-only handles.
#[derive(Debug, Clone)]
pub struct TextMeasurer {
    fonts: Arc<FontCatalog>,
    rounding: MetricRounding,
    source: MetricSource,
}

impl TextMeasurer {
    pub fn new(fonts: Arc<FontCatalog>, rounding: MetricRounding) -> Self {
        Self {
            fonts,
            rounding,
            source: MetricSource::Installed,
        }
    }

    pub fn with_source(mut self, source: MetricSource) -> Self {
        self.source = source;
        self
    }

    pub fn source(&self) -> MetricSource {
        self.source
    }

    fn installed_face(&self, font: &FontSpec) -> Option<FontFace> {
        match self.source {
            MetricSource::Installed => self.fonts.face(font),
            MetricSource::StandardType1 => None,
        }
    }

    pub fn catalog(&self) -> &Arc<FontCatalog> {
        &self.fonts
    }

    pub fn rounding(&self) -> MetricRounding {
        self.rounding
    }

    pub fn font_metrics(&self, font: &FontSpec) -> FontMetrics {
        let metrics = match self.installed_face(font).as_ref().and_then(|f| face_metrics(f, font.size)) {
            Some(m) => m,
            None => FontMetrics {
                ascent: 0.718 * font.size,
                descent: 0.207 * font.size,
                leading: 0.0,
            },
        };
        match self.rounding {
            MetricRounding::Fractional => metrics,
            MetricRounding::WholePixels => metrics.rounded(),
        }
    }

    pub fn string_width(&self, font: &FontSpec, text: &str) -> f32 {
        let width = match self.installed_face(font).as_ref().and_then(|f| face_advance(f, font.size, text)) {
            Some(w) => w,
            None => builtin_advance(font, text),
        };
        match self.rounding {
            MetricRounding::Fractional => width,
            MetricRounding::WholePixels => width.round(),
        }
    }
}

fn face_metrics(face: &FontFace, size: f32) -> Option<FontMetrics> {
    let parsed = face.parse()?;
    let scale = size / parsed.units_per_em() as f32;
    Some(FontMetrics {
        ascent: parsed.ascender() as f32 * scale,
        descent: -(parsed.descender() as f32) * scale,
        leading: parsed.line_gap() as f32 * scale,
    })
}

fn face_advance(face: &FontFace, size: f32, text: &str) -> Option<f32> {
    let parsed = face.parse()?;
    let scale = size / parsed.units_per_em() as f32;
    let units: u32 = text
        .chars()
        .map(|c| {
            let glyph = parsed.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
            parsed.glyph_hor_advance(glyph).unwrap_or(0) as u32
        })
        .sum();
    Some(units as f32 * scale)
}

/// Helvetica AFM advance widths for the printable ASCII range (32..=126), in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0' .. '9'
    278, 278, 584, 584, 584, 556, 1015, // ':' .. '@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A' .. 'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N' .. 'Z'
    278, 278, 278, 469, 556, 333, // '[' .. '`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a' .. 'm'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n' .. 'z'
    334, 260, 334, 584, // '{' .. '~'
];

fn builtin_advance(font: &FontSpec, text: &str) -> f32 {
    let units: u32 = match logical_family(&font.family) {
        LogicalFamily::Monospace => 600 * text.chars().count() as u32,
        _ => text
            .chars()
            .map(|c| match c as u32 {
                code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize] as u32,
                _ => 556,
            })
            .sum(),
    };
    let bold_factor = if font.bold { 1.05 } else { 1.0 };
    units as f32 * font.size / 1000.0 * bold_factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin_measurer(rounding: MetricRounding) -> TextMeasurer {
        TextMeasurer::new(Arc::new(FontCatalog::new()), rounding)
    }

    #[test]
    fn builtin_widths_match_helvetica() {
        let m = builtin_measurer(MetricRounding::Fractional);
        let font = FontSpec::new("SansSerif", 10.0);
        // H(722) + i(222) = 944 units
        assert!((m.string_width(&font, "Hi") - 9.44).abs() < 1e-4);
        assert_eq!(m.string_width(&font, ""), 0.0);
    }

    #[test]
    fn monospace_uses_fixed_advance() {
        let m = builtin_measurer(MetricRounding::Fractional);
        let font = FontSpec::new("Monospaced", 10.0);
        assert!((m.string_width(&font, "abc") - 18.0).abs() < 1e-4);
    }

    #[test]
    fn pixel_rounding_snaps_metrics() {
        let m = builtin_measurer(MetricRounding::WholePixels);
        let font = FontSpec::new("SansSerif", 12.0);
        let metrics = m.font_metrics(&font);
        assert_eq!(metrics.ascent, metrics.ascent.trunc());
        assert_eq!(metrics.descent, metrics.descent.trunc());
        assert_eq!(m.string_width(&font, "Hi"), 11.0);
    }

    #[test]
    fn standard_type1_source_ignores_installed_faces() {
        let m = TextMeasurer::new(Arc::new(FontCatalog::with_system_fonts()), MetricRounding::Fractional)
            .with_source(MetricSource::StandardType1);
        let font = FontSpec::new("SansSerif", 10.0);
        assert_eq!(m.source(), MetricSource::StandardType1);
        assert!((m.string_width(&font, "Hi") - 9.44).abs() < 1e-4);
        assert!((m.font_metrics(&font).ascent - 7.18).abs() < 1e-4);
    }

    #[test]
    fn logical_families() {
        assert_eq!(logical_family("Dialog"), LogicalFamily::SansSerif);
        assert_eq!(logical_family("Serif"), LogicalFamily::Serif);
        assert_eq!(logical_family("Courier"), LogicalFamily::Monospace);
        assert_eq!(logical_family("Fira Sans"), LogicalFamily::Named);
    }
}
