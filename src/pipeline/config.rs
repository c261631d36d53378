use crate::error::ExportError;
use sdexport_types::FontSpec;
use serde::{Deserialize, Serialize};

/// Export settings shared by every session of an `ExportPipeline`.
///
/// Deserialized from camelCase JSON; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// JPEG encoder quality, 1 to 100.
    pub jpeg_quality: u8,
    /// Margin kept free on each side of a paper-sized page, in points.
    pub page_margins: f32,
    /// Scale the canvas down (or up) to fill a paper-sized page.
    pub fit_to_page: bool,
    /// Load installed system fonts for metrics and raster text.
    pub system_fonts: bool,
    pub default_font: FontSpec,
    /// Producer string recorded in document metadata.
    pub creator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            page_margins: 20.0,
            fit_to_page: true,
            system_fonts: true,
            default_font: FontSpec::default(),
            creator: concat!("sdexport ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ExportConfig {
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = ExportConfig::from_json(r#"{"jpegQuality": 75, "defaultFont": {"family": "Serif"}}"#).unwrap();
        assert_eq!(config.jpeg_quality, 75);
        assert_eq!(config.page_margins, 20.0);
        assert!(config.fit_to_page);
        assert_eq!(config.default_font, FontSpec::new("Serif", 12.0));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ExportConfig::from_json(r#"{"pageMargins": "wide"}"#).unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }
}
