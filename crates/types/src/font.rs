use serde::{Deserialize, Serialize};

fn default_family() -> String {
    "SansSerif".to_string()
}

fn default_size() -> f32 {
    12.0
}

/// A font request. Families are logical names ("SansSerif", "Serif",
/// "Monospaced") or concrete family names; backends map them to what they have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    #[serde(default = "default_family")]
    pub family: String,
    #[serde(default = "default_size")]
    pub size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: default_family(),
            size: default_size(),
            bold: false,
            italic: false,
        }
    }
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// Outline pen. An empty `dash` means a solid line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub width: f32,
    #[serde(default)]
    pub dash: Vec<f32>,
}

impl Default for Stroke {
    fn default() -> Self {
        Self { width: 1.0, dash: Vec::new() }
    }
}

impl Stroke {
    pub fn solid(width: f32) -> Self {
        Self { width, dash: Vec::new() }
    }

    pub fn dashed(width: f32, dash: Vec<f32>) -> Self {
        Self { width, dash }
    }

    /// A dash pattern every backend can draw: non-empty, even length, all positive.
    pub fn effective_dash(&self) -> Option<Vec<f32>> {
        if self.dash.is_empty() || self.dash.iter().any(|d| *d <= 0.0) {
            return None;
        }
        let mut pattern = self.dash.clone();
        if pattern.len() % 2 == 1 {
            pattern.extend_from_slice(&self.dash);
        }
        Some(pattern)
    }
}
