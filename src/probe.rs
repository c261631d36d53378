use crate::error::ExportError;
use crate::format::{BackendDescriptor, FormatRegistry};
use sdexport_render_core::{BackendKind, FontCatalog, FontMetrics, MetricSource, TextMeasurer};
use sdexport_types::{Dimension, FontSpec};
use std::sync::Arc;

/// Metrics of a format, available before the canvas size is known.
///
/// The handle is bound to a 1x1 canvas and no sink; it never produces output.
/// Raster handles report whole-pixel metrics, vector handles fractional ones,
/// matching what the real backend will use.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    descriptor: BackendDescriptor,
    measurer: TextMeasurer,
    default_font: FontSpec,
}

impl MetricsHandle {
    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> BackendKind {
        self.descriptor.kind
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::UNIT
    }

    pub fn default_font(&self) -> &FontSpec {
        &self.default_font
    }

    pub fn metric_source(&self) -> MetricSource {
        self.measurer.source()
    }

    pub fn font_metrics(&self, font: &FontSpec) -> FontMetrics {
        self.measurer.font_metrics(font)
    }

    pub fn string_width(&self, font: &FontSpec, text: &str) -> f32 {
        self.measurer.string_width(font, text)
    }
}

/// Hands out metrics handles for format tags.
pub struct DimensionProbe<'p> {
    registry: &'p FormatRegistry,
    fonts: &'p Arc<FontCatalog>,
    default_font: &'p FontSpec,
}

impl<'p> DimensionProbe<'p> {
    pub fn new(registry: &'p FormatRegistry, fonts: &'p Arc<FontCatalog>, default_font: &'p FontSpec) -> Self {
        Self { registry, fonts, default_font }
    }

    /// Fails for unknown tags and for formats whose backend is unavailable,
    /// so an export is rejected before any sizing work happens.
    pub fn measure(&self, tag: &str) -> Result<MetricsHandle, ExportError> {
        let descriptor = self.registry.resolve(tag)?;
        self.registry.constructor(&descriptor.format)?;
        let measurer = TextMeasurer::new(self.fonts.clone(), descriptor.kind.metric_rounding())
            .with_source(self.registry.metric_source(&descriptor.format));
        Ok(MetricsHandle {
            descriptor,
            measurer,
            default_font: self.default_font.clone(),
        })
    }
}
