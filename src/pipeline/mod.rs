//! Export orchestration: probe, size, create backend, prepare background,
//! paint inside the page protocol, finalize.

mod config;
mod page;
mod session;

pub use config::ExportConfig;
pub use page::PageController;
pub use session::{ExportOutcome, ExportSession, ExportState};

use crate::error::ExportError;
use crate::factory::BackendFactory;
use crate::format::FormatRegistry;
use crate::probe::{DimensionProbe, MetricsHandle};
use sdexport_render_core::{DrawingSurface, FontCatalog, RenderError};
use sdexport_types::{Dimension, Orientation};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// What to export. The sink is passed separately and stays owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub format_tag: String,
    /// Derived from the canvas shape when unset.
    pub orientation: Option<Orientation>,
    /// Paper size token such as "A4" or "letter"; only some vector formats use it.
    pub page_size: Option<String>,
}

impl ExportRequest {
    pub fn new(format_tag: impl Into<String>) -> Self {
        Self {
            format_tag: format_tag.into(),
            orientation: None,
            page_size: None,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn with_page_size(mut self, token: impl Into<String>) -> Self {
        self.page_size = Some(token.into());
        self
    }
}

/// Entry point for exports. Holds the format registry, the configuration and
/// the font catalog shared read-only by every session.
#[derive(Debug, Clone)]
pub struct ExportPipeline {
    registry: FormatRegistry,
    config: ExportConfig,
    fonts: Arc<FontCatalog>,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportPipeline {
    /// A pipeline with the default configuration and every built-in format.
    pub fn new() -> Self {
        Self::with_config(ExportConfig::default())
    }

    pub fn with_config(config: ExportConfig) -> Self {
        let fonts = if config.system_fonts {
            FontCatalog::with_system_fonts()
        } else {
            FontCatalog::new()
        };
        Self {
            registry: FormatRegistry::new(),
            config,
            fonts: Arc::new(fonts),
        }
    }

    /// Replaces the font catalog, e.g. with one holding embedded fonts.
    pub fn with_fonts(mut self, fonts: Arc<FontCatalog>) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FormatRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn fonts(&self) -> &Arc<FontCatalog> {
        &self.fonts
    }

    /// Metrics-only handle for `tag`, for sizing a drawing before export.
    pub fn measure(&self, tag: &str) -> Result<MetricsHandle, ExportError> {
        DimensionProbe::new(&self.registry, &self.fonts, &self.config.default_font).measure(tag)
    }

    pub fn factory(&self) -> BackendFactory<'_> {
        BackendFactory::new(&self.registry, &self.config, &self.fonts)
    }

    /// Starts a session bound to `sink`. Unknown or unavailable formats fail
    /// here, before anything is written.
    pub fn session<'a>(
        &self,
        request: ExportRequest,
        sink: &'a mut dyn Write,
    ) -> Result<ExportSession<'_, 'a>, ExportError> {
        let metrics = self.measure(&request.format_tag)?;
        Ok(ExportSession::new(
            self.factory(),
            self.config.default_font.clone(),
            request,
            metrics,
            sink,
        ))
    }

    /// Runs a complete export to `sink`.
    pub fn export<S, P>(
        &self,
        request: ExportRequest,
        sink: &mut dyn Write,
        size: S,
        paint: P,
    ) -> Result<ExportOutcome, ExportError>
    where
        S: FnOnce(&MetricsHandle) -> Dimension,
        P: FnOnce(&mut dyn DrawingSurface) -> Result<(), RenderError>,
    {
        self.session(request, sink)?.run(size, paint)
    }

    /// Exports to a temporary file next to `path` and moves it into place
    /// only when the export succeeded.
    pub fn export_to_path<S, P>(
        &self,
        request: ExportRequest,
        path: &Path,
        size: S,
        paint: P,
    ) -> Result<ExportOutcome, ExportError>
    where
        S: FnOnce(&MetricsHandle) -> Dimension,
        P: FnOnce(&mut dyn DrawingSurface) -> Result<(), RenderError>,
    {
        let format = self.registry.resolve(&request.format_tag)?.format;
        let io_err = |source| ExportError::Io { format: format.clone(), source };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        let outcome = {
            let mut out = BufWriter::new(temp.as_file_mut());
            let outcome = self.export(request, &mut out, size, paint)?;
            out.flush().map_err(io_err)?;
            outcome
        };
        temp.persist(path).map_err(|e| io_err(e.error))?;
        log::debug!("Published {} output to {}", format, path.display());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> ExportPipeline {
        ExportPipeline::with_config(ExportConfig {
            system_fonts: false,
            ..Default::default()
        })
    }

    #[test]
    fn unknown_format_creates_no_session() {
        let mut sink = Vec::new();
        let err = pipeline().session(ExportRequest::new("tiff"), &mut sink).err().unwrap();
        assert!(err.is_unsupported_format());
        assert!(sink.is_empty());
    }

    #[test]
    fn session_exposes_probe_before_sizing() {
        let pipeline = pipeline();
        let mut sink = Vec::new();
        let session = pipeline.session(ExportRequest::new("SVG"), &mut sink).unwrap();
        assert_eq!(session.state(), ExportState::Created);
        assert_eq!(session.metrics().dimension(), Dimension::UNIT);
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExportPipeline>();
    }
}
