use crate::error::ExportError;
use crate::format::{BackendDescriptor, FormatRegistry};
use crate::pipeline::ExportConfig;
use sdexport_render_core::{Backend, BackendKind, BackendOptions, FontCatalog};
use sdexport_types::{Dimension, Orientation, PageSize};
use std::io::Write;
use std::sync::Arc;

/// Creates the real backend once the canvas dimension is known.
pub struct BackendFactory<'p> {
    registry: &'p FormatRegistry,
    config: &'p ExportConfig,
    fonts: &'p Arc<FontCatalog>,
}

impl<'p> BackendFactory<'p> {
    pub fn new(registry: &'p FormatRegistry, config: &'p ExportConfig, fonts: &'p Arc<FontCatalog>) -> Self {
        Self { registry, config, fonts }
    }

    /// Backend options for an export. Validates everything a constructor
    /// would otherwise trip over, so failures happen before any write.
    pub fn options(
        &self,
        descriptor: &BackendDescriptor,
        dimension: Dimension,
        orientation: Orientation,
        page_size: Option<&str>,
    ) -> Result<BackendOptions, ExportError> {
        if dimension.is_empty() {
            return Err(ExportError::InvalidDimension {
                width: dimension.width,
                height: dimension.height,
            });
        }

        let token = page_size.map(str::trim).filter(|t| !t.is_empty());
        let page_size = match token {
            Some(token) if self.registry.honors_page_size(&descriptor.format) => Some(
                token
                    .parse::<PageSize>()
                    .map_err(|_| ExportError::InvalidPageSize(token.to_string()))?,
            ),
            Some(token) => {
                log::debug!("{} output ignores page size '{}'", descriptor.format, token);
                None
            }
            None => None,
        };

        let mut options = BackendOptions::new(dimension, self.fonts.clone());
        options.orientation = orientation;
        options.page_size = page_size;
        options.page_margins = self.config.page_margins;
        options.fit_to_page = self.config.fit_to_page;
        options.jpeg_quality = self.config.jpeg_quality;
        options.creator = self.config.creator.clone();
        options.default_font = self.config.default_font.clone();
        Ok(options)
    }

    pub fn realize<'a>(
        &self,
        descriptor: &BackendDescriptor,
        dimension: Dimension,
        orientation: Orientation,
        page_size: Option<&str>,
        sink: &'a mut dyn Write,
    ) -> Result<Box<dyn Backend + 'a>, ExportError> {
        let ctor = self.registry.constructor(&descriptor.format)?;
        let options = self.options(descriptor, dimension, orientation, page_size)?;
        let backend = ctor(&options, sink).map_err(|source| ExportError::BackendCreation {
            format: descriptor.format.clone(),
            source,
        })?;
        if backend.kind() != descriptor.kind {
            log::warn!(
                "{} backend reports kind {} but is registered as {}",
                descriptor.format,
                backend.kind(),
                descriptor.kind
            );
        }
        let raster = descriptor.kind == BackendKind::Raster;
        log::debug!(
            "Created {} backend for a {}x{} canvas{}",
            descriptor.format,
            dimension.width,
            dimension.height,
            if raster { String::new() } else { format!(" ({})", orientation) }
        );
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_factory(test: impl FnOnce(&FormatRegistry, BackendFactory<'_>)) {
        let registry = FormatRegistry::new();
        let config = ExportConfig::default();
        let fonts = Arc::new(FontCatalog::new());
        test(&registry, BackendFactory::new(&registry, &config, &fonts));
    }

    #[test]
    fn page_size_only_reaches_formats_that_use_it() {
        with_factory(|registry, factory| {
            let dim = Dimension::new(100, 50);
            let pdf = registry.resolve("pdf").unwrap();
            let options = factory.options(&pdf, dim, Orientation::Portrait, Some("a4")).unwrap();
            assert_eq!(options.page_size, Some(PageSize::A4));
            assert_eq!(options.orientation, Orientation::Portrait);

            let svg = registry.resolve("svg").unwrap();
            let options = factory.options(&svg, dim, Orientation::Portrait, Some("a4")).unwrap();
            assert_eq!(options.page_size, None);
        });
    }

    #[test]
    fn bad_requests_fail_before_writing() {
        with_factory(|registry, factory| {
            let ps = registry.resolve("ps").unwrap();
            let mut sink = Vec::new();
            let err = factory
                .realize(&ps, Dimension::new(10, 10), Orientation::Portrait, Some("napkin"), &mut sink)
                .err()
                .unwrap();
            assert!(matches!(err, ExportError::InvalidPageSize(ref t) if t == "napkin"));

            let err = factory
                .realize(&ps, Dimension::new(0, 10), Orientation::Portrait, None, &mut sink)
                .err()
                .unwrap();
            assert!(matches!(err, ExportError::InvalidDimension { width: 0, height: 10 }));
            assert!(sink.is_empty());
        });
    }
}
