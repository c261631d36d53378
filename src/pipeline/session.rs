use super::ExportRequest;
use super::page::PageController;
use crate::error::ExportError;
use crate::factory::BackendFactory;
use crate::format::{BackendDescriptor, ExportFormat};
use crate::probe::MetricsHandle;
use sdexport_render_core::{BackendKind, DrawingSurface, GraphicsState, RenderError};
use sdexport_types::{Color, Dimension, FontSpec, Orientation};
use std::fmt;
use std::io::Write;

/// Progress of an `ExportSession`. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Created,
    Sized,
    BackendBound,
    BackgroundPrepared,
    Painting,
    Finalized,
    Failed,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportState::Created => "created",
            ExportState::Sized => "sized",
            ExportState::BackendBound => "backend bound",
            ExportState::BackgroundPrepared => "background prepared",
            ExportState::Painting => "painting",
            ExportState::Finalized => "finalized",
            ExportState::Failed => "failed",
        })
    }
}

/// Summary of a completed export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub format: ExportFormat,
    pub kind: BackendKind,
    pub dimension: Dimension,
    pub orientation: Orientation,
    /// Pages opened through the page protocol; zero for non-paginated formats.
    pub pages: usize,
    pub state: ExportState,
}

/// One export of one drawing to one sink. Consumed by `run`.
pub struct ExportSession<'p, 'a> {
    factory: BackendFactory<'p>,
    default_font: FontSpec,
    request: ExportRequest,
    descriptor: BackendDescriptor,
    metrics: MetricsHandle,
    sink: &'a mut dyn Write,
    state: ExportState,
}

impl<'p, 'a> ExportSession<'p, 'a> {
    pub(crate) fn new(
        factory: BackendFactory<'p>,
        default_font: FontSpec,
        request: ExportRequest,
        metrics: MetricsHandle,
        sink: &'a mut dyn Write,
    ) -> Self {
        Self {
            factory,
            default_font,
            request,
            descriptor: metrics.descriptor().clone(),
            metrics,
            sink,
            state: ExportState::Created,
        }
    }

    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    /// Metrics for sizing the drawing before the backend exists.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Sizes the canvas with `size`, creates the backend, prepares the
    /// background, paints once with `paint` and finalizes the document.
    ///
    /// The sink is flushed but stays open; on failure it holds partial output.
    pub fn run<S, P>(self, size: S, paint: P) -> Result<ExportOutcome, ExportError>
    where
        S: FnOnce(&MetricsHandle) -> Dimension,
        P: FnOnce(&mut dyn DrawingSurface) -> Result<(), RenderError>,
    {
        let format = self.descriptor.format.clone();
        let mut state = self.state;
        let result = self.drive(&mut state, size, paint);
        if let Err(err) = &result {
            log::debug!("{} export failed while {}: {}", format, state, err);
            advance(&mut state, ExportState::Failed, &format);
        }
        result
    }

    fn drive<S, P>(self, state: &mut ExportState, size: S, paint: P) -> Result<ExportOutcome, ExportError>
    where
        S: FnOnce(&MetricsHandle) -> Dimension,
        P: FnOnce(&mut dyn DrawingSurface) -> Result<(), RenderError>,
    {
        let format = self.descriptor.format.clone();
        let kind = self.descriptor.kind;
        let render_err = |err| ExportError::from_render(&format, err);

        let dimension = size(&self.metrics);
        if dimension.is_empty() {
            return Err(ExportError::InvalidDimension {
                width: dimension.width,
                height: dimension.height,
            });
        }
        let orientation = self
            .request
            .orientation
            .unwrap_or_else(|| dimension.natural_orientation());
        advance(state, ExportState::Sized, &format);

        let mut backend = self.factory.realize(
            &self.descriptor,
            dimension,
            orientation,
            self.request.page_size.as_deref(),
            self.sink,
        )?;
        advance(state, ExportState::BackendBound, &format);

        backend.start_export().map_err(render_err)?;
        if kind == BackendKind::Raster {
            let surface = backend.surface();
            surface.set_color(Color::WHITE);
            surface.fill_rect(dimension.bounds()).map_err(render_err)?;
            *surface.state_mut() = GraphicsState::with_font(self.default_font.clone());
        }
        advance(state, ExportState::BackgroundPrepared, &format);

        advance(state, ExportState::Painting, &format);
        let pages = PageController::new(backend.as_mut())
            .paint(dimension, paint)
            .map_err(render_err)?;

        backend.end_export().map_err(render_err)?;
        advance(state, ExportState::Finalized, &format);

        log::info!(
            "Exported {} ({}x{}, {}{})",
            format,
            dimension.width,
            dimension.height,
            orientation,
            if pages > 0 { format!(", {} page(s)", pages) } else { String::new() }
        );
        Ok(ExportOutcome {
            format,
            kind,
            dimension,
            orientation,
            pages,
            state: *state,
        })
    }
}

fn advance(state: &mut ExportState, next: ExportState, format: &ExportFormat) {
    log::debug!("{} export: {} -> {}", format, state, next);
    *state = next;
}
