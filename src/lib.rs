//! Diagram export engine.
//!
//! A drawing is exported in three steps:
//! 1. Probe: `ExportPipeline::measure` hands out metrics for a format tag
//!    before any canvas exists, so the caller can size the drawing.
//! 2. Session: `ExportPipeline::session` binds a request to a caller-owned sink.
//! 3. Run: the session creates the backend, prepares the background, opens a
//!    page where the format has pages, calls the paint callback and finalizes.
//!
//! ```no_run
//! use sdexport::{ExportPipeline, ExportRequest, Point};
//!
//! let pipeline = ExportPipeline::new();
//! let mut out = Vec::new();
//! pipeline.export(
//!     ExportRequest::new("svg"),
//!     &mut out,
//!     |_metrics| sdexport::Dimension::new(200, 100),
//!     |surface| surface.draw_line(Point::new(10.0, 10.0), Point::new(190.0, 90.0)),
//! )?;
//! # Ok::<(), sdexport::ExportError>(())
//! ```

pub mod error;
pub mod factory;
pub mod format;
pub mod pipeline;
pub mod probe;
pub mod scene;

pub use error::ExportError;
pub use factory::BackendFactory;
pub use format::{BackendDescriptor, ExportFormat, FormatRegistry};
pub use pipeline::{ExportConfig, ExportOutcome, ExportPipeline, ExportRequest, ExportSession, ExportState, PageController};
pub use probe::{DimensionProbe, MetricsHandle};
pub use scene::{Item, Scene, Style};

pub use sdexport_render_core::{
    Backend, BackendCtor, BackendKind, BackendOptions, DrawingSurface, FontCatalog, FontMetrics, GraphicsState,
    MetricSource, PagedBackend, PixelSnapshot, RenderError, Shape, TextMeasurer,
};
pub use sdexport_types::{Color, Dimension, FontSpec, Orientation, PageSize, Point, Rect, Stroke};
