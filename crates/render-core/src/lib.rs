//! Core backend abstractions for diagram export.
//!
//! This crate provides the traits and types every output backend implements:
//! - `Backend` / `PagedBackend` for the export and page protocol
//! - `DrawingSurface` and `Shape`, the drawing API handed to paint callbacks
//! - `FontCatalog` and `TextMeasurer` for font metrics shared by all backends
//! - `PageLayout` for fitting a canvas onto a paper size
//! - Error types for rendering operations

mod backend;
mod error;
pub mod fonts;
mod layout;
mod surface;
pub mod utils;

pub use backend::{Backend, BackendCtor, BackendKind, BackendOptions, PagedBackend};
pub use error::RenderError;
pub use fonts::{FontCatalog, FontFace, FontMetrics, MetricRounding, MetricSource, TextMeasurer};
pub use layout::PageLayout;
pub use surface::{DrawingSurface, GraphicsState, PixelSnapshot, Shape};
