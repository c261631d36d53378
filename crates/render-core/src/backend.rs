use crate::error::RenderError;
use crate::fonts::{FontCatalog, MetricRounding, TextMeasurer};
use crate::layout::PageLayout;
use crate::surface::DrawingSurface;
use sdexport_types::{Dimension, FontSpec, Orientation, PageSize};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// The broad family a backend belongs to. It decides background and page handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Pixel output; has an implicit opaque white background.
    Raster,
    /// Single-page scalable output without an implicit background.
    Vector,
    /// Scalable output that supports several pages in one document.
    PaginatedVector,
}

impl BackendKind {
    pub fn metric_rounding(&self) -> MetricRounding {
        match self {
            BackendKind::Raster => MetricRounding::WholePixels,
            BackendKind::Vector | BackendKind::PaginatedVector => MetricRounding::Fractional,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Raster => "raster",
            BackendKind::Vector => "vector",
            BackendKind::PaginatedVector => "paginated vector",
        })
    }
}

/// Everything a backend constructor needs besides the sink.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub dimension: Dimension,
    pub orientation: Orientation,
    /// Honored by backends with a notion of paper; ignored by the others.
    pub page_size: Option<PageSize>,
    /// Label for pages opened by paginated backends.
    pub page_label: String,
    pub page_margins: f32,
    pub fit_to_page: bool,
    pub jpeg_quality: u8,
    /// Producer string written into document metadata.
    pub creator: String,
    pub default_font: FontSpec,
    pub fonts: Arc<FontCatalog>,
}

impl BackendOptions {
    pub fn new(dimension: Dimension, fonts: Arc<FontCatalog>) -> Self {
        Self {
            dimension,
            orientation: dimension.natural_orientation(),
            page_size: None,
            page_label: String::new(),
            page_margins: 20.0,
            fit_to_page: true,
            jpeg_quality: 90,
            creator: concat!("sdexport ", env!("CARGO_PKG_VERSION")).to_string(),
            default_font: FontSpec::default(),
            fonts,
        }
    }

    pub fn page_layout(&self) -> PageLayout {
        PageLayout::compute(
            self.dimension,
            self.orientation,
            self.page_size,
            self.page_margins,
            self.fit_to_page,
        )
    }

    pub fn measurer(&self, kind: BackendKind) -> TextMeasurer {
        TextMeasurer::new(self.fonts.clone(), kind.metric_rounding())
    }
}

/// Constructor of a backend bound to a borrowed sink; the sink stays owned by the caller.
pub type BackendCtor =
    for<'a> fn(&BackendOptions, &'a mut dyn Write) -> Result<Box<dyn Backend + 'a>, RenderError>;

/// A format-specific backend bound to an output sink.
///
/// The export protocol is `start_export`, drawing through `surface`, then
/// `end_export`, which flushes the document but never closes the sink.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Writes any document prologue. Called once, before drawing.
    fn start_export(&mut self) -> Result<(), RenderError>;

    fn surface(&mut self) -> &mut dyn DrawingSurface;

    /// The page protocol, for backends that support several pages.
    fn paged(&mut self) -> Option<&mut dyn PagedBackend> {
        None
    }

    /// Completes the document and flushes it to the sink. Consumes the backend.
    fn end_export(self: Box<Self>) -> Result<(), RenderError>;
}

/// Page protocol of paginated backends.
pub trait PagedBackend {
    fn open_page(&mut self, dimension: Dimension, label: &str) -> Result<(), RenderError>;

    fn close_page(&mut self) -> Result<(), RenderError>;

    fn is_page_open(&self) -> bool;

    fn pages_written(&self) -> usize;
}
