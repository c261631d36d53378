use crate::format::ExportFormat;
use sdexport_render_core::RenderError;
use thiserror::Error;

/// Errors produced by an export, from format lookup to the final flush.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unsupported export format '{0}'")]
    UnknownFormat(String),

    #[error("export format '{tag}' is unavailable: built without the '{feature}' feature")]
    BackendUnavailable { tag: String, feature: &'static str },

    #[error("invalid canvas dimension {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    #[error("unknown page size '{0}'")]
    InvalidPageSize(String),

    #[error("failed to create the {format} backend: {source}")]
    BackendCreation {
        format: ExportFormat,
        #[source]
        source: RenderError,
    },

    #[error("I/O error while writing {format}: {source}")]
    Io {
        format: ExportFormat,
        #[source]
        source: std::io::Error,
    },

    #[error("rendering {format} failed: {source}")]
    Render {
        format: ExportFormat,
        #[source]
        source: RenderError,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ExportError {
    /// True for both unknown tags and known formats whose backend was compiled out.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, ExportError::UnknownFormat(_) | ExportError::BackendUnavailable { .. })
    }

    /// Classifies a backend failure: sink errors become `Io`, the rest `Render`.
    pub fn from_render(format: &ExportFormat, err: RenderError) -> Self {
        match err {
            RenderError::Io(source) => ExportError::Io { format: format.clone(), source },
            source => ExportError::Render { format: format.clone(), source },
        }
    }
}
