use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encoding error: {0}")]
    Encode(String),
    #[error("PDF generation error: {0}")]
    Pdf(String),
    #[error("SVG generation error: {0}")]
    Xml(String),
    #[error("cannot allocate a {width}x{height} canvas")]
    InvalidCanvas { width: u32, height: u32 },
    #[error("no font face available for '{0}'")]
    MissingFont(String),
    #[error("page protocol violation: {0}")]
    PageProtocol(String),
    #[error("Other rendering error: {0}")]
    Other(String),
}

#[cfg(feature = "lopdf")]
impl From<lopdf::Error> for RenderError {
    fn from(err: lopdf::Error) -> Self {
        RenderError::Pdf(err.to_string())
    }
}

#[cfg(feature = "image")]
impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => RenderError::Io(e),
            other => RenderError::Encode(other.to_string()),
        }
    }
}

#[cfg(feature = "quick-xml")]
impl From<quick_xml::Error> for RenderError {
    fn from(err: quick_xml::Error) -> Self {
        RenderError::Xml(err.to_string())
    }
}

impl From<&str> for RenderError {
    fn from(s: &str) -> Self {
        RenderError::Other(s.to_string())
    }
}

impl From<String> for RenderError {
    fn from(s: String) -> Self {
        RenderError::Other(s)
    }
}
