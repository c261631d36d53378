//! Vector export backends.
//!
//! - `SvgBackend` streams SVG elements through a quick-xml writer
//! - `PostScriptBackend` writes DSC-conformant EPS or multi-page PostScript
//! - `EmfBackend` records Enhanced Metafile records and emits them with the
//!   header once the record count and size are known

mod emf;
mod postscript;
mod svg;

pub use emf::{EmfBackend, create_emf};
pub use postscript::{PostScriptBackend, PostScriptMode, create_eps, create_ps};
pub use svg::{SvgBackend, create_svg};
