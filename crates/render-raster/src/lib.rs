//! Raster export backends.
//!
//! Drawing goes to an anti-aliased tiny-skia pixmap sized to the canvas; the
//! finished frame is encoded with the `image` crate when the export ends.

mod backend;
mod glyphs;

pub use backend::{RasterBackend, RasterFormat, create_bmp, create_gif, create_jpeg, create_png};
