//! PDF export backend using lopdf.
//!
//! Drawing commands are collected as content-stream operations in a coordinate
//! system flipped to match the canvas, and the document object graph is built
//! and written to the sink when the export ends.

mod backend;

pub use backend::{PdfBackend, create};
