pub mod color;
pub mod font;
pub mod geometry;
pub mod page;

pub use color::Color;
pub use font::{FontSpec, Stroke};
pub use geometry::{Dimension, Point, Rect};
pub use page::{Orientation, PageSize, ParseError};
