use crate::error::RenderError;
use crate::fonts::{FontMetrics, TextMeasurer};
use sdexport_types::{Color, Dimension, FontSpec, Point, Rect, Stroke};

/// Geometry accepted by `DrawingSurface::stroke` and `DrawingSurface::fill`.
///
/// Coordinates are canvas units with the origin at the top-left corner and y
/// growing downwards, whatever the backend's native coordinate system is.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line { from: Point, to: Point },
    Rect(Rect),
    /// An ellipse inscribed in the given bounding box.
    Ellipse(Rect),
    Polyline { points: Vec<Point>, closed: bool },
}

impl Shape {
    pub fn line(from: impl Into<Point>, to: impl Into<Point>) -> Self {
        Shape::Line { from: from.into(), to: to.into() }
    }

    pub fn polygon(points: Vec<Point>) -> Self {
        Shape::Polyline { points, closed: true }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Line { from, to } => Rect::enclosing(&[*from, *to]).unwrap_or_default(),
            Shape::Rect(r) | Shape::Ellipse(r) => *r,
            Shape::Polyline { points, .. } => Rect::enclosing(points).unwrap_or_default(),
        }
    }

    /// Whether filling the shape can touch any pixel.
    pub fn has_area(&self) -> bool {
        match self {
            Shape::Line { .. } => false,
            Shape::Rect(r) | Shape::Ellipse(r) => r.width > 0.0 && r.height > 0.0,
            Shape::Polyline { points, .. } => points.len() >= 3,
        }
    }
}

/// Current pen, paint and font of a surface.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphicsState {
    pub color: Color,
    pub stroke: Stroke,
    pub font: FontSpec,
}

impl GraphicsState {
    pub fn with_font(font: FontSpec) -> Self {
        Self { font, ..Default::default() }
    }
}

/// A copy of a raster surface's pixels, straight RGBA, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSnapshot {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelSnapshot {
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let p = self.rgba.get(i..i + 4)?;
        Some(Color::rgba(p[0], p[1], p[2], p[3]))
    }

    pub fn is_uniform(&self, color: Color) -> bool {
        self.rgba.len() == (self.width * self.height * 4) as usize
            && self
                .rgba
                .chunks_exact(4)
                .all(|p| p == [color.r, color.g, color.b, color.a])
    }
}

/// The drawing API handed to paint callbacks.
///
/// Implementations may stream output as commands arrive, so every drawing call
/// can fail with an I/O error from the sink.
pub trait DrawingSurface {
    fn dimension(&self) -> Dimension;

    fn state(&self) -> &GraphicsState;

    fn state_mut(&mut self) -> &mut GraphicsState;

    /// Metrics source matching how this surface renders text.
    fn measurer(&self) -> &TextMeasurer;

    fn stroke(&mut self, shape: &Shape) -> Result<(), RenderError>;

    fn fill(&mut self, shape: &Shape) -> Result<(), RenderError>;

    /// Draws `text` with its baseline starting at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), RenderError>;

    /// Pixel contents, for surfaces that have any.
    fn snapshot(&self) -> Option<PixelSnapshot> {
        None
    }

    fn set_color(&mut self, color: Color) {
        self.state_mut().color = color;
    }

    fn set_stroke(&mut self, stroke: Stroke) {
        self.state_mut().stroke = stroke;
    }

    fn set_font(&mut self, font: FontSpec) {
        self.state_mut().font = font;
    }

    fn font_metrics(&self) -> FontMetrics {
        self.measurer().font_metrics(&self.state().font)
    }

    fn string_width(&self, text: &str) -> f32 {
        self.measurer().string_width(&self.state().font, text)
    }

    fn draw_line(&mut self, from: Point, to: Point) -> Result<(), RenderError> {
        self.stroke(&Shape::Line { from, to })
    }

    fn draw_rect(&mut self, rect: Rect) -> Result<(), RenderError> {
        self.stroke(&Shape::Rect(rect))
    }

    fn fill_rect(&mut self, rect: Rect) -> Result<(), RenderError> {
        self.fill(&Shape::Rect(rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_bounds() {
        let line = Shape::line((10.0, 5.0), (2.0, 8.0));
        assert_eq!(line.bounds(), Rect::new(2.0, 5.0, 8.0, 3.0));
        assert!(!line.has_area());
        assert!(Shape::polygon(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)]).has_area());
    }

    #[test]
    fn snapshot_uniformity() {
        let snapshot = PixelSnapshot { width: 2, height: 1, rgba: vec![255; 8] };
        assert!(snapshot.is_uniform(Color::WHITE));
        assert_eq!(snapshot.pixel(1, 0), Some(Color::WHITE));
        assert_eq!(snapshot.pixel(2, 0), None);

        let short = PixelSnapshot { width: 2, height: 2, rgba: vec![255; 8] };
        assert!(!short.is_uniform(Color::WHITE));
    }
}
