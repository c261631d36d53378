//! A small JSON diagram description: a ready-made drawing to export.
//!
//! ```json
//! {
//!   "items": [
//!     { "type": "rect", "x": 10, "y": 10, "width": 80, "height": 30, "fill": "#eef" },
//!     { "type": "text", "text": "Client", "at": { "x": 20, "y": 30 } },
//!     { "type": "arrow", "from": { "x": 50, "y": 40 }, "to": { "x": 50, "y": 90 }, "stroke": { "width": 1, "dash": [4] } }
//!   ]
//! }
//! ```

use crate::probe::MetricsHandle;
use sdexport_render_core::{DrawingSurface, RenderError, Shape};
use sdexport_types::{Color, Dimension, FontSpec, Point, Rect, Stroke};
use serde::{Deserialize, Serialize};

fn default_padding() -> f32 {
    10.0
}

fn default_head() -> f32 {
    8.0
}

/// Paint attributes shared by every item. Unset fields fall back to black,
/// a 1-unit solid pen and the surface's default font.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontSpec>,
}

impl Style {
    fn color(&self) -> Color {
        self.color.unwrap_or(Color::BLACK)
    }

    fn stroke(&self) -> Stroke {
        self.stroke.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Item {
    Line {
        from: Point,
        to: Point,
        #[serde(flatten)]
        style: Style,
    },
    Arrow {
        from: Point,
        to: Point,
        /// Length of the arrow head.
        #[serde(default = "default_head")]
        head: f32,
        #[serde(flatten)]
        style: Style,
    },
    Rect {
        #[serde(flatten)]
        bounds: Rect,
        #[serde(flatten)]
        style: Style,
    },
    Ellipse {
        #[serde(flatten)]
        bounds: Rect,
        #[serde(flatten)]
        style: Style,
    },
    Polyline {
        points: Vec<Point>,
        #[serde(default)]
        closed: bool,
        #[serde(flatten)]
        style: Style,
    },
    /// Text with its baseline starting at `at`.
    Text {
        text: String,
        at: Point,
        #[serde(flatten)]
        style: Style,
    },
}

/// Filled triangle at `to`, pointing away from `from`.
fn arrow_head(from: Point, to: Point, length: f32) -> Option<Vec<Point>> {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let norm = (dx * dx + dy * dy).sqrt();
    if norm == 0.0 || length <= 0.0 {
        return None;
    }
    let (ux, uy) = (dx / norm, dy / norm);
    let base = Point::new(to.x - ux * length, to.y - uy * length);
    let half = length / 2.0;
    Some(vec![
        to,
        Point::new(base.x - uy * half, base.y + ux * half),
        Point::new(base.x + uy * half, base.y - ux * half),
    ])
}

fn fill_and_stroke(surface: &mut dyn DrawingSurface, shape: Shape, style: &Style) -> Result<(), RenderError> {
    if let Some(fill) = style.fill {
        surface.set_color(fill);
        surface.fill(&shape)?;
        surface.set_color(style.color());
    }
    if surface.state().stroke.width > 0.0 {
        surface.stroke(&shape)?;
    }
    Ok(())
}

impl Item {
    pub fn style(&self) -> &Style {
        match self {
            Item::Line { style, .. }
            | Item::Arrow { style, .. }
            | Item::Rect { style, .. }
            | Item::Ellipse { style, .. }
            | Item::Polyline { style, .. }
            | Item::Text { style, .. } => style,
        }
    }

    /// Area the item may paint, including half the pen width.
    pub fn bounds(&self, metrics: &MetricsHandle) -> Rect {
        let pen = self.style().stroke().width / 2.0;
        match self {
            Item::Line { from, to, .. } => Rect::enclosing(&[*from, *to]).unwrap_or_default().inflate(pen),
            Item::Arrow { from, to, head, .. } => {
                Rect::enclosing(&[*from, *to]).unwrap_or_default().inflate(pen.max(head / 2.0))
            }
            Item::Rect { bounds, .. } | Item::Ellipse { bounds, .. } => bounds.inflate(pen),
            Item::Polyline { points, .. } => Rect::enclosing(points).unwrap_or_default().inflate(pen),
            Item::Text { text, at, style } => {
                let font = style.font.as_ref().unwrap_or(metrics.default_font());
                let m = metrics.font_metrics(font);
                Rect::new(at.x, at.y - m.ascent, metrics.string_width(font, text), m.ascent + m.descent)
            }
        }
    }

    pub fn paint(&self, surface: &mut dyn DrawingSurface, default_font: &FontSpec) -> Result<(), RenderError> {
        let style = self.style();
        surface.set_color(style.color());
        surface.set_stroke(style.stroke());
        match self {
            Item::Line { from, to, .. } => surface.draw_line(*from, *to),
            Item::Arrow { from, to, head, .. } => {
                surface.draw_line(*from, *to)?;
                match arrow_head(*from, *to, *head) {
                    Some(points) => surface.fill(&Shape::polygon(points)),
                    None => Ok(()),
                }
            }
            Item::Rect { bounds, .. } => fill_and_stroke(surface, Shape::Rect(*bounds), style),
            Item::Ellipse { bounds, .. } => fill_and_stroke(surface, Shape::Ellipse(*bounds), style),
            Item::Polyline { points, closed, .. } => fill_and_stroke(
                surface,
                Shape::Polyline { points: points.clone(), closed: *closed },
                style,
            ),
            Item::Text { text, at, .. } => {
                surface.set_font(style.font.clone().unwrap_or_else(|| default_font.clone()));
                surface.draw_text(text, *at)
            }
        }
    }
}

/// A diagram: optional explicit canvas size plus items in paint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Space added right of and below the content when the size is derived.
    #[serde(default = "default_padding")]
    pub padding: f32,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            padding: default_padding(),
            items: Vec::new(),
        }
    }
}

impl Scene {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    /// Canvas size: explicit width/height where given, otherwise the extent
    /// of the content measured from the origin plus padding.
    pub fn measure(&self, metrics: &MetricsHandle) -> Dimension {
        let extent = self
            .items
            .iter()
            .map(|item| item.bounds(metrics))
            .fold(Rect::default(), |acc, r| acc.union(&r));
        let derive = |edge: f32| (edge + self.padding).ceil().max(1.0) as u32;
        Dimension::new(
            self.width.unwrap_or_else(|| derive(extent.right())),
            self.height.unwrap_or_else(|| derive(extent.bottom())),
        )
    }

    /// Paints every item in order; usable directly as an export paint callback.
    pub fn paint(&self, surface: &mut dyn DrawingSurface) -> Result<(), RenderError> {
        let default_font = surface.state().font.clone();
        for item in &self.items {
            item.paint(surface, &default_font)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatRegistry;
    use crate::probe::DimensionProbe;
    use sdexport_render_core::FontCatalog;
    use std::sync::Arc;

    fn metrics(tag: &str) -> MetricsHandle {
        let registry = FormatRegistry::new();
        let fonts = Arc::new(FontCatalog::new());
        DimensionProbe::new(&registry, &fonts, &FontSpec::default()).measure(tag).unwrap()
    }

    #[test]
    fn parses_items_with_flattened_style() {
        let scene = Scene::from_json(
            r##"{
                "items": [
                    { "type": "rect", "x": 10, "y": 10, "width": 80, "height": 30, "fill": "#eeeeff" },
                    { "type": "arrow", "from": { "x": 0, "y": 0 }, "to": { "x": 0, "y": 50 },
                      "stroke": { "width": 2, "dash": [4] }, "color": "red" },
                    { "type": "text", "text": "Client", "at": { "x": 20, "y": 30 },
                      "font": { "family": "Serif", "size": 14 } }
                ]
            }"##,
        )
        .unwrap();
        assert_eq!(scene.padding, 10.0);
        assert_eq!(scene.items.len(), 3);
        match &scene.items[0] {
            Item::Rect { bounds, style } => {
                assert_eq!(*bounds, Rect::new(10.0, 10.0, 80.0, 30.0));
                assert_eq!(style.fill, Some(Color::rgb(0xee, 0xee, 0xff)));
            }
            other => panic!("unexpected item {:?}", other),
        }
        match &scene.items[1] {
            Item::Arrow { head, style, .. } => {
                assert_eq!(*head, 8.0);
                assert_eq!(style.stroke, Some(Stroke::dashed(2.0, vec![4.0])));
                assert_eq!(style.color, Some(Color::rgb(255, 0, 0)));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn explicit_size_wins() {
        let scene = Scene { width: Some(300), height: Some(150), ..Default::default() }.with_item(Item::Line {
            from: Point::new(0.0, 0.0),
            to: Point::new(1000.0, 1000.0),
            style: Style::default(),
        });
        assert_eq!(scene.measure(&metrics("svg")), Dimension::new(300, 150));
    }

    #[test]
    fn size_is_derived_from_content() {
        let scene = Scene::default().with_item(Item::Rect {
            bounds: Rect::new(10.0, 20.0, 100.0, 50.0),
            style: Style::default(),
        });
        // right edge 110 + half pen + padding
        assert_eq!(scene.measure(&metrics("svg")), Dimension::new(121, 81));
    }

    #[test]
    fn text_extent_uses_probe_metrics() {
        let scene = Scene { padding: 0.0, ..Default::default() }.with_item(Item::Text {
            text: "Hi".into(),
            at: Point::new(0.0, 20.0),
            style: Style { font: Some(FontSpec::new("SansSerif", 10.0)), ..Default::default() },
        });
        let metrics = metrics("svg");
        let font = FontSpec::new("SansSerif", 10.0);
        let expected = metrics.string_width(&font, "Hi").ceil() as u32;
        assert_eq!(scene.measure(&metrics).width, expected.max(1));
    }

    #[test]
    fn degenerate_arrow_has_no_head() {
        assert!(arrow_head(Point::new(1.0, 1.0), Point::new(1.0, 1.0), 8.0).is_none());
        let head = arrow_head(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 4.0).unwrap();
        assert_eq!(head, vec![Point::new(10.0, 0.0), Point::new(6.0, 2.0), Point::new(6.0, -2.0)]);
    }
}
