use itertools::Itertools;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use sdexport_render_core::fonts::{LogicalFamily, logical_family};
use sdexport_render_core::utils::fmt_num;
use sdexport_render_core::{
    Backend, BackendKind, BackendOptions, DrawingSurface, GraphicsState, RenderError, Shape,
    TextMeasurer,
};
use sdexport_types::{Color, Dimension, Point};
use std::io::{BufWriter, Write};

/// Single-page SVG backend. Elements are streamed to the sink as they are
/// drawn; the canvas maps one-to-one onto user units.
pub struct SvgBackend<'a> {
    writer: Writer<BufWriter<&'a mut dyn Write>>,
    dimension: Dimension,
    measurer: TextMeasurer,
    state: GraphicsState,
}

pub fn create_svg<'a>(
    options: &BackendOptions,
    sink: &'a mut dyn Write,
) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(SvgBackend::new(options, sink)))
}

fn svg_family(family: &str) -> &str {
    match logical_family(family) {
        LogicalFamily::SansSerif => "sans-serif",
        LogicalFamily::Serif => "serif",
        LogicalFamily::Monospace => "monospace",
        LogicalFamily::Named => family,
    }
}

fn opacity(color: Color) -> Option<String> {
    (!color.is_opaque()).then(|| fmt_num(color.a as f32 / 255.0))
}

impl<'a> SvgBackend<'a> {
    pub fn new(options: &BackendOptions, sink: &'a mut dyn Write) -> Self {
        Self {
            writer: Writer::new(BufWriter::new(sink)),
            dimension: options.dimension,
            measurer: options.measurer(BackendKind::Vector),
            state: GraphicsState::with_font(options.default_font.clone()),
        }
    }

    fn element(shape: &Shape) -> Option<BytesStart<'static>> {
        let mut el = match shape {
            Shape::Line { from, to } => {
                let mut el = BytesStart::new("line");
                el.push_attribute(("x1", fmt_num(from.x).as_str()));
                el.push_attribute(("y1", fmt_num(from.y).as_str()));
                el.push_attribute(("x2", fmt_num(to.x).as_str()));
                el.push_attribute(("y2", fmt_num(to.y).as_str()));
                el
            }
            Shape::Rect(r) => {
                let mut el = BytesStart::new("rect");
                el.push_attribute(("x", fmt_num(r.x).as_str()));
                el.push_attribute(("y", fmt_num(r.y).as_str()));
                el.push_attribute(("width", fmt_num(r.width).as_str()));
                el.push_attribute(("height", fmt_num(r.height).as_str()));
                el
            }
            Shape::Ellipse(r) => {
                let c = r.center();
                let mut el = BytesStart::new("ellipse");
                el.push_attribute(("cx", fmt_num(c.x).as_str()));
                el.push_attribute(("cy", fmt_num(c.y).as_str()));
                el.push_attribute(("rx", fmt_num(r.width / 2.0).as_str()));
                el.push_attribute(("ry", fmt_num(r.height / 2.0).as_str()));
                el
            }
            Shape::Polyline { points, closed } => {
                if points.len() < 2 {
                    return None;
                }
                let mut el = BytesStart::new(if *closed { "polygon" } else { "polyline" });
                let points = points
                    .iter()
                    .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(p.y)))
                    .join(" ");
                el.push_attribute(("points", points.as_str()));
                el
            }
        };
        Some(el)
    }

    fn write(&mut self, el: BytesStart<'_>) -> Result<(), RenderError> {
        self.writer.write_event(Event::Empty(el))?;
        Ok(())
    }
}

impl DrawingSurface for SvgBackend<'_> {
    fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn state(&self) -> &GraphicsState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut GraphicsState {
        &mut self.state
    }

    fn measurer(&self) -> &TextMeasurer {
        &self.measurer
    }

    fn stroke(&mut self, shape: &Shape) -> Result<(), RenderError> {
        let Some(mut el) = Self::element(shape) else {
            return Ok(());
        };
        let color = self.state.color;
        el.push_attribute(("fill", "none"));
        el.push_attribute(("stroke", color.to_hex().as_str()));
        if let Some(alpha) = opacity(color) {
            el.push_attribute(("stroke-opacity", alpha.as_str()));
        }
        el.push_attribute(("stroke-width", fmt_num(self.state.stroke.width).as_str()));
        if let Some(dash) = self.state.stroke.effective_dash() {
            let dash = dash.into_iter().map(fmt_num).join(" ");
            el.push_attribute(("stroke-dasharray", dash.as_str()));
        }
        self.write(el)
    }

    fn fill(&mut self, shape: &Shape) -> Result<(), RenderError> {
        if !shape.has_area() {
            return Ok(());
        }
        let Some(mut el) = Self::element(shape) else {
            return Ok(());
        };
        let color = self.state.color;
        el.push_attribute(("fill", color.to_hex().as_str()));
        if let Some(alpha) = opacity(color) {
            el.push_attribute(("fill-opacity", alpha.as_str()));
        }
        self.write(el)
    }

    fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        let font = &self.state.font;
        let color = self.state.color;
        let mut el = BytesStart::new("text");
        el.push_attribute(("x", fmt_num(origin.x).as_str()));
        el.push_attribute(("y", fmt_num(origin.y).as_str()));
        el.push_attribute(("font-family", svg_family(&font.family)));
        el.push_attribute(("font-size", fmt_num(font.size).as_str()));
        if font.bold {
            el.push_attribute(("font-weight", "bold"));
        }
        if font.italic {
            el.push_attribute(("font-style", "italic"));
        }
        el.push_attribute(("fill", color.to_hex().as_str()));
        if let Some(alpha) = opacity(color) {
            el.push_attribute(("fill-opacity", alpha.as_str()));
        }
        el.push_attribute(("xml:space", "preserve"));
        self.writer.write_event(Event::Start(el))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new("text")))?;
        Ok(())
    }
}

impl Backend for SvgBackend<'_> {
    fn kind(&self) -> BackendKind {
        BackendKind::Vector
    }

    fn start_export(&mut self) -> Result<(), RenderError> {
        let (width, height) = (self.dimension.width.to_string(), self.dimension.height.to_string());
        let view_box = format!("0 0 {} {}", width, height);
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut root = BytesStart::new("svg");
        root.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
        root.push_attribute(("version", "1.1"));
        root.push_attribute(("width", width.as_str()));
        root.push_attribute(("height", height.as_str()));
        root.push_attribute(("viewBox", view_box.as_str()));
        self.writer.write_event(Event::Start(root))?;
        Ok(())
    }

    fn surface(&mut self) -> &mut dyn DrawingSurface {
        self
    }

    fn end_export(self: Box<Self>) -> Result<(), RenderError> {
        let mut this = *self;
        this.writer.write_event(Event::End(BytesEnd::new("svg")))?;
        let mut out = this.writer.into_inner();
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
