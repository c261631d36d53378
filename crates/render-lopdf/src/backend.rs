use chrono::Utc;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use sdexport_render_core::utils::{ellipse_curves, standard_font_name, to_latin1};
use sdexport_render_core::{
    Backend, BackendKind, BackendOptions, DrawingSurface, GraphicsState, MetricSource, PageLayout, RenderError,
    Shape, TextMeasurer,
};
use sdexport_types::{Color, Dimension, Point};
use std::io::Write;

/// Single-page PDF backend.
///
/// Content is drawn in canvas coordinates; a `cm` operator placed around the
/// whole content stream maps them onto the (possibly paper-sized) page.
pub struct PdfBackend<'a> {
    sink: &'a mut dyn Write,
    options: BackendOptions,
    layout: PageLayout,
    measurer: TextMeasurer,
    state: GraphicsState,
    operations: Vec<Operation>,
    /// Base font names in resource order; index `i` is `/F{i+1}`.
    fonts: Vec<&'static str>,
}

/// Constructor registered for the `pdf` format.
pub fn create<'a>(
    options: &BackendOptions,
    sink: &'a mut dyn Write,
) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(PdfBackend::new(options.clone(), sink)))
}

impl<'a> PdfBackend<'a> {
    pub fn new(options: BackendOptions, sink: &'a mut dyn Write) -> Self {
        let layout = options.page_layout();
        let measurer = options.measurer(BackendKind::Vector).with_source(MetricSource::StandardType1);
        let state = GraphicsState::with_font(options.default_font.clone());
        Self {
            sink,
            options,
            layout,
            measurer,
            state,
            operations: Vec::new(),
            fonts: Vec::new(),
        }
    }

    pub fn page_layout(&self) -> PageLayout {
        self.layout
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn font_resource(&mut self, base_font: &'static str) -> String {
        let index = match self.fonts.iter().position(|f| *f == base_font) {
            Some(i) => i,
            None => {
                self.fonts.push(base_font);
                self.fonts.len() - 1
            }
        };
        format!("F{}", index + 1)
    }

    fn color_operands(color: Color) -> Vec<Object> {
        let (r, g, b) = color.unit_rgb();
        vec![r.into(), g.into(), b.into()]
    }

    fn push_path(&mut self, shape: &Shape) -> bool {
        match shape {
            Shape::Line { from, to } => {
                self.op("m", vec![from.x.into(), from.y.into()]);
                self.op("l", vec![to.x.into(), to.y.into()]);
            }
            Shape::Rect(r) => {
                self.op("re", vec![r.x.into(), r.y.into(), r.width.into(), r.height.into()]);
            }
            Shape::Ellipse(r) => {
                let (start, segments) = ellipse_curves(*r);
                self.op("m", vec![start.x.into(), start.y.into()]);
                for (c1, c2, end) in segments {
                    self.op(
                        "c",
                        vec![
                            c1.x.into(),
                            c1.y.into(),
                            c2.x.into(),
                            c2.y.into(),
                            end.x.into(),
                            end.y.into(),
                        ],
                    );
                }
                self.op("h", vec![]);
            }
            Shape::Polyline { points, closed } => {
                let Some((first, rest)) = points.split_first() else {
                    return false;
                };
                if rest.is_empty() {
                    return false;
                }
                self.op("m", vec![first.x.into(), first.y.into()]);
                for p in rest {
                    self.op("l", vec![p.x.into(), p.y.into()]);
                }
                if *closed {
                    self.op("h", vec![]);
                }
            }
        }
        true
    }

    fn content_bytes(&mut self) -> Result<Vec<u8>, RenderError> {
        let [a, b, c, d, e, f] = self.layout.flip_matrix();
        let mut operations = Vec::with_capacity(self.operations.len() + 3);
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            vec![a.into(), b.into(), c.into(), d.into(), e.into(), f.into()],
        ));
        operations.append(&mut self.operations);
        operations.push(Operation::new("Q", vec![]));
        let content = Content { operations };

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&content.encode()?)?;
        Ok(encoder.finish()?)
    }
}

impl DrawingSurface for PdfBackend<'_> {
    fn dimension(&self) -> Dimension {
        self.options.dimension
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
        let stroke = self.state.stroke.clone();
        self.op("q", vec![]);
        self.op("RG", Self::color_operands(self.state.color));
        self.op("w", vec![stroke.width.into()]);
        if let Some(dash) = stroke.effective_dash() {
            let pattern: Vec<Object> = dash.into_iter().map(Object::from).collect();
            self.op("d", vec![pattern.into(), 0.into()]);
        }
        if self.push_path(shape) {
            self.op("S", vec![]);
        }
        self.op("Q", vec![]);
        Ok(())
    }

    fn fill(&mut self, shape: &Shape) -> Result<(), RenderError> {
        if !shape.has_area() {
            return Ok(());
        }
        self.op("q", vec![]);
        self.op("rg", Self::color_operands(self.state.color));
        if self.push_path(shape) {
            self.op("f", vec![]);
        }
        self.op("Q", vec![]);
        Ok(())
    }

    fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        let font = self.state.font.clone();
        let resource = self.font_resource(standard_font_name(&font));
        self.op("BT", vec![]);
        self.op("rg", Self::color_operands(self.state.color));
        self.op("Tf", vec![Object::Name(resource.into_bytes()), font.size.into()]);
        // undo the page flip so glyphs stand upright
        self.op(
            "Tm",
            vec![1.into(), 0.into(), 0.into(), (-1).into(), origin.x.into(), origin.y.into()],
        );
        self.op("Tj", vec![Object::string_literal(to_latin1(text))]);
        self.op("ET", vec![]);
        Ok(())
    }
}

impl Backend for PdfBackend<'_> {
    fn kind(&self) -> BackendKind {
        BackendKind::Vector
    }

    fn start_export(&mut self) -> Result<(), RenderError> {
        log::debug!(
            "Starting PDF export: page {}x{}pt, scale {}",
            self.layout.page_width,
            self.layout.page_height,
            self.layout.scale
        );
        Ok(())
    }

    fn surface(&mut self) -> &mut dyn DrawingSurface {
        self
    }

    fn end_export(self: Box<Self>) -> Result<(), RenderError> {
        let mut this = *self;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font_dict = Dictionary::new();
        for (i, base_font) in this.fonts.iter().enumerate() {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => *base_font,
                "Encoding" => "WinAnsiEncoding",
            });
            font_dict.set(format!("F{}", i + 1), font_id);
        }
        let resources_id = doc.add_object(dictionary! { "Font" => font_dict });

        let content = this.content_bytes()?;
        let content_id = doc.add_object(Stream::new(dictionary! { "Filter" => "FlateDecode" }, content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), this.layout.page_width.into(), this.layout.page_height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(this.options.creator.as_str()),
            "CreationDate" => Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        doc.save_to(&mut this.sink)?;
        this.sink.flush()?;
        log::debug!("PDF document written with {} font resource(s)", this.fonts.len());
        Ok(())
    }
}
