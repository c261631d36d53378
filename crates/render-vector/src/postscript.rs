use chrono::Utc;
use itertools::Itertools;
use sdexport_render_core::utils::{ellipse_curves, fmt_num, standard_font_name, to_latin1};
use sdexport_render_core::{
    Backend, BackendKind, BackendOptions, DrawingSurface, GraphicsState, MetricSource, PageLayout, PagedBackend,
    RenderError, Shape, TextMeasurer,
};
use sdexport_types::{Color, Dimension, Point};
use std::io::{BufWriter, Write};

/// Flavor of PostScript document a `PostScriptBackend` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScriptMode {
    /// Encapsulated PostScript: a single implicit page, no page protocol.
    Eps,
    /// Multi-page PostScript; drawing requires an open page.
    Paginated,
}

/// DSC-conformant PostScript writer shared by the `eps` and `ps` formats.
pub struct PostScriptBackend<'a> {
    out: BufWriter<&'a mut dyn Write>,
    mode: PostScriptMode,
    options: BackendOptions,
    layout: PageLayout,
    measurer: TextMeasurer,
    state: GraphicsState,
    page_open: bool,
    pages: usize,
}

pub fn create_eps<'a>(
    options: &BackendOptions,
    sink: &'a mut dyn Write,
) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(PostScriptBackend::new(PostScriptMode::Eps, options, sink)))
}

pub fn create_ps<'a>(
    options: &BackendOptions,
    sink: &'a mut dyn Write,
) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(PostScriptBackend::new(PostScriptMode::Paginated, options, sink)))
}

/// PostScript string literal body for `text`, Latin-1 with octal escapes.
fn ps_string(text: &str) -> String {
    let mut s = String::with_capacity(text.len() + 2);
    for byte in to_latin1(text) {
        match byte {
            b'(' | b')' | b'\\' => {
                s.push('\\');
                s.push(byte as char);
            }
            0x20..=0x7e => s.push(byte as char),
            _ => s.push_str(&format!("\\{:03o}", byte)),
        }
    }
    s
}

fn rgb(color: Color) -> String {
    let (r, g, b) = color.unit_rgb();
    format!("{} {} {} setrgbcolor", fmt_num(r), fmt_num(g), fmt_num(b))
}

fn matrix(layout: &PageLayout) -> String {
    format!("[{}] concat", layout.flip_matrix().iter().map(|v| fmt_num(*v)).join(" "))
}

/// Path construction operators for `shape`, or `None` if it has nothing to draw.
fn path(shape: &Shape) -> Option<String> {
    let p = |pt: Point| format!("{} {}", fmt_num(pt.x), fmt_num(pt.y));
    let ops = match shape {
        Shape::Line { from, to } => format!("newpath {} moveto {} lineto", p(*from), p(*to)),
        Shape::Rect(r) => format!(
            "newpath {} {} {} {} rectpath",
            fmt_num(r.x),
            fmt_num(r.y),
            fmt_num(r.width),
            fmt_num(r.height)
        ),
        Shape::Ellipse(r) => {
            let (start, segments) = ellipse_curves(*r);
            let curves = segments
                .iter()
                .map(|(c1, c2, end)| format!("{} {} {} curveto", p(*c1), p(*c2), p(*end)))
                .join(" ");
            format!("newpath {} moveto {} closepath", p(start), curves)
        }
        Shape::Polyline { points, closed } => {
            let (first, rest) = points.split_first()?;
            if rest.is_empty() {
                return None;
            }
            let lines = rest.iter().map(|pt| format!("{} lineto", p(*pt))).join(" ");
            let close = if *closed { " closepath" } else { "" };
            format!("newpath {} moveto {}{}", p(*first), lines, close)
        }
    };
    Some(ops)
}

impl<'a> PostScriptBackend<'a> {
    pub fn new(mode: PostScriptMode, options: &BackendOptions, sink: &'a mut dyn Write) -> Self {
        let kind = match mode {
            PostScriptMode::Eps => BackendKind::Vector,
            PostScriptMode::Paginated => BackendKind::PaginatedVector,
        };
        Self {
            out: BufWriter::new(sink),
            mode,
            options: options.clone(),
            layout: options.page_layout(),
            measurer: options.measurer(kind).with_source(MetricSource::StandardType1),
            state: GraphicsState::with_font(options.default_font.clone()),
            page_open: false,
            pages: 0,
        }
    }

    pub fn mode(&self) -> PostScriptMode {
        self.mode
    }

    fn ensure_drawable(&self) -> Result<(), RenderError> {
        if self.mode == PostScriptMode::Paginated && !self.page_open {
            return Err(RenderError::PageProtocol("drawing outside of an open page".into()));
        }
        Ok(())
    }

    fn write_header(&mut self) -> Result<(), RenderError> {
        let (w, h) = (self.layout.page_width, self.layout.page_height);
        let out = &mut self.out;
        match self.mode {
            PostScriptMode::Eps => writeln!(out, "%!PS-Adobe-3.0 EPSF-3.0")?,
            PostScriptMode::Paginated => writeln!(out, "%!PS-Adobe-3.0")?,
        }
        writeln!(out, "%%BoundingBox: 0 0 {} {}", w.ceil() as i64, h.ceil() as i64)?;
        writeln!(out, "%%HiResBoundingBox: 0 0 {} {}", fmt_num(w), fmt_num(h))?;
        writeln!(out, "%%Creator: {}", self.options.creator)?;
        writeln!(out, "%%CreationDate: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out, "%%Orientation: {}", self.options.orientation)?;
        if let Some(size) = self.options.page_size {
            writeln!(out, "%%DocumentMedia: {} {} {} 0 () ()", size.name(), fmt_num(w), fmt_num(h))?;
        }
        if self.mode == PostScriptMode::Paginated {
            writeln!(out, "%%Pages: (atend)")?;
        }
        writeln!(out, "%%LanguageLevel: 2")?;
        writeln!(out, "%%EndComments")?;
        writeln!(out, "%%BeginProlog")?;
        writeln!(
            out,
            "/rectpath {{ 4 dict begin /h exch def /w exch def /y exch def /x exch def \
             x y moveto w 0 rlineto 0 h rlineto w neg 0 rlineto closepath end }} bind def"
        )?;
        writeln!(out, "%%EndProlog")?;
        Ok(())
    }

    fn command(&mut self, body: &str) -> Result<(), RenderError> {
        writeln!(self.out, "gsave {} grestore", body)?;
        Ok(())
    }
}

impl DrawingSurface for PostScriptBackend<'_> {
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
        self.ensure_drawable()?;
        let Some(path) = path(shape) else {
            return Ok(());
        };
        let dash = match self.state.stroke.effective_dash() {
            Some(dash) => format!("[{}] 0 setdash ", dash.into_iter().map(fmt_num).join(" ")),
            None => String::new(),
        };
        let body = format!(
            "{} {} setlinewidth {}{} stroke",
            rgb(self.state.color),
            fmt_num(self.state.stroke.width),
            dash,
            path
        );
        self.command(&body)
    }

    fn fill(&mut self, shape: &Shape) -> Result<(), RenderError> {
        self.ensure_drawable()?;
        if !shape.has_area() {
            return Ok(());
        }
        let Some(path) = path(shape) else {
            return Ok(());
        };
        let body = format!("{} {} fill", rgb(self.state.color), path);
        self.command(&body)
    }

    fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), RenderError> {
        self.ensure_drawable()?;
        if text.is_empty() {
            return Ok(());
        }
        let font = &self.state.font;
        // the page matrix is flipped, so glyphs are flipped back after moveto
        let body = format!(
            "{} /{} findfont {} scalefont setfont {} {} moveto 1 -1 scale ({}) show",
            rgb(self.state.color),
            standard_font_name(font),
            fmt_num(font.size),
            fmt_num(origin.x),
            fmt_num(origin.y),
            ps_string(text)
        );
        self.command(&body)
    }
}

impl PagedBackend for PostScriptBackend<'_> {
    fn open_page(&mut self, dimension: Dimension, label: &str) -> Result<(), RenderError> {
        if self.mode == PostScriptMode::Eps {
            return Err(RenderError::PageProtocol("EPS documents have no pages".into()));
        }
        if self.page_open {
            return Err(RenderError::PageProtocol("a page is already open".into()));
        }
        self.pages += 1;
        let ordinal = self.pages;
        let label = if label.trim().is_empty() { ordinal.to_string() } else { format!("({})", ps_string(label)) };
        let layout = PageLayout::compute(
            dimension,
            self.options.orientation,
            self.options.page_size,
            self.options.page_margins,
            self.options.fit_to_page,
        );
        writeln!(self.out, "%%Page: {} {}", label, ordinal)?;
        writeln!(self.out, "%%BeginPageSetup")?;
        writeln!(self.out, "gsave {}", matrix(&layout))?;
        writeln!(self.out, "%%EndPageSetup")?;
        self.page_open = true;
        log::debug!("Opened PostScript page {}", ordinal);
        Ok(())
    }

    fn close_page(&mut self) -> Result<(), RenderError> {
        if !self.page_open {
            return Err(RenderError::PageProtocol("no page is open".into()));
        }
        self.page_open = false;
        writeln!(self.out, "grestore")?;
        writeln!(self.out, "showpage")?;
        writeln!(self.out, "%%PageTrailer")?;
        Ok(())
    }

    fn is_page_open(&self) -> bool {
        self.page_open
    }

    fn pages_written(&self) -> usize {
        self.pages
    }
}

impl Backend for PostScriptBackend<'_> {
    fn kind(&self) -> BackendKind {
        match self.mode {
            PostScriptMode::Eps => BackendKind::Vector,
            PostScriptMode::Paginated => BackendKind::PaginatedVector,
        }
    }

    fn start_export(&mut self) -> Result<(), RenderError> {
        self.write_header()?;
        if self.mode == PostScriptMode::Eps {
            let setup = matrix(&self.layout);
            writeln!(self.out, "gsave {}", setup)?;
        }
        Ok(())
    }

    fn surface(&mut self) -> &mut dyn DrawingSurface {
        self
    }

    fn paged(&mut self) -> Option<&mut dyn PagedBackend> {
        match self.mode {
            PostScriptMode::Eps => None,
            PostScriptMode::Paginated => Some(self as &mut dyn PagedBackend),
        }
    }

    fn end_export(self: Box<Self>) -> Result<(), RenderError> {
        let mut this = *self;
        if this.page_open {
            log::warn!("PostScript page {} was still open at end of export; closing it", this.pages);
            this.close_page()?;
        }
        if this.mode == PostScriptMode::Eps {
            writeln!(this.out, "grestore")?;
        }
        writeln!(this.out, "%%Trailer")?;
        if this.mode == PostScriptMode::Paginated {
            writeln!(this.out, "%%Pages: {}", this.pages)?;
        }
        writeln!(this.out, "%%EOF")?;
        this.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdexport_render_core::FontCatalog;
    use sdexport_types::{Orientation, PageSize, Rect};
    use std::sync::Arc;

    fn options() -> BackendOptions {
        BackendOptions::new(Dimension::new(200, 100), Arc::new(FontCatalog::new()))
    }

    #[test]
    fn string_escapes() {
        assert_eq!(ps_string("a(b)\\"), "a\\(b\\)\\\\");
        assert_eq!(ps_string("é"), "\\351");
    }

    #[test]
    fn text_is_measured_with_the_named_type1_font() {
        let mut out = Vec::new();
        let mut backend = create_ps(&options(), &mut out).unwrap();
        assert_eq!(backend.surface().measurer().source(), MetricSource::StandardType1);
    }

    #[test]
    fn eps_has_no_pages() {
        let mut out = Vec::new();
        {
            let mut backend = create_eps(&options(), &mut out).unwrap();
            assert_eq!(backend.kind(), BackendKind::Vector);
            assert!(backend.paged().is_none());
            backend.start_export().unwrap();
            backend.surface().fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
            backend.end_export().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 0 0 200 100\n"));
        assert!(!text.contains("%%Page:"));
        assert!(!text.contains("showpage"));
        assert!(text.contains("%%Orientation: Landscape"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn paginated_requires_open_page() {
        let mut out = Vec::new();
        let mut backend = PostScriptBackend::new(PostScriptMode::Paginated, &options(), &mut out);
        backend.start_export().unwrap();
        let err = backend.draw_line(Point::new(0.0, 0.0), Point::new(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, RenderError::PageProtocol(_)));
        assert!(backend.close_page().is_err());
    }

    #[test]
    fn page_size_is_declared() {
        let mut opts = options();
        opts.page_size = Some(PageSize::A4);
        opts.orientation = Orientation::Portrait;
        let mut out = Vec::new();
        {
            let mut backend = create_ps(&opts, &mut out).unwrap();
            backend.start_export().unwrap();
            let paged = backend.paged().unwrap();
            paged.open_page(Dimension::new(200, 100), "").unwrap();
            paged.close_page().unwrap();
            assert_eq!(paged.pages_written(), 1);
            backend.end_export().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("%%BoundingBox: 0 0 596 842"));
        assert!(text.contains("%%DocumentMedia: A4 595.276 841.89 0 () ()"));
        assert!(text.contains("%%Page: 1 1\n"));
        assert!(text.contains("%%Trailer\n%%Pages: 1\n%%EOF"));
    }
}
