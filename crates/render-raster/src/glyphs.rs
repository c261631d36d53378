use sdexport_render_core::FontFace;
use tiny_skia::{Path, PathBuilder};
use ttf_parser::OutlineBuilder;

/// Collects glyph outlines into a tiny-skia path, mapping font units
/// (y up) onto canvas pixels (y down).
struct GlyphSink {
    builder: PathBuilder,
    scale: f32,
    x: f32,
    y: f32,
}

impl GlyphSink {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Outline of `text` set in `face` at `size` pixels with its baseline at
/// `(x, y)`. `None` when the face cannot be parsed or nothing has ink.
pub(crate) fn text_path(face: &FontFace, size: f32, text: &str, x: f32, y: f32) -> Option<Path> {
    let parsed = face.parse()?;
    let mut sink = GlyphSink {
        builder: PathBuilder::new(),
        scale: size / parsed.units_per_em() as f32,
        x,
        y,
    };
    for c in text.chars() {
        let glyph = parsed.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
        parsed.outline_glyph(glyph, &mut sink);
        sink.x += parsed.glyph_hor_advance(glyph).unwrap_or(0) as f32 * sink.scale;
    }
    sink.builder.finish()
}
