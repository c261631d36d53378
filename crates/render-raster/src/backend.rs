use crate::glyphs::text_path;
use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, Frame, ImageEncoder, RgbaImage};
use sdexport_render_core::{
    Backend, BackendKind, BackendOptions, DrawingSurface, GraphicsState, PixelSnapshot, RenderError,
    Shape, TextMeasurer,
};
use sdexport_types::{Color, Dimension, Point};
use std::fmt;
use std::io::Write;
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, StrokeDash, Transform};

/// Encoded image format produced by a `RasterBackend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Gif,
    Bmp,
    Jpeg,
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RasterFormat::Png => "PNG",
            RasterFormat::Gif => "GIF",
            RasterFormat::Bmp => "BMP",
            RasterFormat::Jpeg => "JPEG",
        })
    }
}

/// A single-frame image backend. The pixmap starts fully transparent; the
/// export pipeline is responsible for painting the white background.
pub struct RasterBackend<'a> {
    sink: &'a mut dyn Write,
    format: RasterFormat,
    jpeg_quality: u8,
    pixmap: Pixmap,
    measurer: TextMeasurer,
    state: GraphicsState,
}

pub fn create_png<'a>(options: &BackendOptions, sink: &'a mut dyn Write) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(RasterBackend::new(RasterFormat::Png, options, sink)?))
}

pub fn create_gif<'a>(options: &BackendOptions, sink: &'a mut dyn Write) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(RasterBackend::new(RasterFormat::Gif, options, sink)?))
}

pub fn create_bmp<'a>(options: &BackendOptions, sink: &'a mut dyn Write) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(RasterBackend::new(RasterFormat::Bmp, options, sink)?))
}

pub fn create_jpeg<'a>(options: &BackendOptions, sink: &'a mut dyn Write) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(RasterBackend::new(RasterFormat::Jpeg, options, sink)?))
}

impl<'a> RasterBackend<'a> {
    pub fn new(format: RasterFormat, options: &BackendOptions, sink: &'a mut dyn Write) -> Result<Self, RenderError> {
        let Dimension { width, height } = options.dimension;
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::InvalidCanvas { width, height })?;
        Ok(Self {
            sink,
            format,
            jpeg_quality: options.jpeg_quality.clamp(1, 100),
            pixmap,
            measurer: options.measurer(BackendKind::Raster),
            state: GraphicsState::with_font(options.default_font.clone()),
        })
    }

    pub fn format(&self) -> RasterFormat {
        self.format
    }

    fn paint(&self) -> Paint<'static> {
        let Color { r, g, b, a } = self.state.color;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        paint
    }

    /// Straight RGBA bytes of the current frame.
    fn rgba(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    fn encode(&mut self) -> Result<(), RenderError> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let rgba = self.rgba();
        match self.format {
            RasterFormat::Png => {
                PngEncoder::new(&mut *self.sink).write_image(&rgba, width, height, ExtendedColorType::Rgba8)?;
            }
            RasterFormat::Bmp => {
                let mut sink = &mut *self.sink;
                BmpEncoder::new(&mut sink).write_image(&rgba, width, height, ExtendedColorType::Rgba8)?;
            }
            RasterFormat::Jpeg => {
                let rgb: Vec<u8> = rgba.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect();
                JpegEncoder::new_with_quality(&mut *self.sink, self.jpeg_quality).write_image(
                    &rgb,
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )?;
            }
            RasterFormat::Gif => {
                let frame = RgbaImage::from_raw(width, height, rgba)
                    .ok_or(RenderError::InvalidCanvas { width, height })?;
                // the encoder writes the trailer on drop, so encode to memory first
                let mut encoded = Vec::new();
                {
                    let mut encoder = GifEncoder::new(&mut encoded);
                    encoder.encode_frame(Frame::new(frame))?;
                }
                self.sink.write_all(&encoded)?;
            }
        }
        Ok(())
    }
}

fn shape_path(shape: &Shape) -> Option<Path> {
    match shape {
        Shape::Line { from, to } => {
            let mut pb = PathBuilder::new();
            pb.move_to(from.x, from.y);
            pb.line_to(to.x, to.y);
            pb.finish()
        }
        Shape::Rect(r) => {
            tiny_skia::Rect::from_xywh(r.x, r.y, r.width, r.height).map(PathBuilder::from_rect)
        }
        Shape::Ellipse(r) => {
            tiny_skia::Rect::from_xywh(r.x, r.y, r.width, r.height).and_then(PathBuilder::from_oval)
        }
        Shape::Polyline { points, closed } => {
            let (first, rest) = points.split_first()?;
            let mut pb = PathBuilder::new();
            pb.move_to(first.x, first.y);
            for p in rest {
                pb.line_to(p.x, p.y);
            }
            if *closed {
                pb.close();
            }
            pb.finish()
        }
    }
}

impl DrawingSurface for RasterBackend<'_> {
    fn dimension(&self) -> Dimension {
        Dimension::new(self.pixmap.width(), self.pixmap.height())
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
        let Some(path) = shape_path(shape) else {
            return Ok(());
        };
        let stroke = tiny_skia::Stroke {
            width: self.state.stroke.width,
            dash: self
                .state
                .stroke
                .effective_dash()
                .and_then(|dash| StrokeDash::new(dash, 0.0)),
            ..Default::default()
        };
        let paint = self.paint();
        self.pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        Ok(())
    }

    fn fill(&mut self, shape: &Shape) -> Result<(), RenderError> {
        if !shape.has_area() {
            return Ok(());
        }
        let Some(path) = shape_path(shape) else {
            return Ok(());
        };
        let paint = self.paint();
        self.pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        Ok(())
    }

    fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        let font = &self.state.font;
        let face = self
            .measurer
            .catalog()
            .face(font)
            .ok_or_else(|| RenderError::MissingFont(font.family.clone()))?;
        if let Some(path) = text_path(&face, font.size, text, origin.x, origin.y) {
            let paint = self.paint();
            self.pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
        Ok(())
    }

    fn snapshot(&self) -> Option<PixelSnapshot> {
        Some(PixelSnapshot {
            width: self.pixmap.width(),
            height: self.pixmap.height(),
            rgba: self.rgba(),
        })
    }
}

impl Backend for RasterBackend<'_> {
    fn kind(&self) -> BackendKind {
        BackendKind::Raster
    }

    fn start_export(&mut self) -> Result<(), RenderError> {
        log::debug!(
            "Starting {} export on a {}x{} canvas",
            self.format,
            self.pixmap.width(),
            self.pixmap.height()
        );
        Ok(())
    }

    fn surface(&mut self) -> &mut dyn DrawingSurface {
        self
    }

    fn end_export(mut self: Box<Self>) -> Result<(), RenderError> {
        self.encode()?;
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdexport_render_core::{BackendCtor, FontCatalog};
    use sdexport_types::{Rect, Stroke};
    use std::sync::Arc;

    fn options(width: u32, height: u32) -> BackendOptions {
        BackendOptions::new(Dimension::new(width, height), Arc::new(FontCatalog::new()))
    }

    fn render(create: BackendCtor, paint: impl FnOnce(&mut dyn DrawingSurface)) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut backend = create(&options(40, 20), &mut out).unwrap();
            backend.start_export().unwrap();
            let surface = backend.surface();
            surface.set_color(Color::WHITE);
            surface.fill_rect(Rect::new(0.0, 0.0, 40.0, 20.0)).unwrap();
            paint(surface);
            backend.end_export().unwrap();
        }
        out
    }

    #[test]
    fn canvas_starts_transparent() {
        let mut out = Vec::new();
        let backend = RasterBackend::new(RasterFormat::Png, &options(3, 2), &mut out).unwrap();
        let snapshot = backend.snapshot().unwrap();
        assert_eq!((snapshot.width, snapshot.height), (3, 2));
        assert!(snapshot.is_uniform(Color::rgba(0, 0, 0, 0)));
    }

    #[test]
    fn empty_canvas_is_rejected() {
        let mut out = Vec::new();
        let err = RasterBackend::new(RasterFormat::Png, &options(0, 10), &mut out).err().unwrap();
        assert!(matches!(err, RenderError::InvalidCanvas { width: 0, height: 10 }));
    }

    #[test]
    fn fill_covers_pixels() {
        let mut out = Vec::new();
        let mut backend = RasterBackend::new(RasterFormat::Png, &options(10, 10), &mut out).unwrap();
        backend.set_color(Color::rgb(255, 0, 0));
        backend.fill(&Shape::Rect(Rect::new(0.0, 0.0, 5.0, 10.0))).unwrap();
        let snapshot = backend.snapshot().unwrap();
        assert_eq!(snapshot.pixel(2, 5), Some(Color::rgb(255, 0, 0)));
        assert_eq!(snapshot.pixel(8, 5), Some(Color::rgba(0, 0, 0, 0)));
    }

    #[test]
    fn dashed_stroke_leaves_gaps() {
        let mut out = Vec::new();
        let mut backend = RasterBackend::new(RasterFormat::Png, &options(40, 4), &mut out).unwrap();
        backend.set_color(Color::BLACK);
        backend.set_stroke(Stroke::dashed(2.0, vec![10.0, 10.0]));
        backend.draw_line(Point::new(0.0, 2.0), Point::new(40.0, 2.0)).unwrap();
        let snapshot = backend.snapshot().unwrap();
        assert_eq!(snapshot.pixel(5, 2).map(|c| c.a), Some(255));
        assert_eq!(snapshot.pixel(15, 2).map(|c| c.a), Some(0));
    }

    #[test]
    fn png_round_trips_through_image() {
        let bytes = render(create_png, |s| {
            s.set_color(Color::BLACK);
            s.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        });
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (40, 20));
        assert_eq!(decoded.get_pixel(5, 5).0, [0, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(30, 15).0, [255, 255, 255, 255]);
    }

    /// Accepts `remaining` bytes, then fails every write.
    struct ShortWriter {
        remaining: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Err(std::io::Error::other("device full"));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn truncated_gif_reports_the_sink_error() {
        let full = render(create_gif, |_| {}).len();
        let mut sink = ShortWriter { remaining: full - 1 };
        let mut backend = create_gif(&options(40, 20), &mut sink).unwrap();
        backend.start_export().unwrap();
        backend.surface().set_color(Color::WHITE);
        backend.surface().fill_rect(Rect::new(0.0, 0.0, 40.0, 20.0)).unwrap();
        let err = backend.end_export().unwrap_err();
        assert!(matches!(err, RenderError::Io(_)), "{:?}", err);
    }

    #[test]
    fn text_without_a_face_is_an_error() {
        let mut out = Vec::new();
        let mut backend = RasterBackend::new(RasterFormat::Png, &options(40, 20), &mut out).unwrap();
        backend.set_font(sdexport_types::FontSpec::new("Serif", 12.0));
        let err = backend.draw_text("Client", Point::new(2.0, 15.0)).unwrap_err();
        assert!(matches!(err, RenderError::MissingFont(ref family) if family == "Serif"));
        assert!(backend.draw_text("", Point::new(2.0, 15.0)).is_ok());
    }

    #[test]
    fn every_format_decodes() {
        for (create, format) in [
            (create_gif as BackendCtor, image::ImageFormat::Gif),
            (create_bmp, image::ImageFormat::Bmp),
            (create_jpeg, image::ImageFormat::Jpeg),
        ] {
            let bytes = render(create, |_| {});
            assert_eq!(image::guess_format(&bytes).unwrap(), format);
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (40, 20));
        }
    }
}
