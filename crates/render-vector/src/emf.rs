use sdexport_render_core::fonts::{LogicalFamily, logical_family};
use sdexport_render_core::{
    Backend, BackendKind, BackendOptions, DrawingSurface, GraphicsState, RenderError, Shape,
    TextMeasurer,
};
use sdexport_types::{Color, Dimension, Point, Rect};
use std::io::Write;

const EMR_HEADER: u32 = 1;
const EMR_POLYGON16: u32 = 86;
const EMR_POLYLINE16: u32 = 87;
const EMR_EOF: u32 = 14;
const EMR_SETBKMODE: u32 = 18;
const EMR_SETTEXTALIGN: u32 = 22;
const EMR_SETTEXTCOLOR: u32 = 24;
const EMR_MOVETOEX: u32 = 27;
const EMR_SELECTOBJECT: u32 = 37;
const EMR_CREATEPEN: u32 = 38;
const EMR_CREATEBRUSHINDIRECT: u32 = 39;
const EMR_DELETEOBJECT: u32 = 40;
const EMR_ELLIPSE: u32 = 42;
const EMR_RECTANGLE: u32 = 43;
const EMR_LINETO: u32 = 54;
const EMR_EXTCREATEFONTINDIRECTW: u32 = 82;
const EMR_EXTTEXTOUTW: u32 = 84;

/// " EMF" read as a little-endian u32.
pub const ENHMETA_SIGNATURE: u32 = 0x464D_4520;

const WHITE_BRUSH: u32 = 0x8000_0000;
const NULL_BRUSH: u32 = 0x8000_0005;
const BLACK_PEN: u32 = 0x8000_0007;
const NULL_PEN: u32 = 0x8000_0008;
const SYSTEM_FONT: u32 = 0x8000_000D;

const PS_SOLID: u32 = 0;
const PS_DASH: u32 = 1;
const BS_SOLID: u32 = 0;
const TRANSPARENT: u32 = 1;
const TA_BASELINE: u32 = 24;
const GM_COMPATIBLE: u32 = 1;

/// Object table slots; slot 0 is reserved by the format.
const PEN_SLOT: u32 = 1;
const BRUSH_SLOT: u32 = 2;
const FONT_SLOT: u32 = 3;

/// Reference resolution used to express the canvas in physical units.
const DEVICE_DPI: f32 = 96.0;
const HEADER_SIZE: u32 = 88;
const EOF_SIZE: u32 = 20;

fn colorref(color: Color) -> u32 {
    color.r as u32 | (color.g as u32) << 8 | (color.b as u32) << 16
}

fn coord(v: f32) -> i32 {
    v.round() as i32
}

fn coord16(v: f32) -> i16 {
    v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// A single EMF record body under construction.
struct Record {
    kind: u32,
    data: Vec<u8>,
}

impl Record {
    fn new(kind: u32) -> Self {
        Self { kind, data: Vec::new() }
    }

    fn u32(mut self, v: u32) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn i32(mut self, v: i32) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn i16(mut self, v: i16) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn f32(mut self, v: f32) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn bytes(mut self, v: &[u8]) -> Self {
        self.data.extend_from_slice(v);
        self
    }

    fn rectl(self, r: Rect) -> Self {
        self.i32(coord(r.x))
            .i32(coord(r.y))
            .i32(coord(r.right()))
            .i32(coord(r.bottom()))
    }

    fn pad(mut self) -> Self {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        self
    }

    fn size(&self) -> u32 {
        8 + self.data.len() as u32
    }
}

/// Enhanced Metafile backend.
///
/// Records are buffered because the header, which comes first, carries the
/// total size and record count.
pub struct EmfBackend<'a> {
    sink: &'a mut dyn Write,
    dimension: Dimension,
    measurer: TextMeasurer,
    state: GraphicsState,
    records: Vec<u8>,
    record_count: u32,
}

pub fn create_emf<'a>(
    options: &BackendOptions,
    sink: &'a mut dyn Write,
) -> Result<Box<dyn Backend + 'a>, RenderError> {
    Ok(Box::new(EmfBackend::new(options, sink)?))
}

impl<'a> EmfBackend<'a> {
    /// Fails with `InvalidCanvas` when a side does not fit the format's signed 32-bit coordinates.
    pub fn new(options: &BackendOptions, sink: &'a mut dyn Write) -> Result<Self, RenderError> {
        let Dimension { width, height } = options.dimension;
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(RenderError::InvalidCanvas { width, height });
        }
        Ok(Self {
            sink,
            dimension: options.dimension,
            measurer: options.measurer(BackendKind::Vector),
            state: GraphicsState::with_font(options.default_font.clone()),
            records: Vec::new(),
            record_count: 0,
        })
    }

    fn push(&mut self, record: Record) {
        let record = record.pad();
        self.records.extend_from_slice(&record.kind.to_le_bytes());
        self.records.extend_from_slice(&record.size().to_le_bytes());
        self.records.extend_from_slice(&record.data);
        self.record_count += 1;
    }

    fn select(&mut self, handle: u32) {
        self.push(Record::new(EMR_SELECTOBJECT).u32(handle));
    }

    fn delete(&mut self, handle: u32) {
        self.push(Record::new(EMR_DELETEOBJECT).u32(handle));
    }

    fn poly16(&mut self, kind: u32, points: &[Point]) {
        let bounds = Rect::enclosing(points).unwrap_or_default();
        let mut record = Record::new(kind).rectl(bounds).u32(points.len() as u32);
        for p in points {
            record = record.i16(coord16(p.x)).i16(coord16(p.y));
        }
        self.push(record);
    }

    /// Emits the geometry of `shape` with whatever pen and brush are selected.
    fn geometry(&mut self, shape: &Shape, filled: bool) {
        match shape {
            Shape::Line { from, to } => {
                self.push(Record::new(EMR_MOVETOEX).i32(coord(from.x)).i32(coord(from.y)));
                self.push(Record::new(EMR_LINETO).i32(coord(to.x)).i32(coord(to.y)));
            }
            Shape::Rect(r) => self.push(Record::new(EMR_RECTANGLE).rectl(*r)),
            Shape::Ellipse(r) => self.push(Record::new(EMR_ELLIPSE).rectl(*r)),
            Shape::Polyline { points, closed } => {
                if points.len() < 2 {
                    return;
                }
                let kind = if *closed || filled { EMR_POLYGON16 } else { EMR_POLYLINE16 };
                self.poly16(kind, points);
            }
        }
    }

    fn font_record(&self) -> Record {
        let font = &self.state.font;
        let face = match logical_family(&font.family) {
            LogicalFamily::SansSerif => "Arial",
            LogicalFamily::Serif => "Times New Roman",
            LogicalFamily::Monospace => "Courier New",
            LogicalFamily::Named => font.family.as_str(),
        };
        let mut name = [0u16; 32];
        for (slot, unit) in name.iter_mut().zip(face.encode_utf16().take(31)) {
            *slot = unit;
        }
        let mut record = Record::new(EMR_EXTCREATEFONTINDIRECTW)
            .u32(FONT_SLOT)
            // negative height selects by character height rather than cell height
            .i32(-coord(font.size))
            .i32(0)
            .i32(0)
            .i32(0)
            .i32(if font.bold { 700 } else { 400 })
            .bytes(&[font.italic as u8, 0, 0, 1, 0, 0, 0, 0]);
        for unit in name {
            record = record.bytes(&unit.to_le_bytes());
        }
        record
    }

    fn header(&self) -> Record {
        let Dimension { width, height } = self.dimension;
        let to_hundredth_mm = |px: u32| (px as f32 * 2540.0 / DEVICE_DPI).round() as i32;
        let to_mm = |px: u32| (px as f32 * 25.4 / DEVICE_DPI).round().max(1.0) as i32;
        let total = HEADER_SIZE + self.records.len() as u32 + EOF_SIZE;
        Record::new(EMR_HEADER)
            // bounds, inclusive
            .i32(0)
            .i32(0)
            .i32(width as i32 - 1)
            .i32(height as i32 - 1)
            // frame, in 0.01 mm
            .i32(0)
            .i32(0)
            .i32(to_hundredth_mm(width))
            .i32(to_hundredth_mm(height))
            .u32(ENHMETA_SIGNATURE)
            .u32(0x0001_0000)
            .u32(total)
            .u32(self.record_count + 2)
            .i16(4)
            .i16(0)
            .u32(0)
            .u32(0)
            .u32(0)
            .i32(width as i32)
            .i32(height as i32)
            .i32(to_mm(width))
            .i32(to_mm(height))
    }
}

impl DrawingSurface for EmfBackend<'_> {
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
        let stroke = &self.state.stroke;
        let style = if stroke.effective_dash().is_some() { PS_DASH } else { PS_SOLID };
        let pen = Record::new(EMR_CREATEPEN)
            .u32(PEN_SLOT)
            .u32(style)
            .i32(coord(stroke.width).max(1))
            .i32(0)
            .u32(colorref(self.state.color));
        self.push(pen);
        self.select(PEN_SLOT);
        self.select(NULL_BRUSH);
        self.geometry(shape, false);
        self.select(BLACK_PEN);
        self.delete(PEN_SLOT);
        Ok(())
    }

    fn fill(&mut self, shape: &Shape) -> Result<(), RenderError> {
        if !shape.has_area() {
            return Ok(());
        }
        let brush = Record::new(EMR_CREATEBRUSHINDIRECT)
            .u32(BRUSH_SLOT)
            .u32(BS_SOLID)
            .u32(colorref(self.state.color))
            .u32(0);
        self.push(brush);
        self.select(BRUSH_SLOT);
        self.select(NULL_PEN);
        self.geometry(shape, true);
        self.select(WHITE_BRUSH);
        self.delete(BRUSH_SLOT);
        Ok(())
    }

    fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        let font = self.state.font.clone();
        let units: Vec<u16> = text.encode_utf16().collect();
        let advances: Vec<i32> = text
            .chars()
            .flat_map(|c| {
                let advance = coord(self.measurer.string_width(&font, c.encode_utf8(&mut [0; 4])));
                // a surrogate pair takes its advance on the first unit
                std::iter::once(advance).chain(std::iter::repeat_n(0, c.len_utf16() - 1))
            })
            .collect();
        let width = advances.iter().sum::<i32>() as f32;
        let metrics = self.measurer.font_metrics(&font);
        let bounds = Rect::new(origin.x, origin.y - metrics.ascent, width, metrics.height());

        let record = self.font_record();
        self.push(record);
        self.select(FONT_SLOT);
        self.push(Record::new(EMR_SETTEXTCOLOR).u32(colorref(self.state.color)));
        self.push(Record::new(EMR_SETBKMODE).u32(TRANSPARENT));
        self.push(Record::new(EMR_SETTEXTALIGN).u32(TA_BASELINE));

        let string_offset = 76u32;
        let string_bytes = (units.len() as u32 * 2 + 3) & !3;
        let mut record = Record::new(EMR_EXTTEXTOUTW)
            .rectl(bounds)
            .u32(GM_COMPATIBLE)
            .f32(1.0)
            .f32(1.0)
            .i32(coord(origin.x))
            .i32(coord(origin.y))
            .u32(units.len() as u32)
            .u32(string_offset)
            .u32(0)
            .rectl(Rect::default())
            .u32(string_offset + string_bytes);
        for unit in &units {
            record = record.bytes(&unit.to_le_bytes());
        }
        record = record.pad();
        for advance in advances {
            record = record.i32(advance);
        }
        self.push(record);

        self.select(SYSTEM_FONT);
        self.delete(FONT_SLOT);
        Ok(())
    }
}

impl Backend for EmfBackend<'_> {
    fn kind(&self) -> BackendKind {
        BackendKind::Vector
    }

    fn start_export(&mut self) -> Result<(), RenderError> {
        log::debug!("Starting EMF export on a {}x{} canvas", self.dimension.width, self.dimension.height);
        Ok(())
    }

    fn surface(&mut self) -> &mut dyn DrawingSurface {
        self
    }

    fn end_export(self: Box<Self>) -> Result<(), RenderError> {
        let this = *self;
        let header = this.header();
        this.sink.write_all(&header.kind.to_le_bytes())?;
        this.sink.write_all(&header.size().to_le_bytes())?;
        this.sink.write_all(&header.data)?;
        this.sink.write_all(&this.records)?;
        let eof = Record::new(EMR_EOF).u32(0).u32(16).u32(EOF_SIZE);
        this.sink.write_all(&eof.kind.to_le_bytes())?;
        this.sink.write_all(&eof.size().to_le_bytes())?;
        this.sink.write_all(&eof.data)?;
        this.sink.flush()?;
        log::debug!("EMF written: {} records", this.record_count + 2);
        Ok(())
    }
}
