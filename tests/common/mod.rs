#![allow(dead_code)]

use sdexport::{
    Dimension, DrawingSurface, ExportConfig, ExportError, ExportOutcome, ExportPipeline, ExportRequest, Item, Point,
    Rect, RenderError, Scene, Style,
};
use std::io::{self, Write};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A pipeline that does not scan the host for fonts, so results do not
/// depend on the machine running the tests.
pub fn pipeline() -> ExportPipeline {
    init_logger();
    ExportPipeline::with_config(ExportConfig {
        system_fonts: false,
        ..Default::default()
    })
}

/// Output of one export, kept together with its outcome.
pub struct Exported {
    pub bytes: Vec<u8>,
    pub outcome: ExportOutcome,
}

impl Exported {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.text().matches(needle).count()
    }
}

pub fn export_with<P>(request: ExportRequest, dimension: Dimension, paint: P) -> Result<Exported, ExportError>
where
    P: FnOnce(&mut dyn DrawingSurface) -> Result<(), RenderError>,
{
    let mut bytes = Vec::new();
    let outcome = pipeline().export(request, &mut bytes, |_| dimension, paint)?;
    Ok(Exported { bytes, outcome })
}

pub fn export_empty(tag: &str, width: u32, height: u32) -> Result<Exported, ExportError> {
    export_with(ExportRequest::new(tag), Dimension::new(width, height), |_| Ok(()))
}

/// Two boxes joined by an arrow.
pub fn sample_shapes() -> Scene {
    let filled = Style {
        fill: Some(sdexport::Color::rgb(0xee, 0xee, 0xff)),
        ..Default::default()
    };
    Scene::default()
        .with_item(Item::Rect { bounds: Rect::new(10.0, 10.0, 80.0, 30.0), style: filled.clone() })
        .with_item(Item::Rect { bounds: Rect::new(10.0, 90.0, 80.0, 30.0), style: filled })
        .with_item(Item::Arrow {
            from: Point::new(50.0, 40.0),
            to: Point::new(50.0, 90.0),
            head: 8.0,
            style: Style::default(),
        })
}

/// `sample_shapes` with a label in the first box.
pub fn sample_scene() -> Scene {
    sample_shapes().with_item(Item::Text { text: "Client".into(), at: Point::new(20.0, 30.0), style: Style::default() })
}

/// A sink whose every write fails.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }
}
