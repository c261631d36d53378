use clap::Parser;
use sdexport::{ExportConfig, ExportPipeline, ExportRequest, Orientation, Scene};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// Exports a JSON diagram scene to an image or document format.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scene description (JSON)
    #[arg(required_unless_present = "list_formats")]
    scene: Option<PathBuf>,

    /// Output file; the format is taken from its extension unless --format is given
    #[arg(required_unless_present = "list_formats")]
    output: Option<PathBuf>,

    /// Output format tag, e.g. png, svg, pdf, ps
    #[arg(short, long)]
    format: Option<String>,

    /// Portrait or Landscape; derived from the canvas shape when omitted
    #[arg(short, long)]
    orientation: Option<Orientation>,

    /// Paper size for pdf, eps and ps output, e.g. A4 or Letter
    #[arg(short, long)]
    page_size: Option<String>,

    /// Export configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra font file (TTF/OTF) used for metrics and raster text; may be repeated
    #[cfg(feature = "system-fonts")]
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Print the supported format tags and exit
    #[arg(long)]
    list_formats: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ExportConfig::from_json(&fs::read_to_string(path)?)?,
        None => ExportConfig::default(),
    };
    let pipeline = ExportPipeline::with_config(config);
    #[cfg(feature = "system-fonts")]
    for path in &args.fonts {
        pipeline.fonts().add_font_data(fs::read(path)?);
    }

    if args.list_formats {
        for tag in pipeline.registry().supported_tags() {
            println!("{}", tag);
        }
        return Ok(());
    }

    let (Some(scene_path), Some(output)) = (args.scene, args.output) else {
        return Err("a scene and an output path are required".into());
    };

    println!("Loading scene from {}", scene_path.display());
    let scene = Scene::from_json(&fs::read_to_string(&scene_path)?)?;

    let tag = match args.format {
        Some(tag) => tag,
        None => pipeline.registry().infer_from_path(&output)?.format.tag().to_string(),
    };
    let mut request = ExportRequest::new(tag);
    request.orientation = args.orientation;
    request.page_size = args.page_size;

    let outcome = pipeline.export_to_path(request, &output, |metrics| scene.measure(metrics), |surface| {
        scene.paint(surface)
    })?;

    println!(
        "Wrote {} ({}x{}, {}) to {}",
        outcome.format,
        outcome.dimension.width,
        outcome.dimension.height,
        outcome.orientation,
        output.display()
    );
    Ok(())
}
