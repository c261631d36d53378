mod common;

use common::*;
use sdexport::{BackendKind, ExportError, ExportFormat, ExportRequest, FontSpec, FormatRegistry};
use std::path::Path;

#[test]
fn tags_resolve_case_insensitively() {
    let registry = FormatRegistry::new();
    assert_eq!(registry.resolve("PNG").unwrap(), registry.resolve("png").unwrap());
    assert_eq!(registry.resolve("Pdf").unwrap().format, ExportFormat::Pdf);
    assert_eq!(registry.resolve("jpeg").unwrap().format, ExportFormat::Jpg);
}

#[test]
fn every_builtin_tag_is_listed() {
    let registry = FormatRegistry::new();
    assert_eq!(
        registry.supported_tags(),
        vec!["bmp", "emf", "eps", "gif", "jpg", "pdf", "png", "ps", "svg"]
    );
    assert!(!registry.is_supported("tiff"));
}

#[test]
fn kinds_match_the_output_family() {
    let registry = FormatRegistry::new();
    assert_eq!(registry.resolve("gif").unwrap().kind, BackendKind::Raster);
    assert_eq!(registry.resolve("emf").unwrap().kind, BackendKind::Vector);
    assert_eq!(registry.resolve("eps").unwrap().kind, BackendKind::Vector);
    assert_eq!(registry.resolve("ps").unwrap().kind, BackendKind::PaginatedVector);
}

#[test]
fn format_is_inferred_from_extension() {
    let registry = FormatRegistry::new();
    let descriptor = registry.infer_from_path(Path::new("out/diagram.SVG")).unwrap();
    assert_eq!(descriptor.format, ExportFormat::Svg);
    assert!(matches!(
        registry.infer_from_path(Path::new("diagram")),
        Err(ExportError::UnknownFormat(_))
    ));
}

#[test]
fn unsupported_format_writes_nothing() {
    let mut sink = Vec::new();
    let mut painted = false;
    let err = pipeline()
        .export(ExportRequest::new("tiff"), &mut sink, |_| sdexport::Dimension::new(10, 10), |_| {
            painted = true;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_unsupported_format());
    assert!(!painted);
    assert!(sink.is_empty());
}

#[test]
fn probe_metrics_follow_backend_kind() {
    let pipeline = pipeline();
    let font = FontSpec::new("SansSerif", 10.0);
    // Helvetica advances: H = 722, i = 222
    let raster = pipeline.measure("png").unwrap();
    assert_eq!(raster.string_width(&font, "Hi"), 9.0);
    let vector = pipeline.measure("svg").unwrap();
    assert!((vector.string_width(&font, "Hi") - 9.44).abs() < 1e-4);
    assert_eq!(vector.dimension(), sdexport::Dimension::UNIT);
}
