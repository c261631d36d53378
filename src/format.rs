use crate::error::ExportError;
use sdexport_render_core::{BackendCtor, BackendKind, MetricSource};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// An output format known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Gif,
    Png,
    Bmp,
    Jpg,
    Pdf,
    Svg,
    Emf,
    Eps,
    Ps,
    /// A format registered at runtime, by normalized tag.
    Custom(String),
}

impl ExportFormat {
    pub const BUILTIN: [ExportFormat; 9] = [
        ExportFormat::Gif,
        ExportFormat::Png,
        ExportFormat::Bmp,
        ExportFormat::Jpg,
        ExportFormat::Pdf,
        ExportFormat::Svg,
        ExportFormat::Emf,
        ExportFormat::Eps,
        ExportFormat::Ps,
    ];

    pub fn tag(&self) -> &str {
        match self {
            ExportFormat::Gif => "gif",
            ExportFormat::Png => "png",
            ExportFormat::Bmp => "bmp",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Svg => "svg",
            ExportFormat::Emf => "emf",
            ExportFormat::Eps => "eps",
            ExportFormat::Ps => "ps",
            ExportFormat::Custom(tag) => tag,
        }
    }

    fn builtin_kind(&self) -> BackendKind {
        match self {
            ExportFormat::Gif | ExportFormat::Png | ExportFormat::Bmp | ExportFormat::Jpg => {
                BackendKind::Raster
            }
            ExportFormat::Ps => BackendKind::PaginatedVector,
            _ => BackendKind::Vector,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What the registry knows about a format: enough to plan an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub format: ExportFormat,
    pub kind: BackendKind,
}

#[derive(Clone, Copy)]
enum Availability {
    Ready(BackendCtor),
    /// Compiled out; names the cargo feature that enables it.
    Disabled(&'static str),
}

#[derive(Clone)]
struct Registration {
    descriptor: BackendDescriptor,
    availability: Availability,
    honors_page_size: bool,
    metric_source: MetricSource,
}

fn builtin_ctor(format: &ExportFormat) -> Option<BackendCtor> {
    match format {
        #[cfg(feature = "raster")]
        ExportFormat::Gif => Some(sdexport_render_raster::create_gif as BackendCtor),
        #[cfg(feature = "raster")]
        ExportFormat::Png => Some(sdexport_render_raster::create_png as BackendCtor),
        #[cfg(feature = "raster")]
        ExportFormat::Bmp => Some(sdexport_render_raster::create_bmp as BackendCtor),
        #[cfg(feature = "raster")]
        ExportFormat::Jpg => Some(sdexport_render_raster::create_jpeg as BackendCtor),
        #[cfg(feature = "pdf")]
        ExportFormat::Pdf => Some(sdexport_render_lopdf::create as BackendCtor),
        ExportFormat::Svg => Some(sdexport_render_vector::create_svg as BackendCtor),
        ExportFormat::Emf => Some(sdexport_render_vector::create_emf as BackendCtor),
        ExportFormat::Eps => Some(sdexport_render_vector::create_eps as BackendCtor),
        ExportFormat::Ps => Some(sdexport_render_vector::create_ps as BackendCtor),
        _ => None,
    }
}

fn builtin_availability(format: &ExportFormat) -> Availability {
    match builtin_ctor(format) {
        Some(ctor) => Availability::Ready(ctor),
        None if *format == ExportFormat::Pdf => Availability::Disabled("pdf"),
        None => Availability::Disabled("raster"),
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}

/// Maps case-insensitive format tags to backend descriptors and constructors.
#[derive(Clone)]
pub struct FormatRegistry {
    entries: BTreeMap<String, Registration>,
    aliases: BTreeMap<String, String>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("tags", &self.supported_tags())
            .finish()
    }
}

impl FormatRegistry {
    /// A registry with every built-in format.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for format in ExportFormat::BUILTIN {
            // pdf, eps and ps name the standard Type 1 fonts instead of embedding faces
            let standard_type1 = matches!(format, ExportFormat::Pdf | ExportFormat::Eps | ExportFormat::Ps);
            let registration = Registration {
                descriptor: BackendDescriptor { kind: format.builtin_kind(), format: format.clone() },
                availability: builtin_availability(&format),
                honors_page_size: standard_type1,
                metric_source: if standard_type1 { MetricSource::StandardType1 } else { MetricSource::Installed },
            };
            registry.entries.insert(format.tag().to_string(), registration);
        }
        registry.aliases.insert("jpeg".into(), "jpg".into());
        registry
    }

    pub fn empty() -> Self {
        Self { entries: BTreeMap::new(), aliases: BTreeMap::new() }
    }

    /// Registers (or replaces) a backend under `tag`. Non-raster custom
    /// backends receive the requested page size.
    pub fn register(&mut self, tag: &str, kind: BackendKind, ctor: BackendCtor) -> BackendDescriptor {
        let tag = normalize(tag);
        let format = ExportFormat::BUILTIN
            .into_iter()
            .find(|f| f.tag() == tag)
            .unwrap_or_else(|| ExportFormat::Custom(tag.clone()));
        let descriptor = BackendDescriptor { format, kind };
        self.aliases.remove(&tag);
        self.entries.insert(
            tag,
            Registration {
                descriptor: descriptor.clone(),
                availability: Availability::Ready(ctor),
                honors_page_size: kind != BackendKind::Raster,
                metric_source: MetricSource::Installed,
            },
        );
        descriptor
    }

    fn lookup(&self, tag: &str) -> Option<&Registration> {
        let tag = normalize(tag);
        let key = self.aliases.get(&tag).unwrap_or(&tag);
        self.entries.get(key)
    }

    pub fn resolve(&self, tag: &str) -> Result<BackendDescriptor, ExportError> {
        self.lookup(tag)
            .map(|r| r.descriptor.clone())
            .ok_or_else(|| ExportError::UnknownFormat(tag.trim().to_string()))
    }

    pub fn is_supported(&self, tag: &str) -> bool {
        self.lookup(tag).is_some()
    }

    /// Registered tags in sorted order. Aliases are not listed.
    pub fn supported_tags(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Constructor for `format`, or `BackendUnavailable` when it was compiled out.
    pub fn constructor(&self, format: &ExportFormat) -> Result<BackendCtor, ExportError> {
        let registration = self
            .entries
            .get(format.tag())
            .ok_or_else(|| ExportError::UnknownFormat(format.tag().to_string()))?;
        match registration.availability {
            Availability::Ready(ctor) => Ok(ctor),
            Availability::Disabled(feature) => Err(ExportError::BackendUnavailable {
                tag: format.tag().to_string(),
                feature,
            }),
        }
    }

    pub fn honors_page_size(&self, format: &ExportFormat) -> bool {
        self.entries.get(format.tag()).is_some_and(|r| r.honors_page_size)
    }

    /// Where text metrics for `format` come from; matches what its backend measures with.
    pub fn metric_source(&self, format: &ExportFormat) -> MetricSource {
        self.entries
            .get(format.tag())
            .map_or(MetricSource::Installed, |r| r.metric_source)
    }

    /// Canonical file extension, without the dot.
    pub fn file_extension(format: &ExportFormat) -> &str {
        format.tag()
    }

    /// Resolves the format named by the extension of `path`.
    pub fn infer_from_path(&self, path: &Path) -> Result<BackendDescriptor, ExportError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.resolve(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdexport_render_core::{Backend, BackendOptions, RenderError};
    use std::io::Write;

    fn failing_ctor<'a>(
        _options: &BackendOptions,
        _sink: &'a mut dyn Write,
    ) -> Result<Box<dyn Backend + 'a>, RenderError> {
        Err(RenderError::Other("not constructible".into()))
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let registry = FormatRegistry::new();
        assert_eq!(registry.resolve("PNG").unwrap(), registry.resolve("png").unwrap());
        assert_eq!(registry.resolve(" Ps ").unwrap().kind, BackendKind::PaginatedVector);
        assert_eq!(registry.resolve("jpeg").unwrap().format, ExportFormat::Jpg);
    }

    #[test]
    fn kinds_follow_tags() {
        let registry = FormatRegistry::new();
        for tag in ["gif", "png", "bmp", "jpg"] {
            assert_eq!(registry.resolve(tag).unwrap().kind, BackendKind::Raster);
        }
        for tag in ["pdf", "svg", "emf", "eps"] {
            assert_eq!(registry.resolve(tag).unwrap().kind, BackendKind::Vector);
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let registry = FormatRegistry::new();
        let err = registry.resolve("tiff").unwrap_err();
        assert!(matches!(err, ExportError::UnknownFormat(ref tag) if tag == "tiff"));
        assert!(err.is_unsupported_format());
        assert!(!registry.is_supported("tiff"));
    }

    #[test]
    fn tags_are_sorted() {
        let registry = FormatRegistry::new();
        assert_eq!(
            registry.supported_tags(),
            vec!["bmp", "emf", "eps", "gif", "jpg", "pdf", "png", "ps", "svg"]
        );
    }

    #[test]
    fn custom_backends_can_be_registered() {
        let mut registry = FormatRegistry::new();
        let descriptor = registry.register("TIFF", BackendKind::Raster, failing_ctor);
        assert_eq!(descriptor.format, ExportFormat::Custom("tiff".into()));
        assert_eq!(registry.resolve("tiff").unwrap(), descriptor);
        assert!(registry.constructor(&descriptor.format).is_ok());
        assert!(!registry.honors_page_size(&descriptor.format));
    }

    #[test]
    fn page_size_support() {
        let registry = FormatRegistry::new();
        for (format, honored) in [
            (ExportFormat::Pdf, true),
            (ExportFormat::Eps, true),
            (ExportFormat::Ps, true),
            (ExportFormat::Svg, false),
            (ExportFormat::Emf, false),
            (ExportFormat::Png, false),
        ] {
            assert_eq!(registry.honors_page_size(&format), honored, "{}", format);
        }
    }

    #[test]
    fn format_from_path() {
        let registry = FormatRegistry::new();
        let descriptor = registry.infer_from_path(Path::new("out/diagram.SVG")).unwrap();
        assert_eq!(descriptor.format, ExportFormat::Svg);
        assert!(registry.infer_from_path(Path::new("diagram")).is_err());
        assert_eq!(FormatRegistry::file_extension(&ExportFormat::Jpg), "jpg");
    }
}
