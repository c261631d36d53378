use crate::fonts::{LogicalFamily, logical_family};
use sdexport_types::{FontSpec, Point, Rect};

/// Control-point distance for approximating a quarter ellipse with a cubic Bézier.
const KAPPA: f32 = 0.552_284_8;

/// Start point and four cubic segments `(c1, c2, end)` tracing the ellipse
/// inscribed in `rect`, clockwise in top-down coordinates, starting at 3 o'clock.
pub fn ellipse_curves(rect: Rect) -> (Point, [(Point, Point, Point); 4]) {
    let c = rect.center();
    let (rx, ry) = (rect.width / 2.0, rect.height / 2.0);
    let (kx, ky) = (rx * KAPPA, ry * KAPPA);
    let start = Point::new(c.x + rx, c.y);
    let segments = [
        (Point::new(c.x + rx, c.y + ky), Point::new(c.x + kx, c.y + ry), Point::new(c.x, c.y + ry)),
        (Point::new(c.x - kx, c.y + ry), Point::new(c.x - rx, c.y + ky), Point::new(c.x - rx, c.y)),
        (Point::new(c.x - rx, c.y - ky), Point::new(c.x - kx, c.y - ry), Point::new(c.x, c.y - ry)),
        (Point::new(c.x + kx, c.y - ry), Point::new(c.x + rx, c.y - ky), start),
    ];
    (start, segments)
}

/// Name of the standard Type 1 font (one of the PDF/PostScript base 14) that
/// stands in for `font` in PostScript and PDF output.
pub fn standard_font_name(font: &FontSpec) -> &'static str {
    match (logical_family(&font.family), font.bold, font.italic) {
        (LogicalFamily::Serif, false, false) => "Times-Roman",
        (LogicalFamily::Serif, true, false) => "Times-Bold",
        (LogicalFamily::Serif, false, true) => "Times-Italic",
        (LogicalFamily::Serif, true, true) => "Times-BoldItalic",
        (LogicalFamily::Monospace, false, false) => "Courier",
        (LogicalFamily::Monospace, true, false) => "Courier-Bold",
        (LogicalFamily::Monospace, false, true) => "Courier-Oblique",
        (LogicalFamily::Monospace, true, true) => "Courier-BoldOblique",
        (_, false, false) => "Helvetica",
        (_, true, false) => "Helvetica-Bold",
        (_, false, true) => "Helvetica-Oblique",
        (_, true, true) => "Helvetica-BoldOblique",
    }
}

/// Formats a coordinate compactly: at most three decimals, no trailing zeros.
pub fn fmt_num(value: f32) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{:.3}", rounded);
        s.trim_end_matches('0').to_string()
    }
}

/// Latin-1 bytes of `s`, with unrepresentable characters replaced by `?`.
pub fn to_latin1(s: &str) -> Vec<u8> {
    s.chars().map(|c| if c as u32 <= 255 { c as u8 } else { b'?' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_names() {
        assert_eq!(standard_font_name(&FontSpec::default()), "Helvetica");
        assert_eq!(standard_font_name(&FontSpec::new("Serif", 10.0).bold()), "Times-Bold");
        assert_eq!(
            standard_font_name(&FontSpec::new("Monospaced", 10.0).bold().italic()),
            "Courier-BoldOblique"
        );
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(fmt_num(3.0), "3");
        assert_eq!(fmt_num(2.5), "2.5");
        assert_eq!(fmt_num(-0.1234), "-0.123");
        assert_eq!(fmt_num(1.0004), "1");
    }

    #[test]
    fn ellipse_closes_on_its_start() {
        let (start, segments) = ellipse_curves(Rect::new(0.0, 0.0, 20.0, 10.0));
        assert_eq!(start, Point::new(20.0, 5.0));
        assert_eq!(segments[0].2, Point::new(10.0, 10.0));
        assert_eq!(segments[3].2, start);
    }

    #[test]
    fn latin1_replaces_wide_chars() {
        assert_eq!(to_latin1("é€"), vec![0xE9, b'?']);
    }
}
