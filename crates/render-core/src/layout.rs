use sdexport_types::{Dimension, Orientation, PageSize};

/// Placement of the canvas on an output page, in points.
///
/// Without a paper size the page is the canvas itself. With one, the page is
/// the paper in the requested orientation and the canvas is centered inside
/// the margins, scaled to fit when `fit_to_page` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub scale: f32,
    /// Left edge of the canvas on the page.
    pub offset_x: f32,
    /// Top edge of the canvas on the page, measured downwards.
    pub offset_y: f32,
}

impl PageLayout {
    pub fn canvas(dimension: Dimension) -> Self {
        Self {
            page_width: dimension.width as f32,
            page_height: dimension.height as f32,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn compute(
        dimension: Dimension,
        orientation: Orientation,
        page_size: Option<PageSize>,
        margin: f32,
        fit_to_page: bool,
    ) -> Self {
        let Some(size) = page_size else {
            return Self::canvas(dimension);
        };
        let (page_width, page_height) = size.oriented_points(orientation);
        let width = dimension.width.max(1) as f32;
        let height = dimension.height.max(1) as f32;
        let available_w = (page_width - 2.0 * margin).max(1.0);
        let available_h = (page_height - 2.0 * margin).max(1.0);
        let scale = if fit_to_page {
            (available_w / width).min(available_h / height)
        } else {
            1.0
        };
        Self {
            page_width,
            page_height,
            scale,
            offset_x: (page_width - width * scale) / 2.0,
            offset_y: (page_height - height * scale) / 2.0,
        }
    }

    /// Affine matrix `[a b c d e f]` mapping top-down canvas coordinates onto a
    /// bottom-up page, as used by PDF `cm` and PostScript `concat`.
    pub fn flip_matrix(&self) -> [f32; 6] {
        [
            self.scale,
            0.0,
            0.0,
            -self.scale,
            self.offset_x,
            self.page_height - self.offset_y,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_page_size_uses_canvas() {
        let layout = PageLayout::compute(Dimension::new(300, 150), Orientation::Landscape, None, 20.0, true);
        assert_eq!(layout, PageLayout::canvas(Dimension::new(300, 150)));
        assert_eq!(layout.flip_matrix(), [1.0, 0.0, 0.0, -1.0, 0.0, 150.0]);
    }

    #[test]
    fn canvas_is_fitted_and_centered() {
        let layout = PageLayout::compute(
            Dimension::new(1000, 500),
            Orientation::Landscape,
            Some(PageSize::Letter),
            20.0,
            true,
        );
        assert_eq!((layout.page_width, layout.page_height), (792.0, 612.0));
        // limited by width: (792 - 40) / 1000
        assert!((layout.scale - 0.752).abs() < 1e-5);
        assert!((layout.offset_x - 20.0).abs() < 1e-3);
        assert!((layout.offset_y - (612.0 - 376.0) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn unfitted_canvas_keeps_scale() {
        let layout = PageLayout::compute(
            Dimension::new(100, 100),
            Orientation::Portrait,
            Some(PageSize::A4),
            20.0,
            false,
        );
        assert_eq!(layout.scale, 1.0);
    }
}
