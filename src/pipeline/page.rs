use sdexport_render_core::{Backend, BackendKind, DrawingSurface, RenderError};
use sdexport_types::Dimension;

/// Wraps the paint phase in the page protocol of paginated backends.
///
/// The page is closed on every exit path. When painting fails the paint
/// error is returned and a close failure is only logged.
pub struct PageController<'b, 'a> {
    backend: &'b mut (dyn Backend + 'a),
}

impl<'b, 'a> PageController<'b, 'a> {
    pub fn new(backend: &'b mut (dyn Backend + 'a)) -> Self {
        Self { backend }
    }

    /// Runs `paint` once against the backend's surface and returns the number
    /// of pages the backend has written (zero for non-paginated backends).
    pub fn paint<P>(self, dimension: Dimension, paint: P) -> Result<usize, RenderError>
    where
        P: FnOnce(&mut dyn DrawingSurface) -> Result<(), RenderError>,
    {
        if self.backend.kind() != BackendKind::PaginatedVector {
            paint(self.backend.surface())?;
            return Ok(0);
        }

        let paged = self
            .backend
            .paged()
            .ok_or_else(|| RenderError::PageProtocol("paginated backend without page support".into()))?;
        paged.open_page(dimension, "")?;

        let painted = paint(self.backend.surface());

        let closed = match self.backend.paged() {
            Some(paged) => paged.close_page(),
            None => Err(RenderError::PageProtocol("page support vanished while painting".into())),
        };

        match (painted, closed) {
            (Ok(()), Ok(())) => Ok(self.backend.paged().map_or(0, |p| p.pages_written())),
            (Ok(()), Err(close_err)) => Err(close_err),
            (Err(paint_err), Ok(())) => Err(paint_err),
            (Err(paint_err), Err(close_err)) => {
                log::warn!("Closing the page after a failed paint also failed: {}", close_err);
                Err(paint_err)
            }
        }
    }
}
