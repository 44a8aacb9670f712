//! External collaborator interfaces
//!
//! The compositor rasterizes content rectangles into bitmaps and answers
//! hit-tests; the view layer receives published viewport state and draws
//! pixel buffers. Both sit outside this crate; only their contracts live
//! here. Requests are fire-and-forget; the host routes each compositor
//! answer back through `ViewportController::handle_bitmap_response`, and the
//! controller tolerates answers arriving in any order and at any time.

use crate::codec::RawBitmap;
use crate::geometry::{Rect, Size};
use crate::scale::ScaleKey;

/// Identifies the captured frame all requests in one controller belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// One tile rasterization request.
#[derive(Clone, Debug)]
pub struct BitmapRequest {
    pub frame: FrameId,
    /// Tile bounds in post-scale content space.
    pub content_rect: Rect,
    pub scale: ScaleKey,
    pub row: u32,
    pub col: u32,
}

/// The compositor's answer to a `BitmapRequest`. Exactly one response per
/// request, success or failure.
#[derive(Debug)]
pub struct BitmapResponse {
    pub scale: ScaleKey,
    pub row: u32,
    pub col: u32,
    pub result: Result<RawBitmap, RequestFault>,
}

/// A compositor-side rasterization failure. Carries no detail; the tile
/// simply stays absent and is re-requested by a later required pass.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RequestFault {
    #[error("compositor declined the bitmap request")]
    Declined,
}

/// Consumed interface to the native compositor.
pub trait CompositorDelegate {
    /// Asynchronously rasterize one tile. At most one in-flight request per
    /// (scale, row, col) will ever be issued.
    fn request_bitmap(&mut self, request: BitmapRequest);

    /// Fire-and-forget hit-test notification, coordinates in unscaled
    /// content space.
    fn on_click(&mut self, frame: FrameId, content_x: f32, content_y: f32);
}

/// Interface exposed to the view layer.
pub trait FrameListener {
    /// Viewport state changed; the view is expected to request a redraw.
    /// The active tile grid is not carried in the notification: the view
    /// pulls it on its own schedule by calling [`crate::PlayerFrame::draw`],
    /// which walks the grid for the published viewport.
    fn on_viewport_published(&mut self, viewport: Rect, scale: f32, tile_size: Size);

    /// A draw pass could not complete (tile mid-discard, or inflations
    /// finished); the view should schedule another pass.
    fn on_redraw_needed(&mut self);

    /// First tile successfully drawn. Delivered exactly once.
    fn on_first_paint(&mut self);
}

/// Destination the painter draws into.
pub trait DrawSurface {
    /// Draw `src` (tile-local pixels) at `dst` (view space).
    fn draw(&mut self, tile: &RawBitmap, src: Rect, dst: Rect);
}
