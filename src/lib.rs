//! Tiled-bitmap viewport renderer for frozen page snapshots
//!
//! A captured page is displayed through a scrollable viewport on limited
//! memory: the content is cut into viewport-sized tiles per scale factor,
//! tiles are rasterized on demand by an external compositor, and off-screen
//! tiles live as compressed encodings (lossy JPEG color plane, lossless zlib
//! alpha plane) until a draw pass needs them again.
//!
//! The owning thread drives viewport mutation and draw passes; one
//! background worker runs all compression and inflation. `PlayerFrame` wires
//! the pieces together for hosts that do not need the parts individually.

pub mod codec;
pub mod compositor;
pub mod controller;
pub mod fling;
pub mod geometry;
pub mod matrix;
pub mod painter;
pub mod queue;
pub mod scale;
pub mod unit;

pub use codec::{CodecFault, RawBitmap};
pub use compositor::{
    BitmapRequest, BitmapResponse, CompositorDelegate, DrawSurface, FrameId, FrameListener,
    RequestFault,
};
pub use controller::{Viewport, ViewportController};
pub use geometry::{Rect, Size, TileRange};
pub use matrix::{BitmapMatrix, TileStore};
pub use painter::BitmapPainter;
pub use queue::{InflateDone, TaskQueue};
pub use scale::ScaleKey;
pub use unit::CompressionUnit;

/// JPEG quality for the lossy color plane.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;
/// Rings of adjacent tiles prefetched around the visible range.
pub const DEFAULT_PREFETCH_RING: u32 = 1;
/// Per-scale grids retained before the LRU cap starts evicting.
pub const DEFAULT_MAX_SCALE_GRIDS: usize = 8;

/// Tunables for one player frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameConfig {
    pub prefetch_ring: u32,
    pub jpeg_quality: u8,
    pub max_scale_grids: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            prefetch_ring: DEFAULT_PREFETCH_RING,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_scale_grids: DEFAULT_MAX_SCALE_GRIDS,
        }
    }
}

/// One snapshot frame: viewport controller, painter, and the shared
/// background codec queue.
pub struct PlayerFrame {
    controller: ViewportController,
    painter: BitmapPainter,
    queue: TaskQueue,
}

impl PlayerFrame {
    #[must_use]
    pub fn new(
        frame: FrameId,
        content_size: Size,
        compositor: Box<dyn CompositorDelegate>,
        listener: Box<dyn FrameListener>,
        config: FrameConfig,
    ) -> Self {
        Self {
            controller: ViewportController::new(frame, content_size, compositor, listener, config),
            painter: BitmapPainter::new(config.jpeg_quality),
            queue: TaskQueue::new(),
        }
    }

    pub fn set_layout_size(&mut self, size: Size) {
        self.controller.set_layout_size(size);
    }

    pub fn scroll_by(&mut self, dx: f32, dy: f32) -> bool {
        self.controller.scroll_by(dx, dy)
    }

    pub fn on_fling(&mut self, velocity_x: f32, velocity_y: f32) -> bool {
        self.controller.on_fling(velocity_x, velocity_y)
    }

    pub fn tick_fling(&mut self, dt: f32) -> bool {
        self.controller.tick_fling(dt)
    }

    pub fn on_click(&mut self, view_x: f32, view_y: f32) {
        self.controller.on_click(view_x, view_y);
    }

    pub fn on_scale(&mut self, factor: f32, focal_x: f32, focal_y: f32) -> bool {
        self.controller.on_scale(factor, focal_x, focal_y)
    }

    /// Route a compositor answer for an earlier `BitmapRequest`.
    pub fn handle_bitmap_response(&mut self, response: BitmapResponse) {
        self.controller.handle_bitmap_response(response, &self.queue);
    }

    /// Run one draw pass against the active grid.
    pub fn draw(&mut self, surface: &mut dyn DrawSurface) {
        let Some(viewport) = self.controller.viewport().copied() else {
            return;
        };
        let Some(scale) = self.controller.active_scale() else {
            return;
        };

        let queue = &self.queue;
        let (grid, listener) = self.controller.painter_ctx();
        let Some(grid) = grid else {
            return;
        };
        self.painter
            .draw_frame(grid, scale, viewport.rect(), queue, surface, listener);
    }

    /// Drain finished background inflations. Call from the owning thread's
    /// tick, before or after `draw`.
    pub fn poll_inflations(&mut self) {
        for done in self.queue.poll_done() {
            let (grid, listener) = self.controller.painter_ctx();
            if let Some(grid) = grid {
                self.painter.handle_inflation(done, grid, listener);
            }
        }
    }

    /// Tear the frame down, force-destroying every retained tile.
    pub fn destroy(&mut self) {
        self.controller.destroy();
    }

    #[must_use]
    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    #[must_use]
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }
}

impl Drop for PlayerFrame {
    fn drop(&mut self) {
        self.destroy();
    }
}
