//! Per-frame draw orchestration
//!
//! Each pass walks the visible tile range of the active grid: tiles with raw
//! pixels are drawn (latched for the duration of the blit), tiles without
//! are sent to the background queue for inflation, and tiles whose latch is
//! busy get a deferred redraw instead of a silent skip. After the visible
//! tiles are processed, tiles drawn last pass that fell out of view have
//! their pixels released. This is deliberately redundant with the
//! controller's response-time eviction; a tile missed by one path under
//! latch contention is caught by the other.

use std::collections::HashSet;

use log::trace;

use crate::compositor::{DrawSurface, FrameListener};
use crate::geometry::{Rect, TileRange};
use crate::matrix::BitmapMatrix;
use crate::queue::{InflateDone, TaskQueue};
use crate::scale::ScaleKey;

pub struct BitmapPainter {
    scale: Option<ScaleKey>,
    /// Tiles drawn in the previous pass.
    drawn: HashSet<(u32, u32)>,
    /// Tiles with an inflation in flight.
    inflating: HashSet<(u32, u32)>,
    first_paint_sent: bool,
    jpeg_quality: u8,
}

impl BitmapPainter {
    #[must_use]
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            scale: None,
            drawn: HashSet::new(),
            inflating: HashSet::new(),
            first_paint_sent: false,
            jpeg_quality,
        }
    }

    /// Run one draw pass over the active grid.
    pub fn draw_frame(
        &mut self,
        grid: &BitmapMatrix,
        scale: ScaleKey,
        viewport_rect: Rect,
        queue: &TaskQueue,
        surface: &mut dyn DrawSurface,
        listener: &mut dyn FrameListener,
    ) {
        if self.scale != Some(scale) {
            // New grid; the old grid's leftovers are handled by the
            // controller's eviction path.
            self.scale = Some(scale);
            self.drawn.clear();
            self.inflating.clear();
        }

        let tile = grid.tile_size();
        let Some(visible) =
            TileRange::covering(&viewport_rect, tile, grid.rows(), grid.cols())
        else {
            return;
        };

        let mut drawn_now = HashSet::new();
        let mut deferred = false;

        for (row, col) in visible.iter() {
            let Some(unit) = grid.get(row, col) else {
                continue;
            };

            if !unit.lock() {
                // Mid-discard on the worker; come back next frame.
                trace!("tile ({row},{col}) latch busy, deferring redraw");
                deferred = true;
                continue;
            }

            if !unit.has_raw() {
                unit.unlock();
                if self.inflating.insert((row, col)) {
                    queue.schedule_inflate(unit.clone(), scale, row, col);
                }
                continue;
            }

            let tile_rect = Rect::new(
                (col * tile.width) as f32,
                (row * tile.height) as f32,
                tile.width as f32,
                tile.height as f32,
            );
            if let Some(overlap) = tile_rect.intersection(&viewport_rect) {
                let src = Rect::new(
                    overlap.left - tile_rect.left,
                    overlap.top - tile_rect.top,
                    overlap.width,
                    overlap.height,
                );
                let dst = Rect::new(
                    overlap.left - viewport_rect.left,
                    overlap.top - viewport_rect.top,
                    overlap.width,
                    overlap.height,
                );
                unit.with_raw(|bitmap| surface.draw(bitmap, src, dst));
                drawn_now.insert((row, col));

                if !self.first_paint_sent {
                    self.first_paint_sent = true;
                    listener.on_first_paint();
                }
            }
            unit.unlock();
        }

        // Eviction strictly after every visible tile has been processed, so
        // a last-reference tile is never released mid-pass.
        for &(row, col) in &self.drawn {
            if visible.contains(row, col) {
                continue;
            }
            let Some(unit) = grid.get(row, col) else {
                continue;
            };
            if !unit.has_raw() {
                continue;
            }
            if unit.has_encoding() {
                unit.discard_bitmap();
            } else {
                queue.schedule_compress(unit.clone(), false, self.jpeg_quality);
            }
        }

        self.drawn = drawn_now;
        if deferred {
            listener.on_redraw_needed();
        }
    }

    /// Route a finished background inflation. A failed inflation means the
    /// compressed data is unusable; the entry is removed so the next
    /// required pass re-requests the tile from the compositor.
    pub fn handle_inflation(
        &mut self,
        done: InflateDone,
        grid: &mut BitmapMatrix,
        listener: &mut dyn FrameListener,
    ) {
        if self.scale != Some(done.scale) {
            return;
        }
        self.inflating.remove(&(done.row, done.col));

        if !done.ok {
            if let Some(unit) = grid.remove(done.row, done.col) {
                unit.destroy();
            }
        }

        if self.inflating.is_empty() {
            listener.on_redraw_needed();
        }
    }

    /// Whether any inflation is still outstanding for the active grid.
    #[must_use]
    pub fn is_inflating(&self) -> bool {
        !self.inflating.is_empty()
    }
}
