//! Viewport controller
//!
//! Owns the viewport rectangle and active scale, and drives the tile
//! lifecycle: every viewport move recomputes which tiles are required
//! (visible plus a one-ring prefetch), requests the missing ones from the
//! compositor exactly once, and the response handler stores, discards, or
//! evicts based on what is still required when the answer lands.

use std::collections::HashMap;

use log::{debug, trace};

use crate::FrameConfig;
use crate::compositor::{BitmapRequest, BitmapResponse, CompositorDelegate, FrameId, FrameListener};
use crate::fling::FlingTracker;
use crate::geometry::{Rect, Size, TileRange, grid_dimensions};
use crate::matrix::{BitmapMatrix, TileStore};
use crate::queue::TaskQueue;
use crate::scale::ScaleKey;
use crate::unit::CompressionUnit;

/// Current visible window into the content: a content-space rectangle plus
/// the uniform scale factor. Width and height are fixed once layout is
/// established; only the origin and scale mutate.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    rect: Rect,
    scale: f32,
}

impl Viewport {
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }
}

/// Per-scale boolean table over a grid's cells.
type CellTable = Vec<bool>;

pub struct ViewportController {
    frame: FrameId,
    content_size: Size,
    view_size: Size,
    viewport: Option<Viewport>,
    active_scale: Option<ScaleKey>,
    store: TileStore,
    /// Tiles needed as of the last viewport move, per scale.
    required: HashMap<ScaleKey, CellTable>,
    /// In-flight compositor requests, per scale.
    pending: HashMap<ScaleKey, CellTable>,
    fling: Option<FlingTracker>,
    compositor: Box<dyn CompositorDelegate>,
    listener: Box<dyn FrameListener>,
    config: FrameConfig,
}

impl ViewportController {
    #[must_use]
    pub fn new(
        frame: FrameId,
        content_size: Size,
        compositor: Box<dyn CompositorDelegate>,
        listener: Box<dyn FrameListener>,
        config: FrameConfig,
    ) -> Self {
        Self {
            frame,
            content_size,
            view_size: Size::default(),
            viewport: None,
            active_scale: None,
            store: TileStore::new(config.max_scale_grids),
            required: HashMap::new(),
            pending: HashMap::new(),
            fling: None,
            compositor,
            listener,
            config,
        }
    }

    /// Viewport dimensions are known; compute the initial width-fit scale if
    /// none is set yet and populate the initial tile set.
    pub fn set_layout_size(&mut self, size: Size) {
        if size.is_empty() || self.content_size.is_empty() {
            return;
        }
        self.view_size = size;

        let scale = match self.viewport {
            Some(viewport) => viewport.scale,
            None => size.width as f32 / self.content_size.width as f32,
        };
        self.viewport = Some(Viewport {
            rect: Rect::new(0.0, 0.0, size.width as f32, size.height as f32),
            scale,
        });

        self.move_viewport(0.0, 0.0, scale);
    }

    /// Offset the viewport by (dx, dy) at `new_scale`, recompute the required
    /// set, request what is missing, and publish. Clamping is the caller's
    /// job; `scroll_by` is the clamping entry point.
    pub fn move_viewport(&mut self, dx: f32, dy: f32, new_scale: f32) {
        let Some(mut viewport) = self.viewport else {
            return;
        };

        let key = ScaleKey::from_factor(new_scale);
        let (rows, cols) = grid_dimensions(self.content_size, new_scale, self.view_size);
        if rows == 0 || cols == 0 {
            return;
        }

        if self.active_scale != Some(key) {
            self.active_scale = Some(key);
            debug!("active grid now {rows}x{cols} at scale {}", key.factor());
        }
        // A fresh grid means the old one aged out or was resized away;
        // whatever the cell tables said about it no longer holds.
        let created = self.store.ensure_grid(key, rows, cols, self.view_size);
        let cells = rows as usize * cols as usize;
        for table in [
            self.required.entry(key).or_default(),
            self.pending.entry(key).or_default(),
        ] {
            if created || table.len() != cells {
                table.clear();
                table.resize(cells, false);
            }
        }

        viewport.rect.offset(dx, dy);
        viewport.scale = new_scale;
        self.viewport = Some(viewport);

        // Reset on every move, even one that lands entirely off the grid;
        // tiles only stay required while the current viewport covers them.
        if let Some(required) = self.required.get_mut(&key) {
            required.iter_mut().for_each(|cell| *cell = false);
        }

        let Some(visible) = TileRange::covering(&viewport.rect, self.view_size, rows, cols) else {
            self.listener
                .on_viewport_published(viewport.rect, new_scale, self.view_size);
            return;
        };
        let ring = visible.expanded(self.config.prefetch_ring, rows, cols);

        if let Some(required) = self.required.get_mut(&key) {
            for (row, col) in ring.iter() {
                required[(row * cols + col) as usize] = true;
            }
        }

        // Visible tiles are requested before the prefetch ring so on-screen
        // content populates first.
        let mut wanted: Vec<(u32, u32)> = visible.iter().collect();
        wanted.extend(ring.iter().filter(|&(r, c)| !visible.contains(r, c)));

        let frame = self.frame;
        let tile = self.view_size;
        let (Some(pending), Some(grid)) = (self.pending.get_mut(&key), self.store.grid(key))
        else {
            return;
        };
        let mut requests = Vec::new();
        for (row, col) in wanted {
            let idx = (row * cols + col) as usize;
            if grid.get(row, col).is_some() || pending[idx] {
                continue;
            }
            pending[idx] = true;
            requests.push(BitmapRequest {
                frame,
                content_rect: Rect::new(
                    (col * tile.width) as f32,
                    (row * tile.height) as f32,
                    tile.width as f32,
                    tile.height as f32,
                ),
                scale: key,
                row,
                col,
            });
        }

        for request in requests {
            trace!("requesting tile ({},{})", request.row, request.col);
            self.compositor.request_bitmap(request);
        }

        self.listener
            .on_viewport_published(viewport.rect, new_scale, self.view_size);
    }

    /// Clamp (dx, dy) against the content bounds and move if anything is
    /// left. Returns whether the viewport moved at all.
    pub fn scroll_by(&mut self, dx: f32, dy: f32) -> bool {
        let Some(viewport) = self.viewport else {
            return false;
        };

        let (max_x, max_y) = self.scroll_extent(viewport.scale);
        let new_left = (viewport.rect.left + dx).clamp(0.0, max_x);
        let new_top = (viewport.rect.top + dy).clamp(0.0, max_y);

        let dx = new_left - viewport.rect.left;
        let dy = new_top - viewport.rect.top;
        if dx == 0.0 && dy == 0.0 {
            return false;
        }

        self.move_viewport(dx, dy, viewport.scale);
        true
    }

    /// Start a fling from the given gesture velocity (px/s). The trajectory
    /// runs in viewport-travel direction, so gesture velocity is negated.
    pub fn on_fling(&mut self, velocity_x: f32, velocity_y: f32) -> bool {
        let Some(viewport) = self.viewport else {
            return false;
        };

        let max = self.scroll_extent(viewport.scale);
        self.fling = Some(FlingTracker::new(
            (viewport.rect.left, viewport.rect.top),
            (-velocity_x, -velocity_y),
            max,
        ));
        true
    }

    /// Advance an active fling by `dt` seconds, scrolling by the simulated
    /// delta. Returns false once the fling has settled (or none is active).
    pub fn tick_fling(&mut self, dt: f32) -> bool {
        let Some(mut tracker) = self.fling.take() else {
            return false;
        };
        let Some(viewport) = self.viewport else {
            return false;
        };

        if let Some((x, y)) = tracker.tick(dt) {
            self.scroll_by(x - viewport.rect.left, y - viewport.rect.top);
        }

        if tracker.is_finished() {
            false
        } else {
            self.fling = Some(tracker);
            true
        }
    }

    /// Map a view-space tap to unscaled content space and forward it.
    pub fn on_click(&mut self, view_x: f32, view_y: f32) {
        let Some(viewport) = self.viewport else {
            return;
        };
        let content_x = (viewport.rect.left + view_x) / viewport.scale;
        let content_y = (viewport.rect.top + view_y) / viewport.scale;
        self.compositor.on_click(self.frame, content_x, content_y);
    }

    /// Pinch-zoom hook. Zoom is not part of the supported surface; the
    /// gesture is reported as not consumed.
    pub fn on_scale(&mut self, _factor: f32, _focal_x: f32, _focal_y: f32) -> bool {
        false
    }

    /// Route a compositor answer. A success is stored only when the tile is
    /// still required; anything stale is dropped on the floor. After every
    /// response, raw pixels of no-longer-required tiles in the active grid
    /// are released to bound memory.
    pub fn handle_bitmap_response(&mut self, response: BitmapResponse, queue: &TaskQueue) {
        let BitmapResponse {
            scale,
            row,
            col,
            result,
        } = response;

        let Some(grid) = self.store.grid(scale) else {
            // The grid aged out while this request was in flight. Drop the
            // scale's bookkeeping so a later visit starts clean instead of
            // trusting flags that described the destroyed grid.
            self.required.remove(&scale);
            self.pending.remove(&scale);
            return;
        };
        let cols = grid.cols();
        if row >= grid.rows() || col >= cols {
            return;
        }
        let idx = (row * cols + col) as usize;

        if let Some(pending) = self.pending.get_mut(&scale) {
            pending[idx] = false;
        }

        match result {
            Ok(bitmap) => {
                let still_required = self
                    .required
                    .get(&scale)
                    .is_some_and(|table| table[idx]);
                if still_required {
                    let unit = CompressionUnit::new(bitmap);
                    if let Some(grid) = self.store.grid_mut(scale) {
                        grid.put(row, col, unit.into());
                    }
                    // A grid that is not active is warmed silently; it gets
                    // republished when its scale becomes active again.
                    if self.active_scale == Some(scale) {
                        if let Some(viewport) = self.viewport {
                            self.listener.on_viewport_published(
                                viewport.rect,
                                viewport.scale,
                                self.view_size,
                            );
                        }
                    }
                } else {
                    debug!("stale bitmap for tile ({row},{col}) discarded");
                }
            }
            Err(fault) => {
                debug!("bitmap request for tile ({row},{col}) failed: {fault}");
            }
        }

        self.evict_unrequired(queue);
    }

    /// Release raw pixels of active-grid tiles that fell out of the required
    /// set, compressing first when no encoding exists yet.
    fn evict_unrequired(&mut self, queue: &TaskQueue) {
        let Some(key) = self.active_scale else {
            return;
        };
        let (Some(grid), Some(required)) = (self.store.grid(key), self.required.get(&key)) else {
            return;
        };

        let cols = grid.cols();
        for (row, col, unit) in grid.iter() {
            if required[(row * cols + col) as usize] || !unit.has_raw() {
                continue;
            }
            if unit.has_encoding() {
                unit.discard_bitmap();
            } else {
                queue.schedule_compress(unit.clone(), false, self.config.jpeg_quality);
            }
            trace!("evicting pixels of tile ({row},{col})");
        }
    }

    /// Tear the frame down: every retained grid is force-destroyed.
    pub fn destroy(&mut self) {
        self.store.destroy_all();
        self.required.clear();
        self.pending.clear();
        self.fling = None;
    }

    #[must_use]
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    #[must_use]
    pub fn active_scale(&self) -> Option<ScaleKey> {
        self.active_scale
    }

    #[must_use]
    pub fn tile_size(&self) -> Size {
        self.view_size
    }

    #[must_use]
    pub fn active_grid(&self) -> Option<&BitmapMatrix> {
        self.store.grid(self.active_scale?)
    }

    /// Active grid and listener together, for the painter's draw and
    /// inflation paths (they need both at once).
    pub(crate) fn painter_ctx(&mut self) -> (Option<&mut BitmapMatrix>, &mut dyn FrameListener) {
        let grid = match self.active_scale {
            Some(key) => self.store.grid_mut(key),
            None => None,
        };
        (grid, self.listener.as_mut())
    }

    /// Max scroll offset per axis: `content * scale - viewport`, floored at 0.
    fn scroll_extent(&self, scale: f32) -> (f32, f32) {
        let max_x = self.content_size.width as f32 * scale - self.view_size.width as f32;
        let max_y = self.content_size.height as f32 * scale - self.view_size.height as f32;
        (max_x.max(0.0), max_y.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::codec::RawBitmap;

    #[derive(Default)]
    struct Recorded {
        requests: Vec<BitmapRequest>,
        clicks: Vec<(f32, f32)>,
        published: usize,
    }

    struct TestCompositor(Rc<RefCell<Recorded>>);

    impl CompositorDelegate for TestCompositor {
        fn request_bitmap(&mut self, request: BitmapRequest) {
            self.0.borrow_mut().requests.push(request);
        }

        fn on_click(&mut self, _frame: FrameId, x: f32, y: f32) {
            self.0.borrow_mut().clicks.push((x, y));
        }
    }

    struct TestListener(Rc<RefCell<Recorded>>);

    impl FrameListener for TestListener {
        fn on_viewport_published(&mut self, _viewport: Rect, _scale: f32, _tile_size: Size) {
            self.0.borrow_mut().published += 1;
        }

        fn on_redraw_needed(&mut self) {}

        fn on_first_paint(&mut self) {}
    }

    fn test_controller(content: Size) -> (ViewportController, Rc<RefCell<Recorded>>) {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let controller = ViewportController::new(
            FrameId(1),
            content,
            Box::new(TestCompositor(Rc::clone(&recorded))),
            Box::new(TestListener(Rc::clone(&recorded))),
            FrameConfig::default(),
        );
        (controller, recorded)
    }

    fn test_bitmap(size: Size) -> RawBitmap {
        let pixels = vec![200u8; size.width as usize * size.height as usize * 4];
        RawBitmap::new(pixels, size).unwrap()
    }

    fn respond(
        controller: &mut ViewportController,
        queue: &TaskQueue,
        scale: ScaleKey,
        row: u32,
        col: u32,
    ) {
        controller.handle_bitmap_response(
            BitmapResponse {
                scale,
                row,
                col,
                result: Ok(test_bitmap(controller.tile_size())),
            },
            queue,
        );
    }

    #[test]
    fn initial_layout_fits_width_and_requests_single_tile() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        controller.set_layout_size(Size::new(400, 800));

        let viewport = controller.viewport().unwrap();
        assert!((viewport.scale() - 400.0 / 1200.0).abs() < 1e-6);

        let grid = controller.active_grid().unwrap();
        assert_eq!((grid.rows(), grid.cols()), (1, 1));
        assert_eq!(recorded.borrow().requests.len(), 1);
        assert!(recorded.borrow().published >= 1);
    }

    #[test]
    fn rapid_moves_issue_at_most_one_request_per_tile() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        controller.set_layout_size(Size::new(400, 800));
        let scale = controller.viewport().unwrap().scale();

        // Revisit the same tile repeatedly before any response lands.
        controller.move_viewport(0.0, 0.0, scale);
        controller.move_viewport(0.0, 0.0, scale);
        assert_eq!(recorded.borrow().requests.len(), 1);
    }

    #[test]
    fn scroll_beyond_left_bound_is_a_no_op() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        controller.set_layout_size(Size::new(400, 800));
        // Work at scale 1.0 so there is travel available.
        controller.move_viewport(0.0, 0.0, 1.0);
        let before = controller.viewport().unwrap().rect();
        let requests_before = recorded.borrow().requests.len();

        assert!(!controller.scroll_by(-50.0, 0.0));
        assert_eq!(controller.viewport().unwrap().rect(), before);
        assert_eq!(recorded.borrow().requests.len(), requests_before);
    }

    #[test]
    fn scroll_clamps_excess_travel() {
        let (mut controller, _) = test_controller(Size::new(1200, 2400));
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);

        // Way past the right/bottom edge; must stop exactly at the extent.
        assert!(controller.scroll_by(10_000.0, 10_000.0));
        let rect = controller.viewport().unwrap().rect();
        assert_eq!(rect.left, 1200.0 - 400.0);
        assert_eq!(rect.top, 2400.0 - 800.0);

        // Already at the bound: no further movement.
        assert!(!controller.scroll_by(5.0, 5.0));
    }

    #[test]
    fn visible_tiles_requested_before_prefetch_ring() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);

        let recorded = recorded.borrow();
        let at_one: Vec<_> = recorded
            .requests
            .iter()
            .filter(|r| r.scale == ScaleKey::from_factor(1.0))
            .collect();
        // Viewport at origin covers tile (0,0); ring adds (0,1), (1,0), (1,1).
        assert_eq!(at_one[0].row, 0);
        assert_eq!(at_one[0].col, 0);
        assert_eq!(at_one.len(), 4);
    }

    #[test]
    fn stale_response_is_discarded() {
        let (mut controller, _) = test_controller(Size::new(1200, 2400));
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let scale = ScaleKey::from_factor(1.0);

        // Scroll far enough that tile (0,0) leaves the required set.
        assert!(controller.scroll_by(0.0, 1600.0));

        respond(&mut controller, &queue, scale, 0, 0);
        assert!(controller.active_grid().unwrap().get(0, 0).is_none());
    }

    #[test]
    fn required_response_is_stored_and_republished() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let scale = ScaleKey::from_factor(1.0);
        let published_before = recorded.borrow().published;

        respond(&mut controller, &queue, scale, 0, 0);
        assert!(controller.active_grid().unwrap().get(0, 0).is_some());
        assert!(recorded.borrow().published > published_before);
    }

    #[test]
    fn failed_response_allows_re_request() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let scale = ScaleKey::from_factor(1.0);
        let requests_before = recorded.borrow().requests.len();

        controller.handle_bitmap_response(
            BitmapResponse {
                scale,
                row: 0,
                col: 0,
                result: Err(crate::compositor::RequestFault::Declined),
            },
            &queue,
        );
        assert!(controller.active_grid().unwrap().get(0, 0).is_none());

        // The next move that still requires (0,0) re-requests it.
        controller.move_viewport(0.0, 0.0, 1.0);
        assert_eq!(recorded.borrow().requests.len(), requests_before + 1);
    }

    #[test]
    fn response_for_inactive_scale_is_warmed_not_republished() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let old_scale = ScaleKey::from_factor(1.0);

        // Switch scales with the scale-1.0 request still in flight.
        controller.move_viewport(0.0, 0.0, 0.5);
        let published_before = recorded.borrow().published;

        respond(&mut controller, &queue, old_scale, 0, 0);
        // Stored for a cheap switch back, but no republish.
        assert!(
            controller
                .viewport()
                .map(|v| v.scale() == 0.5)
                .unwrap_or(false)
        );
        assert_eq!(recorded.borrow().published, published_before);

        controller.move_viewport(0.0, 0.0, 1.0);
        assert!(controller.active_grid().unwrap().get(0, 0).is_some());
    }

    #[test]
    fn aged_out_grid_re_requests_after_switching_back() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut controller = ViewportController::new(
            FrameId(1),
            Size::new(1200, 2400),
            Box::new(TestCompositor(Rc::clone(&recorded))),
            Box::new(TestListener(Rc::clone(&recorded))),
            FrameConfig {
                max_scale_grids: 1,
                ..FrameConfig::default()
            },
        );
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let scale = ScaleKey::from_factor(1.0);

        // With a cap of one, switching scales evicts the 1.0 grid while its
        // requests are still in flight.
        controller.move_viewport(0.0, 0.0, 0.5);
        respond(&mut controller, &queue, scale, 0, 0);

        // Coming back rebuilds the grid; the lost tile must be requested
        // again, not suppressed by a flag left over from the old grid.
        controller.move_viewport(0.0, 0.0, 1.0);
        let origin_requests = recorded
            .borrow()
            .requests
            .iter()
            .filter(|r| r.scale == scale && r.row == 0 && r.col == 0)
            .count();
        assert_eq!(origin_requests, 2);
    }

    #[test]
    fn off_grid_move_clears_the_required_set_and_publishes() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let scale = ScaleKey::from_factor(1.0);
        let published_before = recorded.borrow().published;

        // Unclamped move past the bottom edge: nothing on the grid is
        // visible, but the move is still published.
        controller.move_viewport(0.0, 10_000.0, 1.0);
        assert!(recorded.borrow().published > published_before);

        // The held response is now stale everywhere.
        respond(&mut controller, &queue, scale, 0, 0);
        assert!(controller.active_grid().unwrap().get(0, 0).is_none());
    }

    #[test]
    fn response_after_scrolling_away_and_back_is_kept() {
        let (mut controller, _) = test_controller(Size::new(1200, 2400));
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let scale = ScaleKey::from_factor(1.0);

        // Away and back before the response lands: required again.
        assert!(controller.scroll_by(0.0, 1600.0));
        assert!(controller.scroll_by(0.0, -1600.0));

        respond(&mut controller, &queue, scale, 0, 0);
        assert!(controller.active_grid().unwrap().get(0, 0).is_some());
    }

    #[test]
    fn eviction_releases_pixels_after_response() {
        let (mut controller, _) = test_controller(Size::new(1200, 2400));
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let scale = ScaleKey::from_factor(1.0);

        respond(&mut controller, &queue, scale, 0, 0);
        let unit = controller.active_grid().unwrap().get(0, 0).unwrap().clone();
        assert!(unit.has_raw());

        // Scroll away, then deliver any other response to trigger eviction.
        assert!(controller.scroll_by(0.0, 1600.0));
        respond(&mut controller, &queue, scale, 2, 0);

        queue.wait_idle();
        assert!(!unit.has_raw());
        assert!(unit.has_encoding());
    }

    #[test]
    fn click_maps_view_point_to_content_space() {
        let (mut controller, recorded) = test_controller(Size::new(1200, 2400));
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 0.5);
        controller.scroll_by(100.0, 200.0);

        controller.on_click(50.0, 60.0);
        let clicks = &recorded.borrow().clicks;
        assert_eq!(clicks.len(), 1);
        assert!((clicks[0].0 - (100.0 + 50.0) / 0.5).abs() < 1e-4);
        assert!((clicks[0].1 - (200.0 + 60.0) / 0.5).abs() < 1e-4);
    }

    #[test]
    fn scale_gesture_is_not_consumed() {
        let (mut controller, _) = test_controller(Size::new(1200, 2400));
        controller.set_layout_size(Size::new(400, 800));
        assert!(!controller.on_scale(2.0, 10.0, 10.0));
    }

    #[test]
    fn fling_scrolls_until_settled() {
        let (mut controller, _) = test_controller(Size::new(1200, 2400));
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);

        assert!(controller.on_fling(0.0, -3000.0));
        let mut ticks = 0;
        while controller.tick_fling(1.0 / 60.0) {
            ticks += 1;
            assert!(ticks < 10_000);
        }

        let rect = controller.viewport().unwrap().rect();
        assert!(rect.top > 0.0);
        assert!(rect.top <= 2400.0 - 800.0);
        // Settled: further ticks are no-ops.
        assert!(!controller.tick_fling(1.0 / 60.0));
    }

    #[test]
    fn destroy_releases_every_unit() {
        let (mut controller, _) = test_controller(Size::new(1200, 2400));
        let queue = TaskQueue::new();
        controller.set_layout_size(Size::new(400, 800));
        controller.move_viewport(0.0, 0.0, 1.0);
        let scale = ScaleKey::from_factor(1.0);

        respond(&mut controller, &queue, scale, 0, 0);
        let unit = controller.active_grid().unwrap().get(0, 0).unwrap().clone();

        controller.destroy();
        assert!(!unit.has_raw());
        assert!(controller.active_grid().is_none());
    }
}
