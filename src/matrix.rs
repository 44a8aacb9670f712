//! Per-scale tile grids
//!
//! A `BitmapMatrix` is a fixed-dimension 2D grid of compression units for one
//! scale factor. Grids for previously visited scales are retained so a scale
//! switch back is cheap, but the store caps how many are kept with an LRU
//! policy; the active scale is promoted on every switch so it is never the
//! victim.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::geometry::Size;
use crate::scale::ScaleKey;
use crate::unit::CompressionUnit;

/// Fixed 2D grid of compression units for one scale.
pub struct BitmapMatrix {
    rows: u32,
    cols: u32,
    tile_size: Size,
    units: Vec<Option<Arc<CompressionUnit>>>,
}

impl BitmapMatrix {
    /// Create an empty grid. Dimensions never change after creation.
    #[must_use]
    pub fn new(rows: u32, cols: u32, tile_size: Size) -> Self {
        Self {
            rows,
            cols,
            tile_size,
            units: vec![None; (rows as usize) * (cols as usize)],
        }
    }

    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    #[must_use]
    pub fn tile_size(&self) -> Size {
        self.tile_size
    }

    fn index(&self, row: u32, col: u32) -> Option<usize> {
        (row < self.rows && col < self.cols)
            .then(|| (row as usize) * (self.cols as usize) + col as usize)
    }

    #[must_use]
    pub fn get(&self, row: u32, col: u32) -> Option<&Arc<CompressionUnit>> {
        self.index(row, col).and_then(|i| self.units[i].as_ref())
    }

    /// Store a unit at (row, col), replacing and returning any previous one.
    pub fn put(
        &mut self,
        row: u32,
        col: u32,
        unit: Arc<CompressionUnit>,
    ) -> Option<Arc<CompressionUnit>> {
        let i = self.index(row, col)?;
        self.units[i].replace(unit)
    }

    pub fn remove(&mut self, row: u32, col: u32) -> Option<Arc<CompressionUnit>> {
        let i = self.index(row, col)?;
        self.units[i].take()
    }

    /// Occupied cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &Arc<CompressionUnit>)> + '_ {
        self.units.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .map(|unit| (i as u32 / self.cols, i as u32 % self.cols, unit))
        })
    }

    /// Destroy every unit's buffers. `force` bypasses the in-use latch and is
    /// reserved for frame teardown.
    pub fn destroy_all(&mut self, force: bool) {
        for slot in self.units.iter_mut() {
            if let Some(unit) = slot.take() {
                if force {
                    unit.force_destroy();
                } else {
                    unit.destroy();
                }
            }
        }
    }
}

/// Lazily created grids keyed by quantized scale.
pub struct TileStore {
    grids: LruCache<ScaleKey, BitmapMatrix>,
}

impl TileStore {
    #[must_use]
    pub fn new(max_scale_grids: usize) -> Self {
        Self {
            grids: LruCache::new(NonZeroUsize::new(max_scale_grids).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Look up the grid for `scale`, creating it with the given dimensions if
    /// absent. A retained grid whose geometry no longer matches (the layout
    /// was resized) is torn down and rebuilt. Promotes the grid so the active
    /// scale never ages out; a grid evicted by the cap has all its units
    /// destroyed. Returns whether a fresh grid was created, so callers can
    /// reset any per-cell bookkeeping that described the old one.
    pub fn ensure_grid(&mut self, scale: ScaleKey, rows: u32, cols: u32, tile_size: Size) -> bool {
        let stale = self.grids.peek(&scale).is_some_and(|grid| {
            grid.rows() != rows || grid.cols() != cols || grid.tile_size() != tile_size
        });
        if stale {
            if let Some(mut old) = self.grids.pop(&scale) {
                old.destroy_all(false);
            }
        }
        if self.grids.contains(&scale) {
            // Promote.
            let _ = self.grids.get_mut(&scale);
            false
        } else {
            if let Some((_, mut evicted)) =
                self.grids.push(scale, BitmapMatrix::new(rows, cols, tile_size))
            {
                evicted.destroy_all(false);
            }
            true
        }
    }

    #[must_use]
    pub fn grid(&self, scale: ScaleKey) -> Option<&BitmapMatrix> {
        self.grids.peek(&scale)
    }

    pub fn grid_mut(&mut self, scale: ScaleKey) -> Option<&mut BitmapMatrix> {
        self.grids.peek_mut(&scale)
    }

    /// Force-destroy everything across all retained scales. Teardown only.
    pub fn destroy_all(&mut self) {
        for (_, grid) in self.grids.iter_mut() {
            grid.destroy_all(true);
        }
        self.grids.clear();
    }
}
