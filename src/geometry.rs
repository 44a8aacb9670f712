//! Content-space and view-space geometry
//!
//! All rectangles are axis-aligned. Content space is measured in post-scale
//! pixels; view space is the device-visible surface. The visible tile range
//! math lives here so the viewport controller and the bitmap painter cannot
//! drift apart.

/// Integer pixel dimensions of a tile or surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in content-space pixels.
///
/// Origin is mutable (the viewport scrolls); width and height stay fixed once
/// layout is established.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Offset the origin in place.
    pub fn offset(&mut self, dx: f32, dy: f32) {
        self.left += dx;
        self.top += dy;
    }

    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }

    /// Intersection of two rects, or `None` when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left < right && top < bottom {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }
}

/// Inclusive range of tile rows and columns intersecting a rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileRange {
    pub row_start: u32,
    pub row_end: u32,
    pub col_start: u32,
    pub col_end: u32,
}

impl TileRange {
    /// Tiles of `tile_size` intersecting `rect`, clamped to a grid of
    /// `rows` x `cols`. Returns `None` when the rect misses the grid
    /// entirely or either input is degenerate.
    #[must_use]
    pub fn covering(rect: &Rect, tile_size: Size, rows: u32, cols: u32) -> Option<TileRange> {
        if tile_size.is_empty() || rows == 0 || cols == 0 {
            return None;
        }
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return None;
        }

        let tile_w = tile_size.width as f32;
        let tile_h = tile_size.height as f32;

        if rect.right() <= 0.0 || rect.bottom() <= 0.0 {
            return None;
        }
        if rect.left >= cols as f32 * tile_w || rect.top >= rows as f32 * tile_h {
            return None;
        }

        let row_start = (rect.top.max(0.0) / tile_h).floor() as u32;
        let col_start = (rect.left.max(0.0) / tile_w).floor() as u32;
        // ceil - 1 gives the last intersecting tile; guard exact boundaries
        // where ceil lands on the edge.
        let row_end = ((rect.bottom() / tile_h).ceil() as u32).clamp(row_start + 1, rows) - 1;
        let col_end = ((rect.right() / tile_w).ceil() as u32).clamp(col_start + 1, cols) - 1;

        Some(TileRange {
            row_start,
            row_end,
            col_start,
            col_end,
        })
    }

    /// Expand by one ring of adjacent tiles, staying inside the grid.
    #[must_use]
    pub fn expanded(&self, ring: u32, rows: u32, cols: u32) -> TileRange {
        TileRange {
            row_start: self.row_start.saturating_sub(ring),
            col_start: self.col_start.saturating_sub(ring),
            row_end: (self.row_end + ring).min(rows.saturating_sub(1)),
            col_end: (self.col_end + ring).min(cols.saturating_sub(1)),
        }
    }

    #[must_use]
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.row_start && row <= self.row_end && col >= self.col_start && col <= self.col_end
    }

    /// Iterate (row, col) pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let cols = self.col_start..=self.col_end;
        (self.row_start..=self.row_end)
            .flat_map(move |row| cols.clone().map(move |col| (row, col)))
    }
}

/// Grid dimensions for content of `content_size` at `scale`, tiled by
/// `tile_size`: `rows = ceil(h * scale / tile_h)`, `cols = ceil(w * scale / tile_w)`.
#[must_use]
pub fn grid_dimensions(content_size: Size, scale: f32, tile_size: Size) -> (u32, u32) {
    if tile_size.is_empty() || content_size.is_empty() || scale <= 0.0 {
        return (0, 0);
    }
    let rows = (content_size.height as f32 * scale / tile_size.height as f32).ceil() as u32;
    let cols = (content_size.width as f32 * scale / tile_size.width as f32).ceil() as u32;
    (rows.max(1), cols.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_covers_intersecting_tiles_only() {
        // 4x4 grid of 100x100 tiles, viewport straddling tiles (1,1)..(2,2).
        let rect = Rect::new(150.0, 150.0, 200.0, 200.0);
        let range = TileRange::covering(&rect, Size::new(100, 100), 4, 4).unwrap();
        assert_eq!(range.row_start, 1);
        assert_eq!(range.col_start, 1);
        assert_eq!(range.row_end, 3);
        assert_eq!(range.col_end, 3);
    }

    #[test]
    fn range_exact_tile_boundary_excludes_next_tile() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let range = TileRange::covering(&rect, Size::new(100, 100), 4, 4).unwrap();
        assert_eq!(range, TileRange { row_start: 0, row_end: 0, col_start: 0, col_end: 0 });
    }

    #[test]
    fn range_clamps_to_grid_extent() {
        let rect = Rect::new(350.0, 350.0, 500.0, 500.0);
        let range = TileRange::covering(&rect, Size::new(100, 100), 4, 4).unwrap();
        assert_eq!(range.row_start, 3);
        assert_eq!(range.row_end, 3);
        assert_eq!(range.col_start, 3);
        assert_eq!(range.col_end, 3);
    }

    #[test]
    fn range_outside_grid_is_none() {
        let rect = Rect::new(500.0, 0.0, 100.0, 100.0);
        assert!(TileRange::covering(&rect, Size::new(100, 100), 4, 4).is_none());

        let negative = Rect::new(-200.0, -200.0, 100.0, 100.0);
        assert!(TileRange::covering(&negative, Size::new(100, 100), 4, 4).is_none());
    }

    #[test]
    fn expanded_ring_stays_inside_grid() {
        let range = TileRange { row_start: 0, row_end: 1, col_start: 0, col_end: 1 };
        let ring = range.expanded(1, 3, 3);
        assert_eq!(ring, TileRange { row_start: 0, row_end: 2, col_start: 0, col_end: 2 });
    }

    #[test]
    fn grid_dimensions_round_up() {
        // Startup scenario: 1200x2400 content, 400x800 viewport, scale 1/3.
        let scale = 400.0 / 1200.0;
        let (rows, cols) = grid_dimensions(Size::new(1200, 2400), scale, Size::new(400, 800));
        assert_eq!(rows, 1);
        assert_eq!(cols, 1);

        let (rows, cols) = grid_dimensions(Size::new(1200, 2400), 1.0, Size::new(400, 800));
        assert_eq!(rows, 3);
        assert_eq!(cols, 3);
    }

    #[test]
    fn intersection_and_disjoint() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 100.0, 100.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Rect::new(50.0, 50.0, 50.0, 50.0));

        let c = Rect::new(200.0, 200.0, 10.0, 10.0);
        assert!(a.intersection(&c).is_none());
        assert!(!a.intersects(&c));
    }

    #[test]
    fn range_iter_is_row_major() {
        let range = TileRange { row_start: 0, row_end: 1, col_start: 1, col_end: 2 };
        let tiles: Vec<_> = range.iter().collect();
        assert_eq!(tiles, vec![(0, 1), (0, 2), (1, 1), (1, 2)]);
    }
}
