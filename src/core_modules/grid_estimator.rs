// THEORY:
// The grid estimator recovers the geometry of the 8x8 LED matrix from the scattered
// blobs of a single frame. The transmitter keeps its corner LEDs lit, so the
// extreme blob origins along each axis mark the first and last column and row.
// Dividing the spans by 7 gives the cell pitch.
//
// Key architectural principles:
// 1.  **Origins, Not Centers**: Extremes are taken over bounding-box origins
//     (top-left corners). Sampling later tests blob *centers* against cells that
//     start at those origins, so a cell extends from an LED's top-left corner by
//     one pitch and comfortably contains that LED's center.
// 2.  **Persist-Last-Good-Value**: A frame in which no blob survives the size
//     filter (motion blur, the LED array between two symbols, a degenerate crop)
//     reuses the previous grid verbatim. The previous grid is passed in
//     explicitly by its owner, the decoder instance. There is no ambient state.
// 3.  **Cold Start Is Surfaced**: With no blobs and no previous grid there is
//     nothing to fall back on. The estimate says so and the frame is skipped.

use crate::config::GRID_DIM;
use crate::core_modules::led_blob::LedBlob;

/// Sampling geometry of the LED matrix inside a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

/// A closed rectangle `[left, right] x [top, bottom]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Cell {
    /// Inclusive on all four edges, so a point on a shared edge belongs to both cells.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.left <= x && x <= self.right && self.top <= y && y <= self.bottom
    }
}

impl Grid {
    /// Derives the grid from blob origins. `None` for an empty slice.
    pub fn from_blobs(blobs: &[LedBlob]) -> Option<Grid> {
        let first = blobs.first()?;
        let mut grid = Grid {
            xmin: first.x as f64,
            xmax: first.x as f64,
            ymin: first.y as f64,
            ymax: first.y as f64,
        };
        for blob in &blobs[1..] {
            grid.xmin = grid.xmin.min(blob.x as f64);
            grid.xmax = grid.xmax.max(blob.x as f64);
            grid.ymin = grid.ymin.min(blob.y as f64);
            grid.ymax = grid.ymax.max(blob.y as f64);
        }
        Some(grid)
    }

    /// Horizontal cell pitch, `(xmax - xmin) / 7`.
    pub fn dx(&self) -> f64 {
        (self.xmax - self.xmin) / (GRID_DIM - 1) as f64
    }

    /// Vertical cell pitch, `(ymax - ymin) / 7`.
    pub fn dy(&self) -> f64 {
        (self.ymax - self.ymin) / (GRID_DIM - 1) as f64
    }

    /// The sampling cell at `row`, `col`.
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        let dx = self.dx();
        let dy = self.dy();
        let left = self.xmin + col as f64 * dx;
        let top = self.ymin + row as f64 * dy;
        Cell {
            left,
            right: left + dx,
            top,
            bottom: top + dy,
        }
    }
}

/// Outcome of grid estimation for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridEstimate {
    /// Derived from this frame's blobs.
    Fresh(Grid),
    /// No blobs this frame; the previous grid was reused.
    Stale(Grid),
    /// No blobs and no previous grid.
    Unavailable,
}

impl GridEstimate {
    pub fn grid(&self) -> Option<Grid> {
        match self {
            GridEstimate::Fresh(grid) | GridEstimate::Stale(grid) => Some(*grid),
            GridEstimate::Unavailable => None,
        }
    }
}

/// Derives the grid for this frame, falling back to `previous` when `blobs` is empty.
pub fn estimate_grid(blobs: &[LedBlob], previous: Option<&Grid>) -> GridEstimate {
    match Grid::from_blobs(blobs) {
        Some(grid) => GridEstimate::Fresh(grid),
        None => match previous {
            Some(grid) => GridEstimate::Stale(*grid),
            None => GridEstimate::Unavailable,
        },
    }
}
