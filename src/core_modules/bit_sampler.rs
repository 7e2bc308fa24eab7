// THEORY:
// The bit sampler quantizes the matrix into its 64-bit symbol. Each of the 8x8
// grid cells becomes one bit: 1 when any blob center falls inside the cell, 0
// otherwise. Cells are visited row-major (rows top to bottom, columns left to
// right), so bit `8 * row + col` is the LED at that position.
//
// Timing contract: every cell tests every center, even after a hit. A frame
// with many blobs costs the same whether the first center matches or the last,
// which keeps per-frame latency measurements comparable across symbols. Hits are
// therefore folded with a non-short-circuiting `|`.
//
// Cell edges are inclusive on both sides. A center lying exactly on the edge
// between two cells sets both bits. This is the reference sampling behavior and
// is kept as is.

use crate::config::{FRAME_BITS, GRID_DIM};
use crate::core_modules::grid_estimator::Grid;
use crate::core_modules::led_blob::Point;
use std::fmt;

/// 64 sampled bits. Bit 0 (first sampled) is stored in the most significant position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bitstream(u64);

impl Bitstream {
    pub fn from_bits(bits: &[bool; FRAME_BITS]) -> Self {
        let word = bits
            .iter()
            .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit));
        Bitstream(word)
    }

    /// Wraps a packed word, bit 0 in the most significant position.
    pub const fn from_word(word: u64) -> Self {
        Bitstream(word)
    }

    pub const fn word(&self) -> u64 {
        self.0
    }

    /// Bit `index` in sampling order.
    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < FRAME_BITS);
        (self.0 >> (FRAME_BITS - 1 - index)) & 1 == 1
    }

    /// The `index`-th byte in sampling order, most significant bit first.
    pub fn byte(&self, index: usize) -> u8 {
        debug_assert!(index < FRAME_BITS / 8);
        (self.0 >> (FRAME_BITS - 8 * (index + 1))) as u8
    }

    pub fn count_ones(&self) -> u32 {
        self.0.count_ones()
    }
}

impl fmt::Display for Bitstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:064b}", self.0)
    }
}

/// Samples the grid against blob centers.
pub fn sample_bits(grid: &Grid, centers: &[Point]) -> Bitstream {
    let mut bits = [false; FRAME_BITS];
    for row in 0..GRID_DIM {
        for col in 0..GRID_DIM {
            let cell = grid.cell(row, col);
            bits[row * GRID_DIM + col] = centers
                .iter()
                .fold(false, |hit, c| hit | cell.contains(c.x, c.y));
        }
    }
    Bitstream::from_bits(&bits)
}
