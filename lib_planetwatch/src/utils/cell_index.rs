//! # Planet Cell Index
//!
//! Planets span world coordinates `-8000..8000` on both the X and Z axes and
//! are divided into a 160 × 160 grid of 100-unit cells. A cell is addressed by
//! a single integer, row-major on X:
//!
//! ```text
//! cellIndex = floor((x + 8000) / 100) * 160 + floor((z + 8000) / 100)
//! ```
//!
//! The node-status cache is keyed by this index, and callers that need to
//! correlate an object position with a scene node use the same function.

#![forbid(unsafe_code)]

/// Offset that moves the planet origin to the grid corner.
pub const PLANET_HALF_EXTENT: i64 = 8000;
/// Edge length of one cell in world units.
pub const CELL_SIZE: i64 = 100;
/// Cells per grid row.
pub const CELLS_PER_ROW: i64 = 160;

/// Maps a world coordinate to its grid cell index.
///
/// Pure and total: coordinates outside the planet produce indices outside
/// `0..25600` rather than being clamped, and the arithmetic is carried out in
/// 64 bits so no `i32` input can overflow.
pub fn get_planet_cell_index(x: i32, z: i32) -> i64 {
    let column = (i64::from(x) + PLANET_HALF_EXTENT).div_euclid(CELL_SIZE);
    let row = (i64::from(z) + PLANET_HALF_EXTENT).div_euclid(CELL_SIZE);
    column * CELLS_PER_ROW + row
}
