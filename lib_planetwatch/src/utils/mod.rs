//! # Utilities Module
//!
//! Small, dependency-free helpers shared across the crate.
//!
//! ## Contained Modules:
//!
//! - **`cell_index`**: maps planet world coordinates to the scene-cell grid
//!   index used to key node status.

#![forbid(unsafe_code)]

/// World coordinate to scene-cell grid index.
pub mod cell_index;

pub use cell_index::get_planet_cell_index;
