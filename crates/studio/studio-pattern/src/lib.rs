//! `studio-pattern`: synthetic media sources for the avbus rings.
//!
//! - [`PatternHooks`]: a filter that paints a bouncing shaded ball and mixes
//!   a chirp into the audio slot on every bounce.
//! - [`shapes`]: the rasterization helpers the pattern draws with.
//! - [`add_rect`]: frame partitioning so several sources can share one ring
//!   with disjoint ROIs.

pub mod shapes;

mod bounce;
mod partition;

pub use bounce::PatternHooks;
pub use partition::add_rect;
