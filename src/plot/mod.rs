//! Chart rendering.
//!
//! - centered rolling mean for trend overlays (`rolling`)
//! - PNG trend charts via Plotters (`chart`)

pub mod chart;
pub mod rolling;

pub use chart::*;
pub use rolling::*;
