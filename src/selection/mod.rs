//! Region selection for touch-up editing
//!
//! - **Flood fill**: grows a 4-connected region of perceptually similar color
//!   from a seed pixel, measured in Lab space.

pub mod flood_fill;

pub use flood_fill::{select_region, RegionSelector};
