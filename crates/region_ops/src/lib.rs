//! Pixel algorithms built on the region protocol.
//!
//! Everything here walks [`tiles::PixelRegion`]s through a
//! [`tiles::RegionProcessor`] and never touches tile storage directly.

mod copy;
mod crop;

pub use copy::{clear_region, copy_region, fill_region, read_rect, write_rect};
pub use crop::{CropOutcome, alpha_bounds, crop};
