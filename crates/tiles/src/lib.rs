//! Tiled raster storage.
//!
//! A [`TileManager`] owns a sparse grid of [`Tile`]s. Pixel algorithms do
//! not index tiles directly: they bind [`PixelRegion`]s to rectangles and
//! walk them through a [`RegionProcessor`], which hands out one
//! tile-aligned [`Chunk`] at a time.

mod manager;
mod processor;
mod region;
mod tile;

#[cfg(any(test, feature = "test-helpers"))]
mod test_helpers;

pub use manager::TileManager;
pub use model::{GridLayout, MAX_BPP, PixelRect, TILE_EDGE, TilePos};
pub use processor::{Chunk, RegionChunk, RegionProcessor};
pub use region::PixelRegion;
pub use tile::Tile;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{manager_from_fn, raster_bytes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TileError {
    #[error("tile manager dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("bytes per pixel must be within 1..={max}, got {bpp}")]
    UnsupportedBpp { bpp: u32, max: u32 },
    #[error("failed to allocate {bytes} bytes of tile storage")]
    AllocationFailed { bytes: usize },
    #[error("raster byte size overflows the address space")]
    SizeOverflow,
}

#[cfg(test)]
mod tests;
