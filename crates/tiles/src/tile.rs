use std::sync::Arc;

use crate::TileError;

/// Fixed-size block of row-major pixel data.
///
/// Dimensions never change after allocation. Edge tiles of a manager are
/// clipped to the raster and can be narrower or shorter than
/// [`model::TILE_EDGE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    width: u32,
    height: u32,
    bpp: u32,
    data: Box<[u8]>,
}

impl Tile {
    pub(crate) fn zeroed(width: u32, height: u32, bpp: u32) -> Result<Self, TileError> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(bpp as usize))
            .ok_or(TileError::SizeOverflow)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| TileError::AllocationFailed { bytes: len })?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            bpp,
            data: data.into_boxed_slice(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bpp(&self) -> u32 {
        self.bpp
    }

    pub fn rowstride(&self) -> usize {
        self.width as usize * self.bpp as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let offset = self.pixel_offset(x, y);
        &self.data[offset..offset + self.bpp as usize]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let offset = self.pixel_offset(x, y);
        let bpp = self.bpp as usize;
        &mut self.data[offset..offset + bpp]
    }

    /// Number of live handles to this tile, counting the owning grid slot.
    pub fn ref_count(this: &Arc<Tile>) -> usize {
        Arc::strong_count(this)
    }

    pub(crate) fn pixel_offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) is outside tile {}x{}",
            self.width,
            self.height
        );
        y as usize * self.rowstride() + x as usize * self.bpp as usize
    }
}
