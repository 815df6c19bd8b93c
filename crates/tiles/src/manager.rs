use std::sync::Arc;

use bitvec::prelude::{BitVec, Lsb0};
use model::{GridLayout, MAX_BPP, PixelRect, TilePos};
use static_assertions::assert_impl_all;
use tracing::{debug, trace};

use crate::{Tile, TileError};

/// Sparse grid of tiles backing one logical `width` x `height` raster.
///
/// Tiles are allocated zero-filled the first time they are written or
/// requested through [`TileManager::get_tile`]. Cloning a manager shares
/// every allocated tile; the first write to a shared tile detaches it.
#[derive(Debug, Clone)]
pub struct TileManager {
    layout: GridLayout,
    bpp: u32,
    offset_x: i32,
    offset_y: i32,
    // tiles.len() == layout.max_tiles() == dirty_bits.len()
    tiles: Box<[Option<Arc<Tile>>]>,
    dirty_bits: BitVec<usize, Lsb0>,
    dirty_count: usize,
    #[cfg(test)]
    injected_allocation_failures: u32,
}

assert_impl_all!(TileManager: Send, Sync, Clone);

impl TileManager {
    pub fn new(width: u32, height: u32, bpp: u32) -> Result<Self, TileError> {
        if width == 0 || height == 0 {
            return Err(TileError::InvalidDimensions { width, height });
        }
        if bpp == 0 || bpp > MAX_BPP {
            return Err(TileError::UnsupportedBpp { bpp, max: MAX_BPP });
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(bpp as usize))
            .ok_or(TileError::SizeOverflow)?;

        let layout = GridLayout::new(width, height);
        let max_tiles = layout.max_tiles();
        let mut tiles = Vec::new();
        tiles
            .try_reserve_exact(max_tiles)
            .map_err(|_| TileError::AllocationFailed {
                bytes: max_tiles * size_of::<Option<Arc<Tile>>>(),
            })?;
        tiles.resize_with(max_tiles, || None);

        debug!(
            width,
            height,
            bpp,
            tiles_per_row = layout.tiles_per_row(),
            tiles_per_column = layout.tiles_per_column(),
            "created tile manager"
        );

        Ok(Self {
            layout,
            bpp,
            offset_x: 0,
            offset_y: 0,
            tiles: tiles.into_boxed_slice(),
            dirty_bits: BitVec::repeat(false, max_tiles),
            dirty_count: 0,
            #[cfg(test)]
            injected_allocation_failures: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.layout.width()
    }

    pub fn height(&self) -> u32 {
        self.layout.height()
    }

    pub fn bpp(&self) -> u32 {
        self.bpp
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn rect(&self) -> PixelRect {
        PixelRect::from_size(self.width(), self.height())
    }

    /// Records where this raster sits in a parent coordinate space.
    /// Not interpreted by the manager.
    pub fn set_offsets(&mut self, x: i32, y: i32) {
        self.offset_x = x;
        self.offset_y = y;
    }

    pub fn offsets(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    /// Shared handle to the tile owning pixel (`x`, `y`), allocating it on
    /// first access.
    pub fn get_tile(&mut self, x: u32, y: u32) -> Result<Arc<Tile>, TileError> {
        let index = self.pixel_cell_index(x, y);
        self.ensure_allocated(index)?;
        Ok(Arc::clone(
            self.tiles[index]
                .as_ref()
                .expect("tile slot allocated above"),
        ))
    }

    /// Exclusive access to the tile owning pixel (`x`, `y`). The tile is
    /// allocated or detached from other handles as needed and marked dirty.
    pub fn get_tile_mut(&mut self, x: u32, y: u32) -> Result<&mut Tile, TileError> {
        let index = self.pixel_cell_index(x, y);
        self.cell_for_write(index)
    }

    /// Allocated tile at grid cell `cell`, if any. Never allocates.
    pub fn tile_at(&self, cell: TilePos) -> Option<&Arc<Tile>> {
        let index = self.layout.cell_index(cell).ok()?;
        self.tiles[index].as_ref()
    }

    pub fn allocated_tile_count(&self) -> usize {
        self.tiles.iter().filter(|slot| slot.is_some()).count()
    }

    /// Bytes held by allocated tile buffers. Shared tiles are counted once
    /// per manager referencing them.
    pub fn memsize(&self) -> usize {
        self.tiles
            .iter()
            .flatten()
            .map(|tile| tile.data().len())
            .sum()
    }

    pub fn is_tile_dirty(&self, cell: TilePos) -> bool {
        self.layout
            .cell_index(cell)
            .map(|index| self.dirty_bits[index])
            .unwrap_or(false)
    }

    pub fn dirty_tile_count(&self) -> usize {
        self.dirty_count
    }

    pub fn iter_dirty_tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.dirty_bits.iter_ones().map(|index| {
            self.layout
                .cell_pos(index)
                .expect("dirty bit index within grid")
        })
    }

    pub fn clear_dirty(&mut self) {
        self.dirty_bits.fill(false);
        self.dirty_count = 0;
    }

    /// Copies the pixel at (`x`, `y`) into `out`. Unallocated tiles read as
    /// zero.
    pub fn read_pixel(&self, x: u32, y: u32, out: &mut [u8]) {
        assert_eq!(
            out.len(),
            self.bpp as usize,
            "pixel buffer length must equal bpp"
        );
        let index = self.pixel_cell_index(x, y);
        match &self.tiles[index] {
            Some(tile) => {
                let (local_x, local_y) = (x % model::TILE_EDGE, y % model::TILE_EDGE);
                out.copy_from_slice(tile.pixel(local_x, local_y));
            }
            None => out.fill(0),
        }
    }

    pub fn write_pixel(&mut self, x: u32, y: u32, pixel: &[u8]) -> Result<(), TileError> {
        assert_eq!(
            pixel.len(),
            self.bpp as usize,
            "pixel buffer length must equal bpp"
        );
        let tile = self.get_tile_mut(x, y)?;
        tile.pixel_mut(x % model::TILE_EDGE, y % model::TILE_EDGE)
            .copy_from_slice(pixel);
        Ok(())
    }

    pub(crate) fn cell_for_read(&self, index: usize) -> Option<&Tile> {
        self.tiles[index].as_deref()
    }

    pub(crate) fn cell_for_write(&mut self, index: usize) -> Result<&mut Tile, TileError> {
        self.ensure_allocated(index)?;
        self.mark_dirty(index);
        let slot = self.tiles[index]
            .as_mut()
            .expect("tile slot allocated above");
        if Arc::strong_count(slot) > 1 {
            trace!(index, "detaching shared tile before write");
        }
        Ok(Arc::make_mut(slot))
    }

    pub(crate) fn pixel_cell_index(&self, x: u32, y: u32) -> usize {
        let cell = self.layout.cell_of_pixel(x, y).unwrap_or_else(|_| {
            panic!(
                "pixel ({x}, {y}) is outside tile manager {}x{}",
                self.width(),
                self.height()
            )
        });
        self.layout
            .cell_index(cell)
            .expect("cell of in-bounds pixel is within grid")
    }

    fn ensure_allocated(&mut self, index: usize) -> Result<(), TileError> {
        if self.tiles[index].is_some() {
            return Ok(());
        }
        let cell = self
            .layout
            .cell_pos(index)
            .expect("tile index within grid");
        let rect = self
            .layout
            .cell_rect(cell)
            .expect("cell position within grid");
        #[cfg(test)]
        if self.injected_allocation_failures > 0 {
            self.injected_allocation_failures -= 1;
            return Err(TileError::AllocationFailed {
                bytes: rect.width as usize * rect.height as usize * self.bpp as usize,
            });
        }
        let tile = Tile::zeroed(rect.width, rect.height, self.bpp)?;
        trace!(
            tile_x = cell.x,
            tile_y = cell.y,
            width = rect.width,
            height = rect.height,
            "allocated tile"
        );
        self.tiles[index] = Some(Arc::new(tile));
        Ok(())
    }

    /// Makes the next `count` tile allocations fail.
    #[cfg(test)]
    pub(crate) fn inject_allocation_failures(&mut self, count: u32) {
        self.injected_allocation_failures = count;
    }

    fn mark_dirty(&mut self, index: usize) {
        if !self.dirty_bits[index] {
            self.dirty_bits.set(index, true);
            self.dirty_count += 1;
        }
    }
}
