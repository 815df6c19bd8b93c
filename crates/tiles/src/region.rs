use model::{MAX_BPP, PixelRect, TILE_EDGE, span_to_tile_edge};

use crate::processor::{ChunkData, RegionChunk};
use crate::{TileError, TileManager};

const ZERO_TILE_LEN: usize = (TILE_EDGE * TILE_EDGE * MAX_BPP) as usize;

// Read-only regions see unallocated tiles through this buffer.
static ZERO_TILE: [u8; ZERO_TILE_LEN] = [0; ZERO_TILE_LEN];

#[derive(Debug)]
enum RegionSource<'a> {
    Tiles(&'a TileManager),
    TilesMut(&'a mut TileManager),
    Buffer { data: &'a [u8], rowstride: usize },
    BufferMut { data: &'a mut [u8], rowstride: usize },
}

/// Rectangular view into a [`TileManager`] or a plain byte buffer, driven
/// chunk by chunk through a [`crate::RegionProcessor`].
#[derive(Debug)]
pub struct PixelRegion<'a> {
    source: RegionSource<'a>,
    rect: PixelRect,
    bpp: u32,
    dirty: bool,
}

impl<'a> PixelRegion<'a> {
    /// Read-only region over `rect` of `manager`.
    pub fn new(manager: &'a TileManager, rect: PixelRect) -> Self {
        assert_rect_within(rect, manager.width(), manager.height());
        Self {
            bpp: manager.bpp(),
            source: RegionSource::Tiles(manager),
            rect,
            dirty: false,
        }
    }

    /// Writable region over `rect` of `manager`. Every tile touched through
    /// it is allocated if needed and marked dirty.
    pub fn new_dirty(manager: &'a mut TileManager, rect: PixelRect) -> Self {
        assert_rect_within(rect, manager.width(), manager.height());
        Self {
            bpp: manager.bpp(),
            source: RegionSource::TilesMut(manager),
            rect,
            dirty: true,
        }
    }

    /// Read-only region over `rect` of a row-major buffer holding a
    /// `width` x `height` raster.
    pub fn from_buffer(
        data: &'a [u8],
        width: u32,
        height: u32,
        bpp: u32,
        rowstride: usize,
        rect: PixelRect,
    ) -> Self {
        assert_buffer_layout(data.len(), width, height, bpp, rowstride);
        assert_rect_within(rect, width, height);
        Self {
            source: RegionSource::Buffer { data, rowstride },
            rect,
            bpp,
            dirty: false,
        }
    }

    pub fn from_buffer_mut(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        bpp: u32,
        rowstride: usize,
        rect: PixelRect,
    ) -> Self {
        assert_buffer_layout(data.len(), width, height, bpp, rowstride);
        assert_rect_within(rect, width, height);
        Self {
            source: RegionSource::BufferMut { data, rowstride },
            rect,
            bpp,
            dirty: true,
        }
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    pub fn width(&self) -> u32 {
        self.rect.width
    }

    pub fn height(&self) -> u32 {
        self.rect.height
    }

    pub fn bpp(&self) -> u32 {
        self.bpp
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Columns from `offset_x` (relative to the region origin) up to the
    /// next tile boundary of the backing storage.
    pub(crate) fn span_x(&self, offset_x: u32) -> u32 {
        match self.source {
            RegionSource::Tiles(_) | RegionSource::TilesMut(_) => {
                span_to_tile_edge(self.rect.x + offset_x)
            }
            RegionSource::Buffer { .. } | RegionSource::BufferMut { .. } => u32::MAX,
        }
    }

    pub(crate) fn span_y(&self, offset_y: u32) -> u32 {
        match self.source {
            RegionSource::Tiles(_) | RegionSource::TilesMut(_) => {
                span_to_tile_edge(self.rect.y + offset_y)
            }
            RegionSource::Buffer { .. } | RegionSource::BufferMut { .. } => u32::MAX,
        }
    }

    /// Positions this region on the sub-rectangle at (`offset_x`,
    /// `offset_y`) of its footprint. The sub-rectangle must not cross a tile
    /// boundary.
    pub(crate) fn chunk(
        &mut self,
        offset_x: u32,
        offset_y: u32,
        width: u32,
        height: u32,
    ) -> Result<RegionChunk<'_>, TileError> {
        let x = self.rect.x + offset_x;
        let y = self.rect.y + offset_y;
        let bpp = self.bpp as usize;
        let row_bytes = width as usize * bpp;

        let (data, rowstride) = match &mut self.source {
            RegionSource::Tiles(manager) => {
                let index = manager.pixel_cell_index(x, y);
                let (start, rowstride) = tile_window(manager, x, y);
                let end = start + (height as usize - 1) * rowstride + row_bytes;
                let bytes = match manager.cell_for_read(index) {
                    Some(tile) => &tile.data()[start..end],
                    None => &ZERO_TILE[start..end],
                };
                (ChunkData::Read(bytes), rowstride)
            }
            RegionSource::TilesMut(manager) => {
                let index = manager.pixel_cell_index(x, y);
                let (start, rowstride) = tile_window(manager, x, y);
                let end = start + (height as usize - 1) * rowstride + row_bytes;
                let tile = manager.cell_for_write(index)?;
                (ChunkData::Write(&mut tile.data_mut()[start..end]), rowstride)
            }
            RegionSource::Buffer { data, rowstride } => {
                let start = y as usize * *rowstride + x as usize * bpp;
                let end = start + (height as usize - 1) * *rowstride + row_bytes;
                (ChunkData::Read(&data[start..end]), *rowstride)
            }
            RegionSource::BufferMut { data, rowstride } => {
                let rowstride = *rowstride;
                let start = y as usize * rowstride + x as usize * bpp;
                let end = start + (height as usize - 1) * rowstride + row_bytes;
                (ChunkData::Write(&mut data[start..end]), rowstride)
            }
        };

        Ok(RegionChunk::new(x, y, width, height, self.bpp, rowstride, data))
    }
}

/// Byte offset of (`x`, `y`) inside its tile and that tile's row stride.
fn tile_window(manager: &TileManager, x: u32, y: u32) -> (usize, usize) {
    let layout = manager.layout();
    let cell = layout
        .cell_of_pixel(x, y)
        .expect("chunk origin inside manager");
    let cell_rect = layout.cell_rect(cell).expect("cell inside grid");
    let bpp = manager.bpp() as usize;
    let rowstride = cell_rect.width as usize * bpp;
    let start = (y - cell_rect.y) as usize * rowstride + (x - cell_rect.x) as usize * bpp;
    (start, rowstride)
}

fn assert_rect_within(rect: PixelRect, width: u32, height: u32) {
    assert!(
        rect.fits_within(width, height),
        "region {rect:?} exceeds raster bounds {width}x{height}"
    );
}

fn assert_buffer_layout(len: usize, width: u32, height: u32, bpp: u32, rowstride: usize) {
    assert!(
        bpp > 0 && bpp <= MAX_BPP,
        "buffer bpp {bpp} must be within 1..={MAX_BPP}"
    );
    let row_bytes = width as usize * bpp as usize;
    assert!(
        rowstride >= row_bytes,
        "buffer rowstride {rowstride} is smaller than a {width}-pixel row"
    );
    if height > 0 && width > 0 {
        let needed = (height as usize - 1) * rowstride + row_bytes;
        assert!(
            len >= needed,
            "buffer of {len} bytes is too short for {width}x{height} with rowstride {rowstride}"
        );
    }
}
