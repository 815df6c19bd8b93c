use static_assertions::const_assert;

pub const TILE_EDGE: u32 = 64;
pub const MAX_BPP: u32 = 16;

const_assert!(TILE_EDGE.is_power_of_two());
const_assert!(MAX_BPP > 0);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned pixel rectangle, `x..x + width` by `y..y + height`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn fits_within(self, width: u32, height: u32) -> bool {
        let Some(right) = self.x.checked_add(self.width) else {
            return false;
        };
        let Some(bottom) = self.y.checked_add(self.height) else {
            return false;
        };
        right <= width && bottom <= height
    }

    pub fn contains(self, x: u32, y: u32) -> bool {
        x.checked_sub(self.x).is_some_and(|dx| dx < self.width)
            && y.checked_sub(self.y).is_some_and(|dy| dy < self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLayoutError {
    CellOutOfBounds,
}

/// Tile grid covering a `width` x `height` raster.
///
/// Cells on the right and bottom edge are clipped to the raster, so their
/// extent can be smaller than [`TILE_EDGE`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridLayout {
    width: u32,
    height: u32,
    tiles_per_row: u32,
    tiles_per_column: u32,
}

impl GridLayout {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles_per_row: width.div_ceil(TILE_EDGE),
            tiles_per_column: height.div_ceil(TILE_EDGE),
        }
    }

    pub const fn width(self) -> u32 {
        self.width
    }

    pub const fn height(self) -> u32 {
        self.height
    }

    pub const fn tiles_per_row(self) -> u32 {
        self.tiles_per_row
    }

    pub const fn tiles_per_column(self) -> u32 {
        self.tiles_per_column
    }

    pub const fn max_tiles(self) -> usize {
        self.tiles_per_row as usize * self.tiles_per_column as usize
    }

    pub fn cell_index(&self, cell: TilePos) -> Result<usize, GridLayoutError> {
        if cell.x >= self.tiles_per_row || cell.y >= self.tiles_per_column {
            Err(GridLayoutError::CellOutOfBounds)
        } else {
            Ok(cell.y as usize * self.tiles_per_row as usize + cell.x as usize)
        }
    }

    pub fn cell_pos(&self, index: usize) -> Result<TilePos, GridLayoutError> {
        if index >= self.max_tiles() {
            Err(GridLayoutError::CellOutOfBounds)
        } else {
            let x = index % self.tiles_per_row as usize;
            let y = index / self.tiles_per_row as usize;
            Ok(TilePos {
                x: x as u32,
                y: y as u32,
            })
        }
    }

    /// Grid cell owning the pixel at (`x`, `y`).
    pub fn cell_of_pixel(&self, x: u32, y: u32) -> Result<TilePos, GridLayoutError> {
        if x >= self.width || y >= self.height {
            return Err(GridLayoutError::CellOutOfBounds);
        }
        Ok(TilePos {
            x: x / TILE_EDGE,
            y: y / TILE_EDGE,
        })
    }

    /// Pixel rectangle covered by `cell`, clipped to the raster.
    pub fn cell_rect(&self, cell: TilePos) -> Result<PixelRect, GridLayoutError> {
        self.cell_index(cell)?;
        let x = cell.x * TILE_EDGE;
        let y = cell.y * TILE_EDGE;
        Ok(PixelRect {
            x,
            y,
            width: TILE_EDGE.min(self.width - x),
            height: TILE_EDGE.min(self.height - y),
        })
    }
}

/// Distance from `coord` to the next tile boundary.
#[inline]
pub const fn span_to_tile_edge(coord: u32) -> u32 {
    TILE_EDGE - (coord & (TILE_EDGE - 1))
}
