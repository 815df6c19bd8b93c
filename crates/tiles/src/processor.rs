//! Synchronized chunk iteration over one or more pixel regions.
//!
//! The shared footprint is split into sub-rectangles that each lie inside
//! a single tile of every participating region. Chunks come out in
//! row-major order: left to right within a band, bands top to bottom.

use smallvec::SmallVec;
use tracing::debug;

use crate::{PixelRegion, TileError};

const INLINE_REGIONS: usize = 4;

#[derive(Debug)]
pub(crate) enum ChunkData<'s> {
    Read(&'s [u8]),
    Write(&'s mut [u8]),
}

/// One region's window onto the current chunk.
///
/// Rows are `rowstride` bytes apart and are not packed end to end; always
/// step through [`RegionChunk::row`] or [`RegionChunk::rowstride`].
#[derive(Debug)]
pub struct RegionChunk<'s> {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    bpp: u32,
    rowstride: usize,
    data: ChunkData<'s>,
}

impl<'s> RegionChunk<'s> {
    pub(crate) fn new(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bpp: u32,
        rowstride: usize,
        data: ChunkData<'s>,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            bpp,
            rowstride,
            data,
        }
    }

    /// Column of the chunk's first pixel in the region's backing raster.
    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
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
        self.rowstride
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.data, ChunkData::Write(_))
    }

    /// Bytes from the chunk's first pixel to the end of its last row.
    pub fn data(&self) -> &[u8] {
        match &self.data {
            ChunkData::Read(bytes) => bytes,
            ChunkData::Write(bytes) => bytes,
        }
    }

    pub fn row(&self, row: u32) -> &[u8] {
        let range = self.row_range(row);
        &self.data()[range]
    }

    pub fn row_mut(&mut self, row: u32) -> &mut [u8] {
        let range = self.row_range(row);
        match &mut self.data {
            ChunkData::Write(bytes) => &mut bytes[range],
            ChunkData::Read(_) => panic!("chunk at ({}, {}) is read-only", self.x, self.y),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.height).map(move |row| self.row(row))
    }

    /// Pixel at (`col`, `row`) relative to the chunk origin.
    pub fn pixel(&self, col: u32, row: u32) -> &[u8] {
        assert!(col < self.width, "column {col} outside chunk");
        let bpp = self.bpp as usize;
        let start = col as usize * bpp;
        &self.row(row)[start..start + bpp]
    }

    fn row_range(&self, row: u32) -> std::ops::Range<usize> {
        assert!(
            row < self.height,
            "row {row} outside chunk of height {}",
            self.height
        );
        let start = row as usize * self.rowstride;
        start..start + self.width as usize * self.bpp as usize
    }
}

/// Current position of a [`RegionProcessor`], one window per registered
/// region in registration order.
#[derive(Debug)]
pub struct Chunk<'s> {
    offset_x: u32,
    offset_y: u32,
    width: u32,
    height: u32,
    regions: SmallVec<[RegionChunk<'s>; INLINE_REGIONS]>,
}

impl<'s> Chunk<'s> {
    /// Column of this chunk relative to the shared footprint origin.
    pub fn offset_x(&self) -> u32 {
        self.offset_x
    }

    pub fn offset_y(&self) -> u32 {
        self.offset_y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn region(&self, index: usize) -> &RegionChunk<'s> {
        &self.regions[index]
    }

    pub fn region_mut(&mut self, index: usize) -> &mut RegionChunk<'s> {
        &mut self.regions[index]
    }

    pub fn regions(&self) -> &[RegionChunk<'s>] {
        &self.regions
    }

    /// All windows at once, for disjoint access by slice pattern.
    pub fn regions_mut(&mut self) -> &mut [RegionChunk<'s>] {
        &mut self.regions
    }
}

/// Drives registered regions through their common footprint.
///
/// Finite and single pass: once [`RegionProcessor::next_chunk`] returns
/// `Ok(None)` the processor stays exhausted. Dropping it early is fine.
#[derive(Debug)]
pub struct RegionProcessor<'a> {
    regions: SmallVec<[PixelRegion<'a>; INLINE_REGIONS]>,
    width: u32,
    height: u32,
    next_x: u32,
    next_y: u32,
    band_height: u32,
    exhausted: bool,
}

impl<'a> RegionProcessor<'a> {
    /// Starts a drive over `regions`. Every region must have the same width
    /// and height; a zero-area footprint yields no chunks.
    pub fn register(regions: impl IntoIterator<Item = PixelRegion<'a>>) -> Self {
        let regions: SmallVec<[PixelRegion<'a>; INLINE_REGIONS]> =
            regions.into_iter().collect();
        let first = regions
            .first()
            .expect("at least one pixel region must be registered");
        let (width, height) = (first.width(), first.height());
        for (index, region) in regions.iter().enumerate().skip(1) {
            assert!(
                region.width() == width && region.height() == height,
                "pixel region {index} footprint {}x{} differs from {width}x{height}",
                region.width(),
                region.height()
            );
        }

        debug!(
            regions = regions.len(),
            width, height, "registered pixel regions"
        );

        Self {
            regions,
            width,
            height,
            next_x: 0,
            next_y: 0,
            band_height: 0,
            exhausted: width == 0 || height == 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Advances to the next chunk. Writable regions allocate the tiles they
    /// touch, which is the only source of errors.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk<'_>>, TileError> {
        if self.exhausted {
            return Ok(None);
        }

        let offset_x = self.next_x;
        let offset_y = self.next_y;
        if offset_x == 0 {
            self.band_height = self
                .regions
                .iter()
                .map(|region| region.span_y(offset_y))
                .fold(self.height - offset_y, u32::min);
        }
        let width = self
            .regions
            .iter()
            .map(|region| region.span_x(offset_x))
            .fold(self.width - offset_x, u32::min);
        let height = self.band_height;

        // A failed window leaves the cursor in place so the chunk is retried.
        let mut regions = SmallVec::with_capacity(self.regions.len());
        for region in self.regions.iter_mut() {
            regions.push(region.chunk(offset_x, offset_y, width, height)?);
        }

        self.next_x += width;
        if self.next_x >= self.width {
            self.next_x = 0;
            self.next_y += height;
            if self.next_y >= self.height {
                self.exhausted = true;
            }
        }

        Ok(Some(Chunk {
            offset_x,
            offset_y,
            width,
            height,
            regions,
        }))
    }
}
