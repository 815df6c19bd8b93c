//! Alpha cropping. Shrinks a raster to the bounding box of its pixels with
//! non-zero alpha, optionally padded by a zeroed border.
//!
//! The last channel is taken as alpha. The scan streams over the source one
//! chunk at a time, so no full copy exists before the bounds are known.

use tiles::{PixelRect, PixelRegion, RegionProcessor, TileError, TileManager};
use tracing::debug;

use crate::{clear_region, copy_region};

#[derive(Debug)]
pub enum CropOutcome<'a> {
    /// No pixel has non-zero alpha.
    Empty,
    /// The source is already tight and no border was requested. Holds the
    /// source itself, not a copy.
    Unchanged(&'a TileManager),
    Cropped(TileManager),
}

impl CropOutcome<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, CropOutcome::Empty)
    }

    pub fn manager(&self) -> Option<&TileManager> {
        match self {
            CropOutcome::Empty => None,
            CropOutcome::Unchanged(manager) => Some(*manager),
            CropOutcome::Cropped(manager) => Some(manager),
        }
    }
}

/// Bounding box of pixels whose alpha is non-zero, or `None` when there
/// are none.
pub fn alpha_bounds(source: &TileManager) -> Result<Option<PixelRect>, TileError> {
    let (width, height) = (source.width(), source.height());
    let bpp = source.bpp() as usize;
    let alpha = bpp - 1;

    let (mut x1, mut y1) = (width, height);
    let (mut x2, mut y2) = (0, 0);

    let mut processor = RegionProcessor::register([PixelRegion::new(source, source.rect())]);
    while let Some(chunk) = processor.next_chunk()? {
        let region = chunk.region(0);
        for (row, bytes) in region.rows().enumerate() {
            let y = region.y() + row as u32;
            // x bounds move on every hit; y bounds only for rows with a hit.
            let mut found = false;
            for (col, pixel) in bytes.chunks_exact(bpp).enumerate() {
                if pixel[alpha] != 0 {
                    let x = region.x() + col as u32;
                    x1 = x1.min(x);
                    x2 = x2.max(x);
                    found = true;
                }
            }
            if found {
                y1 = y1.min(y);
                y2 = y2.max(y);
            }
        }
    }

    if x1 == width && y1 == height {
        return Ok(None);
    }

    let x2 = (x2 + 1).clamp(0, width);
    let y2 = (y2 + 1).clamp(0, height);
    Ok(Some(PixelRect::new(x1, y1, x2 - x1, y2 - y1)))
}

/// Crops `source` to its alpha bounds plus `border` zeroed pixels on every
/// side. The cropped manager records the bounds origin as its offsets.
pub fn crop(source: &TileManager, border: u32) -> Result<CropOutcome<'_>, TileError> {
    let Some(bounds) = alpha_bounds(source)? else {
        debug!(
            width = source.width(),
            height = source.height(),
            "crop found no opaque pixels"
        );
        return Ok(CropOutcome::Empty);
    };

    if bounds == source.rect() && border == 0 {
        debug!(?bounds, "crop bounds cover the whole source");
        return Ok(CropOutcome::Unchanged(source));
    }

    let padding = border.checked_mul(2).ok_or(TileError::SizeOverflow)?;
    let width = bounds
        .width
        .checked_add(padding)
        .ok_or(TileError::SizeOverflow)?;
    let height = bounds
        .height
        .checked_add(padding)
        .ok_or(TileError::SizeOverflow)?;
    let offset_x = i32::try_from(bounds.x).map_err(|_| TileError::SizeOverflow)?;
    let offset_y = i32::try_from(bounds.y).map_err(|_| TileError::SizeOverflow)?;

    let mut cropped = TileManager::new(width, height, source.bpp())?;
    if border > 0 {
        for strip in border_strips(width, height, border) {
            clear_region(PixelRegion::new_dirty(&mut cropped, strip))?;
        }
    }
    copy_region(
        PixelRegion::new(source, bounds),
        PixelRegion::new_dirty(
            &mut cropped,
            PixelRect::new(border, border, bounds.width, bounds.height),
        ),
    )?;
    cropped.set_offsets(offset_x, offset_y);

    debug!(?bounds, border, width, height, "cropped tile manager");
    Ok(CropOutcome::Cropped(cropped))
}

/// Top, left, right and bottom strips of a `border`-wide frame.
fn border_strips(width: u32, height: u32, border: u32) -> [PixelRect; 4] {
    let inner_height = height - 2 * border;
    [
        PixelRect::new(0, 0, width, border),
        PixelRect::new(0, border, border, inner_height),
        PixelRect::new(width - border, border, border, inner_height),
        PixelRect::new(0, height - border, width, border),
    ]
}
