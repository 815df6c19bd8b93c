use tiles::{PixelRect, PixelRegion, RegionProcessor, TileError, TileManager};
use tracing::trace;

/// Copies every pixel of `src` into `dst`. Both regions must share a
/// footprint and bytes per pixel, and `dst` must be writable.
pub fn copy_region(src: PixelRegion<'_>, dst: PixelRegion<'_>) -> Result<(), TileError> {
    assert_eq!(
        src.bpp(),
        dst.bpp(),
        "copy_region requires matching bytes per pixel"
    );
    assert!(dst.is_dirty(), "copy_region destination must be writable");
    trace!(src = ?src.rect(), dst = ?dst.rect(), "copy region");

    let mut processor = RegionProcessor::register([src, dst]);
    while let Some(mut chunk) = processor.next_chunk()? {
        let [src, dst] = chunk.regions_mut() else {
            unreachable!("two regions registered");
        };
        for row in 0..src.height() {
            dst.row_mut(row).copy_from_slice(src.row(row));
        }
    }
    Ok(())
}

/// Zero-fills `dst`.
pub fn clear_region(dst: PixelRegion<'_>) -> Result<(), TileError> {
    assert!(dst.is_dirty(), "clear_region destination must be writable");
    let mut processor = RegionProcessor::register([dst]);
    while let Some(mut chunk) = processor.next_chunk()? {
        let region = chunk.region_mut(0);
        for row in 0..region.height() {
            region.row_mut(row).fill(0);
        }
    }
    Ok(())
}

/// Sets every pixel of `dst` to `pixel`.
pub fn fill_region(dst: PixelRegion<'_>, pixel: &[u8]) -> Result<(), TileError> {
    assert!(dst.is_dirty(), "fill_region destination must be writable");
    assert_eq!(
        pixel.len(),
        dst.bpp() as usize,
        "fill pixel length must equal bpp"
    );
    let mut processor = RegionProcessor::register([dst]);
    while let Some(mut chunk) = processor.next_chunk()? {
        let region = chunk.region_mut(0);
        for row in 0..region.height() {
            for target in region.row_mut(row).chunks_exact_mut(pixel.len()) {
                target.copy_from_slice(pixel);
            }
        }
    }
    Ok(())
}

/// Packed row-major copy of `rect` out of `manager`.
pub fn read_rect(manager: &TileManager, rect: PixelRect) -> Result<Vec<u8>, TileError> {
    let bpp = manager.bpp();
    let rowstride = rect.width as usize * bpp as usize;
    let len = rowstride
        .checked_mul(rect.height as usize)
        .ok_or(TileError::SizeOverflow)?;
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|_| TileError::AllocationFailed { bytes: len })?;
    out.resize(len, 0);

    copy_region(
        PixelRegion::new(manager, rect),
        PixelRegion::from_buffer_mut(
            &mut out,
            rect.width,
            rect.height,
            bpp,
            rowstride,
            PixelRect::from_size(rect.width, rect.height),
        ),
    )?;
    Ok(out)
}

/// Writes packed row-major `bytes` into `rect` of `manager`.
pub fn write_rect(
    manager: &mut TileManager,
    rect: PixelRect,
    bytes: &[u8],
) -> Result<(), TileError> {
    let bpp = manager.bpp();
    let rowstride = rect.width as usize * bpp as usize;
    copy_region(
        PixelRegion::from_buffer(
            bytes,
            rect.width,
            rect.height,
            bpp,
            rowstride,
            PixelRect::from_size(rect.width, rect.height),
        ),
        PixelRegion::new_dirty(manager, rect),
    )
}
