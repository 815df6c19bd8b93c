use crate::{PixelRect, PixelRegion, RegionProcessor, TileManager};

/// Builds a manager whose pixel at (x, y) is produced by `pixel`.
pub fn manager_from_fn(
    width: u32,
    height: u32,
    bpp: u32,
    mut pixel: impl FnMut(u32, u32, &mut [u8]),
) -> TileManager {
    let mut manager = TileManager::new(width, height, bpp).expect("TileManager::new");
    let rect = manager.rect();
    let mut processor = RegionProcessor::register([PixelRegion::new_dirty(&mut manager, rect)]);
    let bpp = bpp as usize;
    while let Some(mut chunk) = processor.next_chunk().expect("next_chunk") {
        let region = chunk.region_mut(0);
        let (x0, y0, width) = (region.x(), region.y(), region.width());
        for row in 0..region.height() {
            let bytes = region.row_mut(row);
            for col in 0..width {
                let start = col as usize * bpp;
                pixel(x0 + col, y0 + row, &mut bytes[start..start + bpp]);
            }
        }
    }
    drop(processor);
    manager.clear_dirty();
    manager
}

/// Packed row-major copy of `rect`, read pixel by pixel.
pub fn raster_bytes(manager: &TileManager, rect: PixelRect) -> Vec<u8> {
    let bpp = manager.bpp() as usize;
    let mut out = vec![0; rect.width as usize * rect.height as usize * bpp];
    for y in 0..rect.height {
        for x in 0..rect.width {
            let start = (y as usize * rect.width as usize + x as usize) * bpp;
            manager.read_pixel(rect.x + x, rect.y + y, &mut out[start..start + bpp]);
        }
    }
    out
}
