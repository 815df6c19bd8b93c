use std::sync::Arc;

use super::*;

fn pattern(x: u32, y: u32, pixel: &mut [u8]) {
    for (channel, byte) in pixel.iter_mut().enumerate() {
        *byte = (x.wrapping_mul(7) ^ y.wrapping_mul(13) ^ channel as u32) as u8;
    }
}

fn chunk_rects(processor: &mut RegionProcessor<'_>) -> Vec<(u32, u32, u32, u32)> {
    let mut rects = Vec::new();
    while let Some(chunk) = processor.next_chunk().expect("next_chunk") {
        rects.push((
            chunk.offset_x(),
            chunk.offset_y(),
            chunk.width(),
            chunk.height(),
        ));
    }
    rects
}

#[test]
fn new_rejects_degenerate_dimensions_and_bpp() {
    assert_eq!(
        TileManager::new(0, 4, 1).unwrap_err(),
        TileError::InvalidDimensions {
            width: 0,
            height: 4
        }
    );
    assert_eq!(
        TileManager::new(4, 4, 0).unwrap_err(),
        TileError::UnsupportedBpp {
            bpp: 0,
            max: MAX_BPP
        }
    );
    assert!(matches!(
        TileManager::new(4, 4, MAX_BPP + 1),
        Err(TileError::UnsupportedBpp { .. })
    ));
}

#[test]
#[cfg(target_pointer_width = "64")]
fn new_reports_allocation_failure_for_huge_grid() {
    assert!(matches!(
        TileManager::new(u32::MAX, u32::MAX, 1),
        Err(TileError::AllocationFailed { .. })
    ));
}

#[test]
#[cfg(target_pointer_width = "64")]
fn new_reports_size_overflow_for_wide_pixels() {
    assert_eq!(
        TileManager::new(u32::MAX, u32::MAX, MAX_BPP).unwrap_err(),
        TileError::SizeOverflow
    );
}

#[test]
fn tiles_are_allocated_lazily_and_zeroed() {
    let mut manager = TileManager::new(TILE_EDGE * 2 + 5, TILE_EDGE + 1, 2).expect("new");
    assert_eq!(manager.allocated_tile_count(), 0);
    assert_eq!(manager.memsize(), 0);

    let tile = manager.get_tile(TILE_EDGE * 2 + 1, TILE_EDGE).expect("get_tile");
    assert_eq!((tile.width(), tile.height(), tile.bpp()), (5, 1, 2));
    assert!(tile.data().iter().all(|&byte| byte == 0));
    assert_eq!(manager.allocated_tile_count(), 1);
    assert_eq!(manager.memsize(), 10);
    assert!(manager.tile_at(TilePos { x: 2, y: 1 }).is_some());
    assert!(manager.tile_at(TilePos { x: 0, y: 0 }).is_none());
    assert_eq!(manager.dirty_tile_count(), 0);
}

#[test]
fn get_tile_returns_same_tile_for_same_cell() {
    let mut manager = TileManager::new(100, 100, 1).expect("new");
    let first = manager.get_tile(1, 1).expect("get_tile");
    let second = manager.get_tile(TILE_EDGE - 1, TILE_EDGE - 1).expect("get_tile");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(Tile::ref_count(&first), 3);
    drop(second);
    assert_eq!(Tile::ref_count(&first), 2);
}

#[test]
#[should_panic(expected = "outside tile manager")]
fn get_tile_outside_bounds_panics() {
    let mut manager = TileManager::new(10, 10, 1).expect("new");
    let _ = manager.get_tile(10, 0);
}

#[test]
fn write_pixel_marks_tile_dirty() {
    let mut manager = TileManager::new(TILE_EDGE * 2, TILE_EDGE * 2, 4).expect("new");
    manager
        .write_pixel(TILE_EDGE + 3, 2, &[1, 2, 3, 4])
        .expect("write_pixel");

    let mut pixel = [0; 4];
    manager.read_pixel(TILE_EDGE + 3, 2, &mut pixel);
    assert_eq!(pixel, [1, 2, 3, 4]);
    assert_eq!(manager.dirty_tile_count(), 1);
    assert!(manager.is_tile_dirty(TilePos { x: 1, y: 0 }));
    assert_eq!(
        manager.iter_dirty_tiles().collect::<Vec<_>>(),
        vec![TilePos { x: 1, y: 0 }]
    );

    manager.clear_dirty();
    assert_eq!(manager.dirty_tile_count(), 0);
    assert!(!manager.is_tile_dirty(TilePos { x: 1, y: 0 }));
}

#[test]
fn read_pixel_of_unallocated_tile_is_zero_without_allocating() {
    let manager = TileManager::new(20, 20, 3).expect("new");
    let mut pixel = [9; 3];
    manager.read_pixel(5, 5, &mut pixel);
    assert_eq!(pixel, [0; 3]);
    assert_eq!(manager.allocated_tile_count(), 0);
}

#[test]
fn clone_shares_tiles_until_written() {
    let mut original = TileManager::new(10, 10, 1).expect("new");
    original.write_pixel(1, 1, &[7]).expect("write_pixel");
    let mut copy = original.clone();

    let shared = original.tile_at(TilePos { x: 0, y: 0 }).expect("tile");
    assert_eq!(Tile::ref_count(shared), 2);

    copy.write_pixel(1, 1, &[9]).expect("write_pixel");

    let mut pixel = [0];
    original.read_pixel(1, 1, &mut pixel);
    assert_eq!(pixel, [7]);
    copy.read_pixel(1, 1, &mut pixel);
    assert_eq!(pixel, [9]);
    let original_tile = original.tile_at(TilePos { x: 0, y: 0 }).expect("tile");
    assert_eq!(Tile::ref_count(original_tile), 1);
}

#[test]
fn offsets_are_bookkeeping_only() {
    let mut manager = TileManager::new(4, 4, 1).expect("new");
    assert_eq!(manager.offsets(), (0, 0));
    manager.set_offsets(-3, 12);
    assert_eq!(manager.offsets(), (-3, 12));
    assert_eq!((manager.width(), manager.height()), (4, 4));
}

#[test]
fn chunks_follow_tile_boundaries_in_row_major_order() {
    let manager = TileManager::new(200, 100, 1).expect("new");
    let mut processor =
        RegionProcessor::register([PixelRegion::new(&manager, PixelRect::new(10, 20, 100, 50))]);
    assert_eq!((processor.width(), processor.height()), (100, 50));
    let rects = chunk_rects(&mut processor);
    let split_x = TILE_EDGE - 10;
    let split_y = TILE_EDGE - 20;
    assert_eq!(
        rects,
        vec![
            (0, 0, split_x, split_y),
            (split_x, 0, 100 - split_x, split_y),
            (0, split_y, split_x, 50 - split_y),
            (split_x, split_y, 100 - split_x, 50 - split_y),
        ]
    );
    assert!(processor.is_exhausted());
    assert!(processor.next_chunk().expect("next_chunk").is_none());
}

#[test]
fn full_traversal_reassembles_raster() {
    let manager = manager_from_fn(150, 130, 3, pattern);
    let rect = manager.rect();
    let bpp = manager.bpp() as usize;
    let row_bytes = rect.width as usize * bpp;
    let mut reassembled = vec![0u8; row_bytes * rect.height as usize];
    let mut chunk_count = 0;

    let mut processor = RegionProcessor::register([PixelRegion::new(&manager, rect)]);
    while let Some(chunk) = processor.next_chunk().expect("next_chunk") {
        chunk_count += 1;
        let region = chunk.region(0);
        for (row, bytes) in region.rows().enumerate() {
            let start = (region.y() as usize + row) * row_bytes + region.x() as usize * bpp;
            reassembled[start..start + bytes.len()].copy_from_slice(bytes);
        }
    }

    assert_eq!(chunk_count, 9);
    assert_eq!(reassembled, raster_bytes(&manager, rect));
}

#[test]
fn regions_at_different_origins_advance_in_lockstep() {
    let source = manager_from_fn(120, 20, 2, pattern);
    let target = TileManager::new(100, 10, 1).expect("new");
    let source_rect = PixelRect::new(10, 5, 100, 10);
    let target_rect = PixelRect::new(0, 0, 100, 10);

    let mut processor = RegionProcessor::register([
        PixelRegion::new(&source, source_rect),
        PixelRegion::new(&target, target_rect),
    ]);
    let mut widths = Vec::new();
    while let Some(chunk) = processor.next_chunk().expect("next_chunk") {
        let [src, dst] = chunk.regions() else {
            panic!("expected two regions");
        };
        assert_eq!(src.x() - source_rect.x, chunk.offset_x());
        assert_eq!(dst.x() - target_rect.x, chunk.offset_x());
        assert_eq!(src.y() - source_rect.y, chunk.offset_y());
        assert_eq!(dst.y() - target_rect.y, chunk.offset_y());
        assert_eq!((src.width(), src.height()), (dst.width(), dst.height()));
        assert_eq!(src.pixel(0, 0)[0], {
            let mut pixel = [0; 2];
            pattern(src.x(), src.y(), &mut pixel);
            pixel[0]
        });
        widths.push(chunk.width());
    }
    assert_eq!(widths, vec![TILE_EDGE - 10, 10, 100 - TILE_EDGE]);
}

#[test]
fn zero_area_region_yields_no_chunks() {
    let manager = TileManager::new(10, 10, 1).expect("new");
    let mut processor =
        RegionProcessor::register([PixelRegion::new(&manager, PixelRect::new(3, 3, 0, 4))]);
    assert!(processor.is_exhausted());
    assert!(processor.next_chunk().expect("next_chunk").is_none());
}

#[test]
#[should_panic(expected = "footprint")]
fn mismatched_footprints_are_rejected_at_registration() {
    let first = TileManager::new(10, 10, 1).expect("new");
    let second = TileManager::new(10, 10, 1).expect("new");
    let _ = RegionProcessor::register([
        PixelRegion::new(&first, PixelRect::new(0, 0, 5, 5)),
        PixelRegion::new(&second, PixelRect::new(0, 0, 5, 4)),
    ]);
}

#[test]
#[should_panic(expected = "exceeds raster bounds")]
fn region_outside_manager_panics() {
    let manager = TileManager::new(10, 10, 1).expect("new");
    let _ = PixelRegion::new(&manager, PixelRect::new(5, 5, 6, 1));
}

#[test]
fn read_only_traversal_never_allocates() {
    let manager = TileManager::new(TILE_EDGE * 3, TILE_EDGE * 2, 4).expect("new");
    let mut processor = RegionProcessor::register([PixelRegion::new(&manager, manager.rect())]);
    while let Some(chunk) = processor.next_chunk().expect("next_chunk") {
        assert!(chunk.region(0).data().iter().all(|&byte| byte == 0));
        assert!(!chunk.region(0).is_writable());
    }
    drop(processor);
    assert_eq!(manager.allocated_tile_count(), 0);
}

#[test]
fn dirty_region_marks_only_touched_tiles() {
    let mut manager = TileManager::new(TILE_EDGE * 3, TILE_EDGE * 3, 1).expect("new");
    let rect = PixelRect::new(TILE_EDGE - 1, TILE_EDGE, 2, 1);
    let mut processor = RegionProcessor::register([PixelRegion::new_dirty(&mut manager, rect)]);
    while let Some(mut chunk) = processor.next_chunk().expect("next_chunk") {
        chunk.region_mut(0).row_mut(0).fill(0xff);
    }
    drop(processor);

    assert_eq!(manager.allocated_tile_count(), 2);
    assert_eq!(
        manager.iter_dirty_tiles().collect::<Vec<_>>(),
        vec![TilePos { x: 0, y: 1 }, TilePos { x: 1, y: 1 }]
    );
    let mut pixel = [0];
    manager.read_pixel(TILE_EDGE, TILE_EDGE, &mut pixel);
    assert_eq!(pixel, [0xff]);
    manager.read_pixel(TILE_EDGE + 1, TILE_EDGE, &mut pixel);
    assert_eq!(pixel, [0]);
}

#[test]
fn buffer_region_honours_rowstride() {
    let (width, height, bpp) = (100u32, 3u32, 1u32);
    let rowstride = 128usize;
    let mut buffer = vec![0u8; rowstride * height as usize];
    for y in 0..height as usize {
        for x in 0..width as usize {
            buffer[y * rowstride + x] = (x + y * 100) as u8;
        }
        buffer[y * rowstride + width as usize..(y + 1) * rowstride].fill(0xee);
    }

    let mut manager = TileManager::new(width, height, bpp).expect("new");
    let rect = PixelRect::from_size(width, height);
    let mut processor = RegionProcessor::register([
        PixelRegion::from_buffer(&buffer, width, height, bpp, rowstride, rect),
        PixelRegion::new_dirty(&mut manager, rect),
    ]);
    let mut chunk_count = 0;
    while let Some(mut chunk) = processor.next_chunk().expect("next_chunk") {
        chunk_count += 1;
        let [src, dst] = chunk.regions_mut() else {
            panic!("expected two regions");
        };
        assert_eq!(src.rowstride(), rowstride);
        for row in 0..src.height() {
            dst.row_mut(row).copy_from_slice(src.row(row));
        }
    }
    drop(processor);

    assert_eq!(chunk_count, 2);
    let mut pixel = [0];
    manager.read_pixel(99, 2, &mut pixel);
    assert_eq!(pixel, [(99 + 200) as u8]);
}

#[test]
#[should_panic(expected = "read-only")]
fn writing_through_read_only_chunk_panics() {
    let manager = TileManager::new(4, 4, 1).expect("new");
    let mut processor = RegionProcessor::register([PixelRegion::new(&manager, manager.rect())]);
    let mut chunk = processor
        .next_chunk()
        .expect("next_chunk")
        .expect("one chunk");
    chunk.region_mut(0).row_mut(0)[0] = 1;
}

#[test]
fn partially_consumed_processor_can_be_dropped() {
    let mut manager = TileManager::new(TILE_EDGE * 2, TILE_EDGE, 1).expect("new");
    let rect = manager.rect();
    {
        let mut processor =
            RegionProcessor::register([PixelRegion::new_dirty(&mut manager, rect)]);
        let mut chunk = processor
            .next_chunk()
            .expect("next_chunk")
            .expect("first chunk");
        chunk.region_mut(0).row_mut(0)[0] = 5;
    }
    assert_eq!(manager.allocated_tile_count(), 1);
    assert_eq!(manager.dirty_tile_count(), 1);
}

#[test]
fn failed_chunk_is_retried_on_next_call() {
    let mut manager = TileManager::new(TILE_EDGE * 2, TILE_EDGE, 1).expect("new");
    manager.inject_allocation_failures(1);
    let rect = manager.rect();
    {
        let mut processor =
            RegionProcessor::register([PixelRegion::new_dirty(&mut manager, rect)]);
        assert!(matches!(
            processor.next_chunk(),
            Err(TileError::AllocationFailed { .. })
        ));
        assert!(!processor.is_exhausted());

        assert_eq!(
            chunk_rects(&mut processor),
            vec![(0, 0, TILE_EDGE, TILE_EDGE), (TILE_EDGE, 0, TILE_EDGE, TILE_EDGE)]
        );
    }
    assert_eq!(manager.allocated_tile_count(), 2);
    assert_eq!(manager.dirty_tile_count(), 2);
}
