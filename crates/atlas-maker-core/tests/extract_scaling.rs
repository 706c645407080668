use atlas_maker_core::prelude::*;
use image::{Rgba, RgbaImage};
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("atlas-maker-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Raw image with a distinct color per 10x10 cell.
fn gradient(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Rgba([(x / 10) as u8 * 10, (y / 10) as u8 * 10, 128, 255]))
}

#[test]
fn sub_image_crop_is_scaled_from_imported_space() {
    let dir = scratch_dir("extract-scale");
    let path = dir.join("sheet.png");
    let raw = gradient(200, 200);
    raw.save(&path).expect("write png");

    let catalog = StaticCatalog::new().with_sheet(
        path.clone(),
        SheetFile {
            imported_size: Some((100, 100)),
            sprites: vec![],
        },
    );
    let mut cache = RawImageCache::new();
    let mut ex = Extractor::new(&mut cache, &catalog);
    let src = SourceImage::sub_image(&path, Region::new("tl", Rect::new(0, 0, 50, 50)));
    let buf = ex.raw_buffer(&src).expect("extract");
    assert_eq!(buf.dimensions(), (100, 100));
    assert_eq!(buf.get_pixel(99, 99), raw.get_pixel(99, 99));

    let src = SourceImage::sub_image(&path, Region::new("br", Rect::new(50, 50, 50, 50)));
    let buf = ex.raw_buffer(&src).expect("extract");
    assert_eq!(buf.dimensions(), (100, 100));
    assert_eq!(buf.get_pixel(0, 0), raw.get_pixel(100, 100));
}

#[test]
fn whole_file_is_returned_unmodified_and_cached() {
    let dir = scratch_dir("extract-file");
    let path = dir.join("icon.png");
    let raw = gradient(30, 20);
    raw.save(&path).expect("write png");

    let catalog = StaticCatalog::new();
    let mut cache = RawImageCache::new();
    {
        let mut ex = Extractor::new(&mut cache, &catalog);
        let a = ex.raw_buffer(&SourceImage::file(&path)).expect("first");
        let b = ex.raw_buffer(&SourceImage::file(&path)).expect("second");
        assert_eq!(a, raw);
        assert_eq!(a, b);
    }
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&path));
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn missing_file_is_reported() {
    let dir = scratch_dir("extract-missing");
    let catalog = StaticCatalog::new();
    let mut cache = RawImageCache::new();
    let mut ex = Extractor::new(&mut cache, &catalog);
    let err = ex
        .raw_buffer(&SourceImage::file(dir.join("nope.png")))
        .expect_err("missing");
    assert!(matches!(err, AtlasError::MissingSource { .. }));
}

#[test]
fn crop_outside_raster_is_invalid() {
    let dir = scratch_dir("extract-outside");
    let path = dir.join("small.png");
    gradient(16, 16).save(&path).expect("write png");

    let catalog = StaticCatalog::new();
    let mut cache = RawImageCache::new();
    let mut ex = Extractor::new(&mut cache, &catalog);
    let src = SourceImage::sub_image(&path, Region::new("far", Rect::new(40, 40, 8, 8)));
    let err = ex.raw_buffer(&src).expect_err("outside");
    assert!(matches!(err, AtlasError::InvalidInput(_)));
}

#[test]
fn entry_without_source_is_invalid() {
    let catalog = StaticCatalog::new();
    let mut cache = RawImageCache::new();
    let mut ex = Extractor::new(&mut cache, &catalog);
    let err = ex
        .raw_buffer_for(&SourceEntry::new("ghost"))
        .expect_err("no source");
    assert!(matches!(err, AtlasError::InvalidInput(_)));
}
