use atlas_maker_core::prelude::*;
use image::RgbaImage;
use rand::{Rng, SeedableRng};

fn region(name: &str, x: u32) -> Region {
    Region::new(name, Rect::new(x, 0, 8, 8))
}

#[test]
fn lookup_zips_up_to_shorter_sequence() {
    let names = vec!["a".to_string(), String::new(), "c".into(), "d".into()];
    let regions = vec![Some(region("a", 0)), Some(region("x", 10)), None];
    let atlas = AtlasAsset::from_sequences("ui.atlas.json", None, names, regions);

    assert!(atlas.contains("a"));
    assert_eq!(atlas.get_region("a").map(|r| r.rect), Some(Rect::new(0, 0, 8, 8)));
    assert!(!atlas.contains(""));
    assert!(atlas.get_region("").is_none());
    assert!(!atlas.contains("c"));
    assert!(!atlas.contains("d"));
    assert!(!atlas.contains("x"));
    assert_eq!(atlas.len(), 1);
}

#[test]
fn lookup_zip_property_holds_for_random_sequences() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
    for _ in 0..50 {
        let n_names = rng.gen_range(0..20);
        let n_regions = rng.gen_range(0..20);
        let names: Vec<String> = (0..n_names)
            .map(|i| if rng.gen_bool(0.2) { String::new() } else { format!("n{}", i) })
            .collect();
        let regions: Vec<Option<Region>> = (0..n_regions)
            .map(|i| rng.gen_bool(0.8).then(|| region(&format!("r{}", i), i as u32)))
            .collect();
        let atlas = AtlasAsset::from_sequences("a.atlas.json", None, names.clone(), regions.clone());

        for i in 0..n_names.max(n_regions) {
            let name = format!("n{}", i);
            let expected = i < n_names
                && i < n_regions
                && !names[i].is_empty()
                && regions[i].is_some();
            assert_eq!(atlas.contains(&name), expected, "name {}", name);
            assert_eq!(atlas.get_region(&name).is_some(), expected);
        }
    }
}

#[test]
fn asset_file_with_nulls_loads() {
    let json = r#"{
        "raster": {"file": "ui.atlas.png", "width": 32, "height": 32},
        "names": ["ok", "broken", ""],
        "regions": [
            {"name": "ok", "rect": {"x": 0, "y": 0, "w": 4, "h": 4}},
            null,
            {"name": "anon", "rect": {"x": 4, "y": 0, "w": 4, "h": 4}}
        ]
    }"#;
    let file: AtlasFile = serde_json::from_str(json).expect("parse");
    let atlas = AtlasAsset::from_file("assets/ui.atlas.json", file);
    assert_eq!(atlas.len(), 1);
    let ok = atlas.get_region("ok").expect("ok region");
    assert_eq!(ok.border, Border::ZERO);
    assert_eq!(ok.pivot, Pivot::CENTER);
    assert!(!atlas.contains("broken"));
    assert_eq!(atlas.raster_path(), std::path::Path::new("assets").join("ui.atlas.png"));
    assert_eq!(atlas.sources().len(), 1);
}

#[test]
fn new_atlas_defaults_raster_next_to_asset() {
    let atlas = AtlasAsset::new("assets/ui.atlas.json");
    assert!(atlas.is_empty());
    assert!(atlas.raster().is_none());
    assert_eq!(atlas.raster_path(), std::path::PathBuf::from("assets/ui.atlas.png"));
    assert_eq!(atlas.stats().num_regions, 0);
}

#[test]
fn stats_report_occupancy() {
    let atlas = AtlasAsset::from_sequences(
        "ui.atlas.json",
        Some(RasterInfo {
            file: "ui.atlas.png".into(),
            width: 16,
            height: 16,
        }),
        vec!["a".into(), "b".into()],
        vec![Some(region("a", 0)), Some(region("b", 8))],
    );
    let stats = atlas.stats();
    assert_eq!(stats.num_regions, 2);
    assert_eq!(stats.used_area, 128);
    assert_eq!(stats.wasted_area(), 128);
    assert!((stats.occupancy - 0.5).abs() < 1e-9);
}

#[test]
fn atlas_from_sprite_sheet() {
    let dir = std::env::temp_dir().join(format!("atlas-maker-from-sheet-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("scratch dir");
    let sheet = dir.join("hero.png");
    RgbaImage::new(64, 32).save(&sheet).expect("write png");
    let catalog = SheetCatalog::new();
    catalog
        .write(
            &sheet,
            &SheetFile {
                imported_size: None,
                sprites: vec![region("idle", 0), region("run", 32)],
            },
        )
        .expect("write sidecar");

    let atlas = AtlasAsset::from_sheet(dir.join("hero.atlas.json"), &sheet, &catalog).expect("import");
    assert_eq!(atlas.len(), 2);
    assert!(atlas.contains("run"));
    assert_eq!(atlas.raster().map(|r| (r.width, r.height)), Some((64, 32)));
    assert_eq!(atlas.raster().map(|r| r.file.as_str()), Some("hero.png"));

    let plain = dir.join("plain.png");
    RgbaImage::new(4, 4).save(&plain).expect("write png");
    let err = AtlasAsset::from_sheet(dir.join("plain.atlas.json"), &plain, &catalog).expect_err("not a sheet");
    assert!(matches!(err, AtlasError::InvalidInput(_)));
}

#[test]
fn sheet_sprites_map_to_raw_pixels() {
    let dir = std::env::temp_dir().join(format!("atlas-maker-sheet-scale-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("scratch dir");
    let sheet = dir.join("tiles.png");
    RgbaImage::new(200, 100).save(&sheet).expect("write png");
    let catalog = SheetCatalog::new();
    catalog
        .write(
            &sheet,
            &SheetFile {
                imported_size: Some((100, 50)),
                sprites: vec![
                    Region::new("grass", Rect::new(0, 0, 50, 50)),
                    Region::new("rock", Rect::new(50, 10, 25, 20)),
                ],
            },
        )
        .expect("write sidecar");

    let atlas = AtlasAsset::from_sheet(dir.join("tiles.atlas.json"), &sheet, &catalog).expect("import");
    assert_eq!(atlas.get_region("grass").map(|r| r.rect), Some(Rect::new(0, 0, 100, 100)));
    assert_eq!(atlas.get_region("rock").map(|r| r.rect), Some(Rect::new(100, 20, 50, 40)));
}
