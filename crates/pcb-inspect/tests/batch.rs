use image::{ImageFormat, Rgb, RgbImage};
use pcb_inspect::batch::{discover_jobs, run_batch, BatchConfig, BatchSummary, ClassSummary};
use std::fs;
use std::path::{Path, PathBuf};

fn board(squares: &[(u32, u32, u32)]) -> RgbImage {
    let mut img = RgbImage::new(200, 200);
    for &(x0, y0, side) in squares {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
    }
    img
}

fn save_png(img: &RgbImage, path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

struct Dataset {
    _dir: tempfile::TempDir,
    templates: PathBuf,
    images: PathBuf,
    out: PathBuf,
}

/// Two classes, five test images:
/// - Short/00041_short_01.png: one defect
/// - Short/00099_short_01.png: no template
/// - Spur/00042_spur_01.png: two defects
/// - Spur/00042_spur_02.png: corrupt
/// - Spur/_spur_03.png: no board id
fn dataset() -> Dataset {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("pcb_used");
    let images = dir.path().join("images");
    let out = dir.path().join("crops");

    save_png(&board(&[]), &templates.join("00041.png"));
    save_png(&board(&[]), &templates.join("00042_temp.png"));

    save_png(&board(&[(60, 60, 30)]), &images.join("Short/00041_short_01.png"));
    save_png(&board(&[(60, 60, 30)]), &images.join("Short/00099_short_01.png"));
    save_png(
        &board(&[(20, 20, 25), (140, 130, 40)]),
        &images.join("Spur/00042_spur_01.png"),
    );
    fs::write(images.join("Spur/00042_spur_02.png"), b"\x89PNG broken").unwrap();
    save_png(&board(&[(10, 10, 30)]), &images.join("Spur/_spur_03.png"));

    Dataset {
        _dir: dir,
        templates,
        images,
        out,
    }
}

fn config(ds: &Dataset) -> BatchConfig {
    let mut cfg = BatchConfig::new(&ds.templates, &ds.images, &ds.out);
    cfg.naming = vec!["{id}.png".to_string(), "{id}_temp.png".to_string()];
    cfg.extensions = vec!["png".to_string()];
    cfg
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn per_item_failures_are_counted_not_raised() {
    let ds = dataset();
    let summary = run_batch(&config(&ds)).unwrap();

    assert_eq!(summary.pairs_total, 5);
    assert_eq!(summary.pairs_processed, 2);
    assert_eq!(summary.skipped_no_template, 1);
    assert_eq!(summary.skipped_decode, 1);
    assert_eq!(summary.skipped_invalid_name, 1);
    assert_eq!(summary.pairs_skipped(), 3);
    assert_eq!(summary.crops_written, 3);
    assert_eq!(summary.crop_write_failures, 0);
    assert_eq!(
        summary.per_class["Short"],
        ClassSummary {
            pairs_total: 2,
            pairs_processed: 1,
            crops_written: 1
        }
    );
    assert_eq!(
        summary.per_class["Spur"],
        ClassSummary {
            pairs_total: 3,
            pairs_processed: 1,
            crops_written: 2
        }
    );

    assert_eq!(files_in(&ds.out.join("Short")), vec!["00041_short_01.png_0.jpg"]);
    assert_eq!(
        files_in(&ds.out.join("Spur")),
        vec!["00042_spur_01.png_0.jpg", "00042_spur_01.png_1.jpg"]
    );
}

#[test]
fn crops_follow_top_left_order() {
    let ds = dataset();
    run_batch(&config(&ds)).unwrap();
    // (20, 20) square: dilated box (18, 18, 29, 29), padding clamped at 0
    let first = image::open(ds.out.join("Spur/00042_spur_01.png_0.jpg")).unwrap();
    assert_eq!((first.width(), first.height()), (67, 67));
    // (140, 130) square: dilated box (138, 128, 44, 44), right edge clamped at 200
    let second = image::open(ds.out.join("Spur/00042_spur_01.png_1.jpg")).unwrap();
    assert_eq!((second.width(), second.height()), (82, 84));
}

#[test]
fn unwritable_crop_does_not_stop_the_pair() {
    let ds = dataset();
    // a directory squatting on the crop's file name makes the write fail
    fs::create_dir_all(ds.out.join("Spur/00042_spur_01.png_0.jpg")).unwrap();
    let summary = run_batch(&config(&ds)).unwrap();
    assert_eq!(summary.pairs_processed, 2);
    assert_eq!(summary.crop_write_failures, 1);
    assert_eq!(summary.crops_written, 2);
    assert!(ds.out.join("Spur/00042_spur_01.png_1.jpg").is_file());
}

#[test]
fn rerun_with_clean_output_is_byte_identical() {
    let ds = dataset();
    let mut cfg = config(&ds);
    cfg.clean_output = true;

    run_batch(&cfg).unwrap();
    let crop = ds.out.join("Spur/00042_spur_01.png_1.jpg");
    let first = fs::read(&crop).unwrap();
    fs::write(ds.out.join("Spur/leftover.txt"), b"stale").unwrap();

    let summary = run_batch(&cfg).unwrap();
    assert_eq!(summary.crops_written, 3);
    assert_eq!(fs::read(&crop).unwrap(), first);
    assert!(!ds.out.join("Spur/leftover.txt").exists());
}

#[test]
fn worker_count_does_not_change_the_outcome() {
    let ds = dataset();
    let mut cfg = config(&ds);
    cfg.workers = 1;
    let serial: BatchSummary = run_batch(&cfg).unwrap();
    cfg.workers = 4;
    cfg.clean_output = true;
    let parallel = run_batch(&cfg).unwrap();
    assert_eq!(serial, parallel);
}

#[test]
fn class_folders_are_created_even_when_empty() {
    let ds = dataset();
    fs::create_dir_all(ds.images.join("Mouse_bite")).unwrap();
    let summary = run_batch(&config(&ds)).unwrap();
    assert!(ds.out.join("Mouse_bite").is_dir());
    assert_eq!(summary.per_class["Mouse_bite"], ClassSummary::default());
}

#[test]
fn default_config_only_picks_jpg_files() {
    let ds = dataset();
    let jobs = discover_jobs(&ds.images, &BatchConfig::new("t", "i", "o").extensions).unwrap();
    assert!(jobs.is_empty());

    let jpg = ds.images.join("Short/00041_short_02.jpg");
    board(&[(60, 60, 30)]).save(&jpg).unwrap();
    fs::copy(ds.templates.join("00041.png"), ds.templates.join("00041.jpg")).unwrap();

    let cfg = BatchConfig::new(&ds.templates, &ds.images, &ds.out);
    let summary = run_batch(&cfg).unwrap();
    assert_eq!(summary.pairs_total, 1);
    assert_eq!(summary.pairs_processed, 1);
    assert!(summary.crops_written >= 1);
}

#[test]
fn config_file_round_trip_drives_the_run() {
    let ds = dataset();
    let path = ds.out.with_extension("json");
    let mut cfg = config(&ds);
    cfg.overrides.min_area = Some(5000.0);
    cfg.write_json(&path).unwrap();

    let loaded = BatchConfig::load_json(&path).unwrap();
    assert_eq!(loaded.params().min_area, 5000.0);
    let summary = run_batch(&loaded).unwrap();
    // largest region is 44x44 after dilation (area 43*43)
    assert_eq!(summary.pairs_processed, 2);
    assert_eq!(summary.crops_written, 0);
}
