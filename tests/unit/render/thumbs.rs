use super::*;

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("thumbs").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_jpeg(path: &Path, w: u32, h: u32, rgb: [u8; 3]) {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb(rgb));
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

fn alpha_at(pm: &vello_cpu::Pixmap, x: u32, y: u32) -> u8 {
    let i = ((y * u32::from(pm.width()) + x) * 4 + 3) as usize;
    pm.data_as_u8_slice()[i]
}

#[test]
fn thumb_paths_are_one_indexed_and_padded() {
    assert_eq!(
        thumb_frame_path(Path::new("t"), 1),
        PathBuf::from("t").join("thumb_0001.jpg")
    );
    assert_eq!(
        thumb_frame_path(Path::new("t"), 150),
        PathBuf::from("t").join("thumb_0150.jpg")
    );
}

#[test]
fn load_masks_into_circle() {
    let dir = scratch("circle");
    let path = dir.join("still.jpg");
    write_jpeg(&path, 64, 36, [200, 30, 30]);

    let pm = ThumbnailLoader::new(32).unwrap().load(&path).unwrap();
    assert_eq!((pm.width(), pm.height()), (32, 32));
    assert_eq!(alpha_at(&pm, 16, 16), 255);
    assert_eq!(alpha_at(&pm, 0, 0), 0);
    assert_eq!(alpha_at(&pm, 31, 31), 0);
}

#[test]
fn sequence_freezes_on_missing_frames() {
    let dir = scratch("freeze");
    write_jpeg(&thumb_frame_path(&dir, 2), 16, 16, [0, 0, 255]);
    write_jpeg(&thumb_frame_path(&dir, 3), 16, 16, [0, 255, 0]);
    std::fs::write(thumb_frame_path(&dir, 5), b"not a jpeg").unwrap();

    let loader = ThumbnailLoader::new(8).unwrap();
    let frames = loader.resolve(&ThumbnailSource::Sequence(dir), 6);
    assert_eq!(frames.len(), 6);
    assert!(frames[0].is_none());

    let f1 = frames[1].as_ref().unwrap();
    let f2 = frames[2].as_ref().unwrap();
    assert!(!Arc::ptr_eq(f1, f2));
    for later in &frames[3..] {
        assert!(Arc::ptr_eq(later.as_ref().unwrap(), f2));
    }
}

#[test]
fn unusable_still_means_no_thumbnail() {
    let loader = ThumbnailLoader::new(8).unwrap();
    let frames = loader.resolve(
        &ThumbnailSource::Still(PathBuf::from("target/thumbs/definitely-missing.jpg")),
        3,
    );
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(Option::is_none));

    let none = loader.resolve(&ThumbnailSource::None, 2);
    assert!(none.iter().all(Option::is_none));
}

#[test]
fn loader_rejects_zero_size() {
    assert!(ThumbnailLoader::new(0).is_err());
}
