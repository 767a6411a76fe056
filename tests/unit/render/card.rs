use super::*;
use crate::render::raster::premul_bytes_to_pixmap;

fn compositor(parallel: bool) -> Option<FrameCompositor> {
    let mut cfg = ReelConfig::default();
    cfg.threading.parallel = parallel;
    cfg.threading.threads = Some(2);
    let fonts = match FontSet::load(&cfg.fonts) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("skipping: {e}");
            return None;
        }
    };
    Some(FrameCompositor::new(&cfg, fonts).unwrap())
}

fn entry() -> RankEntry {
    RankEntry {
        rank: 1,
        artist: "Queen".to_string(),
        song: "Bohemian Rhapsody".to_string(),
        stat: "3.2 Billion Views".to_string(),
    }
}

fn px(pm: &vello_cpu::Pixmap, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * u32::from(pm.width()) + x) * 4) as usize;
    let d = pm.data_as_u8_slice();
    [d[i], d[i + 1], d[i + 2], d[i + 3]]
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("card_frames").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn frame_names_sort_lexicographically() {
    let dir = Path::new("f");
    assert_eq!(frame_path(dir, 0), dir.join("frame_0000.png"));
    assert_eq!(frame_path(dir, 149), dir.join("frame_0149.png"));
    assert!(frame_path(dir, 9) < frame_path(dir, 10));
}

#[test]
fn first_frame_is_fully_transparent() {
    let Some(c) = compositor(false) else {
        return;
    };
    let pm = c.render_frame(&entry(), "Top 5 Songs", None, FrameIndex(0)).unwrap();
    assert!(pm.data_as_u8_slice().iter().all(|&b| b == 0));
}

#[test]
fn settled_frame_shows_glass_card_and_thumbnail() {
    let Some(c) = compositor(false) else {
        return;
    };
    let red = vec![[255u8, 0, 0, 255]; 300 * 300].concat();
    let thumb = Arc::new(premul_bytes_to_pixmap(&red, 300, 300).unwrap());
    let pm = c
        .render_frame(&entry(), "Top 5 Songs", Some(thumb), FrameIndex(30))
        .unwrap();

    // Plain glass over the shadow, below all text.
    let glass = px(&pm, 600, 1180);
    assert!((225..=242).contains(&glass[3]), "{glass:?}");

    // Inside the thumbnail, clear of the song line.
    let inside = px(&pm, 850, 1050);
    assert!(inside[0] > 240 && inside[1] < 20, "{inside:?}");

    // Accent ring at the top of the thumbnail.
    let ring = px(&pm, 790, 813);
    assert!(ring[1] > 200 && ring[0] < 60, "{ring:?}");

    // Outside the card and below the title nothing is drawn.
    assert_eq!(px(&pm, 20, 1500), [0, 0, 0, 0]);
}

#[test]
fn render_writes_ordered_frames_identically_in_parallel() {
    let (Some(seq), Some(par)) = (compositor(false), compositor(true)) else {
        return;
    };

    let a = seq
        .render(&entry(), "Top 5", &ThumbnailSource::None, 0.1, &scratch("seq"))
        .unwrap();
    let b = par
        .render(&entry(), "Top 5", &ThumbnailSource::None, 0.1, &scratch("par"))
        .unwrap();
    assert_eq!(a.count, 3);
    assert_eq!(b.count, 3);
    assert!(a.pattern().ends_with(FRAME_PATTERN));

    for i in 0..3 {
        let fa = std::fs::read(a.frame_path(i)).unwrap();
        let fb = std::fs::read(b.frame_path(i)).unwrap();
        assert_eq!(fa, fb, "frame {i} differs");
    }
    assert!(!a.frame_path(3).exists());

    let img = image::open(a.frame_path(2)).unwrap();
    assert_eq!((img.width(), img.height()), (1080, 1920));

    let dir = a.dir.clone();
    a.release().unwrap();
    assert!(!dir.exists());
}

#[test]
fn bad_duration_is_a_render_error() {
    let Some(c) = compositor(false) else {
        return;
    };
    let err = c
        .render(&entry(), "t", &ThumbnailSource::None, 0.0, &scratch("zero"))
        .unwrap_err();
    assert!(matches!(err, ReelError::Render(_)));
    assert!(err.is_item_recoverable());
}

#[test]
fn failed_render_leaves_no_frame_dir() {
    let Some(c) = compositor(false) else {
        return;
    };
    let dir = scratch("failed");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(frame_path(&dir, 0), b"stale").unwrap();

    let err = c
        .render(&entry(), "t", &ThumbnailSource::None, f64::NAN, &dir)
        .unwrap_err();
    assert!(matches!(err, ReelError::Render(_)));
    assert!(!dir.exists());
}
