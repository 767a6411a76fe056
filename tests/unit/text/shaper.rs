use super::*;

fn fonts_or_skip() -> Option<FontSet> {
    match FontSet::load(&FontConfig::default()) {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

#[test]
fn missing_weight_borrows_the_other() {
    let Some(fonts) = fonts_or_skip() else {
        return;
    };
    let Some(path) = fonts.bold.file_path().map(Path::to_path_buf) else {
        return;
    };

    let cfg = FontConfig {
        bold: path.clone(),
        regular: PathBuf::from("target/definitely/missing.ttf"),
    };
    let set = FontSet::load(&cfg).unwrap();
    assert_eq!(set.regular.source, FontSource::File(path));
    assert_eq!(set.get(FontWeight::Regular).bytes.len(), set.bold.bytes.len());
}

#[test]
fn shaping_produces_nonempty_layout() {
    let Some(fonts) = fonts_or_skip() else {
        return;
    };
    let mut shaper = GlyphShaper::new(&fonts).unwrap();
    let text = shaper
        .shape("#1", FontWeight::Bold, 140.0, TextBrushRgba8::default())
        .unwrap();
    assert!(text.width() > 0.0);
    assert!(text.height() > 0.0);

    let wider = shaper
        .shape("#10 and more", FontWeight::Bold, 140.0, TextBrushRgba8::default())
        .unwrap();
    assert!(wider.width() > text.width());
}

#[test]
fn shaping_rejects_bad_sizes() {
    let Some(fonts) = fonts_or_skip() else {
        return;
    };
    let mut shaper = GlyphShaper::new(&fonts).unwrap();
    assert!(
        shaper
            .shape("x", FontWeight::Regular, 0.0, TextBrushRgba8::default())
            .is_err()
    );
    assert!(
        shaper
            .shape("x", FontWeight::Regular, f32::NAN, TextBrushRgba8::default())
            .is_err()
    );
}

#[test]
fn font_source_display() {
    assert_eq!(
        FontSource::File(PathBuf::from("a/b.ttf")).to_string(),
        "a/b.ttf"
    );
    assert_eq!(
        FontSource::System("DejaVuSans".to_string()).to_string(),
        "system:DejaVuSans"
    );
}
