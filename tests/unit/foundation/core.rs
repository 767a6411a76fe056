use super::*;

#[test]
fn fps_frames_secs_roundtrip_floor() {
    let fps = Fps::new(30000, 1001).unwrap();
    let secs = fps.frames_to_secs(123);
    assert_eq!(fps.secs_to_frames_floor(secs), 123);
}

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::whole(30).unwrap().to_ffmpeg(), "30");
    assert_eq!(Fps::new(30000, 1001).unwrap().to_ffmpeg(), "30000/1001");
}

#[test]
fn canvas_must_be_even_for_yuv420p() {
    assert!(Canvas::default().validate().is_ok());
    assert!(
        Canvas {
            width: 1081,
            height: 1920
        }
        .validate()
        .is_err()
    );
    assert!(
        Canvas {
            width: 0,
            height: 1920
        }
        .validate()
        .is_err()
    );
}

#[test]
fn rgba_modulate_scales_alpha() {
    let c = Rgba8::rgba(0, 255, 128, 255);
    assert_eq!(c.modulate(255).a, 255);
    assert_eq!(c.modulate(0).a, 0);
    assert_eq!(Rgba8::rgba(1, 2, 3, 200).modulate(128).a, 100);
    assert_eq!(c.modulate(10).r, 0);
}

#[test]
fn rgba_ffmpeg_syntax() {
    assert_eq!(Rgba8::rgb(255, 255, 0).to_ffmpeg(), "0xFFFF00");
    assert_eq!(Rgba8::rgba(0, 0, 0, 153).to_ffmpeg(), "0x000000@0.60");
}
