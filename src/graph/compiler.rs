use std::path::{Path, PathBuf};

use crate::foundation::config::{BackgroundStyle, IntroConfig, LoudnessTarget, ReelConfig};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::ReelResult;
use crate::graph::model::{Chain, Filter, FilterGraphSpec, GraphInput, Pad, format_secs};
use crate::render::card::FrameSequence;
use crate::text::layout::{escape, wrap};

/// A source clip used behind a card or the intro.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundClip {
    pub path: PathBuf,
    /// Offset into the clip where this segment starts.
    pub seek_s: f64,
    pub has_audio: bool,
}

/// Builds [`FilterGraphSpec`]s for card and intro clips.
///
/// All timing is decided by the caller; the compiler only places nodes.
#[derive(Clone, Debug)]
pub struct FilterGraphCompiler {
    canvas: Canvas,
    fps: Fps,
    fade_s: f64,
    background: BackgroundStyle,
    loudness: LoudnessTarget,
    intro: IntroConfig,
    sample_rate: u32,
    channels: u32,
}

impl FilterGraphCompiler {
    pub fn new(cfg: &ReelConfig) -> ReelResult<Self> {
        Ok(Self {
            canvas: cfg.canvas,
            fps: cfg.fps()?,
            fade_s: cfg.fade_s,
            background: cfg.background,
            loudness: cfg.loudness,
            intro: cfg.intro.clone(),
            sample_rate: cfg.encoder.sample_rate,
            channels: cfg.encoder.channels,
        })
    }

    /// Card clip: darkened background video, the overlay frame sequence on top, and the
    /// background's loudness-normalized audio, all faded in and out together.
    ///
    /// A missing background file (or `None`) becomes a black canvas with silent audio.
    pub fn compile_card(
        &self,
        background: Option<&BackgroundClip>,
        overlay: &FrameSequence,
    ) -> FilterGraphSpec {
        let duration = overlay.duration_s();
        let background = self.usable(background);

        let mut inputs = vec![
            self.background_input(background, Some(duration), false),
            GraphInput::ImageSequence {
                pattern: overlay.pattern(),
                fps: overlay.fps,
                start_number: 0,
            },
        ];
        let audio_pad = match background {
            Some(bg) if bg.has_audio => Pad::audio(0),
            _ => {
                inputs.push(self.silence(Some(duration)));
                Pad::audio(2)
            }
        };

        let bg_chain = Chain::new(vec![Pad::video(0)], "bg")
            .then_all(self.cover_canvas())
            .then_all(self.legibility())
            .then_all(self.video_fades(Some(duration), false));

        let ov_chain = Chain::new(vec![Pad::video(1)], "ov")
            .then(
                Filter::new("scale")
                    .arg(self.canvas.width)
                    .arg(self.canvas.height),
            )
            .then(Filter::new("format").arg("rgba"))
            .then_all(self.video_fades(Some(duration), true));

        let composite = Chain::new(vec![Pad::label("bg"), Pad::label("ov")], "v")
            .then(Filter::new("overlay").arg(0).arg(0));

        let audio = Chain::new(vec![audio_pad], "a")
            .then(self.loudnorm())
            .then_all(self.audio_fades(duration));

        FilterGraphSpec {
            inputs,
            chains: vec![bg_chain, ov_chain, composite, audio],
            maps: vec!["v".to_string(), "a".to_string()],
            duration_s: Some(duration),
            shortest: false,
        }
    }

    /// Intro clip: looped background with the upper-cased theme title stacked as centered
    /// drawtext lines, narration as the only audio. The narration bounds the clip.
    pub fn compile_intro(
        &self,
        theme_title: &str,
        background: Option<&BackgroundClip>,
        narration: &Path,
        narration_duration_s: Option<f64>,
        font_file: Option<&Path>,
    ) -> FilterGraphSpec {
        let background = self.usable(background);
        let inputs = vec![
            self.background_input(background, None, true),
            GraphInput::File {
                path: narration.to_path_buf(),
                seek_s: None,
                duration_s: None,
                looped: false,
            },
        ];

        let video = Chain::new(vec![Pad::video(0)], "v")
            .then_all(self.cover_canvas())
            .then_all(self.title_lines(theme_title, font_file))
            .then_all(self.video_fades(narration_duration_s, false));

        let audio = Chain::new(vec![Pad::audio(1)], "a").then(self.loudnorm());

        FilterGraphSpec {
            inputs,
            chains: vec![video, audio],
            maps: vec!["v".to_string(), "a".to_string()],
            duration_s: narration_duration_s,
            shortest: true,
        }
    }

    fn usable<'a>(&self, background: Option<&'a BackgroundClip>) -> Option<&'a BackgroundClip> {
        match background {
            Some(bg) if bg.path.is_file() => Some(bg),
            Some(bg) => {
                tracing::warn!(path = %bg.path.display(), "background clip missing, using black canvas");
                None
            }
            None => None,
        }
    }

    fn background_input(
        &self,
        background: Option<&BackgroundClip>,
        duration_s: Option<f64>,
        looped: bool,
    ) -> GraphInput {
        match background {
            Some(bg) => GraphInput::File {
                path: bg.path.clone(),
                seek_s: Some(bg.seek_s),
                duration_s,
                looped,
            },
            None => GraphInput::Lavfi {
                source: format!(
                    "color=c=black:s={}:r={}",
                    self.canvas.to_ffmpeg(),
                    self.fps.to_ffmpeg()
                ),
                duration_s,
            },
        }
    }

    fn silence(&self, duration_s: Option<f64>) -> GraphInput {
        let layout = if self.channels == 1 { "mono" } else { "stereo" };
        GraphInput::Lavfi {
            source: format!("anullsrc=r={}:cl={layout}", self.sample_rate),
            duration_s,
        }
    }

    /// Scale to cover, center-crop to the canvas, square pixels.
    fn cover_canvas(&self) -> Vec<Filter> {
        let (w, h) = (self.canvas.width, self.canvas.height);
        vec![
            Filter::new("scale")
                .arg(w)
                .arg(h)
                .kv("force_original_aspect_ratio", "increase"),
            Filter::new("crop")
                .arg(w)
                .arg(h)
                .arg("(iw-ow)/2")
                .arg("(ih-oh)/2"),
            Filter::new("setsar").arg(1),
        ]
    }

    fn legibility(&self) -> Vec<Filter> {
        let mut out = Vec::new();
        if let Some(r) = self.background.blur_radius
            && r > 0
        {
            out.push(Filter::new("boxblur").arg(r));
        }
        let d = self.background.darken;
        if d < 1.0 {
            out.push(
                Filter::new("colorchannelmixer")
                    .kv("rr", d)
                    .kv("gg", d)
                    .kv("bb", d),
            );
        }
        out
    }

    fn video_fades(&self, duration_s: Option<f64>, alpha: bool) -> Vec<Filter> {
        if self.fade_s <= 0.0 {
            return Vec::new();
        }
        let fade = |kind: &str, start: f64| {
            let f = Filter::new("fade")
                .kv("t", kind)
                .kv("st", format_secs(start))
                .kv("d", format_secs(self.fade_s));
            if alpha { f.kv("alpha", 1) } else { f }
        };

        let mut out = vec![fade("in", 0.0)];
        if let Some(d) = duration_s {
            out.push(fade("out", (d - self.fade_s).max(0.0)));
        }
        out
    }

    fn audio_fades(&self, duration_s: f64) -> Vec<Filter> {
        if self.fade_s <= 0.0 {
            return Vec::new();
        }
        let d = format_secs(self.fade_s);
        vec![
            Filter::new("afade")
                .kv("t", "in")
                .kv("st", 0)
                .kv("d", &d),
            Filter::new("afade")
                .kv("t", "out")
                .kv("st", format_secs((duration_s - self.fade_s).max(0.0)))
                .kv("d", &d),
        ]
    }

    fn loudnorm(&self) -> Filter {
        Filter::new("loudnorm")
            .kv("I", self.loudness.integrated_lufs)
            .kv("TP", self.loudness.true_peak_db)
            .kv("LRA", self.loudness.range_lu)
    }

    fn title_lines(&self, theme_title: &str, font_file: Option<&Path>) -> Vec<Filter> {
        let cfg = &self.intro;
        wrap(&theme_title.to_uppercase(), cfg.title_max_chars)
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let mut f = Filter::new("drawtext");
                if let Some(font) = font_file {
                    f = f.quoted("fontfile", escape(&font.to_string_lossy()));
                }
                f.quoted("text", escape(line))
                    .kv("expansion", "none")
                    .kv("fontcolor", cfg.text_color.to_ffmpeg())
                    .kv("fontsize", cfg.font_size)
                    .kv("x", "(w-text_w)/2")
                    .kv("y", cfg.start_y + i as u32 * cfg.line_height)
                    .kv("borderw", cfg.border_width)
                    .kv("bordercolor", cfg.border_color.to_ffmpeg())
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/compiler.rs"]
mod tests;
