use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::animation::ease::Ease;
use crate::foundation::core::{Canvas, Fps, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::select::scorer::ScoringPolicy;

/// Complete run configuration. Every field has a documented default, so a config file only
/// needs to name what it overrides.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub canvas: Canvas,
    pub fps: u32,
    /// Length of every per-item card clip.
    pub card_duration_s: f64,
    /// Fade-in/fade-out length applied to card video, overlay and audio.
    pub fade_s: f64,
    pub timeline: TimelineConfig,
    pub card: CardStyle,
    pub fonts: FontConfig,
    pub intro: IntroConfig,
    pub loudness: LoudnessTarget,
    pub background: BackgroundStyle,
    pub encoder: EncoderConfig,
    pub dirs: DirConfig,
    pub threading: RenderThreading,
    pub scoring: ScoringPolicy,
    pub acquisition: AcquisitionConfig,
    pub narrator: NarratorConfig,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            fps: 30,
            card_duration_s: 5.0,
            fade_s: 0.5,
            timeline: TimelineConfig::default(),
            card: CardStyle::default(),
            fonts: FontConfig::default(),
            intro: IntroConfig::default(),
            loudness: LoudnessTarget::default(),
            background: BackgroundStyle::default(),
            encoder: EncoderConfig::default(),
            dirs: DirConfig::default(),
            threading: RenderThreading::default(),
            scoring: ScoringPolicy::default(),
            acquisition: AcquisitionConfig::default(),
            narrator: NarratorConfig::default(),
        }
    }
}

/// Entrance slide and counter timing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub slide_duration_s: f64,
    pub slide_distance_px: f64,
    /// Pause between the end of the slide and the start of the counter.
    pub count_delay_s: f64,
    pub count_duration_s: f64,
    pub slide_ease: Ease,
    pub count_ease: Ease,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            slide_duration_s: 0.8,
            slide_distance_px: 500.0,
            count_delay_s: 0.2,
            count_duration_s: 1.5,
            slide_ease: Ease::OutCubic,
            count_ease: Ease::OutQuad,
        }
    }
}

/// Geometry, palette and text budgets of the card overlay.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CardStyle {
    pub width: u32,
    pub height: u32,
    pub corner_radius: f64,
    pub shadow_spread: f64,
    pub shadow_radius: f64,
    pub border_width: f64,
    pub title_y: f64,
    pub title_shadow_offset: f64,
    pub thumb_size: u32,
    pub thumb_ring_width: f64,
    pub song_max_chars: usize,
    pub artist_max_chars: usize,
    pub thousands_separator: char,
    pub rank_font_px: f32,
    pub song_font_px: f32,
    pub artist_font_px: f32,
    pub stat_font_px: f32,
    pub title_font_px: f32,
    pub accent: Rgba8,
    pub glass: Rgba8,
    pub shadow: Rgba8,
    pub text: Rgba8,
    pub muted_text: Rgba8,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 500,
            corner_radius: 30.0,
            shadow_spread: 10.0,
            shadow_radius: 40.0,
            border_width: 4.0,
            title_y: 150.0,
            title_shadow_offset: 5.0,
            thumb_size: 300,
            thumb_ring_width: 8.0,
            song_max_chars: 22,
            artist_max_chars: 25,
            thousands_separator: '.',
            rank_font_px: 140.0,
            song_font_px: 60.0,
            artist_font_px: 45.0,
            stat_font_px: 50.0,
            title_font_px: 70.0,
            accent: Rgba8::rgb(0, 255, 128),
            glass: Rgba8::rgba(20, 20, 30, 220),
            shadow: Rgba8::rgba(0, 0, 0, 100),
            text: Rgba8::rgb(255, 255, 255),
            muted_text: Rgba8::rgb(180, 180, 180),
        }
    }
}

/// Font files used by the card rasterizer and the intro's drawtext nodes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub bold: PathBuf,
    pub regular: PathBuf,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            bold: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
            regular: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
        }
    }
}

/// Title intro styling and narration text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IntroConfig {
    pub title_max_chars: usize,
    pub font_size: u32,
    pub line_height: u32,
    pub start_y: u32,
    pub text_color: Rgba8,
    pub border_width: u32,
    pub border_color: Rgba8,
    /// `{title}` is replaced with the theme title.
    pub narration_template: String,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            title_max_chars: 20,
            font_size: 75,
            line_height: 90,
            start_y: 700,
            text_color: Rgba8::rgb(255, 255, 0),
            border_width: 3,
            border_color: Rgba8::rgb(0, 0, 0),
            narration_template: "Here is the {title}. Let's go!".to_string(),
        }
    }
}

impl IntroConfig {
    pub fn narration_text(&self, title: &str) -> String {
        self.narration_template.replace("{title}", title)
    }
}

/// EBU R128 loudness normalization target.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoudnessTarget {
    pub integrated_lufs: f64,
    pub true_peak_db: f64,
    pub range_lu: f64,
}

impl Default for LoudnessTarget {
    fn default() -> Self {
        Self {
            integrated_lufs: -16.0,
            true_peak_db: -1.5,
            range_lu: 11.0,
        }
    }
}

/// Legibility treatment for card backgrounds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackgroundStyle {
    /// Per-channel gain in `(0, 1]`; `1.0` disables darkening.
    pub darken: f64,
    /// Box blur radius in pixels; `None` disables blurring.
    pub blur_radius: Option<u32>,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            darken: 0.5,
            blur_radius: None,
        }
    }
}

/// External encoder invocation settings shared by every clip so stream-copy concat works.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub crf: u32,
    pub preset: String,
    pub gop: u32,
    pub audio_bitrate: String,
    pub sample_rate: u32,
    pub channels: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            crf: 20,
            preset: "fast".to_string(),
            gop: 60,
            audio_bitrate: "192k".to_string(),
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DirConfig {
    pub scratch: PathBuf,
    pub output: PathBuf,
    pub history_file: PathBuf,
}

impl Default for DirConfig {
    fn default() -> Self {
        Self {
            scratch: PathBuf::from("temp"),
            output: PathBuf::from("output"),
            history_file: PathBuf::from("used_themes.txt"),
        }
    }
}

/// How card frames are rasterized.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderThreading {
    pub parallel: bool,
    pub threads: Option<usize>,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// yt-dlp search and download settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub ytdlp: PathBuf,
    /// Results requested per search (`ytsearchN:`).
    pub results: u32,
    /// Appended to `"<artist> - <song>"` to form the query.
    pub query_suffix: String,
    /// Where in the source the downloaded segment starts, as a fraction of its duration.
    pub start_fraction: f64,
    /// Assumed source length when the search result carries none.
    pub fallback_duration_s: f64,
    pub write_thumbnail: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            ytdlp: PathBuf::from("yt-dlp"),
            results: 3,
            query_suffix: "Official Music Video".to_string(),
            start_fraction: 0.35,
            fallback_duration_s: 180.0,
            write_thumbnail: true,
        }
    }
}

/// Speech synthesis command. `{text}` and `{out}` in `args` are substituted per call.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NarratorConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("edge-tts"),
            args: [
                "--voice",
                "en-US-ChristopherNeural",
                "--rate=+25%",
                "--text",
                "{text}",
                "--write-media",
                "{out}",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl ReelConfig {
    /// Read a JSON config file; missing fields keep their defaults.
    pub fn load(path: &Path) -> ReelResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ReelError::serde(format!("parse config '{}': {e}", path.display())))?;
        Ok(cfg)
    }

    pub fn fps(&self) -> ReelResult<Fps> {
        Fps::whole(self.fps)
    }

    /// Number of overlay frames in one card clip.
    pub fn card_frames(&self) -> u64 {
        (self.card_duration_s * f64::from(self.fps)).floor().max(0.0) as u64
    }

    pub fn validate(&self) -> ReelResult<()> {
        self.canvas.validate()?;
        if self.fps == 0 {
            return Err(ReelError::validation("fps must be > 0"));
        }
        if !self.card_duration_s.is_finite() || self.card_duration_s <= 0.0 {
            return Err(ReelError::validation("card_duration_s must be finite and > 0"));
        }
        if !self.fade_s.is_finite() || self.fade_s < 0.0 {
            return Err(ReelError::validation("fade_s must be finite and >= 0"));
        }
        if self.fade_s * 2.0 > self.card_duration_s {
            return Err(ReelError::validation(
                "fade in + fade out must fit inside card_duration_s",
            ));
        }
        if self.card_frames() == 0 {
            return Err(ReelError::validation("card clip must contain at least one frame"));
        }

        let t = &self.timeline;
        for (name, v) in [
            ("timeline.slide_duration_s", t.slide_duration_s),
            ("timeline.count_duration_s", t.count_duration_s),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(ReelError::validation(format!("{name} must be finite and > 0")));
            }
        }
        if !t.count_delay_s.is_finite() || !t.slide_distance_px.is_finite() {
            return Err(ReelError::validation("timeline values must be finite"));
        }

        let c = &self.card;
        if c.width > self.canvas.width || c.height > self.canvas.height {
            return Err(ReelError::validation("card must fit inside the canvas"));
        }
        if c.thumb_size == 0 || c.thumb_size > c.height {
            return Err(ReelError::validation(
                "card.thumb_size must be > 0 and fit inside the card",
            ));
        }
        if c.song_max_chars < 4 || c.artist_max_chars < 4 {
            return Err(ReelError::validation(
                "text budgets must leave room for the ellipsis marker",
            ));
        }

        if self.intro.title_max_chars == 0 {
            return Err(ReelError::validation("intro.title_max_chars must be > 0"));
        }
        if !(self.background.darken > 0.0 && self.background.darken <= 1.0) {
            return Err(ReelError::validation("background.darken must be in (0, 1]"));
        }
        if self.threading.threads == Some(0) {
            return Err(ReelError::validation(
                "threading.threads must be >= 1 when set",
            ));
        }
        if self.encoder.sample_rate == 0 || self.encoder.channels == 0 {
            return Err(ReelError::validation(
                "encoder sample_rate/channels must be non-zero",
            ));
        }
        let a = &self.acquisition;
        if a.results == 0 {
            return Err(ReelError::validation("acquisition.results must be > 0"));
        }
        if !(0.0..1.0).contains(&a.start_fraction) {
            return Err(ReelError::validation(
                "acquisition.start_fraction must be in [0, 1)",
            ));
        }
        if !a.fallback_duration_s.is_finite() || a.fallback_duration_s <= 0.0 {
            return Err(ReelError::validation(
                "acquisition.fallback_duration_s must be finite and > 0",
            ));
        }
        if !self.narrator.args.iter().any(|a| a.contains("{out}")) {
            return Err(ReelError::validation(
                "narrator.args must contain an {out} placeholder",
            ));
        }
        self.scoring.validate()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
