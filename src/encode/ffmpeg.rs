use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;

use crate::foundation::config::{EncoderConfig, ReelConfig};
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};
use crate::graph::model::{Filter, FilterGraphSpec, format_secs, simple_chain};
use crate::render::thumbs::THUMB_PATTERN;

/// What the pipeline needs to know about a media file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    pub duration_s: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// External media operations. [`Ffmpeg`] is the real implementation; tests substitute fakes.
pub trait MediaTool: Send + Sync {
    /// Run one compiled graph into `out` with the shared codec settings.
    fn encode(&self, graph: &FilterGraphSpec, out: &Path) -> ReelResult<()>;

    /// Extract square `thumb_%04d.jpg` frames (1-indexed) from a clip segment. Returns how many
    /// frames were written.
    fn extract_thumbnails(
        &self,
        source: &Path,
        seek_s: f64,
        duration_s: f64,
        size: u32,
        out_dir: &Path,
    ) -> ReelResult<u64>;

    fn probe(&self, path: &Path) -> ReelResult<MediaInfo>;

    /// Stream-copy concatenation of `clips`, in order, into `out`.
    fn concat(&self, clips: &[PathBuf], list_path: &Path, out: &Path) -> ReelResult<()>;
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// The system `ffmpeg`/`ffprobe` binaries.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    encoder: EncoderConfig,
    fps: Fps,
}

impl Ffmpeg {
    /// Resolve both programs up front so a missing install fails before any work starts.
    pub fn new(cfg: &ReelConfig) -> ReelResult<Self> {
        let resolve = |program: &Path| {
            which::which(program).map_err(|e| {
                ReelError::validation(format!(
                    "'{}' is required but was not found: {e}",
                    program.display()
                ))
            })
        };
        Ok(Self {
            ffmpeg: resolve(&cfg.encoder.ffmpeg)?,
            ffprobe: resolve(&cfg.encoder.ffprobe)?,
            encoder: cfg.encoder.clone(),
            fps: cfg.fps()?,
        })
    }

    /// Codec settings shared by every clip so the final concat can stream-copy.
    pub fn output_args(&self) -> Vec<OsString> {
        output_args(&self.encoder, self.fps)
    }

    fn ffmpeg_cmd(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-hide_banner", "-loglevel", "error", "-nostdin"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

pub fn output_args(enc: &EncoderConfig, fps: Fps) -> Vec<OsString> {
    [
        "-c:v".to_string(),
        "libx264".to_string(),
        "-r".to_string(),
        fps.to_ffmpeg(),
        "-g".to_string(),
        enc.gop.to_string(),
        "-sc_threshold".to_string(),
        "0".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        enc.preset.clone(),
        "-crf".to_string(),
        enc.crf.to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        enc.audio_bitrate.clone(),
        "-ar".to_string(),
        enc.sample_rate.to_string(),
        "-ac".to_string(),
        enc.channels.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

/// Arguments that cut `[seek, seek + duration)` of `source` into square JPEG frames.
pub fn thumbnail_args(
    source: &Path,
    seek_s: f64,
    duration_s: f64,
    fps: Fps,
    size: u32,
    out_dir: &Path,
) -> Vec<OsString> {
    let chain = simple_chain(&[
        Filter::new("fps").arg(fps.to_ffmpeg()),
        Filter::new("scale")
            .arg(size)
            .arg(size)
            .kv("force_original_aspect_ratio", "increase"),
        Filter::new("crop").arg(size).arg(size),
    ]);

    let mut args: Vec<OsString> = Vec::new();
    if seek_s > 0.0 {
        args.extend(["-ss".into(), format_secs(seek_s).into()]);
    }
    args.extend(["-t".into(), format_secs(duration_s).into(), "-i".into()]);
    args.push(source.as_os_str().to_owned());
    args.extend([
        "-an".into(),
        "-vf".into(),
        chain.into(),
        "-q:v".into(),
        "3".into(),
        "-start_number".into(),
        "1".into(),
    ]);
    args.push(out_dir.join(THUMB_PATTERN).into_os_string());
    args
}

/// Concat-demuxer list: one `file '<path>'` line per clip, single quotes escaped.
pub fn concat_list(clips: &[PathBuf]) -> String {
    let mut out = String::new();
    for clip in clips {
        let p = clip.to_string_lossy().replace('\'', "'\\''");
        out.push_str(&format!("file '{p}'\n"));
    }
    out
}

fn run(mut cmd: Command, what: &str) -> Result<(), String> {
    tracing::debug!(?cmd, "running {what}");
    let output = cmd
        .output()
        .map_err(|e| format!("failed to spawn {what}: {e}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{what} exited with status {}: {}",
            output.status,
            stderr.trim()
        ));
    }
    Ok(())
}

impl MediaTool for Ffmpeg {
    #[tracing::instrument(skip(self, graph), fields(out = %out.display()))]
    fn encode(&self, graph: &FilterGraphSpec, out: &Path) -> ReelResult<()> {
        ensure_parent_dir(out)?;
        let mut cmd = self.ffmpeg_cmd();
        cmd.args(graph.to_args()?).args(self.output_args()).arg(out);
        run(cmd, "ffmpeg encode").map_err(ReelError::encode)?;
        if !out.is_file() {
            return Err(ReelError::encode(format!(
                "ffmpeg reported success but '{}' is missing",
                out.display()
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn extract_thumbnails(
        &self,
        source: &Path,
        seek_s: f64,
        duration_s: f64,
        size: u32,
        out_dir: &Path,
    ) -> ReelResult<u64> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("create thumbnail dir '{}'", out_dir.display()))?;
        let mut cmd = self.ffmpeg_cmd();
        cmd.args(thumbnail_args(
            source, seek_s, duration_s, self.fps, size, out_dir,
        ));
        run(cmd, "ffmpeg thumbnail extraction").map_err(ReelError::encode)?;

        let count = std::fs::read_dir(out_dir)
            .with_context(|| format!("list thumbnail dir '{}'", out_dir.display()))?
            .filter_map(Result::ok)
            .filter(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                name.starts_with("thumb_") && name.ends_with(".jpg")
            })
            .count() as u64;
        Ok(count)
    }

    fn probe(&self, path: &Path) -> ReelResult<MediaInfo> {
        let out = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelError::encode(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ReelError::encode(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        parse_probe(&out.stdout)
    }

    #[tracing::instrument(skip(self, clips), fields(clips = clips.len(), out = %out.display()))]
    fn concat(&self, clips: &[PathBuf], list_path: &Path, out: &Path) -> ReelResult<()> {
        if clips.is_empty() {
            return Err(ReelError::concat("nothing to concatenate"));
        }
        let absolute: Vec<PathBuf> = clips
            .iter()
            .map(|c| std::path::absolute(c).unwrap_or_else(|_| c.clone()))
            .collect();
        ensure_parent_dir(list_path)?;
        std::fs::write(list_path, concat_list(&absolute))
            .with_context(|| format!("write concat list '{}'", list_path.display()))?;
        ensure_parent_dir(out)?;

        let mut cmd = self.ffmpeg_cmd();
        cmd.args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list_path)
            .args(["-c", "copy"])
            .arg(out);
        run(cmd, "ffmpeg concat").map_err(ReelError::concat)
    }
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe(json: &[u8]) -> ReelResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ReelError::serde(format!("ffprobe json parse failed: {e}")))?;
    let has = |kind: &str| {
        parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some(kind))
    };
    let duration_s = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(MediaInfo {
        duration_s,
        has_video: has("video"),
        has_audio: has("audio"),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
