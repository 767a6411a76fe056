//! Source-clip search and segment download through the `yt-dlp` command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::config::AcquisitionConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::collaborators::{Acquired, Downloader, VideoSearch};
use crate::select::scorer::{SearchEntry, VideoCandidate};

const FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

#[derive(Clone, Debug)]
pub struct YtDlp {
    program: PathBuf,
    cfg: AcquisitionConfig,
    /// Directory holding the ffmpeg binary yt-dlp should use for cutting and merging.
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(cfg: &AcquisitionConfig, ffmpeg: Option<&Path>) -> ReelResult<Self> {
        let program = which::which(&cfg.ytdlp).map_err(|e| {
            ReelError::validation(format!(
                "'{}' is required but was not found: {e}",
                cfg.ytdlp.display()
            ))
        })?;
        let ffmpeg_location = ffmpeg
            .and_then(|p| which::which(p).ok())
            .and_then(|p| p.parent().map(Path::to_path_buf));
        Ok(Self {
            program,
            cfg: cfg.clone(),
            ffmpeg_location,
        })
    }

    pub fn search_query(&self, artist: &str, song: &str) -> String {
        format!(
            "ytsearch{}:{artist} - {song} {}",
            self.cfg.results, self.cfg.query_suffix
        )
        .trim_end()
        .to_string()
    }

    pub fn search_args(&self, artist: &str, song: &str) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--no-download".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--ignore-errors".to_string(),
            "--match-filter".to_string(),
            "!is_live".to_string(),
            "--".to_string(),
            self.search_query(artist, song),
        ]
    }

    /// Section to cut from a source of `source_duration_s`: starts at `start_fraction` of the
    /// source, whole seconds, covering at least `target_duration_s`.
    pub fn section(&self, source_duration_s: Option<f64>, target_duration_s: f64) -> (u64, u64) {
        let total = source_duration_s
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.cfg.fallback_duration_s);
        let start = (total * self.cfg.start_fraction).floor().max(0.0) as u64;
        let end = start + target_duration_s.max(0.0).ceil() as u64;
        (start, end)
    }

    pub fn download_args(
        &self,
        candidate: &VideoCandidate,
        target_duration_s: f64,
        out_stem: &Path,
    ) -> Vec<OsString> {
        let (start, end) = self.section(candidate.duration_seconds, target_duration_s);
        let mut template = out_stem.as_os_str().to_owned();
        template.push(".%(ext)s");

        let mut args: Vec<OsString> = [
            "--quiet",
            "--no-warnings",
            "--no-playlist",
            "--download-sections",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(format!("*{start}-{end}").into());
        args.extend(
            [
                "--force-keyframes-at-cuts",
                "-f",
                FORMAT,
                "--merge-output-format",
                "mp4",
            ]
            .into_iter()
            .map(OsString::from),
        );
        if self.cfg.write_thumbnail {
            args.extend(
                ["--write-thumbnail", "--convert-thumbnails", "jpg"]
                    .into_iter()
                    .map(OsString::from),
            );
        }
        if let Some(loc) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(loc.clone().into_os_string());
        }
        args.extend(["-o".into(), template, "--".into(), candidate.url.clone().into()]);
        args
    }
}

/// Parse `--dump-json` output: one JSON object per line. Live streams and malformed lines are
/// dropped.
pub fn parse_search_output(stdout: &str) -> Vec<SearchEntry> {
    #[derive(serde::Deserialize)]
    struct Info {
        title: Option<String>,
        channel: Option<String>,
        uploader: Option<String>,
        webpage_url: Option<String>,
        url: Option<String>,
        duration: Option<f64>,
        #[serde(default)]
        is_live: Option<bool>,
        live_status: Option<String>,
    }

    stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .filter_map(|l| match serde_json::from_str::<Info>(l) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!(error = %e, "unparseable search line");
                None
            }
        })
        .filter(|i| i.is_live != Some(true) && i.live_status.as_deref() != Some("is_live"))
        .filter_map(|i| {
            let url = i.webpage_url.or(i.url)?;
            Some(SearchEntry {
                title: i.title.unwrap_or_default(),
                channel: i.channel.or(i.uploader).unwrap_or_default(),
                url,
                duration_seconds: i.duration,
            })
        })
        .collect()
}

/// Files yt-dlp wrote for `out_stem`: the media file and, if present, a `.jpg` thumbnail.
pub fn locate_outputs(out_stem: &Path) -> ReelResult<Acquired> {
    let dir = match out_stem.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = out_stem
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut media = Vec::new();
    let mut thumbnail = None;
    let entries = std::fs::read_dir(&dir)
        .map_err(|e| ReelError::acquisition(format!("list '{}': {e}", dir.display())))?;
    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&format!("{stem}.")) || name.ends_with(".part") {
            continue;
        }
        let path = entry.path();
        if name.ends_with(".jpg") {
            thumbnail = Some(path);
        } else {
            media.push(path);
        }
    }
    media.sort();
    let preferred = out_stem.with_extension("mp4");
    let media = if media.contains(&preferred) {
        preferred
    } else {
        media.into_iter().next().ok_or_else(|| {
            ReelError::acquisition(format!("no media file written for '{}'", out_stem.display()))
        })?
    };
    Ok(Acquired { media, thumbnail })
}

fn run_ytdlp(program: &Path, args: &[OsString]) -> ReelResult<()> {
    let out = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ReelError::acquisition(format!("failed to run yt-dlp: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::acquisition(format!(
            "yt-dlp exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

impl VideoSearch for YtDlp {
    #[tracing::instrument(skip(self))]
    fn search(&self, artist: &str, song: &str) -> ReelResult<Vec<SearchEntry>> {
        let args: Vec<OsString> = self
            .search_args(artist, song)
            .into_iter()
            .map(OsString::from)
            .collect();
        let out = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ReelError::acquisition(format!("failed to run yt-dlp: {e}")))?;
        let entries = parse_search_output(&String::from_utf8_lossy(&out.stdout));
        // With --ignore-errors one broken result fails the exit status but the rest are usable.
        if !out.status.success() && entries.is_empty() {
            return Err(ReelError::acquisition(format!(
                "yt-dlp search exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        tracing::info!(results = entries.len(), "search finished");
        Ok(entries)
    }
}

impl Downloader for YtDlp {
    #[tracing::instrument(skip(self, candidate), fields(url = %candidate.url))]
    fn download(
        &self,
        candidate: &VideoCandidate,
        target_duration_s: f64,
        out_stem: &Path,
    ) -> ReelResult<Acquired> {
        let args = self.download_args(candidate, target_duration_s, out_stem);
        run_ytdlp(&self.program, &args)?;
        locate_outputs(out_stem)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/ytdlp.rs"]
mod tests;
