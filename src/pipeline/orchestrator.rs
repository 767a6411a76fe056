//! Sequences one run: content → intro → per-item clips → concatenation.
//!
//! Per ranked item the stages are `Selecting → Acquiring → Rendering → Encoding`. Item-scoped
//! failures (see [`ReelError::is_item_recoverable`]) skip the item and the run continues. The
//! first acquired clip doubles as the intro background, and that item's card segment then starts
//! where the intro ends so the same footage is not shown twice.

use std::path::{Path, PathBuf};

use crate::encode::ffmpeg::MediaTool;
use crate::foundation::config::ReelConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::model::{RankEntry, ThemeData};
use crate::graph::compiler::{BackgroundClip, FilterGraphCompiler};
use crate::pipeline::collaborators::{ContentGenerator, Downloader, Narrator, VideoSearch};
use crate::pipeline::events::{CancelToken, EventSink, PipelineEvent, Stage};
use crate::pipeline::history::{RECENT_TITLES, ThemeHistory};
use crate::pipeline::lock::ScratchLock;
use crate::render::card::FrameCompositor;
use crate::render::thumbs::ThumbnailSource;
use crate::select::scorer::CandidateScorer;
use crate::text::shaper::{FontSet, FontWeight};

/// The external services and tools a run uses.
pub struct Collaborators {
    pub content: Box<dyn ContentGenerator>,
    pub search: Box<dyn VideoSearch>,
    pub downloader: Box<dyn Downloader>,
    pub narrator: Box<dyn Narrator>,
    pub media: Box<dyn MediaTool>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Done { rank: u32, clip: PathBuf },
    Skipped { rank: u32, stage: Stage, reason: String },
}

impl ItemOutcome {
    pub fn rank(&self) -> u32 {
        match self {
            Self::Done { rank, .. } | Self::Skipped { rank, .. } => *rank,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Finished { output: PathBuf },
    /// Neither the intro nor any item produced a clip; nothing was concatenated.
    NothingProduced,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunReport {
    pub title: String,
    pub intro: Option<PathBuf>,
    /// In presentation order.
    pub items: Vec<ItemOutcome>,
    pub outcome: RunOutcome,
}

/// `Viral_<alphanumerics of title>_<unix seconds>.mp4`
pub fn output_file_name(title: &str, unix_secs: u64) -> String {
    let clean: String = title.chars().filter(char::is_ascii_alphanumeric).collect();
    format!("Viral_{clean}_{unix_secs}.mp4")
}

struct Narration {
    audio: PathBuf,
    duration_s: Option<f64>,
}

enum IntroState {
    /// Narration is ready; waiting for the first acquired clip to use as background.
    Pending(Narration),
    Built {
        clip: PathBuf,
        duration_s: f64,
        /// Clip the intro used as background, if any.
        source: Option<PathBuf>,
    },
    Unavailable,
}

impl IntroState {
    fn pending_duration_s(&self) -> f64 {
        match self {
            Self::Pending(n) => n.duration_s.unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

pub struct ClipPipelineOrchestrator {
    cfg: ReelConfig,
    collab: Collaborators,
    scorer: CandidateScorer,
    compositor: FrameCompositor,
    compiler: FilterGraphCompiler,
    history: ThemeHistory,
}

impl ClipPipelineOrchestrator {
    pub fn new(cfg: ReelConfig, fonts: FontSet, collab: Collaborators) -> ReelResult<Self> {
        cfg.validate()?;
        Ok(Self {
            scorer: CandidateScorer::new(cfg.scoring.clone()),
            compositor: FrameCompositor::new(&cfg, fonts)?,
            compiler: FilterGraphCompiler::new(&cfg)?,
            history: ThemeHistory::new(cfg.dirs.history_file.clone()),
            cfg,
            collab,
        })
    }

    pub fn config(&self) -> &ReelConfig {
        &self.cfg
    }

    /// Execute one full run.
    ///
    /// Returns `Err` only for run-fatal failures: content generation, concatenation,
    /// cancellation, scratch/IO problems.
    #[tracing::instrument(skip_all)]
    pub fn run(&self, sink: &dyn EventSink, cancel: &CancelToken) -> ReelResult<RunReport> {
        cancel.check()?;
        let lock = ScratchLock::acquire(&self.cfg.dirs.scratch)?;
        lock.purge()?;
        let scratch = lock.scratch().to_path_buf();
        sink.emit(PipelineEvent::RunStarted);

        let theme = self.generate_theme()?;
        sink.emit(PipelineEvent::ThemeReady {
            title: theme.title.clone(),
            items: theme.ranking.len(),
        });

        cancel.check()?;
        let mut intro = self.narrate(&theme.title, &scratch, sink);

        let mut items = Vec::with_capacity(theme.ranking.len());
        let mut clips = Vec::new();
        for entry in theme.presentation_order() {
            cancel.check()?;
            let mut stage = Stage::Selecting;
            let result = self.process_item(
                entry,
                &theme.title,
                &scratch,
                &mut intro,
                &mut stage,
                sink,
                cancel,
            );
            match result {
                Ok(clip) => {
                    sink.emit(PipelineEvent::ItemDone {
                        rank: entry.rank,
                        clip: clip.clone(),
                    });
                    items.push(ItemOutcome::Done {
                        rank: entry.rank,
                        clip: clip.clone(),
                    });
                    clips.push(clip);
                }
                Err(e) if e.is_item_recoverable() => {
                    let reason = e.to_string();
                    sink.emit(PipelineEvent::ItemSkipped {
                        rank: entry.rank,
                        stage,
                        reason: reason.clone(),
                    });
                    items.push(ItemOutcome::Skipped {
                        rank: entry.rank,
                        stage,
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // No clip was acquired: the intro falls back to a black background.
        if let IntroState::Pending(narration) = &intro {
            cancel.check()?;
            intro = self.finish_intro(&theme.title, narration, None, &scratch, sink);
        }
        let intro_clip = match &intro {
            IntroState::Built { clip, .. } => Some(clip.clone()),
            _ => None,
        };

        let mut all: Vec<PathBuf> = intro_clip.iter().cloned().collect();
        all.extend(clips);
        if all.is_empty() {
            sink.emit(PipelineEvent::NothingProduced);
            return Ok(RunReport {
                title: theme.title,
                intro: None,
                items,
                outcome: RunOutcome::NothingProduced,
            });
        }

        cancel.check()?;
        sink.emit(PipelineEvent::Concatenating { clips: all.len() });
        let output = self.cfg.dirs.output.join(output_file_name(&theme.title, unix_now()));
        self.collab
            .media
            .concat(&all, &scratch.join("concat.txt"), &output)
            .map_err(|e| match e {
                ReelError::Concatenation(_) | ReelError::Cancelled => e,
                other => ReelError::concat(other.to_string()),
            })?;
        sink.emit(PipelineEvent::Finished {
            output: output.clone(),
        });
        drop(lock);

        Ok(RunReport {
            title: theme.title,
            intro: intro_clip,
            items,
            outcome: RunOutcome::Finished { output },
        })
    }

    fn generate_theme(&self) -> ReelResult<ThemeData> {
        let recent = self.history.recent(RECENT_TITLES)?;
        let theme = self
            .collab
            .content
            .generate(&recent)
            .map_err(|e| match e {
                ReelError::ContentGeneration(_) | ReelError::Cancelled => e,
                other => ReelError::content(other.to_string()),
            })?;
        theme.validate()?;
        self.history.append(&theme.title)?;
        tracing::info!(title = %theme.title, items = theme.ranking.len(), "theme ready");
        Ok(theme)
    }

    /// Synthesize the narration and measure it. Failure only costs the intro.
    fn narrate(&self, title: &str, scratch: &Path, sink: &dyn EventSink) -> IntroState {
        let text = self.cfg.intro.narration_text(title);
        match self
            .collab
            .narrator
            .synthesize(&text, &scratch.join("narration.mp3"))
        {
            Ok(audio) if audio.is_file() => {
                let duration_s = self.probe_duration(&audio);
                IntroState::Pending(Narration { audio, duration_s })
            }
            Ok(audio) => {
                sink.emit(PipelineEvent::IntroSkipped {
                    reason: format!("narration '{}' was not written", audio.display()),
                });
                IntroState::Unavailable
            }
            Err(e) => {
                sink.emit(PipelineEvent::IntroSkipped {
                    reason: e.to_string(),
                });
                IntroState::Unavailable
            }
        }
    }

    fn finish_intro(
        &self,
        title: &str,
        narration: &Narration,
        background: Option<&BackgroundClip>,
        scratch: &Path,
        sink: &dyn EventSink,
    ) -> IntroState {
        let font = self.compositor.fonts().get(FontWeight::Bold).file_path();
        let graph = self.compiler.compile_intro(
            title,
            background,
            &narration.audio,
            narration.duration_s,
            font,
        );
        let clip = scratch.join("intro.mp4");
        match self.collab.media.encode(&graph, &clip) {
            Ok(()) => {
                let duration_s = self
                    .probe_duration(&clip)
                    .or(narration.duration_s)
                    .unwrap_or(0.0);
                sink.emit(PipelineEvent::IntroBuilt {
                    clip: clip.clone(),
                    duration_s,
                });
                IntroState::Built {
                    clip,
                    duration_s,
                    source: background.map(|b| b.path.clone()),
                }
            }
            Err(e) => {
                sink.emit(PipelineEvent::IntroSkipped {
                    reason: e.to_string(),
                });
                IntroState::Unavailable
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip_all, fields(rank = entry.rank))]
    fn process_item(
        &self,
        entry: &RankEntry,
        title: &str,
        scratch: &Path,
        intro: &mut IntroState,
        stage: &mut Stage,
        sink: &dyn EventSink,
        cancel: &CancelToken,
    ) -> ReelResult<PathBuf> {
        let rank = entry.rank;
        let card_s = self.cfg.card_duration_s;
        let enter = |s: Stage, stage: &mut Stage| -> ReelResult<()> {
            cancel.check()?;
            *stage = s;
            sink.emit(PipelineEvent::StageEntered { rank, stage: s });
            Ok(())
        };

        enter(Stage::Selecting, stage)?;
        let entries = self
            .collab
            .search
            .search(&entry.artist, &entry.song)
            .map_err(|e| at_stage(Stage::Selecting, e))?;
        let candidate = self.scorer.score(&entries, &entry.artist, &entry.song)?;
        sink.emit(PipelineEvent::CandidateSelected {
            rank,
            title: candidate.title.clone(),
            score: candidate.score,
        });

        enter(Stage::Acquiring, stage)?;
        let target_s = card_s + intro.pending_duration_s();
        let acquired = self
            .collab
            .downloader
            .download(&candidate, target_s, &scratch.join(format!("raw_{rank}")))
            .map_err(|e| at_stage(Stage::Acquiring, e))?;
        if !acquired.media.is_file() {
            return Err(ReelError::acquisition(format!(
                "downloader reported '{}' but no file exists",
                acquired.media.display()
            )));
        }

        let info = match self.collab.media.probe(&acquired.media) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(rank, error = %e, "probe failed, treating clip as silent");
                Default::default()
            }
        };
        let mut background = BackgroundClip {
            path: acquired.media.clone(),
            seek_s: 0.0,
            has_audio: info.has_audio,
        };

        if let IntroState::Pending(narration) = &*intro {
            cancel.check()?;
            *intro = self.finish_intro(title, narration, Some(&background), scratch, sink);
        }
        if let IntroState::Built {
            duration_s,
            source: Some(source),
            ..
        } = &*intro
            && *source == acquired.media
        {
            background.seek_s = *duration_s;
        }
        if let Some(total) = info.duration_s
            && background.seek_s + card_s > total
        {
            background.seek_s = (total - card_s).max(0.0);
        }

        enter(Stage::Rendering, stage)?;
        let thumbs_dir = scratch.join(format!("thumbs_{rank}"));
        let thumbs = match self.collab.media.extract_thumbnails(
            &acquired.media,
            background.seek_s,
            card_s,
            self.cfg.card.thumb_size,
            &thumbs_dir,
        ) {
            Ok(n) if n > 0 => ThumbnailSource::Sequence(thumbs_dir.clone()),
            other => {
                if let Err(e) = other {
                    tracing::warn!(rank, error = %e, "thumbnail extraction failed");
                }
                acquired
                    .thumbnail
                    .clone()
                    .filter(|p| p.is_file())
                    .map(ThumbnailSource::Still)
                    .unwrap_or_default()
            }
        };
        let frames = self.compositor.render(
            entry,
            title,
            &thumbs,
            card_s,
            &scratch.join(format!("frames_{rank}")),
        );
        if thumbs_dir.exists()
            && let Err(e) = std::fs::remove_dir_all(&thumbs_dir)
        {
            tracing::warn!(rank, error = %e, "could not remove thumbnails");
        }
        let frames = frames?;

        enter(Stage::Encoding, stage)?;
        let graph = self.compiler.compile_card(Some(&background), &frames);
        let clip = scratch.join(format!("clip_{rank}.mp4"));
        let encoded = self.collab.media.encode(&graph, &clip);
        if let Err(e) = frames.release() {
            tracing::warn!(rank, error = %e, "could not release frames");
        }
        encoded.map_err(|e| at_stage(Stage::Encoding, e))?;
        Ok(clip)
    }

    fn probe_duration(&self, path: &Path) -> Option<f64> {
        match self.collab.media.probe(path) {
            Ok(info) => info.duration_s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "probe failed");
                None
            }
        }
    }
}

/// Keep recoverable errors and cancellation as they are; anything else raised inside a stage
/// becomes that stage's item-scoped error.
fn at_stage(stage: Stage, e: ReelError) -> ReelError {
    if e.is_item_recoverable() || matches!(e, ReelError::Cancelled) {
        return e;
    }
    let msg = e.to_string();
    match stage {
        Stage::Selecting | Stage::Acquiring => ReelError::acquisition(msg),
        Stage::Rendering => ReelError::render(msg),
        Stage::Encoding => ReelError::encode(msg),
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
