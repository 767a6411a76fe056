use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use crate::foundation::error::{ReelError, ReelResult};

/// Per-item processing stage, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Selecting,
    Acquiring,
    Rendering,
    Encoding,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Selecting => "selecting",
            Self::Acquiring => "acquiring",
            Self::Rendering => "rendering",
            Self::Encoding => "encoding",
        })
    }
}

/// Progress narration for observers of a run.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted,
    ThemeReady {
        title: String,
        items: usize,
    },
    IntroBuilt {
        clip: PathBuf,
        duration_s: f64,
    },
    IntroSkipped {
        reason: String,
    },
    StageEntered {
        rank: u32,
        stage: Stage,
    },
    CandidateSelected {
        rank: u32,
        title: String,
        score: i64,
    },
    ItemDone {
        rank: u32,
        clip: PathBuf,
    },
    ItemSkipped {
        rank: u32,
        stage: Stage,
        reason: String,
    },
    Concatenating {
        clips: usize,
    },
    Finished {
        output: PathBuf,
    },
    NothingProduced,
}

/// Receives [`PipelineEvent`]s as they happen.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::ItemSkipped {
                rank,
                stage,
                reason,
            } => tracing::warn!(rank, %stage, reason, "item skipped"),
            PipelineEvent::IntroSkipped { reason } => tracing::warn!(reason, "intro skipped"),
            PipelineEvent::NothingProduced => tracing::warn!("nothing produced"),
            PipelineEvent::StageEntered { rank, stage } => tracing::debug!(rank, %stage, "stage"),
            other => tracing::info!(event = ?other, "pipeline"),
        }
    }
}

/// Sends events over a channel to another thread. A dropped receiver is ignored.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PipelineEvent) {
        tracing::trace!(?event, "event");
        let _ = self.tx.send(event);
    }
}

/// Cooperative cancellation, checked by the orchestrator at stage boundaries.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> ReelResult<()> {
        if self.is_cancelled() {
            return Err(ReelError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/events.rs"]
mod tests;
