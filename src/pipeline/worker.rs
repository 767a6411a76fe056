use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::events::{CancelToken, ChannelSink, PipelineEvent};
use crate::pipeline::orchestrator::{ClipPipelineOrchestrator, RunReport};

/// A run executing on a background thread.
#[derive(Debug)]
pub struct RunHandle {
    pub events: mpsc::Receiver<PipelineEvent>,
    pub cancel: CancelToken,
    join: JoinHandle<ReelResult<RunReport>>,
}

impl RunHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end and return its result.
    pub fn wait(self) -> ReelResult<RunReport> {
        self.join
            .join()
            .map_err(|_| ReelError::Other(anyhow::anyhow!("pipeline worker panicked")))?
    }
}

/// Run `orchestrator` on its own thread so the caller stays responsive. Events arrive on
/// [`RunHandle::events`]; [`RunHandle::cancel`] stops the run at the next stage boundary.
pub fn spawn_run(orchestrator: ClipPipelineOrchestrator) -> ReelResult<RunHandle> {
    let (sink, events) = ChannelSink::new();
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let join = std::thread::Builder::new()
        .name("rankreel-run".to_string())
        .spawn(move || orchestrator.run(&sink, &token))
        .map_err(|e| ReelError::Other(anyhow::Error::new(e).context("spawn pipeline worker")))?;
    Ok(RunHandle {
        events,
        cancel,
        join,
    })
}
