#![forbid(unsafe_code)]

//! `rankreel` assembles short vertical "ranking" videos.
//!
//! For each ranked item a source clip is selected ([`CandidateScorer`]), an animated card overlay
//! is rasterized frame by frame ([`FrameCompositor`] driven by [`AnimationTimeline`]), and a
//! filter graph ([`FilterGraphCompiler`]) composites overlay, background and normalized audio
//! through an external `ffmpeg`. [`ClipPipelineOrchestrator`] runs the whole sequence and
//! concatenates the narrated intro with every produced card clip.

pub mod animation;
pub mod encode;
pub mod foundation;
pub mod graph;
pub mod pipeline;
pub mod render;
pub mod select;
pub mod services;
pub mod text;

pub use animation::ease::Ease;
pub use animation::stat::StatValue;
pub use animation::timeline::{AnimationState, AnimationTimeline};
pub use encode::ffmpeg::{Ffmpeg, MediaInfo, MediaTool};
pub use foundation::config::ReelConfig;
pub use foundation::core::{Canvas, Fps, FrameIndex, Rgba8};
pub use foundation::error::{ReelError, ReelResult};
pub use foundation::model::{RankEntry, ThemeData};
pub use graph::compiler::{BackgroundClip, FilterGraphCompiler};
pub use graph::model::FilterGraphSpec;
pub use pipeline::events::{CancelToken, EventSink, PipelineEvent, Stage};
pub use pipeline::orchestrator::{
    ClipPipelineOrchestrator, Collaborators, ItemOutcome, RunOutcome, RunReport,
};
pub use pipeline::worker::{RunHandle, spawn_run};
pub use render::card::{FrameCompositor, FrameSequence};
pub use select::scorer::{CandidateScorer, SearchEntry, VideoCandidate};
pub use text::shaper::FontSet;
