//! Interfaces of the external services a run depends on.
//!
//! Concrete implementations live in `crate::services`; tests use in-memory fakes.

use std::path::{Path, PathBuf};

use crate::foundation::error::ReelResult;
use crate::foundation::model::ThemeData;
use crate::select::scorer::{SearchEntry, VideoCandidate};

/// Produces the theme and ranking for a run.
pub trait ContentGenerator: Send + Sync {
    /// `recent_titles` are themes already used, oldest first; avoid repeating them.
    fn generate(&self, recent_titles: &[String]) -> ReelResult<ThemeData>;
}

/// Finds source-clip candidates for one ranked song.
pub trait VideoSearch: Send + Sync {
    fn search(&self, artist: &str, song: &str) -> ReelResult<Vec<SearchEntry>>;
}

/// A downloaded source segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Acquired {
    pub media: PathBuf,
    pub thumbnail: Option<PathBuf>,
}

/// Downloads a segment of at least `target_duration_s` from the chosen candidate.
pub trait Downloader: Send + Sync {
    /// `out_stem` is the output path without extension; the implementation picks the extension.
    fn download(
        &self,
        candidate: &VideoCandidate,
        target_duration_s: f64,
        out_stem: &Path,
    ) -> ReelResult<Acquired>;
}

/// Speech synthesis for the intro narration.
pub trait Narrator: Send + Sync {
    /// Write synthesized speech for `text` to `out` and return the written path.
    fn synthesize(&self, text: &str, out: &Path) -> ReelResult<PathBuf>;
}
