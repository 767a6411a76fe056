use std::collections::BTreeSet;

use crate::foundation::error::{ReelError, ReelResult};

/// One ranked item as produced by the content generator.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RankEntry {
    pub rank: u32,
    pub artist: String,
    pub song: String,
    /// Free text, possibly with a leading magnitude ("2.5 Billion Views").
    #[serde(default)]
    pub stat: String,
}

/// A complete ranking video theme.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ThemeData {
    #[serde(alias = "theme_title")]
    pub title: String,
    #[serde(default)]
    pub hook_text: String,
    pub ranking: Vec<RankEntry>,
}

impl ThemeData {
    pub fn validate(&self) -> ReelResult<()> {
        if self.title.trim().is_empty() {
            return Err(ReelError::content("theme title is empty"));
        }
        if self.ranking.is_empty() {
            return Err(ReelError::content("ranking is empty"));
        }
        let mut seen = BTreeSet::new();
        for e in &self.ranking {
            if e.rank == 0 {
                return Err(ReelError::content(format!(
                    "rank must be >= 1 ('{} - {}')",
                    e.artist, e.song
                )));
            }
            if !seen.insert(e.rank) {
                return Err(ReelError::content(format!("duplicate rank #{}", e.rank)));
            }
            if e.artist.trim().is_empty() && e.song.trim().is_empty() {
                return Err(ReelError::content(format!(
                    "rank #{} has neither artist nor song",
                    e.rank
                )));
            }
        }
        Ok(())
    }

    /// Entries in presentation order: highest rank number first, #1 last.
    pub fn presentation_order(&self) -> Vec<&RankEntry> {
        let mut out: Vec<&RankEntry> = self.ranking.iter().collect();
        out.sort_by(|a, b| b.rank.cmp(&a.rank));
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/model.rs"]
mod tests;
