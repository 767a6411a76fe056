use crate::foundation::error::{ReelError, ReelResult};

/// One search hit as reported by the video search collaborator.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchEntry {
    pub title: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// A scored search hit.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VideoCandidate {
    pub title: String,
    pub channel: String,
    pub url: String,
    pub duration_seconds: Option<f64>,
    pub score: i64,
    /// Position in the search results; breaks score ties.
    pub index: usize,
}

/// Additive weights for candidate scoring. All substring tests are case-insensitive.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Channel name suffixes of official distributors (`vevo`, ` - topic`).
    pub official_channel_suffixes: Vec<String>,
    pub official_channel_bonus: i64,
    pub artist_bonus: i64,
    pub official_bonus: i64,
    pub song_bonus: i64,
    /// Applied once per matched word in `media_words`.
    pub media_word_bonus: i64,
    pub media_words: Vec<String>,
    pub disqualifying_terms: Vec<String>,
    /// Negative; must outweigh every positive bonus combined.
    pub disqualify_penalty: i64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            official_channel_suffixes: vec!["vevo".to_string(), " - topic".to_string()],
            official_channel_bonus: 1000,
            artist_bonus: 20,
            official_bonus: 5,
            song_bonus: 10,
            media_word_bonus: 2,
            media_words: vec!["video".to_string(), "music".to_string()],
            disqualifying_terms: [
                "review", "reaction", "cover", "lyrics", "live", "fan-made", "fan made", "parody",
                "karaoke", "remix",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            disqualify_penalty: -10_000,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> ReelResult<()> {
        for (name, v) in [
            ("official_channel_bonus", self.official_channel_bonus),
            ("artist_bonus", self.artist_bonus),
            ("official_bonus", self.official_bonus),
            ("song_bonus", self.song_bonus),
            ("media_word_bonus", self.media_word_bonus),
        ] {
            if v < 0 {
                return Err(ReelError::validation(format!("scoring.{name} must be >= 0")));
            }
        }
        if self.disqualify_penalty + self.max_positive_bonus() >= 0 {
            return Err(ReelError::validation(
                "scoring.disqualify_penalty must outweigh all positive bonuses combined",
            ));
        }
        Ok(())
    }

    /// Sum of every bonus an entry could possibly collect.
    pub fn max_positive_bonus(&self) -> i64 {
        self.official_channel_bonus
            + self.artist_bonus
            + self.official_bonus
            + self.song_bonus
            + self.media_word_bonus * self.media_words.len() as i64
    }

    pub fn score_entry(&self, entry: &SearchEntry, artist: &str, song: &str) -> i64 {
        let title = entry.title.to_lowercase();
        let channel = entry.channel.to_lowercase();
        let artist = artist.trim().to_lowercase();
        let song = song.trim().to_lowercase();

        let mut score = 0i64;

        if self
            .official_channel_suffixes
            .iter()
            .any(|s| channel.trim_end().ends_with(&s.to_lowercase()))
        {
            score += self.official_channel_bonus;
        }
        if !artist.is_empty() && (channel.contains(&artist) || title.contains(&artist)) {
            score += self.artist_bonus;
        }
        if title.contains("official") {
            score += self.official_bonus;
        }
        if !song.is_empty() && title.contains(&song) {
            score += self.song_bonus;
        }
        for word in &self.media_words {
            if title.contains(&word.to_lowercase()) {
                score += self.media_word_bonus;
            }
        }

        let disqualified = self.disqualifying_terms.iter().any(|term| {
            let term = term.to_lowercase();
            title.contains(&term) || channel.contains(&term)
        });
        if disqualified {
            score += self.disqualify_penalty;
        }

        score
    }
}

/// Picks the best source clip among search results for one ranked item.
#[derive(Clone, Debug, Default)]
pub struct CandidateScorer {
    policy: ScoringPolicy,
}

impl CandidateScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// All entries scored and ordered by `(score desc, index asc)`.
    pub fn rank(&self, entries: &[SearchEntry], artist: &str, song: &str) -> Vec<VideoCandidate> {
        let mut scored: Vec<VideoCandidate> = entries
            .iter()
            .enumerate()
            .map(|(index, e)| VideoCandidate {
                title: e.title.clone(),
                channel: e.channel.clone(),
                url: e.url.clone(),
                duration_seconds: e.duration_seconds,
                score: self.policy.score_entry(e, artist, song),
                index,
            })
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
        scored
    }

    /// Best entry, or [`ReelError::NoCandidates`] when nothing scores above zero.
    #[tracing::instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn score(
        &self,
        entries: &[SearchEntry],
        artist: &str,
        song: &str,
    ) -> ReelResult<VideoCandidate> {
        if entries.is_empty() {
            return Err(ReelError::no_candidates(format!(
                "search returned nothing for '{artist} - {song}'"
            )));
        }

        let best = self
            .rank(entries, artist, song)
            .into_iter()
            .next()
            .filter(|c| c.score > 0)
            .ok_or_else(|| {
                ReelError::no_candidates(format!(
                    "no positively scored result among {} for '{artist} - {song}'",
                    entries.len()
                ))
            })?;

        tracing::debug!(title = %best.title, channel = %best.channel, score = best.score, "selected candidate");
        Ok(best)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/select/scorer.rs"]
mod tests;
