use super::*;

fn entry(title: &str, channel: &str) -> SearchEntry {
    SearchEntry {
        title: title.to_string(),
        channel: channel.to_string(),
        url: format!("https://example.invalid/{}", title.len()),
        duration_seconds: Some(240.0),
    }
}

#[test]
fn official_channel_dominates() {
    let scorer = CandidateScorer::default();
    let entries = vec![
        entry("Queen - Bohemian Rhapsody (Official Music Video)", "Some Uploader"),
        entry("Bohemian Rhapsody", "Queen - Topic"),
    ];
    let best = scorer.score(&entries, "Queen", "Bohemian Rhapsody").unwrap();
    assert_eq!(best.index, 1);
    assert_eq!(best.channel, "Queen - Topic");
}

#[test]
fn vevo_suffix_is_case_insensitive() {
    let p = ScoringPolicy::default();
    let score = p.score_entry(&entry("Hello", "AdeleVEVO"), "Adele", "Hello");
    assert_eq!(score, 1000 + 20 + 10);
}

#[test]
fn disqualified_never_outranks_clean_entry() {
    let p = ScoringPolicy::default();
    p.validate().unwrap();
    assert!(p.disqualify_penalty + p.max_positive_bonus() < 0);

    let scorer = CandidateScorer::new(p);
    let entries = vec![
        entry("Queen - Bohemian Rhapsody Official Music Video REACTION", "QueenVEVO"),
        entry("bohemian rhapsody", "random"),
    ];
    let ranked = scorer.rank(&entries, "Queen", "Bohemian Rhapsody");
    assert_eq!(ranked[0].index, 1);
    assert!(ranked[1].score < 0);
}

#[test]
fn each_disqualifying_term_is_penalized() {
    let p = ScoringPolicy::default();
    for term in [
        "review", "reaction", "cover", "lyrics", "live", "fan-made", "fan made", "parody",
        "karaoke", "remix",
    ] {
        let s = p.score_entry(&entry(&format!("Song {term}"), "chan"), "Artist", "Song");
        assert!(s < 0, "{term} scored {s}");
    }
    let in_channel = p.score_entry(&entry("Song", "Karaoke Hits"), "Artist", "Song");
    assert!(in_channel < 0);
}

#[test]
fn term_shared_with_requested_name_still_disqualifies() {
    let scorer = CandidateScorer::default();
    let entries = vec![
        entry("Oasis - Live Forever (Live at Knebworth)", "fan uploads"),
        entry("Oasis official video", "random"),
    ];
    let ranked = scorer.rank(&entries, "Oasis", "Live Forever");
    assert_eq!(ranked[0].index, 1);
    assert!(ranked[0].score > 0);
    assert!(ranked[1].score < 0);
}

#[test]
fn ties_keep_search_order() {
    let scorer = CandidateScorer::default();
    let entries = vec![
        entry("Official Video", "a"),
        entry("Official Video", "b"),
        entry("Official Video", "c"),
    ];
    for _ in 0..3 {
        let best = scorer.score(&entries, "Nobody", "Nothing").unwrap();
        assert_eq!(best.index, 0);
        assert_eq!(best.channel, "a");
    }
    let order: Vec<usize> = scorer
        .rank(&entries, "Nobody", "Nothing")
        .iter()
        .map(|c| c.index)
        .collect();
    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn empty_or_nonpositive_input_has_no_candidates() {
    let scorer = CandidateScorer::default();
    let err = scorer.score(&[], "A", "B").unwrap_err();
    assert!(matches!(err, ReelError::NoCandidates(_)));

    let entries = vec![entry("unrelated upload", "someone"), entry("song cover", "x")];
    let err = scorer.score(&entries, "Zyx", "Qwv").unwrap_err();
    assert!(matches!(err, ReelError::NoCandidates(_)));
    assert!(err.is_item_recoverable());
}

#[test]
fn policy_validation_rejects_weak_penalty() {
    let p = ScoringPolicy {
        disqualify_penalty: -100,
        ..ScoringPolicy::default()
    };
    assert!(p.validate().is_err());

    let p = ScoringPolicy {
        artist_bonus: -1,
        ..ScoringPolicy::default()
    };
    assert!(p.validate().is_err());
}
