use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use super::*;
use crate::encode::ffmpeg::MediaInfo;
use crate::graph::model::FilterGraphSpec;
use crate::pipeline::collaborators::Acquired;
use crate::pipeline::events::{ChannelSink, TracingSink};
use crate::select::scorer::{SearchEntry, VideoCandidate};

const NARRATION_S: f64 = 2.0;

#[derive(Default)]
struct MediaLog {
    /// (output file, encoder arguments joined by spaces)
    encodes: Vec<(PathBuf, String)>,
    thumb_seeks: Vec<(PathBuf, f64)>,
    concat: Option<Vec<PathBuf>>,
}

struct FakeMedia {
    log: Arc<Mutex<MediaLog>>,
    fail_concat: bool,
}

impl MediaTool for FakeMedia {
    fn encode(&self, graph: &FilterGraphSpec, out: &Path) -> ReelResult<()> {
        let args = graph
            .to_args()?
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        std::fs::write(out, b"clip").unwrap();
        self.log
            .lock()
            .unwrap()
            .encodes
            .push((out.to_path_buf(), args));
        Ok(())
    }

    fn extract_thumbnails(
        &self,
        source: &Path,
        seek_s: f64,
        _duration_s: f64,
        _size: u32,
        out_dir: &Path,
    ) -> ReelResult<u64> {
        self.log
            .lock()
            .unwrap()
            .thumb_seeks
            .push((source.to_path_buf(), seek_s));
        // like a real encoder that dies after creating its output directory
        std::fs::create_dir_all(out_dir).unwrap();
        std::fs::write(out_dir.join("thumb_0001.jpg"), b"truncated").unwrap();
        Err(ReelError::encode("thumbnails unavailable in tests"))
    }

    fn probe(&self, path: &Path) -> ReelResult<MediaInfo> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        Ok(if name.starts_with("raw_") {
            MediaInfo {
                duration_s: Some(30.0),
                has_video: true,
                has_audio: true,
            }
        } else {
            MediaInfo {
                duration_s: Some(NARRATION_S),
                has_video: name.ends_with(".mp4"),
                has_audio: true,
            }
        })
    }

    fn concat(&self, clips: &[PathBuf], _list_path: &Path, out: &Path) -> ReelResult<()> {
        if self.fail_concat {
            return Err(ReelError::concat("demuxer refused the list"));
        }
        std::fs::create_dir_all(out.parent().unwrap()).unwrap();
        std::fs::write(out, b"final").unwrap();
        self.log.lock().unwrap().concat = Some(clips.to_vec());
        Ok(())
    }
}

struct FixedTheme(ThemeData);

impl ContentGenerator for FixedTheme {
    fn generate(&self, _recent_titles: &[String]) -> ReelResult<ThemeData> {
        Ok(self.0.clone())
    }
}

/// Returns one official upload per song, except for songs listed in `empty`.
struct FakeSearch {
    empty: BTreeSet<String>,
}

impl VideoSearch for FakeSearch {
    fn search(&self, artist: &str, song: &str) -> ReelResult<Vec<SearchEntry>> {
        if self.empty.contains(song) {
            return Ok(Vec::new());
        }
        Ok(vec![
            SearchEntry {
                title: format!("{artist} - {song} (Reaction)"),
                channel: "Someone".to_string(),
                url: "https://example.invalid/reaction".to_string(),
                duration_seconds: Some(600.0),
            },
            SearchEntry {
                title: format!("{artist} - {song} (Official Music Video)"),
                channel: format!("{artist}VEVO"),
                url: format!("https://example.invalid/{song}"),
                duration_seconds: Some(240.0),
            },
        ])
    }
}

struct FakeDownloader {
    fail_all: bool,
    targets: Arc<Mutex<Vec<(String, f64)>>>,
}

impl Downloader for FakeDownloader {
    fn download(
        &self,
        candidate: &VideoCandidate,
        target_duration_s: f64,
        out_stem: &Path,
    ) -> ReelResult<Acquired> {
        self.targets
            .lock()
            .unwrap()
            .push((candidate.url.clone(), target_duration_s));
        if self.fail_all {
            return Err(ReelError::acquisition("network unreachable"));
        }
        let media = out_stem.with_extension("mp4");
        std::fs::write(&media, b"raw").unwrap();
        Ok(Acquired {
            media,
            thumbnail: None,
        })
    }
}

struct FakeNarrator {
    fail: bool,
}

impl Narrator for FakeNarrator {
    fn synthesize(&self, _text: &str, out: &Path) -> ReelResult<PathBuf> {
        if self.fail {
            return Err(ReelError::validation("tts offline"));
        }
        std::fs::write(out, b"speech").unwrap();
        Ok(out.to_path_buf())
    }
}

struct Harness {
    orch: ClipPipelineOrchestrator,
    media: Arc<Mutex<MediaLog>>,
    targets: Arc<Mutex<Vec<(String, f64)>>>,
    root: PathBuf,
}

#[derive(Default)]
struct Options {
    empty_songs: &'static [&'static str],
    fail_downloads: bool,
    fail_narration: bool,
    fail_concat: bool,
}

fn theme(ranks: &[(u32, &str)]) -> ThemeData {
    ThemeData {
        title: "Top 3 Test Songs".to_string(),
        hook_text: String::new(),
        ranking: ranks
            .iter()
            .map(|(rank, song)| RankEntry {
                rank: *rank,
                artist: "Queen".to_string(),
                song: song.to_string(),
                stat: "3.2 Billion Views".to_string(),
            })
            .collect(),
    }
}

fn harness(name: &str, data: ThemeData, opts: Options) -> Option<Harness> {
    let root = PathBuf::from("target").join("orchestrator_tests").join(name);
    let _ = std::fs::remove_dir_all(&root);

    let mut cfg = ReelConfig::default();
    cfg.card_duration_s = 0.1;
    cfg.fade_s = 0.0;
    cfg.threading.parallel = false;
    cfg.dirs.scratch = root.join("temp");
    cfg.dirs.output = root.join("output");
    cfg.dirs.history_file = root.join("used_themes.txt");

    let fonts = match FontSet::load(&cfg.fonts) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("skipping orchestrator test '{name}': no usable font ({e})");
            return None;
        }
    };

    let media = Arc::new(Mutex::new(MediaLog::default()));
    let targets = Arc::new(Mutex::new(Vec::new()));
    let collab = Collaborators {
        content: Box::new(FixedTheme(data)),
        search: Box::new(FakeSearch {
            empty: opts.empty_songs.iter().map(|s| s.to_string()).collect(),
        }),
        downloader: Box::new(FakeDownloader {
            fail_all: opts.fail_downloads,
            targets: Arc::clone(&targets),
        }),
        narrator: Box::new(FakeNarrator {
            fail: opts.fail_narration,
        }),
        media: Box::new(FakeMedia {
            log: Arc::clone(&media),
            fail_concat: opts.fail_concat,
        }),
    };
    Some(Harness {
        orch: ClipPipelineOrchestrator::new(cfg, fonts, collab).unwrap(),
        media,
        targets,
        root,
    })
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn output_name_keeps_only_alphanumerics() {
    assert_eq!(
        output_file_name("TOP 10: Rock's Best!", 1_700_000_000),
        "Viral_TOP10RocksBest_1700000000.mp4"
    );
}

#[test]
fn clips_are_concatenated_intro_first_then_descending_rank() {
    let Some(h) = harness(
        "order",
        theme(&[(1, "One"), (2, "Two"), (3, "Three")]),
        Options::default(),
    ) else {
        return;
    };
    let report = h.orch.run(&TracingSink, &CancelToken::new()).unwrap();

    let log = h.media.lock().unwrap();
    assert_eq!(
        file_names(log.concat.as_ref().unwrap()),
        ["intro.mp4", "clip_3.mp4", "clip_2.mp4", "clip_1.mp4"]
    );
    let ranks: Vec<u32> = report.items.iter().map(ItemOutcome::rank).collect();
    assert_eq!(ranks, [3, 2, 1]);
    let RunOutcome::Finished { output } = &report.outcome else {
        panic!("expected a finished run, got {:?}", report.outcome);
    };
    assert!(output.is_file());
    assert!(
        output
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Viral_Top3TestSongs_")
    );

    let history = std::fs::read_to_string(h.root.join("used_themes.txt")).unwrap();
    assert_eq!(history, "Top 3 Test Songs\n");

    let leftovers: Vec<String> = std::fs::read_dir(h.root.join("temp"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("thumbs_") || n.starts_with("frames_"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
    drop(ScratchLock::acquire(&h.root.join("temp")).unwrap());
}

#[test]
fn first_clip_backs_the_intro_and_skips_its_footage() {
    let Some(h) = harness(
        "intro_continuity",
        theme(&[(1, "One"), (2, "Two")]),
        Options::default(),
    ) else {
        return;
    };
    h.orch.run(&TracingSink, &CancelToken::new()).unwrap();

    let targets = h.targets.lock().unwrap();
    assert_eq!(targets.len(), 2);
    assert!((targets[0].1 - (0.1 + NARRATION_S)).abs() < 1e-9);
    assert!((targets[1].1 - 0.1).abs() < 1e-9);

    let log = h.media.lock().unwrap();
    let (intro_out, intro_args) = &log.encodes[0];
    assert!(intro_out.ends_with("intro.mp4"));
    assert!(intro_args.contains("raw_2.mp4"));
    assert!(intro_args.contains("-stream_loop -1"));

    assert!(log.thumb_seeks[0].0.ends_with("raw_2.mp4"));
    assert_eq!(log.thumb_seeks[0].1, NARRATION_S);
    assert_eq!(log.thumb_seeks[1].1, 0.0);

    let (_, first_card) = &log.encodes[1];
    assert!(first_card.contains("-ss 2 "));
}

#[test]
fn item_without_candidates_is_skipped_and_run_continues() {
    let Some(h) = harness(
        "no_candidates",
        theme(&[(1, "One"), (2, "Nothing Found"), (3, "Three")]),
        Options {
            empty_songs: &["Nothing Found"],
            ..Options::default()
        },
    ) else {
        return;
    };
    let (sink, rx) = ChannelSink::new();
    let report = h.orch.run(&sink, &CancelToken::new()).unwrap();

    assert!(matches!(
        &report.items[1],
        ItemOutcome::Skipped {
            rank: 2,
            stage: Stage::Selecting,
            reason
        } if reason.starts_with("no candidates")
    ));
    let log = h.media.lock().unwrap();
    assert_eq!(
        file_names(log.concat.as_ref().unwrap()),
        ["intro.mp4", "clip_3.mp4", "clip_1.mp4"]
    );

    let events: Vec<PipelineEvent> = rx.try_iter().collect();
    assert!(events.contains(&PipelineEvent::ItemSkipped {
        rank: 2,
        stage: Stage::Selecting,
        reason: match &report.items[1] {
            ItemOutcome::Skipped { reason, .. } => reason.clone(),
            ItemOutcome::Done { .. } => unreachable!(),
        },
    }));
    assert!(matches!(events.last(), Some(PipelineEvent::Finished { .. })));
}

#[test]
fn narration_failure_only_drops_the_intro() {
    let Some(h) = harness(
        "no_narration",
        theme(&[(1, "One"), (2, "Two")]),
        Options {
            fail_narration: true,
            ..Options::default()
        },
    ) else {
        return;
    };
    let (sink, rx) = ChannelSink::new();
    let report = h.orch.run(&sink, &CancelToken::new()).unwrap();

    assert_eq!(report.intro, None);
    let log = h.media.lock().unwrap();
    assert_eq!(
        file_names(log.concat.as_ref().unwrap()),
        ["clip_2.mp4", "clip_1.mp4"]
    );
    assert!(log.thumb_seeks.iter().all(|(_, seek)| *seek == 0.0));
    assert!(
        rx.try_iter()
            .any(|e| matches!(e, PipelineEvent::IntroSkipped { .. }))
    );
}

#[test]
fn failed_acquisitions_leave_a_black_intro() {
    let Some(h) = harness(
        "black_intro",
        theme(&[(1, "One"), (2, "Two")]),
        Options {
            fail_downloads: true,
            ..Options::default()
        },
    ) else {
        return;
    };
    let report = h.orch.run(&TracingSink, &CancelToken::new()).unwrap();

    assert!(report.items.iter().all(|i| matches!(
        i,
        ItemOutcome::Skipped {
            stage: Stage::Acquiring,
            ..
        }
    )));
    let log = h.media.lock().unwrap();
    assert_eq!(log.encodes.len(), 1);
    assert!(log.encodes[0].1.contains("color=c=black:s=1080x1920:r=30"));
    assert_eq!(file_names(log.concat.as_ref().unwrap()), ["intro.mp4"]);
}

#[test]
fn nothing_produced_skips_concatenation() {
    let Some(h) = harness(
        "nothing",
        theme(&[(1, "One")]),
        Options {
            fail_downloads: true,
            fail_narration: true,
            ..Options::default()
        },
    ) else {
        return;
    };
    let (sink, rx) = ChannelSink::new();
    let report = h.orch.run(&sink, &CancelToken::new()).unwrap();

    assert_eq!(report.outcome, RunOutcome::NothingProduced);
    assert!(h.media.lock().unwrap().concat.is_none());
    assert_eq!(rx.try_iter().last(), Some(PipelineEvent::NothingProduced));
}

#[test]
fn concatenation_failure_is_fatal() {
    let Some(h) = harness(
        "concat_fails",
        theme(&[(1, "One")]),
        Options {
            fail_concat: true,
            ..Options::default()
        },
    ) else {
        return;
    };
    let err = h.orch.run(&TracingSink, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, ReelError::Concatenation(_)));
    drop(ScratchLock::acquire(&h.root.join("temp")).unwrap());
}

#[test]
fn empty_ranking_aborts_with_content_error() {
    let Some(h) = harness("empty_ranking", theme(&[]), Options::default()) else {
        return;
    };
    let err = h.orch.run(&TracingSink, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, ReelError::ContentGeneration(_)));
    assert!(h.targets.lock().unwrap().is_empty());
}

#[test]
fn cancelled_token_stops_before_any_work() {
    let Some(h) = harness("cancelled", theme(&[(1, "One")]), Options::default()) else {
        return;
    };
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = h.orch.run(&TracingSink, &cancel).unwrap_err();
    assert!(matches!(err, ReelError::Cancelled));
    assert!(h.media.lock().unwrap().encodes.is_empty());
}

#[test]
fn stage_errors_become_item_scoped() {
    assert!(matches!(
        at_stage(Stage::Encoding, ReelError::validation("bad graph")),
        ReelError::Encode(_)
    ));
    assert!(matches!(
        at_stage(Stage::Acquiring, ReelError::serde("bad json")),
        ReelError::Acquisition(_)
    ));
    assert!(matches!(
        at_stage(Stage::Encoding, ReelError::no_candidates("x")),
        ReelError::NoCandidates(_)
    ));
    assert!(matches!(
        at_stage(Stage::Rendering, ReelError::Cancelled),
        ReelError::Cancelled
    ));
}
