use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use kurbo::Shape as _;
use rayon::prelude::*;

use crate::animation::stat::StatValue;
use crate::animation::timeline::{AnimationState, AnimationTimeline};
use crate::foundation::config::{CardStyle, ReelConfig, RenderThreading};
use crate::foundation::core::{BezPath, Canvas, Fps, FrameIndex, Point, Rect, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::model::RankEntry;
use crate::render::raster::{clear_pixmap, draw_image, draw_text, fill_solid, write_png};
use crate::render::thumbs::{ThumbnailLoader, ThumbnailSource};
use crate::text::layout::truncate;
use crate::text::shaper::{FontSet, FontWeight, GlyphShaper, ShapedText, TextBrushRgba8};

/// Output pattern of rendered overlay frames (0-indexed).
pub const FRAME_PATTERN: &str = "frame_%04d.png";

pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("frame_{index:04}.png"))
}

// Offsets inside the card, in pixels from its top-left corner.
const TEXT_INSET: f64 = 50.0;
const RANK_TOP: f64 = 50.0;
const THUMB_TOP: f64 = 100.0;
const SONG_TOP: f64 = 220.0;
const ARTIST_GAP: f64 = 70.0;
const STAT_GAP: f64 = 100.0;

/// A rendered overlay: `count` transparent PNGs named after [`FRAME_PATTERN`] in `dir`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSequence {
    pub dir: PathBuf,
    pub count: u64,
    pub fps: Fps,
}

impl FrameSequence {
    /// `dir/frame_%04d.png`, the form the encoder's image-sequence input expects.
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(FRAME_PATTERN)
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        frame_path(&self.dir, index)
    }

    pub fn duration_s(&self) -> f64 {
        self.fps.frames_to_secs(self.count)
    }

    /// Delete the frame directory once the frames are no longer needed.
    pub fn release(self) -> ReelResult<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)
                .with_context(|| format!("remove frame dir '{}'", self.dir.display()))?;
        }
        Ok(())
    }
}

/// Text that stays the same on every frame of one card.
struct CardText {
    title: ShapedText,
    rank: ShapedText,
    song: ShapedText,
    artist: ShapedText,
}

/// Everything that varies per frame, resolved before rasterization starts.
struct FramePlan {
    index: u64,
    state: AnimationState,
    stat: String,
    thumb: Option<Arc<vello_cpu::Pixmap>>,
}

/// Per-thread rasterization state.
struct Worker {
    shaper: GlyphShaper,
    pixmap: vello_cpu::Pixmap,
    last_stat: Option<(String, ShapedText)>,
}

impl Worker {
    fn new(fonts: &FontSet, canvas: Canvas) -> ReelResult<Self> {
        Ok(Self {
            shaper: GlyphShaper::new(fonts)?,
            pixmap: vello_cpu::Pixmap::new(canvas_u16(canvas.width)?, canvas_u16(canvas.height)?),
            last_stat: None,
        })
    }

    fn stat_text(&mut self, stat: &str, size_px: f32) -> ReelResult<ShapedText> {
        if let Some((s, shaped)) = &self.last_stat
            && s == stat
        {
            return Ok(shaped.clone());
        }
        let shaped = self
            .shaper
            .shape(stat, FontWeight::Bold, size_px, TextBrushRgba8::default())?;
        self.last_stat = Some((stat.to_string(), shaped.clone()));
        Ok(shaped)
    }
}

/// Rasterizes the animated card overlay for one ranked item.
pub struct FrameCompositor {
    canvas: Canvas,
    fps: Fps,
    style: CardStyle,
    timeline: AnimationTimeline,
    fonts: FontSet,
    thumbs: ThumbnailLoader,
    pool: Option<rayon::ThreadPool>,
}

impl FrameCompositor {
    pub fn new(cfg: &ReelConfig, fonts: FontSet) -> ReelResult<Self> {
        cfg.canvas.validate()?;
        Ok(Self {
            canvas: cfg.canvas,
            fps: cfg.fps()?,
            style: cfg.card.clone(),
            timeline: AnimationTimeline::new(cfg.timeline),
            fonts,
            thumbs: ThumbnailLoader::new(cfg.card.thumb_size)?,
            pool: build_thread_pool(&cfg.threading)?,
        })
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    pub fn timeline(&self) -> &AnimationTimeline {
        &self.timeline
    }

    /// Render `floor(duration_s * fps)` frames into `out_dir`, replacing anything already there.
    ///
    /// Any frame failure aborts the whole sequence with [`ReelError::Render`] and removes
    /// `out_dir`, so no partial sequence is left behind.
    #[tracing::instrument(skip(self, entry, thumbs, out_dir), fields(rank = entry.rank))]
    pub fn render(
        &self,
        entry: &RankEntry,
        theme_title: &str,
        thumbs: &ThumbnailSource,
        duration_s: f64,
        out_dir: &Path,
    ) -> ReelResult<FrameSequence> {
        let result = self.render_inner(entry, theme_title, thumbs, duration_s, out_dir);
        if result.is_err()
            && out_dir.exists()
            && let Err(e) = std::fs::remove_dir_all(out_dir)
        {
            tracing::warn!(dir = %out_dir.display(), error = %e, "could not remove partial frames");
        }
        result.map_err(as_render_error)
    }

    fn render_inner(
        &self,
        entry: &RankEntry,
        theme_title: &str,
        thumbs: &ThumbnailSource,
        duration_s: f64,
        out_dir: &Path,
    ) -> ReelResult<FrameSequence> {
        if !duration_s.is_finite() || duration_s <= 0.0 {
            return Err(ReelError::render("card duration must be finite and > 0"));
        }
        let count = self.fps.secs_to_frames_floor(duration_s);
        if count == 0 {
            return Err(ReelError::render("card duration is shorter than one frame"));
        }

        if out_dir.exists() {
            std::fs::remove_dir_all(out_dir)
                .with_context(|| format!("clear frame dir '{}'", out_dir.display()))?;
        }
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("create frame dir '{}'", out_dir.display()))?;

        let mut shaper = GlyphShaper::new(&self.fonts)?;
        let text = self.card_text(&mut shaper, entry, theme_title)?;

        let stat = StatValue::parse(&entry.stat);
        let target = stat.target();
        let thumbs = self.thumbs.resolve(thumbs, count);
        let plans: Vec<FramePlan> = thumbs
            .into_iter()
            .enumerate()
            .map(|(i, thumb)| {
                let index = i as u64;
                let state = self.timeline.state_at(FrameIndex(index), self.fps, target);
                FramePlan {
                    index,
                    stat: stat.display(state.counter_value, self.style.thousands_separator),
                    state,
                    thumb,
                }
            })
            .collect();

        match &self.pool {
            Some(pool) => {
                let results: Vec<ReelResult<()>> = pool.install(|| {
                    plans
                        .par_iter()
                        .map_init(
                            || Worker::new(&self.fonts, self.canvas),
                            |worker, plan| -> ReelResult<()> {
                                let worker = worker
                                    .as_mut()
                                    .map_err(|e| ReelError::render(e.to_string()))?;
                                self.rasterize(worker, &text, plan)?;
                                write_png(&worker.pixmap, &frame_path(out_dir, plan.index))
                            },
                        )
                        .collect()
                });
                for r in results {
                    r?;
                }
            }
            None => {
                let mut worker = Worker::new(&self.fonts, self.canvas)?;
                for plan in &plans {
                    self.rasterize(&mut worker, &text, plan)?;
                    write_png(&worker.pixmap, &frame_path(out_dir, plan.index))?;
                }
            }
        }

        tracing::debug!(frames = count, dir = %out_dir.display(), "card frames written");
        Ok(FrameSequence {
            dir: out_dir.to_path_buf(),
            count,
            fps: self.fps,
        })
    }

    /// Rasterize a single frame in memory (premultiplied RGBA8).
    pub fn render_frame(
        &self,
        entry: &RankEntry,
        theme_title: &str,
        thumb: Option<Arc<vello_cpu::Pixmap>>,
        frame: FrameIndex,
    ) -> ReelResult<vello_cpu::Pixmap> {
        let mut worker = Worker::new(&self.fonts, self.canvas)?;
        let text = self.card_text(&mut worker.shaper, entry, theme_title)?;
        let stat = StatValue::parse(&entry.stat);
        let state = self.timeline.state_at(frame, self.fps, stat.target());
        let plan = FramePlan {
            index: frame.0,
            stat: stat.display(state.counter_value, self.style.thousands_separator),
            state,
            thumb,
        };
        self.rasterize(&mut worker, &text, &plan)?;
        Ok(worker.pixmap)
    }

    fn card_text(
        &self,
        shaper: &mut GlyphShaper,
        entry: &RankEntry,
        theme_title: &str,
    ) -> ReelResult<CardText> {
        let s = &self.style;
        let brush = TextBrushRgba8::default();
        Ok(CardText {
            title: shaper.shape(
                &theme_title.to_uppercase(),
                FontWeight::Bold,
                s.title_font_px,
                brush,
            )?,
            rank: shaper.shape(
                &format!("#{}", entry.rank),
                FontWeight::Bold,
                s.rank_font_px,
                brush,
            )?,
            song: shaper.shape(
                &truncate(&entry.song, s.song_max_chars),
                FontWeight::Bold,
                s.song_font_px,
                brush,
            )?,
            artist: shaper.shape(
                &truncate(&entry.artist, s.artist_max_chars),
                FontWeight::Regular,
                s.artist_font_px,
                brush,
            )?,
        })
    }

    fn rasterize(&self, worker: &mut Worker, text: &CardText, plan: &FramePlan) -> ReelResult<()> {
        let s = &self.style;
        let alpha = plan.state.alpha;
        let stat = worker.stat_text(&plan.stat, s.stat_font_px)?;

        let canvas_w = f64::from(self.canvas.width);
        let canvas_h = f64::from(self.canvas.height);
        let card_w = f64::from(s.width);
        let card_h = f64::from(s.height);
        let card_x = ((canvas_w - card_w) / 2.0).floor();
        let card_y = ((canvas_h - card_h) / 2.0).floor() + plan.state.slide_offset_px;

        let mut ctx = vello_cpu::RenderContext::new(
            canvas_u16(self.canvas.width)?,
            canvas_u16(self.canvas.height)?,
        );

        // Theme title, centered on its anchor, with a drop shadow.
        let title_x = canvas_w / 2.0 - text.title.width() / 2.0;
        let title_y = s.title_y - text.title.height() / 2.0;
        let off = s.title_shadow_offset;
        draw_text(
            &mut ctx,
            &text.title,
            Point::new(title_x + off, title_y + off),
            Rgba8::rgb(0, 0, 0).modulate(alpha),
        );
        draw_text(
            &mut ctx,
            &text.title,
            Point::new(title_x, title_y),
            s.text.modulate(alpha),
        );

        let card = Rect::new(card_x, card_y, card_x + card_w, card_y + card_h);
        let spread = s.shadow_spread;
        fill_solid(
            &mut ctx,
            &card.inflate(spread, spread).to_rounded_rect(s.shadow_radius).to_path(0.1),
            s.shadow.modulate(alpha),
        );
        let border = s.border_width;
        let inner = card.inflate(-border, -border);
        let inner_radius = (s.corner_radius - border).max(0.0);
        fill_solid(
            &mut ctx,
            &inner.to_rounded_rect(inner_radius).to_path(0.1),
            s.glass.modulate(alpha),
        );
        if border > 0.0 {
            fill_solid(
                &mut ctx,
                &rounded_frame(card, s.corner_radius, inner, inner_radius),
                s.accent.modulate(alpha),
            );
        }

        draw_text(
            &mut ctx,
            &text.rank,
            Point::new(card_x + TEXT_INSET, card_y + RANK_TOP),
            s.accent.modulate(alpha),
        );

        if let Some(thumb) = &plan.thumb {
            let size = f64::from(s.thumb_size);
            let origin = Point::new(card_x + card_w - size - TEXT_INSET, card_y + THUMB_TOP);
            draw_image(&mut ctx, thumb, origin, alpha);
            if s.thumb_ring_width > 0.0 {
                let center = Point::new(origin.x + size / 2.0, origin.y + size / 2.0);
                let outer_r = size / 2.0;
                let ring = kurbo::CircleSegment::new(
                    center,
                    outer_r,
                    (outer_r - s.thumb_ring_width).max(0.0),
                    0.0,
                    std::f64::consts::TAU,
                );
                fill_solid(&mut ctx, &ring.to_path(0.1), s.accent.modulate(alpha));
            }
        }

        let song_y = card_y + SONG_TOP;
        let artist_y = song_y + ARTIST_GAP;
        let stat_y = artist_y + STAT_GAP;
        let text_x = card_x + TEXT_INSET;
        draw_text(
            &mut ctx,
            &text.song,
            Point::new(text_x, song_y),
            s.text.modulate(alpha),
        );
        draw_text(
            &mut ctx,
            &text.artist,
            Point::new(text_x, artist_y),
            s.muted_text.modulate(alpha),
        );
        draw_text(
            &mut ctx,
            &stat,
            Point::new(text_x, stat_y),
            s.accent.modulate(alpha),
        );

        clear_pixmap(&mut worker.pixmap);
        ctx.flush();
        ctx.render_to_pixmap(&mut worker.pixmap);
        Ok(())
    }
}

/// The band between two nested rounded rects, as one path filled with the non-zero rule.
fn rounded_frame(outer: Rect, outer_radius: f64, inner: Rect, inner_radius: f64) -> BezPath {
    let mut path = outer.to_rounded_rect(outer_radius).to_path(0.1);
    let hole = inner.to_rounded_rect(inner_radius).to_path(0.1).reverse_subpaths();
    path.extend(hole);
    path
}

fn canvas_u16(v: u32) -> ReelResult<u16> {
    v.try_into()
        .map_err(|_| ReelError::render("canvas dimension exceeds u16"))
}

fn as_render_error(e: ReelError) -> ReelError {
    match e {
        ReelError::Render(_) | ReelError::Cancelled => e,
        other => ReelError::render(other.to_string()),
    }
}

fn build_thread_pool(threading: &RenderThreading) -> ReelResult<Option<rayon::ThreadPool>> {
    if !threading.parallel {
        return Ok(None);
    }
    if threading.threads == Some(0) {
        return Err(ReelError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threading.threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| ReelError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/card.rs"]
mod tests;
