use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use rayon::prelude::*;

use crate::foundation::error::{ReelError, ReelResult};
use crate::render::raster::{premul_bytes_to_pixmap, premultiply_rgba8_in_place};

/// Output pattern used by the per-frame thumbnail extraction (1-indexed).
pub const THUMB_PATTERN: &str = "thumb_%04d.jpg";

/// Path of the extracted thumbnail for 1-indexed `number`.
pub fn thumb_frame_path(dir: &Path, number: u64) -> PathBuf {
    dir.join(format!("thumb_{number:04}.jpg"))
}

/// Where a card's circular thumbnail comes from.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ThumbnailSource {
    #[default]
    None,
    /// Directory of `thumb_0001.jpg`, `thumb_0002.jpg`, ... matching card frames 0, 1, ...
    Sequence(PathBuf),
    /// One image shown on every frame.
    Still(PathBuf),
}

/// Decodes thumbnails into circular, premultiplied pixmaps of a fixed size.
#[derive(Clone, Copy, Debug)]
pub struct ThumbnailLoader {
    size: u32,
}

impl ThumbnailLoader {
    pub fn new(size: u32) -> ReelResult<Self> {
        if size == 0 || size > u32::from(u16::MAX) {
            return Err(ReelError::validation("thumbnail size must be in 1..=65535"));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decode, center-crop to a square, resize and mask `path` into a circle.
    pub fn load(&self, path: &Path) -> ReelResult<Arc<vello_cpu::Pixmap>> {
        let img = image::open(path)
            .with_context(|| format!("decode thumbnail '{}'", path.display()))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(ReelError::render(format!(
                "thumbnail '{}' is empty",
                path.display()
            )));
        }

        let side = w.min(h);
        let square = image::imageops::crop_imm(&img, (w - side) / 2, (h - side) / 2, side, side)
            .to_image();
        let resized = image::imageops::resize(
            &square,
            self.size,
            self.size,
            image::imageops::FilterType::Lanczos3,
        );

        let mut data = resized.into_raw();
        apply_circle_mask(&mut data, self.size);
        premultiply_rgba8_in_place(&mut data);
        Ok(Arc::new(premul_bytes_to_pixmap(&data, self.size, self.size)?))
    }

    /// One entry per card frame. A missing or undecodable frame reuses the last good one
    /// (freeze-frame); frames before the first good one stay empty.
    #[tracing::instrument(skip(self))]
    pub fn resolve(
        &self,
        source: &ThumbnailSource,
        frame_count: u64,
    ) -> Vec<Option<Arc<vello_cpu::Pixmap>>> {
        let n = frame_count as usize;
        match source {
            ThumbnailSource::None => vec![None; n],
            ThumbnailSource::Still(path) => match self.load(path) {
                Ok(pm) => vec![Some(pm); n],
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "still thumbnail unusable");
                    vec![None; n]
                }
            },
            ThumbnailSource::Sequence(dir) => {
                let loaded: Vec<Option<Arc<vello_cpu::Pixmap>>> = (0..frame_count)
                    .into_par_iter()
                    .map(|i| {
                        let path = thumb_frame_path(dir, i + 1);
                        if !path.is_file() {
                            return None;
                        }
                        match self.load(&path) {
                            Ok(pm) => Some(pm),
                            Err(e) => {
                                tracing::debug!(path = %path.display(), error = %e, "thumbnail frame skipped");
                                None
                            }
                        }
                    })
                    .collect();

                let mut last = None;
                let mut frozen = 0usize;
                let out: Vec<_> = loaded
                    .into_iter()
                    .map(|frame| {
                        match frame {
                            Some(pm) => last = Some(pm),
                            None => frozen += 1,
                        }
                        last.clone()
                    })
                    .collect();
                if frozen > 0 {
                    tracing::debug!(frozen, total = n, "thumbnail frames filled by freeze-frame");
                }
                out
            }
        }
    }
}

/// Multiply alpha by an anti-aliased disc inscribed in a `size`x`size` straight-alpha buffer.
fn apply_circle_mask(rgba: &mut [u8], size: u32) {
    let r = f64::from(size) / 2.0;
    for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
        let x = (i as u32 % size) as f64 + 0.5;
        let y = (i as u32 / size) as f64 + 0.5;
        let d = ((x - r).powi(2) + (y - r).powi(2)).sqrt();
        let coverage = (r - d + 0.5).clamp(0.0, 1.0);
        px[3] = (f64::from(px[3]) * coverage).round() as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/thumbs.rs"]
mod tests;
