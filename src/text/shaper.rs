use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::config::FontConfig;
use crate::foundation::core::Rgba8;
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontSource {
    File(PathBuf),
    /// Resolved from the system font database by PostScript name.
    System(String),
}

impl std::fmt::Display for FontSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::System(name) => write!(f, "system:{name}"),
        }
    }
}

/// Font bytes plus the glyph-renderer handle built from them.
#[derive(Clone)]
pub struct LoadedFont {
    pub bytes: Arc<Vec<u8>>,
    pub index: u32,
    pub data: vello_cpu::peniko::FontData,
    pub source: FontSource,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("bytes_len", &self.bytes.len())
            .field("index", &self.index)
            .field("source", &self.source)
            .finish()
    }
}

impl LoadedFont {
    fn new(bytes: Vec<u8>, index: u32, source: FontSource) -> Self {
        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.clone()),
            index,
        );
        Self {
            bytes: Arc::new(bytes),
            index,
            data,
            source,
        }
    }

    /// Path usable by ffmpeg's drawtext, when the font came from a file.
    pub fn file_path(&self) -> Option<&Path> {
        match &self.source {
            FontSource::File(p) => Some(p),
            FontSource::System(_) => None,
        }
    }
}

/// The two weights the card and intro use.
#[derive(Clone, Debug)]
pub struct FontSet {
    pub bold: LoadedFont,
    pub regular: LoadedFont,
}

impl FontSet {
    /// Load configured fonts. A missing weight borrows the other one; when both are missing a
    /// sans-serif face from the system font database stands in. Fails only when nothing at all
    /// can be loaded.
    pub fn load(cfg: &FontConfig) -> ReelResult<Self> {
        let bold = read_font_file(&cfg.bold);
        let regular = read_font_file(&cfg.regular);

        let (bold, regular) = match (bold, regular) {
            (Some(b), Some(r)) => (b, r),
            (Some(b), None) => {
                tracing::warn!(path = %cfg.regular.display(), "regular font missing, using bold");
                (b.clone(), b)
            }
            (None, Some(r)) => {
                tracing::warn!(path = %cfg.bold.display(), "bold font missing, using regular");
                (r.clone(), r)
            }
            (None, None) => {
                tracing::warn!(
                    bold = %cfg.bold.display(),
                    regular = %cfg.regular.display(),
                    "configured fonts missing, falling back to system sans-serif"
                );
                let bold = load_system_sans(true).ok_or_else(|| {
                    ReelError::validation(format!(
                        "no usable font: '{}' and '{}' are missing and no system font was found",
                        cfg.bold.display(),
                        cfg.regular.display()
                    ))
                })?;
                let regular = load_system_sans(false).unwrap_or_else(|| bold.clone());
                (bold, regular)
            }
        };

        Ok(Self { bold, regular })
    }

    pub fn get(&self, weight: FontWeight) -> &LoadedFont {
        match weight {
            FontWeight::Bold => &self.bold,
            FontWeight::Regular => &self.regular,
        }
    }
}

fn read_font_file(path: &Path) -> Option<LoadedFont> {
    match std::fs::read(path) {
        Ok(bytes) if !bytes.is_empty() => Some(LoadedFont::new(
            bytes,
            0,
            FontSource::File(path.to_path_buf()),
        )),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "font file unreadable");
            None
        }
    }
}

fn load_system_sans(bold: bool) -> Option<LoadedFont> {
    use usvg::fontdb::{Database, Family, Query, Weight};

    let mut db = Database::new();
    db.load_system_fonts();

    let families = [Family::SansSerif];
    let query = Query {
        families: &families,
        weight: if bold { Weight::BOLD } else { Weight::NORMAL },
        ..Query::default()
    };
    let id = db.query(&query).or_else(|| db.faces().next().map(|f| f.id))?;
    let name = db.face(id).map(|f| f.post_script_name.clone())?;
    let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
    Some(LoadedFont::new(bytes, index, FontSource::System(name)))
}

/// A laid-out run of text together with the font needed to draw it.
#[derive(Clone)]
pub struct ShapedText {
    pub layout: parley::Layout<TextBrushRgba8>,
    pub font: vello_cpu::peniko::FontData,
}

impl ShapedText {
    pub fn width(&self) -> f64 {
        f64::from(self.layout.width())
    }

    pub fn height(&self) -> f64 {
        f64::from(self.layout.height())
    }
}

/// Stateful helper for building Parley layouts from a [`FontSet`].
///
/// Fonts are registered once; each call only shapes.
pub struct GlyphShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    bold: (String, vello_cpu::peniko::FontData),
    regular: (String, vello_cpu::peniko::FontData),
}

impl GlyphShaper {
    pub fn new(fonts: &FontSet) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let bold_family = register_family(&mut font_ctx, &fonts.bold)?;
        let regular_family = register_family(&mut font_ctx, &fonts.regular)?;
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            bold: (bold_family, fonts.bold.data.clone()),
            regular: (regular_family, fonts.regular.data.clone()),
        })
    }

    /// Shape single-paragraph text at `size_px`.
    pub fn shape(
        &mut self,
        text: &str,
        weight: FontWeight,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> ReelResult<ShapedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let (family_name, font) = match weight {
            FontWeight::Bold => &self.bold,
            FontWeight::Regular => &self.regular,
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        Ok(ShapedText {
            layout,
            font: font.clone(),
        })
    }
}

fn register_family(font_ctx: &mut parley::FontContext, font: &LoadedFont) -> ReelResult<String> {
    let families = font_ctx.collection.register_fonts(
        parley::fontique::Blob::from(font.bytes.as_ref().clone()),
        None,
    );
    let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
        ReelError::validation(format!(
            "no font families registered from '{}'",
            font.source
        ))
    })?;

    Ok(font_ctx
        .collection
        .family_name(family_id)
        .ok_or_else(|| ReelError::validation("registered font family has no name"))?
        .to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/text/shaper.rs"]
mod tests;
