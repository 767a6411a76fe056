//! Pixel-level helpers shared by the card rasterizer: premultiplication, pixmap IO and
//! conversions into `vello_cpu` geometry and paints.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::{Affine, BezPath, Point, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::text::shaper::ShapedText;

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Inverse of [`premultiply_rgba8_in_place`]; PNG stores straight alpha.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        let un = |c: u8| -> u8 { ((c as u16 * 255 + a / 2) / a).min(255) as u8 };
        px[0] = un(px[0]);
        px[1] = un(px[1]);
        px[2] = un(px[2]);
    }
}

pub fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

pub fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(ReelError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

/// Write a premultiplied pixmap as a straight-alpha RGBA PNG.
pub fn write_png(pixmap: &vello_cpu::Pixmap, path: &Path) -> ReelResult<()> {
    let (w, h) = (u32::from(pixmap.width()), u32::from(pixmap.height()));
    let mut data = pixmap.data_as_u8_slice().to_vec();
    unpremultiply_rgba8_in_place(&mut data);
    let img = image::RgbaImage::from_raw(w, h, data)
        .ok_or_else(|| ReelError::render("pixmap buffer does not match its dimensions"))?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

pub fn image_paint(pixmap: Arc<vello_cpu::Pixmap>) -> vello_cpu::Image {
    vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(pixmap),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    }
}

pub fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

pub fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

pub fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Fill `path` (canvas coordinates) with a solid color. Fully transparent colors are skipped.
pub fn fill_solid(ctx: &mut vello_cpu::RenderContext, path: &BezPath, color: Rgba8) {
    if color.a == 0 {
        return;
    }
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(color_to_cpu(color));
    ctx.fill_path(&bezpath_to_cpu(path));
}

/// Draw an image with its top-left corner at `origin`, scaled by `opacity / 255`.
pub fn draw_image(
    ctx: &mut vello_cpu::RenderContext,
    pixmap: &Arc<vello_cpu::Pixmap>,
    origin: Point,
    opacity: u8,
) {
    if opacity == 0 {
        return;
    }
    let (w, h) = (f64::from(pixmap.width()), f64::from(pixmap.height()));
    ctx.set_transform(affine_to_cpu(Affine::translate(origin.to_vec2())));
    ctx.set_paint(image_paint(Arc::clone(pixmap)));
    if opacity < 255 {
        ctx.push_opacity_layer(f32::from(opacity) / 255.0);
    }
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
    if opacity < 255 {
        ctx.pop_layer();
    }
}

/// Draw shaped text with the top-left of its layout box at `origin`.
///
/// `color` overrides the layout brush so the same layout can be faded frame by frame.
pub fn draw_text(
    ctx: &mut vello_cpu::RenderContext,
    text: &ShapedText,
    origin: Point,
    color: Rgba8,
) {
    if color.a == 0 {
        return;
    }
    ctx.set_transform(affine_to_cpu(Affine::translate(origin.to_vec2())));
    ctx.set_paint(color_to_cpu(color));

    for line in text.layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&text.font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
