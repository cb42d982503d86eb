// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pixel software rasterization.
//!
//! Everything here works on one layer buffer ([`PixelsMut`]) and writes only
//! inside the task's draw area (its area within its clip, within the
//! buffer). Colors are straight (non-premultiplied) alpha.

use kurbo::{Affine, Point as KPoint};
use sediment_core::area::{Area, Point};
use sediment_core::color::{Color, ColorFormat, opa};
use sediment_core::draw::{BlendMode, DrawTask, FillDsc, LayerDsc, MaskRectDsc, Pixels, PixelsMut};
use sediment_core::transform::{ZOOM_NONE, affine_about};

/// A color with straight alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba {
    /// Creates a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `color` at opacity `a`.
    #[must_use]
    pub const fn from_color(color: Color, a: u8) -> Self {
        Self::new(color.r, color.g, color.b, a)
    }

    /// The color without its alpha.
    #[must_use]
    pub const fn rgb(self) -> Color {
        Color::new(self.r, self.g, self.b)
    }
}

fn sat(v: u32) -> u8 {
    u8::try_from(v).unwrap_or(u8::MAX)
}

/// `a * b / 255`, rounded.
fn mul(a: u8, b: u8) -> u8 {
    sat((u32::from(a) * u32::from(b) + 127) / 255)
}

/// Moves `dst` toward `src` by `t / 255`.
fn mix(dst: u8, src: u8, t: u8) -> u8 {
    sat((u32::from(src) * u32::from(t) + u32::from(dst) * u32::from(255 - t) + 127) / 255)
}

/// Reads one pixel.
///
/// Formats without alpha read as opaque; `A8` reads as black.
#[must_use]
pub fn read(px: &[u8], format: ColorFormat) -> Rgba {
    match format {
        ColorFormat::Argb8888 => Rgba::new(px[2], px[1], px[0], px[3]),
        ColorFormat::Xrgb8888 | ColorFormat::Rgb888 => Rgba::new(px[2], px[1], px[0], opa::COVER),
        ColorFormat::Rgb565 => {
            let v = u16::from_le_bytes([px[0], px[1]]);
            let r = sat(u32::from(v >> 11));
            let g = sat(u32::from((v >> 5) & 0x3f));
            let b = sat(u32::from(v & 0x1f));
            Rgba::new((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), opa::COVER)
        }
        ColorFormat::L8 => Rgba::new(px[0], px[0], px[0], opa::COVER),
        ColorFormat::A8 => Rgba::new(0, 0, 0, px[0]),
    }
}

/// Writes one pixel. Formats without alpha drop it.
pub fn write(px: &mut [u8], format: ColorFormat, c: Rgba) {
    match format {
        ColorFormat::Argb8888 => px[..4].copy_from_slice(&[c.b, c.g, c.r, c.a]),
        ColorFormat::Xrgb8888 => px[..4].copy_from_slice(&[c.b, c.g, c.r, 0xff]),
        ColorFormat::Rgb888 => px[..3].copy_from_slice(&[c.b, c.g, c.r]),
        ColorFormat::Rgb565 => {
            let v = (u16::from(c.r >> 3) << 11) | (u16::from(c.g >> 2) << 5) | u16::from(c.b >> 3);
            px[..2].copy_from_slice(&v.to_le_bytes());
        }
        ColorFormat::L8 => px[0] = c.rgb().luma(),
        ColorFormat::A8 => px[0] = c.a,
    }
}

fn blend_channel(dst: u8, src: u8, mode: BlendMode) -> u8 {
    match mode {
        BlendMode::Normal => src,
        BlendMode::Additive => dst.saturating_add(src),
        BlendMode::Subtractive => dst.saturating_sub(src),
        BlendMode::Multiply => mul(dst, src),
    }
}

/// Blends `src` into one pixel of `format`.
///
/// Opaque targets mix toward the blended color by the source alpha. Targets
/// with alpha use source-over compositing so a transparent layer ends up
/// holding the source unchanged.
pub fn blend_pixel(dst: &mut [u8], format: ColorFormat, src: Rgba, mode: BlendMode) {
    if src.a <= opa::MIN {
        return;
    }
    if src.a == opa::COVER && mode == BlendMode::Normal {
        write(dst, format, src);
        return;
    }

    let d = read(dst, format);
    let target = Rgba::new(
        blend_channel(d.r, src.r, mode),
        blend_channel(d.g, src.g, mode),
        blend_channel(d.b, src.b, mode),
        src.a,
    );

    if !format.has_alpha() || d.a == opa::COVER {
        let out = Rgba::new(mix(d.r, target.r, src.a), mix(d.g, target.g, src.a), mix(d.b, target.b, src.a), d.a);
        write(dst, format, out);
        return;
    }

    // Source over a translucent destination.
    let sa = u32::from(src.a);
    let da = u32::from(d.a) * (255 - sa) / 255;
    let out_a = sa + da;
    if out_a == 0 {
        write(dst, format, Rgba::default());
        return;
    }
    let ch = |s: u8, d: u8| sat((u32::from(s) * sa + u32::from(d) * da) / out_a);
    write(
        dst,
        format,
        Rgba::new(ch(target.r, d.r), ch(target.g, d.g), ch(target.b, d.b), sat(out_a)),
    );
}

/// The pixels of `px` a task may touch.
fn task_area(px: &PixelsMut<'_>, task: &DrawTask) -> Option<Area> {
    task.draw_area()?.intersect(&px.area)
}

/// Fills the task area, skipping pixels outside the rounded corners.
pub fn fill(px: &mut PixelsMut<'_>, task: &DrawTask, dsc: &FillDsc) {
    if dsc.opa <= opa::MIN {
        return;
    }
    let Some(area) = task_area(px, task) else {
        return;
    };
    let format = px.format;
    let size = format.size();
    let src = Rgba::from_color(dsc.color, dsc.opa);
    for y in area.y1..=area.y2 {
        let Some(row) = px.row_mut(y, area.x1, area.x2) else {
            continue;
        };
        for (x, p) in (area.x1..).zip(row.chunks_exact_mut(size)) {
            if dsc.radius > 0 && !task.area.is_point_on(Point::new(x, y), dsc.radius) {
                continue;
            }
            blend_pixel(p, format, src, BlendMode::Normal);
        }
    }
}

/// Clears every pixel of the task area outside the rounded rectangle of
/// `dsc`. Only meaningful for formats with alpha; others are left alone.
pub fn mask_rect(px: &mut PixelsMut<'_>, task: &DrawTask, dsc: &MaskRectDsc) {
    if !px.format.has_alpha() {
        log::debug!("mask on {:?} layer ignored", px.format);
        return;
    }
    let Some(area) = task_area(px, task) else {
        return;
    };
    let size = px.format.size();
    for y in area.y1..=area.y2 {
        let Some(row) = px.row_mut(y, area.x1, area.x2) else {
            continue;
        };
        for (x, p) in (area.x1..).zip(row.chunks_exact_mut(size)) {
            if !dsc.area.is_point_on(Point::new(x, y), dsc.radius) {
                p.fill(0);
            }
        }
    }
}

/// Composites `src` into the task area with the layer's opacity and blend
/// mode.
///
/// Rotated or zoomed layers are sampled through the inverse transform about
/// the pivot (relative to the task area's top-left corner), nearest
/// neighbour. Edges are not antialiased.
pub fn composite(px: &mut PixelsMut<'_>, task: &DrawTask, dsc: &LayerDsc, src: &Pixels<'_>) {
    if dsc.opa <= opa::MIN {
        return;
    }
    let Some(area) = task_area(px, task) else {
        return;
    };
    let inverse = if dsc.angle.rem_euclid(3600) == 0 && dsc.zoom == ZOOM_NONE {
        None
    } else if dsc.zoom == 0 {
        return;
    } else {
        let pivot = KPoint::new(
            f64::from(task.area.x1 + dsc.pivot.x),
            f64::from(task.area.y1 + dsc.pivot.y),
        );
        Some(affine_about(dsc.angle, dsc.zoom, pivot).inverse())
    };

    let format = px.format;
    let size = format.size();
    for y in area.y1..=area.y2 {
        let Some(row) = px.row_mut(y, area.x1, area.x2) else {
            continue;
        };
        for (x, p) in (area.x1..).zip(row.chunks_exact_mut(size)) {
            let Some(s) = sample(src, inverse, x, y) else {
                continue;
            };
            let s = Rgba { a: mul(s.a, dsc.opa), ..s };
            blend_pixel(p, format, s, dsc.blend_mode);
        }
    }
}

/// Rounds toward negative infinity without `std` float intrinsics.
fn floor(v: f64) -> i32 {
    let t = v as i32;
    if f64::from(t) > v { t - 1 } else { t }
}

fn sample(src: &Pixels<'_>, inverse: Option<Affine>, x: i32, y: i32) -> Option<Rgba> {
    let (sx, sy) = match inverse {
        None => (x, y),
        Some(inv) => {
            let p = inv * KPoint::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            (floor(p.x), floor(p.y))
        }
    };
    src.row(sy, sx, sx).map(|bytes| read(bytes, src.format))
}
