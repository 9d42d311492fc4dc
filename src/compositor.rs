//! The effect compositor: applies a layer's effect list to its rendered
//! content in three fixed phases.
//!
//! 1. Outer effects (`outer-shadow`, `cast-shadow`) render beneath the
//!    source onto a scratch surface padded by the largest outer blur, so
//!    blurred silhouettes are not clipped at the canvas edge.
//! 2. The source is drawn, the first fill effect (if any) recolors its alpha
//!    footprint, and the fill's opacity scales this whole phase.
//! 3. Inner effects (`inner-shadow`) overlay shadows confined to the inside
//!    of the accumulated alpha shape.
//!
//! Phase membership is decided by [`EffectClass`], never by list order, so
//! two lists with the same effects in different orders composite
//! identically.

use crate::{
    blur::{blur_surface, sigma_for_radius},
    color::Color,
    effect::{ColorStop, Effect, EffectClass, sample_stops},
    error::IconforgeResult,
    geom::{Rect, Size},
    pixel::{self, CompositeMode},
    surface::Surface,
};

/// Apply `effects` to `src` and composite the result into `dst`. Both
/// surfaces are `size`-sized; blur radii and translations are in
/// already-scaled pixel units.
///
/// Only the first fill effect in list order is applied; additional fills are
/// ignored. Call sites supply at most one fill in practice and rely on the
/// permissive behavior, so extra fills are not an error.
pub fn apply_effects(
    effects: &[Effect],
    dst: &mut Surface,
    src: &Surface,
    size: Size,
) -> IconforgeResult<()> {
    let outer: Vec<&Effect> = effects
        .iter()
        .filter(|e| e.class() == EffectClass::Outer)
        .collect();
    let fills: Vec<&Effect> = effects
        .iter()
        .filter(|e| e.class() == EffectClass::Fill)
        .collect();
    let inner: Vec<&Effect> = effects
        .iter()
        .filter(|e| e.class() == EffectClass::Inner)
        .collect();

    render_outer_phase(&outer, dst, src, size)?;

    let buffer = render_source_and_fill(&fills, src, size)?;
    let buffer = render_inner_phase(&inner, buffer, size)?;

    // The source/fill/inner buffer lands on top of the outer effects.
    dst.draw(&buffer, 0, 0);
    Ok(())
}

fn render_outer_phase(
    outer: &[&Effect],
    dst: &mut Surface,
    src: &Surface,
    size: Size,
) -> IconforgeResult<()> {
    if outer.is_empty() {
        return Ok(());
    }

    // Pad by the largest blur so nothing clips before the crop back down.
    let pad = outer
        .iter()
        .map(|e| e.blur())
        .fold(0.0f64, f64::max)
        .ceil() as i64;
    let padded = Size::new(
        size.w + 2 * pad as u32,
        size.h + 2 * pad as u32,
    );
    let crop = Rect::new(
        pad as f64,
        pad as f64,
        f64::from(size.w),
        f64::from(size.h),
    );

    for effect in outer {
        match effect {
            Effect::CastShadow => {
                let mut tmp = Surface::new(padded)?;
                tmp.draw(src, pad, pad);
                render_cast_shadow(&mut tmp)?;
                dst.draw_surface(&tmp, crop, 0, 0, CompositeMode::SourceOver, 1.0);
            }
            Effect::OuterShadow {
                color,
                blur,
                translate_x,
                translate_y,
            } => {
                let opacity = color.a.clamp(0.0, 1.0) as f32;
                let solid = color.with_alpha(1.0);

                let mut tmp = Surface::new(padded)?;
                tmp.draw(src, pad, pad);
                let radius = blur.max(0.0).ceil() as u32;
                if radius > 0 {
                    tmp = blur_surface(&tmp, radius, sigma_for_radius(radius))?;
                }
                tmp.fill(CompositeMode::SourceAtop, solid);

                dst.draw_surface(
                    &tmp,
                    crop,
                    translate_x.round() as i64,
                    translate_y.round() as i64,
                    CompositeMode::SourceOver,
                    opacity,
                );
            }
            Effect::InnerShadow { .. }
            | Effect::Score
            | Effect::FillColor { .. }
            | Effect::FillLinearGradient { .. }
            | Effect::FillRadialGradient { .. } => {}
        }
    }
    Ok(())
}

/// Sweep the silhouette along the diagonal, clamp it to black, and fade it
/// out with a corner-to-corner gradient. The surface ends up holding only
/// the shadow; the source is drawn back by the fill phase.
fn render_cast_shadow(surface: &mut Surface) -> IconforgeResult<()> {
    let size = surface.size();
    let reach = size.w.max(size.h) as i64;

    let mut sweep = Surface::new(size)?;
    for o in 1..reach {
        sweep.draw(surface, o, o);
    }
    sweep.fill(CompositeMode::SourceIn, Color::BLACK);

    let fade = [
        ColorStop {
            offset: 0.0,
            color: Color::rgba(0.0, 0.0, 0.0, 0.2),
        },
        ColorStop {
            offset: 1.0,
            color: Color::rgba(0.0, 0.0, 0.0, 0.0),
        },
    ];
    fill_linear_gradient(
        &mut sweep,
        CompositeMode::SourceIn,
        (0.0, 0.0),
        (f64::from(size.w), f64::from(size.h)),
        &fade,
    );

    surface.clear();
    surface.draw(&sweep, 0, 0);
    Ok(())
}

fn render_source_and_fill(
    fills: &[&Effect],
    src: &Surface,
    size: Size,
) -> IconforgeResult<Surface> {
    let mut tmp = Surface::new(size)?;
    tmp.draw(src, 0, 0);

    let mut fill_opacity = 1.0f64;
    if let Some(fill) = fills.first() {
        fill_opacity = fill.fill_opacity();
        match fill {
            Effect::FillColor { color, .. } => {
                tmp.fill(CompositeMode::SourceAtop, *color);
            }
            Effect::FillLinearGradient {
                from_x,
                from_y,
                to_x,
                to_y,
                colors,
                ..
            } => {
                fill_linear_gradient(
                    &mut tmp,
                    CompositeMode::SourceAtop,
                    (*from_x, *from_y),
                    (*to_x, *to_y),
                    colors,
                );
            }
            Effect::FillRadialGradient {
                center_x,
                center_y,
                radius,
                colors,
                ..
            } => {
                fill_radial_gradient(
                    &mut tmp,
                    CompositeMode::SourceAtop,
                    (*center_x, *center_y),
                    *radius,
                    colors,
                );
            }
            Effect::OuterShadow { .. }
            | Effect::CastShadow
            | Effect::InnerShadow { .. }
            | Effect::Score => {}
        }
    }

    // The fill's opacity scales the entire phase, source included.
    let mut buffer = Surface::new(size)?;
    buffer.draw_surface(
        &tmp,
        Rect::from_size(size),
        0,
        0,
        CompositeMode::SourceOver,
        fill_opacity as f32,
    );
    Ok(buffer)
}

fn render_inner_phase(
    inner: &[&Effect],
    mut buffer: Surface,
    size: Size,
) -> IconforgeResult<Surface> {
    if inner.is_empty() {
        return Ok(buffer);
    }

    // Each side pads for the worst-case blur plus any translation toward it.
    let (mut pl, mut pt, mut pr, mut pb) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for e in inner {
        let (tx, ty) = e.translate();
        let b = e.blur();
        pl = pl.max(b + tx.max(0.0));
        pt = pt.max(b + ty.max(0.0));
        pr = pr.max(b + (-tx).max(0.0));
        pb = pb.max(b + (-ty).max(0.0));
    }
    let (pl, pt, pr, pb) = (
        pl.ceil() as i64,
        pt.ceil() as i64,
        pr.ceil() as i64,
        pb.ceil() as i64,
    );
    let padded = Size::new(
        size.w + (pl + pr) as u32,
        size.h + (pt + pb) as u32,
    );

    for effect in inner {
        match effect {
            Effect::InnerShadow {
                color,
                blur,
                translate_x,
                translate_y,
            } => {
                let mut tmp = Surface::new(padded)?;
                tmp.draw(
                    &buffer,
                    pl + translate_x.round() as i64,
                    pt + translate_y.round() as i64,
                );
                let radius = blur.max(0.0).ceil() as u32;
                if radius > 0 {
                    tmp = blur_surface(&tmp, radius, sigma_for_radius(radius))?;
                }
                // Punch the offset silhouette out of a constant fill: what
                // remains is the shadow band along the inside edge.
                tmp.fill(CompositeMode::SourceOut, *color);

                buffer.draw_surface(
                    &tmp,
                    Rect::from_size(padded),
                    -pl,
                    -pt,
                    CompositeMode::SourceAtop,
                    1.0,
                );
            }
            Effect::Score => {}
            Effect::OuterShadow { .. }
            | Effect::CastShadow
            | Effect::FillColor { .. }
            | Effect::FillLinearGradient { .. }
            | Effect::FillRadialGradient { .. } => {}
        }
    }
    Ok(buffer)
}

/// Composite a linear gradient over the whole surface under `mode`.
pub fn fill_linear_gradient(
    surface: &mut Surface,
    mode: CompositeMode,
    from: (f64, f64),
    to: (f64, f64),
    stops: &[ColorStop],
) {
    let (w, h) = (surface.width(), surface.height());
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let len2 = dx * dx + dy * dy;

    for y in 0..h {
        for x in 0..w {
            let t = if len2 <= 0.0 {
                0.0
            } else {
                ((f64::from(x) + 0.5 - from.0) * dx + (f64::from(y) + 0.5 - from.1) * dy) / len2
            };
            composite_pixel(surface, x, y, mode, sample_stops(stops, t));
        }
    }
}

/// Composite a radial gradient (center at `center`, extent `radius`) over
/// the whole surface under `mode`.
pub fn fill_radial_gradient(
    surface: &mut Surface,
    mode: CompositeMode,
    center: (f64, f64),
    radius: f64,
    stops: &[ColorStop],
) {
    let (w, h) = (surface.width(), surface.height());
    for y in 0..h {
        for x in 0..w {
            let ddx = f64::from(x) + 0.5 - center.0;
            let ddy = f64::from(y) + 0.5 - center.1;
            let t = if radius <= 0.0 {
                1.0
            } else {
                (ddx * ddx + ddy * ddy).sqrt() / radius
            };
            composite_pixel(surface, x, y, mode, sample_stops(stops, t));
        }
    }
}

fn composite_pixel(surface: &mut Surface, x: u32, y: u32, mode: CompositeMode, color: Color) {
    let idx = ((y as usize * surface.width() as usize) + x as usize) * 4;
    let d = surface.data();
    let d_px = [d[idx], d[idx + 1], d[idx + 2], d[idx + 3]];
    let out = pixel::composite(mode, d_px, color.to_premul_rgba8(), 1.0);
    surface.data_mut()[idx..idx + 4].copy_from_slice(&out);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A centered opaque white square on a transparent field.
    fn square_source(size: Size, inset: u32) -> Surface {
        let mut s = Surface::new(size).unwrap();
        let w = size.w - 2 * inset;
        let h = size.h - 2 * inset;
        s.set_pixels(
            Rect::new(f64::from(inset), f64::from(inset), f64::from(w), f64::from(h)),
            &vec![255u8; (w * h * 4) as usize],
        )
        .unwrap();
        s
    }

    #[test]
    fn no_effects_copies_source() {
        let size = Size::new(16, 16);
        let src = square_source(size, 4);
        let mut dst = Surface::new(size).unwrap();
        apply_effects(&[], &mut dst, &src, size).unwrap();
        assert_eq!(dst.data(), src.data());
    }

    #[test]
    fn fill_color_recolors_footprint_only() {
        let size = Size::new(16, 16);
        let src = square_source(size, 4);
        let mut dst = Surface::new(size).unwrap();
        apply_effects(
            &[Effect::FillColor {
                color: Color::rgba(1.0, 0.0, 0.0, 1.0),
                opacity: 1.0,
            }],
            &mut dst,
            &src,
            size,
        )
        .unwrap();

        assert_eq!(dst.pixel(8, 8), [255, 0, 0, 255]);
        assert_eq!(dst.alpha_at(0, 0), 0);
    }

    #[test]
    fn fill_opacity_scales_whole_phase() {
        let size = Size::new(16, 16);
        let src = square_source(size, 4);
        let mut dst = Surface::new(size).unwrap();
        apply_effects(
            &[Effect::FillColor {
                color: Color::rgba(1.0, 0.0, 0.0, 1.0),
                opacity: 0.5,
            }],
            &mut dst,
            &src,
            size,
        )
        .unwrap();

        let px = dst.pixel(8, 8);
        assert!((i32::from(px[3]) - 128).abs() <= 1, "alpha {}", px[3]);
    }

    #[test]
    fn outer_shadow_lands_outside_translated_silhouette() {
        let size = Size::new(20, 20);
        let src = square_source(size, 6);
        let mut dst = Surface::new(size).unwrap();
        apply_effects(
            &[Effect::OuterShadow {
                color: Color::rgba(0.0, 0.0, 0.0, 0.5),
                blur: 0.0,
                translate_x: 3.0,
                translate_y: 3.0,
            }],
            &mut dst,
            &src,
            size,
        )
        .unwrap();

        // Just past the square's bottom-right corner: shadow only.
        let shadow = dst.pixel(15, 15);
        assert!(shadow[3] > 0 && shadow[3] < 255, "alpha {}", shadow[3]);
        assert_eq!(shadow[0], 0);
        // Interior still shows the opaque source drawn on top.
        assert_eq!(dst.pixel(10, 10), [255, 255, 255, 255]);
        // Far corner untouched.
        assert_eq!(dst.alpha_at(0, 0), 0);
    }

    #[test]
    fn outer_shadow_blur_softens_edges_within_padding() {
        let size = Size::new(20, 20);
        let src = square_source(size, 6);
        let mut dst = Surface::new(size).unwrap();
        apply_effects(
            &[Effect::OuterShadow {
                color: Color::rgba(0.0, 0.0, 0.0, 1.0),
                blur: 3.0,
                translate_x: 0.0,
                translate_y: 0.0,
            }],
            &mut dst,
            &src,
            size,
        )
        .unwrap();

        // Blur spills a soft halo just beyond the silhouette...
        assert!(dst.alpha_at(4, 10) > 0);
        // ...but not past the blur radius.
        assert_eq!(dst.alpha_at(0, 0), 0);
    }

    #[test]
    fn inner_shadow_stays_inside_silhouette() {
        let size = Size::new(20, 20);
        let src = square_source(size, 5);
        let mut dst = Surface::new(size).unwrap();
        apply_effects(
            &[Effect::InnerShadow {
                color: Color::rgba(1.0, 0.0, 0.0, 1.0),
                blur: 0.0,
                translate_x: 0.0,
                translate_y: 2.0,
            }],
            &mut dst,
            &src,
            size,
        )
        .unwrap();

        // Alpha footprint unchanged: still clear outside, opaque inside.
        assert_eq!(dst.alpha_at(2, 2), 0);
        assert_eq!(dst.alpha_at(10, 10), 255);
        // The band just inside the top edge picked up the shadow color.
        let band = dst.pixel(10, 5);
        assert!(band[0] > 200, "red {}", band[0]);
        // Deep interior is still white.
        assert_eq!(dst.pixel(10, 12), [255, 255, 255, 255]);
    }

    #[test]
    fn cast_shadow_sweeps_diagonally() {
        let size = Size::new(24, 24);
        let src = square_source(size, 8);
        let mut dst = Surface::new(size).unwrap();
        apply_effects(&[Effect::CastShadow], &mut dst, &src, size).unwrap();

        // Below-right of the square the diagonal sweep leaves shadow.
        let shadow = dst.pixel(18, 18);
        assert!(shadow[3] > 0, "expected shadow at (18,18)");
        assert_eq!(shadow[0], 0);
        // Above-left stays clear.
        assert_eq!(dst.alpha_at(2, 2), 0);
        // Source drawn on top of its own shadow.
        assert_eq!(dst.pixel(12, 12), [255, 255, 255, 255]);
    }

    #[test]
    fn score_composites_nothing() {
        let size = Size::new(16, 16);
        let src = square_source(size, 4);

        let mut plain = Surface::new(size).unwrap();
        apply_effects(&[], &mut plain, &src, size).unwrap();

        let mut scored = Surface::new(size).unwrap();
        apply_effects(&[Effect::Score], &mut scored, &src, size).unwrap();

        assert_eq!(plain.data(), scored.data());
    }

    #[test]
    fn linear_gradient_fill_follows_axis() {
        let size = Size::new(8, 8);
        let mut s = Surface::new(size).unwrap();
        s.fill(CompositeMode::SourceOver, Color::rgba(0.0, 0.0, 0.0, 1.0));
        fill_linear_gradient(
            &mut s,
            CompositeMode::SourceAtop,
            (0.0, 0.0),
            (8.0, 0.0),
            &[
                ColorStop {
                    offset: 0.0,
                    color: Color::rgba(1.0, 1.0, 1.0, 1.0),
                },
                ColorStop {
                    offset: 1.0,
                    color: Color::rgba(0.0, 0.0, 0.0, 1.0),
                },
            ],
        );
        assert!(s.pixel(0, 4)[0] > s.pixel(4, 4)[0]);
        assert!(s.pixel(4, 4)[0] > s.pixel(7, 4)[0]);
    }
}
