//! Copy-with-resize between surfaces.
//!
//! Large downscales go through iterative halving: each step shrinks by at
//! most 2x into a fresh intermediate surface, so the final blit always runs
//! at a ratio of 0.5 or better. A single large-ratio resample skips most of
//! the source pixels; the halving chain folds them all in.

use crate::{
    error::{IconforgeError, IconforgeResult},
    geom::{Rect, Size},
    pixel::{self, CompositeMode},
    surface::Surface,
};

/// Draw `src_rect` of `src` into `dst_rect` of `dst`, halving first whenever
/// the destination is less than half the source in either axis.
///
/// Zero-area source or destination rects are a geometry error; callers that
/// want skip-and-continue semantics (the layer renderer) handle that variant
/// at their level.
pub fn draw_scaled(
    dst: &mut Surface,
    src: &Surface,
    src_rect: Rect,
    dst_rect: Rect,
) -> IconforgeResult<()> {
    if src_rect.is_empty() || dst_rect.is_empty() {
        return Err(IconforgeError::geometry(format!(
            "scaled blit rects must be non-empty (src {src_rect:?}, dst {dst_rect:?})"
        )));
    }

    let mut cur_rect = src_rect.clamped_to(src.size());
    if cur_rect.is_empty() {
        return Err(IconforgeError::geometry(
            "scaled blit source rect lies outside the source surface",
        ));
    }

    let (dw, dh) = (dst_rect.w, dst_rect.h);
    let mut intermediate: Option<Surface> = None;

    while dw < cur_rect.w / 2.0 || dh < cur_rect.h / 2.0 {
        let tmp_w = dw.max(cur_rect.w / 2.0).ceil().max(1.0) as u32;
        let tmp_h = dh.max(cur_rect.h / 2.0).ceil().max(1.0) as u32;
        let mut tmp = Surface::new(Size::new(tmp_w, tmp_h))?;

        let tmp_rect = tmp.size().to_rect();
        match &intermediate {
            Some(prev) => sample_into(&mut tmp, tmp_rect, prev, cur_rect),
            None => sample_into(&mut tmp, tmp_rect, src, cur_rect),
        }

        cur_rect = tmp_rect;
        intermediate = Some(tmp);
    }

    match &intermediate {
        Some(prev) => sample_into(dst, dst_rect, prev, cur_rect),
        None => sample_into(dst, dst_rect, src, cur_rect),
    }
    Ok(())
}

/// Scale `src_rect` to fit entirely inside `dst_rect`, preserving aspect
/// ratio and centering on the leftover axis.
pub fn draw_center_inside(
    dst: &mut Surface,
    src: &Surface,
    dst_rect: Rect,
    src_rect: Rect,
) -> IconforgeResult<()> {
    if src_rect.aspect() > dst_rect.aspect() {
        let h = src_rect.h * dst_rect.w / src_rect.w;
        draw_scaled(
            dst,
            src,
            src_rect,
            Rect::new(dst_rect.x, dst_rect.y + (dst_rect.h - h) / 2.0, dst_rect.w, h),
        )
    } else {
        let w = src_rect.w * dst_rect.h / src_rect.h;
        draw_scaled(
            dst,
            src,
            src_rect,
            Rect::new(dst_rect.x + (dst_rect.w - w) / 2.0, dst_rect.y, w, dst_rect.h),
        )
    }
}

/// Scale the source to cover all of `dst_rect`, cropping the overflowing
/// axis symmetrically.
pub fn draw_center_crop(
    dst: &mut Surface,
    src: &Surface,
    dst_rect: Rect,
    src_rect: Rect,
) -> IconforgeResult<()> {
    if src_rect.aspect() > dst_rect.aspect() {
        let w = src_rect.h * dst_rect.w / dst_rect.h;
        draw_scaled(
            dst,
            src,
            Rect::new(src_rect.x + (src_rect.w - w) / 2.0, src_rect.y, w, src_rect.h),
            dst_rect,
        )
    } else {
        let h = src_rect.w * dst_rect.h / dst_rect.w;
        draw_scaled(
            dst,
            src,
            Rect::new(src_rect.x, src_rect.y + (src_rect.h - h) / 2.0, src_rect.w, h),
            dst_rect,
        )
    }
}

/// Bilinear resample of `src_rect` into `dst_rect`, composited source-over.
///
/// At a ratio of exactly 0.5 the sample window degenerates to an equal-weight
/// 2x2 box, which is what makes the halving chain behave like a box filter.
fn sample_into(dst: &mut Surface, dst_rect: Rect, src: &Surface, src_rect: Rect) {
    let x0 = (dst_rect.x.round() as i64).max(0);
    let y0 = (dst_rect.y.round() as i64).max(0);
    let x1 = ((dst_rect.x + dst_rect.w).round() as i64).min(dst.width() as i64);
    let y1 = ((dst_rect.y + dst_rect.h).round() as i64).min(dst.height() as i64);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let scale_x = src_rect.w / dst_rect.w;
    let scale_y = src_rect.h / dst_rect.h;

    for y in y0..y1 {
        let sy = src_rect.y + (y as f64 + 0.5 - dst_rect.y) * scale_y - 0.5;
        for x in x0..x1 {
            let sx = src_rect.x + (x as f64 + 0.5 - dst_rect.x) * scale_x - 0.5;
            let px = bilinear(src, src_rect, sx, sy);

            let d_idx = (y as usize * dst.width() as usize + x as usize) * 4;
            let d_px = {
                let d = dst.data();
                [d[d_idx], d[d_idx + 1], d[d_idx + 2], d[d_idx + 3]]
            };
            let out = pixel::composite(CompositeMode::SourceOver, d_px, px, 1.0);
            dst.data_mut()[d_idx..d_idx + 4].copy_from_slice(&out);
        }
    }
}

fn bilinear(src: &Surface, window: Rect, sx: f64, sy: f64) -> [u8; 4] {
    // Clamp sampling to the source window so a cropped blit cannot bleed in
    // neighbouring pixels.
    let min_x = window.x;
    let max_x = (window.x + window.w - 1.0).max(min_x);
    let min_y = window.y;
    let max_y = (window.y + window.h - 1.0).max(min_y);

    let cx = sx.clamp(min_x, max_x);
    let cy = sy.clamp(min_y, max_y);

    let fx = cx.floor();
    let fy = cy.floor();
    let tx = cx - fx;
    let ty = cy - fy;

    let x0 = fx.clamp(min_x, max_x) as u32;
    let y0 = fy.clamp(min_y, max_y) as u32;
    let x1 = (fx + 1.0).clamp(min_x, max_x) as u32;
    let y1 = (fy + 1.0).clamp(min_y, max_y) as u32;

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - tx) + f64::from(p10[c]) * tx;
        let bot = f64::from(p01[c]) * (1.0 - tx) + f64::from(p11[c]) * tx;
        out[c] = (top * (1.0 - ty) + bot * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}
