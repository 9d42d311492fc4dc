//! Per-pixel Porter-Duff arithmetic over premultiplied RGBA8.
//!
//! All buffers are premultiplied: a channel value never exceeds its alpha.
//! Because of that, every operator below applies the same coefficients to
//! color and alpha channels alike.

use crate::error::{IconforgeError, IconforgeResult};

pub type PremulRgba8 = [u8; 4];

/// The composite operators the engine needs. `SourceOver` is the default
/// draw; `SourceAtop` confines a draw to the destination's alpha footprint;
/// `SourceIn` keeps only the overlap; `SourceOut` keeps only the source
/// outside the destination's footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeMode {
    SourceOver,
    SourceAtop,
    SourceIn,
    SourceOut,
}

/// Composite a single source pixel onto a destination pixel with a global
/// opacity in `0..=1` applied to the source.
pub fn composite(mode: CompositeMode, dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let op = ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u8;
    if op == 0 {
        return match mode {
            // A fully faded source still erases under the overlap-only modes.
            CompositeMode::SourceIn | CompositeMode::SourceOut => [0, 0, 0, 0],
            CompositeMode::SourceOver | CompositeMode::SourceAtop => dst,
        };
    }

    let s = [
        mul_div255(src[0], op),
        mul_div255(src[1], op),
        mul_div255(src[2], op),
        mul_div255(src[3], op),
    ];
    let sa = s[3];
    let da = dst[3];
    let inv_sa = 255 - sa;
    let inv_da = 255 - da;

    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = match mode {
            CompositeMode::SourceOver => s[c].saturating_add(mul_div255(dst[c], inv_sa)),
            CompositeMode::SourceAtop => {
                mul_div255(s[c], da).saturating_add(mul_div255(dst[c], inv_sa))
            }
            CompositeMode::SourceIn => mul_div255(s[c], da),
            CompositeMode::SourceOut => mul_div255(s[c], inv_da),
        };
    }
    out
}

/// Composite equal-length premul RGBA8 slices pixel by pixel.
pub fn composite_in_place(
    mode: CompositeMode,
    dst: &mut [u8],
    src: &[u8],
    opacity: f32,
) -> IconforgeResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(IconforgeError::validation(
            "composite_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = composite(mode, [d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Composite a constant premultiplied color over an entire buffer. This is
/// the "fill the whole canvas under a composite op" primitive the effect
/// pipeline leans on (colorize, punch-out, silhouette fills).
pub fn fill_in_place(mode: CompositeMode, dst: &mut [u8], color: PremulRgba8) {
    for d in dst.chunks_exact_mut(4) {
        let out = composite(mode, [d[0], d[1], d[2], d[3]], color, 1.0);
        d.copy_from_slice(&out);
    }
}

fn mul_div255(x: u8, y: u8) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_opacity_0_is_noop() {
        let dst = [1, 2, 3, 4];
        let src = [200, 200, 200, 200];
        assert_eq!(composite(CompositeMode::SourceOver, dst, src, 0.0), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(composite(CompositeMode::SourceOver, dst, src, 1.0), src);
    }

    #[test]
    fn over_dst_transparent_returns_src() {
        let dst = [0, 0, 0, 0];
        let src = [100, 110, 120, 200];
        assert_eq!(composite(CompositeMode::SourceOver, dst, src, 1.0), src);
    }

    #[test]
    fn atop_keeps_destination_alpha() {
        let dst = [0, 128, 0, 128];
        let src = [255, 0, 0, 255];
        let out = composite(CompositeMode::SourceAtop, dst, src, 1.0);
        assert_eq!(out[3], 128);
        // Source color confined to the destination footprint.
        assert_eq!(out[0], 128);
        assert_eq!(out[1], 0);
    }

    #[test]
    fn atop_outside_footprint_is_transparent() {
        let dst = [0, 0, 0, 0];
        let src = [255, 0, 0, 255];
        assert_eq!(composite(CompositeMode::SourceAtop, dst, src, 1.0), [0, 0, 0, 0]);
    }

    #[test]
    fn source_in_keeps_only_overlap() {
        let dst = [0, 0, 0, 128];
        let src = [255, 0, 0, 255];
        assert_eq!(composite(CompositeMode::SourceIn, dst, src, 1.0), [128, 0, 0, 128]);

        let empty_dst = [0, 0, 0, 0];
        assert_eq!(composite(CompositeMode::SourceIn, empty_dst, src, 1.0), [0, 0, 0, 0]);
    }

    #[test]
    fn source_out_is_inverse_of_in() {
        let src = [255, 0, 0, 255];
        let opaque_dst = [0, 0, 0, 255];
        assert_eq!(composite(CompositeMode::SourceOut, opaque_dst, src, 1.0), [0, 0, 0, 0]);

        let empty_dst = [0, 0, 0, 0];
        assert_eq!(composite(CompositeMode::SourceOut, empty_dst, src, 1.0), src);
    }

    #[test]
    fn fill_in_place_source_in_masks_to_alpha() {
        // Two pixels: one opaque, one transparent.
        let mut buf = vec![0u8, 0, 255, 255, 0, 0, 0, 0];
        fill_in_place(CompositeMode::SourceIn, &mut buf, [255, 255, 255, 255]);
        assert_eq!(&buf[0..4], &[255, 255, 255, 255]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 0]);
    }
}
