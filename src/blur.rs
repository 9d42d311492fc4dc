//! Separable Gaussian blur over premultiplied RGBA8.
//!
//! This is a real convolution: the effect pipeline depends on the blurred
//! extent never exceeding the kernel radius, so padding computed from an
//! effect's blur value is exact.

use crate::{
    error::{IconforgeError, IconforgeResult},
    surface::Surface,
};

/// Blur a surface with kernel `radius` and standard deviation `sigma`.
/// A radius of zero is an identity copy.
pub fn blur_surface(src: &Surface, radius: u32, sigma: f32) -> IconforgeResult<Surface> {
    let data = blur_premul(src.data(), src.width(), src.height(), radius, sigma)?;
    Surface::from_premul_parts(src.size(), data)
}

/// The sigma the effect pipeline pairs with a given kernel radius.
pub fn sigma_for_radius(radius: u32) -> f32 {
    (radius as f32 / 2.0).max(0.5)
}

pub fn blur_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> IconforgeResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| IconforgeError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(IconforgeError::validation(
            "blur_premul expects src matching width*height*4",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    // Horizontal: lines are rows, taps step one pixel right.
    convolve_axis(src, &mut tmp, height, width, (width as usize) * 4, 4, &kernel);
    // Vertical: lines are columns, taps step one row down.
    convolve_axis(&tmp, &mut out, width, height, 4, (width as usize) * 4, &kernel);
    Ok(out)
}

/// Fixed-point (16-bit fraction) Gaussian weights summing to exactly 1.0.
fn gaussian_kernel(radius: u32, sigma: f32) -> IconforgeResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(IconforgeError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;

    let raw: Vec<f64> = (-r..=r).map(|i| (-(i * i) as f64 / denom).exp()).collect();
    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return Err(IconforgeError::validation("gaussian kernel sum is zero"));
    }

    let mut weights: Vec<u32> = raw
        .iter()
        .map(|w| (((w / sum) * 65536.0).round() as i64).clamp(0, 65536) as u32)
        .collect();

    // Push any rounding residue into the center tap so the weights stay
    // normalized and constant regions blur to themselves.
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + (65536 - acc)).clamp(0, 65536) as u32;

    Ok(weights)
}

/// One separable pass. A "line" is a row (horizontal pass) or a column
/// (vertical pass); `tap_stride` steps along the line, `line_stride` steps
/// between lines, both in bytes. Edges clamp.
fn convolve_axis(
    src: &[u8],
    dst: &mut [u8],
    lines: u32,
    line_len: u32,
    line_stride: usize,
    tap_stride: usize,
    kernel: &[u32],
) {
    let radius = (kernel.len() / 2) as i64;
    let len = line_len as i64;

    for line in 0..lines as usize {
        let base = line * line_stride;
        for pos in 0..len {
            let mut acc = [0u64; 4];
            for (ki, &kw) in kernel.iter().enumerate() {
                let tap = (pos + ki as i64 - radius).clamp(0, len - 1) as usize;
                let idx = base + tap * tap_stride;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = base + pos as usize * tap_stride;
            for c in 0..4 {
                dst[out_idx + c] = (((acc[c] + 32768) >> 16).min(255)) as u8;
            }
        }
    }
}
