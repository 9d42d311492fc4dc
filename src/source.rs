//! Source-image intake: decoding raster and SVG bytes into premultiplied
//! surfaces, trim/padding normalization, and the content-addressed decode
//! cache.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    blit,
    error::{IconforgeError, IconforgeResult},
    geom::{Rect, Size},
    surface::Surface,
    trim::compute_trim_rect,
};

/// SVG sources are rasterized scaled up to fit this box, so vector art stays
/// sharp through downstream scaling.
pub const MAX_SVG_RENDER_SIZE: Size = Size::new(720, 720);

/// Decode raster or SVG bytes into a premultiplied surface. Decode failures
/// propagate; a blank image is never substituted.
pub fn decode_source(bytes: &[u8]) -> IconforgeResult<Surface> {
    if looks_like_svg(bytes) {
        decode_svg(bytes)
    } else {
        decode_raster(bytes)
    }
}

fn decode_raster(bytes: &[u8]) -> IconforgeResult<Surface> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| IconforgeError::decode(format!("image decode failed: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    Surface::from_premul_parts(Size::new(width, height), data)
}

fn decode_svg(bytes: &[u8]) -> IconforgeResult<Surface> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| IconforgeError::decode(format!("svg parse failed: {e}")))?;

    let base_w = f64::from(tree.size().width());
    let base_h = f64::from(tree.size().height());
    if base_w <= 0.0 || base_h <= 0.0 {
        return Err(IconforgeError::decode("svg has invalid width/height"));
    }

    let scale = (f64::from(MAX_SVG_RENDER_SIZE.w) / base_w)
        .min(f64::from(MAX_SVG_RENDER_SIZE.h) / base_h);
    let w = ((base_w * scale).round().max(1.0)) as u32;
    let h = ((base_h * scale).round().max(1.0)) as u32;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| IconforgeError::decode("failed to allocate svg pixmap"))?;
    let sx = (w as f32) / tree.size().width();
    let sy = (h as f32) / tree.size().height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // tiny_skia pixmaps are already premultiplied RGBA8.
    Surface::from_premul_parts(Size::new(w, h), pixmap.data().to_vec())
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let text = text.trim_start();
    text.starts_with("<svg") || text.starts_with("<?xml")
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
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

/// Crop a source to its trim rect (or keep the full frame) and re-center it
/// with fractional padding: the pad in pixels is
/// `round(padding * min(content w, content h))` on every side.
pub fn normalize_source(src: &Surface, trim: bool, padding: f64) -> IconforgeResult<Surface> {
    let content = if trim {
        compute_trim_rect(src, 1)?
    } else {
        src.size().to_rect()
    };

    let pad = (padding.max(0.0) * content.w.min(content.h)).round();
    let out_size = Size::new(
        (content.w + 2.0 * pad).round().max(1.0) as u32,
        (content.h + 2.0 * pad).round().max(1.0) as u32,
    );

    let mut out = Surface::new(out_size)?;
    blit::draw_scaled(
        &mut out,
        src,
        content,
        Rect::new(pad, pad, content.w, content.h),
    )?;
    Ok(out)
}

/// 64-bit content digest for the decode cache key.
pub fn content_digest(bytes: &[u8]) -> u64 {
    fn mix64(mut z: u64) -> u64 {
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    let mut state = 0x9E37_79B9_7F4A_7C15u64 ^ (bytes.len() as u64);
    for chunk in bytes.chunks(8) {
        let mut v = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            v |= u64::from(b) << (i * 8);
        }
        state = mix64(state ^ v);
    }
    state
}

/// Decoded-source cache keyed by content digest. Entries are immutable once
/// inserted; this is the only state shared across regenerate invocations.
#[derive(Debug, Default)]
pub struct SourceCache {
    decoded: HashMap<u64, Arc<Surface>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_decode(&mut self, bytes: &[u8]) -> IconforgeResult<Arc<Surface>> {
        let key = content_digest(bytes);
        if let Some(hit) = self.decoded.get(&key) {
            return Ok(hit.clone());
        }
        let surface = Arc::new(decode_source(bytes)?);
        self.decoded.insert(key, surface.clone());
        Ok(surface)
    }

    pub fn len(&self) -> usize {
        self.decoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoded.is_empty()
    }
}
