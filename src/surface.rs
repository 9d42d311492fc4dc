use std::io::Cursor;

use crate::{
    color::Color,
    error::{IconforgeError, IconforgeResult},
    geom::{Rect, Size},
    pixel::{self, CompositeMode, PremulRgba8},
};

/// An owned premultiplied-RGBA8 pixel buffer with compositing operations.
///
/// A surface's size is fixed at construction and its buffer is released when
/// the surface is dropped. Surfaces are never shared between in-flight
/// operations; every compositing stage allocates its own scratch surfaces.
#[derive(Clone, Debug)]
pub struct Surface {
    size: Size,
    data: Vec<u8>,
}

impl Surface {
    /// Allocate a cleared (fully transparent) surface.
    pub fn new(size: Size) -> IconforgeResult<Self> {
        if size.w == 0 || size.h == 0 {
            return Err(IconforgeError::dimension(format!(
                "surface size must be non-zero, got {}x{}",
                size.w, size.h
            )));
        }
        let len = (size.w as usize)
            .checked_mul(size.h as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| IconforgeError::dimension("surface byte size overflow"))?;
        Ok(Self {
            size,
            data: vec![0u8; len],
        })
    }

    /// Wrap an existing premultiplied RGBA8 buffer.
    pub fn from_premul_parts(size: Size, data: Vec<u8>) -> IconforgeResult<Self> {
        let expected = size.area().checked_mul(4);
        if size.w == 0 || size.h == 0 {
            return Err(IconforgeError::dimension("surface size must be non-zero"));
        }
        if expected != Some(data.len()) {
            return Err(IconforgeError::validation(
                "pixel buffer length does not match width*height*4",
            ));
        }
        Ok(Self { size, data })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.w
    }

    pub fn height(&self) -> u32 {
        self.size.h
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> PremulRgba8 {
        let idx = ((y as usize * self.size.w as usize) + x as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixel(x, y)[3]
    }

    /// Copy out the pixels of an integer-aligned rect.
    pub fn get_pixels(&self, rect: Rect) -> IconforgeResult<Vec<u8>> {
        let (x, y, w, h) = self.int_rect(rect)?;
        let mut out = Vec::with_capacity(w as usize * h as usize * 4);
        for row in y..y + h {
            let start = ((row as usize * self.size.w as usize) + x as usize) * 4;
            out.extend_from_slice(&self.data[start..start + w as usize * 4]);
        }
        Ok(out)
    }

    /// Overwrite the pixels of an integer-aligned rect. The write is atomic
    /// from the caller's point of view: it either fully applies or fails
    /// before touching the buffer.
    pub fn set_pixels(&mut self, rect: Rect, pixels: &[u8]) -> IconforgeResult<()> {
        let (x, y, w, h) = self.int_rect(rect)?;
        if pixels.len() != w as usize * h as usize * 4 {
            return Err(IconforgeError::validation(
                "set_pixels buffer length does not match rect",
            ));
        }
        for row in 0..h {
            let dst_start = (((y + row) as usize * self.size.w as usize) + x as usize) * 4;
            let src_start = row as usize * w as usize * 4;
            self.data[dst_start..dst_start + w as usize * 4]
                .copy_from_slice(&pixels[src_start..src_start + w as usize * 4]);
        }
        Ok(())
    }

    fn int_rect(&self, rect: Rect) -> IconforgeResult<(u32, u32, u32, u32)> {
        let x = rect.x.round();
        let y = rect.y.round();
        let w = rect.w.round();
        let h = rect.h.round();
        if w <= 0.0 || h <= 0.0 {
            return Err(IconforgeError::geometry("pixel rect must be non-empty"));
        }
        if x < 0.0
            || y < 0.0
            || x + w > f64::from(self.size.w)
            || y + h > f64::from(self.size.h)
        {
            return Err(IconforgeError::geometry(format!(
                "pixel rect {rect:?} out of bounds for {}x{} surface",
                self.size.w, self.size.h
            )));
        }
        Ok((x as u32, y as u32, w as u32, h as u32))
    }

    /// Composite a window of `src` into this surface with its top-left at
    /// `(dx, dy)`. Out-of-bounds regions are clipped on both ends; offsets
    /// may be negative. `src_rect` is clamped to `src`'s bounds.
    pub fn draw_surface(
        &mut self,
        src: &Surface,
        src_rect: Rect,
        dx: i64,
        dy: i64,
        mode: CompositeMode,
        opacity: f32,
    ) {
        let sr = src_rect.clamped_to(src.size);
        if sr.is_empty() {
            return;
        }
        let sx0 = sr.x.round() as i64;
        let sy0 = sr.y.round() as i64;
        let sw = sr.w.round() as i64;
        let sh = sr.h.round() as i64;

        // Overlap of the placed window with this surface's bounds.
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + sw).min(self.size.w as i64);
        let y1 = (dy + sh).min(self.size.h as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for y in y0..y1 {
            let sy = (y - dy + sy0) as usize;
            for x in x0..x1 {
                let sx = (x - dx + sx0) as usize;
                let s_idx = (sy * src.size.w as usize + sx) * 4;
                let d_idx = (y as usize * self.size.w as usize + x as usize) * 4;
                let s_px = [
                    src.data[s_idx],
                    src.data[s_idx + 1],
                    src.data[s_idx + 2],
                    src.data[s_idx + 3],
                ];
                let d_px = [
                    self.data[d_idx],
                    self.data[d_idx + 1],
                    self.data[d_idx + 2],
                    self.data[d_idx + 3],
                ];
                let out = pixel::composite(mode, d_px, s_px, opacity);
                self.data[d_idx..d_idx + 4].copy_from_slice(&out);
            }
        }
    }

    /// Source-over draw of the whole of `src` at `(dx, dy)`.
    pub fn draw(&mut self, src: &Surface, dx: i64, dy: i64) {
        self.draw_surface(
            src,
            Rect::from_size(src.size),
            dx,
            dy,
            CompositeMode::SourceOver,
            1.0,
        );
    }

    /// Fill the entire surface with a constant color under a composite op.
    pub fn fill(&mut self, mode: CompositeMode, color: Color) {
        pixel::fill_in_place(mode, &mut self.data, color.to_premul_rgba8());
    }

    /// Rasterize vector geometry through a fresh CPU render context and
    /// composite the result over this surface. The closure receives a context
    /// the size of the surface with an identity transform.
    pub fn render_vector<F>(&mut self, draw: F) -> IconforgeResult<()>
    where
        F: FnOnce(&mut vello_cpu::RenderContext),
    {
        let w: u16 = self
            .size
            .w
            .try_into()
            .map_err(|_| IconforgeError::dimension("surface width exceeds u16"))?;
        let h: u16 = self
            .size
            .h
            .try_into()
            .map_err(|_| IconforgeError::dimension("surface height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        draw(&mut ctx);
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        pixel::composite_in_place(
            CompositeMode::SourceOver,
            &mut self.data,
            pixmap.data_as_u8_slice(),
            1.0,
        )
    }

    /// Straight-alpha RGBA8 copy of the buffer (unpremultiplied).
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = px[3] as u32;
            if a == 0 {
                px[0] = 0;
                px[1] = 0;
                px[2] = 0;
                continue;
            }
            for c in px.iter_mut().take(3) {
                *c = (((u32::from(*c) * 255) + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// Encode to PNG bytes for the archive boundary.
    pub fn encode_png(&self) -> IconforgeResult<Vec<u8>> {
        let rgba = self.to_straight_rgba8();
        let img = image::RgbaImage::from_raw(self.size.w, self.size.h, rgba)
            .ok_or_else(|| IconforgeError::encode("pixel buffer did not match dimensions"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| IconforgeError::encode(format!("png encode failed: {e}")))?;
        Ok(buf)
    }
}

/// Convert a kurbo path into the CPU renderer's path type element by element.
pub(crate) fn to_cpu_path(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    fn pt(p: kurbo::Point) -> vello_cpu::kurbo::Point {
        vello_cpu::kurbo::Point::new(p.x, p.y)
    }

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}
