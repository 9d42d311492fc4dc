//! The layer tree renderer: walks a [`Layer`] tree and composites it into a
//! destination surface.
//!
//! Every layer renders into its own scratch surface, so a failing draw can
//! never corrupt a sibling; it renders as fully transparent instead and the
//! pass continues. Mask layers split a group's children into stacked
//! targets that collapse back down with source-atop composites, clipping
//! later siblings to the alpha footprint accumulated before them.

use crate::{
    blit,
    compositor::apply_effects,
    error::{IconforgeError, IconforgeResult},
    geom::Rect,
    geom::Size,
    layer::{Draw, Fit, Layer, SourceStore},
    pixel::CompositeMode,
    surface::{Surface, to_cpu_path},
};

/// Render `root` into `dst`. `dst` must be `size`-sized; layer geometry is
/// expected in final pixel space.
pub fn draw_layers(
    dst: &mut Surface,
    size: Size,
    root: &Layer,
    sources: &SourceStore,
) -> IconforgeResult<()> {
    draw_layer(dst, size, root, sources)
}

fn draw_layer(
    dst: &mut Surface,
    size: Size,
    layer: &Layer,
    sources: &SourceStore,
) -> IconforgeResult<()> {
    let mut scratch = Surface::new(size)?;

    match layer {
        Layer::Group { children, .. } => draw_group(&mut scratch, size, children, sources)?,
        Layer::Leaf { draw, .. } => {
            if let Err(err) = render_draw(&mut scratch, draw, sources) {
                match err {
                    IconforgeError::Dimension(_) => return Err(err),
                    err => {
                        // A half-configured draw is an expected steady state;
                        // the layer contributes nothing and the pass goes on.
                        tracing::warn!(error = %err, "layer draw failed, rendering transparent");
                        scratch.clear();
                    }
                }
            }
        }
    }

    let effects = layer.effects();
    if !effects.is_empty() {
        let mut fx = Surface::new(size)?;
        apply_effects(effects, &mut fx, &scratch, size)?;
        scratch = fx;
    }

    dst.draw(&scratch, 0, 0);
    Ok(())
}

fn draw_group(
    dst: &mut Surface,
    size: Size,
    children: &[Layer],
    sources: &SourceStore,
) -> IconforgeResult<()> {
    // Targets above the group's own destination; the destination itself is
    // the implicit bottom of the stack, so it always has >= 1 entry.
    let mut stack: Vec<Surface> = Vec::new();

    for child in children {
        match stack.last_mut() {
            Some(top) => draw_layer(top, size, child, sources)?,
            None => draw_layer(dst, size, child, sources)?,
        }
        if child.mask() {
            // Later siblings draw into a fresh surface that will be clipped
            // to the footprint established so far.
            stack.push(Surface::new(size)?);
        }
    }

    while let Some(top) = stack.pop() {
        let full = Rect::from_size(size);
        match stack.last_mut() {
            Some(below) => below.draw_surface(&top, full, 0, 0, CompositeMode::SourceAtop, 1.0),
            None => dst.draw_surface(&top, full, 0, 0, CompositeMode::SourceAtop, 1.0),
        }
    }
    Ok(())
}

fn render_draw(target: &mut Surface, draw: &Draw, sources: &SourceStore) -> IconforgeResult<()> {
    match draw {
        Draw::Shape { shape, color } => {
            let path = shape.to_path()?;
            let rgba = color.to_rgba8();
            target.render_vector(|ctx| {
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    rgba[0], rgba[1], rgba[2], rgba[3],
                ));
                ctx.fill_path(&to_cpu_path(&path));
            })
        }
        Draw::Image { source, dst, fit } => {
            let img = sources.get(source).ok_or_else(|| {
                IconforgeError::validation(format!("unknown image source \"{source}\""))
            })?;
            let src_rect = img.size().to_rect();
            match fit {
                Fit::CenterInside => blit::draw_center_inside(target, img, *dst, src_rect),
                Fit::CenterCrop => blit::draw_center_crop(target, img, *dst, src_rect),
            }
        }
        Draw::Fill { color, rect } => match rect {
            None => {
                target.fill(CompositeMode::SourceOver, *color);
                Ok(())
            }
            Some(r) => {
                let rgba = color.to_rgba8();
                let vrect = vello_cpu::kurbo::Rect::new(r.x, r.y, r.x + r.w, r.y + r.h);
                target.render_vector(|ctx| {
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        rgba[0], rgba[1], rgba[2], rgba[3],
                    ));
                    ctx.fill_rect(&vrect);
                })
            }
        },
    }
}
