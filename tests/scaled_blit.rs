use iconforge::{IconforgeError, Rect, Size, Surface, draw_scaled};

/// Opaque diagonal gradient: smooth enough that a box filter and the
/// halving chain must agree closely.
fn gradient_source(size: Size) -> Surface {
    let mut s = Surface::new(size).unwrap();
    let data = s.data_mut();
    for y in 0..size.h {
        for x in 0..size.w {
            let v = ((x + y) * 255 / (size.w + size.h - 2)) as u8;
            let idx = ((y * size.w + x) * 4) as usize;
            data[idx] = v;
            data[idx + 1] = v;
            data[idx + 2] = v;
            data[idx + 3] = 255;
        }
    }
    s
}

/// Reference box-filter downsample: plain average over each source block.
fn box_downsample(src: &Surface, to: Size) -> Vec<u8> {
    let (sw, sh) = (src.width(), src.height());
    let bx = sw / to.w;
    let by = sh / to.h;
    let mut out = Vec::with_capacity((to.w * to.h * 4) as usize);
    for oy in 0..to.h {
        for ox in 0..to.w {
            let mut acc = [0u64; 4];
            for y in oy * by..(oy + 1) * by {
                for x in ox * bx..(ox + 1) * bx {
                    let px = src.pixel(x, y);
                    for c in 0..4 {
                        acc[c] += u64::from(px[c]);
                    }
                }
            }
            let n = u64::from(bx * by);
            for c in 0..4 {
                out.push(((acc[c] + n / 2) / n) as u8);
            }
        }
    }
    out
}

#[test]
fn halving_downsample_matches_box_filter_reference() {
    let src = gradient_source(Size::new(1000, 1000));
    let to = Size::new(50, 50);

    let mut dst = Surface::new(to).unwrap();
    draw_scaled(
        &mut dst,
        &src,
        Rect::new(0.0, 0.0, 1000.0, 1000.0),
        Rect::new(0.0, 0.0, 50.0, 50.0),
    )
    .unwrap();

    let reference = box_downsample(&src, to);
    let mut worst = 0i32;
    for (got, want) in dst.data().iter().zip(reference.iter()) {
        worst = worst.max((i32::from(*got) - i32::from(*want)).abs());
    }
    assert!(worst <= 4, "worst per-channel difference {worst} exceeds tolerance");
}

#[test]
fn upscale_does_not_invoke_halving() {
    let src = gradient_source(Size::new(10, 10));
    let mut dst = Surface::new(Size::new(40, 40)).unwrap();
    draw_scaled(
        &mut dst,
        &src,
        Rect::new(0.0, 0.0, 10.0, 10.0),
        Rect::new(0.0, 0.0, 40.0, 40.0),
    )
    .unwrap();
    assert_eq!(dst.alpha_at(20, 20), 255);
}

#[test]
fn zero_area_rects_surface_geometry_errors() {
    let src = gradient_source(Size::new(10, 10));
    let mut dst = Surface::new(Size::new(10, 10)).unwrap();

    for (src_rect, dst_rect) in [
        (Rect::new(0.0, 0.0, 0.0, 10.0), Rect::new(0.0, 0.0, 10.0, 10.0)),
        (Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(0.0, 0.0, 0.0, 0.0)),
    ] {
        let result = draw_scaled(&mut dst, &src, src_rect, dst_rect);
        assert!(matches!(result, Err(IconforgeError::Geometry(_))));
    }
}
