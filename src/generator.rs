//! The launcher-icon generator: builds density-parameterized layer trees and
//! drives the renderer once per output, deriving lower densities from a
//! single highest-density master render.

use serde::{Deserialize, Serialize};

use crate::{
    archive::{ArchiveEntry, anydpi_v26_path, mipmap_path, sanitize_resource_name},
    blit,
    color::Color,
    density::{self, Density},
    effect::{ColorStop, Effect},
    error::IconforgeResult,
    geom::{Rect, Size},
    layer::{Draw, Fit, Layer, Shape, SourceStore},
    surface::Surface,
};

/// Logical icon canvas at the 1.0 multiplier.
pub const ICON_SIZE: Size = Size::new(48, 48);

/// Adaptive icons render on a 108dp canvas with the content in the middle
/// 72dp; geometry scales by `108/48` on top of the density multiplier.
const ADAPTIVE_ICON_WIDTH: f64 = 108.0;

const TARGET_RECT_FULL_BLEED: Rect = Rect::new(0.0, 0.0, 48.0, 48.0);
const TARGET_RECT_ADAPTIVE: Rect = Rect::new(8.0, 8.0, 32.0, 32.0);

/// Densities emitted for launcher icons, in fixed output order. The first
/// entry is the master render every other density derives from.
pub const LAUNCHER_DENSITIES: [Density; 5] = [
    Density::Xxxhdpi,
    Density::Xxhdpi,
    Density::Xhdpi,
    Density::Hdpi,
    Density::Mdpi,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundShape {
    None,
    Square,
    Circle,
    Vrect,
    Hrect,
}

impl BackgroundShape {
    /// Where foreground content lands on the 48dp canvas for each shape.
    pub fn target_rect(self) -> Rect {
        match self {
            Self::None => Rect::new(3.0, 3.0, 42.0, 42.0),
            Self::Circle => Rect::new(2.0, 2.0, 44.0, 44.0),
            Self::Square => Rect::new(5.0, 5.0, 38.0, 38.0),
            Self::Vrect => Rect::new(8.0, 2.0, 32.0, 44.0),
            Self::Hrect => Rect::new(2.0, 8.0, 44.0, 32.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconEffect {
    None,
    Elevate,
    Shadow,
    Score,
}

/// The form values a launcher icon is generated from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LauncherIconSpec {
    /// Source-store key of the foreground image, if one is selected yet.
    pub foreground: Option<String>,
    /// Foreground tint; a fully transparent tint keeps the original colors.
    pub fore_color: Color,
    pub back_color: Color,
    /// `false` fits the foreground inside the target rect, `true` crops.
    pub crop: bool,
    pub shape: BackgroundShape,
    pub effect: IconEffect,
    pub name: String,
}

impl Default for LauncherIconSpec {
    fn default() -> Self {
        Self {
            foreground: None,
            fore_color: Color::rgba8(96, 125, 139, 0),
            back_color: Color::rgba8(68, 138, 255, 255),
            crop: false,
            shape: BackgroundShape::Circle,
            effect: IconEffect::None,
            name: "ic_launcher".to_owned(),
        }
    }
}

/// Everything one generate pass produces: archive entries in emission order
/// plus per-density preview surfaces.
#[derive(Debug)]
pub struct GeneratedAssets {
    pub zip_name: String,
    pub entries: Vec<ArchiveEntry>,
    pub previews: Vec<(Density, Surface)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Variant {
    /// Legacy shaped icon.
    Standard,
    /// Edge-to-edge render for store listings.
    FullBleed,
    /// Adaptive-icon background slice.
    AdaptiveBack,
    /// Adaptive-icon foreground slice.
    AdaptiveFore,
}

/// Run the full output pass for `spec`.
#[tracing::instrument(skip(spec, sources), fields(name = %spec.name))]
pub fn generate(spec: &LauncherIconSpec, sources: &SourceStore) -> IconforgeResult<GeneratedAssets> {
    let name = {
        let n = sanitize_resource_name(&spec.name);
        if n.is_empty() { "ic_launcher".to_owned() } else { n }
    };

    let mut entries = Vec::new();
    let mut previews = Vec::new();

    // One master render per variant at the highest density; every lower
    // density is a scaled blit of its master. Geometry is identical across
    // densities, so this keeps proportions pixel-consistent and skips
    // redundant effect recomputation.
    let master_mult = Density::Xxxhdpi.multiplier();
    let legacy_master = render_variant(spec, sources, master_mult, Variant::Standard)?;

    let adaptive_mult = master_mult * ADAPTIVE_ICON_WIDTH / f64::from(ICON_SIZE.w);
    let back_master = render_variant(spec, sources, adaptive_mult, Variant::AdaptiveBack)?;
    let fore_master = render_variant(spec, sources, adaptive_mult, Variant::AdaptiveFore)?;

    for density in LAUNCHER_DENSITIES {
        let mult = density.multiplier();

        let icon = derive_from_master(&legacy_master, ICON_SIZE.scaled_round(mult))?;
        entries.push(ArchiveEntry::png(
            mipmap_path(density, &format!("{name}.png")),
            icon.encode_png()?,
        ));

        let adaptive_size = Size::new(
            (ADAPTIVE_ICON_WIDTH * mult).round() as u32,
            (ADAPTIVE_ICON_WIDTH * mult).round() as u32,
        );
        let back = derive_from_master(&back_master, adaptive_size)?;
        entries.push(ArchiveEntry::png(
            mipmap_path(density, &format!("{name}_adaptive_back.png")),
            back.encode_png()?,
        ));
        let fore = derive_from_master(&fore_master, adaptive_size)?;
        entries.push(ArchiveEntry::png(
            mipmap_path(density, &format!("{name}_adaptive_fore.png")),
            fore.encode_png()?,
        ));

        tracing::debug!(density = %density, w = icon.width(), h = icon.height(), "density output ready");
        previews.push((density, icon));
    }

    let play_store = render_variant(spec, sources, 512.0 / 48.0, Variant::FullBleed)?;
    entries.push(ArchiveEntry::png("play_store_512.png", play_store.encode_png()?));

    let hi_res = render_variant(spec, sources, 1024.0 / 48.0, Variant::FullBleed)?;
    entries.push(ArchiveEntry::png("1024.png", hi_res.encode_png()?));

    entries.push(ArchiveEntry::text(
        anydpi_v26_path(&name),
        adaptive_icon_xml(&name),
    ));

    Ok(GeneratedAssets {
        zip_name: format!("{name}.zip"),
        entries,
        previews,
    })
}

pub fn adaptive_icon_xml(name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<adaptive-icon xmlns:android="http://schemas.android.com/apk/res/android">
  <background android:drawable="@mipmap/{name}_adaptive_back"/>
  <foreground android:drawable="@mipmap/{name}_adaptive_fore"/>
</adaptive-icon>"#
    )
}

fn render_variant(
    spec: &LauncherIconSpec,
    sources: &SourceStore,
    mult: f64,
    variant: Variant,
) -> IconforgeResult<Surface> {
    density::render_at(ICON_SIZE, mult, sources, |m| {
        build_icon_tree(spec, m, variant)
    })
}

fn derive_from_master(master: &Surface, to: Size) -> IconforgeResult<Surface> {
    if master.size() == to {
        return Ok(master.clone());
    }
    let mut out = Surface::new(to)?;
    blit::draw_scaled(&mut out, master, master.size().to_rect(), to.to_rect())?;
    Ok(out)
}

fn build_icon_tree(spec: &LauncherIconSpec, mult: f64, variant: Variant) -> Layer {
    let icon_size = ICON_SIZE.scaled_round(mult);
    let target_rect = match variant {
        Variant::Standard => spec.shape.target_rect(),
        Variant::FullBleed => TARGET_RECT_FULL_BLEED,
        Variant::AdaptiveBack | Variant::AdaptiveFore => TARGET_RECT_ADAPTIVE,
    };
    // A shaped backdrop only exists on the legacy render; the "none" shape
    // drops it and elevation shadows with it.
    let shaped = variant != Variant::Standard || spec.shape != BackgroundShape::None;

    let mut children = Vec::new();

    if variant != Variant::AdaptiveFore && shaped {
        children.push(background_layer(spec, mult, variant));
    }

    if variant != Variant::AdaptiveBack
        && let Some(source) = &spec.foreground
    {
        let mut effects = Vec::new();
        if spec.effect == IconEffect::Shadow && shaped {
            effects.push(Effect::CastShadow);
        }
        if spec.fore_color.a > 0.0 {
            effects.push(Effect::FillColor {
                color: spec.fore_color,
                opacity: 1.0,
            });
        }
        if matches!(spec.effect, IconEffect::Elevate | IconEffect::Shadow) && shaped {
            effects.push(Effect::OuterShadow {
                color: Color::rgba(0.0, 0.0, 0.0, 0.2),
                blur: 0.0,
                translate_x: 0.0,
                translate_y: 0.25 * mult,
            });
            effects.push(Effect::OuterShadow {
                color: Color::rgba(0.0, 0.0, 0.0, 0.2),
                blur: 1.0 * mult,
                translate_x: 0.0,
                translate_y: 1.0 * mult,
            });
        }

        let mut fore = Layer::leaf(Draw::Image {
            source: source.clone(),
            dst: target_rect.scaled(mult),
            fit: if spec.crop {
                Fit::CenterCrop
            } else {
                Fit::CenterInside
            },
        })
        .with_effects(effects);
        if variant == Variant::Standard && spec.shape == BackgroundShape::None {
            // With no backdrop the foreground itself clips later layers.
            fore = fore.masked();
        }
        children.push(fore);
    }

    if spec.effect == IconEffect::Score && variant != Variant::AdaptiveBack {
        children.push(Layer::leaf(Draw::Fill {
            color: Color::rgba(0.0, 0.0, 0.0, 0.1),
            rect: Some(Rect::new(
                0.0,
                0.0,
                f64::from(icon_size.w),
                f64::from(icon_size.h) / 2.0,
            )),
        }));
    }

    let mut effects = vec![
        Effect::InnerShadow {
            color: Color::rgba(1.0, 1.0, 1.0, 0.2),
            blur: 0.0,
            translate_x: 0.0,
            translate_y: 0.25 * mult,
        },
        Effect::InnerShadow {
            color: Color::rgba(0.0, 0.0, 0.0, 0.2),
            blur: 0.0,
            translate_x: 0.0,
            translate_y: -0.25 * mult,
        },
        Effect::OuterShadow {
            color: Color::rgba(0.0, 0.0, 0.0, 0.3),
            blur: 0.7 * mult,
            translate_x: 0.0,
            translate_y: 0.7 * mult,
        },
        Effect::FillRadialGradient {
            center_x: 0.0,
            center_y: 0.0,
            radius: f64::from(icon_size.w),
            colors: vec![
                ColorStop {
                    offset: 0.0,
                    color: Color::rgba(1.0, 1.0, 1.0, 0.1),
                },
                ColorStop {
                    offset: 1.0,
                    color: Color::rgba(1.0, 1.0, 1.0, 0.0),
                },
            ],
            opacity: 1.0,
        },
    ];
    if variant != Variant::Standard {
        // Store and adaptive slices are composited by the platform; only the
        // sheen fills stay.
        effects.retain(|e| e.class() == crate::effect::EffectClass::Fill);
    }

    Layer::group(children).with_effects(effects)
}

fn background_layer(spec: &LauncherIconSpec, mult: f64, variant: Variant) -> Layer {
    let color = spec.back_color.with_alpha(1.0);

    let draw = match variant {
        Variant::FullBleed | Variant::AdaptiveBack | Variant::AdaptiveFore => Draw::Fill {
            color,
            rect: None,
        },
        Variant::Standard => {
            let rect = spec.shape.target_rect();
            match spec.shape {
                BackgroundShape::Circle => Draw::Shape {
                    shape: Shape::Circle {
                        cx: (rect.x + rect.w / 2.0) * mult,
                        cy: (rect.y + rect.h / 2.0) * mult,
                        radius: (rect.w / 2.0) * mult,
                    },
                    color,
                },
                BackgroundShape::Square | BackgroundShape::Vrect | BackgroundShape::Hrect => {
                    Draw::Shape {
                        shape: Shape::RoundRect {
                            rect: rect.scaled(mult),
                            radius: 3.0 * mult,
                        },
                        color,
                    }
                }
                BackgroundShape::None => Draw::Fill {
                    color: Color::TRANSPARENT,
                    rect: None,
                },
            }
        }
    };

    Layer::leaf(draw).masked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_has_circle_shape_and_launcher_name() {
        let spec = LauncherIconSpec::default();
        assert_eq!(spec.shape, BackgroundShape::Circle);
        assert_eq!(spec.name, "ic_launcher");
        assert!(spec.fore_color.is_transparent());
    }

    #[test]
    fn adaptive_xml_matches_descriptor_format() {
        let xml = adaptive_icon_xml("my_icon");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<background android:drawable=\"@mipmap/my_icon_adaptive_back\"/>"));
        assert!(xml.contains("<foreground android:drawable=\"@mipmap/my_icon_adaptive_fore\"/>"));
        assert!(xml.ends_with("</adaptive-icon>"));
    }

    #[test]
    fn standard_tree_masks_background_before_foreground() {
        let spec = LauncherIconSpec {
            foreground: Some("fg".to_owned()),
            ..Default::default()
        };
        let tree = build_icon_tree(&spec, 1.0, Variant::Standard);
        let Layer::Group { children, effects, .. } = tree else {
            panic!("expected group root");
        };
        assert_eq!(children.len(), 2);
        assert!(children[0].mask());
        assert!(!children[1].mask());
        // Full legacy effect stack on the root.
        assert_eq!(effects.len(), 4);
    }

    #[test]
    fn adaptive_variants_split_layers_and_keep_only_fills() {
        let spec = LauncherIconSpec {
            foreground: Some("fg".to_owned()),
            ..Default::default()
        };

        let back = build_icon_tree(&spec, 1.0, Variant::AdaptiveBack);
        let Layer::Group { children, effects, .. } = back else {
            panic!("expected group root");
        };
        assert_eq!(children.len(), 1);
        assert!(effects.iter().all(|e| e.class() == crate::effect::EffectClass::Fill));

        let fore = build_icon_tree(&spec, 1.0, Variant::AdaptiveFore);
        let Layer::Group { children, .. } = fore else {
            panic!("expected group root");
        };
        assert_eq!(children.len(), 1);
        assert!(matches!(
            &children[0],
            Layer::Leaf {
                draw: Draw::Image { .. },
                ..
            }
        ));
    }

    #[test]
    fn none_shape_drops_background_and_elevation() {
        let spec = LauncherIconSpec {
            foreground: Some("fg".to_owned()),
            shape: BackgroundShape::None,
            effect: IconEffect::Elevate,
            ..Default::default()
        };
        let tree = build_icon_tree(&spec, 1.0, Variant::Standard);
        let Layer::Group { children, .. } = tree else {
            panic!("expected group root");
        };
        assert_eq!(children.len(), 1);
        assert!(children[0].mask());
        assert!(children[0].effects().is_empty());
    }

    #[test]
    fn shadow_effect_adds_cast_then_outer_shadows() {
        let spec = LauncherIconSpec {
            foreground: Some("fg".to_owned()),
            effect: IconEffect::Shadow,
            fore_color: Color::rgba8(96, 125, 139, 128),
            ..Default::default()
        };
        let tree = build_icon_tree(&spec, 4.0, Variant::Standard);
        let Layer::Group { children, .. } = tree else {
            panic!("expected group root");
        };
        let fore_effects = children[1].effects();
        assert!(matches!(fore_effects[0], Effect::CastShadow));
        assert!(matches!(fore_effects[1], Effect::FillColor { .. }));
        assert!(matches!(fore_effects[2], Effect::OuterShadow { .. }));
        assert!(matches!(fore_effects[3], Effect::OuterShadow { blur, .. } if blur == 4.0));
    }
}
