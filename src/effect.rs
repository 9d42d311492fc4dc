use serde::{Deserialize, Serialize};

use crate::color::Color;

/// A gradient color stop; `offset` is in `0..=1` along the gradient axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Color,
}

/// One visual effect in a layer's effect list.
///
/// Effects are partitioned by [`EffectClass`] and applied outer, then fill,
/// then inner, regardless of their order in the list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "kebab-case")]
pub enum Effect {
    /// Blurred, colorized copy of the silhouette composited beneath the
    /// source. The color's own alpha acts as the shadow opacity.
    OuterShadow {
        #[serde(default = "default_shadow_color")]
        color: Color,
        #[serde(default)]
        blur: f64,
        #[serde(default)]
        translate_x: f64,
        #[serde(default)]
        translate_y: f64,
    },

    /// Long diagonal shadow synthesized by sweeping the silhouette and
    /// fading it out along the diagonal.
    CastShadow,

    /// Shadow confined to the inside of the existing alpha shape.
    InnerShadow {
        #[serde(default = "default_shadow_color")]
        color: Color,
        #[serde(default)]
        blur: f64,
        #[serde(default)]
        translate_x: f64,
        #[serde(default)]
        translate_y: f64,
    },

    /// Recognized inner-class tag that composites nothing; generators draw
    /// score markings as their own layer instead.
    Score,

    /// Flat recolor of the source's alpha footprint.
    FillColor {
        color: Color,
        #[serde(default = "default_opacity")]
        opacity: f64,
    },

    #[serde(rename = "fill-lineargradient")]
    FillLinearGradient {
        from_x: f64,
        from_y: f64,
        to_x: f64,
        to_y: f64,
        colors: Vec<ColorStop>,
        #[serde(default = "default_opacity")]
        opacity: f64,
    },

    #[serde(rename = "fill-radialgradient")]
    FillRadialGradient {
        center_x: f64,
        center_y: f64,
        radius: f64,
        colors: Vec<ColorStop>,
        #[serde(default = "default_opacity")]
        opacity: f64,
    },
}

fn default_shadow_color() -> Color {
    Color::BLACK
}

fn default_opacity() -> f64 {
    1.0
}

/// The fixed application phase of an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectClass {
    Outer,
    Fill,
    Inner,
}

impl Effect {
    pub fn class(&self) -> EffectClass {
        match self {
            Self::OuterShadow { .. } | Self::CastShadow => EffectClass::Outer,
            Self::FillColor { .. }
            | Self::FillLinearGradient { .. }
            | Self::FillRadialGradient { .. } => EffectClass::Fill,
            Self::InnerShadow { .. } | Self::Score => EffectClass::Inner,
        }
    }

    /// Blur radius in already-scaled pixel units (zero for non-blur kinds).
    pub fn blur(&self) -> f64 {
        match self {
            Self::OuterShadow { blur, .. } | Self::InnerShadow { blur, .. } => blur.max(0.0),
            _ => 0.0,
        }
    }

    /// The phase-wide opacity a fill effect contributes (1.0 for all other
    /// kinds).
    pub fn fill_opacity(&self) -> f64 {
        match self {
            Self::FillColor { opacity, .. }
            | Self::FillLinearGradient { opacity, .. }
            | Self::FillRadialGradient { opacity, .. } => opacity.clamp(0.0, 1.0),
            Self::OuterShadow { .. } | Self::CastShadow | Self::InnerShadow { .. } | Self::Score => {
                1.0
            }
        }
    }

    pub fn translate(&self) -> (f64, f64) {
        match self {
            Self::OuterShadow {
                translate_x,
                translate_y,
                ..
            }
            | Self::InnerShadow {
                translate_x,
                translate_y,
                ..
            } => (*translate_x, *translate_y),
            _ => (0.0, 0.0),
        }
    }
}

/// Sample a stop list at `t` in `0..=1`, interpolating between neighbouring
/// stops in straight-alpha space. Stops are expected in ascending offset
/// order, as gradient call sites build them.
pub fn sample_stops(stops: &[ColorStop], t: f64) -> Color {
    let Some(first) = stops.first() else {
        return Color::TRANSPARENT;
    };
    let t = t.clamp(0.0, 1.0);
    if t <= first.offset {
        return first.color;
    }

    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= 0.0 {
                return b.color;
            }
            return a.color.lerp(b.color, (t - a.offset) / span);
        }
    }
    stops.last().map(|s| s.color).unwrap_or(Color::TRANSPARENT)
}
