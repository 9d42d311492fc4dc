use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    color::Color,
    effect::Effect,
    error::{IconforgeError, IconforgeResult},
    geom::Rect,
    surface::Surface,
};

/// Decoded source imagery, keyed by caller-chosen stable names. Read-only
/// during a render pass; `Image` draws reference entries by key.
pub type SourceStore = BTreeMap<String, Arc<Surface>>;

/// A node in the compositing tree: either a leaf that renders pixels or a
/// group that composites its children. There is no "empty" layer kind;
/// conditional layers are omitted from `children` by the builder.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Layer {
    Leaf {
        draw: Draw,
        #[serde(default)]
        effects: Vec<Effect>,
        #[serde(default)]
        mask: bool,
    },
    Group {
        children: Vec<Layer>,
        #[serde(default)]
        effects: Vec<Effect>,
        #[serde(default)]
        mask: bool,
    },
}

impl Layer {
    pub fn leaf(draw: Draw) -> Self {
        Self::Leaf {
            draw,
            effects: Vec::new(),
            mask: false,
        }
    }

    pub fn group(children: Vec<Layer>) -> Self {
        Self::Group {
            children,
            effects: Vec::new(),
            mask: false,
        }
    }

    pub fn with_effects(mut self, new_effects: Vec<Effect>) -> Self {
        match &mut self {
            Self::Leaf { effects, .. } | Self::Group { effects, .. } => *effects = new_effects,
        }
        self
    }

    /// Mark this layer as a mask: siblings drawn after it composite only
    /// within the alpha footprint accumulated so far in the group.
    pub fn masked(mut self) -> Self {
        match &mut self {
            Self::Leaf { mask, .. } | Self::Group { mask, .. } => *mask = true,
        }
        self
    }

    pub fn mask(&self) -> bool {
        match self {
            Self::Leaf { mask, .. } | Self::Group { mask, .. } => *mask,
        }
    }

    pub fn effects(&self) -> &[Effect] {
        match self {
            Self::Leaf { effects, .. } | Self::Group { effects, .. } => effects,
        }
    }
}

/// What a leaf renders. Geometry is in final (density-premultiplied) pixel
/// space.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Draw {
    /// Fill a vector shape with a flat color.
    Shape { shape: Shape, color: Color },

    /// Scale a named source image into `dst` with an aspect-fit policy.
    Image {
        source: String,
        dst: Rect,
        #[serde(default)]
        fit: Fit,
    },

    /// Flat fill of the whole canvas, or of `rect` when given.
    Fill {
        color: Color,
        #[serde(default)]
        rect: Option<Rect>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fit {
    /// Scale to fit entirely inside the target rect, centered.
    #[default]
    CenterInside,
    /// Scale to cover the target rect, cropping the overflow.
    CenterCrop,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum Shape {
    Rect { rect: Rect },
    RoundRect { rect: Rect, radius: f64 },
    Circle { cx: f64, cy: f64, radius: f64 },
    /// SVG path data, e.g. `"M10,10 L54,10 L54,54 Z"`.
    Path { d: String },
}

impl Shape {
    pub fn to_path(&self) -> IconforgeResult<kurbo::BezPath> {
        use kurbo::Shape as _;

        match self {
            Self::Rect { rect } => Ok(kurbo::Rect::new(
                rect.x,
                rect.y,
                rect.x + rect.w,
                rect.y + rect.h,
            )
            .to_path(0.1)),
            Self::RoundRect { rect, radius } => Ok(kurbo::RoundedRect::new(
                rect.x,
                rect.y,
                rect.x + rect.w,
                rect.y + rect.h,
                *radius,
            )
            .to_path(0.1)),
            Self::Circle { cx, cy, radius } => {
                Ok(kurbo::Circle::new((*cx, *cy), *radius).to_path(0.1))
            }
            Self::Path { d } => kurbo::BezPath::from_svg(d)
                .map_err(|e| IconforgeError::validation(format!("bad path data: {e}"))),
        }
    }
}
