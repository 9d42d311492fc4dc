use serde::{Deserialize, Serialize};

use crate::{
    error::IconforgeResult,
    geom::Size,
    layer::{Layer, SourceStore},
    renderer::draw_layers,
    surface::Surface,
};

/// A named output-resolution tier with a fixed scale multiplier relative to
/// the 1.0 (`mdpi`) baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Ldpi,
    Mdpi,
    Tvdpi,
    Hdpi,
    Xhdpi,
    Xxhdpi,
    Xxxhdpi,
}

impl Density {
    pub const ALL: [Self; 7] = [
        Self::Ldpi,
        Self::Mdpi,
        Self::Tvdpi,
        Self::Hdpi,
        Self::Xhdpi,
        Self::Xxhdpi,
        Self::Xxxhdpi,
    ];

    pub fn multiplier(self) -> f64 {
        match self {
            Self::Ldpi => 0.75,
            Self::Mdpi => 1.0,
            Self::Tvdpi => 1.33125,
            Self::Hdpi => 1.5,
            Self::Xhdpi => 2.0,
            Self::Xxhdpi => 3.0,
            Self::Xxxhdpi => 4.0,
        }
    }

    pub fn dpi(self) -> u32 {
        match self {
            Self::Ldpi => 120,
            Self::Mdpi => 160,
            Self::Tvdpi => 213,
            Self::Hdpi => 240,
            Self::Xhdpi => 320,
            Self::Xxhdpi => 480,
            Self::Xxxhdpi => 640,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ldpi => "ldpi",
            Self::Mdpi => "mdpi",
            Self::Tvdpi => "tvdpi",
            Self::Hdpi => "hdpi",
            Self::Xhdpi => "xhdpi",
            Self::Xxhdpi => "xxhdpi",
            Self::Xxxhdpi => "xxxhdpi",
        }
    }
}

impl std::fmt::Display for Density {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Density {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| format!("unknown density \"{s}\""))
    }
}

/// Render one output: round the base size by `mult`, build the layer tree
/// with the multiplier (geometry premultiplied by the builder), and run the
/// layer renderer.
pub fn render_at(
    base: Size,
    mult: f64,
    sources: &SourceStore,
    build: impl FnOnce(f64) -> Layer,
) -> IconforgeResult<Surface> {
    let size = base.scaled_round(mult);
    let mut out = Surface::new(size)?;
    draw_layers(&mut out, size, &build(mult), sources)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_table_is_fixed() {
        assert_eq!(Density::Mdpi.multiplier(), 1.0);
        assert_eq!(Density::Hdpi.multiplier(), 1.5);
        assert_eq!(Density::Xhdpi.multiplier(), 2.0);
        assert_eq!(Density::Xxxhdpi.multiplier(), 4.0);
        assert_eq!(Density::Xxxhdpi.dpi(), 640);
    }

    #[test]
    fn parse_and_display_roundtrip() {
        for d in Density::ALL {
            assert_eq!(d.name().parse::<Density>().unwrap(), d);
        }
        assert!("webdpi".parse::<Density>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let s = serde_json::to_string(&Density::Xxhdpi).unwrap();
        assert_eq!(s, "\"xxhdpi\"");
    }
}
