use serde::{Deserialize, Serialize};

use crate::density::Density;

/// One entry handed to the archive packager: either PNG-encoded pixels or a
/// verbatim text file (e.g. a generated XML descriptor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryData {
    Png(Vec<u8>),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Path inside the archive, e.g. `res/mipmap-xhdpi/ic_launcher.png`.
    pub path: String,
    pub data: EntryData,
}

impl ArchiveEntry {
    pub fn png(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data: EntryData::Png(bytes),
        }
    }

    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: EntryData::Text(content.into()),
        }
    }
}

/// `res/mipmap-<density>/<file>` path for a density-qualified resource.
pub fn mipmap_path(density: Density, file: &str) -> String {
    format!("res/mipmap-{density}/{file}")
}

/// `res/mipmap-anydpi-v26/<name>.xml` path for a density-independent
/// descriptor.
pub fn anydpi_v26_path(name: &str) -> String {
    format!("res/mipmap-anydpi-v26/{name}.xml")
}

/// Lowercase, collapse whitespace/dashes/dots to underscores, and strip
/// everything else that is not a word character.
pub fn sanitize_resource_name(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            c if c.is_whitespace() || c == '-' || c == '.' => '_',
            c => c,
        })
        .filter(|&c| c.is_ascii_alphanumeric() || c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mipmap_paths_follow_convention() {
        assert_eq!(
            mipmap_path(Density::Xhdpi, "ic_launcher.png"),
            "res/mipmap-xhdpi/ic_launcher.png"
        );
        assert_eq!(
            anydpi_v26_path("ic_launcher"),
            "res/mipmap-anydpi-v26/ic_launcher.xml"
        );
    }

    #[test]
    fn sanitize_matches_resource_rules() {
        assert_eq!(sanitize_resource_name("My Icon-v2.final"), "my_icon_v2_final");
        assert_eq!(sanitize_resource_name("ic_launcher"), "ic_launcher");
        assert_eq!(sanitize_resource_name("weird!chars#"), "weirdchars");
    }
}
