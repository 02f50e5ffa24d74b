//! Closed set of operation categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Functional area an operation belongs to.
///
/// Mirrors the scripting API's object hierarchy: the application itself,
/// projects, timelines (and their items), the media pool, color grading,
/// rendering, Fusion compositions and the still gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Core,
    Project,
    Timeline,
    Media,
    Color,
    Delivery,
    Fusion,
    Gallery,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 8] = [
        Category::Core,
        Category::Project,
        Category::Timeline,
        Category::Media,
        Category::Color,
        Category::Delivery,
        Category::Fusion,
        Category::Gallery,
    ];

    /// Returns the canonical lowercase tag used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Core => "core",
            Category::Project => "project",
            Category::Timeline => "timeline",
            Category::Media => "media",
            Category::Color => "color",
            Category::Delivery => "delivery",
            Category::Fusion => "fusion",
            Category::Gallery => "gallery",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the declared category tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid category: {0:?} (expected one of core, project, timeline, media, color, delivery, fusion, gallery)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
