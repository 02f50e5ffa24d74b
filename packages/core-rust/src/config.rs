//! Proxy configuration: profiles, tool ceiling and exposure strategy.
//!
//! The configuration is read from JSON (camelCase keys) and validated once at
//! load time so resolution never has to deal with unknown categories or a
//! dangling active profile.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Default ceiling on the number of directly exposed operations.
pub const DEFAULT_MAX_TOOLS: usize = 40;

/// Profile selected when a configuration does not name one.
pub const DEFAULT_PROFILE: &str = "editing";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown profile: {name:?} (available: {})", .available.join(", "))]
    UnknownProfile { name: String, available: Vec<String> },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// How operations are presented to the calling client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMode {
    /// Expose the resolved profile's operations one-to-one.
    #[default]
    Direct,
    /// Expose only `search_operations` and `execute_operation`.
    Discovery,
    /// Direct unless the resolved profile had to be truncated.
    Auto,
}

/// Category filter of a profile: either the `"all"` sentinel or an explicit set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelector {
    All,
    Only(BTreeSet<Category>),
}

impl CategorySelector {
    #[must_use]
    pub fn contains(&self, category: Category) -> bool {
        match self {
            CategorySelector::All => true,
            CategorySelector::Only(set) => set.contains(&category),
        }
    }
}

impl Serialize for CategorySelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CategorySelector::All => serializer.serialize_str("all"),
            CategorySelector::Only(set) => set.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CategorySelector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Sentinel(String),
            List(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Sentinel(s) if s.eq_ignore_ascii_case("all") => Ok(CategorySelector::All),
            Raw::Sentinel(s) => Err(serde::de::Error::custom(format!(
                "categories must be \"all\" or a list, got {s:?}"
            ))),
            Raw::List(items) => {
                if items.iter().any(|s| s.eq_ignore_ascii_case("all")) {
                    return Ok(CategorySelector::All);
                }
                items
                    .iter()
                    .map(|s| s.parse::<Category>())
                    .collect::<Result<BTreeSet<_>, _>>()
                    .map(CategorySelector::Only)
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

/// A named selection of operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub categories: CategorySelector,
    /// Explicit allow-list. Restricts the category selection further; never adds to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_tools: Option<Vec<String>>,
    /// Profile-level ceiling. Overrides the global `maxTools` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tools: Option<usize>,
    /// Declared tool-count estimate, shown by the profile listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tools: Option<usize>,
}

impl ProfileDefinition {
    #[must_use]
    pub fn categories(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            description: None,
            categories: CategorySelector::Only(categories.into_iter().collect()),
            tools: None,
            exclude_tools: None,
            max_tools: None,
            estimated_tools: None,
        }
    }

    #[must_use]
    pub fn all() -> Self {
        Self {
            categories: CategorySelector::All,
            ..Self::categories(std::iter::empty())
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn allow(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn exclude(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn estimate(mut self, estimated_tools: usize) -> Self {
        self.estimated_tools = Some(estimated_tools);
        self
    }
}

/// Resolved proxy configuration consumed by the resolver and gateways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyConfig {
    pub proxy_enabled: bool,
    pub max_tools: usize,
    pub active_profile: String,
    pub exposure: ExposureMode,
    pub profiles: BTreeMap<String, ProfileDefinition>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let profiles = BTreeMap::from([
            (
                "minimal".to_string(),
                ProfileDefinition::categories([Category::Core, Category::Project])
                    .describe("Application and project management essentials")
                    .estimate(20),
            ),
            (
                "editing".to_string(),
                ProfileDefinition::categories([
                    Category::Core,
                    Category::Project,
                    Category::Timeline,
                    Category::Media,
                ])
                .describe("Editorial work: timelines, clips and the media pool")
                .exclude(["delete_project"])
                .estimate(40),
            ),
            (
                "color".to_string(),
                ProfileDefinition::categories([Category::Core, Category::Color, Category::Gallery])
                    .describe("Grading, color groups and gallery stills")
                    .estimate(38),
            ),
            (
                "delivery".to_string(),
                ProfileDefinition::categories([Category::Core, Category::Project, Category::Delivery])
                    .describe("Render queue and export settings")
                    .estimate(28),
            ),
            (
                "fusion".to_string(),
                ProfileDefinition::categories([Category::Core, Category::Timeline, Category::Fusion])
                    .describe("Fusion compositions, generators and titles")
                    .estimate(36),
            ),
            (
                "full".to_string(),
                ProfileDefinition::all()
                    .describe("Every registered operation (subject to maxTools)")
                    .estimate(160),
            ),
        ]);

        Self {
            proxy_enabled: true,
            max_tools: DEFAULT_MAX_TOOLS,
            active_profile: DEFAULT_PROFILE.to_string(),
            exposure: ExposureMode::Direct,
            profiles,
        }
    }
}

impl ProxyConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown category
    /// tags, and the errors of [`ProxyConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`ProxyConfig::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            profiles = config.profiles.len(),
            active = %config.active_profile,
            "loaded proxy config"
        );
        Ok(config)
    }

    /// Checks cross-field invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProfile`] if `activeProfile` is not a key
    /// of `profiles`, and [`ConfigError::InvalidValue`] for a zero ceiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tools == 0 {
            return Err(ConfigError::InvalidValue {
                field: "maxTools",
                reason: "must be at least 1".to_string(),
            });
        }
        for (name, profile) in &self.profiles {
            if profile.max_tools == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "profiles.*.maxTools",
                    reason: format!("profile {name:?} must allow at least 1 tool"),
                });
            }
        }
        self.profile(&self.active_profile)?;
        Ok(())
    }

    /// Looks up a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProfile`] listing the configured names.
    pub fn profile(&self, name: &str) -> Result<&ProfileDefinition, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_string(),
                available: self.profile_names(),
            })
    }

    #[must_use]
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Ceiling that applies to `profile`: its own `maxTools` or the global one.
    #[must_use]
    pub fn effective_max_tools(&self, profile: &ProfileDefinition) -> usize {
        profile.max_tools.unwrap_or(self.max_tools)
    }

    /// Returns a copy with a different active profile, validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProfile`] if `name` is not configured.
    pub fn with_active_profile(&self, name: &str) -> Result<Self, ConfigError> {
        self.profile(name)?;
        Ok(Self {
            active_profile: name.to_string(),
            ..self.clone()
        })
    }
}
