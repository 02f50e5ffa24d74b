//! Profile resolution: which operations are directly exposed.
//!
//! `resolve` is a pure function of a registry snapshot and a configuration.
//! It performs no I/O and involves no randomness, so repeated calls with the
//! same inputs return identical results.
//!
//! Truncation keeps the first `maxTools` candidates in **registration order**.
//! This is deliberately simple and reproducible, but it silently hides
//! operations: anything that consumes a truncated result should warn.

use std::collections::HashSet;

use resolve_mcp_core::{ProfileDefinition, ProxyConfig, ResolutionResult};

use super::operation::ProfileError;
use super::registry::RegistrySnapshot;

/// Computes the exposed operation set.
///
/// Steps, each consuming the previous output:
/// 1. proxy disabled: every operation, untruncated
/// 2. look up the active profile (no fallback)
/// 3. category filter (`"all"` keeps everything)
/// 4. intersect with the `tools` allow-list, if any
/// 5. subtract `excludeTools`
/// 6. truncate to the effective `maxTools`
///
/// # Errors
///
/// Returns [`ProfileError::UnknownProfile`] if `config.active_profile` is not
/// one of `config.profiles`.
pub fn resolve(
    registry: &RegistrySnapshot,
    config: &ProxyConfig,
) -> Result<ResolutionResult, ProfileError> {
    if !config.proxy_enabled {
        return Ok(ResolutionResult {
            profile: None,
            names: registry.names().map(str::to_string).collect(),
            truncated: false,
            dropped_count: 0,
            max_tools: None,
        });
    }

    let profile = config
        .profiles
        .get(&config.active_profile)
        .ok_or_else(|| ProfileError::UnknownProfile {
            name: config.active_profile.clone(),
            available: config.profile_names(),
        })?;

    let allow: Option<HashSet<&str>> = profile
        .tools
        .as_ref()
        .map(|tools| tools.iter().map(String::as_str).collect());
    let deny: HashSet<&str> = profile
        .exclude_tools
        .iter()
        .flatten()
        .map(String::as_str)
        .collect();

    let mut names: Vec<String> = registry
        .iter()
        .filter(|op| profile.categories.contains(op.category()))
        .filter(|op| allow.as_ref().map_or(true, |a| a.contains(op.name())))
        .filter(|op| !deny.contains(op.name()))
        .map(|op| op.name().to_string())
        .collect();

    let max_tools = config.effective_max_tools(profile);
    let dropped_count = names.len().saturating_sub(max_tools);
    names.truncate(max_tools);

    Ok(ResolutionResult {
        profile: Some(config.active_profile.clone()),
        names,
        truncated: dropped_count > 0,
        dropped_count,
        max_tools: Some(max_tools),
    })
}

/// Allow-list and exclude-list entries that name no registered operation.
///
/// These are not errors (allow-lists are meant to be conservative), but they
/// usually indicate a typo worth logging.
#[must_use]
pub fn unknown_tool_references<'a>(
    registry: &RegistrySnapshot,
    profile: &'a ProfileDefinition,
) -> Vec<&'a str> {
    let known: HashSet<&str> = registry.names().collect();
    profile
        .tools
        .iter()
        .chain(profile.exclude_tools.iter())
        .flatten()
        .map(String::as_str)
        .filter(|name| !known.contains(name))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
