//! Exposure controller: owns the current configuration and resolution.
//!
//! Readers take one immutable [`ExposureSnapshot`] per call and use it for
//! every admission decision of that call. Profile switches and reloads build a
//! new snapshot and swap it in atomically, so a call never sees a mix of two
//! profiles.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use resolve_mcp_core::{ExposureMode, ProfileSummary, ProxyConfig, ResolutionResult};

use super::operation::ProfileError;
use super::registry::OperationRegistry;
use super::resolver::{resolve, unknown_tool_references};

// ---------------------------------------------------------------------------
// ExposureSnapshot
// ---------------------------------------------------------------------------

/// Immutable pairing of a configuration and the resolution computed from it.
#[derive(Debug, Clone)]
pub struct ExposureSnapshot {
    pub config: Arc<ProxyConfig>,
    pub result: ResolutionResult,
}

impl ExposureSnapshot {
    /// The exposure mode in force for this snapshot.
    ///
    /// `auto` becomes discovery exactly when the resolution was truncated.
    #[must_use]
    pub fn effective_mode(&self) -> ExposureMode {
        match self.config.exposure {
            ExposureMode::Auto if self.result.truncated => ExposureMode::Discovery,
            ExposureMode::Auto => ExposureMode::Direct,
            mode => mode,
        }
    }

    /// Profile name reported in "not enabled" errors.
    #[must_use]
    pub fn profile_label(&self) -> &str {
        self.result.profile.as_deref().unwrap_or("(proxy disabled)")
    }
}

// ---------------------------------------------------------------------------
// ExposureController
// ---------------------------------------------------------------------------

/// Holds the live [`ExposureSnapshot`] behind an `ArcSwap`.
///
/// Reads are lock-free. Writers serialize on `write_lock` so two concurrent
/// switches cannot interleave their resolve and store steps.
pub struct ExposureController {
    registry: Arc<OperationRegistry>,
    current: ArcSwap<ExposureSnapshot>,
    write_lock: Mutex<()>,
}

impl ExposureController {
    /// Resolves `config` against `registry` and installs the result.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownProfile`] if the active profile is not
    /// configured (and the proxy is enabled).
    pub fn new(registry: Arc<OperationRegistry>, config: ProxyConfig) -> Result<Self, ProfileError> {
        let snapshot = build_snapshot(&registry, Arc::new(config))?;
        Ok(Self {
            registry,
            current: ArcSwap::from_pointee(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    /// The snapshot in force right now.
    #[must_use]
    pub fn current(&self) -> Arc<ExposureSnapshot> {
        self.current.load_full()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Makes `name` the active profile and re-resolves.
    ///
    /// On error the previous snapshot stays in force.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownProfile`] if `name` is not configured.
    pub fn switch_profile(&self, name: &str) -> Result<Arc<ExposureSnapshot>, ProfileError> {
        let _guard = self.write_lock.lock();
        let current = self.current.load_full();
        if !current.config.profiles.contains_key(name) {
            return Err(ProfileError::UnknownProfile {
                name: name.to_string(),
                available: current.config.profile_names(),
            });
        }

        let config = ProxyConfig {
            active_profile: name.to_string(),
            ..(*current.config).clone()
        };
        let snapshot = Arc::new(build_snapshot(&self.registry, Arc::new(config))?);
        self.current.store(Arc::clone(&snapshot));

        tracing::info!(
            from = %current.config.active_profile,
            to = %name,
            exposed = snapshot.result.len(),
            "switched active profile"
        );
        Ok(snapshot)
    }

    /// Replaces the whole configuration and re-resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownProfile`] if the new active profile is
    /// not configured. The previous snapshot stays in force.
    pub fn reload(&self, config: ProxyConfig) -> Result<Arc<ExposureSnapshot>, ProfileError> {
        let _guard = self.write_lock.lock();
        let snapshot = Arc::new(build_snapshot(&self.registry, Arc::new(config))?);
        self.current.store(Arc::clone(&snapshot));
        tracing::info!(
            profile = snapshot.profile_label(),
            exposed = snapshot.result.len(),
            "reloaded proxy config"
        );
        Ok(snapshot)
    }

    /// Configured profiles with their declared estimates, in name order.
    #[must_use]
    pub fn list_profiles(&self) -> Vec<ProfileSummary> {
        list_profiles(&self.current().config)
    }
}

/// Profile listing for a configuration, in name order.
#[must_use]
pub fn list_profiles(config: &ProxyConfig) -> Vec<ProfileSummary> {
    config
        .profiles
        .iter()
        .map(|(name, profile)| ProfileSummary {
            name: name.clone(),
            description: profile.description.clone(),
            estimated_tools: profile.estimated_tools,
            active: *name == config.active_profile,
        })
        .collect()
}

fn build_snapshot(
    registry: &OperationRegistry,
    config: Arc<ProxyConfig>,
) -> Result<ExposureSnapshot, ProfileError> {
    let ops = registry.all();
    let result = resolve(&ops, &config)?;

    if config.proxy_enabled {
        if let Some(profile) = config.profiles.get(&config.active_profile) {
            let unknown = unknown_tool_references(&ops, profile);
            if !unknown.is_empty() {
                tracing::warn!(
                    profile = %config.active_profile,
                    unknown = ?unknown,
                    "profile names operations that are not registered"
                );
            }
        }
    }
    if result.truncated {
        tracing::warn!(
            profile = result.profile.as_deref().unwrap_or_default(),
            max_tools = result.max_tools.unwrap_or_default(),
            dropped = result.dropped_count,
            "exposed operation set truncated in registration order"
        );
    }

    Ok(ExposureSnapshot { config, result })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
