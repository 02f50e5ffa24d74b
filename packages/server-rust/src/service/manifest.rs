//! Declarative operation manifests.
//!
//! A manifest lists operations as data (name, category, description and
//! parameters) so a registry can be populated without the backend that
//! implements them. The CLI uses this to inspect profiles offline; an
//! embedding binary can bind real handlers per entry.
//!
//! ```json
//! { "operations": [
//!     { "name": "add_marker", "category": "timeline",
//!       "description": "Add a marker at a frame",
//!       "parameters": { "frame": { "type": "integer" },
//!                       "color": { "type": "string", "default": "Blue" } } }
//! ] }
//! ```

use std::path::Path;
use std::sync::Arc;

use resolve_mcp_core::ParameterSchema;
use serde::{Deserialize, Serialize};

use super::handler::{OperationHandler, UnboundHandler};
use super::operation::RegistryError;
use super::registry::OperationRegistry;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Register(#[from] RegistryError),
}

/// One operation declaration. The category stays a string here so an
/// undeclared tag is reported by the registry with the operation's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterSchema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationManifest {
    pub operations: Vec<ManifestEntry>,
}

impl OperationManifest {
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed JSON or parameter entries.
    pub fn from_json_str(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read, otherwise the
    /// errors of [`OperationManifest::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let manifest = Self::from_json_str(&raw)?;
        tracing::debug!(path = %path.display(), operations = manifest.operations.len(), "loaded manifest");
        Ok(manifest)
    }

    /// Registers every entry with a handler chosen by `bind`, in manifest order.
    ///
    /// Stops at the first registration failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] (duplicate, bad category, sealed).
    pub fn register_with<F>(&self, registry: &OperationRegistry, bind: F) -> Result<usize, ManifestError>
    where
        F: Fn(&ManifestEntry) -> Arc<dyn OperationHandler>,
    {
        for entry in &self.operations {
            registry.register(
                entry.name.clone(),
                &entry.category,
                entry.description.clone(),
                entry.parameters.clone(),
                bind(entry),
            )?;
        }
        tracing::info!(operations = self.operations.len(), "registered manifest operations");
        Ok(self.operations.len())
    }

    /// Registers every entry as metadata only; calling one fails with an
    /// execution error.
    ///
    /// # Errors
    ///
    /// See [`OperationManifest::register_with`].
    pub fn register_unbound(&self, registry: &OperationRegistry) -> Result<usize, ManifestError> {
        self.register_with(registry, |entry| {
            Arc::new(UnboundHandler {
                operation: entry.name.clone(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
