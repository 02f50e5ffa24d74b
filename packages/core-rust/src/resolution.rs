use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::schema::ParameterSchema;

/// Ordered set of operation names currently exposed to the client.
///
/// Derived from the registry and the active profile; never persisted. When the
/// candidate set exceeds the ceiling it is cut down in registration order and
/// `truncated` is set. Callers should surface that as a warning, since it
/// silently hides operations a user may expect to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Profile the result was computed from. `None` when the proxy is disabled.
    pub profile: Option<String>,
    /// Exposed operation names in registration order.
    pub names: Vec<String>,
    /// Whether operations were dropped to respect the ceiling.
    pub truncated: bool,
    /// Number of candidate operations dropped by truncation.
    pub dropped_count: usize,
    /// Ceiling that was applied. `None` when the proxy is disabled.
    pub max_tools: Option<usize>,
}

impl ResolutionResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Public description of an operation, as returned by `search_operations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInfo {
    pub name: String,
    pub category: Category,
    pub description: String,
    pub parameter_schema: ParameterSchema,
}

/// One row of the profile listing command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub name: String,
    pub description: Option<String>,
    pub estimated_tools: Option<usize>,
    pub active: bool,
}
