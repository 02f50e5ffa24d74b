//! Call, response and error types shared by the gateways and the router.

use resolve_mcp_core::{FieldIssue, UnknownCategory};
use serde_json::{json, Value};

/// Names of the two discovery tools.
pub mod tool_names {
    pub const SEARCH_OPERATIONS: &str = "search_operations";
    pub const EXECUTE_OPERATION: &str = "execute_operation";
}

/// A tool call as received from the client, before routing.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub call_id: u64,
    pub tool: String,
    pub arguments: Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(call_id: u64, tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id,
            tool: tool.into(),
            arguments,
        }
    }
}

/// A tool as advertised to the client in `tools/list`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Successful result of a routed tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub call_id: u64,
    pub content: Value,
}

/// Per-call failures. Reported to the caller for that call only; none of them
/// affects the gateway's ability to serve later calls.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },
    #[error("operation {name} is not enabled in profile {profile}")]
    NotEnabled { name: String, profile: String },
    #[error("invalid parameters for {operation}: {}", format_issues(.issues))]
    InvalidParameters {
        operation: String,
        issues: Vec<FieldIssue>,
    },
    #[error("operation {operation} failed: {message}")]
    Execution { operation: String, message: String },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl OperationError {
    /// Stable machine-readable error code.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            OperationError::UnknownOperation { .. } => "unknown_operation",
            OperationError::NotEnabled { .. } => "operation_not_enabled",
            OperationError::InvalidParameters { .. } => "invalid_parameters",
            OperationError::Execution { .. } => "operation_execution",
            OperationError::Internal(_) => "internal",
        }
    }

    /// Names of the offending fields, for `InvalidParameters`.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            OperationError::InvalidParameters { issues, .. } => {
                issues.iter().map(|i| i.field.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Uniform structured shape used by every client-facing error.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let OperationError::InvalidParameters { issues, .. } = self {
            body["fields"] = issues
                .iter()
                .map(|i| json!({ "field": i.field, "problem": i.to_string() }))
                .collect();
        }
        body
    }
}

/// Registry population failures. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate operation: {name}")]
    Duplicate { name: String },
    #[error("operation {name}: {source}")]
    InvalidCategory {
        name: String,
        #[source]
        source: UnknownCategory,
    },
    #[error("registry is sealed; cannot register {name} after startup")]
    Sealed { name: String },
}

/// Profile resolution failures. Fatal at startup; rejected on profile switch.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("unknown profile: {name} (available: {})", .available.join(", "))]
    UnknownProfile { name: String, available: Vec<String> },
}

#[cfg(test)]
mod tests {
    use resolve_mcp_core::IssueKind;

    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        let err = OperationError::NotEnabled {
            name: "delete_project".into(),
            profile: "editing".into(),
        };
        assert_eq!(err.kind(), "operation_not_enabled");
        assert_eq!(
            err.to_string(),
            "operation delete_project is not enabled in profile editing"
        );
    }

    #[test]
    fn invalid_parameters_names_fields() {
        let err = OperationError::InvalidParameters {
            operation: "set_album_label".into(),
            issues: vec![FieldIssue {
                field: "label".into(),
                kind: IssueKind::Missing,
            }],
        };
        assert_eq!(err.fields(), vec!["label"]);
        assert!(err.to_string().contains("`label`: missing required parameter"));
        let body = err.to_json();
        assert_eq!(body["kind"], "invalid_parameters");
        assert_eq!(body["fields"][0]["field"], "label");
    }

    #[test]
    fn execution_error_keeps_handler_message() {
        let err = OperationError::Execution {
            operation: "start_rendering".into(),
            message: "render queue is empty".into(),
        };
        assert_eq!(err.to_json()["message"], "operation start_rendering failed: render queue is empty");
    }
}
