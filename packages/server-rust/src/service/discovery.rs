//! Discovery gateway: two fixed tools that reach the whole registry.
//!
//! `search_operations` finds operations by keyword and category;
//! `execute_operation` runs any registered operation by name. Neither consults
//! the active profile, so a client limited to a handful of tools can still
//! reach everything.

use std::sync::Arc;

use resolve_mcp_core::{
    Category, FieldIssue, IssueKind, OperationInfo, ParamSpec, ParamType, ParameterSchema,
};
use serde_json::{json, Map, Value};

use super::gateway::ExecutionGateway;
use super::operation::{tool_names, OperationError, ToolDefinition};

/// Search-then-execute access to every registered operation.
pub struct DiscoveryGateway {
    gateway: Arc<ExecutionGateway>,
    default_limit: usize,
}

impl DiscoveryGateway {
    #[must_use]
    pub fn new(gateway: Arc<ExecutionGateway>, default_limit: usize) -> Self {
        Self {
            gateway,
            default_limit,
        }
    }

    /// Case-insensitive substring search over names and descriptions.
    ///
    /// An empty or whitespace-only query matches every operation, which makes
    /// the category filter usable on its own for browsing. Any other query is
    /// matched as given, surrounding spaces included. Results are in registration order and
    /// capped at `limit`.
    #[must_use]
    pub fn search_operations(
        &self,
        query: &str,
        category: Option<Category>,
        limit: usize,
    ) -> Vec<OperationInfo> {
        let match_all = query.trim().is_empty();
        let needle = query.to_lowercase();
        let ops = self.gateway.registry().all();
        ops.iter()
            .filter(|op| category.map_or(true, |c| op.category() == c))
            .filter(|op| {
                match_all
                    || op.name().to_lowercase().contains(&needle)
                    || op.description().to_lowercase().contains(&needle)
            })
            .take(limit)
            .map(|op| op.info())
            .collect()
    }

    /// Runs any registered operation, regardless of the active profile.
    ///
    /// # Errors
    ///
    /// `UnknownOperation`, `InvalidParameters` or `Execution`; never
    /// `NotEnabled`.
    pub async fn execute_operation(
        &self,
        name: &str,
        parameters: &Value,
    ) -> Result<Value, OperationError> {
        let op = self.gateway.registry().lookup(name)?;
        self.gateway.dispatch(op, parameters).await
    }

    /// Handles a client call to one of the two discovery tools.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` for malformed tool arguments, `UnknownOperation`
    /// for any other tool name, and the errors of the called operation.
    pub async fn call_tool(&self, tool: &str, arguments: &Value) -> Result<Value, OperationError> {
        match tool {
            tool_names::SEARCH_OPERATIONS => {
                let args = validate_tool_args(tool, &self.search_schema(), arguments)?;
                let (query, category, limit) = parse_search_args(&args, self.default_limit)?;
                let results = self.search_operations(&query, category, limit);
                tracing::debug!(%query, ?category, limit, found = results.len(), "search_operations");
                serde_json::to_value(results).map_err(|e| OperationError::Internal(e.into()))
            }
            tool_names::EXECUTE_OPERATION => {
                let args = validate_tool_args(tool, &execute_schema(), arguments)?;
                let name = args.get("name").and_then(Value::as_str).unwrap_or_default();
                let parameters = args.get("parameters").cloned().unwrap_or(Value::Null);
                self.execute_operation(name, &parameters).await
            }
            other => Err(OperationError::UnknownOperation {
                name: other.to_string(),
            }),
        }
    }

    /// The two tools advertised in discovery mode.
    #[must_use]
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let total = self.gateway.registry().len();
        vec![
            ToolDefinition {
                name: tool_names::SEARCH_OPERATIONS.to_string(),
                description: format!(
                    "Search the {total} available DaVinci Resolve operations by keyword and \
                     category. Returns each match's name, category, description and parameters."
                ),
                input_schema: self.search_schema().to_json_schema(),
            },
            ToolDefinition {
                name: tool_names::EXECUTE_OPERATION.to_string(),
                description: "Execute any operation returned by search_operations, by name, \
                              with its parameters as an object."
                    .to_string(),
                input_schema: execute_schema().to_json_schema(),
            },
        ]
    }

    fn search_schema(&self) -> ParameterSchema {
        let categories = Category::ALL.map(Category::as_str).join(", ");
        ParameterSchema::new()
            .param(
                "query",
                ParamSpec::new(ParamType::String)
                    .describe("Keyword matched against operation names and descriptions")
                    .with_default(json!("")),
            )
            .param(
                "category",
                ParamSpec::new(ParamType::String)
                    .describe(format!("Restrict results to one category: {categories}"))
                    .optional(),
            )
            .param(
                "limit",
                ParamSpec::new(ParamType::Integer)
                    .describe("Maximum number of results")
                    .with_default(json!(self.default_limit)),
            )
    }
}

fn execute_schema() -> ParameterSchema {
    ParameterSchema::new()
        .param(
            "name",
            ParamSpec::new(ParamType::String).describe("Operation name from search_operations"),
        )
        .param(
            "parameters",
            ParamSpec::new(ParamType::Object)
                .describe("Arguments for the operation")
                .optional(),
        )
}

fn validate_tool_args(
    tool: &str,
    schema: &ParameterSchema,
    arguments: &Value,
) -> Result<Map<String, Value>, OperationError> {
    schema
        .validate(arguments)
        .map_err(|issues| OperationError::InvalidParameters {
            operation: tool.to_string(),
            issues,
        })
}

fn parse_search_args(
    args: &Map<String, Value>,
    default_limit: usize,
) -> Result<(String, Option<Category>, usize), OperationError> {
    let mut issues = Vec::new();

    let query = args
        .get("query")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let category = match args.get("category").and_then(Value::as_str) {
        None => None,
        Some(raw) => match raw.parse::<Category>() {
            Ok(c) => Some(c),
            Err(e) => {
                issues.push(FieldIssue {
                    field: "category".to_string(),
                    kind: IssueKind::InvalidValue {
                        reason: e.to_string(),
                    },
                });
                None
            }
        },
    };

    let limit = match args.get("limit").and_then(Value::as_i64) {
        Some(n) if n < 0 => {
            issues.push(FieldIssue {
                field: "limit".to_string(),
                kind: IssueKind::InvalidValue {
                    reason: "must not be negative".to_string(),
                },
            });
            0
        }
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        None => default_limit,
    };

    if issues.is_empty() {
        Ok((query, category, limit))
    } else {
        Err(OperationError::InvalidParameters {
            operation: tool_names::SEARCH_OPERATIONS.to_string(),
            issues,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use resolve_mcp_core::ProxyConfig;

    use super::*;
    use crate::service::executor::SerialExecutor;
    use crate::service::exposure::ExposureController;
    use crate::service::handler::handler_fn;
    use crate::service::registry::OperationRegistry;
    use crate::service::resolver::tests::large_registry;

    fn discovery_for(registry: Arc<OperationRegistry>) -> (DiscoveryGateway, Arc<ExecutionGateway>) {
        let exposure = Arc::new(
            ExposureController::new(Arc::clone(&registry), ProxyConfig::default()).unwrap(),
        );
        let gateway = Arc::new(ExecutionGateway::new(
            registry,
            exposure,
            Arc::new(SerialExecutor::start(8)),
        ));
        (DiscoveryGateway::new(Arc::clone(&gateway), 10), gateway)
    }

    fn render_registry() -> Arc<OperationRegistry> {
        let registry = Arc::new(OperationRegistry::new());
        let ops = [
            ("get_render_cache_mode", "color", "Render cache mode of the grade"),
            ("add_render_job", "delivery", "Add a render job to the queue"),
            ("get_render_formats", "delivery", "List available render formats"),
            ("export_metadata", "media", "Export clip metadata to CSV"),
            ("start_rendering", "delivery", "Start rendering queued jobs"),
            ("set_render_settings", "delivery", "Apply render settings"),
            ("get_render_job_status", "delivery", "Status of a RENDER job"),
            ("delete_all_jobs", "delivery", "Clear the Render queue"),
            ("load_render_preset", "delivery", "Load a saved render preset"),
            ("set_output_dir", "delivery", "Set the output directory"),
        ];
        for (name, category, description) in ops {
            registry
                .register(
                    name,
                    category,
                    description,
                    ParameterSchema::new(),
                    handler_fn(|_| async { Ok(Value::Null) }),
                )
                .unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn render_delivery_search_is_capped_and_ordered() {
        let (discovery, _) = discovery_for(render_registry());
        let results = discovery.search_operations("render", Some(Category::Delivery), 5);

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "add_render_job",
                "get_render_formats",
                "start_rendering",
                "set_render_settings",
                "get_render_job_status",
            ]
        );
        assert!(results.iter().all(|r| r.category == Category::Delivery));
    }

    #[tokio::test]
    async fn render_search_skips_other_delivery_operations() {
        let registry = Arc::new(OperationRegistry::new());
        for (name, description) in [
            ("start_rendering", "Start rendering queued jobs"),
            ("stop_rendering", "Stop the current render"),
            ("export_project", "Export the project to a .drp file"),
        ] {
            registry
                .register(
                    name,
                    "delivery",
                    description,
                    ParameterSchema::new(),
                    handler_fn(|_| async { Ok(Value::Null) }),
                )
                .unwrap();
        }
        let (discovery, _) = discovery_for(registry);
        let names: Vec<String> = discovery
            .search_operations("render", Some(Category::Delivery), 5)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["start_rendering", "stop_rendering"]);
    }

    #[tokio::test]
    async fn query_spaces_are_part_of_the_match() {
        let (discovery, _) = discovery_for(render_registry());
        let names: Vec<String> = discovery
            .search_operations("render ", Some(Category::Delivery), 10)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "add_render_job",
                "get_render_formats",
                "set_render_settings",
                "get_render_job_status",
                "delete_all_jobs",
                "load_render_preset",
            ]
        );
        assert!(!names.iter().any(|n| n == "start_rendering"));

        let all = discovery.search_operations("   ", None, 100);
        assert_eq!(all.len(), 10);
    }

    #[tokio::test]
    async fn search_is_deterministic_and_case_insensitive() {
        let (discovery, _) = discovery_for(render_registry());
        let a = discovery.search_operations("RENDER", None, 100);
        let b = discovery.search_operations("render", None, 100);
        assert_eq!(a, b);
        // Everything except export_metadata and set_output_dir.
        assert_eq!(a.len(), 8);
        assert_eq!(a[0].name, "get_render_cache_mode");
    }

    #[tokio::test]
    async fn empty_query_browses_category() {
        let (discovery, _) = discovery_for(render_registry());
        let results = discovery.search_operations("", Some(Category::Media), 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "export_metadata");
        assert!(discovery.search_operations("render", None, 0).is_empty());
    }

    #[tokio::test]
    async fn delete_project_reachable_only_through_discovery() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(OperationRegistry::new());
        registry
            .register(
                "delete_project",
                "project",
                "Delete a project from the database",
                ParameterSchema::new().required("name", ParamType::String),
                handler_fn({
                    let calls = calls.clone();
                    move |_| {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(json!({ "deleted": true }))
                        }
                    }
                }),
            )
            .unwrap();
        let (discovery, gateway) = discovery_for(registry);
        let params = json!({ "name": "Old Project" });

        let err = gateway.invoke("delete_project", &params).await.unwrap_err();
        assert!(matches!(err, OperationError::NotEnabled { profile, .. } if profile == "editing"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let out = discovery.execute_operation("delete_project", &params).await.unwrap();
        assert_eq!(out, json!({ "deleted": true }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn execute_operation_still_checks_registry_and_schema() {
        let (discovery, _) = discovery_for(large_registry());
        let err = discovery.execute_operation("nonexistent", &json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "unknown_operation");

        let err = discovery
            .execute_operation("core_op_0", &json!({ "surprise": 1 }))
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["surprise"]);
    }

    #[tokio::test]
    async fn search_tool_validates_its_arguments() {
        let (discovery, _) = discovery_for(render_registry());

        let err = discovery
            .call_tool("search_operations", &json!({ "query": "render", "category": "audio" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_parameters");
        assert_eq!(err.fields(), vec!["category"]);

        let err = discovery
            .call_tool("search_operations", &json!({ "limit": -1 }))
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["limit"]);

        let err = discovery
            .call_tool("search_operations", &json!({ "limit": "many" }))
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["limit"]);
    }

    #[test]
    fn missing_limit_falls_back_to_default() {
        let args = Map::from_iter([("query".to_string(), json!("render"))]);
        let (query, category, limit) = parse_search_args(&args, 7).unwrap();
        assert_eq!(query, "render");
        assert_eq!(category, None);
        assert_eq!(limit, 7);
    }

    #[tokio::test]
    async fn search_tool_applies_defaults() {
        let (discovery, _) = discovery_for(large_registry());
        let out = discovery.call_tool("search_operations", &json!({})).await.unwrap();
        let rows = out.as_array().unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0]["name"], "core_op_0");
        assert_eq!(rows[0]["category"], "core");
        assert!(rows[0]["parameterSchema"].is_object());
    }

    #[tokio::test]
    async fn execute_tool_routes_by_name() {
        let (discovery, _) = discovery_for(large_registry());
        let out = discovery
            .call_tool("execute_operation", &json!({ "name": "delete_project" }))
            .await
            .unwrap();
        assert_eq!(out, Value::Null);

        let err = discovery
            .call_tool("execute_operation", &json!({ "parameters": {} }))
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["name"]);
    }

    #[tokio::test]
    async fn advertises_exactly_two_tools() {
        let (discovery, _) = discovery_for(large_registry());
        let tools = discovery.tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["search_operations", "execute_operation"]);
        assert!(tools[0].description.contains("143"));
        assert_eq!(tools[1].input_schema["required"], json!(["name"]));
    }
}
