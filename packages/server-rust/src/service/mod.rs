//! Operation exposure and execution framework.
//!
//! This module implements the tool-call pipeline:
//!
//! 1. **Registry** (`registry`): every operation the backend can perform
//! 2. **Resolution** (`resolver`, `exposure`): which operations the active
//!    profile exposes, held as an atomically swapped snapshot
//! 3. **Gateways** (`gateway`, `discovery`): direct calls with admission, or
//!    search-then-execute over the whole registry
//! 4. **Execution** (`executor`): one handler at a time, FIFO
//! 5. **Routing** (`router`, `middleware`): a Tower service over `ToolCall`
//! 6. **Assembly** (`bridge`, `manifest`): startup wiring and declarative
//!    registration

pub mod bridge;
pub mod config;
pub mod discovery;
pub mod executor;
pub mod exposure;
pub mod gateway;
pub mod handler;
pub mod manifest;
pub mod middleware;
pub mod operation;
pub mod registry;
pub mod resolver;
pub mod router;

// Re-export key types for convenient access.
pub use bridge::BridgeService;
pub use config::ServerConfig;
pub use discovery::DiscoveryGateway;
pub use executor::SerialExecutor;
pub use exposure::{list_profiles, ExposureController, ExposureSnapshot};
pub use gateway::ExecutionGateway;
pub use handler::{handler_fn, OperationHandler, UnboundHandler};
pub use manifest::{ManifestEntry, ManifestError, OperationManifest};
pub use operation::{
    tool_names, OperationError, ProfileError, RegistryError, ToolCall, ToolDefinition,
    ToolResponse,
};
pub use registry::{Operation, OperationRegistry, RegistrySnapshot};
pub use resolver::{resolve, unknown_tool_references};
pub use router::ToolRouter;
