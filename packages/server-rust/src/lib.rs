//! `resolve-mcp` server: operation registry, profile resolution, execution and discovery gateways, MCP tool surface.

pub mod protocol;
pub mod service;

pub use protocol::McpSurface;
pub use service::{BridgeService, OperationRegistry, ServerConfig};
