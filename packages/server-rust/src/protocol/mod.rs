//! MCP protocol surface: JSON-RPC envelopes, method dispatch and the
//! newline-delimited stdio transport.

pub mod messages;
pub mod stdio;
pub mod surface;

pub use messages::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use stdio::{serve_lines, serve_stdio};
pub use surface::{McpSurface, PROTOCOL_VERSION, SERVER_NAME};
