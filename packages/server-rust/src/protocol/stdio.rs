//! Newline-delimited JSON-RPC transport.
//!
//! One request per line in, one response per line out. Requests are handled
//! in the order they are read; the serial executor would serialize their
//! handlers anyway.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::messages::{error_codes, JsonRpcResponse};
use super::surface::McpSurface;

/// Serves requests from `reader` until end of input.
///
/// A line that is not valid UTF-8 gets a parse-error response with a null id;
/// serving continues with the next line.
///
/// # Errors
///
/// Returns the first I/O error from reading or writing.
pub async fn serve_lines<R, W>(surface: &McpSurface, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let out = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => surface.handle_line(line.trim_end()).await,
            Err(e) => {
                tracing::warn!(error = %e, "discarding non-UTF-8 input line");
                let response = JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("parse error: {e}"),
                );
                Some(serde_json::to_string(&response)?)
            }
        };
        if let Some(out) = out {
            writer.write_all(out.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    tracing::debug!("input closed");
    Ok(())
}

/// Serves the process's stdin/stdout. Logging must go to stderr.
///
/// # Errors
///
/// See [`serve_lines`].
pub async fn serve_stdio(surface: &McpSurface) -> std::io::Result<()> {
    serve_lines(surface, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use resolve_mcp_core::{ParameterSchema, ProxyConfig};
    use serde_json::{json, Value};

    use super::*;
    use crate::service::{handler_fn, BridgeService, OperationRegistry, ServerConfig};

    #[tokio::test]
    async fn answers_each_request_line_in_order() {
        let registry = Arc::new(OperationRegistry::new());
        registry
            .register(
                "get_version",
                "core",
                "Resolve version",
                ParameterSchema::new(),
                handler_fn(|_| async { Ok(json!("19.0")) }),
            )
            .unwrap();
        let bridge =
            BridgeService::start(registry, ProxyConfig::default(), &ServerConfig::default())
                .unwrap();
        let surface = McpSurface::new(&bridge);

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_version"}}"#, "\n",
        );
        let mut output = Vec::new();
        serve_lines(&surface, input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["result"]["content"][0]["text"], "19.0");
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_stop_serving() {
        let bridge = BridgeService::start(
            Arc::new(OperationRegistry::new()),
            ProxyConfig::default(),
            &ServerConfig::default(),
        )
        .unwrap();
        let surface = McpSurface::new(&bridge);

        let mut input = Vec::new();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\r\n");
        let mut output = Vec::new();
        serve_lines(&surface, input.as_slice(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], Value::Null);
        assert_eq!(lines[1]["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(lines[2]["id"], 2);
        assert_eq!(lines[2]["result"], json!({}));
    }
}
