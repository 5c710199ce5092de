//! Line-delimited JSON front end.
//!
//! Each input line is a request `{ "id", "method", "params" }`; each output
//! line is `{ "id", "result" }` or `{ "id", "error" }`. Requests run
//! concurrently, so responses are written in completion order.

use crate::resource::ResourceRouter;
use crate::tools::ToolRouter;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error};

#[derive(Clone)]
pub struct Services {
    pub tools: ToolRouter,
    pub resources: ResourceRouter,
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(RpcError {
                message: message.into(),
            }),
        }
    }
}

/// Handle one request line.
pub async fn handle_line(services: &Services, line: &str) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(e) => return RpcResponse::err(Value::Null, format!("Invalid request: {}", e)),
    };
    debug!(method = %request.method, "Handling request");

    let RpcRequest { id, method, params } = request;
    match method.as_str() {
        "tools/list" => RpcResponse::ok(id, json!({ "tools": services.tools.list_tools() })),
        "tools/call" => match serde_json::from_value::<CallToolParams>(params) {
            Ok(call) => {
                let response = services.tools.call(&call.name, &call.arguments).await;
                to_result(id, &response)
            }
            Err(e) => RpcResponse::err(id, format!("Invalid tools/call params: {}", e)),
        },
        "resources/list" => {
            RpcResponse::ok(id, json!({ "resources": services.resources.list() }))
        }
        "resources/read" => match serde_json::from_value::<ReadResourceParams>(params) {
            Ok(read) => match services.resources.read(&read.uri) {
                Ok(contents) => RpcResponse::ok(id, json!({ "contents": [contents] })),
                Err(e) => RpcResponse::err(id, e.to_string()),
            },
            Err(e) => RpcResponse::err(id, format!("Invalid resources/read params: {}", e)),
        },
        other => RpcResponse::err(id, format!("Unknown method: {}", other)),
    }
}

fn to_result<T: Serialize>(id: Value, value: &T) -> RpcResponse {
    match serde_json::to_value(value) {
        Ok(v) => RpcResponse::ok(id, v),
        Err(e) => RpcResponse::err(id, format!("Failed to encode result: {}", e)),
    }
}

/// Serve requests from `reader` until EOF, returning the writer once every
/// in-flight request has been answered.
pub async fn serve<R, W>(services: Services, reader: R, mut writer: W) -> io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<W, io::Error>(writer)
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if tx.is_closed() {
            error!("Response writer stopped; no longer reading requests");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let services = services.clone();
        let tx = tx.clone();
        let line = trimmed.to_string();
        tokio::spawn(async move {
            let response = handle_line(&services, &line).await;
            match serde_json::to_string(&response) {
                Ok(encoded) => {
                    if tx.send(encoded).await.is_err() {
                        error!("Response dropped: writer is closed");
                    }
                }
                Err(e) => error!(error = %e, "Failed to encode response"),
            }
        });
    }

    drop(tx);
    writer_task.await.map_err(io::Error::other)?
}

pub async fn serve_stdio(services: Services) -> io::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    serve(services, reader, tokio::io::stdout()).await?;
    Ok(())
}
