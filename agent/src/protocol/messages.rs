//! JSON-RPC 2.0 notification envelope for the agent's output stream.

use serde::Serialize;

const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC notification (a message without an `id`).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}
