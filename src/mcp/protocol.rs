/// MCP (Model Context Protocol) message structures and JSON-RPC handling
///
/// This module defines the JSON-RPC message format that MCP clients use to
/// communicate with the hydration tracker server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// MCP protocol version we support
pub const MCP_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request message
///
/// A request without an `id` is a notification and gets no response.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    /// The method to call (e.g., "tools/call")
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID that we're responding to
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error information
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP tool call parameters
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call (e.g., "hydration_log")
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// MCP tool call result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    /// Whether this is an error result
    pub is_error: bool,
}

/// Content returned by a tool
#[derive(Debug, Serialize)]
pub struct ToolContent {
    /// Type of content (always "text" here)
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Description of one tool for tools/list
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

/// MCP initialization response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

// JSON-RPC error codes (standard codes)
pub mod error_codes {
    /// Parse error - Invalid JSON was received by the server
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The requested method doesn't exist
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid parameters - Method exists but parameters are wrong
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message, data }),
        }
    }

    /// Serialize `result` into a success response, or an internal error
    pub fn from_serializable<T: Serialize>(id: Value, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self::success(id, value),
            Err(e) => Self::error(id, error_codes::INTERNAL_ERROR, format!("Failed to encode result: {}", e), None),
        }
    }
}

impl ToolCallResult {
    /// Create a successful tool result with text content
    pub fn success(text: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(error_message: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: format!("Error: {}", error_message),
            }],
            is_error: true,
        }
    }
}
