/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin
/// 2. Routes tool calls to the hydration tracker
/// 3. Sends JSON-RPC responses to stdout

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::*;
use crate::tools::{self, ToolError};
use crate::{HydrationTrackerServer, ServerError};

/// MCP server that handles communication with the client
pub struct McpServer {
    tracker: HydrationTrackerServer,
    /// Whether the client has sent `initialized`
    initialized: bool,
}

impl McpServer {
    pub fn new(tracker: HydrationTrackerServer) -> Self {
        Self {
            tracker,
            initialized: false,
        }
    }

    pub fn tracker(&self) -> &HydrationTrackerServer {
        &self.tracker
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = tokio::io::stdout();

        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("MCP server shutting down (stdin closed)");
                    break;
                }
                Ok(_) => {
                    if let Some(response) = self.handle_line(&line).await {
                        let response_str = serde_json::to_string(&response)?;

                        stdout.write_all(response_str.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Process a single line of JSON-RPC input
    ///
    /// Returns `None` for blank lines and notifications.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                error_codes::INVALID_REQUEST,
                format!("Unsupported JSON-RPC version '{}'", request.jsonrpc),
                None,
            ));
        }

        match request.id {
            Some(id) => Some(self.handle_request(id, &request.method, request.params).await),
            None => {
                self.handle_notification(&request.method);
                None
            }
        }
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                info!("MCP client initialized");
            }
            other => debug!("Ignoring notification '{}'", other),
        }
    }

    async fn handle_request(&mut self, id: Value, method: &str, params: Option<Value>) -> JsonRpcResponse {
        match method {
            "initialize" => self.handle_initialize(id),
            "initialized" => {
                self.initialized = true;
                JsonRpcResponse::success(id, Value::Null)
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({"tools": tool_definitions()})),
            "tools/call" => self.handle_tools_call(id, params).await,
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", method),
                None,
            ),
        }
    }

    fn handle_initialize(&mut self, id: Value) -> JsonRpcResponse {
        info!("MCP client connected");

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Hydration Tracker MCP".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        JsonRpcResponse::from_serializable(id, &result)
    }

    async fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let tool_params: ToolCallParams = match params {
            Some(params) => match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        error_codes::INVALID_PARAMS,
                        format!("Invalid parameters: {}", e),
                        None,
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing parameters".to_string(), None);
            }
        };

        let result = match self.call_tool(&tool_params.name, tool_params.arguments).await {
            Ok(text) => ToolCallResult::success(text),
            Err(e) => {
                warn!("Tool '{}' failed: {}", tool_params.name, e);
                ToolCallResult::error(e.to_string())
            }
        };

        JsonRpcResponse::from_serializable(id, &result)
    }

    async fn call_tool(&self, name: &str, args: Map<String, Value>) -> Result<String, ToolError> {
        let tracker = &self.tracker;
        let store = tracker.store();

        match name {
            "hydration_log" => {
                let response = tools::log_intake(store, parse_args(args)?)?;
                self.reschedule_reminders().await;
                Ok(response.message)
            }
            "hydration_undo" => {
                let response = tools::undo_last(store, parse_args(args)?)?;
                self.reschedule_reminders().await;
                Ok(response.message)
            }
            "hydration_reset_day" => {
                let response = tools::reset_day(store, parse_args(args)?)?;
                self.reschedule_reminders().await;
                Ok(response.message)
            }
            "hydration_today" => Ok(tools::today_status(store, parse_args(args)?)?.message),
            "goal_set" => Ok(tools::set_goal(store, parse_args(args)?)?.message),
            "stats_get" => Ok(tools::get_stats(store, tracker.analytics())?.message),
            "settings_get" => Ok(tools::get_settings(store)?.message),
            "settings_update" => {
                let response = tools::update_settings(store, parse_args(args)?)?;
                if response.reminders_changed {
                    self.reschedule_reminders().await;
                }
                Ok(response.message)
            }
            "backup_export" => Ok(tools::export_backup(store, tracker.flags(), parse_args(args)?).await?.message),
            "backup_import" => {
                let response = tools::import_backup(store, tracker.flags(), parse_args(args)?).await?;
                self.reschedule_reminders().await;
                Ok(response.message)
            }
            "reminders_schedule" => Ok(tools::schedule_reminders(
                store,
                tracker.scheduler(),
                tracker.dispatcher(),
                parse_args(args)?,
            )
            .await?
            .message),
            "flag_get" => Ok(tools::get_flags(tracker.flags(), parse_args(args)?).await?.message),
            "flag_set" => Ok(tools::set_flag(tracker.flags(), parse_args(args)?).await?.message),
            _ => Err(ToolError::InvalidParams(format!("Unknown tool: {}", name))),
        }
    }

    /// Rebuild reminders after a change that moves them; failures only log
    async fn reschedule_reminders(&self) {
        let tracker = &self.tracker;
        if let Err(e) = tracker
            .scheduler()
            .ensure_scheduled(tracker.store(), tracker.dispatcher(), true)
            .await
        {
            warn!("Failed to reschedule reminders: {}", e);
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Every tool the server offers
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let date_only = json!({
        "type": "object",
        "properties": {
            "date": {"type": "string", "description": "Day (YYYY-MM-DD, optional - defaults to today)"}
        },
        "required": []
    });
    let no_args = json!({"type": "object", "properties": {}, "required": []});

    vec![
        tool(
            "hydration_log",
            "Log a drink of water happening now",
            json!({
                "type": "object",
                "properties": {
                    "amount_ml": {"type": "integer", "description": "Amount in milliliters (1-5000)"},
                    "source": {"type": "string", "description": "'manual' or 'reminder' (optional, defaults to manual)"}
                },
                "required": ["amount_ml"]
            }),
        ),
        tool("hydration_undo", "Undo the most recent drink on a day", date_only.clone()),
        tool("hydration_reset_day", "Clear every drink logged on a day", date_only.clone()),
        tool("hydration_today", "Show a day's intake against the daily goal", date_only),
        tool(
            "goal_set",
            "Change the daily hydration goal",
            json!({
                "type": "object",
                "properties": {
                    "goal_ml": {"type": "integer", "description": "Goal in milliliters (1-10000)"},
                    "use_recommended": {"type": "boolean", "description": "Derive the goal from profile weight instead (optional)"}
                },
                "required": []
            }),
        ),
        tool("stats_get", "Streaks, totals, completion and achievements", no_args.clone()),
        tool("settings_get", "Show user settings, app settings and profile", no_args),
        tool(
            "settings_update",
            "Partially update settings or profile; fields use the camelCase names shown by settings_get",
            json!({
                "type": "object",
                "properties": {
                    "user_settings": {"type": "object", "description": "Reminder and feedback preferences to change"},
                    "app_settings": {"type": "object", "description": "Theme, onboarding progress and view state to change"},
                    "user_profile": {"type": "object", "description": "Profile fields to change"}
                },
                "required": []
            }),
        ),
        tool(
            "backup_export",
            "Export all hydration data and flags as a JSON backup",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File to write (optional - returns the document if omitted)"}
                },
                "required": []
            }),
        ),
        tool(
            "backup_import",
            "Replace all data with the contents of a backup",
            json!({
                "type": "object",
                "properties": {
                    "backup": {"type": "string", "description": "Backup document"},
                    "path": {"type": "string", "description": "File holding the backup document"}
                },
                "required": []
            }),
        ),
        tool(
            "reminders_schedule",
            "Schedule hydration reminders for the next 24 hours",
            json!({
                "type": "object",
                "properties": {
                    "force": {"type": "boolean", "description": "Rebuild even if reminders are pending (optional)"}
                },
                "required": []
            }),
        ),
        tool(
            "flag_get",
            "Read onboarding flags",
            json!({
                "type": "object",
                "properties": {
                    "flag": {"type": "string", "description": "Flag name (optional - all flags if omitted)"}
                },
                "required": []
            }),
        ),
        tool(
            "flag_set",
            "Set an onboarding flag",
            json!({
                "type": "object",
                "properties": {
                    "flag": {"type": "string", "description": "onboarding_completed, goal_setup_completed, notifications_prompted or profile_completed"},
                    "value": {"type": "boolean"}
                },
                "required": ["flag", "value"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(HydrationTrackerServer::in_memory().unwrap())
    }

    async fn call(server: &mut McpServer, line: Value) -> Value {
        let response = server.handle_line(&line.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let mut server = server();
        let init = call(&mut server, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})).await;
        assert_eq!(init["result"]["protocolVersion"], json!(MCP_VERSION));

        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
        assert!(server.is_initialized());

        let list = call(&mut server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
        assert_eq!(list["result"]["tools"].as_array().unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_log_reschedules_reminders() {
        let mut server = server();
        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                   "params": {"name": "hydration_log", "arguments": {"amount_ml": 300}}}),
        )
        .await;
        assert_eq!(response["result"]["isError"], json!(false));
        assert!(!server.tracker().dispatcher().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_undo_and_reset_move_reminder_anchor() {
        use crate::domain::{EntrySource, HydrationEntry, UserSettings};
        use crate::store::local_today;
        use chrono::{Duration, Utc};

        let mut server = server();
        let store = server.tracker().store();
        let mut settings = UserSettings::default();
        settings.quiet_hours.enabled = false;
        store.save_user_settings(settings);
        let early = HydrationEntry::new(200, EntrySource::Manual, Utc::now() - Duration::minutes(30)).unwrap();
        store.add_hydration_entry(local_today(), early.clone());

        let tool_call = |id: u64, name: &str| {
            json!({"jsonrpc": "2.0", "id": id, "method": "tools/call",
                   "params": {"name": name, "arguments": {}}})
        };
        let logged = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                   "params": {"name": "hydration_log", "arguments": {"amount_ml": 300}}}),
        )
        .await;
        assert_eq!(logged["result"]["isError"], json!(false));
        let after_log = server.tracker().dispatcher().snapshot()[0].fire_at;
        assert!(after_log > early.timestamp + Duration::minutes(60));

        call(&mut server, tool_call(2, "hydration_undo")).await;
        let after_undo = server.tracker().dispatcher().snapshot()[0].fire_at;
        assert_eq!(after_undo, early.timestamp + Duration::minutes(60));

        let before_reset = Utc::now();
        call(&mut server, tool_call(3, "hydration_reset_day")).await;
        let after_reset = server.tracker().dispatcher().snapshot()[0].fire_at;
        assert!(after_reset >= before_reset + Duration::minutes(60));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_tool_errors() {
        let mut server = server();
        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                   "params": {"name": "hydration_log", "arguments": {"amount_ml": "lots"}}}),
        )
        .await;
        assert_eq!(response["result"]["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let mut server = server();
        let parse = serde_json::to_value(server.handle_line("{nope").await.unwrap()).unwrap();
        assert_eq!(parse["error"]["code"], json!(error_codes::PARSE_ERROR));

        let missing = call(&mut server, json!({"jsonrpc": "2.0", "id": 3, "method": "water/list"})).await;
        assert_eq!(missing["error"]["code"], json!(error_codes::METHOD_NOT_FOUND));

        let no_params = call(&mut server, json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call"})).await;
        assert_eq!(no_params["error"]["code"], json!(error_codes::INVALID_PARAMS));
    }
}
