use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use lotto_rd::LottoError;

use crate::use_cases::{AdminUseCase, LotteryUseCase, ReportUseCase};

#[derive(Debug, serde::Deserialize)]
struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    fn failure(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id.unwrap_or(json!(1))),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcError {
    fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    /// Engine errors carry their Spanish user message and error kind; the
    /// full chain goes into `data.detail` for logs and debugging clients.
    fn from_tool_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<LottoError>() {
            Some(lotto) => Self {
                code: match lotto {
                    LottoError::InvalidGameType(_) | LottoError::InvalidOptions(_) => -32602,
                    _ => -32603,
                },
                message: lotto.user_message().to_string(),
                data: Some(json!({
                    "kind": lotto.kind(),
                    "retryable": lotto.is_retryable(),
                    "detail": format!("{:#}", error)
                })),
            },
            None => Self {
                code: -32603,
                message: format!("Tool execution error: {}", error),
                data: None,
            },
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

fn caller_schema() -> Value {
    json!({
        "type": "object",
        "description": "Authenticated caller as resolved by the identity provider",
        "properties": {
            "owner_id": {"type": "string"},
            "is_admin": {"type": "boolean"}
        }
    })
}

fn game_type_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["leidsa", "kino", "pale", "tripleta"],
        "description": "Game to use"
    })
}

fn options_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "include_secondary": {
                "type": "boolean",
                "description": "Leidsa only: add a Más number (1-12)"
            },
            "secondary_only": {
                "type": "boolean",
                "description": "Leidsa only: generate just the Más number"
            }
        }
    })
}

pub struct MCPHandler {
    lottery_use_case: Arc<LotteryUseCase>,
    admin_use_case: Arc<AdminUseCase>,
    report_use_case: Arc<ReportUseCase>,
}

impl MCPHandler {
    pub fn new(
        lottery_use_case: Arc<LotteryUseCase>,
        admin_use_case: Arc<AdminUseCase>,
        report_use_case: Arc<ReportUseCase>,
    ) -> Self {
        Self {
            lottery_use_case,
            admin_use_case,
            report_use_case,
        }
    }

    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    let error_response = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        result: None,
                        error: Some(JsonRpcError {
                            code: -32700,
                            message: "Parse error".to_string(),
                            data: Some(json!(e.to_string())),
                        }),
                        id: None,
                    };
                    writeln!(writer, "{}", serde_json::to_string(&error_response)?)?;
                    writer.flush()?;
                    continue;
                }
            };

            // Notifications never get a response.
            if request.id.is_none() || request.method.starts_with("notifications/") {
                if request.method == "notifications/initialized" {
                    info!("🎰 Client initialized");
                }
                continue;
            }

            let response = self.handle_request(request).await;
            writeln!(writer, "{}", serde_json::to_string(&response)?)?;
            writer.flush()?;
        }

        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": self.get_tools() })),
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            _ => JsonRpcResponse::failure(
                request.id,
                JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                    data: None,
                },
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("🎰 Initializing lotto-rd MCP server");
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "lotto-rd-mcp-server",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::failure(id, JsonRpcError::invalid_params("Missing params"));
        };
        let Some(tool_name) = params.get("name").and_then(|n| n.as_str()) else {
            return JsonRpcResponse::failure(id, JsonRpcError::invalid_params("Missing tool name"));
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let arguments_map: HashMap<String, Value> = match serde_json::from_value(arguments) {
            Ok(map) => map,
            Err(_) => {
                return JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_params("Arguments must be an object"),
                );
            }
        };

        match self.execute_tool(tool_name, &arguments_map).await {
            Ok(content) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                }),
            ),
            Err(e) => {
                warn!(tool = tool_name, error = %e, "tool call failed");
                JsonRpcResponse::failure(id, JsonRpcError::from_tool_error(&e))
            }
        }
    }

    async fn execute_tool(&self, tool_name: &str, arguments: &HashMap<String, Value>) -> Result<String> {
        match tool_name {
            "get_games" => self.lottery_use_case.get_games(arguments).await,
            "generate_numbers" => self.lottery_use_case.generate_numbers(arguments).await,
            "generate_demo_numbers" => self.lottery_use_case.generate_demo_numbers(arguments).await,
            "save_demo_numbers" => self.lottery_use_case.save_demo_numbers(arguments).await,
            "list_my_numbers" => self.lottery_use_case.list_my_numbers(arguments).await,
            "delete_number" => self.lottery_use_case.delete_number(arguments).await,
            "delete_all_numbers" => self.lottery_use_case.delete_all_numbers(arguments).await,
            "get_user_stats" => self.lottery_use_case.get_user_stats(arguments).await,
            "get_hot_cold_numbers" => self.lottery_use_case.get_hot_cold_numbers(arguments).await,
            "get_probability_analysis" => self.lottery_use_case.get_probability_analysis(arguments).await,
            "admin_list_numbers" => self.admin_use_case.admin_list_numbers(arguments).await,
            "restore_number" => self.admin_use_case.restore_number(arguments).await,
            "admin_overview" => self.admin_use_case.admin_overview(arguments).await,
            "recompute_statistics" => self.admin_use_case.recompute_statistics(arguments).await,
            "generate_report" => self.report_use_case.generate_report(arguments).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }

    fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "get_games".to_string(),
                description: "List the supported games with their number ranges".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: "generate_numbers".to_string(),
                description: "Generate combinations for a game and save them to the caller's account".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema(),
                        "game_type": game_type_schema(),
                        "options": options_schema(),
                        "quantity": {
                            "type": "integer",
                            "description": "Number of combinations, 1-10 (default: 1)"
                        }
                    },
                    "required": ["caller", "game_type"]
                }),
            },
            Tool {
                name: "generate_demo_numbers".to_string(),
                description: "Generate combinations without an account; nothing is saved".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "game_type": game_type_schema(),
                        "options": options_schema(),
                        "quantity": {
                            "type": "integer",
                            "description": "Number of combinations, 1-5 (default: 1)"
                        }
                    },
                    "required": ["game_type"]
                }),
            },
            Tool {
                name: "save_demo_numbers".to_string(),
                description: "Count an already generated combination in the number statistics".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema(),
                        "game_type": game_type_schema(),
                        "draw": {
                            "type": "object",
                            "properties": {
                                "main_numbers": {"type": "array", "items": {"type": "integer"}},
                                "secondary_number": {"type": "integer"}
                            }
                        }
                    },
                    "required": ["caller", "game_type", "draw"]
                }),
            },
            Tool {
                name: "list_my_numbers".to_string(),
                description: "List the caller's saved combinations, newest first".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema(),
                        "game_type": game_type_schema(),
                        "limit": {
                            "type": "integer",
                            "description": "Page size, 1-100 (default: 50)"
                        },
                        "offset": {
                            "type": "integer",
                            "description": "Records to skip (default: 0)"
                        }
                    },
                    "required": ["caller"]
                }),
            },
            Tool {
                name: "delete_number".to_string(),
                description: "Soft-delete one of the caller's saved combinations".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema(),
                        "id": {"type": "string", "description": "Record id (UUID)"}
                    },
                    "required": ["caller", "id"]
                }),
            },
            Tool {
                name: "delete_all_numbers".to_string(),
                description: "Soft-delete every active combination of the caller".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema()
                    },
                    "required": ["caller"]
                }),
            },
            Tool {
                name: "get_user_stats".to_string(),
                description: "Totals per game and last activity for an account".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema(),
                        "owner_id": {
                            "type": "string",
                            "description": "Account to inspect (admins only; default: the caller)"
                        }
                    },
                    "required": ["caller"]
                }),
            },
            Tool {
                name: "get_hot_cold_numbers".to_string(),
                description: "Most and least frequent numbers of a game".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "game_type": game_type_schema(),
                        "limit": {
                            "type": "integer",
                            "description": "Size of each list (default: 10)"
                        },
                        "secondary": {
                            "type": "boolean",
                            "description": "Use the Más numbers instead of the main ones (Leidsa only)"
                        }
                    },
                    "required": ["game_type"]
                }),
            },
            Tool {
                name: "get_probability_analysis".to_string(),
                description: "Frequency and percentage of every number of a game".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "game_type": game_type_schema()
                    },
                    "required": ["game_type"]
                }),
            },
            Tool {
                name: "admin_list_numbers".to_string(),
                description: "Admin: list records of any account, including deleted ones".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema(),
                        "owner_id": {"type": "string"},
                        "game_type": game_type_schema(),
                        "include_deleted": {
                            "type": "boolean",
                            "description": "Include soft-deleted records (default: true)"
                        },
                        "limit": {"type": "integer"},
                        "offset": {"type": "integer"}
                    },
                    "required": ["caller"]
                }),
            },
            Tool {
                name: "restore_number".to_string(),
                description: "Admin: restore a soft-deleted record".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema(),
                        "id": {"type": "string", "description": "Record id (UUID)"}
                    },
                    "required": ["caller", "id"]
                }),
            },
            Tool {
                name: "admin_overview".to_string(),
                description: "Admin: record totals, recent activity and per-game counts".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema()
                    },
                    "required": ["caller"]
                }),
            },
            Tool {
                name: "recompute_statistics".to_string(),
                description: "Admin: rebuild a game's number statistics from its active records".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "caller": caller_schema(),
                        "game_type": game_type_schema()
                    },
                    "required": ["caller", "game_type"]
                }),
            },
            Tool {
                name: "generate_report".to_string(),
                description: "Write the HTML frequency report of a game".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "game_type": game_type_schema()
                    },
                    "required": ["game_type"]
                }),
            },
        ]
    }
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}
