//! Interactive tools exposed via Model Context Protocol
//!
//! Each tool has a schema struct (advertised by `tools/list`) and a params
//! struct with typed enums used to validate `tools/call` arguments. Arguments
//! are validated first, then the caller is checked against the tool's access
//! policy, then the tool runs. Expected failures come back as error-flagged
//! tool results rather than JSON-RPC errors.

use chrono::{DateTime, Utc};
use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::domain::mock_db::{run_query, QueryAction, Table};
use crate::domain::policy::Decision;
use crate::domain::utils::{
    add_units, calculate, format_iso, format_number, format_with_pattern, transform_text,
    ArithmeticOperation, DateOperation, TextOperation, TimeUnit,
};
use crate::mcp::rpc::{
    app_error_to_json_rpc, json_rpc_error, json_rpc_error_with_data, json_rpc_result,
    INVALID_PARAMS, METHOD_NOT_FOUND,
};
use crate::mcp::server::RequestContext;
use crate::storyteller::DEFAULT_STORY_LANGUAGE;
use crate::{errors::AppError, AppState};

#[macros::mcp_tool(name = "calculator", description = "Perform basic arithmetic operations")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct CalculatorTool {
    /// The arithmetic operation to perform
    pub operation: ArithmeticOperation,
    /// First number
    pub a: f64,
    /// Second number
    pub b: f64,
}

#[macros::mcp_tool(name = "text-transform", description = "Transform text in various ways")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct TextTransformTool {
    /// Input text to transform
    pub text: String,
    /// The transformation to apply
    pub operation: TextOperation,
}

#[macros::mcp_tool(name = "db-query", description = "Simulate database queries with mock data")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct DbQueryTool {
    /// The table to query
    pub table: Table,
    /// The query action to perform
    pub action: QueryAction,
    /// Optional filter criteria
    pub filter: Option<String>,
}

#[macros::mcp_tool(name = "datetime", description = "Various time and date operations")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct DateTimeTool {
    /// The operation to perform
    pub operation: DateOperation,
    /// Optional date format (e.g., "YYYY-MM-DD")
    pub format: Option<String>,
    /// Number of units to add
    pub units: Option<f64>,
    /// Time unit to add
    #[serde(rename = "timeUnit")]
    pub time_unit: Option<TimeUnit>,
}

#[macros::mcp_tool(name = "storytelling", description = "Tell a story about a given topic")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct StorytellingTool {
    /// The topic to tell a story about
    pub topic: String,
    /// The language to tell the story in (defaults to zh-CN)
    pub language: Option<String>,
}

#[macros::mcp_tool(name = "echo", description = "Echo a message back to the caller")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct EchoTool {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CalculatorParams {
    pub operation: ArithmeticOperation,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Deserialize)]
pub struct TextTransformParams {
    pub text: String,
    pub operation: TextOperation,
}

#[derive(Debug, Deserialize)]
pub struct DbQueryParams {
    pub table: Table,
    pub action: QueryAction,
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeParams {
    pub operation: DateOperation,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub units: Option<f64>,
    #[serde(default)]
    pub time_unit: Option<TimeUnit>,
}

#[derive(Debug, Deserialize)]
pub struct StorytellingParams {
    pub topic: String,
    #[serde(default = "default_story_language")]
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct EchoParams {
    pub message: String,
}

fn default_story_language() -> String {
    DEFAULT_STORY_LANGUAGE.to_string()
}

/// A validated `tools/call` request.
#[derive(Debug)]
pub enum ToolCall {
    Calculator(CalculatorParams),
    TextTransform(TextTransformParams),
    DbQuery(DbQueryParams),
    DateTime(DateTimeParams),
    Storytelling(StorytellingParams),
    Echo(EchoParams),
}

impl ToolCall {
    /// Returns `Ok(None)` for an unknown tool name.
    pub fn parse(name: &str, arguments: Value) -> Result<Option<Self>, AppError> {
        let call = match name {
            "calculator" => Self::Calculator(parse_arguments(arguments)?),
            "text-transform" => Self::TextTransform(parse_arguments(arguments)?),
            "db-query" => Self::DbQuery(parse_arguments(arguments)?),
            "datetime" => Self::DateTime(parse_arguments(arguments)?),
            "storytelling" => Self::Storytelling(parse_arguments(arguments)?),
            "echo" => Self::Echo(parse_arguments(arguments)?),
            _ => return Ok(None),
        };
        Ok(Some(call))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Calculator(_) => "calculator",
            Self::TextTransform(_) => "text-transform",
            Self::DbQuery(_) => "db-query",
            Self::DateTime(_) => "datetime",
            Self::Storytelling(_) => "storytelling",
            Self::Echo(_) => "echo",
        }
    }
}

fn parse_arguments<P: DeserializeOwned>(arguments: Value) -> Result<P, AppError> {
    serde_json::from_value(arguments)
        .map_err(|err| AppError::bad_request("invalid_arguments", err.to_string()))
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![
        CalculatorTool::tool(),
        TextTransformTool::tool(),
        DbQueryTool::tool(),
        DateTimeTool::tool(),
        StorytellingTool::tool(),
        EchoTool::tool(),
    ]
}

pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text.into(), None, None))],
        is_error: None,
        meta: None,
        structured_content: None,
    }
}

pub fn error_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        is_error: Some(true),
        ..text_result(text)
    }
}

pub async fn handle_tools_call(
    state: &AppState,
    context: &RequestContext,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    let arguments = Value::Object(tool_call.arguments.unwrap_or_default());
    let call = match ToolCall::parse(&tool_call.name, arguments) {
        Ok(Some(call)) => call,
        Ok(None) => {
            return json_rpc_error_with_data(
                id,
                METHOD_NOT_FOUND,
                "Method not found",
                Some(json!({
                    "code": "tool_not_found",
                    "message": "unknown tool name",
                    "details": {
                        "name": tool_call.name,
                    },
                })),
            )
        }
        Err(err) => return app_error_to_json_rpc(id, err),
    };

    let result = match run_tool(state, context, call, Utc::now()).await {
        Ok(result) => result,
        Err(AppError::Unauthorized) => error_result("Unauthorized"),
        Err(AppError::Upstream { message, .. }) => error_result(message),
        Err(err @ AppError::Internal { .. }) => {
            tracing::error!(error = %err, "tool failed with internal error");
            error_result("Internal error")
        }
        Err(err @ AppError::BadRequest { .. }) => return app_error_to_json_rpc(id, err),
    };

    json_rpc_result(
        id,
        serde_json::to_value(result).expect("tool result serialization"),
    )
}

/// Checks the tool's access policy and runs it.
pub async fn run_tool(
    state: &AppState,
    context: &RequestContext,
    call: ToolCall,
    now: DateTime<Utc>,
) -> Result<CallToolResult, AppError> {
    let tool = call.name();
    if state.policies.check(tool, context.identity.as_ref()) == Decision::Deny {
        warn!(
            tool,
            caller = context.identity.as_ref().map(|user| user.did.as_str()).unwrap_or("anonymous"),
            "tool call denied by access policy"
        );
        return Err(AppError::Unauthorized);
    }

    match call {
        ToolCall::Calculator(params) => Ok(run_calculator(params)),
        ToolCall::TextTransform(params) => {
            Ok(text_result(transform_text(&params.text, params.operation)))
        }
        ToolCall::DbQuery(params) => {
            run_query(params.table, params.action, params.filter.as_deref()).map(text_result)
        }
        ToolCall::DateTime(params) => Ok(run_datetime(params, now)),
        ToolCall::Storytelling(params) => state
            .story_teller
            .tell_story(&params.topic, &params.language)
            .await
            .map(text_result),
        ToolCall::Echo(params) => Ok(text_result(format!("Tool echo: {}", params.message))),
    }
}

fn run_calculator(params: CalculatorParams) -> CallToolResult {
    match calculate(params.operation, params.a, params.b) {
        Some(value) => text_result(format!("Result: {}", format_number(value))),
        None => error_result("Error: Division by zero"),
    }
}

fn run_datetime(params: DateTimeParams, now: DateTime<Utc>) -> CallToolResult {
    match params.operation {
        DateOperation::Current => text_result(format_iso(now)),
        DateOperation::Format => match params.format.as_deref().filter(|value| !value.is_empty()) {
            Some(pattern) => text_result(format_with_pattern(now, pattern)),
            None => text_result(format_iso(now)),
        },
        DateOperation::Add => match (params.units.filter(|units| *units != 0.0), params.time_unit) {
            (Some(units), Some(unit)) => match add_units(now, units, unit) {
                Some(shifted) => text_result(format_iso(shifted)),
                None => error_result("Error: resulting date is out of range"),
            },
            _ => text_result("Please provide both units and timeUnit"),
        },
    }
}
