//! The central Model Context Protocol engine
//!
//! Decodes JSON-RPC messages (single or batched), negotiates `initialize`,
//! and routes tool, resource and prompt methods. Both HTTP transports feed this
//! module with the caller's [`RequestContext`].

use rust_mcp_sdk::schema::{
    CallToolRequest, GetPromptRequest, Implementation, InitializeRequest, InitializeResult,
    JsonrpcMessage, JsonrpcRequest, ListPromptsRequest, ListPromptsResult, ListResourcesRequest,
    ListResourcesResult, ListToolsRequest, ListToolsResult, PingRequest, ProtocolVersion,
    ReadResourceRequest, ServerCapabilities, ServerCapabilitiesPrompts,
    ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::domain::{
    prompts::{build_prompts_list, handle_prompts_get},
    resources::{build_resource_templates_list, build_resources_list, handle_resources_read},
    tools::{build_tools_list, handle_tools_call},
};
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result,
    request_id_to_value, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
};
use crate::{auth::Identity, errors::AppError, AppState};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_TITLE: &str = "Example MCP Server on ArcBlock Platform";

/// Who is calling and over which session.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub session_id: Option<String>,
    pub identity: Option<Identity>,
}

/// Handles a decoded request body. Returns `None` when nothing needs to be
/// sent back (notifications only).
pub async fn process_payload(
    state: &AppState,
    context: &RequestContext,
    payload: Value,
) -> Option<Value> {
    let Some(batch) = payload.as_array() else {
        return handle_json_rpc_value(state, context, payload).await;
    };

    if batch.is_empty() {
        return Some(Value::Array(vec![json_rpc_error(
            None,
            INVALID_REQUEST,
            "Invalid Request",
        )]));
    }

    let mut responses = Vec::new();
    for item in batch {
        if let Some(response) = handle_json_rpc_value(state, context, item.clone()).await {
            responses.push(response);
        }
    }

    if responses.is_empty() {
        None
    } else {
        Some(Value::Array(responses))
    }
}

pub async fn handle_json_rpc_value(
    state: &AppState,
    context: &RequestContext,
    payload: Value,
) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
    }

    let request_id = payload.get("id").cloned();
    let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
    };

    match parsed {
        JsonrpcMessage::Request(request) => {
            if let Err(error_response) = validate_request_shape(&request) {
                return Some(error_response);
            }

            let request_id = request_id_to_value(request.id);
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(Some(request_id), INVALID_REQUEST, "Invalid Request"));
            }

            Some(
                handle_json_rpc_request(
                    state,
                    context,
                    Some(request_id),
                    request.method,
                    request.params.map(Value::Object),
                )
                .await,
            )
        }
        JsonrpcMessage::Notification(notification) => {
            debug!(method = %notification.method, "mcp notification received");
            None
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
            Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request"))
        }
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let payload = serde_json::to_value(request).expect("jsonrpc request serialization");
    let request_id = Some(request_id_to_value(request.id.clone()));

    let valid = match request.method.as_str() {
        "tools/call" => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
        "resources/read" => serde_json::from_value::<ReadResourceRequest>(payload).is_ok(),
        "tools/list" => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
        "resources/list" => serde_json::from_value::<ListResourcesRequest>(payload).is_ok(),
        "ping" => serde_json::from_value::<PingRequest>(payload).is_ok(),
        "initialize" => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
        "prompts/list" => serde_json::from_value::<ListPromptsRequest>(payload).is_ok(),
        "prompts/get" => serde_json::from_value::<GetPromptRequest>(payload).is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(json_rpc_error(request_id, INVALID_PARAMS, "Invalid params"))
    }
}

pub async fn handle_json_rpc_request(
    state: &AppState,
    context: &RequestContext,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
) -> Value {
    let audit_params = redact_audit_params(params.as_ref());

    let response = match method.as_str() {
        "initialize" => match negotiate_protocol_version(params.as_ref()) {
            Ok(protocol_version) => json_rpc_result(
                id,
                serde_json::to_value(initialize_result(protocol_version))
                    .expect("initialize result serialization"),
            ),
            Err(err) => app_error_to_json_rpc(id, err),
        },
        "ping" => json_rpc_result(id, json!({})),
        "tools/list" => json_rpc_result(
            id,
            serde_json::to_value(ListToolsResult {
                meta: None,
                next_cursor: None,
                tools: build_tools_list(),
            })
            .expect("tools list result serialization"),
        ),
        "tools/call" => handle_tools_call(state, context, id, params).await,
        "resources/list" => json_rpc_result(
            id,
            serde_json::to_value(ListResourcesResult {
                meta: None,
                next_cursor: None,
                resources: build_resources_list(),
            })
            .expect("resources list result serialization"),
        ),
        "resources/templates/list" => json_rpc_result(id, build_resource_templates_list()),
        "resources/read" => handle_resources_read(id, params),
        "prompts/list" => json_rpc_result(
            id,
            serde_json::to_value(ListPromptsResult {
                meta: None,
                next_cursor: None,
                prompts: build_prompts_list(),
            })
            .expect("prompts list result serialization"),
        ),
        "prompts/get" => handle_prompts_get(id, params),
        _ => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
    };

    info!(
        method = %method,
        params = %audit_params,
        session_id = context.session_id.as_deref().unwrap_or("-"),
        caller = context.identity.as_ref().map(|user| user.did.as_str()).unwrap_or("anonymous"),
        outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
        "mcp action audited"
    );

    response
}

fn initialize_result(protocol_version: ProtocolVersion) -> InitializeResult {
    InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some(SERVER_TITLE.to_string()),
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: Some(ServerCapabilitiesPrompts {
                list_changed: Some(false),
            }),
            ..Default::default()
        },
        protocol_version: protocol_version.into(),
        instructions: None,
        meta: None,
    }
}

/// A client offering a newer revision is answered with the one this server
/// speaks; the client decides whether to continue.
pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<ProtocolVersion, AppError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    if offered_version != SUPPORTED_PROTOCOL_VERSION {
        debug!(
            offered = offered_version,
            supported = SUPPORTED_PROTOCOL_VERSION,
            "answering initialize with supported protocol version"
        );
    }

    Ok(ProtocolVersion::V2024_11_05)
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey" | "credential" | "credentials"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
}
