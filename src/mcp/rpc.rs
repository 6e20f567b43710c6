//! JSON-RPC protocol representations and formatting utilities
//!
//! Maps internal `AppError`s onto JSON-RPC error payloads and builds the
//! envelopes the HTTP adapter returns outside of a dispatched request.

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde_json::{json, Value};

use crate::errors::AppError;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const SERVER_ERROR: i32 = -32000;
pub const UNAUTHORIZED: i32 = -32001;

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn app_error_to_json_rpc(id: Option<Value>, err: AppError) -> Value {
    match err {
        AppError::BadRequest { code, message } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": code,
                "message": message,
                "details": {}
            })),
        ),
        AppError::Unauthorized => json_rpc_error(id, UNAUTHORIZED, "Unauthorized"),
        AppError::Upstream { .. } | AppError::Internal { .. } => {
            tracing::error!(error = %err, "request failed with internal error");
            json_rpc_error(id, INTERNAL_ERROR, "Internal error")
        }
    }
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data,
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );
    serde_json::to_value(response).expect("jsonrpc error response serialization")
}

/// Error envelope not tied to any request, always carrying `"id": null`.
pub fn detached_json_rpc_error(code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message
        },
        "id": null
    })
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        return serde_json::to_value(response).expect("jsonrpc result response serialization");
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bad_request_maps_to_invalid_params_with_data() {
        let value = app_error_to_json_rpc(
            Some(json!(7)),
            AppError::bad_request("invalid_operation", "operation is not supported"),
        );

        assert_eq!(value["id"], 7);
        assert_eq!(value["error"]["code"], INVALID_PARAMS);
        assert_eq!(value["error"]["data"]["code"], "invalid_operation");
    }

    #[test]
    fn detached_error_has_null_id() {
        let value = detached_json_rpc_error(SERVER_ERROR, "Method not allowed.");
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "error": { "code": -32000, "message": "Method not allowed." },
                "id": null
            })
        );
    }

    #[test]
    fn request_ids_round_trip_through_values() {
        let string_id = value_to_request_id(&json!("abc")).expect("string id");
        assert_eq!(request_id_to_value(string_id), json!("abc"));
        assert!(value_to_request_id(&json!(1.5)).is_none());
    }
}
