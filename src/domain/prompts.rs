//! Model Context Protocol prompts
//!
//! A single `echo` prompt that wraps the caller's message in a user turn.

use rust_mcp_sdk::schema::{
    ContentBlock, GetPromptRequestParams, GetPromptResult, Prompt, PromptArgument,
    PromptMessage, Role, TextContent,
};
use serde_json::{json, Value};

use crate::mcp::rpc::{json_rpc_error, json_rpc_error_with_data, json_rpc_result, INVALID_PARAMS};

pub const ECHO_PROMPT: &str = "echo";

pub fn build_prompts_list() -> Vec<Prompt> {
    vec![Prompt {
        arguments: vec![PromptArgument {
            description: None,
            name: "message".to_string(),
            required: Some(true),
            title: None,
        }],
        description: None,
        icons: vec![],
        meta: None,
        name: ECHO_PROMPT.to_string(),
        title: None,
    }]
}

pub fn echo_prompt(message: &str) -> GetPromptResult {
    GetPromptResult {
        description: None,
        messages: vec![PromptMessage {
            content: ContentBlock::from(TextContent::new(
                format!("Please process this message: {message}"),
                None,
                None,
            )),
            role: Role::User,
        }],
        meta: None,
    }
}

pub fn handle_prompts_get(id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let request: GetPromptRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    if request.name != ECHO_PROMPT {
        return json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": "prompt_not_found",
                "message": "unknown prompt name",
                "details": {
                    "name": request.name,
                },
            })),
        );
    }

    let Some(message) = request
        .arguments
        .as_ref()
        .and_then(|arguments| arguments.get("message"))
    else {
        return json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": "missing_argument",
                "message": "prompt argument is required",
                "details": {
                    "argument": "message",
                },
            })),
        );
    };

    json_rpc_result(
        id,
        serde_json::to_value(echo_prompt(message)).expect("get prompt result serialization"),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lists_echo_prompt_with_required_message() {
        let prompts = build_prompts_list();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].name, ECHO_PROMPT);
        assert_eq!(prompts[0].arguments[0].name, "message");
        assert_eq!(prompts[0].arguments[0].required, Some(true));
    }

    #[test]
    fn echo_prompt_wraps_message_in_user_turn() {
        let response = handle_prompts_get(
            Some(json!(1)),
            Some(json!({ "name": "echo", "arguments": { "message": "hi" } })),
        );

        assert_eq!(response["result"]["messages"][0]["role"], "user");
        assert_eq!(
            response["result"]["messages"][0]["content"]["text"],
            "Please process this message: hi"
        );
    }

    #[test]
    fn missing_message_is_invalid_params() {
        let response = handle_prompts_get(Some(json!(2)), Some(json!({ "name": "echo" })));
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["code"], "missing_argument");
    }

    #[test]
    fn unknown_prompt_is_reported() {
        let response = handle_prompts_get(
            Some(json!(3)),
            Some(json!({ "name": "summarize", "arguments": {} })),
        );
        assert_eq!(response["error"]["data"]["code"], "prompt_not_found");
    }
}
