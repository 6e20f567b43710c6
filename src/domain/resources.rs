//! Model Context Protocol resources
//!
//! Serves the `document://{name}` and `echo://{message}` templates. Only the
//! getting-started document is enumerated by `resources/list`.

use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Value};

use crate::mcp::rpc::{
    json_rpc_error, json_rpc_error_with_data, json_rpc_result, INVALID_PARAMS, METHOD_NOT_FOUND,
};

pub const DOCUMENT_SCHEME: &str = "document://";
pub const ECHO_SCHEME: &str = "echo://";
pub const GETTING_STARTED_URI: &str = "document://getting-started";

pub fn build_resources_list() -> Vec<Resource> {
    vec![Resource {
        annotations: None,
        description: None,
        icons: vec![],
        meta: None,
        mime_type: None,
        name: "document-getting-started".to_string(),
        size: None,
        title: None,
        uri: GETTING_STARTED_URI.to_string(),
    }]
}

pub fn build_resource_templates_list() -> Value {
    json!({
        "resourceTemplates": [
            {
                "name": "document",
                "uriTemplate": "document://{name}"
            },
            {
                "name": "echo",
                "uriTemplate": "echo://{message}"
            }
        ]
    })
}

/// Text and mime type served for a resource URI, `None` for unknown URIs.
pub fn read_resource(uri: &str) -> Option<(String, Option<&'static str>)> {
    if uri
        .strip_prefix(DOCUMENT_SCHEME)
        .is_some_and(|name| !name.is_empty())
    {
        return Some(("Getting Started".to_string(), Some("text/plain")));
    }

    uri.strip_prefix(ECHO_SCHEME)
        .filter(|message| !message.is_empty())
        .map(|message| (format!("Resource echo: {message}"), None))
}

pub fn handle_resources_read(id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    match read_resource(&resource_read.uri) {
        Some((text, mime_type)) => {
            let result = serde_json::to_value(ReadResourceResult {
                contents: vec![ReadResourceContent::from(TextResourceContents {
                    meta: None,
                    mime_type: mime_type.map(str::to_string),
                    text,
                    uri: resource_read.uri.clone(),
                })],
                meta: None,
            })
            .expect("read resource result serialization");

            json_rpc_result(id, result)
        }
        None => json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND,
            "Method not found",
            Some(json!({
                "code": "resource_not_found",
                "message": "unknown resource uri",
                "details": {
                    "uri": resource_read.uri,
                },
            })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lists_getting_started_document() {
        let resources = build_resources_list();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, GETTING_STARTED_URI);
    }

    #[test]
    fn reads_any_document_name() {
        let (text, mime_type) = read_resource("document://changelog").expect("document resource");
        assert_eq!(text, "Getting Started");
        assert_eq!(mime_type, Some("text/plain"));
    }

    #[test]
    fn echoes_message_resource() {
        let (text, _) = read_resource("echo://hello").expect("echo resource");
        assert_eq!(text, "Resource echo: hello");
        assert!(read_resource("echo://").is_none());
        assert!(read_resource("file:///etc/passwd").is_none());
    }

    #[test]
    fn read_returns_contents_with_requested_uri() {
        let response = handle_resources_read(
            Some(json!(4)),
            Some(json!({ "uri": GETTING_STARTED_URI })),
        );

        assert_eq!(response["result"]["contents"][0]["uri"], GETTING_STARTED_URI);
        assert_eq!(response["result"]["contents"][0]["text"], "Getting Started");
        assert_eq!(response["result"]["contents"][0]["mimeType"], "text/plain");
    }

    #[test]
    fn unknown_uri_is_reported() {
        let response = handle_resources_read(Some(json!(5)), Some(json!({ "uri": "db://users" })));
        assert_eq!(response["error"]["data"]["code"], "resource_not_found");
    }
}
