//! Caller identity forwarded by the host platform
//!
//! The Blocklet service in front of this server authenticates users and
//! forwards the result as `x-user-*` headers. This module turns those headers
//! into an [`Identity`] attached to the request extensions.

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};

pub const USER_DID_HEADER: &str = "x-user-did";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_FULL_NAME_HEADER: &str = "x-user-fullname";
pub const USER_PROVIDER_HEADER: &str = "x-user-provider";
pub const USER_WALLET_OS_HEADER: &str = "x-user-wallet-os";
pub const USER_METHOD_HEADER: &str = "x-user-method";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub did: String,
    pub role: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub provider: String,
    #[serde(rename = "walletOS")]
    pub wallet_os: String,
    /// Authentication method, when the platform reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Identity of the caller for the current request, `None` when unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<Identity>);

impl Identity {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let did = header_value(headers, USER_DID_HEADER)?;

        Some(Self {
            did,
            role: header_value(headers, USER_ROLE_HEADER).unwrap_or_default(),
            full_name: header_value(headers, USER_FULL_NAME_HEADER).unwrap_or_default(),
            provider: header_value(headers, USER_PROVIDER_HEADER).unwrap_or_default(),
            wallet_os: header_value(headers, USER_WALLET_OS_HEADER).unwrap_or_default(),
            method: header_value(headers, USER_METHOD_HEADER),
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub async fn attach_caller_identity(mut request: Request, next: Next) -> Response {
    let identity = Identity::from_headers(request.headers());
    request.extensions_mut().insert(Caller(identity));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::*;

    #[test]
    fn reads_identity_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_DID_HEADER, HeaderValue::from_static("z1alice"));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("admin"));
        headers.insert(USER_PROVIDER_HEADER, HeaderValue::from_static("wallet"));
        headers.insert(USER_WALLET_OS_HEADER, HeaderValue::from_static("ios"));

        let identity = Identity::from_headers(&headers).expect("identity present");
        assert_eq!(identity.did, "z1alice");
        assert_eq!(identity.role, "admin");
        assert_eq!(identity.provider, "wallet");
        assert_eq!(identity.wallet_os, "ios");
        assert!(identity.full_name.is_empty());
        assert!(identity.method.is_none());
    }

    #[test]
    fn blank_did_is_unauthenticated() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_DID_HEADER, HeaderValue::from_static("   "));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("admin"));

        assert!(Identity::from_headers(&headers).is_none());
    }

    #[test]
    fn serializes_with_platform_field_names() {
        let identity = Identity {
            did: "z1bob".to_string(),
            role: "member".to_string(),
            full_name: "Bob".to_string(),
            provider: "wallet".to_string(),
            wallet_os: "android".to_string(),
            method: None,
        };

        let value = serde_json::to_value(&identity).expect("identity serialization");
        assert_eq!(value["fullName"], "Bob");
        assert_eq!(value["walletOS"], "android");
        assert!(value.get("method").is_none());
    }
}
