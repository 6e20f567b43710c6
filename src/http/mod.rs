//! HTTP Transport layer for the Model Context Protocol
//!
//! Mounts the SSE transport (`/mcp/sse` + `/mcp/messages`) and the stateless
//! streamable transport (`/mcp`) according to [`AdapterOptions`].

pub mod handlers;
pub mod sse;

use crate::config::{Config, TransportKind, UnknownSessionPolicy};

pub const SSE_PATH: &str = "/mcp/sse";
pub const MESSAGES_PATH: &str = "/mcp/messages";
pub const STREAMABLE_PATH: &str = "/mcp";

#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub transports: Vec<TransportKind>,
    pub unknown_session: UnknownSessionPolicy,
    /// Message URL advertised in the SSE `endpoint` event.
    pub message_endpoint: String,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            transports: vec![TransportKind::Sse, TransportKind::Streamable],
            unknown_session: UnknownSessionPolicy::default(),
            message_endpoint: MESSAGES_PATH.to_string(),
        }
    }
}

impl AdapterOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            transports: config.transports.clone(),
            unknown_session: config.unknown_session,
            message_endpoint: config.message_endpoint(),
        }
    }

    pub fn mounts(&self, kind: TransportKind) -> bool {
        self.transports.contains(&kind)
    }
}
