//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides protocol-level JSON-RPC validation, negotiation, formatting and
//! routing, plus the registry of open SSE sessions.

pub mod registry;
pub mod rpc;
pub mod server;
