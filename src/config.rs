use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

pub const DEFAULT_STORY_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_STORY_TIMEOUT_SECS: u64 = 60;

/// Transports the endpoint adapter can mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// `GET /mcp/sse` plus `POST /mcp/messages?sessionId=...`
    Sse,
    /// Stateless `POST /mcp`
    Streamable,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sse" => Ok(Self::Sse),
            "streamable" | "streamable-http" | "http" => Ok(Self::Streamable),
            _ => Err(ConfigError::InvalidTransports),
        }
    }
}

/// What the message endpoint answers when a POST names a session that is not
/// registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownSessionPolicy {
    /// 409 with `action: "reconnect"`
    #[default]
    Reconnect,
    /// plain 400
    Reject,
}

impl FromStr for UnknownSessionPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reconnect" => Ok(Self::Reconnect),
            "reject" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidUnknownSessionPolicy),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub mount_point: String,
    pub transports: Vec<TransportKind>,
    pub unknown_session: UnknownSessionPolicy,
    pub policy_file: Option<PathBuf>,
    pub anthropic_api_key: Option<String>,
    pub story_model: String,
    pub story_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BLOCKLET_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("MCP_TRANSPORTS must list at least one of: sse, streamable")]
    InvalidTransports,
    #[error("MCP_UNKNOWN_SESSION must be one of: reconnect, reject")]
    InvalidUnknownSessionPolicy,
    #[error("MCP_STORY_TIMEOUT_SECS must be a positive integer")]
    InvalidStoryTimeout,
    #[error("failed to read policy file {path}")]
    PolicyFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("policy file {path} is not a valid policy map")]
    PolicyFileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = non_empty("BLOCKLET_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);
        let mount_point = normalize_mount_point(non_empty("BLOCKLET_COMPONENT_MOUNT_POINT"));

        let transports = match non_empty("MCP_TRANSPORTS") {
            Some(value) => parse_transports(&value)?,
            None => vec![TransportKind::Sse, TransportKind::Streamable],
        };

        let unknown_session = non_empty("MCP_UNKNOWN_SESSION")
            .map(|value| value.parse::<UnknownSessionPolicy>())
            .transpose()?
            .unwrap_or_default();

        let story_timeout = non_empty("MCP_STORY_TIMEOUT_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidStoryTimeout)
            })
            .transpose()?
            .unwrap_or(DEFAULT_STORY_TIMEOUT_SECS);

        let config = Self {
            bind_addr,
            bind_port,
            mount_point,
            transports,
            unknown_session,
            policy_file: non_empty("MCP_POLICY_FILE").map(PathBuf::from),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            story_model: non_empty("MCP_STORY_MODEL")
                .unwrap_or_else(|| DEFAULT_STORY_MODEL.to_string()),
            story_timeout: Duration::from_secs(story_timeout),
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }

    /// Public URL of the message endpoint as seen through the host's mount
    /// point, without the session query.
    pub fn message_endpoint(&self) -> String {
        format!("{}/mcp/messages", self.mount_point.trim_end_matches('/'))
    }
}

fn parse_transports(value: &str) -> Result<Vec<TransportKind>, ConfigError> {
    let mut transports = Vec::new();
    for item in value.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let kind = item.parse::<TransportKind>()?;
        if !transports.contains(&kind) {
            transports.push(kind);
        }
    }

    if transports.is_empty() {
        return Err(ConfigError::InvalidTransports);
    }
    Ok(transports)
}

fn normalize_mount_point(value: Option<String>) -> String {
    let Some(value) = value else {
        return "/".to_string();
    };

    let trimmed = value.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = config_from(&[]).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.mount_point, "/");
        assert_eq!(
            config.transports,
            vec![TransportKind::Sse, TransportKind::Streamable]
        );
        assert_eq!(config.unknown_session, UnknownSessionPolicy::Reconnect);
        assert!(config.anthropic_api_key.is_none());
        assert_eq!(config.story_model, DEFAULT_STORY_MODEL);
        assert_eq!(config.message_endpoint(), "/mcp/messages");
    }

    #[test]
    fn invalid_port_fails() {
        let err = config_from(&[("BLOCKLET_PORT", "70000")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn mount_point_prefixes_message_endpoint() {
        let config = config_from(&[("BLOCKLET_COMPONENT_MOUNT_POINT", "mcp-demo/")])
            .expect("config should parse");
        assert_eq!(config.mount_point, "/mcp-demo");
        assert_eq!(config.message_endpoint(), "/mcp-demo/mcp/messages");
    }

    #[test]
    fn transports_parse_and_deduplicate() {
        let config = config_from(&[("MCP_TRANSPORTS", " SSE , sse")]).expect("config should parse");
        assert_eq!(config.transports, vec![TransportKind::Sse]);
    }

    #[test]
    fn unknown_transport_fails() {
        let err = config_from(&[("MCP_TRANSPORTS", "websocket")])
            .expect_err("expected invalid transports");
        assert!(matches!(err, ConfigError::InvalidTransports));
    }

    #[test]
    fn unknown_session_policy_parses() {
        let config = config_from(&[("MCP_UNKNOWN_SESSION", "reject")]).expect("config should parse");
        assert_eq!(config.unknown_session, UnknownSessionPolicy::Reject);

        let err = config_from(&[("MCP_UNKNOWN_SESSION", "ignore")])
            .expect_err("expected invalid policy");
        assert!(matches!(err, ConfigError::InvalidUnknownSessionPolicy));
    }

    #[test]
    fn zero_story_timeout_fails() {
        let err = config_from(&[("MCP_STORY_TIMEOUT_SECS", "0")])
            .expect_err("expected invalid timeout");
        assert!(matches!(err, ConfigError::InvalidStoryTimeout));
    }
}
