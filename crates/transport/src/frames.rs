//! JSON frames exchanged with a device over the WebSocket channel.
//!
//! The handshake is a single credential frame answered by an ack;
//! after that every exchange is one request frame answered by one
//! response frame carrying the same `id`.

use serde::{Deserialize, Serialize};

/// First frame sent after the WebSocket handshake.
#[derive(Debug, Serialize)]
pub struct AuthFrame<'a> {
    pub name: &'a str,
    pub key: &'a str,
}

/// Device's answer to the credential frame.
#[derive(Debug, Deserialize)]
pub struct AuthAck {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// One RPC request.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

/// One RPC response, correlated by `id`.
#[derive(Debug, Deserialize)]
pub struct Response {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}
