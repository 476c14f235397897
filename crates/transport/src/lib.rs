//! `thermofleet-transport` -- WebSocket implementation of the device
//! channel seam.
//!
//! Devices expose a small JSON-RPC surface over a WebSocket endpoint.
//! [`WsTransport`] performs the connect + credential handshake and
//! hands back a channel that pairs request and response frames by id.
//! The frame shapes live in [`frames`].

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use thermofleet_core::types::Credentials;
use thermofleet_device::{DeviceChannel, Transport, TransportError};

use crate::frames::{AuthAck, AuthFrame, Request, Response};

pub mod frames;

/// Deadline for one request/response exchange on an open channel.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket connection factory for the whole fleet.
///
/// Stateless apart from tuning; one instance is shared by every
/// machine loop.
pub struct WsTransport {
    call_timeout: Duration,
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Override the per-call deadline on open channels.
    pub fn with_call_timeout(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    async fn handshake(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn DeviceChannel>, TransportError> {
        // A fresh client id per connection lets the device tell
        // reconnects apart.
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{address}/rpc?client={client_id}");

        let (mut ws, _response) =
            connect_async(&url)
                .await
                .map_err(|e| TransportError::Connect {
                    address: address.to_string(),
                    reason: e.to_string(),
                })?;

        let auth = serde_json::to_string(&AuthFrame {
            name: &credentials.name,
            key: &credentials.key,
        })
        .map_err(|e| TransportError::Connect {
            address: address.to_string(),
            reason: format!("encode auth frame: {e}"),
        })?;

        ws.send(Message::Text(auth))
            .await
            .map_err(|e| TransportError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        let ack = wait_for_auth_ack(&mut ws).await.map_err(|reason| {
            TransportError::Connect {
                address: address.to_string(),
                reason,
            }
        })?;

        if !ack.ok {
            return Err(TransportError::Connect {
                address: address.to_string(),
                reason: ack
                    .error
                    .unwrap_or_else(|| "credentials rejected".to_string()),
            });
        }

        tracing::info!(address, client_id = %client_id, "Device channel established");

        Ok(Box::new(WsChannel {
            ws,
            call_timeout: self.call_timeout,
            next_id: 0,
        }))
    }
}

/// Read frames until the device answers the credential frame.
async fn wait_for_auth_ack(ws: &mut WsStream) -> Result<AuthAck, String> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).map_err(|e| format!("malformed auth ack: {e}"));
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => {
                return Err("device closed the connection during handshake".to_string());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.to_string()),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(
        &self,
        address: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn DeviceChannel>, TransportError> {
        match tokio::time::timeout(timeout, self.handshake(address, credentials)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(TransportError::Connect {
                address: address.to_string(),
                reason: "handshake timed out".to_string(),
            }),
        }
    }
}

/// One authenticated WebSocket channel.
struct WsChannel {
    ws: WsStream,
    call_timeout: Duration,
    next_id: u64,
}

impl WsChannel {
    /// Send one request and wait for the response carrying its id,
    /// bounded by the call deadline. Stale responses from earlier
    /// timed-out calls are skipped.
    async fn request(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, TransportError> {
        self.next_id += 1;
        let id = self.next_id;
        let frame = encode_request(id, method, params)?;

        match tokio::time::timeout(self.call_timeout, exchange(&mut self.ws, id, frame)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(TransportError::Timeout),
        }
    }
}

fn encode_request(
    id: u64,
    method: &str,
    params: serde_json::Value,
) -> Result<String, TransportError> {
    serde_json::to_string(&Request { id, method, params })
        .map_err(|e| TransportError::Channel(format!("encode request: {e}")))
}

/// Send `frame` and read until the matching response arrives.
async fn exchange(
    ws: &mut WsStream,
    id: u64,
    frame: String,
) -> Result<Option<serde_json::Value>, TransportError> {
    ws.send(Message::Text(frame))
        .await
        .map_err(|e| TransportError::Channel(e.to_string()))?;

    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let response: Response = match serde_json::from_str(&text) {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(error = %e, raw = %text, "Malformed device frame, skipping");
                        continue;
                    }
                };
                if response.id != id {
                    tracing::debug!(
                        expected = id,
                        got = response.id,
                        "Stale response frame, skipping",
                    );
                    continue;
                }
                if response.ok {
                    return Ok(response.value);
                }
                return Err(TransportError::Rejected(
                    response
                        .error
                        .unwrap_or_else(|| "unspecified device error".to_string()),
                ));
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                // Handled automatically by tungstenite.
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::Channel(
                    "device closed the connection".to_string(),
                ));
            }
            Some(Ok(_)) => {
                // Binary / Frame -- ignore.
            }
            Some(Err(e)) => return Err(TransportError::Channel(e.to_string())),
        }
    }
}

#[async_trait]
impl DeviceChannel for WsChannel {
    async fn set_line(&mut self, line: &str, high: bool) -> Result<(), TransportError> {
        self.request("line.set", serde_json::json!({"line": line, "high": high}))
            .await?;
        Ok(())
    }

    async fn read_analog(&mut self, channel: &str) -> Result<i64, TransportError> {
        let value = self
            .request("analog.read", serde_json::json!({"channel": channel}))
            .await?;

        value
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| TransportError::Channel("non-integer analog value".to_string()))
    }

    async fn suspend(&mut self, duration: Duration) -> Result<(), TransportError> {
        self.next_id += 1;
        let id = self.next_id;
        let frame = encode_request(
            id,
            "power.sleep",
            serde_json::json!({"seconds": duration.as_secs()}),
        )?;

        // No per-call deadline here: the device drops the connection
        // once it accepts, and the session's supervising deadline is
        // what interprets the hang. A dropped connection therefore
        // parks instead of surfacing a channel error.
        match exchange(&mut self.ws, id, frame).await {
            Ok(_) => Ok(()),
            Err(TransportError::Rejected(reason)) => Err(TransportError::Rejected(reason)),
            Err(_dropped) => std::future::pending().await,
        }
    }

    async fn set_actuator(&mut self, name: &str, on: bool) -> Result<(), TransportError> {
        self.request("actuator.set", serde_json::json!({"name": name, "on": on}))
            .await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
