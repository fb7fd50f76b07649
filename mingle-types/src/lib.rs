/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

pub mod events;
pub mod message;
pub mod outbound;

pub use message::{ChatMessage, FileInfo, MessageKind, PrivateMessage, ReplyTo};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Username attached to server-generated system messages (joins, leaves,
/// welcomes). This is not a real user and never appears in the session
/// registry.
pub const SYSTEM_USERNAME: &str = "System";

/// Wire envelope for client-to-server frames: `{"event": "...", "data": {...}}`.
///
/// `data` defaults to `Null` for events that carry no payload (`ping`,
/// `enter_stranger_mode`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Wire envelope for server-to-client frames, same shape as [`ClientEnvelope`].
#[derive(Debug, Clone, Serialize)]
pub struct ServerEnvelope<'a> {
    pub event: &'a str,
    pub data: Value,
}

impl<'a> ServerEnvelope<'a> {
    pub fn new(event: &'a str, data: Value) -> Self {
        Self { event, data }
    }

    /// Serialize to the JSON text that goes on the socket. Serialization of
    /// an envelope built from our own types cannot fail, so a fallback frame
    /// keeps the signature infallible.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"error","data":{"message":"internal error"}}"#.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_data_defaults_to_null() {
        let env: ClientEnvelope = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(env.event, "ping");
        assert!(env.data.is_null());
    }

    #[test]
    fn server_envelope_round_trips() {
        let env = ServerEnvelope::new("pong", json!({}));
        let frame = env.to_frame();
        let parsed: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["event"], "pong");
    }
}
