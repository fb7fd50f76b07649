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

//! Outbound event payloads, one struct per server-to-client event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionOptions {
    pub modes: Vec<&'static str>,
    pub message: &'static str,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            modes: vec!["chat_rooms", "stranger_chat"],
            message: "Choose your chat mode",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinSuccess {
    pub room: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomUser {
    pub username: String,
    pub id: String,
    #[serde(rename = "isOnline")]
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomUsers {
    pub room: String,
    pub users: Vec<RoomUser>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageEdited {
    pub message_id: String,
    pub new_content: String,
    pub edited_at: DateTime<Utc>,
    pub room: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDeleted {
    pub message_id: String,
    pub room: String,
    pub username: String,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionSummary {
    pub emoji: String,
    pub users: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionUpdated {
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub reactions: Vec<ReactionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserTyping {
    pub username: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub typing: bool,
    #[serde(rename = "isPrivate")]
    pub is_private: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrangerModeEntered {
    pub username: String,
    pub user_id: String,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchingStranger {
    pub interests: Vec<String>,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrangerFound {
    pub message: &'static str,
    pub room_id: String,
    pub partner_id: String,
    pub can_video_chat: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrangerDisconnected {
    pub message: &'static str,
}

impl Default for StrangerDisconnected {
    fn default() -> Self {
        Self {
            message: "Stranger has disconnected",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IncomingVideoCall {
    pub caller_id: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoCallInitiated {
    pub room_id: String,
    pub partner_id: String,
    pub initiator: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoCallAccepted {
    pub room_id: String,
    pub initiator: String,
    pub partner: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoCallRejected {
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoCallEnded {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncomingPrivateVideoCall {
    pub caller_id: String,
    pub caller_username: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrivateVideoCallInitiated {
    pub room_id: String,
    pub partner_id: String,
    pub partner_username: String,
    pub initiator: String,
}

/// Forwarded WebRTC signal: the opaque blob under its original key plus the
/// sender's connection ID.
#[derive(Debug, Clone, Serialize)]
pub struct SignalForward {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Value>,
    pub from: String,
}
