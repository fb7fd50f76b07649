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

//! Message data model shared by the store, the socket layer and the HTTP
//! surface. Field names follow the wire protocol (camelCase where clients
//! expect it), so these structs serialize straight into outbound frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    File,
    System,
    Private,
    StrangerMessage,
}

/// Attachment descriptor. Produced by the upload endpoint and echoed back by
/// clients on `send_message`/`send_file_message`; every field is optional so
/// a partial descriptor from a client still round-trips.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Reference to the message a reply points at. `content` is a preview,
/// truncated by the server before storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyTo {
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub username: String,
    pub content: String,
}

/// A room-scoped message: regular chat, file attachment, system notice or
/// stranger-pair traffic. Broadcast verbatim as the `message` /
/// `stranger_message` event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub username: String,
    pub room: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileInfo>,
    #[serde(rename = "replyTo", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTo>,
    #[serde(default)]
    pub edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

/// A directed message between two sessions. Delivered to the recipient as-is
/// and echoed back to the sender with `fromSelf: true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub from: String,
    #[serde(rename = "fromId")]
    pub from_id: String,
    pub to: String,
    #[serde(rename = "toId")]
    pub to_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "fromSelf", skip_serializing_if = "Option::is_none")]
    pub from_self: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_uses_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&MessageKind::StrangerMessage).unwrap(),
            "\"stranger_message\""
        );
        assert_eq!(serde_json::to_string(&MessageKind::File).unwrap(), "\"file\"");
    }

    #[test]
    fn chat_message_serializes_wire_field_names() {
        let msg = ChatMessage {
            id: "abc_1".into(),
            kind: MessageKind::Message,
            content: "hi".into(),
            username: "Alice".into(),
            room: "lobby".into(),
            timestamp: Utc::now(),
            user_id: "abc".into(),
            file: None,
            reply_to: None,
            edited: false,
            edited_at: None,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "message");
        assert_eq!(v["userId"], "abc");
        assert!(v.get("file").is_none());
        assert!(v.get("replyTo").is_none());
    }
}
