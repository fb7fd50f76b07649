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

//! Inbound request records.
//!
//! Clients are loose about payload shapes: the room may arrive as `room`,
//! `roomId` or `roomName`, message bodies as `message`, `content` or `text`.
//! Every record keeps each alias as its own optional field and exposes an
//! accessor that applies the documented precedence, so the router never
//! touches raw JSON keys.

use crate::message::FileInfo;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JoinRoomRequest {
    pub username: Option<String>,
    pub user: Option<String>,
    pub room: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
    #[serde(rename = "roomName")]
    pub room_name: Option<String>,
}

impl JoinRoomRequest {
    pub fn username(&self) -> &str {
        self.username
            .as_deref()
            .or(self.user.as_deref())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or("Anonymous")
    }

    pub fn room(&self) -> Option<&str> {
        self.room
            .as_deref()
            .or(self.room_id.as_deref())
            .or(self.room_name.as_deref())
            .filter(|r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SendMessageRequest {
    pub message: Option<String>,
    pub content: Option<String>,
    pub text: Option<String>,
    pub file: Option<FileInfo>,
    #[serde(rename = "fileInfo")]
    pub file_info: Option<FileInfo>,
}

impl SendMessageRequest {
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.content.as_deref())
            .or(self.text.as_deref())
    }

    pub fn file(&self) -> Option<&FileInfo> {
        self.file_info.as_ref().or(self.file.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditMessageRequest {
    pub message_id: Option<String>,
    pub new_content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteMessageRequest {
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SendReplyRequest {
    #[serde(rename = "replyToId")]
    pub reply_to_id: Option<String>,
    #[serde(rename = "replyToUsername")]
    pub reply_to_username: Option<String>,
    #[serde(rename = "replyToContent")]
    pub reply_to_content: Option<String>,
    pub message: Option<String>,
    pub content: Option<String>,
    pub text: Option<String>,
}

impl SendReplyRequest {
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.content.as_deref())
            .or(self.text.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SendFileMessageRequest {
    pub file: Option<FileInfo>,
    #[serde(rename = "fileInfo")]
    pub file_info: Option<FileInfo>,
    pub message: Option<String>,
}

impl SendFileMessageRequest {
    pub fn file(&self) -> Option<&FileInfo> {
        self.file.as_ref().or(self.file_info.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrivateMessageRequest {
    pub to: Option<String>,
    #[serde(rename = "toUserId")]
    pub to_user_id: Option<String>,
    pub message: Option<String>,
    pub content: Option<String>,
}

impl PrivateMessageRequest {
    pub fn to(&self) -> Option<&str> {
        self.to.as_deref().or(self.to_user_id.as_deref())
    }

    pub fn content(&self) -> Option<&str> {
        self.message.as_deref().or(self.content.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReactionRequest {
    #[serde(rename = "messageId")]
    pub message_id: Option<String>,
    pub emoji: Option<String>,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TypingRequest {
    #[serde(rename = "isPrivate")]
    pub is_private: bool,
    #[serde(rename = "targetUserId")]
    pub target_user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FindStrangerRequest {
    pub interests: Option<Vec<String>>,
}

impl FindStrangerRequest {
    /// Declared interests with blanks dropped, preserving client order.
    pub fn interests(&self) -> Vec<String> {
        self.interests
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrangerMessageRequest {
    pub message: Option<String>,
    pub content: Option<String>,
    pub text: Option<String>,
}

impl StrangerMessageRequest {
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.content.as_deref())
            .or(self.text.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallRoomRequest {
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartPrivateCallRequest {
    pub target_user_id: Option<String>,
}

/// Opaque WebRTC signaling payload. The server never inspects the blob, it
/// only picks the right field off the frame and forwards it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignalRequest {
    pub offer: Option<Value>,
    pub answer: Option<Value>,
    pub candidate: Option<Value>,
}
