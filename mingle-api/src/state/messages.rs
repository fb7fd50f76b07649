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

//! In-memory message store with per-room insertion order, plus the
//! millisecond ticker behind every generated message ID.

use chrono::Utc;
use mingle_types::{ChatMessage, MessageKind};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    NotFound,
    NotAuthor,
    NotEditable,
}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageError::NotFound => write!(f, "Message not found"),
            MessageError::NotAuthor => write!(f, "Not the author of this message"),
            MessageError::NotEditable => write!(f, "File messages cannot be edited"),
        }
    }
}

impl std::error::Error for MessageError {}

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: HashMap<String, ChatMessage>,
    room_order: HashMap<String, Vec<String>>,
    last_tick: u64,
}

impl MessageStore {
    /// Millisecond tick used in message IDs. Strictly increasing across the
    /// process so IDs are unique even when two messages land in the same
    /// wall-clock millisecond.
    pub fn next_tick(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let tick = now.max(self.last_tick + 1);
        self.last_tick = tick;
        tick
    }

    pub fn insert(&mut self, msg: ChatMessage) {
        self.room_order
            .entry(msg.room.clone())
            .or_default()
            .push(msg.id.clone());
        self.messages.insert(msg.id.clone(), msg);
    }

    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.get(id)
    }

    /// Mutate a message's content. Only the author may edit and only plain
    /// chat messages are editable.
    pub fn edit(
        &mut self,
        id: &str,
        editor: &str,
        new_content: &str,
    ) -> Result<&ChatMessage, MessageError> {
        let msg = self.messages.get_mut(id).ok_or(MessageError::NotFound)?;
        if msg.username != editor {
            return Err(MessageError::NotAuthor);
        }
        if msg.kind != MessageKind::Message {
            return Err(MessageError::NotEditable);
        }
        msg.content = new_content.trim().to_string();
        msg.edited = true;
        msg.edited_at = Some(Utc::now());
        Ok(msg)
    }

    /// Remove a message. Only the author may delete; file messages are
    /// deletable (unlike edit).
    pub fn delete(&mut self, id: &str, editor: &str) -> Result<ChatMessage, MessageError> {
        let msg = self.messages.get(id).ok_or(MessageError::NotFound)?;
        if msg.username != editor {
            return Err(MessageError::NotAuthor);
        }
        let msg = self
            .messages
            .remove(id)
            .ok_or(MessageError::NotFound)?;
        if let Some(order) = self.room_order.get_mut(&msg.room) {
            order.retain(|m| m != id);
            if order.is_empty() {
                self.room_order.remove(&msg.room);
            }
        }
        Ok(msg)
    }

    /// Last `limit` messages of a room, oldest first.
    pub fn recent(&self, room: &str, limit: usize) -> Vec<&ChatMessage> {
        let Some(order) = self.room_order.get(room) else {
            return Vec::new();
        };
        let skip = order.len().saturating_sub(limit);
        order
            .iter()
            .skip(skip)
            .filter_map(|id| self.messages.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
