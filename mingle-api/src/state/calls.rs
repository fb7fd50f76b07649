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

//! Call registry, shared by stranger and private video calls. A call record
//! exists from `calling` until it is accepted (`active`) and is removed on
//! end, reject or participant disconnect; a call outlives the text pairing it
//! started from.

use super::session::SessionId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Stranger,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Calling,
    Active,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub room_id: String,
    pub initiator: SessionId,
    pub partner: SessionId,
    pub status: CallStatus,
    pub kind: CallKind,
    pub created_at: DateTime<Utc>,
}

impl Call {
    pub fn involves(&self, id: &SessionId) -> bool {
        &self.initiator == id || &self.partner == id
    }

    pub fn other_party(&self, id: &SessionId) -> &SessionId {
        if &self.initiator == id {
            &self.partner
        } else {
            &self.initiator
        }
    }
}

/// Room name for a private call between two regular sessions.
pub fn private_call_room_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("private_call_{a}_{b}")
    } else {
        format!("private_call_{b}_{a}")
    }
}

#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: HashMap<String, Call>,
}

impl CallRegistry {
    /// Insert a call, replacing any previous record under the same room.
    pub fn start(&mut self, initiator: &SessionId, partner: &SessionId, room_id: &str, kind: CallKind) {
        self.calls.insert(
            room_id.to_string(),
            Call {
                room_id: room_id.to_string(),
                initiator: initiator.clone(),
                partner: partner.clone(),
                status: CallStatus::Calling,
                kind,
                created_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, room_id: &str) -> Option<&Call> {
        self.calls.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Call> {
        self.calls.get_mut(room_id)
    }

    pub fn remove(&mut self, room_id: &str) -> Option<Call> {
        self.calls.remove(room_id)
    }

    /// First call this session takes part in, if any. Used by the WebRTC
    /// relay when the text pairing is already gone.
    pub fn find_for(&self, id: &SessionId) -> Option<&Call> {
        self.calls.values().find(|c| c.involves(id))
    }

    /// Room IDs of every call involving the session (disconnect sweep).
    pub fn rooms_involving(&self, id: &SessionId) -> Vec<String> {
        self.calls
            .values()
            .filter(|c| c.involves(id))
            .map(|c| c.room_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Call> {
        self.calls.values()
    }
}
