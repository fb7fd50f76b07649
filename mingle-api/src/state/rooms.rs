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

//! Room directory: room name to member connection IDs, join order preserved
//! so `room_users` listings are stable.

use super::session::{RoomId, SessionId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomId, Vec<SessionId>>,
}

impl RoomDirectory {
    /// Add a member; joining a room twice is a no-op.
    pub fn join(&mut self, room: &str, id: &SessionId) {
        let members = self.rooms.entry(room.to_string()).or_default();
        if !members.contains(id) {
            members.push(id.clone());
        }
    }

    /// Remove a member. Returns true if they were present. Empty rooms are
    /// dropped from the directory.
    pub fn leave(&mut self, room: &str, id: &SessionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let Some(pos) = members.iter().position(|m| m == id) else {
            return false;
        };
        members.remove(pos);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        true
    }

    /// Remove a member from every room they are in. Returns the rooms left.
    pub fn leave_all(&mut self, id: &SessionId) -> Vec<RoomId> {
        let rooms: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, members)| members.contains(id))
            .map(|(name, _)| name.clone())
            .collect();
        for room in &rooms {
            self.leave(room, id);
        }
        rooms
    }

    pub fn members(&self, room: &str) -> &[SessionId] {
        self.rooms.get(room).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_member(&self, room: &str, id: &SessionId) -> bool {
        self.members(room).contains(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoomId, &Vec<SessionId>)> {
        self.rooms.iter()
    }
}
