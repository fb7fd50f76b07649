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

//! Session registry: one record per live connection.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub type SessionId = String;
pub type RoomId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Regular,
    Stranger,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub mode: SessionMode,
    pub username: Option<String>,
    pub room: Option<RoomId>,
    pub joined: bool,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Session {
            id,
            mode: SessionMode::Regular,
            username: None,
            room: None,
            joined: false,
            connected_at: Utc::now(),
        }
    }

    /// Display name, falling back for sessions that never joined a room.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("Anonymous")
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    /// Register a fresh connection. Re-registering an existing ID resets the
    /// record, mirroring a reconnect that reused the ID.
    pub fn insert(&mut self, id: &SessionId) {
        self.sessions.insert(id.clone(), Session::new(id.clone()));
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn joined_count(&self) -> usize {
        self.sessions.values().filter(|s| s.joined).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_creates_unjoined_regular_session() {
        let mut reg = SessionRegistry::default();
        reg.insert(&"sid-1".to_string());
        let s = reg.get(&"sid-1".to_string()).unwrap();
        assert_eq!(s.mode, SessionMode::Regular);
        assert!(!s.joined);
        assert!(s.username.is_none());
        assert!(s.room.is_none());
        assert_eq!(s.display_name(), "Anonymous");
    }

    #[test]
    fn remove_clears_the_record() {
        let mut reg = SessionRegistry::default();
        reg.insert(&"sid-1".to_string());
        assert!(reg.contains(&"sid-1".to_string()));
        reg.remove(&"sid-1".to_string());
        assert!(!reg.contains(&"sid-1".to_string()));
        assert!(reg.is_empty());
    }
}
