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

//! Reaction store. Invariant: a user contributes at most one emoji per
//! message; picking a second one replaces the first.

use mingle_types::outbound::ReactionSummary;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct ReactionStore {
    // emoji keys in a BTreeMap so summaries come out in a stable order
    by_message: HashMap<String, BTreeMap<String, Vec<String>>>,
}

impl ReactionStore {
    /// Set `username`'s reaction on a message, replacing any previous emoji
    /// from the same user.
    pub fn add(&mut self, message_id: &str, emoji: &str, username: &str) {
        self.remove_user(message_id, username);
        self.by_message
            .entry(message_id.to_string())
            .or_default()
            .entry(emoji.to_string())
            .or_default()
            .push(username.to_string());
    }

    /// Remove a specific reaction. Returns false when the user had no such
    /// reaction (callers treat that as a silent no-op).
    pub fn remove(&mut self, message_id: &str, emoji: &str, username: &str) -> bool {
        let Some(per_emoji) = self.by_message.get_mut(message_id) else {
            return false;
        };
        let Some(users) = per_emoji.get_mut(emoji) else {
            return false;
        };
        let Some(pos) = users.iter().position(|u| u == username) else {
            return false;
        };
        users.remove(pos);
        if users.is_empty() {
            per_emoji.remove(emoji);
        }
        if per_emoji.is_empty() {
            self.by_message.remove(message_id);
        }
        true
    }

    /// Drop whatever reaction the user had on the message, if any.
    fn remove_user(&mut self, message_id: &str, username: &str) {
        let Some(per_emoji) = self.by_message.get_mut(message_id) else {
            return;
        };
        per_emoji.retain(|_, users| {
            users.retain(|u| u != username);
            !users.is_empty()
        });
        if per_emoji.is_empty() {
            self.by_message.remove(message_id);
        }
    }

    /// Drop all reactions for a deleted message.
    pub fn clear_message(&mut self, message_id: &str) {
        self.by_message.remove(message_id);
    }

    pub fn summary(&self, message_id: &str) -> Vec<ReactionSummary> {
        self.by_message
            .get(message_id)
            .map(|per_emoji| {
                per_emoji
                    .iter()
                    .map(|(emoji, users)| ReactionSummary {
                        emoji: emoji.clone(),
                        users: users.clone(),
                        count: users.len(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn reacted_message_count(&self) -> usize {
        self.by_message.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_reaction_replaces_the_first() {
        let mut store = ReactionStore::default();
        store.add("m1", "👍", "alice");
        store.add("m1", "❤️", "alice");
        let summary = store.summary("m1");
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].emoji, "❤️");
        assert_eq!(summary[0].users, vec!["alice".to_string()]);
    }

    #[test]
    fn users_accumulate_under_one_emoji() {
        let mut store = ReactionStore::default();
        store.add("m1", "👍", "alice");
        store.add("m1", "👍", "bob");
        let summary = store.summary("m1");
        assert_eq!(summary[0].count, 2);
    }

    #[test]
    fn remove_missing_reaction_is_a_no_op() {
        let mut store = ReactionStore::default();
        assert!(!store.remove("m1", "👍", "alice"));
        store.add("m1", "👍", "alice");
        assert!(!store.remove("m1", "❤️", "alice"));
        assert!(store.remove("m1", "👍", "alice"));
    }

    #[test]
    fn empty_maps_are_garbage_collected() {
        let mut store = ReactionStore::default();
        store.add("m1", "👍", "alice");
        store.remove("m1", "👍", "alice");
        assert_eq!(store.reacted_message_count(), 0);
        assert!(store.summary("m1").is_empty());
    }
}
