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

//! Stranger matchmaking: anonymous profiles, the FIFO waiting queues and the
//! symmetric pair registry.
//!
//! A session is always in exactly one of three positions here: queued
//! (general queue or one-or-more interest queues), paired, or idle. The
//! mutators below maintain that split; `debug_assert_invariants` checks it in
//! tests.

use super::session::SessionId;
use crate::constants::{ANON_ADJECTIVES, ANON_NOUNS};
use rand::Rng;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrangerStatus {
    /// In stranger mode but neither searching nor chatting.
    Connected,
    Searching,
    Chatting,
}

#[derive(Debug, Clone)]
pub struct StrangerProfile {
    pub username: String,
    pub status: StrangerStatus,
    pub interests: Vec<String>,
    pub partner: Option<SessionId>,
    pub in_video_call: bool,
}

/// Room name for a stranger pairing, identical from both sides.
pub fn stranger_room_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("stranger_{a}_{b}")
    } else {
        format!("stranger_{b}_{a}")
    }
}

/// `<Adjective><Noun><100..999>` from the fixed vocabularies.
pub fn generate_anonymous_username() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ANON_ADJECTIVES[rng.gen_range(0..ANON_ADJECTIVES.len())];
    let noun = ANON_NOUNS[rng.gen_range(0..ANON_NOUNS.len())];
    let suffix: u32 = rng.gen_range(100..1000);
    format!("{adjective}{noun}{suffix}")
}

#[derive(Debug, Default)]
pub struct StrangerChat {
    profiles: HashMap<SessionId, StrangerProfile>,
    waiting_queue: VecDeque<SessionId>,
    interest_queues: HashMap<String, VecDeque<SessionId>>,
    pairs: HashMap<SessionId, SessionId>,
}

impl StrangerChat {
    pub fn create_profile(&mut self, id: &SessionId, username: String) {
        self.profiles.insert(
            id.clone(),
            StrangerProfile {
                username,
                status: StrangerStatus::Connected,
                interests: Vec::new(),
                partner: None,
                in_video_call: false,
            },
        );
    }

    pub fn profile(&self, id: &SessionId) -> Option<&StrangerProfile> {
        self.profiles.get(id)
    }

    pub fn profile_mut(&mut self, id: &SessionId) -> Option<&mut StrangerProfile> {
        self.profiles.get_mut(id)
    }

    pub fn remove_profile(&mut self, id: &SessionId) -> Option<StrangerProfile> {
        self.profiles.remove(id)
    }

    pub fn partner_of(&self, id: &SessionId) -> Option<&SessionId> {
        self.pairs.get(id)
    }

    pub fn is_paired(&self, id: &SessionId) -> bool {
        self.pairs.contains_key(id)
    }

    /// Drop a session from the general queue and every interest queue.
    pub fn remove_from_queues(&mut self, id: &SessionId) {
        self.waiting_queue.retain(|s| s != id);
        self.interest_queues.retain(|_, q| {
            q.retain(|s| s != id);
            !q.is_empty()
        });
    }

    /// Park a searcher: into each declared interest queue, or the general
    /// queue when no interests were given. A searcher with several interests
    /// sits in all of those queues at once.
    pub fn enqueue(&mut self, id: &SessionId, interests: &[String]) {
        if interests.is_empty() {
            self.waiting_queue.push_back(id.clone());
            return;
        }
        for interest in interests {
            self.interest_queues
                .entry(interest.clone())
                .or_default()
                .push_back(id.clone());
        }
    }

    /// Pairing algorithm: interest queues in the order the searcher listed
    /// them, then the general queue. Entries whose session vanished (or got
    /// paired by a race we lost) are discarded and the scan restarts.
    pub fn pop_candidate(&mut self, seeker: &SessionId, interests: &[String]) -> Option<SessionId> {
        loop {
            let candidate = self.pop_front_matching(interests)?;
            if candidate == *seeker {
                continue;
            }
            if self.profiles.contains_key(&candidate) && !self.is_paired(&candidate) {
                return Some(candidate);
            }
        }
    }

    fn pop_front_matching(&mut self, interests: &[String]) -> Option<SessionId> {
        for interest in interests {
            if let Some(queue) = self.interest_queues.get_mut(interest) {
                if let Some(id) = queue.pop_front() {
                    if queue.is_empty() {
                        self.interest_queues.remove(interest);
                    }
                    return Some(id);
                }
            }
        }
        self.waiting_queue.pop_front()
    }

    /// Symmetric pairing. Both parties are purged from every queue (a matched
    /// candidate may still sit in other interest queues) and both profiles
    /// switch to chatting.
    pub fn create_pair(&mut self, a: &SessionId, b: &SessionId) {
        self.remove_from_queues(a);
        self.remove_from_queues(b);
        self.pairs.insert(a.clone(), b.clone());
        self.pairs.insert(b.clone(), a.clone());
        if let Some(profile) = self.profiles.get_mut(a) {
            profile.status = StrangerStatus::Chatting;
            profile.partner = Some(b.clone());
        }
        if let Some(profile) = self.profiles.get_mut(b) {
            profile.status = StrangerStatus::Chatting;
            profile.partner = Some(a.clone());
        }
    }

    /// Tear down a pairing from either side. Returns the ex-partner so the
    /// caller can notify them. No-op when the session is not paired.
    pub fn unpair(&mut self, x: &SessionId) -> Option<SessionId> {
        let y = self.pairs.remove(x)?;
        self.pairs.remove(&y);
        for id in [x, &y] {
            if let Some(profile) = self.profiles.get_mut(id) {
                profile.status = StrangerStatus::Connected;
                profile.partner = None;
            }
        }
        Some(y)
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn searching_count(&self) -> usize {
        self.profiles
            .values()
            .filter(|p| p.status == StrangerStatus::Searching)
            .count()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len() / 2
    }

    pub fn waiting_general_count(&self) -> usize {
        self.waiting_queue.len()
    }

    pub fn waiting_interest_count(&self) -> usize {
        self.interest_queues.values().map(VecDeque::len).sum()
    }

    pub fn waiting_queue(&self) -> &VecDeque<SessionId> {
        &self.waiting_queue
    }

    pub fn interest_queues(&self) -> &HashMap<String, VecDeque<SessionId>> {
        &self.interest_queues
    }

    pub fn pairs(&self) -> &HashMap<SessionId, SessionId> {
        &self.pairs
    }

    /// Structural invariants: symmetric pairs, chatting-iff-paired, and no
    /// session both queued and paired.
    #[cfg(test)]
    pub fn debug_assert_invariants(&self) {
        for (a, b) in &self.pairs {
            assert_eq!(self.pairs.get(b), Some(a), "pairing must be symmetric");
            assert!(
                !self.waiting_queue.contains(a),
                "paired session {a} still in general queue"
            );
            assert!(
                self.interest_queues.values().all(|q| !q.contains(a)),
                "paired session {a} still in an interest queue"
            );
        }
        for (id, profile) in &self.profiles {
            let paired = self.pairs.contains_key(id);
            assert_eq!(
                profile.status == StrangerStatus::Chatting,
                paired,
                "status/pair mismatch for {id}"
            );
            assert_eq!(profile.partner.is_some(), paired);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SessionId {
        s.to_string()
    }

    fn chat_with_profiles(ids: &[&str]) -> StrangerChat {
        let mut chat = StrangerChat::default();
        for id in ids {
            chat.create_profile(&sid(id), format!("Anon{id}"));
        }
        chat
    }

    #[test]
    fn anonymous_usernames_follow_the_scheme() {
        for _ in 0..50 {
            let name = generate_anonymous_username();
            let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
            let n: u32 = digits.parse().unwrap();
            assert!((100..=999).contains(&n), "bad suffix in {name}");
            assert!(ANON_ADJECTIVES.iter().any(|a| name.starts_with(a)));
        }
    }

    #[test]
    fn stranger_room_id_is_symmetric() {
        assert_eq!(stranger_room_id("b", "a"), "stranger_a_b");
        assert_eq!(stranger_room_id("a", "b"), "stranger_a_b");
    }

    #[test]
    fn general_queue_is_fifo() {
        let mut chat = chat_with_profiles(&["u1", "u2", "u3"]);
        chat.enqueue(&sid("u1"), &[]);
        chat.enqueue(&sid("u2"), &[]);
        assert_eq!(chat.pop_candidate(&sid("u3"), &[]), Some(sid("u1")));
        assert_eq!(chat.pop_candidate(&sid("u3"), &[]), Some(sid("u2")));
        assert_eq!(chat.pop_candidate(&sid("u3"), &[]), None);
    }

    #[test]
    fn interest_queues_take_precedence_in_list_order() {
        let mut chat = chat_with_profiles(&["gen", "music", "sports", "seeker"]);
        chat.enqueue(&sid("gen"), &[]);
        chat.enqueue(&sid("music"), &["music".into()]);
        chat.enqueue(&sid("sports"), &["sports".into()]);
        // sports listed first wins over music and the general queue
        let got = chat.pop_candidate(&sid("seeker"), &["sports".into(), "music".into()]);
        assert_eq!(got, Some(sid("sports")));
    }

    #[test]
    fn falls_back_to_general_queue_when_no_interest_matches() {
        let mut chat = chat_with_profiles(&["gen", "seeker"]);
        chat.enqueue(&sid("gen"), &[]);
        let got = chat.pop_candidate(&sid("seeker"), &["music".into()]);
        assert_eq!(got, Some(sid("gen")));
    }

    #[test]
    fn dead_queue_entries_are_skipped() {
        let mut chat = chat_with_profiles(&["live", "seeker"]);
        // ghost was enqueued and then fully disconnected (profile gone)
        chat.waiting_queue.push_back(sid("ghost"));
        chat.enqueue(&sid("live"), &[]);
        assert_eq!(chat.pop_candidate(&sid("seeker"), &[]), Some(sid("live")));
    }

    #[test]
    fn create_pair_purges_all_queues_and_is_symmetric() {
        let mut chat = chat_with_profiles(&["a", "b"]);
        chat.enqueue(&sid("b"), &["music".into(), "sports".into()]);
        chat.create_pair(&sid("a"), &sid("b"));
        assert_eq!(chat.partner_of(&sid("a")), Some(&sid("b")));
        assert_eq!(chat.partner_of(&sid("b")), Some(&sid("a")));
        assert_eq!(chat.waiting_interest_count(), 0);
        assert_eq!(chat.profile(&sid("a")).unwrap().status, StrangerStatus::Chatting);
        chat.debug_assert_invariants();
    }

    #[test]
    fn unpair_resets_both_profiles() {
        let mut chat = chat_with_profiles(&["a", "b"]);
        chat.create_pair(&sid("a"), &sid("b"));
        assert_eq!(chat.unpair(&sid("a")), Some(sid("b")));
        assert_eq!(chat.unpair(&sid("a")), None);
        assert!(!chat.is_paired(&sid("b")));
        let b = chat.profile(&sid("b")).unwrap();
        assert_eq!(b.status, StrangerStatus::Connected);
        assert!(b.partner.is_none());
        chat.debug_assert_invariants();
    }

    #[test]
    fn multi_interest_searcher_sits_in_every_queue() {
        let mut chat = chat_with_profiles(&["a"]);
        chat.enqueue(&sid("a"), &["music".into(), "sports".into()]);
        assert_eq!(chat.waiting_interest_count(), 2);
        chat.remove_from_queues(&sid("a"));
        assert_eq!(chat.waiting_interest_count(), 0);
        assert!(chat.interest_queues().is_empty());
    }
}
