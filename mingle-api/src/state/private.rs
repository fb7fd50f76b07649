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
 */

//! Append-only log of private conversations, keyed by the ordered pair of
//! connection IDs so both directions land in the same bucket.

use mingle_types::PrivateMessage;
use std::collections::HashMap;

/// Canonical key for an unordered session pair.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}_{b}")
    } else {
        format!("{b}_{a}")
    }
}

#[derive(Debug, Default)]
pub struct PrivateLog {
    conversations: HashMap<String, Vec<PrivateMessage>>,
}

impl PrivateLog {
    pub fn append(&mut self, a: &str, b: &str, msg: PrivateMessage) {
        self.conversations
            .entry(pair_key(a, b))
            .or_default()
            .push(msg);
    }

    pub fn history(&self, a: &str, b: &str) -> &[PrivateMessage] {
        self.conversations
            .get(&pair_key(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}
