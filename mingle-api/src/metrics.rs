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

//! Centralized Prometheus metrics for the mingle API

use lazy_static::lazy_static;
use prometheus::{register_counter, register_gauge, Counter, Encoder, Gauge, TextEncoder};

lazy_static! {
    /// Currently connected sessions
    pub static ref CONNECTED_SESSIONS: Gauge = register_gauge!(
        "mingle_connected_sessions",
        "Number of currently connected sessions"
    )
    .expect("Failed to create connected_sessions metric");

    /// Sessions currently searching for a stranger
    pub static ref SEARCHING_SESSIONS: Gauge = register_gauge!(
        "mingle_searching_sessions",
        "Number of sessions searching for a stranger"
    )
    .expect("Failed to create searching_sessions metric");

    /// Active stranger pairings
    pub static ref ACTIVE_PAIRS: Gauge = register_gauge!(
        "mingle_active_pairs",
        "Number of active stranger pairings"
    )
    .expect("Failed to create active_pairs metric");

    /// Active video calls (stranger and private)
    pub static ref ACTIVE_CALLS: Gauge = register_gauge!(
        "mingle_active_calls",
        "Number of active video calls"
    )
    .expect("Failed to create active_calls metric");

    /// Total inbound client events routed
    pub static ref INBOUND_EVENTS_TOTAL: Counter = register_counter!(
        "mingle_inbound_events_total",
        "Total number of inbound client events routed"
    )
    .expect("Failed to create inbound_events_total metric");

    /// Total chat messages accepted (room, private and stranger)
    pub static ref MESSAGES_TOTAL: Counter = register_counter!(
        "mingle_messages_total",
        "Total number of chat messages accepted"
    )
    .expect("Failed to create messages_total metric");
}

/// Render the default registry in Prometheus text exposition format.
pub fn render() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metric_families, &mut buffer) {
        tracing::error!("failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
