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

//! End-to-end transition scenarios, driven straight through the router.
//! Assertions run against the collected outbound events, the same list the
//! chat server actor fans out to the sockets.

use mingle_api::state::{ChatState, Outbound, SessionId, Target};
use serde_json::{json, Value};

fn sid(s: &str) -> SessionId {
    s.to_string()
}

/// First outbound event with this name.
fn find<'a>(out: &'a [Outbound], event: &str) -> Option<&'a Outbound> {
    out.iter().find(|o| o.event == event)
}

fn all<'a>(out: &'a [Outbound], event: &str) -> Vec<&'a Outbound> {
    out.iter().filter(|o| o.event == event).collect()
}

/// First outbound event with this name addressed to one connection.
fn to_conn<'a>(out: &'a [Outbound], event: &str, conn: &str) -> Option<&'a Outbound> {
    out.iter()
        .find(|o| o.event == event && o.target == Target::Conn(sid(conn)))
}

fn room_target(o: &Outbound) -> Option<(&str, Option<&str>)> {
    match &o.target {
        Target::Room { room, skip } => Some((room.as_str(), skip.as_deref())),
        Target::Conn(_) => None,
    }
}

fn join(state: &mut ChatState, conn: &str, username: &str, room: &str) -> Vec<Outbound> {
    state.dispatch(
        &sid(conn),
        "join_room",
        json!({ "username": username, "room": room }),
    )
}

fn pair_up(state: &mut ChatState, a: &str, b: &str) -> String {
    state.connect(&sid(a));
    state.connect(&sid(b));
    state.dispatch(&sid(a), "enter_stranger_mode", Value::Null);
    state.dispatch(&sid(b), "enter_stranger_mode", Value::Null);
    let out = state.dispatch(&sid(a), "find_stranger", json!({}));
    assert!(find(&out, "searching_stranger").is_some());
    let out = state.dispatch(&sid(b), "find_stranger", json!({}));
    let found = to_conn(&out, "stranger_found", b).expect("pair should form");
    found.data["room_id"].as_str().unwrap().to_string()
}

// S1: room join + broadcast.
#[test]
fn join_room_greets_and_broadcasts() {
    let mut state = ChatState::new();
    let out = state.connect(&sid("A1"));
    assert_eq!(out[0].event, "connection_options");

    let out = join(&mut state, "A1", "Alice", "lobby");

    let success = to_conn(&out, "join_success", "A1").unwrap();
    assert_eq!(success.data["room"], "lobby");
    assert_eq!(success.data["username"], "Alice");

    let welcome = to_conn(&out, "message", "A1").unwrap();
    assert_eq!(welcome.data["type"], "system");
    assert_eq!(welcome.data["content"], "Welcome to lobby, Alice!");

    let announce = all(&out, "message")
        .into_iter()
        .find(|o| room_target(o).is_some())
        .unwrap();
    assert_eq!(announce.data["content"], "Alice joined the chat");
    assert_eq!(room_target(announce), Some(("lobby", Some("A1"))));

    let users = find(&out, "room_users").unwrap();
    assert_eq!(users.data["count"], 1);
    assert_eq!(users.data["users"][0]["username"], "Alice");
    assert_eq!(users.data["users"][0]["isOnline"], true);
}

// join_room is idempotent per session.
#[test]
fn duplicate_join_is_a_no_op() {
    let mut state = ChatState::new();
    state.connect(&sid("A1"));
    join(&mut state, "A1", "Alice", "lobby");
    let out = join(&mut state, "A1", "Alice", "other");
    assert!(out.is_empty());
    // the session stayed in its original room
    assert_eq!(state.room_members("lobby"), &[sid("A1")]);
    assert!(state.room_members("other").is_empty());
}

// S2: edit own message; others are rejected.
#[test]
fn only_the_author_may_edit() {
    let mut state = ChatState::new();
    state.connect(&sid("A1"));
    state.connect(&sid("B1"));
    join(&mut state, "A1", "Alice", "lobby");
    join(&mut state, "B1", "Bob", "lobby");

    let out = state.dispatch(&sid("A1"), "send_message", json!({ "message": "hi" }));
    let msg = find(&out, "message").unwrap();
    let message_id = msg.data["id"].as_str().unwrap().to_string();
    assert_eq!(msg.data["content"], "hi");
    assert_eq!(msg.data["edited"], false);

    let out = state.dispatch(
        &sid("A1"),
        "edit_message",
        json!({ "message_id": message_id, "new_content": "hello" }),
    );
    let edited = find(&out, "message_edited").unwrap();
    assert_eq!(edited.data["new_content"], "hello");
    assert_eq!(edited.data["message_id"], message_id.as_str());
    assert!(edited.data["edited_at"].is_string());
    assert_eq!(room_target(edited), Some(("lobby", None)));

    let out = state.dispatch(
        &sid("B1"),
        "edit_message",
        json!({ "message_id": message_id, "new_content": "x" }),
    );
    let err = to_conn(&out, "error", "B1").unwrap();
    assert_eq!(err.data["message"], "You can only edit your own messages");
}

// S3: interest-based matchmaking pairs across the searcher's interest order.
#[test]
fn interest_match_beats_the_general_queue() {
    let mut state = ChatState::new();
    for id in ["U1", "U2"] {
        state.connect(&sid(id));
        state.dispatch(&sid(id), "enter_stranger_mode", Value::Null);
    }

    let out = state.dispatch(&sid("U1"), "find_stranger", json!({ "interests": ["music"] }));
    let searching = to_conn(&out, "searching_stranger", "U1").unwrap();
    assert_eq!(searching.data["interests"][0], "music");

    let out = state.dispatch(
        &sid("U2"),
        "find_stranger",
        json!({ "interests": ["sports", "music"] }),
    );
    let found_u2 = to_conn(&out, "stranger_found", "U2").unwrap();
    let found_u1 = to_conn(&out, "stranger_found", "U1").unwrap();
    assert_eq!(found_u2.data["partner_id"], "U1");
    assert_eq!(found_u1.data["partner_id"], "U2");
    assert_eq!(found_u2.data["room_id"], "stranger_U1_U2");
    assert_eq!(found_u2.data["can_video_chat"], true);
    assert_eq!(state.pair_count(), 1);

    // both sit in the pair room now
    let mut members = state.room_members("stranger_U1_U2").to_vec();
    members.sort();
    assert_eq!(members, vec![sid("U1"), sid("U2")]);
}

// S4: skip unpairs, notifies the partner and immediately re-matches.
#[test]
fn skip_cascades_to_the_next_waiting_stranger() {
    let mut state = ChatState::new();
    pair_up(&mut state, "U1", "U2");

    state.connect(&sid("U3"));
    state.dispatch(&sid("U3"), "enter_stranger_mode", Value::Null);
    let out = state.dispatch(&sid("U3"), "find_stranger", json!({}));
    assert!(find(&out, "searching_stranger").is_some());

    let out = state.dispatch(&sid("U1"), "skip_stranger", json!({}));
    assert!(to_conn(&out, "stranger_disconnected", "U2").is_some());
    let found = to_conn(&out, "stranger_found", "U1").unwrap();
    assert_eq!(found.data["partner_id"], "U3");
    assert!(to_conn(&out, "stranger_found", "U3").is_some());
    assert_eq!(state.pair_count(), 1);
}

#[test]
fn skip_with_nobody_waiting_goes_back_to_searching() {
    let mut state = ChatState::new();
    pair_up(&mut state, "U1", "U2");

    let out = state.dispatch(&sid("U1"), "skip_stranger", json!({}));
    assert!(to_conn(&out, "stranger_disconnected", "U2").is_some());
    assert!(to_conn(&out, "searching_stranger", "U1").is_some());
    assert_eq!(state.pair_count(), 0);
}

// S5: an accepted call outlives the text pairing; signaling still routes.
#[test]
fn video_call_survives_text_unpair() {
    let mut state = ChatState::new();
    let room_id = pair_up(&mut state, "U1", "U2");

    let out = state.dispatch(&sid("U1"), "start_video_call", Value::Null);
    let incoming = to_conn(&out, "incoming_video_call", "U2").unwrap();
    assert_eq!(incoming.data["caller_id"], "U1");
    assert_eq!(incoming.data["room_id"], room_id.as_str());
    assert!(to_conn(&out, "video_call_initiated", "U1").is_some());

    let out = state.dispatch(&sid("U2"), "accept_video_call", json!({ "room_id": room_id }));
    assert_eq!(all(&out, "video_call_accepted").len(), 2);
    assert_eq!(state.call_count(), 1);

    // text pairing breaks, the call record stays
    let out = state.dispatch(&sid("U1"), "skip_stranger", json!({}));
    assert!(to_conn(&out, "stranger_disconnected", "U2").is_some());
    assert_eq!(state.pair_count(), 0);
    assert_eq!(state.call_count(), 1);

    // ICE candidates still reach the old partner via the call registry
    let out = state.dispatch(
        &sid("U1"),
        "webrtc_ice_candidate",
        json!({ "candidate": { "sdpMid": "0" } }),
    );
    let fwd = to_conn(&out, "webrtc_ice_candidate", "U2").unwrap();
    assert_eq!(fwd.data["from"], "U1");
    assert_eq!(fwd.data["candidate"]["sdpMid"], "0");

    // explicit end tears the call down for both sides
    let out = state.dispatch(&sid("U2"), "end_video_call", json!({ "room_id": room_id }));
    assert_eq!(all(&out, "video_call_ended").len(), 2);
    assert_eq!(state.call_count(), 0);
}

// S6: disconnect cleans the pairing, the call and the partner's flags.
#[test]
fn disconnect_cleans_up_pairing_and_call() {
    let mut state = ChatState::new();
    let room_id = pair_up(&mut state, "U1", "U2");
    state.dispatch(&sid("U1"), "start_video_call", Value::Null);
    state.dispatch(&sid("U2"), "accept_video_call", json!({ "room_id": room_id }));

    let out = state.disconnect(&sid("U1"));
    assert!(to_conn(&out, "stranger_disconnected", "U2").is_some());
    assert!(to_conn(&out, "video_call_ended", "U2").is_some());

    assert_eq!(state.pair_count(), 0);
    assert_eq!(state.call_count(), 0);
    assert!(state.debug_user(&sid("U1")).is_none());

    let u2 = state.debug_user(&sid("U2")).unwrap();
    assert_eq!(u2["stranger"]["status"], "connected");
    assert!(u2["stranger"]["partner"].is_null());
    assert_eq!(u2["stranger"]["in_video_call"], false);
}

// A matched candidate is purged from every interest queue they were in.
#[test]
fn pairing_purges_the_candidate_from_other_queues() {
    let mut state = ChatState::new();
    for id in ["U1", "U2", "U3"] {
        state.connect(&sid(id));
        state.dispatch(&sid(id), "enter_stranger_mode", Value::Null);
    }

    state.dispatch(
        &sid("U1"),
        "find_stranger",
        json!({ "interests": ["music", "sports"] }),
    );
    let out = state.dispatch(&sid("U2"), "find_stranger", json!({ "interests": ["music"] }));
    assert!(to_conn(&out, "stranger_found", "U2").is_some());

    // U1 left the sports queue when it got paired, so U3 keeps searching
    let out = state.dispatch(&sid("U3"), "find_stranger", json!({ "interests": ["sports"] }));
    assert!(to_conn(&out, "searching_stranger", "U3").is_some());
    assert_eq!(state.pair_count(), 1);
}

#[test]
fn disconnect_removes_the_searcher_from_queues() {
    let mut state = ChatState::new();
    for id in ["U1", "U2", "U3"] {
        state.connect(&sid(id));
        state.dispatch(&sid(id), "enter_stranger_mode", Value::Null);
    }
    state.dispatch(&sid("U1"), "find_stranger", json!({}));
    state.dispatch(&sid("U2"), "find_stranger", json!({}));
    // U1 and U2 paired immediately; skipping parks U1 in the queue again
    state.dispatch(&sid("U1"), "skip_stranger", json!({}));
    state.disconnect(&sid("U1"));

    let out = state.dispatch(&sid("U3"), "find_stranger", json!({}));
    // U1's queue entry went with the disconnect, so U3 cannot be paired
    // with a dead session
    assert!(to_conn(&out, "stranger_found", "U3").is_none());
    assert!(to_conn(&out, "searching_stranger", "U3").is_some());
}

// Reactions: one emoji per user per message, silent no-op removals.
#[test]
fn reaction_flow_enforces_one_emoji_per_user() {
    let mut state = ChatState::new();
    state.connect(&sid("A1"));
    join(&mut state, "A1", "Alice", "lobby");
    let out = state.dispatch(&sid("A1"), "send_message", json!({ "message": "react to me" }));
    let message_id = find(&out, "message").unwrap().data["id"]
        .as_str()
        .unwrap()
        .to_string();

    let out = state.dispatch(
        &sid("A1"),
        "add_reaction",
        json!({ "messageId": message_id, "emoji": "👍", "room": "lobby" }),
    );
    let updated = find(&out, "reaction_updated").unwrap();
    assert_eq!(updated.data["reactions"][0]["emoji"], "👍");

    let out = state.dispatch(
        &sid("A1"),
        "add_reaction",
        json!({ "messageId": message_id, "emoji": "🎉", "room": "lobby" }),
    );
    let reactions = &find(&out, "reaction_updated").unwrap().data["reactions"];
    assert_eq!(reactions.as_array().unwrap().len(), 1);
    assert_eq!(reactions[0]["emoji"], "🎉");
    assert_eq!(reactions[0]["users"][0], "Alice");

    // removing an emoji that is not set emits nothing
    let out = state.dispatch(
        &sid("A1"),
        "remove_reaction",
        json!({ "messageId": message_id, "emoji": "👍", "room": "lobby" }),
    );
    assert!(out.is_empty());

    let out = state.dispatch(
        &sid("A1"),
        "remove_reaction",
        json!({ "messageId": message_id, "emoji": "🎉", "room": "lobby" }),
    );
    let reactions = &find(&out, "reaction_updated").unwrap().data["reactions"];
    assert!(reactions.as_array().unwrap().is_empty());
}

// Private messages are logged, delivered and echoed with fromSelf.
#[test]
fn private_message_reaches_recipient_and_echoes() {
    let mut state = ChatState::new();
    state.connect(&sid("A1"));
    state.connect(&sid("B1"));
    join(&mut state, "A1", "Alice", "lobby");
    join(&mut state, "B1", "Bob", "lobby");

    let out = state.dispatch(
        &sid("A1"),
        "private_message",
        json!({ "to": "B1", "message": "psst" }),
    );
    let delivered = to_conn(&out, "private_message", "B1").unwrap();
    assert_eq!(delivered.data["from"], "Alice");
    assert_eq!(delivered.data["to"], "Bob");
    assert!(delivered.data.get("fromSelf").is_none());

    let echo = to_conn(&out, "private_message", "A1").unwrap();
    assert_eq!(echo.data["fromSelf"], true);
    assert_eq!(echo.data["content"], "psst");

    let out = state.dispatch(
        &sid("A1"),
        "private_message",
        json!({ "to": "ghost", "message": "psst" }),
    );
    assert_eq!(to_conn(&out, "error", "A1").unwrap().data["message"], "User not found");
}

// Replies carry a truncated preview of the original.
#[test]
fn reply_preview_is_truncated() {
    let mut state = ChatState::new();
    state.connect(&sid("A1"));
    join(&mut state, "A1", "Alice", "lobby");

    let long = "a".repeat(80);
    let out = state.dispatch(
        &sid("A1"),
        "send_reply",
        json!({
            "replyToId": "orig_1",
            "replyToUsername": "Bob",
            "replyToContent": long,
            "message": "agreed"
        }),
    );
    let msg = find(&out, "message").unwrap();
    assert!(msg.data["id"].as_str().unwrap().starts_with("reply_A1_"));
    let preview = msg.data["replyTo"]["content"].as_str().unwrap();
    assert_eq!(preview.chars().count(), 51);
    assert!(preview.ends_with('…'));
    assert_eq!(msg.data["replyTo"]["username"], "Bob");
}

// Call setup errors distinguish "searching" from "idle".
#[test]
fn start_video_call_errors_reflect_stranger_state() {
    let mut state = ChatState::new();
    state.connect(&sid("U1"));

    let out = state.dispatch(&sid("U1"), "start_video_call", Value::Null);
    assert_eq!(
        to_conn(&out, "error", "U1").unwrap().data["message"],
        "You must enter stranger mode first"
    );

    state.dispatch(&sid("U1"), "enter_stranger_mode", Value::Null);
    let out = state.dispatch(&sid("U1"), "start_video_call", Value::Null);
    assert_eq!(
        to_conn(&out, "error", "U1").unwrap().data["message"],
        "No stranger connected"
    );

    state.dispatch(&sid("U1"), "find_stranger", json!({}));
    let out = state.dispatch(&sid("U1"), "start_video_call", Value::Null);
    assert_eq!(
        to_conn(&out, "error", "U1").unwrap().data["message"],
        "Still searching for a stranger"
    );
}

// Private calls between two regular sessions, full lifecycle.
#[test]
fn private_call_lifecycle() {
    let mut state = ChatState::new();
    state.connect(&sid("A1"));
    state.connect(&sid("B1"));
    join(&mut state, "A1", "Alice", "lobby");
    join(&mut state, "B1", "Bob", "lobby");

    let out = state.dispatch(
        &sid("A1"),
        "start_private_video_call",
        json!({ "target_user_id": "B1" }),
    );
    let incoming = to_conn(&out, "incoming_private_video_call", "B1").unwrap();
    assert_eq!(incoming.data["caller_username"], "Alice");
    let room_id = incoming.data["room_id"].as_str().unwrap().to_string();
    assert_eq!(room_id, "private_call_A1_B1");
    let initiated = to_conn(&out, "private_video_call_initiated", "A1").unwrap();
    assert_eq!(initiated.data["partner_username"], "Bob");

    let out = state.dispatch(
        &sid("B1"),
        "accept_private_video_call",
        json!({ "room_id": room_id }),
    );
    assert_eq!(all(&out, "private_video_call_accepted").len(), 2);

    // offer routes through the call registry (no stranger pairing here)
    let out = state.dispatch(&sid("A1"), "webrtc_offer", json!({ "offer": { "sdp": "v=0" } }));
    let fwd = to_conn(&out, "webrtc_offer", "B1").unwrap();
    assert_eq!(fwd.data["offer"]["sdp"], "v=0");

    let out = state.dispatch(
        &sid("A1"),
        "end_private_video_call",
        json!({ "room_id": room_id }),
    );
    assert_eq!(all(&out, "private_video_call_ended").len(), 2);
    assert_eq!(state.call_count(), 0);
}

#[test]
fn rejected_call_notifies_only_the_initiator() {
    let mut state = ChatState::new();
    let room_id = pair_up(&mut state, "U1", "U2");
    state.dispatch(&sid("U1"), "start_video_call", Value::Null);

    let out = state.dispatch(&sid("U2"), "reject_video_call", json!({ "room_id": room_id }));
    let rejected = all(&out, "video_call_rejected");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].target, Target::Conn(sid("U1")));
    assert_eq!(state.call_count(), 0);

    // the text pairing is untouched by a rejected call
    assert_eq!(state.pair_count(), 1);
}

#[test]
fn offers_without_a_route_error_but_ice_is_dropped() {
    let mut state = ChatState::new();
    state.connect(&sid("U1"));

    let out = state.dispatch(&sid("U1"), "webrtc_offer", json!({ "offer": {} }));
    assert_eq!(
        to_conn(&out, "error", "U1").unwrap().data["message"],
        "No active connection for signaling"
    );

    let out = state.dispatch(&sid("U1"), "webrtc_ice_candidate", json!({ "candidate": {} }));
    assert!(out.is_empty());
}

// Leaving a room announces the departure to the remaining members.
#[test]
fn disconnect_announces_room_departure() {
    let mut state = ChatState::new();
    state.connect(&sid("A1"));
    state.connect(&sid("B1"));
    join(&mut state, "A1", "Alice", "lobby");
    join(&mut state, "B1", "Bob", "lobby");

    let out = state.disconnect(&sid("A1"));
    let left = find(&out, "message").unwrap();
    assert_eq!(left.data["content"], "Alice left the chat");
    let users = find(&out, "room_users").unwrap();
    assert_eq!(users.data["count"], 1);
    assert_eq!(users.data["users"][0]["username"], "Bob");
    assert_eq!(state.room_members("lobby"), &[sid("B1")]);
}
