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

//! The chat core: one state container and the event router that drives it.
//!
//! Every inbound event is a non-suspending transition on [`ChatState`] that
//! returns the outbound events to deliver. Nothing in here touches a socket;
//! the chat server actor owns an instance, runs transitions one at a time off
//! its mailbox and fans the returned [`Outbound`] list out afterwards. That
//! split is what keeps the invariants intact under connect/disconnect storms:
//! a slow or dead recipient can never interleave with a transition.

pub mod calls;
pub mod messages;
pub mod private;
pub mod reactions;
pub mod rooms;
pub mod session;
pub mod stranger;

pub use session::{RoomId, SessionId};

use crate::constants::REPLY_PREVIEW_CHARS;
use calls::{private_call_room_id, CallKind, CallRegistry, CallStatus};
use chrono::Utc;
use messages::{MessageError, MessageStore};
use mingle_types::events::{
    CallRoomRequest, DeleteMessageRequest, EditMessageRequest, FindStrangerRequest,
    JoinRoomRequest, PrivateMessageRequest, ReactionRequest, SendFileMessageRequest,
    SendMessageRequest, SendReplyRequest, SignalRequest, StartPrivateCallRequest,
    StrangerMessageRequest, TypingRequest,
};
use mingle_types::outbound::{
    ConnectionOptions, ErrorPayload, IncomingPrivateVideoCall, IncomingVideoCall, JoinSuccess,
    MessageDeleted, MessageEdited, PrivateVideoCallInitiated, ReactionUpdated, RoomUser,
    RoomUsers, SearchingStranger, SignalForward, StrangerDisconnected, StrangerFound,
    StrangerModeEntered, UserTyping, VideoCallAccepted, VideoCallEnded, VideoCallInitiated,
    VideoCallRejected,
};
use mingle_types::{ChatMessage, FileInfo, MessageKind, PrivateMessage, ReplyTo, SYSTEM_USERNAME};
use private::PrivateLog;
use reactions::ReactionStore;
use rooms::RoomDirectory;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use session::{SessionMode, SessionRegistry};
use stranger::{generate_anonymous_username, stranger_room_id, StrangerChat, StrangerStatus};
use tracing::{debug, info};

/// Where an outbound event goes: a single connection or a logical room
/// (optionally excluding one member, for broadcasts that skip the sender).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Conn(SessionId),
    Room {
        room: RoomId,
        skip: Option<SessionId>,
    },
}

/// One event to deliver after a transition completes. Delivery is
/// best-effort; a vanished recipient is skipped, never an error.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub target: Target,
    pub event: &'static str,
    pub data: Value,
}

impl Outbound {
    fn to_conn(id: &SessionId, event: &'static str, data: impl Serialize) -> Self {
        Outbound {
            target: Target::Conn(id.clone()),
            event,
            data: payload(data),
        }
    }

    fn to_room(room: &str, skip: Option<SessionId>, event: &'static str, data: impl Serialize) -> Self {
        Outbound {
            target: Target::Room {
                room: room.to_string(),
                skip,
            },
            event,
            data: payload(data),
        }
    }
}

fn payload(data: impl Serialize) -> Value {
    serde_json::to_value(data).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, Copy)]
enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// The shared, concurrently mutated graph of users, rooms, pairings and
/// calls. All mutation goes through `connect`, `disconnect` and `dispatch`.
#[derive(Debug, Default)]
pub struct ChatState {
    sessions: SessionRegistry,
    rooms: RoomDirectory,
    messages: MessageStore,
    reactions: ReactionStore,
    private_log: PrivateLog,
    stranger: StrangerChat,
    calls: CallRegistry,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// New connection: register the session and offer the two chat modes.
    pub fn connect(&mut self, conn: &SessionId) -> Vec<Outbound> {
        info!(session = %conn, "client connected");
        self.sessions.insert(conn);
        vec![Outbound::to_conn(
            conn,
            "connection_options",
            ConnectionOptions::default(),
        )]
    }

    /// Full teardown for a gone connection. Idempotent: every step tolerates
    /// the state it cleans already being absent.
    pub fn disconnect(&mut self, conn: &SessionId) -> Vec<Outbound> {
        info!(session = %conn, "client disconnected");
        let mut out = Vec::new();

        // Regular room: announce the leave and refresh the member list.
        if let Some(session) = self.sessions.get(conn) {
            if let (Some(username), Some(room)) = (session.username.clone(), session.room.clone()) {
                if self.rooms.leave(&room, conn) {
                    let sys = self.system_message(&room, format!("{username} left the chat"));
                    out.push(Outbound::to_room(&room, None, "message", sys));
                    self.push_room_users(&room, &mut out);
                }
            }
        }

        // Stranger pairing: the partner goes back to idle.
        if let Some(partner) = self.stranger.unpair(conn) {
            self.leave_pair_room(conn, &partner);
            out.push(Outbound::to_conn(
                &partner,
                "stranger_disconnected",
                StrangerDisconnected::default(),
            ));
        }

        // Matchmaking queues and the profile itself.
        self.stranger.remove_from_queues(conn);
        self.stranger.remove_profile(conn);

        // Calls: behave exactly like an explicit end from this side.
        for room_id in self.calls.rooms_involving(conn) {
            if let Some(call) = self.calls.remove(&room_id) {
                let other = call.other_party(conn).clone();
                if call.kind == CallKind::Stranger {
                    if let Some(profile) = self.stranger.profile_mut(&other) {
                        profile.in_video_call = false;
                    }
                }
                let event = match call.kind {
                    CallKind::Stranger => "video_call_ended",
                    CallKind::Private => "private_video_call_ended",
                };
                out.push(Outbound::to_conn(
                    &other,
                    event,
                    VideoCallEnded { room_id },
                ));
            }
        }

        // Whatever membership is left (stranger pair rooms and the like).
        self.rooms.leave_all(conn);
        self.sessions.remove(conn);
        out
    }

    /// Route one inbound event. Unknown sessions are rejected up front;
    /// validation failures produce an `error` to the source and abort the
    /// transition before any state changes.
    pub fn dispatch(&mut self, conn: &SessionId, event: &str, data: Value) -> Vec<Outbound> {
        let mut out = Vec::new();
        if !self.sessions.contains(conn) {
            out.push(Self::error(conn, "User session not found"));
            return out;
        }
        let data = if data.is_null() { json!({}) } else { data };
        debug!(session = %conn, event, "dispatch");

        match event {
            "join_room" => {
                if let Some(req) = Self::parse::<JoinRoomRequest>(conn, data, &mut out) {
                    self.join_room(conn, req, &mut out);
                }
            }
            "send_message" => {
                if let Some(req) = Self::parse::<SendMessageRequest>(conn, data, &mut out) {
                    self.send_message(conn, req, &mut out);
                }
            }
            "send_file_message" => {
                if let Some(req) = Self::parse::<SendFileMessageRequest>(conn, data, &mut out) {
                    self.send_file_message(conn, req, &mut out);
                }
            }
            "send_reply" => {
                if let Some(req) = Self::parse::<SendReplyRequest>(conn, data, &mut out) {
                    self.send_reply(conn, req, &mut out);
                }
            }
            "edit_message" => {
                if let Some(req) = Self::parse::<EditMessageRequest>(conn, data, &mut out) {
                    self.edit_message(conn, req, &mut out);
                }
            }
            "delete_message" => {
                if let Some(req) = Self::parse::<DeleteMessageRequest>(conn, data, &mut out) {
                    self.delete_message(conn, req, &mut out);
                }
            }
            "private_message" => {
                if let Some(req) = Self::parse::<PrivateMessageRequest>(conn, data, &mut out) {
                    self.private_message(conn, req, &mut out);
                }
            }
            "add_reaction" => {
                if let Some(req) = Self::parse::<ReactionRequest>(conn, data, &mut out) {
                    self.add_reaction(conn, req, &mut out);
                }
            }
            "remove_reaction" => {
                if let Some(req) = Self::parse::<ReactionRequest>(conn, data, &mut out) {
                    self.remove_reaction(conn, req, &mut out);
                }
            }
            "typing_start" => {
                if let Some(req) = Self::parse::<TypingRequest>(conn, data, &mut out) {
                    self.typing(conn, req, true, &mut out);
                }
            }
            "typing_stop" => {
                if let Some(req) = Self::parse::<TypingRequest>(conn, data, &mut out) {
                    self.typing(conn, req, false, &mut out);
                }
            }
            "enter_stranger_mode" => self.enter_stranger_mode(conn, &mut out),
            // skip_stranger is find_stranger with an implicit unpair, and
            // find_stranger already unpairs a paired searcher first.
            "find_stranger" | "skip_stranger" => {
                if let Some(req) = Self::parse::<FindStrangerRequest>(conn, data, &mut out) {
                    self.find_stranger(conn, req, &mut out);
                }
            }
            "send_stranger_message" => {
                if let Some(req) = Self::parse::<StrangerMessageRequest>(conn, data, &mut out) {
                    self.send_stranger_message(conn, req, &mut out);
                }
            }
            "start_video_call" => self.start_video_call(conn, &mut out),
            "accept_video_call" => {
                if let Some(req) = Self::parse::<CallRoomRequest>(conn, data, &mut out) {
                    self.accept_call(conn, req, CallKind::Stranger, &mut out);
                }
            }
            "reject_video_call" => {
                if let Some(req) = Self::parse::<CallRoomRequest>(conn, data, &mut out) {
                    self.reject_call(conn, req, CallKind::Stranger, &mut out);
                }
            }
            "end_video_call" => {
                if let Some(req) = Self::parse::<CallRoomRequest>(conn, data, &mut out) {
                    self.end_call(conn, req, CallKind::Stranger, &mut out);
                }
            }
            "start_private_video_call" => {
                if let Some(req) = Self::parse::<StartPrivateCallRequest>(conn, data, &mut out) {
                    self.start_private_video_call(conn, req, &mut out);
                }
            }
            "accept_private_video_call" => {
                if let Some(req) = Self::parse::<CallRoomRequest>(conn, data, &mut out) {
                    self.accept_call(conn, req, CallKind::Private, &mut out);
                }
            }
            "reject_private_video_call" => {
                if let Some(req) = Self::parse::<CallRoomRequest>(conn, data, &mut out) {
                    self.reject_call(conn, req, CallKind::Private, &mut out);
                }
            }
            "end_private_video_call" => {
                if let Some(req) = Self::parse::<CallRoomRequest>(conn, data, &mut out) {
                    self.end_call(conn, req, CallKind::Private, &mut out);
                }
            }
            "webrtc_offer" => {
                if let Some(req) = Self::parse::<SignalRequest>(conn, data, &mut out) {
                    self.relay_signal(conn, SignalKind::Offer, req, &mut out);
                }
            }
            "webrtc_answer" => {
                if let Some(req) = Self::parse::<SignalRequest>(conn, data, &mut out) {
                    self.relay_signal(conn, SignalKind::Answer, req, &mut out);
                }
            }
            "webrtc_ice_candidate" => {
                if let Some(req) = Self::parse::<SignalRequest>(conn, data, &mut out) {
                    self.relay_signal(conn, SignalKind::IceCandidate, req, &mut out);
                }
            }
            "ping" => out.push(Outbound::to_conn(conn, "pong", json!({}))),
            unknown => out.push(Self::error(conn, format!("Unknown event: {unknown}"))),
        }
        out
    }

    // ---- regular chat -----------------------------------------------------

    fn join_room(&mut self, conn: &SessionId, req: JoinRoomRequest, out: &mut Vec<Outbound>) {
        match self.sessions.get(conn) {
            Some(session) if session.joined => {
                debug!(session = %conn, "duplicate join ignored");
                return;
            }
            Some(_) => {}
            None => return,
        }
        let Some(room) = req.room().map(str::to_string) else {
            out.push(Self::error(conn, "Room is required"));
            return;
        };
        let username = req.username().to_string();

        if let Some(session) = self.sessions.get_mut(conn) {
            session.joined = true;
            session.mode = SessionMode::Regular;
            session.username = Some(username.clone());
            session.room = Some(room.clone());
        }
        self.rooms.join(&room, conn);
        info!(session = %conn, room = %room, username = %username, "joined room");

        out.push(Outbound::to_conn(
            conn,
            "join_success",
            JoinSuccess {
                room: room.clone(),
                username: username.clone(),
            },
        ));
        let welcome = self.system_message(&room, format!("Welcome to {room}, {username}!"));
        out.push(Outbound::to_conn(conn, "message", welcome));
        let announce = self.system_message(&room, format!("{username} joined the chat"));
        out.push(Outbound::to_room(&room, Some(conn.clone()), "message", announce));
        self.push_room_users(&room, out);
    }

    fn send_message(&mut self, conn: &SessionId, req: SendMessageRequest, out: &mut Vec<Outbound>) {
        let (username, room) = match self.joined_room(conn) {
            Ok(v) => v,
            Err(e) => {
                out.push(Self::error(conn, e));
                return;
            }
        };
        let content = req.content().map(str::trim).unwrap_or("").to_string();
        let file = req.file().cloned();
        if content.is_empty() && file.is_none() {
            out.push(Self::error(conn, "Message content is required"));
            return;
        }
        let msg = self.build_room_message(conn, &username, &room, content, file, None);
        self.messages.insert(msg.clone());
        out.push(Outbound::to_room(&room, None, "message", msg));
    }

    fn send_file_message(
        &mut self,
        conn: &SessionId,
        req: SendFileMessageRequest,
        out: &mut Vec<Outbound>,
    ) {
        let (username, room) = match self.joined_room(conn) {
            Ok(v) => v,
            Err(e) => {
                out.push(Self::error(conn, e));
                return;
            }
        };
        let Some(file) = req.file().cloned() else {
            out.push(Self::error(conn, "File is required"));
            return;
        };
        let content = req.message.as_deref().map(str::trim).unwrap_or("").to_string();
        let msg = self.build_room_message(conn, &username, &room, content, Some(file), None);
        self.messages.insert(msg.clone());
        out.push(Outbound::to_room(&room, None, "message", msg));
    }

    fn send_reply(&mut self, conn: &SessionId, req: SendReplyRequest, out: &mut Vec<Outbound>) {
        let (username, room) = match self.joined_room(conn) {
            Ok(v) => v,
            Err(e) => {
                out.push(Self::error(conn, e));
                return;
            }
        };
        let content = req.content().map(str::trim).unwrap_or("").to_string();
        if content.is_empty() {
            out.push(Self::error(conn, "Message content is required"));
            return;
        }
        let (Some(reply_id), Some(reply_username), Some(reply_content)) = (
            req.reply_to_id.clone(),
            req.reply_to_username.clone(),
            req.reply_to_content.clone(),
        ) else {
            out.push(Self::error(conn, "Reply target is required"));
            return;
        };
        let reply_to = ReplyTo {
            message_id: reply_id,
            username: reply_username,
            content: truncate_preview(&reply_content),
        };
        let tick = self.messages.next_tick();
        let msg = ChatMessage {
            id: format!("reply_{conn}_{tick}"),
            kind: MessageKind::Message,
            content,
            username,
            room: room.clone(),
            timestamp: Utc::now(),
            user_id: conn.clone(),
            file: None,
            reply_to: Some(reply_to),
            edited: false,
            edited_at: None,
        };
        self.messages.insert(msg.clone());
        out.push(Outbound::to_room(&room, None, "message", msg));
    }

    fn edit_message(&mut self, conn: &SessionId, req: EditMessageRequest, out: &mut Vec<Outbound>) {
        let Some(username) = self.sessions.get(conn).and_then(|s| s.username.clone()) else {
            out.push(Self::error(conn, "You must join a room first"));
            return;
        };
        let (Some(message_id), Some(new_content)) = (req.message_id, req.new_content) else {
            out.push(Self::error(conn, "Message id and new content are required"));
            return;
        };
        if new_content.trim().is_empty() {
            out.push(Self::error(conn, "Message content is required"));
            return;
        }
        match self.messages.edit(&message_id, &username, &new_content) {
            Ok(msg) => {
                let room = msg.room.clone();
                let edited = MessageEdited {
                    message_id,
                    new_content: msg.content.clone(),
                    edited_at: msg.edited_at.unwrap_or_else(Utc::now),
                    room: room.clone(),
                    username,
                };
                out.push(Outbound::to_room(&room, None, "message_edited", edited));
            }
            Err(e) => out.push(Self::error(conn, Self::edit_error_text(e, true))),
        }
    }

    fn delete_message(
        &mut self,
        conn: &SessionId,
        req: DeleteMessageRequest,
        out: &mut Vec<Outbound>,
    ) {
        let Some(username) = self.sessions.get(conn).and_then(|s| s.username.clone()) else {
            out.push(Self::error(conn, "You must join a room first"));
            return;
        };
        let Some(message_id) = req.message_id else {
            out.push(Self::error(conn, "Message id is required"));
            return;
        };
        match self.messages.delete(&message_id, &username) {
            Ok(msg) => {
                self.reactions.clear_message(&message_id);
                let deleted = MessageDeleted {
                    message_id,
                    room: msg.room.clone(),
                    username,
                    deleted_at: Utc::now(),
                };
                out.push(Outbound::to_room(&msg.room, None, "message_deleted", deleted));
            }
            Err(e) => out.push(Self::error(conn, Self::edit_error_text(e, false))),
        }
    }

    fn private_message(
        &mut self,
        conn: &SessionId,
        req: PrivateMessageRequest,
        out: &mut Vec<Outbound>,
    ) {
        let Some(to) = req.to().map(str::to_string) else {
            out.push(Self::error(conn, "Target user is required"));
            return;
        };
        let Some(content) = req.content().map(str::trim).filter(|c| !c.is_empty()) else {
            out.push(Self::error(conn, "Message content is required"));
            return;
        };
        let content = content.to_string();
        let Some(to_name) = self.sessions.get(&to).map(|s| s.display_name().to_string()) else {
            out.push(Self::error(conn, "User not found"));
            return;
        };
        let from_name = self
            .sessions
            .get(conn)
            .map(|s| s.display_name().to_string())
            .unwrap_or_else(|| "Anonymous".to_string());

        let tick = self.messages.next_tick();
        let msg = PrivateMessage {
            id: format!("private_{conn}_{tick}"),
            kind: MessageKind::Private,
            content,
            from: from_name,
            from_id: conn.clone(),
            to: to_name,
            to_id: to.clone(),
            timestamp: Utc::now(),
            from_self: None,
        };
        self.private_log.append(conn, &to, msg.clone());

        out.push(Outbound::to_conn(&to, "private_message", msg.clone()));
        let mut echo = msg;
        echo.from_self = Some(true);
        out.push(Outbound::to_conn(conn, "private_message", echo));
    }

    fn typing(&mut self, conn: &SessionId, req: TypingRequest, typing: bool, out: &mut Vec<Outbound>) {
        let Some(session) = self.sessions.get(conn) else {
            return;
        };
        let username = session.display_name().to_string();
        let joined_room = session.room.clone().filter(|_| session.joined);

        if req.is_private {
            let Some(target) = req.target_user_id else {
                out.push(Self::error(conn, "Target user is required"));
                return;
            };
            // a vanished target is a silent drop, like any other stale emit
            if !self.sessions.contains(&target) {
                return;
            }
            out.push(Outbound::to_conn(
                &target,
                "user_typing",
                UserTyping {
                    username,
                    user_id: conn.clone(),
                    typing,
                    is_private: true,
                },
            ));
        } else {
            let Some(room) = joined_room else {
                out.push(Self::error(conn, "You must join a room first"));
                return;
            };
            out.push(Outbound::to_room(
                &room,
                Some(conn.clone()),
                "user_typing",
                UserTyping {
                    username,
                    user_id: conn.clone(),
                    typing,
                    is_private: false,
                },
            ));
        }
    }

    fn add_reaction(&mut self, conn: &SessionId, req: ReactionRequest, out: &mut Vec<Outbound>) {
        let Some(username) = self.sessions.get(conn).and_then(|s| s.username.clone()) else {
            out.push(Self::error(conn, "You must join a room first"));
            return;
        };
        let (Some(message_id), Some(emoji)) = (req.message_id, req.emoji) else {
            out.push(Self::error(conn, "Message id and emoji are required"));
            return;
        };
        let Some(room) = self.messages.get(&message_id).map(|m| m.room.clone()) else {
            out.push(Self::error(conn, "Message not found"));
            return;
        };
        self.reactions.add(&message_id, &emoji, &username);
        self.push_reactions(&message_id, &room, out);
    }

    fn remove_reaction(&mut self, conn: &SessionId, req: ReactionRequest, out: &mut Vec<Outbound>) {
        let Some(username) = self.sessions.get(conn).and_then(|s| s.username.clone()) else {
            out.push(Self::error(conn, "You must join a room first"));
            return;
        };
        let (Some(message_id), Some(emoji)) = (req.message_id, req.emoji) else {
            out.push(Self::error(conn, "Message id and emoji are required"));
            return;
        };
        let Some(room) = self.messages.get(&message_id).map(|m| m.room.clone()) else {
            out.push(Self::error(conn, "Message not found"));
            return;
        };
        // removing a reaction that never existed is a silent no-op
        if !self.reactions.remove(&message_id, &emoji, &username) {
            return;
        }
        self.push_reactions(&message_id, &room, out);
    }

    // ---- stranger matchmaking ---------------------------------------------

    fn enter_stranger_mode(&mut self, conn: &SessionId, out: &mut Vec<Outbound>) {
        if self.stranger.profile(conn).is_none() {
            let username = generate_anonymous_username();
            info!(session = %conn, username = %username, "entered stranger mode");
            self.stranger.create_profile(conn, username);
        }
        if let Some(session) = self.sessions.get_mut(conn) {
            session.mode = SessionMode::Stranger;
        }
        let username = self
            .stranger
            .profile(conn)
            .map(|p| p.username.clone())
            .unwrap_or_default();
        out.push(Outbound::to_conn(
            conn,
            "stranger_mode_entered",
            StrangerModeEntered {
                username,
                user_id: conn.clone(),
                message: "You are now in stranger chat mode",
            },
        ));
    }

    fn find_stranger(&mut self, conn: &SessionId, req: FindStrangerRequest, out: &mut Vec<Outbound>) {
        if self.stranger.profile(conn).is_none() {
            out.push(Self::error(conn, "You must enter stranger mode first"));
            return;
        }
        // A paired searcher drops their partner first.
        if let Some(partner) = self.stranger.unpair(conn) {
            self.leave_pair_room(conn, &partner);
            out.push(Outbound::to_conn(
                &partner,
                "stranger_disconnected",
                StrangerDisconnected::default(),
            ));
        }
        // A repeated search must not leave duplicate queue entries behind.
        self.stranger.remove_from_queues(conn);

        let interests = req.interests();
        if let Some(profile) = self.stranger.profile_mut(conn) {
            profile.status = StrangerStatus::Searching;
            profile.interests = interests.clone();
        }

        if let Some(candidate) = self.stranger.pop_candidate(conn, &interests) {
            self.create_pair(conn, &candidate, out);
        } else {
            self.stranger.enqueue(conn, &interests);
            out.push(Outbound::to_conn(
                conn,
                "searching_stranger",
                SearchingStranger {
                    interests,
                    message: "Searching for a stranger...",
                },
            ));
        }
    }

    fn create_pair(&mut self, a: &SessionId, b: &SessionId, out: &mut Vec<Outbound>) {
        self.stranger.create_pair(a, b);
        let room_id = stranger_room_id(a, b);
        self.rooms.join(&room_id, a);
        self.rooms.join(&room_id, b);
        info!(a = %a, b = %b, room = %room_id, "paired strangers");
        for (me, other) in [(a, b), (b, a)] {
            out.push(Outbound::to_conn(
                me,
                "stranger_found",
                StrangerFound {
                    message: "Stranger found! Say hi!",
                    room_id: room_id.clone(),
                    partner_id: other.clone(),
                    can_video_chat: true,
                },
            ));
        }
    }

    fn leave_pair_room(&mut self, a: &SessionId, b: &SessionId) {
        let room = stranger_room_id(a, b);
        self.rooms.leave(&room, a);
        self.rooms.leave(&room, b);
    }

    fn send_stranger_message(
        &mut self,
        conn: &SessionId,
        req: StrangerMessageRequest,
        out: &mut Vec<Outbound>,
    ) {
        let Some(profile) = self.stranger.profile(conn) else {
            out.push(Self::error(conn, "You must enter stranger mode first"));
            return;
        };
        let username = profile.username.clone();
        let Some(partner) = self.stranger.partner_of(conn).cloned() else {
            out.push(Self::error(conn, "You are not in a stranger chat session"));
            return;
        };
        let Some(content) = req.content().map(str::trim).filter(|c| !c.is_empty()) else {
            out.push(Self::error(conn, "Message content is required"));
            return;
        };
        let room_id = stranger_room_id(conn, &partner);
        let tick = self.messages.next_tick();
        let msg = ChatMessage {
            id: format!("stranger_{conn}_{tick}"),
            kind: MessageKind::StrangerMessage,
            content: content.to_string(),
            username,
            room: room_id.clone(),
            timestamp: Utc::now(),
            user_id: conn.clone(),
            file: None,
            reply_to: None,
            edited: false,
            edited_at: None,
        };
        // delivered to both sides, echo included
        out.push(Outbound::to_room(&room_id, None, "stranger_message", msg));
    }

    // ---- video calls ------------------------------------------------------

    fn start_video_call(&mut self, conn: &SessionId, out: &mut Vec<Outbound>) {
        let Some(profile) = self.stranger.profile(conn) else {
            out.push(Self::error(conn, "You must enter stranger mode first"));
            return;
        };
        let status = profile.status;
        let Some(partner) = self.stranger.partner_of(conn).cloned() else {
            let text = if status == StrangerStatus::Searching {
                "Still searching for a stranger"
            } else {
                "No stranger connected"
            };
            out.push(Self::error(conn, text));
            return;
        };
        let room_id = stranger_room_id(conn, &partner);
        self.calls.start(conn, &partner, &room_id, CallKind::Stranger);
        for id in [conn, &partner] {
            if let Some(profile) = self.stranger.profile_mut(id) {
                profile.in_video_call = true;
            }
        }
        info!(caller = %conn, callee = %partner, room = %room_id, "stranger video call started");
        out.push(Outbound::to_conn(
            &partner,
            "incoming_video_call",
            IncomingVideoCall {
                caller_id: conn.clone(),
                room_id: room_id.clone(),
            },
        ));
        out.push(Outbound::to_conn(
            conn,
            "video_call_initiated",
            VideoCallInitiated {
                room_id,
                partner_id: partner,
                initiator: conn.clone(),
            },
        ));
    }

    fn start_private_video_call(
        &mut self,
        conn: &SessionId,
        req: StartPrivateCallRequest,
        out: &mut Vec<Outbound>,
    ) {
        let Some(target) = req.target_user_id else {
            out.push(Self::error(conn, "Target user is required"));
            return;
        };
        let Some(partner_username) = self
            .sessions
            .get(&target)
            .map(|s| s.display_name().to_string())
        else {
            out.push(Self::error(conn, "User not found"));
            return;
        };
        let caller_regular = self
            .sessions
            .get(conn)
            .map(|s| s.mode == SessionMode::Regular)
            .unwrap_or(false);
        let target_regular = self
            .sessions
            .get(&target)
            .map(|s| s.mode == SessionMode::Regular)
            .unwrap_or(false);
        if !caller_regular || !target_regular {
            out.push(Self::error(conn, "Private calls are only available in chat rooms"));
            return;
        }
        let caller_username = self
            .sessions
            .get(conn)
            .map(|s| s.display_name().to_string())
            .unwrap_or_else(|| "Anonymous".to_string());

        let room_id = private_call_room_id(conn, &target);
        self.calls.start(conn, &target, &room_id, CallKind::Private);
        info!(caller = %conn, callee = %target, room = %room_id, "private video call started");
        out.push(Outbound::to_conn(
            &target,
            "incoming_private_video_call",
            IncomingPrivateVideoCall {
                caller_id: conn.clone(),
                caller_username,
                room_id: room_id.clone(),
            },
        ));
        out.push(Outbound::to_conn(
            conn,
            "private_video_call_initiated",
            PrivateVideoCallInitiated {
                room_id,
                partner_id: target.clone(),
                partner_username,
                initiator: conn.clone(),
            },
        ));
    }

    fn accept_call(
        &mut self,
        conn: &SessionId,
        req: CallRoomRequest,
        kind: CallKind,
        out: &mut Vec<Outbound>,
    ) {
        let Some(room_id) = req.room_id else {
            out.push(Self::error(conn, "Call room is required"));
            return;
        };
        let (initiator, partner) = match self.calls.get_mut(&room_id) {
            Some(call) if call.kind == kind => {
                call.status = CallStatus::Active;
                (call.initiator.clone(), call.partner.clone())
            }
            _ => {
                out.push(Self::error(conn, "Call not found"));
                return;
            }
        };
        if kind == CallKind::Stranger {
            for id in [&initiator, &partner] {
                if let Some(profile) = self.stranger.profile_mut(id) {
                    profile.in_video_call = true;
                }
            }
        }
        let event = match kind {
            CallKind::Stranger => "video_call_accepted",
            CallKind::Private => "private_video_call_accepted",
        };
        for id in [&initiator, &partner] {
            out.push(Outbound::to_conn(
                id,
                event,
                VideoCallAccepted {
                    room_id: room_id.clone(),
                    initiator: initiator.clone(),
                    partner: partner.clone(),
                },
            ));
        }
    }

    fn reject_call(
        &mut self,
        conn: &SessionId,
        req: CallRoomRequest,
        kind: CallKind,
        out: &mut Vec<Outbound>,
    ) {
        let Some(room_id) = req.room_id else {
            out.push(Self::error(conn, "Call room is required"));
            return;
        };
        let Some(call) = self.take_call(&room_id, kind) else {
            out.push(Self::error(conn, "Call not found"));
            return;
        };
        if kind == CallKind::Stranger {
            for id in [&call.initiator, &call.partner] {
                if let Some(profile) = self.stranger.profile_mut(id) {
                    profile.in_video_call = false;
                }
            }
        }
        let event = match kind {
            CallKind::Stranger => "video_call_rejected",
            CallKind::Private => "private_video_call_rejected",
        };
        out.push(Outbound::to_conn(
            &call.initiator,
            event,
            VideoCallRejected {
                message: "Call was rejected",
            },
        ));
    }

    fn end_call(
        &mut self,
        conn: &SessionId,
        req: CallRoomRequest,
        kind: CallKind,
        out: &mut Vec<Outbound>,
    ) {
        let Some(room_id) = req.room_id else {
            out.push(Self::error(conn, "Call room is required"));
            return;
        };
        let Some(call) = self.take_call(&room_id, kind) else {
            out.push(Self::error(conn, "Call not found"));
            return;
        };
        if kind == CallKind::Stranger {
            for id in [&call.initiator, &call.partner] {
                if let Some(profile) = self.stranger.profile_mut(id) {
                    profile.in_video_call = false;
                }
            }
        }
        let event = match kind {
            CallKind::Stranger => "video_call_ended",
            CallKind::Private => "private_video_call_ended",
        };
        for id in [&call.initiator, &call.partner] {
            out.push(Outbound::to_conn(
                id,
                event,
                VideoCallEnded {
                    room_id: room_id.clone(),
                },
            ));
        }
    }

    /// Remove a call record if it exists under the expected kind.
    fn take_call(&mut self, room_id: &str, kind: CallKind) -> Option<calls::Call> {
        let matches = self
            .calls
            .get(room_id)
            .map(|c| c.kind == kind)
            .unwrap_or(false);
        if matches {
            self.calls.remove(room_id)
        } else {
            None
        }
    }

    /// WebRTC signal relay. The pairing is the primary route; an active call
    /// record is the fallback so signaling keeps flowing after a skip tore
    /// the text pairing down mid-call.
    fn relay_signal(
        &mut self,
        conn: &SessionId,
        kind: SignalKind,
        req: SignalRequest,
        out: &mut Vec<Outbound>,
    ) {
        let blob = match kind {
            SignalKind::Offer => req.offer,
            SignalKind::Answer => req.answer,
            SignalKind::IceCandidate => req.candidate,
        };
        let Some(blob) = blob else {
            if !matches!(kind, SignalKind::IceCandidate) {
                out.push(Self::error(conn, "Missing signal payload"));
            }
            return;
        };
        let partner = self
            .stranger
            .partner_of(conn)
            .cloned()
            .or_else(|| self.calls.find_for(conn).map(|c| c.other_party(conn).clone()));
        let Some(partner) = partner else {
            // lost ICE candidates are normal churn; lost offers are an error
            if !matches!(kind, SignalKind::IceCandidate) {
                out.push(Self::error(conn, "No active connection for signaling"));
            }
            return;
        };
        let (event, forward) = match kind {
            SignalKind::Offer => (
                "webrtc_offer",
                SignalForward {
                    offer: Some(blob),
                    answer: None,
                    candidate: None,
                    from: conn.clone(),
                },
            ),
            SignalKind::Answer => (
                "webrtc_answer",
                SignalForward {
                    offer: None,
                    answer: Some(blob),
                    candidate: None,
                    from: conn.clone(),
                },
            ),
            SignalKind::IceCandidate => (
                "webrtc_ice_candidate",
                SignalForward {
                    offer: None,
                    answer: None,
                    candidate: Some(blob),
                    from: conn.clone(),
                },
            ),
        };
        out.push(Outbound::to_conn(&partner, event, forward));
    }

    // ---- HTTP-surface operations ------------------------------------------

    /// Edit through the REST endpoint: same author/type checks as the socket
    /// path, and the broadcast goes to the room's live sockets.
    pub fn edit_message_http(
        &mut self,
        message_id: &str,
        new_content: &str,
        username: &str,
    ) -> Result<Vec<Outbound>, MessageError> {
        let msg = self.messages.edit(message_id, username, new_content)?;
        let edited = MessageEdited {
            message_id: message_id.to_string(),
            new_content: msg.content.clone(),
            edited_at: msg.edited_at.unwrap_or_else(Utc::now),
            room: msg.room.clone(),
            username: username.to_string(),
        };
        let room = msg.room.clone();
        Ok(vec![Outbound::to_room(&room, None, "message_edited", edited)])
    }

    pub fn delete_message_http(
        &mut self,
        message_id: &str,
        username: &str,
    ) -> Result<Vec<Outbound>, MessageError> {
        let msg = self.messages.delete(message_id, username)?;
        self.reactions.clear_message(message_id);
        let deleted = MessageDeleted {
            message_id: message_id.to_string(),
            room: msg.room.clone(),
            username: username.to_string(),
            deleted_at: Utc::now(),
        };
        Ok(vec![Outbound::to_room(&msg.room, None, "message_deleted", deleted)])
    }

    // ---- snapshots for the HTTP surface and metrics -----------------------

    pub fn room_members(&self, room: &str) -> &[SessionId] {
        self.rooms.members(room)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn searching_count(&self) -> usize {
        self.stranger.searching_count()
    }

    pub fn pair_count(&self) -> usize {
        self.stranger.pair_count()
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn stats(&self) -> Value {
        json!({
            "active_sessions": self.sessions.len(),
            "joined_users": self.sessions.joined_count(),
            "rooms": self.rooms.len(),
            "messages": self.messages.len(),
            "reacted_messages": self.reactions.reacted_message_count(),
            "private_conversations": self.private_log.conversation_count(),
            "strangers_online": self.stranger.profile_count(),
            "searching": self.stranger.searching_count(),
            "waiting_general": self.stranger.waiting_general_count(),
            "waiting_interests": self.stranger.waiting_interest_count(),
            "active_pairs": self.stranger.pair_count(),
            "active_calls": self.calls.len(),
        })
    }

    pub fn debug_snapshot(&self) -> Value {
        let sessions: Vec<Value> = self.sessions.iter().map(|s| self.session_json(s)).collect();
        let rooms: Value = self
            .rooms
            .iter()
            .map(|(name, members)| (name.clone(), json!(members)))
            .collect::<serde_json::Map<String, Value>>()
            .into();
        let interest_queues: Value = self
            .stranger
            .interest_queues()
            .iter()
            .map(|(interest, queue)| (interest.clone(), json!(queue)))
            .collect::<serde_json::Map<String, Value>>()
            .into();
        let pairs: Value = self
            .stranger
            .pairs()
            .iter()
            .map(|(a, b)| (a.clone(), json!(b)))
            .collect::<serde_json::Map<String, Value>>()
            .into();
        let calls: Vec<Value> = self
            .calls
            .iter()
            .map(|c| {
                json!({
                    "room_id": c.room_id,
                    "initiator": c.initiator,
                    "partner": c.partner,
                    "status": match c.status {
                        CallStatus::Calling => "calling",
                        CallStatus::Active => "active",
                    },
                    "kind": match c.kind {
                        CallKind::Stranger => "stranger",
                        CallKind::Private => "private",
                    },
                    "created_at": c.created_at,
                })
            })
            .collect();
        json!({
            "sessions": sessions,
            "rooms": rooms,
            "waiting_queue": self.stranger.waiting_queue(),
            "interest_queues": interest_queues,
            "pairs": pairs,
            "calls": calls,
        })
    }

    pub fn debug_user(&self, id: &SessionId) -> Option<Value> {
        self.sessions.get(id).map(|s| self.session_json(s))
    }

    pub fn room_messages(&self, room: &str, limit: usize) -> Value {
        json!(self.messages.recent(room, limit))
    }

    fn session_json(&self, s: &session::Session) -> Value {
        let stranger = self.stranger.profile(&s.id).map(|p| {
            json!({
                "username": p.username,
                "status": match p.status {
                    StrangerStatus::Connected => "connected",
                    StrangerStatus::Searching => "searching",
                    StrangerStatus::Chatting => "chatting",
                },
                "interests": p.interests,
                "partner": p.partner,
                "in_video_call": p.in_video_call,
            })
        });
        json!({
            "id": s.id,
            "mode": match s.mode {
                SessionMode::Regular => "regular",
                SessionMode::Stranger => "stranger",
            },
            "username": s.username,
            "room": s.room,
            "joined": s.joined,
            "connected_at": s.connected_at,
            "stranger": stranger,
        })
    }

    // ---- shared helpers ---------------------------------------------------

    fn joined_room(&self, conn: &SessionId) -> Result<(String, String), &'static str> {
        match self.sessions.get(conn) {
            Some(s) if s.joined => match (&s.username, &s.room) {
                (Some(username), Some(room)) => Ok((username.clone(), room.clone())),
                _ => Err("You must join a room first"),
            },
            _ => Err("You must join a room first"),
        }
    }

    fn build_room_message(
        &mut self,
        conn: &SessionId,
        username: &str,
        room: &str,
        content: String,
        file: Option<FileInfo>,
        reply_to: Option<ReplyTo>,
    ) -> ChatMessage {
        let tick = self.messages.next_tick();
        let (kind, id) = if file.is_some() {
            (MessageKind::File, format!("file_{conn}_{tick}"))
        } else {
            (MessageKind::Message, format!("{conn}_{tick}"))
        };
        ChatMessage {
            id,
            kind,
            content,
            username: username.to_string(),
            room: room.to_string(),
            timestamp: Utc::now(),
            user_id: conn.clone(),
            file,
            reply_to,
            edited: false,
            edited_at: None,
        }
    }

    fn system_message(&mut self, room: &str, content: String) -> ChatMessage {
        let tick = self.messages.next_tick();
        ChatMessage {
            id: format!("system_{tick}"),
            kind: MessageKind::System,
            content,
            username: SYSTEM_USERNAME.to_string(),
            room: room.to_string(),
            timestamp: Utc::now(),
            user_id: SYSTEM_USERNAME.to_string(),
            file: None,
            reply_to: None,
            edited: false,
            edited_at: None,
        }
    }

    fn push_room_users(&self, room: &str, out: &mut Vec<Outbound>) {
        let users: Vec<RoomUser> = self
            .rooms
            .members(room)
            .iter()
            .filter_map(|id| {
                self.sessions.get(id).map(|s| RoomUser {
                    username: s.display_name().to_string(),
                    id: id.clone(),
                    is_online: true,
                })
            })
            .collect();
        let count = users.len();
        out.push(Outbound::to_room(
            room,
            None,
            "room_users",
            RoomUsers {
                room: room.to_string(),
                users,
                count,
            },
        ));
    }

    fn push_reactions(&self, message_id: &str, room: &str, out: &mut Vec<Outbound>) {
        out.push(Outbound::to_room(
            room,
            None,
            "reaction_updated",
            ReactionUpdated {
                message_id: message_id.to_string(),
                reactions: self.reactions.summary(message_id),
            },
        ));
    }

    fn edit_error_text(e: MessageError, editing: bool) -> &'static str {
        match (e, editing) {
            (MessageError::NotFound, _) => "Message not found",
            (MessageError::NotAuthor, true) => "You can only edit your own messages",
            (MessageError::NotAuthor, false) => "You can only delete your own messages",
            (MessageError::NotEditable, _) => "File messages cannot be edited",
        }
    }

    fn error(conn: &SessionId, message: impl Into<String>) -> Outbound {
        Outbound::to_conn(
            conn,
            "error",
            ErrorPayload {
                message: message.into(),
            },
        )
    }

    fn parse<T: DeserializeOwned>(
        conn: &SessionId,
        data: Value,
        out: &mut Vec<Outbound>,
    ) -> Option<T> {
        match serde_json::from_value(data) {
            Ok(req) => Some(req),
            Err(e) => {
                debug!(session = %conn, error = %e, "malformed payload");
                out.push(Self::error(conn, "Invalid message format"));
                None
            }
        }
    }
}


fn truncate_preview(content: &str) -> String {
    let mut preview: String = content.chars().take(REPLY_PREVIEW_CHARS).collect();
    if content.chars().count() > REPLY_PREVIEW_CHARS {
        preview.push('…');
    }
    preview
}
