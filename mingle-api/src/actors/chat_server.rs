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

//! The chat server actor. It owns the [`ChatState`] and the recipient handle
//! of every live session, so its mailbox serializes all core transitions:
//! events from N connections interleave, but each transition runs to
//! completion before the next one starts, and delivery happens strictly
//! after the transition via non-blocking sends.

use crate::messages::{
    Connect, Disconnect, DebugQuery, DebugUserQuery, HttpDeleteMessage, HttpEditMessage, Inbound,
    OutboundFrame, RoomMessagesQuery, StatsQuery,
};
use crate::metrics;
use crate::state::messages::MessageError;
use crate::state::{ChatState, Outbound, SessionId, Target};
use actix::{Actor, Context, Handler, MessageResult, Recipient};
use mingle_types::ServerEnvelope;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

pub struct ChatServer {
    state: ChatState,
    recipients: HashMap<SessionId, Recipient<OutboundFrame>>,
}

impl ChatServer {
    pub fn new() -> Self {
        ChatServer {
            state: ChatState::new(),
            recipients: HashMap::new(),
        }
    }

    /// Fan a transition's outbound events out to session mailboxes. Room
    /// targets resolve against the membership as of now, so a member removed
    /// by the transition no longer receives the broadcast. Dead recipients
    /// are logged and skipped.
    fn deliver(&self, out: Vec<Outbound>) {
        for event in out {
            let frame = ServerEnvelope::new(event.event, event.data).to_frame();
            match event.target {
                Target::Conn(id) => self.send_frame(&id, &frame),
                Target::Room { room, skip } => {
                    for member in self.state.room_members(&room) {
                        if Some(member) == skip.as_ref() {
                            continue;
                        }
                        self.send_frame(member, &frame);
                    }
                }
            }
        }
    }

    fn send_frame(&self, id: &SessionId, frame: &str) {
        let Some(recipient) = self.recipients.get(id) else {
            trace!(session = %id, "dropping frame for unknown recipient");
            return;
        };
        if let Err(e) = recipient.try_send(OutboundFrame(frame.to_string())) {
            warn!(session = %id, error = %e, "failed to deliver frame");
        }
    }

    fn sync_gauges(&self) {
        metrics::CONNECTED_SESSIONS.set(self.state.session_count() as f64);
        metrics::SEARCHING_SESSIONS.set(self.state.searching_count() as f64);
        metrics::ACTIVE_PAIRS.set(self.state.pair_count() as f64);
        metrics::ACTIVE_CALLS.set(self.state.call_count() as f64);
    }
}

impl Default for ChatServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) -> Self::Result {
        let Connect { id, addr } = msg;
        self.recipients.insert(id.clone(), addr);
        let out = self.state.connect(&id);
        self.deliver(out);
        self.sync_gauges();
    }
}

impl Handler<Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, Disconnect { id }: Disconnect, _ctx: &mut Self::Context) -> Self::Result {
        let out = self.state.disconnect(&id);
        self.deliver(out);
        self.recipients.remove(&id);
        self.sync_gauges();
    }
}

impl Handler<Inbound> for ChatServer {
    type Result = ();

    fn handle(&mut self, Inbound { id, event, data }: Inbound, _ctx: &mut Self::Context) -> Self::Result {
        debug!(session = %id, event = %event, "inbound event");
        metrics::INBOUND_EVENTS_TOTAL.inc();
        if matches!(
            event.as_str(),
            "send_message" | "send_file_message" | "send_reply" | "private_message" | "send_stranger_message"
        ) {
            metrics::MESSAGES_TOTAL.inc();
        }
        let out = self.state.dispatch(&id, &event, data);
        self.deliver(out);
        self.sync_gauges();
    }
}

impl Handler<StatsQuery> for ChatServer {
    type Result = MessageResult<StatsQuery>;

    fn handle(&mut self, _msg: StatsQuery, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.state.stats())
    }
}

impl Handler<DebugQuery> for ChatServer {
    type Result = MessageResult<DebugQuery>;

    fn handle(&mut self, _msg: DebugQuery, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.state.debug_snapshot())
    }
}

impl Handler<DebugUserQuery> for ChatServer {
    type Result = MessageResult<DebugUserQuery>;

    fn handle(&mut self, msg: DebugUserQuery, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.state.debug_user(&msg.id))
    }
}

impl Handler<RoomMessagesQuery> for ChatServer {
    type Result = MessageResult<RoomMessagesQuery>;

    fn handle(&mut self, msg: RoomMessagesQuery, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.state.room_messages(&msg.room, msg.limit))
    }
}

impl Handler<HttpEditMessage> for ChatServer {
    type Result = Result<(), MessageError>;

    fn handle(&mut self, msg: HttpEditMessage, _ctx: &mut Self::Context) -> Self::Result {
        let out = self
            .state
            .edit_message_http(&msg.message_id, &msg.new_content, &msg.username)?;
        self.deliver(out);
        Ok(())
    }
}

impl Handler<HttpDeleteMessage> for ChatServer {
    type Result = Result<(), MessageError>;

    fn handle(&mut self, msg: HttpDeleteMessage, _ctx: &mut Self::Context) -> Self::Result {
        let out = self
            .state
            .delete_message_http(&msg.message_id, &msg.username)?;
        self.deliver(out);
        Ok(())
    }
}
