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

//! Actor messages exchanged between the session actors, the chat server and
//! the HTTP handlers.

use crate::state::messages::MessageError;
use crate::state::SessionId;
use actix::{Message as ActixMessage, Recipient};
use serde_json::Value;

/// A serialized `{"event", "data"}` frame on its way to one client socket.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct OutboundFrame(pub String);

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct Connect {
    pub id: SessionId,
    pub addr: Recipient<OutboundFrame>,
}

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: SessionId,
}

/// One decoded client event, forwarded by a session actor in arrival order.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct Inbound {
    pub id: SessionId,
    pub event: String,
    pub data: Value,
}

// Read-only snapshots for the HTTP surface.

#[derive(ActixMessage)]
#[rtype(result = "Value")]
pub struct StatsQuery;

#[derive(ActixMessage)]
#[rtype(result = "Value")]
pub struct DebugQuery;

#[derive(ActixMessage)]
#[rtype(result = "Option<Value>")]
pub struct DebugUserQuery {
    pub id: SessionId,
}

#[derive(ActixMessage)]
#[rtype(result = "Value")]
pub struct RoomMessagesQuery {
    pub room: String,
    pub limit: usize,
}

// Mutations driven by the REST endpoints; the resulting broadcast still goes
// out over the live sockets.

#[derive(ActixMessage)]
#[rtype(result = "Result<(), MessageError>")]
pub struct HttpEditMessage {
    pub message_id: String,
    pub new_content: String,
    pub username: String,
}

#[derive(ActixMessage)]
#[rtype(result = "Result<(), MessageError>")]
pub struct HttpDeleteMessage {
    pub message_id: String,
    pub username: String,
}
