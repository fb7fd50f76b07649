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

//! WebSocket entry point.
//!
//! `GET /ws` upgrades the connection and spawns one [`WsSession`] actor. The
//! session gets a server-assigned UUID as its connection ID; everything else
//! (rooms, usernames, stranger mode) is negotiated over the socket itself.

use actix::prelude::Stream;
use actix::Actor;
use actix::StreamHandler;
use actix_http::error::PayloadError;
use actix_http::ws::{Codec, Message, ProtocolError};
use actix_web::web::Bytes;
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws::{handshake, WebsocketContext};
use tracing::debug;

use crate::actors::chat_session::WsSession;
use crate::constants::MAX_FRAME_SIZE;
use crate::models::AppState;

/// Start a WebSocket connection with a custom codec.
fn start_with_codec<A, S>(
    actor: A,
    req: &HttpRequest,
    stream: S,
    codec: Codec,
) -> Result<HttpResponse, Error>
where
    A: Actor<Context = WebsocketContext<A>> + StreamHandler<Result<Message, ProtocolError>>,
    S: Stream<Item = Result<Bytes, PayloadError>> + 'static,
{
    let mut res = handshake(req)?;
    Ok(res.streaming(WebsocketContext::with_codec(actor, stream, codec)))
}

#[get("/ws")]
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    debug!("socket connected");
    let actor = WsSession::new(state.chat.clone());
    let codec = Codec::new().max_size(MAX_FRAME_SIZE);
    start_with_codec(actor, &req, stream, codec)
}
