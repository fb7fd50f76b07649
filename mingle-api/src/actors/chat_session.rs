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

//! One WebSocket session actor per connection: heartbeat, envelope decoding
//! and strictly-ordered forwarding into the chat server.

use crate::constants::{CLIENT_TIMEOUT, HEARTBEAT_INTERVAL};
use crate::messages::{Connect, Disconnect, Inbound, OutboundFrame};
use crate::state::SessionId;
use crate::actors::chat_server::ChatServer;

use actix::{
    clock::Instant, fut, ActorContext, ActorFutureExt, Actor, Addr, AsyncContext,
    ContextFutureSpawner, Handler, Running, StreamHandler, WrapFuture,
};
use actix_web_actors::ws::{self, WebsocketContext};
use mingle_types::{ClientEnvelope, ServerEnvelope};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct WsSession {
    pub id: SessionId,
    pub addr: Addr<ChatServer>,
    pub heartbeat: Instant,
}

impl WsSession {
    pub fn new(addr: Addr<ChatServer>) -> Self {
        let id = Uuid::new_v4().to_string();
        info!(session = %id, "new websocket session");
        WsSession {
            id,
            addr,
            heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.heartbeat) > CLIENT_TIMEOUT {
                warn!(session = %act.id, "websocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Frames that fail to parse never reach the router; the session answers
    /// directly so a broken client cannot occupy the server mailbox.
    fn handle_text(&self, text: &str, ctx: &mut WebsocketContext<Self>) {
        match serde_json::from_str::<ClientEnvelope>(text) {
            Ok(envelope) => self.addr.do_send(Inbound {
                id: self.id.clone(),
                event: envelope.event,
                data: envelope.data,
            }),
            Err(e) => {
                debug!(session = %self.id, error = %e, "invalid frame");
                let reply =
                    ServerEnvelope::new("error", json!({ "message": "Invalid message format" }));
                ctx.text(reply.to_frame());
            }
        }
    }
}

impl Actor for WsSession {
    type Context = WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);
        let addr = ctx.address();
        self.addr
            .send(Connect {
                id: self.id.clone(),
                addr: addr.recipient(),
            })
            .into_actor(self)
            .then(|res, _act, ctx| {
                if let Err(err) = res {
                    error!("error {:?}", err);
                    ctx.stop();
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        info!(session = %self.id, "session stopping");
        self.addr.do_send(Disconnect {
            id: self.id.clone(),
        });
        Running::Stop
    }
}

impl Handler<OutboundFrame> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, item: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match item {
            Ok(msg) => msg,
            Err(err) => {
                error!(session = %self.id, "protocol error {:?}", err);
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Text(text) => self.handle_text(&text, ctx),
            ws::Message::Ping(msg) => {
                self.heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            ws::Message::Pong(_) => {
                self.heartbeat = Instant::now();
            }
            ws::Message::Binary(_) => {
                debug!(session = %self.id, "ignoring binary frame");
            }
            ws::Message::Close(reason) => {
                info!(session = %self.id, "close received");
                ctx.close(reason);
                ctx.stop();
            }
            _ => (),
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        ctx.stop()
    }
}
