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

//! Auxiliary HTTP surface: health, stats, debug snapshots, message history
//! and REST mutations. Everything routes through the chat server actor, so
//! these endpoints observe and mutate the same state as the sockets, under
//! the same serialization.

pub mod uploads;

use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::messages::{
    DebugQuery, DebugUserQuery, HttpDeleteMessage, HttpEditMessage, RoomMessagesQuery, StatsQuery,
};
use crate::metrics;
use crate::models::AppState;
use crate::state::messages::MessageError;
use actix_web::{error, get, post, web, Error, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: &str) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: message.to_string(),
        }
    }

    pub fn forbidden(message: &str) -> Self {
        Self {
            code: "FORBIDDEN".to_string(),
            message: message.to_string(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.to_string(),
        }
    }
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "mingle-api",
    }))
}

#[get("/stats")]
pub async fn stats(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let stats = state
        .chat
        .send(StatsQuery)
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(stats))
}

#[get("/debug")]
pub async fn debug_snapshot(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let snapshot = state
        .chat
        .send(DebugQuery)
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(snapshot))
}

#[get("/debug/connections")]
pub async fn debug_connections(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let snapshot = state
        .chat
        .send(DebugQuery)
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "connections": snapshot["sessions"] })))
}

#[get("/debug/user/{id}")]
pub async fn debug_user(
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = state
        .chat
        .send(DebugUserQuery {
            id: id.into_inner(),
        })
        .await
        .map_err(error::ErrorInternalServerError)?;
    match session {
        Some(session) => Ok(HttpResponse::Ok().json(session)),
        None => Ok(HttpResponse::NotFound().json(ApiError::not_found("User not found"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[get("/messages/{room}")]
pub async fn room_messages(
    room: web::Path<String>,
    query: web::Query<HistoryQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let room = room.into_inner();
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let messages = state
        .chat
        .send(RoomMessagesQuery {
            room: room.clone(),
            limit,
        })
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "room": room, "messages": messages })))
}

#[derive(Debug, Deserialize)]
pub struct EditMessageBody {
    pub message_id: String,
    pub new_content: String,
    // clients send the room along; the store resolves it from the message id
    #[serde(default)]
    pub room: Option<String>,
    pub username: String,
}

#[post("/messages/edit")]
pub async fn edit_message(
    body: web::Json<EditMessageBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();
    if body.new_content.trim().is_empty() {
        return Ok(
            HttpResponse::BadRequest().json(ApiError::bad_request("Message content is required"))
        );
    }
    let result = state
        .chat
        .send(HttpEditMessage {
            message_id: body.message_id,
            new_content: body.new_content,
            username: body.username,
        })
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(store_result_response(result))
}

#[derive(Debug, Deserialize)]
pub struct DeleteMessageBody {
    pub message_id: String,
    #[serde(default)]
    pub room: Option<String>,
    pub username: String,
}

#[post("/messages/delete")]
pub async fn delete_message(
    body: web::Json<DeleteMessageBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();
    let result = state
        .chat
        .send(HttpDeleteMessage {
            message_id: body.message_id,
            username: body.username,
        })
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(store_result_response(result))
}

#[get("/metrics")]
pub async fn prometheus_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::render())
}

fn store_result_response(result: Result<(), MessageError>) -> HttpResponse {
    match result {
        Ok(()) => HttpResponse::Ok().json(json!({ "ok": true })),
        Err(MessageError::NotFound) => {
            HttpResponse::NotFound().json(ApiError::not_found("Message not found"))
        }
        Err(MessageError::NotAuthor) => {
            HttpResponse::Forbidden().json(ApiError::forbidden("You can only modify your own messages"))
        }
        Err(MessageError::NotEditable) => {
            HttpResponse::BadRequest().json(ApiError::bad_request("File messages cannot be edited"))
        }
    }
}
