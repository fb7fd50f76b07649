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

//! Boots the real WebSocket server on a local port and exercises the
//! connect → join → message path over an actual socket.

use actix::Actor;
use actix_web::{web, App, HttpServer};
use futures_util::{SinkExt, StreamExt};
use mingle_api::actors::chat_server::ChatServer;
use mingle_api::api::uploads::UploadStore;
use mingle_api::lobby;
use mingle_api::models::AppState;
use serde_json::{json, Value};
use serial_test::serial;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const PORT: u16 = 18090;

async fn start_server(port: u16) {
    let chat = ChatServer::new().start();
    let uploads = UploadStore::new(std::env::temp_dir().join("mingle-ws-test-uploads"))
        .expect("upload dir");

    actix_rt::spawn(async move {
        let _ = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(AppState {
                    chat: chat.clone(),
                    uploads: uploads.clone(),
                }))
                .service(lobby::ws_connect)
        })
        .bind(("127.0.0.1", port))
        .expect("Failed to bind server")
        .run()
        .await;
    });
}

async fn connect_client(port: u16) -> WsClient {
    let url = format!("ws://127.0.0.1:{port}/ws");
    for _ in 0..50 {
        if let Ok((ws, _)) = tokio_tungstenite::connect_async(&url).await {
            return ws;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("WebSocket server not ready after 5 seconds");
}

async fn send_event(ws: &mut WsClient, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    ws.send(Message::Text(frame.into())).await.expect("send frame");
}

/// Next JSON envelope from the socket, skipping pings.
async fn next_event(ws: &mut WsClient) -> (String, Value) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket error");
        match msg {
            Message::Text(text) => {
                let v: Value = serde_json::from_str(&text).expect("invalid frame");
                let event = v["event"].as_str().expect("missing event").to_string();
                return (event, v["data"].clone());
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
    panic!("no event before deadline");
}

async fn wait_for(ws: &mut WsClient, wanted: &str) -> Value {
    loop {
        let (event, data) = next_event(ws).await;
        if event == wanted {
            return data;
        }
    }
}

#[actix_rt::test]
#[serial]
async fn join_and_chat_over_a_real_socket() {
    start_server(PORT).await;

    let mut alice = connect_client(PORT).await;
    let (event, data) = next_event(&mut alice).await;
    assert_eq!(event, "connection_options");
    assert_eq!(data["modes"][0], "chat_rooms");

    send_event(&mut alice, "join_room", json!({ "username": "Alice", "room": "lobby" })).await;
    let (event, data) = next_event(&mut alice).await;
    assert_eq!(event, "join_success");
    assert_eq!(data["room"], "lobby");
    assert_eq!(data["username"], "Alice");

    let welcome = wait_for(&mut alice, "message").await;
    assert_eq!(welcome["type"], "system");
    assert_eq!(welcome["content"], "Welcome to lobby, Alice!");

    let users = wait_for(&mut alice, "room_users").await;
    assert_eq!(users["count"], 1);

    // second participant joins, Alice sees the announcement
    let mut bob = connect_client(PORT).await;
    wait_for(&mut bob, "connection_options").await;
    send_event(&mut bob, "join_room", json!({ "user": "Bob", "roomId": "lobby" })).await;
    wait_for(&mut bob, "join_success").await;

    let announce = wait_for(&mut alice, "message").await;
    assert_eq!(announce["content"], "Bob joined the chat");
    let users = wait_for(&mut alice, "room_users").await;
    assert_eq!(users["count"], 2);

    // a chat message reaches both sides, sender included
    send_event(&mut alice, "send_message", json!({ "message": "hi Bob" })).await;
    let msg = wait_for(&mut alice, "message").await;
    assert_eq!(msg["content"], "hi Bob");
    assert_eq!(msg["username"], "Alice");
    let msg = wait_for(&mut bob, "message").await;
    assert_eq!(msg["content"], "hi Bob");

    // ping keeps the protocol honest
    send_event(&mut alice, "ping", Value::Null).await;
    wait_for(&mut alice, "pong").await;

    // Bob drops; Alice is told
    bob.close(None).await.expect("close bob");
    let left = wait_for(&mut alice, "message").await;
    assert_eq!(left["content"], "Bob left the chat");
    let users = wait_for(&mut alice, "room_users").await;
    assert_eq!(users["count"], 1);
}

#[actix_rt::test]
#[serial]
async fn strangers_meet_over_a_real_socket() {
    start_server(PORT + 1).await;

    let mut u1 = connect_client(PORT + 1).await;
    wait_for(&mut u1, "connection_options").await;
    let mut u2 = connect_client(PORT + 1).await;
    wait_for(&mut u2, "connection_options").await;

    send_event(&mut u1, "enter_stranger_mode", Value::Null).await;
    let entered = wait_for(&mut u1, "stranger_mode_entered").await;
    assert!(entered["username"].as_str().is_some());

    send_event(&mut u2, "enter_stranger_mode", Value::Null).await;
    wait_for(&mut u2, "stranger_mode_entered").await;

    send_event(&mut u1, "find_stranger", json!({})).await;
    wait_for(&mut u1, "searching_stranger").await;

    send_event(&mut u2, "find_stranger", json!({})).await;
    let found_u2 = wait_for(&mut u2, "stranger_found").await;
    let found_u1 = wait_for(&mut u1, "stranger_found").await;
    assert_eq!(found_u1["room_id"], found_u2["room_id"]);
    assert_ne!(found_u1["partner_id"], found_u2["partner_id"]);

    send_event(&mut u1, "send_stranger_message", json!({ "message": "hello stranger" })).await;
    let msg = wait_for(&mut u2, "stranger_message").await;
    assert_eq!(msg["content"], "hello stranger");
    assert_eq!(msg["type"], "stranger_message");

    // u1 vanishes; u2 is told the stranger left
    u1.close(None).await.expect("close u1");
    wait_for(&mut u2, "stranger_disconnected").await;
}
