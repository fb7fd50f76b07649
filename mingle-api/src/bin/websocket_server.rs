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

use actix::Actor;
use actix_cors::Cors;
use actix_files::Files;
use actix_web::{web, App, HttpServer};
use mingle_api::{
    actors::chat_server::ChatServer,
    api::{self, uploads},
    lobby,
    models::AppState,
};
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    info!("start");

    let port = std::env::var("ACTIX_PORT")
        .unwrap_or_else(|_| String::from("8080"))
        .parse::<u16>()?;
    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| String::from("uploads"));

    let chat = ChatServer::new().start();
    let upload_store = uploads::UploadStore::new(&upload_dir)?;
    info!(port, upload_dir = %upload_dir, "listening");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(AppState {
                chat: chat.clone(),
                uploads: upload_store.clone(),
            }))
            .wrap(cors)
            .service(lobby::ws_connect)
            .service(api::health)
            .service(api::stats)
            .service(api::debug_snapshot)
            .service(api::debug_connections)
            .service(api::debug_user)
            .service(api::room_messages)
            .service(api::edit_message)
            .service(api::delete_message)
            .service(api::prometheus_metrics)
            .service(uploads::upload)
            .service(Files::new("/uploads", upload_store.dir()))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;
    Ok(())
}
