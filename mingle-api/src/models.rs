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

use crate::actors::chat_server::ChatServer;
use crate::api::uploads::UploadStore;
use actix::Addr;

/// Shared application state handed to every HTTP worker.
#[derive(Clone)]
pub struct AppState {
    pub chat: Addr<ChatServer>,
    pub uploads: UploadStore,
}
