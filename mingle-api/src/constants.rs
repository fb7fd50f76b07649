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

use std::time::Duration;

/// How often the session actor pings the client.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// How long without a pong before the connection is considered dead.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket frame size cap.
pub const MAX_FRAME_SIZE: usize = 1_000_000;

/// Upload size cap (HTTP 413 beyond this).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME prefixes accepted by the upload endpoint.
pub const ALLOWED_MIME_PREFIXES: [&str; 6] = [
    "image/",
    "video/",
    "audio/",
    "text/",
    "application/pdf",
    "application/zip",
];

/// Reply previews are cut to this many characters.
pub const REPLY_PREVIEW_CHARS: usize = 50;

/// Default page size for `GET /messages/{room}`.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Vocabulary for generated anonymous usernames.
pub const ANON_ADJECTIVES: [&str; 12] = [
    "Anonymous",
    "Mystery",
    "Secret",
    "Hidden",
    "Unknown",
    "Phantom",
    "Shadow",
    "Silent",
    "Quiet",
    "Invisible",
    "Stranger",
    "Random",
];

pub const ANON_NOUNS: [&str; 12] = [
    "User",
    "Person",
    "Individual",
    "Someone",
    "Visitor",
    "Guest",
    "Wanderer",
    "Explorer",
    "Seeker",
    "Friend",
    "Companion",
    "Soul",
];
