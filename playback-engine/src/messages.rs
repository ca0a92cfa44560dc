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

//! Message types crossing the player boundary.
//!
//! Inbound: container events from the parser and requests from the caller.
//! Outbound: one event per state transition, in order, never batched.

use crate::audio::AudioBuffer;
use crate::frame::{
    AudioDecoderConfig, AudioMetadata, CodedUnit, FrameSnapshot, VideoDecoderConfig,
    VideoMetadata,
};
use crate::state::Status;
use serde::{Deserialize, Serialize};

/// Events emitted by the container parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ContainerEvent {
    VideoConfig { config: VideoDecoderConfig },
    VideoMetadata { metadata: VideoMetadata },
    VideoChunk { unit: CodedUnit },
    AudioConfig { config: AudioDecoderConfig },
    AudioMetadata { metadata: AudioMetadata },
    AudioChunk { unit: CodedUnit },
}

/// Where to seek to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum SeekTarget {
    Frame(usize),
    /// Position in seconds, converted with the track frame rate.
    Time(f64),
}

/// Requests accepted from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum PlayerRequest {
    Play,
    Reverse,
    Pause,
    Seek { target: SeekTarget },
    Speed { multiplier: f64 },
    /// Decode and present exactly one frame at the cursor, then advance.
    Next,
}

impl PlayerRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            PlayerRequest::Play => RequestKind::Play,
            PlayerRequest::Reverse => RequestKind::Reverse,
            PlayerRequest::Pause => RequestKind::Pause,
            PlayerRequest::Seek { .. } => RequestKind::Seek,
            PlayerRequest::Speed { .. } => RequestKind::Speed,
            PlayerRequest::Next => RequestKind::Next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Play,
    Reverse,
    Pause,
    Seek,
    Speed,
    Next,
}

/// Successful completion of a request, returned to the caller that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub request: RequestKind,
    /// Cursor after the request was handled.
    pub frame_index: usize,
    /// The presented frame, for `Next`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<FrameSnapshot>,
}

/// Events sent back to the owner of the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    Status { status: Status },
    Config { config: VideoDecoderConfig },
    Metadata { metadata: VideoMetadata },
    AudioMetadata { metadata: AudioMetadata },
    FrameUpdated { frame: usize },
    TimeUpdated { time: f64 },
    Ended,
    AudioReady { buffer: AudioBuffer },
    /// Acknowledgement of a request; `error` is set when it failed.
    Ack {
        request: RequestKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A session-scoped failure. Playback is stopped until reinitialized.
    Error { error: String },
}
