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

//! A frame-accurate playback engine for inter-predicted video.
//!
//! Container events fill a [`chunk_store::ChunkStore`]; a single
//! [`decoder::DecodeSession`] turns coded units into pictures one at a time;
//! the engine schedules forward playback, reverse playback through a
//! [`frame_cache::FrameCache`], seeking and frame stepping on top of it.
//! Everything runs on one task started by [`spawn_player`].

pub mod audio;
pub mod chunk_store;
pub mod config;
pub mod crop;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod frame;
pub mod frame_cache;
pub mod messages;
pub mod plan;
pub mod render;
pub mod state;
mod worker;

pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use messages::{Ack, ContainerEvent, PlayerEvent, PlayerRequest, RequestKind, SeekTarget};
pub use state::{Direction, Playback, PlaybackState, Status};
pub use worker::{spawn_player, PlayerHandle};
