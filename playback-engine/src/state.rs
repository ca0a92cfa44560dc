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

//! Playback state owned by the scheduler.

use serde::{Deserialize, Serialize};

/// Loading status. Moves forward only, except that `Error` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Playback {
    Paused,
    Playing,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

/// Everything a caller can observe about a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub status: Status,
    pub playback: Playback,
    pub direction: Direction,
    pub speed: f64,
    /// Next frame the forward loop decodes, or the frame the reverse loop
    /// presents next.
    pub frame_index: usize,
    pub seeking: bool,
}

impl PlaybackState {
    pub fn new(speed: f64) -> Self {
        Self {
            status: Status::Idle,
            playback: Playback::Paused,
            direction: Direction::Forward,
            speed,
            frame_index: 0,
            seeking: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback == Playback::Playing
    }

    pub fn is_playing_forward(&self) -> bool {
        self.is_playing() && self.direction == Direction::Forward
    }

    pub fn is_playing_reverse(&self) -> bool {
        self.is_playing() && self.direction == Direction::Reverse
    }

    /// Applies a status change and reports whether anything changed.
    /// `Error` is sticky; nothing moves back to `Idle` or `Loading`.
    pub fn transition(&mut self, next: Status) -> bool {
        let allowed = match (self.status, next) {
            (Status::Error, _) => false,
            (current, next) if current == next => false,
            (_, Status::Error) => true,
            (Status::Idle, _) => true,
            (Status::Loading, Status::Ready) => true,
            _ => false,
        };
        if allowed {
            self.status = next;
        }
        allowed
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(1.0)
    }
}
