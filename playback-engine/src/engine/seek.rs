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

//! Random access: seeking and single-frame stepping.

use super::Engine;
use crate::error::{PlayerError, Result};
use crate::messages::{Ack, RequestKind, SeekTarget};
use crate::plan::plan_decode;
use crate::render::rasterize;
use crate::state::{Direction, Playback};

impl Engine {
    /// Converts a seek target to a frame index inside the track.
    pub(super) fn resolve_target(&self, target: SeekTarget) -> usize {
        let last = self.store.total_frames().saturating_sub(1);
        let frame = match target {
            SeekTarget::Frame(frame) => frame,
            SeekTarget::Time(seconds) => {
                let position = (seconds * self.frame_rate()).floor();
                if position.is_finite() && position > 0.0 {
                    position as usize
                } else {
                    0
                }
            }
        };
        frame.min(last)
    }

    /// Decodes and presents the target frame, leaving the cursor on it. An
    /// active loop resumes forward from there.
    pub(super) async fn seek(&mut self, target: SeekTarget) -> Result<Ack> {
        self.ensure_loaded()?;
        let frame = self.resolve_target(target);
        let was_playing = self.state.is_playing();
        let previous = self.state.direction;

        // An unplannable target leaves the current loop untouched.
        let range = plan_decode(&self.store, frame, self.reference)?;

        self.timer.cancel();
        self.state.seeking = true;
        log::debug!(
            "[PLAYER] Seeking to frame {frame} via {}..={} (was {previous:?})",
            range.start(),
            range.end()
        );
        let picture = self.decode_range(range, None, false).await;
        self.state.seeking = false;

        if let Some(picture) = picture? {
            self.sink.present(&picture);
        }
        self.state.frame_index = frame;
        self.state.direction = Direction::Forward;
        if was_playing {
            self.start_loop(Direction::Forward);
        } else {
            self.state.playback = Playback::Paused;
        }
        Ok(self.ack(RequestKind::Seek))
    }

    /// Presents the frame at the cursor and advances past it, without
    /// touching the playback loop. Each attempt waits a bounded time for
    /// the codec; a stalled attempt is abandoned and retried from a fresh
    /// decode plan.
    pub(super) async fn next_frame(&mut self) -> Result<Ack> {
        self.ensure_loaded()?;
        let index = self.state.frame_index;
        if index >= self.store.total_frames() {
            return Err(PlayerError::EndOfStream);
        }

        let attempts = self.config.next_frame_retries.max(1);
        let timeout = self.config.next_frame_timeout;
        for attempt in 1..=attempts {
            let range = plan_decode(&self.store, index, self.reference)?;
            match self.decode_range(range, Some(timeout), false).await? {
                Some(picture) => {
                    self.sink.present(&picture);
                    let snapshot = rasterize(&picture);
                    self.state.frame_index = index + 1;
                    return Ok(Ack {
                        request: RequestKind::Next,
                        frame_index: self.state.frame_index,
                        snapshot: Some(snapshot),
                    });
                }
                None => {
                    log::warn!(
                        "[PLAYER] Frame {index} not decoded within {timeout:?} (attempt {attempt}/{attempts})"
                    );
                }
            }
        }
        Err(PlayerError::DecodeTimeout {
            frame: index,
            attempts,
        })
    }
}
