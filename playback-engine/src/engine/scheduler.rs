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

//! Play, pause, reverse and speed, plus the per-tick work of each loop.

use super::timer::frame_period;
use super::Engine;
use crate::error::{PlayerError, Result};
use crate::messages::{Ack, PlayerEvent, RequestKind};
use crate::plan::plan_decode;
use crate::render::rasterize;
use crate::state::{Direction, Playback};

impl Engine {
    pub(super) fn start_loop(&mut self, direction: Direction) {
        self.state.direction = direction;
        self.state.playback = Playback::Playing;
        self.timer.start(frame_period(self.frame_rate(), self.state.speed));
        log::debug!(
            "[PLAYER] {direction:?} loop started at frame {} (period {:?})",
            self.state.frame_index,
            self.timer.period()
        );
    }

    fn end(&mut self) {
        self.timer.cancel();
        if self.state.playback != Playback::Ended {
            self.state.playback = Playback::Ended;
            log::info!("[PLAYER] Ended at frame {}", self.state.frame_index);
            self.emit(PlayerEvent::Ended);
        }
    }

    pub(super) fn play(&mut self) -> Result<Ack> {
        self.ensure_loaded()?;
        if self.state.is_playing_forward() {
            return Ok(self.ack(RequestKind::Play));
        }
        self.timer.cancel();

        let total = self.store.total_frames();
        if self.state.frame_index + 1 >= total {
            self.state.frame_index = 0;
        }
        self.start_loop(Direction::Forward);
        Ok(self.ack(RequestKind::Play))
    }

    pub(super) fn pause(&mut self) -> Ack {
        self.timer.cancel();
        if self.state.playback != Playback::Paused {
            self.state.playback = Playback::Paused;
            log::debug!("[PLAYER] Paused at frame {}", self.state.frame_index);
        }
        self.ack(RequestKind::Pause)
    }

    pub(super) fn set_speed(&mut self, multiplier: f64) -> Result<Ack> {
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(PlayerError::InvalidSpeed(multiplier));
        }
        self.state.speed = multiplier;
        if self.timer.is_active() {
            self.timer.start(frame_period(self.frame_rate(), multiplier));
        }
        Ok(self.ack(RequestKind::Speed))
    }

    /// Renders every frame up to the cursor into the frame cache, then
    /// starts the reverse loop.
    pub(super) async fn reverse(&mut self) -> Result<Ack> {
        self.ensure_loaded()?;
        if self.state.is_playing_reverse() {
            return Ok(self.ack(RequestKind::Reverse));
        }
        self.timer.cancel();

        let total = self.store.total_frames();
        if self.state.frame_index == 0 || self.state.frame_index >= total {
            self.state.frame_index = total.saturating_sub(1);
        }

        let last = self.state.frame_index;
        let before = self.video.submitted();
        for index in 0..=last {
            if self.cache.contains(index) {
                continue;
            }
            match plan_decode(&self.store, index, self.reference) {
                Ok(range) => {
                    self.decode_range(range, None, true).await?;
                }
                Err(e @ (PlayerError::NoChunkAtIndex(_) | PlayerError::NoSyncFrameFound(_))) => {
                    log::warn!("[FRAME_CACHE] Frame {index} left out of reverse cache: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        log::info!(
            "[FRAME_CACHE] Reverse pre-render of 0..={last} took {} decodes ({} cached frames, {} bytes)",
            self.video.submitted() - before,
            self.cache.len(),
            self.cache.total_bytes()
        );

        self.start_loop(Direction::Reverse);
        Ok(self.ack(RequestKind::Reverse))
    }

    pub(super) async fn forward_tick(&mut self) -> Result<()> {
        let index = self.state.frame_index;
        if index >= self.store.total_frames() {
            self.end();
            return Ok(());
        }

        match plan_decode(&self.store, index, self.reference) {
            Ok(range) => {
                if let Some(picture) = self.decode_range(range, None, false).await? {
                    self.sink.present(&picture);
                }
            }
            Err(PlayerError::NoChunkAtIndex(_)) => {
                log::debug!("[PLAYER] Frame {index} not received yet; waiting");
                return Ok(());
            }
            Err(e @ PlayerError::NoSyncFrameFound(_)) => {
                log::warn!("[PLAYER] Skipping undecodable frame: {e}");
            }
            Err(e) => return Err(e),
        }

        self.state.frame_index = index + 1;
        self.emit_position();
        Ok(())
    }

    pub(super) async fn reverse_tick(&mut self) -> Result<()> {
        let index = self.state.frame_index;
        match self.cache.get(index) {
            Some(snapshot) => self.sink.present_snapshot(&snapshot),
            None => match plan_decode(&self.store, index, self.reference) {
                // Evicted under the memory budget: rebuild from the codec.
                Ok(range) => {
                    if let Some(picture) = self.decode_range(range, None, false).await? {
                        self.cache.insert(index, rasterize(&picture));
                        self.sink.present(&picture);
                    }
                }
                Err(e @ (PlayerError::NoChunkAtIndex(_) | PlayerError::NoSyncFrameFound(_))) => {
                    log::warn!("[PLAYER] Skipping frame in reverse: {e}");
                }
                Err(e) => return Err(e),
            },
        }

        if index == 0 {
            self.end();
            return Ok(());
        }
        self.state.frame_index = index - 1;
        self.emit_position();
        Ok(())
    }
}
