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

//! The single-threaded playback core.
//!
//! `Engine` owns every piece of mutable playback state. It is driven by the
//! worker loop, which hands it one container event, request or timer tick
//! at a time, so no two operations ever overlap.

mod scheduler;
mod seek;
pub mod timer;

use crate::audio::AudioAssembler;
use crate::chunk_store::{ChunkStore, TrackKind};
use crate::config::PlayerConfig;
use crate::decoder::{AudioDecoder, DecodeSession, VideoDecoder};
use crate::error::{PlayerError, Result};
use crate::frame::DecodedPicture;
use crate::frame_cache::{CacheStats, FrameCache};
use crate::messages::{Ack, ContainerEvent, PlayerEvent, PlayerRequest, RequestKind};
use crate::render::{rasterize, RenderSink};
use crate::state::{Direction, Playback, PlaybackState, Status};
use std::ops::RangeInclusive;
use std::time::Duration;
use timer::LoopTimer;
use tokio::sync::mpsc;

pub struct Engine {
    config: PlayerConfig,
    state: PlaybackState,
    store: ChunkStore,
    cache: FrameCache,
    video: DecodeSession<VideoDecoder>,
    audio: Option<DecodeSession<AudioDecoder>>,
    audio_delivered: bool,
    sink: Box<dyn RenderSink>,
    events: mpsc::UnboundedSender<PlayerEvent>,
    timer: LoopTimer,
    /// Last frame the video codec decoded successfully. `None` when the
    /// codec state is unknown (fresh, failed or abandoned).
    reference: Option<usize>,
}

impl Engine {
    pub fn new(
        config: PlayerConfig,
        video: VideoDecoder,
        audio: Option<AudioDecoder>,
        sink: Box<dyn RenderSink>,
        events: mpsc::UnboundedSender<PlayerEvent>,
    ) -> Self {
        let speed = if config.initial_speed.is_finite() && config.initial_speed > 0.0 {
            config.initial_speed
        } else {
            log::warn!(
                "[PLAYER] Ignoring invalid initial speed {}",
                config.initial_speed
            );
            1.0
        };
        let state = PlaybackState::new(speed);
        let cache = FrameCache::new(config.frame_cache_budget_bytes);
        Self {
            config,
            state,
            store: ChunkStore::new(),
            cache,
            video: DecodeSession::new(video),
            audio: audio.map(DecodeSession::new),
            audio_delivered: false,
            sink,
            events,
            timer: LoopTimer::new(),
            reference: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolves when the active playback loop is due for a tick.
    pub async fn next_tick(&mut self) {
        self.timer.tick().await
    }

    fn emit(&self, event: PlayerEvent) {
        // Nobody listening is not an error; the caller may only use acks.
        let _ = self.events.send(event);
    }

    fn set_status(&mut self, status: Status) {
        if self.state.transition(status) {
            log::info!("[PLAYER] Status -> {status:?}");
            self.emit(PlayerEvent::Status { status });
        }
    }

    /// Stops everything after an unrecoverable decode failure.
    fn fail(&mut self, error: &PlayerError) {
        log::error!("[PLAYER] Session failed: {error}");
        self.timer.cancel();
        self.reference = None;
        self.state.seeking = false;
        self.state.playback = Playback::Paused;
        self.set_status(Status::Error);
        self.emit(PlayerEvent::Error {
            error: error.to_string(),
        });
    }

    fn failed(&self) -> bool {
        self.state.status == Status::Error
    }

    fn frame_rate(&self) -> f64 {
        self.store.video_metadata().map_or(0.0, |m| m.frame_rate)
    }

    fn time_of(&self, frame: usize) -> f64 {
        self.store.video_metadata().map_or(0.0, |m| m.time_of(frame))
    }

    fn emit_position(&self) {
        let frame = self.state.frame_index;
        self.emit(PlayerEvent::FrameUpdated { frame });
        self.emit(PlayerEvent::TimeUpdated {
            time: self.time_of(frame),
        });
    }

    /// Playback needs units, a frame rate and a configured codec.
    fn ensure_loaded(&self) -> Result<()> {
        if self.store.is_empty()
            || self.store.video_metadata().is_none()
            || !self.video.is_configured()
        {
            return Err(PlayerError::NotLoaded);
        }
        Ok(())
    }

    pub async fn handle_container(&mut self, event: ContainerEvent) {
        if self.failed() {
            log::debug!("[PLAYER] Ignoring container event after failure");
            return;
        }
        self.set_status(Status::Loading);

        let mut became_ready = false;
        match event {
            ContainerEvent::VideoConfig { config } => {
                if let Err(e) = self.video.configure(&config) {
                    self.fail(&e);
                    return;
                }
                self.reference = None;
                log::info!(
                    "[PLAYER] Video decoder configured: {} {}x{}",
                    config.codec,
                    config.coded_width,
                    config.coded_height
                );
                self.emit(PlayerEvent::Config { config });
            }
            ContainerEvent::VideoMetadata { metadata } => {
                if self.store.video_metadata().is_none() {
                    self.emit(PlayerEvent::Metadata {
                        metadata: metadata.clone(),
                    });
                }
                became_ready = self.store.set_video_metadata(metadata);
            }
            ContainerEvent::VideoChunk { unit } => {
                became_ready = self.store.append(TrackKind::Video, unit);
            }
            ContainerEvent::AudioConfig { config } => match self.audio.as_mut() {
                Some(session) => {
                    if let Err(e) = session.configure(&config) {
                        self.fail(&e);
                        return;
                    }
                }
                None => log::warn!("[AUDIO] No audio decoder; audio track ignored"),
            },
            ContainerEvent::AudioMetadata { metadata } => {
                if self.store.audio_metadata().is_none() {
                    self.emit(PlayerEvent::AudioMetadata {
                        metadata: metadata.clone(),
                    });
                }
                became_ready = self.store.set_audio_metadata(metadata);
            }
            ContainerEvent::AudioChunk { unit } => {
                became_ready = self.store.append(TrackKind::Audio, unit);
            }
        }

        if became_ready {
            self.set_status(Status::Ready);
        }
        if let Err(e) = self.assemble_audio().await {
            self.fail(&e);
        }
    }

    /// Decodes the whole audio track once every unit is present and emits
    /// the assembled buffer.
    async fn assemble_audio(&mut self) -> Result<()> {
        if self.audio_delivered || !self.store.is_ready() || !self.store.audio_complete() {
            return Ok(());
        }
        let (Some(session), Some(metadata)) = (self.audio.as_mut(), self.store.audio_metadata())
        else {
            return Ok(());
        };
        if !session.is_configured() {
            return Ok(());
        }

        let mut assembler = AudioAssembler::new(metadata.clone());
        let mut buffer = None;
        for unit in self.store.audio_units() {
            let segment = session.decode(unit.clone()).await?;
            if let Some(complete) = assembler.push(segment) {
                buffer = Some(complete);
                break;
            }
        }
        let Some(buffer) = buffer.or_else(|| assembler.finish()) else {
            return Ok(());
        };

        self.audio_delivered = true;
        self.emit(PlayerEvent::AudioReady { buffer });
        Ok(())
    }

    /// Runs one request to completion and acknowledges it on the event
    /// stream. The result is also returned for the caller that sent it.
    pub async fn handle_request(&mut self, request: PlayerRequest) -> Result<Ack> {
        let kind = request.kind();
        let result = if self.failed() {
            Err(PlayerError::SessionFailed)
        } else {
            self.dispatch(request).await
        };

        if let Err(e) = &result {
            if e.is_fatal() {
                self.fail(e);
            } else {
                log::warn!("[PLAYER] {kind:?} rejected: {e}");
            }
        }
        self.emit(PlayerEvent::Ack {
            request: kind,
            error: result.as_ref().err().map(ToString::to_string),
        });
        result
    }

    async fn dispatch(&mut self, request: PlayerRequest) -> Result<Ack> {
        match request {
            PlayerRequest::Play => self.play(),
            PlayerRequest::Reverse => self.reverse().await,
            PlayerRequest::Pause => Ok(self.pause()),
            PlayerRequest::Seek { target } => self.seek(target).await,
            PlayerRequest::Speed { multiplier } => self.set_speed(multiplier),
            PlayerRequest::Next => self.next_frame().await,
        }
    }

    fn ack(&self, request: RequestKind) -> Ack {
        Ack {
            request,
            frame_index: self.state.frame_index,
            snapshot: None,
        }
    }

    pub async fn on_tick(&mut self) {
        let result = match self.state.direction {
            Direction::Forward => self.forward_tick().await,
            Direction::Reverse => self.reverse_tick().await,
        };
        if let Err(e) = result {
            if e.is_fatal() {
                self.fail(&e);
            } else {
                log::warn!("[PLAYER] Tick skipped: {e}");
            }
        }
    }

    /// Feeds `range` to the codec in order and returns the last picture.
    /// Each intermediate picture is released before the next unit is
    /// submitted; with `cache` set, every picture not yet cached is
    /// rasterized first.
    ///
    /// With a `deadline`, each unit gets that long; a miss abandons the
    /// submission and yields `Ok(None)`.
    async fn decode_range(
        &mut self,
        range: RangeInclusive<usize>,
        deadline: Option<Duration>,
        cache: bool,
    ) -> Result<Option<DecodedPicture>> {
        let mut last: Option<DecodedPicture> = None;
        for index in range {
            // The codec may recycle the picture buffer for the next output.
            drop(last.take());
            let unit = self
                .store
                .get(index)
                .cloned()
                .ok_or(PlayerError::NoChunkAtIndex(index))?;

            let decoded = match deadline {
                Some(timeout) => self.video.decode_within(unit, timeout).await,
                None => self.video.decode(unit).await.map(Some),
            };
            let picture = match decoded {
                Ok(Some(picture)) => picture,
                Ok(None) => {
                    self.reference = None;
                    return Ok(None);
                }
                Err(e) => {
                    self.reference = None;
                    return Err(e);
                }
            };
            self.reference = Some(index);
            if cache && !self.cache.contains(index) {
                self.cache.insert(index, rasterize(&picture));
            }
            last = Some(picture);
        }
        Ok(last)
    }
}
