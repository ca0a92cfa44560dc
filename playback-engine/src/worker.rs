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

//! Runs an `Engine` on its own task and exposes it through a handle.

use crate::config::PlayerConfig;
use crate::decoder::{AudioDecoder, VideoDecoder};
use crate::engine::Engine;
use crate::error::{PlayerError, Result};
use crate::frame_cache::CacheStats;
use crate::messages::{Ack, ContainerEvent, PlayerEvent, PlayerRequest, SeekTarget};
use crate::render::RenderSink;
use crate::state::PlaybackState;
use tokio::sync::{mpsc, oneshot};

enum Inbound {
    Container(ContainerEvent),
    Request(PlayerRequest, oneshot::Sender<Result<Ack>>),
    State(oneshot::Sender<PlaybackState>),
    CacheStats(oneshot::Sender<CacheStats>),
}

enum Wake {
    Inbound(Inbound),
    Tick,
}

/// Cheap to clone. The player task stops once every handle is dropped.
#[derive(Clone)]
pub struct PlayerHandle {
    inbox: mpsc::UnboundedSender<Inbound>,
}

/// Starts a player on the current tokio runtime.
///
/// Returns the handle used to feed it and the stream of events it emits.
pub fn spawn_player(
    config: PlayerConfig,
    video: VideoDecoder,
    audio: Option<AudioDecoder>,
    sink: Box<dyn RenderSink>,
) -> (PlayerHandle, mpsc::UnboundedReceiver<PlayerEvent>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (inbox, rx) = mpsc::unbounded_channel();
    let engine = Engine::new(config, video, audio, sink, events_tx);
    tokio::spawn(run(engine, rx));
    (PlayerHandle { inbox }, events_rx)
}

async fn run(mut engine: Engine, mut inbox: mpsc::UnboundedReceiver<Inbound>) {
    log::debug!("[PLAYER] Worker started");
    loop {
        // Messages win over ticks so a pause lands before the next frame.
        let wake = tokio::select! {
            biased;
            message = inbox.recv() => match message {
                Some(message) => Wake::Inbound(message),
                None => break,
            },
            _ = engine.next_tick() => Wake::Tick,
        };

        match wake {
            Wake::Tick => engine.on_tick().await,
            Wake::Inbound(Inbound::Container(event)) => engine.handle_container(event).await,
            Wake::Inbound(Inbound::Request(request, reply)) => {
                let result = engine.handle_request(request).await;
                let _ = reply.send(result);
            }
            Wake::Inbound(Inbound::State(reply)) => {
                let _ = reply.send(engine.state().clone());
            }
            Wake::Inbound(Inbound::CacheStats(reply)) => {
                let _ = reply.send(engine.cache_stats());
            }
        }
    }
    log::debug!("[PLAYER] All handles dropped; worker stopped");
}

impl PlayerHandle {
    fn send(&self, message: Inbound) -> Result<()> {
        self.inbox.send(message).map_err(|_| PlayerError::Closed)
    }

    /// Forwards one container event. Events are applied in the order pushed.
    pub fn push(&self, event: ContainerEvent) -> Result<()> {
        self.send(Inbound::Container(event))
    }

    pub fn push_all(&self, events: impl IntoIterator<Item = ContainerEvent>) -> Result<()> {
        events.into_iter().try_for_each(|event| self.push(event))
    }

    /// Sends a request and waits for its acknowledgement.
    pub async fn request(&self, request: PlayerRequest) -> Result<Ack> {
        let (reply, response) = oneshot::channel();
        self.send(Inbound::Request(request, reply))?;
        response.await.map_err(|_| PlayerError::Closed)?
    }

    pub async fn play(&self) -> Result<Ack> {
        self.request(PlayerRequest::Play).await
    }

    pub async fn reverse(&self) -> Result<Ack> {
        self.request(PlayerRequest::Reverse).await
    }

    pub async fn pause(&self) -> Result<Ack> {
        self.request(PlayerRequest::Pause).await
    }

    pub async fn seek(&self, target: SeekTarget) -> Result<Ack> {
        self.request(PlayerRequest::Seek { target }).await
    }

    pub async fn speed(&self, multiplier: f64) -> Result<Ack> {
        self.request(PlayerRequest::Speed { multiplier }).await
    }

    pub async fn next(&self) -> Result<Ack> {
        self.request(PlayerRequest::Next).await
    }

    /// A copy of the current playback state.
    pub async fn state(&self) -> Result<PlaybackState> {
        let (reply, response) = oneshot::channel();
        self.send(Inbound::State(reply))?;
        response.await.map_err(|_| PlayerError::Closed)
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        let (reply, response) = oneshot::channel();
        self.send(Inbound::CacheStats(reply))?;
        response.await.map_err(|_| PlayerError::Closed)
    }
}
