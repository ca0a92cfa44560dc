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

#![allow(dead_code)]

use playback_engine::decoder::test_pattern::{DecodeProbe, TestPatternDecoder, TestPatternSource};
use playback_engine::decoder::AudioDecoder;
use playback_engine::render::RecordingSink;
use playback_engine::{spawn_player, PlayerConfig, PlayerEvent, PlayerHandle, Status};
use std::time::Duration;
use tokio::sync::mpsc;

/// Ten frames at 10 fps with sync units at 0 and 5.
pub fn ten_frames() -> TestPatternSource {
    TestPatternSource::new(10, 10.0).with_gop(5).with_size(4, 4)
}

pub struct Harness {
    pub handle: PlayerHandle,
    pub events: mpsc::UnboundedReceiver<PlayerEvent>,
    pub sink: RecordingSink,
    pub probe: DecodeProbe,
    pub source: TestPatternSource,
}

impl Harness {
    pub fn new(source: TestPatternSource) -> Self {
        Self::start(source, TestPatternDecoder::new(), None, PlayerConfig::default())
    }

    pub fn start(
        source: TestPatternSource,
        decoder: TestPatternDecoder,
        audio: Option<AudioDecoder>,
        config: PlayerConfig,
    ) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let sink = RecordingSink::new();
        let probe = decoder.probe();
        let (handle, events) = spawn_player(config, Box::new(decoder), audio, Box::new(sink.clone()));
        Self {
            handle,
            events,
            sink,
            probe,
            source,
        }
    }

    /// Pushes every container event and waits until the player is ready.
    pub async fn load(&mut self) {
        self.handle.push_all(self.source.events()).unwrap();
        let state = self.handle.state().await.unwrap();
        assert_eq!(state.status, Status::Ready, "player should be ready after loading");
    }

    /// Events emitted so far that have not been read yet.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Collects events up to and including the first one matching `done`.
    pub async fn wait_for(&mut self, done: impl Fn(&PlayerEvent) -> bool) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        let collect = async {
            while let Some(event) = self.events.recv().await {
                let finished = done(&event);
                events.push(event);
                if finished {
                    return;
                }
            }
            panic!("event stream closed");
        };
        tokio::time::timeout(Duration::from_secs(600), collect)
            .await
            .expect("timed out waiting for event");
        events
    }

    pub async fn wait_for_end(&mut self) -> Vec<PlayerEvent> {
        self.wait_for(|e| matches!(e, PlayerEvent::Ended)).await
    }

    /// Frame indices of everything the sink presented, in order.
    pub fn presented_frames(&self) -> Vec<usize> {
        self.sink
            .presented()
            .into_iter()
            .map(|timestamp| {
                (0..self.source.total_frames)
                    .find(|&i| self.source.timestamp_of(i) == timestamp)
                    .expect("presented an unknown timestamp")
            })
            .collect()
    }

    pub async fn frame_index(&self) -> usize {
        self.handle.state().await.unwrap().frame_index
    }
}

pub fn frames_updated(events: &[PlayerEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::FrameUpdated { frame } => Some(*frame),
            _ => None,
        })
        .collect()
}

pub fn last_time(events: &[PlayerEvent]) -> Option<f64> {
    events.iter().rev().find_map(|e| match e {
        PlayerEvent::TimeUpdated { time } => Some(*time),
        _ => None,
    })
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
