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

//! A synthetic container and matching codecs.
//!
//! The pattern codec is strict about references: a predicted unit decodes
//! only if the unit right before it was the last thing decoded. Feeding it
//! out of order produces a decode error, which makes reference mistakes in
//! the scheduler visible in tests.

use super::{Decodable, DecoderOutput, OutputCallback};
use crate::audio::AudioSegment;
use crate::error::{PlayerError, Result};
use crate::frame::{
    AudioDecoderConfig, AudioMetadata, CodedUnit, DecodedPicture, UnitKind, VideoDecoderConfig,
    VideoMetadata,
};
use crate::messages::ContainerEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const PATTERN_CODEC: &str = "test-pattern";
pub const TONE_CODEC: &str = "test-tone";

const SYNC_MARKER: u8 = 0;
const PREDICTED_MARKER: u8 = 1;

/// Writes the frame index and kind into a unit payload.
pub fn encode_payload(index: usize, kind: UnitKind) -> Vec<u8> {
    let mut data = (index as u32).to_le_bytes().to_vec();
    data.push(match kind {
        UnitKind::Sync => SYNC_MARKER,
        UnitKind::Predicted => PREDICTED_MARKER,
    });
    data
}

/// Reads back what `encode_payload` wrote.
pub fn decode_payload(data: &[u8]) -> DecoderOutput<(usize, UnitKind)> {
    let (index, rest) = data
        .split_first_chunk::<4>()
        .ok_or_else(|| format!("truncated unit ({} bytes)", data.len()))?;
    let kind = match rest.first() {
        Some(&SYNC_MARKER) => UnitKind::Sync,
        Some(&PREDICTED_MARKER) => UnitKind::Predicted,
        other => return Err(format!("unknown unit marker {other:?}")),
    };
    Ok((u32::from_le_bytes(*index) as usize, kind))
}

/// Color used to paint frame `index`.
pub fn pattern_color(index: usize) -> [u8; 4] {
    [
        (index * 37 % 256) as u8,
        (index * 91 % 256) as u8,
        (index * 13 % 256) as u8,
        255,
    ]
}

/// Parameters of the synthetic tone track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneTrack {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub units: usize,
    pub samples_per_unit: usize,
}

/// Produces the container events a demuxer would emit for a synthetic clip.
#[derive(Debug, Clone)]
pub struct TestPatternSource {
    pub total_frames: usize,
    pub frame_rate: f64,
    pub gop: usize,
    pub width: u32,
    pub height: u32,
    sync_frames: Option<Vec<usize>>,
    audio: Option<ToneTrack>,
}

impl TestPatternSource {
    pub fn new(total_frames: usize, frame_rate: f64) -> Self {
        Self {
            total_frames,
            frame_rate,
            gop: 30,
            width: 64,
            height: 36,
            sync_frames: None,
            audio: None,
        }
    }

    /// A sync unit every `gop` frames, starting at 0.
    pub fn with_gop(mut self, gop: usize) -> Self {
        self.gop = gop.max(1);
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Places sync units exactly at `frames`. An empty list yields a clip
    /// with no sync unit at all.
    pub fn with_sync_frames(mut self, frames: Vec<usize>) -> Self {
        self.sync_frames = Some(frames);
        self
    }

    pub fn with_audio(mut self, track: ToneTrack) -> Self {
        self.audio = Some(track);
        self
    }

    pub fn is_sync(&self, index: usize) -> bool {
        match &self.sync_frames {
            Some(frames) => frames.contains(&index),
            None => index % self.gop == 0,
        }
    }

    fn micros(&self, index: usize) -> i64 {
        if self.frame_rate <= 0.0 {
            return 0;
        }
        (index as f64 * 1_000_000.0 / self.frame_rate).round() as i64
    }

    pub fn video_config(&self) -> VideoDecoderConfig {
        VideoDecoderConfig {
            codec: PATTERN_CODEC.to_string(),
            coded_width: self.width,
            coded_height: self.height,
            description: Vec::new(),
        }
    }

    pub fn video_metadata(&self) -> VideoMetadata {
        VideoMetadata {
            frame_rate: self.frame_rate,
            total_frames: self.total_frames,
            duration_seconds: if self.frame_rate > 0.0 {
                self.total_frames as f64 / self.frame_rate
            } else {
                0.0
            },
        }
    }

    pub fn unit(&self, index: usize) -> CodedUnit {
        let kind = if self.is_sync(index) {
            UnitKind::Sync
        } else {
            UnitKind::Predicted
        };
        CodedUnit::new(
            kind,
            self.micros(index),
            self.micros(index + 1) - self.micros(index),
            encode_payload(index, kind),
        )
    }

    /// Timestamp the pattern codec stamps on frame `index`.
    pub fn timestamp_of(&self, index: usize) -> i64 {
        self.micros(index)
    }

    pub fn audio_config(&self) -> Option<AudioDecoderConfig> {
        self.audio.map(|track| AudioDecoderConfig {
            codec: TONE_CODEC.to_string(),
            sample_rate: track.sample_rate,
            channel_count: track.channel_count,
            description: Vec::new(),
        })
    }

    pub fn audio_metadata(&self) -> Option<AudioMetadata> {
        self.audio.map(|track| AudioMetadata {
            sample_rate: track.sample_rate,
            channel_count: track.channel_count,
            total_units: track.units,
            total_samples: track.units * track.samples_per_unit,
        })
    }

    fn audio_units(&self) -> Vec<CodedUnit> {
        let Some(track) = self.audio else {
            return Vec::new();
        };
        let unit_micros = if track.sample_rate > 0 {
            (track.samples_per_unit as u64 * 1_000_000 / u64::from(track.sample_rate)) as i64
        } else {
            0
        };
        (0..track.units)
            .map(|i| {
                CodedUnit::new(
                    UnitKind::Sync,
                    i as i64 * unit_micros,
                    unit_micros,
                    (track.samples_per_unit as u32).to_le_bytes().to_vec(),
                )
            })
            .collect()
    }

    /// Every event of the clip in container order: configuration and
    /// metadata first, then the video units, then the audio units.
    pub fn events(&self) -> Vec<ContainerEvent> {
        let mut events = vec![
            ContainerEvent::VideoConfig {
                config: self.video_config(),
            },
            ContainerEvent::VideoMetadata {
                metadata: self.video_metadata(),
            },
        ];
        if let (Some(config), Some(metadata)) = (self.audio_config(), self.audio_metadata()) {
            events.push(ContainerEvent::AudioConfig { config });
            events.push(ContainerEvent::AudioMetadata { metadata });
        }
        events.extend(
            (0..self.total_frames).map(|i| ContainerEvent::VideoChunk { unit: self.unit(i) }),
        );
        events.extend(
            self.audio_units()
                .into_iter()
                .map(|unit| ContainerEvent::AudioChunk { unit }),
        );
        events
    }
}

/// Shared view into what a `TestPatternDecoder` did.
#[derive(Debug, Clone, Default)]
pub struct DecodeProbe {
    decoded: Arc<Mutex<Vec<usize>>>,
    live: Arc<AtomicUsize>,
    live_at_submit: Arc<Mutex<Vec<usize>>>,
}

impl DecodeProbe {
    /// Frame indices decoded so far, in codec order.
    pub fn decoded(&self) -> Vec<usize> {
        self.decoded
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.decoded.lock() {
            log.clear();
        }
    }

    /// Pictures produced and not yet dropped.
    pub fn live_pictures(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Live pictures observed at each `decode` call, in submission order.
    pub fn live_at_submit(&self) -> Vec<usize> {
        self.live_at_submit
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn record_submit(&self) {
        if let Ok(mut log) = self.live_at_submit.lock() {
            log.push(self.live_pictures());
        }
    }

    fn record(&self, index: usize) {
        if let Ok(mut log) = self.decoded.lock() {
            log.push(index);
        }
    }
}

#[derive(Debug, Clone)]
struct PatternRules {
    width: u32,
    height: u32,
    latency: Duration,
    slow_frames: HashMap<usize, Duration>,
    fail_at: Option<usize>,
}

impl PatternRules {
    fn latency_for(&self, index: usize) -> Duration {
        self.slow_frames
            .get(&index)
            .copied()
            .unwrap_or(self.latency)
    }
}

/// Paints each frame a solid color derived from its index.
///
/// Work happens on a tokio task spawned at `configure`, one unit at a time in
/// submission order, with an optional artificial latency per unit.
pub struct TestPatternDecoder {
    rules: PatternRules,
    probe: DecodeProbe,
    jobs: Option<mpsc::UnboundedSender<Arc<CodedUnit>>>,
}

impl TestPatternDecoder {
    pub fn new() -> Self {
        Self {
            rules: PatternRules {
                width: 0,
                height: 0,
                latency: Duration::ZERO,
                slow_frames: HashMap::new(),
                fail_at: None,
            },
            probe: DecodeProbe::default(),
            jobs: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.rules.latency = latency;
        self
    }

    /// Overrides the latency of one frame.
    pub fn with_slow_frame(mut self, index: usize, latency: Duration) -> Self {
        self.rules.slow_frames.insert(index, latency);
        self
    }

    /// Rejects the unit carrying frame `index`.
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.rules.fail_at = Some(index);
        self
    }

    pub fn probe(&self) -> DecodeProbe {
        self.probe.clone()
    }
}

impl Default for TestPatternDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(
    rules: &PatternRules,
    probe: &DecodeProbe,
    last: &mut Option<usize>,
    unit: &CodedUnit,
) -> DecoderOutput<DecodedPicture> {
    let (index, kind) = decode_payload(&unit.data)?;
    if rules.fail_at == Some(index) {
        *last = None;
        return Err(format!("corrupt unit at frame {index}"));
    }
    if kind == UnitKind::Predicted {
        let expected = index.checked_sub(1);
        if *last != expected || expected.is_none() {
            return Err(format!(
                "frame {index} decoded without its reference (last decoded {last:?})"
            ));
        }
    }
    *last = Some(index);
    probe.record(index);

    let pixels = (rules.width as usize) * (rules.height as usize);
    let rgba = pattern_color(index).repeat(pixels);
    probe.live.fetch_add(1, Ordering::SeqCst);
    let live = probe.live.clone();
    Ok(
        DecodedPicture::new(unit.timestamp, rules.width, rules.height, rgba).with_release(
            move || {
                live.fetch_sub(1, Ordering::SeqCst);
            },
        ),
    )
}

impl Decodable for TestPatternDecoder {
    type Config = VideoDecoderConfig;
    type Output = DecodedPicture;

    fn configure(
        &mut self,
        config: &VideoDecoderConfig,
        on_output: OutputCallback<DecodedPicture>,
    ) -> Result<()> {
        if config.codec != PATTERN_CODEC {
            return Err(PlayerError::DecodeFatal(format!(
                "unsupported codec {}",
                config.codec
            )));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlayerError::DecodeFatal(format!("no runtime for decoder: {e}")))?;

        self.rules.width = config.coded_width;
        self.rules.height = config.coded_height;
        let rules = self.rules.clone();
        let probe = self.probe.clone();
        let (jobs, mut queue) = mpsc::unbounded_channel::<Arc<CodedUnit>>();

        // Replacing the sender ends the previous worker once its queue drains.
        self.jobs = Some(jobs);
        runtime.spawn(async move {
            let mut last = None;
            while let Some(unit) = queue.recv().await {
                let latency = decode_payload(&unit.data)
                    .map(|(index, _)| rules.latency_for(index))
                    .unwrap_or(rules.latency);
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
                on_output(paint(&rules, &probe, &mut last, &unit));
            }
        });
        Ok(())
    }

    fn decode(&mut self, unit: Arc<CodedUnit>) {
        self.probe.record_submit();
        match &self.jobs {
            Some(jobs) => {
                if jobs.send(unit).is_err() {
                    log::error!("[DECODE_SESSION] Pattern decoder worker is gone");
                }
            }
            None => log::warn!("[DECODE_SESSION] Unit submitted to an unconfigured decoder"),
        }
    }
}

/// Turns each unit into a sine segment. The payload holds the number of
/// samples per channel as a little-endian u32. Decodes inline.
#[derive(Default)]
pub struct TestToneDecoder {
    channel_count: u16,
    sample_rate: u32,
    produced: usize,
    on_output: Option<OutputCallback<AudioSegment>>,
}

impl TestToneDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decodable for TestToneDecoder {
    type Config = AudioDecoderConfig;
    type Output = AudioSegment;

    fn configure(
        &mut self,
        config: &AudioDecoderConfig,
        on_output: OutputCallback<AudioSegment>,
    ) -> Result<()> {
        if config.codec != TONE_CODEC {
            return Err(PlayerError::DecodeFatal(format!(
                "unsupported codec {}",
                config.codec
            )));
        }
        self.channel_count = config.channel_count.max(1);
        self.sample_rate = config.sample_rate;
        self.produced = 0;
        self.on_output = Some(on_output);
        Ok(())
    }

    fn decode(&mut self, unit: Arc<CodedUnit>) {
        let Some(on_output) = &self.on_output else {
            log::warn!("[AUDIO] Unit submitted to an unconfigured decoder");
            return;
        };
        let Some(frames) = unit.data.first_chunk::<4>().map(|b| u32::from_le_bytes(*b)) else {
            on_output(Err(format!("truncated audio unit ({} bytes)", unit.data.len())));
            return;
        };
        let frames = frames as usize;
        let channels = usize::from(self.channel_count);
        let rate = f64::from(self.sample_rate.max(1));
        let mut interleaved = Vec::with_capacity(frames * channels);
        for n in 0..frames {
            let t = (self.produced + n) as f64 / rate;
            let sample = (2.0 * std::f64::consts::PI * 440.0 * t).sin() as f32 * 0.25;
            interleaved.extend(std::iter::repeat(sample).take(channels));
        }
        self.produced += frames;
        on_output(Ok(AudioSegment {
            timestamp: unit.timestamp,
            channel_count: self.channel_count,
            frames,
            interleaved,
        }));
    }
}
