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

//! Audio assembly: decoded segments in, one planar buffer out.

use crate::frame::AudioMetadata;
use serde::{Deserialize, Serialize};

/// One decoded audio segment with interleaved samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub timestamp: i64,
    pub channel_count: u16,
    /// Samples per channel.
    pub frames: usize,
    pub interleaved: Vec<f32>,
}

impl AudioSegment {
    /// Splits the interleaved samples into one vector per channel.
    pub fn deinterleave(&self) -> Vec<Vec<f32>> {
        let channels = usize::from(self.channel_count.max(1));
        let mut planes = vec![Vec::with_capacity(self.frames); channels];
        for frame in self.interleaved.chunks_exact(channels) {
            for (plane, sample) in planes.iter_mut().zip(frame) {
                plane.push(*sample);
            }
        }
        planes
    }
}

/// A complete, playable track: one flat sample vector per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Accumulates decoded segments until the declared sample count is reached,
/// then emits the concatenated buffer exactly once.
#[derive(Debug)]
pub struct AudioAssembler {
    metadata: AudioMetadata,
    segments: Vec<Vec<Vec<f32>>>,
    accumulated: usize,
    emitted: bool,
}

impl AudioAssembler {
    pub fn new(metadata: AudioMetadata) -> Self {
        Self {
            metadata,
            segments: Vec::new(),
            accumulated: 0,
            emitted: false,
        }
    }

    /// Samples per channel collected so far.
    pub fn accumulated(&self) -> usize {
        self.accumulated
    }

    pub fn is_complete(&self) -> bool {
        self.emitted
    }

    /// Adds one segment. Returns the full buffer on the push that reaches
    /// `total_samples`, and `None` otherwise (including after emission).
    pub fn push(&mut self, segment: AudioSegment) -> Option<AudioBuffer> {
        if self.emitted {
            log::debug!(
                "[AUDIO] Ignoring segment at {}us, buffer already emitted",
                segment.timestamp
            );
            return None;
        }
        if segment.channel_count != self.metadata.channel_count {
            log::warn!(
                "[AUDIO] Segment at {}us has {} channels, track declares {}",
                segment.timestamp,
                segment.channel_count,
                self.metadata.channel_count
            );
            return None;
        }

        let planes = segment.deinterleave();
        self.accumulated += planes.first().map_or(0, Vec::len);
        self.segments.push(planes);

        if self.accumulated >= self.metadata.total_samples {
            Some(self.assemble())
        } else {
            None
        }
    }

    /// Emits whatever has been collected if the declared length was never
    /// reached. Returns `None` if the buffer was already emitted.
    pub fn finish(&mut self) -> Option<AudioBuffer> {
        if self.emitted {
            return None;
        }
        log::warn!(
            "[AUDIO] Track ended short: {} of {} samples",
            self.accumulated,
            self.metadata.total_samples
        );
        Some(self.assemble())
    }

    fn assemble(&mut self) -> AudioBuffer {
        let channel_count = usize::from(self.metadata.channel_count.max(1));
        let length = self.accumulated.min(self.metadata.total_samples);
        let mut channels = vec![Vec::with_capacity(length); channel_count];

        for segment in self.segments.drain(..) {
            for (channel, plane) in channels.iter_mut().zip(segment) {
                channel.extend(plane);
            }
        }
        for channel in &mut channels {
            channel.truncate(length);
        }

        self.emitted = true;
        log::info!(
            "[AUDIO] Assembled {} channels x {} samples",
            channel_count,
            length
        );
        AudioBuffer {
            sample_rate: self.metadata.sample_rate,
            channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(total_samples: usize) -> AudioMetadata {
        AudioMetadata {
            sample_rate: 48_000,
            channel_count: 2,
            total_units: total_samples / 4_800,
            total_samples,
        }
    }

    fn stereo_segment(index: usize, frames: usize) -> AudioSegment {
        let mut interleaved = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            interleaved.push(index as f32);
            interleaved.push(-(index as f32));
        }
        AudioSegment {
            timestamp: (index * 100_000) as i64,
            channel_count: 2,
            frames,
            interleaved,
        }
    }

    #[test]
    fn deinterleave_splits_channels() {
        let segment = AudioSegment {
            timestamp: 0,
            channel_count: 2,
            frames: 3,
            interleaved: vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0],
        };
        assert_eq!(
            segment.deinterleave(),
            vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]]
        );
    }

    #[test]
    fn emits_once_after_the_tenth_segment() {
        let mut assembler = AudioAssembler::new(metadata(48_000));
        for i in 0..9 {
            assert!(assembler.push(stereo_segment(i, 4_800)).is_none());
        }
        let buffer = assembler
            .push(stereo_segment(9, 4_800))
            .expect("buffer after tenth segment");
        assert_eq!(buffer.channels.len(), 2);
        assert_eq!(buffer.channels[0].len(), 48_000);
        assert_eq!(buffer.channels[1].len(), 48_000);
        assert_eq!(buffer.duration_secs(), 1.0);
        // segment order is preserved
        assert_eq!(buffer.channels[0][0], 0.0);
        assert_eq!(buffer.channels[0][47_999], 9.0);
        assert_eq!(buffer.channels[1][47_999], -9.0);

        assert!(assembler.push(stereo_segment(10, 4_800)).is_none());
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn overshoot_is_truncated_to_declared_length() {
        let mut assembler = AudioAssembler::new(metadata(10_000));
        assert!(assembler.push(stereo_segment(0, 6_000)).is_none());
        let buffer = assembler.push(stereo_segment(1, 6_000)).unwrap();
        assert_eq!(buffer.len(), 10_000);
    }

    #[test]
    fn mismatched_channel_count_is_skipped() {
        let mut assembler = AudioAssembler::new(metadata(4_800));
        let mono = AudioSegment {
            timestamp: 0,
            channel_count: 1,
            frames: 4_800,
            interleaved: vec![0.5; 4_800],
        };
        assert!(assembler.push(mono).is_none());
        assert_eq!(assembler.accumulated(), 0);
    }

    #[test]
    fn finish_flushes_a_short_track() {
        let mut assembler = AudioAssembler::new(metadata(48_000));
        assembler.push(stereo_segment(0, 4_800));
        let buffer = assembler.finish().unwrap();
        assert_eq!(buffer.len(), 4_800);
        assert!(assembler.is_complete());
    }
}
