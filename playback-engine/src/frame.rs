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

//! Contains the fundamental data structures for coded units, track metadata
//! and decoded pictures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The type of a coded unit, indicating its dependency on other units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
    /// A sync unit (key frame) can be decoded without any prior reference state.
    Sync,
    /// A predicted unit can only be decoded after the units it references.
    Predicted,
}

/// One coded access unit as emitted by the container parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodedUnit {
    pub kind: UnitKind,
    /// Presentation timestamp in microseconds.
    pub timestamp: i64,
    /// Duration in microseconds.
    pub duration: i64,
    /// The coded payload.
    pub data: Vec<u8>,
}

impl CodedUnit {
    pub fn new(kind: UnitKind, timestamp: i64, duration: i64, data: Vec<u8>) -> Self {
        Self {
            kind,
            timestamp,
            duration,
            data,
        }
    }

    pub fn is_sync(&self) -> bool {
        self.kind == UnitKind::Sync
    }
}

/// Video track description reported once by the container parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub frame_rate: f64,
    pub total_frames: usize,
    pub duration_seconds: f64,
}

impl VideoMetadata {
    /// Time between two frames at 1x speed, in seconds.
    pub fn frame_interval_secs(&self) -> f64 {
        if self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            0.0
        }
    }

    /// Converts a frame index into a playback position in seconds.
    pub fn time_of(&self, frame: usize) -> f64 {
        if self.frame_rate > 0.0 {
            frame as f64 / self.frame_rate
        } else {
            0.0
        }
    }
}

/// Audio track description reported once by the container parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMetadata {
    pub sample_rate: u32,
    pub channel_count: u16,
    /// Number of coded audio units the container declares.
    pub total_units: usize,
    /// Decoded length per channel, in samples.
    pub total_samples: usize,
}

/// Decoder configuration for the video track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDecoderConfig {
    pub codec: String,
    pub coded_width: u32,
    pub coded_height: u32,
    #[serde(default)]
    pub description: Vec<u8>,
}

/// Decoder configuration for the audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDecoderConfig {
    pub codec: String,
    pub sample_rate: u32,
    pub channel_count: u16,
    #[serde(default)]
    pub description: Vec<u8>,
}

/// A decoded video frame, ready for rendering.
///
/// The picture owns whatever the codec allocated for it. The release hook runs
/// exactly once when the picture is dropped, whether it was presented, copied
/// into the frame cache or discarded.
pub struct DecodedPicture {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels.
    pub rgba: Vec<u8>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl DecodedPicture {
    pub fn new(timestamp: i64, width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            timestamp,
            width,
            height,
            rgba,
            release: None,
        }
    }

    /// Registers the hook that hands the picture's memory back to the codec.
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }
}

impl fmt::Debug for DecodedPicture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedPicture")
            .field("timestamp", &self.timestamp)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

impl Drop for DecodedPicture {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// A rasterized copy of a frame that outlives the decoder output it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

impl FrameSnapshot {
    pub fn size_bytes(&self) -> usize {
        self.rgba.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dropping_a_picture_releases_it_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let picture = DecodedPicture::new(0, 2, 2, vec![0; 16]).with_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(picture);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn time_of_uses_frame_rate() {
        let metadata = VideoMetadata {
            frame_rate: 25.0,
            total_frames: 100,
            duration_seconds: 4.0,
        };
        assert_eq!(metadata.time_of(50), 2.0);
        assert_eq!(metadata.frame_interval_secs(), 0.04);
    }
}
