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

//! The chunk store: an append-only, frame-indexed sequence of coded units.

use crate::frame::{AudioMetadata, CodedUnit, VideoMetadata};
use std::sync::Arc;

/// The track a coded unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Holds every coded unit received from the container parser.
///
/// Video units are indexed by arrival order, which for this container equals
/// the frame index. Units are shared through `Arc` so the scheduler and seek
/// engine never copy payloads.
#[derive(Debug, Default)]
pub struct ChunkStore {
    video: Vec<Arc<CodedUnit>>,
    audio: Vec<Arc<CodedUnit>>,
    video_metadata: Option<VideoMetadata>,
    audio_metadata: Option<AudioMetadata>,
    ready: bool,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the video track description. Only the first call has an effect.
    /// Returns `true` if the store became ready as a result.
    pub fn set_video_metadata(&mut self, metadata: VideoMetadata) -> bool {
        if self.video_metadata.is_some() {
            log::warn!("[CHUNK_STORE] Ignoring repeated video metadata");
            return false;
        }
        self.video_metadata = Some(metadata);
        self.check_ready()
    }

    /// Records the audio track description. Only the first call has an effect.
    pub fn set_audio_metadata(&mut self, metadata: AudioMetadata) -> bool {
        if self.audio_metadata.is_some() {
            log::warn!("[CHUNK_STORE] Ignoring repeated audio metadata");
            return false;
        }
        self.audio_metadata = Some(metadata);
        self.check_ready()
    }

    /// Appends a unit in arrival order. Returns `true` exactly once: on the
    /// append that completes every declared track.
    pub fn append(&mut self, track: TrackKind, unit: CodedUnit) -> bool {
        match track {
            TrackKind::Video => self.video.push(Arc::new(unit)),
            TrackKind::Audio => self.audio.push(Arc::new(unit)),
        }
        self.check_ready()
    }

    fn check_ready(&mut self) -> bool {
        if self.ready {
            return false;
        }

        let video_complete = self
            .video_metadata
            .as_ref()
            .is_some_and(|m| self.video.len() == m.total_frames);
        let audio_complete = self
            .audio_metadata
            .as_ref()
            .map_or(true, |m| self.audio.len() == m.total_units);

        if video_complete && audio_complete {
            log::info!(
                "[CHUNK_STORE] All units received: {} video, {} audio",
                self.video.len(),
                self.audio.len()
            );
            self.ready = true;
        }
        self.ready
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of video units received so far.
    pub fn len(&self) -> usize {
        self.video.len()
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty()
    }

    pub fn get(&self, frame_index: usize) -> Option<&Arc<CodedUnit>> {
        self.video.get(frame_index)
    }

    /// Scans backward from `frame_index - 1` for the closest sync unit.
    pub fn nearest_sync_before(&self, frame_index: usize) -> Option<(usize, &Arc<CodedUnit>)> {
        let end = frame_index.min(self.video.len());
        self.video[..end]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, unit)| unit.is_sync())
    }

    /// `true` once an audio track is declared and all of its units arrived.
    pub fn audio_complete(&self) -> bool {
        self.audio_metadata
            .as_ref()
            .is_some_and(|m| self.audio.len() >= m.total_units)
    }

    pub fn audio_units(&self) -> &[Arc<CodedUnit>] {
        &self.audio
    }

    pub fn video_metadata(&self) -> Option<&VideoMetadata> {
        self.video_metadata.as_ref()
    }

    pub fn audio_metadata(&self) -> Option<&AudioMetadata> {
        self.audio_metadata.as_ref()
    }

    /// Declared frame count, falling back to what has arrived so far.
    pub fn total_frames(&self) -> usize {
        self.video_metadata
            .as_ref()
            .map_or(self.video.len(), |m| m.total_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::UnitKind;

    fn unit(kind: UnitKind, index: i64) -> CodedUnit {
        CodedUnit::new(kind, index * 100_000, 100_000, vec![index as u8])
    }

    fn video_metadata(total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            frame_rate: 10.0,
            total_frames,
            duration_seconds: total_frames as f64 / 10.0,
        }
    }

    fn store_with_keys(total: usize, keys: &[usize]) -> ChunkStore {
        let mut store = ChunkStore::new();
        store.set_video_metadata(video_metadata(total));
        for i in 0..total {
            let kind = if keys.contains(&i) {
                UnitKind::Sync
            } else {
                UnitKind::Predicted
            };
            store.append(TrackKind::Video, unit(kind, i as i64));
        }
        store
    }

    #[test]
    fn ready_fires_once_when_video_completes() {
        let mut store = ChunkStore::new();
        store.set_video_metadata(video_metadata(3));
        assert!(!store.append(TrackKind::Video, unit(UnitKind::Sync, 0)));
        assert!(!store.append(TrackKind::Video, unit(UnitKind::Predicted, 1)));
        assert!(store.append(TrackKind::Video, unit(UnitKind::Predicted, 2)));
        assert!(store.is_ready());
    }

    #[test]
    fn audio_track_must_complete_too() {
        let mut store = ChunkStore::new();
        store.set_video_metadata(video_metadata(1));
        store.set_audio_metadata(AudioMetadata {
            sample_rate: 48_000,
            channel_count: 2,
            total_units: 2,
            total_samples: 9_600,
        });
        assert!(!store.append(TrackKind::Video, unit(UnitKind::Sync, 0)));
        assert!(!store.append(TrackKind::Audio, unit(UnitKind::Sync, 0)));
        assert!(store.append(TrackKind::Audio, unit(UnitKind::Sync, 1)));
    }

    #[test]
    fn not_ready_without_metadata() {
        let mut store = ChunkStore::new();
        assert!(!store.append(TrackKind::Video, unit(UnitKind::Sync, 0)));
        assert!(store.set_video_metadata(video_metadata(1)));
    }

    #[test]
    fn nearest_sync_scans_backward_from_previous_index() {
        let store = store_with_keys(10, &[0, 5]);
        assert_eq!(store.nearest_sync_before(7).map(|(i, _)| i), Some(5));
        assert_eq!(store.nearest_sync_before(5).map(|(i, _)| i), Some(0));
        assert_eq!(store.nearest_sync_before(0).map(|(i, _)| i), None);
    }

    #[test]
    fn nearest_sync_none_when_stream_starts_predicted() {
        let store = store_with_keys(4, &[3]);
        assert!(store.nearest_sync_before(2).is_none());
    }

    #[test]
    fn get_out_of_range_is_absent() {
        let store = store_with_keys(2, &[0]);
        assert!(store.get(1).is_some());
        assert!(store.get(2).is_none());
    }
}
