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

//! Render sinks: where decoded pictures end up.

use crate::frame::{DecodedPicture, FrameSnapshot};
use std::sync::{Arc, Mutex};

/// A drawable surface owned by the player.
pub trait RenderSink: Send {
    /// Draws a freshly decoded picture.
    fn present(&mut self, picture: &DecodedPicture);

    /// Draws a raster captured earlier (reverse playback).
    fn present_snapshot(&mut self, snapshot: &FrameSnapshot);
}

/// Off-screen rasterization: copies a picture into a snapshot that outlives
/// the picture itself.
pub fn rasterize(picture: &DecodedPicture) -> FrameSnapshot {
    FrameSnapshot {
        timestamp: picture.timestamp,
        width: picture.width,
        height: picture.height,
        rgba: Arc::new(picture.rgba.clone()),
    }
}

/// An in-memory RGBA surface that keeps the last presented image.
#[derive(Debug, Default)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    timestamp: Option<i64>,
    presented: u64,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    fn blit(&mut self, timestamp: i64, width: u32, height: u32, rgba: &[u8]) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.extend_from_slice(rgba);
        self.timestamp = Some(timestamp);
        self.presented += 1;
    }

    /// Timestamp of the image currently on the surface.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Copies the current surface content out.
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        self.timestamp.map(|timestamp| FrameSnapshot {
            timestamp,
            width: self.width,
            height: self.height,
            rgba: Arc::new(self.pixels.clone()),
        })
    }
}

impl RenderSink for Surface {
    fn present(&mut self, picture: &DecodedPicture) {
        self.blit(picture.timestamp, picture.width, picture.height, &picture.rgba);
    }

    fn present_snapshot(&mut self, snapshot: &FrameSnapshot) {
        self.blit(snapshot.timestamp, snapshot.width, snapshot.height, &snapshot.rgba);
    }
}

/// A surface that also records the timestamp of everything presented, in
/// order. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    surface: Arc<Mutex<Surface>>,
    presented: Arc<Mutex<Vec<i64>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamps presented so far.
    pub fn presented(&self) -> Vec<i64> {
        self.presented
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        self.surface.lock().ok().and_then(|s| s.snapshot())
    }

    fn record(&self, timestamp: i64) {
        if let Ok(mut log) = self.presented.lock() {
            log.push(timestamp);
        }
    }
}

impl RenderSink for RecordingSink {
    fn present(&mut self, picture: &DecodedPicture) {
        if let Ok(mut surface) = self.surface.lock() {
            surface.present(picture);
        }
        self.record(picture.timestamp);
    }

    fn present_snapshot(&mut self, snapshot: &FrameSnapshot) {
        if let Ok(mut surface) = self.surface.lock() {
            surface.present_snapshot(snapshot);
        }
        self.record(snapshot.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterize_copies_pixels() {
        let picture = DecodedPicture::new(42, 1, 1, vec![1, 2, 3, 4]);
        let snapshot = rasterize(&picture);
        drop(picture);
        assert_eq!(snapshot.timestamp, 42);
        assert_eq!(snapshot.rgba.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn surface_keeps_last_image() {
        let mut surface = Surface::new();
        assert!(surface.snapshot().is_none());
        surface.present(&DecodedPicture::new(1, 1, 1, vec![9; 4]));
        surface.present(&DecodedPicture::new(2, 1, 1, vec![7; 4]));
        let snapshot = surface.snapshot().unwrap();
        assert_eq!(snapshot.timestamp, 2);
        assert_eq!(snapshot.rgba.as_slice(), &[7; 4]);
        assert_eq!(surface.presented(), 2);
    }

    #[test]
    fn recording_sink_shares_log_between_clones() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer.present(&DecodedPicture::new(5, 1, 1, vec![0; 4]));
        writer.present_snapshot(&FrameSnapshot {
            timestamp: 4,
            width: 1,
            height: 1,
            rgba: Arc::new(vec![0; 4]),
        });
        assert_eq!(sink.presented(), vec![5, 4]);
        assert_eq!(sink.snapshot().map(|s| s.timestamp), Some(4));
    }
}
