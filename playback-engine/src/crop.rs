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

//! Cropping presented frames by percentage insets.

use crate::frame::FrameSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Distance of each crop edge from the matching frame edge, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// A pixel rectangle inside a frame. Width and height are always even so
/// the result can be fed to 4:2:0 encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

fn even(value: f64) -> u32 {
    let rounded = value.round().max(0.0) as u32;
    rounded - rounded % 2
}

impl CropRect {
    pub fn from_insets(frame_width: u32, frame_height: u32, insets: Insets) -> Self {
        let pct = |v: f64| v.clamp(0.0, 100.0) / 100.0;
        let w = f64::from(frame_width);
        let h = f64::from(frame_height);

        let left = w * pct(insets.left);
        let top = h * pct(insets.top);
        let right = w - w * pct(insets.right);
        let bottom = h - h * pct(insets.bottom);

        let x = left.floor() as u32;
        let y = top.floor() as u32;
        let width = even(right - left).min(frame_width.saturating_sub(x));
        let height = even(bottom - top).min(frame_height.saturating_sub(y));
        Self {
            x,
            y,
            width: width - width % 2,
            height: height - height % 2,
        }
    }

    pub fn full(frame_width: u32, frame_height: u32) -> Self {
        Self::from_insets(frame_width, frame_height, Insets::default())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Copies the rectangle out of `frame`. Parts outside the frame are
    /// clipped away.
    pub fn apply(&self, frame: &FrameSnapshot) -> FrameSnapshot {
        let x = self.x.min(frame.width);
        let y = self.y.min(frame.height);
        let width = self.width.min(frame.width - x);
        let height = self.height.min(frame.height - y);

        let stride = frame.width as usize * 4;
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for row in y..y + height {
            let start = row as usize * stride + x as usize * 4;
            let end = start + width as usize * 4;
            if let Some(line) = frame.rgba.get(start..end) {
                rgba.extend_from_slice(line);
            }
        }

        FrameSnapshot {
            timestamp: frame.timestamp,
            width,
            height,
            rgba: Arc::new(rgba),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_are_even() {
        let rect = CropRect::from_insets(
            101,
            51,
            Insets {
                top: 10.0,
                right: 10.0,
                bottom: 10.0,
                left: 10.0,
            },
        );
        assert_eq!(rect.x, 10);
        assert_eq!(rect.y, 5);
        assert_eq!(rect.width % 2, 0);
        assert_eq!(rect.height % 2, 0);
        assert_eq!(rect.width, 80);
        assert_eq!(rect.height, 40);
    }

    #[test]
    fn no_insets_keeps_even_frame() {
        assert_eq!(
            CropRect::full(64, 36),
            CropRect {
                x: 0,
                y: 0,
                width: 64,
                height: 36
            }
        );
    }

    #[test]
    fn overlapping_insets_collapse() {
        let rect = CropRect::from_insets(
            40,
            40,
            Insets {
                top: 60.0,
                right: 0.0,
                bottom: 60.0,
                left: 0.0,
            },
        );
        assert!(rect.is_empty());
    }

    #[test]
    fn apply_copies_the_window() {
        // 4x2 frame, each pixel's red channel is its x coordinate.
        let mut rgba = Vec::new();
        for _y in 0..2 {
            for x in 0..4u8 {
                rgba.extend_from_slice(&[x, 0, 0, 255]);
            }
        }
        let frame = FrameSnapshot {
            timestamp: 7,
            width: 4,
            height: 2,
            rgba: Arc::new(rgba),
        };
        let rect = CropRect {
            x: 2,
            y: 0,
            width: 2,
            height: 2,
        };
        let cropped = rect.apply(&frame);
        assert_eq!(cropped.width, 2);
        assert_eq!(cropped.height, 2);
        assert_eq!(cropped.timestamp, 7);
        let reds: Vec<u8> = cropped.rgba.chunks(4).map(|px| px[0]).collect();
        assert_eq!(reds, vec![2, 3, 2, 3]);
    }
}
