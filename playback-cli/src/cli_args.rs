use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use playback_engine::crop::Insets;
use thiserror::Error;

/// Playback CLI
///
/// Plays a synthetic test-pattern clip through the playback engine. Useful
/// for exercising seek, reverse and speed behaviour without a real codec.
#[derive(Parser, Debug)]
#[clap(name = "playback-cli")]
pub struct Opt {
    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Play the clip forward or in reverse and print every event.
    Play(Play),

    /// Step through frames one at a time and export them as PNG files.
    Step(Step),
}

/// Shape of the synthetic clip.
#[derive(Args, Debug, Clone)]
pub struct Clip {
    /// Number of video frames.
    #[clap(long, default_value_t = 90)]
    pub frames: usize,

    /// Frames per second.
    #[clap(long, default_value_t = 30.0)]
    pub fps: f64,

    /// Distance between sync frames.
    #[clap(long, default_value_t = 30)]
    pub gop: usize,

    #[clap(long, default_value_t = 160)]
    pub width: u32,

    #[clap(long, default_value_t = 90)]
    pub height: u32,

    /// Adds a one-channel tone track with this sample rate.
    #[clap(long = "audio-rate")]
    pub audio_rate: Option<u32>,

    /// Artificial decode latency per frame, in milliseconds.
    #[clap(long = "decode-latency-ms", default_value_t = 0)]
    pub decode_latency_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct Play {
    #[clap(flatten)]
    pub clip: Clip,

    /// Playback speed multiplier.
    #[clap(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Play backwards from the seek position (or the last frame).
    #[clap(long)]
    pub reverse: bool,

    /// Seek to this frame before playing.
    #[clap(long = "seek-frame", conflicts_with = "seek_time")]
    pub seek_frame: Option<usize>,

    /// Seek to this position, in seconds, before playing.
    #[clap(long = "seek-time")]
    pub seek_time: Option<f64>,

    /// Cap the reverse frame cache at this many bytes.
    #[clap(long = "cache-budget")]
    pub cache_budget: Option<usize>,

    /// Print events as JSON lines.
    #[clap(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct Step {
    #[clap(flatten)]
    pub clip: Clip,

    /// First frame to export.
    #[clap(long, default_value_t = 0)]
    pub start: usize,

    /// Number of frames to export.
    #[clap(long, default_value_t = 1)]
    pub count: usize,

    /// Crop insets in percent: top,right,bottom,left.
    ///
    /// Example:
    ///   --crop 10,0,10,0    # trim 10% from top and bottom
    #[clap(long)]
    pub crop: Option<CropInsets>,

    /// Directory the PNG files are written to.
    #[clap(long = "out-dir", short = 'o', default_value = "frames")]
    pub out_dir: PathBuf,
}

#[derive(Clone, Copy, Debug)]
pub struct CropInsets(pub Insets);

#[derive(Error, Debug, PartialEq)]
pub enum ParseInsetsError {
    #[error("expected four comma separated values, got {0}")]
    WrongCount(usize),
    #[error("invalid percentage {0:?}")]
    InvalidValue(String),
    #[error("percentage {0} is outside 0..=100")]
    OutOfRange(f64),
}

impl FromStr for CropInsets {
    type Err = ParseInsetsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                let value = part
                    .parse::<f64>()
                    .map_err(|_| ParseInsetsError::InvalidValue(part.to_string()))?;
                if (0.0..=100.0).contains(&value) {
                    Ok(value)
                } else {
                    Err(ParseInsetsError::OutOfRange(value))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        match values[..] {
            [top, right, bottom, left] => Ok(CropInsets(Insets {
                top,
                right,
                bottom,
                left,
            })),
            _ => Err(ParseInsetsError::WrongCount(values.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_insets() {
        let CropInsets(insets) = "10, 5,10,0".parse().unwrap();
        assert_eq!(insets.top, 10.0);
        assert_eq!(insets.right, 5.0);
        assert_eq!(insets.left, 0.0);
    }

    #[test]
    fn rejects_bad_insets() {
        assert_eq!(
            "1,2,3".parse::<CropInsets>().unwrap_err(),
            ParseInsetsError::WrongCount(3)
        );
        assert_eq!(
            "1,2,x,4".parse::<CropInsets>().unwrap_err(),
            ParseInsetsError::InvalidValue("x".to_string())
        );
        assert_eq!(
            "1,2,3,140".parse::<CropInsets>().unwrap_err(),
            ParseInsetsError::OutOfRange(140.0)
        );
    }

    #[test]
    fn play_flags() {
        let opt = Opt::parse_from([
            "playback-cli",
            "play",
            "--frames",
            "10",
            "--reverse",
            "--seek-frame",
            "4",
        ]);
        match opt.mode {
            Mode::Play(play) => {
                assert_eq!(play.clip.frames, 10);
                assert!(play.reverse);
                assert_eq!(play.seek_frame, Some(4));
            }
            Mode::Step(_) => panic!("expected play"),
        }
    }
}
