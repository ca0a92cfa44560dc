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

use thiserror::Error;

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Errors that can occur while loading, decoding or driving playback
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error("Please wait for the video to load")]
    NotLoaded,

    #[error("No chunk found at frame {0}")]
    NoChunkAtIndex(usize),

    #[error("No key frame found before frame {0}")]
    NoSyncFrameFound(usize),

    #[error("Decoder error: {0}")]
    DecodeFatal(String),

    #[error("Timed out while decoding frame {frame} after {attempts} attempts")]
    DecodeTimeout { frame: usize, attempts: u32 },

    #[error("End of frames reached")]
    EndOfStream,

    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f64),

    #[error("A decode is already in flight")]
    DecodeSlotBusy,

    #[error("No decode in flight")]
    NoDecodeInFlight,

    #[error("Decoder is not configured")]
    NotConfigured,

    #[error("Playback session failed, reinitialize the player")]
    SessionFailed,

    #[error("Player worker is closed")]
    Closed,
}

impl PlayerError {
    /// Session-scoped errors move the player into the `error` status and stop
    /// every loop. Everything else only fails the request that caused it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlayerError::DecodeFatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decoder_failures_are_fatal() {
        assert!(PlayerError::DecodeFatal("bad bitstream".into()).is_fatal());
        assert!(!PlayerError::NotLoaded.is_fatal());
        assert!(!PlayerError::NoSyncFrameFound(3).is_fatal());
        assert!(!PlayerError::DecodeTimeout {
            frame: 1,
            attempts: 5
        }
        .is_fatal());
    }

    #[test]
    fn messages_match_the_wire_strings() {
        assert_eq!(
            PlayerError::NotLoaded.to_string(),
            "Please wait for the video to load"
        );
        assert_eq!(
            PlayerError::NoSyncFrameFound(7).to_string(),
            "No key frame found before frame 7"
        );
        assert_eq!(PlayerError::EndOfStream.to_string(), "End of frames reached");
    }
}
