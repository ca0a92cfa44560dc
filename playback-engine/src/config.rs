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

//! Player configuration.

use serde::Deserialize;
use std::time::Duration;

/// How long the single-frame path waits for one decoder output.
pub const DEFAULT_NEXT_FRAME_TIMEOUT: Duration = Duration::from_secs(1);
/// How many times the single-frame path resubmits a unit before giving up.
pub const DEFAULT_NEXT_FRAME_RETRIES: u32 = 5;

/// Configuration for a player instance
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Per-attempt wait on the `next()` path
    #[serde(with = "duration_ms")]
    pub next_frame_timeout: Duration,
    /// Attempts on the `next()` path before `DecodeTimeout`
    pub next_frame_retries: u32,
    /// Upper bound for reverse-playback snapshots. `None` keeps every frame.
    pub frame_cache_budget_bytes: Option<usize>,
    /// Speed multiplier used until the first `speed()` request
    pub initial_speed: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            next_frame_timeout: DEFAULT_NEXT_FRAME_TIMEOUT,
            next_frame_retries: DEFAULT_NEXT_FRAME_RETRIES,
            frame_cache_budget_bytes: None,
            initial_speed: 1.0,
        }
    }
}

impl PlayerConfig {
    pub fn with_frame_cache_budget(mut self, bytes: usize) -> Self {
        self.frame_cache_budget_bytes = Some(bytes);
        self
    }

    pub fn with_next_frame_timeout(mut self, timeout: Duration, retries: u32) -> Self {
        self.next_frame_timeout = timeout;
        self.next_frame_retries = retries;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_frame_policy() {
        let config = PlayerConfig::default();
        assert_eq!(config.next_frame_timeout, Duration::from_secs(1));
        assert_eq!(config.next_frame_retries, 5);
        assert_eq!(config.frame_cache_budget_bytes, None);
        assert_eq!(config.initial_speed, 1.0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"next_frame_timeout": 250, "frame_cache_budget_bytes": 4096}"#)
                .unwrap();
        assert_eq!(config.next_frame_timeout, Duration::from_millis(250));
        assert_eq!(config.next_frame_retries, 5);
        assert_eq!(config.frame_cache_budget_bytes, Some(4096));
    }
}
