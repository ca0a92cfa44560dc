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

//! Which units to feed the codec to reconstruct a frame.

use crate::chunk_store::ChunkStore;
use crate::error::{PlayerError, Result};
use std::ops::RangeInclusive;

/// Returns the inclusive range of video units that must be decoded, in order,
/// so that the last output is frame `target`.
///
/// `reference` is the last frame the codec decoded successfully, if its
/// state is known. When it lies between the governing sync unit and the
/// target, decoding resumes right after it instead of restarting at the
/// sync unit.
pub fn plan_decode(
    store: &ChunkStore,
    target: usize,
    reference: Option<usize>,
) -> Result<RangeInclusive<usize>> {
    let unit = store
        .get(target)
        .ok_or(PlayerError::NoChunkAtIndex(target))?;
    if unit.is_sync() {
        return Ok(target..=target);
    }

    let (sync, _) = store
        .nearest_sync_before(target)
        .ok_or(PlayerError::NoSyncFrameFound(target))?;
    match reference {
        Some(r) if sync <= r && r < target => Ok(r + 1..=target),
        _ => Ok(sync..=target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_store::TrackKind;
    use crate::frame::{CodedUnit, UnitKind};

    /// Ten frames, sync units at 0 and 5.
    fn store_with_sync(sync: &[usize]) -> ChunkStore {
        let mut store = ChunkStore::new();
        for i in 0..10 {
            let kind = if sync.contains(&i) {
                UnitKind::Sync
            } else {
                UnitKind::Predicted
            };
            store.append(
                TrackKind::Video,
                CodedUnit::new(kind, i as i64 * 100_000, 100_000, vec![]),
            );
        }
        store
    }

    #[test]
    fn sync_target_decodes_alone() {
        let store = store_with_sync(&[0, 5]);
        assert_eq!(plan_decode(&store, 5, Some(2)).unwrap(), 5..=5);
    }

    #[test]
    fn predicted_target_starts_at_sync() {
        let store = store_with_sync(&[0, 5]);
        assert_eq!(plan_decode(&store, 7, None).unwrap(), 5..=7);
        // A reference from an earlier group is useless.
        assert_eq!(plan_decode(&store, 7, Some(3)).unwrap(), 5..=7);
    }

    #[test]
    fn usable_reference_shortens_the_plan() {
        let store = store_with_sync(&[0, 5]);
        assert_eq!(plan_decode(&store, 8, Some(6)).unwrap(), 7..=8);
        assert_eq!(plan_decode(&store, 1, Some(0)).unwrap(), 1..=1);
    }

    #[test]
    fn reference_at_or_past_target_is_ignored() {
        let store = store_with_sync(&[0, 5]);
        assert_eq!(plan_decode(&store, 7, Some(7)).unwrap(), 5..=7);
        assert_eq!(plan_decode(&store, 7, Some(9)).unwrap(), 5..=7);
    }

    #[test]
    fn missing_target_or_sync_is_an_error() {
        let store = store_with_sync(&[5]);
        assert_eq!(
            plan_decode(&store, 12, None),
            Err(PlayerError::NoChunkAtIndex(12))
        );
        assert_eq!(
            plan_decode(&store, 3, None),
            Err(PlayerError::NoSyncFrameFound(3))
        );
    }
}
