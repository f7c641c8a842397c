//! Checkpointing ahead of the DUT.
//!
//! In speculative mode the model runs `ahead_length` retirements past the point the DUT has
//! confirmed, and every synchronization call may roll it back first. The history is split in two
//! at the watermarks: snapshots at or after `stable_log_begin` were taken at confirmed retirement
//! counts, snapshots at or after `spec_log_begin` were taken while running ahead.

use std::error::Error;

use log::trace;
use space_time::{SnapshotKind, SnapshotLog};

use super::Executor;
use crate::Hart;

/// Boundaries between the stable and the speculative part of the checkpoint history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    pub stable_log_begin: u64,
    pub spec_log_begin: u64,
}

impl Watermarks {
    /// Reclassifies the history after a rollback to `restore_count`.
    ///
    /// A rollback at or past `spec_log_begin` relied on a speculative snapshot, which is promoted to
    /// stable. Any earlier rollback dropped the speculative part of the history. Either way both
    /// watermarks are equal afterwards.
    pub fn rolled_back(&mut self, restore_count: u64) {
        if self.spec_log_begin <= restore_count {
            self.stable_log_begin = self.spec_log_begin;
        } else {
            self.spec_log_begin = self.stable_log_begin;
        }
    }

    /// Starts a new speculative window after the stable point `stable`.
    pub fn advanced(&mut self, stable: u64, ahead_length: u64) {
        self.stable_log_begin = stable;
        self.spec_log_begin = stable + ahead_length;
    }
}

/// Storage of hart checkpoints, keyed by retirement count.
///
/// Memory contents are not part of a [`Hart`], so a store that also rolls memory back has to keep
/// its own delta log in step with the snapshots taken here.
pub trait CheckpointStore {
    type Error: Error;

    /// Replaces `hart` by the newest checkpoint at or before `retired`, and returns the number of
    /// retirements that must be replayed on top of it to reach `retired`.
    fn roll_back(&mut self, hart: &mut Hart, retired: u64) -> Result<u64, Self::Error>;

    /// Records the state of `hart` at its current retirement count.
    fn record(&mut self, hart: &Hart, kind: SnapshotKind);

    /// Marks every checkpoint at or before `retired` as stable.
    fn promote(&mut self, retired: u64);

    /// Releases checkpoints that are no longer needed to reach `retired` or any later count.
    fn release_before(&mut self, retired: u64);
}

impl CheckpointStore for SnapshotLog<Hart> {
    type Error = space_time::errors::NoCheckpointError;

    fn roll_back(&mut self, hart: &mut Hart, retired: u64) -> Result<u64, Self::Error> {
        let restored = self.restore(retired)?;
        *hart = restored.base.state.clone();
        Ok(restored.replay)
    }

    fn record(&mut self, hart: &Hart, kind: SnapshotKind) {
        self.take(hart.retired(), kind, hart.clone());
    }

    fn promote(&mut self, retired: u64) {
        SnapshotLog::promote(self, retired);
    }

    fn release_before(&mut self, retired: u64) {
        self.drop_before(retired);
    }
}

/// Speculation bookkeeping of a [`super::RefModel`].
#[derive(Debug)]
pub struct Speculation<S> {
    store: S,
    watermarks: Watermarks,
    ahead_length: u64,
}

impl<S: CheckpointStore> Speculation<S> {
    /// Starts speculating from the current state of `hart`, which becomes the first stable
    /// checkpoint.
    pub fn new(mut store: S, hart: &Hart, ahead_length: u64) -> Self {
        store.record(hart, SnapshotKind::Stable);
        let stable = hart.retired();
        Self {
            store,
            watermarks: Watermarks {
                stable_log_begin: stable,
                spec_log_begin: stable,
            },
            ahead_length,
        }
    }

    pub fn watermarks(&self) -> Watermarks {
        self.watermarks
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Brings `hart` back to retirement count `restore_count`.
    ///
    /// # Panics
    ///
    /// Panics if the store holds no checkpoint to restore from. The model cannot continue in
    /// lockstep with the DUT after that.
    pub fn roll_back<E: Executor>(&mut self, hart: &mut Hart, executor: &mut E, restore_count: u64) {
        let replay = match self.store.roll_back(hart, restore_count) {
            Ok(replay) => replay,
            Err(err) => panic!("failed to roll back to retirement {restore_count}: {err}"),
        };
        let into_window = self.watermarks.spec_log_begin <= restore_count;
        self.watermarks.rolled_back(restore_count);
        if into_window {
            self.store.promote(self.watermarks.stable_log_begin);
        }
        trace!("Rolled back to retirement {restore_count}, replaying {replay} retirements");
        executor.execute(hart, replay);
    }

    /// Takes a stable checkpoint at `restore_count + advance`, runs ahead of the DUT and takes a
    /// speculative checkpoint at the end of the window.
    pub fn run_ahead<E: Executor>(
        &mut self,
        hart: &mut Hart,
        executor: &mut E,
        restore_count: u64,
        advance: u64,
    ) {
        let stable = restore_count + advance;
        self.store.record(hart, SnapshotKind::Stable);
        self.store.release_before(stable);
        self.watermarks.advanced(stable, self.ahead_length);
        executor.execute(hart, self.ahead_length);
        self.store.record(hart, SnapshotKind::Speculative);
        trace!("Ran ahead from {stable} to {}", self.watermarks.spec_log_begin);
    }
}

/// Compares the normal and the look-ahead memory images word by word.
///
/// # Panics
///
/// Panics at the first word where the images differ, or if they differ in size.
pub fn check_memory_mirror(normal: &[u64], look_ahead: &[u64]) {
    assert_eq!(
        normal.len(),
        look_ahead.len(),
        "memory images differ in size"
    );
    if let Some(index) = normal.iter().zip(look_ahead).position(|(a, b)| a != b) {
        panic!(
            "memory diff at word {index:#x}: {:#x} != {:#x}",
            normal[index], look_ahead[index]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_into_speculative_window_promotes() {
        let mut watermarks = Watermarks {
            stable_log_begin: 10,
            spec_log_begin: 510,
        };
        watermarks.rolled_back(600);
        assert_eq!(510, watermarks.stable_log_begin);
        assert_eq!(510, watermarks.spec_log_begin);
    }

    #[test]
    fn rollback_before_speculative_window_drops_it() {
        let mut watermarks = Watermarks {
            stable_log_begin: 10,
            spec_log_begin: 510,
        };
        watermarks.rolled_back(20);
        assert_eq!(10, watermarks.stable_log_begin);
        assert_eq!(10, watermarks.spec_log_begin);
    }

    #[test]
    fn advance_opens_window() {
        let mut watermarks = Watermarks::default();
        watermarks.advanced(21, 500);
        assert_eq!(21, watermarks.stable_log_begin);
        assert_eq!(521, watermarks.spec_log_begin);
        assert!(watermarks.stable_log_begin <= watermarks.spec_log_begin);
    }

    #[test]
    fn identical_images_pass() {
        check_memory_mirror(&[1, 2, 3], &[1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "memory diff at word 0x1")]
    fn diverging_images_panic() {
        check_memory_mirror(&[1, 2, 3], &[1, 5, 3]);
    }
}
