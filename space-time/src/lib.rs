//! Linear checkpoint history for deterministic simulations.
//!
//! A [`SnapshotLog`] stores copies of some state `T` keyed by the number of retired instructions at
//! which they were taken. Any earlier point in time can be reached again by restoring the newest
//! snapshot at or before it, and then replaying the remaining retirements. This only yields the
//! original state if replaying is deterministic, which is the responsibility of whoever drives the
//! log.

pub mod errors;
mod snapshot;

use errors::NoCheckpointError;
use generational_arena::{Arena, Index};

pub use snapshot::{Checkpoint, Restored, SnapshotKind};

use snapshot::Snapshot;

/// Ordered collection of snapshots of `T`.
#[derive(Debug)]
pub struct SnapshotLog<T> {
    snapshots: Arena<Snapshot<T>>,
    /// Ordered timeline of `(retired, arena index)` pairs.
    ///
    /// The retirement counts are guaranteed to be strictly increasing, so there will never be two
    /// snapshots of the same retirement count.
    timeline: Vec<(u64, Index)>,
}

impl<T> Default for SnapshotLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotLog<T> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            snapshots: Arena::new(),
            timeline: Vec::new(),
        }
    }

    /// Returns the number of snapshots currently held.
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    /// Returns `true` if no snapshots are held.
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Stores `state` as the snapshot for retirement count `retired`.
    ///
    /// Any snapshot at or after `retired` is dropped first: a new snapshot always becomes the end
    /// of history.
    pub fn take(&mut self, retired: u64, kind: SnapshotKind, state: T) {
        let keep = self.timeline.partition_point(|(r, _)| *r < retired);
        self.truncate(keep);
        let index = self.snapshots.insert(Snapshot {
            retired,
            kind,
            state,
        });
        self.timeline.push((retired, index));
    }

    /// Iterates over all snapshots in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = Checkpoint<'_, T>> {
        self.timeline
            .iter()
            .filter_map(|(_, index)| self.snapshots.get(*index))
            .map(Self::view)
    }

    /// Reclassifies every speculative snapshot at or before `retired` as stable.
    pub fn promote(&mut self, retired: u64) {
        let end = self.timeline.partition_point(|(r, _)| *r <= retired);
        for (_, index) in &self.timeline[..end] {
            if let Some(snapshot) = self.snapshots.get_mut(*index) {
                snapshot.kind = SnapshotKind::Stable;
            }
        }
    }

    /// Makes the newest snapshot at or before `retired` the end of history and returns it, together
    /// with the number of retirements to replay on top of it to reach `retired`.
    ///
    /// Every later snapshot is dropped, since replaying from the base will regenerate that part of
    /// the timeline.
    pub fn restore(&mut self, retired: u64) -> Result<Restored<'_, T>, NoCheckpointError> {
        let base = self
            .find_base(retired)
            .ok_or_else(|| NoCheckpointError {
                requested: retired,
                oldest: self.timeline.first().map(|(r, _)| *r),
            })?;
        self.truncate(base + 1);
        let (base_retired, index) = self.timeline[base];
        let snapshot = self
            .snapshots
            .get(index)
            .expect("every id in the timeline refers to a stored snapshot");
        Ok(Restored {
            base: Self::view(snapshot),
            replay: retired - base_retired,
        })
    }

    /// Drops snapshots that can no longer serve as a restore base for any count at or after
    /// `retired`, i.e. everything older than the newest snapshot at or before `retired`.
    pub fn drop_before(&mut self, retired: u64) {
        let Some(base) = self.find_base(retired) else {
            return;
        };
        for (_, index) in self.timeline.drain(..base) {
            self.snapshots.remove(index);
        }
    }

    /// Returns the index in `timeline` of the last snapshot that's before or on `retired`.
    fn find_base(&self, retired: u64) -> Option<usize> {
        self.timeline
            .partition_point(|(r, _)| *r <= retired)
            .checked_sub(1)
    }

    fn truncate(&mut self, len: usize) {
        if len >= self.timeline.len() {
            return;
        }
        for (_, index) in self.timeline.drain(len..) {
            self.snapshots.remove(index);
        }
    }

    fn view(snapshot: &Snapshot<T>) -> Checkpoint<'_, T> {
        Checkpoint {
            retired: snapshot.retired,
            kind: snapshot.kind,
            state: &snapshot.state,
        }
    }
}
