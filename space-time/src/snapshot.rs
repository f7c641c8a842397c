/// Whether a snapshot was taken at a retirement point the DUT has confirmed, or ahead of it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SnapshotKind {
    /// Taken at a retirement count the DUT has already reached.
    Stable,
    /// Taken after running ahead of the DUT. Becomes as good as a stable snapshot once a restore
    /// relies on it.
    Speculative,
}

#[derive(Debug)]
pub(crate) struct Snapshot<T> {
    pub(crate) retired: u64,
    pub(crate) kind: SnapshotKind,
    pub(crate) state: T,
}

/// Borrowed view of a snapshot stored in a [`crate::SnapshotLog`].
#[derive(Debug)]
pub struct Checkpoint<'a, T> {
    /// Retirement count at which the snapshot was taken.
    pub retired: u64,
    pub kind: SnapshotKind,
    pub state: &'a T,
}

/// Result of [`crate::SnapshotLog::restore`].
#[derive(Debug)]
pub struct Restored<'a, T> {
    /// The snapshot that now forms the base of the timeline.
    pub base: Checkpoint<'a, T>,
    /// Number of retirements that must be replayed on top of `base.state` to reach the requested
    /// retirement count.
    pub replay: u64,
}
