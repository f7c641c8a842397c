use std::error::Error;
use std::fmt;

/// This error indicates a restore was requested to a retirement count that precedes every
/// snapshot still held by the [`crate::SnapshotLog`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NoCheckpointError {
    /// The retirement count that was requested.
    pub requested: u64,
    /// The retirement count of the oldest snapshot in the log, if there is any.
    pub oldest: Option<u64>,
}

impl fmt::Display for NoCheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.oldest {
            Some(oldest) => write!(
                f,
                "no checkpoint at or before retirement {}, oldest checkpoint is at {}",
                self.requested, oldest
            ),
            None => write!(
                f,
                "no checkpoint at or before retirement {}, the log is empty",
                self.requested
            ),
        }
    }
}

impl Error for NoCheckpointError {}
