//! Reference queries: state the DUT can ask the model for, on top of the regular register block.

use super::layout;
use super::SyncError;
use crate::{Hart, Word};

/// What a reference query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// The last memory access, see [`crate::hart::MemEvent`].
    MemEvent,
}

impl QueryKind {
    pub const MEM_EVENT: Word = 0;

    pub fn from_raw(raw: Word) -> Option<Self> {
        match raw {
            Self::MEM_EVENT => Some(Self::MemEvent),
            _ => None,
        }
    }

    /// Number of words in the answer to this query.
    pub fn answer_len(self) -> usize {
        match self {
            Self::MemEvent => layout::MEM_EVENT_LEN,
        }
    }
}

/// Writes the answer to query `kind` into `buf`. Answering consumes the queried state, so asking
/// twice in a row reports nothing the second time.
pub(super) fn answer(hart: &mut Hart, kind: QueryKind, buf: &mut [Word]) -> Result<(), SyncError> {
    match kind {
        QueryKind::MemEvent => {
            layout::check_len(buf.len(), kind.answer_len())?;
            let event = hart.take_mem_event();
            layout::encode_mem_event(&event, buf)
        }
    }
}
