//! Static configuration of a reference model.

use std::path::PathBuf;

use crate::Word;

/// Set of optional architecture extensions and model features.
///
/// The set is decided once, when the model is built, and never changes afterwards: it determines
/// which CSRs exist in the mirror, the register block layout and which delegation rules apply.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Hypervisor extension (H): HS/VS/VU modes and the `h*`/`vs*` CSRs.
    pub hypervisor: bool,
    /// User-level interrupts (N): `u*` trap CSRs and delegation to U-mode.
    pub user_interrupts: bool,
    /// Vector extension (V) control and status CSRs.
    pub vector: bool,
    /// DASICS bounds-capability extension.
    pub dasics: bool,
    /// Memory protection keys.
    pub mpk: bool,
    /// The DUT may force exceptions and jump targets for single steps.
    pub guided_exec: bool,
    /// Keep checkpoints and run ahead of the DUT, so that every synchronization call may roll the
    /// model back first.
    pub speculative_checkpoints: bool,
    /// The model records memory events the DUT can query.
    pub query_ref: bool,
    /// The model records a branch log the DUT can query.
    pub br_log: bool,
    /// Several harts share the simulated machine, so `mhartid` may be assigned.
    pub multicore: bool,
}

impl Capabilities {
    /// Minimal capability set: only the always-present M/S/U machinery.
    pub fn base() -> Self {
        Self::default()
    }

    /// Returns `true` if the DASICS fault-reason register is present.
    pub fn has_fault_reason(&self) -> bool {
        self.dasics || self.mpk
    }
}

/// Default number of retirements the model runs ahead of the DUT in speculative mode.
pub const DEFAULT_AHEAD_LENGTH: u64 = 500;

/// Default number of records the branch log holds before it starts dropping the oldest ones.
pub const DEFAULT_BR_LOG_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub capabilities: Capabilities,
    /// Address to which the hart's `pc` is reset.
    pub reset_vector: Word,
    /// Value of `mhartid` on reset.
    pub hart_id: Word,
    /// Number of retirements to execute ahead of the DUT after each stable checkpoint.
    pub ahead_length: u64,
    /// Maximum number of records kept in the branch log.
    pub br_log_capacity: usize,
    /// File the diagnostic register dump is written to. No dump is written if unset.
    pub reg_dump_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            reset_vector: 0x8000_0000,
            hart_id: 0,
            ahead_length: DEFAULT_AHEAD_LENGTH,
            br_log_capacity: DEFAULT_BR_LOG_CAPACITY,
            reg_dump_path: None,
        }
    }
}

impl Config {
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }
}
