//! Address translation state derived from the CSRs.
//!
//! The execution pipeline consults a [`Translation`] on every memory access. Deriving it takes a
//! few CSR reads, so it is cached in an [`MmuCache`] until something that feeds into it changes.
//! Anything that overwrites CSRs or the current mode from outside the pipeline must call
//! [`MmuCache::invalidate`].

use bitvec::{field::BitField, order::Lsb0, view::BitView};

use super::status::Status;
use crate::csr::specifier::{MSTATUS, SATP, VSATP, VSSTATUS};
use crate::csr::CsrFile;
use crate::{Capabilities, Mode, PrivilegeLevel, Word};

/// Virtual memory scheme selected by the MODE field of satp (or vsatp).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationMode {
    /// No translation or protection.
    Bare,
    Sv39,
    Sv48,
    Sv57,
}

impl TranslationMode {
    /// Decodes the 4-bit MODE field. Reserved encodings leave translation off.
    pub fn from_u4(value_u4: u8) -> Self {
        match value_u4 {
            8 => Self::Sv39,
            9 => Self::Sv48,
            10 => Self::Sv57,
            _ => Self::Bare,
        }
    }
}

/// Everything the pipeline needs to translate a data access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub mode: TranslationMode,
    /// Physical page number of the root page table.
    pub root_ppn: Word,
    pub asid: u16,
    /// Privilege level loads and stores are checked against, which differs from the current
    /// level when MPRV is set in M-mode.
    pub effective_privilege: PrivilegeLevel,
    pub sum: bool,
    pub mxr: bool,
}

impl Translation {
    pub fn compute(mode: Mode, csrs: &CsrFile, capabilities: &Capabilities) -> Self {
        let mstatus = Status(csrs.read(MSTATUS));
        let virtualized = capabilities.hypervisor && mode.is_virtualized();

        let effective_privilege = if mode == Mode::Machine && mstatus.mprv() {
            // MPP is WARL, a reserved value behaves as M.
            mstatus.mpp().unwrap_or(PrivilegeLevel::Machine)
        } else {
            mode.privilege_level()
        };

        let (satp, sum) = if virtualized {
            (csrs.read(VSATP), Status(csrs.read(VSSTATUS)).sum())
        } else {
            (csrs.read(SATP), mstatus.sum())
        };
        let bits = satp.view_bits::<Lsb0>();
        let translation_mode = if effective_privilege == PrivilegeLevel::Machine {
            TranslationMode::Bare
        } else {
            TranslationMode::from_u4(bits[60..64].load_le())
        };

        Self {
            mode: translation_mode,
            root_ppn: bits[0..44].load_le(),
            asid: bits[44..60].load_le(),
            effective_privilege,
            sum,
            mxr: mstatus.mxr(),
        }
    }
}

/// Lazily derived [`Translation`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MmuCache {
    state: Option<Translation>,
}

impl MmuCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cached state, so that the next [`Self::translation`] recomputes it.
    pub fn invalidate(&mut self) {
        self.state = None;
    }

    pub fn is_valid(&self) -> bool {
        self.state.is_some()
    }

    /// Returns the cached translation state, deriving it first if it was invalidated.
    pub fn translation(
        &mut self,
        mode: Mode,
        csrs: &CsrFile,
        capabilities: &Capabilities,
    ) -> Translation {
        *self
            .state
            .get_or_insert_with(|| Translation::compute(mode, csrs, capabilities))
    }
}
