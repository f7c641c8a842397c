//! Control and Status Registers of one hart.
//!
//! [`CsrFile`] is the authoritative store of every CSR, [`mirror::Mirror`] is the compact copy of
//! the registers the DUT compares against.

pub mod mirror;
pub mod specifier;

use std::fmt;

use crate::Word;
use specifier::CsrSpecifier;

/// Number of CSR specifiers, i.e. entries in a [`CsrFile`].
pub const CSR_COUNT: usize = 4096;

const_assert_eq!(CSR_COUNT, 1 << 12);

/// Flat storage for all 4096 CSRs of one hart.
///
/// > RISC-V defines a separate address space of 4096 Control and Status registers associated with
/// > each hart.
///
/// No access control or WARL legalization is done here: this is pure storage, every specifier
/// reads back exactly what was last written.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrFile {
    words: Box<[Word; CSR_COUNT]>,
}

impl Default for CsrFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CsrFile {
    /// Only lists the non-zero registers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.words
                    .iter()
                    .enumerate()
                    .filter(|(_, value)| **value != 0)
                    .map(|(specifier, value)| (specifier, format!("{value:#x}"))),
            )
            .finish()
    }
}

impl CsrFile {
    /// Creates a file with every register set to zero.
    pub fn new() -> Self {
        Self {
            words: Box::new([0; CSR_COUNT]),
        }
    }

    /// Panics if `specifier` is not a valid 12-bit specifier.
    pub fn read(&self, specifier: CsrSpecifier) -> Word {
        self.words[Self::index(specifier)]
    }

    /// Panics if `specifier` is not a valid 12-bit specifier.
    pub fn write(&mut self, specifier: CsrSpecifier, value: Word) {
        self.words[Self::index(specifier)] = value;
    }

    /// Returns `true` if bit `bit` of the register is set. Bits outside the register read as zero.
    pub fn bit(&self, specifier: CsrSpecifier, bit: u64) -> bool {
        bit < u64::from(Word::BITS) && self.read(specifier) >> bit & 1 != 0
    }

    /// Overwrites the whole file with `words`, which must hold exactly [`CSR_COUNT`] words.
    pub fn load(&mut self, words: &[Word]) {
        self.words.copy_from_slice(words);
    }

    /// Copies the whole file into `out`, which must hold exactly [`CSR_COUNT`] words.
    pub fn store(&self, out: &mut [Word]) {
        out.copy_from_slice(&self.words[..]);
    }

    fn index(specifier: CsrSpecifier) -> usize {
        if !specifier::is_valid(specifier) {
            panic!("out of range CSR specifier {specifier:#x}");
        }
        specifier as usize
    }
}
