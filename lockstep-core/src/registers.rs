//! Integer and floating-point register files plus the program counter of one hart.

use std::fmt;

use crate::Word;

/// The bit width of the `x` and `f` registers.
pub const XLEN: u32 = Word::BITS;

/// The number of registers in each of the `x` and `f` files (indices start at `0`).
pub const LEN: u8 = 32;

/// A RISC-V hart's unprivileged registers.
///
/// There are 32 `x` registers and 32 `f` registers, each 64 bits wide, and the `pc`.
/// The register `x0` (aka `zero`) is always zero, writes to it are ignored. The `f` registers are
/// stored as raw NaN-boxed bit patterns, no floating-point interpretation happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    x_registers: [Word; LEN as usize],
    f_registers: [Word; LEN as usize],
    pc: Word,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Registers {
    /// Returns a fresh set of all-zero registers.
    pub fn new(initial_pc: Word) -> Self {
        Self {
            x_registers: [0; LEN as usize],
            f_registers: [0; LEN as usize],
            pc: initial_pc,
        }
    }

    pub fn x(&self, specifier: Specifier) -> Word {
        self.x_registers[usize::from(specifier)]
    }

    /// Sets the value of an `x` register.
    ///
    /// Writes to register `x0` are ignored.
    pub fn set_x(&mut self, specifier: Specifier, value: Word) {
        if specifier != Specifier::X0 {
            self.x_registers[usize::from(specifier)] = value;
        }
    }

    pub fn f(&self, specifier: Specifier) -> Word {
        self.f_registers[usize::from(specifier)]
    }

    pub fn set_f(&mut self, specifier: Specifier, value: Word) {
        self.f_registers[usize::from(specifier)] = value;
    }

    pub fn pc(&self) -> Word {
        self.pc
    }

    pub fn set_pc(&mut self, value: Word) {
        self.pc = value;
    }

    /// Copies all `x` registers into `out`, which must hold exactly [`LEN`] words.
    pub fn store_x(&self, out: &mut [Word]) {
        out.copy_from_slice(&self.x_registers);
    }

    /// Copies all `f` registers into `out`, which must hold exactly [`LEN`] words.
    pub fn store_f(&self, out: &mut [Word]) {
        out.copy_from_slice(&self.f_registers);
    }

    /// Loads all `x` registers from `words`, which must hold exactly [`LEN`] words.
    ///
    /// The value for `x0` is ignored.
    pub fn load_x(&mut self, words: &[Word]) {
        self.x_registers.copy_from_slice(words);
        self.x_registers[0] = 0;
    }

    /// Loads all `f` registers from `words`, which must hold exactly [`LEN`] words.
    pub fn load_f(&mut self, words: &[Word]) {
        self.f_registers.copy_from_slice(words);
    }
}

/// A register specifier. Can take values in the range `0..LEN`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Specifier(u8);

impl Specifier {
    /// Register `x0`, a.k.a. register `zero`.
    pub const X0: Self = Specifier(0);

    /// Create a register specifier from its index, returning `None` if `index > 31`.
    pub fn new<U: TryInto<u8>>(index: U) -> Option<Self> {
        let index = index.try_into().ok()?;
        (index < LEN).then_some(Self(index))
    }

    /// Convert a 5-bit value into a register specifier.
    /// Panics if the value doesn't fit in 5 bits (`0..=31`).
    pub fn from_u5(value_u5: u8) -> Self {
        const_assert_eq!(LEN, 32);
        if value_u5 > 31 {
            panic!("out of range u5 used");
        }
        Self(value_u5)
    }

    /// Return an iterator over all register specifiers, starting at index 0 up to 31.
    pub fn iter_all() -> impl Iterator<Item = Self> {
        (0..LEN).map(Self)
    }
}

impl From<Specifier> for usize {
    fn from(value: Specifier) -> Self {
        value.0 as usize
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
