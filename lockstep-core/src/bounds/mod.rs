//! DASICS hierarchical bounds-capability engine.
//!
//! Library code is confined to the memory and jump bounds handed to it. Every bound carries a
//! 2-bit trust level, lower being more trusted. A context may hand out bounds weaker than itself,
//! use but not overwrite bounds at its own level, and cannot touch stronger ones. Code in the
//! trusted zone is exempt from these checks.
//!
//! All tables live in the CSR file:
//!
//! | class  | config                           | bounds                          | level             |
//! |--------|----------------------------------|---------------------------------|-------------------|
//! | memory | `dlcfg0`, 4 bits per slot        | `dlbound0 + 2i`, `+ 2i + 1`     | `dllevel`, 2 bits |
//! | jump   | `djcfg`, 16 bits per slot        | `djbound0lo + 2i`, `+ 2i + 1`   | `djlevel`, 2 bits |
//! | scratch| `dscratchcfg`                    | `dscratchboundlo`, `...hi`      | `dscratchlevel`   |

use std::fmt;

use bitvec::{field::BitField, order::Lsb0, view::BitView};
use log::debug;
use thiserror::Error;

use crate::csr::specifier::*;
use crate::csr::CsrFile;
use crate::hart::trap::Exception;
use crate::{Hart, Word};

/// Number of memory (library) bound slots.
pub const MEM_SLOTS: usize = 16;
/// Number of jump bound slots.
pub const JUMP_SLOTS: usize = 4;
/// Jump slot index that selects the scratchpad slot.
pub const SCRATCH_INDEX: Word = 0xFF;
/// Highest trust level that fits in a level field. A context at this level cannot delegate.
pub const MAX_LEVEL: u8 = 3;

/// Memory config bit: the slot holds a bound.
pub const MEM_CFG_V: Word = 0x8;
/// Memory config bit: reads are allowed.
pub const MEM_CFG_R: Word = 0x2;
/// Memory config bit: writes are allowed.
pub const MEM_CFG_W: Word = 0x1;
/// Jump config bit: the slot holds a bound.
pub const JUMP_CFG_V: Word = 0x1;

const MEM_CFG_BITS: usize = 4;
const JUMP_CFG_BITS: usize = 16;
const LEVEL_BITS: usize = 2;

const_assert!(MEM_SLOTS * MEM_CFG_BITS <= 64);
const_assert!(JUMP_SLOTS * JUMP_CFG_BITS <= 64);
const_assert!(MEM_SLOTS * LEVEL_BITS <= 64);

/// Resource class of a bound table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundClass {
    Memory,
    Jump,
}

impl BoundClass {
    /// Decodes the class operand of a bound instruction: `0` is memory, `1` is jump.
    pub fn from_raw(raw: Word) -> Result<Self, BoundsFault> {
        match raw {
            0 => Ok(Self::Memory),
            1 => Ok(Self::Jump),
            _ => Err(BoundsFault::UnknownType(raw)),
        }
    }

    fn slots(self) -> usize {
        match self {
            Self::Memory => MEM_SLOTS,
            Self::Jump => JUMP_SLOTS,
        }
    }

    fn valid_bit(self) -> Word {
        match self {
            Self::Memory => MEM_CFG_V,
            Self::Jump => JUMP_CFG_V,
        }
    }

    /// Returns `true` if `index` names a slot of this class.
    fn accepts(self, index: Word) -> bool {
        index < self.slots() as Word || (self == Self::Jump && index == SCRATCH_INDEX)
    }
}

impl fmt::Display for BoundClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Jump => "jump",
        })
    }
}

/// Reason a bound instruction faults. Faults are never reported to software as a value, the hart
/// raises an illegal instruction exception instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsFault {
    #[error("unknown bound class {0:#x}")]
    UnknownType(Word),
    #[error("{class} bound index overflow: src {src:#x} dest {dest:#x}")]
    IndexOverflow {
        class: BoundClass,
        src: Word,
        dest: Word,
    },
    #[error("trust level {0} cannot delegate any further")]
    LevelOverflow(u8),
    #[error("level {caller} may not move {class} bound {src:#x} into {dest:#x}")]
    PrivilegeViolation {
        class: BoundClass,
        caller: u8,
        src: Word,
        dest: Word,
    },
}

/// Where the instruction consulting the engine executes. Deciding this from the `pc` is up to the
/// execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Trusted,
    Untrusted { level: u8 },
}

impl Caller {
    /// Trust level of the caller. The trusted zone counts as level 0.
    pub fn level(self) -> u8 {
        match self {
            Self::Trusted => 0,
            Self::Untrusted { level } => level,
        }
    }

    /// Level given to bounds this caller hands out.
    fn delegated_level(self) -> Result<u8, BoundsFault> {
        match self {
            Self::Trusted => Ok(0),
            Self::Untrusted { level } if level >= MAX_LEVEL => Err(BoundsFault::LevelOverflow(level)),
            Self::Untrusted { level } => Ok(level + 1),
        }
    }
}

/// Contents of one bound slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub cfg: Word,
    pub lo: Word,
    pub hi: Word,
    pub level: u8,
}

/// Classification of a slot relative to the level of the querying context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Access {
    /// The slot is more trusted than the caller.
    Deny = 0,
    /// The slot is at the caller's own level.
    ReadOnly = 1,
    /// The slot is less trusted than the caller.
    ReadWrite = 2,
    /// The slot holds no bound.
    Empty = 3,
}

impl Access {
    pub fn classify(slot: &Slot, class: BoundClass, caller_level: u8) -> Self {
        if slot.cfg & class.valid_bit() == 0 {
            Self::Empty
        } else if slot.level < caller_level {
            Self::Deny
        } else if slot.level == caller_level {
            Self::ReadOnly
        } else {
            Self::ReadWrite
        }
    }

    pub fn from_u2(value_u2: u8) -> Self {
        match value_u2 {
            0 => Self::Deny,
            1 => Self::ReadOnly,
            2 => Self::ReadWrite,
            3 => Self::Empty,
            _ => panic!("out of range u2 used"),
        }
    }
}

fn field(value: Word, index: usize, bits: usize) -> Word {
    value.view_bits::<Lsb0>()[index * bits..(index + 1) * bits].load_le()
}

fn with_field(mut value: Word, index: usize, bits: usize, new: Word) -> Word {
    value.view_bits_mut::<Lsb0>()[index * bits..(index + 1) * bits].store_le(new);
    value
}

/// Reads slot `index` of `class`. The index must be accepted by the class.
pub fn slot(csrs: &CsrFile, class: BoundClass, index: Word) -> Slot {
    match class {
        BoundClass::Jump if index == SCRATCH_INDEX => Slot {
            cfg: csrs.read(DSCRATCHCFG),
            lo: csrs.read(DSCRATCHBOUNDLO),
            hi: csrs.read(DSCRATCHBOUNDHI),
            level: field(csrs.read(DSCRATCHLEVEL), 0, LEVEL_BITS) as u8,
        },
        BoundClass::Memory => {
            let i = index as usize;
            Slot {
                cfg: field(csrs.read(DLCFG0), i, MEM_CFG_BITS),
                lo: csrs.read(DLBOUND0 + 2 * i as u16),
                hi: csrs.read(DLBOUND0 + 2 * i as u16 + 1),
                level: field(csrs.read(DLLEVEL), i, LEVEL_BITS) as u8,
            }
        }
        BoundClass::Jump => {
            let i = index as usize;
            Slot {
                cfg: field(csrs.read(DJCFG), i, JUMP_CFG_BITS),
                lo: csrs.read(DJBOUND0LO + 2 * i as u16),
                hi: csrs.read(DJBOUND0LO + 2 * i as u16 + 1),
                level: field(csrs.read(DJLEVEL), i, LEVEL_BITS) as u8,
            }
        }
    }
}

/// Overwrites slot `index` of `class`. The index must be accepted by the class.
pub fn store_slot(csrs: &mut CsrFile, class: BoundClass, index: Word, slot: Slot) {
    let level = Word::from(slot.level);
    match class {
        BoundClass::Jump if index == SCRATCH_INDEX => {
            csrs.write(DSCRATCHCFG, slot.cfg);
            csrs.write(DSCRATCHBOUNDLO, slot.lo);
            csrs.write(DSCRATCHBOUNDHI, slot.hi);
            csrs.write(DSCRATCHLEVEL, level);
        }
        BoundClass::Memory => {
            let i = index as usize;
            let cfg = with_field(csrs.read(DLCFG0), i, MEM_CFG_BITS, slot.cfg);
            let levels = with_field(csrs.read(DLLEVEL), i, LEVEL_BITS, level);
            csrs.write(DLCFG0, cfg);
            csrs.write(DLBOUND0 + 2 * i as u16, slot.lo);
            csrs.write(DLBOUND0 + 2 * i as u16 + 1, slot.hi);
            csrs.write(DLLEVEL, levels);
        }
        BoundClass::Jump => {
            let i = index as usize;
            let cfg = with_field(csrs.read(DJCFG), i, JUMP_CFG_BITS, slot.cfg);
            let levels = with_field(csrs.read(DJLEVEL), i, LEVEL_BITS, level);
            csrs.write(DJCFG, cfg);
            csrs.write(DJBOUND0LO + 2 * i as u16, slot.lo);
            csrs.write(DJBOUND0LO + 2 * i as u16 + 1, slot.hi);
            csrs.write(DJLEVEL, levels);
        }
    }
}

/// Copies bound `src` into `dest` within the table of class `class_raw`.
///
/// The copy gets the level of the caller plus one, or level 0 when the caller is in the trusted
/// zone. Outside the trusted zone, the caller must be at least as trusted as the source, and a
/// populated destination must be strictly less trusted than the caller. The scratchpad slot
/// always counts as empty.
pub fn transfer(
    csrs: &mut CsrFile,
    caller: Caller,
    class_raw: Word,
    src: Word,
    dest: Word,
) -> Result<(), BoundsFault> {
    let class = BoundClass::from_raw(class_raw)?;
    if !class.accepts(src) || !class.accepts(dest) {
        return Err(BoundsFault::IndexOverflow { class, src, dest });
    }
    let next_level = caller.delegated_level()?;

    let source = slot(csrs, class, src);
    if let Caller::Untrusted { level } = caller {
        let destination = slot(csrs, class, dest);
        let dest_empty = (class == BoundClass::Jump && dest == SCRATCH_INDEX)
            || destination.cfg & class.valid_bit() == 0;
        if level > source.level || (!dest_empty && level >= destination.level) {
            return Err(BoundsFault::PrivilegeViolation {
                class,
                caller: level,
                src,
                dest,
            });
        }
    }

    store_slot(
        csrs,
        class,
        dest,
        Slot {
            level: next_level,
            ..source
        },
    );
    Ok(())
}

/// Classifies every slot of class `class_raw` for a context at `caller_level`, packed as 2-bit
/// [`Access`] codes with slot `i` at bits `2i..2i+2`.
pub fn query(csrs: &CsrFile, caller_level: u8, class_raw: Word) -> Result<Word, BoundsFault> {
    let class = BoundClass::from_raw(class_raw)?;
    let mut result: Word = 0;
    for i in 0..class.slots() {
        let access = Access::classify(&slot(csrs, class, i as Word), class, caller_level);
        result = with_field(result, i, LEVEL_BITS, access as Word);
    }
    Ok(result)
}

/// Returns the return-PC register of the level the caller delegates to.
pub fn dretpc_register(caller: Caller) -> Result<CsrSpecifier, BoundsFault> {
    Ok(DRETPC0 + u16::from(caller.delegated_level()?))
}

impl Hart {
    /// Executes a bound transfer, taking an illegal instruction exception if it faults.
    ///
    /// Returns `true` if the transfer happened.
    pub fn bound_transfer(&mut self, caller: Caller, class_raw: Word, src: Word, dest: Word) -> bool {
        let result = transfer(self.csrs_mut(), caller, class_raw, src, dest);
        self.fault_on_err(result).is_some()
    }

    /// Executes a bound query, taking an illegal instruction exception if it faults.
    pub fn bound_query(&mut self, caller: Caller, class_raw: Word) -> Option<Word> {
        let result = query(self.csrs(), caller.level(), class_raw);
        self.fault_on_err(result)
    }

    /// Stores `value` in the return-PC register of the level the caller delegates to, taking an
    /// illegal instruction exception if the caller cannot delegate.
    pub fn set_dretpc(&mut self, caller: Caller, value: Word) -> bool {
        match self.fault_on_err(dretpc_register(caller)) {
            Some(register) => {
                self.csrs_mut().write(register, value);
                true
            }
            None => false,
        }
    }

    fn fault_on_err<T>(&mut self, result: Result<T, BoundsFault>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(fault) => {
                debug!("Bound instruction faulted: {fault}");
                self.raise_exception(Exception::IllegalInstruction, 0);
                None
            }
        }
    }
}
