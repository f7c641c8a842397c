//! Privileged-architecture state of a RISC-V (RV64) golden reference model for differential
//! testing.
//!
//! The crate keeps the CSR file of every modelled hart, a compact mirror of the CSRs the DUT
//! compares against, the trap delegation logic, the DASICS bounds-capability engine, and the
//! synchronization protocol the DUT harness drives (see [`difftest::RefModel`]).
//!
//! Instruction execution itself is not part of this crate, it is reached through the
//! [`difftest::Executor`] trait.

#[macro_use]
extern crate static_assertions;

use std::fmt;

pub mod bounds;
pub mod config;
pub mod csr;
pub mod difftest;
pub mod hart;
pub mod registers;

/// Re-export of [`config::Config`] and [`config::Capabilities`] for convenience.
pub use config::{Capabilities, Config};

/// Re-export of [`hart::Hart`] for convenience.
pub use hart::Hart;

/// A machine word of the modelled RV64 hart.
pub type Word = u64;

/// RISC-V privilege level, ordered from least to most privileged.
///
/// Levels are encoded in two bits. Encoding `0b10` is reserved (also with the hypervisor extension,
/// which adds virtualization as a separate bit), so decoding a 2-bit field can fail.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum PrivilegeLevel {
    User = 0b00,
    /// Called HS-mode when the hypervisor extension is present and V=0.
    Supervisor = 0b01,
    Machine = 0b11,
}

impl PrivilegeLevel {
    /// Decodes a 2-bit level field. Returns `None` for the reserved encoding.
    ///
    /// Panics if `bits` does not fit in two bits.
    pub fn from_u2(bits: u8) -> Option<Self> {
        match bits {
            0b00 => Some(Self::User),
            0b01 => Some(Self::Supervisor),
            0b10 => None,
            0b11 => Some(Self::Machine),
            _ => panic!("privilege level encoding {bits:#b} does not fit in two bits"),
        }
    }

    pub fn to_u2(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::User => 'U',
            Self::Supervisor => 'S',
            Self::Machine => 'M',
        };
        write!(f, "{letter}")
    }
}

/// The mode a hart executes in: a privilege level plus, with the hypervisor extension, the
/// virtualization mode (V bit).
///
/// > The hypervisor extension changes supervisor mode into hypervisor-extended supervisor mode
/// > (HS-mode). [...] When V=1, the hart is in a virtual mode: VS-mode or VU-mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Mode {
    Machine,
    /// S-mode, or HS-mode when the hypervisor extension is present.
    Supervisor,
    User,
    VirtualSupervisor,
    VirtualUser,
}

impl Mode {
    /// Combines a privilege level with a virtualization bit. Machine mode is never virtualized, so
    /// `virtualized` is ignored for [`PrivilegeLevel::Machine`].
    pub fn new(level: PrivilegeLevel, virtualized: bool) -> Self {
        match (level, virtualized) {
            (PrivilegeLevel::Machine, _) => Self::Machine,
            (PrivilegeLevel::Supervisor, false) => Self::Supervisor,
            (PrivilegeLevel::Supervisor, true) => Self::VirtualSupervisor,
            (PrivilegeLevel::User, false) => Self::User,
            (PrivilegeLevel::User, true) => Self::VirtualUser,
        }
    }

    pub fn privilege_level(self) -> PrivilegeLevel {
        match self {
            Self::Machine => PrivilegeLevel::Machine,
            Self::Supervisor | Self::VirtualSupervisor => PrivilegeLevel::Supervisor,
            Self::User | Self::VirtualUser => PrivilegeLevel::User,
        }
    }

    /// Returns `true` for VS-mode and VU-mode.
    pub fn is_virtualized(self) -> bool {
        matches!(self, Self::VirtualSupervisor | Self::VirtualUser)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mode::Machine => "M",
            Mode::Supervisor => "S",
            Mode::User => "U",
            Mode::VirtualSupervisor => "VS",
            Mode::VirtualUser => "VU",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_level_and_virtualization() {
        for level in [
            PrivilegeLevel::User,
            PrivilegeLevel::Supervisor,
            PrivilegeLevel::Machine,
        ] {
            for virtualized in [false, true] {
                let mode = Mode::new(level, virtualized);
                assert_eq!(level, mode.privilege_level());
                assert_eq!(
                    virtualized && level != PrivilegeLevel::Machine,
                    mode.is_virtualized()
                );
            }
        }
    }

    #[test]
    fn level_encodings() {
        assert_eq!(None, PrivilegeLevel::from_u2(0b10));
        for level in [
            PrivilegeLevel::User,
            PrivilegeLevel::Supervisor,
            PrivilegeLevel::Machine,
        ] {
            assert_eq!(Some(level), PrivilegeLevel::from_u2(level.to_u2()));
        }
        assert!(PrivilegeLevel::Machine > PrivilegeLevel::Supervisor);
        assert_eq!("S", PrivilegeLevel::Supervisor.to_string());
    }
}
