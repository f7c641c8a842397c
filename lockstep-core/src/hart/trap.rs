//! Exception and interrupt codes.

use std::fmt;

use bitvec::{field::BitField, order::Lsb0, view::BitView};

use crate::Word;

/// Bit of a raw cause value that marks it as an interrupt.
pub const INTERRUPT_BIT: Word = 1 << (Word::BITS - 1);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Exception {
    /// Instruction address is not on a four-byte aligned boundary in memory.
    InstructionAddressMisaligned,
    InstructionAccessFault,
    /// Generic exception used to communicate one of many possible scenarios, among which a
    /// rejected bounds-capability transfer.
    IllegalInstruction,
    Breakpoint,
    LoadAddressMisaligned,
    LoadAccessFault,
    StoreOrAmoAddressMisaligned,
    StoreOrAmoAccessFault,
    EnvironmentCallFromUMode,
    /// Environment call from S-mode or HS-mode.
    EnvironmentCallFromSMode,
    EnvironmentCallFromVSMode,
    EnvironmentCallFromMMode,
    InstructionPageFault,
    LoadPageFault,
    StoreOrAmoPageFault,
    InstructionGuestPageFault,
    LoadGuestPageFault,
    VirtualInstruction,
    StoreOrAmoGuestPageFault,
    DasicsUserInstructionAccessFault,
    DasicsSupervisorInstructionAccessFault,
    DasicsUserLoadAccessFault,
    DasicsSupervisorLoadAccessFault,
    DasicsUserStoreAccessFault,
    DasicsSupervisorStoreAccessFault,
    DasicsUserEcallFault,
    DasicsSupervisorEcallFault,
    ProtectionKeyUserLoadPageFault,
    ProtectionKeyUserStorePageFault,
    ProtectionKeySupervisorLoadPageFault,
    ProtectionKeySupervisorStorePageFault,
}

impl Exception {
    /// Returns the exception code (cause) for this exception.
    pub fn code(&self) -> Word {
        match self {
            Self::InstructionAddressMisaligned => 0,
            Self::InstructionAccessFault => 1,
            Self::IllegalInstruction => 2,
            Self::Breakpoint => 3,
            Self::LoadAddressMisaligned => 4,
            Self::LoadAccessFault => 5,
            Self::StoreOrAmoAddressMisaligned => 6,
            Self::StoreOrAmoAccessFault => 7,
            Self::EnvironmentCallFromUMode => 8,
            Self::EnvironmentCallFromSMode => 9,
            Self::EnvironmentCallFromVSMode => 10,
            Self::EnvironmentCallFromMMode => 11,
            Self::InstructionPageFault => 12,
            Self::LoadPageFault => 13,
            Self::StoreOrAmoPageFault => 15,
            Self::InstructionGuestPageFault => 20,
            Self::LoadGuestPageFault => 21,
            Self::VirtualInstruction => 22,
            Self::StoreOrAmoGuestPageFault => 23,
            Self::DasicsUserInstructionAccessFault => 24,
            Self::DasicsSupervisorInstructionAccessFault => 25,
            Self::DasicsUserLoadAccessFault => 26,
            Self::DasicsSupervisorLoadAccessFault => 27,
            Self::DasicsUserStoreAccessFault => 28,
            Self::DasicsSupervisorStoreAccessFault => 29,
            Self::DasicsUserEcallFault => 30,
            Self::DasicsSupervisorEcallFault => 31,
            Self::ProtectionKeyUserLoadPageFault => 32,
            Self::ProtectionKeyUserStorePageFault => 33,
            Self::ProtectionKeySupervisorLoadPageFault => 34,
            Self::ProtectionKeySupervisorStorePageFault => 35,
        }
    }

    /// Inverse of [`Self::code`]. Reserved codes give `None`.
    pub fn from_code(code: Word) -> Option<Self> {
        Some(match code {
            0 => Self::InstructionAddressMisaligned,
            1 => Self::InstructionAccessFault,
            2 => Self::IllegalInstruction,
            3 => Self::Breakpoint,
            4 => Self::LoadAddressMisaligned,
            5 => Self::LoadAccessFault,
            6 => Self::StoreOrAmoAddressMisaligned,
            7 => Self::StoreOrAmoAccessFault,
            8 => Self::EnvironmentCallFromUMode,
            9 => Self::EnvironmentCallFromSMode,
            10 => Self::EnvironmentCallFromVSMode,
            11 => Self::EnvironmentCallFromMMode,
            12 => Self::InstructionPageFault,
            13 => Self::LoadPageFault,
            15 => Self::StoreOrAmoPageFault,
            20 => Self::InstructionGuestPageFault,
            21 => Self::LoadGuestPageFault,
            22 => Self::VirtualInstruction,
            23 => Self::StoreOrAmoGuestPageFault,
            24 => Self::DasicsUserInstructionAccessFault,
            25 => Self::DasicsSupervisorInstructionAccessFault,
            26 => Self::DasicsUserLoadAccessFault,
            27 => Self::DasicsSupervisorLoadAccessFault,
            28 => Self::DasicsUserStoreAccessFault,
            29 => Self::DasicsSupervisorStoreAccessFault,
            30 => Self::DasicsUserEcallFault,
            31 => Self::DasicsSupervisorEcallFault,
            32 => Self::ProtectionKeyUserLoadPageFault,
            33 => Self::ProtectionKeyUserStorePageFault,
            34 => Self::ProtectionKeySupervisorLoadPageFault,
            35 => Self::ProtectionKeySupervisorStorePageFault,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Interrupt {
    UserSoftwareInterrupt,
    SupervisorSoftwareInterrupt,
    VirtualSupervisorSoftwareInterrupt,
    MachineSoftwareInterrupt,
    UserTimerInterrupt,
    SupervisorTimerInterrupt,
    VirtualSupervisorTimerInterrupt,
    MachineTimerInterrupt,
    UserExternalInterrupt,
    SupervisorExternalInterrupt,
    VirtualSupervisorExternalInterrupt,
    MachineExternalInterrupt,
    SupervisorGuestExternalInterrupt,
}

impl Interrupt {
    /// Returns the exception code (cause) for this interrupt.
    pub fn code(&self) -> Word {
        match self {
            Self::UserSoftwareInterrupt => 0,
            Self::SupervisorSoftwareInterrupt => 1,
            Self::VirtualSupervisorSoftwareInterrupt => 2,
            Self::MachineSoftwareInterrupt => 3,
            Self::UserTimerInterrupt => 4,
            Self::SupervisorTimerInterrupt => 5,
            Self::VirtualSupervisorTimerInterrupt => 6,
            Self::MachineTimerInterrupt => 7,
            Self::UserExternalInterrupt => 8,
            Self::SupervisorExternalInterrupt => 9,
            Self::VirtualSupervisorExternalInterrupt => 10,
            Self::MachineExternalInterrupt => 11,
            Self::SupervisorGuestExternalInterrupt => 12,
        }
    }

    pub fn from_code(code: Word) -> Option<Self> {
        Some(match code {
            0 => Self::UserSoftwareInterrupt,
            1 => Self::SupervisorSoftwareInterrupt,
            2 => Self::VirtualSupervisorSoftwareInterrupt,
            3 => Self::MachineSoftwareInterrupt,
            4 => Self::UserTimerInterrupt,
            5 => Self::SupervisorTimerInterrupt,
            6 => Self::VirtualSupervisorTimerInterrupt,
            7 => Self::MachineTimerInterrupt,
            8 => Self::UserExternalInterrupt,
            9 => Self::SupervisorExternalInterrupt,
            10 => Self::VirtualSupervisorExternalInterrupt,
            11 => Self::MachineExternalInterrupt,
            12 => Self::SupervisorGuestExternalInterrupt,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TrapCause {
    Exception(Exception),
    Interrupt(Interrupt),
}

impl TrapCause {
    /// Decodes a raw `xcause`-style value: bit 63 marks an interrupt, the rest is the code.
    pub fn from_raw(raw: Word) -> Option<Self> {
        if raw & INTERRUPT_BIT != 0 {
            Interrupt::from_code(raw & !INTERRUPT_BIT).map(Self::Interrupt)
        } else {
            Exception::from_code(raw).map(Self::Exception)
        }
    }

    /// Encodes the cause the way it is written into an `xcause` register.
    pub fn raw(&self) -> Word {
        match self {
            Self::Exception(exception) => exception.code(),
            Self::Interrupt(interrupt) => INTERRUPT_BIT | interrupt.code(),
        }
    }

    pub fn code(&self) -> Word {
        match self {
            Self::Exception(exception) => exception.code(),
            Self::Interrupt(interrupt) => interrupt.code(),
        }
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupt(_))
    }
}

impl From<Exception> for TrapCause {
    fn from(value: Exception) -> Self {
        Self::Exception(value)
    }
}

impl From<Interrupt> for TrapCause {
    fn from(value: Interrupt) -> Self {
        Self::Interrupt(value)
    }
}

impl fmt::Display for TrapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exception(exception) => write!(f, "exception {} ({exception:?})", exception.code()),
            Self::Interrupt(interrupt) => write!(f, "interrupt {} ({interrupt:?})", interrupt.code()),
        }
    }
}

/// Trap vector base address register (mtvec, stvec, vstvec or utvec).
///
/// > When MODE=Direct, all traps into machine mode cause the pc to be set to the address in the
/// > BASE field. When MODE=Vectored, all synchronous exceptions into machine mode cause the pc to
/// > be set to the address in the BASE field, whereas interrupts cause the pc to be set to the
/// > address in the BASE field plus four times the interrupt cause number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tvec(pub Word);

impl Tvec {
    /// Returns the vector base address (stored in BASE field).
    pub fn base(&self) -> Word {
        self.0.view_bits::<Lsb0>()[2..].load_le::<Word>() << 2
    }

    /// Returns the vector mode (stored in MODE field).
    ///
    /// MODE values of 2 and above are reserved, they are treated as direct.
    pub fn mode(&self) -> VectorMode {
        match self.0 & 0b11 {
            1 => VectorMode::Vectored,
            _ => VectorMode::Direct,
        }
    }

    /// Returns the address a trap with the given cause jumps to. `code` is the cause code as it
    /// is reported to the handler.
    pub fn handler(&self, is_interrupt: bool, code: Word) -> Word {
        match self.mode() {
            VectorMode::Vectored if is_interrupt => self.base().wrapping_add(4 * code),
            _ => self.base(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorMode {
    Direct,
    Vectored,
}
