//! Decides which mode handles a trap.
//!
//! > By default, all traps at any privilege level are handled in machine mode, though a
//! > machine-mode handler can redirect traps back to the appropriate level. [...] To increase
//! > performance, implementations can provide individual read/write bits within medeleg and
//! > mideleg to indicate that certain exceptions and interrupts should be processed directly by a
//! > lower privilege level.

use super::trap::TrapCause;
use crate::csr::specifier::*;
use crate::csr::CsrFile;
use crate::{Capabilities, Mode};

/// Outcome of [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delegation {
    /// Mode the trap is taken in. One of M, S (HS), VS or U.
    pub target: Mode,
    /// Trap value register that receives the faulting address.
    pub tval: CsrSpecifier,
}

impl Delegation {
    const MACHINE: Self = Self {
        target: Mode::Machine,
        tval: MTVAL,
    };
}

/// Returns where `cause`, raised while executing in `mode`, is handled.
///
/// Only reads the delegation registers of `csrs`, so calling this any number of times with the
/// same inputs always gives the same answer.
pub fn decide(
    cause: TrapCause,
    mode: Mode,
    csrs: &CsrFile,
    capabilities: &Capabilities,
) -> Delegation {
    // Traps never transition from a more-privileged mode to a less-privileged mode.
    if mode == Mode::Machine {
        return Delegation::MACHINE;
    }
    if !delegated_by(cause, csrs, MIDELEG, MEDELEG, capabilities) {
        return Delegation::MACHINE;
    }
    if capabilities.user_interrupts
        && mode == Mode::User
        && delegated_by(cause, csrs, SIDELEG, SEDELEG, capabilities)
    {
        return Delegation {
            target: Mode::User,
            tval: UTVAL,
        };
    }
    if capabilities.hypervisor
        && !capabilities.user_interrupts
        && mode.is_virtualized()
        && delegated_by(cause, csrs, HIDELEG, HEDELEG, capabilities)
    {
        return Delegation {
            target: Mode::VirtualSupervisor,
            tval: VSTVAL,
        };
    }
    Delegation {
        target: Mode::Supervisor,
        tval: STVAL,
    }
}

/// Tests the bit of `cause` in the interrupt or exception delegation register of a pair.
fn delegated_by(
    cause: TrapCause,
    csrs: &CsrFile,
    interrupt_register: CsrSpecifier,
    exception_register: CsrSpecifier,
    capabilities: &Capabilities,
) -> bool {
    let code = cause.code();
    if cause.is_interrupt() {
        let forced = capabilities.hypervisor
            && interrupt_register == MIDELEG
            && MIDELEG_FORCED_MASK >> code & 1 != 0;
        !forced && csrs.bit(interrupt_register, code)
    } else {
        csrs.bit(exception_register, code)
    }
}
