//! Architectural state of one hart, and trap entry.

pub mod delegation;
pub mod mmu;
pub mod status;
pub mod trap;

use std::collections::VecDeque;

use log::trace;

use crate::csr::mirror::Mirror;
use crate::csr::specifier::*;
use crate::csr::CsrFile;
use crate::registers::Registers;
use crate::{Capabilities, Config, Mode, PrivilegeLevel, Word};
use delegation::{decide, Delegation};
use mmu::{MmuCache, Translation};
use status::{HStatus, Status};
use trap::{Exception, TrapCause, Tvec};

/// Single instruction directive the DUT can force on the model, see
/// [`crate::difftest::RefModel::guided_exec`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionGuide {
    /// Raise exception `exception_num` instead of executing the instruction normally.
    pub force_raise_exception: bool,
    pub exception_num: Word,
    /// Trap values to report when the forced exception is taken in M-mode or S-mode.
    pub mtval: Word,
    pub stval: Word,
    /// Continue at `jump_target` after the instruction.
    pub force_set_jump_target: bool,
    pub jump_target: Word,
}

/// Last memory access done by the model, as reported to the DUT by a reference query.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemEvent {
    pub pc: Word,
    /// `true` if a memory access was recorded since the last query.
    pub mem_access: bool,
    pub is_load: bool,
    pub vaddr: Word,
}

/// One entry of the branch log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchRecord {
    pub pc: Word,
    pub target: Word,
    pub taken: bool,
}

/// All per-hart state: unprivileged registers, CSRs, mode and the bookkeeping the DUT may
/// synchronize with.
///
/// The [`CsrFile`] is the authoritative copy of every CSR. The [`Mirror`] is only brought in sync
/// with it through [`Hart::pull_mirror`] and [`Hart::push_mirror`].
///
/// Cloning a hart gives a complete, independent checkpoint of its state.
#[derive(Debug, Clone)]
pub struct Hart {
    capabilities: Capabilities,
    pub registers: Registers,
    pub mirror: Mirror,
    csrs: CsrFile,
    mode: Mode,
    /// Number of retired instructions.
    retired: u64,
    lr_valid: bool,
    lr_addr: Word,
    guide: Option<ExecutionGuide>,
    mem_event: MemEvent,
    /// Most recent branches, oldest first. Never grows past `branch_log_capacity`.
    branch_log: VecDeque<BranchRecord>,
    branch_log_capacity: usize,
    mmu: MmuCache,
}

impl Hart {
    /// Creates a hart in its reset state: M-mode, `pc` at the reset vector, all CSRs zero except
    /// `mhartid`.
    pub fn new(config: &Config) -> Self {
        let mut csrs = CsrFile::new();
        csrs.write(MHARTID, config.hart_id);
        Self {
            capabilities: config.capabilities,
            registers: Registers::new(config.reset_vector),
            mirror: Mirror::default(),
            csrs,
            mode: Mode::Machine,
            retired: 0,
            lr_valid: false,
            lr_addr: 0,
            guide: None,
            mem_event: MemEvent::default(),
            branch_log: VecDeque::with_capacity(config.br_log_capacity),
            branch_log_capacity: config.br_log_capacity,
            mmu: MmuCache::new(),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn csrs(&self) -> &CsrFile {
        &self.csrs
    }

    /// Gives write access to the CSRs. The derived address translation state is dropped, since
    /// any CSR may feed into it.
    pub fn csrs_mut(&mut self) -> &mut CsrFile {
        self.mmu.invalidate();
        &mut self.csrs
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.mmu.invalidate();
    }

    pub fn retired(&self) -> u64 {
        self.retired
    }

    /// Counts one more retired instruction.
    pub fn retire(&mut self) {
        self.retired += 1;
    }

    /// Refreshes the mirror from the CSR file.
    pub fn pull_mirror(&mut self) {
        self.mirror.pull(&self.csrs, &self.capabilities);
    }

    /// Writes the mirror back into the CSR file.
    pub fn push_mirror(&mut self) {
        self.mirror.push(&mut self.csrs, &self.capabilities);
        self.mmu.invalidate();
    }

    /// Returns the address translation state, deriving it first if needed.
    pub fn translation(&mut self) -> Translation {
        self.mmu.translation(self.mode, &self.csrs, &self.capabilities)
    }

    pub fn mmu(&self) -> &MmuCache {
        &self.mmu
    }

    pub fn invalidate_mmu(&mut self) {
        self.mmu.invalidate();
    }

    pub fn set_mhartid(&mut self, id: Word) {
        self.csrs.write(MHARTID, id);
    }

    pub fn lr_valid(&self) -> bool {
        self.lr_valid
    }

    pub fn lr_addr(&self) -> Word {
        self.lr_addr
    }

    /// Establishes a load reservation, as done by an LR instruction.
    pub fn set_reservation(&mut self, addr: Word) {
        self.lr_valid = true;
        self.lr_addr = addr;
    }

    /// Drops the load reservation. The address is kept for reporting.
    pub fn clear_reservation(&mut self) {
        self.lr_valid = false;
    }

    /// Returns the directive of the guided instruction in progress, if any.
    pub fn guide(&self) -> Option<&ExecutionGuide> {
        self.guide.as_ref()
    }

    pub(crate) fn begin_guided(&mut self, guide: ExecutionGuide) {
        self.guide = Some(guide);
    }

    pub(crate) fn end_guided(&mut self) {
        self.guide = None;
    }

    /// Records a memory access for the next reference query.
    pub fn record_mem_access(&mut self, vaddr: Word, is_load: bool) {
        self.mem_event = MemEvent {
            pc: self.registers.pc(),
            mem_access: true,
            is_load,
            vaddr,
        };
    }

    /// Returns the pending memory event and clears it.
    pub fn take_mem_event(&mut self) -> MemEvent {
        std::mem::take(&mut self.mem_event)
    }

    /// Appends `record` to the branch log. A full log drops its oldest record first.
    pub fn record_branch(&mut self, record: BranchRecord) {
        if self.branch_log_capacity == 0 {
            return;
        }
        if self.branch_log.len() == self.branch_log_capacity {
            self.branch_log.pop_front();
        }
        self.branch_log.push_back(record);
    }

    /// Returns the branch log, oldest record first.
    pub fn branch_log(&mut self) -> &[BranchRecord] {
        self.branch_log.make_contiguous()
    }

    /// Takes exception `exception` at the current `pc`, and continues at its handler.
    pub fn raise_exception(&mut self, exception: Exception, tval: Word) {
        let epc = self.registers.pc();
        let handler = self.raise_trap(exception.into(), epc, tval);
        self.registers.set_pc(handler);
    }

    /// Enters the trap handler for `cause`, which was raised at `epc` with trap value `tval`.
    ///
    /// Writes the cause, epc and trap value registers of the mode that handles the trap, stacks
    /// the interrupt-enable and previous-privilege bits, switches mode, and returns the address of
    /// the handler. The `pc` itself is left untouched.
    pub fn raise_trap(&mut self, cause: TrapCause, epc: Word, tval: Word) -> Word {
        let Delegation { target, tval: tval_register } =
            decide(cause, self.mode, &self.csrs, &self.capabilities);
        trace!("Taking {cause} from {} to {target} at {epc:#x}", self.mode);

        let from = self.mode;
        let level = from.privilege_level();
        let hypervisor = self.capabilities.hypervisor;

        let (cause_register, epc_register, tvec_register, reported_code) = match target {
            Mode::Machine => {
                let mut mstatus = Status(self.csrs.read(MSTATUS));
                mstatus.set_mpie(mstatus.mie());
                mstatus.set_mie(false);
                mstatus.set_mpp(level);
                if hypervisor {
                    mstatus.set_mpv(from.is_virtualized());
                }
                self.csrs.write(MSTATUS, mstatus.0);
                (MCAUSE, MEPC, MTVEC, cause.code())
            }
            Mode::Supervisor => {
                let mut mstatus = Status(self.csrs.read(MSTATUS));
                mstatus.set_spie(mstatus.sie());
                mstatus.set_sie(false);
                mstatus.set_spp(level);
                self.csrs.write(MSTATUS, mstatus.0);
                if hypervisor {
                    let mut hstatus = HStatus(self.csrs.read(HSTATUS));
                    hstatus.set_spv(from.is_virtualized());
                    if from.is_virtualized() {
                        hstatus.set_spvp(level == PrivilegeLevel::Supervisor);
                    }
                    self.csrs.write(HSTATUS, hstatus.0);
                }
                (SCAUSE, SEPC, STVEC, cause.code())
            }
            Mode::VirtualSupervisor => {
                let mut vsstatus = Status(self.csrs.read(VSSTATUS));
                vsstatus.set_spie(vsstatus.sie());
                vsstatus.set_sie(false);
                vsstatus.set_spp(level);
                self.csrs.write(VSSTATUS, vsstatus.0);
                (VSCAUSE, VSEPC, VSTVEC, cause.code())
            }
            Mode::User => {
                let mut mstatus = Status(self.csrs.read(MSTATUS));
                mstatus.set_upie(mstatus.uie());
                mstatus.set_uie(false);
                self.csrs.write(MSTATUS, mstatus.0);
                (UCAUSE, UEPC, UTVEC, cause.code())
            }
            Mode::VirtualUser => unreachable!("traps are never delegated to VU-mode"),
        };

        let raw_cause = if cause.is_interrupt() {
            trap::INTERRUPT_BIT | reported_code
        } else {
            reported_code
        };
        self.csrs.write(cause_register, raw_cause);
        self.csrs.write(epc_register, epc);
        self.csrs.write(tval_register, tval);
        if hypervisor && target == Mode::Machine {
            self.csrs.write(MTVAL2, 0);
            self.csrs.write(MTINST, 0);
        }

        self.set_mode(target);
        Tvec(self.csrs.read(tvec_register)).handler(cause.is_interrupt(), reported_code)
    }
}

#[cfg(test)]
mod tests {
    use super::trap::Interrupt;
    use super::*;

    fn hart(capabilities: Capabilities) -> Hart {
        Hart::new(&Config::with_capabilities(capabilities))
    }

    #[test]
    fn reset_state() {
        let config = Config {
            hart_id: 2,
            ..Config::default()
        };
        let hart = Hart::new(&config);
        assert_eq!(Mode::Machine, hart.mode());
        assert_eq!(config.reset_vector, hart.registers.pc());
        assert_eq!(2, hart.csrs().read(MHARTID));
        assert_eq!(0, hart.retired());
    }

    #[test]
    fn machine_trap_stacks_status() {
        let mut hart = hart(Capabilities::base());
        hart.set_mode(Mode::Supervisor);
        hart.csrs_mut().write(MSTATUS, 1 << 3); // MIE
        hart.csrs_mut().write(MTVEC, 0x8000_0100);

        let handler = hart.raise_trap(Exception::LoadAccessFault.into(), 0x1234, 0xBAD);
        assert_eq!(0x8000_0100, handler);
        assert_eq!(Mode::Machine, hart.mode());
        assert_eq!(5, hart.csrs().read(MCAUSE));
        assert_eq!(0x1234, hart.csrs().read(MEPC));
        assert_eq!(0xBAD, hart.csrs().read(MTVAL));
        let mstatus = Status(hart.csrs().read(MSTATUS));
        assert!(!mstatus.mie());
        assert!(mstatus.mpie());
        assert_eq!(Some(PrivilegeLevel::Supervisor), mstatus.mpp());
    }

    #[test]
    fn delegated_ecall_goes_to_supervisor() {
        let mut hart = hart(Capabilities::base());
        hart.set_mode(Mode::User);
        hart.csrs_mut().write(MEDELEG, 1 << 8);
        hart.csrs_mut().write(MSTATUS, 1 << 1); // SIE
        hart.csrs_mut().write(STVEC, 0x4000);
        hart.registers.set_pc(0x2000);

        hart.raise_exception(Exception::EnvironmentCallFromUMode, 0);
        assert_eq!(0x4000, hart.registers.pc());
        assert_eq!(Mode::Supervisor, hart.mode());
        assert_eq!(8, hart.csrs().read(SCAUSE));
        assert_eq!(0x2000, hart.csrs().read(SEPC));
        let mstatus = Status(hart.csrs().read(MSTATUS));
        assert!(mstatus.spie());
        assert!(!mstatus.sie());
        assert_eq!(PrivilegeLevel::User, mstatus.spp());
    }

    #[test]
    fn vectored_interrupt_handler() {
        let mut hart = hart(Capabilities::base());
        hart.csrs_mut().write(MTVEC, 0x8000_0001);
        let handler = hart.raise_trap(Interrupt::MachineTimerInterrupt.into(), 0x10, 0);
        assert_eq!(0x8000_001C, handler);
        assert_eq!(0x8000_0000_0000_0007, hart.csrs().read(MCAUSE));
    }

    #[test]
    fn interrupt_delegated_to_virtual_supervisor() {
        let caps = Capabilities {
            hypervisor: true,
            ..Capabilities::default()
        };
        let mut hart = hart(caps);
        hart.set_mode(Mode::VirtualUser);
        // VS-level interrupts never leave M-mode with the hypervisor extension.
        hart.csrs_mut().write(MIDELEG, 1 << 5);
        hart.csrs_mut().write(HIDELEG, 1 << 5);
        hart.csrs_mut().write(VSTVEC, 0x9001);
        let handler = hart.raise_trap(Interrupt::SupervisorTimerInterrupt.into(), 0x30, 0);
        assert_eq!(Mode::VirtualSupervisor, hart.mode());
        assert_eq!(0x8000_0000_0000_0005, hart.csrs().read(VSCAUSE));
        assert_eq!(0x9000 + 4 * 5, handler);
        assert_eq!(PrivilegeLevel::User, Status(hart.csrs().read(VSSTATUS)).spp());
    }

    #[test]
    fn virtual_supervisor_interrupts_stay_in_machine_mode() {
        let caps = Capabilities {
            hypervisor: true,
            ..Capabilities::default()
        };
        let mut hart = hart(caps);
        hart.set_mode(Mode::VirtualUser);
        hart.csrs_mut().write(MIDELEG, !0);
        hart.csrs_mut().write(HIDELEG, !0);
        hart.raise_trap(Interrupt::VirtualSupervisorTimerInterrupt.into(), 0x30, 0);
        assert_eq!(Mode::Machine, hart.mode());
        assert_eq!(0x8000_0000_0000_0006, hart.csrs().read(MCAUSE));
        assert_eq!(0, hart.csrs().read(VSCAUSE));
    }

    #[test]
    fn hypervisor_trap_records_previous_virtualization() {
        let caps = Capabilities {
            hypervisor: true,
            ..Capabilities::default()
        };
        let mut hart = hart(caps);
        hart.set_mode(Mode::VirtualSupervisor);
        hart.csrs_mut().write(MEDELEG, 1 << 22);
        hart.raise_exception(Exception::VirtualInstruction, 0);
        assert_eq!(Mode::Supervisor, hart.mode());
        let hstatus = HStatus(hart.csrs().read(HSTATUS));
        assert!(hstatus.spv());
        assert!(hstatus.spvp());

        hart.raise_exception(Exception::Breakpoint, 0);
        assert_eq!(Mode::Machine, hart.mode());
        assert!(!Status(hart.csrs().read(MSTATUS)).mpv());
    }

    #[test]
    fn trap_entry_invalidates_translation() {
        let mut hart = hart(Capabilities::base());
        hart.translation();
        assert!(hart.mmu().is_valid());
        hart.raise_trap(Exception::Breakpoint.into(), 0, 0);
        assert!(!hart.mmu().is_valid());
    }

    #[test]
    fn branch_log_keeps_most_recent_records() {
        let mut hart = Hart::new(&Config {
            br_log_capacity: 3,
            ..Config::default()
        });
        for pc in 0..5 {
            hart.record_branch(BranchRecord {
                pc,
                target: pc + 0x100,
                taken: pc % 2 == 0,
            });
        }
        let pcs: Vec<Word> = hart.branch_log().iter().map(|record| record.pc).collect();
        assert_eq!(vec![2, 3, 4], pcs);
        assert_eq!(3, hart.clone().branch_log().len());

        let mut disabled = Hart::new(&Config {
            br_log_capacity: 0,
            ..Config::default()
        });
        disabled.record_branch(BranchRecord {
            pc: 0,
            target: 0,
            taken: false,
        });
        assert!(disabled.branch_log().is_empty());
    }

    #[test]
    fn mem_event_is_cleared_by_take() {
        let mut hart = hart(Capabilities::base());
        hart.registers.set_pc(0x80);
        hart.record_mem_access(0x1000, true);
        let event = hart.take_mem_event();
        assert_eq!(
            MemEvent {
                pc: 0x80,
                mem_access: true,
                is_load: true,
                vaddr: 0x1000
            },
            event
        );
        assert_eq!(MemEvent::default(), hart.take_mem_event());
    }
}
