//! Synchronization protocol between the DUT harness and the reference model.
//!
//! The harness steps the model in lockstep with the DUT, compares architectural state after every
//! retirement, and copies state into the model whenever the DUT legitimately diverges from it
//! (interrupts, non-deterministic micro-architectural events, ...). [`RefModel`] is the entry point
//! for all of that.
//!
//! With [`Capabilities::speculative_checkpoints`], every synchronizing operation accepts a
//! retirement count to roll back to first. The model then checkpoints, runs ahead of the DUT, and
//! checkpoints again, see [`speculation`].

pub mod dump;
pub mod layout;
pub mod query;
pub mod speculation;

use std::path::PathBuf;

use log::trace;
use space_time::SnapshotLog;
use thiserror::Error;

use crate::csr::CSR_COUNT;
use crate::hart::trap::TrapCause;
use crate::hart::BranchRecord;
use crate::{Capabilities, Config, Hart, Word};
use query::QueryKind;
use speculation::{CheckpointStore, Speculation};

pub use speculation::check_memory_mirror;

/// Direction of a copy between the DUT and the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Overwrite model state with the buffer.
    ToRef,
    /// Fill the buffer from model state.
    FromRef,
}

/// Instruction execution, as far as the protocol is concerned.
///
/// Implementations must call [`Hart::retire`] once per retired instruction, and must honor
/// [`Hart::guide`] while one is set. Replaying after a rollback relies on execution being
/// deterministic: the same start state and count must always produce the same end state.
pub trait Executor {
    /// Executes until `count` more instructions have retired.
    fn execute(&mut self, hart: &mut Hart, count: u64);
}

/// Errors the harness can cause by calling into the model incorrectly. Every request is validated
/// before the model is touched, so the model state is left untouched when one is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    #[error("buffer holds {actual} words, but {expected} are needed")]
    BufferLength { expected: usize, actual: usize },
    #[error("raw trap cause {0:#x} does not name a known exception or interrupt")]
    UnknownCause(Word),
    #[error("{0} is not enabled in this model")]
    Disabled(&'static str),
}

/// A reference model: one hart, the executor driving it, and the optional speculation state.
#[derive(Debug)]
pub struct RefModel<E, S = SnapshotLog<Hart>> {
    hart: Hart,
    executor: E,
    speculation: Option<Speculation<S>>,
    reg_dump_path: Option<PathBuf>,
}

impl<E: Executor> RefModel<E> {
    /// Creates a model in its reset state. Checkpoints, if enabled, are kept in memory.
    pub fn new(config: &Config, executor: E) -> Self {
        Self::with_store(config, executor, SnapshotLog::new())
    }
}

impl<E: Executor, S: CheckpointStore> RefModel<E, S> {
    /// Creates a model in its reset state, keeping checkpoints in `store`. The store is dropped if
    /// speculative checkpoints are not enabled.
    pub fn with_store(config: &Config, executor: E, store: S) -> Self {
        let hart = Hart::new(config);
        let speculation = config
            .capabilities
            .speculative_checkpoints
            .then(|| Speculation::new(store, &hart, config.ahead_length));
        Self {
            hart,
            executor,
            speculation,
            reg_dump_path: config.reg_dump_path.clone(),
        }
    }

    pub fn hart(&self) -> &Hart {
        &self.hart
    }

    pub fn hart_mut(&mut self) -> &mut Hart {
        &mut self.hart
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.hart.capabilities()
    }

    pub fn speculation(&self) -> Option<&Speculation<S>> {
        self.speculation.as_ref()
    }

    /// Executes `count` instructions.
    pub fn execute(&mut self, count: u64) {
        trace!("Executing {count} instructions");
        self.executor.execute(&mut self.hart, count);
    }

    /// Copies the register block between `buf` and the model.
    ///
    /// Copying to the model writes the mirror back into the CSR file and drops the derived address
    /// translation state. In speculative mode the copy itself counts as one retirement.
    pub fn regcpy(
        &mut self,
        buf: &mut [Word],
        direction: Direction,
        restore: Option<u64>,
    ) -> Result<(), SyncError> {
        trace!("Register copy {direction:?}");
        layout::check_len(buf.len(), layout::register_block_len(self.capabilities()))?;
        self.synchronized(restore, 1, |hart, _, speculative| {
            match direction {
                Direction::ToRef => {
                    layout::decode_registers(hart, buf);
                    hart.push_mirror();
                }
                Direction::FromRef => {
                    hart.pull_mirror();
                    layout::encode_registers(hart, buf);
                }
            }
            if speculative {
                hart.retire();
            }
        });
        Ok(())
    }

    /// Copies the whole CSR file between `buf` and the model.
    pub fn csrcpy(
        &mut self,
        buf: &mut [Word],
        direction: Direction,
        restore: Option<u64>,
    ) -> Result<(), SyncError> {
        trace!("CSR file copy {direction:?}");
        layout::check_len(buf.len(), CSR_COUNT)?;
        self.synchronized(restore, 0, |hart, _, _| match direction {
            Direction::ToRef => hart.csrs_mut().load(buf),
            Direction::FromRef => hart.csrs().store(buf),
        });
        Ok(())
    }

    /// Copies the `[lrsc_valid, lrsc_addr]` sync state.
    ///
    /// Towards the model, a non-zero first word means the DUT saw its store-conditional fail, which
    /// invalidates the reservation. A reservation is never established this way.
    pub fn uarch_status_cpy(
        &mut self,
        buf: &mut [Word],
        direction: Direction,
        restore: Option<u64>,
    ) -> Result<(), SyncError> {
        trace!("Sync state copy {direction:?}");
        layout::check_len(buf.len(), layout::SYNC_STATE_LEN)?;
        self.synchronized(restore, 0, |hart, _, _| match direction {
            Direction::ToRef => {
                if buf[0] != 0 {
                    hart.clear_reservation();
                }
            }
            Direction::FromRef => layout::encode_sync_state(hart, buf),
        });
        Ok(())
    }

    /// Takes the trap with raw cause `cause` at the current `pc`, and continues at its handler.
    pub fn raise_intr(&mut self, cause: Word, restore: Option<u64>) -> Result<(), SyncError> {
        let cause = TrapCause::from_raw(cause).ok_or(SyncError::UnknownCause(cause))?;
        trace!("Raising {cause} on request of the DUT");
        self.synchronized(restore, 0, |hart, _, _| {
            let epc = hart.registers.pc();
            let handler = hart.raise_trap(cause, epc, 0);
            hart.registers.set_pc(handler);
        });
        Ok(())
    }

    /// Executes exactly one instruction under the directive in `buf`, see
    /// [`crate::hart::ExecutionGuide`].
    pub fn guided_exec(&mut self, buf: &[Word], restore: Option<u64>) -> Result<(), SyncError> {
        if !self.capabilities().guided_exec {
            return Err(SyncError::Disabled("guided execution"));
        }
        let guide = layout::decode_guide(buf)?;
        trace!("Guided execution: {guide:?}");
        self.synchronized(restore, 1, |hart, executor, _| {
            hart.begin_guided(guide);
            executor.execute(hart, 1);
            hart.end_guided();
        });
        Ok(())
    }

    /// Returns the most recent branches, oldest first, see [`Config::br_log_capacity`].
    pub fn query_br_log(&mut self) -> Result<&[BranchRecord], SyncError> {
        if !self.capabilities().br_log {
            return Err(SyncError::Disabled("branch log"));
        }
        Ok(self.hart.branch_log())
    }

    /// Answers reference query `kind` into `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not a known query type.
    pub fn query_ref(&mut self, kind: Word, buf: &mut [Word]) -> Result<(), SyncError> {
        if !self.capabilities().query_ref {
            return Err(SyncError::Disabled("reference query"));
        }
        let Some(kind) = QueryKind::from_raw(kind) else {
            panic!("invalid reference query type {kind:#x}");
        };
        query::answer(&mut self.hart, kind, buf)
    }

    pub fn set_mhartid(&mut self, id: Word) -> Result<(), SyncError> {
        if !self.capabilities().multicore {
            return Err(SyncError::Disabled("multicore synchronization"));
        }
        self.hart.set_mhartid(id);
        Ok(())
    }

    /// Writes a register dump to the configured dump file, see [`dump::write_dump`].
    pub fn dump_regs(&self) {
        dump::dump_to(&self.hart, self.reg_dump_path.as_deref());
    }

    /// Runs `op`, surrounded by a rollback to `restore` and a new speculative window when the
    /// model speculates. `advance` is the number of retirements `op` itself accounts for. The flag
    /// passed to `op` tells whether it runs inside such a sequence.
    ///
    /// `op` cannot fail: requests are validated before calling this, so a rollback is always
    /// followed by a new speculative window.
    fn synchronized<F>(&mut self, restore: Option<u64>, advance: u64, op: F)
    where
        F: FnOnce(&mut Hart, &mut E, bool),
    {
        let hart = &mut self.hart;
        let executor = &mut self.executor;
        let (Some(speculation), Some(restore_count)) = (self.speculation.as_mut(), restore) else {
            op(hart, executor, false);
            return;
        };
        speculation.roll_back(hart, executor, restore_count);
        op(hart, executor, true);
        speculation.run_ahead(hart, executor, restore_count, advance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::mirror;
    use crate::csr::specifier::*;
    use crate::hart::trap::{Exception, Interrupt};
    use crate::registers::{Registers, Specifier};
    use crate::Mode;
    use space_time::SnapshotKind;

    /// Retires one instruction per step: `x1` is incremented and `pc` moves to the next word, which
    /// is also logged as a branch that is not taken.
    #[derive(Debug, Default)]
    struct CountingExecutor;

    impl Executor for CountingExecutor {
        fn execute(&mut self, hart: &mut Hart, count: u64) {
            let x1 = Specifier::from_u5(1);
            for _ in 0..count {
                let guide = hart.guide().copied();
                match guide {
                    Some(guide) if guide.force_raise_exception => {
                        let exception = Exception::from_code(guide.exception_num).unwrap();
                        hart.raise_exception(exception, guide.mtval);
                    }
                    _ => {
                        let pc = hart.registers.pc();
                        hart.registers.set_x(x1, hart.registers.x(x1) + 1);
                        hart.registers.set_pc(pc + 4);
                        hart.record_branch(BranchRecord {
                            pc,
                            target: pc + 4,
                            taken: false,
                        });
                    }
                }
                if let Some(guide) = guide.filter(|guide| guide.force_set_jump_target) {
                    hart.registers.set_pc(guide.jump_target);
                }
                hart.retire();
            }
        }
    }

    fn model(capabilities: Capabilities) -> RefModel<CountingExecutor> {
        RefModel::new(&Config::with_capabilities(capabilities), CountingExecutor)
    }

    fn speculative(ahead_length: u64) -> RefModel<CountingExecutor> {
        let config = Config {
            ahead_length,
            ..Config::with_capabilities(Capabilities {
                speculative_checkpoints: true,
                ..Capabilities::default()
            })
        };
        RefModel::new(&config, CountingExecutor)
    }

    fn x1(model: &RefModel<CountingExecutor>) -> Word {
        model.hart().registers.x(Specifier::from_u5(1))
    }

    #[test]
    fn register_block_round_trip() {
        let mut model = model(Capabilities::base());
        let len = layout::register_block_len(model.capabilities());
        let mut buf: Vec<Word> = (0..len as Word).map(|i| i * 0x11).collect();
        let mstatus_index = layout::MIRROR_OFFSET;
        let sstatus_index = layout::MIRROR_OFFSET + 3;
        buf[mstatus_index] = 0x0000_000A_0000_1822;
        buf[len - 1] = 1;
        let sent = buf.clone();

        model.regcpy(&mut buf, Direction::ToRef, None).unwrap();
        assert_eq!(Mode::Supervisor, model.hart().mode());
        assert_eq!(0x0000_000A_0000_1822, model.hart().csrs().read(MSTATUS));

        let mut received = vec![0; len];
        model.regcpy(&mut received, Direction::FromRef, None).unwrap();
        for i in 0..len {
            match i {
                0 => assert_eq!(0, received[i]),
                _ if i == sstatus_index => {
                    assert_eq!(sent[mstatus_index] & SSTATUS_MASK, received[i])
                }
                _ => assert_eq!(sent[i], received[i], "word {i}"),
            }
        }
    }

    #[test]
    fn register_block_restores_full_state() {
        let everything = Capabilities {
            hypervisor: true,
            user_interrupts: true,
            vector: true,
            dasics: true,
            mpk: true,
            ..Capabilities::default()
        };
        let mut model = model(everything);
        let hart = model.hart_mut();
        for specifier in 0..CSR_COUNT as CsrSpecifier {
            let value = Word::from(specifier).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            hart.csrs_mut().write(specifier, value);
        }
        for i in 1..32 {
            hart.registers.set_x(Specifier::from_u5(i), Word::from(i) * 3);
            hart.registers.set_f(Specifier::from_u5(i), Word::from(i) << 40);
        }
        hart.registers.set_pc(0x8000_1234);
        hart.set_mode(Mode::VirtualSupervisor);
        let csrs = model.hart().csrs().clone();
        let registers = model.hart().registers.clone();

        let mut buf = vec![0; layout::register_block_len(model.capabilities())];
        model.regcpy(&mut buf, Direction::FromRef, None).unwrap();

        let hart = model.hart_mut();
        for register in mirror::enabled(&everything).filter(|r| !r.is_shadow()) {
            hart.csrs_mut().write(register.specifier, 0);
        }
        hart.registers = Registers::new(0);
        hart.set_mode(Mode::Machine);

        model.regcpy(&mut buf, Direction::ToRef, None).unwrap();
        assert_eq!(&csrs, model.hart().csrs());
        assert_eq!(registers, model.hart().registers);
        assert_eq!(Mode::VirtualSupervisor, model.hart().mode());
    }

    #[test]
    fn register_copy_to_model_drops_translation() {
        let mut model = model(Capabilities::base());
        model.hart_mut().translation();
        assert!(model.hart().mmu().is_valid());
        let mut buf = vec![0; layout::register_block_len(model.capabilities())];
        model.regcpy(&mut buf, Direction::FromRef, None).unwrap();
        assert!(model.hart().mmu().is_valid());
        model.regcpy(&mut buf, Direction::ToRef, None).unwrap();
        assert!(!model.hart().mmu().is_valid());
    }

    #[test]
    fn csr_file_copy() {
        let mut model = model(Capabilities::base());
        let mut buf = vec![0; CSR_COUNT];
        buf[MSCRATCH as usize] = 0x1234;
        model.csrcpy(&mut buf, Direction::ToRef, None).unwrap();
        assert_eq!(0x1234, model.hart().csrs().read(MSCRATCH));

        let mut out = vec![0; CSR_COUNT];
        model.csrcpy(&mut out, Direction::FromRef, None).unwrap();
        assert_eq!(buf, out);
        assert_eq!(
            Err(SyncError::BufferLength {
                expected: CSR_COUNT,
                actual: 3
            }),
            model.csrcpy(&mut [0; 3], Direction::FromRef, None)
        );
    }

    #[test]
    fn sync_state_only_clears_reservation() {
        let mut model = model(Capabilities::base());
        model
            .uarch_status_cpy(&mut [1, 0x80], Direction::ToRef, None)
            .unwrap();
        assert!(!model.hart().lr_valid());

        model.hart_mut().set_reservation(0x1000);
        model
            .uarch_status_cpy(&mut [0, 0], Direction::ToRef, None)
            .unwrap();
        assert!(model.hart().lr_valid());

        let mut out = [0; 2];
        model
            .uarch_status_cpy(&mut out, Direction::FromRef, None)
            .unwrap();
        assert_eq!([1, 0x1000], out);

        model
            .uarch_status_cpy(&mut [7, 0], Direction::ToRef, None)
            .unwrap();
        model
            .uarch_status_cpy(&mut out, Direction::FromRef, None)
            .unwrap();
        assert_eq!([0, 0x1000], out);
    }

    #[test]
    fn raise_intr_enters_handler() {
        let mut model = model(Capabilities::base());
        model.hart_mut().csrs_mut().write(MTVEC, 0x100);
        let raw = TrapCause::from(Interrupt::MachineExternalInterrupt).raw();
        model.raise_intr(raw, None).unwrap();
        assert_eq!(0x100, model.hart().registers.pc());
        assert_eq!(raw, model.hart().csrs().read(MCAUSE));
        assert_eq!(0x8000_0000, model.hart().csrs().read(MEPC));

        assert_eq!(Err(SyncError::UnknownCause(63)), model.raise_intr(63, None));
    }

    #[test]
    fn guided_exec_forces_exception() {
        let mut model = model(Capabilities {
            guided_exec: true,
            ..Capabilities::default()
        });
        model.hart_mut().csrs_mut().write(MTVEC, 0x200);
        let guide = [1, Exception::LoadPageFault.code(), 0xBAD, 0, 0, 0];
        model.guided_exec(&guide, None).unwrap();
        assert_eq!(1, model.hart().retired());
        assert_eq!(0x200, model.hart().registers.pc());
        assert_eq!(0xBAD, model.hart().csrs().read(MTVAL));
        assert_eq!(None, model.hart().guide());
        assert_eq!(0, x1(&model));

        model.guided_exec(&[0, 0, 0, 0, 1, 0x3000], None).unwrap();
        assert_eq!(0x3000, model.hart().registers.pc());
        assert_eq!(1, x1(&model));
    }

    #[test]
    fn disabled_features_are_refused() {
        let mut model = model(Capabilities::base());
        assert_eq!(
            Err(SyncError::Disabled("guided execution")),
            model.guided_exec(&[0; 6], None)
        );
        assert!(model.query_br_log().is_err());
        assert!(model.query_ref(QueryKind::MEM_EVENT, &mut [0; 4]).is_err());
        assert!(model.set_mhartid(1).is_err());
        assert_eq!(0, model.hart().retired());
    }

    #[test]
    fn mem_event_is_reported_once() {
        let mut model = model(Capabilities {
            query_ref: true,
            ..Capabilities::default()
        });
        model.hart_mut().registers.set_pc(0x8000_0040);
        model.hart_mut().record_mem_access(0x9000, true);
        let mut buf = [0; 4];
        model.query_ref(QueryKind::MEM_EVENT, &mut buf).unwrap();
        assert_eq!([0x8000_0040, 1, 1, 0x9000], buf);
        model.query_ref(QueryKind::MEM_EVENT, &mut buf).unwrap();
        assert_eq!([0, 0, 0, 0], buf);
    }

    #[test]
    #[should_panic(expected = "invalid reference query type")]
    fn unknown_query_panics() {
        let mut model = model(Capabilities {
            query_ref: true,
            ..Capabilities::default()
        });
        model.query_ref(9, &mut [0; 4]).unwrap();
    }

    #[test]
    fn branch_log_and_hart_id() {
        let mut model = model(Capabilities {
            br_log: true,
            multicore: true,
            ..Capabilities::default()
        });
        let record = BranchRecord {
            pc: 0x10,
            target: 0x40,
            taken: true,
        };
        model.hart_mut().record_branch(record);
        assert_eq!(&[record], model.query_br_log().unwrap());
        model.set_mhartid(3).unwrap();
        assert_eq!(3, model.hart().csrs().read(MHARTID));
    }

    #[test]
    fn non_speculative_model_ignores_restore() {
        let mut model = model(Capabilities::base());
        model.execute(4);
        let mut buf = vec![0; layout::register_block_len(model.capabilities())];
        model.regcpy(&mut buf, Direction::FromRef, Some(1)).unwrap();
        assert_eq!(4, model.hart().retired());
        assert!(model.speculation().is_none());
    }

    #[test]
    fn speculative_sequencing() {
        let mut model = speculative(5);
        let watermarks = |model: &RefModel<CountingExecutor>| {
            let w = model.speculation().unwrap().watermarks();
            (w.stable_log_begin, w.spec_log_begin)
        };

        // The register copy counts as a retirement of its own.
        let mut buf = vec![0; layout::register_block_len(model.capabilities())];
        model.regcpy(&mut buf, Direction::FromRef, Some(0)).unwrap();
        assert_eq!(0x8000_0000, buf[layout::PC_OFFSET]);
        assert_eq!((1, 6), watermarks(&model));
        assert_eq!(6, model.hart().retired());
        assert_eq!(5, x1(&model));

        // Rolling back before the speculative window replays from the stable checkpoint.
        model
            .uarch_status_cpy(&mut [0; 2], Direction::FromRef, Some(3))
            .unwrap();
        assert_eq!((3, 8), watermarks(&model));
        assert_eq!(8, model.hart().retired());
        assert_eq!(7, x1(&model));
        assert_eq!(2, model.speculation().unwrap().store().len());

        // Rolling back into the speculative window restores from the speculative checkpoint.
        let raw = TrapCause::from(Interrupt::MachineTimerInterrupt).raw();
        model.raise_intr(raw, Some(9)).unwrap();
        assert_eq!(0x8000_0020, model.hart().csrs().read(MEPC));
        assert_eq!(raw, model.hart().csrs().read(MCAUSE));
        assert_eq!((9, 14), watermarks(&model));
        assert_eq!(14, model.hart().retired());
    }

    #[test]
    fn speculative_guided_exec_advances_one() {
        let mut config = Config::with_capabilities(Capabilities {
            speculative_checkpoints: true,
            guided_exec: true,
            ..Capabilities::default()
        });
        config.ahead_length = 3;
        let mut model = RefModel::new(&config, CountingExecutor);
        model.guided_exec(&[0; 6], Some(0)).unwrap();
        let w = model.speculation().unwrap().watermarks();
        assert_eq!(1, w.stable_log_begin);
        assert_eq!(4, w.spec_log_begin);
        assert_eq!(4, model.hart().retired());
        assert_eq!(4, x1(&model));
    }

    #[test]
    fn replay_is_deterministic() {
        let mut model = speculative(10);
        model
            .uarch_status_cpy(&mut [0; 2], Direction::FromRef, Some(0))
            .unwrap();
        model.execute(17);
        let straight = model.hart().registers.clone();

        let mut model = speculative(10);
        for restore in [0, 4, 17] {
            model
                .uarch_status_cpy(&mut [0; 2], Direction::FromRef, Some(restore))
                .unwrap();
        }
        assert_eq!(27, model.hart().retired());
        assert_eq!(straight, model.hart().registers);
    }

    #[test]
    fn branch_log_stays_bounded_across_checkpoints() {
        let config = Config {
            ahead_length: 50,
            br_log_capacity: 8,
            ..Config::with_capabilities(Capabilities {
                speculative_checkpoints: true,
                br_log: true,
                ..Capabilities::default()
            })
        };
        let mut model = RefModel::new(&config, CountingExecutor);
        for restore in (0..20).map(|i| i * 10) {
            model
                .uarch_status_cpy(&mut [0; 2], Direction::FromRef, Some(restore))
                .unwrap();
        }
        assert_eq!(240, model.hart().retired());

        let log = model.query_br_log().unwrap();
        assert_eq!(8, log.len());
        assert_eq!(0x8000_0000 + 4 * 239, log[7].pc);
        for checkpoint in model.speculation().unwrap().store().iter() {
            assert!(checkpoint.state.clone().branch_log().len() <= 8);
        }
    }

    /// Keeps checkpoints in a [`SnapshotLog`] and remembers every promotion.
    #[derive(Debug, Default)]
    struct PromotionLog {
        log: SnapshotLog<Hart>,
        promoted: Vec<u64>,
    }

    impl CheckpointStore for PromotionLog {
        type Error = space_time::errors::NoCheckpointError;

        fn roll_back(&mut self, hart: &mut Hart, retired: u64) -> Result<u64, Self::Error> {
            self.log.roll_back(hart, retired)
        }

        fn record(&mut self, hart: &Hart, kind: SnapshotKind) {
            self.log.record(hart, kind);
        }

        fn promote(&mut self, retired: u64) {
            self.promoted.push(retired);
            self.log.promote(retired);
        }

        fn release_before(&mut self, retired: u64) {
            self.log.release_before(retired);
        }
    }

    #[test]
    fn rollback_into_window_promotes_checkpoint() {
        let config = Config {
            ahead_length: 5,
            ..Config::with_capabilities(Capabilities {
                speculative_checkpoints: true,
                ..Capabilities::default()
            })
        };
        let mut model = RefModel::with_store(&config, CountingExecutor, PromotionLog::default());
        let sync = |model: &mut RefModel<CountingExecutor, PromotionLog>, restore| {
            model
                .uarch_status_cpy(&mut [0; 2], Direction::FromRef, Some(restore))
                .unwrap();
        };

        sync(&mut model, 0);
        sync(&mut model, 3);
        assert!(model.speculation().unwrap().store().promoted.is_empty());

        sync(&mut model, 10);
        assert_eq!(vec![8], model.speculation().unwrap().store().promoted);
        let kinds: Vec<(u64, SnapshotKind)> = model
            .speculation()
            .unwrap()
            .store()
            .log
            .iter()
            .map(|c| (c.retired, c.kind))
            .collect();
        assert_eq!(
            vec![(10, SnapshotKind::Stable), (15, SnapshotKind::Speculative)],
            kinds
        );
    }

    #[test]
    fn invalid_request_leaves_speculation_alone() {
        let mut model = speculative(5);
        model
            .uarch_status_cpy(&mut [0; 2], Direction::FromRef, Some(0))
            .unwrap();
        let before = model.speculation().unwrap().watermarks();

        let mut short = vec![0; 3];
        assert!(model
            .regcpy(&mut short, Direction::ToRef, Some(2))
            .is_err());
        assert!(model
            .uarch_status_cpy(&mut [0; 3], Direction::ToRef, Some(2))
            .is_err());
        assert_eq!(5, model.hart().retired());
        assert_eq!(5, x1(&model));
        assert_eq!(before, model.speculation().unwrap().watermarks());
        assert_eq!(2, model.speculation().unwrap().store().len());
    }

    #[test]
    #[should_panic(expected = "failed to roll back")]
    fn rollback_without_checkpoint_panics() {
        let mut model = speculative(5);
        model
            .uarch_status_cpy(&mut [0; 2], Direction::FromRef, Some(4))
            .unwrap();
        model
            .uarch_status_cpy(&mut [0; 2], Direction::FromRef, Some(1))
            .unwrap();
    }
}
