//! Word layouts of the buffers exchanged with the DUT harness.
//!
//! Every buffer is a slice of host machine words. The register block looks like this:
//!
//! | words              | content                                                 |
//! |--------------------|---------------------------------------------------------|
//! | `0..32`            | `x0..x31`                                               |
//! | `32..64`           | `f0..f31`                                               |
//! | `64`               | `pc`                                                    |
//! | `65..65 + n`       | the `n` mirrored CSRs enabled by the capability set     |
//! | `65 + n`           | privilege level of the current mode                     |
//! | `66 + n`           | virtualization flag, only with the hypervisor extension |

use super::SyncError;
use crate::csr::mirror;
use crate::hart::{ExecutionGuide, MemEvent};
use crate::registers;
use crate::{Capabilities, Hart, Mode, PrivilegeLevel, Word};

pub const GPR_OFFSET: usize = 0;
pub const FPR_OFFSET: usize = GPR_OFFSET + registers::LEN as usize;
pub const PC_OFFSET: usize = FPR_OFFSET + registers::LEN as usize;
pub const MIRROR_OFFSET: usize = PC_OFFSET + 1;

/// Length of the `[lrsc_valid, lrsc_addr]` sync-state block.
pub const SYNC_STATE_LEN: usize = 2;
/// Length of the execution guide block.
pub const GUIDE_LEN: usize = 6;
/// Length of the memory-event query block.
pub const MEM_EVENT_LEN: usize = 4;

const_assert_eq!(MIRROR_OFFSET, 65);

/// Returns the number of words in the register block under `capabilities`.
pub fn register_block_len(capabilities: &Capabilities) -> usize {
    MIRROR_OFFSET + mirror::enabled_count(capabilities) + 1 + usize::from(capabilities.hypervisor)
}

pub(super) fn check_len(actual: usize, expected: usize) -> Result<(), SyncError> {
    if actual == expected {
        Ok(())
    } else {
        Err(SyncError::BufferLength { expected, actual })
    }
}

/// Writes the register block of `hart` into `buf`. The mirror is used as is, so it should have
/// been pulled first.
///
/// Panics if `buf` is not exactly [`register_block_len`] words long.
pub fn encode_registers(hart: &Hart, buf: &mut [Word]) {
    let capabilities = hart.capabilities();
    assert_eq!(register_block_len(capabilities), buf.len());

    hart.registers.store_x(&mut buf[GPR_OFFSET..FPR_OFFSET]);
    hart.registers.store_f(&mut buf[FPR_OFFSET..PC_OFFSET]);
    buf[PC_OFFSET] = hart.registers.pc();

    let mut index = MIRROR_OFFSET;
    for register in mirror::enabled(capabilities) {
        buf[index] = register.get(&hart.mirror);
        index += 1;
    }

    let mode = hart.mode();
    buf[index] = mode.privilege_level() as Word;
    if capabilities.hypervisor {
        buf[index + 1] = Word::from(mode.is_virtualized());
    }
}

/// Loads the register block in `buf` into `hart`. Only the mirror is updated, pushing it into the
/// CSR file is left to the caller.
///
/// A mode word holding the reserved privilege level leaves the mode unchanged. Only the low two
/// bits of the mode word are significant.
///
/// Panics if `buf` is not exactly [`register_block_len`] words long.
pub fn decode_registers(hart: &mut Hart, buf: &[Word]) {
    let capabilities = *hart.capabilities();
    assert_eq!(register_block_len(&capabilities), buf.len());

    hart.registers.load_x(&buf[GPR_OFFSET..FPR_OFFSET]);
    hart.registers.load_f(&buf[FPR_OFFSET..PC_OFFSET]);
    hart.registers.set_pc(buf[PC_OFFSET]);

    let mut index = MIRROR_OFFSET;
    for register in mirror::enabled(&capabilities) {
        register.set(&mut hart.mirror, buf[index]);
        index += 1;
    }

    let virtualized = capabilities.hypervisor && buf[index + 1] != 0;
    if let Some(level) = PrivilegeLevel::from_u2((buf[index] & 0b11) as u8) {
        hart.set_mode(Mode::new(level, virtualized));
    }
}

/// Panics if `buf` is not exactly [`SYNC_STATE_LEN`] words long.
pub fn encode_sync_state(hart: &Hart, buf: &mut [Word]) {
    buf.copy_from_slice(&[Word::from(hart.lr_valid()), hart.lr_addr()]);
}

pub fn decode_guide(buf: &[Word]) -> Result<ExecutionGuide, SyncError> {
    check_len(buf.len(), GUIDE_LEN)?;
    Ok(ExecutionGuide {
        force_raise_exception: buf[0] != 0,
        exception_num: buf[1],
        mtval: buf[2],
        stval: buf[3],
        force_set_jump_target: buf[4] != 0,
        jump_target: buf[5],
    })
}

pub fn encode_mem_event(event: &MemEvent, buf: &mut [Word]) -> Result<(), SyncError> {
    check_len(buf.len(), MEM_EVENT_LEN)?;
    buf[0] = event.pc;
    buf[1] = Word::from(event.mem_access);
    buf[2] = Word::from(event.is_load);
    buf[3] = event.vaddr;
    Ok(())
}
