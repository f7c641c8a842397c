//! Specifiers of the CSRs the model knows by name, and the bit masks tied to them.
//!
//! Any other 12-bit specifier is still backed by storage in [`super::CsrFile`], it just has no
//! name here.

/// General 12-bit value representing a CSR specifier. Note that this can hold any 12-bit value,
/// even if the value represents a CSR the model gives no meaning to.
pub type CsrSpecifier = u16;

//
// User trap setup and handling (`0x000..=0x005`, `0x040..=0x04B`), N extension.
//
/// User status register, a restricted view of [`MSTATUS`].
pub const USTATUS: CsrSpecifier = 0x000;
/// User trap handler base address.
pub const UTVEC: CsrSpecifier = 0x005;
/// Scratch register for user trap handlers.
pub const USCRATCH: CsrSpecifier = 0x040;
/// User exception program counter.
pub const UEPC: CsrSpecifier = 0x041;
/// User trap cause.
pub const UCAUSE: CsrSpecifier = 0x042;
/// User bad address or instruction.
pub const UTVAL: CsrSpecifier = 0x043;
/// User protection key rights.
pub const UPKRU: CsrSpecifier = 0x048;
/// User timer compare value.
pub const UTIMER: CsrSpecifier = 0x04B;

//
// Vector extension control and status (`0x008..=0x00F`, `0xC20..=0xC22`).
//
/// Vector start position.
pub const VSTART: CsrSpecifier = 0x008;
/// Fixed-point accrued saturation flag.
pub const VXSAT: CsrSpecifier = 0x009;
/// Fixed-point rounding mode.
pub const VXRM: CsrSpecifier = 0x00A;
/// Vector control and status register.
pub const VCSR: CsrSpecifier = 0x00F;
/// Vector length.
pub const VL: CsrSpecifier = 0xC20;
/// Vector data type register.
pub const VTYPE: CsrSpecifier = 0xC21;
/// VLEN/8 (vector register length in bytes).
pub const VLENB: CsrSpecifier = 0xC22;

//
// Supervisor trap setup and handling (`0x100..=0x143`) and protection and translation (`0x180`).
//
/// Supervisor status register, a restricted view of [`MSTATUS`].
pub const SSTATUS: CsrSpecifier = 0x100;
/// Supervisor exception delegation register, N extension.
pub const SEDELEG: CsrSpecifier = 0x102;
/// Supervisor interrupt delegation register, N extension.
pub const SIDELEG: CsrSpecifier = 0x103;
/// Supervisor trap handler base address.
pub const STVEC: CsrSpecifier = 0x105;
/// Scratch register for supervisor trap handlers.
pub const SSCRATCH: CsrSpecifier = 0x140;
/// Supervisor exception program counter.
pub const SEPC: CsrSpecifier = 0x141;
/// Supervisor trap cause.
pub const SCAUSE: CsrSpecifier = 0x142;
/// Supervisor bad address or instruction.
pub const STVAL: CsrSpecifier = 0x143;
/// Supervisor address translation and protection.
pub const SATP: CsrSpecifier = 0x180;

//
// Virtual supervisor registers (`0x200..=0x280`), H extension.
//
/// Virtual supervisor status register.
pub const VSSTATUS: CsrSpecifier = 0x200;
/// Virtual supervisor trap handler base address.
pub const VSTVEC: CsrSpecifier = 0x205;
/// Virtual supervisor scratch register.
pub const VSSCRATCH: CsrSpecifier = 0x240;
/// Virtual supervisor exception program counter.
pub const VSEPC: CsrSpecifier = 0x241;
/// Virtual supervisor trap cause.
pub const VSCAUSE: CsrSpecifier = 0x242;
/// Virtual supervisor bad address or instruction.
pub const VSTVAL: CsrSpecifier = 0x243;
/// Virtual supervisor address translation and protection.
pub const VSATP: CsrSpecifier = 0x280;

//
// Machine trap setup and handling (`0x300..=0x34B`).
//
/// Machine status register.
pub const MSTATUS: CsrSpecifier = 0x300;
/// Machine exception delegation register.
pub const MEDELEG: CsrSpecifier = 0x302;
/// Machine interrupt delegation register.
pub const MIDELEG: CsrSpecifier = 0x303;
/// Machine interrupt-enable register.
pub const MIE: CsrSpecifier = 0x304;
/// Machine trap-handler base address.
pub const MTVEC: CsrSpecifier = 0x305;
/// Scratch register for machine trap handlers.
pub const MSCRATCH: CsrSpecifier = 0x340;
/// Machine exception program counter.
pub const MEPC: CsrSpecifier = 0x341;
/// Machine trap cause.
pub const MCAUSE: CsrSpecifier = 0x342;
/// Machine bad address or instruction.
pub const MTVAL: CsrSpecifier = 0x343;
/// Machine interrupt pending.
pub const MIP: CsrSpecifier = 0x344;
/// Machine trap instruction (transformed), H extension.
pub const MTINST: CsrSpecifier = 0x34A;
/// Machine bad guest physical address, H extension.
pub const MTVAL2: CsrSpecifier = 0x34B;

//
// Supervisor protection keys (`0x5C0..=0x5C1`), MPK.
//
/// Supervisor protection key rights.
pub const SPKRS: CsrSpecifier = 0x5C0;
/// Supervisor protection key control.
pub const SPKCTL: CsrSpecifier = 0x5C1;

//
// Hypervisor trap setup, handling and protection (`0x600..=0x680`), H extension.
//
/// Hypervisor status register.
pub const HSTATUS: CsrSpecifier = 0x600;
/// Hypervisor exception delegation register.
pub const HEDELEG: CsrSpecifier = 0x602;
/// Hypervisor interrupt delegation register.
pub const HIDELEG: CsrSpecifier = 0x603;
/// Hypervisor counter enable.
pub const HCOUNTEREN: CsrSpecifier = 0x606;
/// Hypervisor bad guest physical address.
pub const HTVAL: CsrSpecifier = 0x643;
/// Hypervisor trap instruction (transformed).
pub const HTINST: CsrSpecifier = 0x64A;
/// Hypervisor guest address translation and protection.
pub const HGATP: CsrSpecifier = 0x680;

//
// DASICS library bounds (`0x880..=0x8AF`).
//
/// Configuration of all 16 library memory bounds, 4 bits per bound.
pub const DLCFG0: CsrSpecifier = 0x880;
/// Lower address of library memory bound 0. Bound `i` uses `DLBOUND0 + 2 * i` for its lower and
/// `DLBOUND0 + 2 * i + 1` for its upper address.
pub const DLBOUND0: CsrSpecifier = 0x890;
/// Last library memory bound register (upper address of bound 15).
pub const DLBOUND31: CsrSpecifier = 0x8AF;

//
// DASICS control (`0x8B0..=0x8BD`).
//
/// Entry address of the trusted main-call gate.
pub const DMAINCALL: CsrSpecifier = 0x8B0;
/// Return address of the last trusted main call.
pub const DRETPC: CsrSpecifier = 0x8B1;
/// Return address recorded by the freezone.
pub const DRETPCFZ: CsrSpecifier = 0x8B2;
/// Reason of the last DASICS or protection-key fault.
pub const DFREASON: CsrSpecifier = 0x8B3;
/// Trust levels of all library memory bounds, 2 bits per bound.
pub const DLLEVEL: CsrSpecifier = 0x8B4;
/// Trust levels of all jump bounds, 2 bits per bound.
pub const DJLEVEL: CsrSpecifier = 0x8B5;
/// Configuration of the jump scratchpad slot.
pub const DSCRATCHCFG: CsrSpecifier = 0x8B6;
/// Lower address of the jump scratchpad slot.
pub const DSCRATCHBOUNDLO: CsrSpecifier = 0x8B7;
/// Upper address of the jump scratchpad slot.
pub const DSCRATCHBOUNDHI: CsrSpecifier = 0x8B8;
/// Trust level of the jump scratchpad slot.
pub const DSCRATCHLEVEL: CsrSpecifier = 0x8B9;
/// Return address for trust level 0. Level `l` uses `DRETPC0 + l`.
pub const DRETPC0: CsrSpecifier = 0x8BA;

//
// DASICS jump bounds (`0x8C0..=0x8C8`).
//
/// Lower address of jump bound 0. Bound `i` uses `DJBOUND0LO + 2 * i` for its lower and
/// `DJBOUND0LO + 2 * i + 1` for its upper address.
pub const DJBOUND0LO: CsrSpecifier = 0x8C0;
/// Upper address of the last jump bound.
pub const DJBOUND3HI: CsrSpecifier = 0x8C7;
/// Configuration of all 4 jump bounds, 16 bits per bound.
pub const DJCFG: CsrSpecifier = 0x8C8;

//
// DASICS user main bounds (`0x9E0..=0x9E3`).
//
/// User main configuration, a restricted view of [`DSMCFG`].
pub const DUMCFG: CsrSpecifier = 0x9E0;
/// Lower address of the user main bound.
pub const DUMBOUND0: CsrSpecifier = 0x9E2;
/// Upper address of the user main bound.
pub const DUMBOUND1: CsrSpecifier = 0x9E3;

//
// DASICS supervisor main bounds (`0xBC0..=0xBC3`).
//
/// Supervisor main configuration.
pub const DSMCFG: CsrSpecifier = 0xBC0;
/// Lower address of the supervisor main bound.
pub const DSMBOUND0: CsrSpecifier = 0xBC2;
/// Upper address of the supervisor main bound.
pub const DSMBOUND1: CsrSpecifier = 0xBC3;

//
// Machine information registers.
//
/// Hardware thread ID.
pub const MHARTID: CsrSpecifier = 0xF14;

const_assert_eq!(DLBOUND31 - DLBOUND0 + 1, 32);
const_assert_eq!(DJBOUND3HI - DJBOUND0LO + 1, 8);
const_assert_eq!(DSCRATCHBOUNDHI, DSCRATCHBOUNDLO + 1);

/// Mask applied to [`MSTATUS`] to obtain [`SSTATUS`].
pub const SSTATUS_MASK: u64 = 0x8000_0003_000D_E762;
/// Mask applied to [`MSTATUS`] to obtain [`USTATUS`] (UIE and UPIE).
pub const USTATUS_MASK: u64 = 0x11;
/// Mask applied to [`DSMCFG`] to obtain [`DUMCFG`].
pub const DUMCFG_MASK: u64 = 0xA;

/// Interrupts that are never delegated by [`MIDELEG`] when the hypervisor extension is present:
/// SGEI, VSEI, VSTI and VSSI.
pub const MIDELEG_FORCED_MASK: u64 = (1 << 12) | (1 << 10) | (1 << 6) | (1 << 2);

/// Returns `true` if `specifier` is valid, which is the case if it fits in 12 bits.
pub fn is_valid(specifier: CsrSpecifier) -> bool {
    specifier < 1 << 12
}
