//! Compact copy of the CSRs the DUT compares against.
//!
//! [`Mirror`] holds one named field per mirrored register. Which fields take part in a
//! [`Mirror::pull`] or [`Mirror::push`] is decided by the [`Capabilities`] of the model, and the
//! order in which they appear is fixed by [`REGISTERS`]. That order is also the order in which they
//! appear in the register block exchanged with the DUT.

use super::specifier::*;
use super::CsrFile;
use crate::{Capabilities, Word};

/// Extension that has to be present for a mirrored register to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    UserInterrupts,
    Dasics,
    Mpk,
    DasicsOrMpk,
    Vector,
    Hypervisor,
}

impl Gate {
    pub fn is_open(self, capabilities: &Capabilities) -> bool {
        match self {
            Gate::Always => true,
            Gate::UserInterrupts => capabilities.user_interrupts,
            Gate::Dasics => capabilities.dasics,
            Gate::Mpk => capabilities.mpk,
            Gate::DasicsOrMpk => capabilities.has_fault_reason(),
            Gate::Vector => capabilities.vector,
            Gate::Hypervisor => capabilities.hypervisor,
        }
    }
}

/// A register that is never stored on its own, but always read as a masked view of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shadow {
    pub derived: CsrSpecifier,
    pub parent: CsrSpecifier,
    pub mask: Word,
}

/// All shadow relations between mirrored registers.
pub static SHADOWS: [Shadow; 3] = [
    Shadow {
        derived: SSTATUS,
        parent: MSTATUS,
        mask: SSTATUS_MASK,
    },
    Shadow {
        derived: USTATUS,
        parent: MSTATUS,
        mask: USTATUS_MASK,
    },
    Shadow {
        derived: DUMCFG,
        parent: DSMCFG,
        mask: DUMCFG_MASK,
    },
];

/// Describes one field of [`Mirror`] and the CSR it mirrors.
pub struct MirroredRegister {
    /// Lowercase register name, as used in diagnostics.
    pub name: &'static str,
    pub specifier: CsrSpecifier,
    pub gate: Gate,
    get: fn(&Mirror) -> Word,
    set: fn(&mut Mirror, Word),
}

impl MirroredRegister {
    pub fn get(&self, mirror: &Mirror) -> Word {
        (self.get)(mirror)
    }

    pub fn set(&self, mirror: &mut Mirror, value: Word) {
        (self.set)(mirror, value)
    }

    /// Returns the shadow relation if this register is derived from another one.
    pub fn shadow(&self) -> Option<&'static Shadow> {
        SHADOWS.iter().find(|shadow| shadow.derived == self.specifier)
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow().is_some()
    }
}

impl std::fmt::Debug for MirroredRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirroredRegister")
            .field("name", &self.name)
            .field("specifier", &format_args!("{:#05x}", self.specifier))
            .field("gate", &self.gate)
            .finish()
    }
}

macro_rules! mirror_registers {
    ($($gate:ident => { $($name:ident = $specifier:expr,)* })*) => {
        /// Named copy of every mirrored CSR.
        ///
        /// Fields of extensions that are not present keep whatever value they were given, they
        /// are never pulled from or pushed to the [`CsrFile`].
        #[derive(Debug, Default, Clone, PartialEq, Eq)]
        pub struct Mirror {
            $($(pub $name: Word,)*)*
        }

        /// Every mirrored register, in register block order.
        pub static REGISTERS: &[MirroredRegister] = &[
            $($(MirroredRegister {
                name: stringify!($name),
                specifier: $specifier,
                gate: Gate::$gate,
                get: |mirror| mirror.$name,
                set: |mirror, value| mirror.$name = value,
            },)*)*
        ];
    };
}

mirror_registers! {
    Always => {
        mstatus = MSTATUS,
        mcause = MCAUSE,
        mepc = MEPC,
        sstatus = SSTATUS,
        scause = SCAUSE,
        sepc = SEPC,
        satp = SATP,
        mip = MIP,
        mie = MIE,
        mscratch = MSCRATCH,
        sscratch = SSCRATCH,
        mideleg = MIDELEG,
        medeleg = MEDELEG,
        mtval = MTVAL,
        stval = STVAL,
        mtvec = MTVEC,
        stvec = STVEC,
    }
    UserInterrupts => {
        ustatus = USTATUS,
        ucause = UCAUSE,
        uepc = UEPC,
        uscratch = USCRATCH,
        sedeleg = SEDELEG,
        sideleg = SIDELEG,
        utval = UTVAL,
        utvec = UTVEC,
        utimer = UTIMER,
    }
    Dasics => {
        dsmcfg = DSMCFG,
        dsmbound0 = DSMBOUND0,
        dsmbound1 = DSMBOUND1,
        dumcfg = DUMCFG,
        dumbound0 = DUMBOUND0,
        dumbound1 = DUMBOUND1,
        dlcfg0 = DLCFG0,
        dlbound0 = DLBOUND0,
        dlbound1 = DLBOUND0 + 1,
        dlbound2 = DLBOUND0 + 2,
        dlbound3 = DLBOUND0 + 3,
        dlbound4 = DLBOUND0 + 4,
        dlbound5 = DLBOUND0 + 5,
        dlbound6 = DLBOUND0 + 6,
        dlbound7 = DLBOUND0 + 7,
        dlbound8 = DLBOUND0 + 8,
        dlbound9 = DLBOUND0 + 9,
        dlbound10 = DLBOUND0 + 10,
        dlbound11 = DLBOUND0 + 11,
        dlbound12 = DLBOUND0 + 12,
        dlbound13 = DLBOUND0 + 13,
        dlbound14 = DLBOUND0 + 14,
        dlbound15 = DLBOUND0 + 15,
        dlbound16 = DLBOUND0 + 16,
        dlbound17 = DLBOUND0 + 17,
        dlbound18 = DLBOUND0 + 18,
        dlbound19 = DLBOUND0 + 19,
        dlbound20 = DLBOUND0 + 20,
        dlbound21 = DLBOUND0 + 21,
        dlbound22 = DLBOUND0 + 22,
        dlbound23 = DLBOUND0 + 23,
        dlbound24 = DLBOUND0 + 24,
        dlbound25 = DLBOUND0 + 25,
        dlbound26 = DLBOUND0 + 26,
        dlbound27 = DLBOUND0 + 27,
        dlbound28 = DLBOUND0 + 28,
        dlbound29 = DLBOUND0 + 29,
        dlbound30 = DLBOUND0 + 30,
        dlbound31 = DLBOUND31,
        djcfg = DJCFG,
        djbound0lo = DJBOUND0LO,
        djbound0hi = DJBOUND0LO + 1,
        djbound1lo = DJBOUND0LO + 2,
        djbound1hi = DJBOUND0LO + 3,
        djbound2lo = DJBOUND0LO + 4,
        djbound2hi = DJBOUND0LO + 5,
        djbound3lo = DJBOUND0LO + 6,
        djbound3hi = DJBOUND3HI,
        dmaincall = DMAINCALL,
        dretpc = DRETPC,
        dretpcfz = DRETPCFZ,
    }
    Mpk => {
        upkru = UPKRU,
        spkrs = SPKRS,
        spkctl = SPKCTL,
    }
    DasicsOrMpk => {
        dfreason = DFREASON,
    }
    Vector => {
        vstart = VSTART,
        vxsat = VXSAT,
        vxrm = VXRM,
        vcsr = VCSR,
        vl = VL,
        vtype = VTYPE,
        vlenb = VLENB,
    }
    Hypervisor => {
        mtval2 = MTVAL2,
        mtinst = MTINST,
        hstatus = HSTATUS,
        hideleg = HIDELEG,
        hedeleg = HEDELEG,
        hcounteren = HCOUNTEREN,
        htval = HTVAL,
        htinst = HTINST,
        hgatp = HGATP,
        vsstatus = VSSTATUS,
        vstvec = VSTVEC,
        vsepc = VSEPC,
        vscause = VSCAUSE,
        vstval = VSTVAL,
        vsatp = VSATP,
        vsscratch = VSSCRATCH,
    }
}

/// Iterates over the registers present under `capabilities`, in register block order.
pub fn enabled(
    capabilities: &Capabilities,
) -> impl Iterator<Item = &'static MirroredRegister> + '_ {
    REGISTERS
        .iter()
        .filter(move |register| register.gate.is_open(capabilities))
}

/// Returns the number of registers present under `capabilities`.
pub fn enabled_count(capabilities: &Capabilities) -> usize {
    enabled(capabilities).count()
}

impl Mirror {
    /// Returns a mirror freshly pulled from `csrs`.
    pub fn pulled(csrs: &CsrFile, capabilities: &Capabilities) -> Self {
        let mut mirror = Self::default();
        mirror.pull(csrs, capabilities);
        mirror
    }

    /// Copies every enabled register from `csrs` into the mirror.
    ///
    /// Shadow registers are not read from their own specifier, they are derived from their parent.
    pub fn pull(&mut self, csrs: &CsrFile, capabilities: &Capabilities) {
        for register in enabled(capabilities) {
            let value = match register.shadow() {
                Some(shadow) => csrs.read(shadow.parent) & shadow.mask,
                None => csrs.read(register.specifier),
            };
            register.set(self, value);
        }
    }

    /// Copies every enabled, non-shadow register from the mirror back into `csrs`.
    pub fn push(&self, csrs: &mut CsrFile, capabilities: &Capabilities) {
        for register in enabled(capabilities).filter(|register| !register.is_shadow()) {
            csrs.write(register.specifier, register.get(self));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn everything() -> Capabilities {
        Capabilities {
            hypervisor: true,
            user_interrupts: true,
            vector: true,
            dasics: true,
            mpk: true,
            ..Capabilities::default()
        }
    }

    #[test]
    fn register_table_is_consistent() {
        assert_eq!(17 + 9 + 51 + 3 + 1 + 7 + 16, REGISTERS.len());
        for (i, a) in REGISTERS.iter().enumerate() {
            assert!(is_valid(a.specifier), "{}", a.name);
            for b in &REGISTERS[i + 1..] {
                assert_ne!(a.specifier, b.specifier, "{} and {}", a.name, b.name);
            }
        }
        assert_eq!(DLBOUND0 + 31, DLBOUND31);
        for shadow in &SHADOWS {
            let derived = REGISTERS.iter().find(|r| r.specifier == shadow.derived);
            let parent = REGISTERS.iter().find(|r| r.specifier == shadow.parent);
            assert!(derived.unwrap().is_shadow());
            assert!(!parent.unwrap().is_shadow());
        }
    }

    #[test]
    fn capabilities_select_registers() {
        assert_eq!(17, enabled_count(&Capabilities::base()));
        let mpk_only = Capabilities {
            mpk: true,
            ..Capabilities::default()
        };
        assert_eq!(17 + 3 + 1, enabled_count(&mpk_only));
        assert_eq!(REGISTERS.len(), enabled_count(&everything()));
    }

    #[test]
    fn pull_derives_shadows_from_parents() {
        let caps = everything();
        for mstatus in [0, u64::MAX, 0x8000_0000_000A_1888, 0x1F] {
            let mut csrs = CsrFile::new();
            csrs.write(MSTATUS, mstatus);
            csrs.write(SSTATUS, 0xDEAD);
            csrs.write(USTATUS, 0xBEEF);
            csrs.write(DSMCFG, 0xF);
            let mirror = Mirror::pulled(&csrs, &caps);
            assert_eq!(mstatus, mirror.mstatus);
            assert_eq!(mstatus & SSTATUS_MASK, mirror.sstatus);
            assert_eq!(mstatus & USTATUS_MASK, mirror.ustatus);
            assert_eq!(0xA, mirror.dumcfg);
        }
    }

    #[test]
    fn push_skips_shadows() {
        let caps = everything();
        let mut csrs = CsrFile::new();
        let mirror = Mirror {
            mstatus: 0x8,
            sstatus: 0x2,
            dumcfg: 0x2,
            hgatp: 0x8000_0000_0000_0001,
            dlbound17: 0x4000,
            ..Mirror::default()
        };
        mirror.push(&mut csrs, &caps);
        assert_eq!(0x8, csrs.read(MSTATUS));
        assert_eq!(0, csrs.read(SSTATUS));
        assert_eq!(0, csrs.read(DUMCFG));
        assert_eq!(0x8000_0000_0000_0001, csrs.read(HGATP));
        assert_eq!(0x4000, csrs.read(DLBOUND0 + 17));
    }

    #[test]
    fn disabled_registers_are_left_alone() {
        let mut csrs = CsrFile::new();
        csrs.write(HSTATUS, 5);
        let mut mirror = Mirror::pulled(&csrs, &Capabilities::base());
        assert_eq!(0, mirror.hstatus);

        mirror.hstatus = 9;
        mirror.push(&mut csrs, &Capabilities::base());
        assert_eq!(5, csrs.read(HSTATUS));
    }

    #[test]
    fn push_then_pull_round_trips_non_shadow_state() {
        let caps = everything();
        let mut source = Mirror::default();
        for (i, register) in REGISTERS.iter().enumerate() {
            register.set(&mut source, 0x1000 + i as u64);
        }
        let mut csrs = CsrFile::new();
        source.push(&mut csrs, &caps);
        let pulled = Mirror::pulled(&csrs, &caps);
        for register in REGISTERS.iter().filter(|r| !r.is_shadow()) {
            assert_eq!(register.get(&source), register.get(&pulled), "{}", register.name);
        }
    }
}
