use bitvec::{field::BitField, order::Lsb0, view::BitView};

use crate::{PrivilegeLevel, Word};

/// Bit fields of the mstatus register, and of the views that share its layout (sstatus, ustatus
/// and vsstatus).
///
/// > The mstatus register keeps track of and controls the hart’s current operating state. A
/// > restricted view of mstatus appears as the sstatus register in the S-level ISA.
///
/// The value is only a working copy: read it from the CSR file, update it, write it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status(pub Word);

impl Status {
    /// Returns `true` if the UIE (U-mode Interrupt Enable) bit is set.
    pub fn uie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::UIE]
    }

    /// Sets the UIE bit to `value`.
    pub fn set_uie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::UIE, value);
    }

    /// Returns `true` if the SIE (S-mode Interrupt Enable) bit is set.
    pub fn sie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::SIE]
    }

    /// Sets the SIE bit to `value`.
    pub fn set_sie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::SIE, value);
    }

    /// Returns `true` if the MIE (M-mode Interrupt Enable) bit is set.
    pub fn mie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::MIE]
    }

    /// Sets the MIE bit to `value`.
    pub fn set_mie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::MIE, value);
    }

    /// Returns `true` if the UPIE (U-mode Previous Interrupt Enable) bit is set.
    pub fn upie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::UPIE]
    }

    /// Sets the UPIE bit to `value`.
    pub fn set_upie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::UPIE, value);
    }

    /// Returns `true` if the SPIE (S-mode Previous Interrupt Enable) bit is set.
    pub fn spie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::SPIE]
    }

    /// Sets the SPIE bit to `value`.
    pub fn set_spie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::SPIE, value);
    }

    /// Returns `true` if the MPIE (M-mode Previous Interrupt Enable) bit is set.
    pub fn mpie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::MPIE]
    }

    /// Sets the MPIE bit to `value`.
    pub fn set_mpie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::MPIE, value);
    }

    /// Returns the privilege level encoded by the SPP (S-mode Previous Privilege level) field.
    pub fn spp(&self) -> PrivilegeLevel {
        if self.0.view_bits::<Lsb0>()[idx::SPP] {
            PrivilegeLevel::Supervisor
        } else {
            PrivilegeLevel::User
        }
    }

    /// Sets the SPP field. Only U and S can be represented, other levels are ignored since SPP
    /// is **WARL**.
    pub fn set_spp(&mut self, value: PrivilegeLevel) {
        if value <= PrivilegeLevel::Supervisor {
            let bit = value == PrivilegeLevel::Supervisor;
            self.0.view_bits_mut::<Lsb0>().set(idx::SPP, bit);
        }
    }

    /// Returns the privilege level encoded by the MPP (M-mode Previous Privilege level) field.
    ///
    /// The field is only legalized on writes done through [`Self::set_mpp`], so a value copied in
    /// from outside may still hold the reserved encoding, for which `None` is returned.
    pub fn mpp(&self) -> Option<PrivilegeLevel> {
        PrivilegeLevel::from_u2(self.0.view_bits::<Lsb0>()[idx::MPP..(idx::MPP + 2)].load_le())
    }

    /// Sets the MPP field to the encoding of `value`.
    pub fn set_mpp(&mut self, value: PrivilegeLevel) {
        self.0.view_bits_mut::<Lsb0>()[idx::MPP..(idx::MPP + 2)].store_le(value.to_u2());
    }

    /// Returns `true` if the MPRV (Modify PRiVilege) bit is set.
    pub fn mprv(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::MPRV]
    }

    /// Returns `true` if the SUM (permit Supervisor User Memory access) bit is set.
    pub fn sum(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::SUM]
    }

    /// Returns `true` if the MXR (Make eXecutable Readable) bit is set.
    pub fn mxr(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::MXR]
    }

    /// Returns `true` if the MPV (Machine Previous Virtualization mode) bit is set.
    pub fn mpv(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::MPV]
    }

    /// Sets the MPV bit to `value`.
    pub fn set_mpv(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::MPV, value);
    }
}

/// Bit indices into mstatus register.
mod idx {
    pub const UIE: usize = 0;
    pub const SIE: usize = 1;
    pub const MIE: usize = 3;
    pub const UPIE: usize = 4;
    pub const SPIE: usize = 5;
    pub const MPIE: usize = 7;
    pub const SPP: usize = 8;
    pub const MPP: usize = 11;
    pub const MPRV: usize = 17;
    pub const SUM: usize = 18;
    pub const MXR: usize = 19;
    pub const MPV: usize = 39;
}

/// Bit fields of the hstatus register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HStatus(pub Word);

impl HStatus {
    /// Returns `true` if the SPV (Supervisor Previous Virtualization mode) bit is set.
    pub fn spv(&self) -> bool {
        self.0.view_bits::<Lsb0>()[hidx::SPV]
    }

    /// Sets the SPV bit to `value`.
    pub fn set_spv(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(hidx::SPV, value);
    }

    /// Returns `true` if the SPVP (Supervisor Previous Virtual Privilege) bit is set.
    pub fn spvp(&self) -> bool {
        self.0.view_bits::<Lsb0>()[hidx::SPVP]
    }

    /// Sets the SPVP bit to `value`.
    pub fn set_spvp(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(hidx::SPVP, value);
    }
}

/// Bit indices into hstatus register.
mod hidx {
    pub const SPV: usize = 7;
    pub const SPVP: usize = 8;
}
