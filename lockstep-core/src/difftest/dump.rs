//! Human readable register dump, written on request of the harness when a mismatch is found.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::warn;

use crate::csr::mirror::Mirror;
use crate::csr::specifier::{VL, VSTART, VTYPE, VXRM, VXSAT};
use crate::registers::Specifier;
use crate::{Hart, Word};

/// Writes the dump of `hart` to `out`: one `name value` line per CSR, then `gpr i value` and
/// `fpr i value` lines. All values are lowercase hexadecimal without prefix.
pub fn write_dump<W: Write>(hart: &Hart, out: &mut W) -> io::Result<()> {
    let m = Mirror::pulled(hart.csrs(), hart.capabilities());
    let csrs: [(&str, Word); 17] = [
        ("mstatus", m.mstatus),
        ("mcause", m.mcause),
        ("mepc", m.mepc),
        ("sstatus", m.sstatus),
        ("scause", m.scause),
        ("sepc", m.sepc),
        ("satp", m.satp),
        ("mip", m.mip),
        ("mie", m.mie),
        ("mscratch", m.mscratch),
        ("sscratch", m.sscratch),
        ("mideleg", m.mideleg),
        ("medeleg", m.medeleg),
        ("mtval", m.mtval),
        ("stval", m.stval),
        ("mtvec", m.mtvec),
        ("stvec", m.stvec),
    ];
    for (name, value) in csrs {
        writeln!(out, "{name} {value:x}")?;
    }

    if hart.capabilities().vector {
        for (name, specifier) in [
            ("vtype", VTYPE),
            ("vstart", VSTART),
            ("vxsat", VXSAT),
            ("vxrm", VXRM),
            ("vl", VL),
        ] {
            writeln!(out, "{name} {:x}", hart.csrs().read(specifier))?;
        }
    }

    for r in Specifier::iter_all() {
        writeln!(out, "gpr {} {:x}", usize::from(r), hart.registers.x(r))?;
    }
    for r in Specifier::iter_all() {
        writeln!(out, "fpr {} {:x}", usize::from(r), hart.registers.f(r))?;
    }
    Ok(())
}

/// Writes the dump of `hart` to the file at `path`. Nothing is written when no path is set, and a
/// failure to write only produces a warning.
pub fn dump_to(hart: &Hart, path: Option<&Path>) {
    let Some(path) = path else {
        warn!("No register dump file is specified, register dump skipped");
        return;
    };
    let file = match File::create(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("Cannot open {}, register dump skipped: {err}", path.display());
            return;
        }
    };
    let mut out = BufWriter::new(file);
    if let Err(err) = write_dump(hart, &mut out).and_then(|()| out.flush()) {
        warn!("Register dump to {} failed: {err}", path.display());
    }
}
