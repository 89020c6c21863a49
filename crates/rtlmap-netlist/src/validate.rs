//! Design integrity checking
//!
//! [`Design::check`] validates the structural invariants the rest of the
//! toolchain relies on: wire widths, resolvable signal references, port
//! index contiguity, and connection width agreement. The mapping driver
//! re-runs it after every round that changed the design.

use crate::error::{NetlistError, Result};
use crate::netlist::{Design, Module};
use crate::sigspec::{SigChunk, SigSpec};

impl Design {
    /// Validate the whole design.
    pub fn check(&self) -> Result<()> {
        for module in self.modules.values() {
            check_module(module)?;
        }
        Ok(())
    }
}

fn check_module(module: &Module) -> Result<()> {
    for wire in module.wires.values() {
        if wire.width == 0 {
            return Err(NetlistError::ZeroWidthWire {
                module: module.name.clone(),
                name: wire.name.clone(),
            });
        }
    }

    // Port indices must form a contiguous 1..k sequence.
    for (i, port) in module.ports().iter().enumerate() {
        if port.port_id != i + 1 {
            return Err(NetlistError::PortIndexGap {
                module: module.name.clone(),
                expected: i + 1,
                found: port.port_id,
            });
        }
    }

    for cell in module.cells.values() {
        for sig in cell.connections.values() {
            check_sig(module, sig)?;
        }
    }

    for (lhs, rhs) in &module.connections {
        check_sig(module, lhs)?;
        check_sig(module, rhs)?;
        if lhs.width() != rhs.width() {
            return Err(NetlistError::ConnectionWidthMismatch {
                module: module.name.clone(),
                lhs: lhs.width(),
                rhs: rhs.width(),
            });
        }
    }

    for process in module.processes.values() {
        for (lhs, rhs) in &process.assigns {
            check_sig(module, lhs)?;
            check_sig(module, rhs)?;
        }
        for sync in &process.syncs {
            check_sig(module, &sync.signal)?;
            for (lhs, rhs) in &sync.updates {
                check_sig(module, lhs)?;
                check_sig(module, rhs)?;
            }
        }
    }

    Ok(())
}

fn check_sig(module: &Module, sig: &SigSpec) -> Result<()> {
    for chunk in sig.chunks() {
        if let SigChunk::Wire { name, offset, width } = chunk {
            let wire = module.wire(name).ok_or_else(|| NetlistError::DanglingWireRef {
                module: module.name.clone(),
                wire: name.clone(),
            })?;
            if offset + width > wire.width {
                return Err(NetlistError::SliceOutOfBounds {
                    module: module.name.clone(),
                    wire: name.clone(),
                    offset: *offset,
                    width: *width,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::IdString;
    use crate::netlist::{Cell, Wire};

    fn design_with(module: Module) -> Design {
        let mut design = Design::new();
        design.add_module(module).unwrap();
        design
    }

    #[test]
    fn accepts_well_formed_module() {
        let mut m = Module::new("\\m");
        let mut a = Wire::new("\\a", 4);
        a.port_id = 1;
        a.port_input = true;
        m.add_wire(a).unwrap();
        let mut y = Wire::new("\\y", 4);
        y.port_id = 2;
        y.port_output = true;
        m.add_wire(y).unwrap();
        m.connections.push((
            SigSpec::wire(IdString::new("\\y"), 4),
            SigSpec::wire(IdString::new("\\a"), 4),
        ));
        assert!(design_with(m).check().is_ok());
    }

    #[test]
    fn rejects_dangling_wire_reference() {
        let mut m = Module::new("\\m");
        let mut cell = Cell::new("\\c", "\\sub");
        cell.connections
            .insert(IdString::new("\\A"), SigSpec::wire(IdString::new("\\missing"), 1));
        m.add_cell(cell).unwrap();
        assert!(matches!(
            design_with(m).check(),
            Err(NetlistError::DanglingWireRef { .. })
        ));
    }

    #[test]
    fn rejects_port_index_gap() {
        let mut m = Module::new("\\m");
        let mut a = Wire::new("\\a", 1);
        a.port_id = 1;
        m.add_wire(a).unwrap();
        let mut y = Wire::new("\\y", 1);
        y.port_id = 3;
        m.add_wire(y).unwrap();
        assert!(matches!(
            design_with(m).check(),
            Err(NetlistError::PortIndexGap { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn rejects_out_of_bounds_slice() {
        let mut m = Module::new("\\m");
        m.add_wire(Wire::new("\\a", 2)).unwrap();
        m.add_wire(Wire::new("\\y", 2)).unwrap();
        m.connections.push((
            SigSpec::wire(IdString::new("\\y"), 2),
            SigSpec::wire_slice(IdString::new("\\a"), 1, 2),
        ));
        assert!(matches!(
            design_with(m).check(),
            Err(NetlistError::SliceOutOfBounds { .. })
        ));
    }

    #[test]
    fn rejects_width_mismatch() {
        let mut m = Module::new("\\m");
        m.add_wire(Wire::new("\\a", 2)).unwrap();
        m.add_wire(Wire::new("\\y", 3)).unwrap();
        m.connections.push((
            SigSpec::wire(IdString::new("\\y"), 3),
            SigSpec::wire(IdString::new("\\a"), 2),
        ));
        assert!(matches!(
            design_with(m).check(),
            Err(NetlistError::ConnectionWidthMismatch { lhs: 3, rhs: 2, .. })
        ));
    }
}
