//! Unused-wire removal
//!
//! Drops auto-generated wires that nothing references: not a port, not
//! marked `keep`, and absent from every cell connection, top-level
//! connection, and process. Expansions leave merged-away internal wires
//! behind; this pass tidies them up.

use crate::error::Result;
use crate::{parse_selection, Pass, PassRegistry};
use rtlmap_netlist::{Design, IdString, Module, SigChunk, SigSpec};
use std::collections::HashSet;
use tracing::info;

/// `clean [selection]`
pub struct CleanPass;

impl Pass for CleanPass {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn help(&self) -> &'static str {
        "remove unused auto-generated wires"
    }

    fn execute(
        &self,
        args: &[String],
        design: &mut Design,
        _registry: &PassRegistry,
    ) -> Result<()> {
        info!("Executing CLEAN pass (remove unused wires).");
        let selection = parse_selection(design, args)?;
        design.selection_stack.push(selection);
        let module_names: Vec<IdString> = design.modules.keys().cloned().collect();
        let mut total = 0usize;
        for module_name in module_names {
            if !design.selected_module(&module_name) {
                continue;
            }
            if let Some(module) = design.module_mut(&module_name) {
                total += clean_module(module);
            }
        }
        design.selection_stack.pop();
        info!("Removed {} unused wires.", total);
        Ok(())
    }
}

fn mark_used(used: &mut HashSet<IdString>, sig: &SigSpec) {
    for chunk in sig.chunks() {
        if let SigChunk::Wire { name, .. } = chunk {
            used.insert(name.clone());
        }
    }
}

fn clean_module(module: &mut Module) -> usize {
    let mut used: HashSet<IdString> = HashSet::new();
    for cell in module.cells.values() {
        for sig in cell.connections.values() {
            mark_used(&mut used, sig);
        }
    }
    for (lhs, rhs) in &module.connections {
        mark_used(&mut used, lhs);
        mark_used(&mut used, rhs);
    }
    for process in module.processes.values() {
        for (lhs, rhs) in &process.assigns {
            mark_used(&mut used, lhs);
            mark_used(&mut used, rhs);
        }
        for sync in &process.syncs {
            mark_used(&mut used, &sync.signal);
            for (lhs, rhs) in &sync.updates {
                mark_used(&mut used, lhs);
                mark_used(&mut used, rhs);
            }
        }
    }

    let keep = IdString::new("\\keep");
    let victims: Vec<IdString> = module
        .wires
        .values()
        .filter(|w| {
            w.name.is_autogen()
                && w.port_id == 0
                && !w.get_bool_attribute(&keep)
                && !used.contains(&w.name)
        })
        .map(|w| w.name.clone())
        .collect();
    for name in &victims {
        let _ = module.remove_wire(name);
    }
    victims.len()
}
