//! Process lowering
//!
//! Turns behavioural processes into structural netlist form: root
//! assignments become top-level connections, edge-triggered updates become
//! `$dff` cells. This is the canonical payload of a `_TECHMAP_DO_`
//! directive, run on templates written with behavioural content before
//! they are used for mapping.

use crate::error::{PassError, Result};
use crate::{parse_selection, Pass, PassRegistry};
use rtlmap_netlist::{Cell, Const, Design, IdString, SyncEdge};
use tracing::info;

/// `proc [selection]`
pub struct ProcPass;

impl Pass for ProcPass {
    fn name(&self) -> &'static str {
        "proc"
    }

    fn help(&self) -> &'static str {
        "lower processes to cells and connections"
    }

    fn execute(
        &self,
        args: &[String],
        design: &mut Design,
        _registry: &PassRegistry,
    ) -> Result<()> {
        info!("Executing PROC pass (lower processes).");
        let selection = parse_selection(design, args)?;
        design.selection_stack.push(selection);
        let outcome = lower_processes(design);
        design.selection_stack.pop();
        outcome
    }
}

fn lower_processes(design: &mut Design) -> Result<()> {
    let module_names: Vec<IdString> = design.modules.keys().cloned().collect();
    for module_name in module_names {
        if !design.selected_module(&module_name) {
            continue;
        }
        let process_names: Vec<IdString> = design
            .module(&module_name)
            .map(|m| m.processes.keys().cloned().collect())
            .unwrap_or_default();
        for process_name in process_names {
            if !design.selected_member(&module_name, &process_name) {
                continue;
            }
            let Some(module) = design.module_mut(&module_name) else {
                continue;
            };
            let Some(process) = module.processes.shift_remove(&process_name) else {
                continue;
            };
            info!("Lowering process {} in module {}.", process_name, module_name);

            for assign in process.assigns {
                module.connections.push(assign);
            }

            let mut index = 0;
            for sync in process.syncs {
                if sync.signal.width() != 1 {
                    return Err(PassError::UnsupportedProcess {
                        module: module_name.clone(),
                        process: process_name.clone(),
                    });
                }
                for (target, value) in sync.updates {
                    index += 1;
                    let mut name = IdString::new(format!("$procdff${}", index));
                    while module.cells.contains_key(&name) {
                        name = IdString::new(format!("{}_", name));
                    }
                    let mut cell = Cell::new(name, "$dff");
                    cell.parameters.insert(
                        IdString::new("\\WIDTH"),
                        Const::from_u64(target.width() as u64, 32),
                    );
                    cell.parameters.insert(
                        IdString::new("\\CLK_POLARITY"),
                        Const::from_u64(
                            matches!(sync.edge, SyncEdge::Posedge) as u64,
                            1,
                        ),
                    );
                    cell.connections.insert(IdString::new("\\CLK"), sync.signal.clone());
                    cell.connections.insert(IdString::new("\\D"), value);
                    cell.connections.insert(IdString::new("\\Q"), target);
                    module.add_cell(cell)?;
                }
            }
        }
    }
    Ok(())
}
