//! Design statistics

use crate::error::Result;
use crate::{parse_selection, Pass, PassRegistry};
use indexmap::IndexMap;
use rtlmap_netlist::{Design, IdString};
use tracing::info;

/// `stat [selection]`
pub struct StatPass;

impl Pass for StatPass {
    fn name(&self) -> &'static str {
        "stat"
    }

    fn help(&self) -> &'static str {
        "print wire and cell statistics per module"
    }

    fn execute(
        &self,
        args: &[String],
        design: &mut Design,
        _registry: &PassRegistry,
    ) -> Result<()> {
        let selection = parse_selection(design, args)?;
        design.selection_stack.push(selection);
        for module in design.modules.values() {
            if !design.selected_module(&module.name) {
                continue;
            }
            info!("=== {} ===", module.name);
            info!("   wires: {:6}", module.wires.len());
            info!("   cells: {:6}", module.cells.len());
            if !module.processes.is_empty() {
                info!("   processes: {:2}", module.processes.len());
            }
            if !module.memories.is_empty() {
                info!("   memories: {:3}", module.memories.len());
            }
            let mut by_type: IndexMap<IdString, usize> = IndexMap::new();
            for cell in module.cells.values() {
                *by_type.entry(cell.ty.clone()).or_default() += 1;
            }
            by_type.sort_keys();
            for (ty, count) in &by_type {
                info!("     {:6} {}", count, ty);
            }
        }
        design.selection_stack.pop();
        Ok(())
    }
}
