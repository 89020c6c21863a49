//! Design integrity check as a pass

use crate::error::Result;
use crate::{Pass, PassRegistry};
use rtlmap_netlist::Design;
use tracing::info;

/// `check`
pub struct CheckPass;

impl Pass for CheckPass {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "validate netlist structural invariants"
    }

    fn execute(
        &self,
        _args: &[String],
        design: &mut Design,
        _registry: &PassRegistry,
    ) -> Result<()> {
        design.check()?;
        info!("Design integrity check passed.");
        Ok(())
    }
}
