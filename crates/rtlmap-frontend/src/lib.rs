//! RTLMAP frontends
//!
//! This crate handles:
//! - Parsing the native netlist dialect (`.il` files)
//! - Parsing the structural Verilog subset (everything else)
//! - Writing designs back out in the native dialect

pub mod error;
pub mod ilang;
pub mod verilog;
pub mod writer;

pub use error::{FrontendError, Result};
pub use writer::write_design;

use rtlmap_netlist::Design;
use tracing::info;

/// Source dialects understood by the frontends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// The native netlist dialect.
    Ilang,
    /// The structural Verilog subset.
    Verilog,
}

impl Dialect {
    /// Pick a dialect from a file name: `.il` selects the native dialect,
    /// everything else is read as Verilog.
    pub fn from_filename(filename: &str) -> Dialect {
        if filename.ends_with(".il") {
            Dialect::Ilang
        } else {
            Dialect::Verilog
        }
    }
}

/// Parse `text` in the given dialect and merge the result into `design`.
pub fn frontend_call(
    design: &mut Design,
    text: &str,
    filename: &str,
    dialect: Dialect,
) -> Result<()> {
    info!("Parsing `{}'.", filename);
    match dialect {
        Dialect::Ilang => ilang::parse(design, text, filename),
        Dialect::Verilog => verilog::parse(design, text, filename),
    }
}
