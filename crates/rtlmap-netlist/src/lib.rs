//! RTLMAP netlist IR
//!
//! This crate defines the netlist object model shared by the whole
//! toolchain:
//! - Identifiers, constants and signals
//! - Wires, cells, modules and designs
//! - Selections and the selection stack
//! - Bit-level signal substitution
//! - Parameter specialization (`derive`)
//! - Design integrity checking

pub mod constant;
pub mod derive;
pub mod error;
pub mod ident;
pub mod netlist;
pub mod selection;
pub mod sigmap;
pub mod sigspec;
pub mod validate;

pub use constant::{Const, State};
pub use error::{NetlistError, Result};
pub use ident::IdString;
pub use netlist::{Attributes, Cell, Design, Memory, Module, Process, SyncEdge, SyncRule, Wire};
pub use selection::Selection;
pub use sigmap::SigMap;
pub use sigspec::{SigBit, SigChunk, SigSpec};
