//! Error types for netlist construction and validation

use crate::ident::IdString;
use thiserror::Error;

/// Result type for netlist operations
pub type Result<T> = std::result::Result<T, NetlistError>;

/// Errors that can occur while building or validating a netlist
#[derive(Debug, Error)]
pub enum NetlistError {
    /// A module name is already taken
    #[error("design already contains a module named `{0}`")]
    DuplicateModule(IdString),

    /// A wire name is already taken within its module
    #[error("module `{module}` already contains a wire named `{name}`")]
    DuplicateWire {
        /// Owning module
        module: IdString,
        /// Conflicting name
        name: IdString,
    },

    /// A cell name is already taken within its module
    #[error("module `{module}` already contains a cell named `{name}`")]
    DuplicateCell {
        /// Owning module
        module: IdString,
        /// Conflicting name
        name: IdString,
    },

    /// A module lookup failed
    #[error("no module named `{0}` in design")]
    ModuleNotFound(IdString),

    /// A wire lookup failed
    #[error("no wire named `{name}` in module `{module}`")]
    WireNotFound {
        /// Module searched
        module: IdString,
        /// Missing name
        name: IdString,
    },

    /// A cell lookup failed
    #[error("no cell named `{name}` in module `{module}`")]
    CellNotFound {
        /// Module searched
        module: IdString,
        /// Missing name
        name: IdString,
    },

    /// A signal chunk references a wire that does not exist
    #[error("module `{module}` references undeclared wire `{wire}`")]
    DanglingWireRef {
        /// Module containing the reference
        module: IdString,
        /// The unresolved wire name
        wire: IdString,
    },

    /// A signal chunk reaches past the end of its wire
    #[error("module `{module}`: slice [{}:{}] is out of bounds for wire `{wire}`", .offset + .width - 1, .offset)]
    SliceOutOfBounds {
        /// Module containing the reference
        module: IdString,
        /// The referenced wire
        wire: IdString,
        /// First referenced bit
        offset: usize,
        /// Slice width
        width: usize,
    },

    /// A wire was declared with width zero
    #[error("wire `{name}` in module `{module}` has width 0")]
    ZeroWidthWire {
        /// Owning module
        module: IdString,
        /// The offending wire
        name: IdString,
    },

    /// Port indices do not form a contiguous 1..k sequence
    #[error("ports of module `{module}` do not form a contiguous sequence (expected port index {expected}, found {found})")]
    PortIndexGap {
        /// The offending module
        module: IdString,
        /// The index that should have been present
        expected: usize,
        /// The index actually found
        found: usize,
    },

    /// The two sides of a top-level connection differ in width
    #[error("connection in module `{module}` has mismatched widths ({lhs} vs {rhs} bits)")]
    ConnectionWidthMismatch {
        /// The offending module
        module: IdString,
        /// Left-hand width
        lhs: usize,
        /// Right-hand width
        rhs: usize,
    },
}
