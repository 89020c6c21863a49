//! Error types for pass execution
//!
//! Every variant is fatal to the invocation that raised it: the pass
//! returns the error up through the registry and the surrounding command
//! fails. Non-fatal conditions (a cell with no mapping, a template vetoed
//! by its fail wire) are handled inside the passes and never surface here.

use rtlmap_netlist::IdString;
use thiserror::Error;

/// Result type for pass operations
pub type Result<T> = std::result::Result<T, PassError>;

/// Errors raised while executing a pass
#[derive(Debug, Error)]
pub enum PassError {
    /// A netlist invariant was violated
    #[error(transparent)]
    Netlist(#[from] rtlmap_netlist::NetlistError),

    /// A source file failed to parse
    #[error(transparent)]
    Frontend(#[from] rtlmap_frontend::FrontendError),

    /// The command string named a pass that is not registered
    #[error("no such pass: `{0}`")]
    UnknownPass(String),

    /// Bad command-line usage
    #[error("{0}")]
    Usage(String),

    /// A map file could not be read
    #[error("can't open map file `{path}`: {source}")]
    MapFile {
        /// The offending path
        path: String,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// A template contains memories
    #[error("technology map template `{0}` contains memories -> this is not supported")]
    TemplateMemories(IdString),

    /// A template contains processes
    #[error("technology map template `{0}` contains processes -> this is not supported")]
    TemplateProcesses(IdString),

    /// A special wire tag survived elaboration unrecognized
    #[error("techmap yielded unknown config wire {0}")]
    UnknownSpecialWire(String),

    /// A directive or fail wire was not constant when it was evaluated
    #[error("techmap yielded config wire {wire} with non-constant value {value}")]
    NonConstSpecialWire {
        /// The offending wire
        wire: IdString,
        /// Its driver, rendered for the diagnostic
        value: String,
    },

    /// A cloned signal references a wire that was not cloned
    #[error("prefixed wire `{0}` does not exist in the host module")]
    MissingCloneTarget(IdString),

    /// A positional connection has no matching template port
    #[error("can't map port `{port}` of cell `{cell}` to template `{template}`")]
    PositionalPortMismatch {
        /// The positional connection name (`$1`, `$2`, ...)
        port: IdString,
        /// The cell being expanded
        cell: IdString,
        /// The template it was matched against
        template: IdString,
    },

    /// A process could not be lowered to cells and connections
    #[error("process `{process}` in module `{module}` is not supported by the proc pass")]
    UnsupportedProcess {
        /// The owning module
        module: IdString,
        /// The offending process
        process: IdString,
    },
}
