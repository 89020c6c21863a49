//! Error types for the text frontends

use thiserror::Error;

/// Result type for frontend operations
pub type Result<T> = std::result::Result<T, FrontendError>;

/// Errors that can occur while parsing a source file
#[derive(Debug, Error)]
pub enum FrontendError {
    /// Lexical or syntactic error at a known position
    #[error("{file}:{line}: {message}")]
    Parse {
        /// Source file name
        file: String,
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// The parsed text violated a netlist invariant
    #[error(transparent)]
    Netlist(#[from] rtlmap_netlist::NetlistError),
}

impl FrontendError {
    /// Convenience constructor for parse errors.
    pub fn parse(file: &str, line: usize, message: impl Into<String>) -> Self {
        FrontendError::Parse {
            file: file.to_string(),
            line,
            message: message.into(),
        }
    }
}
