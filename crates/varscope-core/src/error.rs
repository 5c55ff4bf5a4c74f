//! # Error Types
//!
//! General error handling for the analyzer.
//!
//! We use `thiserror` to automatically generate `Error` trait
//! implementations and nice error messages.
//!
//! Errors come in two tiers. Everything in [`VarscopeError`] is fatal:
//! the process terminates with the code from [`VarscopeError::exit_code`].
//! Recoverable findings (malformed location lists, out-of-range line
//! numbers, and so on) are not errors at all; they flow through
//! [`crate::diag::DiagnosticSink`] and never change the exit status.

use std::io;

use thiserror::Error;

/// Fatal error conditions for analyzer operations.
#[derive(Error, Debug)]
pub enum VarscopeError
{
    /// Invalid argument passed on the command line or to an API call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The object file could not be read or parsed.
    #[error("failed to open object file {path}: {reason}")]
    OpenFailed
    {
        path: String,
        reason: String,
    },

    /// DWARF decoding failed. Carries a static context string naming the
    /// operation that was in flight.
    #[error("{context}: {source}")]
    Dwarf
    {
        context: &'static str,
        #[source]
        source: gimli::Error,
    },

    /// Function enumeration was requested and the table holds none.
    #[error("no functions found in the symbol table")]
    NoFunctions,

    /// A unique function lookup matched nothing.
    #[error("function {0} not found")]
    FunctionNotFound(String),

    /// A unique function lookup matched more than one candidate.
    #[error("function {name} is not unique: {count} candidates")]
    FunctionNotUnique
    {
        name: String,
        count: usize,
    },

    /// Global-variable enumeration was requested and the table holds none.
    #[error("no global variables found in the symbol table")]
    NoGlobals,

    /// I/O error for file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl VarscopeError
{
    /// Process exit code for this fatal condition. The codes are part of
    /// the CLI contract and stay distinct per failure class.
    pub fn exit_code(&self) -> i32
    {
        match self {
            VarscopeError::InvalidArgument(_) => 1,
            VarscopeError::OpenFailed { .. } | VarscopeError::Dwarf { .. } | VarscopeError::Io(_) => 2,
            VarscopeError::NoFunctions => 3,
            VarscopeError::FunctionNotFound(_) => 4,
            VarscopeError::FunctionNotUnique { .. } => 5,
            VarscopeError::NoGlobals => 6,
        }
    }
}

/// Convenience type alias for `Result<T, VarscopeError>`.
pub type Result<T> = std::result::Result<T, VarscopeError>;

/// Wrap a gimli error with the operation that produced it.
pub(crate) fn map_dwarf_error(context: &'static str, err: gimli::Error) -> VarscopeError
{
    VarscopeError::Dwarf { context, source: err }
}
