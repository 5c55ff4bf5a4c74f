//! # varscope-core
//!
//! Debug-info analysis for compiled binaries.
//!
//! This crate provides the analyzer's foundations, including:
//! - The Symbol Table Provider: object parsing, DWARF extraction, and
//!   line-table lookup
//! - Type-graph collection with pahole-style structure layout reports
//! - Cache-line contention clustering for global variables
//! - Location-interval building and source-line correlation
//!
//! All analysis is single threaded and runs over link-time addresses;
//! the analyzer never attaches to or modifies a process.

pub mod analysis;
pub mod diag;
pub mod error;
pub mod symtab;
pub mod types;

pub use diag::DiagnosticSink;
// Re-export commonly used types
pub use error::{Result, VarscopeError};
pub use symtab::SymbolTable;
