//! Analyst-facing diagnostics.
//!
//! Recoverable findings are warnings for the analyst, not log events, so
//! they are routed through an explicit sink value threaded through every
//! analysis pass. Quiet and warnings-only modes are then just different
//! sink constructions; no process-wide stream state is involved, and the
//! same core can run several analyses in one process.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Write;

use tracing::debug;

enum SinkKind
{
    Stderr,
    Stdout,
    Discard,
    Buffer(RefCell<String>),
}

/// Sink for recoverable diagnostics.
pub struct DiagnosticSink
{
    kind: SinkKind,
    emitted: Cell<usize>,
}

impl DiagnosticSink
{
    /// Diagnostics to standard error (the default).
    pub fn stderr() -> Self
    {
        Self::with_kind(SinkKind::Stderr)
    }

    /// Diagnostics to standard output, for warnings-only runs where the
    /// report itself is suppressed.
    pub fn stdout() -> Self
    {
        Self::with_kind(SinkKind::Stdout)
    }

    /// Swallow every diagnostic.
    pub fn discard() -> Self
    {
        Self::with_kind(SinkKind::Discard)
    }

    /// Capture diagnostics in memory. Used by tests.
    pub fn buffer() -> Self
    {
        Self::with_kind(SinkKind::Buffer(RefCell::new(String::new())))
    }

    fn with_kind(kind: SinkKind) -> Self
    {
        Self {
            kind,
            emitted: Cell::new(0),
        }
    }

    /// Emit one diagnostic line. Callers provide the full message
    /// including any severity prefix.
    pub fn warn(&self, message: impl fmt::Display)
    {
        self.emitted.set(self.emitted.get() + 1);
        let line = message.to_string();
        debug!(target: "varscope::diag", "{line}");
        match &self.kind {
            SinkKind::Stderr => {
                let _ = writeln!(std::io::stderr(), "{line}");
            }
            SinkKind::Stdout => {
                let _ = writeln!(std::io::stdout(), "{line}");
            }
            SinkKind::Discard => {}
            SinkKind::Buffer(buf) => {
                buf.borrow_mut().push_str(&line);
                buf.borrow_mut().push('\n');
            }
        }
    }

    /// Number of diagnostics emitted so far, counted even when discarded.
    pub fn emitted(&self) -> usize
    {
        self.emitted.get()
    }

    /// Captured text for buffer sinks, `None` otherwise.
    pub fn buffered(&self) -> Option<String>
    {
        match &self.kind {
            SinkKind::Buffer(buf) => Some(buf.borrow().clone()),
            _ => None,
        }
    }
}

impl Default for DiagnosticSink
{
    fn default() -> Self
    {
        Self::stderr()
    }
}
