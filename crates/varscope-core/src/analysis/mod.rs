//! The analytic passes: type-graph collection, layout and cache-line
//! reporting, interval building, and source-line correlation.

pub mod cacheline;
pub mod interval;
pub mod layout;
pub mod linemap;
pub mod report;
pub mod typegraph;

pub use cacheline::{cluster, CACHELINE_BITS, CACHELINE_BYTES};
pub use interval::{Interval, IntervalMap};
pub use layout::report_layouts;
pub use linemap::{annotate_declarations, build_intervals, correlate, FileStatus, LineRecord, ResolveLines, SourceFile, SourceTable};
pub use report::{
    render, report_cachelines, report_functions, report_intervals, report_locals, report_types, RenderMode,
    RenderOptions,
};
pub use typegraph::{collect_types, TypeSet};
