//! Cache-line contention clustering for global variables.

use std::mem;

use crate::types::GlobalVariable;

/// Cache lines are `1 << CACHELINE_BITS` bytes wide.
pub const CACHELINE_BITS: u32 = 6;

/// Cache-line width in bytes.
pub const CACHELINE_BYTES: u64 = 1 << CACHELINE_BITS;

/// Partition globals into maximal runs that share a cache line.
///
/// `vars` must be sorted ascending by address. Returns index lists into
/// `vars`, one per contended line; a run with a single occupant carries
/// no false-sharing risk and is dropped.
pub fn cluster(vars: &[GlobalVariable]) -> Vec<Vec<usize>>
{
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut last_line: Option<u64> = None;

    for (index, var) in vars.iter().enumerate() {
        let line = var.offset.line_index(CACHELINE_BITS);
        if last_line.is_some_and(|previous| previous != line) {
            if current.len() >= 2 {
                clusters.push(mem::take(&mut current));
            } else {
                current.clear();
            }
        }
        current.push(index);
        last_line = Some(line);
    }
    if current.len() >= 2 {
        clusters.push(current);
    }
    clusters
}
