//! Source-line correlation: which lines declare which variables, and
//! which lines have a variable available according to the compiler's
//! location lists.
//!
//! Three passes over the symbol table feed one [`SourceTable`]:
//! interval building ([`build_intervals`]), availability correlation
//! ([`correlate`]), and declaration annotation
//! ([`annotate_declarations`]). Rendering lives in
//! [`crate::analysis::report`].

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;

use tracing::debug;

use crate::analysis::interval::IntervalMap;
use crate::analysis::report::{describe_variable, write_hits};
use crate::diag::DiagnosticSink;
use crate::types::{Address, Function, Language, LineHit, Module, ModuleId, TypeArena, VarKey};

/// Line-table lookup seam.
///
/// The production implementation sits on the symbol table's line-table
/// context; tests drive the correlator with a synthetic resolver.
pub trait ResolveLines
{
    /// Every (file, line, column) the line table records for `address`.
    /// Inlining can attribute one address to several source positions;
    /// an empty result means the table has nothing for this address.
    fn resolve_lines(&self, module: ModuleId, address: Address) -> Vec<LineHit>;
}

/// One source line with its annotation sets.
#[derive(Debug, Default)]
pub struct LineRecord
{
    pub text: String,
    pub decls: BTreeSet<VarKey>,
    pub avail: BTreeSet<VarKey>,
}

impl LineRecord
{
    fn new(text: &str) -> Self
    {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

/// A referenced source file. `lines` is `None` when the file could not
/// be read; the name is still tracked so later passes can tell
/// "unreadable" apart from "never referenced".
#[derive(Debug)]
pub struct SourceFile
{
    pub name: String,
    /// Discovered only through a line-table hit, never as a function's
    /// primary compilation-unit file.
    pub inlined: bool,
    pub lines: Option<Vec<LineRecord>>,
}

/// What the table knows about a file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus
{
    Unknown,
    Unreadable,
    Loaded,
}

/// Every referenced source file, fully buffered, in discovery order.
#[derive(Debug, Default)]
pub struct SourceTable
{
    files: Vec<SourceFile>,
    index: HashMap<String, usize>,
}

impl SourceTable
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Register `name` as a primary source file, reading it now. A
    /// repeat registration is a no-op; a failed read is reported through
    /// `sink` and remembered as unreadable.
    pub fn seed(&mut self, name: &str, sink: &DiagnosticSink)
    {
        if self.index.contains_key(name) {
            return;
        }
        let lines = read_lines(name, sink);
        self.insert(name, false, lines);
    }

    /// Register `name` as an inlined-only file, reading it now. Returns
    /// whether the file's lines are loaded.
    pub fn pull_inlined(&mut self, name: &str, sink: &DiagnosticSink) -> bool
    {
        if let Some(&index) = self.index.get(name) {
            return self.files[index].lines.is_some();
        }
        let lines = read_lines(name, sink);
        let loaded = lines.is_some();
        self.insert(name, true, lines);
        loaded
    }

    /// Register `name` with in-memory content instead of reading the
    /// filesystem. Used by tests and embedders.
    pub fn seed_with_text(&mut self, name: &str, text: &str)
    {
        if self.index.contains_key(name) {
            return;
        }
        let lines = text.lines().map(LineRecord::new).collect();
        self.insert(name, false, Some(lines));
    }

    fn insert(&mut self, name: &str, inlined: bool, lines: Option<Vec<LineRecord>>)
    {
        self.index.insert(name.to_string(), self.files.len());
        self.files.push(SourceFile {
            name: name.to_string(),
            inlined,
            lines,
        });
    }

    pub fn status(&self, name: &str) -> FileStatus
    {
        match self.index.get(name) {
            None => FileStatus::Unknown,
            Some(&index) if self.files[index].lines.is_none() => FileStatus::Unreadable,
            Some(_) => FileStatus::Loaded,
        }
    }

    /// Line count of a loaded file.
    pub fn line_count(&self, name: &str) -> Option<usize>
    {
        let &index = self.index.get(name)?;
        self.files[index].lines.as_ref().map(Vec::len)
    }

    /// Mutable access to a loaded file's 0-based line record.
    pub fn record_mut(&mut self, name: &str, line_index: usize) -> Option<&mut LineRecord>
    {
        let &index = self.index.get(name)?;
        self.files[index].lines.as_mut()?.get_mut(line_index)
    }

    /// Files in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, SourceFile>
    {
        self.files.iter()
    }

    pub fn len(&self) -> usize
    {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.files.is_empty()
    }
}

fn read_lines(name: &str, sink: &DiagnosticSink) -> Option<Vec<LineRecord>>
{
    match fs::read_to_string(name) {
        Ok(text) => Some(text.lines().map(LineRecord::new).collect()),
        Err(err) => {
            sink.warn(format!("Error: Problem reading source file {name}. Skipping: {err}"));
            None
        }
    }
}

/// Build the merged location-interval map for every function-scoped
/// variable, seeding `table` with each primary source file on the way.
///
/// Functions in modules of unknown language are skipped whole. A
/// location record with a zero low bound or an all-ones high bound is
/// corrupt debug info and is dropped with a warning; a record outside
/// its function's byte range is warned about but still inserted. With
/// `verbose`, a per-function variable and location-record dump is
/// appended to the supplied buffer; record endpoints resolve to source
/// positions through `resolver` when one is supplied.
pub fn build_intervals(
    functions: &[Function],
    modules: &[Module],
    arena: &TypeArena,
    table: &mut SourceTable,
    sink: &DiagnosticSink,
    resolver: Option<&dyn ResolveLines>,
    mut verbose: Option<&mut String>,
) -> IntervalMap
{
    let mut map = IntervalMap::new();
    for (function_index, func) in functions.iter().enumerate() {
        let module = &modules[func.module];
        if module.name.is_empty() {
            sink.warn(format!(
                "DWARF Warning: Function {} has an empty filename in its module.",
                func.name
            ));
        } else {
            debug!(target: "varscope::linemap", function = %func.name, module = %module.name, "seeding module file");
            if module.language == Language::Unknown {
                sink.warn(format!("DWARF Warning: {} is of unknown type. Skipping.", module.name));
                continue;
            }
            table.seed(&module.name, sink);
        }
        if let Some(out) = verbose.as_deref_mut() {
            let _ = writeln!(out, "\nFunc: {}", func.name);
        }
        for (variable_index, var) in func.variables().enumerate() {
            if var.decl_file.is_empty() {
                sink.warn(format!(
                    "DWARF Warning: Variable {}:{} has an empty filename.",
                    func.name, var.name
                ));
            } else {
                table.seed(&var.decl_file, sink);
            }
            if let Some(out) = verbose.as_deref_mut() {
                describe_variable(out, var, arena);
            }
            let key = VarKey {
                function: function_index,
                variable: variable_index,
            };
            for record in &var.locations {
                if let Some(out) = verbose.as_deref_mut() {
                    let _ = write!(out, "\t\t[{}", record.low);
                    if let Some(resolver) = resolver {
                        write_hits(out, &resolver.resolve_lines(func.module, record.low));
                    }
                    let _ = write!(out, ",{}", record.high);
                    if let Some(resolver) = resolver {
                        write_hits(out, &resolver.resolve_lines(func.module, record.high));
                    }
                    out.push_str("]\n");
                }
                if record.low == Address::ZERO || record.high == Address::MAX {
                    sink.warn(format!(
                        "DWARF Warning: Location List for {} from {} seems insane [{},{}]: skipping",
                        var.name, func.name, record.low, record.high
                    ));
                    continue;
                }
                if record.low < func.offset || record.high > func.end() {
                    let stray = if record.low < func.offset { record.low } else { record.high };
                    sink.warn(format!(
                        "DWARF Warning: Location {} for {} from {} is out of range for the function [{},{}].",
                        stray,
                        var.name,
                        func.name,
                        func.offset,
                        func.end()
                    ));
                }
                map.insert_pair(record.low, record.high, key);
            }
        }
    }
    map
}

/// Mark every variable of every merged interval "available" on each
/// source line the interval's addresses resolve to.
///
/// The address scan is linear over each closed interval: one interval
/// can cross several source lines and the line table is not assumed
/// monotonic. Files first discovered here are read on the spot and
/// flagged inlined-only.
pub fn correlate(
    resolver: &dyn ResolveLines,
    map: &IntervalMap,
    functions: &[Function],
    table: &mut SourceTable,
    sink: &DiagnosticSink,
    verbose: bool,
)
{
    for interval in map.iter() {
        for &key in interval.vars {
            let func = &functions[key.function];
            let Some(var) = func.variable(key.variable) else {
                continue;
            };
            for pc in interval.low.value()..=interval.high.value() {
                let pc = Address::new(pc);
                let hits = resolver.resolve_lines(func.module, pc);
                if hits.is_empty() {
                    sink.warn(format!("DWARF Warning: No line info for {pc}"));
                    continue;
                }
                for hit in hits {
                    match table.status(&hit.file) {
                        FileStatus::Unknown => {
                            if verbose {
                                sink.warn(format!("Info: pulling in unreferenced file {}", hit.file));
                            }
                            if !table.pull_inlined(&hit.file, sink) {
                                continue;
                            }
                        }
                        FileStatus::Unreadable => continue,
                        FileStatus::Loaded => {}
                    }
                    let Some(count) = table.line_count(&hit.file) else {
                        continue;
                    };
                    let line = hit.line as usize;
                    if (1..=count).contains(&line) {
                        if let Some(record) = table.record_mut(&hit.file, line - 1) {
                            record.avail.insert(key);
                        }
                    } else {
                        sink.warn(format!(
                            "DWARF Warning: {}:{} line number out of range: {} {}/{}",
                            func.name, var.name, hit.file, hit.line, count
                        ));
                    }
                }
            }
        }
    }
}

/// Mark every variable "declared" on its declaration line.
///
/// Declarations live at 1-based line `L`, stored at 0-based index
/// `L - 1`; `L == 0`, negative `L`, and `L` past end-of-file are
/// rejected with a warning and no table mutation. A declaration file
/// that disagrees with the function's compilation-unit file is reported
/// either as a provider path-loss defect (equal base names) or as a
/// genuine cross-file declaration.
pub fn annotate_declarations(
    functions: &[Function],
    modules: &[Module],
    table: &mut SourceTable,
    sink: &DiagnosticSink,
)
{
    for (function_index, func) in functions.iter().enumerate() {
        let module = &modules[func.module];
        for (variable_index, var) in func.variables().enumerate() {
            match table.status(&var.decl_file) {
                FileStatus::Unknown if var.decl_file.is_empty() => {
                    sink.warn(format!(
                        "DWARF Warning: variable {}:{} declared in a file with no name.",
                        func.name, var.name
                    ));
                    continue;
                }
                FileStatus::Unknown => {
                    sink.warn(format!(
                        "DWARF Warning: variable {}:{} declared in an unknown file {}.",
                        func.name, var.name, var.decl_file
                    ));
                    continue;
                }
                FileStatus::Unreadable => {
                    sink.warn(format!(
                        "Warning: variable {}:{} declared in a file {} that could not be read.",
                        func.name, var.name, var.decl_file
                    ));
                    continue;
                }
                FileStatus::Loaded => {}
            }
            if module.name != var.decl_file {
                let basename = var.decl_file.rsplit('/').next().unwrap_or_default();
                if basename == module.name {
                    sink.warn(format!("Symtab bug: module name missing path for {}.", var.decl_file));
                } else {
                    sink.warn(format!(
                        "DWARF Warning: {} is from {} in CU {} but was declared in {}.",
                        var.name, func.name, module.name, var.decl_file
                    ));
                }
            }
            if var.decl_line == 0 {
                sink.warn(format!(
                    "DWARF Warning: variable {}:{} declared on line 0. skipping.",
                    func.name, var.name
                ));
                continue;
            }
            if var.decl_line < 0 {
                sink.warn(format!(
                    "DWARF Warning: variable {}:{} declared on negative line number {}. skipping.",
                    func.name, var.name, var.decl_line
                ));
                continue;
            }
            let Ok(line) = usize::try_from(var.decl_line) else {
                continue;
            };
            let Some(count) = table.line_count(&var.decl_file) else {
                continue;
            };
            if line > count {
                sink.warn(format!(
                    "DWARF Warning: variable {}:{} declared line number {} but file {} only has {} lines. skipping.",
                    func.name, var.name, var.decl_line, var.decl_file, count
                ));
                continue;
            }
            if let Some(record) = table.record_mut(&var.decl_file, line - 1) {
                record.decls.insert(VarKey {
                    function: function_index,
                    variable: variable_index,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{LocalVariable, LocationRecord, StorageClass};

    const FILE: &str = "demo.c";

    fn module() -> Module
    {
        Module {
            name: FILE.to_string(),
            language: Language::C,
        }
    }

    fn local(name: &str, decl_line: i64, locations: Vec<LocationRecord>) -> LocalVariable
    {
        LocalVariable {
            name: name.to_string(),
            decl_file: FILE.to_string(),
            decl_line,
            ty: None,
            locations,
        }
    }

    fn function(name: &str, locals: Vec<LocalVariable>) -> Function
    {
        Function {
            name: name.to_string(),
            offset: Address::new(100),
            size: 100,
            module: 0,
            parameters: Vec::new(),
            locals,
        }
    }

    fn record(low: u64, high: u64) -> LocationRecord
    {
        LocationRecord {
            low: Address::new(low),
            high: Address::new(high),
            class: StorageClass::RegisterOffset,
            deref: false,
            register: None,
            offset: -8,
        }
    }

    fn five_line_table() -> SourceTable
    {
        let mut table = SourceTable::new();
        table.seed_with_text(FILE, "a\nb\nc\nd\ne\n");
        table
    }

    fn decl_lines(table: &SourceTable) -> Vec<usize>
    {
        let file = table.iter().next().unwrap();
        file.lines
            .as_ref()
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.decls.is_empty())
            .map(|(index, _)| index)
            .collect()
    }

    #[test]
    fn test_declaration_line_round_trip()
    {
        let functions = vec![function("f", vec![local("x", 3, Vec::new())])];
        let modules = vec![module()];
        let mut table = five_line_table();
        let sink = DiagnosticSink::buffer();
        annotate_declarations(&functions, &modules, &mut table, &sink);
        // 1-based line 3 lands at 0-based index 2
        assert_eq!(decl_lines(&table), vec![2]);
        assert_eq!(sink.emitted(), 0);
    }

    #[test]
    fn test_last_line_of_file_accepted()
    {
        let functions = vec![function("f", vec![local("x", 5, Vec::new())])];
        let modules = vec![module()];
        let mut table = five_line_table();
        let sink = DiagnosticSink::buffer();
        annotate_declarations(&functions, &modules, &mut table, &sink);
        assert_eq!(decl_lines(&table), vec![4]);
        assert_eq!(sink.emitted(), 0);
    }

    #[test]
    fn test_bad_declaration_lines_rejected()
    {
        for bad in [0, -7, 6] {
            let functions = vec![function("f", vec![local("x", bad, Vec::new())])];
            let modules = vec![module()];
            let mut table = five_line_table();
            let sink = DiagnosticSink::buffer();
            annotate_declarations(&functions, &modules, &mut table, &sink);
            assert!(decl_lines(&table).is_empty(), "line {bad} must be rejected");
            assert_eq!(sink.emitted(), 1, "line {bad} must warn");
        }
    }

    #[test]
    fn test_basename_match_reports_path_loss()
    {
        let mut var = local("x", 1, Vec::new());
        var.decl_file = "/src/demo.c".to_string();
        let functions = vec![function("f", vec![var])];
        let modules = vec![module()];
        let mut table = SourceTable::new();
        table.seed_with_text("/src/demo.c", "a\n");
        let sink = DiagnosticSink::buffer();
        annotate_declarations(&functions, &modules, &mut table, &sink);
        let text = sink.buffered().unwrap();
        assert!(text.contains("Symtab bug: module name missing path for /src/demo.c."));
    }

    #[test]
    fn test_basename_mismatch_reports_cross_file_declaration()
    {
        let mut var = local("x", 1, Vec::new());
        var.decl_file = "/src/other.h".to_string();
        let functions = vec![function("f", vec![var])];
        let modules = vec![module()];
        let mut table = SourceTable::new();
        table.seed_with_text("/src/other.h", "a\n");
        let sink = DiagnosticSink::buffer();
        annotate_declarations(&functions, &modules, &mut table, &sink);
        let text = sink.buffered().unwrap();
        assert!(text.contains("x is from f in CU demo.c but was declared in /src/other.h."));
    }

    #[test]
    fn test_sentinel_locations_never_reach_the_map()
    {
        let locals = vec![local("x", 1, vec![record(0, 150), record(120, u64::MAX), record(120, 150)])];
        let functions = vec![function("f", locals)];
        let modules = vec![module()];
        let mut table = five_line_table();
        let sink = DiagnosticSink::buffer();
        let map = build_intervals(&functions, &modules, &TypeArena::new(), &mut table, &sink, None, None);

        let stored: Vec<(u64, u64)> = map.iter().map(|iv| (iv.low.value(), iv.high.value())).collect();
        assert_eq!(stored, vec![(120, 150)]);
        let warnings = sink.buffered().unwrap();
        assert_eq!(warnings.matches("seems insane").count(), 2);
    }

    #[test]
    fn test_out_of_function_range_warns_but_inserts()
    {
        // function body is [100, 200); the record reaches past it
        let locals = vec![local("x", 1, vec![record(150, 300)])];
        let functions = vec![function("f", locals)];
        let modules = vec![module()];
        let mut table = five_line_table();
        let sink = DiagnosticSink::buffer();
        let map = build_intervals(&functions, &modules, &TypeArena::new(), &mut table, &sink, None, None);

        assert_eq!(map.len(), 1);
        assert!(sink.buffered().unwrap().contains("is out of range for the function"));
    }

    #[test]
    fn test_unknown_language_module_skipped_whole()
    {
        let locals = vec![local("x", 1, vec![record(120, 150)])];
        let functions = vec![function("f", locals)];
        let modules = vec![Module {
            name: "mystery.adb".to_string(),
            language: Language::Unknown,
        }];
        let mut table = SourceTable::new();
        let sink = DiagnosticSink::buffer();
        let map = build_intervals(&functions, &modules, &TypeArena::new(), &mut table, &sink, None, None);

        assert!(map.is_empty());
        assert!(table.is_empty());
        assert!(sink.buffered().unwrap().contains("is of unknown type. Skipping."));
    }

    struct FixedResolver(Vec<(u64, u32)>);

    impl ResolveLines for FixedResolver
    {
        fn resolve_lines(&self, _module: ModuleId, address: Address) -> Vec<LineHit>
        {
            self.0
                .iter()
                .filter(|(pc, _)| *pc == address.value())
                .map(|(_, line)| LineHit {
                    file: FILE.to_string(),
                    line: *line,
                    column: 0,
                })
                .collect()
        }
    }

    #[test]
    fn test_verbose_dump_lists_location_records_with_endpoints()
    {
        let locals = vec![local("x", 1, vec![record(120, 150)])];
        let functions = vec![function("f", locals)];
        let mut table = five_line_table();
        let sink = DiagnosticSink::discard();
        let resolver = FixedResolver(vec![(120, 2), (150, 4)]);
        let mut dump = String::new();
        build_intervals(
            &functions,
            &[module()],
            &TypeArena::new(),
            &mut table,
            &sink,
            Some(&resolver),
            Some(&mut dump),
        );

        assert!(dump.contains("\nFunc: f\n"));
        assert!(dump.contains("\t\t[0x78 demo.c:2c0,0x96 demo.c:4c0]\n"));
    }

    #[test]
    fn test_verbose_dump_without_resolver_prints_raw_endpoints()
    {
        let locals = vec![local("x", 1, vec![record(120, 150)])];
        let functions = vec![function("f", locals)];
        let mut table = five_line_table();
        let sink = DiagnosticSink::discard();
        let mut dump = String::new();
        build_intervals(
            &functions,
            &[module()],
            &TypeArena::new(),
            &mut table,
            &sink,
            None,
            Some(&mut dump),
        );

        assert!(dump.contains("\t\t[0x78,0x96]\n"));
    }

    #[test]
    fn test_out_of_range_resolved_line_warns()
    {
        let locals = vec![local("x", 1, vec![record(120, 120)])];
        let functions = vec![function("f", locals)];
        let mut table = five_line_table();
        let sink = DiagnosticSink::discard();
        let map = build_intervals(
            &functions,
            &[module()],
            &TypeArena::new(),
            &mut table,
            &sink,
            None,
            None,
        );

        let resolver = FixedResolver(vec![(120, 9)]);
        let sink = DiagnosticSink::buffer();
        correlate(&resolver, &map, &functions, &mut table, &sink, false);
        assert!(sink.buffered().unwrap().contains("f:x line number out of range: demo.c 9/5"));
    }
}
