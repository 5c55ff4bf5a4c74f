//! End-to-end line-map correlation over a synthetic symbol table.
//!
//! These tests drive the full pipeline: interval building, address to
//! line correlation through a fixed resolver, declaration annotation,
//! and both report flavors, against a real (temporary) source file.

use std::collections::HashMap;
use std::io::Write;

use tempfile::NamedTempFile;
use varscope_core::analysis::{
    annotate_declarations, build_intervals, correlate, render, RenderMode, RenderOptions, ResolveLines, SourceTable,
};
use varscope_core::types::{
    Address, Function, Language, LineHit, LocalVariable, LocationRecord, Module, ModuleId, StorageClass, TypeArena,
};
use varscope_core::DiagnosticSink;

/// Resolver backed by an explicit pc-to-line table.
struct FixedLines
{
    file: String,
    lines: HashMap<u64, u32>,
}

impl ResolveLines for FixedLines
{
    fn resolve_lines(&self, _module: ModuleId, address: Address) -> Vec<LineHit>
    {
        match self.lines.get(&address.value()) {
            Some(&line) => vec![LineHit {
                file: self.file.clone(),
                line,
                column: 0,
            }],
            None => Vec::new(),
        }
    }
}

/// A twelve-line source file on disk.
fn source_file() -> NamedTempFile
{
    let mut file = NamedTempFile::new().unwrap();
    for n in 1..=12 {
        writeln!(file, "line {n} of demo").unwrap();
    }
    file.flush().unwrap();
    file
}

/// One function spanning [100, 200) with a local `x` live on [120, 150],
/// declared at line 9 of the source file.
fn fixture(path: &str) -> (Vec<Module>, Vec<Function>, FixedLines)
{
    let modules = vec![Module {
        name: path.to_string(),
        language: Language::C,
    }];
    let functions = vec![Function {
        name: "f".to_string(),
        offset: Address::new(100),
        size: 100,
        module: 0,
        parameters: Vec::new(),
        locals: vec![LocalVariable {
            name: "x".to_string(),
            decl_file: path.to_string(),
            decl_line: 9,
            ty: None,
            locations: vec![LocationRecord {
                low: Address::new(120),
                high: Address::new(150),
                class: StorageClass::RegisterOffset,
                deref: false,
                register: Some(6),
                offset: -8,
            }],
        }],
    }];

    // 120..130 -> line 10, 130..140 -> line 11, 140..=150 -> line 12
    let mut lines = HashMap::new();
    for pc in 120..=150 {
        let line = match pc {
            120..=129 => 10,
            130..=139 => 11,
            _ => 12,
        };
        lines.insert(pc, line);
    }
    let resolver = FixedLines {
        file: path.to_string(),
        lines,
    };
    (modules, functions, resolver)
}

fn run_pipeline(
    modules: &[Module],
    functions: &[Function],
    resolver: &FixedLines,
    sink: &DiagnosticSink,
) -> SourceTable
{
    let arena = TypeArena::new();
    let mut table = SourceTable::new();
    let map = build_intervals(functions, modules, &arena, &mut table, sink, None, None);
    correlate(resolver, &map, functions, &mut table, sink, false);
    annotate_declarations(functions, modules, &mut table, sink);
    table
}

#[test]
fn test_machine_report_marks_declared_and_available_lines()
{
    let file = source_file();
    let path = file.path().to_string_lossy().into_owned();
    let (modules, functions, resolver) = fixture(&path);
    let sink = DiagnosticSink::buffer();
    let table = run_pipeline(&modules, &functions, &resolver, &sink);

    let report = render(
        &table,
        &functions,
        RenderOptions {
            mode: RenderMode::Machine,
            verbose: false,
        },
    );
    assert!(report.contains(&format!("{path}:9  D: x")));
    assert!(report.contains(&format!("{path}:10  A: x")));
    assert!(report.contains(&format!("{path}:11  A: x")));
    assert!(report.contains(&format!("{path}:12  A: x")));
    assert!(!report.contains(&format!("{path}:8 ")));

    // Clean debug info, clean run
    assert_eq!(sink.emitted(), 0, "unexpected diagnostics: {:?}", sink.buffered());
}

#[test]
fn test_human_report_prints_source_with_annotations()
{
    let file = source_file();
    let path = file.path().to_string_lossy().into_owned();
    let (modules, functions, resolver) = fixture(&path);
    let sink = DiagnosticSink::buffer();
    let table = run_pipeline(&modules, &functions, &resolver, &sink);

    let report = render(&table, &functions, RenderOptions::default());
    assert!(report.contains(&format!("***** {path}------")));
    assert!(report.contains("9 line 9 of demo\n\t// Decl: x\n"));
    assert!(report.contains("10 line 10 of demo\n\t// Avail: x\n"));
    assert!(report.contains("12 line 12 of demo\n\t// Avail: x\n"));
    // Unannotated lines print bare
    assert!(report.contains("3 line 3 of demo\n4 line 4 of demo\n"));
}

#[test]
fn test_resolver_line_past_end_of_file_warns()
{
    let file = source_file();
    let path = file.path().to_string_lossy().into_owned();
    let (modules, functions, mut resolver) = fixture(&path);
    // Point one pc past the last line of the file
    resolver.lines.insert(150, 99);

    let sink = DiagnosticSink::buffer();
    let table = run_pipeline(&modules, &functions, &resolver, &sink);

    let text = sink.buffered().unwrap();
    assert!(text.contains(&format!("f:x line number out of range: {path} 99/12")));
    // The remaining pcs still annotate normally
    let report = render(
        &table,
        &functions,
        RenderOptions {
            mode: RenderMode::Machine,
            verbose: false,
        },
    );
    assert!(report.contains(&format!("{path}:10  A: x")));
}

#[test]
fn test_verbose_interval_dump_describes_variables()
{
    let file = source_file();
    let path = file.path().to_string_lossy().into_owned();
    let (modules, functions, resolver) = fixture(&path);
    let arena = TypeArena::new();
    let mut table = SourceTable::new();
    let sink = DiagnosticSink::buffer();
    let mut dump = String::new();
    let map = build_intervals(
        &functions,
        &modules,
        &arena,
        &mut table,
        &sink,
        Some(&resolver),
        Some(&mut dump),
    );

    assert!(dump.contains("Func: f"));
    assert!(dump.contains(&format!("\tx Defined: {path}:9")));
    // each raw location record lists both endpoints with their source positions
    assert!(dump.contains(&format!("\t\t[0x78 {path}:10c0,0x96 {path}:12c0]")));
    assert_eq!(map.len(), 1);
}

#[test]
fn test_unreadable_source_file_reports_header_only()
{
    let path = "/nonexistent/varscope-test/demo.c";
    let (modules, functions, resolver) = fixture(path);
    let sink = DiagnosticSink::buffer();
    let table = run_pipeline(&modules, &functions, &resolver, &sink);

    let text = sink.buffered().unwrap();
    assert!(text.contains("Problem reading source file"));

    let report = render(&table, &functions, RenderOptions::default());
    assert!(report.contains(&format!("***** {path}------")));
    assert!(!report.contains("Avail: x"));
}
