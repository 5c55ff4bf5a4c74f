//! Report rendering for every analysis.
//!
//! All renderers return the finished text; callers decide where it goes.
//! Annotation sets print variable names ordered by (variable name,
//! function name), so output is stable regardless of container order.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::analysis::cacheline::cluster;
use crate::analysis::interval::IntervalMap;
use crate::analysis::linemap::{ResolveLines, SourceTable};
use crate::analysis::typegraph::TypeSet;
use crate::types::{Function, GlobalVariable, LineHit, LocalVariable, Module, TypeArena, VarKey};

/// Line-report output flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode
{
    /// Full source text with inline annotations.
    #[default]
    Human,
    /// Only annotated lines, one `file:lineno` record each.
    Machine,
}

/// Options for the line report.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions
{
    pub mode: RenderMode,
    /// Include files discovered only through inlined code.
    pub verbose: bool,
}

/// Variable names for an annotation set, deterministically ordered.
fn sorted_names<'a>(functions: &'a [Function], keys: &BTreeSet<VarKey>) -> Vec<&'a str>
{
    let mut pairs: Vec<(&str, &str)> = keys
        .iter()
        .filter_map(|key| {
            let func = functions.get(key.function)?;
            let var = func.variable(key.variable)?;
            Some((var.name.as_str(), func.name.as_str()))
        })
        .collect();
    pairs.sort_unstable();
    pairs.into_iter().map(|(var, _)| var).collect()
}

fn write_names(out: &mut String, label: &str, names: &[&str])
{
    if names.is_empty() {
        return;
    }
    let _ = write!(out, " {label}: ");
    let _ = write!(out, "{}", names.join(" "));
}

/// Render the declared/available line report.
///
/// Human mode prints every line of every file with its annotations
/// inline; machine mode prints only annotated lines as
/// `file:lineno  D: names  A: names`. Inlined-only files show up only
/// with [`RenderOptions::verbose`]; unreadable files contribute their
/// header alone. Line numbers are 1-based in the output.
pub fn render(table: &SourceTable, functions: &[Function], options: RenderOptions) -> String
{
    let mut out = String::new();
    for file in table.iter() {
        if file.inlined && !options.verbose {
            continue;
        }
        if options.mode == RenderMode::Human {
            let _ = writeln!(out, "***** {}------", file.name);
        }
        let Some(lines) = file.lines.as_ref() else {
            continue;
        };
        for (index, record) in lines.iter().enumerate() {
            let lineno = index + 1;
            let decls = sorted_names(functions, &record.decls);
            let avail = sorted_names(functions, &record.avail);
            match options.mode {
                RenderMode::Human => {
                    let _ = writeln!(out, "{lineno} {}", record.text);
                    if !decls.is_empty() || !avail.is_empty() {
                        out.push_str("\t//");
                        write_names(&mut out, "Decl", &decls);
                        write_names(&mut out, "Avail", &avail);
                        out.push('\n');
                    }
                }
                RenderMode::Machine => {
                    if decls.is_empty() && avail.is_empty() {
                        continue;
                    }
                    let _ = write!(out, "{}:{lineno} ", file.name);
                    write_names(&mut out, "D", &decls);
                    write_names(&mut out, "A", &avail);
                    out.push('\n');
                }
            }
        }
    }
    out
}

/// One variable of a verbose function dump. The compiler-synthesized
/// `this` parameter has no useful declaration site, so it prints as its
/// type instead.
pub(crate) fn describe_variable(out: &mut String, var: &LocalVariable, arena: &TypeArena)
{
    if var.name == "this" {
        let type_name = var.ty.map_or("?", |ty| arena.display_name(ty));
        let _ = writeln!(out, "\tthis <{type_name}>");
    } else {
        let _ = writeln!(out, "\t{} Defined: {}:{}", var.name, var.decl_file, var.decl_line);
    }
}

/// Listing of every function: name, offset, size, module file.
pub fn report_functions(functions: &[Function], modules: &[Module]) -> String
{
    let mut out = String::new();
    for func in functions {
        let module = modules.get(func.module).map_or("", |m| m.name.as_str());
        let _ = writeln!(out, "{} {} {}b {}", func.name, func.offset, func.size, module);
    }
    out
}

/// Parameter and local dump for a single function.
pub fn report_locals(func: &Function, arena: &TypeArena) -> String
{
    let mut out = String::new();
    let _ = writeln!(out, "Func: {}", func.name);
    for var in func.variables() {
        describe_variable(&mut out, var, arena);
    }
    out
}

/// Name and size of every type in the set, in enumeration order.
pub fn report_types(arena: &TypeArena, types: &TypeSet) -> String
{
    let mut out = String::new();
    for id in types.iter() {
        match arena.display_size(id) {
            Some(size) => {
                let _ = writeln!(out, "{} {size}b", arena.display_name(id));
            }
            None => {
                let _ = writeln!(out, "{} ?b", arena.display_name(id));
            }
        }
    }
    out
}

/// Globals sorted by address with their contended cache lines.
///
/// `vars` must be sorted ascending by address. The full listing comes
/// first, then each line shared by two or more variables.
pub fn report_cachelines(vars: &[GlobalVariable], modules: &[Module], arena: &TypeArena) -> String
{
    let mut out = String::new();
    out.push_str("Globals by address:\n");
    for var in vars {
        let module = modules.get(var.module).map_or("", |m| m.name.as_str());
        let _ = write!(out, "{module}: {} {}b", var.offset, var.size);
        if let Some(ty) = var.ty {
            let _ = write!(out, " {}", arena.display_name(ty));
        }
        out.push('\n');
        for alias in &var.pretty_names {
            let _ = writeln!(out, "\t(alias {alias})");
        }
    }
    out.push_str("\nContended cache lines:\n");
    let clusters = cluster(vars);
    if clusters.is_empty() {
        out.push_str("(none)\n");
        return out;
    }
    for (number, members) in clusters.iter().enumerate() {
        let _ = writeln!(out, "Cacheline {}", number + 1);
        for &index in members {
            let var = &vars[index];
            let _ = writeln!(out, "\t{} {}b {}", var.offset, var.size, var.name);
        }
    }
    out
}

pub(crate) fn write_hits(out: &mut String, hits: &[LineHit])
{
    for hit in hits {
        let _ = write!(out, " {}:{}c{}", hit.file, hit.line, hit.column);
    }
}

/// Dump every merged location interval with its member variables.
///
/// Both endpoints resolve through the module of the representative
/// variable, the (variable name, function name)-least member of the
/// interval's set.
pub fn report_intervals(
    map: &IntervalMap,
    functions: &[Function],
    arena: &TypeArena,
    resolver: &dyn ResolveLines,
) -> String
{
    let mut out = String::new();
    for interval in map.iter() {
        let mut members: Vec<(&str, &str, VarKey)> = interval
            .vars
            .iter()
            .filter_map(|&key| {
                let func = functions.get(key.function)?;
                let var = func.variable(key.variable)?;
                Some((var.name.as_str(), func.name.as_str(), key))
            })
            .collect();
        members.sort_unstable();
        let Some(&(_, _, representative)) = members.first() else {
            continue;
        };
        let module = functions[representative.function].module;

        let _ = write!(out, "[{}", interval.low);
        write_hits(&mut out, &resolver.resolve_lines(module, interval.low));
        if interval.low != interval.high {
            let _ = write!(out, ",{}", interval.high);
            write_hits(&mut out, &resolver.resolve_lines(module, interval.high));
        }
        out.push_str("]:\n");
        for &(_, _, key) in &members {
            let func = &functions[key.function];
            if let Some(var) = func.variable(key.variable) {
                describe_interval_member(&mut out, var, arena);
            }
        }
        out.push('\n');
    }
    out
}

fn describe_interval_member(out: &mut String, var: &LocalVariable, arena: &TypeArena)
{
    if var.name == "this" {
        let type_name = var.ty.map_or("?", |ty| arena.display_name(ty));
        let _ = writeln!(out, "\tthis <{type_name}>");
        return;
    }
    let _ = write!(out, "\t{}", var.name);
    if !var.decl_file.is_empty() {
        let _ = write!(out, " [{}:{}]", var.decl_file, var.decl_line);
    }
    out.push('\n');
}
