//! The Symbol Table Provider: object-file opening, DWARF loading, and
//! the extracted symbol model the analyses consume.
//!
//! [`SymbolTable::open`] reads the file, loads every debug section into
//! shared buffers, and runs the extraction pass once. Everything after
//! that is accessor methods over owned data, plus a lazily built
//! line-lookup context for [`ResolveLines`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::analysis::ResolveLines;
use crate::diag::DiagnosticSink;
use crate::error::{map_dwarf_error, Result, VarscopeError};
use crate::types::{Address, Function, GlobalVariable, LineHit, Module, ModuleId, TypeArena, TypeId};

mod extract;

pub(crate) type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub(crate) type OwnedDwarf = Dwarf<OwnedReader>;

const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
    (".debug_pubnames", &[".debug_pubnames", "__debug_pubnames"]),
    (".debug_pubtypes", &[".debug_pubtypes", "__debug_pubtypes"]),
    (".debug_frame", &[".debug_frame", "__debug_frame"]),
    (".debug_macro", &[".debug_macro", "__debug_macro"]),
    (".debug_names", &[".debug_names", "__debug_names"]),
    (".debug_cu_index", &[".debug_cu_index"]),
    (".debug_tu_index", &[".debug_tu_index"]),
    (".debug_sup", &[".debug_sup"]),
    (".debug_str_sup", &[".debug_str_sup"]),
];

fn load_section_bytes(file: &object::File<'_>, path: &Path, names: &[&str]) -> Result<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section.uncompressed_data().map_err(|err| VarscopeError::OpenFailed {
                path: path.display().to_string(),
                reason: format!("failed to read {name}: {err}"),
            })?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }
    Ok(Arc::<[u8]>::from(Vec::new()))
}

/// A parsed object file with its fully extracted symbol model.
///
/// All addresses are link-time addresses straight from the debug info;
/// there is no relocation or load slide.
pub struct SymbolTable
{
    path: PathBuf,
    endian: RunTimeEndian,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    context_cache: OnceCell<Context<OwnedReader>>,
    modules: Vec<Module>,
    functions: Vec<Function>,
    globals: Vec<GlobalVariable>,
    arena: TypeArena,
    standard_types: Vec<TypeId>,
}

impl SymbolTable
{
    /// Open `path` and extract its symbol model. Recoverable extraction
    /// findings go through `sink`; anything returned as `Err` is fatal.
    pub fn open(path: impl AsRef<Path>, sink: &DiagnosticSink) -> Result<Self>
    {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|err| VarscopeError::OpenFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let data = Arc::<[u8]>::from(bytes);
        let file = object::File::parse(&*data).map_err(|err| VarscopeError::OpenFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            let data = load_section_bytes(&file, &path, aliases)?;
            sections.insert(*canonical, data);
        }

        let dwarf = Dwarf::load(|section| {
            Ok::<_, gimli::Error>(section_reader(&sections, endian, section))
        })
        .map_err(|err| map_dwarf_error("loading DWARF sections", err))?;

        let extracted = extract::extract(&dwarf, sink)?;
        info!(
            target: "varscope::symtab",
            path = %path.display(),
            modules = extracted.modules.len(),
            functions = extracted.functions.len(),
            globals = extracted.globals.len(),
            types = extracted.arena.len(),
            "symbol table extracted"
        );

        Ok(Self {
            path,
            endian,
            debug_sections: sections,
            context_cache: OnceCell::new(),
            modules: extracted.modules,
            functions: extracted.functions,
            globals: extracted.globals,
            arena: extracted.arena,
            standard_types: extracted.standard_types,
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn modules(&self) -> &[Module]
    {
        &self.modules
    }

    /// Every function, failing with [`VarscopeError::NoFunctions`] when
    /// the debug info holds none.
    pub fn all_functions(&self) -> Result<&[Function]>
    {
        if self.functions.is_empty() {
            return Err(VarscopeError::NoFunctions);
        }
        Ok(&self.functions)
    }

    /// Every global variable, failing with [`VarscopeError::NoGlobals`]
    /// when the debug info holds none.
    pub fn all_global_variables(&self) -> Result<&[GlobalVariable]>
    {
        if self.globals.is_empty() {
            return Err(VarscopeError::NoGlobals);
        }
        Ok(&self.globals)
    }

    /// Unique function lookup by exact name.
    pub fn find_function(&self, name: &str) -> Result<&Function>
    {
        let mut matches = self.functions.iter().filter(|func| func.name == name);
        let Some(found) = matches.next() else {
            return Err(VarscopeError::FunctionNotFound(name.to_string()));
        };
        let rest = matches.count();
        if rest > 0 {
            return Err(VarscopeError::FunctionNotUnique {
                name: name.to_string(),
                count: rest + 1,
            });
        }
        Ok(found)
    }

    pub fn types(&self) -> &TypeArena
    {
        &self.arena
    }

    /// Arena handles of every base type, the provider's built-in and
    /// standard type catalog.
    pub fn standard_types(&self) -> &[TypeId]
    {
        &self.standard_types
    }

    /// The standard root set for reachable-type collection: global
    /// variable types, every function's local variable types, and the
    /// standard type catalog.
    ///
    /// Parameter types are deliberately left out. A method's `this`
    /// parameter points at the very type being traversed, and chasing
    /// it from the root set buys nothing a structure member edge does
    /// not already provide; a type reachable only through a parameter
    /// goes unreported.
    pub fn type_roots(&self) -> Vec<TypeId>
    {
        let mut roots: Vec<TypeId> = self.globals.iter().filter_map(|var| var.ty).collect();
        for func in &self.functions {
            roots.extend(func.locals.iter().filter_map(|var| var.ty));
        }
        roots.extend_from_slice(&self.standard_types);
        roots
    }

    fn line_context(&self) -> Result<&Context<OwnedReader>>
    {
        self.context_cache.get_or_try_init(|| {
            // addr2line shares our gimli version, so it can consume a
            // second Dwarf built over the same section buffers
            let dwarf = Dwarf::load(|section| {
                Ok::<_, gimli::Error>(section_reader(&self.debug_sections, self.endian, section))
            })
            .map_err(|err| map_dwarf_error("loading DWARF for line lookup", err))?;
            Context::from_dwarf(dwarf).map_err(|err| map_dwarf_error("building line-lookup context", err))
        })
    }
}

// the line-lookup context is opaque, so summarize instead of deriving
impl fmt::Debug for SymbolTable
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("SymbolTable")
            .field("path", &self.path)
            .field("modules", &self.modules.len())
            .field("functions", &self.functions.len())
            .field("globals", &self.globals.len())
            .field("types", &self.arena.len())
            .finish_non_exhaustive()
    }
}

fn section_reader(sections: &HashMap<&'static str, Arc<[u8]>>, endian: RunTimeEndian, id: SectionId) -> OwnedReader
{
    let data = sections
        .get(id.name())
        .cloned()
        .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
    EndianArcSlice::new(data, endian)
}

impl ResolveLines for SymbolTable
{
    /// Inline-aware line lookup through addr2line. The module argument
    /// is unused: the context spans the whole object and already knows
    /// which unit covers the address.
    fn resolve_lines(&self, _module: ModuleId, address: Address) -> Vec<LineHit>
    {
        let Ok(context) = self.line_context() else {
            return Vec::new();
        };
        let lookup = context.find_frames(address.value());
        let Ok(mut frames) = lookup.skip_all_loads() else {
            return Vec::new();
        };

        let mut hits = Vec::new();
        while let Ok(Some(frame)) = frames.next() {
            let Some(location) = frame.location else {
                continue;
            };
            let Some(file) = location.file else {
                continue;
            };
            hits.push(LineHit {
                file: file.to_string(),
                line: location.line.unwrap_or(0),
                column: location.column.unwrap_or(0),
            });
        }
        hits
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_open_rejects_missing_file()
    {
        let sink = DiagnosticSink::discard();
        let err = SymbolTable::open("/nonexistent/binary", &sink).unwrap_err();
        assert!(matches!(err, VarscopeError::OpenFailed { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_open_rejects_non_object_file()
    {
        let sink = DiagnosticSink::discard();
        // the manifest is a real file but not an object file
        let err = SymbolTable::open(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"), &sink).unwrap_err();
        assert!(matches!(err, VarscopeError::OpenFailed { .. }));
    }
}
