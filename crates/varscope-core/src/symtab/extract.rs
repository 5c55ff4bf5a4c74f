//! One-shot DWARF extraction pass.
//!
//! Walks every compilation unit once and materializes the whole symbol
//! model: modules, functions with their parameters and locals, globals
//! with fixed addresses, and the shared type arena. Everything the
//! analytic passes touch afterwards is plain owned data; no gimli
//! cursor survives past this pass.

use std::collections::HashMap;

use gimli::{
    constants, Attribute, AttributeValue, DebuggingInformationEntry, DwLang, EntriesTreeNode, Expression, Operation,
    Reader, Unit, UnitOffset, UnitSectionOffset,
};
use rustc_demangle::try_demangle;
use tracing::debug;

use crate::diag::DiagnosticSink;
use crate::error::{map_dwarf_error, Result};
use crate::symtab::{OwnedDwarf, OwnedReader};
use crate::types::{
    Address, Function, GlobalVariable, Language, LocalVariable, LocationRecord, Member, Module, ModuleId,
    StorageClass, TypeArena, TypeClass, TypeId, TypeNode,
};

type Die<'abbrev, 'unit> = DebuggingInformationEntry<'abbrev, 'unit, OwnedReader>;

/// Everything one extraction run produces.
pub(crate) struct Extracted
{
    pub modules: Vec<Module>,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalVariable>,
    pub arena: TypeArena,
    pub standard_types: Vec<TypeId>,
}

/// Parse every unit header up front so the extractor can chase
/// cross-unit type references by section offset.
fn collect_units(dwarf: &OwnedDwarf) -> Result<Vec<Unit<OwnedReader>>>
{
    let mut units = Vec::new();
    let mut headers = dwarf.units();
    while let Some(header) = headers
        .next()
        .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
    {
        units.push(
            dwarf
                .unit(header)
                .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
        );
    }
    Ok(units)
}

pub(crate) fn extract(dwarf: &OwnedDwarf, sink: &DiagnosticSink) -> Result<Extracted>
{
    let units = collect_units(dwarf)?;
    let mut extractor = Extractor {
        dwarf,
        units: &units,
        sink,
        modules: Vec::new(),
        functions: Vec::new(),
        globals: Vec::new(),
        arena: TypeArena::new(),
        type_memo: HashMap::new(),
    };
    extractor.run()?;

    let standard_types = extractor
        .arena
        .iter()
        .filter(|(_, node)| matches!(node.class, TypeClass::Base))
        .map(|(id, _)| id)
        .collect();

    Ok(Extracted {
        modules: extractor.modules,
        functions: extractor.functions,
        globals: extractor.globals,
        arena: extractor.arena,
        standard_types,
    })
}

struct Extractor<'a>
{
    dwarf: &'a OwnedDwarf,
    units: &'a [Unit<OwnedReader>],
    sink: &'a DiagnosticSink,
    modules: Vec<Module>,
    functions: Vec<Function>,
    globals: Vec<GlobalVariable>,
    arena: TypeArena,
    type_memo: HashMap<UnitSectionOffset<usize>, TypeId>,
}

fn attr<'abbrev, 'unit>(
    entry: &Die<'abbrev, 'unit>,
    name: constants::DwAt,
    context: &'static str,
) -> Result<Option<Attribute<OwnedReader>>>
{
    entry.attr(name).map_err(|err| map_dwarf_error(context, err))
}

fn map_language(lang: DwLang) -> Language
{
    match lang {
        constants::DW_LANG_C | constants::DW_LANG_C89 | constants::DW_LANG_C99 | constants::DW_LANG_C11 => Language::C,
        constants::DW_LANG_C_plus_plus
        | constants::DW_LANG_C_plus_plus_03
        | constants::DW_LANG_C_plus_plus_11
        | constants::DW_LANG_C_plus_plus_14 => Language::Cpp,
        constants::DW_LANG_Rust => Language::Rust,
        constants::DW_LANG_Fortran77 | constants::DW_LANG_Fortran90 | constants::DW_LANG_Fortran95 => Language::Fortran,
        _ => Language::Unknown,
    }
}

fn demangle_or_raw(raw: &str) -> String
{
    try_demangle(raw).map_or_else(|_| raw.to_string(), |d| d.to_string())
}

impl Extractor<'_>
{
    fn run(&mut self) -> Result<()>
    {
        let units = self.units;
        for (unit_index, unit) in units.iter().enumerate() {
            let module = self.build_module(unit_index)?;
            debug!(target: "varscope::symtab", module = %module.name, language = %module.language, "extracting unit");
            self.modules.push(module);
            let module_id = self.modules.len() - 1;

            let mut tree = unit
                .entries_tree(None)
                .map_err(|err| map_dwarf_error("building unit tree", err))?;
            let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
            self.walk_scope(unit_index, root, module_id)?;
        }
        Ok(())
    }

    fn build_module(&mut self, unit_index: usize) -> Result<Module>
    {
        let unit = &self.units[unit_index];
        let mut entries = unit.entries();
        let Some((_, root)) = entries
            .next_dfs()
            .map_err(|err| map_dwarf_error("reading unit root DIE", err))?
        else {
            return Ok(Module {
                name: String::new(),
                language: Language::Unknown,
            });
        };

        let mut name = match attr(root, constants::DW_AT_name, "reading unit name")? {
            Some(value) => self.attr_to_string(unit_index, value.value())?,
            None => String::new(),
        };
        if !name.is_empty() && !name.starts_with('/') {
            if let Some(dir) = unit.comp_dir.as_ref() {
                if let Ok(dir) = dir.to_string_lossy() {
                    name = format!("{dir}/{name}");
                }
            }
        }

        let language = match attr(root, constants::DW_AT_language, "reading unit language")? {
            Some(value) => match value.value() {
                AttributeValue::Language(lang) => map_language(lang),
                _ => Language::Unknown,
            },
            None => Language::Unknown,
        };

        Ok(Module { name, language })
    }

    /// Scan a CU, namespace, or type scope for functions and globals.
    fn walk_scope(
        &mut self,
        unit_index: usize,
        node: EntriesTreeNode<'_, '_, '_, OwnedReader>,
        module: ModuleId,
    ) -> Result<()>
    {
        let mut children = node.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating scope children", err))?
        {
            match child.entry().tag() {
                constants::DW_TAG_subprogram => self.visit_subprogram(unit_index, child, module)?,
                constants::DW_TAG_variable => {
                    let entry = child.entry().clone();
                    self.visit_global(unit_index, &entry, module)?;
                }
                constants::DW_TAG_namespace
                | constants::DW_TAG_structure_type
                | constants::DW_TAG_class_type => self.walk_scope(unit_index, child, module)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn visit_subprogram(
        &mut self,
        unit_index: usize,
        node: EntriesTreeNode<'_, '_, '_, OwnedReader>,
        module: ModuleId,
    ) -> Result<()>
    {
        let entry = node.entry().clone();
        // declarations and abstract inline roots carry no code
        let Some(offset) = self.entry_low_pc(unit_index, &entry)? else {
            return Ok(());
        };
        let size = self.entry_code_size(&entry, offset)?;
        let name = self.entry_name(unit_index, &entry)?.unwrap_or_default();

        let mut parameters = Vec::new();
        let mut locals = Vec::new();
        self.collect_function_vars(unit_index, node, &name, offset, size, &mut parameters, &mut locals)?;

        self.functions.push(Function {
            name,
            offset,
            size,
            module,
            parameters,
            locals,
        });
        Ok(())
    }

    /// Parameters and locals of one subprogram, descending through
    /// lexical blocks at any depth. Inlined subroutines are skipped:
    /// their variables belong to the abstract origin, not this body.
    fn collect_function_vars(
        &mut self,
        unit_index: usize,
        node: EntriesTreeNode<'_, '_, '_, OwnedReader>,
        func_name: &str,
        func_offset: Address,
        func_size: u64,
        parameters: &mut Vec<LocalVariable>,
        locals: &mut Vec<LocalVariable>,
    ) -> Result<()>
    {
        let mut children = node.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating subprogram children", err))?
        {
            match child.entry().tag() {
                constants::DW_TAG_formal_parameter => {
                    let entry = child.entry().clone();
                    if let Some(var) = self.build_local(unit_index, &entry, func_name, func_offset, func_size)? {
                        parameters.push(var);
                    }
                }
                constants::DW_TAG_variable => {
                    let entry = child.entry().clone();
                    if let Some(var) = self.build_local(unit_index, &entry, func_name, func_offset, func_size)? {
                        locals.push(var);
                    }
                }
                constants::DW_TAG_lexical_block => {
                    self.collect_function_vars(unit_index, child, func_name, func_offset, func_size, parameters, locals)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn build_local(
        &mut self,
        unit_index: usize,
        entry: &Die<'_, '_>,
        func_name: &str,
        func_offset: Address,
        func_size: u64,
    ) -> Result<Option<LocalVariable>>
    {
        let Some(name) = self.entry_name(unit_index, entry)? else {
            return Ok(None);
        };

        let decl_file = match attr(entry, constants::DW_AT_decl_file, "reading DW_AT_decl_file")? {
            Some(value) => match value.udata_value() {
                Some(index) => self.file_path(unit_index, index)?.unwrap_or_default(),
                None => String::new(),
            },
            None => String::new(),
        };
        let decl_line = attr(entry, constants::DW_AT_decl_line, "reading DW_AT_decl_line")?
            .and_then(|value| value.sdata_value().or_else(|| value.udata_value().and_then(|u| i64::try_from(u).ok())))
            .unwrap_or(0);

        let ty = self.entry_type(unit_index, entry)?;
        let locations = self.parse_locations(unit_index, entry, &name, func_name, func_offset, func_size)?;

        Ok(Some(LocalVariable {
            name,
            decl_file,
            decl_line,
            ty,
            locations,
        }))
    }

    fn visit_global(&mut self, unit_index: usize, entry: &Die<'_, '_>, module: ModuleId) -> Result<()>
    {
        let unit = &self.units[unit_index];
        let Some(location) = attr(entry, constants::DW_AT_location, "reading global location")? else {
            return Ok(());
        };
        // only variables pinned to a link-time address count as globals
        let AttributeValue::Exprloc(expression) = location.value() else {
            return Ok(());
        };
        let mut operations = expression.operations(unit.encoding());
        let Ok(Some(Operation::Address { address })) = operations.next() else {
            return Ok(());
        };

        let Some(name) = self.entry_name(unit_index, entry)? else {
            return Ok(());
        };
        let mut pretty_names = Vec::new();
        if let Some(value) = attr(entry, constants::DW_AT_linkage_name, "reading linkage name")? {
            let linkage = self.attr_to_string(unit_index, value.value())?;
            let pretty = demangle_or_raw(&linkage);
            if pretty != name {
                pretty_names.push(pretty);
            }
        }

        let ty = self.entry_type(unit_index, entry)?;
        let size = ty.and_then(|id| self.arena.display_size(id)).unwrap_or(0);

        self.globals.push(GlobalVariable {
            name,
            pretty_names,
            offset: Address::new(address),
            size,
            ty,
            module,
        });
        Ok(())
    }

    fn parse_locations(
        &mut self,
        unit_index: usize,
        entry: &Die<'_, '_>,
        var_name: &str,
        func_name: &str,
        func_offset: Address,
        func_size: u64,
    ) -> Result<Vec<LocationRecord>>
    {
        let unit = &self.units[unit_index];
        let Some(location) = attr(entry, constants::DW_AT_location, "reading DW_AT_location")? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        match location.value() {
            AttributeValue::Exprloc(expression) => {
                // a single-location description covers the whole body
                let high = func_offset.saturating_add(func_size.saturating_sub(1));
                match decode_expression(&expression, unit) {
                    Some((class, deref, register, offset)) => records.push(LocationRecord {
                        low: func_offset,
                        high,
                        class,
                        deref,
                        register,
                        offset,
                    }),
                    None => self.sink.warn(format!(
                        "DWARF Warning: could not decode location for {func_name}:{var_name}: skipping"
                    )),
                }
            }
            value => {
                let Some(mut entries) = self
                    .dwarf
                    .attr_locations(unit, value)
                    .map_err(|err| map_dwarf_error("resolving location list", err))?
                else {
                    return Ok(records);
                };
                loop {
                    let entry = match entries.next() {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break,
                        Err(err) => {
                            self.sink.warn(format!(
                                "DWARF Warning: bad location list for {func_name}:{var_name}: {err}: skipping rest"
                            ));
                            break;
                        }
                    };
                    let Some((class, deref, register, offset)) = decode_expression(&entry.data, unit) else {
                        self.sink.warn(format!(
                            "DWARF Warning: could not decode location for {func_name}:{var_name}: skipping"
                        ));
                        continue;
                    };
                    records.push(LocationRecord {
                        low: Address::new(entry.range.begin),
                        high: Address::new(entry.range.end),
                        class,
                        deref,
                        register,
                        offset,
                    });
                }
            }
        }
        Ok(records)
    }

    fn entry_low_pc(&self, unit_index: usize, entry: &Die<'_, '_>) -> Result<Option<Address>>
    {
        let unit = &self.units[unit_index];
        let Some(value) = attr(entry, constants::DW_AT_low_pc, "reading DW_AT_low_pc")? else {
            return Ok(None);
        };
        match value.value() {
            AttributeValue::Addr(address) => Ok(Some(Address::new(address))),
            AttributeValue::DebugAddrIndex(index) => {
                let address = self
                    .dwarf
                    .address(unit, index)
                    .map_err(|err| map_dwarf_error("resolving .debug_addr entry", err))?;
                Ok(Some(Address::new(address)))
            }
            _ => Ok(None),
        }
    }

    fn entry_code_size(&self, entry: &Die<'_, '_>, low: Address) -> Result<u64>
    {
        let Some(value) = attr(entry, constants::DW_AT_high_pc, "reading DW_AT_high_pc")? else {
            return Ok(0);
        };
        match value.value() {
            AttributeValue::Addr(end) => Ok(end.saturating_sub(low.value())),
            other => Ok(other.udata_value().unwrap_or(0)),
        }
    }

    /// Direct name, then linkage name demangled, then one hop through a
    /// specification or abstract-origin reference.
    fn entry_name(&self, unit_index: usize, entry: &Die<'_, '_>) -> Result<Option<String>>
    {
        let unit = &self.units[unit_index];
        if let Some(value) = attr(entry, constants::DW_AT_name, "reading DW_AT_name")? {
            return Ok(Some(self.attr_to_string(unit_index, value.value())?));
        }
        if let Some(value) = attr(entry, constants::DW_AT_linkage_name, "reading DW_AT_linkage_name")? {
            let raw = self.attr_to_string(unit_index, value.value())?;
            return Ok(Some(demangle_or_raw(&raw)));
        }
        for reference in [constants::DW_AT_specification, constants::DW_AT_abstract_origin] {
            let Some(value) = attr(entry, reference, "reading DIE reference")? else {
                continue;
            };
            let AttributeValue::UnitRef(offset) = value.value() else {
                continue;
            };
            let target = unit
                .entry(offset)
                .map_err(|err| map_dwarf_error("resolving DIE reference", err))?;
            if let Some(value) = attr(&target, constants::DW_AT_name, "reading referenced name")? {
                return Ok(Some(self.attr_to_string(unit_index, value.value())?));
            }
            if let Some(value) = attr(&target, constants::DW_AT_linkage_name, "reading referenced linkage name")? {
                let raw = self.attr_to_string(unit_index, value.value())?;
                return Ok(Some(demangle_or_raw(&raw)));
            }
        }
        Ok(None)
    }

    fn attr_to_string(&self, unit_index: usize, value: AttributeValue<OwnedReader>) -> Result<String>
    {
        let unit = &self.units[unit_index];
        let reader = self
            .dwarf
            .attr_string(unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(owned)
    }

    /// Full path for a line-program file index, joined against the
    /// file's directory and the unit's compilation directory.
    fn file_path(&self, unit_index: usize, index: u64) -> Result<Option<String>>
    {
        let unit = &self.units[unit_index];
        let Some(program) = unit.line_program.as_ref() else {
            return Ok(None);
        };
        let header = program.header();
        let Some(file) = header.file(index) else {
            return Ok(None);
        };

        let mut path = String::new();
        if let Some(directory) = file.directory(header) {
            path = self.attr_to_string(unit_index, directory)?;
        }
        let name = self.attr_to_string(unit_index, file.path_name())?;
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(&name);

        if !path.starts_with('/') {
            if let Some(dir) = unit.comp_dir.as_ref() {
                if let Ok(dir) = dir.to_string_lossy() {
                    path = format!("{dir}/{path}");
                }
            }
        }
        Ok(Some(path))
    }

    fn entry_type(&mut self, unit_index: usize, entry: &Die<'_, '_>) -> Result<Option<TypeId>>
    {
        let Some(value) = attr(entry, constants::DW_AT_type, "reading DW_AT_type")? else {
            return Ok(None);
        };
        self.type_ref(unit_index, value.value())
    }

    fn type_ref(&mut self, unit_index: usize, value: AttributeValue<OwnedReader>) -> Result<Option<TypeId>>
    {
        match value {
            AttributeValue::UnitRef(offset) => self.type_at(unit_index, offset).map(Some),
            AttributeValue::DebugInfoRef(offset) => {
                let target = UnitSectionOffset::from(offset);
                match self.find_unit_for_offset(target) {
                    Some((target_index, unit_offset)) => self.type_at(target_index, unit_offset).map(Some),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    /// Arena handle for the type DIE at `offset`, creating it on first
    /// sight. The handle is reserved and memoized before any recursion
    /// into constituents or members, so a structure holding a pointer
    /// to itself resolves to its own half-built node instead of
    /// recursing forever.
    fn type_at(&mut self, unit_index: usize, offset: UnitOffset<usize>) -> Result<TypeId>
    {
        let units = self.units;
        let unit = &units[unit_index];
        let key = offset.to_unit_section_offset(unit);
        if let Some(&id) = self.type_memo.get(&key) {
            return Ok(id);
        }

        let entry = unit
            .entry(offset)
            .map_err(|err| map_dwarf_error("resolving type DIE", err))?;
        let name = self.entry_name(unit_index, &entry)?.unwrap_or_default();
        let byte_size =
            attr(&entry, constants::DW_AT_byte_size, "reading DW_AT_byte_size")?.and_then(|value| value.udata_value());

        let id = self.arena.push(TypeNode {
            name,
            byte_size,
            class: TypeClass::Other,
        });
        self.type_memo.insert(key, id);

        let class = match entry.tag() {
            constants::DW_TAG_base_type | constants::DW_TAG_enumeration_type => TypeClass::Base,
            constants::DW_TAG_typedef
            | constants::DW_TAG_const_type
            | constants::DW_TAG_volatile_type
            | constants::DW_TAG_restrict_type => TypeClass::Typedef {
                inner: self.entry_type(unit_index, &entry)?,
            },
            constants::DW_TAG_pointer_type | constants::DW_TAG_ptr_to_member_type => TypeClass::Pointer {
                inner: self.entry_type(unit_index, &entry)?,
            },
            constants::DW_TAG_reference_type | constants::DW_TAG_rvalue_reference_type => TypeClass::Reference {
                inner: self.entry_type(unit_index, &entry)?,
            },
            constants::DW_TAG_array_type => {
                let element = self.entry_type(unit_index, &entry)?;
                let (low_bound, high_bound) = self.array_bounds(unit_index, offset)?;
                TypeClass::Array {
                    element,
                    low_bound,
                    high_bound,
                }
            }
            constants::DW_TAG_structure_type | constants::DW_TAG_class_type | constants::DW_TAG_union_type => {
                TypeClass::Structure {
                    members: self.collect_members(unit_index, offset)?,
                }
            }
            constants::DW_TAG_subroutine_type => TypeClass::Function,
            _ => TypeClass::Other,
        };
        self.arena.set_class(id, class);
        Ok(id)
    }

    fn array_bounds(&mut self, unit_index: usize, offset: UnitOffset<usize>) -> Result<(Option<i64>, Option<i64>)>
    {
        let unit = &self.units[unit_index];
        let mut tree = unit
            .entries_tree(Some(offset))
            .map_err(|err| map_dwarf_error("building array tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating array root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating array children", err))?
        {
            let entry = child.entry();
            if entry.tag() != constants::DW_TAG_subrange_type {
                continue;
            }
            let low = attr(entry, constants::DW_AT_lower_bound, "reading DW_AT_lower_bound")?
                .and_then(|value| value.sdata_value().or_else(|| value.udata_value().and_then(|u| i64::try_from(u).ok())));
            if let Some(value) = attr(entry, constants::DW_AT_upper_bound, "reading DW_AT_upper_bound")? {
                let high = value
                    .sdata_value()
                    .or_else(|| value.udata_value().and_then(|u| i64::try_from(u).ok()));
                return Ok((low, high));
            }
            if let Some(value) = attr(entry, constants::DW_AT_count, "reading DW_AT_count")? {
                let high = value
                    .udata_value()
                    .and_then(|count| i64::try_from(count).ok())
                    .map(|count| low.unwrap_or(0) + count - 1);
                return Ok((low, high));
            }
            return Ok((low, None));
        }
        Ok((None, None))
    }

    fn collect_members(&mut self, unit_index: usize, offset: UnitOffset<usize>) -> Result<Vec<Member>>
    {
        // gather the member DIE offsets first; resolving member types
        // re-enters type_at and cannot overlap a live tree cursor
        let mut member_offsets = Vec::new();
        {
            let unit = &self.units[unit_index];
            let mut tree = unit
                .entries_tree(Some(offset))
                .map_err(|err| map_dwarf_error("building structure tree", err))?;
            let root = tree.root().map_err(|err| map_dwarf_error("navigating structure root", err))?;
            let mut children = root.children();
            while let Some(child) = children
                .next()
                .map_err(|err| map_dwarf_error("iterating structure members", err))?
            {
                if child.entry().tag() == constants::DW_TAG_member {
                    member_offsets.push(child.entry().offset());
                }
            }
        }

        let mut members = Vec::new();
        for member_offset in member_offsets {
            let unit = &self.units[unit_index];
            let entry = unit
                .entry(member_offset)
                .map_err(|err| map_dwarf_error("resolving member DIE", err))?;
            let name = self.entry_name(unit_index, &entry)?.unwrap_or_default();
            // no plain data-member location marks a virtual-dispatch slot
            let byte_offset = attr(&entry, constants::DW_AT_data_member_location, "reading member offset")?
                .and_then(|value| value.udata_value());
            let ty = self.entry_type(unit_index, &entry)?;
            members.push(Member { name, byte_offset, ty });
        }
        Ok(members)
    }

    fn find_unit_for_offset(&self, target: UnitSectionOffset<usize>) -> Option<(usize, UnitOffset<usize>)>
    {
        self.units
            .iter()
            .enumerate()
            .find_map(|(index, unit)| target.to_unit_offset(unit).map(|offset| (index, offset)))
    }
}

/// Storage description from the first operation of a location
/// expression. Returns `None` when the expression cannot be decoded at
/// all; an unrecognized leading operation still yields a record with
/// [`StorageClass::Unset`].
fn decode_expression(
    expression: &Expression<OwnedReader>,
    unit: &Unit<OwnedReader>,
) -> Option<(StorageClass, bool, Option<u16>, i64)>
{
    let mut operations = expression.clone().operations(unit.encoding());
    let first = match operations.next() {
        Ok(Some(operation)) => operation,
        Ok(None) => return Some((StorageClass::Unset, false, None, 0)),
        Err(_) => return None,
    };

    let (class, register, offset) = match first {
        Operation::Address { address } => (StorageClass::Address, None, i64::try_from(address).unwrap_or(i64::MAX)),
        Operation::Register { register } => (StorageClass::Register, Some(register.0), 0),
        Operation::RegisterOffset { register, offset, .. } => (StorageClass::RegisterOffset, Some(register.0), offset),
        Operation::FrameOffset { offset } => (StorageClass::RegisterOffset, None, offset),
        _ => (StorageClass::Unset, None, 0),
    };

    let mut deref = false;
    while let Ok(Some(operation)) = operations.next() {
        if matches!(operation, Operation::Deref { .. }) {
            deref = true;
        }
    }
    Some((class, deref, register, offset))
}
