//! Functions, variables, modules, and location records.
//!
//! The Symbol Table Provider owns everything in here for the lifetime of
//! one analysis; the analytic passes hold shared references and never
//! mutate the model.

use std::fmt;

use crate::types::{Address, TypeId};

/// Index of a module (compilation unit) within its symbol table.
pub type ModuleId = usize;

/// Index of a function within its symbol table.
pub type FunctionId = usize;

/// Source language of a compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language
{
    C,
    Cpp,
    Rust,
    Fortran,
    Unknown,
}

impl fmt::Display for Language
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            Language::C => "C",
            Language::Cpp => "C++",
            Language::Rust => "Rust",
            Language::Fortran => "Fortran",
            Language::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// A compilation unit.
#[derive(Debug, Clone)]
pub struct Module
{
    /// Full path of the primary source file, empty when the debug info
    /// carries none.
    pub name: String,
    pub language: Language,
}

/// Storage class of a location record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageClass
{
    #[default]
    Unset,
    /// The variable lives at an absolute address.
    Address,
    /// The variable lives in a register.
    Register,
    /// The variable lives at a register-relative (frame) offset.
    RegisterOffset,
}

impl fmt::Display for StorageClass
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            StorageClass::Unset => "unset",
            StorageClass::Address => "addr",
            StorageClass::Register => "reg",
            StorageClass::RegisterOffset => "reg+off",
        };
        write!(f, "{name}")
    }
}

/// One entry of a variable's location list: where the variable lives
/// while the program counter is inside the closed range `[low, high]`.
#[derive(Debug, Clone, Copy)]
pub struct LocationRecord
{
    pub low: Address,
    pub high: Address,
    pub class: StorageClass,
    /// The location holds the address of the value, not the value itself.
    pub deref: bool,
    pub register: Option<u16>,
    /// Frame offset, or the absolute address for [`StorageClass::Address`].
    pub offset: i64,
}

/// A function-scoped variable or parameter.
#[derive(Debug, Clone)]
pub struct LocalVariable
{
    pub name: String,
    /// Declaration file path, empty when the debug info has none.
    pub decl_file: String,
    /// 1-based declaration line. Kept signed so corrupt negative values
    /// survive to the annotator, which rejects them with a warning.
    pub decl_line: i64,
    pub ty: Option<TypeId>,
    pub locations: Vec<LocationRecord>,
}

/// A module-scoped variable with a fixed address.
#[derive(Debug, Clone)]
pub struct GlobalVariable
{
    pub name: String,
    /// Demangled aliases, when the linkage name decodes to something
    /// different from the plain name.
    pub pretty_names: Vec<String>,
    pub offset: Address,
    pub size: u64,
    pub ty: Option<TypeId>,
    pub module: ModuleId,
}

/// A function with its ordered parameters and local variables.
#[derive(Debug, Clone)]
pub struct Function
{
    pub name: String,
    pub offset: Address,
    pub size: u64,
    pub module: ModuleId,
    pub parameters: Vec<LocalVariable>,
    pub locals: Vec<LocalVariable>,
}

impl Function
{
    /// Every function-scoped variable, parameters first.
    pub fn variables(&self) -> impl Iterator<Item = &LocalVariable>
    {
        self.parameters.iter().chain(self.locals.iter())
    }

    /// Look up a variable by its position in the [`Self::variables`] order.
    pub fn variable(&self, index: usize) -> Option<&LocalVariable>
    {
        if index < self.parameters.len() {
            self.parameters.get(index)
        } else {
            self.locals.get(index - self.parameters.len())
        }
    }

    /// One past the last byte of the function body.
    pub fn end(&self) -> Address
    {
        self.offset.saturating_add(self.size)
    }
}

/// One line-table hit for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineHit
{
    pub file: String,
    /// 1-based source line; 0 when the line table has no line number.
    pub line: u32,
    pub column: u32,
}

/// Identifies a (variable, owning function) pair across the whole table.
///
/// `variable` indexes into [`Function::variables`] order. The derived
/// ordering is positional; when a report needs a deterministic
/// representative it sorts by (variable name, function name) instead of
/// relying on this or on container iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarKey
{
    pub function: FunctionId,
    pub variable: usize,
}
