//! Shared data model: addresses, the type graph, and symbols.

pub mod address;
pub mod symbols;
pub mod ty;

pub use address::Address;
pub use symbols::{
    Function, FunctionId, GlobalVariable, Language, LineHit, LocalVariable, LocationRecord, Module, ModuleId,
    StorageClass, VarKey,
};
pub use ty::{Member, TypeArena, TypeClass, TypeId, TypeNode};
