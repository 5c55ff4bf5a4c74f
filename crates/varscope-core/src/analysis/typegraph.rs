//! Reachable-type collection over the shared type graph.

use std::collections::HashSet;

use crate::types::{TypeArena, TypeClass, TypeId};

/// Deduplicated set of reachable types, remembering first-visit order.
///
/// The short-circuit on already-present handles is the sole mechanism
/// that keeps traversal of self-referential structures finite.
#[derive(Debug, Default)]
pub struct TypeSet
{
    seen: HashSet<TypeId>,
    order: Vec<TypeId>,
}

impl TypeSet
{
    /// Insert a handle. Returns false (and does nothing) when it is
    /// already present.
    pub fn insert(&mut self, id: TypeId) -> bool
    {
        if self.seen.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: TypeId) -> bool
    {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize
    {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.seen.is_empty()
    }

    /// Handles in first-visit order.
    pub fn iter(&self) -> impl Iterator<Item = TypeId> + '_
    {
        self.order.iter().copied()
    }
}

/// Collect every type reachable from `roots`.
///
/// Depth-first walk with a visited set: pointer, reference, and typedef
/// nodes contribute their one constituent edge, arrays their element
/// type, structures every member type. Base, function, and unknown nodes
/// are leaves. Callers choose the roots; the standard root set
/// deliberately excludes function parameters (see
/// [`crate::symtab::SymbolTable::type_roots`]).
pub fn collect_types(arena: &TypeArena, roots: impl IntoIterator<Item = TypeId>) -> TypeSet
{
    let mut set = TypeSet::default();
    let mut stack: Vec<TypeId> = roots.into_iter().collect();
    while let Some(id) = stack.pop() {
        if !set.insert(id) {
            continue;
        }
        match &arena.get(id).class {
            TypeClass::Typedef { inner } | TypeClass::Pointer { inner } | TypeClass::Reference { inner } => {
                if let Some(next) = inner {
                    stack.push(*next);
                }
            }
            TypeClass::Array { element, .. } => {
                if let Some(next) = element {
                    stack.push(*next);
                }
            }
            TypeClass::Structure { members } => {
                for member in members {
                    if let Some(next) = member.ty {
                        stack.push(next);
                    }
                }
            }
            TypeClass::Base | TypeClass::Function | TypeClass::Other => {}
        }
    }
    set
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{Member, TypeNode};

    fn node(name: &str, size: u64, class: TypeClass) -> TypeNode
    {
        TypeNode {
            name: name.to_string(),
            byte_size: Some(size),
            class,
        }
    }

    /// `struct node { struct node *next; int value; }` plus the base int.
    fn self_referential_arena() -> (TypeArena, TypeId)
    {
        let mut arena = TypeArena::new();
        let int = arena.push(node("int", 4, TypeClass::Base));
        let list = arena.push(node("node", 16, TypeClass::Other));
        let ptr = arena.push(node("", 8, TypeClass::Pointer { inner: Some(list) }));
        arena.set_class(
            list,
            TypeClass::Structure {
                members: vec![
                    Member {
                        name: "next".to_string(),
                        byte_offset: Some(0),
                        ty: Some(ptr),
                    },
                    Member {
                        name: "value".to_string(),
                        byte_offset: Some(8),
                        ty: Some(int),
                    },
                ],
            },
        );
        (arena, list)
    }

    #[test]
    fn test_cycle_terminates()
    {
        let (arena, list) = self_referential_arena();
        let set = collect_types(&arena, [list]);
        // struct, pointer, and int: the cycle is broken by the visited set
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_collection_is_idempotent()
    {
        let (arena, list) = self_referential_arena();
        let first = collect_types(&arena, [list]);
        let second = collect_types(&arena, [list]);
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn test_reinsert_is_noop()
    {
        let (arena, list) = self_referential_arena();
        let mut set = collect_types(&arena, [list]);
        let before = set.len();
        assert!(!set.insert(list));
        assert_eq!(set.len(), before);
    }

    #[test]
    fn test_duplicate_roots_counted_once()
    {
        let (arena, list) = self_referential_arena();
        let set = collect_types(&arena, [list, list, list]);
        assert_eq!(set.len(), 3);
    }
}
