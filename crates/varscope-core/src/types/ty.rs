//! Type-graph nodes and the arena that owns them.
//!
//! The provider assigns every DWARF type DIE a stable integer handle into
//! a [`TypeArena`]. Identity is the handle, never structural equality; the
//! graph is shared and may contain cycles through structures that reference
//! themselves indirectly (a linked-list node holding a pointer to its own
//! type is the canonical case).

/// Stable handle for a node in a [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId
{
    /// Position of the node inside its arena.
    pub const fn index(self) -> usize
    {
        self.0 as usize
    }
}

/// One data member of a structure type.
#[derive(Debug, Clone)]
pub struct Member
{
    pub name: String,
    /// Byte offset within the structure. `None` marks a virtual-dispatch
    /// slot that has no plain data-member location.
    pub byte_offset: Option<u64>,
    pub ty: Option<TypeId>,
}

/// Data class of a type node, carrying the class-specific edges.
///
/// Typedef, pointer, reference, and array nodes own exactly one
/// constituent edge; structures own their member list; base, function,
/// and other nodes are leaves of the graph.
#[derive(Debug, Clone)]
pub enum TypeClass
{
    Base,
    Typedef
    {
        inner: Option<TypeId>,
    },
    Pointer
    {
        inner: Option<TypeId>,
    },
    Reference
    {
        inner: Option<TypeId>,
    },
    Array
    {
        element: Option<TypeId>,
        low_bound: Option<i64>,
        high_bound: Option<i64>,
    },
    Structure
    {
        members: Vec<Member>,
    },
    Function,
    Other,
}

/// A single node in the program's type graph.
#[derive(Debug, Clone)]
pub struct TypeNode
{
    pub name: String,
    pub byte_size: Option<u64>,
    pub class: TypeClass,
}

impl TypeNode
{
    /// The single constituent edge, for the classes that have one.
    pub fn constituent(&self) -> Option<TypeId>
    {
        match &self.class {
            TypeClass::Typedef { inner } | TypeClass::Pointer { inner } | TypeClass::Reference { inner } => *inner,
            TypeClass::Array { element, .. } => *element,
            _ => None,
        }
    }

    pub fn is_structure(&self) -> bool
    {
        matches!(self.class, TypeClass::Structure { .. })
    }
}

/// Arena owning every type node for the lifetime of one analysis.
///
/// Handles are never invalidated; nodes are only appended.
#[derive(Debug, Default)]
pub struct TypeArena
{
    nodes: Vec<TypeNode>,
}

impl TypeArena
{
    pub fn new() -> Self
    {
        Self { nodes: Vec::new() }
    }

    pub fn push(&mut self, node: TypeNode) -> TypeId
    {
        let id = TypeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeNode
    {
        &self.nodes[id.index()]
    }

    /// Replace a node's class after its handle was reserved. Used while
    /// extracting self-referential structures: the handle must exist
    /// before the member walk recurses back into it.
    pub fn set_class(&mut self, id: TypeId, class: TypeClass)
    {
        self.nodes[id.index()].class = class;
    }

    pub fn len(&self) -> usize
    {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeNode)>
    {
        self.nodes.iter().enumerate().map(|(i, n)| (TypeId(i as u32), n))
    }

    /// Printable name for a node, falling through exactly one constituent
    /// level when the node itself is anonymous. Layout rendering never
    /// chases longer typedef chains.
    pub fn display_name(&self, id: TypeId) -> &str
    {
        let node = self.get(id);
        if !node.name.is_empty() {
            return &node.name;
        }
        if let Some(inner) = node.constituent() {
            let inner = self.get(inner);
            if !inner.name.is_empty() {
                return &inner.name;
            }
        }
        "<anonymous>"
    }

    /// Byte size for a node, falling through one typedef level when the
    /// typedef itself carries no size attribute.
    pub fn display_size(&self, id: TypeId) -> Option<u64>
    {
        let node = self.get(id);
        if node.byte_size.is_some() {
            return node.byte_size;
        }
        if let TypeClass::Typedef { inner: Some(inner) } = node.class {
            return self.get(inner).byte_size;
        }
        None
    }
}
