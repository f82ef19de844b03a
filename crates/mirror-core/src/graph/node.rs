//! Node storage for the reflection graph.
//!
//! Nodes own their data and name every other node through a typed id. The
//! parent links, field types, pointees and supertypes that make the graph
//! logically cyclic are all ids, so the arena is the only owner.

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::types::PrimitiveKind;

macro_rules! arena_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(pub(crate) u32);

            impl $name
            {
                pub(crate) fn index(self) -> usize
                {
                    self.0 as usize
                }
            }
        )*
    };
}

arena_id!(
    /// Id of a namespace node.
    NamespaceId,
    /// Id of a type node.
    TypeId,
    /// Id of a field node.
    FieldId,
    /// Id of a function or method node.
    FunctionId,
    /// Id of a variable node.
    VariableId,
    /// Id of an enum constant node.
    EnumConstantId,
    /// Id of an annotation node.
    AnnotationId,
);

/// Owner of named nested elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerId
{
    Namespace(NamespaceId),
    Record(TypeId),
}

/// Any element that can carry annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId
{
    Namespace(NamespaceId),
    Type(TypeId),
    Field(FieldId),
    Function(FunctionId),
    Variable(VariableId),
    EnumConstant(EnumConstantId),
}

/// Named types, functions and variables held by a container.
#[derive(Debug, Clone, Default)]
pub struct Scope
{
    pub(crate) types: IndexMap<String, TypeId>,
    pub(crate) functions: IndexMap<String, FunctionId>,
    pub(crate) variables: IndexMap<String, VariableId>,
}

#[derive(Debug, Clone)]
pub(crate) struct NamespaceNode
{
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) parent: Option<NamespaceId>,
    pub(crate) namespaces: IndexMap<String, NamespaceId>,
    pub(crate) scope: Scope,
    pub(crate) annotations: Vec<AnnotationId>,
}

/// Memory layout family of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordLayout
{
    Struct,
    Class,
    Union,
}

impl RecordLayout
{
    /// Keyword used to spell the type in source.
    pub fn keyword(self) -> &'static str
    {
        match self {
            RecordLayout::Struct => "struct",
            RecordLayout::Class => "class",
            RecordLayout::Union => "union",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordNode
{
    pub(crate) layout: RecordLayout,
    pub(crate) size: u64,
    pub(crate) declaration: bool,
    pub(crate) scope: Scope,
    pub(crate) fields: IndexMap<String, FieldId>,
    pub(crate) methods: IndexMap<String, FunctionId>,
    pub(crate) supertypes: Vec<TypeId>,
    pub(crate) ancestors: IndexSet<TypeId>,
}

impl RecordNode
{
    pub(crate) fn new(layout: RecordLayout, size: u64, declaration: bool) -> Self
    {
        Self {
            layout,
            size,
            declaration,
            scope: Scope::default(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            supertypes: Vec::new(),
            ancestors: IndexSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EnumNode
{
    pub(crate) size: u64,
    pub(crate) declaration: bool,
    pub(crate) constants: IndexMap<String, EnumConstantId>,
}

#[derive(Debug, Clone)]
pub(crate) enum TypeKind
{
    Primitive
    {
        kind: PrimitiveKind,
        size: u64,
    },
    Pointer
    {
        pointee: TypeId,
        size: u64,
    },
    Const
    {
        underlying: TypeId,
    },
    Alias
    {
        underlying: TypeId,
    },
    Record(RecordNode),
    Enum(EnumNode),
    Unspecified
    {
        size: u64,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct TypeNode
{
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) parent: Option<ContainerId>,
    pub(crate) kind: TypeKind,
    pub(crate) annotations: Vec<AnnotationId>,
}

impl TypeNode
{
    /// Declaration-only records and enums yield to a definition of the same name.
    pub(crate) fn is_declaration(&self) -> bool
    {
        match &self.kind {
            TypeKind::Record(record) => record.declaration,
            TypeKind::Enum(enumeration) => enumeration.declaration,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FieldNode
{
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) owner: TypeId,
    pub(crate) ty: TypeId,
    pub(crate) offset: u64,
    pub(crate) annotations: Vec<AnnotationId>,
}

#[derive(Debug, Clone)]
pub(crate) struct ParameterNode
{
    pub(crate) name: String,
    pub(crate) ty: TypeId,
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionNode
{
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) parent: Option<ContainerId>,
    pub(crate) return_type: TypeId,
    pub(crate) parameters: SmallVec<[ParameterNode; 4]>,
    pub(crate) address: Option<u64>,
    pub(crate) vtable_index: Option<u64>,
    pub(crate) linkage_name: Option<String>,
    pub(crate) annotations: Vec<AnnotationId>,
}

#[derive(Debug, Clone)]
pub(crate) struct VariableNode
{
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) parent: Option<ContainerId>,
    pub(crate) ty: TypeId,
    pub(crate) address: u64,
    pub(crate) annotations: Vec<AnnotationId>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnumConstantNode
{
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) owner: TypeId,
    pub(crate) bytes: SmallVec<[u8; 8]>,
    pub(crate) annotations: Vec<AnnotationId>,
}

/// Where an annotation's value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationPayload
{
    /// Addressable declaration: the value is read from memory.
    Address(u64),
    /// Inline constant copied out of the debug information.
    Inline(Vec<u8>),
}

#[derive(Debug, Clone)]
pub(crate) struct AnnotationNode
{
    pub(crate) name: String,
    pub(crate) ty: TypeId,
    pub(crate) payload: AnnotationPayload,
    pub(crate) target: ElementId,
}
