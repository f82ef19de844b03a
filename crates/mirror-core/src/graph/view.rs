//! # Graph Handles
//!
//! Borrowed, `Copy` handles over a finished [`Graph`]. Each handle is a graph
//! reference plus an id, so following a link (field to owner, pointer to
//! pointee) is an index lookup and never clones node data.
//!
//! ## Shared capabilities
//!
//! Behaviour common to several element kinds lives in traits with provided
//! methods:
//!
//! - [`Named`]: short and qualified names
//! - [`Annotated`]: annotations attached to the element
//! - [`Scoped`]: nested types, functions and variables of a namespace or record
//!
//! Import them through [`crate::prelude`].

use std::fmt;

use super::node::{AnnotationPayload, ParameterNode, RecordLayout, Scope};
use super::{
    AnnotationId, ContainerId, ElementId, EnumConstantId, FieldId, FunctionId, Graph, NamespaceId, TypeId, TypeKind,
    VariableId,
};
use crate::error::{ElementKind, MirrorError, MirrorResult};
use crate::memory::{decode, MemoryAccess, Scalar};
use crate::types::{Address, PrimitiveKind, SymbolName};

/// Element with a short name and a scope-qualified name.
pub trait Named<'g>
{
    fn name(&self) -> &'g str;

    /// Qualified name, `::`-separated with a leading separator for elements
    /// reachable from the root namespace.
    fn full_name(&self) -> &'g str;
}

/// Element that can carry annotations.
pub trait Annotated<'g>
{
    #[doc(hidden)]
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId]);

    /// Annotations attached to this element, in correlation order.
    fn annotations(&self) -> impl Iterator<Item = AnnotationInfo<'g>>
    {
        let (graph, ids) = self.annotation_parts();
        ids.iter().map(move |id| AnnotationInfo { graph, id: *id })
    }

    /// First annotation whose name is `name`.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the element carries no such annotation.
    fn annotation(&self, name: &str) -> MirrorResult<AnnotationInfo<'g>>
    {
        self.annotations()
            .find(|annotation| annotation.name() == name)
            .ok_or_else(|| MirrorError::not_found(ElementKind::Annotation, name))
    }
}

/// Container of nested types, functions and variables.
pub trait Scoped<'g>
{
    #[doc(hidden)]
    fn scope_parts(&self) -> (&'g Graph, &'g Scope);

    fn nested_types(&self) -> impl Iterator<Item = TypeInfo<'g>>
    {
        let (graph, scope) = self.scope_parts();
        scope.types.values().map(move |id| TypeInfo { graph, id: *id })
    }

    /// Nested type by short name.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the container holds no such type.
    fn nested_type(&self, name: &str) -> MirrorResult<TypeInfo<'g>>
    {
        let (graph, scope) = self.scope_parts();
        scope
            .types
            .get(name)
            .map(|id| TypeInfo { graph, id: *id })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Type, name))
    }

    fn functions(&self) -> impl Iterator<Item = CallableInfo<'g>>
    {
        let (graph, scope) = self.scope_parts();
        scope.functions.values().map(move |id| CallableInfo { graph, id: *id })
    }

    /// Function by short name.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the container holds no such function.
    fn function(&self, name: &str) -> MirrorResult<CallableInfo<'g>>
    {
        let (graph, scope) = self.scope_parts();
        scope
            .functions
            .get(name)
            .map(|id| CallableInfo { graph, id: *id })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Function, name))
    }

    fn variables(&self) -> impl Iterator<Item = VariableInfo<'g>>
    {
        let (graph, scope) = self.scope_parts();
        scope.variables.values().map(move |id| VariableInfo { graph, id: *id })
    }

    /// Variable by short name.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the container holds no such variable.
    fn variable(&self, name: &str) -> MirrorResult<VariableInfo<'g>>
    {
        let (graph, scope) = self.scope_parts();
        scope
            .variables
            .get(name)
            .map(|id| VariableInfo { graph, id: *id })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Variable, name))
    }
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $id:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name<'g>
        {
            pub(crate) graph: &'g Graph,
            pub(crate) id: $id,
        }

        impl<'g> $name<'g>
        {
            pub fn id(&self) -> $id
            {
                self.id
            }
        }

        impl fmt::Debug for $name<'_>
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
            {
                f.debug_tuple(stringify!($name)).field(&self.full_name()).finish()
            }
        }
    };
}

handle!(
    /// A namespace.
    NamespaceInfo,
    NamespaceId
);
handle!(
    /// Any type node.
    TypeInfo,
    TypeId
);
handle!(
    /// A type known to be a struct, class or union.
    RecordInfo,
    TypeId
);
handle!(
    /// A type known to be an enumeration.
    EnumInfo,
    TypeId
);
handle!(
    /// A data member of a record.
    FieldInfo,
    FieldId
);
handle!(
    /// A free function or a method.
    CallableInfo,
    FunctionId
);
handle!(
    /// A variable with a static address.
    VariableInfo,
    VariableId
);
handle!(
    /// A named value of an enumeration.
    EnumConstantInfo,
    EnumConstantId
);
handle!(
    /// Metadata attached to a declaration.
    AnnotationInfo,
    AnnotationId
);

// ---------------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------------

impl<'g> NamespaceInfo<'g>
{
    pub fn is_root(&self) -> bool
    {
        self.id == Graph::ROOT
    }

    /// Enclosing namespace; `None` for the root.
    pub fn parent(&self) -> Option<NamespaceInfo<'g>>
    {
        self.graph
            .namespace(self.id)
            .parent
            .map(|id| NamespaceInfo { graph: self.graph, id })
    }

    pub fn namespaces(&self) -> impl Iterator<Item = NamespaceInfo<'g>>
    {
        let graph = self.graph;
        graph
            .namespace(self.id)
            .namespaces
            .values()
            .map(move |id| NamespaceInfo { graph, id: *id })
    }

    /// Direct child namespace by short name.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if there is no such child.
    pub fn nested_namespace(&self, name: &str) -> MirrorResult<NamespaceInfo<'g>>
    {
        self.graph
            .namespace(self.id)
            .namespaces
            .get(name)
            .map(|id| NamespaceInfo { graph: self.graph, id: *id })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Namespace, name))
    }
}

impl<'g> Named<'g> for NamespaceInfo<'g>
{
    fn name(&self) -> &'g str
    {
        &self.graph.namespace(self.id).name
    }

    fn full_name(&self) -> &'g str
    {
        &self.graph.namespace(self.id).full_name
    }
}

impl<'g> Annotated<'g> for NamespaceInfo<'g>
{
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId])
    {
        (self.graph, &self.graph.namespace(self.id).annotations)
    }
}

impl<'g> Scoped<'g> for NamespaceInfo<'g>
{
    fn scope_parts(&self) -> (&'g Graph, &'g Scope)
    {
        (self.graph, &self.graph.namespace(self.id).scope)
    }
}

impl PartialEq for NamespaceInfo<'_>
{
    fn eq(&self, other: &Self) -> bool
    {
        self.full_name() == other.full_name()
    }
}

// ---------------------------------------------------------------------------
// Containers and elements
// ---------------------------------------------------------------------------

/// Owner of a type, function or variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContainerInfo<'g>
{
    Namespace(NamespaceInfo<'g>),
    Record(RecordInfo<'g>),
}

impl<'g> ContainerInfo<'g>
{
    pub(crate) fn new(graph: &'g Graph, id: ContainerId) -> Self
    {
        match id {
            ContainerId::Namespace(id) => ContainerInfo::Namespace(NamespaceInfo { graph, id }),
            ContainerId::Record(id) => ContainerInfo::Record(RecordInfo { graph, id }),
        }
    }

    pub fn as_namespace(&self) -> Option<NamespaceInfo<'g>>
    {
        match self {
            ContainerInfo::Namespace(namespace) => Some(*namespace),
            ContainerInfo::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<RecordInfo<'g>>
    {
        match self {
            ContainerInfo::Record(record) => Some(*record),
            ContainerInfo::Namespace(_) => None,
        }
    }
}

impl<'g> Named<'g> for ContainerInfo<'g>
{
    fn name(&self) -> &'g str
    {
        match self {
            ContainerInfo::Namespace(namespace) => namespace.name(),
            ContainerInfo::Record(record) => record.name(),
        }
    }

    fn full_name(&self) -> &'g str
    {
        match self {
            ContainerInfo::Namespace(namespace) => namespace.full_name(),
            ContainerInfo::Record(record) => record.full_name(),
        }
    }
}

impl<'g> Scoped<'g> for ContainerInfo<'g>
{
    fn scope_parts(&self) -> (&'g Graph, &'g Scope)
    {
        match self {
            ContainerInfo::Namespace(namespace) => namespace.scope_parts(),
            ContainerInfo::Record(record) => record.scope_parts(),
        }
    }
}

/// Any annotatable element; the target of an annotation.
#[derive(Debug, Clone, Copy)]
pub enum ElementInfo<'g>
{
    Namespace(NamespaceInfo<'g>),
    Type(TypeInfo<'g>),
    Field(FieldInfo<'g>),
    Callable(CallableInfo<'g>),
    Variable(VariableInfo<'g>),
    EnumConstant(EnumConstantInfo<'g>),
}

impl<'g> ElementInfo<'g>
{
    pub(crate) fn new(graph: &'g Graph, id: ElementId) -> Self
    {
        match id {
            ElementId::Namespace(id) => ElementInfo::Namespace(NamespaceInfo { graph, id }),
            ElementId::Type(id) => ElementInfo::Type(TypeInfo { graph, id }),
            ElementId::Field(id) => ElementInfo::Field(FieldInfo { graph, id }),
            ElementId::Function(id) => ElementInfo::Callable(CallableInfo { graph, id }),
            ElementId::Variable(id) => ElementInfo::Variable(VariableInfo { graph, id }),
            ElementId::EnumConstant(id) => ElementInfo::EnumConstant(EnumConstantInfo { graph, id }),
        }
    }
}

impl<'g> Named<'g> for ElementInfo<'g>
{
    fn name(&self) -> &'g str
    {
        match self {
            ElementInfo::Namespace(e) => e.name(),
            ElementInfo::Type(e) => e.name(),
            ElementInfo::Field(e) => e.name(),
            ElementInfo::Callable(e) => e.name(),
            ElementInfo::Variable(e) => e.name(),
            ElementInfo::EnumConstant(e) => e.name(),
        }
    }

    fn full_name(&self) -> &'g str
    {
        match self {
            ElementInfo::Namespace(e) => e.full_name(),
            ElementInfo::Type(e) => e.full_name(),
            ElementInfo::Field(e) => e.full_name(),
            ElementInfo::Callable(e) => e.full_name(),
            ElementInfo::Variable(e) => e.full_name(),
            ElementInfo::EnumConstant(e) => e.full_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Coarse classification of a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory
{
    Primitive(PrimitiveKind),
    Pointer,
    Const,
    Alias,
    Record(RecordLayout),
    Enum,
    Unspecified,
}

impl fmt::Display for TypeCategory
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            TypeCategory::Primitive(_) => write!(f, "primitive"),
            TypeCategory::Pointer => write!(f, "pointer"),
            TypeCategory::Const => write!(f, "const"),
            TypeCategory::Alias => write!(f, "alias"),
            TypeCategory::Record(layout) => write!(f, "{}", layout.keyword()),
            TypeCategory::Enum => write!(f, "enum"),
            TypeCategory::Unspecified => write!(f, "unspecified"),
        }
    }
}

impl<'g> TypeInfo<'g>
{
    fn node_kind(&self) -> &'g TypeKind
    {
        &self.graph.ty(self.id).kind
    }

    /// Owning container.
    ///
    /// ## Errors
    ///
    /// Returns `Detached` for a type that was only ever built as a forward
    /// reference and never reached in its declaring scope.
    pub fn parent(&self) -> MirrorResult<ContainerInfo<'g>>
    {
        self.graph
            .ty(self.id)
            .parent
            .map(|id| ContainerInfo::new(self.graph, id))
            .ok_or_else(|| MirrorError::Detached(self.name().to_string()))
    }

    pub fn category(&self) -> TypeCategory
    {
        match self.node_kind() {
            TypeKind::Primitive { kind, .. } => TypeCategory::Primitive(*kind),
            TypeKind::Pointer { .. } => TypeCategory::Pointer,
            TypeKind::Const { .. } => TypeCategory::Const,
            TypeKind::Alias { .. } => TypeCategory::Alias,
            TypeKind::Record(record) => TypeCategory::Record(record.layout),
            TypeKind::Enum(_) => TypeCategory::Enum,
            TypeKind::Unspecified { .. } => TypeCategory::Unspecified,
        }
    }

    /// Size in bytes. Const and alias types report their underlying size.
    pub fn size(&self) -> u64
    {
        match self.node_kind() {
            TypeKind::Primitive { size, .. } | TypeKind::Pointer { size, .. } | TypeKind::Unspecified { size } => *size,
            TypeKind::Const { underlying } | TypeKind::Alias { underlying } => self.with(*underlying).size(),
            TypeKind::Record(record) => record.size,
            TypeKind::Enum(enumeration) => enumeration.size,
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind>
    {
        match self.node_kind() {
            TypeKind::Primitive { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool
    {
        matches!(self.node_kind(), TypeKind::Pointer { .. })
    }

    /// Pointed-to type of a pointer.
    pub fn pointee(&self) -> Option<TypeInfo<'g>>
    {
        match self.node_kind() {
            TypeKind::Pointer { pointee, .. } => Some(self.with(*pointee)),
            _ => None,
        }
    }

    /// Qualified or aliased type of a const or alias type.
    pub fn underlying(&self) -> Option<TypeInfo<'g>>
    {
        match self.node_kind() {
            TypeKind::Const { underlying } | TypeKind::Alias { underlying } => Some(self.with(*underlying)),
            _ => None,
        }
    }

    /// This type with every const qualifier and alias peeled off.
    pub fn strip(&self) -> TypeInfo<'g>
    {
        let mut current = *self;
        while let Some(next) = current.underlying() {
            current = next;
        }
        current
    }

    /// Whether this is a declaration-only record or enum.
    pub fn is_declaration(&self) -> bool
    {
        self.graph.ty(self.id).is_declaration()
    }

    pub fn as_record(&self) -> Option<RecordInfo<'g>>
    {
        matches!(self.node_kind(), TypeKind::Record(_)).then_some(RecordInfo {
            graph: self.graph,
            id: self.id,
        })
    }

    /// This type as a record.
    ///
    /// ## Errors
    ///
    /// Returns `KindMismatch` if the type is not a struct, class or union.
    pub fn record(&self) -> MirrorResult<RecordInfo<'g>>
    {
        self.as_record().ok_or_else(|| MirrorError::KindMismatch {
            name: self.full_name().to_string(),
            expected: "a record",
        })
    }

    pub fn as_enum(&self) -> Option<EnumInfo<'g>>
    {
        matches!(self.node_kind(), TypeKind::Enum(_)).then_some(EnumInfo {
            graph: self.graph,
            id: self.id,
        })
    }

    /// This type as an enumeration.
    ///
    /// ## Errors
    ///
    /// Returns `KindMismatch` if the type is not an enum.
    pub fn enumeration(&self) -> MirrorResult<EnumInfo<'g>>
    {
        self.as_enum().ok_or_else(|| MirrorError::KindMismatch {
            name: self.full_name().to_string(),
            expected: "an enum",
        })
    }

    fn with(&self, id: TypeId) -> TypeInfo<'g>
    {
        TypeInfo { graph: self.graph, id }
    }
}

impl<'g> Named<'g> for TypeInfo<'g>
{
    fn name(&self) -> &'g str
    {
        &self.graph.ty(self.id).name
    }

    fn full_name(&self) -> &'g str
    {
        &self.graph.ty(self.id).full_name
    }
}

impl<'g> Annotated<'g> for TypeInfo<'g>
{
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId])
    {
        (self.graph, &self.graph.ty(self.id).annotations)
    }
}

/// Identity, or equal name with an equal owner.
///
/// Two units that each define `struct Point` at the root produce two nodes
/// that compare equal.
impl PartialEq for TypeInfo<'_>
{
    fn eq(&self, other: &Self) -> bool
    {
        if std::ptr::eq(self.graph, other.graph) && self.id == other.id {
            return true;
        }
        if self.name() != other.name() {
            return false;
        }
        match (self.graph.ty(self.id).parent, other.graph.ty(other.id).parent) {
            (None, None) => true,
            (Some(left), Some(right)) => ContainerInfo::new(self.graph, left) == ContainerInfo::new(other.graph, right),
            _ => false,
        }
    }
}

impl fmt::Display for TypeInfo<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

impl<'g> RecordInfo<'g>
{
    fn node(&self) -> &'g super::RecordNode
    {
        match &self.graph.ty(self.id).kind {
            TypeKind::Record(record) => record,
            _ => unreachable!("record handle over a non-record type"),
        }
    }

    pub fn as_type(&self) -> TypeInfo<'g>
    {
        TypeInfo {
            graph: self.graph,
            id: self.id,
        }
    }

    pub fn layout(&self) -> RecordLayout
    {
        self.node().layout
    }

    pub fn size(&self) -> u64
    {
        self.node().size
    }

    pub fn parent(&self) -> MirrorResult<ContainerInfo<'g>>
    {
        self.as_type().parent()
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldInfo<'g>>
    {
        let graph = self.graph;
        self.node().fields.values().map(move |id| FieldInfo { graph, id: *id })
    }

    /// Field by name.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the record has no such field.
    pub fn field(&self, name: &str) -> MirrorResult<FieldInfo<'g>>
    {
        self.node()
            .fields
            .get(name)
            .map(|id| FieldInfo { graph: self.graph, id: *id })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Field, name))
    }

    pub fn field_count(&self) -> usize
    {
        self.node().fields.len()
    }

    pub fn methods(&self) -> impl Iterator<Item = CallableInfo<'g>>
    {
        let graph = self.graph;
        self.node().methods.values().map(move |id| CallableInfo { graph, id: *id })
    }

    /// Method by name.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the record has no such method.
    pub fn method(&self, name: &str) -> MirrorResult<CallableInfo<'g>>
    {
        self.node()
            .methods
            .get(name)
            .map(|id| CallableInfo { graph: self.graph, id: *id })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Method, name))
    }

    /// Direct base records, in declaration order.
    pub fn supertypes(&self) -> impl Iterator<Item = RecordInfo<'g>>
    {
        let graph = self.graph;
        self.node().supertypes.iter().map(move |id| RecordInfo { graph, id: *id })
    }

    /// Every direct and indirect base record.
    pub fn ancestors(&self) -> impl Iterator<Item = RecordInfo<'g>>
    {
        let graph = self.graph;
        self.node().ancestors.iter().map(move |id| RecordInfo { graph, id: *id })
    }

    /// Whether `other` is a direct or indirect base of this record.
    pub fn is_ancestor(&self, other: &TypeInfo<'_>) -> bool
    {
        self.ancestors().any(|ancestor| ancestor.as_type() == *other)
    }
}

impl<'g> Named<'g> for RecordInfo<'g>
{
    fn name(&self) -> &'g str
    {
        self.as_type().name()
    }

    fn full_name(&self) -> &'g str
    {
        self.as_type().full_name()
    }
}

impl<'g> Annotated<'g> for RecordInfo<'g>
{
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId])
    {
        self.as_type().annotation_parts()
    }
}

impl<'g> Scoped<'g> for RecordInfo<'g>
{
    fn scope_parts(&self) -> (&'g Graph, &'g Scope)
    {
        (self.graph, &self.node().scope)
    }
}

impl PartialEq for RecordInfo<'_>
{
    fn eq(&self, other: &Self) -> bool
    {
        self.as_type() == other.as_type()
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

impl<'g> EnumInfo<'g>
{
    fn node(&self) -> &'g super::EnumNode
    {
        match &self.graph.ty(self.id).kind {
            TypeKind::Enum(enumeration) => enumeration,
            _ => unreachable!("enum handle over a non-enum type"),
        }
    }

    pub fn as_type(&self) -> TypeInfo<'g>
    {
        TypeInfo {
            graph: self.graph,
            id: self.id,
        }
    }

    pub fn size(&self) -> u64
    {
        self.node().size
    }

    pub fn constants(&self) -> impl Iterator<Item = EnumConstantInfo<'g>>
    {
        let graph = self.graph;
        self.node()
            .constants
            .values()
            .map(move |id| EnumConstantInfo { graph, id: *id })
    }

    /// Constant by name.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the enum has no such constant.
    pub fn value(&self, name: &str) -> MirrorResult<EnumConstantInfo<'g>>
    {
        self.node()
            .constants
            .get(name)
            .map(|id| EnumConstantInfo { graph: self.graph, id: *id })
            .ok_or_else(|| MirrorError::not_found(ElementKind::EnumValue, name))
    }
}

impl<'g> Named<'g> for EnumInfo<'g>
{
    fn name(&self) -> &'g str
    {
        self.as_type().name()
    }

    fn full_name(&self) -> &'g str
    {
        self.as_type().full_name()
    }
}

impl<'g> Annotated<'g> for EnumInfo<'g>
{
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId])
    {
        self.as_type().annotation_parts()
    }
}

impl<'g> EnumConstantInfo<'g>
{
    pub fn owner(&self) -> EnumInfo<'g>
    {
        EnumInfo {
            graph: self.graph,
            id: self.graph.constant(self.id).owner,
        }
    }

    /// Raw value in target byte order, sized to the enum's width.
    pub fn bytes(&self) -> &'g [u8]
    {
        &self.graph.constant(self.id).bytes
    }

    /// Value decoded as `T`.
    ///
    /// ## Errors
    ///
    /// Returns `SizeMismatch` if `T` is not as wide as the stored value.
    pub fn get<T: Scalar>(&self) -> MirrorResult<T>
    {
        decode(self.bytes(), self.graph.endian)
    }
}

impl<'g> Named<'g> for EnumConstantInfo<'g>
{
    fn name(&self) -> &'g str
    {
        &self.graph.constant(self.id).name
    }

    fn full_name(&self) -> &'g str
    {
        &self.graph.constant(self.id).full_name
    }
}

impl<'g> Annotated<'g> for EnumConstantInfo<'g>
{
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId])
    {
        (self.graph, &self.graph.constant(self.id).annotations)
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

impl<'g> FieldInfo<'g>
{
    pub fn owner(&self) -> RecordInfo<'g>
    {
        RecordInfo {
            graph: self.graph,
            id: self.graph.field(self.id).owner,
        }
    }

    pub fn ty(&self) -> TypeInfo<'g>
    {
        TypeInfo {
            graph: self.graph,
            id: self.graph.field(self.id).ty,
        }
    }

    /// Byte offset inside the owning record.
    pub fn offset(&self) -> u64
    {
        self.graph.field(self.id).offset
    }

    /// Size of the field's type.
    pub fn size(&self) -> u64
    {
        self.ty().size()
    }

    fn span(&self, instance_len: usize) -> MirrorResult<std::ops::Range<usize>>
    {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(self.size()).unwrap_or(usize::MAX);
        let end = start.saturating_add(size);
        if end > instance_len {
            return Err(MirrorError::SizeMismatch {
                expected: end,
                actual: instance_len,
            });
        }
        Ok(start..end)
    }

    /// Bytes of this field inside `instance`.
    ///
    /// ## Errors
    ///
    /// Returns `SizeMismatch` if `instance` is too short to hold the field.
    pub fn read<'b>(&self, instance: &'b [u8]) -> MirrorResult<&'b [u8]>
    {
        let span = self.span(instance.len())?;
        Ok(&instance[span])
    }

    /// Overwrite this field inside `instance`.
    ///
    /// ## Errors
    ///
    /// Returns `SizeMismatch` if `bytes` is not exactly the field's size or
    /// `instance` is too short to hold the field.
    pub fn write(&self, instance: &mut [u8], bytes: &[u8]) -> MirrorResult<()>
    {
        let span = self.span(instance.len())?;
        if bytes.len() != span.len() {
            return Err(MirrorError::SizeMismatch {
                expected: span.len(),
                actual: bytes.len(),
            });
        }
        instance[span].copy_from_slice(bytes);
        Ok(())
    }

    /// Field value decoded as `T`.
    ///
    /// ## Errors
    ///
    /// Returns `SizeMismatch` if `T` does not have the field's size.
    pub fn get<T: Scalar>(&self, instance: &[u8]) -> MirrorResult<T>
    {
        decode(self.read(instance)?, self.graph.endian)
    }

    /// Encode `value` into this field.
    ///
    /// ## Errors
    ///
    /// Returns `SizeMismatch` if `T` does not have the field's size.
    pub fn set<T: Scalar>(&self, instance: &mut [u8], value: T) -> MirrorResult<()>
    {
        self.write(instance, &value.to_bytes(self.graph.endian))
    }
}

impl<'g> Named<'g> for FieldInfo<'g>
{
    fn name(&self) -> &'g str
    {
        &self.graph.field(self.id).name
    }

    fn full_name(&self) -> &'g str
    {
        &self.graph.field(self.id).full_name
    }
}

impl<'g> Annotated<'g> for FieldInfo<'g>
{
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId])
    {
        (self.graph, &self.graph.field(self.id).annotations)
    }
}

// ---------------------------------------------------------------------------
// Functions and methods
// ---------------------------------------------------------------------------

/// One formal parameter of a function.
#[derive(Clone, Copy)]
pub struct ParameterInfo<'g>
{
    graph: &'g Graph,
    index: usize,
    node: &'g ParameterNode,
}

impl<'g> ParameterInfo<'g>
{
    /// Parameter name; unnamed parameters are called `param<index>`.
    pub fn name(&self) -> &'g str
    {
        &self.node.name
    }

    /// Zero-based position, not counting the implicit object parameter.
    pub fn index(&self) -> usize
    {
        self.index
    }

    pub fn ty(&self) -> TypeInfo<'g>
    {
        TypeInfo {
            graph: self.graph,
            id: self.node.ty,
        }
    }
}

impl fmt::Debug for ParameterInfo<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ParameterInfo")
            .field("name", &self.name())
            .field("type", &self.ty().name())
            .finish()
    }
}

impl<'g> CallableInfo<'g>
{
    /// Owning namespace or record.
    ///
    /// ## Errors
    ///
    /// Returns `Detached` for a function with no owner.
    pub fn owner(&self) -> MirrorResult<ContainerInfo<'g>>
    {
        self.graph
            .function(self.id)
            .parent
            .map(|id| ContainerInfo::new(self.graph, id))
            .ok_or_else(|| MirrorError::Detached(self.name().to_string()))
    }

    /// Whether this is a method of a record.
    pub fn is_method(&self) -> bool
    {
        matches!(self.graph.function(self.id).parent, Some(ContainerId::Record(_)))
    }

    pub fn return_type(&self) -> TypeInfo<'g>
    {
        TypeInfo {
            graph: self.graph,
            id: self.graph.function(self.id).return_type,
        }
    }

    pub fn parameters(&self) -> impl Iterator<Item = ParameterInfo<'g>>
    {
        let graph = self.graph;
        graph
            .function(self.id)
            .parameters
            .iter()
            .enumerate()
            .map(move |(index, node)| ParameterInfo { graph, index, node })
    }

    /// Entry address, when one was recorded. Virtual methods have none.
    pub fn address(&self) -> Option<Address>
    {
        self.graph.function(self.id).address.map(Address::new)
    }

    /// Slot in the dispatch table of a virtual method.
    pub fn vtable_index(&self) -> Option<u64>
    {
        self.graph.function(self.id).vtable_index
    }

    pub fn is_virtual(&self) -> bool
    {
        self.vtable_index().is_some()
    }

    pub fn linkage_name(&self) -> Option<SymbolName>
    {
        self.graph
            .function(self.id)
            .linkage_name
            .as_deref()
            .map(SymbolName::from_linkage)
    }
}

impl<'g> Named<'g> for CallableInfo<'g>
{
    fn name(&self) -> &'g str
    {
        &self.graph.function(self.id).name
    }

    fn full_name(&self) -> &'g str
    {
        &self.graph.function(self.id).full_name
    }
}

impl<'g> Annotated<'g> for CallableInfo<'g>
{
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId])
    {
        (self.graph, &self.graph.function(self.id).annotations)
    }
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

impl<'g> VariableInfo<'g>
{
    /// Owning namespace or record.
    ///
    /// ## Errors
    ///
    /// Returns `Detached` for a variable with no owner.
    pub fn owner(&self) -> MirrorResult<ContainerInfo<'g>>
    {
        self.graph
            .variable(self.id)
            .parent
            .map(|id| ContainerInfo::new(self.graph, id))
            .ok_or_else(|| MirrorError::Detached(self.name().to_string()))
    }

    pub fn ty(&self) -> TypeInfo<'g>
    {
        TypeInfo {
            graph: self.graph,
            id: self.graph.variable(self.id).ty,
        }
    }

    pub fn address(&self) -> Address
    {
        Address::new(self.graph.variable(self.id).address)
    }

    /// Current bytes of the variable.
    ///
    /// ## Errors
    ///
    /// Propagates the memory's error if the variable is not readable.
    pub fn read(&self, memory: &dyn MemoryAccess) -> MirrorResult<Vec<u8>>
    {
        let len = usize::try_from(self.ty().size()).unwrap_or(usize::MAX);
        memory.read_bytes(self.address(), len)
    }

    /// Current value decoded as `T`.
    ///
    /// ## Errors
    ///
    /// Returns `SizeMismatch` if `T` does not have the variable's size.
    pub fn get<T: Scalar>(&self, memory: &dyn MemoryAccess) -> MirrorResult<T>
    {
        decode(&self.read(memory)?, self.graph.endian)
    }
}

impl<'g> Named<'g> for VariableInfo<'g>
{
    fn name(&self) -> &'g str
    {
        &self.graph.variable(self.id).name
    }

    fn full_name(&self) -> &'g str
    {
        &self.graph.variable(self.id).full_name
    }
}

impl<'g> Annotated<'g> for VariableInfo<'g>
{
    fn annotation_parts(&self) -> (&'g Graph, &'g [AnnotationId])
    {
        (self.graph, &self.graph.variable(self.id).annotations)
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

impl<'g> AnnotationInfo<'g>
{
    /// Declared type of the payload, const qualifiers removed.
    pub fn ty(&self) -> TypeInfo<'g>
    {
        TypeInfo {
            graph: self.graph,
            id: self.graph.annotation(self.id).ty,
        }
    }

    pub fn payload(&self) -> &'g AnnotationPayload
    {
        &self.graph.annotation(self.id).payload
    }

    /// The declaration this annotation was attached to.
    pub fn target(&self) -> ElementInfo<'g>
    {
        ElementInfo::new(self.graph, self.graph.annotation(self.id).target)
    }

    /// Payload bytes, sized against the declared type.
    ///
    /// Inline payloads are returned directly; addressable payloads are read
    /// from `memory`.
    ///
    /// ## Errors
    ///
    /// Returns `SizeMismatch` if an inline payload does not have the type's
    /// size, or the memory's error if the address is not readable.
    pub fn data(&self, memory: &dyn MemoryAccess) -> MirrorResult<Vec<u8>>
    {
        let size = usize::try_from(self.ty().size()).unwrap_or(usize::MAX);
        match self.payload() {
            AnnotationPayload::Inline(bytes) if bytes.len() == size => Ok(bytes.clone()),
            AnnotationPayload::Inline(bytes) => Err(MirrorError::SizeMismatch {
                expected: size,
                actual: bytes.len(),
            }),
            AnnotationPayload::Address(address) => memory.read_bytes(Address::new(*address), size),
        }
    }

    /// Payload decoded as `T`.
    ///
    /// ## Errors
    ///
    /// Returns `SizeMismatch` if `T` does not have the payload type's size.
    pub fn get<T: Scalar>(&self, memory: &dyn MemoryAccess) -> MirrorResult<T>
    {
        decode(&self.data(memory)?, self.graph.endian)
    }
}

impl<'g> Named<'g> for AnnotationInfo<'g>
{
    /// Name of the payload type.
    fn name(&self) -> &'g str
    {
        &self.graph.annotation(self.id).name
    }

    fn full_name(&self) -> &'g str
    {
        self.ty().full_name()
    }
}
