//! Type resolution.
//!
//! `resolve` turns a type entry into a node, going through the offset cache
//! first. A type reached through a reference (a field type, a pointee) is
//! built with `register == false` and stays unattached until the walk reaches
//! its own declaration.

use tracing::trace;

use super::Builder;
use crate::graph::{ContainerId, ElementId, EnumConstantNode, EnumNode, RecordLayout, RecordNode, TypeId, TypeKind};
use crate::graph::view::TypeInfo;
use crate::memory::integer_bytes;
use crate::source::{ConstValue, DebugSource, Entry, EntryOffset, Tag};
use crate::types::PrimitiveKind;

impl<S> Builder<'_, S>
where
    S: DebugSource + ?Sized,
{
    /// Resolve the type entry at `offset`, building it if needed.
    pub(super) fn resolve_offset(&mut self, offset: EntryOffset) -> Option<TypeId>
    {
        if let Some(id) = self.cache.get(offset) {
            return Some(id);
        }
        match self.source.entry(offset) {
            Ok(entry) => self.resolve(&entry, false),
            Err(err) => {
                trace!(%offset, error = %err, "dangling type reference");
                None
            }
        }
    }

    /// Resolve an optional reference where absence means `void`.
    pub(super) fn resolve_or_void(&mut self, offset: Option<EntryOffset>) -> Option<TypeId>
    {
        match offset {
            Some(offset) => self.resolve_offset(offset),
            None => Some(self.void),
        }
    }

    /// Build (or fetch) the node for a type entry.
    ///
    /// With `register`, the node is attached to the current container even
    /// when it was already built through a forward reference.
    pub(super) fn resolve(&mut self, entry: &Entry, register: bool) -> Option<TypeId>
    {
        if let Some(id) = self.cache.get(entry.offset) {
            if register && entry.tag != Tag::VolatileType {
                self.attach(id, entry);
            }
            return Some(id);
        }

        let (name, kind) = match entry.tag {
            Tag::BaseType => self.primitive(entry)?,
            Tag::PointerType => self.pointer(entry)?,
            Tag::ConstType => {
                let underlying = self.resolve_offset(entry.attrs.type_ref?)?;
                (format!("{} const", self.graph.ty(underlying).name), TypeKind::Const { underlying })
            }
            Tag::VolatileType => {
                let underlying = self.resolve_or_void(entry.attrs.type_ref)?;
                return Some(self.cache.insert(entry.offset, underlying));
            }
            Tag::Typedef => {
                let name = entry.name()?.to_string();
                let underlying = self.resolve_offset(entry.attrs.type_ref?)?;
                (name, TypeKind::Alias { underlying })
            }
            Tag::UnspecifiedType => {
                let name = entry.name()?.to_string();
                let size = if name == self.options.null_pointer_spelling {
                    self.graph.pointer_size
                } else {
                    entry.attrs.byte_size.unwrap_or(0)
                };
                (name, TypeKind::Unspecified { size })
            }
            Tag::StructureType | Tag::ClassType | Tag::UnionType => return Some(self.record(entry, register)),
            Tag::EnumerationType => return Some(self.enumeration(entry, register)),
            _ => return None,
        };

        // Resolving the inner type may have reached this entry again.
        if let Some(id) = self.cache.get(entry.offset) {
            if register {
                self.attach(id, entry);
            }
            return Some(id);
        }

        let id = self.graph.add_type(name, kind);
        self.cache.insert(entry.offset, id);
        if register {
            self.attach(id, entry);
        }
        Some(id)
    }

    fn primitive(&mut self, entry: &Entry) -> Option<(String, TypeKind)>
    {
        let name = entry.name()?;
        let size = entry.attrs.byte_size?;
        let kind = PrimitiveKind::parse(name).unwrap_or(PrimitiveKind::Other);
        Some((name.to_string(), TypeKind::Primitive { kind, size }))
    }

    fn pointer(&mut self, entry: &Entry) -> Option<(String, TypeKind)>
    {
        let size = entry.attrs.byte_size?;
        let pointee = self.resolve_or_void(entry.attrs.type_ref)?;
        Some((format!("{}*", self.graph.ty(pointee).name), TypeKind::Pointer { pointee, size }))
    }

    /// Build a struct, class or union with its whole member set.
    ///
    /// The node is cached before its members are visited so members can
    /// refer back to it.
    fn record(&mut self, entry: &Entry, register: bool) -> TypeId
    {
        let layout = match entry.tag {
            Tag::ClassType => RecordLayout::Class,
            Tag::UnionType => RecordLayout::Union,
            _ => RecordLayout::Struct,
        };
        let name = self.type_name(entry);
        let size = entry.attrs.byte_size.unwrap_or(0);
        let id = self
            .graph
            .add_type(name, TypeKind::Record(RecordNode::new(layout, size, entry.attrs.declaration)));
        self.cache.insert(entry.offset, id);

        let depth = self.containers.len();
        self.containers.push(ContainerId::Record(id));
        let result = self.walk_children(entry.offset);
        self.containers.truncate(depth);
        if let Err(err) = result {
            trace!(offset = %entry.offset, error = %err, "record members truncated");
        }

        if register {
            self.attach(id, entry);
        }
        id
    }

    fn enumeration(&mut self, entry: &Entry, register: bool) -> TypeId
    {
        let name = self.type_name(entry);
        let size = entry.attrs.byte_size.unwrap_or(0);
        let id = self.graph.add_type(
            name,
            TypeKind::Enum(EnumNode {
                size,
                declaration: entry.attrs.declaration,
                constants: Default::default(),
            }),
        );
        self.cache.insert(entry.offset, id);

        match self.source.children(entry.offset) {
            Ok(children) => {
                for child in children.iter().filter(|child| child.tag == Tag::Enumerator) {
                    self.enum_constant(child, id, size);
                }
            }
            Err(err) => trace!(offset = %entry.offset, error = %err, "enumerators unreadable"),
        }

        if register {
            self.attach(id, entry);
        }
        id
    }

    /// Materialize one enumerator sized to the enum's width.
    fn enum_constant(&mut self, entry: &Entry, owner: TypeId, width: u64)
    {
        let Some(name) = entry.name() else {
            self.skip(entry, "unnamed enumerator");
            return;
        };
        let endian = self.graph.endian;
        let bytes = match &entry.attrs.const_value {
            Some(ConstValue::Block(block)) => Some(block.clone()),
            Some(ConstValue::Unsigned(value)) => integer_bytes(*value, width, endian),
            Some(ConstValue::Signed(value)) => integer_bytes(*value as u64, width, endian),
            None => None,
        };
        let Some(bytes) = bytes else {
            self.skip(entry, "enumerator value missing or of unsupported width");
            return;
        };

        let id = self.graph.add_constant(EnumConstantNode {
            name: name.to_string(),
            full_name: String::new(),
            owner,
            bytes: bytes.into_iter().collect(),
            annotations: Vec::new(),
        });
        if let TypeKind::Enum(enumeration) = &mut self.graph.ty_mut(owner).kind {
            enumeration.constants.entry(name.to_string()).or_insert(id);
        }
        self.mark(entry, ElementId::EnumConstant(id));
    }

    fn type_name(&mut self, entry: &Entry) -> String
    {
        match entry.name() {
            Some(name) => name.to_string(),
            None => {
                let name = format!("anonymous#{}", self.anonymous);
                self.anonymous += 1;
                name
            }
        }
    }

    /// Attach a type to the current container at its declaration.
    pub(super) fn attach(&mut self, id: TypeId, entry: &Entry)
    {
        let container = self.current();
        if container == ContainerId::Record(id) {
            return;
        }
        self.graph.attach_type(container, id);
        self.mark(entry, ElementId::Type(id));
    }

    /// Size of a built type, following const and alias links.
    pub(super) fn type_size(&self, id: TypeId) -> u64
    {
        TypeInfo { graph: &self.graph, id }.size()
    }

    /// Peel const qualifiers off a type.
    pub(super) fn strip_const(&self, mut id: TypeId) -> TypeId
    {
        while let TypeKind::Const { underlying } = self.graph.ty(id).kind {
            id = underlying;
        }
        id
    }
}
