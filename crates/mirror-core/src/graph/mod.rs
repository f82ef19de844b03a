//! # Reflection Graph
//!
//! Arena that owns every namespace, type, member and annotation.
//!
//! ## Ownership
//!
//! The graph is logically cyclic: a record lists its fields, each field points
//! back at its record, and a pointer type can point at a record holding that
//! same pointer. All of those links are typed ids into the arena vectors, so
//! the arena is the sole owner and nothing is reference counted.
//!
//! ## Lifecycle
//!
//! The builder mutates the graph while it walks the debug tree, then calls
//! [`Graph::finalize`] once to fix every qualified name and fill the
//! name-to-type registry. After that the graph is only read, through the
//! borrowed handles in [`view`].

use std::collections::HashMap;

use gimli::RunTimeEndian;
use indexmap::IndexMap;

pub mod node;
pub mod view;

pub use node::{
    AnnotationId, AnnotationPayload, ContainerId, ElementId, EnumConstantId, FieldId, FunctionId, NamespaceId,
    RecordLayout, Scope, TypeId, VariableId,
};
pub(crate) use node::{
    AnnotationNode, EnumConstantNode, EnumNode, FieldNode, FunctionNode, NamespaceNode, ParameterNode, RecordNode,
    TypeKind, TypeNode, VariableNode,
};
use crate::types::PrimitiveKind;

/// Scope operator joining qualified names.
pub const SCOPE_SEPARATOR: &str = "::";

pub(crate) fn qualify(prefix: &str, name: &str) -> String
{
    format!("{prefix}{SCOPE_SEPARATOR}{name}")
}

fn next_id(len: usize) -> u32
{
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// The arena.
#[derive(Debug, Clone)]
pub struct Graph
{
    pub(crate) namespaces: Vec<NamespaceNode>,
    pub(crate) types: Vec<TypeNode>,
    pub(crate) fields: Vec<FieldNode>,
    pub(crate) functions: Vec<FunctionNode>,
    pub(crate) variables: Vec<VariableNode>,
    pub(crate) constants: Vec<EnumConstantNode>,
    pub(crate) annotations: Vec<AnnotationNode>,
    pub(crate) registry: IndexMap<String, TypeId>,
    pub(crate) primitives: HashMap<PrimitiveKind, TypeId>,
    pub(crate) endian: RunTimeEndian,
    pub(crate) pointer_size: u64,
}

impl Graph
{
    /// The root namespace, whose qualified name is empty.
    pub const ROOT: NamespaceId = NamespaceId(0);

    pub(crate) fn new(endian: RunTimeEndian, pointer_size: u64) -> Self
    {
        Self {
            namespaces: vec![NamespaceNode {
                name: String::new(),
                full_name: String::new(),
                parent: None,
                namespaces: IndexMap::new(),
                scope: Scope::default(),
                annotations: Vec::new(),
            }],
            types: Vec::new(),
            fields: Vec::new(),
            functions: Vec::new(),
            variables: Vec::new(),
            constants: Vec::new(),
            annotations: Vec::new(),
            registry: IndexMap::new(),
            primitives: HashMap::new(),
            endian,
            pointer_size,
        }
    }

    pub(crate) fn namespace(&self, id: NamespaceId) -> &NamespaceNode
    {
        &self.namespaces[id.index()]
    }

    pub(crate) fn ty(&self, id: TypeId) -> &TypeNode
    {
        &self.types[id.index()]
    }

    pub(crate) fn ty_mut(&mut self, id: TypeId) -> &mut TypeNode
    {
        &mut self.types[id.index()]
    }

    pub(crate) fn field(&self, id: FieldId) -> &FieldNode
    {
        &self.fields[id.index()]
    }

    pub(crate) fn function(&self, id: FunctionId) -> &FunctionNode
    {
        &self.functions[id.index()]
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> &mut FunctionNode
    {
        &mut self.functions[id.index()]
    }

    pub(crate) fn variable(&self, id: VariableId) -> &VariableNode
    {
        &self.variables[id.index()]
    }

    pub(crate) fn constant(&self, id: EnumConstantId) -> &EnumConstantNode
    {
        &self.constants[id.index()]
    }

    pub(crate) fn annotation(&self, id: AnnotationId) -> &AnnotationNode
    {
        &self.annotations[id.index()]
    }

    pub(crate) fn record(&self, id: TypeId) -> Option<&RecordNode>
    {
        match &self.ty(id).kind {
            TypeKind::Record(record) => Some(record),
            _ => None,
        }
    }

    pub(crate) fn record_mut(&mut self, id: TypeId) -> Option<&mut RecordNode>
    {
        match &mut self.ty_mut(id).kind {
            TypeKind::Record(record) => Some(record),
            _ => None,
        }
    }

    pub(crate) fn scope(&self, container: ContainerId) -> Option<&Scope>
    {
        match container {
            ContainerId::Namespace(id) => Some(&self.namespace(id).scope),
            ContainerId::Record(id) => self.record(id).map(|record| &record.scope),
        }
    }

    fn scope_mut(&mut self, container: ContainerId) -> Option<&mut Scope>
    {
        match container {
            ContainerId::Namespace(id) => Some(&mut self.namespaces[id.index()].scope),
            ContainerId::Record(id) => self.record_mut(id).map(|record| &mut record.scope),
        }
    }

    /// Child namespace `name` of `parent`, created on first use.
    pub(crate) fn child_namespace(&mut self, parent: NamespaceId, name: &str) -> NamespaceId
    {
        if let Some(existing) = self.namespace(parent).namespaces.get(name) {
            return *existing;
        }
        let id = NamespaceId(next_id(self.namespaces.len()));
        self.namespaces.push(NamespaceNode {
            name: name.to_string(),
            full_name: String::new(),
            parent: Some(parent),
            namespaces: IndexMap::new(),
            scope: Scope::default(),
            annotations: Vec::new(),
        });
        self.namespaces[parent.index()].namespaces.insert(name.to_string(), id);
        id
    }

    pub(crate) fn add_type(&mut self, name: String, kind: TypeKind) -> TypeId
    {
        let id = TypeId(next_id(self.types.len()));
        self.types.push(TypeNode {
            full_name: String::new(),
            name,
            parent: None,
            kind,
            annotations: Vec::new(),
        });
        id
    }

    pub(crate) fn add_field(&mut self, node: FieldNode) -> FieldId
    {
        let id = FieldId(next_id(self.fields.len()));
        self.fields.push(node);
        id
    }

    pub(crate) fn add_function(&mut self, node: FunctionNode) -> FunctionId
    {
        let id = FunctionId(next_id(self.functions.len()));
        self.functions.push(node);
        id
    }

    pub(crate) fn add_variable(&mut self, node: VariableNode) -> VariableId
    {
        let id = VariableId(next_id(self.variables.len()));
        self.variables.push(node);
        id
    }

    pub(crate) fn add_constant(&mut self, node: EnumConstantNode) -> EnumConstantId
    {
        let id = EnumConstantId(next_id(self.constants.len()));
        self.constants.push(node);
        id
    }

    /// Store an annotation and link it from its target.
    pub(crate) fn add_annotation(&mut self, node: AnnotationNode) -> AnnotationId
    {
        let id = AnnotationId(next_id(self.annotations.len()));
        let target = node.target;
        self.annotations.push(node);
        self.annotations_mut(target).push(id);
        id
    }

    fn annotations_mut(&mut self, element: ElementId) -> &mut Vec<AnnotationId>
    {
        match element {
            ElementId::Namespace(id) => &mut self.namespaces[id.index()].annotations,
            ElementId::Type(id) => &mut self.types[id.index()].annotations,
            ElementId::Field(id) => &mut self.fields[id.index()].annotations,
            ElementId::Function(id) => &mut self.functions[id.index()].annotations,
            ElementId::Variable(id) => &mut self.variables[id.index()].annotations,
            ElementId::EnumConstant(id) => &mut self.constants[id.index()].annotations,
        }
    }

    /// Attach `id` to `container` and list it in the container's scope.
    ///
    /// Re-attaching to the same container is a no-op. A declaration-only
    /// record never displaces a definition of the same name.
    pub(crate) fn attach_type(&mut self, container: ContainerId, id: TypeId)
    {
        self.ty_mut(id).parent = Some(container);
        let name = self.ty(id).name.clone();
        let existing = self.scope(container).and_then(|scope| scope.types.get(&name).copied());
        let replace = match existing {
            None => true,
            Some(old) => old != id && self.ty(old).is_declaration() && !self.ty(id).is_declaration(),
        };
        if replace {
            if let Some(scope) = self.scope_mut(container) {
                scope.types.insert(name, id);
            }
        }
    }

    /// List a function in a container scope. An earlier entry is only
    /// replaced when it has no address and the new one does.
    pub(crate) fn attach_function(&mut self, container: ContainerId, id: FunctionId)
    {
        let name = self.function(id).name.clone();
        let existing = self.scope(container).and_then(|scope| scope.functions.get(&name).copied());
        let replace = match existing {
            None => true,
            Some(old) => self.function(old).address.is_none() && self.function(id).address.is_some(),
        };
        if replace {
            if let Some(scope) = self.scope_mut(container) {
                scope.functions.insert(name, id);
            }
        }
    }

    pub(crate) fn attach_variable(&mut self, container: ContainerId, id: VariableId)
    {
        let name = self.variable(id).name.clone();
        if let Some(scope) = self.scope_mut(container) {
            scope.variables.entry(name).or_insert(id);
        }
    }

    pub(crate) fn container_full_name(&self, container: ContainerId) -> &str
    {
        match container {
            ContainerId::Namespace(id) => &self.namespace(id).full_name,
            ContainerId::Record(id) => &self.ty(id).full_name,
        }
    }

    /// Fix every qualified name and build the type registry.
    pub(crate) fn finalize(&mut self)
    {
        for index in 1..self.namespaces.len() {
            let parent = self.namespaces[index].parent.unwrap_or(Self::ROOT);
            self.namespaces[index].full_name = qualify(&self.namespaces[parent.index()].full_name, &self.namespaces[index].name);
        }

        let mut done = vec![false; self.types.len()];
        for index in 0..self.types.len() {
            self.name_type(TypeId(next_id(index)), &mut done);
        }

        for index in 0..self.fields.len() {
            let owner = self.fields[index].owner;
            self.fields[index].full_name = qualify(&self.ty(owner).full_name, &self.fields[index].name);
        }
        for index in 0..self.constants.len() {
            let owner = self.constants[index].owner;
            self.constants[index].full_name = qualify(&self.ty(owner).full_name, &self.constants[index].name);
        }
        for index in 0..self.functions.len() {
            let full_name = match self.functions[index].parent {
                Some(parent) => qualify(self.container_full_name(parent), &self.functions[index].name),
                None => self.functions[index].name.clone(),
            };
            self.functions[index].full_name = full_name;
        }
        for index in 0..self.variables.len() {
            let full_name = match self.variables[index].parent {
                Some(parent) => qualify(self.container_full_name(parent), &self.variables[index].name),
                None => self.variables[index].name.clone(),
            };
            self.variables[index].full_name = full_name;
        }

        self.registry.clear();
        self.register_scope(ContainerId::Namespace(Self::ROOT));
        self.share_method_addresses();
    }

    /// Give registered records the addresses of methods defined through
    /// another unit's copy of the same record.
    ///
    /// A header included by several units yields one record per unit, and
    /// an out-of-line definition only patches the copy in its own unit.
    fn share_method_addresses(&mut self)
    {
        let mut resolved = Vec::new();
        for index in 0..self.types.len() {
            let id = TypeId(next_id(index));
            let Some(record) = self.record(id) else {
                continue;
            };
            let Some(registered) = self.lookup_type(&self.ty(id).full_name) else {
                continue;
            };
            if registered == id {
                continue;
            }
            for (name, method) in &record.methods {
                if let Some(address) = self.function(*method).address {
                    resolved.push((registered, name.clone(), address));
                }
            }
        }

        for (registered, name, address) in resolved {
            let Some(method) = self.record(registered).and_then(|record| record.methods.get(&name).copied()) else {
                continue;
            };
            let function = self.function_mut(method);
            if function.vtable_index.is_none() && function.address.is_none() {
                function.address = Some(address);
            }
        }
    }

    fn name_type(&mut self, id: TypeId, done: &mut [bool])
    {
        if done[id.index()] {
            return;
        }
        done[id.index()] = true;
        let parent = self.ty(id).parent;
        let full_name = match parent {
            Some(ContainerId::Namespace(parent)) => qualify(&self.namespace(parent).full_name, &self.ty(id).name),
            Some(ContainerId::Record(parent)) => {
                self.name_type(parent, done);
                qualify(&self.ty(parent).full_name, &self.ty(id).name)
            }
            None => self.ty(id).name.clone(),
        };
        self.ty_mut(id).full_name = full_name;
    }

    fn register_scope(&mut self, container: ContainerId)
    {
        let types: Vec<TypeId> = self
            .scope(container)
            .map(|scope| scope.types.values().copied().collect())
            .unwrap_or_default();
        for id in types {
            self.register_type(id);
            if self.record(id).is_some() {
                self.register_scope(ContainerId::Record(id));
            }
        }

        if let ContainerId::Namespace(namespace) = container {
            let children: Vec<NamespaceId> = self.namespace(namespace).namespaces.values().copied().collect();
            for child in children {
                self.register_scope(ContainerId::Namespace(child));
            }
        }
    }

    fn register_type(&mut self, id: TypeId)
    {
        let node = self.ty(id);
        let full_name = node.full_name.clone();
        let unqualified = full_name
            .strip_prefix(SCOPE_SEPARATOR)
            .unwrap_or(&full_name)
            .to_string();
        let keyword = match &node.kind {
            TypeKind::Record(record) => Some(record.layout.keyword()),
            TypeKind::Enum(_) => Some("enum"),
            _ => None,
        };
        if let TypeKind::Primitive { kind, .. } = node.kind {
            if kind != PrimitiveKind::Other {
                self.primitives.entry(kind).or_insert(id);
            }
        }

        let mut names = vec![full_name, unqualified.clone()];
        if let Some(keyword) = keyword {
            names.push(format!("{keyword} {unqualified}"));
        }
        for name in names {
            self.register_name(name, id);
        }
    }

    fn register_name(&mut self, name: String, id: TypeId)
    {
        let replace = match self.registry.get(&name) {
            None => true,
            Some(old) => *old != id && self.ty(*old).is_declaration() && !self.ty(id).is_declaration(),
        };
        if replace {
            self.registry.insert(name, id);
        }
    }

    /// Look up a registered type by exact name.
    pub(crate) fn lookup_type(&self, name: &str) -> Option<TypeId>
    {
        self.registry.get(name).copied()
    }

    pub(crate) fn lookup_primitive(&self, kind: PrimitiveKind) -> Option<TypeId>
    {
        self.primitives.get(&kind).copied()
    }

    /// Namespace reached by following `path` (`Foo::Bar`, with or without a
    /// leading separator) from the root.
    pub(crate) fn lookup_namespace(&self, path: &str) -> Option<NamespaceId>
    {
        let mut current = Self::ROOT;
        for component in path.split(SCOPE_SEPARATOR).filter(|component| !component.is_empty()) {
            current = *self.namespace(current).namespaces.get(component)?;
        }
        Some(current)
    }
}
