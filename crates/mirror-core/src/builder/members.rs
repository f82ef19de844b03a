//! Member builders: fields, supertypes, functions, methods and variables.

use smallvec::SmallVec;
use tracing::trace;

use super::Builder;
use crate::graph::{
    ContainerId, ElementId, FieldNode, FunctionNode, ParameterNode, RecordLayout, TypeId, TypeKind, VariableNode,
};
use crate::source::{DebugSource, Entry, Tag};

impl<S> Builder<'_, S>
where
    S: DebugSource + ?Sized,
{
    pub(super) fn build_field(&mut self, entry: &Entry)
    {
        let ContainerId::Record(owner) = self.current() else {
            self.skip(entry, "member outside a record");
            return;
        };
        let Some(name) = entry.name() else {
            self.skip(entry, "unnamed member");
            return;
        };
        let is_union = self
            .graph
            .record(owner)
            .is_some_and(|record| record.layout == RecordLayout::Union);
        let Some(offset) = entry.attrs.data_member_location.or(is_union.then_some(0)) else {
            self.skip(entry, "member without an instance offset");
            return;
        };
        let Some(ty) = entry.attrs.type_ref.and_then(|offset| self.resolve_offset(offset)) else {
            self.skip(entry, "member type unresolvable");
            return;
        };

        let id = self.graph.add_field(FieldNode {
            name: name.to_string(),
            full_name: String::new(),
            owner,
            ty,
            offset,
            annotations: Vec::new(),
        });
        if let Some(record) = self.graph.record_mut(owner) {
            record.fields.entry(name.to_string()).or_insert(id);
        }
        self.mark(entry, ElementId::Field(id));
    }

    /// Register a base record and fold its ancestors into the current record.
    pub(super) fn build_supertype(&mut self, entry: &Entry)
    {
        let ContainerId::Record(owner) = self.current() else {
            self.skip(entry, "inheritance outside a record");
            return;
        };
        let Some(base) = entry
            .attrs
            .type_ref
            .and_then(|offset| self.resolve_offset(offset))
            .map(|id| self.strip_aliases(id))
        else {
            self.skip(entry, "base type unresolvable");
            return;
        };
        let Some(inherited) = self
            .graph
            .record(base)
            .map(|record| record.ancestors.iter().copied().collect::<Vec<_>>())
        else {
            self.skip(entry, "base type is not a record");
            return;
        };

        if let Some(record) = self.graph.record_mut(owner) {
            if !record.supertypes.contains(&base) {
                record.supertypes.push(base);
            }
            record.ancestors.insert(base);
            record.ancestors.extend(inherited);
        }
    }

    /// Build a function or method, or queue an out-of-line definition.
    pub(super) fn build_function(&mut self, entry: &Entry)
    {
        if let Some(declaration) = entry.attrs.specification {
            if let Some(low_pc) = entry.attrs.low_pc {
                self.definitions
                    .push((declaration, low_pc.wrapping_add(self.options.load_bias)));
            }
            self.scan_body(entry.offset);
            return;
        }
        let Some(name) = entry.name() else {
            self.skip(entry, "unnamed subprogram");
            self.scan_body(entry.offset);
            return;
        };
        let Some(return_type) = self.resolve_or_void(entry.attrs.type_ref) else {
            self.skip(entry, "return type unresolvable");
            return;
        };

        let vtable_index = entry.attrs.vtable_slot.filter(|_| entry.attrs.virtuality);
        let address = if vtable_index.is_some() {
            None
        } else {
            entry
                .attrs
                .low_pc
                .map(|low_pc| low_pc.wrapping_add(self.options.load_bias))
        };
        let container = self.current();
        let parameters = self.parameters(entry);

        let id = self.graph.add_function(FunctionNode {
            name: name.to_string(),
            full_name: String::new(),
            parent: Some(container),
            return_type,
            parameters,
            address,
            vtable_index,
            linkage_name: entry.attrs.linkage_name.clone(),
            annotations: Vec::new(),
        });
        self.callables.insert(entry.offset, id);

        match container {
            ContainerId::Record(owner) => {
                if let Some(record) = self.graph.record_mut(owner) {
                    record.methods.entry(name.to_string()).or_insert(id);
                }
            }
            ContainerId::Namespace(_) => self.graph.attach_function(container, id),
        }
        self.mark(entry, ElementId::Function(id));

        if entry.attrs.low_pc.is_some() {
            self.scan_body(entry.offset);
        }
    }

    /// Formal parameters in order, without the implicit object parameter.
    fn parameters(&mut self, entry: &Entry) -> SmallVec<[ParameterNode; 4]>
    {
        let children = match self.source.children(entry.offset) {
            Ok(children) => children,
            Err(err) => {
                trace!(offset = %entry.offset, error = %err, "parameters unreadable");
                return SmallVec::new();
            }
        };

        let mut parameters: SmallVec<[ParameterNode; 4]> = SmallVec::new();
        for child in children
            .iter()
            .filter(|child| child.tag == Tag::FormalParameter && !child.attrs.artificial)
        {
            let Some(ty) = child.attrs.type_ref.and_then(|offset| self.resolve_offset(offset)) else {
                self.skip(child, "parameter type unresolvable");
                continue;
            };
            let name = match child.name() {
                Some(name) => name.to_string(),
                None => format!("param{}", parameters.len()),
            };
            parameters.push(ParameterNode { name, ty });
        }
        parameters
    }

    pub(super) fn build_variable(&mut self, entry: &Entry)
    {
        let Some(name) = entry.name() else {
            self.skip(entry, "unnamed variable");
            return;
        };
        if self.options.is_typeof_marker(name) {
            self.infer_marker(entry);
            return;
        }
        let Some(location) = entry.attrs.location else {
            self.skip(entry, "variable without a static address");
            return;
        };
        let Some(ty) = entry.attrs.type_ref.and_then(|offset| self.resolve_offset(offset)) else {
            self.skip(entry, "variable type unresolvable");
            return;
        };

        let container = self.current();
        let id = self.graph.add_variable(VariableNode {
            name: name.to_string(),
            full_name: String::new(),
            parent: Some(container),
            ty,
            address: location.wrapping_add(self.options.load_bias),
            annotations: Vec::new(),
        });
        self.graph.attach_variable(container, id);
        self.mark(entry, ElementId::Variable(id));
    }

    fn strip_aliases(&self, mut id: TypeId) -> TypeId
    {
        while let TypeKind::Const { underlying } | TypeKind::Alias { underlying } = self.graph.ty(id).kind {
            id = underlying;
        }
        id
    }
}
