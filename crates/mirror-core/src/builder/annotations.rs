//! # Annotation Correlation
//!
//! Annotations are declarations whose name carries the reserved prefix. They
//! are not attached where they appear; instead both annotations and ordinary
//! declarations are keyed by source position while a unit is walked, and when
//! the unit ends each annotation goes to the first declaration at a strictly
//! later position.
//!
//! The merge is positional, not lexical: an annotation on the last line of a
//! record can land on whatever is declared next, in any scope. An annotation
//! with nothing after it in the unit is dropped.

use std::collections::BTreeMap;

use tracing::trace;

use super::Builder;
use crate::graph::{AnnotationNode, AnnotationPayload, ElementId, TypeId};
use crate::memory::integer_bytes;
use crate::source::{ConstValue, DebugSource, Entry};

/// An annotation captured during the walk, not yet attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingAnnotation
{
    pub(crate) name: String,
    pub(crate) ty: TypeId,
    pub(crate) payload: AnnotationPayload,
}

/// Per-unit position maps.
#[derive(Debug, Default)]
pub(crate) struct Correlator
{
    annotations: BTreeMap<u64, Vec<PendingAnnotation>>,
    annotated: BTreeMap<u64, ElementId>,
}

impl Correlator
{
    pub(crate) fn annotation(&mut self, position: u64, annotation: PendingAnnotation)
    {
        self.annotations.entry(position).or_default().push(annotation);
    }

    /// Record a declaration. A later declaration on the same line replaces
    /// an earlier one.
    pub(crate) fn mark(&mut self, position: u64, element: ElementId)
    {
        self.annotated.insert(position, element);
    }

    /// Merge both maps and clear them.
    pub(crate) fn drain(&mut self) -> Correlation<PendingAnnotation, ElementId>
    {
        let annotations = std::mem::take(&mut self.annotations);
        let annotated = std::mem::take(&mut self.annotated);
        correlate(
            annotations
                .into_iter()
                .flat_map(|(position, list)| list.into_iter().map(move |annotation| (position, annotation))),
            &annotated,
        )
    }
}

/// Outcome of one merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Correlation<A, D>
{
    pub(crate) attached: Vec<(A, D)>,
    pub(crate) dropped: Vec<A>,
}

/// Attach each annotation to the first declaration strictly after it.
///
/// `annotations` must be in ascending position order. Both streams are walked
/// once.
pub(crate) fn correlate<A, D>(annotations: impl IntoIterator<Item = (u64, A)>, annotated: &BTreeMap<u64, D>) -> Correlation<A, D>
where
    D: Copy,
{
    let mut cursor = annotated.iter().peekable();
    let mut result = Correlation {
        attached: Vec::new(),
        dropped: Vec::new(),
    };

    for (position, annotation) in annotations {
        while cursor.peek().is_some_and(|(key, _)| **key <= position) {
            cursor.next();
        }
        match cursor.peek() {
            Some((_, declaration)) => result.attached.push((annotation, **declaration)),
            None => result.dropped.push(annotation),
        }
    }
    result
}

impl<S> Builder<'_, S>
where
    S: DebugSource + ?Sized,
{
    /// Capture an annotation declaration for the end-of-unit merge.
    pub(super) fn capture_annotation(&mut self, entry: &Entry)
    {
        let Some(position) = entry.attrs.position() else {
            self.skip(entry, "annotation without a source position");
            return;
        };
        let Some(ty) = entry
            .attrs
            .type_ref
            .and_then(|offset| self.resolve_offset(offset))
            .map(|id| self.strip_const(id))
        else {
            self.skip(entry, "annotation type unresolvable");
            return;
        };

        let size = self.type_size(ty);
        let endian = self.graph.endian;
        let payload = match (&entry.attrs.location, &entry.attrs.const_value) {
            (Some(address), _) => Some(AnnotationPayload::Address(address.wrapping_add(self.options.load_bias))),
            (None, Some(ConstValue::Block(bytes))) => Some(AnnotationPayload::Inline(bytes.clone())),
            (None, Some(ConstValue::Unsigned(value))) => integer_bytes(*value, size, endian).map(AnnotationPayload::Inline),
            (None, Some(ConstValue::Signed(value))) => {
                integer_bytes(*value as u64, size, endian).map(AnnotationPayload::Inline)
            }
            (None, None) => None,
        };
        let Some(payload) = payload else {
            self.skip(entry, "annotation without a payload");
            return;
        };

        let name = self.graph.ty(ty).name.clone();
        trace!(offset = %entry.offset, %name, position, "captured annotation");
        self.correlator.annotation(position, PendingAnnotation { name, ty, payload });
    }

    /// Attach this unit's annotations; returns `(attached, dropped)`.
    pub(super) fn correlate_annotations(&mut self) -> (usize, usize)
    {
        let Correlation { attached, dropped } = self.correlator.drain();
        for annotation in &dropped {
            trace!(name = %annotation.name, "annotation has no following declaration");
        }

        let attached_count = attached.len();
        for (annotation, target) in attached {
            self.graph.add_annotation(AnnotationNode {
                name: annotation.name,
                ty: annotation.ty,
                payload: annotation.payload,
                target,
            });
        }

        self.stats.annotations_attached += attached_count;
        self.stats.annotations_dropped += dropped.len();
        (attached_count, dropped.len())
    }
}
