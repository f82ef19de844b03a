//! Type-of inference through marker variables.
//!
//! A marker is a variable with the reserved marker name whose declared type
//! is a pointer to the type of the expression being asked about. The pointee
//! is recorded under the marker's address, so a runtime lookup by that
//! address returns the expression's type.

use tracing::trace;

use super::Builder;
use crate::graph::TypeKind;
use crate::source::{DebugSource, Entry, EntryOffset, Tag};

impl<S> Builder<'_, S>
where
    S: DebugSource + ?Sized,
{
    /// Look for markers in a function body, including nested blocks.
    pub(super) fn scan_body(&mut self, offset: EntryOffset)
    {
        let children = match self.source.children(offset) {
            Ok(children) => children,
            Err(err) => {
                trace!(%offset, error = %err, "function body unreadable");
                return;
            }
        };

        for child in &children {
            match child.tag {
                Tag::Variable if child.name().is_some_and(|name| self.options.is_typeof_marker(name)) => {
                    self.infer_marker(child);
                }
                Tag::LexicalBlock => self.scan_body(child.offset),
                _ => {}
            }
        }
    }

    pub(super) fn infer_marker(&mut self, entry: &Entry)
    {
        let Some(location) = entry.attrs.location else {
            self.skip(entry, "marker without a static address");
            return;
        };
        let Some(marker_type) = entry.attrs.type_ref.and_then(|offset| self.resolve_offset(offset)) else {
            self.skip(entry, "marker type unresolvable");
            return;
        };
        let TypeKind::Pointer { pointee, .. } = self.graph.ty(marker_type).kind else {
            self.skip(entry, "marker is not pointer-typed");
            return;
        };

        let address = location.wrapping_add(self.options.load_bias);
        trace!(offset = %entry.offset, address, "inferred expression type");
        self.inferred.insert(address, pointee);
    }
}
