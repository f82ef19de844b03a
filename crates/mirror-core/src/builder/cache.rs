//! # Offset Cache
//!
//! Per-session map from debug-entry offset to the type node built for it.
//!
//! Every type reference is resolved through this cache, so one entry yields
//! exactly one node no matter how many fields, pointers or aliases reach it,
//! and a forward reference builds the node once, ahead of its declaration.

use std::collections::HashMap;

use crate::graph::TypeId;
use crate::source::EntryOffset;

/// Offset-keyed node cache for one build session.
#[derive(Debug, Default)]
pub(crate) struct OffsetCache
{
    types: HashMap<EntryOffset, TypeId>,
    hits: u64,
}

impl OffsetCache
{
    pub(crate) fn new() -> Self
    {
        Self::default()
    }

    /// Node previously built for `offset`.
    pub(crate) fn get(&mut self, offset: EntryOffset) -> Option<TypeId>
    {
        let found = self.types.get(&offset).copied();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    /// Record the node built for `offset`.
    ///
    /// The first node stored for an offset stays; a later insert for the same
    /// offset returns the existing node instead.
    pub(crate) fn insert(&mut self, offset: EntryOffset, id: TypeId) -> TypeId
    {
        *self.types.entry(offset).or_insert(id)
    }

    pub(crate) fn len(&self) -> usize
    {
        self.types.len()
    }

    /// Lookups answered from the cache.
    pub(crate) fn hits(&self) -> u64
    {
        self.hits
    }
}
