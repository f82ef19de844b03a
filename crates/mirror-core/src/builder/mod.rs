//! # Graph Builder
//!
//! One build session walks every compilation unit of a [`DebugSource`] once,
//! depth first, and turns its entries into graph nodes.
//!
//! ## Session state
//!
//! - the container stack: the namespace or record new nodes attach to
//! - the [`OffsetCache`](cache::OffsetCache): one node per entry offset
//! - deferred definitions: out-of-line function bodies waiting for their
//!   declaration's node, patched when the unit ends
//! - the annotation correlator: positions of annotations and declarations,
//!   merged when the unit ends
//! - the type-of table filled by marker variables
//!
//! Nothing here is shared between threads; the finished graph is handed to
//! [`Database`](crate::Database) and never mutated again.
//!
//! ## Failure policy
//!
//! An attribute that cannot be decoded reads as absent, and an entry left
//! without what it needs is skipped with a `trace!` record. A subtree whose
//! children cannot be listed is skipped with a `warn!`; its siblings and the
//! rest of the unit are still walked. Only a unit whose own child list cannot
//! be read is abandoned.

use std::collections::HashMap;

use tracing::{debug, debug_span, info, trace, warn};

use crate::config::BuildOptions;
use crate::error::MirrorResult;
use crate::graph::{ContainerId, ElementId, FunctionId, Graph, TypeId, TypeKind};
use crate::source::{DebugSource, Entry, EntryOffset, Tag};
use crate::types::PrimitiveKind;

mod annotations;
mod cache;
mod inference;
mod members;
mod resolve;

use annotations::Correlator;
use cache::OffsetCache;

/// Decision returned by each dispatch step of the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal
{
    /// The entry was fully handled; do not visit its children.
    Skip,
    /// Visit the children with the container stack as the step left it.
    Descend,
}

/// Counters collected while building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats
{
    pub units: usize,
    pub units_abandoned: usize,
    pub namespaces: usize,
    pub types: usize,
    pub fields: usize,
    pub functions: usize,
    pub variables: usize,
    pub annotations_attached: usize,
    pub annotations_dropped: usize,
    pub markers: usize,
    pub entries_skipped: usize,
    pub cache_hits: u64,
}

/// Result of a build session.
pub(crate) struct BuildOutput
{
    pub(crate) graph: Graph,
    pub(crate) inferred: HashMap<u64, TypeId>,
    pub(crate) stats: BuildStats,
}

/// Walk every unit of `source` and produce a finalized graph.
///
/// ## Errors
///
/// Returns an error only if the list of units cannot be read. Failures inside
/// a unit are logged and skipped.
pub(crate) fn build<S>(source: &S, options: &BuildOptions) -> MirrorResult<BuildOutput>
where
    S: DebugSource + ?Sized,
{
    let units = source.units()?;
    let mut builder = Builder::new(source, options);
    for unit in units {
        builder.walk_unit(unit);
    }
    Ok(builder.finish())
}

pub(crate) struct Builder<'s, S: ?Sized>
{
    source: &'s S,
    options: &'s BuildOptions,
    graph: Graph,
    cache: OffsetCache,
    containers: Vec<ContainerId>,
    callables: HashMap<EntryOffset, FunctionId>,
    definitions: Vec<(EntryOffset, u64)>,
    correlator: Correlator,
    inferred: HashMap<u64, TypeId>,
    anonymous: u64,
    void: TypeId,
    stats: BuildStats,
}

impl<'s, S> Builder<'s, S>
where
    S: DebugSource + ?Sized,
{
    fn new(source: &'s S, options: &'s BuildOptions) -> Self
    {
        let mut graph = Graph::new(source.endian(), source.pointer_size());
        let void = graph.add_type(
            PrimitiveKind::Void.canonical_name().to_string(),
            TypeKind::Primitive {
                kind: PrimitiveKind::Void,
                size: 0,
            },
        );
        graph.attach_type(ContainerId::Namespace(Graph::ROOT), void);

        Self {
            source,
            options,
            graph,
            cache: OffsetCache::new(),
            containers: vec![ContainerId::Namespace(Graph::ROOT)],
            callables: HashMap::new(),
            definitions: Vec::new(),
            correlator: Correlator::default(),
            inferred: HashMap::new(),
            anonymous: 0,
            void,
            stats: BuildStats::default(),
        }
    }

    fn walk_unit(&mut self, unit: EntryOffset)
    {
        let span = debug_span!("unit", offset = %unit);
        let _enter = span.enter();

        self.containers.clear();
        self.containers.push(ContainerId::Namespace(Graph::ROOT));
        let functions_before = self.graph.functions.len();
        let types_before = self.graph.types.len();

        if let Err(err) = self.walk_children(unit) {
            warn!(offset = %unit, error = %err, "abandoning compilation unit");
            self.stats.units_abandoned += 1;
        }

        self.patch_definitions();
        let (attached, dropped) = self.correlate_annotations();
        self.stats.units += 1;

        debug!(
            types = self.graph.types.len() - types_before,
            functions = self.graph.functions.len() - functions_before,
            annotations_attached = attached,
            annotations_dropped = dropped,
            "walked compilation unit"
        );
    }

    /// Visit the children of `parent` in order.
    ///
    /// The container stack is restored after each descent, so a step that
    /// pushes a container and returns [`Traversal::Descend`] scopes that
    /// container to its own subtree.
    fn walk_children(&mut self, parent: EntryOffset) -> MirrorResult<()>
    {
        for entry in self.source.children(parent)? {
            let depth = self.containers.len();
            let step = self.visit(&entry);
            if step == Traversal::Descend {
                if let Err(err) = self.walk_children(entry.offset) {
                    warn!(offset = %entry.offset, error = %err, "skipping unreadable subtree");
                    self.stats.entries_skipped += 1;
                }
                self.containers.truncate(depth);
            }
        }
        Ok(())
    }

    fn visit(&mut self, entry: &Entry) -> Traversal
    {
        if matches!(entry.tag, Tag::Member | Tag::Variable)
            && entry.name().is_some_and(|name| self.options.is_annotation(name))
        {
            self.capture_annotation(entry);
            return Traversal::Skip;
        }

        match entry.tag {
            Tag::Namespace => self.enter_namespace(entry),
            tag if tag.is_type() => {
                if self.resolve(entry, true).is_none() {
                    self.skip(entry, "unresolvable type");
                }
                Traversal::Skip
            }
            Tag::Member => {
                self.build_field(entry);
                Traversal::Skip
            }
            Tag::Inheritance => {
                self.build_supertype(entry);
                Traversal::Skip
            }
            Tag::Subprogram => {
                self.build_function(entry);
                Traversal::Skip
            }
            Tag::Variable => {
                self.build_variable(entry);
                Traversal::Skip
            }
            _ => Traversal::Skip,
        }
    }

    /// Open (or reopen) a namespace under the current one.
    ///
    /// Anonymous namespaces are transparent: their contents land in the
    /// enclosing namespace.
    fn enter_namespace(&mut self, entry: &Entry) -> Traversal
    {
        let ContainerId::Namespace(parent) = self.current() else {
            self.skip(entry, "namespace inside a record");
            return Traversal::Skip;
        };
        let Some(name) = entry.name() else {
            return Traversal::Descend;
        };

        let id = self.graph.child_namespace(parent, name);
        self.mark(entry, ElementId::Namespace(id));
        self.containers.push(ContainerId::Namespace(id));
        Traversal::Descend
    }

    fn current(&self) -> ContainerId
    {
        self.containers
            .last()
            .copied()
            .unwrap_or(ContainerId::Namespace(Graph::ROOT))
    }

    /// Record the source position of a declaration for correlation.
    fn mark(&mut self, entry: &Entry, element: ElementId)
    {
        if let Some(position) = entry.attrs.position() {
            self.correlator.mark(position, element);
        }
    }

    fn skip(&mut self, entry: &Entry, reason: &str)
    {
        self.stats.entries_skipped += 1;
        trace!(offset = %entry.offset, tag = ?entry.tag, name = entry.name().unwrap_or(""), reason, "skipped entry");
    }

    /// Give out-of-line definitions' addresses to their declarations.
    ///
    /// Virtual methods keep no address; they are called through their
    /// dispatch slot.
    fn patch_definitions(&mut self)
    {
        for (declaration, address) in std::mem::take(&mut self.definitions) {
            let Some(id) = self.callables.get(&declaration).copied() else {
                trace!(offset = %declaration, "definition of an unknown declaration");
                continue;
            };
            let function = self.graph.function_mut(id);
            if function.vtable_index.is_none() && function.address.is_none() {
                function.address = Some(address);
            }
        }
    }

    fn finish(mut self) -> BuildOutput
    {
        self.graph.finalize();

        self.stats.namespaces = self.graph.namespaces.len();
        self.stats.types = self.graph.types.len();
        self.stats.fields = self.graph.fields.len();
        self.stats.functions = self.graph.functions.len();
        self.stats.variables = self.graph.variables.len();
        self.stats.markers = self.inferred.len();
        self.stats.cache_hits = self.cache.hits();

        info!(
            units = self.stats.units,
            types = self.stats.types,
            cached_offsets = self.cache.len(),
            functions = self.stats.functions,
            variables = self.stats.variables,
            annotations = self.stats.annotations_attached,
            skipped = self.stats.entries_skipped,
            "reflection database built"
        );

        BuildOutput {
            graph: self.graph,
            inferred: self.inferred,
            stats: self.stats,
        }
    }
}
