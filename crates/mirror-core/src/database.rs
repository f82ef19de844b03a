//! # Reflection Database
//!
//! The finished, read-only result of a build session.
//!
//! A [`Database`] owns the graph and answers by-name and by-address lookups
//! with borrowed handles. Nothing on it takes `&mut self`, so it can be shared
//! across threads behind a plain reference once built.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mirror_core::prelude::*;
//!
//! fn main() -> MirrorResult<()>
//! {
//!     let database = Database::load_current_exe(BuildOptions::from_env()?)?;
//!     let point = database.type_of("Point")?.record()?;
//!     for field in point.fields() {
//!         println!("{} at +{}", field.name(), field.offset());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Process-wide installation
//!
//! [`install`] publishes one database for the rest of the process and
//! [`installed`] returns it. Installation is an explicit call; nothing is
//! built by a static initializer.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use gimli::RunTimeEndian;
use once_cell::sync::OnceCell;
use tracing::info;

use crate::builder::{self, BuildStats};
use crate::config::BuildOptions;
use crate::error::{ElementKind, MirrorError, MirrorResult};
use crate::graph::view::{CallableInfo, NamespaceInfo, TypeInfo};
use crate::graph::{FunctionId, Graph, TypeId, SCOPE_SEPARATOR};
use crate::memory::MemoryAccess;
use crate::source::{BinaryImage, DebugSource, ImageMemory};
use crate::types::{Address, PrimitiveKind};

static INSTALLED: OnceCell<Database> = OnceCell::new();

/// Immutable reflection database.
#[derive(Debug)]
pub struct Database
{
    graph: Graph,
    inferred: HashMap<u64, TypeId>,
    functions_by_address: BTreeMap<u64, FunctionId>,
    memory: Option<ImageMemory>,
    stats: BuildStats,
}

impl Database
{
    /// Build a database from any debug source.
    ///
    /// ## Errors
    ///
    /// Returns an error if the source cannot list its compilation units.
    /// Problems inside a unit are logged and skipped.
    pub fn build<S>(source: &S, options: &BuildOptions) -> MirrorResult<Self>
    where
        S: DebugSource + ?Sized,
    {
        let output = builder::build(source, options)?;
        // The first node with an address wins, so a registered record's
        // method is found ahead of another unit's copy.
        let mut functions_by_address = BTreeMap::new();
        for (index, function) in output.graph.functions.iter().enumerate() {
            let (Some(address), Ok(raw)) = (function.address, u32::try_from(index)) else {
                continue;
            };
            functions_by_address.entry(address).or_insert(FunctionId(raw));
        }

        Ok(Self {
            graph: output.graph,
            inferred: output.inferred,
            functions_by_address,
            memory: None,
            stats: output.stats,
        })
    }

    /// Open an executable and build a database from its debug information.
    ///
    /// The image's allocated sections are kept so variables and addressable
    /// annotations can be read through [`Database::memory`].
    ///
    /// ## Errors
    ///
    /// Returns `Io` or `Object` if the file cannot be read or parsed,
    /// `InvalidArgument` if it carries no debug information, and `Dwarf` if the
    /// unit headers are malformed.
    pub fn load(path: impl AsRef<Path>, options: &BuildOptions) -> MirrorResult<Self>
    {
        let image = BinaryImage::open(path)?;
        if !image.has_debug_info() {
            return Err(MirrorError::InvalidArgument(format!(
                "{} has no debug information",
                image.path().display()
            )));
        }
        let source = image.dwarf_source()?;
        info!(path = %image.path().display(), units = source.unit_count(), "loading debug information");

        let mut database = Self::build(&source, options)?;
        database.memory = Some(image.memory(options.load_bias));
        Ok(database)
    }

    /// Build a database for the running executable.
    ///
    /// ## Errors
    ///
    /// Same as [`Database::load`], plus `Io` if the executable path is unknown.
    pub fn load_current_exe(options: BuildOptions) -> MirrorResult<Self>
    {
        let path = std::env::current_exe()?;
        Self::load(path, &options)
    }

    pub fn root_namespace(&self) -> NamespaceInfo<'_>
    {
        NamespaceInfo {
            graph: &self.graph,
            id: Graph::ROOT,
        }
    }

    /// Namespace by qualified name (`Foo::Bar` or `::Foo::Bar`).
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if no such namespace was declared.
    pub fn namespace(&self, name: &str) -> MirrorResult<NamespaceInfo<'_>>
    {
        self.graph
            .lookup_namespace(name)
            .map(|id| NamespaceInfo { graph: &self.graph, id })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Namespace, name))
    }

    /// Type by qualified name, unqualified name or keyword alias.
    ///
    /// Primitive spellings are normalized, so `"long unsigned int"` and
    /// `"unsigned long"` find the same node.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if no type is registered under `name`.
    pub fn type_of(&self, name: &str) -> MirrorResult<TypeInfo<'_>>
    {
        let trimmed = name.trim();
        let id = self
            .graph
            .lookup_type(trimmed)
            .or_else(|| self.graph.lookup_type(&format!("{SCOPE_SEPARATOR}{trimmed}")))
            .or_else(|| {
                PrimitiveKind::parse(trimmed)
                    .filter(|kind| *kind != PrimitiveKind::Other)
                    .and_then(|kind| self.graph.lookup_primitive(kind))
            })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Type, name))?;
        Ok(TypeInfo { graph: &self.graph, id })
    }

    /// Type inferred for the marker variable at `address`.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if no marker was recorded at that address.
    pub fn type_of_marker(&self, address: Address) -> MirrorResult<TypeInfo<'_>>
    {
        self.inferred
            .get(&address.value())
            .map(|id| TypeInfo {
                graph: &self.graph,
                id: *id,
            })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Marker, address.to_string()))
    }

    /// Function or method whose entry address is exactly `address`.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if no function starts there.
    pub fn function_at(&self, address: Address) -> MirrorResult<CallableInfo<'_>>
    {
        self.functions_by_address
            .get(&address.value())
            .map(|id| CallableInfo {
                graph: &self.graph,
                id: *id,
            })
            .ok_or_else(|| MirrorError::not_found(ElementKind::Function, address.to_string()))
    }

    /// Every registered type, once each, in registration order.
    pub fn types(&self) -> impl Iterator<Item = TypeInfo<'_>>
    {
        let mut seen = std::collections::HashSet::new();
        self.graph
            .registry
            .values()
            .filter(move |id| seen.insert(**id))
            .map(|id| TypeInfo {
                graph: &self.graph,
                id: *id,
            })
    }

    /// Sections of the loaded image, when built with [`Database::load`].
    pub fn memory(&self) -> Option<&dyn MemoryAccess>
    {
        self.memory.as_ref().map(|memory| memory as &dyn MemoryAccess)
    }

    pub fn endian(&self) -> RunTimeEndian
    {
        self.graph.endian
    }

    pub fn pointer_size(&self) -> u64
    {
        self.graph.pointer_size
    }

    pub fn stats(&self) -> &BuildStats
    {
        &self.stats
    }
}

/// Publish `database` for the rest of the process.
///
/// ## Errors
///
/// Returns `InvalidArgument` if a database is already installed.
pub fn install(database: Database) -> MirrorResult<&'static Database>
{
    INSTALLED
        .set(database)
        .map_err(|_| MirrorError::InvalidArgument("a reflection database is already installed".to_string()))?;
    INSTALLED
        .get()
        .ok_or_else(|| MirrorError::InvalidArgument("reflection database installation failed".to_string()))
}

/// The database published by [`install`], if any.
pub fn installed() -> Option<&'static Database>
{
    INSTALLED.get()
}
