//! # mirror-core
//!
//! In-process reflection database built from a program's DWARF debug
//! information.
//!
//! This crate provides:
//! - A debug-source seam over `gimli` (and an in-memory tree for tests)
//! - The graph builder: offset cache, type resolver, container and member
//!   builders, annotation correlator, type-of inference
//! - An immutable [`Database`] answering lookups by name and by address
//! - Byte-level reflective access to fields, enum constants and annotations
//!
//! ## Building
//!
//! A database is built once, explicitly, before it is read:
//!
//! ```rust
//! use mirror_core::prelude::*;
//! use mirror_core::source::{MemorySource, Tag};
//!
//! let mut source = MemorySource::default();
//! let unit = source.unit();
//! let int = source.add(unit, Tag::BaseType).with_name("int").with_byte_size(4).offset();
//! let point = source.add(unit, Tag::StructureType).with_name("Point").with_byte_size(8).offset();
//! source.add(point, Tag::Member).with_name("x").with_type(int).with_member_offset(0);
//! source.add(point, Tag::Member).with_name("y").with_type(int).with_member_offset(4);
//!
//! let database = Database::build(&source, &BuildOptions::default()).unwrap();
//! let point = database.type_of("Point").unwrap().record().unwrap();
//! assert_eq!(point.field("y").unwrap().offset(), 4);
//! ```
//!
//! After that the graph never changes and may be read from any thread.

mod builder;
pub mod config;
pub mod database;
pub mod error;
pub mod graph;
pub mod memory;
pub mod prelude;
pub mod source;
pub mod types;

pub use builder::{BuildStats, Traversal};
pub use config::BuildOptions;
pub use database::{install, installed, Database};
pub use error::{ElementKind, MirrorError, MirrorResult};
pub use types::{Address, PrimitiveKind, SymbolLanguage, SymbolName};
