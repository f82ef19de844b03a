//! # Debug Sources
//!
//! The builder never touches a debug-format reader directly. It walks a tree
//! of [`Entry`] values served by a [`DebugSource`]: compilation unit roots,
//! ordered children, and random access by byte offset for forward references.
//!
//! ## Implementations
//!
//! - [`DwarfSource`]: `gimli` over the DWARF sections of an object file
//! - [`MemorySource`]: an in-memory tree assembled with a chainable builder
//!
//! Attributes are decoded by the source into the typed [`Attributes`] record,
//! so the builder only ever sees values it can use (an address, not a
//! location expression).

use std::fmt;

pub use gimli::RunTimeEndian;

use crate::error::MirrorResult;

pub mod dwarf;
pub mod image;
pub mod memory;

pub use dwarf::DwarfSource;
pub use image::{BinaryImage, ImageMemory};
pub use memory::{EntryBuilder, MemorySource};

/// Byte offset of an entry, unique across all units of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryOffset(pub u64);

impl fmt::Display for EntryOffset
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "<0x{:08x}>", self.0)
    }
}

/// Kind of a debug entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag
{
    CompileUnit,
    Namespace,
    BaseType,
    PointerType,
    ConstType,
    VolatileType,
    Typedef,
    StructureType,
    ClassType,
    UnionType,
    EnumerationType,
    UnspecifiedType,
    Member,
    Subprogram,
    FormalParameter,
    Inheritance,
    Enumerator,
    Variable,
    LexicalBlock,
    /// Any tag the builder does not model, with its raw value.
    Other(u16),
}

impl Tag
{
    /// Whether entries of this kind describe a type.
    pub fn is_type(self) -> bool
    {
        matches!(
            self,
            Tag::BaseType
                | Tag::PointerType
                | Tag::ConstType
                | Tag::VolatileType
                | Tag::Typedef
                | Tag::StructureType
                | Tag::ClassType
                | Tag::UnionType
                | Tag::EnumerationType
                | Tag::UnspecifiedType
        )
    }
}

/// Constant value attached to an enumerator or an inline annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue
{
    /// Variable-length inline block.
    Block(Vec<u8>),
    /// Integer literal with no sign information.
    Unsigned(u64),
    /// Integer literal encoded as signed.
    Signed(i64),
}

/// Typed attributes of an entry.
///
/// Every field is optional: debug information is frequently incomplete, and
/// the builder decides per entry kind which absences are fatal to the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes
{
    pub type_ref: Option<EntryOffset>,
    pub byte_size: Option<u64>,
    pub data_member_location: Option<u64>,
    pub low_pc: Option<u64>,
    /// Static address from the location expression.
    pub location: Option<u64>,
    pub const_value: Option<ConstValue>,
    pub virtuality: bool,
    pub vtable_slot: Option<u64>,
    pub specification: Option<EntryOffset>,
    pub decl_file: Option<u64>,
    pub decl_line: Option<u64>,
    pub artificial: bool,
    pub declaration: bool,
    pub linkage_name: Option<String>,
}

impl Attributes
{
    /// Source-position key `(file << 32) | line`.
    ///
    /// `None` when either half is missing; such entries take no part in
    /// annotation correlation.
    pub fn position(&self) -> Option<u64>
    {
        let file = self.decl_file?;
        let line = self.decl_line?;
        Some((file << 32) | (line & 0xffff_ffff))
    }
}

/// One debug entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry
{
    pub offset: EntryOffset,
    pub tag: Tag,
    pub name: Option<String>,
    pub attrs: Attributes,
}

impl Entry
{
    pub fn name(&self) -> Option<&str>
    {
        self.name.as_deref()
    }
}

/// Reader of a debug tree.
///
/// `entry` must resolve any offset that appears in a type reference or a
/// specification, including offsets in units that have not been walked yet.
pub trait DebugSource
{
    /// Offsets of the root entry of every compilation unit, in section order.
    fn units(&self) -> MirrorResult<Vec<EntryOffset>>;

    /// The entry at `offset`.
    fn entry(&self, offset: EntryOffset) -> MirrorResult<Entry>;

    /// Children of the entry at `offset`, in declaration order.
    fn children(&self, offset: EntryOffset) -> MirrorResult<Vec<Entry>>;

    /// Size of a data pointer on the target.
    fn pointer_size(&self) -> u64;

    /// Byte order of the target.
    fn endian(&self) -> RunTimeEndian;
}
