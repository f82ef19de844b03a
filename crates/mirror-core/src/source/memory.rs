//! In-memory debug trees.
//!
//! [`MemorySource`] holds entries that were assembled by hand rather than
//! decoded from an object file. Offsets are handed out in creation order, so a
//! type can be referenced before its entry has been filled in: add the entry
//! early and complete it later through [`MemorySource::edit`].

use super::{Attributes, ConstValue, DebugSource, Entry, EntryOffset, RunTimeEndian, Tag};
use crate::error::{MirrorError, MirrorResult};

#[derive(Debug, Clone)]
struct Node
{
    entry: Entry,
    children: Vec<EntryOffset>,
}

/// Debug tree assembled in memory.
///
/// ## Example
///
/// ```rust
/// use mirror_core::source::{MemorySource, Tag};
///
/// let mut source = MemorySource::default();
/// let unit = source.unit();
/// let int = source.add(unit, Tag::BaseType).with_name("int").with_byte_size(4).offset();
/// let point = source.add(unit, Tag::StructureType).with_name("Point").with_byte_size(8).offset();
/// source.add(point, Tag::Member).with_name("x").with_type(int).with_member_offset(0);
/// source.add(point, Tag::Member).with_name("y").with_type(int).with_member_offset(4);
/// ```
#[derive(Debug, Clone)]
pub struct MemorySource
{
    nodes: Vec<Node>,
    units: Vec<EntryOffset>,
    pointer_size: u64,
    endian: RunTimeEndian,
}

impl Default for MemorySource
{
    fn default() -> Self
    {
        Self::new(8, RunTimeEndian::default())
    }
}

impl MemorySource
{
    pub fn new(pointer_size: u64, endian: RunTimeEndian) -> Self
    {
        Self {
            nodes: Vec::new(),
            units: Vec::new(),
            pointer_size,
            endian,
        }
    }

    /// Start a new compilation unit and return its root.
    pub fn unit(&mut self) -> EntryOffset
    {
        let offset = self.push(Tag::CompileUnit);
        self.units.push(offset);
        offset
    }

    /// Append a child entry under `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not created by this source.
    pub fn add(&mut self, parent: EntryOffset, tag: Tag) -> EntryBuilder<'_>
    {
        let offset = self.push(tag);
        self.nodes[index(parent)].children.push(offset);
        EntryBuilder {
            node: &mut self.nodes[index(offset)],
        }
    }

    /// Reopen an existing entry to set more attributes.
    ///
    /// # Panics
    ///
    /// Panics if `offset` was not created by this source.
    pub fn edit(&mut self, offset: EntryOffset) -> EntryBuilder<'_>
    {
        EntryBuilder {
            node: &mut self.nodes[index(offset)],
        }
    }

    fn push(&mut self, tag: Tag) -> EntryOffset
    {
        let offset = EntryOffset(self.nodes.len() as u64);
        self.nodes.push(Node {
            entry: Entry {
                offset,
                tag,
                name: None,
                attrs: Attributes::default(),
            },
            children: Vec::new(),
        });
        offset
    }

    fn node(&self, offset: EntryOffset) -> MirrorResult<&Node>
    {
        usize::try_from(offset.0)
            .ok()
            .and_then(|index| self.nodes.get(index))
            .ok_or_else(|| MirrorError::InvalidArgument(format!("no entry at offset {offset}")))
    }
}

fn index(offset: EntryOffset) -> usize
{
    usize::try_from(offset.0).unwrap_or(usize::MAX)
}

impl DebugSource for MemorySource
{
    fn units(&self) -> MirrorResult<Vec<EntryOffset>>
    {
        Ok(self.units.clone())
    }

    fn entry(&self, offset: EntryOffset) -> MirrorResult<Entry>
    {
        Ok(self.node(offset)?.entry.clone())
    }

    fn children(&self, offset: EntryOffset) -> MirrorResult<Vec<Entry>>
    {
        let node = self.node(offset)?;
        node.children.iter().map(|child| self.entry(*child)).collect()
    }

    fn pointer_size(&self) -> u64
    {
        self.pointer_size
    }

    fn endian(&self) -> RunTimeEndian
    {
        self.endian
    }
}

/// Chainable setter for the attributes of one [`MemorySource`] entry.
pub struct EntryBuilder<'a>
{
    node: &'a mut Node,
}

impl EntryBuilder<'_>
{
    pub fn with_name(self, name: impl Into<String>) -> Self
    {
        self.node.entry.name = Some(name.into());
        self
    }

    pub fn with_type(self, target: EntryOffset) -> Self
    {
        self.node.entry.attrs.type_ref = Some(target);
        self
    }

    pub fn with_byte_size(self, size: u64) -> Self
    {
        self.node.entry.attrs.byte_size = Some(size);
        self
    }

    pub fn with_member_offset(self, offset: u64) -> Self
    {
        self.node.entry.attrs.data_member_location = Some(offset);
        self
    }

    pub fn with_low_pc(self, address: u64) -> Self
    {
        self.node.entry.attrs.low_pc = Some(address);
        self
    }

    pub fn with_location(self, address: u64) -> Self
    {
        self.node.entry.attrs.location = Some(address);
        self
    }

    pub fn with_const_value(self, value: u64) -> Self
    {
        self.node.entry.attrs.const_value = Some(ConstValue::Unsigned(value));
        self
    }

    pub fn with_signed_const_value(self, value: i64) -> Self
    {
        self.node.entry.attrs.const_value = Some(ConstValue::Signed(value));
        self
    }

    pub fn with_const_block(self, bytes: impl Into<Vec<u8>>) -> Self
    {
        self.node.entry.attrs.const_value = Some(ConstValue::Block(bytes.into()));
        self
    }

    /// Mark the entry virtual with the given dispatch-table slot.
    pub fn with_vtable_slot(self, slot: u64) -> Self
    {
        self.node.entry.attrs.virtuality = true;
        self.node.entry.attrs.vtable_slot = Some(slot);
        self
    }

    pub fn with_specification(self, declaration: EntryOffset) -> Self
    {
        self.node.entry.attrs.specification = Some(declaration);
        self
    }

    /// Set the declaring file id and line.
    pub fn declared_at(self, file: u64, line: u64) -> Self
    {
        self.node.entry.attrs.decl_file = Some(file);
        self.node.entry.attrs.decl_line = Some(line);
        self
    }

    pub fn with_linkage_name(self, name: impl Into<String>) -> Self
    {
        self.node.entry.attrs.linkage_name = Some(name.into());
        self
    }

    pub fn artificial(self) -> Self
    {
        self.node.entry.attrs.artificial = true;
        self
    }

    pub fn declaration(self) -> Self
    {
        self.node.entry.attrs.declaration = true;
        self
    }

    /// Offset of the entry being built.
    pub fn offset(self) -> EntryOffset
    {
        self.node.entry.offset
    }
}
