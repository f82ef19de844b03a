//! DWARF-backed debug source.
//!
//! Units are parsed once up front. Entries are decoded on demand into the
//! typed [`Attributes`] record: location expressions are reduced to the static
//! address they name, member locations to a byte offset, and file indices and
//! flags to plain values.

use std::sync::Arc;

use gimli::{
    constants, Attribute, AttributeValue, DebugInfoOffset, DebuggingInformationEntry, Dwarf, DwAt, DwTag,
    EndianArcSlice, Expression, Operation, Reader, RunTimeEndian, SectionId, Unit, UnitOffset, UnitSectionOffset,
};
use tracing::{debug, trace, warn};

use super::{Attributes, ConstValue, DebugSource, Entry, EntryOffset, Tag};
use crate::error::{MirrorError, MirrorResult};

type OwnedReader = EndianArcSlice<RunTimeEndian>;
type OwnedDwarf = Dwarf<OwnedReader>;
type Die<'abbrev, 'unit> = DebuggingInformationEntry<'abbrev, 'unit, OwnedReader>;

struct LoadedUnit
{
    start: DebugInfoOffset<usize>,
    root: EntryOffset,
    unit: Unit<OwnedReader>,
}

impl LoadedUnit
{
    fn section_offset(&self, offset: UnitOffset<usize>) -> EntryOffset
    {
        EntryOffset((self.start.0 + offset.0) as u64)
    }
}

/// Debug source reading `.debug_info` through `gimli`.
pub struct DwarfSource
{
    dwarf: OwnedDwarf,
    units: Vec<LoadedUnit>,
    endian: RunTimeEndian,
    pointer_size: u64,
}

impl DwarfSource
{
    /// Load DWARF from raw section contents.
    ///
    /// `section` returns the bytes of each requested section, or an empty
    /// slice if the object has no such section.
    ///
    /// ## Errors
    ///
    /// Returns `MirrorError::Dwarf` if a unit header cannot be parsed.
    pub fn load<F>(endian: RunTimeEndian, mut section: F) -> MirrorResult<Self>
    where
        F: FnMut(SectionId) -> Arc<[u8]>,
    {
        let dwarf = Dwarf::load(|id| Ok::<_, gimli::Error>(EndianArcSlice::new(section(id), endian)))
            .map_err(|err| map_dwarf_error("loading DWARF sections", err))?;

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            let Some(start) = UnitOffset(0).to_debug_info_offset(&header) else {
                continue;
            };
            let unit = dwarf
                .unit(header)
                .map_err(|err| map_dwarf_error("parsing compilation unit", err))?;
            let root_offset = {
                let mut tree = unit
                    .entries_tree(None)
                    .map_err(|err| map_dwarf_error("building unit tree", err))?;
                let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
                root.entry().offset()
            };
            units.push(LoadedUnit {
                start,
                root: EntryOffset((start.0 + root_offset.0) as u64),
                unit,
            });
        }

        let pointer_size = units
            .first()
            .map_or(8, |loaded| u64::from(loaded.unit.header.address_size()));
        debug!(units = units.len(), pointer_size, "loaded DWARF units");

        Ok(Self {
            dwarf,
            units,
            endian,
            pointer_size,
        })
    }

    /// Number of compilation units in `.debug_info`.
    pub fn unit_count(&self) -> usize
    {
        self.units.len()
    }

    fn locate(&self, offset: EntryOffset) -> MirrorResult<(&LoadedUnit, UnitOffset<usize>)>
    {
        let raw = usize::try_from(offset.0)
            .map_err(|_| MirrorError::InvalidArgument(format!("entry offset {offset} out of range")))?;
        let target = UnitSectionOffset::from(DebugInfoOffset(raw));
        self.units
            .iter()
            .find_map(|loaded| target.to_unit_offset(&loaded.unit).map(|unit_offset| (loaded, unit_offset)))
            .ok_or_else(|| MirrorError::Dwarf(format!("no unit contains entry {offset}")))
    }

    /// Decode one entry. An attribute that fails to decode reads as absent,
    /// so the entry is judged on what remains.
    fn read_entry(&self, loaded: &LoadedUnit, die: &Die<'_, '_>) -> Entry
    {
        let unit = &loaded.unit;
        let offset = loaded.section_offset(die.offset());
        let tag = map_tag(die.tag());
        let decode = |name: DwAt| lenient(offset, name, attr(die, name));

        let mut attrs = Attributes {
            type_ref: reference(loaded, decode(constants::DW_AT_type)),
            specification: reference(loaded, decode(constants::DW_AT_specification)),
            byte_size: decode(constants::DW_AT_byte_size).and_then(|a| a.udata_value()),
            decl_line: decode(constants::DW_AT_decl_line).and_then(|a| a.udata_value()),
            decl_file: decode(constants::DW_AT_decl_file).and_then(|a| match a.value() {
                AttributeValue::FileIndex(index) => Some(index),
                _ => a.udata_value(),
            }),
            artificial: flag(decode(constants::DW_AT_artificial)),
            declaration: flag(decode(constants::DW_AT_declaration)),
            virtuality: matches!(
                decode(constants::DW_AT_virtuality).map(|a| a.value()),
                Some(AttributeValue::Virtuality(v)) if v != constants::DW_VIRTUALITY_none
            ),
            ..Attributes::default()
        };

        // Clang leaves the size of pointer types implicit.
        if attrs.byte_size.is_none() && tag == Tag::PointerType {
            attrs.byte_size = Some(u64::from(unit.header.address_size()));
        }

        let name = constants::DW_AT_data_member_location;
        attrs.data_member_location = decode(name).and_then(|a| match a.value() {
            AttributeValue::Exprloc(expr) => lenient(offset, name, expression_constant(unit, expr)),
            AttributeValue::Block(data) => lenient(offset, name, expression_constant(unit, Expression(data))),
            _ => a.udata_value(),
        });

        let name = constants::DW_AT_vtable_elem_location;
        attrs.vtable_slot = decode(name).and_then(|a| match a.value() {
            AttributeValue::Exprloc(expr) => lenient(offset, name, expression_constant(unit, expr)),
            _ => a.udata_value(),
        });

        let name = constants::DW_AT_low_pc;
        attrs.low_pc = decode(name).and_then(|a| {
            let address = self
                .dwarf
                .attr_address(unit, a.value())
                .map_err(|err| map_dwarf_error("reading DW_AT_low_pc", err));
            lenient(offset, name, address)
        });

        let name = constants::DW_AT_location;
        attrs.location = decode(name).and_then(|a| lenient(offset, name, self.static_address(unit, a.value())));

        let name = constants::DW_AT_const_value;
        attrs.const_value = decode(name).and_then(|a| match a.value() {
            AttributeValue::Block(data) => {
                let bytes = data
                    .to_slice()
                    .map(|bytes| Some(ConstValue::Block(bytes.into_owned())))
                    .map_err(|err| map_dwarf_error("reading DW_AT_const_value block", err));
                lenient(offset, name, bytes)
            }
            AttributeValue::Sdata(value) => Some(ConstValue::Signed(value)),
            _ => a.udata_value().map(ConstValue::Unsigned),
        });

        attrs.linkage_name = self
            .string_attr(loaded, offset, die, constants::DW_AT_linkage_name)
            .or_else(|| self.string_attr(loaded, offset, die, constants::DW_AT_MIPS_linkage_name));

        Entry {
            offset,
            tag,
            name: self.string_attr(loaded, offset, die, constants::DW_AT_name),
            attrs,
        }
    }

    fn string_attr(&self, loaded: &LoadedUnit, offset: EntryOffset, die: &Die<'_, '_>, name: DwAt) -> Option<String>
    {
        let value = attr(die, name).and_then(|attribute| self.string(&loaded.unit, attribute));
        lenient(offset, name, value)
    }

    fn string(&self, unit: &Unit<OwnedReader>, attribute: Option<Attribute<OwnedReader>>) -> MirrorResult<Option<String>>
    {
        let Some(attribute) = attribute else {
            return Ok(None);
        };
        let reader = self
            .dwarf
            .attr_string(unit, attribute.value())
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(Some(owned))
    }

    /// Address named by a location expression that starts with `DW_OP_addr`
    /// or `DW_OP_addrx`. Register- and TLS-relative locations have none.
    fn static_address(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> MirrorResult<Option<u64>>
    {
        let expr = match value {
            AttributeValue::Exprloc(expr) => expr,
            AttributeValue::Block(data) => Expression(data),
            _ => return Ok(None),
        };
        let mut ops = expr.operations(unit.encoding());
        match ops.next().map_err(|err| map_dwarf_error("decoding DW_AT_location", err))? {
            Some(Operation::Address { address }) => Ok(Some(address)),
            Some(Operation::AddressIndex { index }) => self
                .dwarf
                .address(unit, index)
                .map(Some)
                .map_err(|err| map_dwarf_error("resolving DW_OP_addrx", err)),
            _ => Ok(None),
        }
    }
}

impl DebugSource for DwarfSource
{
    fn units(&self) -> MirrorResult<Vec<EntryOffset>>
    {
        Ok(self.units.iter().map(|loaded| loaded.root).collect())
    }

    fn entry(&self, offset: EntryOffset) -> MirrorResult<Entry>
    {
        let (loaded, unit_offset) = self.locate(offset)?;
        let die = loaded
            .unit
            .entry(unit_offset)
            .map_err(|err| map_dwarf_error("resolving entry reference", err))?;
        Ok(self.read_entry(loaded, &die))
    }

    fn children(&self, offset: EntryOffset) -> MirrorResult<Vec<Entry>>
    {
        let (loaded, unit_offset) = self.locate(offset)?;
        let mut tree = loaded
            .unit
            .entries_tree(Some(unit_offset))
            .map_err(|err| map_dwarf_error("building entry tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating entry root", err))?;

        let mut entries = Vec::new();
        let mut children = root.children();
        loop {
            match children.next() {
                Ok(Some(child)) => entries.push(self.read_entry(loaded, child.entry())),
                Ok(None) => break,
                Err(err) => {
                    // The rest of the list cannot be located; keep what was read.
                    warn!(%offset, read = entries.len(), error = %err, "truncated entry children");
                    break;
                }
            }
        }
        Ok(entries)
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

fn attr(die: &Die<'_, '_>, name: DwAt) -> MirrorResult<Option<Attribute<OwnedReader>>>
{
    die.attr(name)
        .map_err(|err| map_dwarf_error(&format!("reading {name}"), err))
}

/// Keep a decoded value, or log the failure and treat it as absent.
fn lenient<T>(offset: EntryOffset, name: DwAt, value: MirrorResult<Option<T>>) -> Option<T>
{
    value.unwrap_or_else(|err| {
        trace!(%offset, attribute = %name, error = %err, "undecodable attribute");
        None
    })
}

fn flag(attribute: Option<Attribute<OwnedReader>>) -> bool
{
    matches!(attribute.map(|a| a.value()), Some(AttributeValue::Flag(true)))
}

fn reference(loaded: &LoadedUnit, attribute: Option<Attribute<OwnedReader>>) -> Option<EntryOffset>
{
    match attribute?.value() {
        AttributeValue::UnitRef(offset) => Some(loaded.section_offset(offset)),
        AttributeValue::DebugInfoRef(offset) => Some(EntryOffset(offset.0 as u64)),
        _ => None,
    }
}

/// Value of a constant-only expression (`DW_OP_plus_uconst`, `DW_OP_constu`).
fn expression_constant(unit: &Unit<OwnedReader>, expr: Expression<OwnedReader>) -> MirrorResult<Option<u64>>
{
    let mut ops = expr.operations(unit.encoding());
    let mut value = None;
    while let Some(op) = ops
        .next()
        .map_err(|err| map_dwarf_error("decoding constant expression", err))?
    {
        value = match op {
            Operation::PlusConstant { value: addend } => Some(value.unwrap_or(0u64).wrapping_add(addend)),
            Operation::UnsignedConstant { value: constant } => Some(constant),
            Operation::SignedConstant { value: constant } => Some(constant as u64),
            _ => return Ok(None),
        };
    }
    Ok(value)
}

fn map_tag(tag: DwTag) -> Tag
{
    match tag {
        constants::DW_TAG_compile_unit | constants::DW_TAG_partial_unit => Tag::CompileUnit,
        constants::DW_TAG_namespace => Tag::Namespace,
        constants::DW_TAG_base_type => Tag::BaseType,
        constants::DW_TAG_pointer_type | constants::DW_TAG_reference_type | constants::DW_TAG_rvalue_reference_type => {
            Tag::PointerType
        }
        constants::DW_TAG_const_type => Tag::ConstType,
        constants::DW_TAG_volatile_type => Tag::VolatileType,
        constants::DW_TAG_typedef => Tag::Typedef,
        constants::DW_TAG_structure_type => Tag::StructureType,
        constants::DW_TAG_class_type => Tag::ClassType,
        constants::DW_TAG_union_type => Tag::UnionType,
        constants::DW_TAG_enumeration_type => Tag::EnumerationType,
        constants::DW_TAG_unspecified_type => Tag::UnspecifiedType,
        constants::DW_TAG_member => Tag::Member,
        constants::DW_TAG_subprogram => Tag::Subprogram,
        constants::DW_TAG_formal_parameter => Tag::FormalParameter,
        constants::DW_TAG_inheritance => Tag::Inheritance,
        constants::DW_TAG_enumerator => Tag::Enumerator,
        constants::DW_TAG_variable => Tag::Variable,
        constants::DW_TAG_lexical_block => Tag::LexicalBlock,
        other => Tag::Other(other.0),
    }
}

/// Map a gimli error to a `MirrorError` with context.
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> MirrorError
{
    MirrorError::Dwarf(format!("{context}: {err}"))
}
