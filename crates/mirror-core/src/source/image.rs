//! Object file loading.
//!
//! [`BinaryImage`] reads an ELF or Mach-O file once, keeps the DWARF sections
//! it needs to build a [`DwarfSource`], and keeps the allocated sections so
//! addressable annotation payloads and variables can be read back through
//! [`ImageMemory`] without a running process.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gimli::{RunTimeEndian, SectionId};
use object::{Object, ObjectSection, SectionKind};
use tracing::debug;

use super::DwarfSource;
use crate::error::{MirrorError, MirrorResult};
use crate::memory::MemoryAccess;
use crate::types::Address;

const DWARF_SECTIONS: &[(SectionId, &[&str])] = &[
    (SectionId::DebugAbbrev, &[".debug_abbrev", "__debug_abbrev"]),
    (SectionId::DebugAddr, &[".debug_addr", "__debug_addr"]),
    (SectionId::DebugInfo, &[".debug_info", "__debug_info"]),
    (SectionId::DebugLine, &[".debug_line", "__debug_line"]),
    (SectionId::DebugLineStr, &[".debug_line_str", "__debug_line_str"]),
    (SectionId::DebugRanges, &[".debug_ranges", "__debug_ranges"]),
    (SectionId::DebugRngLists, &[".debug_rnglists", "__debug_rnglists"]),
    (SectionId::DebugStr, &[".debug_str", "__debug_str"]),
    (SectionId::DebugStrOffsets, &[".debug_str_offsets", "__debug_str_offs"]),
    (SectionId::DebugLoc, &[".debug_loc", "__debug_loc"]),
    (SectionId::DebugLocLists, &[".debug_loclists", "__debug_loclists"]),
];

#[derive(Debug, Clone)]
struct SectionBlob
{
    address: u64,
    size: u64,
    data: Arc<[u8]>,
}

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> MirrorResult<Option<Arc<[u8]>>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| MirrorError::Object(format!("failed to read {name}: {err}")))?;
            return Ok(Some(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            }));
        }
    }

    Ok(None)
}

/// Parsed object file with its DWARF and allocated sections.
pub struct BinaryImage
{
    path: PathBuf,
    endian: RunTimeEndian,
    pointer_size: u64,
    debug_sections: HashMap<SectionId, Arc<[u8]>>,
    loaded_sections: Vec<SectionBlob>,
}

impl BinaryImage
{
    /// Read and parse the object file at `path`.
    ///
    /// ## Errors
    ///
    /// Returns `MirrorError::Io` if the file cannot be read and
    /// `MirrorError::Object` if it is not a supported object format.
    pub fn open(path: impl AsRef<Path>) -> MirrorResult<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let file = object::File::parse(&*bytes)
            .map_err(|err| MirrorError::Object(format!("failed to parse {}: {err}", path.display())))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let pointer_size = file
            .architecture()
            .address_size()
            .map_or(if file.is_64() { 8 } else { 4 }, |size| u64::from(size.bytes()));

        let mut debug_sections = HashMap::new();
        for (id, aliases) in DWARF_SECTIONS {
            if let Some(data) = load_section_bytes(&file, aliases)? {
                debug_sections.insert(*id, data);
            }
        }

        let mut loaded_sections = Vec::new();
        for section in file.sections() {
            if section.address() == 0 || !is_loaded(section.kind()) {
                continue;
            }
            let data = if section.kind() == SectionKind::UninitializedData {
                Arc::<[u8]>::from(Vec::new())
            } else {
                let data = section
                    .uncompressed_data()
                    .map_err(|err| MirrorError::Object(format!("failed to read section: {err}")))?;
                Arc::<[u8]>::from(data.as_ref())
            };
            loaded_sections.push(SectionBlob {
                address: section.address(),
                size: section.size(),
                data,
            });
        }

        debug!(
            path = %path.display(),
            debug_sections = debug_sections.len(),
            loaded_sections = loaded_sections.len(),
            "parsed object file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            endian,
            pointer_size,
            debug_sections,
            loaded_sections,
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn endian(&self) -> RunTimeEndian
    {
        self.endian
    }

    pub fn pointer_size(&self) -> u64
    {
        self.pointer_size
    }

    /// Whether the image carries a `.debug_info` section.
    pub fn has_debug_info(&self) -> bool
    {
        self.debug_sections
            .get(&SectionId::DebugInfo)
            .is_some_and(|data| !data.is_empty())
    }

    /// Debug source over this image's DWARF sections.
    ///
    /// ## Errors
    ///
    /// Returns `MirrorError::Dwarf` if the unit headers are malformed.
    pub fn dwarf_source(&self) -> MirrorResult<DwarfSource>
    {
        DwarfSource::load(self.endian, |id| {
            self.debug_sections
                .get(&id)
                .cloned()
                .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()))
        })
    }

    /// Read-only view of the allocated sections, shifted by `load_bias`.
    pub fn memory(&self, load_bias: u64) -> ImageMemory
    {
        ImageMemory {
            sections: self.loaded_sections.clone(),
            load_bias,
        }
    }
}

fn is_loaded(kind: SectionKind) -> bool
{
    matches!(
        kind,
        SectionKind::Text
            | SectionKind::Data
            | SectionKind::ReadOnlyData
            | SectionKind::ReadOnlyDataWithRel
            | SectionKind::ReadOnlyString
            | SectionKind::UninitializedData
    )
}

/// Section contents of an image, addressed the way the graph addresses them.
///
/// Uninitialized sections read as zeroes.
#[derive(Debug, Clone)]
pub struct ImageMemory
{
    sections: Vec<SectionBlob>,
    load_bias: u64,
}

impl MemoryAccess for ImageMemory
{
    fn read_into(&self, address: Address, buffer: &mut [u8]) -> MirrorResult<()>
    {
        let file_address = address.value().wrapping_sub(self.load_bias);
        let len = buffer.len() as u64;
        let section = self
            .sections
            .iter()
            .find(|blob| {
                file_address >= blob.address && file_address.saturating_add(len) <= blob.address.saturating_add(blob.size)
            })
            .ok_or(MirrorError::AddressUnmapped(address))?;

        let start = usize::try_from(file_address - section.address).map_err(|_| MirrorError::AddressUnmapped(address))?;
        for (index, byte) in buffer.iter_mut().enumerate() {
            *byte = section.data.get(start + index).copied().unwrap_or(0);
        }
        Ok(())
    }
}
