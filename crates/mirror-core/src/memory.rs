//! # Reflective Memory Access
//!
//! Byte-level helpers for reading and writing values through the graph.
//!
//! The graph only knows sizes, offsets and addresses. Turning bytes into Rust
//! values goes through [`Scalar`], which decodes with the target byte order
//! recorded when the database was built, and always checks that the byte
//! count matches the declared size first.

use gimli::RunTimeEndian;

use crate::error::{MirrorError, MirrorResult};
use crate::types::Address;

/// Read access to the address space annotation payloads and variables live in.
pub trait MemoryAccess
{
    /// Fill `buffer` with the bytes at `address`.
    ///
    /// ## Errors
    ///
    /// Returns `MirrorError::AddressUnmapped` if the range is not readable.
    fn read_into(&self, address: Address, buffer: &mut [u8]) -> MirrorResult<()>;

    /// Read `len` bytes at `address`.
    ///
    /// ## Errors
    ///
    /// Returns `MirrorError::AddressUnmapped` if the range is not readable.
    fn read_bytes(&self, address: Address, len: usize) -> MirrorResult<Vec<u8>>
    {
        let mut buffer = vec![0u8; len];
        self.read_into(address, &mut buffer)?;
        Ok(buffer)
    }
}

/// Fixed-size value that can be decoded from target bytes.
pub trait Scalar: Copy
{
    /// Size in bytes.
    const SIZE: usize;

    /// Decode from exactly [`Self::SIZE`] bytes.
    fn from_bytes(bytes: &[u8], endian: RunTimeEndian) -> Option<Self>;

    /// Encode into [`Self::SIZE`] bytes.
    fn to_bytes(self, endian: RunTimeEndian) -> Vec<u8>;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty
            {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_bytes(bytes: &[u8], endian: RunTimeEndian) -> Option<Self>
                {
                    let array = bytes.try_into().ok()?;
                    Some(match endian {
                        RunTimeEndian::Little => <$ty>::from_le_bytes(array),
                        RunTimeEndian::Big => <$ty>::from_be_bytes(array),
                    })
                }

                fn to_bytes(self, endian: RunTimeEndian) -> Vec<u8>
                {
                    match endian {
                        RunTimeEndian::Little => self.to_le_bytes().to_vec(),
                        RunTimeEndian::Big => self.to_be_bytes().to_vec(),
                    }
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, f32, f64);

/// Decode `bytes` as `T`, requiring an exact size match.
///
/// ## Errors
///
/// Returns `MirrorError::SizeMismatch` if `bytes.len() != T::SIZE`.
pub fn decode<T: Scalar>(bytes: &[u8], endian: RunTimeEndian) -> MirrorResult<T>
{
    T::from_bytes(bytes, endian).ok_or(MirrorError::SizeMismatch {
        expected: T::SIZE,
        actual: bytes.len(),
    })
}

/// Materialize an integer literal into `width` bytes of target byte order.
///
/// Only widths of 1, 2, 4 and 8 bytes are representable.
pub(crate) fn integer_bytes(value: u64, width: u64, endian: RunTimeEndian) -> Option<Vec<u8>>
{
    let bytes = match width {
        1 => (value as u8).to_bytes(endian),
        2 => (value as u16).to_bytes(endian),
        4 => (value as u32).to_bytes(endian),
        8 => value.to_bytes(endian),
        _ => return None,
    };
    Some(bytes)
}

/// A contiguous byte range mapped at a base address.
///
/// Useful for instances that were copied out of a process, and in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBuffer
{
    base: Address,
    bytes: Vec<u8>,
}

impl MemoryBuffer
{
    pub fn new(base: Address, bytes: impl Into<Vec<u8>>) -> Self
    {
        Self {
            base,
            bytes: bytes.into(),
        }
    }

    pub fn base(&self) -> Address
    {
        self.base
    }

    pub fn bytes(&self) -> &[u8]
    {
        &self.bytes
    }
}

impl MemoryAccess for MemoryBuffer
{
    fn read_into(&self, address: Address, buffer: &mut [u8]) -> MirrorResult<()>
    {
        let start = address
            .offset_from(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or(MirrorError::AddressUnmapped(address))?;
        let source = start
            .checked_add(buffer.len())
            .and_then(|end| self.bytes.get(start..end))
            .ok_or(MirrorError::AddressUnmapped(address))?;
        buffer.copy_from_slice(source);
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_decode_honours_byte_order()
    {
        assert_eq!(decode::<u32>(&[1, 0, 0, 0], RunTimeEndian::Little).unwrap(), 1);
        assert_eq!(decode::<u32>(&[0, 0, 0, 1], RunTimeEndian::Big).unwrap(), 1);
        assert_eq!(decode::<i16>(&[0xff, 0xff], RunTimeEndian::Little).unwrap(), -1);
    }

    #[test]
    fn test_decode_rejects_wrong_size()
    {
        let err = decode::<u64>(&[0; 4], RunTimeEndian::Little).unwrap_err();
        assert!(matches!(err, MirrorError::SizeMismatch { expected: 8, actual: 4 }));
    }

    #[test]
    fn test_integer_bytes_widths()
    {
        assert_eq!(integer_bytes(1, 4, RunTimeEndian::Little), Some(vec![1, 0, 0, 0]));
        assert_eq!(integer_bytes(0x0102, 2, RunTimeEndian::Big), Some(vec![1, 2]));
        assert_eq!(integer_bytes(7, 1, RunTimeEndian::Little), Some(vec![7]));
        assert_eq!(integer_bytes(7, 3, RunTimeEndian::Little), None);
    }

    #[test]
    fn test_memory_buffer_bounds()
    {
        let memory = MemoryBuffer::new(Address::new(0x100), vec![1, 2, 3, 4]);
        assert_eq!(memory.read_bytes(Address::new(0x102), 2).unwrap(), vec![3, 4]);
        assert!(memory.read_bytes(Address::new(0x103), 2).is_err());
        assert!(memory.read_bytes(Address::new(0xff), 1).is_err());
    }
}
