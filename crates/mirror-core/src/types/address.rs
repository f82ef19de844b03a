//! Address type for code and data locations recorded in the graph.

use std::fmt;
use std::ops::Add;

/// Strongly typed address of a function, variable or annotation payload
///
/// Addresses in the graph are file addresses from the debug information
/// shifted by the load bias the database was built with. Wrapping them keeps
/// them from being mixed up with sizes and byte offsets, which are plain
/// `u64`s throughout the crate.
///
/// ## Example
///
/// ```rust
/// use mirror_core::types::Address;
///
/// let entry = Address::new(0x1000);
/// assert_eq!((entry + 0x10).value(), 0x1010);
/// assert_eq!(entry.to_string(), "0x0000000000001000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address
    pub const ZERO: Self = Address(0);

    /// Create a new address from a raw value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset, returning `None` on overflow
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Distance from `base` to this address, if this address is not below it
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}
