//! Link-time address type.

use std::fmt;
use std::ops::Add;

/// Strongly typed link-time address
///
/// A wrapper around `u64` so addresses cannot be confused with sizes,
/// counts, or cache-line indices. All analysis runs on the addresses
/// recorded in the debug info; there is no relocation or load slide.
///
/// ## Example
///
/// ```rust
/// use varscope_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// assert_eq!((addr + 0x100).value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address. A location-list bound of zero is treated as
    /// corrupt debug info, never as a real storage range.
    pub const ZERO: Self = Address(0);

    /// The all-ones sentinel produced by malformed location lists.
    pub const MAX: Self = Address(u64::MAX);

    /// Create a new address from a `u64` value (usable in const contexts).
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address.
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset, saturating at the maximum value.
    pub fn saturating_add(self, offset: u64) -> Self
    {
        Address(self.0.saturating_add(offset))
    }

    /// Cache-line index of this address for lines of `1 << bits` bytes.
    pub const fn line_index(self, bits: u32) -> u64
    {
        self.0 >> bits
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
        write!(f, "0x{:x}", self.0)
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

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_line_index_64_byte_lines()
    {
        assert_eq!(Address::new(0).line_index(6), 0);
        assert_eq!(Address::new(63).line_index(6), 0);
        assert_eq!(Address::new(64).line_index(6), 1);
        assert_eq!(Address::new(200).line_index(6), 3);
    }

    #[test]
    fn test_saturating_add()
    {
        assert_eq!(Address::new(0x1000).saturating_add(0x10).value(), 0x1010);
        assert_eq!(Address::MAX.saturating_add(1), Address::MAX);
    }
}
