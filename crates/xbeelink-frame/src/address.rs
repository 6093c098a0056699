use std::fmt;
use std::str::FromStr;

/// A 64-bit radio address, stored in wire (big-endian) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address64([u8; 8]);

impl Address64 {
    /// Coordinator address.
    pub const COORDINATOR: Address64 = Address64([0; 8]);

    /// Broadcast address.
    pub const BROADCAST: Address64 = Address64([0, 0, 0, 0, 0, 0, 0xFF, 0xFF]);

    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub const fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

impl From<[u8; 8]> for Address64 {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl From<u64> for Address64 {
    fn from(value: u64) -> Self {
        Self(value.to_be_bytes())
    }
}

impl fmt::Display for Address64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Error returned when an address string is not 16 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid 64-bit address {0:?} (expected 16 hex digits, optionally ':' separated)")]
pub struct ParseAddressError(pub String);

impl FromStr for Address64 {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | ' ' | '-'))
            .collect();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(&digits);

        if digits.len() != 16 {
            return Err(ParseAddressError(s.to_string()));
        }
        u64::from_str_radix(digits, 16)
            .map(Address64::from)
            .map_err(|_| ParseAddressError(s.to_string()))
    }
}
