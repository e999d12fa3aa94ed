//! Strong types for byte-array identifiers
//!
//! Semantic newtype for the fixed-size storage-node identifier, replacing
//! raw `[u8; 32]` throughout the reputation and repair layers.

use std::fmt;

/// Width of a storage-node identifier in bytes.
pub const NODE_ID_LEN: usize = 32;

/// Identifier of a storage node, equatable and orderable by byte sequence.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeId(pub [u8; NODE_ID_LEN]);

impl NodeId {
    /// Returns the inner bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// Parse from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        let bytes = hex::decode(hex_str).map_err(|e| format!("invalid hex: {}", e))?;
        if bytes.len() != NODE_ID_LEN {
            return Err(format!(
                "expected {} hex characters, got {}",
                NODE_ID_LEN * 2,
                hex_str.len()
            ));
        }
        Ok(Self(bytes.try_into().map_err(|_| "internal error: length mismatch".to_string())?))
    }

    /// Build an id from a short ASCII seed, zero-padded to the full width.
    ///
    /// Fixture helper for tests and tooling; seeds longer than the id
    /// width are truncated.
    pub fn from_seed(seed: &str) -> Self {
        let mut bytes = [0u8; NODE_ID_LEN];
        let src = seed.as_bytes();
        let n = src.len().min(NODE_ID_LEN);
        bytes[..n].copy_from_slice(&src[..n]);
        Self(bytes)
    }
}

// Standard Conversions
impl From<[u8; NODE_ID_LEN]> for NodeId {
    fn from(bytes: [u8; NODE_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<NodeId> for [u8; NODE_ID_LEN] {
    fn from(wrapper: NodeId) -> [u8; NODE_ID_LEN] {
        wrapper.0
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for NodeId {
    type Target = [u8; NODE_ID_LEN];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Zero-allocation hex formatting
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(self, f)
    }
}

impl fmt::LowerHex for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId(")?;
        fmt::Display::fmt(self, f)?;
        write!(f, ")")
    }
}

// TryFrom for slice parsing
impl TryFrom<&[u8]> for NodeId {
    type Error = std::array::TryFromSliceError;
    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(<[u8; NODE_ID_LEN]>::try_from(slice)?))
    }
}

// TryFrom<Vec<u8>> for owned vector parsing
impl TryFrom<Vec<u8>> for NodeId {
    type Error = Vec<u8>;
    fn try_from(vec: Vec<u8>) -> Result<Self, Self::Error> {
        if vec.len() != NODE_ID_LEN {
            return Err(vec);
        }
        let mut arr = [0u8; NODE_ID_LEN];
        arr.copy_from_slice(&vec);
        Ok(Self(arr))
    }
}
