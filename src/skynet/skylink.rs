// Skylinks: 2-byte bitfield plus 32-byte merkle root, base64url without padding

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::fmt;
use std::str::FromStr;

use crate::error::SkynetError;

/// Raw skylink length in bytes
pub const RAW_SKYLINK_SIZE: usize = 34;

/// Encoded skylink length in characters
pub const BASE64_SKYLINK_SIZE: usize = 46;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Skylink([u8; RAW_SKYLINK_SIZE]);

impl Skylink {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SkynetError> {
        let raw: [u8; RAW_SKYLINK_SIZE] = bytes.try_into().map_err(|_| {
            SkynetError::InvalidSkylink(format!(
                "expected {} bytes, got {}",
                RAW_SKYLINK_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; RAW_SKYLINK_SIZE] {
        &self.0
    }

    pub fn bitfield(&self) -> u16 {
        u16::from_le_bytes([self.0[0], self.0[1]])
    }

    pub fn merkle_root(&self) -> &[u8] {
        &self.0[2..]
    }
}

impl FromStr for Skylink {
    type Err = SkynetError;

    /// Accepts a bare skylink or the `sia://` URI form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches("sia://").trim_end_matches('/');
        if s.len() != BASE64_SKYLINK_SIZE {
            return Err(SkynetError::InvalidSkylink(format!(
                "expected {} characters, got {}",
                BASE64_SKYLINK_SIZE,
                s.len()
            )));
        }
        let raw = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| SkynetError::InvalidSkylink(e.to_string()))?;
        Self::from_bytes(&raw)
    }
}

impl fmt::Display for Skylink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for Skylink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skylink({})", self)
    }
}
