use std::fmt;

use crate::conversions::{from_hex, to_hex};
use crate::{Error, Fingerprint, Result};

/// A short identifier for certificates and keys.
///
/// For version 4 keys this is the low 64 bits of the fingerprint;
/// for version 3 keys the low 64 bits of the RSA modulus.
#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct KeyID([u8; 8]);

impl fmt::Display for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("KeyID")
            .field(&self.to_hex())
            .finish()
    }
}

impl From<u64> for KeyID {
    fn from(id: u64) -> Self {
        KeyID(id.to_be_bytes())
    }
}

impl From<KeyID> for u64 {
    fn from(id: KeyID) -> Self {
        u64::from_be_bytes(id.0)
    }
}

impl std::str::FromStr for KeyID {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl KeyID {
    /// Reads a binary key ID.
    ///
    /// Only the last eight octets are used; shorter input is zero
    /// padded on the left.
    pub fn from_bytes(raw: &[u8]) -> KeyID {
        let mut id = [0u8; 8];
        let n = raw.len().min(8);
        id[8 - n..].copy_from_slice(&raw[raw.len() - n..]);
        KeyID(id)
    }

    /// Reads a hex-encoded key ID.
    ///
    /// A version 4 fingerprint is accepted too and converted.
    pub fn from_hex(hex: &str) -> Result<KeyID> {
        let bytes = from_hex(hex, true).ok_or_else(|| Error::InvalidArgument(
            format!("Not a key ID: {:?}", hex)))?;

        if bytes.len() == 8 {
            Ok(KeyID::from_bytes(&bytes))
        } else {
            Fingerprint::from_bytes(&bytes).to_keyid()
                .ok_or_else(|| Error::InvalidArgument(
                    format!("Not a key ID: {:?}", hex)).into())
        }
    }

    /// Returns the wildcard key ID (all zeros).
    pub fn wildcard() -> Self {
        KeyID([0; 8])
    }

    /// Returns whether this is the wildcard key ID.
    pub fn is_wildcard(&self) -> bool {
        self.0 == [0; 8]
    }

    /// Returns the raw identifier.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Converts the key ID to an upper-case hexadecimal string.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn u64_roundtrip(id: u64) -> bool {
            u64::from(KeyID::from(id)) == id
        }
    }

    #[test]
    fn parse() {
        let id: KeyID = "0xAACB3243630052D9".parse().unwrap();
        assert_eq!(id.to_hex(), "AACB3243630052D9");
        let from_fp: KeyID =
            "3E8877C877274692975189F5D03F6F865226FE8B".parse().unwrap();
        assert_eq!(from_fp.to_hex(), "D03F6F865226FE8B");
        assert!("123".parse::<KeyID>().is_err());
        assert_eq!(KeyID::from_bytes(&[1, 2]).to_hex(), "0000000000000102");
        assert!(KeyID::wildcard().is_wildcard());
    }
}
