use std::fmt;

use crate::conversions::{from_hex, to_hex};
use crate::{Error, KeyID, Result};

/// A long identifier for certificates and keys.
///
/// Version 4 fingerprints are the SHA-1 digest of the public key
/// packet; version 3 fingerprints are the MD5 digest of the RSA
/// modulus and exponent.
#[derive(PartialEq, Eq, Clone, Hash, PartialOrd, Ord)]
pub enum Fingerprint {
    /// 20 byte SHA-1 hash.
    V4([u8; 20]),
    /// 16 byte MD5 hash.
    V3([u8; 16]),
    /// Used for holding fingerprints that we don't understand.
    Invalid(Box<[u8]>),
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Fingerprint")
            .field(&self.to_hex())
            .finish()
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Fingerprint {
    /// Reads a binary fingerprint.
    pub fn from_bytes(raw: &[u8]) -> Fingerprint {
        if raw.len() == 20 {
            let mut fp: [u8; 20] = Default::default();
            fp.copy_from_slice(raw);
            Fingerprint::V4(fp)
        } else if raw.len() == 16 {
            let mut fp: [u8; 16] = Default::default();
            fp.copy_from_slice(raw);
            Fingerprint::V3(fp)
        } else {
            Fingerprint::Invalid(raw.to_vec().into_boxed_slice())
        }
    }

    /// Reads a hexadecimal fingerprint.
    ///
    /// Whitespace is ignored.
    pub fn from_hex(hex: &str) -> Result<Fingerprint> {
        from_hex(hex, true)
            .map(|bytes| Fingerprint::from_bytes(&bytes))
            .ok_or_else(|| Error::InvalidArgument(
                format!("Not a fingerprint: {:?}", hex)).into())
    }

    /// Returns the raw fingerprint.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Fingerprint::V4(fp) => fp,
            Fingerprint::V3(fp) => fp,
            Fingerprint::Invalid(fp) => fp,
        }
    }

    /// Converts the fingerprint to an upper-case hexadecimal string.
    pub fn to_hex(&self) -> String {
        to_hex(self.as_bytes(), false)
    }

    /// Converts the fingerprint to a hexadecimal string with a space
    /// every four digits.
    pub fn to_spaced_hex(&self) -> String {
        to_hex(self.as_bytes(), true)
    }

    /// Returns the key ID embedded in a version 4 fingerprint.
    ///
    /// Version 3 key IDs are not derived from the fingerprint; for
    /// those, and for invalid fingerprints, `None` is returned.
    pub fn to_keyid(&self) -> Option<KeyID> {
        match self {
            Fingerprint::V4(fp) => Some(KeyID::from_bytes(&fp[12..20])),
            _ => None,
        }
    }
}
