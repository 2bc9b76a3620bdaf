//! Implementation of the crypto API using pure Rust cryptographic
//! libraries.

use rand_core::RngCore;

use crate::{Error, Result};

pub(crate) mod asymmetric;
pub(crate) mod hash;
pub(crate) mod symmetric;

/// Fills the given buffer with random data.
///
/// Fills the given buffer with random data produced by the operating
/// system's cryptographically secure pseudorandom number generator.
/// The output may be used as session keys or to derive long-term
/// cryptographic keys from.
pub(crate) fn random(buf: &mut [u8]) -> Result<()> {
    rand_core::OsRng.try_fill_bytes(buf)
        .map_err(|e| Error::InvalidOperation(
            format!("Failed to gather randomness: {}", e)).into())
}
