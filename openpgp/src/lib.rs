//! OpenPGP key store machinery.
//!
//! This crate implements the core of an OpenPGP key manager as
//! defined by [RFC 4880] and [RFC 6637]: a packet stream parser that
//! dispatches typed events to a handler, a key store that assembles
//! those events into keys, user IDs, signatures and revocations, a
//! signature engine that verifies and creates certifications and
//! bindings, passphrase-based key derivation ([S2K]), and a key
//! generation pipeline that produces self-certified keys and
//! materializes them by parsing its own output.
//!
//! Armor, message framing (literal data, compression, encryption
//! containers), trust computation and network access are not part of
//! this crate.  Armor in particular is expected to be supplied as a
//! [`BufferedReader`] filter pushed in front of the [`PacketParser`].
//!
//! [RFC 4880]: https://tools.ietf.org/html/rfc4880
//! [RFC 6637]: https://tools.ietf.org/html/rfc6637
//! [S2K]: crypto::S2K
//! [`BufferedReader`]: buffered_reader::BufferedReader
//! [`PacketParser`]: parse::PacketParser
//!
//! # Examples
//!
//! Generating a key pair and looking it up again:
//!
//! ```
//! use openpgp_keyring as openpgp;
//! use openpgp::keygen::{KeyGenerator, PrimaryKeyParams, SubkeyParams};
//! use openpgp::keystore::KeyStore;
//!
//! # fn main() -> openpgp::Result<()> {
//! let mut primary = PrimaryKeyParams::default();
//! primary.userid = "Alice <alice@example.org>".into();
//! primary.crypto.curve = Some(openpgp::types::Curve::Ed25519);
//! primary.crypto.algo = Some(openpgp::types::PublicKeyAlgorithm::EdDSA);
//!
//! let mut subkey = SubkeyParams::default();
//! subkey.crypto.algo = Some(openpgp::types::PublicKeyAlgorithm::ECDH);
//! subkey.crypto.curve = Some(openpgp::types::Curve::NistP256);
//!
//! let mut pubring = KeyStore::new();
//! let mut secring = KeyStore::new();
//! let generated = KeyGenerator::new(&mut pubring, &mut secring)
//!     .generate_keypair(primary, subkey, true)?;
//!
//! let alice = pubring.get_next_by_name("alice", &mut 0).unwrap();
//! assert_eq!(alice.fingerprint(), pubring.key(generated.primary_pub).unwrap().fingerprint());
//! # Ok(()) }
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod conversions;
pub mod types;
use crate::types::{
    Curve,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SignatureType,
    SymmetricAlgorithm,
};

pub mod crypto;

pub mod packet;
pub use packet::{Packet, Tag};

mod fingerprint;
pub use fingerprint::Fingerprint;
mod keyid;
pub use keyid::KeyID;

pub mod parse;
pub mod serialize;

pub mod keystore;
pub mod provider;
pub mod verify;
pub mod sign;
pub mod keygen;

/// Crate result specialization.
pub type Result<T> = ::std::result::Result<T, anyhow::Error>;

/// Errors used in this crate.
///
/// Functions return [`anyhow::Error`]s; use
/// `err.downcast_ref::<Error>()` to recover one of these.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A malformed packet header (CTB or length).
    #[error("Malformed packet header: {0}")]
    MalformedHeader(String),

    /// A malformed packet body.
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// A read that would cross the packet's declared length.
    #[error("Read of {field} crosses the end of the {tag} packet \
             ({wanted} octets wanted, {available} left)")]
    PacketBoundary {
        /// The packet being parsed.
        tag: Tag,
        /// The field being parsed.
        field: &'static str,
        /// Number of octets requested.
        wanted: usize,
        /// Number of octets left in the body.
        available: usize,
    },

    /// The stream ended inside a packet.
    #[error("Truncated packet: {0}")]
    TruncatedPacket(String),

    /// A critical subpacket that is not understood.
    #[error("Unknown critical subpacket: {0}")]
    UnknownCriticalSubpacket(u8),

    /// Unsupported hash algorithm identifier.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(HashAlgorithm),

    /// Unsupported public key algorithm identifier.
    #[error("Unsupported public key algorithm: {0}")]
    UnsupportedPublicKeyAlgorithm(PublicKeyAlgorithm),

    /// Unsupported elliptic curve.
    #[error("Unsupported elliptic curve: {0}")]
    UnsupportedEllipticCurve(Curve),

    /// Unsupported symmetric algorithm.
    #[error("Unsupported symmetric algorithm: {0}")]
    UnsupportedSymmetricAlgorithm(SymmetricAlgorithm),

    /// Unsupported signature type.
    #[error("Unsupported signature type: {0}")]
    UnsupportedSignatureType(SignatureType),

    /// Unsupported signature version.
    #[error("Unsupported signature version: {0}")]
    UnsupportedSignatureVersion(u8),

    /// Unsupported key version.
    #[error("Unsupported key version: {0}")]
    UnsupportedKeyVersion(u8),

    /// A malformed MPI.
    #[error("Malformed MPI: {0}")]
    MalformedMPI(String),

    /// A signature did not verify.
    #[error("Bad signature: {0}")]
    BadSignature(String),

    /// The key is unusable for the requested operation.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The passphrase did not decrypt the secret key.
    #[error("Bad passphrase")]
    BadPassphrase,

    /// No passphrase was supplied for a protected key.
    #[error("No passphrase")]
    MissingPassphrase,

    /// The operation needs secret key material.
    #[error("Missing secret key material")]
    MissingSecretKey,

    /// No key matches the request.
    #[error("No such key: {0}")]
    NoSuchKey(String),

    /// Parameters violate the key generation rules.
    #[error("Not permitted: {0}")]
    PolicyViolation(String),

    /// The signature or key is not yet live.
    #[error("Not live until {0:?}")]
    NotYetLive(std::time::SystemTime),

    /// The signature or key has expired.
    #[error("Expired on {0:?}")]
    Expired(std::time::SystemTime),

    /// Index out of range.
    #[error("Index out of range")]
    IndexOutOfRange,
}
