//! Cryptographic primitives.
//!
//! The primitives themselves come from the RustCrypto crates (see
//! `backend`); this module provides the OpenPGP-facing pieces built
//! on top of them: hash contexts and the [`Hash`](hash::Hash) trait,
//! MPIs, [`S2K`], key pairs, and memory that is zeroed on drop.

use std::ops::{Deref, DerefMut};
use std::fmt;

use crate::Result;

pub mod asymmetric;
pub(crate) mod backend;
pub mod hash;
pub mod mem;
pub mod mpi;
mod s2k;
pub use self::s2k::S2K;
pub(crate) mod symmetric;

pub use self::asymmetric::{
    KeyPair,
    Signer,
};

/// Fills the given buffer with random data from the operating
/// system's CSPRNG.
pub fn random<B: AsMut<[u8]>>(mut buf: B) -> Result<()> {
    backend::random(buf.as_mut())
}

/// Holds a session key.
///
/// The session key is cleared when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(mem::Protected);

impl SessionKey {
    /// Creates a new random session key.
    pub fn new(size: usize) -> Result<Self> {
        let mut sk: mem::Protected = vec![0; size].into();
        random(&mut sk)?;
        Ok(Self(sk))
    }
}

impl Deref for SessionKey {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for SessionKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for SessionKey {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<mem::Protected> for SessionKey {
    fn from(v: mem::Protected) -> Self {
        SessionKey(v)
    }
}

impl From<Vec<u8>> for SessionKey {
    fn from(v: Vec<u8>) -> Self {
        SessionKey(v.into())
    }
}

impl From<&[u8]> for SessionKey {
    fn from(v: &[u8]) -> Self {
        Vec::from(v).into()
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SessionKey ({:?})", self.0)
    }
}

/// Holds a password.
///
/// The password is cleared when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(mem::Protected);

impl From<Vec<u8>> for Password {
    fn from(v: Vec<u8>) -> Self {
        Password(v.into())
    }
}

impl From<String> for Password {
    fn from(v: String) -> Self {
        v.into_bytes().into()
    }
}

impl<'a> From<&'a str> for Password {
    fn from(v: &'a str) -> Self {
        v.to_owned().into()
    }
}

impl From<&[u8]> for Password {
    fn from(v: &[u8]) -> Self {
        Vec::from(v).into()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if cfg!(debug_assertions) {
            write!(f, "Password({:?})", self.0)
        } else {
            f.write_str("Password(<Redacted>)")
        }
    }
}

impl Password {
    /// Maps the given function over the password.
    pub fn map<F, T>(&self, mut fun: F) -> T
        where F: FnMut(&mem::Protected) -> T
    {
        fun(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_are_random() {
        let a = SessionKey::new(32).unwrap();
        let b = SessionKey::new(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
