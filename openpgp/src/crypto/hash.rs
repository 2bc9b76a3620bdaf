//! Functionality to hash packets, and generate hashes.
//!
//! Signatures are computed over a payload that depends on the
//! signature type (a document, a key and a user ID, a primary key and
//! a subkey, ...) followed by a version dependent trailer.  The
//! [`Hash`] trait feeds the canonical form of each component into a
//! [`Context`]; the `hash_*` functions on [`Signature`] put the
//! pieces together for each signature type.

use std::convert::TryFrom;
use std::io;

use dyn_clone::DynClone;

use crate::HashAlgorithm;
use crate::packet::Key;
use crate::packet::UserID;
use crate::packet::UserAttribute;
use crate::packet::Signature;
use crate::packet::signature::SignatureFields;
use crate::serialize::Serialize;
use crate::types::SignatureType;
use crate::{Error, Result};

/// Hasher capable of calculating a digest for the input byte stream.
///
/// This provides an abstract interface to the hash functions used in
/// OpenPGP.  It is implemented by the backend for every RustCrypto
/// digest.
pub(crate) trait Digest: DynClone + Send + Sync {
    /// Size of the digest in bytes
    fn digest_size(&self) -> usize;

    /// Writes data into the hash function.
    fn update(&mut self, data: &[u8]);

    /// Finalizes the hash function and writes the digest into the
    /// provided slice.
    ///
    /// Resets the hash function contexts.
    ///
    /// `digest` must be at least `self.digest_size()` bytes large,
    /// otherwise the digest will be truncated.
    fn digest(&mut self, digest: &mut [u8]) -> Result<()>;
}

dyn_clone::clone_trait_object!(Digest);

/// State of a hash function.
///
/// This provides an abstract interface to the hash functions used in
/// OpenPGP.  `Context`s are created using [`HashAlgorithm::context`].
#[derive(Clone)]
pub struct Context {
    algo: HashAlgorithm,
    ctx: Box<dyn Digest>,
}

impl Context {
    /// Returns the algorithm.
    pub fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    /// Size of the digest in bytes
    pub fn digest_size(&self) -> usize {
        self.ctx.digest_size()
    }

    /// Writes data into the hash function.
    pub fn update<D: AsRef<[u8]>>(&mut self, data: D) {
        self.ctx.update(data.as_ref());
    }

    /// Finalizes the hash function and writes the digest into the
    /// provided slice.
    ///
    /// Resets the hash function contexts.
    pub fn digest<D: AsMut<[u8]>>(&mut self, mut digest: D) -> Result<()> {
        self.ctx.digest(digest.as_mut())
    }

    /// Finalizes the hash function and returns the digest.
    pub fn into_digest(mut self) -> Result<Vec<u8>> {
        let mut digest = vec![0u8; self.digest_size()];
        self.digest(&mut digest)?;
        Ok(digest)
    }
}

impl io::Write for Context {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl HashAlgorithm {
    /// Creates a new hash context for this algorithm.
    ///
    /// # Errors
    ///
    /// Fails with `Error::UnsupportedHashAlgorithm` if the backend
    /// does not implement this algorithm.
    pub fn context(self) -> Result<Context> {
        self.new_hasher()
            .map(|ctx| Context {
                algo: self,
                ctx,
            })
    }
}

/// Hashes OpenPGP packets and related types.
pub trait Hash {
    /// Updates the given hash with this object.
    ///
    /// Fails if the object cannot be put into its canonical form,
    /// e.g. because it is too large for its length field.
    fn hash(&self, hash: &mut Context) -> Result<()>;
}

impl Hash for UserID {
    /// Update the Hash with a hash of the user id.
    fn hash(&self, hash: &mut Context) -> Result<()> {
        let len = u32::try_from(self.value().len())
            .map_err(|_| Error::InvalidArgument(
                "User ID too large to hash".into()))?;

        let mut header = [0; 5];
        header[0] = 0xB4;
        header[1..5].copy_from_slice(&len.to_be_bytes());

        hash.update(header);
        hash.update(self.value());
        Ok(())
    }
}

impl Hash for UserAttribute {
    /// Update the Hash with a hash of the user attribute.
    fn hash(&self, hash: &mut Context) -> Result<()> {
        let len = u32::try_from(self.value().len())
            .map_err(|_| Error::InvalidArgument(
                "User attribute too large to hash".into()))?;

        let mut header = [0; 5];
        header[0] = 0xD1;
        header[1..5].copy_from_slice(&len.to_be_bytes());

        hash.update(header);
        hash.update(self.value());
        Ok(())
    }
}

impl Hash for Key {
    /// Update the Hash with a hash of the key's public part.
    fn hash(&self, hash: &mut Context) -> Result<()> {
        let body = self.to_vec()?;
        let len = u16::try_from(body.len())
            .map_err(|_| Error::InvalidArgument(
                format!("Key packet too large to hash: {} bytes",
                        body.len())))?;

        let mut header = [0; 3];
        header[0] = 0x99;
        header[1..3].copy_from_slice(&len.to_be_bytes());

        hash.update(header);
        hash.update(&body);
        Ok(())
    }
}

impl Hash for SignatureFields {
    /// Adds the signature's trailer to the hash.
    ///
    /// Version 3 signatures hash the signature type and the creation
    /// time.  Version 4 signatures hash the fixed fields and the
    /// hashed subpacket area, followed by a final trailer of `0x04 ∥
    /// 0xFF ∥ len32` where `len32` counts the octets hashed so far
    /// by the trailer.
    fn hash(&self, hash: &mut Context) -> Result<()> {
        if let Some(v3) = self.v3() {
            let mut trailer = [0u8; 5];
            trailer[0] = self.typ().into();
            trailer[1..5].copy_from_slice(
                &u32::from(v3.creation_time()).to_be_bytes());
            hash.update(trailer);
            return Ok(());
        }

        let hashed_area = self.hashed_area().to_vec()?;
        let len = u16::try_from(hashed_area.len())
            .map_err(|_| Error::InvalidArgument(
                "Hashed subpacket area too large".into()))?;

        let mut header = [0u8; 6];
        header[0] = 4;
        header[1] = self.typ().into();
        header[2] = self.pk_algo().into();
        header[3] = self.hash_algo().into();
        header[4..6].copy_from_slice(&len.to_be_bytes());

        hash.update(&header[..]);
        hash.update(&hashed_area);

        let mut trailer = [0u8; 6];
        trailer[0] = 4;
        trailer[1] = 0xff;
        let len = (header.len() + hashed_area.len()) as u32;
        trailer[2..6].copy_from_slice(&len.to_be_bytes());

        hash.update(&trailer[..]);
        Ok(())
    }
}

impl Hash for Signature {
    fn hash(&self, hash: &mut Context) -> Result<()> {
        self.fields().hash(hash)
    }
}

/// Feeds a document into the hash.
///
/// Text signatures are computed over the document with line endings
/// normalized to `CR LF`.
pub(crate) fn hash_document(hash: &mut Context, typ: SignatureType,
                            data: &[u8]) {
    if typ != SignatureType::Text {
        hash.update(data);
        return;
    }

    let mut normalized = Vec::with_capacity(data.len() + data.len() / 32);
    let mut prev = None;
    for &c in data {
        match c {
            b'\n' if prev != Some(b'\r') => normalized.extend_from_slice(b"\r\n"),
            b'\n' => normalized.push(c),
            _ => {
                if prev == Some(b'\r') {
                    normalized.push(b'\n');
                }
                if c != b'\r' {
                    normalized.push(c);
                }
            }
        }
        if c == b'\r' {
            normalized.push(b'\r');
        }
        prev = Some(c);
    }
    if prev == Some(b'\r') {
        normalized.push(b'\n');
    }
    hash.update(&normalized);
}

/// Hashing-related functionality.
impl SignatureFields {
    /// Computes the message digest of a document signature.
    pub fn hash_document(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        hash_document(&mut h, self.typ(), data);
        self.hash(&mut h)?;
        h.into_digest()
    }

    /// Computes the message digest of standalone signatures.
    pub fn hash_standalone(&self) -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        self.hash(&mut h)?;
        h.into_digest()
    }

    /// Returns the message digest of the direct key signature over
    /// the specified primary key.
    pub fn hash_direct_key(&self, key: &Key) -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        key.hash(&mut h)?;
        self.hash(&mut h)?;
        h.into_digest()
    }

    /// Returns the message digest of the subkey binding over the
    /// specified primary key and subkey.
    pub fn hash_subkey_binding(&self, key: &Key, subkey: &Key)
                               -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        key.hash(&mut h)?;
        subkey.hash(&mut h)?;
        self.hash(&mut h)?;
        h.into_digest()
    }

    /// Returns the message digest of the primary key binding over the
    /// specified primary key and subkey.
    pub fn hash_primary_key_binding(&self, key: &Key, subkey: &Key)
                                    -> Result<Vec<u8>> {
        self.hash_subkey_binding(key, subkey)
    }

    /// Returns the message digest of the user ID binding over the
    /// specified primary key and user ID.
    ///
    /// Version 3 signatures hash the bare user ID.
    pub fn hash_userid_binding(&self, key: &Key, userid: &UserID)
                               -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        key.hash(&mut h)?;
        if self.v3().is_some() {
            h.update(userid.value());
        } else {
            userid.hash(&mut h)?;
        }
        self.hash(&mut h)?;
        h.into_digest()
    }

    /// Returns the message digest of the user attribute binding over
    /// the specified primary key and user attribute.
    pub fn hash_user_attribute_binding(&self, key: &Key, ua: &UserAttribute)
                                       -> Result<Vec<u8>> {
        let mut h = self.hash_algo().context()?;
        key.hash(&mut h)?;
        ua.hash(&mut h)?;
        self.hash(&mut h)?;
        h.into_digest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_digest(algo: HashAlgorithm, data: &[u8]) -> String {
        let mut ctx = algo.context().unwrap();
        ctx.update(data);
        crate::conversions::to_hex(&ctx.into_digest().unwrap(), false)
    }

    #[test]
    fn known_answers() {
        assert_eq!(hex_digest(HashAlgorithm::SHA1, b"abc"),
                   "A9993E364706816ABA3E25717850C26C9CD0D89D");
        assert_eq!(hex_digest(HashAlgorithm::SHA256, b"abc"),
                   "BA7816BF8F01CFEA414140DE5DAE2223\
                    B00361A396177A9CB410FF61F20015AD");
        assert_eq!(hex_digest(HashAlgorithm::MD5, b""),
                   "D41D8CD98F00B204E9800998ECF8427E");
        assert!(HashAlgorithm::Unknown(99).context().is_err());
    }

    #[test]
    fn context_resets() {
        let mut ctx = HashAlgorithm::SHA256.context().unwrap();
        let mut a = vec![0; ctx.digest_size()];
        let mut b = vec![0; ctx.digest_size()];
        ctx.update(b"x");
        ctx.digest(&mut a).unwrap();
        ctx.update(b"x");
        ctx.digest(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn text_normalization() {
        fn normalized(data: &[u8]) -> Vec<u8> {
            let mut a = HashAlgorithm::SHA256.context().unwrap();
            hash_document(&mut a, SignatureType::Text, data);
            a.into_digest().unwrap()
        }
        fn plain(data: &[u8]) -> Vec<u8> {
            let mut a = HashAlgorithm::SHA256.context().unwrap();
            a.update(data);
            a.into_digest().unwrap()
        }

        assert_eq!(normalized(b"a\nb\n"), plain(b"a\r\nb\r\n"));
        assert_eq!(normalized(b"a\r\nb"), plain(b"a\r\nb"));
        assert_eq!(normalized(b"a\rb\r"), plain(b"a\r\nb\r\n"));
        assert_eq!(normalized(b""), plain(b""));
    }

    #[test]
    fn key_hash_length() {
        use crate::crypto::mpi::{self, MPI};
        use crate::types::{PublicKeyAlgorithm, Timestamp};

        let key = Key::new(Timestamp::from(1_000_000_000),
                           PublicKeyAlgorithm::RSAEncryptSign,
                           mpi::PublicKey::RSA {
                               e: MPI::new(&[1, 0, 1]),
                               n: MPI::new(&[0xc5; 256]),
                           });
        let body = key.to_vec().unwrap();
        let mut framed = vec![0x99];
        framed.extend_from_slice(&(body.len() as u16).to_be_bytes());
        framed.extend_from_slice(&body);

        let mut a = HashAlgorithm::SHA256.context().unwrap();
        key.hash(&mut a).unwrap();
        let mut b = HashAlgorithm::SHA256.context().unwrap();
        b.update(&framed);
        assert_eq!(a.into_digest().unwrap(), b.into_digest().unwrap());

        // The body does not fit the two octet length.
        let key = Key::new(Timestamp::from(1_000_000_000),
                           PublicKeyAlgorithm::Unknown(99),
                           mpi::PublicKey::Unknown {
                               mpis: Vec::new().into_boxed_slice(),
                               rest: vec![0; 70_000].into_boxed_slice(),
                           });
        let mut ctx = HashAlgorithm::SHA256.context().unwrap();
        let e = key.hash(&mut ctx).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::InvalidArgument(_))));
        assert!(matches!(key.fingerprint(), crate::Fingerprint::Invalid(_)));

        // Neither does the MPI's bit count.
        let key = Key::new(Timestamp::from(1_000_000_000),
                           PublicKeyAlgorithm::RSAEncryptSign,
                           mpi::PublicKey::RSA {
                               e: MPI::new(&[1, 0, 1]),
                               n: MPI::new(&[0xff; 9000]),
                           });
        assert!(key.to_vec().is_err());
        let mut ctx = HashAlgorithm::SHA256.context().unwrap();
        assert!(key.hash(&mut ctx).is_err());
    }
}
