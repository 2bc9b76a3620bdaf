//! Asymmetric crypt operations.

use crate::packet::Key;
use crate::crypto::backend::asymmetric as backend;
use crate::crypto::SessionKey;
use crate::crypto::mpi;
use crate::types::HashAlgorithm;

use crate::Error;
use crate::Result;

/// Creates a signature.
///
/// This is a low-level mechanism to produce an arbitrary OpenPGP
/// signature.  Every operation that signs goes through this trait,
/// so that secret keys can live somewhere other than in memory.
pub trait Signer {
    /// Returns a reference to the public key.
    fn public(&self) -> &Key;

    /// Creates a signature over the `digest` produced by `hash_algo`.
    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<mpi::Signature>;
}

impl Signer for Box<dyn Signer> {
    fn public(&self) -> &Key {
        self.as_ref().public()
    }

    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<mpi::Signature> {
        self.as_mut().sign(hash_algo, digest)
    }
}

/// A cryptographic key pair.
///
/// A `KeyPair` is a combination of public and unencrypted secret
/// key.  The secret is zeroed when the pair is dropped.
#[derive(Clone)]
pub struct KeyPair {
    public: Key,
    secret: mpi::SecretKeyMaterial,
}

impl KeyPair {
    /// Creates a new key pair.
    ///
    /// `public` must not carry secret key material itself, and the
    /// secret must belong to the same algorithm.
    pub fn new(public: Key, secret: mpi::SecretKeyMaterial) -> Result<Self> {
        if let Some(algo) = secret.algo() {
            if public.mpis().algo() != Some(algo) {
                return Err(Error::InvalidArgument(format!(
                    "{} secret does not match {:?} public key",
                    algo, public.mpis().algo())).into());
            }
        }
        Ok(Self {
            public: public.without_secret(),
            secret,
        })
    }

    /// Returns a reference to the public key.
    pub fn public(&self) -> &Key {
        &self.public
    }

    /// Returns a reference to the secret key.
    pub fn secret(&self) -> &mpi::SecretKeyMaterial {
        &self.secret
    }

    /// Decrypts an RSA encrypted session key.
    pub fn decrypt(&self, ciphertext: &mpi::Ciphertext) -> Result<SessionKey> {
        backend::rsa_decrypt(self.public.mpis(), &self.secret, ciphertext)
    }
}

impl Signer for KeyPair {
    fn public(&self) -> &Key {
        &self.public
    }

    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<mpi::Signature>
    {
        backend::sign(self.public.pk_algo(), self.public.mpis(), &self.secret,
                      hash_algo, digest)
    }
}

/// Encrypts a session key to `recipient`.
///
/// Only RSA keys are supported; the session key is padded using
/// PKCS#1 v1.5 as described in [Section 5.1 of RFC 4880].
///
///   [Section 5.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.1
pub fn encrypt_session_key(recipient: &Key, session_key: &SessionKey)
                           -> Result<mpi::Ciphertext>
{
    if ! recipient.pk_algo().for_encryption() {
        return Err(Error::InvalidKey(format!(
            "{} keys cannot encrypt", recipient.pk_algo())).into());
    }
    backend::rsa_encrypt(recipient.mpis(), session_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Curve;

    #[test]
    fn session_key_roundtrip() {
        let key = Key::generate_rsa(1024).unwrap();
        let pair = key.clone().into_keypair().unwrap();

        let sk = SessionKey::new(32).unwrap();
        let c = encrypt_session_key(&key, &sk).unwrap();
        assert_eq!(pair.decrypt(&c).unwrap(), sk);
    }

    #[test]
    fn signing_keys_cannot_encrypt() {
        let key = Key::generate_ecc(true, Curve::Ed25519).unwrap();
        let sk = SessionKey::new(32).unwrap();
        assert!(encrypt_session_key(&key, &sk).is_err());
    }

    #[test]
    fn mismatched_secret() {
        let rsa = Key::generate_rsa(1024).unwrap();
        let ed = Key::generate_ecc(true, Curve::Ed25519).unwrap()
            .into_keypair().unwrap();
        assert!(KeyPair::new(rsa, ed.secret().clone()).is_err());
    }
}
