//! Asymmetric primitives backed by the RustCrypto crates.
//!
//! Everything in here works on the raw MPI representations; the
//! OpenPGP-level plumbing lives in `crypto::asymmetric` and
//! `packet::key`.

use std::convert::TryFrom;

use num_bigint_dig::{traits::ModInverse, BigUint};
use rand_core::OsRng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::{Error, Result};
use crate::crypto::SessionKey;
use crate::crypto::mpi::{self, MPI};
use crate::types::{Curve, HashAlgorithm, PublicKeyAlgorithm, SymmetricAlgorithm};

/// Default KDF hash for ECDH over P-256, see [Section 13.2 of RFC 6637].
///
///   [Section 13.2 of RFC 6637]: https://tools.ietf.org/html/rfc6637#section-13
const ECDH_P256_KDF_HASH: HashAlgorithm = HashAlgorithm::SHA256;
/// Default key wrapping algorithm for ECDH over P-256.
const ECDH_P256_KEK_CIPHER: SymmetricAlgorithm = SymmetricAlgorithm::AES128;

fn pkcs1_padding(hash_algo: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    let padding = match hash_algo {
        HashAlgorithm::MD5 => Pkcs1v15Sign::new::<md5::Md5>(),
        HashAlgorithm::SHA1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        HashAlgorithm::SHA224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
        HashAlgorithm::SHA256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::SHA384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::SHA512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        HashAlgorithm::RipeMD => Pkcs1v15Sign::new::<ripemd::Ripemd160>(),
        HashAlgorithm::Private(_) | HashAlgorithm::Unknown(_) =>
            return Err(Error::UnsupportedHashAlgorithm(hash_algo).into()),
    };
    Ok(padding)
}

fn rsa_public_key(e: &MPI, n: &MPI) -> Result<RsaPublicKey> {
    let n = BigUint::from_bytes_be(n.value());
    let e = BigUint::from_bytes_be(e.value());
    RsaPublicKey::new(n, e)
        .map_err(|e| Error::InvalidKey(format!("RSA: {}", e)).into())
}

fn rsa_private_key(e: &MPI, n: &MPI, p: &mpi::ProtectedMPI,
                   q: &mpi::ProtectedMPI, d: &mpi::ProtectedMPI)
                   -> Result<RsaPrivateKey>
{
    let n = BigUint::from_bytes_be(n.value());
    let e = BigUint::from_bytes_be(e.value());
    let p = BigUint::from_bytes_be(p.value());
    let q = BigUint::from_bytes_be(q.value());
    let d = BigUint::from_bytes_be(d.value());
    RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .map_err(|e| Error::InvalidKey(format!("RSA: {}", e)).into())
}

fn ed25519_secret(scalar: &mpi::ProtectedMPI)
                  -> Result<ed25519_dalek::SigningKey>
{
    let seed = scalar.value_padded(ed25519_dalek::SECRET_KEY_LENGTH)
        .map_err(|_| Error::InvalidKey("Ed25519 secret too long".into()))?;
    let seed = <&[u8; ed25519_dalek::SECRET_KEY_LENGTH]>::try_from(&seed[..])
        .map_err(|_| Error::InvalidKey("Ed25519 secret size".into()))?;
    Ok(ed25519_dalek::SigningKey::from_bytes(seed))
}

fn unsupported_curve(curve: &Curve) -> anyhow::Error {
    Error::UnsupportedEllipticCurve(curve.clone()).into()
}

/// Signs `digest` with the given secret key.
pub(crate) fn sign(pk_algo: PublicKeyAlgorithm,
                   public: &mpi::PublicKey,
                   secret: &mpi::SecretKeyMaterial,
                   hash_algo: HashAlgorithm,
                   digest: &[u8])
                   -> Result<mpi::Signature>
{
    use PublicKeyAlgorithm::*;

    match (pk_algo, public, secret) {
        (RSASign, mpi::PublicKey::RSA { e, n },
         mpi::SecretKeyMaterial::RSA { p, q, d, .. })
        | (RSAEncryptSign, mpi::PublicKey::RSA { e, n },
           mpi::SecretKeyMaterial::RSA { p, q, d, .. }) => {
            let key = rsa_private_key(e, n, p, q, d)?;
            let sig = key.sign(pkcs1_padding(hash_algo)?, digest)
                .map_err(|e| Error::InvalidOperation(
                    format!("RSA signing failed: {}", e)))?;
            Ok(mpi::Signature::RSA { s: MPI::new(&sig) })
        },

        (EdDSA, mpi::PublicKey::EdDSA { curve, .. },
         mpi::SecretKeyMaterial::EdDSA { scalar }) => match curve {
            Curve::Ed25519 => {
                use ed25519_dalek::Signer;
                let key = ed25519_secret(scalar)?;
                let sig = key.sign(digest).to_bytes();
                Ok(mpi::Signature::EdDSA {
                    r: MPI::new(&sig[..32]),
                    s: MPI::new(&sig[32..]),
                })
            },
            _ => Err(unsupported_curve(curve)),
        },

        (ECDSA, mpi::PublicKey::ECDSA { curve, .. },
         mpi::SecretKeyMaterial::ECDSA { scalar }) => match curve {
            Curve::NistP256 => {
                use p256::ecdsa::signature::hazmat::PrehashSigner;

                let key = scalar.value_padded(32)?;
                let key = p256::ecdsa::SigningKey::from_slice(&key)
                    .map_err(|e| Error::InvalidKey(
                        format!("P-256: {}", e)))?;
                let sig: p256::ecdsa::Signature = key.sign_prehash(digest)
                    .map_err(|e| Error::InvalidOperation(
                        format!("ECDSA signing failed: {}", e)))?;
                let (r, s) = sig.split_bytes();
                Ok(mpi::Signature::ECDSA {
                    r: MPI::new(&r),
                    s: MPI::new(&s),
                })
            },
            _ => Err(unsupported_curve(curve)),
        },

        (pk_algo, _, _) => Err(Error::InvalidOperation(format!(
            "unsupported combination of algorithm {:?}, key {:?}, \
             and secret key {:?}",
            pk_algo, public.algo(), secret.algo())).into()),
    }
}

/// Verifies `sig` over `digest`.
///
/// A signature that does not verify is `Ok(false)`.  Errors are
/// reserved for keys and signatures that do not fit together or
/// cannot be used at all.
pub(crate) fn verify(public: &mpi::PublicKey,
                     sig: &mpi::Signature,
                     hash_algo: HashAlgorithm,
                     digest: &[u8])
                     -> Result<bool>
{
    match (public, sig) {
        (mpi::PublicKey::RSA { e, n }, mpi::Signature::RSA { s }) => {
            let key = rsa_public_key(e, n)?;
            let s = match s.value_padded(key.size()) {
                Ok(s) => s,
                // Longer than the modulus.
                Err(_) => return Ok(false),
            };
            Ok(key.verify(pkcs1_padding(hash_algo)?, digest, &s).is_ok())
        },

        (mpi::PublicKey::EdDSA { curve, q }, mpi::Signature::EdDSA { r, s }) =>
            match curve {
                Curve::Ed25519 => {
                    use ed25519_dalek::Verifier;

                    let q = q.decode_compressed_point()?;
                    let q = <&[u8; 32]>::try_from(q)
                        .map_err(|_| Error::InvalidKey(
                            "Ed25519 point size".into()))?;
                    let key = ed25519_dalek::VerifyingKey::from_bytes(q)
                        .map_err(|e| Error::InvalidKey(
                            format!("Ed25519: {}", e)))?;

                    let mut bytes = [0u8; 64];
                    match (r.value_padded(32), s.value_padded(32)) {
                        (Ok(r), Ok(s)) => {
                            bytes[..32].copy_from_slice(&r);
                            bytes[32..].copy_from_slice(&s);
                        },
                        _ => return Ok(false),
                    }
                    let sig = ed25519_dalek::Signature::from_bytes(&bytes);
                    Ok(key.verify(digest, &sig).is_ok())
                },
                _ => Err(unsupported_curve(curve)),
            },

        (mpi::PublicKey::ECDSA { curve, q }, mpi::Signature::ECDSA { r, s }) =>
            match curve {
                Curve::NistP256 => {
                    use p256::ecdsa::signature::hazmat::PrehashVerifier;

                    let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(
                        q.value())
                        .map_err(|e| Error::InvalidKey(
                            format!("P-256: {}", e)))?;

                    let mut bytes = [0u8; 64];
                    match (r.value_padded(32), s.value_padded(32)) {
                        (Ok(r), Ok(s)) => {
                            bytes[..32].copy_from_slice(&r);
                            bytes[32..].copy_from_slice(&s);
                        },
                        _ => return Ok(false),
                    }
                    let sig = match p256::ecdsa::Signature::from_slice(&bytes) {
                        Ok(sig) => sig,
                        // Zero or out of range scalars.
                        Err(_) => return Ok(false),
                    };
                    Ok(key.verify_prehash(digest, &sig).is_ok())
                },
                _ => Err(unsupported_curve(curve)),
            },

        _ => Err(Error::InvalidArgument(format!(
            "unsupported combination of key {:?} and signature {:?}",
            public.algo(), sig)).into()),
    }
}

/// Encrypts `data` to an RSA key using PKCS#1 v1.5 padding.
pub(crate) fn rsa_encrypt(public: &mpi::PublicKey, data: &[u8])
                          -> Result<mpi::Ciphertext>
{
    match public {
        mpi::PublicKey::RSA { e, n } => {
            // The ciphertext has the length of the modulus, and the
            // padding needs at least 11 octets.
            if data.len() + 11 > n.value().len() {
                return Err(Error::InvalidArgument(
                    "Plaintext data too large".into()).into());
            }

            let key = rsa_public_key(e, n)?;
            let c = key.encrypt(&mut OsRng, Pkcs1v15Encrypt, data)
                .map_err(|e| Error::InvalidOperation(
                    format!("RSA encryption failed: {}", e)))?;
            Ok(mpi::Ciphertext::RSA { c: MPI::new(&c) })
        },
        _ => Err(Error::InvalidKey(format!(
            "{:?} keys cannot encrypt session keys", public.algo())).into()),
    }
}

/// Decrypts a PKCS#1 v1.5 padded RSA ciphertext.
pub(crate) fn rsa_decrypt(public: &mpi::PublicKey,
                          secret: &mpi::SecretKeyMaterial,
                          ciphertext: &mpi::Ciphertext)
                          -> Result<SessionKey>
{
    match (public, secret, ciphertext) {
        (mpi::PublicKey::RSA { e, n },
         mpi::SecretKeyMaterial::RSA { p, q, d, .. },
         mpi::Ciphertext::RSA { c }) => {
            let key = rsa_private_key(e, n, p, q, d)?;
            let m = key.decrypt(Pkcs1v15Encrypt, c.value())
                .map_err(|e| Error::InvalidOperation(
                    format!("RSA decryption failed: {}", e)))?;
            Ok(m.into())
        },
        _ => Err(Error::InvalidOperation(format!(
            "unsupported combination of key {:?}, secret key {:?} \
             and ciphertext {:?}",
            public.algo(), secret.algo(), ciphertext.pk_algo())).into()),
    }
}

/// Generates a new RSA key with a public modulus of size `bits`.
pub(crate) fn generate_rsa(bits: usize)
                           -> Result<(mpi::PublicKey, mpi::SecretKeyMaterial)>
{
    let key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| Error::InvalidOperation(
            format!("RSA key generation failed: {}", e)))?;
    let (p, q) = match key.primes() {
        [p, q] => (p, q),
        _ => return Err(Error::InvalidOperation(
            "RSA key generation resulted in wrong number of primes".into())
                        .into()),
    };
    // p < q
    let (p, q) = if p < q { (p, q) } else { (q, p) };
    // u = p⁻¹ mod q
    let u = p.mod_inverse(q)
        .and_then(|x| x.to_biguint())
        .ok_or_else(|| Error::InvalidOperation(
            "p and q are not coprime".into()))?;

    let public = mpi::PublicKey::RSA {
        e: MPI::new(&key.e().to_bytes_be()),
        n: MPI::new(&key.n().to_bytes_be()),
    };
    let secret = mpi::SecretKeyMaterial::RSA {
        d: key.d().to_bytes_be().into(),
        p: p.to_bytes_be().into(),
        q: q.to_bytes_be().into(),
        u: u.to_bytes_be().into(),
    };
    Ok((public, secret))
}

/// Generates a new ECC key over `curve`.
///
/// If `for_signing` is false an ECDH key, if it's true either an
/// EdDSA or ECDSA key is generated.
pub(crate) fn generate_ecc(for_signing: bool, curve: Curve)
                           -> Result<(PublicKeyAlgorithm, mpi::PublicKey,
                                      mpi::SecretKeyMaterial)>
{
    match (&curve, for_signing) {
        (Curve::Ed25519, true) => {
            let key = ed25519_dalek::SigningKey::generate(&mut OsRng);
            let public = mpi::PublicKey::EdDSA {
                curve,
                q: MPI::new_compressed_point(key.verifying_key().as_bytes()),
            };
            let secret = mpi::SecretKeyMaterial::EdDSA {
                scalar: mpi::ProtectedMPI::from(&key.to_bytes()[..]),
            };
            Ok((PublicKeyAlgorithm::EdDSA, public, secret))
        },

        (Curve::NistP256, _) => {
            use p256::elliptic_curve::sec1::ToEncodedPoint;

            let key = p256::SecretKey::random(&mut OsRng);
            let q = MPI::new_point(
                key.public_key().to_encoded_point(false).as_bytes());
            let scalar = mpi::ProtectedMPI::from(key.to_bytes().as_slice());

            if for_signing {
                Ok((PublicKeyAlgorithm::ECDSA,
                    mpi::PublicKey::ECDSA { curve, q },
                    mpi::SecretKeyMaterial::ECDSA { scalar }))
            } else {
                Ok((PublicKeyAlgorithm::ECDH,
                    mpi::PublicKey::ECDH {
                        curve,
                        q,
                        hash: ECDH_P256_KDF_HASH,
                        sym: ECDH_P256_KEK_CIPHER,
                    },
                    mpi::SecretKeyMaterial::ECDH { scalar }))
            }
        },

        _ => Err(unsupported_curve(&curve)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(algo: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        let mut ctx = algo.context().unwrap();
        ctx.update(data);
        ctx.into_digest().unwrap()
    }

    #[test]
    fn ed25519_sign_verify() {
        let (algo, public, secret) =
            generate_ecc(true, Curve::Ed25519).unwrap();
        assert_eq!(algo, PublicKeyAlgorithm::EdDSA);

        let d = digest(HashAlgorithm::SHA256, b"hello");
        let sig = sign(algo, &public, &secret, HashAlgorithm::SHA256, &d)
            .unwrap();
        assert!(verify(&public, &sig, HashAlgorithm::SHA256, &d).unwrap());

        let other = digest(HashAlgorithm::SHA256, b"hullo");
        assert!(!verify(&public, &sig, HashAlgorithm::SHA256, &other)
                .unwrap());
    }

    #[test]
    fn p256_sign_verify() {
        let (algo, public, secret) =
            generate_ecc(true, Curve::NistP256).unwrap();
        assert_eq!(algo, PublicKeyAlgorithm::ECDSA);

        let d = digest(HashAlgorithm::SHA256, b"hello");
        let sig = sign(algo, &public, &secret, HashAlgorithm::SHA256, &d)
            .unwrap();
        assert!(verify(&public, &sig, HashAlgorithm::SHA256, &d).unwrap());

        let other = digest(HashAlgorithm::SHA256, b"hullo");
        assert!(!verify(&public, &sig, HashAlgorithm::SHA256, &other)
                .unwrap());
    }

    #[test]
    fn p256_ecdh_keys() {
        let (algo, public, _) = generate_ecc(false, Curve::NistP256).unwrap();
        assert_eq!(algo, PublicKeyAlgorithm::ECDH);
        match public {
            mpi::PublicKey::ECDH { q, hash, sym, .. } => {
                assert_eq!(q.value()[0], 0x04);
                assert_eq!(q.value().len(), 65);
                assert_eq!(hash, HashAlgorithm::SHA256);
                assert_eq!(sym, SymmetricAlgorithm::AES128);
            },
            _ => panic!("not an ECDH key"),
        }
        assert!(generate_ecc(false, Curve::Ed25519).is_err());
        assert!(generate_ecc(true, Curve::NistP384).is_err());
    }

    #[test]
    fn rsa_roundtrips() {
        let (public, secret) = generate_rsa(1024).unwrap();
        if let mpi::SecretKeyMaterial::RSA { p, q, .. } = &secret {
            assert!(BigUint::from_bytes_be(p.value())
                    < BigUint::from_bytes_be(q.value()));
        }

        let d = digest(HashAlgorithm::SHA256, b"hello");
        let sig = sign(PublicKeyAlgorithm::RSAEncryptSign, &public, &secret,
                       HashAlgorithm::SHA256, &d).unwrap();
        assert!(verify(&public, &sig, HashAlgorithm::SHA256, &d).unwrap());
        assert!(!verify(&public, &sig, HashAlgorithm::SHA512,
                        &digest(HashAlgorithm::SHA512, b"hello")).unwrap());

        let c = rsa_encrypt(&public, b"0123456789abcdef").unwrap();
        let m = rsa_decrypt(&public, &secret, &c).unwrap();
        assert_eq!(&m[..], b"0123456789abcdef");

        assert!(rsa_encrypt(&public, &[0u8; 128]).is_err());
    }

    #[test]
    fn mismatched_algorithms() {
        let (_, ed, _) = generate_ecc(true, Curve::Ed25519).unwrap();
        let sig = mpi::Signature::RSA { s: MPI::new(&[1, 2, 3]) };
        assert!(verify(&ed, &sig, HashAlgorithm::SHA256, &[0; 32]).is_err());
    }
}
