//! Symmetric encryption of secret key material.
//!
//! OpenPGP protects secret keys with a block cipher in CFB mode
//! using an explicit IV, see [Section 5.5.3 of RFC 4880].  The
//! stream is resynchronized at every block boundary, which is plain
//! CFB as implemented by the backend.
//!
//!   [Section 5.5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5.3

use crate::{Error, Result};
use crate::types::SymmetricAlgorithm;

fn check(algo: SymmetricAlgorithm, key: &[u8], iv: &[u8]) -> Result<()> {
    if key.len() != algo.key_size()? {
        return Err(Error::InvalidArgument(
            format!("{} needs a {} octet key, got {}",
                    algo, algo.key_size()?, key.len())).into());
    }
    if iv.len() != algo.block_size()? {
        return Err(Error::InvalidArgument(
            format!("{} needs a {} octet IV, got {}",
                    algo, algo.block_size()?, iv.len())).into());
    }
    Ok(())
}

/// Encrypts `buf` in place.
pub(crate) fn cfb_encrypt(algo: SymmetricAlgorithm, key: &[u8], iv: &[u8],
                          buf: &mut [u8])
                          -> Result<()> {
    check(algo, key, iv)?;
    algo.cfb_backend(key, iv, buf, true)
}

/// Decrypts `buf` in place.
pub(crate) fn cfb_decrypt(algo: SymmetricAlgorithm, key: &[u8], iv: &[u8],
                          buf: &mut [u8])
                          -> Result<()> {
    check(algo, key, iv)?;
    algo.cfb_backend(key, iv, buf, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_cfb_known_answer() {
        // NIST SP 800-38A, F.3.13 CFB128-AES128.Encrypt.
        let key = crate::conversions::from_hex(
            "2b7e151628aed2a6abf7158809cf4f3c", false).unwrap();
        let iv = crate::conversions::from_hex(
            "000102030405060708090a0b0c0d0e0f", false).unwrap();
        let mut buf = crate::conversions::from_hex(
            "6bc1bee22e409f96e93d7e117393172a", false).unwrap();
        cfb_encrypt(SymmetricAlgorithm::AES128, &key, &iv, &mut buf).unwrap();
        assert_eq!(crate::conversions::to_hex(&buf, false),
                   "3B3FD92EB72DAD20333449F8E83CFB4A");
        cfb_decrypt(SymmetricAlgorithm::AES128, &key, &iv, &mut buf).unwrap();
        assert_eq!(crate::conversions::to_hex(&buf, false),
                   "6BC1BEE22E409F96E93D7E117393172A");
    }

    #[test]
    fn odd_lengths() {
        let key = [7u8; 32];
        let iv = [9u8; 16];
        let mut buf = b"not a multiple of the block size".to_vec();
        buf.push(b'!');
        let orig = buf.clone();
        cfb_encrypt(SymmetricAlgorithm::AES256, &key, &iv, &mut buf).unwrap();
        assert_ne!(buf, orig);
        cfb_decrypt(SymmetricAlgorithm::AES256, &key, &iv, &mut buf).unwrap();
        assert_eq!(buf, orig);

        assert!(cfb_encrypt(SymmetricAlgorithm::AES128, &key, &iv, &mut buf)
                .is_err());
        assert!(cfb_encrypt(SymmetricAlgorithm::CAST5, &key[..16], &iv[..8],
                            &mut buf).is_err());
    }
}
