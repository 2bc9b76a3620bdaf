use cipher::{AsyncStreamCipher, KeyIvInit};

use crate::{Error, Result};
use crate::types::SymmetricAlgorithm;

fn cfb<C>(key: &[u8], iv: &[u8], buf: &mut [u8], encrypt: bool) -> Result<()>
    where C: cipher::BlockEncryptMut + cipher::BlockCipher + cipher::KeyInit,
{
    let bad = |e: cipher::InvalidLength| -> anyhow::Error {
        Error::InvalidArgument(format!("Bad key or IV length: {}", e)).into()
    };
    if encrypt {
        cfb_mode::Encryptor::<C>::new_from_slices(key, iv).map_err(bad)?
            .encrypt(buf);
    } else {
        cfb_mode::Decryptor::<C>::new_from_slices(key, iv).map_err(bad)?
            .decrypt(buf);
    }
    Ok(())
}

impl SymmetricAlgorithm {
    /// Encrypts or decrypts `buf` in place in CFB mode.
    pub(crate) fn cfb_backend(self, key: &[u8], iv: &[u8], buf: &mut [u8],
                              encrypt: bool)
                              -> Result<()>
    {
        match self {
            SymmetricAlgorithm::AES128 =>
                cfb::<aes::Aes128>(key, iv, buf, encrypt),
            SymmetricAlgorithm::AES192 =>
                cfb::<aes::Aes192>(key, iv, buf, encrypt),
            SymmetricAlgorithm::AES256 =>
                cfb::<aes::Aes256>(key, iv, buf, encrypt),
            _ => Err(Error::UnsupportedSymmetricAlgorithm(self).into()),
        }
    }
}
