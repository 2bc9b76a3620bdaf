use digest::{Digest as _, FixedOutputReset};

use crate::crypto::hash::Digest;
use crate::types::HashAlgorithm;
use crate::{Error, Result};

impl<T> Digest for T
    where T: digest::Digest + FixedOutputReset + Clone + Send + Sync + 'static
{
    fn digest_size(&self) -> usize {
        <T as digest::Digest>::output_size()
    }

    fn update(&mut self, data: &[u8]) {
        digest::Digest::update(self, data);
    }

    fn digest(&mut self, digest: &mut [u8]) -> Result<()> {
        let result = digest::Digest::finalize_reset(self);
        let n = digest.len().min(result.len());
        digest[..n].copy_from_slice(&result[..n]);
        Ok(())
    }
}

impl HashAlgorithm {
    /// Creates a new hash context for this algorithm.
    ///
    /// # Errors
    ///
    /// Fails with `Error::UnsupportedHashAlgorithm` if the backend
    /// does not support this algorithm.
    pub(crate) fn new_hasher(self) -> Result<Box<dyn Digest>> {
        match self {
            HashAlgorithm::SHA1 => Ok(Box::new(sha1::Sha1::new())),
            HashAlgorithm::SHA224 => Ok(Box::new(sha2::Sha224::new())),
            HashAlgorithm::SHA256 => Ok(Box::new(sha2::Sha256::new())),
            HashAlgorithm::SHA384 => Ok(Box::new(sha2::Sha384::new())),
            HashAlgorithm::SHA512 => Ok(Box::new(sha2::Sha512::new())),
            HashAlgorithm::RipeMD => Ok(Box::new(ripemd::Ripemd160::new())),
            HashAlgorithm::MD5 => Ok(Box::new(md5::Md5::new())),
            HashAlgorithm::Private(_) | HashAlgorithm::Unknown(_) =>
                Err(Error::UnsupportedHashAlgorithm(self).into()),
        }
    }
}
