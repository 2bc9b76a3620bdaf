//! Public key, public subkey, secret key and secret subkey packets.
//!
//! All four packet types share the same [`Key`] type; which one a
//! key is serialized as is decided by the [`Packet`] variant that
//! wraps it.  Version 3 keys are parsed and verified, version 4 keys
//! are fully supported.
//!
//! See [Section 5.5 of RFC 4880] for details.
//!
//!   [`Packet`]: super::Packet
//!   [Section 5.5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5

use std::fmt;

use crate::Error;
use crate::Result;
use crate::crypto::{self, mpi, KeyPair, Password, S2K};
use crate::crypto::hash::Hash;
use crate::crypto::symmetric;
use crate::types::{
    Curve,
    Duration,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SymmetricAlgorithm,
    Timestamp,
};
use crate::Fingerprint;
use crate::KeyID;

/// Holds a public key, public subkey, private key or private subkey
/// packet.
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    /// Version of the key packet.  Must be 3 or 4.
    version: u8,
    /// When the key was created.
    creation_time: Timestamp,
    /// Validity period in days (version 3 only, 0 means forever).
    v3_expiration_days: u16,
    /// Public key algorithm of this signature.
    pk_algo: PublicKeyAlgorithm,
    /// Public key MPIs.
    mpis: mpi::PublicKey,
    /// Optional secret part of the key.
    secret: Option<SecretKeyMaterial>,
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Key")
            .field("fingerprint", &self.fingerprint())
            .field("version", &self.version)
            .field("creation_time", &self.creation_time)
            .field("pk_algo", &self.pk_algo)
            .field("mpis", &self.mpis)
            .field("secret", &self.secret)
            .finish()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

impl Key {
    /// Creates a version 4 OpenPGP public key packet from existing
    /// key material.
    pub fn new(creation_time: Timestamp, pk_algo: PublicKeyAlgorithm,
               mpis: mpi::PublicKey)
               -> Self
    {
        Key {
            version: 4,
            creation_time,
            v3_expiration_days: 0,
            pk_algo,
            mpis,
            secret: None,
        }
    }

    /// Creates a version 4 OpenPGP key packet with unencrypted
    /// secret key material.
    pub fn with_secret(creation_time: Timestamp, pk_algo: PublicKeyAlgorithm,
                       mpis: mpi::PublicKey, secret: mpi::SecretKeyMaterial)
                       -> Self
    {
        let mut key = Key::new(creation_time, pk_algo, mpis);
        key.secret = Some(secret.into());
        key
    }

    /// Creates a key packet of any supported version.
    pub(crate) fn from_parts(version: u8, creation_time: Timestamp,
                             v3_expiration_days: u16,
                             pk_algo: PublicKeyAlgorithm,
                             mpis: mpi::PublicKey,
                             secret: Option<SecretKeyMaterial>)
                             -> Result<Self>
    {
        if version != 3 && version != 4 {
            return Err(Error::UnsupportedKeyVersion(version).into());
        }
        Ok(Key {
            version,
            creation_time,
            v3_expiration_days,
            pk_algo,
            mpis,
            secret,
        })
    }

    /// Generates a new RSA key with a public modulus of size `bits`.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let (public, secret) = crypto::backend::asymmetric::generate_rsa(bits)?;
        Ok(Key::with_secret(Timestamp::now(),
                            PublicKeyAlgorithm::RSAEncryptSign,
                            public, secret))
    }

    /// Generates a new ECC key over `curve`.
    ///
    /// If `for_signing` is false an ECDH key, if it's true either an
    /// EdDSA or ECDSA key is generated.  Giving `for_signing == false`
    /// and `curve == Ed25519` will produce an error.
    pub fn generate_ecc(for_signing: bool, curve: Curve) -> Result<Self> {
        let (pk_algo, public, secret) =
            crypto::backend::asymmetric::generate_ecc(for_signing, curve)?;
        Ok(Key::with_secret(Timestamp::now(), pk_algo, public, secret))
    }

    /// Gets the version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Gets the key packet's creation time field.
    pub fn creation_time(&self) -> Timestamp {
        self.creation_time
    }

    /// Sets the key packet's creation time field.
    ///
    /// This changes the fingerprint.
    pub fn set_creation_time(&mut self, timestamp: Timestamp) -> Timestamp {
        std::mem::replace(&mut self.creation_time, timestamp)
    }

    /// Gets the validity period stored in a version 3 key packet.
    ///
    /// Returns `None` for version 4 keys, and for version 3 keys
    /// that do not expire.
    pub fn v3_validity(&self) -> Option<Duration> {
        if self.version == 3 && self.v3_expiration_days > 0 {
            Duration::days(self.v3_expiration_days.into()).ok()
        } else {
            None
        }
    }

    pub(crate) fn v3_expiration_days(&self) -> u16 {
        self.v3_expiration_days
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the key packet's MPIs.
    pub fn mpis(&self) -> &mpi::PublicKey {
        &self.mpis
    }

    /// Gets the key packet's `SecretKeyMaterial`.
    pub fn secret(&self) -> Option<&SecretKeyMaterial> {
        self.secret.as_ref()
    }

    /// Returns whether the key carries secret key material.
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Returns whether the key carries unencrypted secret key
    /// material.
    pub fn has_unencrypted_secret(&self) -> bool {
        matches!(self.secret, Some(SecretKeyMaterial::Unencrypted(_)))
    }

    /// Sets the key packet's `SecretKeyMaterial`, returning the old
    /// one.
    pub fn set_secret(&mut self, secret: Option<SecretKeyMaterial>)
                      -> Option<SecretKeyMaterial>
    {
        std::mem::replace(&mut self.secret, secret)
    }

    /// Returns a copy of the key without the secret key material.
    pub fn without_secret(&self) -> Key {
        Key {
            secret: None,
            mpis: self.mpis.clone(),
            ..*self
        }
    }

    /// Computes and returns the key's fingerprint as per Section 12.2
    /// of RFC 4880.
    ///
    /// Version 4 fingerprints are the SHA-1 hash of the public key
    /// packet, version 3 fingerprints the MD5 hash of the RSA
    /// modulus and exponent.
    pub fn fingerprint(&self) -> Fingerprint {
        let digest = match self.v3_hash_input() {
            Some((n, e)) => HashAlgorithm::MD5.context().and_then(|mut h| {
                h.update(n);
                h.update(e);
                h.into_digest()
            }),
            None => HashAlgorithm::SHA1.context().and_then(|mut h| {
                self.hash(&mut h)?;
                h.into_digest()
            }),
        };
        match digest {
            Ok(digest) => Fingerprint::from_bytes(&digest),
            Err(_) => Fingerprint::Invalid(Box::default()),
        }
    }

    /// Returns the RSA modulus and exponent of a version 3 key.
    fn v3_hash_input(&self) -> Option<(&[u8], &[u8])> {
        match (self.version, &self.mpis) {
            (3, mpi::PublicKey::RSA { e, n }) => Some((n.value(), e.value())),
            _ => None,
        }
    }

    /// Computes and returns the key's key ID as per Section 12.2 of
    /// RFC 4880.
    ///
    /// The key ID of a version 3 key is the low 64 bits of its
    /// modulus.
    pub fn keyid(&self) -> KeyID {
        if let Some((n, _)) = self.v3_hash_input() {
            let start = n.len().saturating_sub(8);
            return KeyID::from_bytes(&n[start..]);
        }
        self.fingerprint().to_keyid()
            .unwrap_or_else(KeyID::wildcard)
    }

    /// Decrypts the secret key material using `password`.
    ///
    /// Does nothing if the secret key material is not encrypted.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingSecretKey` if there is no secret key
    /// material, and `Error::BadPassphrase` if the integrity check
    /// fails after decryption.
    pub fn decrypt_secret(&mut self, password: &Password) -> Result<()> {
        let pk_algo = self.pk_algo;
        match self.secret.as_mut() {
            Some(secret) => secret.decrypt_in_place(pk_algo, password),
            None => Err(Error::MissingSecretKey.into()),
        }
    }

    /// Encrypts the secret key material using `password`.
    ///
    /// The key is protected with an iterated and salted S2K,
    /// AES-256, and a SHA-1 integrity check (S2K usage 254).
    pub fn encrypt_secret(&mut self, password: &Password) -> Result<()> {
        if self.version != 4 {
            return Err(Error::InvalidOperation(
                "Only version 4 keys can be protected".into()).into());
        }
        match self.secret.as_mut() {
            Some(secret) => secret.encrypt_in_place(password),
            None => Err(Error::MissingSecretKey.into()),
        }
    }

    /// Creates a new key pair from a `Key` with an unencrypted
    /// secret key.
    ///
    /// # Errors
    ///
    /// Fails if the secret key is missing, or encrypted.
    pub fn into_keypair(mut self) -> Result<KeyPair> {
        match self.secret.take() {
            Some(SecretKeyMaterial::Unencrypted(secret)) =>
                KeyPair::new(self, secret.mpis),
            Some(SecretKeyMaterial::Encrypted(_)) =>
                Err(Error::InvalidOperation(
                    "secret key is encrypted".into()).into()),
            None => Err(Error::MissingSecretKey.into()),
        }
    }
}

/// The integrity check protecting secret key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecretKeyChecksum {
    /// SHA-1 over the secret MPIs (S2K usage 254).
    SHA1,
    /// Sum of all octets of the secret MPIs, modulo 65536 (S2K usage
    /// 0 and 255).
    Sum16,
}

impl SecretKeyChecksum {
    /// Returns the size of the checksum in octets.
    pub fn len(self) -> usize {
        match self {
            SecretKeyChecksum::SHA1 => 20,
            SecretKeyChecksum::Sum16 => 2,
        }
    }

    /// Computes the checksum over `data`.
    pub(crate) fn compute(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            SecretKeyChecksum::SHA1 => {
                let mut h = HashAlgorithm::SHA1.context()?;
                h.update(data);
                h.into_digest()
            },
            SecretKeyChecksum::Sum16 => {
                let sum = data.iter()
                    .fold(0u16, |acc, &b| acc.wrapping_add(b.into()));
                Ok(sum.to_be_bytes().to_vec())
            },
        }
    }
}

/// Holds the secret potion of a OpenPGP secret key or secret subkey
/// packet.
///
/// This type allows postponing the decryption of the secret key until
/// we need to use it.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum SecretKeyMaterial {
    /// Unencrypted secret key. Can be used as-is.
    Unencrypted(Unencrypted),
    /// The secret key is encrypted with a password.
    Encrypted(Encrypted),
}

impl From<mpi::SecretKeyMaterial> for SecretKeyMaterial {
    fn from(mpis: mpi::SecretKeyMaterial) -> Self {
        SecretKeyMaterial::Unencrypted(mpis.into())
    }
}

impl From<Unencrypted> for SecretKeyMaterial {
    fn from(key: Unencrypted) -> Self {
        SecretKeyMaterial::Unencrypted(key)
    }
}

impl From<Encrypted> for SecretKeyMaterial {
    fn from(key: Encrypted) -> Self {
        SecretKeyMaterial::Encrypted(key)
    }
}

impl SecretKeyMaterial {
    /// Decrypts this secret key using `password`.
    ///
    /// The `SecretKeyMaterial` type does not know what kind of key it is, so
    /// `pk_algo` is needed to parse the correct number of MPIs.
    pub fn decrypt_in_place(&mut self, pk_algo: PublicKeyAlgorithm,
                            password: &Password)
                            -> Result<()> {
        let new = match self {
            SecretKeyMaterial::Encrypted(e) =>
                Some(e.decrypt(pk_algo, password)?.into()),
            SecretKeyMaterial::Unencrypted(_) => None,
        };

        if let Some(v) = new {
            *self = v;
        }

        Ok(())
    }

    /// Encrypts this secret key using `password`.
    pub fn encrypt_in_place(&mut self, password: &Password) -> Result<()> {
        let new = match self {
            SecretKeyMaterial::Unencrypted(u) =>
                Some(u.encrypt(password)?.into()),
            SecretKeyMaterial::Encrypted(_) => None,
        };

        if let Some(v) = new {
            *self = v;
        }

        Ok(())
    }

    /// Returns true if this secret key is encrypted.
    pub fn is_encrypted(&self) -> bool {
        match self {
            SecretKeyMaterial::Encrypted(_) => true,
            SecretKeyMaterial::Unencrypted(_) => false,
        }
    }
}

/// Unencrypted secret key. Can be used as-is.
///
/// The MPIs are zeroed when dropped.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Unencrypted {
    /// MPIs of the secret key.
    mpis: mpi::SecretKeyMaterial,
}

impl From<mpi::SecretKeyMaterial> for Unencrypted {
    fn from(mpis: mpi::SecretKeyMaterial) -> Self {
        Unencrypted { mpis }
    }
}

impl Unencrypted {
    /// Gets the secret MPIs.
    pub fn mpis(&self) -> &mpi::SecretKeyMaterial {
        &self.mpis
    }

    /// Encrypts this secret key using `password`.
    pub fn encrypt(&self, password: &Password) -> Result<Encrypted> {
        let s2k = S2K::default();
        let algo = SymmetricAlgorithm::AES256;
        let checksum = SecretKeyChecksum::SHA1;
        let key = s2k.derive_key(password, algo.key_size()?)?;

        // Ciphertext is preceded by a random block, which doubles
        // as the IV.
        let block_size = algo.block_size()?;
        let mut esk: crypto::mem::Protected = {
            let mut plaintext = vec![0u8; block_size];
            crypto::random(&mut plaintext)?;
            self.mpis.serialize_chksumd(&mut plaintext, checksum)?;
            plaintext.into()
        };
        let iv = vec![0u8; block_size];
        symmetric::cfb_encrypt(algo, &key, &iv, &mut esk)?;

        Ok(Encrypted {
            s2k,
            algo,
            checksum,
            ciphertext: esk.to_vec().into_boxed_slice(),
        })
    }
}

/// The secret key is encrypted with a password.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Encrypted {
    /// Key derivation mechanism to use.
    s2k: S2K,
    /// Symmetric algorithm used for encryption the secret key.
    algo: SymmetricAlgorithm,
    /// Integrity check.
    checksum: SecretKeyChecksum,
    /// Encrypted MPIs prefixed with the IV.
    ciphertext: Box<[u8]>,
}

impl Encrypted {
    /// Creates a new encrypted key object.
    ///
    /// `ciphertext` starts with the IV.
    pub fn new(s2k: S2K, algo: SymmetricAlgorithm,
               checksum: SecretKeyChecksum, ciphertext: Box<[u8]>)
               -> Self {
        Encrypted { s2k, algo, checksum, ciphertext }
    }

    /// Returns the key derivation mechanism.
    pub fn s2k(&self) -> &S2K {
        &self.s2k
    }

    /// Returns the symmetric algorithm used for encryption the secret
    /// key.
    pub fn algo(&self) -> SymmetricAlgorithm {
        self.algo
    }

    /// Returns the integrity check used.
    pub fn checksum(&self) -> SecretKeyChecksum {
        self.checksum
    }

    /// Returns the S2K usage octet for this protection.
    pub fn s2k_usage(&self) -> u8 {
        match self.checksum {
            SecretKeyChecksum::SHA1 => 254,
            SecretKeyChecksum::Sum16 => 255,
        }
    }

    /// Returns the IV and the encrypted MPIs.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Decrypts this secret key using `password`.
    ///
    /// The `Encrypted` key does not know what kind of key it is, so
    /// `pk_algo` is needed to parse the correct number of MPIs.
    pub fn decrypt(&self, pk_algo: PublicKeyAlgorithm, password: &Password)
                   -> Result<Unencrypted> {
        let key = self.s2k.derive_key(password, self.algo.key_size()?)?;
        let block_size = self.algo.block_size()?;
        if self.ciphertext.len() < block_size {
            return Err(Error::MalformedPacket(
                "Encrypted secret key shorter than the IV".into()).into());
        }

        let mut plaintext: crypto::mem::Protected =
            self.ciphertext.to_vec().into();
        let iv = vec![0u8; block_size];
        symmetric::cfb_decrypt(self.algo, &key, &iv, &mut plaintext)?;

        // Consume the first block.
        mpi::SecretKeyMaterial::parse_chksumd(
            pk_algo, &plaintext[block_size..], self.checksum)
            .map(|m| m.into())
            .map_err(|e| match e.downcast_ref::<Error>() {
                Some(Error::MalformedPacket(_))
                    | Some(Error::MalformedMPI(_)) =>
                    Error::BadPassphrase.into(),
                _ => e,
            })
    }
}
