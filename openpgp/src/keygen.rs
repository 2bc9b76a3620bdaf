//! Key generation.
//!
//! A [`KeyGenerator`] creates keys into a pair of key stores, one for
//! public and one for secret keys.  Generated keys are not inserted
//! directly.  Instead, the generator serializes the key, its user ID
//! and self-certification (or, for subkeys, the binding signature)
//! and reads the result into the stores, so that a freshly generated
//! key is indistinguishable from one that was imported.
//!
//! Parameters that are left unset can be filled in with
//! [`PrimaryKeyParams::merge_defaults`] and
//! [`SubkeyParams::merge_defaults`].  For elliptic curve keys, the
//! hash algorithm is upgraded to the minimum digest size the curve
//! calls for.

use crate::{
    Error,
    Result,
};
use crate::crypto::Password;
use crate::keystore::{KeyHandle, KeyStore};
use crate::packet::{Key, Packet, UserID};
use crate::packet::signature::SignatureBuilder;
use crate::provider::{
    Attempts,
    NoPassphrase,
    Operation,
    PassphraseContext,
    PassphraseProvider,
    unlock_with,
};
use crate::serialize::Serialize;
use crate::types::{
    CompressionAlgorithm,
    Curve,
    Duration,
    HashAlgorithm,
    KeyFlags,
    KeyServerPreferences,
    PublicKeyAlgorithm,
    SignatureType,
    SymmetricAlgorithm,
};

/// The default RSA modulus size.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Features advertised in self-certifications: modification
/// detection.
const FEATURES: &[u8] = &[0x01];

/// Algorithm parameters of a key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CryptoParams {
    /// The public key algorithm.
    pub algo: Option<PublicKeyAlgorithm>,
    /// The RSA modulus size.
    pub bits: Option<usize>,
    /// The elliptic curve.
    pub curve: Option<Curve>,
    /// The hash algorithm for the key's signatures.
    pub hash: Option<HashAlgorithm>,
}

impl CryptoParams {
    /// Fills in unset parameters.
    ///
    /// The algorithm defaults to RSA with a 2048 bit modulus, the
    /// hash to SHA-256.  EdDSA keys default to Ed25519, ECDSA and
    /// ECDH keys to NIST P-256.
    pub fn merge_defaults(&mut self) {
        use self::PublicKeyAlgorithm::*;

        let algo = *self.algo.get_or_insert(RSAEncryptSign);
        match algo {
            RSAEncryptSign | RSAEncrypt | RSASign => {
                self.bits.get_or_insert(DEFAULT_RSA_BITS);
            },
            EdDSA => {
                self.curve.get_or_insert(Curve::Ed25519);
            },
            ECDSA | ECDH => {
                self.curve.get_or_insert(Curve::NistP256);
            },
            _ => (),
        }
        self.hash.get_or_insert(HashAlgorithm::SHA256);
        self.upgrade_hash();
    }

    /// Raises the hash algorithm to the curve's minimum digest size.
    fn upgrade_hash(&mut self) {
        let min = match self.curve.as_ref().and_then(|c| c.min_digest_size()) {
            Some(min) => min,
            None => return,
        };
        let hash = self.hash.unwrap_or_default();
        if hash.digest_size().map(|size| size >= min).unwrap_or(false) {
            return;
        }

        let upgraded = [HashAlgorithm::SHA256, HashAlgorithm::SHA384,
                        HashAlgorithm::SHA512]
            .iter()
            .cloned()
            .find(|h| h.digest_size().map(|size| size >= min).unwrap_or(false))
            .unwrap_or(HashAlgorithm::SHA512);
        log::debug!("Upgrading {} to {} for {:?}", hash, upgraded, self.curve);
        self.hash = Some(upgraded);
    }

    fn algo(&self) -> Result<PublicKeyAlgorithm> {
        self.algo.ok_or_else(|| Error::InvalidArgument(
            "No public key algorithm given".into()).into())
    }

    fn hash_algo(&self) -> HashAlgorithm {
        self.hash.unwrap_or_default()
    }

    /// Checks `flags` against the algorithm's capabilities.
    fn check_flags(&self, flags: &KeyFlags) -> Result<()> {
        let algo = self.algo()?;
        if flags.is_empty() {
            return Err(Error::InvalidArgument(
                "No key flags given".into()).into());
        }
        if ! flags.is_subset_of(&algo.capabilities()) {
            return Err(Error::PolicyViolation(format!(
                "{} keys cannot be used for {:?}", algo, flags)).into());
        }
        Ok(())
    }

    /// Generates a key.
    fn generate(&mut self) -> Result<Key> {
        use self::PublicKeyAlgorithm::*;
        tracer!("CryptoParams::generate");

        self.upgrade_hash();
        let algo = self.algo()?;
        t!("generating {} key ({:?} bits, {:?})", algo, self.bits, self.curve);

        let key = match algo {
            RSAEncryptSign => {
                let bits = self.bits.ok_or_else(|| Error::InvalidArgument(
                    "No RSA key size given".into()))?;
                Key::generate_rsa(bits)?
            },
            EdDSA | ECDSA | ECDH => {
                let curve = self.curve.clone().ok_or_else(
                    || Error::InvalidArgument(format!(
                        "No curve given for {} key", algo)))?;
                Key::generate_ecc(algo != ECDH, curve)?
            },
            a => return Err(Error::UnsupportedPublicKeyAlgorithm(a).into()),
        };

        if key.pk_algo() != algo {
            return Err(Error::InvalidArgument(format!(
                "{:?} cannot be used for {} keys", self.curve, algo)).into());
        }
        Ok(key)
    }
}

/// Algorithm preferences advertised in a self-certification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preferences {
    /// Preferred symmetric algorithms.
    pub symmetric: Vec<SymmetricAlgorithm>,
    /// Preferred hash algorithms.
    pub hash: Vec<HashAlgorithm>,
    /// Preferred compression algorithms.
    pub compression: Vec<CompressionAlgorithm>,
    /// Preferred key server.
    pub key_server: Option<String>,
}

impl Preferences {
    /// Fills in empty preference lists.
    pub fn merge_defaults(&mut self) {
        if self.symmetric.is_empty() {
            self.symmetric = vec![
                SymmetricAlgorithm::AES256,
                SymmetricAlgorithm::AES192,
                SymmetricAlgorithm::AES128,
                SymmetricAlgorithm::TripleDES,
            ];
        }
        if self.hash.is_empty() {
            self.hash = vec![
                HashAlgorithm::SHA256,
                HashAlgorithm::SHA384,
                HashAlgorithm::SHA512,
                HashAlgorithm::SHA224,
                HashAlgorithm::SHA1,
            ];
        }
        if self.compression.is_empty() {
            self.compression = vec![
                CompressionAlgorithm::Zlib,
                CompressionAlgorithm::BZip2,
                CompressionAlgorithm::Zip,
                CompressionAlgorithm::Uncompressed,
            ];
        }
    }
}

/// Parameters of a primary key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimaryKeyParams {
    /// Algorithm parameters.
    pub crypto: CryptoParams,
    /// The user ID.  Must not be empty.
    pub userid: String,
    /// Usage flags.  Defaults to the algorithm's capabilities.
    pub key_flags: Option<KeyFlags>,
    /// How long the key is valid.
    pub key_expiration: Option<Duration>,
    /// Preferences for the self-certification.
    pub prefs: Preferences,
}

impl PrimaryKeyParams {
    /// Fills in unset parameters.
    pub fn merge_defaults(&mut self) {
        self.crypto.merge_defaults();
        self.prefs.merge_defaults();
    }
}

/// Parameters of a subkey.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubkeyParams {
    /// Algorithm parameters.  The hash defaults to the primary key's.
    pub crypto: CryptoParams,
    /// Usage flags.  Defaults to the algorithm's capabilities.
    pub key_flags: Option<KeyFlags>,
    /// How long the subkey is valid.
    pub key_expiration: Option<Duration>,
}

impl SubkeyParams {
    /// Fills in unset parameters.
    pub fn merge_defaults(&mut self) {
        self.crypto.merge_defaults();
    }
}

/// The handles of a generated key pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratedKeys {
    /// The primary key in the public key store.
    pub primary_pub: KeyHandle,
    /// The primary key in the secret key store.
    pub primary_sec: KeyHandle,
    /// The subkey in the public key store.
    pub subkey_pub: KeyHandle,
    /// The subkey in the secret key store.
    pub subkey_sec: KeyHandle,
}

/// Generates keys into a public and a secret key store.
pub struct KeyGenerator<'a> {
    pubring: &'a mut KeyStore,
    secring: &'a mut KeyStore,
    password: Option<Password>,
    provider: Box<dyn PassphraseProvider + 'a>,
    attempts: Attempts,
}

impl<'a> KeyGenerator<'a> {
    /// Returns a generator for the given stores.
    ///
    /// Generated secret keys are not protected, and protected
    /// primary keys cannot be unlocked, unless configured otherwise.
    pub fn new(pubring: &'a mut KeyStore, secring: &'a mut KeyStore) -> Self {
        KeyGenerator {
            pubring,
            secring,
            password: None,
            provider: Box::new(NoPassphrase),
            attempts: Attempts::default(),
        }
    }

    /// Protects generated secret keys with `password`.
    ///
    /// The password is also tried first when a primary key needs to
    /// be unlocked to bind a subkey.
    pub fn protect_with<P: Into<Password>>(mut self, password: P) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the provider asked for the passphrase of a protected
    /// primary key.
    pub fn passphrase_provider<P>(mut self, provider: P) -> Self
        where P: PassphraseProvider + 'a
    {
        self.provider = Box::new(provider);
        self
    }

    /// Sets how often the provider is asked.
    pub fn attempts(mut self, attempts: Attempts) -> Self {
        self.attempts = attempts;
        self
    }

    /// Generates a primary key with a user ID and self-certification.
    ///
    /// Returns the handles of the public and the secret record.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the user ID or the usage
    /// flags are empty, and `Error::PolicyViolation` if the algorithm
    /// cannot certify or the flags exceed its capabilities.
    pub fn generate_primary(&mut self, mut params: PrimaryKeyParams)
                            -> Result<(KeyHandle, KeyHandle)> {
        tracer!("KeyGenerator::generate_primary");

        if params.userid.is_empty() {
            return Err(Error::InvalidArgument(
                "A primary key needs a user ID".into()).into());
        }
        let algo = params.crypto.algo()?;
        if ! algo.capabilities().for_certification() {
            return Err(Error::PolicyViolation(format!(
                "{} keys cannot certify", algo)).into());
        }
        let flags = params.key_flags.take()
            .unwrap_or_else(|| algo.capabilities());
        params.crypto.check_flags(&flags)?;

        let mut key = params.crypto.generate()?;
        let pk = key.without_secret();
        let uid = UserID::from(params.userid.as_str());
        t!("generated {} for {}", pk.keyid(), uid);

        let mut builder =
            SignatureBuilder::new(SignatureType::PositiveCertification)
            .set_hash_algo(params.crypto.hash_algo())
            .set_key_flags(flags)
            .set_key_expiration_time(params.key_expiration)
            .set_preferred_symmetric_algorithms(params.prefs.symmetric)
            .set_preferred_hash_algorithms(params.prefs.hash)
            .set_preferred_compression_algorithms(params.prefs.compression)
            .set_key_server_preferences(
                KeyServerPreferences::default().set_no_modify(true))
            .set_features(FEATURES)
            .set_primary_userid(true);
        if let Some(uri) = &params.prefs.key_server {
            builder = builder.set_preferred_key_server(uri);
        }
        let cert = {
            let mut signer = key.clone().into_keypair()?;
            builder.sign_userid_binding(&mut signer, &pk, &uid)?
        };

        let public = serialize(vec![
            Packet::PublicKey(pk.clone()), uid.clone().into(),
            cert.clone().into(),
        ])?;
        self.pubring.read_bytes(&public)?;
        let pub_handle = lookup(self.pubring, &pk)?;

        if let Some(password) = &self.password {
            key.encrypt_secret(password)?;
        }
        let secret = serialize(vec![
            Packet::SecretKey(key), uid.into(), cert.into(),
        ])?;
        self.secring.read_bytes(&secret)?;
        let sec_handle = lookup(self.secring, &pk)?;

        log::info!("Generated {} key {}", algo, pk.fingerprint());
        Ok((pub_handle, sec_handle))
    }

    /// Generates a subkey and binds it to `primary`, the handle of a
    /// primary key in the secret key store.
    ///
    /// The primary key is unlocked to make the binding signature.  A
    /// signing-capable subkey also gets a back signature.
    ///
    /// Returns the handles of the public and the secret record.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchKey` if the primary key is not in both
    /// stores, the errors of [`unlock_with`], and the same
    /// validation errors as [`KeyGenerator::generate_primary`].
    pub fn generate_subkey(&mut self, primary: KeyHandle,
                           mut params: SubkeyParams)
                           -> Result<(KeyHandle, KeyHandle)> {
        tracer!("KeyGenerator::generate_subkey");

        let (primary_key, primary_hash) = {
            let record = self.secring.key(primary)
                .filter(|k| k.is_primary())
                .ok_or_else(|| Error::NoSuchKey(format!(
                    "primary key {}", primary)))?;
            let hash = record.signatures().first()
                .map(|s| s.signature().hash_algo());
            (record.key().clone(), hash)
        };
        let pk = primary_key.without_secret();
        if self.pubring.get_by_fingerprint(&pk.fingerprint()).is_none() {
            return Err(Error::NoSuchKey(format!(
                "public key {}", pk.fingerprint())).into());
        }

        if params.crypto.hash.is_none() {
            params.crypto.hash = primary_hash;
        }
        let algo = params.crypto.algo()?;
        let flags = params.key_flags.take()
            .unwrap_or_else(|| algo.capabilities());
        params.crypto.check_flags(&flags)?;

        let mut signer = {
            let password = self.password.clone();
            let fallback = &mut self.provider;
            let mut provider = |ctx: &PassphraseContext| {
                match (&password, ctx.attempt()) {
                    (Some(p), 1) => Some(p.clone()),
                    _ => fallback.passphrase(ctx),
                }
            };
            unlock_with(&primary_key, Operation::AddSubkey, &mut provider,
                        self.attempts)?
                .into_keypair()?
        };

        let mut subkey = params.crypto.generate()?;
        let sk = subkey.without_secret();
        t!("generated {} for {}", sk.keyid(), pk.keyid());

        let hash = params.crypto.hash_algo();
        let mut builder = SignatureBuilder::new(SignatureType::SubkeyBinding)
            .set_hash_algo(hash)
            .set_key_flags(flags.clone())
            .set_key_expiration_time(params.key_expiration);
        if flags.for_signing() {
            let mut sub_signer = subkey.clone().into_keypair()?;
            let backsig =
                SignatureBuilder::new(SignatureType::PrimaryKeyBinding)
                .set_hash_algo(hash)
                .sign_primary_key_binding(&mut sub_signer, &pk, &sk)?;
            builder = builder.set_embedded_signature(backsig);
        }
        let binding = builder.sign_subkey_binding(&mut signer, &pk, &sk)?;

        // The primary key is already present, so reading this
        // attaches the subkey to it.
        let public = serialize(vec![
            Packet::PublicKey(pk.clone()), Packet::PublicSubkey(sk.clone()),
            binding.clone().into(),
        ])?;
        self.pubring.read_bytes(&public)?;
        let pub_handle = lookup(self.pubring, &sk)?;

        if let Some(password) = &self.password {
            subkey.encrypt_secret(password)?;
        }
        let secret = serialize(vec![
            Packet::PublicKey(pk.clone()), Packet::SecretSubkey(subkey),
            binding.into(),
        ])?;
        self.secring.read_bytes(&secret)?;
        let sec_handle = lookup(self.secring, &sk)?;

        log::info!("Generated {} subkey {} for {}",
                   algo, sk.fingerprint(), pk.fingerprint());
        Ok((pub_handle, sec_handle))
    }

    /// Generates a primary key and one subkey.
    ///
    /// If `merge_defaults` is set, unset parameters are filled in.
    /// If neither set of usage flags is given, the primary key is
    /// made for signing and certification and the subkey for
    /// encryption.
    pub fn generate_keypair(&mut self, mut primary: PrimaryKeyParams,
                            mut subkey: SubkeyParams, merge_defaults: bool)
                            -> Result<GeneratedKeys> {
        if merge_defaults {
            primary.merge_defaults();
            if subkey.crypto.hash.is_none() {
                subkey.crypto.hash = primary.crypto.hash;
            }
            subkey.merge_defaults();
        }
        if primary.key_flags.is_none() && subkey.key_flags.is_none() {
            primary.key_flags = Some(KeyFlags::sign_and_certify());
            subkey.key_flags = Some(KeyFlags::encrypt());
        }

        let (primary_pub, primary_sec) = self.generate_primary(primary)?;
        let (subkey_pub, subkey_sec) =
            self.generate_subkey(primary_sec, subkey)?;
        Ok(GeneratedKeys { primary_pub, primary_sec, subkey_pub, subkey_sec })
    }
}

fn serialize(packets: Vec<Packet>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for p in packets {
        p.serialize(&mut buf)?;
    }
    Ok(buf)
}

fn lookup(store: &KeyStore, key: &Key) -> Result<KeyHandle> {
    store.get_by_fingerprint(&key.fingerprint())
        .map(|k| k.handle())
        .ok_or_else(|| Error::InvalidOperation(format!(
            "{} was not read back", key.fingerprint())).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::provider::FixedPassphrase;
    use crate::types::Timestamp;
    use crate::verify::validate_key;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ecc_params(userid: &str) -> (PrimaryKeyParams, SubkeyParams) {
        let mut primary = PrimaryKeyParams::default();
        primary.userid = userid.into();
        primary.crypto.algo = Some(PublicKeyAlgorithm::EdDSA);
        let mut subkey = SubkeyParams::default();
        subkey.crypto.algo = Some(PublicKeyAlgorithm::ECDH);
        (primary, subkey)
    }

    #[test]
    fn defaults() {
        let mut p = PrimaryKeyParams::default();
        p.merge_defaults();
        assert_eq!(p.crypto.algo, Some(PublicKeyAlgorithm::RSAEncryptSign));
        assert_eq!(p.crypto.bits, Some(2048));
        assert_eq!(p.crypto.curve, None);
        assert_eq!(p.crypto.hash, Some(HashAlgorithm::SHA256));
        assert_eq!(p.prefs.symmetric[0], SymmetricAlgorithm::AES256);
        assert_eq!(p.prefs.hash.len(), 5);
        assert_eq!(p.prefs.compression.last(),
                   Some(&CompressionAlgorithm::Uncompressed));
        assert_eq!(p.prefs.key_server, None);

        let mut c = CryptoParams {
            algo: Some(PublicKeyAlgorithm::EdDSA),
            ..Default::default()
        };
        c.merge_defaults();
        assert_eq!(c.curve, Some(Curve::Ed25519));
        assert_eq!(c.bits, None);

        // Explicit settings are kept.
        let mut prefs = Preferences {
            symmetric: vec![SymmetricAlgorithm::AES128],
            ..Default::default()
        };
        prefs.merge_defaults();
        assert_eq!(prefs.symmetric, vec![SymmetricAlgorithm::AES128]);
    }

    #[test]
    fn hash_upgrade() {
        for (curve, hash, expected) in vec![
            (Curve::NistP256, HashAlgorithm::SHA1, HashAlgorithm::SHA256),
            (Curve::NistP256, HashAlgorithm::SHA512, HashAlgorithm::SHA512),
            (Curve::NistP384, HashAlgorithm::SHA256, HashAlgorithm::SHA384),
            (Curve::NistP521, HashAlgorithm::SHA256, HashAlgorithm::SHA512),
            (Curve::NistP521, HashAlgorithm::SHA384, HashAlgorithm::SHA512),
            (Curve::Ed25519, HashAlgorithm::SHA1, HashAlgorithm::SHA1),
        ] {
            let mut c = CryptoParams {
                algo: Some(PublicKeyAlgorithm::ECDSA),
                curve: Some(curve.clone()),
                hash: Some(hash),
                ..Default::default()
            };
            c.merge_defaults();
            assert_eq!(c.hash, Some(expected), "{:?} {}", curve, hash);
        }
    }

    #[test]
    fn validation() {
        let mut pubring = KeyStore::new();
        let mut secring = KeyStore::new();
        let mut gen = KeyGenerator::new(&mut pubring, &mut secring);

        let (mut primary, _) = ecc_params("");
        primary.merge_defaults();
        let e = gen.generate_primary(primary).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::InvalidArgument(_))));

        let (mut primary, _) = ecc_params("Rosalind <rosalind@example.org>");
        primary.crypto.algo = Some(PublicKeyAlgorithm::ECDH);
        primary.merge_defaults();
        let e = gen.generate_primary(primary).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::PolicyViolation(_))));

        let (mut primary, _) = ecc_params("Rosalind <rosalind@example.org>");
        primary.key_flags = Some(KeyFlags::encrypt());
        primary.merge_defaults();
        let e = gen.generate_primary(primary).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::PolicyViolation(_))));

        let (mut primary, _) = ecc_params("Rosalind <rosalind@example.org>");
        primary.key_flags = Some(KeyFlags::empty());
        primary.merge_defaults();
        let e = gen.generate_primary(primary).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::InvalidArgument(_))));

        // Without defaults there is no algorithm.
        let mut primary = PrimaryKeyParams::default();
        primary.userid = "Rosalind <rosalind@example.org>".into();
        let e = gen.generate_keypair(primary, SubkeyParams::default(), false)
            .unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::InvalidArgument(_))));

        // An ECDSA key over Ed25519 would be an EdDSA key.
        let (mut primary, _) = ecc_params("Rosalind <rosalind@example.org>");
        primary.crypto.algo = Some(PublicKeyAlgorithm::ECDSA);
        primary.crypto.curve = Some(Curve::Ed25519);
        primary.merge_defaults();
        assert!(gen.generate_primary(primary).is_err());

        drop(gen);
        assert!(pubring.is_empty());
        assert!(secring.is_empty());
    }

    #[test]
    fn keypair() {
        init();
        let mut pubring = KeyStore::new();
        let mut secring = KeyStore::new();
        let (mut primary, subkey) = ecc_params("Orlando <orlando@example.org>");
        primary.prefs.key_server = Some("hkps://keys.example.org".into());
        primary.key_expiration = Some(Duration::days(730).unwrap());

        let keys = KeyGenerator::new(&mut pubring, &mut secring)
            .generate_keypair(primary, subkey, true)
            .unwrap();
        assert_eq!(pubring.len(), 2);
        assert_eq!(secring.len(), 2);

        let p = pubring.key(keys.primary_pub).unwrap();
        let s = pubring.key(keys.subkey_pub).unwrap();
        assert!(! p.is_secret());
        assert!(! p.key().has_secret());
        assert_eq!(p.subkeys(), &[keys.subkey_pub]);
        assert_eq!(s.primary(), Some(keys.primary_pub));
        assert_ne!(p.keyid(), s.keyid());
        assert_eq!(p.key().pk_algo(), PublicKeyAlgorithm::EdDSA);
        assert_eq!(s.key().pk_algo(), PublicKeyAlgorithm::ECDH);
        assert_eq!(p.key_flags(), Some(&KeyFlags::sign_and_certify()));
        assert_eq!(s.key_flags(), Some(&KeyFlags::encrypt()));
        assert_eq!(p.key_expiration(), Some(Duration::days(730).unwrap()));
        assert_eq!(p.userids().next().unwrap().value(),
                   b"Orlando <orlando@example.org>");

        let cert = p.signatures()[0].signature();
        assert_eq!(cert.typ(), SignatureType::PositiveCertification);
        assert_eq!(cert.primary_userid(), Some(true));
        assert_eq!(cert.preferred_symmetric_algorithms().unwrap()[0],
                   SymmetricAlgorithm::AES256);
        assert!(cert.key_server_preferences().unwrap().no_modify());
        assert_eq!(cert.preferred_key_server(),
                   Some(&b"hkps://keys.example.org"[..]));
        assert_eq!(cert.features(), Some(FEATURES));

        let sp = secring.key(keys.primary_sec).unwrap();
        let ss = secring.key(keys.subkey_sec).unwrap();
        assert!(sp.is_secret());
        assert!(sp.key().has_unencrypted_secret());
        assert!(ss.key().has_unencrypted_secret());
        assert_eq!(sp.fingerprint(), p.fingerprint());
        assert_eq!(ss.fingerprint(), s.fingerprint());
        assert_eq!(sp.subkeys(), &[keys.subkey_sec]);

        for h in &[keys.primary_pub, keys.subkey_pub] {
            let result = validate_key(&pubring, *h).unwrap();
            assert_eq!(result.valid().len(), 1);
            result.status(Timestamp::now()).unwrap();
        }
        for h in &[keys.primary_sec, keys.subkey_sec] {
            validate_key(&secring, *h).unwrap()
                .status(Timestamp::now()).unwrap();
        }
    }

    #[test]
    fn signing_subkey() {
        let mut pubring = KeyStore::new();
        let mut secring = KeyStore::new();
        let (primary, mut subkey) = ecc_params("Celia <celia@example.org>");
        subkey.crypto.algo = Some(PublicKeyAlgorithm::ECDSA);
        subkey.key_flags = Some(KeyFlags::empty().set_signing(true));

        let keys = KeyGenerator::new(&mut pubring, &mut secring)
            .generate_keypair(primary, subkey, true)
            .unwrap();

        // The primary flags fall back to the algorithm's capabilities.
        let p = pubring.key(keys.primary_pub).unwrap();
        assert_eq!(p.key_flags(),
                   Some(&PublicKeyAlgorithm::EdDSA.capabilities()));

        let s = pubring.key(keys.subkey_pub).unwrap();
        let binding = s.signatures()[0].signature();
        assert!(binding.embedded_signature().is_some());
        assert_eq!(binding.hash_algo(), HashAlgorithm::SHA256);
        validate_key(&pubring, keys.subkey_pub).unwrap()
            .status(Timestamp::now()).unwrap();
    }

    #[test]
    fn protected() {
        init();
        let mut pubring = KeyStore::new();
        let mut secring = KeyStore::new();
        let (primary, subkey) = ecc_params("Jaques <jaques@example.org>");

        let keys = KeyGenerator::new(&mut pubring, &mut secring)
            .protect_with("all the world's a stage")
            .generate_keypair(primary, subkey.clone(), true)
            .unwrap();
        for h in &[keys.primary_sec, keys.subkey_sec] {
            let k = secring.key(*h).unwrap().key();
            assert!(k.has_secret());
            assert!(! k.has_unencrypted_secret());
        }

        // Another subkey, without the password.
        let mut subkey = subkey;
        subkey.merge_defaults();
        let e = KeyGenerator::new(&mut pubring, &mut secring)
            .generate_subkey(keys.primary_sec, subkey.clone())
            .unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::MissingPassphrase));

        let mut asked = 0;
        let (_, sec) = KeyGenerator::new(&mut pubring, &mut secring)
            .passphrase_provider(|ctx: &PassphraseContext| {
                assert_eq!(ctx.operation(), Operation::AddSubkey);
                asked += 1;
                Some("all the world's a stage".into())
            })
            .generate_subkey(keys.primary_sec, subkey.clone())
            .unwrap();
        assert_eq!(asked, 1);
        // Not protected this time.
        assert!(secring.key(sec).unwrap().key().has_unencrypted_secret());
        assert_eq!(secring.key(keys.primary_sec).unwrap().subkeys().len(), 2);
        assert_eq!(pubring.key(keys.primary_pub).unwrap().subkeys().len(), 2);

        let e = KeyGenerator::new(&mut pubring, &mut secring)
            .passphrase_provider(FixedPassphrase::new("to be or not to be"))
            .attempts(Attempts::Limited(2))
            .generate_subkey(keys.primary_sec, subkey)
            .unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::BadPassphrase));
    }

    #[test]
    fn unknown_primary() {
        let mut pubring = KeyStore::new();
        let mut secring = KeyStore::new();
        let (primary, subkey) = ecc_params("Touchstone <touchstone@example.org>");
        let keys = KeyGenerator::new(&mut pubring, &mut secring)
            .generate_keypair(primary, subkey.clone(), true)
            .unwrap();

        // Subkeys cannot have subkeys.
        let e = KeyGenerator::new(&mut pubring, &mut secring)
            .generate_subkey(keys.subkey_sec, subkey.clone())
            .unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(), Some(Error::NoSuchKey(_))));

        // The secret primary is there, but not the public one.
        let mut empty = KeyStore::new();
        let e = KeyGenerator::new(&mut empty, &mut secring)
            .generate_subkey(keys.primary_sec, subkey)
            .unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(), Some(Error::NoSuchKey(_))));
        assert_eq!(secring.len(), 2);
    }
}
