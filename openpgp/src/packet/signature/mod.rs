//! Types for signatures.
//!
//! A [`Signature`] is immutable once built: the fixed fields and the
//! hashed subpacket area are covered by the cryptographic signature,
//! so only the unhashed area may be edited.  New signatures are made
//! with a [`SignatureBuilder`].

use std::fmt;
use std::ops::Deref;

use crate::Error;
use crate::Result;
use crate::crypto::{
    mpi,
    Signer,
};
use crate::crypto::backend::asymmetric as backend;
use crate::packet::{
    Key,
    UserAttribute,
    UserID,
};
use crate::types::{
    CompressionAlgorithm,
    Duration,
    HashAlgorithm,
    KeyFlags,
    KeyServerPreferences,
    PublicKeyAlgorithm,
    ReasonForRevocation,
    SignatureType,
    SymmetricAlgorithm,
    Timestamp,
};
use crate::Fingerprint;
use crate::KeyID;

pub mod subpacket;
use self::subpacket::{
    Subpacket,
    SubpacketArea,
    SubpacketValue,
};

/// The fields of a version 3 signature that version 4 signatures
/// store in subpackets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct V3Info {
    creation_time: Timestamp,
    issuer: KeyID,
}

impl V3Info {
    pub(crate) fn new(creation_time: Timestamp, issuer: KeyID) -> Self {
        V3Info { creation_time, issuer }
    }

    /// Returns the signature's creation time.
    pub fn creation_time(&self) -> Timestamp {
        self.creation_time
    }

    /// Returns the issuer's key ID.
    pub fn issuer(&self) -> &KeyID {
        &self.issuer
    }
}

/// The hashed part of a signature.
///
/// This is what the signature's trailer is computed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureFields {
    /// Version of the signature packet.  Must be 3 or 4.
    version: u8,
    /// Type of signature.
    typ: SignatureType,
    /// Public-key algorithm used for this signature.
    pk_algo: PublicKeyAlgorithm,
    /// Hash algorithm used to compute the signature.
    hash_algo: HashAlgorithm,
    /// Subpackets that are part of the signature.
    hashed_area: SubpacketArea,
    /// Version 3 only fields.
    v3: Option<V3Info>,
}

impl SignatureFields {
    /// Creates the fields of a version 4 signature.
    pub(crate) fn new_v4(typ: SignatureType, pk_algo: PublicKeyAlgorithm,
                         hash_algo: HashAlgorithm, hashed_area: SubpacketArea)
                         -> Self {
        SignatureFields {
            version: 4,
            typ,
            pk_algo,
            hash_algo,
            hashed_area,
            v3: None,
        }
    }

    /// Creates the fields of a version 3 signature.
    pub(crate) fn new_v3(typ: SignatureType, pk_algo: PublicKeyAlgorithm,
                         hash_algo: HashAlgorithm, info: V3Info)
                         -> Self {
        SignatureFields {
            version: 3,
            typ,
            pk_algo,
            hash_algo,
            hashed_area: SubpacketArea::empty(),
            v3: Some(info),
        }
    }

    /// Gets the version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Gets a reference to the hashed area.
    pub fn hashed_area(&self) -> &SubpacketArea {
        &self.hashed_area
    }

    /// Gets the version 3 fields, if this is a version 3 signature.
    pub fn v3(&self) -> Option<&V3Info> {
        self.v3.as_ref()
    }
}

/// Holds a signature packet.
///
/// Signature packets are used both for certification purposes as well
/// as for document signing purposes.
///
/// See [Section 5.2 of RFC 4880] for details.
///
///   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    /// Fields covered by the signature.
    fields: SignatureFields,
    /// Subpackets _not_ covered by the signature.
    unhashed_area: SubpacketArea,
    /// Lower 16 bits of the signed hash value.
    digest_prefix: [u8; 2],
    /// Signature MPIs.
    mpis: mpi::Signature,
}

impl Deref for Signature {
    type Target = SignatureFields;

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signature")
            .field("version", &self.version())
            .field("typ", &self.typ())
            .field("pk_algo", &self.pk_algo())
            .field("hash_algo", &self.hash_algo())
            .field("issuer", &self.issuer())
            .field("hashed_area", self.hashed_area())
            .field("unhashed_area", &self.unhashed_area)
            .field("digest_prefix",
                   &crate::conversions::to_hex(&self.digest_prefix, false))
            .field("mpis", &self.mpis)
            .finish()
    }
}

impl Signature {
    /// Assembles a signature from its parts.
    pub(crate) fn from_parts(fields: SignatureFields,
                             unhashed_area: SubpacketArea,
                             digest_prefix: [u8; 2],
                             mpis: mpi::Signature)
                             -> Self {
        Signature {
            fields,
            unhashed_area,
            digest_prefix,
            mpis,
        }
    }

    /// Returns the hashed fields.
    pub fn fields(&self) -> &SignatureFields {
        &self.fields
    }

    /// Gets a reference to the unhashed area.
    pub fn unhashed_area(&self) -> &SubpacketArea {
        &self.unhashed_area
    }

    /// Gets a mutable reference to the unhashed area.
    pub fn unhashed_area_mut(&mut self) -> &mut SubpacketArea {
        &mut self.unhashed_area
    }

    /// Gets the hash prefix.
    pub fn digest_prefix(&self) -> &[u8; 2] {
        &self.digest_prefix
    }

    /// Gets the signature packet's MPIs.
    pub fn mpis(&self) -> &mpi::Signature {
        &self.mpis
    }

    /// Returns the time the signature was made.
    ///
    /// Only the hashed area is consulted for version 4 signatures.
    pub fn signature_creation_time(&self) -> Option<Timestamp> {
        match self.v3() {
            Some(v3) => Some(v3.creation_time()),
            None => self.hashed_area().signature_creation_time(),
        }
    }

    /// Returns the signature's validity period, if it expires.
    pub fn signature_expiration_time(&self) -> Option<Duration> {
        self.hashed_area().signature_expiration_time()
    }

    /// Returns the key's validity period, if it expires.
    pub fn key_expiration_time(&self) -> Option<Duration> {
        self.hashed_area().key_expiration_time()
    }

    /// Returns the key flags.
    pub fn key_flags(&self) -> Option<&KeyFlags> {
        self.hashed_area().key_flags()
    }

    /// Returns the value of the Primary UserID subpacket.
    pub fn primary_userid(&self) -> Option<bool> {
        self.hashed_area().primary_userid()
    }

    /// Returns the reason for revocation and its human-readable
    /// explanation.
    pub fn reason_for_revocation(&self)
                                 -> Option<(ReasonForRevocation, &[u8])> {
        self.hashed_area().reason_for_revocation()
    }

    /// Returns the trust level and amount of a trust signature.
    pub fn trust_signature(&self) -> Option<(u8, u8)> {
        self.hashed_area().trust_signature()
    }

    /// Returns the preferred symmetric algorithms.
    pub fn preferred_symmetric_algorithms(&self)
                                          -> Option<&[SymmetricAlgorithm]> {
        self.hashed_area().preferred_symmetric_algorithms()
    }

    /// Returns the preferred hash algorithms.
    pub fn preferred_hash_algorithms(&self) -> Option<&[HashAlgorithm]> {
        self.hashed_area().preferred_hash_algorithms()
    }

    /// Returns the preferred compression algorithms.
    pub fn preferred_compression_algorithms(&self)
                                            -> Option<&[CompressionAlgorithm]>
    {
        self.hashed_area().preferred_compression_algorithms()
    }

    /// Returns the key server preferences.
    pub fn key_server_preferences(&self) -> Option<&KeyServerPreferences> {
        self.hashed_area().key_server_preferences()
    }

    /// Returns the preferred key server.
    pub fn preferred_key_server(&self) -> Option<&[u8]> {
        self.hashed_area().preferred_key_server()
    }

    /// Returns the features.
    pub fn features(&self) -> Option<&[u8]> {
        self.hashed_area().features()
    }

    /// Returns the embedded signature.
    ///
    /// Embedded signatures carry their own signature, so they are
    /// also looked up in the unhashed area.
    pub fn embedded_signature(&self) -> Option<&Signature> {
        self.hashed_area().embedded_signature()
            .or_else(|| self.unhashed_area.embedded_signature())
    }

    /// Returns the issuer's fingerprint, if recorded.
    pub fn issuer_fingerprint(&self) -> Option<&Fingerprint> {
        self.hashed_area().issuer_fingerprint()
            .or_else(|| self.unhashed_area.issuer_fingerprint())
    }

    /// Returns the key ID of the key that made the signature.
    ///
    /// This consults, in order, the version 3 fields, the Issuer
    /// subpacket in the hashed and then the unhashed area, and
    /// finally the Issuer Fingerprint subpacket.
    pub fn issuer(&self) -> Option<KeyID> {
        if let Some(v3) = self.v3() {
            return Some(*v3.issuer());
        }
        self.hashed_area().issuer()
            .or_else(|| self.unhashed_area.issuer())
            .cloned()
            .or_else(|| self.issuer_fingerprint().and_then(|fp| fp.to_keyid()))
    }

    /// Checks that the signature is live at `time`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotYetLive` if the signature was created after
    /// `time`, `Error::Expired` if its validity period ended at or
    /// before `time`, and `Error::MalformedPacket` if it has no
    /// creation time.
    pub fn signature_alive(&self, time: Timestamp) -> Result<()> {
        let ctime = self.signature_creation_time()
            .ok_or_else(|| Error::MalformedPacket(
                "Signature has no creation time".into()))?;
        if ctime > time {
            return Err(Error::NotYetLive(ctime.into()).into());
        }
        if let Some(validity) = self.signature_expiration_time() {
            let end = ctime.checked_add(validity)
                .unwrap_or_else(|| Timestamp::from(u32::MAX));
            if end <= time {
                return Err(Error::Expired(end.into()).into());
            }
        }
        Ok(())
    }

    /// Verifies the signature against `digest`.
    ///
    /// Returns `Ok(false)` if the digest prefix does not match or the
    /// cryptographic check fails.
    ///
    /// # Errors
    ///
    /// Fails if the signature version is not supported, if the
    /// public key algorithm of `key` does not match the signature's,
    /// or if `key` has no usable public key material.
    pub fn verify_digest(&self, key: &Key, digest: &[u8]) -> Result<bool> {
        tracer!("Signature::verify_digest");

        if self.version() != 3 && self.version() != 4 {
            return Err(Error::UnsupportedSignatureVersion(self.version())
                       .into());
        }
        if ! algos_compatible(self.pk_algo(), key.pk_algo()) {
            return Err(Error::InvalidArgument(format!(
                "{} signature cannot be verified using a {} key",
                self.pk_algo(), key.pk_algo())).into());
        }
        if key.mpis().algo().is_none() {
            return Err(Error::InvalidKey(format!(
                "{} has no usable public key material", key.keyid()))
                       .into());
        }

        if digest.len() < 2 || digest[..2] != self.digest_prefix[..] {
            t!("digest prefix mismatch for {}", key.keyid());
            return Ok(false);
        }

        backend::verify(key.mpis(), &self.mpis, self.hash_algo(), digest)
    }

    /// Verifies a document signature over `msg`.
    ///
    /// `self` must be a binary or text signature; text documents are
    /// hashed with normalized line endings.
    pub fn verify_message(&self, signer: &Key, msg: &[u8]) -> Result<bool> {
        match self.typ() {
            SignatureType::Binary | SignatureType::Text => (),
            t => return Err(Error::UnsupportedSignatureType(t).into()),
        }
        let digest = self.hash_document(msg)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the user id binding.
    ///
    /// `self` is the user id binding signature, `signer` is the key
    /// that allegedly made the signature, `pk` is the primary key,
    /// and `userid` is the user id.
    ///
    /// For a self-signature, `signer` and `pk` will be the same.
    pub fn verify_userid_binding(&self, signer: &Key, pk: &Key,
                                 userid: &UserID)
                                 -> Result<bool> {
        if ! self.typ().is_certification() {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }
        let digest = self.hash_userid_binding(pk, userid)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the user id revocation certificate.
    ///
    /// `self` is the revocation certificate, `signer` is the key
    /// that allegedly made the signature, `pk` is the primary key,
    /// and `userid` is the user id.
    pub fn verify_userid_revocation(&self, signer: &Key, pk: &Key,
                                    userid: &UserID)
                                    -> Result<bool> {
        if self.typ() != SignatureType::CertificationRevocation {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }
        let digest = self.hash_userid_binding(pk, userid)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the user attribute binding.
    pub fn verify_user_attribute_binding(&self, signer: &Key, pk: &Key,
                                         ua: &UserAttribute)
                                         -> Result<bool> {
        if ! self.typ().is_certification() {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }
        let digest = self.hash_user_attribute_binding(pk, ua)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the user attribute revocation certificate.
    pub fn verify_user_attribute_revocation(&self, signer: &Key, pk: &Key,
                                            ua: &UserAttribute)
                                            -> Result<bool> {
        if self.typ() != SignatureType::CertificationRevocation {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }
        let digest = self.hash_user_attribute_binding(pk, ua)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies a direct key signature.
    ///
    /// For a self-signature, `signer` and `pk` will be the same.
    pub fn verify_direct_key(&self, signer: &Key, pk: &Key) -> Result<bool> {
        if self.typ() != SignatureType::DirectKey {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }
        let digest = self.hash_direct_key(pk)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the primary key revocation certificate.
    pub fn verify_key_revocation(&self, signer: &Key, pk: &Key)
                                 -> Result<bool> {
        if self.typ() != SignatureType::KeyRevocation {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }
        let digest = self.hash_direct_key(pk)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the primary key binding ("back signature").
    ///
    /// `self` is the primary key binding signature, made by `subkey`
    /// over `pk` and `subkey`.
    pub fn verify_primary_key_binding(&self, pk: &Key, subkey: &Key)
                                      -> Result<bool> {
        if self.typ() != SignatureType::PrimaryKeyBinding {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }
        let digest = self.hash_primary_key_binding(pk, subkey)?;
        self.verify_digest(subkey, &digest)
    }

    /// Verifies the subkey binding.
    ///
    /// `self` is the subkey key binding signature, `signer` is the
    /// key that allegedly made the signature, `pk` is the primary
    /// key, and `subkey` is the subkey.
    ///
    /// For a self-signature, `signer` and `pk` will be the same.
    ///
    /// If the signature indicates that this is a `Signing` capable
    /// subkey, then the back signature is also verified.  If it is
    /// missing or can't be verified, then this function returns
    /// false.
    pub fn verify_subkey_binding(&self, signer: &Key, pk: &Key, subkey: &Key)
                                 -> Result<bool> {
        tracer!("Signature::verify_subkey_binding");

        if self.typ() != SignatureType::SubkeyBinding {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest = self.hash_subkey_binding(pk, subkey)?;
        if ! self.verify_digest(signer, &digest)? {
            return Ok(false);
        }

        if ! self.key_flags().map(|f| f.for_signing()).unwrap_or(false) {
            // No backsig required.
            return Ok(true);
        }

        let backsig = match self.embedded_signature() {
            Some(backsig) => backsig,
            None => {
                t!("{} / {}: missing backsig", pk.keyid(), subkey.keyid());
                return Ok(false);
            },
        };

        match backsig.verify_primary_key_binding(pk, subkey) {
            Ok(true) => Ok(true),
            Ok(false) => {
                t!("{} / {}: backsig is bad", pk.keyid(), subkey.keyid());
                Ok(false)
            },
            Err(err) => {
                log::warn!("{} / {}: error validating backsig: {}",
                           pk.keyid(), subkey.keyid(), err);
                Ok(false)
            },
        }
    }

    /// Verifies the subkey revocation.
    ///
    /// `self` is the subkey key revocation certificate, `signer` is
    /// the key that allegedly made the signature, `pk` is the primary
    /// key, and `subkey` is the subkey.
    pub fn verify_subkey_revocation(&self, signer: &Key, pk: &Key,
                                    subkey: &Key)
                                    -> Result<bool> {
        if self.typ() != SignatureType::SubkeyRevocation {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }
        let digest = self.hash_subkey_binding(pk, subkey)?;
        self.verify_digest(signer, &digest)
    }
}

/// Returns whether a signature made with `sig` can be checked with a
/// key of type `key`.
fn algos_compatible(sig: PublicKeyAlgorithm, key: PublicKeyAlgorithm) -> bool {
    use self::PublicKeyAlgorithm::*;
    match (sig, key) {
        (RSAEncryptSign, RSAEncryptSign) | (RSAEncryptSign, RSASign)
            | (RSASign, RSAEncryptSign) | (RSASign, RSASign) => true,
        (a, b) => a == b,
    }
}

/// Builds a signature packet.
///
/// Hashed subpackets are emitted in a fixed order when the signature
/// is made: creation time, signature expiration, key expiration, key
/// flags, preferred symmetric, hash and compression algorithms, key
/// server preferences, preferred key server, primary user ID flag,
/// features, reason for revocation, embedded signature, and the
/// issuer fingerprint.  The issuer's key ID goes in the unhashed
/// area.
#[derive(Clone, Debug)]
pub struct SignatureBuilder {
    typ: SignatureType,
    hash_algo: HashAlgorithm,
    creation_time: Option<Timestamp>,
    signature_expiration: Option<Duration>,
    key_expiration: Option<Duration>,
    key_flags: Option<KeyFlags>,
    preferred_symmetric: Option<Vec<SymmetricAlgorithm>>,
    preferred_hash: Option<Vec<HashAlgorithm>>,
    preferred_compression: Option<Vec<CompressionAlgorithm>>,
    key_server_preferences: Option<KeyServerPreferences>,
    preferred_key_server: Option<Vec<u8>>,
    primary_userid: Option<bool>,
    features: Option<Vec<u8>>,
    reason_for_revocation: Option<(ReasonForRevocation, Vec<u8>)>,
    embedded_signature: Option<Signature>,
}

impl SignatureBuilder {
    /// Returns a new `SignatureBuilder` for a signature of type `typ`.
    ///
    /// The hash algorithm defaults to SHA-256 and the creation time
    /// to the time the signature is made.
    pub fn new(typ: SignatureType) -> Self {
        SignatureBuilder {
            typ,
            hash_algo: HashAlgorithm::SHA256,
            creation_time: None,
            signature_expiration: None,
            key_expiration: None,
            key_flags: None,
            preferred_symmetric: None,
            preferred_hash: None,
            preferred_compression: None,
            key_server_preferences: None,
            preferred_key_server: None,
            primary_userid: None,
            features: None,
            reason_for_revocation: None,
            embedded_signature: None,
        }
    }

    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Sets the hash algorithm.
    pub fn set_hash_algo(mut self, algo: HashAlgorithm) -> Self {
        self.hash_algo = algo;
        self
    }

    /// Sets the signature creation time.
    pub fn set_signature_creation_time(mut self, t: Timestamp) -> Self {
        self.creation_time = Some(t);
        self
    }

    /// Sets the signature's validity period.
    pub fn set_signature_expiration_time(mut self, d: Option<Duration>)
                                         -> Self {
        self.signature_expiration = d;
        self
    }

    /// Sets the key's validity period.
    pub fn set_key_expiration_time(mut self, d: Option<Duration>) -> Self {
        self.key_expiration = d;
        self
    }

    /// Sets the key flags.
    pub fn set_key_flags(mut self, flags: KeyFlags) -> Self {
        self.key_flags = Some(flags);
        self
    }

    /// Sets the preferred symmetric algorithms.
    pub fn set_preferred_symmetric_algorithms(
        mut self, algos: Vec<SymmetricAlgorithm>) -> Self {
        self.preferred_symmetric = Some(algos);
        self
    }

    /// Sets the preferred hash algorithms.
    pub fn set_preferred_hash_algorithms(mut self, algos: Vec<HashAlgorithm>)
                                         -> Self {
        self.preferred_hash = Some(algos);
        self
    }

    /// Sets the preferred compression algorithms.
    pub fn set_preferred_compression_algorithms(
        mut self, algos: Vec<CompressionAlgorithm>) -> Self {
        self.preferred_compression = Some(algos);
        self
    }

    /// Sets the key server preferences.
    pub fn set_key_server_preferences(mut self, prefs: KeyServerPreferences)
                                      -> Self {
        self.key_server_preferences = Some(prefs);
        self
    }

    /// Sets the preferred key server.
    pub fn set_preferred_key_server<U: AsRef<[u8]>>(mut self, uri: U) -> Self {
        self.preferred_key_server = Some(uri.as_ref().to_vec());
        self
    }

    /// Sets the primary user ID flag.
    pub fn set_primary_userid(mut self, primary: bool) -> Self {
        self.primary_userid = Some(primary);
        self
    }

    /// Sets the features.
    pub fn set_features<F: AsRef<[u8]>>(mut self, features: F) -> Self {
        self.features = Some(features.as_ref().to_vec());
        self
    }

    /// Sets the reason for revocation.
    pub fn set_reason_for_revocation<R: AsRef<[u8]>>(
        mut self, code: ReasonForRevocation, reason: R) -> Self {
        self.reason_for_revocation = Some((code, reason.as_ref().to_vec()));
        self
    }

    /// Sets the embedded signature.
    pub fn set_embedded_signature(mut self, sig: Signature) -> Self {
        self.embedded_signature = Some(sig);
        self
    }

    /// Signs the binding between `userid` and `key` using `signer`.
    pub fn sign_userid_binding(self, signer: &mut dyn Signer,
                               key: &Key, userid: &UserID)
                               -> Result<Signature> {
        self.check_typ(|t| t.is_certification())?;
        self.sign(signer, |f| f.hash_userid_binding(key, userid))
    }

    /// Signs the binding between `ua` and `key` using `signer`.
    pub fn sign_user_attribute_binding(self, signer: &mut dyn Signer,
                                       key: &Key, ua: &UserAttribute)
                                       -> Result<Signature> {
        self.check_typ(|t| t.is_certification())?;
        self.sign(signer, |f| f.hash_user_attribute_binding(key, ua))
    }

    /// Signs the binding from `primary` to `subkey` using `signer`.
    pub fn sign_subkey_binding(self, signer: &mut dyn Signer,
                               primary: &Key, subkey: &Key)
                               -> Result<Signature> {
        self.check_typ(|t| t == SignatureType::SubkeyBinding)?;
        self.sign(signer, |f| f.hash_subkey_binding(primary, subkey))
    }

    /// Makes the back signature of a signing-capable subkey.
    ///
    /// `subkey_signer` must hold the subkey's secret.
    pub fn sign_primary_key_binding(self, subkey_signer: &mut dyn Signer,
                                    primary: &Key, subkey: &Key)
                                    -> Result<Signature> {
        self.check_typ(|t| t == SignatureType::PrimaryKeyBinding)?;
        self.sign(subkey_signer,
                  |f| f.hash_primary_key_binding(primary, subkey))
    }

    /// Signs `key` directly.
    pub fn sign_direct_key(self, signer: &mut dyn Signer, key: &Key)
                           -> Result<Signature> {
        self.check_typ(|t| t == SignatureType::DirectKey)?;
        self.sign(signer, |f| f.hash_direct_key(key))
    }

    /// Revokes `key`.
    pub fn sign_key_revocation(self, signer: &mut dyn Signer, key: &Key)
                               -> Result<Signature> {
        self.check_typ(|t| t == SignatureType::KeyRevocation)?;
        self.sign(signer, |f| f.hash_direct_key(key))
    }

    /// Revokes the binding between `primary` and `subkey`.
    pub fn sign_subkey_revocation(self, signer: &mut dyn Signer,
                                  primary: &Key, subkey: &Key)
                                  -> Result<Signature> {
        self.check_typ(|t| t == SignatureType::SubkeyRevocation)?;
        self.sign(signer, |f| f.hash_subkey_binding(primary, subkey))
    }

    /// Revokes the certification of `userid` on `key`.
    pub fn sign_certification_revocation(self, signer: &mut dyn Signer,
                                         key: &Key, userid: &UserID)
                                         -> Result<Signature> {
        self.check_typ(|t| t == SignatureType::CertificationRevocation)?;
        self.sign(signer, |f| f.hash_userid_binding(key, userid))
    }

    /// Signs the document `msg`.
    ///
    /// The signature type must be binary or text.
    pub fn sign_message(self, signer: &mut dyn Signer, msg: &[u8])
                        -> Result<Signature> {
        self.check_typ(|t| t == SignatureType::Binary
                       || t == SignatureType::Text)?;
        self.sign(signer, |f| f.hash_document(msg))
    }

    fn check_typ<F>(&self, ok: F) -> Result<()>
        where F: FnOnce(SignatureType) -> bool
    {
        if ok(self.typ) {
            Ok(())
        } else {
            Err(Error::UnsupportedSignatureType(self.typ).into())
        }
    }

    /// Builds the hashed area for a signature made by `issuer`.
    fn hashed_area(&self, issuer: &Key) -> Result<SubpacketArea> {
        use self::SubpacketValue as V;

        let mut area = SubpacketArea::empty();
        let mut add = |value, critical| -> Result<()> {
            area.add(Subpacket::new(value, critical)?)
        };

        add(V::SignatureCreationTime(
            self.creation_time.unwrap_or_else(Timestamp::now)), true)?;
        add(V::Issuer(issuer.keyid()), false)?;
        if let Some(d) = self.signature_expiration {
            add(V::SignatureExpirationTime(d), true)?;
        }
        if let Some(d) = self.key_expiration {
            add(V::KeyExpirationTime(d), true)?;
        }
        if let Some(flags) = &self.key_flags {
            add(V::KeyFlags(flags.clone()), true)?;
        }
        if let Some(algos) = &self.preferred_symmetric {
            add(V::PreferredSymmetricAlgorithms(algos.clone()), false)?;
        }
        if let Some(algos) = &self.preferred_hash {
            add(V::PreferredHashAlgorithms(algos.clone()), false)?;
        }
        if let Some(algos) = &self.preferred_compression {
            add(V::PreferredCompressionAlgorithms(algos.clone()), false)?;
        }
        if let Some(primary) = self.primary_userid {
            add(V::PrimaryUserID(primary), false)?;
        }
        if let Some(prefs) = &self.key_server_preferences {
            add(V::KeyServerPreferences(prefs.clone()), false)?;
        }
        if let Some(uri) = &self.preferred_key_server {
            add(V::PreferredKeyServer(uri.clone()), false)?;
        }
        if let Some(features) = &self.features {
            add(V::Features(features.clone()), false)?;
        }
        if let Some((code, reason)) = &self.reason_for_revocation {
            add(V::ReasonForRevocation {
                code: *code,
                reason: reason.clone(),
            }, false)?;
        }
        if let Some(sig) = &self.embedded_signature {
            add(V::EmbeddedSignature(Box::new(sig.clone())), true)?;
        }
        if let fp @ Fingerprint::V4(_) = issuer.fingerprint() {
            add(V::IssuerFingerprint(fp), false)?;
        }

        Ok(area)
    }

    fn sign<H>(self, signer: &mut dyn Signer, hash: H) -> Result<Signature>
        where H: FnOnce(&SignatureFields) -> Result<Vec<u8>>
    {
        let (pk_algo, hashed_area) = {
            let key = signer.public();
            if ! key.pk_algo().for_signing() {
                return Err(Error::InvalidKey(format!(
                    "{} keys cannot sign", key.pk_algo())).into());
            }
            (key.pk_algo(), self.hashed_area(key)?)
        };

        let fields = SignatureFields::new_v4(self.typ, pk_algo, self.hash_algo,
                                             hashed_area);
        let digest = hash(&fields)?;
        let mpis = signer.sign(self.hash_algo, &digest)?;

        Ok(Signature {
            fields,
            unhashed_area: SubpacketArea::empty(),
            digest_prefix: [digest[0], digest[1]],
            mpis,
        })
    }
}
