//! Signature verification.
//!
//! [`verify_detached`] checks detached document signatures against
//! keys resolved through a [`KeyProvider`], and [`validate_key`]
//! checks the self-signatures, certifications and bindings read into
//! a [`KeyStore`].  Both sort every signature into one of three
//! buckets of a [`VerificationResult`]: valid, invalid, or made by a
//! key that could not be found.  A signature that does not verify is
//! a verdict, not an error; errors are reserved for input that cannot
//! be parsed.
//!
//! [`KeyStore`]: crate::keystore::KeyStore

use crate::{
    Error,
    Fingerprint,
    KeyID,
    Result,
};
use crate::keystore::{Identity, KeyHandle, KeyRecord, KeyStore, SigRecord};
use crate::packet::{Key, Signature};
use crate::parse::{Dispatch, Event, PacketParser, ParserConfig};
use crate::provider::{KeyProvider, KeyRequest};
use crate::types::{
    Duration,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SignatureType,
    Timestamp,
};

/// Whether a signature is live at a given time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeStatus {
    /// The signature is live.
    Current,
    /// The signature was created after the reference time.
    NotYetValid,
    /// The signature's validity period ended at or before the
    /// reference time.
    Expired,
}

/// What was learned about a signature while verifying it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureInfo {
    typ: SignatureType,
    issuer: Option<KeyID>,
    signer: Option<Fingerprint>,
    creation_time: Option<Timestamp>,
    expiration: Option<Duration>,
    hash_algo: HashAlgorithm,
    pk_algo: PublicKeyAlgorithm,
    error: Option<String>,
}

impl SignatureInfo {
    fn new(sig: &Signature) -> Self {
        SignatureInfo {
            typ: sig.typ(),
            issuer: sig.issuer(),
            signer: None,
            creation_time: sig.signature_creation_time(),
            expiration: sig.signature_expiration_time(),
            hash_algo: sig.hash_algo(),
            pk_algo: sig.pk_algo(),
            error: None,
        }
    }

    /// Returns the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Returns the key ID the signature names as its issuer.
    pub fn issuer(&self) -> Option<KeyID> {
        self.issuer
    }

    /// Returns the fingerprint of the key the signature was checked
    /// with.
    pub fn signer(&self) -> Option<&Fingerprint> {
        self.signer.as_ref()
    }

    /// Returns the signature's creation time.
    pub fn creation_time(&self) -> Option<Timestamp> {
        self.creation_time
    }

    /// Returns how long the signature is valid.
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }

    /// Returns the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Returns the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Returns why verification failed, if it failed with an error
    /// rather than a bad signature.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the end of the validity period, if there is one.
    pub fn expiration_time(&self) -> Option<Timestamp> {
        let ctime = self.creation_time?;
        let validity = self.expiration?;
        Some(ctime.checked_add(validity)
             .unwrap_or_else(|| Timestamp::from(u32::MAX)))
    }

    /// Returns whether the signature is live at `now`.
    ///
    /// A signature without a creation time is treated as current.
    pub fn time_status(&self, now: Timestamp) -> TimeStatus {
        match self.creation_time {
            Some(t) if t > now => TimeStatus::NotYetValid,
            _ => match self.expiration_time() {
                Some(end) if end <= now => TimeStatus::Expired,
                _ => TimeStatus::Current,
            },
        }
    }
}

/// The outcome of verifying a set of signatures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationResult {
    valid: Vec<SignatureInfo>,
    invalid: Vec<SignatureInfo>,
    unknown_signer: Vec<SignatureInfo>,
}

impl VerificationResult {
    /// Returns the signatures that verified.
    pub fn valid(&self) -> &[SignatureInfo] {
        &self.valid
    }

    /// Returns the signatures that did not verify.
    pub fn invalid(&self) -> &[SignatureInfo] {
        &self.invalid
    }

    /// Returns the signatures whose signer was not found.
    pub fn unknown_signer(&self) -> &[SignatureInfo] {
        &self.unknown_signer
    }

    /// Returns the total number of signatures.
    pub fn len(&self) -> usize {
        self.valid.len() + self.invalid.len() + self.unknown_signer.len()
    }

    /// Returns whether no signatures were checked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `Ok` if the result is acceptable at `now`.
    ///
    /// That is the case if at least one signature verified, none
    /// failed, every signer was found, and every valid signature is
    /// live at `now`.
    pub fn status(&self, now: Timestamp) -> Result<()> {
        if let Some(bad) = self.invalid.first() {
            return Err(Error::BadSignature(match (&bad.error, bad.issuer) {
                (Some(e), _) => e.clone(),
                (None, Some(id)) => format!("{} signature by {}", bad.typ, id),
                (None, None) => format!("{} signature", bad.typ),
            }).into());
        }
        if let Some(unknown) = self.unknown_signer.first() {
            return Err(Error::NoSuchKey(match unknown.issuer {
                Some(id) => id.to_hex(),
                None => "signature has no issuer".into(),
            }).into());
        }
        if self.valid.is_empty() {
            return Err(Error::InvalidOperation(
                "No valid signatures".into()).into());
        }
        for info in &self.valid {
            match info.time_status(now) {
                TimeStatus::Current => (),
                TimeStatus::NotYetValid => return Err(Error::NotYetLive(
                    info.creation_time.unwrap_or(now).into()).into()),
                TimeStatus::Expired => return Err(Error::Expired(
                    info.expiration_time().unwrap_or(now).into()).into()),
            }
        }
        Ok(())
    }

    /// Files `info` according to the verdict.
    fn record(&mut self, mut info: SignatureInfo, signer: &Key,
              verdict: Result<bool>) {
        info.signer = Some(signer.fingerprint());
        match verdict {
            Ok(true) => self.valid.push(info),
            Ok(false) => {
                log::warn!("Bad {} signature by {}", info.typ, signer.keyid());
                self.invalid.push(info);
            },
            Err(e) => {
                log::warn!("Error verifying {} signature by {}: {}",
                           info.typ, signer.keyid(), e);
                info.error = Some(e.to_string());
                self.invalid.push(info);
            },
        }
    }
}

/// Verifies the detached signatures in `signatures` over `document`.
///
/// Signers are looked up by issuer key ID in `keys`.  Packets other
/// than signatures are skipped.
///
/// # Errors
///
/// Fails if `signatures` cannot be parsed.
pub fn verify_detached(keys: &dyn KeyProvider, signatures: &[u8],
                       document: &[u8])
                       -> Result<VerificationResult> {
    tracer!("verify_detached");

    let mut sigs = Vec::new();
    let mut parser = PacketParser::from_bytes(signatures)
        .with_config(ParserConfig::default().emit_subpackets(false));
    parser.dispatch(&mut |event: Event| {
        match event {
            Event::Signature(sig) => sigs.push(sig),
            Event::PacketEnd(raw) if raw.tag() != crate::Tag::Signature =>
                log::warn!("Skipping {} packet in detached signature",
                           raw.tag()),
            _ => (),
        }
        Ok(Dispatch::Release)
    })?;
    t!("{} signatures over {} octets", sigs.len(), document.len());

    let mut result = VerificationResult::default();
    for sig in sigs {
        let info = SignatureInfo::new(&sig);
        let signer = info.issuer
            .and_then(|id| keys.find_key(&KeyRequest::by_keyid(id)));
        match signer {
            Some(signer) => {
                let verdict = sig.verify_message(signer.key(), document);
                result.record(info, signer.key(), verdict);
            },
            None => {
                log::warn!("No key to check {} signature by {:?}",
                           info.typ, info.issuer);
                result.unknown_signer.push(info);
            },
        }
    }

    log::debug!("{} valid, {} invalid, {} unknown signer",
                result.valid.len(), result.invalid.len(),
                result.unknown_signer.len());
    Ok(result)
}

/// Validates the signatures on the record `handle`.
///
/// For a primary key these are the certifications of its user IDs
/// and user attributes, their revocations, direct key signatures and
/// key revocations.  For a subkey they are the binding signatures
/// and subkey revocations.  Third-party certifications are checked if
/// the certifier is in `store`.
///
/// Every signature is filed by its cryptographic verdict alone.
/// Whether the signatures are live at a given time is decided by
/// [`VerificationResult::status`].
///
/// # Errors
///
/// Returns `Error::NoSuchKey` if `handle` or a subkey's primary is
/// not in `store`.
pub fn validate_key(store: &KeyStore, handle: KeyHandle)
                    -> Result<VerificationResult> {
    let record = store.key(handle)
        .ok_or_else(|| Error::NoSuchKey(handle.to_string()))?;
    let primary = match record.primary() {
        Some(p) => Some(store.key(p).ok_or_else(|| Error::NoSuchKey(
            format!("primary {} of {}", p, record.fingerprint())))?),
        None => None,
    };
    let owner = primary.unwrap_or(record);

    let mut result = VerificationResult::default();
    for sr in record.signatures() {
        let sig = sr.signature();
        let info = SignatureInfo::new(sig);

        let signer = match resolve_signer(store, owner, info.issuer) {
            Some(signer) => signer,
            None => {
                log::warn!("No key to check {} signature by {:?} on {}",
                           info.typ, info.issuer, record.fingerprint());
                result.unknown_signer.push(info);
                continue;
            },
        };

        let verdict = match primary {
            Some(primary) => check_subkey_signature(sig, signer, primary.key(),
                                                    record.key()),
            None => check_primary_signature(sr, signer, record),
        };
        result.record(info, signer, verdict);
    }

    log::debug!("{}: {} valid, {} invalid, {} unknown signer",
                record.fingerprint(), result.valid.len(),
                result.invalid.len(), result.unknown_signer.len());
    Ok(result)
}

/// Returns the key that made a signature on `owner`'s key block.
fn resolve_signer<'a>(store: &'a KeyStore, owner: &'a KeyRecord,
                      issuer: Option<KeyID>)
                      -> Option<&'a Key> {
    let issuer = issuer?;
    if issuer == owner.keyid() {
        Some(owner.key())
    } else {
        store.get_by_id(&issuer).map(|k| k.key())
    }
}

fn check_primary_signature(sr: &SigRecord, signer: &Key, record: &KeyRecord)
                           -> Result<bool> {
    let sig = sr.signature();
    let pk = record.key();

    match sig.typ() {
        t if t.is_certification() => match identity(sr, record)? {
            Identity::UserID(u) => sig.verify_userid_binding(signer, pk, u),
            Identity::UserAttribute(ua) =>
                sig.verify_user_attribute_binding(signer, pk, ua),
        },
        SignatureType::CertificationRevocation => match identity(sr, record)? {
            Identity::UserID(u) => sig.verify_userid_revocation(signer, pk, u),
            Identity::UserAttribute(ua) =>
                sig.verify_user_attribute_revocation(signer, pk, ua),
        },
        SignatureType::DirectKey => sig.verify_direct_key(signer, pk),
        SignatureType::KeyRevocation => sig.verify_key_revocation(signer, pk),
        t => Err(Error::UnsupportedSignatureType(t).into()),
    }
}

fn identity<'a>(sr: &SigRecord, record: &'a KeyRecord) -> Result<&'a Identity> {
    sr.identity()
        .and_then(|i| record.identities().get(i))
        .ok_or_else(|| Error::MalformedPacket(format!(
            "{} signature without a user ID", sr.signature().typ())).into())
}

fn check_subkey_signature(sig: &Signature, signer: &Key, primary: &Key,
                          subkey: &Key)
                          -> Result<bool> {
    match sig.typ() {
        SignatureType::SubkeyBinding =>
            sig.verify_subkey_binding(signer, primary, subkey),
        SignatureType::SubkeyRevocation =>
            sig.verify_subkey_revocation(signer, primary, subkey),
        t => Err(Error::UnsupportedSignatureType(t).into()),
    }
}
