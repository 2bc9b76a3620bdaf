//! Detached signatures.

use crate::{
    Error,
    Result,
};
use crate::keystore::{KeyHandle, KeyRecord, KeyStore};
use crate::packet::Signature;
use crate::packet::signature::SignatureBuilder;
use crate::provider::{
    Attempts,
    Operation,
    PassphraseProvider,
    unlock_with,
};
use crate::types::{Duration, HashAlgorithm, SignatureType, Timestamp};

/// Options for [`sign_detached`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignOptions {
    /// The hash algorithm.
    pub hash_algo: HashAlgorithm,
    /// Whether to make a text signature, which is computed over the
    /// document with normalized line endings.
    pub text: bool,
    /// The creation time.  Defaults to the current time.
    pub creation_time: Option<Timestamp>,
    /// How long the signature is valid.
    pub expiration: Option<Duration>,
}

impl Default for SignOptions {
    fn default() -> Self {
        SignOptions {
            hash_algo: HashAlgorithm::SHA256,
            text: false,
            creation_time: None,
            expiration: None,
        }
    }
}

/// Returns the record to sign with on behalf of the key `primary`.
///
/// That is the primary key itself if it may sign and has secret key
/// material, otherwise the first such subkey that is not revoked.
pub fn select_signing_key(store: &KeyStore, primary: KeyHandle)
                          -> Result<&KeyRecord> {
    let record = store.key(primary)
        .ok_or_else(|| Error::NoSuchKey(primary.to_string()))?;
    if record.is_revoked() {
        return Err(Error::InvalidKey(format!(
            "{} is revoked", record.fingerprint())).into());
    }

    let usable = |k: &&KeyRecord| {
        k.can_sign() && k.key().has_secret() && ! k.is_revoked()
    };
    std::iter::once(record)
        .chain(store.subkeys_of(primary))
        .find(usable)
        .ok_or_else(|| Error::InvalidKey(format!(
            "{} has no usable signing key", record.fingerprint())).into())
}

/// Makes a detached signature over `document` with `signer`.
///
/// If the secret key is protected, `provider` is asked for the
/// passphrase.  The decrypted secret is wiped before returning.
///
/// # Errors
///
/// Returns `Error::MissingSecretKey` if `signer` has no secret key
/// material, `Error::InvalidKey` if it may not sign, and the errors
/// of [`unlock_with`].
pub fn sign_detached(signer: &KeyRecord,
                     provider: &mut dyn PassphraseProvider,
                     attempts: Attempts,
                     document: &[u8],
                     options: &SignOptions)
                     -> Result<Signature> {
    if ! signer.key().has_secret() {
        return Err(Error::MissingSecretKey.into());
    }
    if ! signer.can_sign() {
        return Err(Error::InvalidKey(format!(
            "{} may not sign", signer.fingerprint())).into());
    }

    let key = unlock_with(signer.key(), Operation::Sign, provider, attempts)?;
    let mut keypair = key.into_keypair()?;

    let typ = if options.text {
        SignatureType::Text
    } else {
        SignatureType::Binary
    };
    let mut builder = SignatureBuilder::new(typ)
        .set_hash_algo(options.hash_algo)
        .set_signature_expiration_time(options.expiration);
    if let Some(t) = options.creation_time {
        builder = builder.set_signature_creation_time(t);
    }
    let sig = builder.sign_message(&mut keypair, document)?;

    log::debug!("Made {} signature over {} octets with {}",
                typ, document.len(), signer.keyid());
    Ok(sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Packet;
    use crate::packet::{Key, UserID};
    use crate::provider::{FixedPassphrase, NoPassphrase};
    use crate::serialize::Serialize;
    use crate::types::{Curve, KeyFlags, ReasonForRevocation};
    use crate::verify::verify_detached;

    /// Returns a secret key store holding a certification-only
    /// primary key and a signing subkey.
    fn secring(password: Option<&str>, revoke_subkey: bool) -> KeyStore {
        let primary = Key::generate_ecc(true, Curve::Ed25519).unwrap();
        let mut subkey = Key::generate_ecc(true, Curve::NistP256).unwrap();
        let mut signer = primary.clone().into_keypair().unwrap();
        let mut sub_signer = subkey.clone().into_keypair().unwrap();
        let pk = primary.without_secret();
        let sk = subkey.without_secret();
        let uid = UserID::from("Ophelia <ophelia@example.org>");

        let cert = SignatureBuilder::new(SignatureType::PositiveCertification)
            .set_key_flags(KeyFlags::empty().set_certification(true))
            .sign_userid_binding(&mut signer, &pk, &uid).unwrap();
        let backsig = SignatureBuilder::new(SignatureType::PrimaryKeyBinding)
            .sign_primary_key_binding(&mut sub_signer, &pk, &sk).unwrap();
        let binding = SignatureBuilder::new(SignatureType::SubkeyBinding)
            .set_key_flags(KeyFlags::empty().set_signing(true))
            .set_embedded_signature(backsig)
            .sign_subkey_binding(&mut signer, &pk, &sk).unwrap();

        if let Some(p) = password {
            subkey.encrypt_secret(&p.into()).unwrap();
        }
        let mut packets = vec![Packet::SecretKey(primary), uid.into(),
                               cert.into(), Packet::SecretSubkey(subkey),
                               binding.into()];
        if revoke_subkey {
            let rev = SignatureBuilder::new(SignatureType::SubkeyRevocation)
                .set_reason_for_revocation(ReasonForRevocation::KeyRetired,
                                           b"")
                .sign_subkey_revocation(&mut signer, &pk, &sk).unwrap();
            packets.push(rev.into());
        }

        let mut data = Vec::new();
        for p in packets {
            p.serialize(&mut data).unwrap();
        }
        KeyStore::from_bytes(&data).unwrap()
    }

    #[test]
    fn signs_with_subkey() {
        let store = secring(None, false);
        let primary = store.primaries().next().unwrap();
        let signer = select_signing_key(&store, primary.handle()).unwrap();
        assert!(! signer.is_primary());

        let sig = sign_detached(signer, &mut NoPassphrase, Attempts::default(),
                                b"To be, or not to be",
                                &SignOptions::default()).unwrap();
        assert_eq!(sig.typ(), SignatureType::Binary);
        assert_eq!(sig.issuer(), Some(signer.keyid()));

        let data = Packet::from(sig.clone()).to_vec().unwrap();
        let result = verify_detached(&store, &data,
                                     b"To be, or not to be").unwrap();
        assert_eq!(result.valid().len(), 1);
        result.status(Timestamp::now()).unwrap();

        // The primary may only certify.
        let e = sign_detached(primary, &mut NoPassphrase, Attempts::default(),
                              b"", &SignOptions::default()).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::InvalidKey(_))));
    }

    #[test]
    fn protected_keys() {
        let store = secring(Some("nunnery"), false);
        let primary = store.primaries().next().unwrap().handle();
        let signer = select_signing_key(&store, primary).unwrap();

        let e = sign_detached(signer, &mut NoPassphrase, Attempts::default(),
                              b"", &SignOptions::default()).unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::MissingPassphrase));

        let options = SignOptions {
            hash_algo: HashAlgorithm::SHA512,
            text: true,
            creation_time: Some(Timestamp::from(1_600_000_000)),
            expiration: Some(Duration::days(7).unwrap()),
        };
        let sig = sign_detached(signer, &mut FixedPassphrase::new("nunnery"),
                                Attempts::default(), b"line\n",
                                &options).unwrap();
        assert_eq!(sig.typ(), SignatureType::Text);
        assert_eq!(sig.hash_algo(), HashAlgorithm::SHA512);
        assert_eq!(sig.signature_creation_time(),
                   Some(Timestamp::from(1_600_000_000)));
        assert_eq!(sig.signature_expiration_time(),
                   Some(Duration::days(7).unwrap()));

        // The secret in the store stays encrypted.
        assert!(! signer.key().has_unencrypted_secret());
    }

    #[test]
    fn revoked_and_public_keys() {
        let store = secring(None, true);
        let primary = store.primaries().next().unwrap().handle();
        let e = select_signing_key(&store, primary).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::InvalidKey(_))));

        let subkey = store.list().find(|k| ! k.is_primary()).unwrap();
        let public = Packet::PublicKey(subkey.key().without_secret());
        let store = KeyStore::from_bytes(&public.to_vec().unwrap()).unwrap();
        let record = store.list().next().unwrap();
        let e = sign_detached(record, &mut NoPassphrase, Attempts::default(),
                              b"", &SignOptions::default()).unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::MissingSecretKey));
        assert!(select_signing_key(&store, record.handle()).is_err());
    }
}
