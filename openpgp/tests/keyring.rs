//! End-to-end scenarios: generate, store, sign and verify.

use openpgp_keyring as openpgp;

use openpgp::{Error, Packet};
use openpgp::crypto::{Password, S2K, SessionKey};
use openpgp::crypto::asymmetric::encrypt_session_key;
use openpgp::keygen::{KeyGenerator, PrimaryKeyParams, SubkeyParams};
use openpgp::keystore::KeyStore;
use openpgp::packet::Signature;
use openpgp::parse::Parse;
use openpgp::provider::{Attempts, FixedPassphrase, NoPassphrase};
use openpgp::serialize::Serialize;
use openpgp::sign::{select_signing_key, sign_detached, SignOptions};
use openpgp::types::{
    Curve,
    HashAlgorithm,
    KeyFlags,
    PublicKeyAlgorithm,
    Timestamp,
};
use openpgp::verify::{validate_key, verify_detached};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ecc_params(userid: &str) -> (PrimaryKeyParams, SubkeyParams) {
    let mut primary = PrimaryKeyParams::default();
    primary.userid = userid.into();
    primary.crypto.algo = Some(PublicKeyAlgorithm::EdDSA);
    let mut subkey = SubkeyParams::default();
    subkey.crypto.algo = Some(PublicKeyAlgorithm::ECDH);
    subkey.crypto.curve = Some(Curve::NistP256);
    (primary, subkey)
}

#[test]
fn rsa_keypair() {
    init();
    let mut primary = PrimaryKeyParams::default();
    primary.userid = "Test <test@localhost>".into();
    primary.key_flags = Some(KeyFlags::sign_and_certify());
    let mut subkey = SubkeyParams::default();
    subkey.key_flags = Some(KeyFlags::encrypt());

    let mut pubring = KeyStore::new();
    let mut secring = KeyStore::new();
    let keys = KeyGenerator::new(&mut pubring, &mut secring)
        .generate_keypair(primary, subkey, true)
        .unwrap();

    assert_eq!(pubring.len(), 2);
    let p = pubring.key(keys.primary_pub).unwrap();
    let s = pubring.key(keys.subkey_pub).unwrap();
    assert_ne!(p.keyid(), s.keyid());
    assert_eq!(p.key().pk_algo(), PublicKeyAlgorithm::RSAEncryptSign);
    assert_eq!(s.key().pk_algo(), PublicKeyAlgorithm::RSAEncryptSign);
    assert!(p.can_sign());
    assert!(! p.can_encrypt());
    assert!(s.can_encrypt());
    assert!(! s.can_sign());

    let uid = p.userids().next().unwrap();
    let cert = p.signatures()[0].signature();
    assert_eq!(cert.hash_algo(), HashAlgorithm::SHA256);
    assert!(cert.verify_userid_binding(p.key(), p.key(), uid).unwrap());
    let binding = s.signatures()[0].signature();
    assert!(binding.verify_subkey_binding(p.key(), p.key(), s.key()).unwrap());

    // The binding does not cover the primary key alone, nor the
    // subkey alone.
    assert!(! binding.verify_subkey_binding(p.key(), p.key(), p.key())
            .unwrap());
    assert!(! binding.verify_subkey_binding(p.key(), s.key(), s.key())
            .unwrap_or(false));

    // Session keys go to the subkey.
    let sk = SessionKey::new(32).unwrap();
    let ciphertext = encrypt_session_key(s.key(), &sk).unwrap();
    let pair = secring.key(keys.subkey_sec).unwrap().key().clone()
        .into_keypair().unwrap();
    assert_eq!(pair.decrypt(&ciphertext).unwrap(), sk);
}

#[test]
fn generate_serialize_reparse() {
    init();
    let (primary, subkey) = ecc_params("Viola <viola@example.org>");
    let mut pubring = KeyStore::new();
    let mut secring = KeyStore::new();
    KeyGenerator::new(&mut pubring, &mut secring)
        .protect_with("what you will")
        .generate_keypair(primary, subkey, true)
        .unwrap();

    for store in &[&pubring, &secring] {
        let reread = KeyStore::from_bytes(&store.to_vec().unwrap()).unwrap();
        assert_eq!(reread.len(), store.len());
        for (a, b) in store.list().zip(reread.list()) {
            assert_eq!(a.fingerprint(), b.fingerprint());
            assert_eq!(a.identities(), b.identities());
            assert_eq!(a.key_flags(), b.key_flags());
            assert_eq!(a.is_secret(), b.is_secret());
            assert_eq!(a.key(), b.key());
        }
        assert_eq!(reread.to_vec().unwrap(), store.to_vec().unwrap());
    }
}

#[test]
fn sign_and_verify() {
    init();
    let (primary, subkey) = ecc_params("Olivia <olivia@example.org>");
    let mut pubring = KeyStore::new();
    let mut secring = KeyStore::new();
    let keys = KeyGenerator::new(&mut pubring, &mut secring)
        .protect_with("patience on a monument")
        .generate_keypair(primary, subkey, true)
        .unwrap();

    let document = b"If music be the food of love, play on\n";
    let signer = select_signing_key(&secring, keys.primary_sec).unwrap();
    assert_eq!(signer.handle(), keys.primary_sec);

    let e = sign_detached(signer, &mut NoPassphrase, Attempts::default(),
                          document, &SignOptions::default()).unwrap_err();
    assert_eq!(e.downcast_ref::<Error>(), Some(&Error::MissingPassphrase));

    let sig = sign_detached(signer,
                            &mut FixedPassphrase::new("patience on a monument"),
                            Attempts::default(), document,
                            &SignOptions::default()).unwrap();
    let data = Packet::from(sig).to_vec().unwrap();
    assert!(Signature::from_bytes(&data).is_ok());

    let result = verify_detached(&pubring, &data, document).unwrap();
    assert_eq!(result.valid().len(), 1);
    assert_eq!(result.valid()[0].signer(),
               Some(pubring.key(keys.primary_pub).unwrap().fingerprint()));
    result.status(Timestamp::now()).unwrap();

    // Flip a bit of the signature creation time.
    let mut tampered = data.clone();
    tampered[13] ^= 1;
    let sig = Signature::from_bytes(&tampered).unwrap();
    let key = pubring.key(keys.primary_pub).unwrap().key();
    assert!(! sig.verify_message(key, document).unwrap());
    let result = verify_detached(&pubring, &tampered, document).unwrap();
    assert_eq!(result.invalid().len(), 1);
    assert!(result.status(Timestamp::now()).is_err());
}

#[test]
fn unknown_signer() {
    let (primary, subkey) = ecc_params("Malvolio <malvolio@example.org>");
    let mut pubring = KeyStore::new();
    let mut secring = KeyStore::new();
    let keys = KeyGenerator::new(&mut pubring, &mut secring)
        .generate_keypair(primary, subkey, true)
        .unwrap();

    let signer = secring.key(keys.primary_sec).unwrap();
    let sig = sign_detached(signer, &mut NoPassphrase, Attempts::default(),
                            b"", &SignOptions::default()).unwrap();
    let data = Packet::from(sig).to_vec().unwrap();

    let result = verify_detached(&KeyStore::new(), &data, b"").unwrap();
    assert!(result.valid().is_empty());
    assert!(result.invalid().is_empty());
    assert_eq!(result.unknown_signer().len(), 1);
    assert_eq!(result.unknown_signer()[0].issuer(), Some(signer.keyid()));
    let e = result.status(Timestamp::now()).unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(), Some(Error::NoSuchKey(_))));
}

#[test]
fn truncated_stream() {
    init();
    let (primary, subkey) = ecc_params("Sebastian <sebastian@example.org>");
    let mut pubring = KeyStore::new();
    let mut secring = KeyStore::new();
    KeyGenerator::new(&mut pubring, &mut secring)
        .generate_keypair(primary, subkey, true)
        .unwrap();
    let data = pubring.to_vec().unwrap();

    let (primary, subkey) = ecc_params("Antonio <antonio@example.org>");
    let mut other = KeyStore::new();
    let mut other_sec = KeyStore::new();
    KeyGenerator::new(&mut other, &mut other_sec)
        .generate_keypair(primary, subkey, true)
        .unwrap();
    let before = other.to_vec().unwrap();

    for cut in &[1, 10, data.len() - 3] {
        let e = other.read_bytes(&data[..data.len() - cut]).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::TruncatedPacket(_))),
                "cut {}: {}", cut, e);
        assert_eq!(other.len(), 2);
        assert_eq!(other.to_vec().unwrap(), before);
    }

    other.read_bytes(&data).unwrap();
    assert_eq!(other.len(), 4);
    assert!(validate_key(&other, other.search("sebastian").unwrap().handle())
            .unwrap().status(Timestamp::now()).is_ok());
}

#[test]
fn s2k_salts() {
    let password: Password = "the rain it raineth every day".into();
    let a = S2K::Iterated {
        hash: HashAlgorithm::SHA256,
        salt: [1, 2, 3, 4, 5, 6, 7, 8],
        hash_bytes: 524288,
    };
    let b = S2K::Iterated {
        hash: HashAlgorithm::SHA256,
        salt: [8, 7, 6, 5, 4, 3, 2, 1],
        hash_bytes: 524288,
    };
    let ka = a.derive_key(&password, 32).unwrap();
    let kb = b.derive_key(&password, 32).unwrap();
    assert_ne!(ka, kb);
    assert_eq!(a.derive_key(&password, 32).unwrap(), ka);
    assert_eq!(S2K::encode_count(524288).unwrap(), 0x90);
}
