use super::*;

use crate::Packet;
use crate::packet::signature::SignatureBuilder;
use crate::packet::signature::subpacket::{Subpacket, SubpacketValue};
use crate::parse::{Event, Handler, ParserConfig};
use crate::types::{Curve, SignatureType};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Cert {
    primary: Key,
    subkey: Key,
    packets: Vec<Packet>,
}

impl Cert {
    fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for p in &self.packets {
            p.serialize(&mut buf).unwrap();
        }
        buf
    }
}

/// Makes a certificate with one user ID and an encryption subkey.
fn cert(userid: &str) -> Cert {
    let primary = Key::generate_ecc(true, Curve::Ed25519).unwrap();
    let subkey = Key::generate_ecc(false, Curve::NistP256).unwrap();
    let mut signer = primary.clone().into_keypair().unwrap();
    let pk = primary.without_secret();
    let sk = subkey.without_secret();

    let uid = UserID::from(userid);
    let cert = SignatureBuilder::new(SignatureType::PositiveCertification)
        .set_key_flags(KeyFlags::sign_and_certify())
        .set_key_expiration_time(Some(Duration::days(365).unwrap()))
        .set_primary_userid(true)
        .sign_userid_binding(&mut signer, &pk, &uid)
        .unwrap();
    let binding = SignatureBuilder::new(SignatureType::SubkeyBinding)
        .set_key_flags(KeyFlags::encrypt())
        .sign_subkey_binding(&mut signer, &pk, &sk)
        .unwrap();

    Cert {
        packets: vec![
            Packet::PublicKey(pk.clone()),
            uid.into(),
            cert.into(),
            Packet::PublicSubkey(sk.clone()),
            binding.into(),
        ],
        primary: pk,
        subkey: sk,
    }
}

#[test]
fn read_key() {
    init();
    let cert = cert("Juliet <juliet@example.org>");
    let data = cert.to_vec();

    let mut store = KeyStore::new();
    let summary = store.read_bytes(&data).unwrap();
    assert_eq!(summary.packets, 5);
    assert_eq!(summary.retained, 5);
    assert_eq!(store.len(), 2);
    assert_eq!(store.dropped_subpackets(), 0);

    let primary = store.get_by_fingerprint(&cert.primary.fingerprint())
        .unwrap();
    assert!(primary.is_primary());
    assert!(! primary.is_secret());
    assert_eq!(primary.keyid(), cert.primary.keyid());
    assert_eq!(primary.identities().len(), 1);
    assert_eq!(primary.primary_identity(), 0);
    assert_eq!(primary.key_flags(), Some(&KeyFlags::sign_and_certify()));
    assert_eq!(primary.key_expiration(), Some(Duration::days(365).unwrap()));
    assert!(primary.can_sign());
    assert!(! primary.can_encrypt());

    let sigs = primary.signatures();
    assert_eq!(sigs.len(), 1);
    assert_eq!(sigs[0].identity(), Some(0));
    assert_eq!(sigs[0].issuer(), Some(cert.primary.keyid()));
    assert!(sigs[0].creation_time().is_some());
    assert_eq!(sigs[0].expiration(), None);

    let subkeys: Vec<_> = store.subkeys_of(primary.handle()).collect();
    assert_eq!(subkeys.len(), 1);
    let subkey = subkeys[0];
    assert_eq!(subkey.fingerprint(), &cert.subkey.fingerprint());
    assert_eq!(subkey.primary(), Some(primary.handle()));
    assert_eq!(store.primary_of(subkey.handle()).unwrap().handle(),
               primary.handle());
    assert!(subkey.can_encrypt());
    assert!(! subkey.can_sign());
    assert_eq!(subkey.signatures().len(), 1);
    assert_eq!(subkey.signatures()[0].identity(), None);

    // The retained packets are the input.
    assert_eq!(store.to_vec().unwrap(), data);
}

#[test]
fn orphans_are_dropped() {
    init();
    let cert = cert("Nurse <nurse@example.org>");
    let mut packets = cert.packets.clone();
    // A signature before the first key, then a subkey without a
    // primary.
    let sig = packets[2].clone();
    let subkey = packets[3].clone();
    packets.insert(0, subkey);
    packets.insert(0, sig);

    let mut data = Vec::new();
    for p in &packets {
        p.serialize(&mut data).unwrap();
    }

    let store = KeyStore::from_bytes(&data).unwrap();
    assert_eq!(store.len(), 2);
    // The subpackets of the stray signature have nowhere to go.
    let stray = match &packets[0] {
        Packet::Signature(s) => s.hashed_area().len() + s.unhashed_area().len(),
        p => panic!("unexpected {:?}", p),
    };
    assert_eq!(store.dropped_subpackets(), stray);
    // Only the accepted packets are written back.
    assert_eq!(store.to_vec().unwrap(), cert.to_vec());
}

#[test]
fn subpacket_without_signature() {
    let cert = cert("Peter <peter@example.org>");
    let mut store = KeyStore::new();
    let mut reader = KeyStoreReader::new(&mut store);

    let sp = Subpacket::new(SubpacketValue::KeyFlags(KeyFlags::encrypt()),
                            false).unwrap();
    // Before any key.
    reader.handle(Event::Subpacket { hashed: true, subpacket: sp.clone() })
        .unwrap();
    // Before any signature on the key.
    reader.handle(Event::PublicKey(cert.primary.clone())).unwrap();
    reader.handle(Event::Subpacket { hashed: true, subpacket: sp }).unwrap();

    assert_eq!(store.dropped_subpackets(), 2);
    let k = store.get_by_fingerprint(&cert.primary.fingerprint()).unwrap();
    assert_eq!(k.key_flags(), None);
}

#[test]
fn reading_is_transactional() {
    init();
    let a = cert("Romeo <romeo@example.org>");
    let mut store = KeyStore::from_bytes(&a.to_vec()).unwrap();

    let b = cert("Mercutio <mercutio@example.org>").to_vec();
    // The last packet's body is one octet short.
    let e = store.read_bytes(&b[..b.len() - 1]).unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(),
                     Some(Error::TruncatedPacket(_))));

    assert_eq!(store.len(), 2);
    assert!(store.get_next_by_name("mercutio", &mut 0).is_none());
    assert!(store.get_next_by_name("romeo", &mut 0).is_some());
}

#[test]
fn lookups() {
    let romeo = cert("Romeo Montague <romeo@example.org>");
    let juliet = cert("Juliet Capulet <juliet@example.org>");
    let mut data = romeo.to_vec();
    data.extend_from_slice(&juliet.to_vec());
    let store = KeyStore::from_bytes(&data).unwrap();
    assert_eq!(store.len(), 4);
    assert_eq!(store.primaries().count(), 2);

    let mut cursor = 0;
    let first = store.get_next_by_name("EXAMPLE.ORG", &mut cursor).unwrap();
    assert_eq!(first.fingerprint(), &romeo.primary.fingerprint());
    let second = store.get_next_by_name("example.org", &mut cursor).unwrap();
    assert_eq!(second.fingerprint(), &juliet.primary.fingerprint());
    assert!(store.get_next_by_name("example.org", &mut cursor).is_none());

    let id = juliet.subkey.keyid();
    assert_eq!(store.get_by_id(&id).unwrap().fingerprint(),
               &juliet.subkey.fingerprint());

    let fp = romeo.primary.fingerprint();
    assert_eq!(store.search(&fp.to_spaced_hex()).unwrap().fingerprint(), &fp);
    assert_eq!(store.search(&format!("0x{}", juliet.primary.keyid()))
               .unwrap().fingerprint(),
               &juliet.primary.fingerprint());
    let short = juliet.primary.keyid().to_hex()[8..].to_lowercase();
    assert_eq!(store.search(&short).unwrap().fingerprint(),
               &juliet.primary.fingerprint());
    assert_eq!(store.search("capulet").unwrap().fingerprint(),
               &juliet.primary.fingerprint());
    assert!(store.search("Tybalt").is_none());

    assert_eq!(store.find_key(&KeyRequest::by_userid("montague"))
               .unwrap().fingerprint(),
               &romeo.primary.fingerprint());
    assert!(store.find_key(&KeyRequest::by_keyid(id).secret()).is_none());
}

#[test]
fn removal() {
    let cert = cert("Balthasar <balthasar@example.org>");
    let mut store = KeyStore::from_bytes(&cert.to_vec()).unwrap();
    let other = store.clone();

    let primary = store.get_by_fingerprint(&cert.primary.fingerprint())
        .unwrap().handle();
    let subkey = store.get_by_fingerprint(&cert.subkey.fingerprint())
        .unwrap().handle();
    let shared = store.key(subkey).unwrap().packets()[0].shared();

    let removed = store.remove(subkey).unwrap();
    assert_eq!(removed.fingerprint(), &cert.subkey.fingerprint());
    assert!(store.key(primary).unwrap().subkeys().is_empty());
    assert!(store.key(subkey).is_none());
    assert!(store.remove(subkey).is_none());
    assert_eq!(store.len(), 1);

    // The other store's copy of the packet is untouched.
    drop(removed);
    assert_eq!(&other.key(subkey).unwrap().packets()[0].as_bytes()[..],
               &shared[..]);

    let mut store = other.clone();
    store.remove(primary).unwrap();
    assert!(store.is_empty());
    assert_eq!(other.len(), 2);
}

#[test]
fn add_and_import() {
    let cert = cert("Friar Laurence <laurence@example.org>");
    let full = KeyStore::from_bytes(&cert.to_vec()).unwrap();
    let mut primary_only = Vec::new();
    for p in &cert.packets[..3] {
        p.serialize(&mut primary_only).unwrap();
    }
    let bare = KeyStore::from_bytes(&primary_only).unwrap();
    assert_eq!(bare.len(), 1);

    let mut store = KeyStore::new();
    let primary = full.primaries().next().unwrap().clone();
    let h = store.add(primary.clone()).unwrap();
    assert!(store.add(primary).is_err());
    assert!(store.key(h).unwrap().subkeys().is_empty());

    // The subkey is attached to the existing primary.
    let summary = store.import(&full).unwrap();
    assert_eq!(summary, ImportSummary {
        new_keys: 0,
        new_subkeys: 1,
        unchanged: 1,
    });
    assert_eq!(store.subkeys_of(h).count(), 1);

    let summary = store.import(&full).unwrap();
    assert_eq!(summary, ImportSummary {
        new_keys: 0,
        new_subkeys: 0,
        unchanged: 2,
    });

    let mut fresh = bare.clone();
    fresh.import(&full).unwrap();
    assert_eq!(fresh.to_vec().unwrap(), full.to_vec().unwrap());
}

#[test]
fn import_role_clash() {
    init();
    let romeo = cert("Romeo <romeo@example.org>");
    let mercutio = cert("Mercutio <mercutio@example.org>");
    let mut store = KeyStore::from_bytes(&romeo.to_vec()).unwrap();
    let before = store.to_vec().unwrap();

    // Romeo's subkey shows up as a primary key, after a key that
    // would be new.
    let mut data = mercutio.to_vec();
    Packet::PublicKey(romeo.subkey.clone()).serialize(&mut data).unwrap();
    let other = KeyStore::from_bytes(&data).unwrap();
    assert_eq!(other.primaries().count(), 2);

    let e = store.import(&other).unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(),
                     Some(Error::InvalidOperation(_))));
    assert_eq!(store.len(), 2);
    assert!(store.get_by_fingerprint(&mercutio.primary.fingerprint())
            .is_none());
    assert_eq!(store.to_vec().unwrap(), before);

    // Reading goes through the same merge.
    assert!(store.read_bytes(&data).is_err());
    assert_eq!(store.len(), 2);
    assert_eq!(store.to_vec().unwrap(), before);

    // Romeo's primary key shows up as a subkey.
    let mut data = mercutio.to_vec();
    Packet::PublicSubkey(romeo.primary.clone()).serialize(&mut data).unwrap();
    let other = KeyStore::from_bytes(&data).unwrap();
    assert_eq!(other.len(), 3);
    let e = store.import(&other).unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(),
                     Some(Error::InvalidOperation(_))));
    assert_eq!(store.to_vec().unwrap(), before);

    store.import(&KeyStore::from_bytes(&mercutio.to_vec()).unwrap())
        .unwrap();
    assert_eq!(store.len(), 4);
}

#[test]
fn revocations_and_trust() {
    init();
    let key = Key::generate_ecc(true, Curve::Ed25519).unwrap();
    let mut signer = key.clone().into_keypair().unwrap();
    let pk = key.without_secret();
    let uid = UserID::from("Tybalt <tybalt@example.org>");

    let key_rev = SignatureBuilder::new(SignatureType::KeyRevocation)
        .set_reason_for_revocation(ReasonForRevocation::KeyCompromised, b"")
        .sign_key_revocation(&mut signer, &pk)
        .unwrap();
    let cert = SignatureBuilder::new(SignatureType::GenericCertification)
        .sign_userid_binding(&mut signer, &pk, &uid)
        .unwrap();
    let uid_rev = SignatureBuilder::new(SignatureType::CertificationRevocation)
        .set_reason_for_revocation(ReasonForRevocation::UIDRetired,
                                   b"Slain by Romeo")
        .sign_certification_revocation(&mut signer, &pk, &uid)
        .unwrap();

    let mut data = Vec::new();
    for p in vec![Packet::PublicKey(pk.clone()), key_rev.into(), uid.into(),
                  cert.into(), Trust::from(vec![0x78, 0]).into(),
                  uid_rev.into()] {
        p.serialize(&mut data).unwrap();
    }

    let store = KeyStore::from_bytes(&data).unwrap();
    let k = store.list().next().unwrap();
    assert!(k.is_revoked());
    let rev = k.revocation().unwrap();
    assert_eq!(rev.code(), ReasonForRevocation::KeyCompromised);
    assert_eq!(rev.target(), RevocationTarget::Key);
    assert_eq!(rev.reason(), ReasonForRevocation::KeyCompromised.to_string());

    assert!(k.is_identity_revoked(0));
    assert_eq!(k.uid_revocations()[0].reason(), "Slain by Romeo");
    assert_eq!(k.uid_revocations()[0].target(), RevocationTarget::UserID(0));

    let sigs = k.signatures();
    assert_eq!(sigs.len(), 3);
    assert_eq!(sigs[0].identity(), None);
    assert_eq!(sigs[1].trust().unwrap().value(), &[0x78, 0]);
    assert!(sigs[2].trust().is_none());
}

#[test]
fn lenient_reads_skip_garbage() {
    init();
    let cert = cert("Sampson <sampson@example.org>");
    let mut data = vec![0xc2, 2, 9, 0];
    data.extend_from_slice(&cert.to_vec());

    let mut store = KeyStore::new();
    assert!(store.read_bytes(&data).is_err());

    let mut parser = PacketParser::from_bytes(&data)
        .with_config(ParserConfig::lenient().emit_subpackets(false));
    let summary = store.read(&mut parser).unwrap();
    assert_eq!(summary.unknown, 1);
    assert_eq!(summary.released, 1);
    assert_eq!(store.len(), 2);
    // Subpacket events were turned back on.
    assert!(store.list().next().unwrap().key_flags().is_some());
}

#[test]
fn load_and_save() {
    let cert = cert("Abram <abram@example.org>");
    let path = std::env::temp_dir().join(format!(
        "openpgp-keyring-{}-{}.pgp", std::process::id(),
        cert.primary.keyid()));

    let mut store = KeyStore::with_path(&path);
    assert_eq!(store.path(), Some(path.as_path()));
    store.read_bytes(&cert.to_vec()).unwrap();
    store.save().unwrap();

    let mut loaded = KeyStore::with_path(&path);
    loaded.load().unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.to_vec().unwrap(), cert.to_vec());

    let e = KeyStore::new().save().unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(),
                     Some(Error::InvalidOperation(_))));
    assert!(KeyStore::new().load().is_err());
}
