//! Parsers for the bodies of the packets that make up keys.
//!
//! Each parser works on a fully buffered body through a
//! [`BodyParser`], so it can never read past the declared length.

use crate::{
    Error,
    Fingerprint,
    KeyID,
    Packet,
    Result,
};
use crate::crypto::{mpi, S2K};
use crate::packet::{
    Key,
    Signature,
    Tag,
    Trust,
    UserAttribute,
    UserID,
};
use crate::packet::key::{
    Encrypted,
    SecretKeyChecksum,
    SecretKeyMaterial,
};
use crate::packet::signature::{
    SignatureFields,
    V3Info,
};
use crate::packet::signature::subpacket::{
    NotationData,
    Subpacket,
    SubpacketArea,
    SubpacketTag,
    SubpacketValue,
};
use crate::parse::body::BodyParser;
use crate::types::{
    Duration,
    KeyFlags,
    KeyServerPreferences,
    PublicKeyAlgorithm,
    SymmetricAlgorithm,
    Timestamp,
};

/// Parses the body of a `tag` packet.
///
/// Tags that do not belong to keys produce an [`Unknown`] packet.
///
///   [`Unknown`]: crate::packet::Unknown
pub(crate) fn parse_body(tag: Tag, body: &[u8]) -> Result<Packet> {
    tracer!("parse_body");
    t!("{} ({} octets)", tag, body.len());

    let mut php = BodyParser::new(tag, body);
    let packet = match tag {
        Tag::PublicKey => Packet::PublicKey(parse_key(&mut php)?),
        Tag::PublicSubkey => Packet::PublicSubkey(parse_key(&mut php)?),
        Tag::SecretKey => Packet::SecretKey(parse_key(&mut php)?),
        Tag::SecretSubkey => Packet::SecretSubkey(parse_key(&mut php)?),
        Tag::Signature => Packet::Signature(parse_signature(&mut php)?),
        Tag::UserID =>
            Packet::UserID(UserID::from(php.parse_bytes_eof("value")?.to_vec())),
        Tag::UserAttribute =>
            Packet::UserAttribute(UserAttribute::from(
                php.parse_bytes_eof("value")?.to_vec())),
        Tag::Trust =>
            Packet::Trust(Trust::from(php.parse_bytes_eof("value")?.to_vec())),
        _ => Packet::Unknown(crate::packet::Unknown::new(
            tag, php.parse_bytes_eof("body")?.to_vec())),
    };
    php.finish()?;
    Ok(packet)
}

/// Parses a key packet of any of the four key types.
///
/// See [Section 5.5 of RFC 4880] for details.
///
///   [Section 5.5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5
fn parse_key(php: &mut BodyParser) -> Result<Key> {
    let version = php.parse_u8("version")?;
    if version != 3 && version != 4 {
        return Err(Error::UnsupportedKeyVersion(version).into());
    }

    let creation_time = Timestamp::from(php.parse_be_u32("creation_time")?);
    let days = if version == 3 {
        php.parse_be_u16("v3_expiration_days")?
    } else {
        0
    };
    let pk_algo: PublicKeyAlgorithm = php.parse_u8("pk_algo")?.into();
    let mpis = mpi::PublicKey::parse_body(pk_algo, php)?;

    let secret = match php.tag() {
        Tag::SecretKey | Tag::SecretSubkey =>
            Some(parse_secret(php, version, pk_algo)?),
        _ => None,
    };

    Key::from_parts(version, creation_time, days, pk_algo, mpis, secret)
}

/// Parses the secret part of a secret key packet.
fn parse_secret(php: &mut BodyParser, version: u8, pk_algo: PublicKeyAlgorithm)
                -> Result<SecretKeyMaterial> {
    let s2k_usage = php.parse_u8("s2k_usage")?;
    match s2k_usage {
        0 => {
            let mpis = php.parse_bytes_eof("secret_mpis")?;
            Ok(mpi::SecretKeyMaterial::parse_chksumd(
                pk_algo, mpis, SecretKeyChecksum::Sum16)?.into())
        },
        254 | 255 => {
            if version == 3 {
                return Err(Error::MalformedPacket(
                    "Encrypted version 3 secret keys are not supported"
                        .into()).into());
            }
            let sym: SymmetricAlgorithm = php.parse_u8("sym_algo")?.into();
            let s2k = S2K::parse_body(php)?;
            let checksum = if s2k_usage == 254 {
                SecretKeyChecksum::SHA1
            } else {
                SecretKeyChecksum::Sum16
            };
            let ciphertext = php.parse_bytes_eof("encrypted_mpis")?;
            Ok(Encrypted::new(s2k, sym, checksum,
                              ciphertext.to_vec().into_boxed_slice()).into())
        },
        u => Err(Error::MalformedPacket(format!(
            "Unsupported S2K usage octet {}", u)).into()),
    }
}

impl S2K {
    /// Parses an S2K specifier.
    ///
    /// Private and unknown specifiers consume the rest of the body as
    /// their parameters, because their length is not known.
    pub(crate) fn parse_body(php: &mut BodyParser) -> Result<Self> {
        let s2k = php.parse_u8("s2k_type")?;
        let s2k = match s2k {
            0 => S2K::Simple {
                hash: php.parse_u8("s2k_hash_algo")?.into(),
            },
            1 => S2K::Salted {
                hash: php.parse_u8("s2k_hash_algo")?.into(),
                salt: parse_salt(php)?,
            },
            3 => S2K::Iterated {
                hash: php.parse_u8("s2k_hash_algo")?.into(),
                salt: parse_salt(php)?,
                hash_bytes: S2K::decode_count(php.parse_u8("s2k_count")?),
            },
            100..=110 => S2K::Private {
                tag: s2k,
                parameters: Some(php.parse_bytes_eof("parameters")?
                                 .to_vec().into_boxed_slice()),
            },
            u => S2K::Unknown {
                tag: u,
                parameters: Some(php.parse_bytes_eof("parameters")?
                                 .to_vec().into_boxed_slice()),
            },
        };
        Ok(s2k)
    }
}

fn parse_salt(php: &mut BodyParser) -> Result<[u8; 8]> {
    let mut salt = [0u8; 8];
    salt.copy_from_slice(php.parse_bytes("s2k_salt", 8)?);
    Ok(salt)
}

/// Parses a version 3 or version 4 signature packet.
///
/// See [Section 5.2 of RFC 4880] for details.
///
///   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2
fn parse_signature(php: &mut BodyParser) -> Result<Signature> {
    let version = php.parse_u8("version")?;
    match version {
        // Version 2 signatures are identical to version 3 ones.
        2 | 3 => parse_signature_v3(php),
        4 => parse_signature_v4(php),
        v => Err(Error::UnsupportedSignatureVersion(v).into()),
    }
}

fn parse_signature_v3(php: &mut BodyParser) -> Result<Signature> {
    let len = php.parse_u8("hashed_len")?;
    if len != 5 {
        return Err(Error::MalformedPacket(format!(
            "Version 3 signature hashed length must be 5, got {}", len))
                   .into());
    }
    let typ = php.parse_u8("type")?.into();
    let creation_time = Timestamp::from(php.parse_be_u32("creation_time")?);
    let issuer = KeyID::from_bytes(php.parse_bytes("issuer", 8)?);
    let pk_algo: PublicKeyAlgorithm = php.parse_u8("pk_algo")?.into();
    let hash_algo = php.parse_u8("hash_algo")?.into();
    let mut digest_prefix = [0u8; 2];
    digest_prefix.copy_from_slice(php.parse_bytes("digest_prefix", 2)?);
    let mpis = mpi::Signature::parse_body(pk_algo, php)?;

    let fields = SignatureFields::new_v3(
        typ, pk_algo, hash_algo, V3Info::new(creation_time, issuer));
    Ok(Signature::from_parts(fields, SubpacketArea::empty(),
                             digest_prefix, mpis))
}

fn parse_signature_v4(php: &mut BodyParser) -> Result<Signature> {
    let typ = php.parse_u8("type")?.into();
    let pk_algo: PublicKeyAlgorithm = php.parse_u8("pk_algo")?.into();
    let hash_algo = php.parse_u8("hash_algo")?.into();

    let hashed_len = php.parse_be_u16("hashed_area_len")? as usize;
    let hashed_area = parse_subpacket_area(
        php.parse_bytes("hashed_area", hashed_len)?)?;
    let unhashed_len = php.parse_be_u16("unhashed_area_len")? as usize;
    let unhashed_area = parse_subpacket_area(
        php.parse_bytes("unhashed_area", unhashed_len)?)?;

    let mut digest_prefix = [0u8; 2];
    digest_prefix.copy_from_slice(php.parse_bytes("digest_prefix", 2)?);
    let mpis = mpi::Signature::parse_body(pk_algo, php)?;

    let fields = SignatureFields::new_v4(typ, pk_algo, hash_algo, hashed_area);
    Ok(Signature::from_parts(fields, unhashed_area, digest_prefix, mpis))
}

/// Parses a subpacket area, keeping its raw octets.
fn parse_subpacket_area(data: &[u8]) -> Result<SubpacketArea> {
    let mut php = BodyParser::new(Tag::Signature, data);
    let mut packets = Vec::new();
    while ! php.is_empty() {
        packets.push(parse_subpacket(&mut php)?);
    }
    Ok(SubpacketArea::from_parsed(packets, data.to_vec()))
}

/// Decodes a subpacket length as described in [Section 5.2.3.1 of
/// RFC 4880].
///
///   [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
fn parse_subpacket_len(php: &mut BodyParser) -> Result<usize> {
    let octet1 = php.parse_u8("subpacket_len")? as usize;
    match octet1 {
        0..=191 => Ok(octet1),
        192..=254 => {
            let octet2 = php.parse_u8("subpacket_len")? as usize;
            Ok(((octet1 - 192) << 8) + octet2 + 192)
        },
        _ => Ok(php.parse_be_u32("subpacket_len")? as usize),
    }
}

fn parse_subpacket(php: &mut BodyParser) -> Result<Subpacket> {
    let len = parse_subpacket_len(php)?;
    if len == 0 {
        return Err(Error::MalformedPacket(
            "Subpacket without a tag".into()).into());
    }
    let body = php.parse_bytes("subpacket", len)?;
    let critical = body[0] & 0x80 != 0;
    let tag: SubpacketTag = (body[0] & 0x7f).into();

    let mut sub = BodyParser::new(Tag::Signature, &body[1..]);
    let value = parse_subpacket_value(tag, critical, &mut sub)
        .and_then(|v| sub.finish().map(|()| v))
        .map_err(|e| match e.downcast_ref::<Error>() {
            Some(Error::PacketBoundary { .. }) => Error::MalformedPacket(
                format!("Subpacket {:?} is too short", tag)).into(),
            _ => e,
        })?;

    Subpacket::with_tag(tag, value, critical)
}

fn parse_subpacket_value(tag: SubpacketTag, critical: bool,
                         php: &mut BodyParser)
                         -> Result<SubpacketValue> {
    use self::SubpacketValue as V;

    let value = match tag {
        SubpacketTag::SignatureCreationTime => V::SignatureCreationTime(
            Timestamp::from(php.parse_be_u32("creation_time")?)),
        SubpacketTag::SignatureExpirationTime => V::SignatureExpirationTime(
            Duration::from(php.parse_be_u32("expiration_time")?)),
        SubpacketTag::ExportableCertification =>
            V::ExportableCertification(php.parse_bool("exportable")?),
        SubpacketTag::TrustSignature => V::TrustSignature {
            level: php.parse_u8("trust_level")?,
            trust: php.parse_u8("trust_amount")?,
        },
        SubpacketTag::RegularExpression => V::RegularExpression(
            php.parse_bytes_eof("regex")?.to_vec()),
        SubpacketTag::Revocable =>
            V::Revocable(php.parse_bool("revocable")?),
        SubpacketTag::KeyExpirationTime => V::KeyExpirationTime(
            Duration::from(php.parse_be_u32("key_expiration_time")?)),
        SubpacketTag::PreferredSymmetricAlgorithms =>
            V::PreferredSymmetricAlgorithms(
                php.parse_bytes_eof("pref_sym_algos")?
                    .iter().map(|&o| o.into()).collect()),
        SubpacketTag::RevocationKey => V::RevocationKey {
            class: php.parse_u8("class")?,
            pk_algo: php.parse_u8("pk_algo")?.into(),
            fp: Fingerprint::from_bytes(php.parse_bytes("fingerprint", 20)?),
        },
        SubpacketTag::Issuer =>
            V::Issuer(KeyID::from_bytes(php.parse_bytes("issuer", 8)?)),
        SubpacketTag::NotationData => {
            let mut flags = [0u8; 4];
            flags.copy_from_slice(php.parse_bytes("flags", 4)?);
            let name_len = php.parse_be_u16("name_len")? as usize;
            let value_len = php.parse_be_u16("value_len")? as usize;
            let name = php.parse_bytes("notation_name", name_len)?;
            let value = php.parse_bytes("notation_value", value_len)?;
            V::NotationData(NotationData::new(flags, name, value))
        },
        SubpacketTag::PreferredHashAlgorithms => V::PreferredHashAlgorithms(
            php.parse_bytes_eof("pref_hash_algos")?
                .iter().map(|&o| o.into()).collect()),
        SubpacketTag::PreferredCompressionAlgorithms =>
            V::PreferredCompressionAlgorithms(
                php.parse_bytes_eof("pref_compression_algos")?
                    .iter().map(|&o| o.into()).collect()),
        SubpacketTag::KeyServerPreferences => V::KeyServerPreferences(
            KeyServerPreferences::new(php.parse_bytes_eof("ksp")?)),
        SubpacketTag::PreferredKeyServer => V::PreferredKeyServer(
            php.parse_bytes_eof("pref_key_server")?.to_vec()),
        SubpacketTag::PrimaryUserID =>
            V::PrimaryUserID(php.parse_bool("primary_user_id")?),
        SubpacketTag::PolicyURI =>
            V::PolicyURI(php.parse_bytes_eof("policy_uri")?.to_vec()),
        SubpacketTag::KeyFlags =>
            V::KeyFlags(KeyFlags::new(php.parse_bytes_eof("key_flags")?)),
        SubpacketTag::SignersUserID => V::SignersUserID(
            php.parse_bytes_eof("signers_user_id")?.to_vec()),
        SubpacketTag::ReasonForRevocation => V::ReasonForRevocation {
            code: php.parse_u8("code")?.into(),
            reason: php.parse_bytes_eof("reason")?.to_vec(),
        },
        SubpacketTag::Features =>
            V::Features(php.parse_bytes_eof("features")?.to_vec()),
        SubpacketTag::SignatureTarget => V::SignatureTarget {
            pk_algo: php.parse_u8("pk_algo")?.into(),
            hash_algo: php.parse_u8("hash_algo")?.into(),
            digest: php.parse_bytes_eof("digest")?.to_vec(),
        },
        SubpacketTag::EmbeddedSignature => {
            let body = php.parse_bytes_eof("embedded_signature")?;
            let mut inner = BodyParser::new(Tag::Signature, body);
            let sig = parse_signature(&mut inner)?;
            inner.finish()?;
            V::EmbeddedSignature(Box::new(sig))
        },
        SubpacketTag::IssuerFingerprint => {
            let raw = php.parse_bytes_eof("issuer_fp")?;
            let fp = match raw.split_first() {
                Some((4, fp)) if fp.len() == 20 => Fingerprint::from_bytes(fp),
                Some((3, fp)) if fp.len() == 16 => Fingerprint::from_bytes(fp),
                _ => Fingerprint::Invalid(raw.to_vec().into_boxed_slice()),
            };
            V::IssuerFingerprint(fp)
        },
        SubpacketTag::PlaceholderForBackwardCompatibility
            | SubpacketTag::Reserved(_)
            | SubpacketTag::Private(_)
            | SubpacketTag::Unknown(_) => {
                if critical {
                    return Err(Error::UnknownCriticalSubpacket(tag.into())
                               .into());
                }
                V::Unknown(php.parse_bytes_eof("value")?.to_vec())
            },
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Serialize;
    use crate::types::{Curve, SignatureType};
    use crate::packet::signature::SignatureBuilder;

    fn userid_binding() -> (Key, Signature) {
        let key = Key::generate_ecc(true, Curve::Ed25519).unwrap();
        let mut pair = key.clone().into_keypair().unwrap();
        let sig = SignatureBuilder::new(SignatureType::PositiveCertification)
            .set_key_flags(KeyFlags::empty().set_certification(true))
            .sign_userid_binding(&mut pair, &key, &"Juliet".into())
            .unwrap();
        (key, sig)
    }

    #[test]
    fn signature_v4() {
        let (key, sig) = userid_binding();
        let body = sig.to_vec().unwrap();
        let parsed = match parse_body(Tag::Signature, &body).unwrap() {
            Packet::Signature(s) => s,
            p => panic!("unexpected {:?}", p),
        };
        assert_eq!(parsed, sig);
        assert!(parsed.verify_userid_binding(&key, &key, &"Juliet".into())
                .unwrap());
    }

    #[test]
    fn signature_v3() {
        let mut body = vec![3, 5, 0x00];
        body.extend_from_slice(&1_200_000_000u32.to_be_bytes());
        body.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD, 1, 2, 3, 4]);
        // EdDSA, SHA256, digest prefix, then r and s.
        body.extend_from_slice(&[22, 8, 0x12, 0x34]);
        body.extend_from_slice(&[0, 1, 1, 0, 1, 1]);

        let sig = match parse_body(Tag::Signature, &body).unwrap() {
            Packet::Signature(s) => s,
            p => panic!("unexpected {:?}", p),
        };
        assert_eq!(sig.version(), 3);
        assert_eq!(sig.typ(), SignatureType::Binary);
        let v3 = sig.v3().unwrap();
        assert_eq!(v3.creation_time(), Timestamp::from(1_200_000_000));
        assert_eq!(sig.signature_creation_time(),
                   Some(Timestamp::from(1_200_000_000)));
        assert_eq!(sig.issuer(),
                   Some(KeyID::from_bytes(&[0xAA, 0xBB, 0xCC, 0xDD,
                                            1, 2, 3, 4])));
        assert!(sig.hashed_area().iter().next().is_none());
        assert_eq!(sig.to_vec().unwrap(), body);

        // The hashed length octet is fixed.
        body[1] = 6;
        assert!(parse_body(Tag::Signature, &body).is_err());
    }

    #[test]
    fn hashed_area_longer_than_body() {
        let (_, sig) = userid_binding();
        let mut body = sig.to_vec().unwrap();
        // The hashed area length lives at offset 4.
        body[4] = 0xff;
        body[5] = 0xff;
        let e = parse_body(Tag::Signature, &body).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::PacketBoundary { field: "hashed_area", .. })));
    }

    #[test]
    fn unknown_critical_subpacket() {
        // Critical subpacket 99, then a regular one.
        let area = [2, 0x80 | 99, 0, 2, 99, 1];
        let e = parse_subpacket_area(&area).unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(),
                   Some(&Error::UnknownCriticalSubpacket(99)));

        let area = [2, 99, 0, 2, 99, 1];
        let area = parse_subpacket_area(&area).unwrap();
        assert_eq!(area.len(), 2);
        assert_eq!(area.as_bytes(), &[2, 99, 0, 2, 99, 1]);
    }

    #[test]
    fn short_subpacket_is_malformed() {
        // A creation time subpacket with three octets of value.
        let area = [4, 2, 0, 0, 1];
        let e = parse_subpacket_area(&area).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::MalformedPacket(_))));
    }

    #[test]
    fn two_octet_subpacket_length() {
        let mut area = vec![192, 75, 20];
        area.extend_from_slice(&[0x80, 0, 0, 0]);
        area.extend_from_slice(&[0, 3, 0, 0xff]);
        area.extend_from_slice(b"foo");
        area.extend(std::iter::repeat(0x2a).take(255));
        let area = parse_subpacket_area(&area).unwrap();
        let notation = area.notation_data();
        assert_eq!(notation.len(), 1);
        assert_eq!(notation[0].name(), b"foo");
        assert_eq!(notation[0].value().len(), 255);
        assert!(notation[0].human_readable());
    }

    #[test]
    fn secret_keys() {
        let mut key = Key::generate_ecc(true, Curve::NistP256).unwrap();
        let mut body = Vec::new();
        key.serialize_secret(&mut body).unwrap();
        match parse_body(Tag::SecretKey, &body).unwrap() {
            Packet::SecretKey(k) => assert_eq!(k, key),
            p => panic!("unexpected {:?}", p),
        }

        key.encrypt_secret(&"streng geheim".into()).unwrap();
        let mut body = Vec::new();
        key.serialize_secret(&mut body).unwrap();
        let mut parsed = match parse_body(Tag::SecretSubkey, &body).unwrap() {
            Packet::SecretSubkey(k) => k,
            p => panic!("unexpected {:?}", p),
        };
        assert_eq!(parsed, key);
        parsed.decrypt_secret(&"streng geheim".into()).unwrap();
        assert!(parsed.has_unencrypted_secret());

        // Legacy S2K usage octets are rejected.
        let public = key.to_vec().unwrap();
        let mut legacy = public.clone();
        legacy.push(7);
        assert!(parse_body(Tag::SecretKey, &legacy).is_err());

        // A public key packet must not have trailing data.
        assert!(parse_body(Tag::PublicKey, &legacy).is_err());
        assert!(parse_body(Tag::PublicKey, &public).is_ok());
    }

    #[test]
    fn unsupported_versions() {
        let e = parse_body(Tag::PublicKey, &[5, 0, 0, 0, 0, 1]).unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(),
                   Some(&Error::UnsupportedKeyVersion(5)));
        let e = parse_body(Tag::Signature, &[5, 0x13]).unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(),
                   Some(&Error::UnsupportedSignatureVersion(5)));
    }

    #[test]
    fn other_packets_are_unknown() {
        match parse_body(Tag::Marker, b"PGP").unwrap() {
            Packet::Unknown(u) => {
                assert_eq!(u.tag(), Tag::Marker);
                assert_eq!(u.body(), b"PGP");
                assert!(u.error().is_none());
            },
            p => panic!("unexpected {:?}", p),
        }
    }
}
