//! Packet serialization infrastructure.
//!
//! This is the inverse of the [`parse`] module: every type that can
//! be parsed can be written back.  [`Packet`]s are framed with a
//! new-format CTB and a full body length; the packet types
//! themselves (keys, signatures, user IDs, ...) serialize to their
//! naked bodies.
//!
//!   [`parse`]: crate::parse
//!   [`Packet`]: crate::Packet

use std::convert::TryFrom;
use std::io;

use crate::{
    Error,
    Fingerprint,
    Packet,
    Result,
};
use crate::crypto::S2K;
use crate::crypto::mem::Protected;
use crate::crypto::mpi::{self, MPI, ProtectedMPI};
use crate::packet::{
    Key,
    Signature,
    Tag,
    Trust,
    Unknown,
    UserAttribute,
    UserID,
};
use crate::packet::header::{BodyLength, CTB, Header, PacketLengthType};
use crate::packet::key::{SecretKeyChecksum, SecretKeyMaterial};
use crate::packet::signature::subpacket::{
    Subpacket,
    SubpacketArea,
    SubpacketValue,
};
use crate::types::Curve;

fn write_byte(o: &mut dyn io::Write, b: u8) -> io::Result<()> {
    o.write_all(&[b])
}

fn write_be_u16(o: &mut dyn io::Write, n: u16) -> io::Result<()> {
    o.write_all(&n.to_be_bytes())
}

fn write_be_u32(o: &mut dyn io::Write, n: u32) -> io::Result<()> {
    o.write_all(&n.to_be_bytes())
}

/// Packet serialization.
pub trait Serialize {
    /// Writes a serialized version of the object to `o`.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()>;

    /// Serializes the object to a vector.
    fn to_vec(&self) -> Result<Vec<u8>> {
        let mut o = Vec::with_capacity(256);
        self.serialize(&mut o)?;
        Ok(o)
    }
}

impl Serialize for BodyLength {
    /// Emits the length encoded for use with new-style CTBs.
    ///
    /// Note: the CTB itself is not emitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if invoked on
    /// [`BodyLength::Indeterminate`], or on a partial length that is
    /// not a power of two.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        match *self {
            BodyLength::Full(l) => {
                if l <= 191 {
                    write_byte(o, l as u8)?;
                } else if l <= 8383 {
                    let v = l - 192;
                    write_byte(o, ((v >> 8) + 192) as u8)?;
                    write_byte(o, (v & 0xff) as u8)?;
                } else {
                    write_byte(o, 0xff)?;
                    write_be_u32(o, l)?;
                }
            },
            BodyLength::Partial(l) => {
                if ! l.is_power_of_two() || l > 1 << 30 {
                    return Err(Error::InvalidArgument(format!(
                        "Partial length must be a power of two no larger \
                         than 2^30, got {}", l)).into());
                }
                write_byte(o, 224 + l.trailing_zeros() as u8)?;
            },
            BodyLength::Indeterminate =>
                return Err(Error::InvalidArgument(
                    "Indeterminate lengths are not supported for new \
                     format packets".into()).into()),
        }
        Ok(())
    }
}

impl BodyLength {
    /// Emits the length encoded for use with old-style CTBs.
    ///
    /// Note: the CTB itself is not emitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if invoked on
    /// [`BodyLength::Partial`].
    pub fn serialize_old(&self, o: &mut dyn io::Write) -> Result<()> {
        match *self {
            BodyLength::Full(l) => {
                if l <= u8::MAX as u32 {
                    write_byte(o, l as u8)?;
                } else if l <= u16::MAX as u32 {
                    write_be_u16(o, l as u16)?;
                } else {
                    write_be_u32(o, l)?;
                }
            },
            BodyLength::Indeterminate => (),
            BodyLength::Partial(_) =>
                return Err(Error::InvalidArgument(
                    "Partial body lengths are not supported for old \
                     format packets".into()).into()),
        }
        Ok(())
    }
}

impl Serialize for CTB {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        match *self {
            CTB::New(tag) => write_byte(o, 0b1100_0000u8 | u8::from(tag))?,
            CTB::Old(tag, length_type) => {
                let tag = u8::from(tag);
                if tag > 15 {
                    return Err(Error::InvalidArgument(format!(
                        "Tag {} cannot be expressed in an old format CTB",
                        tag)).into());
                }
                let length_type = match length_type {
                    PacketLengthType::OneOctet => 0,
                    PacketLengthType::TwoOctets => 1,
                    PacketLengthType::FourOctets => 2,
                    PacketLengthType::Indeterminate => 3,
                };
                write_byte(o, 0b1000_0000u8 | (tag << 2) | length_type)?;
            },
        }
        Ok(())
    }
}

impl Serialize for Header {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        self.ctb().serialize(o)?;
        match self.ctb() {
            CTB::New(_) => self.length().serialize(o),
            CTB::Old(_, _) => self.length().serialize_old(o),
        }
    }
}

/// Writes an MPI's bit count, which has to fit into two octets.
fn write_mpi_bits(w: &mut dyn io::Write, bits: usize) -> Result<()> {
    let bits = u16::try_from(bits)
        .map_err(|_| Error::InvalidArgument(
            format!("MPI too large: {} bits", bits)))?;
    write_be_u16(w, bits)?;
    Ok(())
}

impl Serialize for MPI {
    fn serialize(&self, w: &mut dyn io::Write) -> Result<()> {
        write_mpi_bits(w, self.bits())?;
        w.write_all(self.value())?;
        Ok(())
    }
}

impl Serialize for ProtectedMPI {
    fn serialize(&self, w: &mut dyn io::Write) -> Result<()> {
        write_mpi_bits(w, self.bits())?;
        w.write_all(self.value())?;
        Ok(())
    }
}

fn write_curve(w: &mut dyn io::Write, curve: &Curve) -> Result<()> {
    let oid = curve.oid();
    write_byte(w, oid.len() as u8)?;
    w.write_all(oid)?;
    Ok(())
}

impl Serialize for mpi::PublicKey {
    fn serialize(&self, w: &mut dyn io::Write) -> Result<()> {
        use crate::crypto::mpi::PublicKey::*;

        match self {
            RSA { e, n } => {
                n.serialize(w)?;
                e.serialize(w)?;
            },

            DSA { p, q, g, y } => {
                p.serialize(w)?;
                q.serialize(w)?;
                g.serialize(w)?;
                y.serialize(w)?;
            },

            ElGamal { p, g, y } => {
                p.serialize(w)?;
                g.serialize(w)?;
                y.serialize(w)?;
            },

            EdDSA { curve, q } | ECDSA { curve, q } => {
                write_curve(w, curve)?;
                q.serialize(w)?;
            },

            ECDH { curve, q, hash, sym } => {
                write_curve(w, curve)?;
                q.serialize(w)?;
                // KDF parameters.
                w.write_all(&[3, 1, (*hash).into(), (*sym).into()])?;
            },

            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(w)?;
                }
                w.write_all(rest)?;
            },
        }

        Ok(())
    }
}

impl Serialize for mpi::SecretKeyMaterial {
    fn serialize(&self, w: &mut dyn io::Write) -> Result<()> {
        use crate::crypto::mpi::SecretKeyMaterial::*;

        match self {
            RSA { d, p, q, u } => {
                d.serialize(w)?;
                p.serialize(w)?;
                q.serialize(w)?;
                u.serialize(w)?;
            },

            DSA { x } | ElGamal { x } => x.serialize(w)?,

            EdDSA { scalar } | ECDSA { scalar } | ECDH { scalar } =>
                scalar.serialize(w)?,

            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(w)?;
                }
                w.write_all(rest)?;
            },
        }

        Ok(())
    }
}

impl mpi::SecretKeyMaterial {
    /// Writes the secret MPIs followed by the integrity check.
    pub(crate) fn serialize_chksumd(&self, w: &mut dyn io::Write,
                                    checksum: SecretKeyChecksum)
                                    -> Result<()> {
        // The plaintext MPIs are kept in protected memory.
        let mut buf = Vec::new();
        self.serialize(&mut buf)?;
        let buf: Protected = buf.into();

        w.write_all(&buf)?;
        w.write_all(&checksum.compute(&buf)?)?;
        Ok(())
    }
}

impl Serialize for mpi::Ciphertext {
    fn serialize(&self, w: &mut dyn io::Write) -> Result<()> {
        use crate::crypto::mpi::Ciphertext::*;

        match self {
            RSA { c } => c.serialize(w)?,

            ElGamal { e, c } => {
                e.serialize(w)?;
                c.serialize(w)?;
            },

            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(w)?;
                }
                w.write_all(rest)?;
            },
        }

        Ok(())
    }
}

impl Serialize for mpi::Signature {
    fn serialize(&self, w: &mut dyn io::Write) -> Result<()> {
        use crate::crypto::mpi::Signature::*;

        match self {
            RSA { s } => s.serialize(w)?,

            DSA { r, s } | ElGamal { r, s } | EdDSA { r, s }
                | ECDSA { r, s } => {
                    r.serialize(w)?;
                    s.serialize(w)?;
                },

            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(w)?;
                }
                w.write_all(rest)?;
            },
        }

        Ok(())
    }
}

impl Serialize for S2K {
    /// Serializes this S2K instance.
    ///
    /// The iteration count is written in its one-octet coded form.
    fn serialize(&self, w: &mut dyn io::Write) -> Result<()> {
        match self {
            S2K::Simple { hash } => {
                w.write_all(&[0, (*hash).into()])?;
            },
            S2K::Salted { hash, salt } => {
                w.write_all(&[1, (*hash).into()])?;
                w.write_all(&salt[..])?;
            },
            S2K::Iterated { hash, salt, hash_bytes } => {
                let coded = S2K::encode_count(*hash_bytes)?;
                w.write_all(&[3, (*hash).into()])?;
                w.write_all(&salt[..])?;
                write_byte(w, coded)?;
            },
            S2K::Private { tag, parameters }
                | S2K::Unknown { tag, parameters } => {
                    write_byte(w, *tag)?;
                    if let Some(p) = parameters.as_ref() {
                        w.write_all(p)?;
                    }
                },
        }

        Ok(())
    }
}

impl Serialize for Key {
    /// Writes the public part of the key packet's body.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        write_byte(o, self.version())?;
        write_be_u32(o, self.creation_time().into())?;
        if self.version() == 3 {
            write_be_u16(o, self.v3_expiration_days())?;
        }
        write_byte(o, self.pk_algo().into())?;
        self.mpis().serialize(o)
    }
}

impl Key {
    /// Writes the body of a secret key packet: the public part
    /// followed by the (possibly encrypted) secret key material.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingSecretKey` if the key has no secret.
    pub fn serialize_secret(&self, o: &mut dyn io::Write) -> Result<()> {
        let secret = self.secret().ok_or(Error::MissingSecretKey)?;
        self.serialize(o)?;

        match secret {
            SecretKeyMaterial::Unencrypted(u) => {
                write_byte(o, 0)?;
                u.mpis().serialize_chksumd(o, SecretKeyChecksum::Sum16)?;
            },
            SecretKeyMaterial::Encrypted(e) => {
                write_byte(o, e.s2k_usage())?;
                write_byte(o, e.algo().into())?;
                e.s2k().serialize(o)?;
                o.write_all(e.ciphertext())?;
            },
        }

        Ok(())
    }
}

/// Writes a subpacket length as described in [Section 5.2.3.1 of RFC
/// 4880].
///
///   [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
fn write_subpacket_len(o: &mut dyn io::Write, len: usize) -> Result<()> {
    if len < 192 {
        write_byte(o, len as u8)?;
    } else if len < 16320 {
        let v = len - 192;
        write_byte(o, ((v >> 8) + 192) as u8)?;
        write_byte(o, (v & 0xff) as u8)?;
    } else {
        write_byte(o, 0xff)?;
        write_be_u32(o, len as u32)?;
    }
    Ok(())
}

impl Serialize for SubpacketValue {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        use self::SubpacketValue::*;

        match self {
            Unknown(body) => o.write_all(body)?,
            SignatureCreationTime(t) => write_be_u32(o, (*t).into())?,
            SignatureExpirationTime(d) => write_be_u32(o, (*d).into())?,
            ExportableCertification(e) => write_byte(o, *e as u8)?,
            TrustSignature { level, trust } => o.write_all(&[*level, *trust])?,
            RegularExpression(re) => o.write_all(re)?,
            Revocable(r) => write_byte(o, *r as u8)?,
            KeyExpirationTime(d) => write_be_u32(o, (*d).into())?,
            PreferredSymmetricAlgorithms(algos) => {
                for &a in algos {
                    write_byte(o, a.into())?;
                }
            },
            RevocationKey { class, pk_algo, fp } => {
                write_byte(o, *class)?;
                write_byte(o, (*pk_algo).into())?;
                o.write_all(fp.as_bytes())?;
            },
            Issuer(id) => o.write_all(id.as_bytes())?,
            NotationData(nd) => {
                o.write_all(nd.flags())?;
                write_be_u16(o, nd.name().len() as u16)?;
                write_be_u16(o, nd.value().len() as u16)?;
                o.write_all(nd.name())?;
                o.write_all(nd.value())?;
            },
            PreferredHashAlgorithms(algos) => {
                for &a in algos {
                    write_byte(o, a.into())?;
                }
            },
            PreferredCompressionAlgorithms(algos) => {
                for &a in algos {
                    write_byte(o, a.into())?;
                }
            },
            KeyServerPreferences(p) => o.write_all(p.as_bytes())?,
            PreferredKeyServer(uri) => o.write_all(uri)?,
            PrimaryUserID(p) => write_byte(o, *p as u8)?,
            PolicyURI(uri) => o.write_all(uri)?,
            KeyFlags(f) => o.write_all(f.as_bytes())?,
            SignersUserID(uid) => o.write_all(uid)?,
            ReasonForRevocation { code, reason } => {
                write_byte(o, (*code).into())?;
                o.write_all(reason)?;
            },
            Features(f) => o.write_all(f)?,
            SignatureTarget { pk_algo, hash_algo, digest } => {
                write_byte(o, (*pk_algo).into())?;
                write_byte(o, (*hash_algo).into())?;
                o.write_all(digest)?;
            },
            EmbeddedSignature(sig) => sig.serialize(o)?,
            IssuerFingerprint(fp) => match fp {
                Fingerprint::V4(_) => {
                    write_byte(o, 4)?;
                    o.write_all(fp.as_bytes())?;
                },
                Fingerprint::V3(_) => {
                    write_byte(o, 3)?;
                    o.write_all(fp.as_bytes())?;
                },
                // Kept verbatim, including the version octet.
                Fingerprint::Invalid(raw) => o.write_all(raw)?,
            },
        }

        Ok(())
    }
}

impl Serialize for Subpacket {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let value = self.value().to_vec()?;
        write_subpacket_len(o, 1 + value.len())?;
        let tag = u8::from(self.tag())
            | if self.critical() { 0x80 } else { 0 };
        write_byte(o, tag)?;
        o.write_all(&value)?;
        Ok(())
    }
}

impl Serialize for SubpacketArea {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.as_bytes())?;
        Ok(())
    }
}

impl Serialize for Signature {
    /// Writes the signature packet's body.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        if let Some(v3) = self.v3() {
            write_byte(o, 3)?;
            // Length of the hashed material.
            write_byte(o, 5)?;
            write_byte(o, self.typ().into())?;
            write_be_u32(o, v3.creation_time().into())?;
            o.write_all(v3.issuer().as_bytes())?;
            write_byte(o, self.pk_algo().into())?;
            write_byte(o, self.hash_algo().into())?;
        } else {
            write_byte(o, self.version())?;
            write_byte(o, self.typ().into())?;
            write_byte(o, self.pk_algo().into())?;
            write_byte(o, self.hash_algo().into())?;

            let hashed = self.hashed_area().as_bytes();
            write_be_u16(o, hashed.len() as u16)?;
            o.write_all(hashed)?;

            let unhashed = self.unhashed_area().as_bytes();
            if unhashed.len() > u16::MAX as usize {
                return Err(Error::InvalidArgument(
                    "Unhashed area too large".into()).into());
            }
            write_be_u16(o, unhashed.len() as u16)?;
            o.write_all(unhashed)?;
        }

        o.write_all(&self.digest_prefix()[..])?;
        self.mpis().serialize(o)
    }
}

impl Serialize for UserID {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.value())?;
        Ok(())
    }
}

impl Serialize for UserAttribute {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.value())?;
        Ok(())
    }
}

impl Serialize for Trust {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.value())?;
        Ok(())
    }
}

impl Serialize for Unknown {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.body())?;
        Ok(())
    }
}

impl Packet {
    /// Writes the body of the packet, without the header.
    pub fn serialize_body(&self, o: &mut dyn io::Write) -> Result<()> {
        match self {
            Packet::Unknown(p) => p.serialize(o),
            Packet::Signature(p) => p.serialize(o),
            Packet::PublicKey(k) | Packet::PublicSubkey(k) => k.serialize(o),
            Packet::SecretKey(k) | Packet::SecretSubkey(k) =>
                k.serialize_secret(o),
            Packet::Trust(p) => p.serialize(o),
            Packet::UserID(p) => p.serialize(o),
            Packet::UserAttribute(p) => p.serialize(o),
        }
    }
}

impl Serialize for Packet {
    /// Writes the packet framed with a new format CTB.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let mut body = Vec::new();
        self.serialize_body(&mut body)?;
        write_packet(o, self.tag(), &body)
    }
}

/// Frames `body` as a `tag` packet and writes it to `o`.
pub(crate) fn write_packet(o: &mut dyn io::Write, tag: Tag, body: &[u8])
                           -> Result<()> {
    if body.len() > u32::MAX as usize {
        return Err(Error::InvalidArgument(
            "Packet body too large".into()).into());
    }
    Header::new(CTB::New(tag), BodyLength::Full(body.len() as u32))
        .serialize(o)?;
    o.write_all(body)?;
    Ok(())
}
