//! Signature subpackets.
//!
//! OpenPGP signature packets include a set of key-value attributes
//! called subpackets.  These subpackets are used to indicate when a
//! signature was created, who created the signature, user &
//! implementation preferences, etc.  The full details are in [Section
//! 5.2.3.1 of RFC 4880].
//!
//! [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
//!
//! A signature carries two [`SubpacketArea`]s: the hashed area,
//! which is covered by the signature, and the unhashed area, which
//! is not.  Each area keeps the exact octets it was parsed from (or
//! serialized to), so that hashing it reproduces what the signer
//! hashed.

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::{
    Error,
    Result,
    Fingerprint,
    KeyID,
};
use crate::packet::Signature;
use crate::serialize::Serialize;
use crate::types::{
    CompressionAlgorithm,
    Duration,
    HashAlgorithm,
    KeyFlags,
    KeyServerPreferences,
    PublicKeyAlgorithm,
    ReasonForRevocation,
    SymmetricAlgorithm,
    Timestamp,
};

/// The subpacket types specified by [Section 5.2.3.1 of RFC 4880].
///
/// [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
#[derive(Debug)]
#[derive(PartialEq, Eq, Hash)]
#[derive(Clone, Copy)]
pub enum SubpacketTag {
    /// The time the signature was made.
    SignatureCreationTime,
    /// The validity period of the signature.
    SignatureExpirationTime,
    /// This subpacket denotes whether a certification signature is
    /// "exportable", to be used by other users than the signature's issuer.
    ExportableCertification,
    /// Signer asserts that the key is not only valid but also trustworthy at
    /// the specified level.
    TrustSignature,
    /// Used in conjunction with trust Signature packets (of level > 0) to
    /// limit the scope of trust that is extended.
    RegularExpression,
    /// Signature's revocability status.
    Revocable,
    /// The validity period of the key.
    KeyExpirationTime,
    /// Deprecated
    PlaceholderForBackwardCompatibility,
    /// Symmetric algorithm numbers that indicate which algorithms the key
    /// holder prefers to use.
    PreferredSymmetricAlgorithms,
    /// Authorizes the specified key to issue revocation signatures for this
    /// key.
    RevocationKey,
    /// The OpenPGP Key ID of the key issuing the signature.
    Issuer,
    /// This subpacket describes a "notation" on the signature that the
    /// issuer wishes to make.
    NotationData,
    /// Message digest algorithm numbers that indicate which algorithms the
    /// key holder prefers to receive.
    PreferredHashAlgorithms,
    /// Compression algorithm numbers that indicate which algorithms the key
    /// holder prefers to use.
    PreferredCompressionAlgorithms,
    /// This is a list of one-bit flags that indicate preferences that the
    /// key holder has about how the key is handled on a key server.
    KeyServerPreferences,
    /// This is a URI of a key server that the key holder prefers be used for
    /// updates.
    PreferredKeyServer,
    /// This is a flag in a User ID's self-signature that states whether this
    /// User ID is the main User ID for this key.
    PrimaryUserID,
    /// This subpacket contains a URI of a document that describes the policy
    /// under which the signature was issued.
    PolicyURI,
    /// This subpacket contains a list of binary flags that hold information
    /// about a key.
    KeyFlags,
    /// This subpacket allows a keyholder to state which User ID is
    /// responsible for the signing.
    SignersUserID,
    /// This subpacket is used only in key revocation and certification
    /// revocation signatures.
    ReasonForRevocation,
    /// The Features subpacket denotes which advanced OpenPGP features a
    /// user's implementation supports.
    Features,
    /// This subpacket identifies a specific target signature to which a
    /// signature refers.
    SignatureTarget,
    /// This subpacket contains a complete Signature packet body
    EmbeddedSignature,
    /// Added in RFC 4880bis.
    IssuerFingerprint,
    /// Reserved subpacket tag.
    Reserved(u8),
    /// Private subpacket tag.
    Private(u8),
    /// Unknown subpacket tag.
    Unknown(u8),
}

impl From<u8> for SubpacketTag {
    fn from(u: u8) -> Self {
        match u {
            2 => SubpacketTag::SignatureCreationTime,
            3 => SubpacketTag::SignatureExpirationTime,
            4 => SubpacketTag::ExportableCertification,
            5 => SubpacketTag::TrustSignature,
            6 => SubpacketTag::RegularExpression,
            7 => SubpacketTag::Revocable,
            9 => SubpacketTag::KeyExpirationTime,
            10 => SubpacketTag::PlaceholderForBackwardCompatibility,
            11 => SubpacketTag::PreferredSymmetricAlgorithms,
            12 => SubpacketTag::RevocationKey,
            16 => SubpacketTag::Issuer,
            20 => SubpacketTag::NotationData,
            21 => SubpacketTag::PreferredHashAlgorithms,
            22 => SubpacketTag::PreferredCompressionAlgorithms,
            23 => SubpacketTag::KeyServerPreferences,
            24 => SubpacketTag::PreferredKeyServer,
            25 => SubpacketTag::PrimaryUserID,
            26 => SubpacketTag::PolicyURI,
            27 => SubpacketTag::KeyFlags,
            28 => SubpacketTag::SignersUserID,
            29 => SubpacketTag::ReasonForRevocation,
            30 => SubpacketTag::Features,
            31 => SubpacketTag::SignatureTarget,
            32 => SubpacketTag::EmbeddedSignature,
            33 => SubpacketTag::IssuerFingerprint,
            0| 1| 8| 13| 14| 15| 17| 18| 19 => SubpacketTag::Reserved(u),
            100..=110 => SubpacketTag::Private(u),
            _ => SubpacketTag::Unknown(u),
        }
    }
}

impl From<SubpacketTag> for u8 {
    fn from(t: SubpacketTag) -> Self {
        match t {
            SubpacketTag::SignatureCreationTime => 2,
            SubpacketTag::SignatureExpirationTime => 3,
            SubpacketTag::ExportableCertification => 4,
            SubpacketTag::TrustSignature => 5,
            SubpacketTag::RegularExpression => 6,
            SubpacketTag::Revocable => 7,
            SubpacketTag::KeyExpirationTime => 9,
            SubpacketTag::PlaceholderForBackwardCompatibility => 10,
            SubpacketTag::PreferredSymmetricAlgorithms => 11,
            SubpacketTag::RevocationKey => 12,
            SubpacketTag::Issuer => 16,
            SubpacketTag::NotationData => 20,
            SubpacketTag::PreferredHashAlgorithms => 21,
            SubpacketTag::PreferredCompressionAlgorithms => 22,
            SubpacketTag::KeyServerPreferences => 23,
            SubpacketTag::PreferredKeyServer => 24,
            SubpacketTag::PrimaryUserID => 25,
            SubpacketTag::PolicyURI => 26,
            SubpacketTag::KeyFlags => 27,
            SubpacketTag::SignersUserID => 28,
            SubpacketTag::ReasonForRevocation => 29,
            SubpacketTag::Features => 30,
            SubpacketTag::SignatureTarget => 31,
            SubpacketTag::EmbeddedSignature => 32,
            SubpacketTag::IssuerFingerprint => 33,
            SubpacketTag::Reserved(u) => u,
            SubpacketTag::Private(u) => u,
            SubpacketTag::Unknown(u) => u,
        }
    }
}

impl SubpacketTag {
    /// Returns whether the subpacket's contents are interpreted.
    ///
    /// A critical subpacket whose tag is not understood makes the
    /// whole signature unusable.
    pub fn is_understood(self) -> bool {
        !matches!(self, SubpacketTag::Reserved(_) | SubpacketTag::Private(_)
                  | SubpacketTag::Unknown(_)
                  | SubpacketTag::PlaceholderForBackwardCompatibility)
    }
}

#[cfg(test)]
impl Arbitrary for SubpacketTag {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// A notation on a signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotationData {
    flags: [u8; 4],
    name: Vec<u8>,
    value: Vec<u8>,
}

impl NotationData {
    /// Creates a new notation.
    pub fn new(flags: [u8; 4], name: &[u8], value: &[u8]) -> Self {
        NotationData {
            flags,
            name: name.to_vec(),
            value: value.to_vec(),
        }
    }

    /// Returns the notation's flags.
    pub fn flags(&self) -> &[u8; 4] {
        &self.flags
    }

    /// Returns whether the value is human readable.
    pub fn human_readable(&self) -> bool {
        self.flags[0] & 0x80 != 0
    }

    /// Returns the notation's name.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Returns the notation's value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

/// The value of a subpacket.
///
/// Octet strings (URIs, regular expressions, user IDs) are kept as
/// the raw octets; OpenPGP does not require them to be UTF-8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubpacketValue {
    /// The body of a subpacket that is not interpreted.
    Unknown(Vec<u8>),
    /// 4-octet time field
    SignatureCreationTime(Timestamp),
    /// 4-octet time field
    SignatureExpirationTime(Duration),
    /// 1 octet of exportability, 0 for not, 1 for exportable
    ExportableCertification(bool),
    /// 1 octet "level" (depth), 1 octet of trust amount
    TrustSignature {
        /// Trust level, or depth.
        level: u8,
        /// Trust amount.
        trust: u8,
    },
    /// Null-terminated regular expression
    RegularExpression(Vec<u8>),
    /// 1 octet of revocability, 0 for not, 1 for revocable
    Revocable(bool),
    /// 4-octet time field.
    KeyExpirationTime(Duration),
    /// Array of one-octet values
    PreferredSymmetricAlgorithms(Vec<SymmetricAlgorithm>),
    /// 1 octet of class, 1 octet of public-key algorithm ID, 20 octets
    /// of fingerprint
    RevocationKey {
        /// Class octet, must have bit 0x80 set.
        class: u8,
        /// Public key algorithm of the authorized key.
        pk_algo: PublicKeyAlgorithm,
        /// Fingerprint of the authorized key.
        fp: Fingerprint,
    },
    /// 8-octet Key ID
    Issuer(KeyID),
    /// The notation has a name and a value, each of which are strings
    /// of octets..
    NotationData(NotationData),
    /// Array of one-octet values
    PreferredHashAlgorithms(Vec<HashAlgorithm>),
    /// Array of one-octet values
    PreferredCompressionAlgorithms(Vec<CompressionAlgorithm>),
    /// N octets of flags
    KeyServerPreferences(KeyServerPreferences),
    /// String (URL)
    PreferredKeyServer(Vec<u8>),
    /// 1 octet, Boolean
    PrimaryUserID(bool),
    /// String (URL)
    PolicyURI(Vec<u8>),
    /// N octets of flags
    KeyFlags(KeyFlags),
    /// String
    SignersUserID(Vec<u8>),
    /// 1 octet of revocation code, N octets of reason string
    ReasonForRevocation {
        /// Machine-readable reason for revocation.
        code: ReasonForRevocation,
        /// Human-readable reason for revocation.
        reason: Vec<u8>,
    },
    /// N octets of flags
    Features(Vec<u8>),
    /// 1-octet public-key algorithm, 1-octet hash algorithm, N octets hash
    SignatureTarget {
        /// Public-key algorithm of the target signature.
        pk_algo: PublicKeyAlgorithm,
        /// Hash algorithm of the target signature.
        hash_algo: HashAlgorithm,
        /// Hash digest of the target signature.
        digest: Vec<u8>,
    },
    /// An embedded signature.
    ///
    /// This is a packet rather than a `Signature`, because we also
    /// want to return an `Unknown` packet.
    EmbeddedSignature(Box<Signature>),
    /// 20-octet V4 fingerprint.
    IssuerFingerprint(Fingerprint),
}

impl SubpacketValue {
    /// Returns the subpacket tag for this value.
    ///
    /// Returns `None` for [`SubpacketValue::Unknown`], whose tag is
    /// only known to the enclosing [`Subpacket`].
    pub fn tag(&self) -> Option<SubpacketTag> {
        use self::SubpacketValue::*;
        Some(match self {
            SignatureCreationTime(_) => SubpacketTag::SignatureCreationTime,
            SignatureExpirationTime(_) =>
                SubpacketTag::SignatureExpirationTime,
            ExportableCertification(_) =>
                SubpacketTag::ExportableCertification,
            TrustSignature { .. } => SubpacketTag::TrustSignature,
            RegularExpression(_) => SubpacketTag::RegularExpression,
            Revocable(_) => SubpacketTag::Revocable,
            KeyExpirationTime(_) => SubpacketTag::KeyExpirationTime,
            PreferredSymmetricAlgorithms(_) =>
                SubpacketTag::PreferredSymmetricAlgorithms,
            RevocationKey { .. } => SubpacketTag::RevocationKey,
            Issuer(_) => SubpacketTag::Issuer,
            NotationData(_) => SubpacketTag::NotationData,
            PreferredHashAlgorithms(_) =>
                SubpacketTag::PreferredHashAlgorithms,
            PreferredCompressionAlgorithms(_) =>
                SubpacketTag::PreferredCompressionAlgorithms,
            KeyServerPreferences(_) => SubpacketTag::KeyServerPreferences,
            PreferredKeyServer(_) => SubpacketTag::PreferredKeyServer,
            PrimaryUserID(_) => SubpacketTag::PrimaryUserID,
            PolicyURI(_) => SubpacketTag::PolicyURI,
            KeyFlags(_) => SubpacketTag::KeyFlags,
            SignersUserID(_) => SubpacketTag::SignersUserID,
            ReasonForRevocation { .. } => SubpacketTag::ReasonForRevocation,
            Features(_) => SubpacketTag::Features,
            SignatureTarget { .. } => SubpacketTag::SignatureTarget,
            EmbeddedSignature(_) => SubpacketTag::EmbeddedSignature,
            IssuerFingerprint(_) => SubpacketTag::IssuerFingerprint,
            Unknown(_) => return None,
        })
    }
}

/// Signature subpacket specified by [Section 5.2.3.1 of RFC 4880].
///
/// [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subpacket {
    /// Critical flag.
    critical: bool,
    /// Packet type.
    tag: SubpacketTag,
    /// Packet value, must match packet type.
    value: SubpacketValue,
}

impl Subpacket {
    /// Creates a new subpacket.
    ///
    /// # Errors
    ///
    /// Fails for [`SubpacketValue::Unknown`]; use
    /// [`Subpacket::with_tag`] to create those.
    pub fn new(value: SubpacketValue, critical: bool) -> Result<Subpacket> {
        match value.tag() {
            Some(tag) => Ok(Subpacket { critical, tag, value }),
            None => Err(Error::InvalidArgument(
                "Unknown subpackets need an explicit tag".into()).into()),
        }
    }

    /// Creates a new subpacket with the given tag.
    pub fn with_tag(tag: SubpacketTag, value: SubpacketValue, critical: bool)
                    -> Result<Subpacket>
    {
        match value.tag() {
            Some(t) if t != tag => Err(Error::InvalidArgument(format!(
                "Subpacket value {:?} does not match tag {:?}", t, tag))
                                       .into()),
            _ => Ok(Subpacket { critical, tag, value }),
        }
    }

    /// Returns whether this subpacket is critical.
    pub fn critical(&self) -> bool {
        self.critical
    }

    /// Returns the subpacket's tag.
    pub fn tag(&self) -> SubpacketTag {
        self.tag
    }

    /// Returns the subpacket's value.
    pub fn value(&self) -> &SubpacketValue {
        &self.value
    }
}

/// Subpacket area.
///
/// The area stores the parsed subpackets together with their wire
/// representation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubpacketArea {
    /// The subpackets, in the order they appear in the area.
    packets: Vec<Subpacket>,
    /// The serialized area.
    raw: Vec<u8>,
}

impl SubpacketArea {
    /// Returns a new subpacket area containing the given packets.
    pub fn new(packets: Vec<Subpacket>) -> Result<SubpacketArea> {
        let mut area = SubpacketArea::default();
        for p in packets {
            area.add(p)?;
        }
        Ok(area)
    }

    /// Returns an empty subpacket area.
    pub fn empty() -> SubpacketArea {
        SubpacketArea::default()
    }

    /// Creates an area from already parsed subpackets and the octets
    /// they were parsed from.
    pub(crate) fn from_parsed(packets: Vec<Subpacket>, raw: Vec<u8>)
                              -> SubpacketArea {
        SubpacketArea { packets, raw }
    }

    /// Returns the area's serialized form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Iterates over the subpackets.
    pub fn iter(&self) -> std::slice::Iter<Subpacket> {
        self.packets.iter()
    }

    /// Returns the number of subpackets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Returns whether the area is empty.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Returns the *last* instance of the specified subpacket.
    pub fn lookup(&self, tag: SubpacketTag) -> Option<&Subpacket> {
        self.packets.iter().rev().find(|sp| sp.tag == tag)
    }

    /// Returns the value of the *last* instance of the specified
    /// subpacket.
    fn value(&self, tag: SubpacketTag) -> Option<&SubpacketValue> {
        self.lookup(tag).map(|sp| &sp.value)
    }

    /// Adds the given subpacket.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPacket` if adding the packet makes
    /// the subpacket area exceed the size limit.
    pub fn add(&mut self, packet: Subpacket) -> Result<()> {
        let bytes = packet.to_vec()?;
        if self.raw.len() + bytes.len() > ::std::u16::MAX as usize {
            return Err(Error::MalformedPacket(
                "Subpacket area exceeds maximum size".into()).into());
        }
        self.raw.extend_from_slice(&bytes);
        self.packets.push(packet);
        Ok(())
    }

    /// Removes all subpackets with the given tag.
    ///
    /// The remaining subpackets are reserialized.
    pub fn remove_all(&mut self, tag: SubpacketTag) -> Result<()> {
        let packets = std::mem::take(&mut self.packets);
        self.raw.clear();
        for p in packets.into_iter().filter(|p| p.tag != tag) {
            self.add(p)?;
        }
        Ok(())
    }

    /// Returns the value of the Creation Time subpacket.
    pub fn signature_creation_time(&self) -> Option<Timestamp> {
        match self.value(SubpacketTag::SignatureCreationTime) {
            Some(SubpacketValue::SignatureCreationTime(t)) => Some(*t),
            _ => None,
        }
    }

    /// Returns the value of the Signature Expiration Time subpacket.
    ///
    /// A value of zero means the signature does not expire, and is
    /// returned as `None`.
    pub fn signature_expiration_time(&self) -> Option<Duration> {
        match self.value(SubpacketTag::SignatureExpirationTime) {
            Some(SubpacketValue::SignatureExpirationTime(d))
                if d.as_secs() > 0 => Some(*d),
            _ => None,
        }
    }

    /// Returns the value of the Exportable Certification subpacket.
    pub fn exportable_certification(&self) -> Option<bool> {
        match self.value(SubpacketTag::ExportableCertification) {
            Some(SubpacketValue::ExportableCertification(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value of the Trust Signature subpacket as `(level,
    /// amount)`.
    pub fn trust_signature(&self) -> Option<(u8, u8)> {
        match self.value(SubpacketTag::TrustSignature) {
            Some(SubpacketValue::TrustSignature { level, trust }) =>
                Some((*level, *trust)),
            _ => None,
        }
    }

    /// Returns the value of the Revocable subpacket.
    pub fn revocable(&self) -> Option<bool> {
        match self.value(SubpacketTag::Revocable) {
            Some(SubpacketValue::Revocable(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value of the Key Expiration Time subpacket.
    ///
    /// A value of zero means the key does not expire, and is
    /// returned as `None`.
    pub fn key_expiration_time(&self) -> Option<Duration> {
        match self.value(SubpacketTag::KeyExpirationTime) {
            Some(SubpacketValue::KeyExpirationTime(d))
                if d.as_secs() > 0 => Some(*d),
            _ => None,
        }
    }

    /// Returns the value of the Preferred Symmetric Algorithms
    /// subpacket.
    pub fn preferred_symmetric_algorithms(&self)
                                          -> Option<&[SymmetricAlgorithm]> {
        match self.value(SubpacketTag::PreferredSymmetricAlgorithms) {
            Some(SubpacketValue::PreferredSymmetricAlgorithms(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Issuer subpacket.
    pub fn issuer(&self) -> Option<&KeyID> {
        match self.value(SubpacketTag::Issuer) {
            Some(SubpacketValue::Issuer(id)) => Some(id),
            _ => None,
        }
    }

    /// Returns all Notation Data subpackets.
    pub fn notation_data(&self) -> Vec<&NotationData> {
        self.packets.iter()
            .filter_map(|sp| match &sp.value {
                SubpacketValue::NotationData(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    /// Returns the value of the Preferred Hash Algorithms subpacket.
    pub fn preferred_hash_algorithms(&self) -> Option<&[HashAlgorithm]> {
        match self.value(SubpacketTag::PreferredHashAlgorithms) {
            Some(SubpacketValue::PreferredHashAlgorithms(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Preferred Compression Algorithms
    /// subpacket.
    pub fn preferred_compression_algorithms(&self)
                                            -> Option<&[CompressionAlgorithm]>
    {
        match self.value(SubpacketTag::PreferredCompressionAlgorithms) {
            Some(SubpacketValue::PreferredCompressionAlgorithms(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Key Server Preferences subpacket.
    pub fn key_server_preferences(&self) -> Option<&KeyServerPreferences> {
        match self.value(SubpacketTag::KeyServerPreferences) {
            Some(SubpacketValue::KeyServerPreferences(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Preferred Key Server subpacket.
    pub fn preferred_key_server(&self) -> Option<&[u8]> {
        match self.value(SubpacketTag::PreferredKeyServer) {
            Some(SubpacketValue::PreferredKeyServer(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Primary UserID subpacket.
    pub fn primary_userid(&self) -> Option<bool> {
        match self.value(SubpacketTag::PrimaryUserID) {
            Some(SubpacketValue::PrimaryUserID(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value of the Policy URI subpacket.
    pub fn policy_uri(&self) -> Option<&[u8]> {
        match self.value(SubpacketTag::PolicyURI) {
            Some(SubpacketValue::PolicyURI(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Key Flags subpacket.
    pub fn key_flags(&self) -> Option<&KeyFlags> {
        match self.value(SubpacketTag::KeyFlags) {
            Some(SubpacketValue::KeyFlags(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Signer's UserID subpacket.
    pub fn signers_user_id(&self) -> Option<&[u8]> {
        match self.value(SubpacketTag::SignersUserID) {
            Some(SubpacketValue::SignersUserID(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Reason for Revocation subpacket.
    pub fn reason_for_revocation(&self)
                                 -> Option<(ReasonForRevocation, &[u8])> {
        match self.value(SubpacketTag::ReasonForRevocation) {
            Some(SubpacketValue::ReasonForRevocation { code, reason }) =>
                Some((*code, reason)),
            _ => None,
        }
    }

    /// Returns the value of the Features subpacket.
    pub fn features(&self) -> Option<&[u8]> {
        match self.value(SubpacketTag::Features) {
            Some(SubpacketValue::Features(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the value of the Embedded Signature subpacket.
    pub fn embedded_signature(&self) -> Option<&Signature> {
        match self.value(SubpacketTag::EmbeddedSignature) {
            Some(SubpacketValue::EmbeddedSignature(sig)) => Some(sig),
            _ => None,
        }
    }

    /// Returns the value of the Issuer Fingerprint subpacket.
    pub fn issuer_fingerprint(&self) -> Option<&Fingerprint> {
        match self.value(SubpacketTag::IssuerFingerprint) {
            Some(SubpacketValue::IssuerFingerprint(v)) => Some(v),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a SubpacketArea {
    type Item = &'a Subpacket;
    type IntoIter = std::slice::Iter<'a, Subpacket>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn tag_roundtrip(tag: SubpacketTag) -> bool {
            let val: u8 = tag.into();
            tag == SubpacketTag::from(val)
        }
    }

    #[test]
    fn lookup_returns_last_instance() {
        let area = SubpacketArea::new(vec![
            Subpacket::new(SubpacketValue::PrimaryUserID(false), false)
                .unwrap(),
            Subpacket::new(SubpacketValue::KeyFlags(KeyFlags::encrypt()),
                           false).unwrap(),
            Subpacket::new(SubpacketValue::PrimaryUserID(true), true)
                .unwrap(),
        ]).unwrap();

        assert_eq!(area.len(), 3);
        assert_eq!(area.primary_userid(), Some(true));
        assert_eq!(area.key_flags(), Some(&KeyFlags::encrypt()));
        assert!(area.issuer().is_none());
    }

    #[test]
    fn raw_bytes_track_packets() {
        let mut area = SubpacketArea::empty();
        area.add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(1_000_000.into()), false)
                 .unwrap()).unwrap();
        assert_eq!(area.as_bytes(), &[5, 2, 0, 0x0f, 0x42, 0x40]);

        area.add(Subpacket::new(
            SubpacketValue::Issuer(KeyID::from(0x0102030405060708u64)), false)
                 .unwrap()).unwrap();
        assert_eq!(area.as_bytes().len(), 6 + 10);

        area.remove_all(SubpacketTag::SignatureCreationTime).unwrap();
        assert_eq!(area.as_bytes(), &[9, 16, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(area.signature_creation_time().is_none());
    }

    #[test]
    fn zero_durations_do_not_expire() {
        let area = SubpacketArea::new(vec![
            Subpacket::new(SubpacketValue::KeyExpirationTime(
                Duration::seconds(0)), false).unwrap(),
        ]).unwrap();
        assert!(area.key_expiration_time().is_none());
    }

    #[test]
    fn unknown_needs_tag() {
        assert!(Subpacket::new(SubpacketValue::Unknown(vec![1]), false)
                .is_err());
        let sp = Subpacket::with_tag(SubpacketTag::Private(100),
                                     SubpacketValue::Unknown(vec![1]), true)
            .unwrap();
        assert!(sp.critical());
        assert!(!sp.tag().is_understood());
        assert!(Subpacket::with_tag(SubpacketTag::Issuer,
                                    SubpacketValue::PrimaryUserID(true), false)
                .is_err());
    }
}
