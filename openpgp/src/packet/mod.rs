//! Packet-related types.
//!
//! Only the packets that make up transferable keys are modelled:
//! keys and subkeys (public and secret), user IDs, user attributes,
//! signatures and trust packets.  Everything else is carried as an
//! [`Unknown`] packet.
//!
//! See [Section 4 of RFC 4880] for more details.
//!
//!   [Section 4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4

use std::fmt;

mod tag;
pub use self::tag::Tag;
pub mod header;
pub use self::header::Header;

mod unknown;
pub use self::unknown::Unknown;
pub mod signature;
pub use self::signature::Signature;
pub mod key;
pub use self::key::Key;
mod trust;
pub use self::trust::Trust;
mod userid;
pub use self::userid::UserID;
mod user_attribute;
pub use self::user_attribute::UserAttribute;

/// The OpenPGP packets this crate understands.
///
/// The key packets share the [`Key`] type; the variant records
/// which of the four key packet types it was (or will be) serialized
/// as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    /// Unknown packet, or a packet that failed to parse.
    Unknown(Unknown),
    /// Signature packet.
    Signature(Signature),
    /// Public key packet.
    PublicKey(Key),
    /// Public subkey packet.
    PublicSubkey(Key),
    /// Public/Secret key pair.
    SecretKey(Key),
    /// Public/Secret subkey pair.
    SecretSubkey(Key),
    /// Trust packet.
    Trust(Trust),
    /// User ID packet.
    UserID(UserID),
    /// User attribute packet.
    UserAttribute(UserAttribute),
}

impl Packet {
    /// Returns the `Packet's` corresponding OpenPGP tag.
    ///
    /// For an unknown packet, this is the tag it was read with.
    pub fn tag(&self) -> Tag {
        match self {
            Packet::Unknown(packet) => packet.tag(),
            Packet::Signature(_) => Tag::Signature,
            Packet::PublicKey(_) => Tag::PublicKey,
            Packet::PublicSubkey(_) => Tag::PublicSubkey,
            Packet::SecretKey(_) => Tag::SecretKey,
            Packet::SecretSubkey(_) => Tag::SecretSubkey,
            Packet::Trust(_) => Tag::Trust,
            Packet::UserID(_) => Tag::UserID,
            Packet::UserAttribute(_) => Tag::UserAttribute,
        }
    }

    /// Returns the parsed packet's corresponding OpenPGP tag.
    ///
    /// Unlike [`Packet::tag`], this returns `None` for unknown
    /// packets.
    pub fn kind(&self) -> Option<Tag> {
        match self {
            Packet::Unknown(_) => None,
            _ => Some(self.tag()),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Packet::Unknown(u) => write!(f, "{} (unparsed)", u.tag()),
            Packet::Signature(s) => write!(f, "{} signature", s.typ()),
            Packet::PublicKey(k) | Packet::PublicSubkey(k)
                | Packet::SecretKey(k) | Packet::SecretSubkey(k) =>
                write!(f, "{} {}", self.tag(), k.fingerprint()),
            Packet::Trust(t) => write!(f, "Trust {:?}", t.value()),
            Packet::UserID(u) => write!(f, "User ID {}", u),
            Packet::UserAttribute(_) => f.write_str("User attribute"),
        }
    }
}

impl From<Unknown> for Packet {
    fn from(p: Unknown) -> Self {
        Packet::Unknown(p)
    }
}

impl From<Signature> for Packet {
    fn from(p: Signature) -> Self {
        Packet::Signature(p)
    }
}

impl From<Trust> for Packet {
    fn from(p: Trust) -> Self {
        Packet::Trust(p)
    }
}

impl From<UserID> for Packet {
    fn from(p: UserID) -> Self {
        Packet::UserID(p)
    }
}

impl From<UserAttribute> for Packet {
    fn from(p: UserAttribute) -> Self {
        Packet::UserAttribute(p)
    }
}
