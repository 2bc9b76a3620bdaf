//! OpenPGP packet headers.
//!
//! See [Section 4.2 of RFC 4880] for more details.
//!
//!   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2

use std::convert::TryFrom;

use crate::{
    Error,
    Result,
};
use crate::packet::Tag;

/// The length type of an old format CTB.
///
/// See [Section 4.2.1 of RFC 4880] for more details.
///
///   [Section 4.2.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketLengthType {
    /// A one-octet length.
    OneOctet,
    /// A two-octet length.
    TwoOctets,
    /// A four-octet length.
    FourOctets,
    /// The packet extends until the end of the stream.
    Indeterminate,
}

impl From<u8> for PacketLengthType {
    fn from(u: u8) -> Self {
        match u & 0b11 {
            0 => PacketLengthType::OneOctet,
            1 => PacketLengthType::TwoOctets,
            2 => PacketLengthType::FourOctets,
            _ => PacketLengthType::Indeterminate,
        }
    }
}

/// A Cipher Type Byte.
///
/// OpenPGP defines two packet formats: the old and the new format.
/// They both include the packet's so-called tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CTB {
    /// New (current) format CTB.
    New(Tag),
    /// Old format CTB.
    Old(Tag, PacketLengthType),
}

impl CTB {
    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        match self {
            CTB::New(tag) => *tag,
            CTB::Old(tag, _) => *tag,
        }
    }
}

impl TryFrom<u8> for CTB {
    type Error = anyhow::Error;

    /// Parses a CTB as described in [Section 4.2 of RFC 4880].  Both
    /// new and old format CTBs are recognized.
    ///
    ///   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2
    fn try_from(ptag: u8) -> Result<CTB> {
        // The top bit of the ptag must be set.
        if ptag & 0b1000_0000 == 0 {
            return Err(Error::MalformedHeader(
                format!("Malformed CTB: MSB of ptag ({:#010b}) not set",
                        ptag)).into());
        }

        let ctb = if ptag & 0b0100_0000 != 0 {
            CTB::New((ptag & 0b0011_1111).into())
        } else {
            CTB::Old(((ptag & 0b0011_1100) >> 2).into(),
                     PacketLengthType::from(ptag))
        };

        if ctb.tag() == Tag::Reserved {
            return Err(Error::MalformedHeader(
                "Packet tag 0 is reserved".into()).into());
        }

        Ok(ctb)
    }
}

/// The size of a packet.
///
/// A packet's size can be expressed in three different ways.  Either
/// the size of the packet is fully known (Full), the packet is
/// chunked using OpenPGP's partial body encoding (Partial), or the
/// packet extends to the end of the file (Indeterminate).  See
/// [Section 4.2 of RFC 4880] for more details.
///
///   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    /// Packet size is fully known.
    Full(u32),
    /// The parameter is the number of bytes in the current chunk.
    /// This type is only used with new format packets.
    Partial(u32),
    /// The packet extends until an EOF is encountered.  This type is
    /// only used with old format packets.
    Indeterminate,
}

impl BodyLength {
    /// Returns the encoded size of a new format length.
    pub(crate) fn serialized_len(&self) -> Result<usize> {
        match self {
            BodyLength::Full(l) if *l < 192 => Ok(1),
            BodyLength::Full(l) if *l < 8384 => Ok(2),
            BodyLength::Full(_) => Ok(5),
            BodyLength::Partial(_) => Ok(1),
            BodyLength::Indeterminate => Err(Error::InvalidArgument(
                "Indeterminate lengths are not supported in new \
                 format packets".into()).into()),
        }
    }
}

/// An OpenPGP packet's header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    ctb: CTB,
    length: BodyLength,
}

impl Header {
    /// Creates a new header.
    pub fn new(ctb: CTB, length: BodyLength) -> Self {
        Header { ctb, length }
    }

    /// Returns the packet's CTB.
    pub fn ctb(&self) -> &CTB {
        &self.ctb
    }

    /// Returns the packet's length.
    pub fn length(&self) -> &BodyLength {
        &self.length
    }

    /// Syntax checks the header.
    ///
    /// Partial body lengths are only allowed for data packets, and
    /// their first chunk must be at least 512 octets long.  In
    /// lenient mode a short first chunk is tolerated.
    ///
    /// This function does not check the packet's content.
    pub fn valid(&self, strict: bool) -> Result<()> {
        let tag = self.ctb.tag();

        if let BodyLength::Partial(l) = self.length {
            if strict && ! tag.is_data() {
                return Err(Error::MalformedHeader(
                    format!("Partial body chunking not allowed \
                             for {} packets", tag)).into());
            }
            if strict && l < 512 {
                return Err(Error::MalformedHeader(
                    format!("Partial body length must be \
                             at least 512 (got: {})", l)).into());
            }
        }

        Ok(())
    }
}
