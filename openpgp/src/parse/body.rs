//! Bounded parsing of packet bodies.
//!
//! The packet framing has already been processed and the body
//! buffered, so every read is checked against the body's declared
//! length.  A read that would cross the end of the body fails with
//! [`Error::PacketBoundary`].

use crate::{
    Error,
    Result,
};
use crate::crypto::mpi::{MPI, ProtectedMPI};
use crate::packet::Tag;

/// A cursor over a packet body.
#[derive(Debug)]
pub(crate) struct BodyParser<'a> {
    tag: Tag,
    data: &'a [u8],
    offset: usize,
}

impl<'a> BodyParser<'a> {
    /// Creates a parser for the body of a `tag` packet.
    pub fn new(tag: Tag, data: &'a [u8]) -> Self {
        BodyParser { tag, data, offset: 0 }
    }

    /// Returns the tag of the packet being parsed.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the number of octets consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of octets left.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Returns whether the whole body has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, field: &'static str, amount: usize)
            -> Result<&'a [u8]> {
        if amount > self.remaining() {
            return Err(Error::PacketBoundary {
                tag: self.tag,
                field,
                wanted: amount,
                available: self.remaining(),
            }.into());
        }
        let data = &self.data[self.offset..self.offset + amount];
        self.offset += amount;
        Ok(data)
    }

    pub fn parse_u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.take(field, 1)?[0])
    }

    pub fn parse_be_u16(&mut self, field: &'static str) -> Result<u16> {
        let b = self.take(field, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn parse_be_u32(&mut self, field: &'static str) -> Result<u32> {
        let b = self.take(field, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn parse_bool(&mut self, field: &'static str) -> Result<bool> {
        match self.parse_u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(Error::MalformedPacket(
                format!("Invalid value for bool {}: {}", field, n)).into()),
        }
    }

    pub fn parse_bytes(&mut self, field: &'static str, amount: usize)
                       -> Result<&'a [u8]> {
        self.take(field, amount)
    }

    pub fn parse_bytes_eof(&mut self, field: &'static str) -> Result<&'a [u8]> {
        let amount = self.remaining();
        self.take(field, amount)
    }

    /// Reads the octets of an MPI, as described in [Section 3.2 of
    /// RFC 4880].
    ///
    ///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
    fn parse_mpi_bytes(&mut self, field: &'static str) -> Result<&'a [u8]> {
        let bits = self.parse_be_u16(field)? as usize;
        let bytes = (bits + 7) / 8;
        let value = self.take(field, bytes)?;

        // The leading octet may not have bits set above the
        // declared length.  Leading zeros are tolerated.
        if let Some(&first) = value.first() {
            let unused = bytes * 8 - bits;
            if unused > 0 && first >> (8 - unused) != 0 {
                return Err(Error::MalformedMPI(format!(
                    "{}: {} bits declared, but the value is longer",
                    field, bits)).into());
            }
        }
        Ok(value)
    }

    pub fn parse_mpi(&mut self, field: &'static str) -> Result<MPI> {
        Ok(MPI::new(self.parse_mpi_bytes(field)?))
    }

    pub fn parse_protected_mpi(&mut self, field: &'static str)
                               -> Result<ProtectedMPI> {
        Ok(ProtectedMPI::from(self.parse_mpi_bytes(field)?))
    }

    /// Fails unless the whole body has been consumed.
    pub fn finish(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::MalformedPacket(format!(
                "{} octets of trailing data in {} packet",
                self.remaining(), self.tag)).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        let data = [1, 2, 3, 4, 5];
        let mut p = BodyParser::new(Tag::Signature, &data);
        assert_eq!(p.parse_u8("version").unwrap(), 1);
        assert_eq!(p.parse_be_u16("length").unwrap(), 0x0203);
        assert!(p.finish().is_err());

        let e = p.parse_be_u32("creation time").unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::PacketBoundary {
            tag: Tag::Signature,
            field: "creation time",
            wanted: 4,
            available: 2,
        }));
        // A failed read consumes nothing.
        assert_eq!(p.remaining(), 2);
        assert_eq!(p.parse_bytes_eof("rest").unwrap(), &[4, 5]);
        assert!(p.finish().is_ok());
    }

    #[test]
    fn mpis() {
        let data = [0, 9, 0x01, 0xff, 0, 8, 0x01];
        let mut p = BodyParser::new(Tag::PublicKey, &data);
        let m = p.parse_mpi("n").unwrap();
        assert_eq!(m.bits(), 9);
        // A leading zero in an 8 bit MPI is tolerated.
        assert_eq!(p.parse_mpi("e").unwrap().value(), &[1]);

        let data = [0, 9, 0xff, 0xff];
        let mut p = BodyParser::new(Tag::PublicKey, &data);
        let e = p.parse_mpi("n").unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::MalformedMPI(_))));

        let data = [0, 64, 1];
        let mut p = BodyParser::new(Tag::PublicKey, &data);
        let e = p.parse_mpi("n").unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::PacketBoundary { .. })));
    }
}
