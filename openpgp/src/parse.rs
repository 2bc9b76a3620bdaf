//! Packet parsing infrastructure.
//!
//! OpenPGP defines a binary representation suitable for storing and
//! communicating OpenPGP data structures (see [Section 3 ff. of RFC
//! 4880]).  This module converts a stream of packets into typed
//! [`Event`]s.
//!
//! The [`PacketParser`] reads one packet at a time from a
//! [`BufferedReader`] stack.  Each packet's header is decoded, its
//! body is read in full, and the body is then parsed by a bounded
//! body parser that can never read past the declared length.
//! [`PacketParser::dispatch`] turns each packet into events and hands
//! them to a [`Handler`], which decides whether the raw packet is
//! retained.
//!
//! Transport encodings (e.g. ASCII armor) are supported by pushing a
//! [`BufferedReader`] filter in front of the parser, see
//! [`PacketParser::push_filter`].
//!
//! For single packets the [`Parse`] trait is more convenient.
//!
//!   [Section 3 ff. of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3
//!   [`BufferedReader`]: buffered_reader::BufferedReader

use std::convert::TryFrom;
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use buffered_reader::BufferedReader;

use crate::{
    Error,
    Packet,
    Result,
};
use crate::crypto::S2K;
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
use crate::packet::signature::subpacket::Subpacket;

pub(crate) mod body;
mod mpis;
pub(crate) mod packets;

use self::body::BodyParser;

/// Parsing of packets and related structures.
///
/// This is a uniform interface to parse packets, messages, keys, and
/// related data structures.
pub trait Parse<'a, T> {
    /// Reads from the given reader.
    fn from_reader<R: 'a + Read + Send + Sync>(reader: R) -> Result<T>;

    /// Reads from the given file.
    ///
    /// The default implementation just uses [`from_reader(..)`], but
    /// implementations can provide their own specialized version.
    ///
    /// [`from_reader(..)`]: Parse::from_reader
    fn from_file<P: AsRef<Path>>(path: P) -> Result<T> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Reads from the given slice.
    ///
    /// The default implementation just uses [`from_reader(..)`], but
    /// implementations can provide their own specialized version.
    ///
    /// [`from_reader(..)`]: Parse::from_reader
    fn from_bytes<D: AsRef<[u8]> + ?Sized>(data: &'a D) -> Result<T> {
        Self::from_reader(io::Cursor::new(data.as_ref()))
    }
}

// Implements `Parse` for a packet type by parsing exactly one framed
// packet.
macro_rules! impl_parse_packet {
    ($typ:ident, $($variant:ident),+) => {
        impl<'a> Parse<'a, $typ> for $typ {
            fn from_reader<R: 'a + Read + Send + Sync>(reader: R)
                                                      -> Result<Self> {
                let mut pp = PacketParser::from_reader(reader);
                let packet = match pp.next()? {
                    Some(pp) => pp.into_parts().0,
                    None => return Err(Error::MalformedPacket(
                        "No packet found".into()).into()),
                };
                if pp.next()?.is_some() {
                    return Err(Error::MalformedPacket(
                        "Additional packets found".into()).into());
                }

                match packet {
                    $(Packet::$variant(p) => Ok(p),)+
                    p => Err(Error::InvalidArgument(format!(
                        "Expected a {}, got: {}", stringify!($typ), p.tag()))
                             .into()),
                }
            }
        }
    };
}

impl_parse_packet!(Signature, Signature);
impl_parse_packet!(Key, PublicKey, PublicSubkey, SecretKey, SecretSubkey);
impl_parse_packet!(UserID, UserID);
impl_parse_packet!(UserAttribute, UserAttribute);
impl_parse_packet!(Trust, Trust);

impl<'a> Parse<'a, S2K> for S2K {
    /// Reads a naked S2K specifier.
    fn from_reader<R: 'a + Read + Send + Sync>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let mut php = BodyParser::new(Tag::SecretKey, &buf);
        let s2k = S2K::parse_body(&mut php)?;
        php.finish()?;
        Ok(s2k)
    }
}

/// Parses a sequence of framed packets.
///
/// Parsing is strict; see [`PacketParser`] for more control.
pub fn packets_from_bytes<D: AsRef<[u8]> + ?Sized>(data: &D)
                                                   -> Result<Vec<Packet>> {
    let mut pp = PacketParser::from_bytes(data);
    let mut packets = Vec::new();
    while let Some(p) = pp.next()? {
        packets.push(p.into_parts().0);
    }
    Ok(packets)
}

/// The cookie attached to every reader of a parser's reader stack.
///
/// The level counts the filters pushed on top of the original
/// source.
#[derive(Debug, Default)]
pub struct Cookie {
    level: usize,
}

impl Cookie {
    /// Returns the reader's position in the filter stack.
    pub fn level(&self) -> usize {
        self.level
    }
}

/// Parser settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    /// In strict mode malformed packets abort the parse.  Otherwise
    /// they are turned into [`Unknown`] packets carrying the error.
    ///
    ///   [`Unknown`]: crate::packet::Unknown
    pub strict: bool,
    /// Packets with a larger body are rejected (strict) or skipped
    /// (lenient).
    pub max_packet_size: u32,
    /// Whether [`Event::Subpacket`] events are emitted for
    /// signatures.
    pub emit_subpackets: bool,
}

/// The default maximum packet size: 1 MiB.
pub const DEFAULT_MAX_PACKET_SIZE: u32 = 1 << 20;

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            strict: true,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            emit_subpackets: true,
        }
    }
}

impl ParserConfig {
    /// Returns a lenient configuration.
    pub fn lenient() -> Self {
        ParserConfig::default().strict(false)
    }

    /// Sets whether the parser is strict.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the maximum packet size.
    pub fn max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Sets whether subpacket events are emitted.
    pub fn emit_subpackets(mut self, emit: bool) -> Self {
        self.emit_subpackets = emit;
        self
    }
}

/// The octets a packet was parsed from, header included.
///
/// The buffer is reference counted, so retaining it is cheap and it
/// stays valid for as long as anyone holds on to it.
#[derive(Clone, PartialEq, Eq)]
pub struct RawPacket {
    tag: Tag,
    bytes: Arc<[u8]>,
}

impl fmt::Debug for RawPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = &self.bytes[..self.bytes.len().min(16)];
        f.debug_struct("RawPacket")
            .field("tag", &self.tag)
            .field("len", &self.bytes.len())
            .field("bytes", &crate::conversions::to_hex(prefix, false))
            .finish()
    }
}

impl RawPacket {
    pub(crate) fn new(tag: Tag, bytes: Vec<u8>) -> Self {
        RawPacket { tag, bytes: bytes.into() }
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the raw octets.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns a shared handle to the raw octets.
    pub fn shared(&self) -> Arc<[u8]> {
        self.bytes.clone()
    }

    /// Returns the number of raw octets.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns whether there are no raw octets.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A parsed packet together with its header and raw octets.
#[derive(Clone, Debug)]
pub struct ParsedPacket {
    header: Header,
    packet: Packet,
    raw: RawPacket,
}

impl ParsedPacket {
    /// Returns the packet's header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the packet.
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    /// Returns the raw octets.
    pub fn raw(&self) -> &RawPacket {
        &self.raw
    }

    /// Returns the packet and its raw octets.
    pub fn into_parts(self) -> (Packet, RawPacket) {
        (self.packet, self.raw)
    }
}

/// What the parser reports to a [`Handler`].
///
/// Every packet results in one packet event, followed, for
/// signatures, by one [`Event::Subpacket`] for each hashed and then
/// each unhashed subpacket, and finally an [`Event::PacketEnd`].
#[derive(Clone, Debug)]
pub enum Event {
    /// A public key packet.
    PublicKey(Key),
    /// A public subkey packet.
    PublicSubkey(Key),
    /// A secret key packet.
    SecretKey(Key),
    /// A secret subkey packet.
    SecretSubkey(Key),
    /// A user ID packet.
    UserID(UserID),
    /// A user attribute packet.
    UserAttribute(UserAttribute),
    /// A signature packet.
    Signature(Signature),
    /// A subpacket of the preceding signature.
    Subpacket {
        /// Whether the subpacket is in the hashed area.
        hashed: bool,
        /// The subpacket.
        subpacket: Subpacket,
    },
    /// A trust packet.
    Trust(Trust),
    /// A packet that is not understood, or failed to parse in
    /// lenient mode.
    Unknown(Unknown),
    /// The end of the current packet.
    PacketEnd(RawPacket),
}

impl From<Packet> for Event {
    fn from(p: Packet) -> Self {
        match p {
            Packet::PublicKey(k) => Event::PublicKey(k),
            Packet::PublicSubkey(k) => Event::PublicSubkey(k),
            Packet::SecretKey(k) => Event::SecretKey(k),
            Packet::SecretSubkey(k) => Event::SecretSubkey(k),
            Packet::UserID(u) => Event::UserID(u),
            Packet::UserAttribute(u) => Event::UserAttribute(u),
            Packet::Signature(s) => Event::Signature(s),
            Packet::Trust(t) => Event::Trust(t),
            Packet::Unknown(u) => Event::Unknown(u),
        }
    }
}

/// A handler's verdict on an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Drop the raw packet.
    Release,
    /// Keep the raw packet.
    Retain,
    /// Stop parsing immediately.
    Finished,
}

/// Consumes parser events.
pub trait Handler {
    /// Handles an event.
    ///
    /// The return value only matters for [`Event::PacketEnd`], with
    /// the exception of [`Dispatch::Finished`], which stops the
    /// parser after any event.
    fn handle(&mut self, event: Event) -> Result<Dispatch>;
}

impl<F> Handler for F
    where F: FnMut(Event) -> Result<Dispatch>
{
    fn handle(&mut self, event: Event) -> Result<Dispatch> {
        self(event)
    }
}

/// Statistics of a [`PacketParser::dispatch`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Number of packets parsed.
    pub packets: usize,
    /// Number of packets the handler retained.
    pub retained: usize,
    /// Number of packets the handler released.
    pub released: usize,
    /// Number of unknown or unparsable packets.
    pub unknown: usize,
    /// Whether the handler stopped the parse.
    pub finished_early: bool,
}

/// The result of reading a packet body.
struct BodyRead {
    body: Vec<u8>,
    truncated: bool,
    oversized: bool,
}

/// A streaming OpenPGP packet parser.
///
/// # Examples
///
/// ```
/// use openpgp_keyring as openpgp;
/// use openpgp::parse::{Dispatch, Event, PacketParser};
///
/// # fn main() -> openpgp::Result<()> {
/// // A user ID packet.
/// let data = b"\xcd\x05Alice";
/// let mut userids = Vec::new();
/// let summary = PacketParser::from_bytes(&data[..])
///     .dispatch(&mut |event: Event| {
///         if let Event::UserID(u) = event {
///             userids.push(u);
///         }
///         Ok(Dispatch::Release)
///     })?;
/// assert_eq!(summary.packets, 1);
/// assert_eq!(userids[0].value(), b"Alice");
/// # Ok(()) }
/// ```
pub struct PacketParser<'a> {
    reader: Box<dyn BufferedReader<Cookie> + 'a>,
    config: ParserConfig,
    /// Number of packets parsed so far.
    packets: usize,
    /// Set on EOF, and when a lenient parse gives up.
    finished: bool,
}

impl<'a> fmt::Debug for PacketParser<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PacketParser")
            .field("config", &self.config)
            .field("packets", &self.packets)
            .field("level", &self.reader.cookie_ref().level)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<'a> PacketParser<'a> {
    /// Creates a parser over an existing reader stack.
    pub fn from_buffered_reader(reader: Box<dyn BufferedReader<Cookie> + 'a>)
                                -> Self {
        PacketParser {
            reader,
            config: ParserConfig::default(),
            packets: 0,
            finished: false,
        }
    }

    /// Creates a parser over `data`.
    pub fn from_bytes<D: AsRef<[u8]> + ?Sized>(data: &'a D) -> Self {
        Self::from_buffered_reader(Box::new(
            buffered_reader::Memory::with_cookie(data.as_ref(),
                                                 Cookie::default())))
    }

    /// Creates a parser over `reader`.
    pub fn from_reader<R: 'a + Read + Send + Sync>(reader: R) -> Self {
        Self::from_buffered_reader(Box::new(
            buffered_reader::Generic::with_cookie(reader, None,
                                                  Cookie::default())))
    }

    /// Creates a parser over the file at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PacketParser<'static>> {
        let file = std::fs::File::open(path)?;
        Ok(PacketParser::from_reader(file))
    }

    /// Replaces the parser's configuration.
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the parser's configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut ParserConfig {
        &mut self.config
    }

    /// Returns the number of packets parsed so far.
    pub fn packets_parsed(&self) -> usize {
        self.packets
    }

    /// Returns the number of filters pushed.
    pub fn filter_depth(&self) -> usize {
        self.reader.cookie_ref().level
    }

    /// Pushes a filter on top of the reader stack.
    ///
    /// `filter` receives the current reader and returns the reader
    /// to parse from.  This is the hook for transport encodings, like
    /// ASCII armor.
    pub fn push_filter<F>(&mut self, filter: F)
        where F: FnOnce(Box<dyn BufferedReader<Cookie> + 'a>)
                        -> Box<dyn BufferedReader<Cookie> + 'a>
    {
        tracer!("PacketParser::push_filter");

        let level = self.reader.cookie_ref().level;
        let inner = std::mem::replace(
            &mut self.reader,
            Box::new(buffered_reader::EOF::with_cookie(Cookie::default())));
        self.reader = filter(inner);
        self.reader.cookie_mut().level = level + 1;
        self.finished = false;
        t!("pushed filter, now at level {}", level + 1);
    }

    /// Removes the filter pushed last.
    ///
    /// Data buffered by the filter but not yet parsed is lost.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOperation` if no filter was pushed.
    pub fn pop_filter(&mut self) -> Result<()> {
        tracer!("PacketParser::pop_filter");

        let level = self.reader.cookie_ref().level;
        if level == 0 {
            return Err(Error::InvalidOperation(
                "No filter to pop".into()).into());
        }

        let outer = std::mem::replace(
            &mut self.reader,
            Box::new(buffered_reader::EOF::with_cookie(Cookie::default())));
        match outer.into_inner() {
            Some(inner) => {
                self.reader = inner;
                self.finished = false;
                t!("popped filter, now at level {}", level - 1);
                Ok(())
            },
            None => Err(Error::InvalidOperation(
                "Filter does not wrap a reader".into()).into()),
        }
    }

    /// Parses the next packet.
    ///
    /// Returns `Ok(None)` at the end of the stream.
    pub fn next(&mut self) -> Result<Option<ParsedPacket>> {
        tracer!("PacketParser::next");

        if self.finished {
            return Ok(None);
        }
        if self.reader.data(1)?.is_empty() {
            t!("EOF after {} packets", self.packets);
            self.finished = true;
            return Ok(None);
        }

        let (header, mut raw) = self.parse_header()?;
        let tag = header.ctb().tag();
        if let Err(e) = header.valid(true) {
            if self.config.strict {
                return Err(e);
            }
            log::warn!("Packet {}: {}", self.packets, e);
        }
        t!("packet {}: {:?}", self.packets, header);

        let read = self.read_body(&header, &mut raw)?;
        let packet = if read.truncated {
            let e = Error::TruncatedPacket(format!(
                "{} ended after {} octets", tag, read.body.len()));
            if self.config.strict {
                return Err(e.into());
            }
            log::warn!("Packet {}: {}, giving up", self.packets, e);
            self.finished = true;
            Packet::Unknown(Unknown::with_error(tag, read.body, e.into()))
        } else if read.oversized {
            // Strict mode fails before reading the body.
            let e = Error::MalformedPacket(format!(
                "{} exceeds the maximum packet size of {} octets",
                tag, self.config.max_packet_size));
            log::warn!("Packet {}: {}, skipped", self.packets, e);
            Packet::Unknown(Unknown::with_error(tag, Vec::new(), e.into()))
        } else {
            match packets::parse_body(tag, &read.body) {
                Ok(p) => p,
                Err(e) => {
                    let boundary = matches!(e.downcast_ref::<Error>(),
                                            Some(Error::PacketBoundary { .. }));
                    if self.config.strict || boundary {
                        return Err(e);
                    }
                    log::warn!("Packet {}: {}, continuing", self.packets, e);
                    Packet::Unknown(Unknown::with_error(tag, read.body, e))
                },
            }
        };

        self.packets += 1;
        Ok(Some(ParsedPacket {
            header,
            packet,
            raw: RawPacket::new(tag, raw),
        }))
    }

    /// Parses the whole stream, feeding the events to `handler`.
    ///
    /// Stops early if the handler returns [`Dispatch::Finished`].
    pub fn dispatch<H>(&mut self, handler: &mut H) -> Result<ParseSummary>
        where H: Handler + ?Sized
    {
        tracer!("PacketParser::dispatch");

        let mut summary = ParseSummary::default();
        while let Some(pp) = self.next()? {
            summary.packets += 1;
            let (packet, raw) = pp.into_parts();

            let mut events = Vec::new();
            match &packet {
                Packet::Signature(sig) if self.config.emit_subpackets => {
                    for sp in sig.hashed_area().iter() {
                        events.push(Event::Subpacket {
                            hashed: true,
                            subpacket: sp.clone(),
                        });
                    }
                    for sp in sig.unhashed_area().iter() {
                        events.push(Event::Subpacket {
                            hashed: false,
                            subpacket: sp.clone(),
                        });
                    }
                },
                Packet::Unknown(_) => summary.unknown += 1,
                _ => (),
            }
            events.insert(0, packet.into());
            events.push(Event::PacketEnd(raw));

            for event in events {
                let end = matches!(event, Event::PacketEnd(_));
                match handler.handle(event)? {
                    Dispatch::Finished => {
                        t!("handler finished after {} packets",
                           summary.packets);
                        summary.finished_early = true;
                        self.finished = true;
                        return Ok(summary);
                    },
                    Dispatch::Retain if end => summary.retained += 1,
                    Dispatch::Release if end => summary.released += 1,
                    _ => (),
                }
            }
        }

        log::debug!("Parsed {} packets ({} retained, {} unknown)",
                    summary.packets, summary.retained, summary.unknown);
        Ok(summary)
    }

    /// Reads `amount` octets into `raw`.
    fn read_raw(&mut self, amount: usize, what: &str, raw: &mut Vec<u8>)
                -> Result<()> {
        let data = read_or_truncated!(self.reader.data_consume_hard(amount),
                                      what);
        raw.extend_from_slice(&data[..amount]);
        Ok(())
    }

    /// Decodes a packet header as described in [Section 4.2 of RFC
    /// 4880], returning it together with its raw octets.
    ///
    ///   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2
    fn parse_header(&mut self) -> Result<(Header, Vec<u8>)> {
        let mut raw = Vec::with_capacity(6);
        self.read_raw(1, "CTB", &mut raw)?;
        let ctb = CTB::try_from(raw[0])?;

        let length = match ctb {
            CTB::New(_) => self.parse_new_format_length(&mut raw)?,
            CTB::Old(_, length_type) => {
                let n = match length_type {
                    PacketLengthType::OneOctet => 1,
                    PacketLengthType::TwoOctets => 2,
                    PacketLengthType::FourOctets => 4,
                    PacketLengthType::Indeterminate => 0,
                };
                if n == 0 {
                    BodyLength::Indeterminate
                } else {
                    self.read_raw(n, "packet length", &mut raw)?;
                    BodyLength::Full(raw[1..].iter()
                                     .fold(0u32, |acc, &b| acc << 8 | b as u32))
                }
            },
        };

        Ok((Header::new(ctb, length), raw))
    }

    /// Decodes a new format body length as described in [Section
    /// 4.2.2 of RFC 4880].
    ///
    ///   [Section 4.2.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.2
    fn parse_new_format_length(&mut self, raw: &mut Vec<u8>)
                               -> Result<BodyLength> {
        let start = raw.len();
        self.read_raw(1, "packet length", raw)?;
        let octet1 = raw[start] as u32;
        match octet1 {
            0..=191 => // One octet.
                Ok(BodyLength::Full(octet1)),
            192..=223 => { // Two octets length.
                self.read_raw(1, "packet length", raw)?;
                let octet2 = raw[start + 1] as u32;
                Ok(BodyLength::Full(((octet1 - 192) << 8) + octet2 + 192))
            },
            224..=254 => // Partial body length.
                Ok(BodyLength::Partial(1 << (octet1 & 0x1F))),
            _ => { // Five octets.
                self.read_raw(4, "packet length", raw)?;
                let mut b = [0u8; 4];
                b.copy_from_slice(&raw[start + 1..start + 5]);
                Ok(BodyLength::Full(u32::from_be_bytes(b)))
            },
        }
    }

    /// Reads the packet's body, concatenating partial body chunks.
    ///
    /// Oversized bodies are skipped in lenient mode.  A short read
    /// is reported, not returned as an error, so that lenient mode
    /// can keep what was read.
    fn read_body(&mut self, header: &Header, raw: &mut Vec<u8>)
                 -> Result<BodyRead> {
        let tag = header.ctb().tag();
        let max = self.config.max_packet_size as u64;
        let mut read = BodyRead {
            body: Vec::new(),
            truncated: false,
            oversized: false,
        };
        let mut total = 0u64;
        let mut length = *header.length();

        loop {
            let (chunk, last) = match length {
                BodyLength::Full(l) => (Some(l as u64), true),
                BodyLength::Partial(l) => (Some(l as u64), false),
                BodyLength::Indeterminate => (None, true),
            };

            if let Some(chunk) = chunk {
                total += chunk;
                if total > max && ! read.oversized {
                    if self.config.strict {
                        return Err(Error::MalformedPacket(format!(
                            "{} of at least {} octets exceeds the maximum \
                             packet size of {} octets", tag, total, max))
                                   .into());
                    }
                    read.oversized = true;
                }
            }

            let complete = self.copy_chunk(chunk, max, &mut read, raw)?;
            if ! complete {
                read.truncated = true;
                return Ok(read);
            }
            if last {
                return Ok(read);
            }

            length = match self.parse_new_format_length(raw) {
                Ok(l) => l,
                Err(e) => match e.downcast_ref::<Error>() {
                    Some(Error::TruncatedPacket(_)) => {
                        read.truncated = true;
                        return Ok(read);
                    },
                    _ => return Err(e),
                },
            };
        }
    }

    /// Copies `amount` octets (or everything up to EOF) into the
    /// body, or discards them once the body is oversized.
    ///
    /// Returns whether the chunk was complete.
    fn copy_chunk(&mut self, amount: Option<u64>, max: u64,
                  read: &mut BodyRead, raw: &mut Vec<u8>)
                  -> Result<bool> {
        const CHUNK: usize = 64 * 1024;

        let mut remaining = amount;
        loop {
            let want = match remaining {
                Some(0) => return Ok(true),
                Some(r) => (r as usize).min(CHUNK),
                None => CHUNK,
            };
            let data = self.reader.data(want)?;
            if data.is_empty() {
                // Indeterminate lengths end at EOF.
                return Ok(remaining.is_none());
            }
            let n = data.len().min(want);

            if remaining.is_none()
                && read.body.len() as u64 + n as u64 > max
                && ! read.oversized
            {
                if self.config.strict {
                    return Err(Error::MalformedPacket(format!(
                        "Packet exceeds the maximum packet size of {} octets",
                        max)).into());
                }
                read.oversized = true;
                raw.truncate(raw.len() - read.body.len());
                read.body = Vec::new();
            }

            if ! read.oversized {
                read.body.extend_from_slice(&data[..n]);
                raw.extend_from_slice(&data[..n]);
            }
            self.reader.consume(n);
            remaining = remaining.map(|r| r - n as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Serialize;
    use crate::types::{Curve, KeyFlags, SignatureType};
    use crate::packet::signature::SignatureBuilder;
    use crate::packet::signature::subpacket::SubpacketValue;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn tsk() -> Vec<u8> {
        let key = Key::generate_ecc(true, Curve::Ed25519).unwrap();
        let mut pair = key.clone().into_keypair().unwrap();
        let uid = UserID::from("Romeo <romeo@example.org>");
        let mut sig = SignatureBuilder::new(SignatureType::PositiveCertification)
            .set_key_flags(KeyFlags::sign_and_certify())
            .sign_userid_binding(&mut pair, &key, &uid)
            .unwrap();
        // Older implementations also put the issuer in the unhashed
        // area.
        sig.unhashed_area_mut().add(
            Subpacket::new(SubpacketValue::Issuer(key.keyid()), false)
                .unwrap()).unwrap();

        let mut buf = Vec::new();
        for p in vec![Packet::PublicKey(key), uid.into(), sig.into()] {
            p.serialize(&mut buf).unwrap();
        }
        buf
    }

    fn userid(value: &[u8]) -> Vec<u8> {
        Packet::UserID(value.to_vec().into()).to_vec().unwrap()
    }

    #[test]
    fn body_length_new_format() {
        fn test(input: &[u8], expected: BodyLength) {
            let mut pp = PacketParser::from_bytes(input);
            let mut raw = Vec::new();
            assert_eq!(pp.parse_new_format_length(&mut raw).unwrap(),
                       expected);
            assert_eq!(&raw[..], input);
        }

        // Examples from Section 4.2.3 of RFC4880.
        test(&[0x64][..], BodyLength::Full(100));
        test(&[0xC5, 0xFB][..], BodyLength::Full(1723));
        test(&[0xFF, 0x00, 0x01, 0x86, 0xA0][..], BodyLength::Full(100000));
        test(&[0xEF][..], BodyLength::Partial(32768));
        test(&[0xE1][..], BodyLength::Partial(2));
        test(&[0xF0][..], BodyLength::Partial(65536));
        test(&[0xC5, 0xDD][..], BodyLength::Full(1693));
    }

    #[test]
    fn old_format_headers() {
        init();
        // One-octet length.
        let mut data = vec![0xb4, 3];
        data.extend_from_slice(b"Bob");
        // Two-octet length.
        data.extend_from_slice(&[0xb5, 0, 3]);
        data.extend_from_slice(b"Eve");
        // Indeterminate length, runs to EOF.
        data.push(0xb7);
        data.extend_from_slice(b"Mallory");

        let packets = packets_from_bytes(&data).unwrap();
        let uids: Vec<&[u8]> = packets.iter().map(|p| match p {
            Packet::UserID(u) => u.value(),
            p => panic!("unexpected {:?}", p),
        }).collect();
        assert_eq!(uids, vec![&b"Bob"[..], b"Eve", b"Mallory"]);
    }

    #[test]
    fn raw_bytes_are_exact() {
        let data = tsk();
        let mut pp = PacketParser::from_bytes(&data);
        let mut concatenated = Vec::new();
        while let Some(p) = pp.next().unwrap() {
            concatenated.extend_from_slice(p.raw().as_bytes());
        }
        assert_eq!(concatenated, data);
        assert_eq!(pp.packets_parsed(), 3);
    }

    #[test]
    fn malformed_headers() {
        // The MSB of the CTB is not set.
        let e = packets_from_bytes(&[0x3f, 0]).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::MalformedHeader(_))));
        // Reserved tag.
        let e = packets_from_bytes(&[0xc0, 0]).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::MalformedHeader(_))));
        // Header errors are fatal even in lenient mode.
        let mut pp = PacketParser::from_bytes(&[0xc0, 0])
            .with_config(ParserConfig::lenient());
        assert!(pp.next().is_err());
    }

    #[test]
    fn truncation() {
        init();
        let data = tsk();
        let short = &data[..data.len() - 10];

        let e = packets_from_bytes(short).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::TruncatedPacket(_))));

        // A truncated header.
        let e = packets_from_bytes(&[0xc2, 0xff, 0]).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::TruncatedPacket(_))));

        let mut pp = PacketParser::from_bytes(short)
            .with_config(ParserConfig::lenient());
        assert!(matches!(pp.next().unwrap().unwrap().packet(),
                         Packet::PublicKey(_)));
        assert!(matches!(pp.next().unwrap().unwrap().packet(),
                         Packet::UserID(_)));
        match pp.next().unwrap().unwrap().into_parts().0 {
            Packet::Unknown(u) => {
                assert_eq!(u.tag(), Tag::Signature);
                assert!(matches!(u.error(), Some(Error::TruncatedPacket(_))));
            },
            p => panic!("unexpected {:?}", p),
        }
        assert!(pp.next().unwrap().is_none());
    }

    #[test]
    fn lenient_recovers_from_malformed_bodies() {
        init();
        // A signature packet with an unknown version, then a user ID.
        let mut data = vec![0xc2, 2, 9, 0];
        data.extend_from_slice(&userid(b"Tybalt"));

        assert!(packets_from_bytes(&data).is_err());

        let mut pp = PacketParser::from_bytes(&data)
            .with_config(ParserConfig::lenient());
        let mut events = Vec::new();
        let summary = pp.dispatch(&mut |e: Event| {
            events.push(e);
            Ok(Dispatch::Release)
        }).unwrap();
        assert_eq!(summary.packets, 2);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.released, 2);
        match &events[0] {
            Event::Unknown(u) => assert_eq!(
                u.error(), Some(&Error::UnsupportedSignatureVersion(9))),
            e => panic!("unexpected {:?}", e),
        }
        assert!(matches!(events[2], Event::UserID(_)));
    }

    #[test]
    fn boundary_violations_are_fatal() {
        let data = tsk();
        let packets = packets_from_bytes(&data).unwrap();
        let sig = match &packets[2] {
            Packet::Signature(s) => s.to_vec().unwrap(),
            p => panic!("unexpected {:?}", p),
        };
        let mut body = sig.clone();
        body[4] = 0xff;
        body[5] = 0xff;
        let mut framed = Vec::new();
        crate::serialize::write_packet(&mut framed, Tag::Signature, &body)
            .unwrap();

        let mut pp = PacketParser::from_bytes(&framed)
            .with_config(ParserConfig::lenient());
        let e = pp.next().unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(),
                         Some(Error::PacketBoundary { .. })));
    }

    #[test]
    fn oversized_packets() {
        init();
        let mut data = userid(&[b'x'; 300]);
        data.extend_from_slice(&userid(b"Benvolio"));
        let config = ParserConfig::default().max_packet_size(256);

        let mut pp = PacketParser::from_bytes(&data).with_config(config.clone());
        assert!(pp.next().is_err());

        let mut pp = PacketParser::from_bytes(&data)
            .with_config(config.strict(false));
        match pp.next().unwrap().unwrap().into_parts() {
            (Packet::Unknown(u), raw) => {
                assert!(u.body().is_empty());
                assert!(u.error().is_some());
                // Only the header is kept.
                assert_eq!(raw.len(), 3);
            },
            p => panic!("unexpected {:?}", p),
        }
        match pp.next().unwrap().unwrap().packet() {
            Packet::UserID(u) => assert_eq!(u.value(), b"Benvolio"),
            p => panic!("unexpected {:?}", p),
        }
    }

    #[test]
    fn partial_bodies() {
        init();
        // A user ID split in a 512 octet chunk and a 5 octet chunk.
        let mut data = vec![0xcd, 0xe9];
        data.extend(std::iter::repeat(b'a').take(512));
        data.push(5);
        data.extend_from_slice(b"bcdef");

        // Partial bodies are only allowed for data packets.
        assert!(packets_from_bytes(&data).is_err());

        let mut pp = PacketParser::from_bytes(&data)
            .with_config(ParserConfig::lenient());
        let p = pp.next().unwrap().unwrap();
        match p.packet() {
            Packet::UserID(u) => {
                assert_eq!(u.value().len(), 517);
                assert_eq!(&u.value()[510..], b"aabcdef");
            },
            p => panic!("unexpected {:?}", p),
        }
        assert_eq!(p.raw().as_bytes(), &data[..]);
    }

    #[test]
    fn events_and_finished() {
        let data = tsk();

        let mut events = Vec::new();
        let summary = PacketParser::from_bytes(&data)
            .dispatch(&mut |e: Event| {
                let retain = matches!(e, Event::PacketEnd(ref r)
                                      if r.tag() == Tag::PublicKey);
                events.push(e);
                Ok(if retain { Dispatch::Retain } else { Dispatch::Release })
            }).unwrap();
        assert_eq!(summary, ParseSummary {
            packets: 3,
            retained: 1,
            released: 2,
            unknown: 0,
            finished_early: false,
        });

        assert!(matches!(events[0], Event::PublicKey(_)));
        assert!(matches!(events[1], Event::PacketEnd(_)));
        assert!(matches!(events[2], Event::UserID(_)));
        assert!(matches!(events[3], Event::PacketEnd(_)));
        assert!(matches!(events[4], Event::Signature(_)));
        // Hashed subpackets come first.
        let hashed: Vec<bool> = events[5..events.len() - 1].iter()
            .map(|e| match e {
                Event::Subpacket { hashed, .. } => *hashed,
                e => panic!("unexpected {:?}", e),
            })
            .collect();
        assert!(hashed.len() >= 2);
        assert!(hashed[0]);
        assert!(! hashed[hashed.len() - 1]);
        assert!(hashed.windows(2).all(|w| w[0] || ! w[1]));
        assert!(matches!(events.last(), Some(Event::PacketEnd(_))));

        // Without subpacket events.
        let mut n = 0;
        PacketParser::from_bytes(&data)
            .with_config(ParserConfig::default().emit_subpackets(false))
            .dispatch(&mut |_: Event| { n += 1; Ok(Dispatch::Release) })
            .unwrap();
        assert_eq!(n, 6);

        // Finished stops immediately.
        let mut n = 0;
        let mut pp = PacketParser::from_bytes(&data);
        let summary = pp.dispatch(&mut |e: Event| {
            n += 1;
            Ok(match e {
                Event::UserID(_) => Dispatch::Finished,
                _ => Dispatch::Release,
            })
        }).unwrap();
        assert_eq!(n, 3);
        assert!(summary.finished_early);
        assert_eq!(summary.packets, 2);
        assert!(pp.next().unwrap().is_none());
    }

    #[test]
    fn filters() {
        let mut data = userid(b"Capulet");
        let first = data.len();
        data.extend_from_slice(&userid(b"Montague"));

        let mut pp = PacketParser::from_bytes(&data);
        assert!(pp.pop_filter().is_err());

        pp.push_filter(|inner| Box::new(
            buffered_reader::Limitor::with_cookie(
                inner, first as u64, Cookie::default())));
        assert_eq!(pp.filter_depth(), 1);
        assert!(matches!(pp.next().unwrap().unwrap().packet(),
                         Packet::UserID(_)));
        // The filter only lets the first packet through.
        assert!(pp.next().unwrap().is_none());

        pp.pop_filter().unwrap();
        assert_eq!(pp.filter_depth(), 0);
        match pp.next().unwrap().unwrap().packet() {
            Packet::UserID(u) => assert_eq!(u.value(), b"Montague"),
            p => panic!("unexpected {:?}", p),
        }
        assert_eq!(pp.packets_parsed(), 2);
    }

    #[test]
    fn parse_trait() {
        let data = tsk();
        let packets = packets_from_bytes(&data).unwrap();
        let sig = packets[2].to_vec().unwrap();
        assert_eq!(Packet::Signature(Signature::from_bytes(&sig).unwrap()),
                   packets[2]);

        let key = packets[0].to_vec().unwrap();
        assert!(Key::from_bytes(&key).is_ok());
        assert!(Key::from_bytes(&sig).is_err());
        // Exactly one packet.
        assert!(Key::from_bytes(&data).is_err());
        assert!(UserID::from_reader(&data[key.len()..key.len() + 27])
                .is_ok());
    }
}
