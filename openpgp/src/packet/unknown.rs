use std::fmt;

use crate::packet::Tag;
use crate::Error;

/// Holds an unknown packet.
///
/// This is used by the parser to hold packets that it doesn't know
/// how to process, and, in lenient mode, packets that failed to
/// parse, rather than abort.
///
/// This packet effectively holds a binary blob.
#[derive(Clone, PartialEq, Eq)]
pub struct Unknown {
    /// Packet tag.
    tag: Tag,
    /// Error that caused parsing to abort, if any.
    error: Option<Error>,
    /// The packet's body.
    body: Box<[u8]>,
}

impl fmt::Debug for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Unknown")
            .field("tag", &self.tag)
            .field("error", &self.error)
            .field("body", &crate::conversions::to_hex(&self.body, true))
            .finish()
    }
}

impl Unknown {
    /// Returns a new `Unknown` packet.
    pub fn new(tag: Tag, body: Vec<u8>) -> Self {
        Unknown {
            tag,
            error: None,
            body: body.into_boxed_slice(),
        }
    }

    /// Returns a new `Unknown` packet recording why parsing failed.
    ///
    /// Errors that are not one of this crate's [`Error`]s are
    /// recorded as [`Error::MalformedPacket`].
    pub fn with_error(tag: Tag, body: Vec<u8>, error: anyhow::Error) -> Self {
        let error = match error.downcast::<Error>() {
            Ok(e) => e,
            Err(e) => Error::MalformedPacket(e.to_string()),
        };
        Unknown {
            tag,
            error: Some(error),
            body: body.into_boxed_slice(),
        }
    }

    /// Gets the unknown packet's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Gets the error that made the parser give up on this packet.
    ///
    /// This is `None` for packets the parser does not try to parse.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Gets the packet's body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
