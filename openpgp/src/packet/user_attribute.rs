//! User Attribute packets.
//!
//! See [Section 5.12 of RFC 4880] for details.
//!
//!   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12

use std::fmt;

/// Holds a UserAttribute packet.
///
/// The attribute's subpackets (images and the like) are not
/// interpreted; the value is bound to keys like a user ID.
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct UserAttribute {
    /// The user attribute.
    value: Vec<u8>,
}

impl From<Vec<u8>> for UserAttribute {
    fn from(u: Vec<u8>) -> Self {
        UserAttribute {
            value: u,
        }
    }
}

impl fmt::Debug for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserAttribute")
            .field("value (bytes)", &self.value.len())
            .finish()
    }
}

impl UserAttribute {
    /// Gets the user attribute packet's value.
    pub fn value(&self) -> &[u8] {
        self.value.as_slice()
    }
}
