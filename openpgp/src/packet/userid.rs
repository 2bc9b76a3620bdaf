use std::fmt;
use std::borrow::Cow;

/// Holds a UserID packet.
///
/// According to [RFC 4880], the text is by convention UTF-8 encoded
/// and in "mail name-addr" form, i.e., "Name (Comment)
/// <email@example.com>".  This is not enforced.
///
/// See [Section 5.11 of RFC 4880] for details.
///
///   [RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.11
///   [Section 5.11 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.11
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserID {
    /// The user id.
    value: Vec<u8>,
}

impl From<Vec<u8>> for UserID {
    fn from(u: Vec<u8>) -> Self {
        UserID {
            value: u,
        }
    }
}

impl From<&[u8]> for UserID {
    fn from(u: &[u8]) -> Self {
        u.to_vec().into()
    }
}

impl<'a> From<&'a str> for UserID {
    fn from(u: &'a str) -> Self {
        u.as_bytes().into()
    }
}

impl From<String> for UserID {
    fn from(u: String) -> Self {
        u.into_bytes().into()
    }
}

impl fmt::Display for UserID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let userid = String::from_utf8_lossy(&self.value[..]);
        write!(f, "{}", userid)
    }
}

impl fmt::Debug for UserID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let userid = String::from_utf8_lossy(&self.value[..]);

        f.debug_struct("UserID")
            .field("value", &userid)
            .finish()
    }
}

impl UserID {
    /// Gets the user ID packet's value.
    pub fn value(&self) -> &[u8] {
        self.value.as_slice()
    }

    /// Returns the user ID as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Returns whether `needle` occurs in the user ID, ignoring
    /// case.
    ///
    /// An empty needle matches every user ID.
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        self.to_string_lossy().to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_matching() {
        let uid = UserID::from("Alice Lovelace <ALICE@example.org>");
        assert!(uid.contains_ignore_case("alice@"));
        assert!(uid.contains_ignore_case("LOVELACE"));
        assert!(uid.contains_ignore_case(""));
        assert!(!uid.contains_ignore_case("bob"));

        let uid = UserID::from(vec![0xff, b'x']);
        assert!(uid.contains_ignore_case("X"));
        assert_eq!(format!("{}", uid), "\u{FFFD}x");
    }
}
