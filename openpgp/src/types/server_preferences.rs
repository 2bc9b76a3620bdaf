use std::fmt;

/// Key server preferences, see [Section 5.2.3.17 of RFC 4880].
///
///   [Section 5.2.3.17 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.17
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyServerPreferences(Vec<u8>);

/// The key holder requests that this key only be modified or updated
/// by the key holder or an administrator of the key server.
const KEYSERVER_PREFERENCE_NO_MODIFY: u8 = 0x80;

impl fmt::Debug for KeyServerPreferences {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.no_modify() {
            f.write_str("no modify")?;
        }
        Ok(())
    }
}

impl KeyServerPreferences {
    /// Creates a new instance from `bits`.
    pub fn new<B: AsRef<[u8]>>(bits: B) -> Self {
        let mut bits = bits.as_ref().to_vec();
        while bits.last() == Some(&0) {
            bits.pop();
        }
        KeyServerPreferences(bits)
    }

    /// Returns the raw octets, as stored in the subpacket.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the key holder asked key servers not to modify this
    /// key.
    pub fn no_modify(&self) -> bool {
        self.0.get(0)
            .map(|b| b & KEYSERVER_PREFERENCE_NO_MODIFY != 0)
            .unwrap_or(false)
    }

    /// Sets the no-modify preference.
    pub fn set_no_modify(mut self, v: bool) -> Self {
        if self.0.is_empty() {
            self.0.push(0);
        }
        if v {
            self.0[0] |= KEYSERVER_PREFERENCE_NO_MODIFY;
        } else {
            self.0[0] &= !KEYSERVER_PREFERENCE_NO_MODIFY;
        }
        KeyServerPreferences::new(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_modify() {
        let p = KeyServerPreferences::default();
        assert!(!p.no_modify());
        let p = p.set_no_modify(true);
        assert!(p.no_modify());
        assert_eq!(p.as_bytes(), &[0x80]);
        assert!(p.set_no_modify(false).as_bytes().is_empty());
    }
}
