use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Describes how a key may be used.
///
/// Stored in the key flags subpacket of self-signatures, see
/// [Section 5.2.3.21 of RFC 4880].  Octets beyond the first are kept
/// verbatim so that flags from newer RFCs survive a round
/// trip.
///
///   [Section 5.2.3.21 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.21
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyFlags(Vec<u8>);

const KEY_FLAG_CERTIFY: u8 = 0x01;
const KEY_FLAG_SIGN: u8 = 0x02;
const KEY_FLAG_ENCRYPT_FOR_TRANSPORT: u8 = 0x04;
const KEY_FLAG_ENCRYPT_AT_REST: u8 = 0x08;
const KEY_FLAG_SPLIT_KEY: u8 = 0x10;
const KEY_FLAG_AUTHENTICATE: u8 = 0x20;
const KEY_FLAG_GROUP_KEY: u8 = 0x80;

impl fmt::Debug for KeyFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.for_certification() {
            f.write_str("C")?;
        }
        if self.for_signing() {
            f.write_str("S")?;
        }
        if self.for_transport_encryption() {
            f.write_str("Et")?;
        }
        if self.for_storage_encryption() {
            f.write_str("Er")?;
        }
        if self.for_authentication() {
            f.write_str("A")?;
        }
        if self.is_split_key() {
            f.write_str("D")?;
        }
        if self.is_group_key() {
            f.write_str("G")?;
        }
        if self.0.len() > 1 {
            write!(f, "+{:02X?}", &self.0[1..])?;
        }
        Ok(())
    }
}

impl BitAnd for &KeyFlags {
    type Output = KeyFlags;

    fn bitand(self, rhs: Self) -> KeyFlags {
        KeyFlags::new(self.0.iter().zip(rhs.0.iter())
                      .map(|(l, r)| l & r).collect::<Vec<u8>>())
    }
}

impl BitOr for &KeyFlags {
    type Output = KeyFlags;

    fn bitor(self, rhs: Self) -> KeyFlags {
        let (mut long, short) = if self.0.len() >= rhs.0.len() {
            (self.0.clone(), &rhs.0)
        } else {
            (rhs.0.clone(), &self.0)
        };
        for (l, s) in long.iter_mut().zip(short.iter()) {
            *l |= s;
        }
        KeyFlags::new(long)
    }
}

impl KeyFlags {
    /// Creates a new instance from `bits`.
    ///
    /// Trailing zero octets are dropped.
    pub fn new<B: AsRef<[u8]>>(bits: B) -> Self {
        let mut bits = bits.as_ref().to_vec();
        while bits.last() == Some(&0) {
            bits.pop();
        }
        KeyFlags(bits)
    }

    /// Returns a new `KeyFlags` with all capabilities disabled.
    pub fn empty() -> Self {
        KeyFlags::default()
    }

    /// Returns the raw octets, as stored in the subpacket.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns whether no flag is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether every flag set in `self` is also set in
    /// `other`.
    pub fn is_subset_of(&self, other: &KeyFlags) -> bool {
        self.0.iter().enumerate()
            .all(|(i, b)| b & !other.0.get(i).cloned().unwrap_or(0) == 0)
    }

    fn get(&self, bit: u8) -> bool {
        self.0.get(0).map(|b| b & bit != 0).unwrap_or(false)
    }

    fn set(mut self, bit: u8, value: bool) -> Self {
        if self.0.is_empty() {
            self.0.push(0);
        }
        if value {
            self.0[0] |= bit;
        } else {
            self.0[0] &= !bit;
        }
        KeyFlags::new(self.0)
    }

    /// This key may be used to certify other keys.
    pub fn for_certification(&self) -> bool {
        self.get(KEY_FLAG_CERTIFY)
    }

    /// Sets whether or not this key may be used to certify other keys.
    pub fn set_certification(self, v: bool) -> Self {
        self.set(KEY_FLAG_CERTIFY, v)
    }

    /// This key may be used to sign data.
    pub fn for_signing(&self) -> bool {
        self.get(KEY_FLAG_SIGN)
    }

    /// Sets whether or not this key may be used to sign data.
    pub fn set_signing(self, v: bool) -> Self {
        self.set(KEY_FLAG_SIGN, v)
    }

    /// This key may be used to encrypt communications.
    pub fn for_transport_encryption(&self) -> bool {
        self.get(KEY_FLAG_ENCRYPT_FOR_TRANSPORT)
    }

    /// Sets whether or not this key may be used to encrypt communications.
    pub fn set_transport_encryption(self, v: bool) -> Self {
        self.set(KEY_FLAG_ENCRYPT_FOR_TRANSPORT, v)
    }

    /// This key may be used to encrypt storage.
    pub fn for_storage_encryption(&self) -> bool {
        self.get(KEY_FLAG_ENCRYPT_AT_REST)
    }

    /// Sets whether or not this key may be used to encrypt storage.
    pub fn set_storage_encryption(self, v: bool) -> Self {
        self.set(KEY_FLAG_ENCRYPT_AT_REST, v)
    }

    /// This key may be used for authentication.
    pub fn for_authentication(&self) -> bool {
        self.get(KEY_FLAG_AUTHENTICATE)
    }

    /// Sets whether or not this key may be used for authentication.
    pub fn set_authentication(self, v: bool) -> Self {
        self.set(KEY_FLAG_AUTHENTICATE, v)
    }

    /// The private component of this key may have been split
    /// using a secret-sharing mechanism.
    pub fn is_split_key(&self) -> bool {
        self.get(KEY_FLAG_SPLIT_KEY)
    }

    /// The private component of this key may be in
    /// possession of more than one person.
    pub fn is_group_key(&self) -> bool {
        self.get(KEY_FLAG_GROUP_KEY)
    }

    /// Sign and certify, the default usage of a primary key.
    pub fn sign_and_certify() -> Self {
        KeyFlags::empty().set_certification(true).set_signing(true)
    }

    /// Transport and storage encryption, the default usage of a
    /// subkey.
    pub fn encrypt() -> Self {
        KeyFlags::empty()
            .set_transport_encryption(true)
            .set_storage_encryption(true)
    }
}
