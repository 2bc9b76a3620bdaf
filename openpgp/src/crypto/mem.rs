//! Memory protection.
//!
//! Decrypted secret key material, passwords and session keys live in
//! [`Protected`] buffers, which are zeroed when dropped.  Whoever
//! holds a `Protected` owns the secret; dropping it, on any exit
//! path, wipes it.

use std::cmp::{min, Ordering};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Holds secret data.
///
/// The buffer is cleared when dropped.
#[derive(Clone, Eq, Hash)]
pub struct Protected(Box<[u8]>);

impl PartialEq for Protected {
    fn eq(&self, other: &Self) -> bool {
        secure_cmp(&self.0, &other.0) == Ordering::Equal
    }
}

impl Protected {
    /// Allocates a zeroed buffer of `len` octets.
    pub fn new(len: usize) -> Self {
        vec![0; len].into()
    }

    /// Returns a copy of the first `len` octets (or fewer).
    pub fn truncated(&self, len: usize) -> Self {
        Protected::from(&self.0[..min(len, self.0.len())])
    }
}

impl Deref for Protected {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Protected {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Protected {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl DerefMut for Protected {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<Vec<u8>> for Protected {
    fn from(v: Vec<u8>) -> Self {
        Protected(v.into_boxed_slice())
    }
}

impl From<Box<[u8]>> for Protected {
    fn from(v: Box<[u8]>) -> Self {
        Protected(v)
    }
}

impl From<&[u8]> for Protected {
    fn from(v: &[u8]) -> Self {
        Vec::from(v).into()
    }
}

impl Drop for Protected {
    fn drop(&mut self) {
        unsafe {
            memsec::memzero(self.0.as_mut_ptr(), self.0.len());
        }
    }
}

impl fmt::Debug for Protected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if cfg!(debug_assertions) {
            write!(f, "{:?}", self.0)
        } else {
            f.write_str("[<Redacted>]")
        }
    }
}

/// Time-constant comparison.
pub fn secure_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let ord1 = a.len().cmp(&b.len());
    let ord2 = unsafe {
        memsec::memcmp(a.as_ptr(), b.as_ptr(), min(a.len(), b.len()))
    };
    let ord2 = ord2.cmp(&0);

    if ord1 == Ordering::Equal { ord2 } else { ord1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare() {
        let a = Protected::from(&b"secret"[..]);
        assert_eq!(a, Protected::from(&b"secret"[..]));
        assert_ne!(a, Protected::from(&b"secreT"[..]));
        assert_eq!(secure_cmp(b"a", b"ab"), Ordering::Less);
        assert_eq!(secure_cmp(b"b", b"a"), Ordering::Greater);
        assert_eq!(a.truncated(3).as_ref(), b"sec");
        assert_eq!(a.truncated(30).len(), 6);
    }
}
