//! Concrete implementation of the crypto primitives used by the rest of the
//! crypto API.

mod rust;
pub(crate) use self::rust::*;
