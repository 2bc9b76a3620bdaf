//! String-to-Key (S2K) specifiers.
//!
//! String-to-key (S2K) specifiers are used to convert password
//! strings into symmetric-key encryption/decryption keys.  See
//! [Section 3.7 of RFC 4880].
//!
//!   [Section 3.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7

use crate::Error;
use crate::Result;
use crate::HashAlgorithm;
use crate::crypto::Password;
use crate::crypto::SessionKey;

use std::fmt;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// String-to-Key (S2K) specifiers.
///
/// String-to-key (S2K) specifiers are used to convert password
/// strings into symmetric-key encryption/decryption keys.  See
/// [Section 3.7 of RFC 4880].
///
///   [Section 3.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum S2K {
    /// Simply hashes the password.
    Simple {
        /// Hash used for key derivation.
        hash: HashAlgorithm
    },
    /// Hashes the password with a public `salt` value.
    Salted {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
        /// Public salt value mixed into the password.
        salt: [u8; 8],
    },
    /// Repeatedly hashes the password with a public `salt` value.
    Iterated {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
        /// Public salt value mixed into the password.
        salt: [u8; 8],
        /// Number of bytes to hash.
        ///
        /// This is the decoded count.  It must be representable in
        /// the one-octet coded form, see [`S2K::encode_count`].
        hash_bytes: u32,
    },
    /// Private S2K algorithm.
    Private {
        /// Tag identifying the private algorithm.
        ///
        /// Tags 100 to 110 are reserved for private use.
        tag: u8,
        /// The parameters following the tag, if known.
        parameters: Option<Box<[u8]>>,
    },
    /// Unknown S2K algorithm.
    Unknown {
        /// Tag identifying the unknown algorithm.
        tag: u8,
        /// The parameters following the tag, if known.
        parameters: Option<Box<[u8]>>,
    },
}

/// The default number of octets hashed by an iterated S2K (coded
/// count `0x90`).
pub const DEFAULT_HASH_BYTES: u32 = 524_288;

impl Default for S2K {
    /// Returns an iterated and salted S2K using SHA-256, a fresh
    /// random salt and 524288 octets.
    ///
    /// If no randomness can be obtained, the salt is all zeros; use
    /// [`S2K::new_iterated`] to handle that error.
    fn default() -> Self {
        S2K::new_iterated(HashAlgorithm::SHA256, DEFAULT_HASH_BYTES)
            .unwrap_or(S2K::Iterated {
                hash: HashAlgorithm::SHA256,
                salt: [0; 8],
                hash_bytes: DEFAULT_HASH_BYTES,
            })
    }
}

impl S2K {
    /// Creates a new iterated and salted S2K with a fresh random salt.
    ///
    /// `hash_bytes` is rounded to the nearest representable count.
    pub fn new_iterated(hash: HashAlgorithm, hash_bytes: u32) -> Result<Self> {
        let mut salt = [0u8; 8];
        crate::crypto::random(&mut salt)?;
        Ok(S2K::Iterated {
            hash,
            salt,
            hash_bytes: Self::nearest_hash_count(hash_bytes),
        })
    }

    /// Convert the string to a key using the S2K's parameters.
    ///
    /// If the digest is shorter than `key_size`, the output is the
    /// concatenation of several hash contexts, the `i`-th one
    /// preloaded with `i` zero octets.
    pub fn derive_key(&self, string: &Password, key_size: usize)
                      -> Result<SessionKey> {
        match self {
            S2K::Simple { hash } | S2K::Salted { hash, .. }
            | S2K::Iterated { hash, .. } => string.map(|string| {
                let mut hash = hash.context()?;

                let hash_sz = hash.digest_size();
                let num_contexts = (key_size + hash_sz - 1) / hash_sz;
                let mut zeros = Vec::with_capacity(num_contexts + 1);
                let mut ret: SessionKey = vec![0u8; key_size].into();

                for data in ret.chunks_mut(hash_sz) {
                    hash.update(&zeros[..]);

                    match self {
                        S2K::Simple { .. } => {
                            hash.update(string);
                        }
                        S2K::Salted { salt, .. } => {
                            hash.update(salt);
                            hash.update(string);
                        }
                        S2K::Iterated { salt, hash_bytes, .. }
                        if (*hash_bytes as usize) < salt.len() + string.len() =>
                        {
                            // The whole salt and password are hashed
                            // at least once.
                            hash.update(&salt[..]);
                            hash.update(string);
                        },
                        S2K::Iterated { salt, hash_bytes, .. } => {
                            // Unroll the processing loop N times.
                            const N: usize = 16;
                            let data_len = salt.len() + string.len();
                            let octs_per_iter = N * data_len;
                            let mut data: SessionKey =
                                vec![0u8; octs_per_iter].into();
                            let full = *hash_bytes as usize / octs_per_iter;
                            let tail = *hash_bytes as usize - (full * octs_per_iter);

                            for i in 0..N {
                                let o = data_len * i;
                                data[o..o + salt.len()]
                                    .clone_from_slice(salt);
                                data[o + salt.len()..o + data_len]
                                    .clone_from_slice(string);
                            }

                            for _ in 0..full {
                                hash.update(&data[..]);
                            }

                            if tail != 0 {
                                hash.update(&data[0..tail]);
                            }
                        }
                        S2K::Unknown { .. } | S2K::Private { .. } =>
                            unreachable!("handled by the outer match"),
                    }

                    hash.digest(data)?;
                    zeros.push(0);
                }

                Ok(ret)
            }),
            S2K::Unknown { tag, .. } | S2K::Private { tag, .. } =>
                Err(Error::MalformedPacket(
                    format!("Unknown S2K type {:#x}", tag)).into()),
        }
    }

    /// Returns the representable iteration count closest to
    /// `hash_bytes`.
    ///
    /// Not all iteration counts are encodable as *Iterated and Salted
    /// S2K*.  If `hash_bytes` lies exactly between two representable
    /// counts, the larger one is returned.  The result is clamped to
    /// the representable range `[1024, 0x3e00000]`.
    pub fn nearest_hash_count(hash_bytes: u32) -> u32 {
        let mut below = Self::decode_count(0);
        for coded in 0..=255u8 {
            let above = Self::decode_count(coded);
            if above >= hash_bytes {
                let down = hash_bytes.saturating_sub(below);
                let up = above - hash_bytes;
                return if up <= down { above } else { below };
            }
            below = above;
        }
        below
    }

    /// Decodes the OpenPGP encoding of the number of bytes to hash.
    pub fn decode_count(coded: u8) -> u32 {
        let mantissa = 16 + (coded as u32 & 15);
        let exp = (coded as u32 >> 4) + 6;

        mantissa << exp
    }

    /// Converts `hash_bytes` into coded count representation.
    ///
    /// # Errors
    ///
    /// Fails with `Error::InvalidArgument` if `hash_bytes` cannot be
    /// encoded. See also [`S2K::nearest_hash_count()`].
    pub fn encode_count(hash_bytes: u32) -> Result<u8> {
        // eeee.mmmm -> (16 + mmmm) * 2^(6 + e)

        let msb = 32 - hash_bytes.leading_zeros();
        if ! (11..=26).contains(&msb) {
            return Err(Error::InvalidArgument(
                format!("S2K: cannot encode iteration count of {}",
                        hash_bytes)).into());
        }

        let exp = msb - 11;
        let mantissa = (hash_bytes >> (msb - 5)) & 0b1111;
        let coded = mantissa as u8 | (exp as u8) << 4;

        // Any bit below the mantissa makes the count unrepresentable.
        if Self::decode_count(coded) != hash_bytes {
            return Err(Error::InvalidArgument(
                format!("S2K: cannot encode iteration count of {}",
                        hash_bytes)).into());
        }

        Ok(coded)
    }

    /// Returns the hash algorithm, if any.
    pub fn hash_algo(&self) -> Option<HashAlgorithm> {
        match self {
            S2K::Simple { hash } | S2K::Salted { hash, .. }
            | S2K::Iterated { hash, .. } => Some(*hash),
            _ => None,
        }
    }
}

impl fmt::Display for S2K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            S2K::Simple{ hash } =>
                f.write_fmt(format_args!("Simple S2K with {}", hash)),
            S2K::Salted{ hash, salt } => {
                f.write_fmt(
                    format_args!("Salted S2K with {} and salt {}",
                                 hash,
                                 crate::conversions::to_hex(salt, false)))
            }
            S2K::Iterated{ hash, salt, hash_bytes, } => {
                f.write_fmt(
                    format_args!("Iterated and Salted S2K with {}, \
                                  salt {} and {} bytes to hash",
                                 hash,
                                 crate::conversions::to_hex(salt, false),
                                 hash_bytes))
            }
            S2K::Private { tag, .. } =>
                f.write_fmt(format_args!("Private/Experimental S2K {}", tag)),
            S2K::Unknown { tag, .. } =>
                f.write_fmt(format_args!("Unknown S2K {}", tag)),
        }
    }
}

#[cfg(test)]
fn arbitrary_salt(g: &mut Gen) -> [u8; 8] {
    let mut salt = [0u8; 8];
    for b in salt.iter_mut() {
        *b = u8::arbitrary(g);
    }
    salt
}

#[cfg(test)]
impl Arbitrary for S2K {
    fn arbitrary(g: &mut Gen) -> Self {
        match u8::arbitrary(g) % 5 {
            0 => S2K::Simple{ hash: HashAlgorithm::arbitrary(g) },
            1 => S2K::Salted{
                hash: HashAlgorithm::arbitrary(g),
                salt: arbitrary_salt(g),
            },
            2 => S2K::Iterated{
                hash: HashAlgorithm::arbitrary(g),
                salt: arbitrary_salt(g),
                hash_bytes: S2K::decode_count(u8::arbitrary(g)),
            },
            3 => S2K::Private {
                tag: 100 + u8::arbitrary(g) % 11,
                parameters: Some(Vec::<u8>::arbitrary(g).into()),
            },
            _ => S2K::Unknown {
                tag: 4 + u8::arbitrary(g) % 96,
                parameters: Some(Vec::<u8>::arbitrary(g).into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::conversions::to_hex;
    use crate::parse::Parse;
    use crate::serialize::Serialize;

    #[test]
    fn known_answers() {
        struct Test<'a> {
            s2k: S2K,
            password: Password,
            key_size: usize,
            key_hex: &'a str,
        }

        let tests = [
            Test {
                s2k: S2K::Simple{ hash: HashAlgorithm::SHA1, },
                password: "1234".into(),
                key_size: 32,
                key_hex: "7110EDA4D09E062AA5E4A390B0A572AC0D2C0220F352B0D292B65164C2A67301",
            },
            Test {
                s2k: S2K::Salted{
                    hash: HashAlgorithm::SHA1,
                    salt: [0xa8, 0x42, 0xa7, 0xa9, 0x59, 0xfa, 0x42, 0x2a],
                },
                password: "123456".into(),
                key_size: 32,
                key_hex: "8B79077CA448F6FB3D3AD2A264D3B938D357C9FB3E41219FD962DF960A9AFA08",
            },
            Test {
                s2k: S2K::Iterated {
                    hash: HashAlgorithm::SHA1,
                    salt: [0x78, 0x45, 0xf0, 0x5b, 0x55, 0xf7, 0xb4, 0x9e],
                    hash_bytes: S2K::decode_count(241),
                },
                password: "qwerty".into(),
                key_size: 32,
                key_hex: "575AD156187A3F8CEC11108309236EB499F1E682F0D1AFADFAC4ECF97613108A",
            },
            Test {
                s2k: S2K::Iterated {
                    hash: HashAlgorithm::SHA1,
                    salt: [0x8f, 0x81, 0x74, 0xc5, 0xd9, 0x61, 0xc7, 0x79],
                    hash_bytes: S2K::decode_count(238),
                },
                password: "123".into(),
                key_size: 24,
                key_hex: "915E96FC694E7F90A6850B740125EA005199C725F3BD27E3",
            },
        ];

        for test in tests.iter() {
            let key = test.s2k.derive_key(&test.password, test.key_size)
                .unwrap();
            assert_eq!(to_hex(&key[..], false), test.key_hex);
        }
    }

    #[test]
    fn salts_matter() {
        let password: Password = "hunter2".into();
        let a = S2K::Iterated {
            hash: HashAlgorithm::SHA256,
            salt: [1; 8],
            hash_bytes: DEFAULT_HASH_BYTES,
        };
        let b = S2K::Iterated {
            hash: HashAlgorithm::SHA256,
            salt: [2; 8],
            hash_bytes: DEFAULT_HASH_BYTES,
        };
        assert_eq!(S2K::encode_count(DEFAULT_HASH_BYTES).unwrap(), 0x90);
        let ka = a.derive_key(&password, 32).unwrap();
        let kb = b.derive_key(&password, 32).unwrap();
        assert_ne!(ka, kb);
        assert_eq!(ka, a.derive_key(&password, 32).unwrap());
    }

    #[test]
    fn default_is_iterated() {
        match S2K::default() {
            S2K::Iterated { hash, hash_bytes, .. } => {
                assert_eq!(hash, HashAlgorithm::SHA256);
                assert_eq!(hash_bytes, 524288);
            },
            s => panic!("unexpected default {:?}", s),
        }
    }

    #[test]
    fn unknown_s2k_cannot_derive() {
        let s2k = S2K::Unknown { tag: 7, parameters: None };
        assert!(s2k.derive_key(&"x".into(), 16).is_err());
    }

    quickcheck::quickcheck! {
        fn s2k_roundtrip(s2k: S2K) -> bool {
            let buf = s2k.to_vec().unwrap();
            let s = S2K::from_bytes(&buf).unwrap();
            s2k == s
        }
    }

    #[test]
    fn s2k_coded_count_roundtrip() {
        for cc in 0..0x100usize {
            let hash_bytes = S2K::decode_count(cc as u8);
            assert!(hash_bytes >= 1024
                    && S2K::encode_count(hash_bytes).unwrap() == cc as u8);
        }
        assert!(S2K::encode_count(1023).is_err());
        assert!(S2K::encode_count(1025).is_err());
        assert!(S2K::encode_count(0x3e00000 + 1).is_err());
        assert!(S2K::encode_count(u32::MAX).is_err());
    }

    #[test]
    fn unrepresentable_counts_are_not_written() {
        let password: Password = "correct horse".into();
        for &hash_bytes in &[1025, 1088 + 1, 524288 + 1024, 0x3e00000 - 1] {
            let s2k = S2K::Iterated {
                hash: HashAlgorithm::SHA256,
                salt: [1; 8],
                hash_bytes,
            };
            assert!(S2K::encode_count(hash_bytes).is_err(), "{}", hash_bytes);
            let e = s2k.to_vec().unwrap_err();
            assert!(matches!(e.downcast_ref::<Error>(),
                             Some(Error::InvalidArgument(_))));

            // Rounding to a representable count survives a round trip.
            let s2k = S2K::Iterated {
                hash: HashAlgorithm::SHA256,
                salt: [1; 8],
                hash_bytes: S2K::nearest_hash_count(hash_bytes),
            };
            let back = S2K::from_bytes(&s2k.to_vec().unwrap()).unwrap();
            assert_eq!(back, s2k);
            assert_eq!(back.derive_key(&password, 16).unwrap(),
                       s2k.derive_key(&password, 16).unwrap());
        }
    }

    quickcheck::quickcheck! {
        fn s2k_coded_count_nearest(i: u32) -> bool {
            let approx = S2K::nearest_hash_count(i);
            let cc = S2K::encode_count(approx).unwrap();
            assert_eq!(S2K::decode_count(cc), approx);

            // No representable count is strictly closer.
            let dist = |v: u32| (v as i64 - i as i64).abs();
            (0..=255u8).all(|c| dist(S2K::decode_count(c)) >= dist(approx))
        }
    }

    quickcheck::quickcheck! {
        fn s2k_coded_count_monotone(a: u32, b: u32) -> bool {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            S2K::nearest_hash_count(lo) <= S2K::nearest_hash_count(hi)
        }
    }

    #[test]
    fn s2k_coded_count_ties_go_up() {
        for cc in 0..0xffu8 {
            let lo = S2K::decode_count(cc);
            let hi = S2K::decode_count(cc + 1);
            let mid = lo + (hi - lo) / 2;
            assert_eq!(S2K::nearest_hash_count(mid), hi);
            assert_eq!(S2K::nearest_hash_count(mid - 1), lo);
        }
        assert_eq!(S2K::nearest_hash_count(0), 1024);
        assert_eq!(S2K::nearest_hash_count(u32::MAX), 0x3e00000);
    }
}
