//! Functions for parsing MPIs.

use crate::{
    Error,
    Result,
};
use crate::crypto::mpi::{self, MPI, ProtectedMPI};
use crate::crypto::mem::{secure_cmp, Protected};
use crate::packet::Tag;
use crate::packet::key::SecretKeyChecksum;
use crate::parse::body::BodyParser;
use crate::types::{
    Curve,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SymmetricAlgorithm,
};

fn parse_curve(php: &mut BodyParser) -> Result<Curve> {
    let len = php.parse_u8("curve_len")? as usize;
    if len == 0 || len == 0xff {
        return Err(Error::MalformedPacket(
            format!("Reserved curve OID length {}", len)).into());
    }
    Ok(Curve::from_oid(php.parse_bytes("curve", len)?))
}

impl mpi::PublicKey {
    /// Parses a set of OpenPGP MPIs representing a public key.
    ///
    /// See [Section 3.2 of RFC 4880] for details.
    ///
    ///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
    pub fn parse(algo: PublicKeyAlgorithm, data: &[u8]) -> Result<Self> {
        let mut php = BodyParser::new(Tag::PublicKey, data);
        let key = Self::parse_body(algo, &mut php)?;
        php.finish()?;
        Ok(key)
    }

    pub(crate) fn parse_body(algo: PublicKeyAlgorithm, php: &mut BodyParser)
                             -> Result<Self> {
        use crate::PublicKeyAlgorithm::*;

        match algo {
            RSAEncryptSign | RSAEncrypt | RSASign => {
                let n = php.parse_mpi("rsa_public_n")?;
                let e = php.parse_mpi("rsa_public_e")?;
                Ok(mpi::PublicKey::RSA { e, n })
            },

            DSA => {
                let p = php.parse_mpi("dsa_public_p")?;
                let q = php.parse_mpi("dsa_public_q")?;
                let g = php.parse_mpi("dsa_public_g")?;
                let y = php.parse_mpi("dsa_public_y")?;
                Ok(mpi::PublicKey::DSA { p, q, g, y })
            },

            ElGamalEncrypt | ElGamalEncryptSign => {
                let p = php.parse_mpi("elgamal_public_p")?;
                let g = php.parse_mpi("elgamal_public_g")?;
                let y = php.parse_mpi("elgamal_public_y")?;
                Ok(mpi::PublicKey::ElGamal { p, g, y })
            },

            EdDSA => {
                let curve = parse_curve(php)?;
                let q = php.parse_mpi("eddsa_public")?;
                Ok(mpi::PublicKey::EdDSA { curve, q })
            },

            ECDSA => {
                let curve = parse_curve(php)?;
                let q = php.parse_mpi("ecdsa_public")?;
                Ok(mpi::PublicKey::ECDSA { curve, q })
            },

            ECDH => {
                let curve = parse_curve(php)?;
                let q = php.parse_mpi("ecdh_public")?;

                // KDF parameters: length, reserved octet, hash and
                // symmetric algorithm.
                let kdf_len = php.parse_u8("kdf_len")?;
                if kdf_len != 3 {
                    return Err(Error::MalformedPacket(
                        format!("wrong kdf length: {}", kdf_len)).into());
                }
                let reserved = php.parse_u8("kdf_reserved")?;
                if reserved != 1 {
                    return Err(Error::MalformedPacket(
                        format!("Reserved kdf field must be 0x01, got {}",
                                reserved)).into());
                }
                let hash: HashAlgorithm = php.parse_u8("kdf_hash")?.into();
                let sym: SymmetricAlgorithm = php.parse_u8("kek_symm")?.into();

                Ok(mpi::PublicKey::ECDH { curve, q, hash, sym })
            },

            Unknown(_) | Private(_) => {
                let rest = php.parse_bytes_eof("rest")?;
                Ok(mpi::PublicKey::Unknown {
                    mpis: Vec::new().into_boxed_slice(),
                    rest: rest.to_vec().into_boxed_slice(),
                })
            },
        }
    }
}

impl mpi::SecretKeyMaterial {
    /// Parses secret key MPIs for `algo` followed by a checksum.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPacket` if the data cannot be parsed
    /// or the checksum does not match, so that a wrong passphrase is
    /// told apart from other failures by the caller.
    pub(crate) fn parse_chksumd(algo: PublicKeyAlgorithm, data: &[u8],
                                checksum: SecretKeyChecksum)
                                -> Result<Self> {
        let len = checksum.len();
        if data.len() < len {
            return Err(Error::MalformedPacket(
                "Secret key material shorter than its checksum".into())
                       .into());
        }
        let (mpis, expected) = data.split_at(data.len() - len);

        let computed = checksum.compute(mpis)?;
        if secure_cmp(&computed, expected) != std::cmp::Ordering::Equal {
            return Err(Error::MalformedPacket(
                "Secret key checksum mismatch".into()).into());
        }

        Self::parse(algo, mpis).map_err(|e| match e.downcast_ref::<Error>() {
            Some(Error::PacketBoundary { .. }) =>
                Error::MalformedPacket(e.to_string()).into(),
            _ => e,
        })
    }

    /// Parses a set of OpenPGP MPIs representing a secret key.
    ///
    /// See [Section 3.2 of RFC 4880] for details.
    ///
    ///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
    pub fn parse(algo: PublicKeyAlgorithm, data: &[u8]) -> Result<Self> {
        use crate::PublicKeyAlgorithm::*;

        let mut php = BodyParser::new(Tag::SecretKey, data);
        let mpis = match algo {
            RSAEncryptSign | RSAEncrypt | RSASign => {
                let d = php.parse_protected_mpi("rsa_secret_d")?;
                let p = php.parse_protected_mpi("rsa_secret_p")?;
                let q = php.parse_protected_mpi("rsa_secret_q")?;
                let u = php.parse_protected_mpi("rsa_secret_u")?;
                mpi::SecretKeyMaterial::RSA { d, p, q, u }
            },

            DSA => mpi::SecretKeyMaterial::DSA {
                x: php.parse_protected_mpi("dsa_secret")?,
            },

            ElGamalEncrypt | ElGamalEncryptSign => mpi::SecretKeyMaterial::ElGamal {
                x: php.parse_protected_mpi("elgamal_secret")?,
            },

            EdDSA => mpi::SecretKeyMaterial::EdDSA {
                scalar: php.parse_protected_mpi("eddsa_secret")?,
            },

            ECDSA => mpi::SecretKeyMaterial::ECDSA {
                scalar: php.parse_protected_mpi("ecdsa_secret")?,
            },

            ECDH => mpi::SecretKeyMaterial::ECDH {
                scalar: php.parse_protected_mpi("ecdh_secret")?,
            },

            Unknown(_) | Private(_) => {
                let rest: Protected = php.parse_bytes_eof("rest")?.into();
                mpi::SecretKeyMaterial::Unknown {
                    mpis: Vec::<ProtectedMPI>::new().into_boxed_slice(),
                    rest,
                }
            },
        };
        php.finish()?;
        Ok(mpis)
    }
}

impl mpi::Signature {
    /// Parses a set of OpenPGP MPIs representing a signature.
    ///
    /// See [Section 3.2 of RFC 4880] for details.
    ///
    ///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
    pub fn parse(algo: PublicKeyAlgorithm, data: &[u8]) -> Result<Self> {
        let mut php = BodyParser::new(Tag::Signature, data);
        let sig = Self::parse_body(algo, &mut php)?;
        php.finish()?;
        Ok(sig)
    }

    pub(crate) fn parse_body(algo: PublicKeyAlgorithm, php: &mut BodyParser)
                             -> Result<Self> {
        use crate::PublicKeyAlgorithm::*;

        let two = |php: &mut BodyParser, r: &'static str, s: &'static str|
                   -> Result<(MPI, MPI)> {
            Ok((php.parse_mpi(r)?, php.parse_mpi(s)?))
        };

        match algo {
            RSAEncryptSign | RSASign => Ok(mpi::Signature::RSA {
                s: php.parse_mpi("rsa_signature")?,
            }),

            DSA => {
                let (r, s) = two(php, "dsa_sig_r", "dsa_sig_s")?;
                Ok(mpi::Signature::DSA { r, s })
            },

            ElGamalEncryptSign => {
                let (r, s) = two(php, "elgamal_sig_r", "elgamal_sig_s")?;
                Ok(mpi::Signature::ElGamal { r, s })
            },

            EdDSA => {
                let (r, s) = two(php, "eddsa_sig_r", "eddsa_sig_s")?;
                Ok(mpi::Signature::EdDSA { r, s })
            },

            ECDSA => {
                let (r, s) = two(php, "ecdsa_sig_r", "ecdsa_sig_s")?;
                Ok(mpi::Signature::ECDSA { r, s })
            },

            RSAEncrypt | ElGamalEncrypt | ECDH | Unknown(_) | Private(_) => {
                let rest = php.parse_bytes_eof("rest")?;
                Ok(mpi::Signature::Unknown {
                    mpis: Vec::new().into_boxed_slice(),
                    rest: rest.to_vec().into_boxed_slice(),
                })
            },
        }
    }
}
