use std::io::{self, BufRead};

use byteorder::WriteBytesExt;
use bytes::Bytes;

use crate::crypto::ecc_curve::{ecc_curve_from_oid, ECCCurve};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{MalformedParamsSnafu, Result, UnknownAlgorithmSnafu};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::Mpi;

/// The public parameters of a key, algorithm dependent.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.5.2>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicParams {
    RSA {
        n: Mpi,
        e: Mpi,
    },
    DSA {
        p: Mpi,
        q: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Elgamal {
        p: Mpi,
        g: Mpi,
        y: Mpi,
    },
    /// Ref: <https://tools.ietf.org/html/rfc6637#section-9>
    ECDSA {
        curve: ECCCurve,
        p: Mpi,
    },
    /// Ref: <https://tools.ietf.org/html/rfc6637#section-9>
    ECDH {
        curve: ECCCurve,
        p: Mpi,
        hash: HashAlgorithm,
        alg_sym: SymmetricKeyAlgorithm,
    },
    /// Ref: <https://tools.ietf.org/html/draft-koch-eddsa-for-openpgp-00#section-4>
    EdDSALegacy {
        curve: ECCCurve,
        q: Mpi,
    },
    /// Parameters we cannot interpret, carried as raw bytes.
    Unknown {
        data: Bytes,
    },
}

/// Summary of a key's algorithm, as shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmInfo {
    pub algorithm: PublicKeyAlgorithm,
    pub bits: Option<usize>,
    pub curve: Option<String>,
}

fn read_curve<B: BufRead>(mut i: B) -> Result<ECCCurve> {
    let oid_len = i.read_u8()?;
    // 0 and 0xFF are reserved for future extensions
    ensure!(
        oid_len != 0 && oid_len != 0xFF,
        "invalid curve OID length {}",
        oid_len
    );
    let oid = i.take_bytes(oid_len.into())?;

    ecc_curve_from_oid(&oid).ok_or_else(|| {
        MalformedParamsSnafu {
            message: format!("invalid curve OID {}", hex::encode(&oid)),
        }
        .build()
    })
}

fn write_curve<W: io::Write>(curve: &ECCCurve, writer: &mut W) -> Result<()> {
    let oid = curve.oid();
    writer.write_u8(oid.len().try_into()?)?;
    writer.write_all(&oid)?;
    Ok(())
}

impl PublicParams {
    /// Parses the algorithm specific fields of a public key.
    ///
    /// `len`, when available (v5 keys), bounds the field data and allows
    /// unknown algorithms to be carried along unparsed.
    pub fn try_from_reader<B: BufRead>(
        mut i: B,
        alg: PublicKeyAlgorithm,
        len: Option<usize>,
    ) -> Result<Self> {
        if let Some(len) = len {
            let mut limited = i.read_take(len);
            let params = Self::try_from_reader_inner(&mut limited, alg)?;
            ensure_eq!(limited.limit(), 0, "inconsistent key material length");
            return Ok(params);
        }

        Self::try_from_reader_inner(&mut i, alg)
    }

    fn try_from_reader_inner<B: BufRead>(mut i: B, alg: PublicKeyAlgorithm) -> Result<Self> {
        match alg {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
                let n = Mpi::try_from_reader(&mut i)?;
                let e = Mpi::try_from_reader(&mut i)?;
                Ok(PublicParams::RSA { n, e })
            }
            PublicKeyAlgorithm::DSA => {
                let p = Mpi::try_from_reader(&mut i)?;
                let q = Mpi::try_from_reader(&mut i)?;
                let g = Mpi::try_from_reader(&mut i)?;
                let y = Mpi::try_from_reader(&mut i)?;
                Ok(PublicParams::DSA { p, q, g, y })
            }
            PublicKeyAlgorithm::Elgamal | PublicKeyAlgorithm::ElgamalSign => {
                let p = Mpi::try_from_reader(&mut i)?;
                let g = Mpi::try_from_reader(&mut i)?;
                let y = Mpi::try_from_reader(&mut i)?;
                Ok(PublicParams::Elgamal { p, g, y })
            }
            PublicKeyAlgorithm::ECDSA => {
                let curve = read_curve(&mut i)?;
                let p = Mpi::try_from_reader(&mut i)?;
                Ok(PublicParams::ECDSA { curve, p })
            }
            PublicKeyAlgorithm::ECDH => {
                let curve = read_curve(&mut i)?;
                let p = Mpi::try_from_reader(&mut i)?;

                // KDF parameters: length, reserved 0x01, hash, wrap algorithm
                let kdf_len = i.read_u8()?;
                ensure_eq!(kdf_len, 3, "invalid ECDH KDF parameter length");
                let reserved = i.read_u8()?;
                ensure_eq!(reserved, 1, "invalid ECDH KDF reserved octet");

                let hash_code = i.read_u8()?;
                let hash = HashAlgorithm::try_from(hash_code).map_err(|_| {
                    UnknownAlgorithmSnafu {
                        typ: "hash",
                        code: hash_code,
                    }
                    .build()
                })?;
                let sym_code = i.read_u8()?;
                let alg_sym = SymmetricKeyAlgorithm::try_from(sym_code).map_err(|_| {
                    UnknownAlgorithmSnafu {
                        typ: "symmetric",
                        code: sym_code,
                    }
                    .build()
                })?;

                Ok(PublicParams::ECDH {
                    curve,
                    p,
                    hash,
                    alg_sym,
                })
            }
            PublicKeyAlgorithm::EdDSA => {
                let curve = read_curve(&mut i)?;
                let q = Mpi::try_from_reader(&mut i)?;
                Ok(PublicParams::EdDSALegacy { curve, q })
            }
            _ => {
                // known code, but no interpretable parameters
                let data = i.rest()?.freeze();
                Ok(PublicParams::Unknown { data })
            }
        }
    }

    /// Nominal size of the key, in bits.
    pub fn bit_size(&self) -> Option<usize> {
        match self {
            PublicParams::RSA { n, .. } => Some(n.bits()),
            PublicParams::DSA { p, .. } => Some(p.bits()),
            PublicParams::Elgamal { p, .. } => Some(p.bits()),
            PublicParams::ECDSA { curve, .. }
            | PublicParams::ECDH { curve, .. }
            | PublicParams::EdDSALegacy { curve, .. } => Some(curve.nbits().into()),
            PublicParams::Unknown { .. } => None,
        }
    }

    /// The curve this key lives on, if it is an ECC key.
    pub fn curve(&self) -> Option<&ECCCurve> {
        match self {
            PublicParams::ECDSA { curve, .. }
            | PublicParams::ECDH { curve, .. }
            | PublicParams::EdDSALegacy { curve, .. } => Some(curve),
            _ => None,
        }
    }
}

impl Serialize for PublicParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PublicParams::RSA { n, e } => {
                n.to_writer(writer)?;
                e.to_writer(writer)?;
            }
            PublicParams::DSA { p, q, g, y } => {
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::Elgamal { p, g, y } => {
                p.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::ECDSA { curve, p } => {
                write_curve(curve, writer)?;
                p.to_writer(writer)?;
            }
            PublicParams::ECDH {
                curve,
                p,
                hash,
                alg_sym,
            } => {
                write_curve(curve, writer)?;
                p.to_writer(writer)?;
                writer.write_all(&[3, 1, u8::from(*hash), u8::from(*alg_sym)])?;
            }
            PublicParams::EdDSALegacy { curve, q } => {
                write_curve(curve, writer)?;
                q.to_writer(writer)?;
            }
            PublicParams::Unknown { data } => {
                writer.write_all(data)?;
            }
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            PublicParams::RSA { n, e } => n.write_len() + e.write_len(),
            PublicParams::DSA { p, q, g, y } => {
                p.write_len() + q.write_len() + g.write_len() + y.write_len()
            }
            PublicParams::Elgamal { p, g, y } => p.write_len() + g.write_len() + y.write_len(),
            PublicParams::ECDSA { curve, p } => 1 + curve.oid().len() + p.write_len(),
            PublicParams::ECDH { curve, p, .. } => 1 + curve.oid().len() + p.write_len() + 4,
            PublicParams::EdDSALegacy { curve, q } => 1 + curve.oid().len() + q.write_len(),
            PublicParams::Unknown { data } => data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn roundtrip(params: &PublicParams, alg: PublicKeyAlgorithm) {
        let buf = params.to_bytes().unwrap();
        assert_eq!(buf.len(), params.write_len());

        let back = PublicParams::try_from_reader(&mut &buf[..], alg, None).unwrap();
        assert_eq!(params, &back);
        assert_eq!(back.to_bytes().unwrap(), buf);

        // length-bounded parse (v5) must agree
        let back = PublicParams::try_from_reader(&mut &buf[..], alg, Some(buf.len())).unwrap();
        assert_eq!(params, &back);
    }

    #[test]
    fn test_rsa_roundtrip() {
        roundtrip(
            &PublicParams::RSA {
                n: Mpi::from_slice(&[0xC5; 256]),
                e: Mpi::from_slice(&[0x01, 0x00, 0x01]),
            },
            PublicKeyAlgorithm::RSA,
        );
    }

    #[test]
    fn test_ecdsa_roundtrip() {
        let mut point = vec![0x04];
        point.extend_from_slice(&[0xAB; 64]);
        roundtrip(
            &PublicParams::ECDSA {
                curve: ECCCurve::P256,
                p: Mpi::from_slice(&point),
            },
            PublicKeyAlgorithm::ECDSA,
        );
    }

    #[test]
    fn test_dsa_roundtrip() {
        roundtrip(
            &PublicParams::DSA {
                p: Mpi::from_slice(&[0xD1; 128]),
                q: Mpi::from_slice(&[0xD2; 20]),
                g: Mpi::from_slice(&[0x02]),
                y: Mpi::from_slice(&[0xD4; 128]),
            },
            PublicKeyAlgorithm::DSA,
        );
    }

    #[test]
    fn test_eddsa_legacy_roundtrip() {
        let mut point = vec![0x40];
        point.extend_from_slice(&[0xEE; 32]);
        roundtrip(
            &PublicParams::EdDSALegacy {
                curve: ECCCurve::Ed25519,
                q: Mpi::from_slice(&point),
            },
            PublicKeyAlgorithm::EdDSA,
        );
    }

    #[test]
    fn test_ecdh_roundtrip() {
        let mut point = vec![0x40];
        point.extend_from_slice(&[0xCD; 32]);
        roundtrip(
            &PublicParams::ECDH {
                curve: ECCCurve::Curve25519,
                p: Mpi::from_slice(&point),
                hash: HashAlgorithm::SHA2_256,
                alg_sym: SymmetricKeyAlgorithm::AES128,
            },
            PublicKeyAlgorithm::ECDH,
        );
    }

    #[test]
    fn test_inconsistent_length_is_rejected() {
        let params = PublicParams::RSA {
            n: Mpi::from_slice(&[0xC5; 32]),
            e: Mpi::from_slice(&[0x01, 0x00, 0x01]),
        };
        let mut buf = params.to_bytes().unwrap();
        buf.push(0xFF); // trailing garbage within the declared length

        let res = PublicParams::try_from_reader(
            &mut &buf[..],
            PublicKeyAlgorithm::RSA,
            Some(buf.len()),
        );
        assert!(res.is_err());
    }
}
