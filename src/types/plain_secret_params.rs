use std::fmt;
use std::io::{self, BufRead};

use num_bigint::BigUint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::checksum;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::{ecdh, ecdsa, eddsa};
use crate::errors::{Result, ValidationFailedSnafu};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::{Mpi, PublicParams};
use crate::util::TeeWriter;

/// Decrypted secret parameters of a key, algorithm dependent.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.5.3>
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum PlainSecretParams {
    RSA { d: Mpi, p: Mpi, q: Mpi, u: Mpi },
    DSA { x: Mpi },
    Elgamal { x: Mpi },
    ECDSA { x: Mpi },
    ECDH { x: Mpi },
    EdDSALegacy { x: Mpi },
}

impl PlainSecretParams {
    /// Parses the algorithm specific secret fields.
    ///
    /// The reader must hold exactly the secret fields, without the
    /// trailing checksum.
    pub fn try_from_reader<B: BufRead>(
        mut i: B,
        alg: PublicKeyAlgorithm,
        public_params: &PublicParams,
    ) -> Result<Self> {
        let params = match (alg, public_params) {
            (
                PublicKeyAlgorithm::RSA
                | PublicKeyAlgorithm::RSAEncrypt
                | PublicKeyAlgorithm::RSASign,
                PublicParams::RSA { .. },
            ) => {
                let d = Mpi::try_from_reader(&mut i)?;
                let p = Mpi::try_from_reader(&mut i)?;
                let q = Mpi::try_from_reader(&mut i)?;
                let u = Mpi::try_from_reader(&mut i)?;
                PlainSecretParams::RSA { d, p, q, u }
            }
            (PublicKeyAlgorithm::DSA, PublicParams::DSA { .. }) => {
                let x = Mpi::try_from_reader(&mut i)?;
                PlainSecretParams::DSA { x }
            }
            (
                PublicKeyAlgorithm::Elgamal | PublicKeyAlgorithm::ElgamalSign,
                PublicParams::Elgamal { .. },
            ) => {
                let x = Mpi::try_from_reader(&mut i)?;
                PlainSecretParams::Elgamal { x }
            }
            (PublicKeyAlgorithm::ECDSA, PublicParams::ECDSA { curve, .. }) => {
                let x = Mpi::try_from_reader(&mut i)?;
                ecdsa::ensure_secret_scalar(curve, &x)?;
                PlainSecretParams::ECDSA { x }
            }
            (PublicKeyAlgorithm::ECDH, PublicParams::ECDH { curve, .. }) => {
                let x = Mpi::try_from_reader(&mut i)?;
                ensure!(
                    !x.is_empty() && x.len() <= curve.secret_key_length(),
                    "secret scalar out of range for {}",
                    curve
                );
                PlainSecretParams::ECDH { x }
            }
            (PublicKeyAlgorithm::EdDSA, PublicParams::EdDSALegacy { .. }) => {
                let x = Mpi::try_from_reader(&mut i)?;
                ensure!(
                    !x.is_empty() && x.len() <= 32,
                    "invalid Ed25519 seed length {}",
                    x.len()
                );
                PlainSecretParams::EdDSALegacy { x }
            }
            _ => bail!("inconsistent key state: {:?} / {:?}", alg, public_params),
        };

        ensure!(
            !i.has_remaining()?,
            "failed to process full secret key material"
        );

        Ok(params)
    }

    /// Serializes the secret fields without a checksum.
    pub fn to_writer_raw<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PlainSecretParams::RSA { d, p, q, u } => {
                d.to_writer(writer)?;
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                u.to_writer(writer)?;
            }
            PlainSecretParams::DSA { x }
            | PlainSecretParams::Elgamal { x }
            | PlainSecretParams::ECDSA { x }
            | PlainSecretParams::ECDH { x }
            | PlainSecretParams::EdDSALegacy { x } => {
                x.to_writer(writer)?;
            }
        }

        Ok(())
    }

    pub fn write_len_raw(&self) -> usize {
        match self {
            PlainSecretParams::RSA { d, p, q, u } => {
                d.write_len() + p.write_len() + q.write_len() + u.write_len()
            }
            PlainSecretParams::DSA { x }
            | PlainSecretParams::Elgamal { x }
            | PlainSecretParams::ECDSA { x }
            | PlainSecretParams::ECDH { x }
            | PlainSecretParams::EdDSALegacy { x } => x.write_len(),
        }
    }

    /// The two-octet sum-mod-65536 checksum over the raw secret fields.
    pub fn checksum_simple(&self) -> [u8; 2] {
        let mut hasher = checksum::SimpleChecksum::default();
        self.to_writer_raw(&mut hasher).expect("known write target");
        hasher.finalize()
    }

    /// SHA-1 over the raw secret fields, used by s2k usage 254.
    pub fn checksum_sha1(&self) -> Result<[u8; 20]> {
        let mut buf = Vec::with_capacity(self.write_len_raw());
        self.to_writer_raw(&mut buf).expect("known write target");
        let res = checksum::calculate_sha1([&buf]);
        buf.zeroize();
        res
    }

    /// Algebraic check that the secret and public parameters belong together.
    pub fn validate(&self, public_params: &PublicParams) -> Result<()> {
        let failed = |message: &str| {
            ValidationFailedSnafu {
                message: message.to_string(),
            }
            .build()
        };

        match (self, public_params) {
            (PlainSecretParams::RSA { p, q, .. }, PublicParams::RSA { n, .. }) => {
                let p = BigUint::from_bytes_be(p.as_bytes());
                let q = BigUint::from_bytes_be(q.as_bytes());
                let n = BigUint::from_bytes_be(n.as_bytes());
                if p * q != n {
                    return Err(failed("RSA primes do not multiply to the modulus"));
                }
                Ok(())
            }
            (PlainSecretParams::DSA { x }, PublicParams::DSA { p, g, y, .. })
            | (PlainSecretParams::Elgamal { x }, PublicParams::Elgamal { p, g, y }) => {
                let p = BigUint::from_bytes_be(p.as_bytes());
                let g = BigUint::from_bytes_be(g.as_bytes());
                let y = BigUint::from_bytes_be(y.as_bytes());
                let x = BigUint::from_bytes_be(x.as_bytes());
                if g.modpow(&x, &p) != y {
                    return Err(failed("secret exponent does not match public value"));
                }
                Ok(())
            }
            (PlainSecretParams::ECDSA { x }, PublicParams::ECDSA { curve, p }) => {
                let mut rng = rand::thread_rng();
                if !ecdsa::validate_params(&mut rng, curve, p, x) {
                    return Err(failed("ECDSA sign/verify self test failed"));
                }
                Ok(())
            }
            (PlainSecretParams::ECDH { x }, PublicParams::ECDH { curve, p, .. }) => {
                ecdh::validate(curve, p, x).map_err(|err| failed(&err.to_string()))
            }
            (PlainSecretParams::EdDSALegacy { x }, PublicParams::EdDSALegacy { q, .. }) => {
                eddsa::validate(q, x).map_err(|err| failed(&err.to_string()))
            }
            _ => Err(failed("inconsistent secret and public parameters")),
        }
    }
}

impl Serialize for PlainSecretParams {
    /// Serializes the secret fields followed by the two-octet checksum.
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let mut hasher = checksum::SimpleChecksum::default();
        {
            let mut tee = TeeWriter::new(&mut hasher, writer);
            self.to_writer_raw(&mut tee)?;
        }
        hasher.to_writer(writer)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        self.write_len_raw() + 2
    }
}

impl fmt::Debug for PlainSecretParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlainSecretParams::RSA { .. } => "RSA",
            PlainSecretParams::DSA { .. } => "DSA",
            PlainSecretParams::Elgamal { .. } => "Elgamal",
            PlainSecretParams::ECDSA { .. } => "ECDSA",
            PlainSecretParams::ECDH { .. } => "ECDH",
            PlainSecretParams::EdDSALegacy { .. } => "EdDSALegacy",
        };
        write!(f, "PlainSecretParams::{}([..])", name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::{ECCCurve, KeyType};

    #[test]
    fn test_roundtrip_with_checksum() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (public, secret) = KeyType::Ecdsa(ECCCurve::P256).generate(&mut rng).unwrap();

        let buf = secret.to_bytes().unwrap();
        assert_eq!(buf.len(), secret.write_len());

        // split off and verify the checksum
        let (raw, cs) = buf.split_at(buf.len() - 2);
        assert_eq!(cs, checksum::calculate_simple(raw).to_be_bytes());

        let back =
            PlainSecretParams::try_from_reader(&mut &raw[..], PublicKeyAlgorithm::ECDSA, &public)
                .unwrap();
        assert_eq!(secret, back);
    }

    #[test]
    fn test_validate_generated() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for key_type in [
            KeyType::Ecdsa(ECCCurve::P256),
            KeyType::EdDSALegacy,
            KeyType::Ecdh(ECCCurve::Curve25519),
        ] {
            let (public, secret) = key_type.generate(&mut rng).unwrap();
            secret.validate(&public).unwrap();
        }
    }

    #[test]
    fn test_validate_mismatch() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (public, _) = KeyType::Ecdsa(ECCCurve::P256).generate(&mut rng).unwrap();
        let (_, other_secret) = KeyType::Ecdsa(ECCCurve::P256).generate(&mut rng).unwrap();

        assert!(other_secret.validate(&public).is_err());
    }
}
