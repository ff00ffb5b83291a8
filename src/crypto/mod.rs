pub mod aead;
pub mod checksum;
pub mod ecc_curve;
pub mod ecdh;
pub mod ecdsa;
pub mod eddsa;
pub mod hash;
pub mod public_key;
pub mod sym;

pub use self::aead::AeadAlgorithm;
pub use self::ecc_curve::{ecc_curve_from_oid, ECCCurve};
pub use self::hash::HashAlgorithm;
pub use self::public_key::PublicKeyAlgorithm;
pub use self::sym::SymmetricKeyAlgorithm;

use rand::{CryptoRng, Rng};

use crate::errors::Result;
use crate::types::{PlainSecretParams, PublicParams};

/// The kinds of keys this crate can generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    /// Signing key on one of the supported ECDSA curves.
    Ecdsa(ECCCurve),
    /// Ed25519 signing key, in the legacy curve OID encoding.
    EdDSALegacy,
    /// Encryption key on one of the supported ECDH curves.
    Ecdh(ECCCurve),
}

impl KeyType {
    pub fn to_alg(&self) -> PublicKeyAlgorithm {
        match self {
            KeyType::Ecdsa(_) => PublicKeyAlgorithm::ECDSA,
            KeyType::EdDSALegacy => PublicKeyAlgorithm::EdDSA,
            KeyType::Ecdh(_) => PublicKeyAlgorithm::ECDH,
        }
    }

    pub fn generate<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(PublicParams, PlainSecretParams)> {
        match self {
            KeyType::Ecdsa(curve) => {
                let (q, d) = ecdsa::generate(rng, curve)?;
                Ok((
                    PublicParams::ECDSA {
                        curve: curve.clone(),
                        p: q,
                    },
                    PlainSecretParams::ECDSA { x: d },
                ))
            }
            KeyType::EdDSALegacy => {
                let (q, seed) = eddsa::generate(rng)?;
                Ok((
                    PublicParams::EdDSALegacy {
                        curve: ECCCurve::Ed25519,
                        q,
                    },
                    PlainSecretParams::EdDSALegacy { x: seed },
                ))
            }
            KeyType::Ecdh(curve) => {
                let (q, x) = ecdh::generate(rng, curve)?;
                Ok((
                    PublicParams::ECDH {
                        curve: curve.clone(),
                        p: q,
                        hash: curve.hash_algo(),
                        alg_sym: curve.sym_algo(),
                    },
                    PlainSecretParams::ECDH { x },
                ))
            }
        }
    }
}
