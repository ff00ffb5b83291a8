//! Legacy EdDSA (curve OID encoded) helpers for Ed25519.

use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use rand::{CryptoRng, Rng};
use zeroize::Zeroize;

use crate::errors::{MalformedParamsSnafu, Result};
use crate::types::Mpi;

/// Prefix marking a native (compressed) EC point encoding.
pub const NATIVE_POINT_PREFIX: u8 = 0x40;

/// Generates a fresh Ed25519 key pair.
///
/// Returns `(q, seed)` with `q` in the prefixed native encoding.
pub fn generate<R: CryptoRng + Rng>(rng: &mut R) -> Result<(Mpi, Mpi)> {
    let mut seed = [0u8; 32];
    rng.fill(&mut seed[..]);

    let key = SigningKey::from_bytes(&seed);

    let mut q = vec![NATIVE_POINT_PREFIX];
    q.extend_from_slice(&key.verifying_key().to_bytes());

    let res = (Mpi::from_slice(&q), Mpi::from_slice(&seed));
    seed.zeroize();
    Ok(res)
}

fn verifying_key(q: &Mpi) -> Result<VerifyingKey> {
    let q = q.as_bytes();
    ensure_eq!(q.len(), 33, "invalid Ed25519 public point length");
    ensure_eq!(q[0], NATIVE_POINT_PREFIX, "invalid Ed25519 point prefix");

    let pk: [u8; 32] = q[1..].try_into().expect("length checked above");
    VerifyingKey::from_bytes(&pk).map_err(|_| {
        MalformedParamsSnafu {
            message: "invalid Ed25519 public point".to_string(),
        }
        .build()
    })
}

fn signing_key(x: &Mpi) -> Result<SigningKey> {
    let mut seed: [u8; 32] = x
        .to_padded(32)?
        .try_into()
        .expect("padded to 32 bytes above");
    let key = SigningKey::from_bytes(&seed);
    seed.zeroize();
    Ok(key)
}

/// Signs the given digest, returning `(r, s)`.
pub fn sign(x: &Mpi, digest: &[u8]) -> Result<(Mpi, Mpi)> {
    use ed25519_dalek::Signer;

    let key = signing_key(x)?;
    let sig = key.sign(digest).to_bytes();

    Ok((Mpi::from_slice(&sig[..32]), Mpi::from_slice(&sig[32..])))
}

/// Verifies the `(r, s)` signature over the given digest.
pub fn verify(q: &Mpi, digest: &[u8], r: &Mpi, s: &Mpi) -> Result<()> {
    let key = verifying_key(q)?;

    let mut sig = r.to_padded(32)?;
    sig.extend_from_slice(&s.to_padded(32)?);
    let sig = Signature::from_slice(&sig)?;

    key.verify_strict(digest, &sig)?;
    Ok(())
}

/// Checks that the secret seed derives the stored public point.
pub fn validate(q: &Mpi, x: &Mpi) -> Result<()> {
    let expected = verifying_key(q)?;
    let derived = signing_key(x)?.verifying_key();

    ensure_eq!(
        expected.to_bytes(),
        derived.to_bytes(),
        "secret seed does not match public point"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_sign_verify() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (q, x) = generate(&mut rng).unwrap();

        let digest = [0xabu8; 32];
        let (r, s) = sign(&x, &digest).unwrap();
        verify(&q, &digest, &r, &s).unwrap();

        assert!(verify(&q, &[0xcd; 32], &r, &s).is_err());
    }

    #[test]
    fn test_validate() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (q, x) = generate(&mut rng).unwrap();
        validate(&q, &x).unwrap();

        let (q2, _) = generate(&mut rng).unwrap();
        assert!(validate(&q2, &x).is_err());
    }
}
