//! ECDSA signing and verification.
//!
//! Two back-end tiers are wired up: a platform-provided implementation
//! (`ring`), used for the curve/hash combinations it supports when the
//! whole message is available as one buffer, and a pure Rust fallback
//! operating on the externally computed digest.
//!
//! A key the platform tier rejects as malformed is an error; any other
//! platform failure falls through to the software tier. P-521 is never
//! offered to the platform tier.

use log::warn;
use rand::{CryptoRng, Rng};
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use zeroize::Zeroize;

use crate::crypto::ecc_curve::ECCCurve;
use crate::crypto::hash::HashAlgorithm;
use crate::errors::{Error, MalformedParamsSnafu, Result};
use crate::types::Mpi;

/// Creates an ECDSA signature over `digest`.
///
/// `message` carries the full signed payload when it is available in one
/// contiguous buffer; pass `None` when the payload was streamed and only
/// the digest exists. The streamed path always uses the software tier.
pub fn sign(
    curve: &ECCCurve,
    hash: HashAlgorithm,
    digest: &[u8],
    message: Option<&[u8]>,
    d: &Mpi,
    q: &Mpi,
) -> Result<(Mpi, Mpi)> {
    if let Some(message) = message {
        if platform::supported(curve, hash) {
            match platform::sign(curve, hash, message, d, q) {
                Ok(sig) => return Ok(sig),
                Err(err @ Error::MalformedParams { .. }) => return Err(err),
                Err(err) => {
                    warn!("platform ecdsa signing failed, falling back: {:?}", err);
                }
            }
        }
    }

    soft::sign(curve, digest, d)
}

/// Verifies an ECDSA signature over `digest`.
///
/// As with [`sign`], `message` is the contiguous payload if one exists;
/// streamed payloads verify through the software tier only.
pub fn verify(
    curve: &ECCCurve,
    hash: HashAlgorithm,
    digest: &[u8],
    message: Option<&[u8]>,
    q: &Mpi,
    r: &Mpi,
    s: &Mpi,
) -> Result<()> {
    if let Some(message) = message {
        if platform::supported(curve, hash) {
            match platform::verify(curve, hash, message, q, r, s) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!("platform ecdsa verification failed, falling back: {:?}", err);
                }
            }
        }
    }

    soft::verify(curve, digest, q, r, s)
}

/// Checks that the key pair `(q, d)` is usable, by signing and verifying
/// a fresh 8 byte random message with SHA-256.
pub fn validate_params<R: CryptoRng + Rng>(
    rng: &mut R,
    curve: &ECCCurve,
    q: &Mpi,
    d: &Mpi,
) -> bool {
    let mut message = [0u8; 8];
    rng.fill(&mut message[..]);

    let Ok(digest) = HashAlgorithm::SHA2_256.digest(&message) else {
        return false;
    };

    let (r, s) = match sign(
        curve,
        HashAlgorithm::SHA2_256,
        &digest,
        Some(&message),
        d,
        q,
    ) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    verify(
        curve,
        HashAlgorithm::SHA2_256,
        &digest,
        Some(&message),
        q,
        &r,
        &s,
    )
    .is_ok()
}

/// Generates a fresh key pair on the given curve.
///
/// Returns `(q, d)`: the public point in SEC1 uncompressed encoding and
/// the secret scalar.
pub fn generate<R: CryptoRng + Rng>(rng: &mut R, curve: &ECCCurve) -> Result<(Mpi, Mpi)> {
    macro_rules! generate_on {
        ($mod:ident) => {{
            let key = $mod::ecdsa::SigningKey::random(rng);
            let q = $mod::ecdsa::VerifyingKey::from(&key).to_encoded_point(false);
            let mut d = key.to_bytes().to_vec();
            let res = (Mpi::from_slice(q.as_bytes()), Mpi::from_slice(&d));
            d.zeroize();
            Ok(res)
        }};
    }

    match curve {
        ECCCurve::P256 => generate_on!(p256),
        ECCCurve::P384 => generate_on!(p384),
        ECCCurve::P521 => generate_on!(p521),
        ECCCurve::Secp256k1 => generate_on!(k256),
        _ => unsupported_err!("curve {} for ECDSA", curve),
    }
}

/// Checks that a parsed secret scalar lies within the valid range for
/// the curve. The NIST and Koblitz scalars are rebuilt through their
/// typed representation, everything else gets a length check.
pub(crate) fn ensure_secret_scalar(curve: &ECCCurve, d: &Mpi) -> Result<()> {
    macro_rules! check_on {
        ($mod:ident) => {{
            let mut padded = d.to_padded(curve.secret_key_length())?;
            let res = $mod::ecdsa::SigningKey::from_slice(&padded);
            padded.zeroize();
            res.map_err(|_| {
                MalformedParamsSnafu {
                    message: format!("secret scalar out of range for {}", curve),
                }
                .build()
            })?;
        }};
    }

    match curve {
        ECCCurve::P256 => check_on!(p256),
        ECCCurve::P384 => check_on!(p384),
        ECCCurve::P521 => check_on!(p521),
        ECCCurve::Secp256k1 => check_on!(k256),
        _ => {
            ensure!(
                !d.is_empty() && d.len() <= curve.secret_key_length(),
                "secret scalar out of range for {}",
                curve
            );
        }
    }

    Ok(())
}

/// Platform-provided tier, backed by `ring`.
mod platform {
    use super::*;

    /// ring only offers ECDSA with matching curve/digest widths, over a
    /// contiguous message buffer.
    pub(super) fn supported(curve: &ECCCurve, hash: HashAlgorithm) -> bool {
        matches!(
            (curve, hash),
            (ECCCurve::P256, HashAlgorithm::SHA2_256) | (ECCCurve::P384, HashAlgorithm::SHA2_384)
        )
    }

    fn signing_alg(
        curve: &ECCCurve,
        hash: HashAlgorithm,
    ) -> Result<&'static ring::signature::EcdsaSigningAlgorithm> {
        match (curve, hash) {
            (ECCCurve::P256, HashAlgorithm::SHA2_256) => {
                Ok(&ring::signature::ECDSA_P256_SHA256_FIXED_SIGNING)
            }
            (ECCCurve::P384, HashAlgorithm::SHA2_384) => {
                Ok(&ring::signature::ECDSA_P384_SHA384_FIXED_SIGNING)
            }
            _ => unsupported_err!("platform ecdsa for {} with {}", curve, hash),
        }
    }

    fn verification_alg(
        curve: &ECCCurve,
        hash: HashAlgorithm,
    ) -> Result<&'static ring::signature::EcdsaVerificationAlgorithm> {
        match (curve, hash) {
            (ECCCurve::P256, HashAlgorithm::SHA2_256) => Ok(&ring::signature::ECDSA_P256_SHA256_FIXED),
            (ECCCurve::P384, HashAlgorithm::SHA2_384) => Ok(&ring::signature::ECDSA_P384_SHA384_FIXED),
            _ => unsupported_err!("platform ecdsa for {} with {}", curve, hash),
        }
    }

    pub(super) fn sign(
        curve: &ECCCurve,
        hash: HashAlgorithm,
        message: &[u8],
        d: &Mpi,
        q: &Mpi,
    ) -> Result<(Mpi, Mpi)> {
        let alg = signing_alg(curve, hash)?;
        let field = curve.secret_key_length();
        let rng = ring::rand::SystemRandom::new();

        let mut d_padded = d.to_padded(field)?;
        let key_pair = ring::signature::EcdsaKeyPair::from_private_key_and_public_key(
            alg,
            &d_padded,
            q.as_bytes(),
            &rng,
        );
        d_padded.zeroize();

        // `KeyRejected` means the platform considers the key material
        // itself broken, which must not be masked by a fallback.
        let key_pair = key_pair.map_err(|err| {
            MalformedParamsSnafu {
                message: format!("platform rejected key material: {}", err),
            }
            .build()
        })?;

        let sig = key_pair
            .sign(&rng, message)
            .map_err(|_| format_err!("platform signing failed"))?;

        let bytes = sig.as_ref();
        ensure_eq!(bytes.len(), field * 2, "unexpected platform signature size");

        Ok((
            Mpi::from_slice(&bytes[..field]),
            Mpi::from_slice(&bytes[field..]),
        ))
    }

    pub(super) fn verify(
        curve: &ECCCurve,
        hash: HashAlgorithm,
        message: &[u8],
        q: &Mpi,
        r: &Mpi,
        s: &Mpi,
    ) -> Result<()> {
        let alg = verification_alg(curve, hash)?;
        let field = curve.secret_key_length();

        let mut sig = r.to_padded(field)?;
        sig.extend_from_slice(&s.to_padded(field)?);

        let key = ring::signature::UnparsedPublicKey::new(alg, q.as_bytes());
        key.verify(message, &sig)
            .map_err(|_| format_err!("platform signature verification failed"))?;

        Ok(())
    }
}

/// Pure Rust tier, operating on the externally computed digest.
mod soft {
    use super::*;

    macro_rules! sign_on {
        ($mod:ident, $curve:expr, $digest:expr, $d:expr) => {{
            let mut padded = $d.to_padded($curve.secret_key_length())?;
            let key = $mod::ecdsa::SigningKey::from_slice(&padded);
            padded.zeroize();
            let key = key?;

            let sig: $mod::ecdsa::Signature = key.sign_prehash($digest)?;
            let (r, s) = sig.split_bytes();
            Ok((Mpi::from_slice(&r), Mpi::from_slice(&s)))
        }};
    }

    macro_rules! verify_on {
        ($mod:ident, $curve:expr, $digest:expr, $q:expr, $r:expr, $s:expr) => {{
            let key = $mod::ecdsa::VerifyingKey::from_sec1_bytes($q.as_bytes())?;

            let field = $curve.secret_key_length();
            let r = $mod::FieldBytes::clone_from_slice(&$r.to_padded(field)?);
            let s = $mod::FieldBytes::clone_from_slice(&$s.to_padded(field)?);
            let sig = $mod::ecdsa::Signature::from_scalars(r, s)?;

            key.verify_prehash($digest, &sig)?;
            Ok(())
        }};
    }

    pub(super) fn sign(curve: &ECCCurve, digest: &[u8], d: &Mpi) -> Result<(Mpi, Mpi)> {
        match curve {
            ECCCurve::P256 => sign_on!(p256, curve, digest, d),
            ECCCurve::P384 => sign_on!(p384, curve, digest, d),
            ECCCurve::P521 => sign_on!(p521, curve, digest, d),
            ECCCurve::Secp256k1 => sign_on!(k256, curve, digest, d),
            _ => unsupported_err!("curve {} for ECDSA", curve),
        }
    }

    pub(super) fn verify(
        curve: &ECCCurve,
        digest: &[u8],
        q: &Mpi,
        r: &Mpi,
        s: &Mpi,
    ) -> Result<()> {
        match curve {
            ECCCurve::P256 => verify_on!(p256, curve, digest, q, r, s),
            ECCCurve::P384 => verify_on!(p384, curve, digest, q, r, s),
            ECCCurve::P521 => verify_on!(p521, curve, digest, q, r, s),
            ECCCurve::Secp256k1 => verify_on!(k256, curve, digest, q, r, s),
            _ => unsupported_err!("curve {} for ECDSA", curve),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn digest_of(data: &[u8], hash: HashAlgorithm) -> Vec<u8> {
        hash.digest(data).unwrap()
    }

    #[test]
    fn test_sign_verify_p256() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (q, d) = generate(&mut rng, &ECCCurve::P256).unwrap();

        let message = b"hello signed world";
        let digest = digest_of(message, HashAlgorithm::SHA2_256);

        // contiguous message, the platform tier handles this one
        let (r, s) = sign(
            &ECCCurve::P256,
            HashAlgorithm::SHA2_256,
            &digest,
            Some(message),
            &d,
            &q,
        )
        .unwrap();
        verify(
            &ECCCurve::P256,
            HashAlgorithm::SHA2_256,
            &digest,
            Some(message),
            &q,
            &r,
            &s,
        )
        .unwrap();

        // the same signature must verify through the digest-only path
        verify(
            &ECCCurve::P256,
            HashAlgorithm::SHA2_256,
            &digest,
            None,
            &q,
            &r,
            &s,
        )
        .unwrap();
    }

    #[test]
    fn test_tiers_agree() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (q, d) = generate(&mut rng, &ECCCurve::P256).unwrap();

        let message = b"cross tier agreement";
        let digest = digest_of(message, HashAlgorithm::SHA2_256);

        // digest-only signing uses the software tier
        let (r, s) = sign(
            &ECCCurve::P256,
            HashAlgorithm::SHA2_256,
            &digest,
            None,
            &d,
            &q,
        )
        .unwrap();

        // platform tier must accept the software signature
        verify(
            &ECCCurve::P256,
            HashAlgorithm::SHA2_256,
            &digest,
            Some(message),
            &q,
            &r,
            &s,
        )
        .unwrap();
    }

    #[test]
    fn test_sign_verify_p521_software_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (q, d) = generate(&mut rng, &ECCCurve::P521).unwrap();

        let message = b"big curve";
        let digest = digest_of(message, HashAlgorithm::SHA2_512);

        let (r, s) = sign(
            &ECCCurve::P521,
            HashAlgorithm::SHA2_512,
            &digest,
            Some(message),
            &d,
            &q,
        )
        .unwrap();
        verify(
            &ECCCurve::P521,
            HashAlgorithm::SHA2_512,
            &digest,
            Some(message),
            &q,
            &r,
            &s,
        )
        .unwrap();
    }

    #[test]
    fn test_verify_rejects_tampered() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (q, d) = generate(&mut rng, &ECCCurve::P256).unwrap();

        let message = b"original";
        let digest = digest_of(message, HashAlgorithm::SHA2_256);
        let (r, s) = sign(
            &ECCCurve::P256,
            HashAlgorithm::SHA2_256,
            &digest,
            Some(message),
            &d,
            &q,
        )
        .unwrap();

        let tampered = b"modified";
        let tampered_digest = digest_of(tampered, HashAlgorithm::SHA2_256);
        assert!(verify(
            &ECCCurve::P256,
            HashAlgorithm::SHA2_256,
            &tampered_digest,
            Some(tampered),
            &q,
            &r,
            &s,
        )
        .is_err());
    }

    #[test]
    fn test_validate_params() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let (q, d) = generate(&mut rng, &ECCCurve::P256).unwrap();
        assert!(validate_params(&mut rng, &ECCCurve::P256, &q, &d));

        // a mismatched pair must fail the self test
        let (q2, _) = generate(&mut rng, &ECCCurve::P256).unwrap();
        assert!(!validate_params(&mut rng, &ECCCurve::P256, &q2, &d));

        let (qk, dk) = generate(&mut rng, &ECCCurve::Secp256k1).unwrap();
        assert!(validate_params(&mut rng, &ECCCurve::Secp256k1, &qk, &dk));
    }

    #[test]
    fn test_secret_scalar_range() {
        ensure_secret_scalar(&ECCCurve::P256, &Mpi::from_slice(&[0x42; 32])).unwrap();
        // zero is out of range
        assert!(ensure_secret_scalar(&ECCCurve::P256, &Mpi::from_slice(&[0u8; 32])).is_err());
        // 33 byte scalars cannot fit
        assert!(ensure_secret_scalar(&ECCCurve::P256, &Mpi::from_slice(&[0x42; 33])).is_err());
    }
}
