//! ECDH key material helpers.
//!
//! Only the key material lifecycle lives here (generation and pair
//! validation); the actual key agreement and session key wrap belong to
//! the message layer.

use rand::{CryptoRng, Rng};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::crypto::ecc_curve::ECCCurve;
use crate::crypto::eddsa::NATIVE_POINT_PREFIX;
use crate::errors::Result;
use crate::types::Mpi;

/// Generates a fresh ECDH key pair on the given curve.
///
/// Returns `(q, x)`. For Curve25519 the point uses the prefixed native
/// encoding and the scalar is stored big-endian, as on the wire.
pub fn generate<R: CryptoRng + Rng>(rng: &mut R, curve: &ECCCurve) -> Result<(Mpi, Mpi)> {
    match curve {
        ECCCurve::Curve25519 => {
            let secret = StaticSecret::random_from_rng(&mut *rng);
            let public = PublicKey::from(&secret);

            let mut q = vec![NATIVE_POINT_PREFIX];
            q.extend_from_slice(public.as_bytes());

            // native little endian representation, reversed for the wire
            let mut x = secret.to_bytes();
            x.reverse();
            let res = (Mpi::from_slice(&q), Mpi::from_slice(&x));
            x.zeroize();
            Ok(res)
        }
        ECCCurve::P256 | ECCCurve::P384 | ECCCurve::P521 => {
            crate::crypto::ecdsa::generate(rng, curve)
        }
        _ => unsupported_err!("curve {} for ECDH", curve),
    }
}

/// Checks that the secret scalar derives the stored public point.
pub fn validate(curve: &ECCCurve, q: &Mpi, x: &Mpi) -> Result<()> {
    match curve {
        ECCCurve::Curve25519 => {
            let q = q.as_bytes();
            ensure_eq!(q.len(), 33, "invalid Curve25519 public point length");
            ensure_eq!(q[0], NATIVE_POINT_PREFIX, "invalid Curve25519 point prefix");

            let mut scalar: [u8; 32] = x
                .to_padded(32)?
                .try_into()
                .expect("padded to 32 bytes above");
            // wire format is big endian, the scalar is used little endian
            scalar.reverse();
            let secret = StaticSecret::from(scalar);
            scalar.zeroize();

            let derived = PublicKey::from(&secret);
            ensure_eq!(
                &q[1..],
                derived.as_bytes(),
                "secret scalar does not match public point"
            );
            Ok(())
        }
        ECCCurve::P256 | ECCCurve::P384 | ECCCurve::P521 => {
            macro_rules! validate_on {
                ($mod:ident) => {{
                    let mut padded = x.to_padded(curve.secret_key_length())?;
                    let key = $mod::ecdsa::SigningKey::from_slice(&padded);
                    padded.zeroize();
                    let key = key?;

                    let derived =
                        $mod::ecdsa::VerifyingKey::from(&key).to_encoded_point(false);
                    ensure_eq!(
                        q.as_bytes(),
                        derived.as_bytes(),
                        "secret scalar does not match public point"
                    );
                    Ok(())
                }};
            }

            match curve {
                ECCCurve::P256 => validate_on!(p256),
                ECCCurve::P384 => validate_on!(p384),
                ECCCurve::P521 => validate_on!(p521),
                _ => unreachable!("checked in outer match"),
            }
        }
        _ => unsupported_err!("curve {} for ECDH", curve),
    }
}
