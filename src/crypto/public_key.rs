use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Available public key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-9.1>
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive, Hash)]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    RSA = 1,
    /// DEPRECATED: RSA (Encrypt-Only)
    RSAEncrypt = 2,
    /// DEPRECATED: RSA (Sign-Only)
    RSASign = 3,
    /// Elgamal (Encrypt-Only)
    Elgamal = 16,
    /// DSA (Digital Signature Algorithm)
    DSA = 17,
    /// Elliptic Curve: RFC 6637
    ECDH = 18,
    /// ECDSA: RFC 6637
    ECDSA = 19,
    /// DEPRECATED: Elgamal (Encrypt and Sign)
    ElgamalSign = 20,
    /// Reserved for Diffie-Hellman (X9.42, as defined for IETF-S/MIME)
    DiffieHellman = 21,
    /// EdDSA with a curve OID ("legacy" encoding)
    EdDSA = 22,

    Private100 = 100,
    Private101 = 101,
    Private102 = 102,
    Private103 = 103,
    Private104 = 104,
    Private105 = 105,
    Private106 = 106,
    Private107 = 107,
    Private108 = 108,
    Private109 = 109,
    Private110 = 110,
}

impl PublicKeyAlgorithm {
    /// Can this algorithm produce signatures?
    pub fn is_signing(self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA
                | PublicKeyAlgorithm::RSASign
                | PublicKeyAlgorithm::DSA
                | PublicKeyAlgorithm::ECDSA
                | PublicKeyAlgorithm::ElgamalSign
                | PublicKeyAlgorithm::EdDSA
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_code_is_rejected() {
        assert!(PublicKeyAlgorithm::try_from(4).is_err());
        assert!(PublicKeyAlgorithm::try_from(99).is_err());
        assert!(PublicKeyAlgorithm::try_from(255).is_err());
    }

    #[test]
    fn test_roundtrip() {
        assert!(matches!(
            PublicKeyAlgorithm::try_from(19),
            Ok(PublicKeyAlgorithm::ECDSA)
        ));
        assert_eq!(u8::from(PublicKeyAlgorithm::ECDSA), 19);
    }
}
