use aes::{Aes128, Aes192, Aes256};
use cfb_mode::{Decryptor, Encryptor};
use cipher::{AsyncStreamCipher, KeyIvInit};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::errors::Result;

macro_rules! cfb_encrypt {
    ($cipher:ty, $key:expr, $iv:expr, $data:expr) => {
        Encryptor::<$cipher>::new_from_slices($key, $iv)?.encrypt($data)
    };
}

macro_rules! cfb_decrypt {
    ($cipher:ty, $key:expr, $iv:expr, $data:expr) => {
        Decryptor::<$cipher>::new_from_slices($key, $iv)?.decrypt($data)
    };
}

/// Available symmetric key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-9.2>
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, IntoPrimitive, Hash)]
#[repr(u8)]
pub enum SymmetricKeyAlgorithm {
    /// Plaintext or unencrypted data
    Plaintext = 0,
    IDEA = 1,
    /// TripleDES (DES-EDE, 168 bit key derived from 192)
    TripleDES = 2,
    /// CAST5 (128 bit key, as per RFC 2144)
    CAST5 = 3,
    /// Blowfish (128 bit key, 16 rounds)
    Blowfish = 4,
    AES128 = 7,
    AES192 = 8,
    AES256 = 9,
    /// Twofish with 256-bit key
    Twofish = 10,
    Camellia128 = 11,
    Camellia192 = 12,
    Camellia256 = 13,
}

impl SymmetricKeyAlgorithm {
    /// The size of a single block in bytes.
    pub fn block_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 8,
            SymmetricKeyAlgorithm::TripleDES => 8,
            SymmetricKeyAlgorithm::CAST5 => 8,
            SymmetricKeyAlgorithm::Blowfish => 8,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 16,
            SymmetricKeyAlgorithm::AES256 => 16,
            SymmetricKeyAlgorithm::Twofish => 16,
            SymmetricKeyAlgorithm::Camellia128 => 16,
            SymmetricKeyAlgorithm::Camellia192 => 16,
            SymmetricKeyAlgorithm::Camellia256 => 16,
        }
    }

    /// The size of a key in bytes.
    pub fn key_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 16,
            SymmetricKeyAlgorithm::TripleDES => 24,
            SymmetricKeyAlgorithm::CAST5 => 16,
            SymmetricKeyAlgorithm::Blowfish => 16,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 24,
            SymmetricKeyAlgorithm::AES256 => 32,
            SymmetricKeyAlgorithm::Twofish => 32,
            SymmetricKeyAlgorithm::Camellia128 => 16,
            SymmetricKeyAlgorithm::Camellia192 => 24,
            SymmetricKeyAlgorithm::Camellia256 => 32,
        }
    }

    /// Encrypt the data in place using CFB mode with the given IV,
    /// without the OpenPGP prefix-resynchronization quirk.
    pub fn encrypt_with_iv_regular(self, key: &[u8], iv: &[u8], plaintext: &mut [u8]) -> Result<()> {
        match self {
            SymmetricKeyAlgorithm::AES128 => cfb_encrypt!(Aes128, key, iv, plaintext),
            SymmetricKeyAlgorithm::AES192 => cfb_encrypt!(Aes192, key, iv, plaintext),
            SymmetricKeyAlgorithm::AES256 => cfb_encrypt!(Aes256, key, iv, plaintext),
            _ => unimplemented_err!("CFB encryption for {:?}", self),
        }

        Ok(())
    }

    /// Decrypt the data in place using CFB mode with the given IV,
    /// without the OpenPGP prefix-resynchronization quirk.
    pub fn decrypt_with_iv_regular(
        self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &mut [u8],
    ) -> Result<()> {
        match self {
            SymmetricKeyAlgorithm::AES128 => cfb_decrypt!(Aes128, key, iv, ciphertext),
            SymmetricKeyAlgorithm::AES192 => cfb_decrypt!(Aes192, key, iv, ciphertext),
            SymmetricKeyAlgorithm::AES256 => cfb_decrypt!(Aes256, key, iv, ciphertext),
            _ => unimplemented_err!("CFB decryption for {:?}", self),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_aes_cfb_roundtrip() {
        let key = [0x42u8; 32];
        let iv = [0x24u8; 16];
        let plaintext = b"the quick brown fox jumps over the lazy dog";

        let mut buf = plaintext.to_vec();
        SymmetricKeyAlgorithm::AES256
            .encrypt_with_iv_regular(&key, &iv, &mut buf)
            .unwrap();
        assert_ne!(&buf[..], &plaintext[..]);

        SymmetricKeyAlgorithm::AES256
            .decrypt_with_iv_regular(&key, &iv, &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &plaintext[..]);
    }

    #[test]
    fn test_wrong_key_size() {
        let mut buf = vec![0u8; 16];
        let res =
            SymmetricKeyAlgorithm::AES256.encrypt_with_iv_regular(&[0u8; 7], &[0u8; 16], &mut buf);
        assert!(res.is_err());
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        assert!(SymmetricKeyAlgorithm::try_from(5).is_err());
        assert!(SymmetricKeyAlgorithm::try_from(200).is_err());
    }
}
