use aead::{AeadInPlace, KeyInit, Nonce, Tag};
use aes::cipher::consts::{U12, U15};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::AesGcm;
use eax::Eax;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use ocb3::Ocb3;

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;

/// Available AEAD algorithms.
/// Ref: <https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-04#section-9.6>
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, IntoPrimitive, Hash)]
#[repr(u8)]
pub enum AeadAlgorithm {
    Eax = 1,
    Ocb = 2,
    Gcm = 3,
}

impl Default for AeadAlgorithm {
    fn default() -> Self {
        Self::Eax
    }
}

macro_rules! aead_encrypt {
    ($ty:ty, $key:expr, $nonce:expr, $ad:expr, $buffer:expr) => {{
        let cipher = <$ty>::new_from_slice($key)?;
        let nonce = Nonce::<$ty>::from_slice($nonce);
        let tag = cipher
            .encrypt_in_place_detached(nonce, $ad, $buffer)
            .map_err(|_| format_err!("aead encryption failed"))?;
        Ok(tag.to_vec())
    }};
}

macro_rules! aead_decrypt {
    ($ty:ty, $key:expr, $nonce:expr, $ad:expr, $buffer:expr, $tag:expr) => {{
        let cipher = <$ty>::new_from_slice($key)?;
        let nonce = Nonce::<$ty>::from_slice($nonce);
        let tag = Tag::<$ty>::from_slice($tag);
        cipher
            .decrypt_in_place_detached(nonce, $ad, $buffer, tag)
            .map_err(|_| format_err!("aead authentication failed"))?;
        Ok(())
    }};
}

impl AeadAlgorithm {
    /// Size of the nonce, in bytes.
    pub fn nonce_size(self) -> usize {
        match self {
            AeadAlgorithm::Eax => 16,
            AeadAlgorithm::Ocb => 15,
            AeadAlgorithm::Gcm => 12,
        }
    }

    /// Size of the authentication tag, in bytes.
    pub fn tag_size(self) -> usize {
        16
    }

    /// Encrypts the buffer in place, returning the detached authentication tag.
    pub fn encrypt_in_place(
        self,
        sym_alg: SymmetricKeyAlgorithm,
        key: &[u8],
        nonce: &[u8],
        associated_data: &[u8],
        buffer: &mut [u8],
    ) -> Result<Vec<u8>> {
        ensure_eq!(nonce.len(), self.nonce_size(), "invalid nonce length");

        match (sym_alg, self) {
            (SymmetricKeyAlgorithm::AES128, AeadAlgorithm::Eax) => {
                aead_encrypt!(Eax<Aes128>, key, nonce, associated_data, buffer)
            }
            (SymmetricKeyAlgorithm::AES192, AeadAlgorithm::Eax) => {
                aead_encrypt!(Eax<Aes192>, key, nonce, associated_data, buffer)
            }
            (SymmetricKeyAlgorithm::AES256, AeadAlgorithm::Eax) => {
                aead_encrypt!(Eax<Aes256>, key, nonce, associated_data, buffer)
            }
            (SymmetricKeyAlgorithm::AES128, AeadAlgorithm::Ocb) => {
                aead_encrypt!(Ocb3<Aes128, U15>, key, nonce, associated_data, buffer)
            }
            (SymmetricKeyAlgorithm::AES192, AeadAlgorithm::Ocb) => {
                aead_encrypt!(Ocb3<Aes192, U15>, key, nonce, associated_data, buffer)
            }
            (SymmetricKeyAlgorithm::AES256, AeadAlgorithm::Ocb) => {
                aead_encrypt!(Ocb3<Aes256, U15>, key, nonce, associated_data, buffer)
            }
            (SymmetricKeyAlgorithm::AES128, AeadAlgorithm::Gcm) => {
                aead_encrypt!(AesGcm<Aes128, U12>, key, nonce, associated_data, buffer)
            }
            (SymmetricKeyAlgorithm::AES192, AeadAlgorithm::Gcm) => {
                aead_encrypt!(AesGcm<Aes192, U12>, key, nonce, associated_data, buffer)
            }
            (SymmetricKeyAlgorithm::AES256, AeadAlgorithm::Gcm) => {
                aead_encrypt!(AesGcm<Aes256, U12>, key, nonce, associated_data, buffer)
            }
            _ => unimplemented_err!("AEAD {:?} with {:?}", self, sym_alg),
        }
    }

    /// Decrypts the buffer in place, verifying the detached authentication tag.
    pub fn decrypt_in_place(
        self,
        sym_alg: SymmetricKeyAlgorithm,
        key: &[u8],
        nonce: &[u8],
        associated_data: &[u8],
        buffer: &mut [u8],
        tag: &[u8],
    ) -> Result<()> {
        ensure_eq!(nonce.len(), self.nonce_size(), "invalid nonce length");
        ensure_eq!(tag.len(), self.tag_size(), "invalid tag length");

        match (sym_alg, self) {
            (SymmetricKeyAlgorithm::AES128, AeadAlgorithm::Eax) => {
                aead_decrypt!(Eax<Aes128>, key, nonce, associated_data, buffer, tag)
            }
            (SymmetricKeyAlgorithm::AES192, AeadAlgorithm::Eax) => {
                aead_decrypt!(Eax<Aes192>, key, nonce, associated_data, buffer, tag)
            }
            (SymmetricKeyAlgorithm::AES256, AeadAlgorithm::Eax) => {
                aead_decrypt!(Eax<Aes256>, key, nonce, associated_data, buffer, tag)
            }
            (SymmetricKeyAlgorithm::AES128, AeadAlgorithm::Ocb) => {
                aead_decrypt!(Ocb3<Aes128, U15>, key, nonce, associated_data, buffer, tag)
            }
            (SymmetricKeyAlgorithm::AES192, AeadAlgorithm::Ocb) => {
                aead_decrypt!(Ocb3<Aes192, U15>, key, nonce, associated_data, buffer, tag)
            }
            (SymmetricKeyAlgorithm::AES256, AeadAlgorithm::Ocb) => {
                aead_decrypt!(Ocb3<Aes256, U15>, key, nonce, associated_data, buffer, tag)
            }
            (SymmetricKeyAlgorithm::AES128, AeadAlgorithm::Gcm) => {
                aead_decrypt!(AesGcm<Aes128, U12>, key, nonce, associated_data, buffer, tag)
            }
            (SymmetricKeyAlgorithm::AES192, AeadAlgorithm::Gcm) => {
                aead_decrypt!(AesGcm<Aes192, U12>, key, nonce, associated_data, buffer, tag)
            }
            (SymmetricKeyAlgorithm::AES256, AeadAlgorithm::Gcm) => {
                aead_decrypt!(AesGcm<Aes256, U12>, key, nonce, associated_data, buffer, tag)
            }
            _ => unimplemented_err!("AEAD {:?} with {:?}", self, sym_alg),
        }
    }
}
