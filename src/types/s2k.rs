use std::io::{self, BufRead};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rand::{CryptoRng, Rng};

use crate::crypto::hash::HashAlgorithm;
use crate::errors::{Result, UnknownAlgorithmSnafu};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;

const EXPBIAS: u32 = 6;

/// The non-standard GNU extension marker, following the type octet.
const GNU_EXTENSION: &[u8; 3] = b"GNU";

/// GNU extension protection mode 1: the secret material is not present.
const GNU_DUMMY_MODE: u8 = 1;

/// Available String-To-Key types
/// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7.1>
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StringToKeyType {
    Simple = 0,
    Salted = 1,
    Reserved = 2,
    IteratedAndSalted = 3,
    /// Non-standard GNU extension, used to mark stubbed out secret keys.
    GnuDummy = 101,
}

impl Default for StringToKeyType {
    fn default() -> Self {
        Self::IteratedAndSalted
    }
}

/// String-To-Key specifier: derives a symmetric key from a passphrase.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringToKey {
    typ: StringToKeyType,
    hash: HashAlgorithm,
    salt: Option<[u8; 8]>,
    count: Option<u8>,
}

/// Has the given s2k type a salt?
fn has_salt(typ: StringToKeyType) -> bool {
    matches!(
        typ,
        StringToKeyType::Salted | StringToKeyType::IteratedAndSalted
    )
}

/// Has the given s2k type a count?
fn has_count(typ: StringToKeyType) -> bool {
    matches!(typ, StringToKeyType::IteratedAndSalted)
}

impl StringToKey {
    pub fn new_default<R: CryptoRng + Rng>(rng: &mut R) -> Self {
        StringToKey::new_iterated(rng, HashAlgorithm::default(), 224)
    }

    pub fn new_iterated<R: CryptoRng + Rng>(rng: &mut R, hash: HashAlgorithm, count: u8) -> Self {
        let mut salt = [0u8; 8];
        rng.fill(&mut salt[..]);

        StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash,
            salt: Some(salt),
            count: Some(count),
        }
    }

    /// The sentinel specifier marking stubbed out secret key material.
    pub fn new_gnu_dummy() -> Self {
        StringToKey {
            typ: StringToKeyType::GnuDummy,
            hash: HashAlgorithm::None,
            salt: None,
            count: None,
        }
    }

    /// Parses a specifier, consuming exactly its serialized form.
    pub fn try_from_reader<B: BufRead>(mut i: B) -> Result<Self> {
        let typ_code = i.read_u8()?;
        let typ = StringToKeyType::try_from(typ_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "s2k",
                code: typ_code,
            }
            .build()
        })?;

        let hash_code = i.read_u8()?;
        let hash = HashAlgorithm::try_from(hash_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "hash",
                code: hash_code,
            }
            .build()
        })?;

        if typ == StringToKeyType::GnuDummy {
            let ext = i.read_array::<3>()?;
            ensure_eq!(&ext, GNU_EXTENSION, "invalid gnu extension marker");
            let mode = i.read_u8()?;
            if mode != GNU_DUMMY_MODE {
                // mode 2 is gnu-divert-to-card, which carries smartcard
                // serial data we have no use for
                unsupported_err!("gnu s2k protection mode {}", 1000 + u16::from(mode));
            }

            return Ok(StringToKey {
                typ,
                hash,
                salt: None,
                count: None,
            });
        }

        let salt = if has_salt(typ) {
            Some(i.read_array::<8>()?)
        } else {
            None
        };
        let count = if has_count(typ) {
            Some(i.read_u8()?)
        } else {
            None
        };

        Ok(StringToKey {
            typ,
            hash,
            salt,
            count,
        })
    }

    /// Converts the coded count into the octet count.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7.1.3>
    pub fn count(&self) -> Option<usize> {
        self.count
            .map(|c| ((16u32 + u32::from(c & 15)) << (u32::from(c >> 4) + EXPBIAS)) as usize)
    }

    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_ref().map(|salt| &salt[..])
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn typ(&self) -> StringToKeyType {
        self.typ
    }

    pub fn is_gnu_dummy(&self) -> bool {
        self.typ == StringToKeyType::GnuDummy
    }

    /// Derives a symmetric key of `key_size` bytes from the passphrase.
    ///
    /// When more key material than one digest is needed, further digest
    /// contexts are preloaded with an increasing number of zero octets.
    pub fn derive_key(&self, passphrase: &str, key_size: usize) -> Result<Vec<u8>> {
        ensure!(
            self.typ != StringToKeyType::GnuDummy,
            "gnu-dummy s2k cannot derive a key"
        );

        let digest_size = self.hash.digest_size();
        ensure!(digest_size > 0, "refusing s2k with hash {:?}", self.hash);
        let rounds = key_size.div_ceil(digest_size);

        let mut key = Vec::with_capacity(key_size);

        for round in 0..rounds {
            let mut hasher = self.hash.new_hasher()?;

            // zero octet prefix, growing each round
            if round > 0 {
                hasher.update(&vec![0u8; round][..]);
            }

            match self.typ {
                StringToKeyType::Simple => {
                    hasher.update(passphrase.as_bytes());
                }
                StringToKeyType::Salted => {
                    let salt = self.salt.as_ref().expect("salted s2k carries a salt");
                    hasher.update(salt);
                    hasher.update(passphrase.as_bytes());
                }
                StringToKeyType::IteratedAndSalted => {
                    let salt = self.salt.as_ref().expect("iterated s2k carries a salt");
                    let pw = passphrase.as_bytes();
                    let data_size = salt.len() + pw.len();
                    // how many bytes are supposed to be hashed
                    let mut count = self.count().expect("iterated s2k carries a count");

                    if count < data_size {
                        // if the count is less, hash one full set
                        count = data_size;
                    }

                    while count > data_size {
                        hasher.update(salt);
                        hasher.update(pw);
                        count -= data_size;
                    }

                    if count < salt.len() {
                        hasher.update(&salt[..count]);
                    } else {
                        hasher.update(salt);
                        count -= salt.len();
                        hasher.update(&pw[..count]);
                    }
                }
                _ => unimplemented_err!("S2K {:?} is not available", self.typ),
            }

            let digest = hasher.finish();
            let missing = key_size - key.len();
            if missing < digest_size {
                key.extend_from_slice(&digest[..missing]);
            } else {
                key.extend_from_slice(&digest[..]);
            }
        }

        Ok(key)
    }
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[u8::from(self.typ), u8::from(self.hash)])?;

        if self.typ == StringToKeyType::GnuDummy {
            writer.write_all(GNU_EXTENSION)?;
            writer.write_all(&[GNU_DUMMY_MODE])?;
            return Ok(());
        }

        if let Some(ref salt) = self.salt {
            writer.write_all(salt)?;
        }

        if let Some(count) = self.count {
            writer.write_all(&[count])?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 2;
        if self.typ == StringToKeyType::GnuDummy {
            return sum + 4;
        }
        if self.salt.is_some() {
            sum += 8;
        }
        if self.count.is_some() {
            sum += 1;
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_coded_count() {
        let s2k = StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash: HashAlgorithm::SHA2_256,
            salt: Some(*b"ABCDEFGH"),
            count: Some(0x60),
        };
        // (16 + 0) << (6 + 6)
        assert_eq!(s2k.count(), Some(65536));

        let s2k = StringToKey {
            count: Some(0xff),
            ..s2k
        };
        assert_eq!(s2k.count(), Some(65011712));
    }

    #[test]
    fn test_roundtrip() {
        let s2k = StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash: HashAlgorithm::SHA2_256,
            salt: Some(*b"ABCDEFGH"),
            count: Some(0x60),
        };

        let buf = s2k.to_bytes().unwrap();
        assert_eq!(buf.len(), s2k.write_len());
        let back = StringToKey::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(s2k, back);
        assert_eq!(back.to_bytes().unwrap(), buf);
    }

    #[test]
    fn test_gnu_dummy_roundtrip() {
        let s2k = StringToKey::new_gnu_dummy();
        let buf = s2k.to_bytes().unwrap();
        assert_eq!(&buf, &[101, 0, b'G', b'N', b'U', 1]);

        let back = StringToKey::try_from_reader(&mut &buf[..]).unwrap();
        assert!(back.is_gnu_dummy());
        assert_eq!(s2k, back);
    }

    #[test]
    fn test_gnu_dummy_derive_fails() {
        let s2k = StringToKey::new_gnu_dummy();
        assert!(s2k.derive_key("passphrase", 32).is_err());
    }

    #[test]
    fn test_derive_stretches_key() {
        let s2k = StringToKey {
            typ: StringToKeyType::Salted,
            hash: HashAlgorithm::SHA1,
            salt: Some(*b"12345678"),
            count: None,
        };

        // SHA1 digests are 20 bytes, a 32 byte key needs two rounds
        let key = s2k.derive_key("hello world", 32).unwrap();
        assert_eq!(key.len(), 32);

        let key_short = s2k.derive_key("hello world", 16).unwrap();
        assert_eq!(key_short.len(), 16);
        assert_eq!(&key[..16], &key_short[..]);
    }
}
