use std::io::{self, BufRead};
use std::sync::OnceLock;

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};
use sha1::Sha1;
use sha2::Sha256;

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{Result, UnknownAlgorithmSnafu, UnsupportedVersionSnafu};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::{AlgorithmInfo, Fingerprint, KeyId, KeyVersion, PublicParams, Tag};

/// The shared state of public key and public subkey packets.
///
/// Immutable after construction; the fingerprint only depends on the
/// other fields and is computed at most once.
#[derive(Debug, Clone)]
pub struct PubKeyInner {
    version: KeyVersion,
    algorithm: PublicKeyAlgorithm,
    created_at: DateTime<Utc>,
    public_params: PublicParams,
    fingerprint: OnceLock<Fingerprint>,
}

impl PartialEq for PubKeyInner {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.algorithm == other.algorithm
            && self.created_at == other.created_at
            && self.public_params == other.public_params
    }
}

impl Eq for PubKeyInner {}

impl PubKeyInner {
    pub fn new(
        version: KeyVersion,
        algorithm: PublicKeyAlgorithm,
        created_at: DateTime<Utc>,
        public_params: PublicParams,
    ) -> Result<Self> {
        if !matches!(version, KeyVersion::V4 | KeyVersion::V5) {
            return UnsupportedVersionSnafu {
                version: u8::from(version),
            }
            .fail();
        }

        Ok(Self {
            version,
            algorithm,
            created_at,
            public_params,
            fingerprint: OnceLock::new(),
        })
    }

    /// Parses the body of a public key packet.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-5.5.2>
    pub fn try_from_reader<B: BufRead>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        let version = KeyVersion::from(version);
        if !matches!(version, KeyVersion::V4 | KeyVersion::V5) {
            return UnsupportedVersionSnafu {
                version: u8::from(version),
            }
            .fail();
        }

        let created_at = i.read_be_u32()?;
        let created_at = Utc
            .timestamp_opt(created_at.into(), 0)
            .single()
            .ok_or_else(|| format_err!("invalid key creation timestamp"))?;

        let alg_code = i.read_u8()?;
        let algorithm = PublicKeyAlgorithm::try_from(alg_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "public key",
                code: alg_code,
            }
            .build()
        })?;

        // the v5 "scalar octet count for the key material" bounds the
        // algorithm specific fields
        let params_len = if version == KeyVersion::V5 {
            Some(i.read_be_u32()? as usize)
        } else {
            None
        };

        let public_params = PublicParams::try_from_reader(&mut i, algorithm, params_len)?;

        Self::new(version, algorithm, created_at, public_params)
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn public_params(&self) -> &PublicParams {
        &self.public_params
    }

    pub fn algorithm_info(&self) -> AlgorithmInfo {
        AlgorithmInfo {
            algorithm: self.algorithm,
            bits: self.public_params.bit_size(),
            curve: self.public_params.curve().map(|c| c.name().to_string()),
        }
    }

    /// Frames the serialized packet for fingerprint and signature hashing.
    ///
    /// v4 uses `0x99` and a two-octet length, v5 `0x9A` and a four-octet
    /// length.
    pub fn write_for_hash<W: io::Write>(&self, version: KeyVersion, writer: &mut W) -> Result<()> {
        let body = self.to_bytes()?;

        match version {
            KeyVersion::V4 => {
                writer.write_u8(0x99)?;
                writer.write_u16::<BigEndian>(body.len().try_into()?)?;
            }
            KeyVersion::V5 => {
                writer.write_u8(0x9A)?;
                writer.write_u32::<BigEndian>(body.len().try_into()?)?;
            }
            _ => {
                return UnsupportedVersionSnafu {
                    version: u8::from(version),
                }
                .fail()
            }
        }
        writer.write_all(&body)?;

        Ok(())
    }

    /// The fingerprint of the key: SHA-1 for v4, SHA-256 for v5.
    pub fn fingerprint(&self) -> &Fingerprint {
        self.fingerprint.get_or_init(|| {
            use sha1::Digest;

            let mut framed = Vec::with_capacity(self.write_len() + 5);
            self.write_for_hash(self.version, &mut framed)
                .expect("write to vec");

            match self.version {
                KeyVersion::V4 => {
                    let digest = Sha1::digest(&framed);
                    Fingerprint::V4(digest.into())
                }
                KeyVersion::V5 => {
                    let digest = Sha256::digest(&framed);
                    Fingerprint::V5(digest.into())
                }
                _ => unreachable!("constructors reject other versions"),
            }
        })
    }

    /// The key id: the low 8 fingerprint bytes for v4, the high 8 for v5.
    pub fn key_id(&self) -> KeyId {
        let fp = self.fingerprint().as_bytes();
        let bytes: [u8; 8] = match self.version {
            KeyVersion::V4 => fp[12..20].try_into().expect("v4 fingerprints are 20 bytes"),
            KeyVersion::V5 => fp[0..8].try_into().expect("v5 fingerprints are 32 bytes"),
            _ => unreachable!("constructors reject other versions"),
        };
        bytes.into()
    }

    /// Cheap comparison of key material, without hashing.
    pub fn has_same_fingerprint_as(&self, other: &PubKeyInner) -> bool {
        if self.version != other.version {
            return false;
        }
        match (self.to_bytes(), other.to_bytes()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for PubKeyInner {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version.into())?;
        writer.write_u32::<BigEndian>(self.created_at.timestamp().try_into()?)?;
        writer.write_u8(self.algorithm.into())?;

        if self.version == KeyVersion::V5 {
            writer.write_u32::<BigEndian>(self.public_params.write_len().try_into()?)?;
        }

        self.public_params.to_writer(writer)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 1 + 4 + 1;
        if self.version == KeyVersion::V5 {
            sum += 4;
        }
        sum + self.public_params.write_len()
    }
}

macro_rules! impl_public_key {
    ($name:ident, $tag:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            inner: PubKeyInner,
        }

        impl $name {
            pub fn new(
                version: KeyVersion,
                algorithm: PublicKeyAlgorithm,
                created_at: DateTime<Utc>,
                public_params: PublicParams,
            ) -> Result<Self> {
                let inner = PubKeyInner::new(version, algorithm, created_at, public_params)?;
                Ok(Self { inner })
            }

            pub(crate) fn from_inner(inner: PubKeyInner) -> Self {
                Self { inner }
            }

            /// Parses the packet from the given reader.
            pub fn try_from_reader<B: BufRead>(input: B) -> Result<Self> {
                let inner = PubKeyInner::try_from_reader(input)?;
                Ok(Self { inner })
            }

            pub fn version(&self) -> KeyVersion {
                self.inner.version()
            }

            pub fn algorithm(&self) -> PublicKeyAlgorithm {
                self.inner.algorithm()
            }

            pub fn created_at(&self) -> &DateTime<Utc> {
                self.inner.created_at()
            }

            pub fn public_params(&self) -> &PublicParams {
                self.inner.public_params()
            }

            pub fn algorithm_info(&self) -> AlgorithmInfo {
                self.inner.algorithm_info()
            }

            pub fn write_for_hash<W: io::Write>(
                &self,
                version: KeyVersion,
                writer: &mut W,
            ) -> Result<()> {
                self.inner.write_for_hash(version, writer)
            }

            pub fn fingerprint(&self) -> &Fingerprint {
                self.inner.fingerprint()
            }

            pub fn key_id(&self) -> KeyId {
                self.inner.key_id()
            }

            pub fn has_same_fingerprint_as(&self, other: &impl AsRef<PubKeyInner>) -> bool {
                self.inner.has_same_fingerprint_as(other.as_ref())
            }
        }

        impl AsRef<PubKeyInner> for $name {
            fn as_ref(&self) -> &PubKeyInner {
                &self.inner
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.inner.to_writer(writer)
            }

            fn write_len(&self) -> usize {
                self.inner.write_len()
            }
        }

        impl crate::packet::PacketTrait for $name {
            fn tag(&self) -> Tag {
                $tag
            }
        }
    };
}

impl_public_key!(PublicKey, Tag::PublicKey);
impl_public_key!(PublicSubkey, Tag::PublicSubkey);

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::SubsecRound;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::{ECCCurve, KeyType};

    fn test_key(version: KeyVersion) -> PublicKey {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (public_params, _) = KeyType::Ecdsa(ECCCurve::P256).generate(&mut rng).unwrap();

        PublicKey::new(
            version,
            PublicKeyAlgorithm::ECDSA,
            Utc::now().trunc_subsecs(0),
            public_params,
        )
        .unwrap()
    }

    #[test]
    fn test_roundtrip_v4() {
        let key = test_key(KeyVersion::V4);
        let buf = key.to_bytes().unwrap();
        assert_eq!(buf.len(), key.write_len());

        let back = PublicKey::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(key, back);
        assert_eq!(back.to_bytes().unwrap(), buf);
    }

    #[test]
    fn test_roundtrip_v5() {
        let key = test_key(KeyVersion::V5);
        let buf = key.to_bytes().unwrap();
        assert_eq!(buf.len(), key.write_len());

        let back = PublicKey::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(key, back);
        assert_eq!(back.to_bytes().unwrap(), buf);
    }

    #[test]
    fn test_v3_is_rejected() {
        let key = test_key(KeyVersion::V4);
        let mut buf = key.to_bytes().unwrap();
        buf[0] = 3;

        let err = PublicKey::try_from_reader(&mut &buf[..]).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::Error::UnsupportedVersion { version: 3, .. }
        ));
    }

    #[test]
    fn test_key_id_derivation() {
        let v4 = test_key(KeyVersion::V4);
        let fp = v4.fingerprint().as_bytes().to_vec();
        assert_eq!(v4.key_id().as_ref(), &fp[12..20]);

        let v5 = test_key(KeyVersion::V5);
        let fp = v5.fingerprint().as_bytes().to_vec();
        assert_eq!(v5.key_id().as_ref(), &fp[0..8]);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = test_key(KeyVersion::V4);
        let buf = a.to_bytes().unwrap();
        let b = PublicKey::try_from_reader(&mut &buf[..]).unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.has_same_fingerprint_as(&b));
    }
}
