use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::{ecdsa, eddsa};
use crate::errors::{Result, UnknownAlgorithmSnafu, UnsupportedVersionSnafu};
use crate::packet::public_key::PubKeyInner;
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, Mpi, PublicParams, Tag};

/// Signature packet versions supported by this crate.
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SignatureVersion {
    V4 = 4,
}

/// Available signature types.
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.2.1>
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SignatureType {
    /// Signature of a binary document
    Binary = 0x00,
    /// Signature of a canonical text document
    Text = 0x01,
    Standalone = 0x02,
    /// Generic certification of a User ID and Public-Key packet
    CertGeneric = 0x10,
    /// Persona certification of a User ID and Public-Key packet
    CertPersona = 0x11,
    /// Casual certification of a User ID and Public-Key packet
    CertCasual = 0x12,
    /// Positive certification of a User ID and Public-Key packet
    CertPositive = 0x13,
    /// Subkey Binding Signature
    SubkeyBinding = 0x18,
    /// Primary Key Binding Signature
    KeyBinding = 0x19,
    /// Signature directly on a key
    Key = 0x1F,
    /// Key revocation signature
    KeyRevocation = 0x20,
    /// Subkey revocation signature
    SubkeyRevocation = 0x28,
    /// Certification revocation signature
    CertRevocation = 0x30,
    /// Timestamp signature
    Timestamp = 0x40,
    /// Third-Party Confirmation signature
    ThirdParty = 0x50,
}

/// The subpacket type carrying the issuer key id.
const SUBPACKET_ISSUER: u8 = 16;

/// Signature Packet, v4.
///
/// The subpacket areas are carried raw; only the issuer is pulled out of
/// them. Trust and validity policy live in the layers above.
///
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.2.3>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    version: SignatureVersion,
    typ: SignatureType,
    pub_alg: PublicKeyAlgorithm,
    hash_alg: HashAlgorithm,
    hashed_subpackets: Bytes,
    unhashed_subpackets: Bytes,
    /// The left 16 bits of the signed digest.
    signed_digest_prefix: [u8; 2],
    sig: Vec<Mpi>,
}

impl Signature {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        typ: SignatureType,
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
        hashed_subpackets: Bytes,
        unhashed_subpackets: Bytes,
        signed_digest_prefix: [u8; 2],
        sig: Vec<Mpi>,
    ) -> Self {
        Signature {
            version: SignatureVersion::V4,
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets,
            unhashed_subpackets,
            signed_digest_prefix,
            sig,
        }
    }

    /// Parses the body of a signature packet.
    pub fn try_from_reader<B: BufRead>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        let version = SignatureVersion::try_from(version).map_err(|_| {
            UnsupportedVersionSnafu { version }.build()
        })?;

        let typ_code = i.read_u8()?;
        let typ = SignatureType::try_from(typ_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "signature type",
                code: typ_code,
            }
            .build()
        })?;

        let alg_code = i.read_u8()?;
        let pub_alg = PublicKeyAlgorithm::try_from(alg_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "public key",
                code: alg_code,
            }
            .build()
        })?;

        let hash_code = i.read_u8()?;
        let hash_alg = HashAlgorithm::try_from(hash_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "hash",
                code: hash_code,
            }
            .build()
        })?;

        let hashed_len = i.read_be_u16()?;
        let hashed_subpackets = i.take_bytes(hashed_len.into())?.freeze();

        let unhashed_len = i.read_be_u16()?;
        let unhashed_subpackets = i.take_bytes(unhashed_len.into())?.freeze();

        let signed_digest_prefix = i.read_array::<2>()?;

        let mut sig = Vec::new();
        while i.has_remaining()? {
            sig.push(Mpi::try_from_reader(&mut i)?);
        }

        Ok(Signature {
            version,
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets,
            unhashed_subpackets,
            signed_digest_prefix,
            sig,
        })
    }

    pub fn version(&self) -> SignatureVersion {
        self.version
    }

    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    pub fn pub_algorithm(&self) -> PublicKeyAlgorithm {
        self.pub_alg
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_alg
    }

    pub fn signed_digest_prefix(&self) -> [u8; 2] {
        self.signed_digest_prefix
    }

    pub fn sig(&self) -> &[Mpi] {
        &self.sig
    }

    /// The issuer key id, if one of the subpacket areas carries it.
    pub fn issuer(&self) -> Option<KeyId> {
        find_issuer(&self.unhashed_subpackets)
            .ok()
            .flatten()
            .or_else(|| find_issuer(&self.hashed_subpackets).ok().flatten())
    }

    /// The exact byte sequence that gets hashed for this signature over
    /// the given payload: the payload, the hashed signature fields, and
    /// the v4 trailer.
    pub fn hashed_payload(&self, data: &[u8]) -> Vec<u8> {
        let hashed_fields_len = 6 + self.hashed_subpackets.len();

        let mut buf = Vec::with_capacity(data.len() + hashed_fields_len + 6);
        buf.extend_from_slice(data);
        buf.push(self.version.into());
        buf.push(self.typ.into());
        buf.push(self.pub_alg.into());
        buf.push(self.hash_alg.into());
        buf.extend_from_slice(&(self.hashed_subpackets.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.hashed_subpackets);

        // v4 trailer
        buf.push(0x04);
        buf.push(0xFF);
        buf.extend_from_slice(&(hashed_fields_len as u32).to_be_bytes());

        buf
    }

    /// Computes the digest this signature signs over the given payload.
    pub fn digest(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.hash_alg.digest(&self.hashed_payload(data))
    }

    /// Verifies this signature over `data` against the given key.
    pub fn verify(&self, key: &impl AsRef<PubKeyInner>, data: &[u8]) -> Result<()> {
        let payload = self.hashed_payload(data);
        let digest = self.hash_alg.digest(&payload)?;

        ensure_eq!(
            &digest[..2],
            &self.signed_digest_prefix[..],
            "signed digest prefix mismatch"
        );

        match key.as_ref().public_params() {
            PublicParams::ECDSA { curve, p } => {
                ensure_eq!(self.sig.len(), 2, "expected two signature values");
                ecdsa::verify(
                    curve,
                    self.hash_alg,
                    &digest,
                    Some(&payload),
                    p,
                    &self.sig[0],
                    &self.sig[1],
                )
            }
            PublicParams::EdDSALegacy { q, .. } => {
                ensure_eq!(self.sig.len(), 2, "expected two signature values");
                eddsa::verify(q, &digest, &self.sig[0], &self.sig[1])
            }
            params => unsupported_err!("signature verification with {:?}", params),
        }
    }
}

/// Walks a subpacket area looking for an issuer subpacket.
/// Subpacket framing: <https://tools.ietf.org/html/rfc4880#section-5.2.3.1>
fn find_issuer(area: &[u8]) -> Result<Option<KeyId>> {
    let mut i = area;

    while i.has_remaining()? {
        let first = i.read_u8()?;
        let len: usize = match first {
            0..=191 => first.into(),
            192..=254 => {
                let second = i.read_u8()?;
                ((usize::from(first) - 192) << 8) + usize::from(second) + 192
            }
            255 => i.read_be_u32()? as usize,
        };
        ensure!(len >= 1, "invalid subpacket length");

        // high bit flags the subpacket critical
        let typ = i.read_u8()? & 0x7F;
        let data = i.take_bytes(len - 1)?;

        if typ == SUBPACKET_ISSUER {
            return Ok(Some(KeyId::from_slice(&data)?));
        }
    }

    Ok(None)
}

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version.into())?;
        writer.write_u8(self.typ.into())?;
        writer.write_u8(self.pub_alg.into())?;
        writer.write_u8(self.hash_alg.into())?;

        writer.write_u16::<BigEndian>(self.hashed_subpackets.len().try_into()?)?;
        writer.write_all(&self.hashed_subpackets)?;

        writer.write_u16::<BigEndian>(self.unhashed_subpackets.len().try_into()?)?;
        writer.write_all(&self.unhashed_subpackets)?;

        writer.write_all(&self.signed_digest_prefix)?;

        for x in &self.sig {
            x.to_writer(writer)?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        4 + 2
            + self.hashed_subpackets.len()
            + 2
            + self.unhashed_subpackets.len()
            + 2
            + self.sig.iter().map(|s| s.write_len()).sum::<usize>()
    }
}

impl crate::packet::PacketTrait for Signature {
    fn tag(&self) -> Tag {
        Tag::Signature
    }
}

/// Builds an issuer subpacket area from a key id.
pub(crate) fn issuer_subpacket_area(key_id: &KeyId) -> Bytes {
    // length (type octet + 8 byte key id), type, data
    let mut area = Vec::with_capacity(10);
    area.push(9);
    area.push(SUBPACKET_ISSUER);
    area.extend_from_slice(key_id.as_ref());
    area.into()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_signature() -> Signature {
        Signature::new(
            SignatureType::Binary,
            PublicKeyAlgorithm::ECDSA,
            HashAlgorithm::SHA2_256,
            Bytes::new(),
            issuer_subpacket_area(&KeyId::from([1, 2, 3, 4, 5, 6, 7, 8])),
            [0xAB, 0xCD],
            vec![Mpi::from_slice(&[0x01, 0x02]), Mpi::from_slice(&[0x03])],
        )
    }

    #[test]
    fn test_roundtrip() {
        let sig = sample_signature();
        let buf = sig.to_bytes().unwrap();
        assert_eq!(buf.len(), sig.write_len());

        let back = Signature::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(sig, back);
        assert_eq!(back.to_bytes().unwrap(), buf);
    }

    #[test]
    fn test_issuer_extraction() {
        let sig = sample_signature();
        assert_eq!(
            sig.issuer(),
            Some(KeyId::from([1, 2, 3, 4, 5, 6, 7, 8]))
        );
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let sig = sample_signature();
        let mut buf = sig.to_bytes().unwrap();
        buf[0] = 3;

        assert!(Signature::try_from_reader(&mut &buf[..]).is_err());
    }
}
