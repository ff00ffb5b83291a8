use std::io::{self, BufRead};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{
    MismatchedTrailingSignatureSnafu, MissingTrailingSignatureSnafu, Result,
    UnknownAlgorithmSnafu, UnsupportedVersionSnafu,
};
use crate::packet::public_key::PubKeyInner;
use crate::packet::signature::{Signature, SignatureType};
use crate::packet::PacketTrait;
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, Tag};

/// One-Pass Signature Packet
///
/// Announces a signature before the signed data, so a verifier can hash
/// the data as it streams by. The matching signature packet trails the
/// data and is bound to this packet before verification.
///
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.4>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnePassSignature {
    typ: SignatureType,
    hash_algorithm: HashAlgorithm,
    pub_algorithm: PublicKeyAlgorithm,
    key_id: KeyId,
    /// 0 means this packet is nested: more one-pass signatures follow.
    last: u8,
    /// The trailing signature packet, bound once it has been read.
    corresponding_sig: Option<Box<Signature>>,
}

impl OnePassSignature {
    pub fn new(
        typ: SignatureType,
        hash_algorithm: HashAlgorithm,
        pub_algorithm: PublicKeyAlgorithm,
        key_id: KeyId,
    ) -> Self {
        OnePassSignature {
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last: 1,
            corresponding_sig: None,
        }
    }

    /// Parses the fixed 13 byte body.
    pub fn try_from_reader<B: BufRead>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        if version != 3 {
            return UnsupportedVersionSnafu { version }.fail();
        }

        let typ_code = i.read_u8()?;
        let typ = SignatureType::try_from(typ_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "signature type",
                code: typ_code,
            }
            .build()
        })?;

        let hash_code = i.read_u8()?;
        let hash_algorithm = HashAlgorithm::try_from(hash_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "hash",
                code: hash_code,
            }
            .build()
        })?;

        let alg_code = i.read_u8()?;
        let pub_algorithm = PublicKeyAlgorithm::try_from(alg_code).map_err(|_| {
            UnknownAlgorithmSnafu {
                typ: "public key",
                code: alg_code,
            }
            .build()
        })?;

        let key_id = KeyId::from_slice(&i.read_array::<8>()?)?;
        let last = i.read_u8()?;

        Ok(OnePassSignature {
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last,
            corresponding_sig: None,
        })
    }

    pub fn version(&self) -> u8 {
        3
    }

    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn pub_algorithm(&self) -> PublicKeyAlgorithm {
        self.pub_algorithm
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// Is this the last one-pass signature before the data?
    pub fn is_last(&self) -> bool {
        self.last != 0
    }

    /// Marks this packet as nested: further one-pass signatures follow.
    pub fn set_nested(&mut self) {
        self.last = 0;
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.corresponding_sig.as_deref()
    }

    /// Binds the trailing signature packet. May only happen once.
    pub fn set_signature(&mut self, sig: Signature) -> Result<()> {
        ensure!(
            self.corresponding_sig.is_none(),
            "trailing signature is already bound"
        );
        self.corresponding_sig = Some(Box::new(sig));
        Ok(())
    }

    /// Does the given signature pair up with this packet?
    pub fn matches(&self, sig: &Signature) -> bool {
        self.typ == sig.typ()
            && self.hash_algorithm == sig.hash_algorithm()
            && self.pub_algorithm == sig.pub_algorithm()
            && sig.issuer().as_ref() == Some(&self.key_id)
    }

    /// Verifies the bound trailing signature over the data this packet
    /// announced.
    pub fn verify(&self, key: &impl AsRef<PubKeyInner>, data: &[u8]) -> Result<()> {
        let Some(ref sig) = self.corresponding_sig else {
            return MissingTrailingSignatureSnafu.fail();
        };

        if !self.matches(sig) {
            return MismatchedTrailingSignatureSnafu.fail();
        }

        sig.verify(key, data)
    }
}

impl Serialize for OnePassSignature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            3,
            self.typ.into(),
            self.hash_algorithm.into(),
            self.pub_algorithm.into(),
        ])?;
        writer.write_all(self.key_id.as_ref())?;
        writer.write_all(&[self.last])?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        13
    }
}

impl PacketTrait for OnePassSignature {
    fn tag(&self) -> Tag {
        Tag::OnePassSignature
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_ops() -> OnePassSignature {
        OnePassSignature::new(
            SignatureType::Binary,
            HashAlgorithm::SHA2_256,
            PublicKeyAlgorithm::ECDSA,
            KeyId::from([9, 8, 7, 6, 5, 4, 3, 2]),
        )
    }

    #[test]
    fn test_roundtrip() {
        let ops = sample_ops();
        let buf = ops.to_bytes().unwrap();
        assert_eq!(buf.len(), 13);
        assert_eq!(buf.len(), ops.write_len());

        let back = OnePassSignature::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(ops, back);
        assert_eq!(back.to_bytes().unwrap(), buf);
    }

    #[test]
    fn test_bad_version() {
        let ops = sample_ops();
        let mut buf = ops.to_bytes().unwrap();
        buf[0] = 4;

        assert!(OnePassSignature::try_from_reader(&mut &buf[..]).is_err());
    }

    #[test]
    fn test_signature_binds_once() {
        let mut ops = sample_ops();
        let sig = crate::packet::signature::Signature::new(
            SignatureType::Binary,
            PublicKeyAlgorithm::ECDSA,
            HashAlgorithm::SHA2_256,
            bytes::Bytes::new(),
            bytes::Bytes::new(),
            [0, 0],
            vec![],
        );

        ops.set_signature(sig.clone()).unwrap();
        assert!(ops.set_signature(sig).is_err());
    }
}
