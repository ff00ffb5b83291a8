use std::io::{self, BufRead};

use crate::errors::{Error, Result};
use crate::packet::{
    LiteralData, OnePassSignature, PacketTrait, PublicKey, PublicSubkey, SecretKey, SecretSubkey,
    Signature,
};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// The closed sum of all packet types this crate understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    PublicKey(PublicKey),
    PublicSubkey(PublicSubkey),
    SecretKey(SecretKey),
    SecretSubkey(SecretSubkey),
    OnePassSignature(OnePassSignature),
    Signature(Signature),
    LiteralData(LiteralData),
}

impl Packet {
    /// Parses a packet body, dispatching on its tag.
    ///
    /// The body must be consumed entirely; trailing bytes are an error.
    pub fn try_from_reader<B: BufRead>(tag: Tag, mut body: B) -> Result<Self> {
        let packet = match tag {
            Tag::PublicKey => PublicKey::try_from_reader(&mut body).map(Into::into),
            Tag::PublicSubkey => PublicSubkey::try_from_reader(&mut body).map(Into::into),
            Tag::SecretKey => SecretKey::try_from_reader(&mut body).map(Into::into),
            Tag::SecretSubkey => SecretSubkey::try_from_reader(&mut body).map(Into::into),
            Tag::OnePassSignature => OnePassSignature::try_from_reader(&mut body).map(Into::into),
            Tag::Signature => Signature::try_from_reader(&mut body).map(Into::into),
            Tag::LiteralData => LiteralData::try_from_reader(&mut body).map(Into::into),
            _ => unsupported_err!("packet type {:?}", tag),
        }?;

        let trailing = body.rest()?;
        if !trailing.is_empty() {
            return Err(Error::PacketTooLarge {
                size: trailing.len() as u64,
            });
        }

        Ok(packet)
    }

    pub fn tag(&self) -> Tag {
        match self {
            Packet::PublicKey(p) => p.tag(),
            Packet::PublicSubkey(p) => p.tag(),
            Packet::SecretKey(p) => p.tag(),
            Packet::SecretSubkey(p) => p.tag(),
            Packet::OnePassSignature(p) => p.tag(),
            Packet::Signature(p) => p.tag(),
            Packet::LiteralData(p) => p.tag(),
        }
    }
}

impl Serialize for Packet {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Packet::PublicKey(p) => p.to_writer(writer),
            Packet::PublicSubkey(p) => p.to_writer(writer),
            Packet::SecretKey(p) => p.to_writer(writer),
            Packet::SecretSubkey(p) => p.to_writer(writer),
            Packet::OnePassSignature(p) => p.to_writer(writer),
            Packet::Signature(p) => p.to_writer(writer),
            Packet::LiteralData(p) => p.to_writer(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Packet::PublicKey(p) => p.write_len(),
            Packet::PublicSubkey(p) => p.write_len(),
            Packet::SecretKey(p) => p.write_len(),
            Packet::SecretSubkey(p) => p.write_len(),
            Packet::OnePassSignature(p) => p.write_len(),
            Packet::Signature(p) => p.write_len(),
            Packet::LiteralData(p) => p.write_len(),
        }
    }
}

impl PacketTrait for Packet {
    fn tag(&self) -> Tag {
        self.tag()
    }
}

macro_rules! impl_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Packet {
            fn from(value: $ty) -> Self {
                Packet::$variant(value)
            }
        }
    };
}

impl_from!(PublicKey, PublicKey);
impl_from!(PublicSubkey, PublicSubkey);
impl_from!(SecretKey, SecretKey);
impl_from!(SecretSubkey, SecretSubkey);
impl_from!(OnePassSignature, OnePassSignature);
impl_from!(Signature, Signature);
impl_from!(LiteralData, LiteralData);
