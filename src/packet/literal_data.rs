use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::Tag;

#[derive(Debug, Copy, Clone, FromPrimitive, IntoPrimitive, PartialEq, Eq)]
#[repr(u8)]
pub enum DataMode {
    Binary = b'b',
    Text = b't',
    Utf8 = b'u',

    #[num_enum(catch_all)]
    Other(u8),
}

/// Literal Data Packet
///
/// The representative bulk data packet: its body may be framed with
/// partial lengths on the wire.
///
/// Ref: <https://tools.ietf.org/html/rfc4880#section-5.9>
#[derive(Clone, PartialEq, Eq)]
pub struct LiteralData {
    mode: DataMode,
    /// The file name, may contain non utf-8 bytes
    file_name: Bytes,
    created: DateTime<Utc>,
    data: Bytes,
}

impl LiteralData {
    /// Creates a literal data packet from the given bytes.
    pub fn from_bytes(file_name: impl Into<Bytes>, data: impl Into<Bytes>) -> Self {
        LiteralData {
            mode: DataMode::Binary,
            file_name: file_name.into(),
            created: Utc::now().trunc_subsecs(0),
            data: data.into(),
        }
    }

    /// Parses a `LiteralData` packet from the given reader.
    pub fn try_from_reader<B: BufRead>(mut i: B) -> Result<Self> {
        let mode = DataMode::from(i.read_u8()?);

        let name_len = i.read_u8()?;
        let file_name = i.take_bytes(name_len.into())?.freeze();

        let created = i.read_be_u32()?;
        let created = Utc
            .timestamp_opt(created.into(), 0)
            .single()
            .ok_or_else(|| format_err!("invalid literal data timestamp"))?;

        let data = i.rest()?.freeze();

        Ok(LiteralData {
            mode,
            file_name,
            created,
            data,
        })
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn file_name(&self) -> &Bytes {
        &self.file_name
    }

    pub fn created(&self) -> &DateTime<Utc> {
        &self.created
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl Serialize for LiteralData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.mode.into())?;
        writer.write_u8(self.file_name.len().try_into()?)?;
        writer.write_all(&self.file_name)?;
        writer.write_u32::<BigEndian>(self.created.timestamp().try_into()?)?;
        writer.write_all(&self.data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 1 + self.file_name.len() + 4 + self.data.len()
    }
}

impl PacketTrait for LiteralData {
    fn tag(&self) -> Tag {
        Tag::LiteralData
    }
}

impl std::fmt::Debug for LiteralData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiteralData")
            .field("mode", &self.mode)
            .field("file_name", &hex::encode(&self.file_name))
            .field("created", &self.created)
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_roundtrip() {
        let packet = LiteralData::from_bytes(&b"hello.txt"[..], &b"hello world"[..]);
        let buf = packet.to_bytes().unwrap();
        assert_eq!(buf.len(), packet.write_len());

        let back = LiteralData::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(packet, back);
        assert_eq!(back.to_bytes().unwrap(), buf);
    }
}
