use std::io::BufRead;

use bytes::BytesMut;
use log::{debug, warn};

use crate::errors::{DisallowedPacketSnafu, Error, PacketIncompleteSnafu, Result};
use crate::packet::packet_sum::Packet;
use crate::parsing_reader::BufReadParsing;
use crate::types::{PacketLength, Tag};

/// Pulls framed packets out of a byte stream.
///
/// Packets whose body arrives in partial length segments are assembled
/// before dispatch. In tolerant mode, non-streaming packets that fail to
/// parse are skipped; framing errors and failures on streaming-capable
/// packets always end the stream.
pub struct PacketParser<R> {
    inner: R,
    allowed: Vec<Tag>,
    tolerant: bool,
    failed: bool,
}

impl<R: BufRead> PacketParser<R> {
    pub fn new(inner: R, allowed: &[Tag], tolerant: bool) -> Self {
        PacketParser {
            inner,
            allowed: allowed.to_vec(),
            tolerant,
            failed: false,
        }
    }

    /// Reads a packet header, old or new style.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-4.2>
    fn read_header(&mut self) -> Result<(Tag, PacketLength)> {
        let header = self.inner.read_u8()?;
        ensure!(header & 0x80 != 0, "invalid packet header 0x{:02x}", header);

        if header & 0x40 != 0 {
            // new format: tag in the low six bits
            let tag = Tag::from(header & 0x3F);
            let length = PacketLength::try_from_reader(&mut self.inner)?;
            Ok((tag, length))
        } else {
            // old format: four bit tag, two bit length type
            let tag = Tag::from((header >> 2) & 0x0F);
            let length = match header & 0b11 {
                0 => PacketLength::Fixed(self.inner.read_u8()?.into()),
                1 => PacketLength::Fixed(self.inner.read_be_u16()?.into()),
                2 => PacketLength::Fixed(self.inner.read_be_u32()?),
                3 => PacketLength::Indeterminate,
                _ => unreachable!("old packet length type is only 2 bits"),
            };
            Ok((tag, length))
        }
    }

    /// Reads a packet body, assembling partial length segments.
    fn read_body(&mut self, tag: Tag, length: PacketLength) -> Result<BytesMut> {
        match length {
            PacketLength::Fixed(len) => Ok(self.inner.take_bytes(len as usize)?),
            PacketLength::Indeterminate => Ok(self.inner.rest()?),
            PacketLength::Partial(first) => {
                // https://datatracker.ietf.org/doc/html/rfc4880#section-4.2.2.4
                // "An implementation MAY use Partial Body Lengths for data
                // packets, be they literal, compressed, or encrypted [...]
                // Partial Body Lengths MUST NOT be used for any other packet
                // types"
                ensure!(
                    tag.is_streaming_capable(),
                    "partial body length is not allowed for packet type {:?}",
                    tag
                );
                // "The first partial length MUST be at least 512 octets long."
                ensure!(
                    first >= 512,
                    "illegal first partial body length {} (shorter than 512 bytes)",
                    first
                );

                let mut body = self.inner.take_bytes(first as usize)?;
                loop {
                    match PacketLength::try_from_reader(&mut self.inner)? {
                        PacketLength::Partial(len) => {
                            let chunk = self.inner.take_bytes(len as usize)?;
                            body.extend_from_slice(&chunk);
                        }
                        PacketLength::Fixed(len) => {
                            let chunk = self.inner.take_bytes(len as usize)?;
                            body.extend_from_slice(&chunk);
                            // this is the last one
                            break;
                        }
                        PacketLength::Indeterminate => {
                            bail!("invalid indeterminate length in a partial body");
                        }
                    }
                }

                Ok(body)
            }
        }
    }
}

/// Truncated input shows up as an unexpected EOF from the reader.
fn map_incomplete(err: Error) -> Error {
    if let Error::IO { ref source, .. } = err {
        if source.kind() == std::io::ErrorKind::UnexpectedEof {
            return PacketIncompleteSnafu.build();
        }
    }
    err
}

impl<R: BufRead> Iterator for PacketParser<R> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            match self.inner.has_remaining() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err.into()));
                }
            }

            let (tag, length) = match self.read_header() {
                Ok(header) => header,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(map_incomplete(err)));
                }
            };
            debug!("packet {:?} {:?}", tag, length);

            let body = match self.read_body(tag, length) {
                Ok(body) => body,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(map_incomplete(err)));
                }
            };

            if !self.allowed.contains(&tag) {
                if self.tolerant && !tag.is_streaming_capable() {
                    warn!("skipping disallowed packet {:?}", tag);
                    continue;
                }
                self.failed = true;
                return Some(Err(DisallowedPacketSnafu { tag }.build()));
            }

            match Packet::try_from_reader(tag, &mut &body[..]) {
                Ok(packet) => return Some(Ok(packet)),
                Err(err) => {
                    if self.tolerant && !tag.is_streaming_capable() {
                        warn!("skipping unparseable packet {:?}: {:?}", tag, err);
                        continue;
                    }
                    self.failed = true;
                    return Some(Err(Error::InvalidPacketContent {
                        tag,
                        source: Box::new(err),
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::packet::{LiteralData, PacketTrait};
    use crate::ser::Serialize;

    const ALL: &[Tag] = &[
        Tag::PublicKey,
        Tag::PublicSubkey,
        Tag::SecretKey,
        Tag::SecretSubkey,
        Tag::OnePassSignature,
        Tag::Signature,
        Tag::LiteralData,
    ];

    #[test]
    fn test_parse_single_literal() {
        let packet = LiteralData::from_bytes(&b"x"[..], &b"data"[..]);
        let mut buf = Vec::new();
        packet.to_writer_with_header(&mut buf).unwrap();

        let mut parser = PacketParser::new(&buf[..], ALL, true);
        let parsed = parser.next().unwrap().unwrap();
        assert_eq!(parsed, Packet::LiteralData(packet));
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_incomplete_packet() {
        // a header announcing more bytes than there are
        let buf = [0xCBu8, 0x20, b'b'];
        let mut parser = PacketParser::new(&buf[..], ALL, true);

        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(err, Error::PacketIncomplete { .. }));
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_disallowed_packet() {
        let packet = LiteralData::from_bytes(&b"x"[..], &b"data"[..]);
        let mut buf = Vec::new();
        packet.to_writer_with_header(&mut buf).unwrap();

        // literal data is streaming capable, so this aborts even in
        // tolerant mode
        let mut parser = PacketParser::new(&buf[..], &[Tag::Signature], true);
        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(err, Error::DisallowedPacket { .. }));
    }

    #[test]
    fn test_old_style_header() {
        let packet = LiteralData::from_bytes(&b"x"[..], &b"data"[..]);
        let body = packet.to_bytes().unwrap();

        let mut buf = Vec::new();
        crate::types::PacketHeaderVersion::Old
            .write_header(&mut buf, Tag::LiteralData, body.len())
            .unwrap();
        buf.extend_from_slice(&body);

        let mut parser = PacketParser::new(&buf[..], ALL, true);
        let parsed = parser.next().unwrap().unwrap();
        assert_eq!(parsed, Packet::LiteralData(packet));
    }
}
