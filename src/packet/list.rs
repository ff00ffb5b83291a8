use std::fmt;
use std::io::{self, BufRead, Read};

use byteorder::WriteBytesExt;

use crate::config::Config;
use crate::errors::Result;
use crate::packet::many::PacketParser;
use crate::packet::packet_sum::Packet;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{PacketLength, Tag};

/// Minimum number of bytes buffered before a partial length segment is
/// emitted; also the smallest legal first segment.
const MIN_PARTIAL_CHUNK: usize = 512;

/// Maximum size of a partial length segment.
const MAX_PARTIAL_CHUNK: usize = 1 << 30;

/// An ordered sequence of packets, read from or written to the wire.
///
/// Reading materializes packets eagerly up to and including the first
/// streaming-capable packet; anything after that stays behind
/// [`PacketList::stream`] for lazy consumption.
pub struct PacketList {
    packets: Vec<Packet>,
    rest: Option<PacketParser<Box<dyn BufRead>>>,
}

impl PacketList {
    pub fn new() -> Self {
        PacketList {
            packets: Vec::new(),
            rest: None,
        }
    }

    /// Reads a packet list from the given source.
    ///
    /// Only tags in `allowed` may appear; anything else is a parse error.
    /// With `config.tolerant`, unparseable non-streaming packets are
    /// logged and dropped instead of failing the list.
    pub fn try_from_reader<R: BufRead + 'static>(
        source: R,
        allowed: &[Tag],
        config: &Config,
    ) -> Result<Self> {
        let boxed: Box<dyn BufRead> = Box::new(source);
        let mut parser = PacketParser::new(boxed, allowed, config.tolerant);

        let mut packets = Vec::new();
        while let Some(res) = parser.next() {
            let packet = res?;
            let streaming = packet.tag().is_streaming_capable();
            packets.push(packet);

            if streaming {
                // later packets wait behind the streaming body
                return Ok(PacketList {
                    packets,
                    rest: Some(parser),
                });
            }
        }

        Ok(PacketList {
            packets,
            rest: None,
        })
    }

    /// The not yet materialized tail of the list, if any.
    pub fn stream(&mut self) -> Option<&mut PacketParser<Box<dyn BufRead>>> {
        self.rest.as_mut()
    }

    /// Materializes any remaining packets from the tail stream.
    pub fn drain_stream(&mut self) -> Result<()> {
        if let Some(mut parser) = self.rest.take() {
            for res in &mut parser {
                self.packets.push(res?);
            }
        }
        Ok(())
    }

    pub fn push(&mut self, packet: impl Into<Packet>) {
        self.packets.push(packet.into());
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Packet> {
        self.packets.iter()
    }

    /// A new list holding only the packets with one of the given tags,
    /// in their original order.
    pub fn filter_by_tag(&self, tags: &[Tag]) -> PacketList {
        PacketList {
            packets: self
                .packets
                .iter()
                .filter(|p| tags.contains(&p.tag()))
                .cloned()
                .collect(),
            rest: None,
        }
    }

    /// The first packet with the given tag.
    pub fn find_packet(&self, tag: Tag) -> Option<&Packet> {
        self.packets.iter().find(|p| p.tag() == tag)
    }

    /// The indices of all packets with one of the given tags.
    pub fn index_of_tag(&self, tags: &[Tag]) -> Vec<usize> {
        self.packets
            .iter()
            .enumerate()
            .filter(|(_, p)| tags.contains(&p.tag()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Appends all packets of `other`.
    pub fn concat(&mut self, other: PacketList) {
        self.packets.extend(other.packets);
    }
}

impl Default for PacketList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PacketList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketList")
            .field("packets", &self.packets)
            .field("stream", &self.rest.is_some())
            .finish()
    }
}

impl PartialEq for PacketList {
    fn eq(&self, other: &Self) -> bool {
        self.packets == other.packets
    }
}

impl Eq for PacketList {}

impl std::ops::Index<usize> for PacketList {
    type Output = Packet;

    fn index(&self, index: usize) -> &Packet {
        &self.packets[index]
    }
}

impl<'a> IntoIterator for &'a PacketList {
    type Item = &'a Packet;
    type IntoIter = std::slice::Iter<'a, Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.iter()
    }
}

impl IntoIterator for PacketList {
    type Item = Packet;
    type IntoIter = std::vec::IntoIter<Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.into_iter()
    }
}

impl From<Vec<Packet>> for PacketList {
    fn from(packets: Vec<Packet>) -> Self {
        PacketList {
            packets,
            rest: None,
        }
    }
}

impl Serialize for PacketList {
    /// Writes the materialized packets, each under a fixed length header.
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for packet in &self.packets {
            packet.to_writer_with_header(writer)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.packets
            .iter()
            .map(|p| p.write_len_with_header())
            .sum()
    }
}

/// The largest power of two not above `n`, capped at the maximum legal
/// partial segment size.
fn partial_chunk_len(n: usize) -> usize {
    debug_assert!(n > 0);
    if n >= MAX_PARTIAL_CHUNK {
        return MAX_PARTIAL_CHUNK;
    }
    let mut len = n.next_power_of_two();
    if len > n {
        len >>= 1;
    }
    len
}

/// Writes a packet whose body length is not known up front.
///
/// For streaming-capable tags the body is framed into partial length
/// segments: data is buffered until at least 512 bytes are available,
/// then emitted in power-of-two sized segments; when the source ends,
/// the residue goes out under a simple length header. Other tags must
/// not use partial lengths, so their body is buffered whole and written
/// under a fixed length header.
pub fn write_streamed<R: Read, W: io::Write>(
    tag: Tag,
    mut source: R,
    writer: &mut W,
) -> Result<()> {
    if !tag.is_streaming_capable() {
        let mut body = Vec::new();
        source.read_to_end(&mut body)?;
        crate::types::PacketHeaderVersion::New.write_header(writer, tag, body.len())?;
        writer.write_all(&body)?;
        return Ok(());
    }

    writer.write_u8(0b1100_0000 | u8::from(tag))?;

    let mut buffer: Vec<u8> = Vec::with_capacity(MIN_PARTIAL_CHUNK * 2);
    let mut chunk = [0u8; 8192];
    let mut eof = false;

    while !eof {
        while !eof && buffer.len() < MIN_PARTIAL_CHUNK {
            let read = source.read(&mut chunk)?;
            if read == 0 {
                eof = true;
            } else {
                buffer.extend_from_slice(&chunk[..read]);
            }
        }

        while buffer.len() >= MIN_PARTIAL_CHUNK {
            let len = partial_chunk_len(buffer.len());
            PacketLength::Partial(len as u32).to_writer_new(writer)?;
            writer.write_all(&buffer[..len])?;
            buffer.drain(..len);
        }
    }

    // the residue goes out under a simple length header, possibly empty
    PacketLength::Fixed(buffer.len().try_into()?).to_writer_new(writer)?;
    writer.write_all(&buffer)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::packet::LiteralData;

    #[test]
    fn test_partial_chunk_len() {
        assert_eq!(partial_chunk_len(512), 512);
        assert_eq!(partial_chunk_len(513), 512);
        assert_eq!(partial_chunk_len(4096), 4096);
        assert_eq!(partial_chunk_len(5000), 4096);
        assert_eq!(partial_chunk_len(usize::MAX), MAX_PARTIAL_CHUNK);
    }

    #[test]
    fn test_streamed_write_non_streaming_tag() {
        use crate::packet::{OnePassSignature, PacketTrait, SignatureType};
        use crate::crypto::{HashAlgorithm, PublicKeyAlgorithm};
        use crate::types::KeyId;

        let ops = OnePassSignature::new(
            SignatureType::Binary,
            HashAlgorithm::SHA2_256,
            PublicKeyAlgorithm::ECDSA,
            KeyId::from([1, 2, 3, 4, 5, 6, 7, 8]),
        );
        let body = ops.to_bytes().unwrap();

        // a non-streaming tag is buffered through and framed with a
        // fixed length, identical to the direct write
        let mut streamed = Vec::new();
        write_streamed(Tag::OnePassSignature, &body[..], &mut streamed).unwrap();

        let mut fixed = Vec::new();
        ops.to_writer_with_header(&mut fixed).unwrap();

        assert_eq!(streamed, fixed);
    }

    #[test]
    fn test_list_helpers() {
        let mut list = PacketList::new();
        assert!(list.is_empty());

        list.push(LiteralData::from_bytes(&b"a"[..], &b"1"[..]));
        list.push(LiteralData::from_bytes(&b"b"[..], &b"2"[..]));

        assert_eq!(list.len(), 2);
        assert_eq!(list.index_of_tag(&[Tag::LiteralData]), vec![0, 1]);
        assert!(list.find_packet(Tag::Signature).is_none());
        assert_eq!(list.filter_by_tag(&[Tag::Signature]).len(), 0);

        let mut other = PacketList::new();
        other.push(LiteralData::from_bytes(&b"c"[..], &b"3"[..]));
        list.concat(other);
        assert_eq!(list.len(), 3);
    }
}
