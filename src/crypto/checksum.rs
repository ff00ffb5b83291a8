use std::hash::Hasher;
use std::io;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::errors::{ChecksumMismatchSnafu, Result};

/// Two octet checksum: sum of all octets mod 65536.
#[inline]
pub fn simple(actual: &[u8], data: &[u8]) -> Result<()> {
    let expected_checksum = calculate_simple(data);

    if actual[..2] != expected_checksum.to_be_bytes()[..] {
        return ChecksumMismatchSnafu.fail();
    }

    Ok(())
}

#[inline]
pub fn calculate_simple(data: &[u8]) -> u16 {
    let mut hasher = SimpleChecksum::default();
    std::hash::Hasher::write(&mut hasher, data);
    hasher.finish() as u16
}

#[derive(Debug, Default)]
pub struct SimpleChecksum(u16);

impl SimpleChecksum {
    #[inline]
    pub fn to_writer<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<BigEndian>(self.0)
    }

    #[inline]
    pub fn finalize(&self) -> [u8; 2] {
        let mut res = [0u8; 2];
        BigEndian::write_u16(&mut res[..], self.0);

        res
    }
}

impl io::Write for SimpleChecksum {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Hasher::write(self, buf);

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Hasher for SimpleChecksum {
    #[inline]
    fn write(&mut self, buf: &[u8]) {
        let new_sum = buf.iter().map(|v| u32::from(*v)).sum::<u32>();
        self.0 = ((u32::from(self.0) + new_sum) & 0xffff) as u16;
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.0)
    }
}

/// SHA1 checksum, using sha1_checked, first 20 octets.
///
/// Fails if a SHA1 collision was detected.
#[inline]
pub fn calculate_sha1<I, T>(data: I) -> Result<[u8; 20]>
where
    T: AsRef<[u8]>,
    I: IntoIterator<Item = T>,
{
    use sha1_checked::{CollisionResult, Digest, Sha1};

    let mut digest = Sha1::new();
    for chunk in data {
        digest.update(chunk.as_ref());
    }

    match digest.try_finalize() {
        CollisionResult::Ok(sha1) => Ok(sha1.into()),
        CollisionResult::Collision(_) | CollisionResult::Mitigated(_) => {
            bail!("SHA1 hash collision detected")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_simple_checksum() {
        assert_eq!(calculate_simple(&[]), 0);
        assert_eq!(calculate_simple(&[1, 2, 3]), 6);
        // wraps mod 65536
        assert_eq!(calculate_simple(&[0xff; 258]), (0xffu32 * 258 % 65536) as u16);

        simple(&calculate_simple(b"foobar").to_be_bytes(), b"foobar").unwrap();
        assert!(simple(&[0x00, 0x01], b"foobar").is_err());
    }

    #[test]
    fn test_sha1() {
        let digest = calculate_sha1([b"abc"]).unwrap();
        assert_eq!(
            hex::encode(digest),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }
}
