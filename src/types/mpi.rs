use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};
use zeroize::Zeroize;

use crate::errors::{MalformedParamsSnafu, Result};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::util::strip_leading_zeros;

/// Number of bits we accept when reading or writing MPIs.
/// The value is the same as gnupgs.
const MAX_EXTERN_MPI_BITS: u16 = 16384;

/// Represents an owned MPI value.
/// The inner value is stored without leading zeros, ready to be serialized.
///
/// Ref: <https://tools.ietf.org/html/rfc4880#section-3.2>
#[derive(Default, Clone, PartialEq, Eq, derive_more::Debug)]
pub struct Mpi(#[debug("{}", hex::encode(_0))] Vec<u8>);

impl Mpi {
    /// Parses the given reader as an MPI.
    ///
    /// The data is expected to be prefixed with a two-octet bit length.
    pub fn try_from_reader<B: BufRead>(mut i: B) -> Result<Self> {
        let len_bits = i.read_be_u16()?;

        if len_bits > MAX_EXTERN_MPI_BITS {
            return Err(MalformedParamsSnafu {
                message: format!("mpi too long: {} bits", len_bits),
            }
            .build());
        }

        let len_bytes = usize::from((len_bits + 7) >> 3);
        let n = i.take_bytes(len_bytes)?;

        Ok(Mpi(strip_leading_zeros(&n).to_vec()))
    }

    /// Represent the data in `raw` as an Mpi.
    /// Note that `raw` is not expected to be length-prefixed!
    ///
    /// Strips leading zeros.
    pub fn from_slice(raw: &[u8]) -> Self {
        Mpi(strip_leading_zeros(raw).to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The length of the value in bits.
    pub fn bits(&self) -> usize {
        bit_size(&self.0)
    }

    /// Returns the value left-padded with zeros to `size` bytes, for
    /// consumers that want fixed-width big-endian scalars.
    pub fn to_padded(&self, size: usize) -> Result<Vec<u8>> {
        ensure!(
            self.0.len() <= size,
            "invalid mpi length {} for a {} byte value",
            self.0.len(),
            size
        );

        let mut padded = vec![0u8; size];
        padded[size - self.0.len()..].copy_from_slice(&self.0);
        Ok(padded)
    }
}

/// Returns the bit length of a given slice.
#[inline]
fn bit_size(val: &[u8]) -> usize {
    if val.is_empty() {
        0
    } else {
        (val.len() * 8) - val[0].leading_zeros() as usize
    }
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        let size = bit_size(&self.0);
        w.write_u16::<BigEndian>(size as u16)?;
        w.write_all(&self.0)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.0.len()
    }
}

impl Zeroize for Mpi {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}
