mod list;
mod literal_data;
mod many;
mod one_pass_signature;
mod packet_sum;
mod public_key;
mod secret_key;
mod signature;

pub use self::list::{write_streamed, PacketList};
pub use self::literal_data::{DataMode, LiteralData};
pub use self::many::PacketParser;
pub use self::one_pass_signature::OnePassSignature;
pub use self::packet_sum::Packet;
pub use self::public_key::{PubKeyInner, PublicKey, PublicSubkey};
pub use self::secret_key::{SecretKey, SecretSubkey};
pub use self::signature::{Signature, SignatureType, SignatureVersion};

pub use crate::types::Tag;

use std::io;

use crate::errors::Result;
use crate::ser::Serialize;
use crate::types::PacketHeaderVersion;

pub trait PacketTrait: Serialize {
    fn tag(&self) -> Tag;

    /// Writes the packet prefixed with a new style fixed length header.
    fn to_writer_with_header<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        PacketHeaderVersion::New.write_header(writer, self.tag(), self.write_len())?;
        self.to_writer(writer)
    }

    /// The size of the packet including its header.
    fn write_len_with_header(&self) -> usize {
        let body_len = self.write_len();
        PacketHeaderVersion::New.header_len(body_len) + body_len
    }
}
