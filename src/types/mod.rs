mod fingerprint;
mod key_id;
mod mpi;
mod packet;
mod plain_secret_params;
mod public_params;
mod s2k;
mod secret_params;

pub use self::fingerprint::Fingerprint;
pub use self::key_id::KeyId;
pub use self::mpi::Mpi;
pub use self::packet::{KeyVersion, PacketHeaderVersion, PacketLength, Tag};
pub use self::plain_secret_params::PlainSecretParams;
pub use self::public_params::{AlgorithmInfo, PublicParams};
pub use self::s2k::{StringToKey, StringToKeyType};
pub use self::secret_params::{DummyParams, EncryptedSecretParams, S2kUsage, SecretParams};
