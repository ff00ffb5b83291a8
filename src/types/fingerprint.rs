use std::fmt;

use crate::errors::Result;
use crate::types::KeyVersion;

/// Represents a Fingerprint.
///
/// OpenPGP fingerprints consist of two pieces of information:
/// the key version, and the binary data of the fingerprint itself.
#[derive(Clone, Eq, Hash, PartialEq, derive_more::Debug, derive_more::Display)]
pub enum Fingerprint {
    #[debug("{}", hex::encode(_0))]
    #[display("{}", hex::encode(_0))]
    V4([u8; 20]),
    #[debug("{}", hex::encode(_0))]
    #[display("{}", hex::encode(_0))]
    V5([u8; 32]),
}

impl Fingerprint {
    /// Constructor for an OpenPGP fingerprint.
    ///
    /// The length of the binary data in `fp` must match the expected length
    /// for `version`, otherwise an error is returned.
    pub fn new(version: KeyVersion, fp: &[u8]) -> Result<Self> {
        let e = |_| {
            format_err!(
                "Illegal fingerprint length {} for key version {:?}",
                fp.len(),
                version
            )
        };

        let fp = match version {
            KeyVersion::V4 => Fingerprint::V4(fp.try_into().map_err(e)?),
            KeyVersion::V5 => Fingerprint::V5(fp.try_into().map_err(e)?),
            _ => bail!("Unsupported key version {:?}", version),
        };

        Ok(fp)
    }

    /// Returns the length of the fingerprint's binary data.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Self::V4(_) => 20,
            Self::V5(_) => 32,
        }
    }

    /// The key version of the key that this fingerprint references.
    pub fn version(&self) -> KeyVersion {
        match self {
            Self::V4(_) => KeyVersion::V4,
            Self::V5(_) => KeyVersion::V5,
        }
    }

    /// The binary data of this fingerprint.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::V4(fp) => &fp[..],
            Self::V5(fp) => &fp[..],
        }
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::UpperHex for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.as_bytes()))
    }
}
