use std::num::TryFromIntError;

use snafu::{Backtrace, Snafu};

use crate::types::Tag;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Error types
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("invalid input"))]
    InvalidInput { backtrace: Option<Backtrace> },
    #[snafu(display("IO error: {}", source), context(false))]
    IO {
        source: std::io::Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("unsupported key packet version {}", version))]
    UnsupportedVersion {
        version: u8,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("unknown {} algorithm code {}", typ, code))]
    UnknownAlgorithm {
        typ: &'static str,
        code: u8,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("malformed algorithm parameters: {}", message))]
    MalformedParams {
        message: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("malformed secret key material"))]
    MalformedSecret {
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("invalid secret key checksum"))]
    ChecksumMismatch { backtrace: Option<Backtrace> },
    #[snafu(display("incorrect passphrase"))]
    IncorrectPassphrase { backtrace: Option<Backtrace> },
    #[snafu(display("secret key material is already encrypted"))]
    AlreadyEncrypted { backtrace: Option<Backtrace> },
    #[snafu(display("secret key material is already decrypted"))]
    AlreadyDecrypted { backtrace: Option<Backtrace> },
    #[snafu(display("refusing insecure s2k usage {}", usage))]
    InsecureS2k {
        usage: u8,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("key parameter validation failed: {}", message))]
    ValidationFailed {
        message: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("packet type {:?} is not allowed here", tag))]
    DisallowedPacket {
        tag: Tag,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("one-pass signature has no trailing signature bound"))]
    MissingTrailingSignature { backtrace: Option<Backtrace> },
    #[snafu(display("trailing signature does not match the one-pass signature"))]
    MismatchedTrailingSignature { backtrace: Option<Backtrace> },
    #[snafu(display("packet is incomplete"))]
    PacketIncomplete { backtrace: Option<Backtrace> },
    #[snafu(display("packet contained more data than was parsable (trailing bytes {})", size))]
    PacketTooLarge { size: u64 },
    #[snafu(display("invalid packet content {:?}", tag))]
    InvalidPacketContent {
        tag: Tag,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },
    #[snafu(display("invalid key length"))]
    InvalidKeyLength,
    #[snafu(display("cfb: invalid key iv length"))]
    CfbInvalidKeyIvLength,
    #[snafu(display("Not yet implemented: {}", message))]
    Unimplemented { message: String },
    /// Signals packet versions and parameters we don't support, but can safely ignore
    #[snafu(display("Unsupported: {}", message))]
    Unsupported {
        message: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("{}", message))]
    Message {
        message: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    SignatureError { source: signature::Error },
    #[snafu(transparent)]
    TryFromInt {
        source: TryFromIntError,
        backtrace: Option<Backtrace>,
    },
}

impl From<cipher::InvalidLength> for Error {
    fn from(_: cipher::InvalidLength) -> Error {
        Error::CfbInvalidKeyIvLength
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error::Message {
            message: err,
            backtrace: Some(snafu::GenerateImplicitData::generate()),
        }
    }
}

#[macro_export]
macro_rules! unimplemented_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unimplemented { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unimplemented { message: format!($fmt, $($arg)+)})
    };
}

#[macro_export]
macro_rules! unsupported_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unsupported {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unsupported {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
}

#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::Error::Message {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Message {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
}

#[macro_export]
macro_rules! format_err {
    ($e:expr) => {
        $crate::errors::Error::Message {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        }
    };
    ($fmt:expr, $($arg:tt)+) => {
        $crate::errors::Error::Message {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        }
    };
}

#[macro_export(local_inner_macros)]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            bail!($e);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)+) => {
        if !($cond) {
            bail!($fmt, $($arg)+);
        }
    };
}

#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`"#, left_val, right_val)
                }
            }
        }
    });
    ($left:expr, $right:expr,) => ({
        ensure_eq!($left, $right)
    });
    ($left:expr, $right:expr, $($arg:tt)+) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`: {}"#, left_val, right_val,
                           format_args!($($arg)+))
                }
            }
        }
    });
}

#[macro_export]
macro_rules! err_opt {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(err) => return Some(Err(err)),
        }
    };
}
