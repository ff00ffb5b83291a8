#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::style,
    clippy::perf,
    clippy::complexity,
    clippy::correctness,
    clippy::unwrap_used,
    rust_2018_idioms
)]
#![allow(clippy::missing_const_for_fn, clippy::use_self)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
pub mod errors;
pub mod crypto;
pub mod packet;
pub mod ser;
pub mod types;

mod config;
mod parsing_reader;
mod util;

pub use self::config::Config;

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
