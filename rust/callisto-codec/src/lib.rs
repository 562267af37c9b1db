#![doc = include_str!("../README.md")]

#[cfg(feature = "builtin")]
pub mod builtin;
mod codec;
mod cursor;
mod error;
mod registry;
mod ty;

pub use codec::*;
pub use cursor::*;
pub use error::*;
pub use registry::*;
pub use ty::*;
