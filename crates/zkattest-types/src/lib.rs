#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod constants;
mod crypto;
mod error;
pub mod wire;

pub use constants::*;
pub use crypto::*;
pub use error::*;
