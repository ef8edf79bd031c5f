//! Common types shared by the fitcard crates

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
