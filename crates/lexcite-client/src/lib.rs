pub mod client;
pub mod error;

pub use client::LexClient;
pub use error::{ClientError, Result};
