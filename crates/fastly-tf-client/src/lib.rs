pub mod client;
pub mod error;

pub use client::{FastlyClient, ListGcssInput};
pub use error::ClientError;
