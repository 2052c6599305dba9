pub mod de;
pub mod error;
pub mod flatten;
pub mod hcl;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::DomainError;
pub use flatten::{expand_gcs, flatten_gcs, FlatRecord};
pub use hcl::render_service;
pub use types::*;
