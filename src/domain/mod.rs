//! Domain layer - cache data model, contracts and pure logic

pub mod cache;
pub mod error;

pub use error::DomainError;
