//! Infrastructure layer - concrete cache engine and supporting pieces

pub mod cache;
pub mod logging;
