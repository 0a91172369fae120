//! Cache infrastructure - the in-memory engine and its building blocks

mod clock;
mod compression;
mod factory;
mod in_memory;
mod lru;

pub use clock::{Clock, ManualClock, SystemClock};
pub use factory::CacheFactory;
pub use in_memory::InMemoryResponseCache;
