//! Cache Backends
//!
//! The three interchangeable [`CacheBackend`](crate::cache::CacheBackend)
//! implementations.

mod file;
mod memory;
mod remote;

pub use file::{FileBackend, FileBackendConfig};
pub use memory::{MemoryBackend, MemoryBackendConfig};
pub use remote::{RemoteBackend, RemoteStoreConfig, HEALTH_CHECK_KEY};
