//! API Module
//!
//! REST surface over the cache service and the match pipeline.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
