//! Sandbox module containing all execution-related components.

pub mod config;
pub mod environment;
pub mod executor;
pub mod limits;
pub mod serialize;
