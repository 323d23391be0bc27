//! Public surface for the `terrograph-server` crate.
//!
//! Exposes the router builder, config, storage backends, and seeding so
//! that external crates and integration tests can spin up an in-process
//! server without spawning a subprocess.

pub mod assembler;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod seed;
pub mod storage;

pub use config::Config;
pub use router::build_router;
pub use storage::{memory::MemoryStorage, sqlite::SqliteStorage, Storage};
