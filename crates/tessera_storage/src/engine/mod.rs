//! Embedded key-value engine with a fixed byte capacity.
//!
//! The engine stores raw byte keys and values in an append-only data file
//! inside an environment directory. It knows nothing about atom keys or
//! segments; [`crate::EmbeddedStorage`] adapts it to the storage contract.
//!
//! ## Semantics
//!
//! - Writes happen in closures passed to [`Environment::write`] and commit
//!   atomically
//! - `put` with [`PutFlags::no_overwrite`] fails with [`EngineError::KeyExists`]
//! - `delete` of an absent key fails with [`EngineError::NotFound`]
//! - A commit that would exceed `map_size` first compacts the data file; it
//!   fails with [`EngineError::MapFull`] only if live data still does not fit
//! - A read-only environment shares its directory lock and never writes

mod environment;
mod error;
mod file;
mod record;

pub use environment::{EnvOptions, EnvStats, Environment, PutFlags, WriteTxn};
pub use error::{EngineError, EngineResult};
