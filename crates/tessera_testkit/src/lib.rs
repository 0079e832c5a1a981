//! # Tessera Testkit
//!
//! Test utilities for Tessera storage backends.
//!
//! This crate provides:
//! - Storage fixtures for every backend, with temporary directory cleanup
//! - Conformance assertions shared by all backends
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use tessera_testkit::prelude::*;
//!
//! for factory in all_factories() {
//!     let storage = factory.create();
//!     assert_exists_lifecycle(&*storage, "sym");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod conformance;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::conformance::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use conformance::*;
pub use fixtures::*;
pub use generators::*;
