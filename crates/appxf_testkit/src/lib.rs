//! # APPXF Testkit
//!
//! Test utilities for the storage and sync crates:
//! - two-location fixtures over RAM or temporary directories
//! - proptest strategies for [`appxf_codec::Value`] trees and item names
//!
//! ## Usage
//!
//! ```rust
//! use appxf_testkit::prelude::*;
//!
//! let env = TestEnv::memory();
//! let a = env.a.get("item").unwrap();
//! let b = env.b.get("item").unwrap();
//! assert_ne!(a.location(), b.location());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
