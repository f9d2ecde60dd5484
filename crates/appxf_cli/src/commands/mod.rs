//! CLI command implementations.

pub mod get;
pub mod inspect;
pub mod location;
pub mod put;
pub mod status;
pub mod sync;
