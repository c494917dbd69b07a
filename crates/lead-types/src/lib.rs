//! Shared types for the lead intake service.
//!
//! Wire shapes of the intake endpoint, `Origin` parsing, and the error
//! taxonomy every pipeline stage reports through.

pub mod api;
pub mod errors;
pub mod origin;

pub use api::*;
pub use errors::*;
pub use origin::*;
