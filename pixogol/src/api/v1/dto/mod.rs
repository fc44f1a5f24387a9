//! v1 API Data Transfer Objects.
//!
//! These types define the wire format for the v1 REST API. They are kept
//! separate from the domain models in `src/models/`, which are also what
//! the audit log stores.

pub mod analyses;

pub use analyses::*;
