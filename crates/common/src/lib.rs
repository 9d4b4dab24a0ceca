//! Shared building blocks for the reservation services: logging bootstrap,
//! startup environment checks and response envelopes.

pub mod types;
pub mod utils;
pub mod env;
