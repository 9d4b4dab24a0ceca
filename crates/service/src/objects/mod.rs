//! Object reservation engine and listing layer.
//!
//! Both hold an explicit store handle; all shared mutable state lives in the
//! backend. Same-id mutations are serialized only through `compare_and_set`.

pub mod reservation;
pub mod listing;

pub use listing::{Listing, ObjectListing};
pub use reservation::{ReservationEngine, DEFAULT_MAX_ATTEMPTS};
