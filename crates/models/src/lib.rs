//! Record types for the object reservation service.
//! - `object`: the reservable `Object` record and its creation input.
//! - `codec`: byte payload encoding used by the entity store.

pub mod errors;
pub mod object;
pub mod codec;

pub use object::{NewObject, Object, ReservationState};
