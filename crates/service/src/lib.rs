//! Service layer for the object reservation engine.
//! - `storage`: the entity store contract and its backends.
//! - `objects`: create/reserve/unreserve and full-scan listings on top of a store.
//! - `capability`: the authorization seam consulted by the HTTP layer before mutations.

pub mod errors;
pub mod storage;
pub mod objects;
pub mod capability;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
