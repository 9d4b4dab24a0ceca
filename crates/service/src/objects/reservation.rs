use std::sync::Arc;

use models::{codec, object::validate_identifier, NewObject, Object, ReservationState};
use tracing::{debug, instrument};

use crate::errors::ServiceError;
use crate::storage::{CasOutcome, EntityStore};

/// Attempts per reserve/unreserve before giving up on a contended record.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy)]
enum Transition<'a> {
    Reserve { user_id: &'a str },
    Release,
}

impl Transition<'_> {
    /// Next record for `current`, or `Conflict` when the state machine forbids the move.
    fn apply(self, current: &Object) -> Result<Object, ServiceError> {
        match (self, current.state()) {
            (Transition::Reserve { user_id }, ReservationState::Free) => Ok(current.held_by(user_id)),
            (Transition::Reserve { .. }, ReservationState::Held { .. }) => {
                Err(ServiceError::Conflict(format!("object {} is already reserved", current.id)))
            }
            (Transition::Release, ReservationState::Held { .. }) => Ok(current.released()),
            (Transition::Release, ReservationState::Free) => {
                Err(ServiceError::Conflict(format!("object {} is not reserved", current.id)))
            }
        }
    }
}

/// Creates objects and moves them between `Free` and `Held`.
///
/// Every transition is read, check, then a conditional write keyed on the bytes
/// that were read. A lost race restarts from the read, up to `max_attempts` times.
#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn EntityStore>,
    max_attempts: u32,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store, max_attempts: DEFAULT_MAX_ATTEMPTS }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewObject) -> Result<Object, ServiceError> {
        let object = Object::create(input.validate()?);
        let payload = codec::encode(&object)?;
        match self.store.compare_and_set(&object.id, None, payload).await? {
            CasOutcome::Applied => Ok(object),
            CasOutcome::Conflict => Err(ServiceError::Conflict(format!("object {} already exists", object.id))),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Object, ServiceError> {
        self.load(id).await.map(|(object, _)| object)
    }

    #[instrument(skip(self))]
    pub async fn reserve(&self, id: &str, user_id: &str) -> Result<Object, ServiceError> {
        validate_identifier("userId", user_id)?;
        self.transition(id, Transition::Reserve { user_id: user_id.trim() }).await
    }

    #[instrument(skip(self))]
    pub async fn unreserve(&self, id: &str) -> Result<Object, ServiceError> {
        self.transition(id, Transition::Release).await
    }

    /// Current record plus the exact payload it was decoded from.
    async fn load(&self, id: &str) -> Result<(Object, Vec<u8>), ServiceError> {
        if id.trim().is_empty() {
            return Err(ServiceError::not_found(id));
        }
        let payload = self.store.get(id).await?.ok_or_else(|| ServiceError::not_found(id))?;
        let object = codec::decode(&payload)?;
        Ok((object, payload))
    }

    async fn transition(&self, id: &str, transition: Transition<'_>) -> Result<Object, ServiceError> {
        for attempt in 1..=self.max_attempts {
            let (current, read) = self.load(id).await?;
            let next = transition.apply(&current)?;
            let payload = codec::encode(&next)?;
            match self.store.compare_and_set(id, Some(&read), payload).await? {
                CasOutcome::Applied => return Ok(next),
                CasOutcome::Conflict => debug!(object_id = %id, attempt, "record changed since read; retrying"),
            }
        }
        Err(ServiceError::Conflict(format!(
            "object {id} kept changing concurrently; gave up after {} attempts",
            self.max_attempts
        )))
    }
}
