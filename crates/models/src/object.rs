use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

/// A reservable object. Serialized as `{id, name, type, isReserved, reservedBy, roomId}`,
/// which is both the stored payload and the response shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub is_reserved: bool,
    #[serde(default)]
    pub reserved_by: String,
    #[serde(alias = "room_id")]
    pub room_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReservationState<'a> {
    Free,
    Held { by: &'a str },
}

impl Object {
    /// Build a fresh, unreserved record with a newly generated id.
    pub fn create(input: NewObject) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            kind: input.kind,
            is_reserved: false,
            reserved_by: String::new(),
            room_id: input.room_id,
        }
    }

    pub fn state(&self) -> ReservationState<'_> {
        if self.is_reserved {
            ReservationState::Held { by: &self.reserved_by }
        } else {
            ReservationState::Free
        }
    }

    /// `is_reserved` is false exactly when `reserved_by` is empty.
    pub fn is_consistent(&self) -> bool {
        self.is_reserved != self.reserved_by.is_empty()
    }

    /// Copy of this record held by `user_id`.
    pub fn held_by(&self, user_id: &str) -> Self {
        Self { is_reserved: true, reserved_by: user_id.to_string(), ..self.clone() }
    }

    /// Copy of this record with the reservation cleared.
    pub fn released(&self) -> Self {
        Self { is_reserved: false, reserved_by: String::new(), ..self.clone() }
    }
}

/// Input for creating an object; all three fields are required and non-blank.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewObject {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(alias = "room_id", default)]
    pub room_id: String,
}

impl NewObject {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self { name: name.into(), kind: kind.into(), room_id: room_id.into() }
    }

    /// Trim every field and reject blanks, naming the first missing field.
    pub fn validate(self) -> Result<Self, ModelError> {
        let name = required("name", self.name)?;
        let kind = required("type", self.kind)?;
        let room_id = required("roomId", self.room_id)?;
        Ok(Self { name, kind, room_id })
    }
}

fn required(field: &str, value: String) -> Result<String, ModelError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Reject a blank identifier such as a user id or room id.
pub fn validate_identifier(field: &str, value: &str) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        return Err(ModelError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_starts_free_with_fresh_id() -> Result<(), ModelError> {
        let a = Object::create(NewObject::new("Desk", "furniture", "r1").validate()?);
        let b = Object::create(NewObject::new("Desk", "furniture", "r1").validate()?);
        assert_ne!(a.id, b.id);
        assert_eq!(a.state(), ReservationState::Free);
        assert!(a.reserved_by.is_empty());
        assert!(a.is_consistent());
        Ok(())
    }

    #[test]
    fn hold_and_release_keep_invariant() -> Result<(), ModelError> {
        let obj = Object::create(NewObject::new("Lamp", "light", "r2").validate()?);
        let held = obj.held_by("u1");
        assert_eq!(held.state(), ReservationState::Held { by: "u1" });
        assert!(held.is_consistent());
        assert_eq!(held.id, obj.id);

        let freed = held.released();
        assert_eq!(freed, obj);
        Ok(())
    }

    #[test]
    fn inconsistent_records_are_detected() {
        let mut obj = Object::create(NewObject::new("Chair", "furniture", "r1"));
        obj.is_reserved = true;
        assert!(!obj.is_consistent());
        obj.is_reserved = false;
        obj.reserved_by = "ghost".into();
        assert!(!obj.is_consistent());
    }

    #[test]
    fn validate_trims_and_names_missing_field() {
        let ok = NewObject::new("  Desk ", "furniture", " r1").validate().unwrap();
        assert_eq!(ok, NewObject::new("Desk", "furniture", "r1"));

        let err = NewObject::new("Desk", "  ", "r1").validate().unwrap_err();
        assert!(err.to_string().contains("type"));
        let err = NewObject::new("Desk", "furniture", "").validate().unwrap_err();
        assert!(err.to_string().contains("roomId"));
        let err = NewObject::new("", "furniture", "r1").validate().unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn new_object_accepts_legacy_room_id() {
        let input: NewObject =
            serde_json::from_str(r#"{"name":"Desk","type":"furniture","room_id":"r9"}"#).unwrap();
        assert_eq!(input.room_id, "r9");
        let missing: NewObject = serde_json::from_str(r#"{"name":"Desk"}"#).unwrap();
        assert!(missing.validate().is_err());
    }
}
