//! Record codec: `Object` <-> JSON byte payload.

use crate::errors::ModelError;
use crate::object::Object;

pub fn encode(object: &Object) -> Result<Vec<u8>, ModelError> {
    serde_json::to_vec(object).map_err(|e| ModelError::Serialization(e.to_string()))
}

/// Decode a stored payload. Payloads whose reservation flags disagree are rejected.
pub fn decode(payload: &[u8]) -> Result<Object, ModelError> {
    let object: Object =
        serde_json::from_slice(payload).map_err(|e| ModelError::Serialization(e.to_string()))?;
    if !object.is_consistent() {
        return Err(ModelError::Serialization(format!(
            "record {} has isReserved={} with reservedBy={:?}",
            object.id, object.is_reserved, object.reserved_by
        )));
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::NewObject;

    #[test]
    fn wire_shape_uses_fixed_field_names() -> anyhow::Result<()> {
        let obj = Object::create(NewObject::new("Desk", "furniture", "r1")).held_by("u1");
        let value: serde_json::Value = serde_json::from_slice(&encode(&obj)?)?;
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["id", "isReserved", "name", "reservedBy", "roomId", "type"]);
        assert_eq!(value["type"], "furniture");
        assert_eq!(value["reservedBy"], "u1");
        Ok(())
    }

    #[test]
    fn decodes_legacy_payload() -> anyhow::Result<()> {
        let legacy = br#"{"id":"a1","name":"Lamp","type":"light","isReserved":false,"reservedBy":"","room_id":"r3"}"#;
        let obj = decode(legacy)?;
        assert_eq!(obj.room_id, "r3");
        assert_eq!(obj.kind, "light");
        Ok(())
    }

    #[test]
    fn missing_reserved_by_defaults_empty() -> anyhow::Result<()> {
        let obj = decode(br#"{"id":"a2","name":"Lamp","type":"light","roomId":"r3"}"#)?;
        assert!(!obj.is_reserved);
        assert_eq!(obj.reserved_by, "");
        Ok(())
    }

    #[test]
    fn rejects_garbage_and_inconsistent_records() {
        assert!(matches!(decode(b"not json"), Err(ModelError::Serialization(_))));
        let held_by_nobody = br#"{"id":"a3","name":"Lamp","type":"light","isReserved":true,"reservedBy":"","roomId":"r3"}"#;
        assert!(matches!(decode(held_by_nobody), Err(ModelError::Serialization(_))));
    }
}
