use std::sync::Arc;

use models::{codec, object::validate_identifier, Object};
use tracing::instrument;

use crate::errors::ServiceError;
use crate::storage::{EntityStore, ALL_KEYS};

/// Result of a full-keyspace scan. Order is whatever the backend enumerated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub objects: Vec<Object>,
    /// Records left out because their payload was unreadable or the read failed.
    pub skipped: usize,
}

/// Read-side queries over every stored record.
///
/// The backend has no secondary index, so each call reads all keys: O(record count),
/// no pagination, no snapshot. Records mutated during a scan may be seen in either state.
#[derive(Clone)]
pub struct ObjectListing {
    store: Arc<dyn EntityStore>,
}

impl ObjectListing {
    pub fn new(store: Arc<dyn EntityStore>) -> Self { Self { store } }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Listing, ServiceError> {
        self.scan(|_| true).await
    }

    #[instrument(skip(self))]
    pub async fn list_by_room(&self, room_id: &str) -> Result<Listing, ServiceError> {
        validate_identifier("roomId", room_id)?;
        // 与创建时一致：房间号去除首尾空白后精确匹配
        let room_id = room_id.trim();
        self.scan(|o| o.room_id == room_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_reserved(&self) -> Result<Listing, ServiceError> {
        self.scan(|o| o.is_reserved).await
    }

    /// Enumerate keys, then read and decode each. Only the enumeration failing is an error.
    async fn scan<F>(&self, keep: F) -> Result<Listing, ServiceError>
    where
        F: Fn(&Object) -> bool + Send,
    {
        let keys = self.store.keys(ALL_KEYS).await?;
        let mut listing = Listing { objects: Vec::with_capacity(keys.len()), skipped: 0 };
        for key in keys {
            let payload = match self.store.get(&key).await {
                Ok(Some(payload)) => payload,
                // enumerated but gone by the time we read it
                Ok(None) => continue,
                Err(_) => {
                    listing.skipped += 1;
                    continue;
                }
            };
            match codec::decode(&payload) {
                Ok(object) if keep(&object) => listing.objects.push(object),
                Ok(_) => {}
                Err(_) => listing.skipped += 1,
            }
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::NewObject;

    use crate::objects::ReservationEngine;
    use crate::storage::MemoryStore;
    use crate::test_support::{DownStore, FlakyReadStore};

    fn layers() -> (ReservationEngine, ObjectListing, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ReservationEngine::new(store.clone()), ObjectListing::new(store.clone()), store)
    }

    fn sorted_ids(listing: &Listing) -> Vec<String> {
        let mut ids: Vec<_> = listing.objects.iter().map(|o| o.id.clone()).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn lists_everything() -> Result<(), anyhow::Error> {
        let (engine, listing, _) = layers();
        assert!(listing.list_all().await?.objects.is_empty());

        for room in ["r1", "r1", "r2"] {
            engine.create(NewObject::new("Chair", "furniture", room)).await?;
        }
        let all = listing.list_all().await?;
        assert_eq!(all.objects.len(), 3);
        assert_eq!(all.skipped, 0);
        Ok(())
    }

    #[tokio::test]
    async fn filters_by_exact_room() -> Result<(), anyhow::Error> {
        let (engine, listing, _) = layers();
        let a = engine.create(NewObject::new("Chair", "furniture", "r1")).await?;
        let b = engine.create(NewObject::new("Desk", "furniture", "r1")).await?;
        engine.create(NewObject::new("Lamp", "light", "r2")).await?;
        engine.create(NewObject::new("Lamp", "light", "r10")).await?;

        let r1 = listing.list_by_room("r1").await?;
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(sorted_ids(&r1), expected);
        assert!(r1.objects.iter().all(|o| o.room_id == "r1"));

        assert_eq!(sorted_ids(&listing.list_by_room(" r1 ").await?), expected);
        assert!(listing.list_by_room("R1").await?.objects.is_empty());
        assert!(listing.list_by_room("nowhere").await?.objects.is_empty());
        assert!(matches!(listing.list_by_room("").await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn lists_only_reserved() -> Result<(), anyhow::Error> {
        let (engine, listing, _) = layers();
        let a = engine.create(NewObject::new("Chair", "furniture", "r1")).await?;
        let b = engine.create(NewObject::new("Desk", "furniture", "r1")).await?;
        engine.create(NewObject::new("Lamp", "light", "r2")).await?;
        engine.reserve(&a.id, "u1").await?;
        engine.reserve(&b.id, "u2").await?;

        let reserved = listing.list_reserved().await?;
        let mut expected = vec![a.id.clone(), b.id.clone()];
        expected.sort();
        assert_eq!(sorted_ids(&reserved), expected);
        assert!(reserved.objects.iter().all(|o| o.is_reserved && !o.reserved_by.is_empty()));

        engine.unreserve(&a.id).await?;
        assert_eq!(sorted_ids(&listing.list_reserved().await?), vec![b.id]);
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_records_are_skipped_and_counted() -> Result<(), anyhow::Error> {
        let (engine, listing, store) = layers();
        engine.create(NewObject::new("Chair", "furniture", "r1")).await?;
        store.set("garbage", b"\x00\x01not-json".to_vec()).await?;
        store
            .set("half-held", br#"{"id":"half-held","name":"x","type":"y","isReserved":true,"reservedBy":"","roomId":"r1"}"#.to_vec())
            .await?;

        let all = listing.list_all().await?;
        assert_eq!(all.objects.len(), 1);
        assert_eq!(all.skipped, 2);

        let r1 = listing.list_by_room("r1").await?;
        assert_eq!(r1.objects.len(), 1);
        assert_eq!(r1.skipped, 2);
        Ok(())
    }

    #[tokio::test]
    async fn failed_reads_are_skipped() -> Result<(), anyhow::Error> {
        let inner = MemoryStore::new();
        let a = Object::create(NewObject::new("Chair", "furniture", "r1"));
        let b = Object::create(NewObject::new("Desk", "furniture", "r1"));
        for obj in [&a, &b] {
            inner.set(&obj.id, codec::encode(obj)?).await?;
        }

        let listing = ObjectListing::new(Arc::new(FlakyReadStore::new(inner, vec![a.id.clone()])));
        let all = listing.list_all().await?;
        assert_eq!(sorted_ids(&all), vec![b.id]);
        assert_eq!(all.skipped, 1);
        Ok(())
    }

    #[tokio::test]
    async fn enumeration_failure_is_an_error() {
        let listing = ObjectListing::new(Arc::new(DownStore));
        assert!(matches!(listing.list_all().await, Err(ServiceError::StoreUnavailable(_))));
        assert!(matches!(listing.list_reserved().await, Err(ServiceError::StoreUnavailable(_))));
    }
}
