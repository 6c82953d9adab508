use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::workflows::outfit::catalog::{
    CandidateQuery, CatalogError, CatalogFilter, CatalogRepository,
};
use crate::workflows::outfit::domain::{Garment, GarmentId, NewGarment, RatingRecord};
use crate::workflows::outfit::ratings::{RatingStore, RatingStoreError};

/// Catalog kept in process memory. Candidates come back in insertion order.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    garments: Arc<Mutex<Vec<Garment>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self {
            garments: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl InMemoryCatalog {
    pub fn with_garments(garments: Vec<Garment>) -> Self {
        let next = garments.iter().map(|garment| garment.id.0).max().unwrap_or(0) + 1;
        Self {
            garments: Arc::new(Mutex::new(garments)),
            next_id: Arc::new(AtomicI64::new(next)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Garment>>, CatalogError> {
        self.garments
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog mutex poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn candidates(&self, query: &CandidateQuery) -> Result<Vec<Garment>, CatalogError> {
        let guard = self.lock()?;
        Ok(guard
            .iter()
            .filter(|garment| query.matches(garment))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn insert(&self, garment: NewGarment) -> Result<Garment, CatalogError> {
        let id = GarmentId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stored = Garment {
            id,
            category: garment.category,
            color: garment.color,
            material: garment.material,
            occasion: garment.occasion,
            image_url: garment.image_url,
        };
        self.lock()?.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Garment>, CatalogError> {
        let guard = self.lock()?;
        Ok(guard
            .iter()
            .filter(|garment| filter.matches(garment))
            .cloned()
            .collect())
    }

    async fn image_url(&self, id: GarmentId) -> Result<Option<String>, CatalogError> {
        let guard = self.lock()?;
        Ok(guard
            .iter()
            .find(|garment| garment.id == id)
            .map(|garment| garment.image_url.clone()))
    }

    async fn delete(&self, id: GarmentId) -> Result<bool, CatalogError> {
        let mut guard = self.lock()?;
        let before = guard.len();
        guard.retain(|garment| garment.id != id);
        Ok(guard.len() != before)
    }
}

/// Rating rows kept in process memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRatingStore {
    records: Arc<Mutex<Vec<RatingRecord>>>,
}

impl InMemoryRatingStore {
    pub fn records(&self) -> Vec<RatingRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<RatingRecord>>, RatingStoreError> {
        self.records
            .lock()
            .map_err(|_| RatingStoreError::Unavailable("rating mutex poisoned".to_string()))
    }
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn insert_batch(&self, records: &[RatingRecord]) -> Result<usize, RatingStoreError> {
        // One lock acquisition covers the whole batch.
        let mut guard = self.lock()?;
        guard.extend_from_slice(records);
        Ok(records.len())
    }

    async fn average_rating(&self, garment: GarmentId) -> Result<f64, RatingStoreError> {
        let guard = self.lock()?;
        let (sum, count) = guard
            .iter()
            .filter(|record| record.garment_id == garment)
            .fold((0u64, 0u64), |(sum, count), record| {
                (sum + u64::from(record.rating), count + 1)
            });

        if count == 0 {
            Ok(0.0)
        } else {
            Ok(sum as f64 / count as f64)
        }
    }
}
