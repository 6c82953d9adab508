use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::affinity::AffinityScorer;
use super::catalog::{CatalogError, CatalogFilter, CatalogRepository};
use super::domain::{
    Garment, GarmentId, NewGarment, Outfit, OutfitId, OutfitSlot, Rating, RatingRecord,
    RatingSubmission, RecommendationRequest, ValidationError,
};
use super::ratings::{RatingStore, RatingStoreError};
use super::remote::{call_with_timeout, CallFailure, RemotePolicy};
use super::selector::SlotSelector;
use super::weather::WeatherEnricher;

/// Service composing outfits from the catalog and recording their ratings.
pub struct OutfitRecommendationService {
    selector: Arc<SlotSelector>,
    catalog: Arc<dyn CatalogRepository>,
    ratings: Arc<dyn RatingStore>,
    weather: WeatherEnricher,
    policy: RemotePolicy,
}

impl OutfitRecommendationService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        ratings: Arc<dyn RatingStore>,
        scorer: Arc<dyn AffinityScorer>,
        weather: WeatherEnricher,
        policy: RemotePolicy,
    ) -> Self {
        let selector = Arc::new(SlotSelector::new(
            catalog.clone(),
            scorer,
            ratings.clone(),
            policy,
        ));

        Self {
            selector,
            catalog,
            ratings,
            weather,
            policy,
        }
    }

    /// Compose an outfit for the request.
    ///
    /// Only validation failures surface; every collaborator failure degrades
    /// to an empty slot, zero affinity, a neutral rating or unknown weather.
    pub async fn compose(&self, request: RecommendationRequest) -> Result<Outfit, RecommendationError> {
        if request.occasion.trim().is_empty() {
            return Err(ValidationError::MissingOccasion.into());
        }

        let weather = self.weather.current_weather().await;

        let request = Arc::new(request);
        let tasks: Vec<_> = OutfitSlot::ALL
            .into_iter()
            .map(|slot| {
                let selector = Arc::clone(&self.selector);
                let request = Arc::clone(&request);
                let handle = tokio::spawn(async move { selector.select(slot, &request).await });
                (slot, handle)
            })
            .collect();

        let mut items = BTreeMap::new();
        for (slot, handle) in tasks {
            match handle.await {
                Ok(Some(item)) => {
                    items.insert(slot, item);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(slot = slot.key(), error = %err, "slot selection task failed, leaving slot empty");
                }
            }
        }

        let outfit = Outfit::assemble(request.occasion.clone(), weather, items);
        info!(
            outfit_id = %outfit.outfit_id,
            occasion = %outfit.occasion,
            filled_slots = outfit.items.len(),
            "outfit composed"
        );
        Ok(outfit)
    }

    /// Record one rating row per garment of a previously recommended outfit.
    ///
    /// The rating is validated before the store is touched; the rows are
    /// written as a single all-or-nothing batch.
    pub async fn submit_rating(
        &self,
        submission: RatingSubmission,
    ) -> Result<RatingReceipt, RecommendationError> {
        let rating = Rating::new(submission.rating)?;
        let garments: Vec<GarmentId> = submission.items.values().copied().collect();
        let receipt = self
            .record_ratings(
                OutfitId(submission.outfit_id.trim().to_string()),
                rating,
                &garments,
                submission.user_id,
            )
            .await?;
        Ok(receipt)
    }

    /// Write one row per garment; a blank outfit id is rejected before the
    /// store is touched.
    pub async fn record_ratings(
        &self,
        outfit_id: OutfitId,
        rating: Rating,
        garments: &[GarmentId],
        user_id: Option<String>,
    ) -> Result<RatingReceipt, RecommendationError> {
        if outfit_id.0.trim().is_empty() {
            return Err(ValidationError::MissingOutfitId.into());
        }
        let user_id = user_id.filter(|user| !user.trim().is_empty());
        let records: Vec<RatingRecord> = garments
            .iter()
            .map(|garment| RatingRecord {
                outfit_id: outfit_id.clone(),
                garment_id: *garment,
                rating: rating.value(),
                user_id: user_id.clone(),
            })
            .collect();

        let recorded = call_with_timeout(self.policy.timeout, self.ratings.insert_batch(&records))
            .await
            .map_err(StorageError::from)?;

        info!(outfit_id = %outfit_id, rating = rating.value(), recorded, "outfit rating recorded");
        Ok(RatingReceipt {
            outfit_id,
            rating: rating.value(),
            recorded,
            recorded_at: Utc::now(),
        })
    }

    pub async fn add_garment(&self, garment: NewGarment) -> Result<Garment, RecommendationError> {
        garment.validate()?;
        let stored = call_with_timeout(self.policy.timeout, self.catalog.insert(garment))
            .await
            .map_err(catalog_failure)?;
        info!(garment_id = stored.id.0, category = %stored.category, "garment added to catalog");
        Ok(stored)
    }

    pub async fn list_garments(
        &self,
        filter: &CatalogFilter,
    ) -> Result<Vec<Garment>, RecommendationError> {
        let garments = call_with_timeout(self.policy.timeout, self.catalog.list(filter))
            .await
            .map_err(catalog_failure)?;
        Ok(garments)
    }

    pub async fn image_url(&self, id: GarmentId) -> Result<String, RecommendationError> {
        call_with_timeout(self.policy.timeout, self.catalog.image_url(id))
            .await
            .map_err(catalog_failure)?
            .ok_or(RecommendationError::GarmentNotFound(id))
    }

    pub async fn remove_garment(&self, id: GarmentId) -> Result<(), RecommendationError> {
        let removed = call_with_timeout(self.policy.timeout, self.catalog.delete(id))
            .await
            .map_err(catalog_failure)?;
        if removed {
            info!(garment_id = id.0, "garment removed from catalog");
            Ok(())
        } else {
            Err(RecommendationError::GarmentNotFound(id))
        }
    }
}

fn catalog_failure(failure: CallFailure<CatalogError>) -> RecommendationError {
    match failure {
        CallFailure::Failed(err) => RecommendationError::Catalog(err),
        CallFailure::TimedOut(limit) => RecommendationError::Catalog(CatalogError::Unavailable(
            format!("timed out after {}ms", limit.as_millis()),
        )),
    }
}

/// Confirmation of a committed rating batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingReceipt {
    pub outfit_id: OutfitId,
    pub rating: u8,
    pub recorded: usize,
    pub recorded_at: DateTime<Utc>,
}

/// Rating write failures. Nothing is committed when these are returned.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    Store(#[from] RatingStoreError),
    #[error("rating store timed out after {0}ms")]
    TimedOut(u128),
}

impl From<CallFailure<RatingStoreError>> for StorageError {
    fn from(value: CallFailure<RatingStoreError>) -> Self {
        match value {
            CallFailure::Failed(err) => StorageError::Store(err),
            CallFailure::TimedOut(limit) => StorageError::TimedOut(limit.as_millis()),
        }
    }
}

/// Error raised by the recommendation service.
#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("garment {0} not found")]
    GarmentNotFound(GarmentId),
}
