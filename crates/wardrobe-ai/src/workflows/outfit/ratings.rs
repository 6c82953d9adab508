use async_trait::async_trait;
use tracing::warn;

use super::domain::{GarmentId, RatingRecord};
use super::remote::{call_with_retry, RemotePolicy};

/// Append-only store of per-garment rating rows.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Persist every record or none of them.
    async fn insert_batch(&self, records: &[RatingRecord]) -> Result<usize, RatingStoreError>;
    /// Mean rating for the garment, `0.0` when it has never been rated.
    async fn average_rating(&self, garment: GarmentId) -> Result<f64, RatingStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RatingStoreError {
    #[error("rating store query failed: {0}")]
    Query(String),
    #[error("rating store unavailable: {0}")]
    Unavailable(String),
}

/// Average rating for a garment, degraded to `0.0` on any failure.
pub(crate) async fn average_or_neutral(
    store: &dyn RatingStore,
    policy: &RemotePolicy,
    garment: GarmentId,
) -> f64 {
    match call_with_retry(policy, "average_rating", || store.average_rating(garment)).await {
        Ok(average) if average.is_finite() => average.clamp(0.0, 5.0),
        Ok(_) => 0.0,
        Err(failure) => {
            warn!(garment_id = garment.0, error = %failure, "average rating unavailable");
            0.0
        }
    }
}
