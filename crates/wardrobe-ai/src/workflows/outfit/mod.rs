//! Outfit recommendation: per-slot candidate retrieval, scoring, selection,
//! deterministic outfit identity and rating capture.

pub mod affinity;
pub mod catalog;
pub mod domain;
pub mod identity;
pub mod ratings;
pub mod remote;
pub mod router;
pub mod selector;
pub mod service;
pub mod storage;
pub mod weather;

#[cfg(test)]
mod tests;

pub use affinity::{AffinityError, AffinityScorer, AffinityScores, HttpAffinityScorer};
pub use catalog::{CandidateQuery, CatalogError, CatalogFilter, CatalogRepository, CANDIDATE_LIMIT};
pub use domain::{
    Garment, GarmentId, NewGarment, Outfit, OutfitId, OutfitItem, OutfitSlot, Rating,
    RatingRecord, RatingSubmission, RecommendationRequest, ValidationError,
};
pub use identity::outfit_identifier;
pub use ratings::{RatingStore, RatingStoreError};
pub use remote::{CallFailure, RemotePolicy};
pub use router::outfit_router;
pub use selector::{pick_best, ScoredCandidate, SlotSelector};
pub use service::{OutfitRecommendationService, RatingReceipt, RecommendationError, StorageError};
pub use weather::{
    OpenWeatherClient, WeatherEnricher, WeatherError, WeatherProvider, WeatherReport,
    UNKNOWN_WEATHER,
};
