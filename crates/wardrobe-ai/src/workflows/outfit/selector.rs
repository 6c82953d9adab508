use std::sync::Arc;

use tracing::{debug, warn};

use super::affinity::{affinity_or_zero, AffinityScorer};
use super::catalog::{CandidateQuery, CatalogRepository};
use super::domain::{Garment, OutfitItem, OutfitSlot, RecommendationRequest};
use super::ratings::{average_or_neutral, RatingStore};
use super::remote::{call_with_retry, RemotePolicy};

/// Every candidate starts from this score.
pub const BASE_SCORE: f64 = 1.0;
/// Weight applied to a garment's average rating (at most +1.25).
pub const RATING_WEIGHT: f64 = 0.25;
/// Below any achievable score, so a lone candidate always wins.
const NO_SELECTION: f64 = -1.0;

/// A candidate garment with its composite score for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub garment: Garment,
    pub score: f64,
    pub labels: Vec<String>,
}

impl ScoredCandidate {
    pub fn to_item(&self) -> OutfitItem {
        OutfitItem::from_garment(&self.garment, self.labels.clone())
    }
}

/// Composite score from its parts.
pub fn composite_score(affinity_total: f64, average_rating: f64) -> f64 {
    let mut score = BASE_SCORE + affinity_total;
    if average_rating > 0.0 {
        score += RATING_WEIGHT * average_rating;
    }
    score
}

/// Highest-scoring candidate in retrieval order. Only a strictly greater score
/// replaces the current best, so the first candidate to reach the maximum wins.
pub fn pick_best<I>(candidates: I) -> Option<ScoredCandidate>
where
    I: IntoIterator<Item = ScoredCandidate>,
{
    candidates
        .into_iter()
        .fold((NO_SELECTION, None), |(best_score, best), candidate| {
            if candidate.score > best_score {
                (candidate.score, Some(candidate))
            } else {
                (best_score, best)
            }
        })
        .1
}

/// Fills a single outfit slot from the catalog.
pub struct SlotSelector {
    catalog: Arc<dyn CatalogRepository>,
    scorer: Arc<dyn AffinityScorer>,
    ratings: Arc<dyn RatingStore>,
    policy: RemotePolicy,
}

impl SlotSelector {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        scorer: Arc<dyn AffinityScorer>,
        ratings: Arc<dyn RatingStore>,
        policy: RemotePolicy,
    ) -> Self {
        Self {
            catalog,
            scorer,
            ratings,
            policy,
        }
    }

    /// Best item for `slot`, or `None` when the catalog yields nothing usable.
    pub async fn select(
        &self,
        slot: OutfitSlot,
        request: &RecommendationRequest,
    ) -> Option<OutfitItem> {
        let query = CandidateQuery::for_slot(slot, request);
        debug!(
            slot = slot.key(),
            occasion = %query.occasion,
            category = %query.category,
            color = ?query.color,
            material = ?query.material,
            limit = query.limit,
            "querying catalog candidates"
        );

        let candidates = match call_with_retry(&self.policy, "catalog_candidates", || {
            self.catalog.candidates(&query)
        })
        .await
        {
            Ok(candidates) => candidates,
            Err(failure) => {
                warn!(slot = slot.key(), error = %failure, "catalog query failed, leaving slot empty");
                return None;
            }
        };

        let matched = candidates.len();
        let mut scored = Vec::with_capacity(matched);
        for garment in candidates.into_iter().take(query.limit) {
            scored.push(self.score(garment, &request.keywords).await);
        }

        let best = pick_best(scored);
        debug!(
            slot = slot.key(),
            matched,
            picked = best.is_some(),
            garment_id = best.as_ref().map(|candidate| candidate.garment.id.0),
            score = best.as_ref().map(|candidate| candidate.score),
            "slot selection finished"
        );

        best.map(|candidate| candidate.to_item())
    }

    /// Score one candidate: base, plus keyword affinity when keywords were
    /// requested, plus the weighted average rating when the garment has one.
    pub async fn score(&self, garment: Garment, keywords: &[String]) -> ScoredCandidate {
        let (affinity_total, labels) = if keywords.is_empty() {
            (0.0, Vec::new())
        } else {
            let total = affinity_or_zero(
                self.scorer.as_ref(),
                &self.policy,
                &garment.image_url,
                keywords,
            )
            .await;
            (total, keywords.to_vec())
        };

        let average = average_or_neutral(self.ratings.as_ref(), &self.policy, garment.id).await;

        ScoredCandidate {
            score: composite_score(affinity_total, average),
            garment,
            labels,
        }
    }
}
