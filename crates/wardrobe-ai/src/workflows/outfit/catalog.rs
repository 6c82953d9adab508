use async_trait::async_trait;

use super::domain::{Garment, GarmentId, NewGarment, OutfitSlot, RecommendationRequest};

/// Maximum number of candidates considered per slot.
pub const CANDIDATE_LIMIT: usize = 5;

/// Per-slot candidate lookup.
///
/// Occasion and category compare case-insensitively for equality; color and
/// material, when present, are case-insensitive substring filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub occasion: String,
    pub category: String,
    pub color: Option<String>,
    pub material: Option<String>,
    pub limit: usize,
}

impl CandidateQuery {
    pub fn for_slot(slot: OutfitSlot, request: &RecommendationRequest) -> Self {
        Self {
            occasion: request.occasion.trim().to_string(),
            category: slot.category().to_string(),
            color: present(request.color.as_deref()),
            material: present(request.material.as_deref()),
            limit: CANDIDATE_LIMIT,
        }
    }

    pub fn matches(&self, garment: &Garment) -> bool {
        eq_ignore_case(&garment.occasion, &self.occasion)
            && eq_ignore_case(&garment.category, &self.category)
            && self
                .color
                .as_deref()
                .map_or(true, |color| contains_ignore_case(&garment.color, color))
            && self
                .material
                .as_deref()
                .map_or(true, |material| contains_ignore_case(&garment.material, material))
    }
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn eq_ignore_case(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Browse filter for catalog listings: any-of exact matches per field, empty
/// lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub occasions: Vec<String>,
    pub colors: Vec<String>,
}

impl CatalogFilter {
    /// Build from comma separated query values (`occasion=a,b&preferences=red`).
    pub fn from_csv(occasions: Option<&str>, colors: Option<&str>) -> Self {
        Self {
            occasions: split_csv(occasions),
            colors: split_csv(colors),
        }
    }

    pub fn matches(&self, garment: &Garment) -> bool {
        (self.occasions.is_empty() || self.occasions.iter().any(|o| *o == garment.occasion))
            && (self.colors.is_empty() || self.colors.iter().any(|c| *c == garment.color))
    }
}

pub(crate) fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Storage abstraction over the clothing catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Up to `query.limit` garments matching the query, in no particular order.
    async fn candidates(&self, query: &CandidateQuery) -> Result<Vec<Garment>, CatalogError>;
    async fn insert(&self, garment: NewGarment) -> Result<Garment, CatalogError>;
    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Garment>, CatalogError>;
    async fn image_url(&self, id: GarmentId) -> Result<Option<String>, CatalogError>;
    /// Returns `false` when no garment had the id.
    async fn delete(&self, id: GarmentId) -> Result<bool, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Query(String),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}
