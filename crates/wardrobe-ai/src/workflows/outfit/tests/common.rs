use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::outfit::affinity::{AffinityError, AffinityScorer, AffinityScores};
use crate::workflows::outfit::catalog::{
    CandidateQuery, CatalogError, CatalogFilter, CatalogRepository,
};
use crate::workflows::outfit::domain::{Garment, GarmentId, NewGarment, RatingRecord};
use crate::workflows::outfit::ratings::{RatingStore, RatingStoreError};
use crate::workflows::outfit::remote::RemotePolicy;
use crate::workflows::outfit::storage::InMemoryCatalog;
use crate::workflows::outfit::weather::{
    WeatherEnricher, WeatherError, WeatherProvider, WeatherReport,
};
use crate::workflows::outfit::OutfitRecommendationService;

pub(super) fn garment(id: i64, category: &str, occasion: &str) -> Garment {
    Garment {
        id: GarmentId(id),
        category: category.to_string(),
        color: "navy".to_string(),
        material: "cotton".to_string(),
        occasion: occasion.to_string(),
        image_url: format!("http://wardrobe.local/uploads/{id}.jpg"),
    }
}

pub(super) fn party_wardrobe() -> Vec<Garment> {
    vec![
        garment(1, "top", "party"),
        garment(2, "bottom", "party"),
        garment(3, "footwear", "party"),
        garment(4, "top", "office"),
        garment(5, "jacket", "office"),
    ]
}

pub(super) fn test_policy() -> RemotePolicy {
    RemotePolicy::new(Duration::from_millis(200), 2, Duration::ZERO)
}

pub(super) struct Harness {
    pub(super) service: OutfitRecommendationService,
    pub(super) catalog: Arc<CountingCatalog>,
    pub(super) scorer: Arc<FakeScorer>,
    pub(super) ratings: Arc<FakeRatings>,
    pub(super) weather: Arc<FakeWeather>,
}

pub(super) fn harness(garments: Vec<Garment>) -> Harness {
    harness_with(
        CountingCatalog::new(garments),
        FakeScorer::default(),
        FakeRatings::default(),
        FakeWeather::clear(),
    )
}

pub(super) fn harness_with(
    catalog: CountingCatalog,
    scorer: FakeScorer,
    ratings: FakeRatings,
    weather: FakeWeather,
) -> Harness {
    let catalog = Arc::new(catalog);
    let scorer = Arc::new(scorer);
    let ratings = Arc::new(ratings);
    let weather = Arc::new(weather);

    let service = OutfitRecommendationService::new(
        catalog.clone(),
        ratings.clone(),
        scorer.clone(),
        WeatherEnricher::new(weather.clone(), "London", Duration::from_millis(200)),
        test_policy(),
    );

    Harness {
        service,
        catalog,
        scorer,
        ratings,
        weather,
    }
}

/// In-memory catalog that counts candidate queries and can fail per category.
pub(super) struct CountingCatalog {
    inner: InMemoryCatalog,
    failing_categories: Vec<String>,
    queries: AtomicUsize,
}

impl CountingCatalog {
    pub(super) fn new(garments: Vec<Garment>) -> Self {
        Self {
            inner: InMemoryCatalog::with_garments(garments),
            failing_categories: Vec::new(),
            queries: AtomicUsize::new(0),
        }
    }

    pub(super) fn failing_for(mut self, category: &str) -> Self {
        self.failing_categories.push(category.to_string());
        self
    }

    pub(super) fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogRepository for CountingCatalog {
    async fn candidates(&self, query: &CandidateQuery) -> Result<Vec<Garment>, CatalogError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing_categories.contains(&query.category) {
            return Err(CatalogError::Unavailable("connection reset".to_string()));
        }
        self.inner.candidates(query).await
    }

    async fn insert(&self, garment: NewGarment) -> Result<Garment, CatalogError> {
        self.inner.insert(garment).await
    }

    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Garment>, CatalogError> {
        self.inner.list(filter).await
    }

    async fn image_url(&self, id: GarmentId) -> Result<Option<String>, CatalogError> {
        self.inner.image_url(id).await
    }

    async fn delete(&self, id: GarmentId) -> Result<bool, CatalogError> {
        self.inner.delete(id).await
    }
}

/// Scorer answering from a fixed per-image table.
#[derive(Default)]
pub(super) struct FakeScorer {
    scores: HashMap<String, AffinityScores>,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeScorer {
    pub(super) fn with_score(mut self, image_url: &str, keyword: &str, score: f64) -> Self {
        self.scores
            .entry(image_url.to_string())
            .or_default()
            .insert(keyword.to_string(), score);
        self
    }

    pub(super) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(super) fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AffinityScorer for FakeScorer {
    async fn score(
        &self,
        image_url: &str,
        _keywords: &[String],
    ) -> Result<AffinityScores, AffinityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(AffinityError::Status { status: 503 });
        }
        Ok(self.scores.get(image_url).cloned().unwrap_or_default())
    }
}

/// Rating store with fixed averages and an optional mid-batch failure.
#[derive(Default)]
pub(super) struct FakeRatings {
    averages: HashMap<GarmentId, f64>,
    failing_reads: bool,
    fail_at_row: Option<usize>,
    committed: Mutex<Vec<RatingRecord>>,
    batches: AtomicUsize,
}

impl FakeRatings {
    pub(super) fn with_average(mut self, garment: i64, average: f64) -> Self {
        self.averages.insert(GarmentId(garment), average);
        self
    }

    pub(super) fn failing_reads() -> Self {
        Self {
            failing_reads: true,
            ..Self::default()
        }
    }

    pub(super) fn failing_at_row(row: usize) -> Self {
        Self {
            fail_at_row: Some(row),
            ..Self::default()
        }
    }

    pub(super) fn committed(&self) -> Vec<RatingRecord> {
        self.committed.lock().expect("ratings mutex poisoned").clone()
    }

    pub(super) fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RatingStore for FakeRatings {
    async fn insert_batch(&self, records: &[RatingRecord]) -> Result<usize, RatingStoreError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let mut staged = Vec::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            if Some(row) == self.fail_at_row {
                return Err(RatingStoreError::Query("constraint violated".to_string()));
            }
            staged.push(record.clone());
        }
        self.committed
            .lock()
            .expect("ratings mutex poisoned")
            .extend(staged);
        Ok(records.len())
    }

    async fn average_rating(&self, garment: GarmentId) -> Result<f64, RatingStoreError> {
        if self.failing_reads {
            return Err(RatingStoreError::Unavailable("database offline".to_string()));
        }
        Ok(self.averages.get(&garment).copied().unwrap_or(0.0))
    }
}

pub(super) struct FakeWeather {
    report: Option<WeatherReport>,
    calls: AtomicUsize,
}

impl FakeWeather {
    pub(super) fn clear() -> Self {
        Self {
            report: Some(WeatherReport {
                condition: "Clear".to_string(),
                temperature_c: 21.0,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn offline() -> Self {
        Self {
            report: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current(&self, _location: &str) -> Result<WeatherReport, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.report.clone().ok_or(WeatherError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        })
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
