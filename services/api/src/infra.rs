use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};
use wardrobe_ai::config::{AppConfig, RemoteServicesConfig};
use wardrobe_ai::error::AppError;
use wardrobe_ai::workflows::outfit::storage::{
    postgres, InMemoryCatalog, InMemoryRatingStore, PgCatalog, PgRatingStore,
};
use wardrobe_ai::workflows::outfit::{
    CatalogRepository, HttpAffinityScorer, OpenWeatherClient, OutfitRecommendationService,
    RatingStore, RemotePolicy, WeatherEnricher,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn remote_policy(remote: &RemoteServicesConfig) -> RemotePolicy {
    RemotePolicy::new(
        remote.timeout,
        remote.retry_attempts,
        remote.retry_base_delay,
    )
}

pub(crate) fn http_client(remote: &RemoteServicesConfig) -> Result<reqwest::Client, AppError> {
    Ok(reqwest::Client::builder().timeout(remote.timeout).build()?)
}

/// Wire the remote scorer and weather provider around the given stores.
pub(crate) fn assemble_service(
    remote: &RemoteServicesConfig,
    client: reqwest::Client,
    catalog: Arc<dyn CatalogRepository>,
    ratings: Arc<dyn RatingStore>,
) -> OutfitRecommendationService {
    let scorer = HttpAffinityScorer::new(client.clone(), &remote.affinity_url);
    let weather = OpenWeatherClient::new(
        client,
        &remote.weather_base_url,
        remote.weather_api_key.clone(),
    );
    if remote.weather_api_key.is_none() {
        warn!("OPENWEATHER_API_KEY not set; weather will be reported as unknown");
    }

    OutfitRecommendationService::new(
        catalog,
        ratings,
        Arc::new(scorer),
        WeatherEnricher::new(Arc::new(weather), &remote.weather_city, remote.timeout),
        remote_policy(remote),
    )
}

/// Build the service against Postgres when a database URL is configured,
/// falling back to in-memory stores otherwise.
pub(crate) async fn build_service(
    config: &AppConfig,
) -> Result<OutfitRecommendationService, AppError> {
    let client = http_client(&config.remote)?;

    let (catalog, ratings): (Arc<dyn CatalogRepository>, Arc<dyn RatingStore>) =
        match config.database.url.as_deref() {
            Some(url) => {
                let pool = postgres::connect(url, config.database.max_connections).await?;
                postgres::ensure_schema(&pool).await?;
                info!(
                    max_connections = config.database.max_connections,
                    "connected to postgres catalog"
                );
                (
                    Arc::new(PgCatalog::new(pool.clone())),
                    Arc::new(PgRatingStore::new(pool)),
                )
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory catalog and rating store");
                (
                    Arc::new(InMemoryCatalog::default()),
                    Arc::new(InMemoryRatingStore::default()),
                )
            }
        };

    Ok(assemble_service(&config.remote, client, catalog, ratings))
}
