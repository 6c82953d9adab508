//! Postgres-backed catalog and rating store.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::workflows::outfit::catalog::{
    CandidateQuery, CatalogError, CatalogFilter, CatalogRepository,
};
use crate::workflows::outfit::domain::{Garment, GarmentId, NewGarment, RatingRecord};
use crate::workflows::outfit::ratings::{RatingStore, RatingStoreError};

/// Idempotent schema for the `clothes` and `item_ratings` tables.
const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS clothes (
    id BIGSERIAL PRIMARY KEY,
    category TEXT NOT NULL,
    color TEXT NOT NULL,
    material TEXT NOT NULL,
    occasion TEXT NOT NULL,
    image_url TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS item_ratings (
    id BIGSERIAL PRIMARY KEY,
    outfit_id TEXT NOT NULL,
    clothing_id BIGINT NOT NULL,
    rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
    user_id TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS item_ratings_clothing_id_idx ON item_ratings (clothing_id);
";

/// Column list for the `clothes` table.
const COLUMNS: &str = "id, category, color, material, occasion, image_url";

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct GarmentRow {
    id: i64,
    category: String,
    color: String,
    material: String,
    occasion: String,
    image_url: String,
}

impl From<GarmentRow> for Garment {
    fn from(row: GarmentRow) -> Self {
        Garment {
            id: GarmentId(row.id),
            category: row.category,
            color: row.color,
            material: row.material,
            occasion: row.occasion,
            image_url: row.image_url,
        }
    }
}

/// Escape LIKE wildcards so user filters match literally.
fn like_fragment(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub(crate) fn candidate_query(query: &CandidateQuery) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {COLUMNS} FROM clothes WHERE lower(occasion) = lower("
    ));
    builder.push_bind(query.occasion.as_str());
    builder.push(") AND lower(category) = lower(");
    builder.push_bind(query.category.as_str());
    builder.push(")");

    if let Some(color) = query.color.as_deref() {
        builder.push(" AND color ILIKE ");
        builder.push_bind(like_fragment(color));
    }
    if let Some(material) = query.material.as_deref() {
        builder.push(" AND material ILIKE ");
        builder.push_bind(like_fragment(material));
    }

    builder.push(" ORDER BY random() LIMIT ");
    builder.push_bind(query.limit as i64);
    builder
}

#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_error(err: sqlx::Error) -> CatalogError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            CatalogError::Unavailable(err.to_string())
        }
        other => CatalogError::Query(other.to_string()),
    }
}

#[async_trait]
impl CatalogRepository for PgCatalog {
    async fn candidates(&self, query: &CandidateQuery) -> Result<Vec<Garment>, CatalogError> {
        let mut builder = candidate_query(query);
        debug!(sql = builder.sql(), "catalog candidate query");
        let rows = builder
            .build_query_as::<GarmentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(Garment::from).collect())
    }

    async fn insert(&self, garment: NewGarment) -> Result<Garment, CatalogError> {
        let insert = format!(
            "INSERT INTO clothes (category, color, material, occasion, image_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, GarmentRow>(&insert)
            .bind(&garment.category)
            .bind(&garment.color)
            .bind(&garment.material)
            .bind(&garment.occasion)
            .bind(&garment.image_url)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(row.into())
    }

    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Garment>, CatalogError> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM clothes WHERE TRUE"));
        if !filter.occasions.is_empty() {
            builder.push(" AND occasion = ANY(");
            builder.push_bind(filter.occasions.clone());
            builder.push(")");
        }
        if !filter.colors.is_empty() {
            builder.push(" AND color = ANY(");
            builder.push_bind(filter.colors.clone());
            builder.push(")");
        }
        builder.push(" ORDER BY id");

        let rows = builder
            .build_query_as::<GarmentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(Garment::from).collect())
    }

    async fn image_url(&self, id: GarmentId) -> Result<Option<String>, CatalogError> {
        sqlx::query_scalar::<_, String>("SELECT image_url FROM clothes WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)
    }

    async fn delete(&self, id: GarmentId) -> Result<bool, CatalogError> {
        let result = sqlx::query("DELETE FROM clothes WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

impl PgRatingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(err: sqlx::Error) -> RatingStoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RatingStoreError::Unavailable(err.to_string())
        }
        other => RatingStoreError::Query(other.to_string()),
    }
}

#[async_trait]
impl RatingStore for PgRatingStore {
    async fn insert_batch(&self, records: &[RatingRecord]) -> Result<usize, RatingStoreError> {
        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        for record in records {
            sqlx::query(
                "INSERT INTO item_ratings (outfit_id, clothing_id, rating, user_id) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&record.outfit_id.0)
            .bind(record.garment_id.0)
            .bind(i16::from(record.rating))
            .bind(record.user_id.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)?;
        Ok(records.len())
    }

    async fn average_rating(&self, garment: GarmentId) -> Result<f64, RatingStoreError> {
        sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(AVG(rating), 0)::float8 FROM item_ratings WHERE clothing_id = $1",
        )
        .bind(garment.0)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)
    }
}
