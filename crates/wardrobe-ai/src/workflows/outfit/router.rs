use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::catalog::{split_csv, CatalogFilter};
use super::domain::{GarmentId, NewGarment, RatingSubmission, RecommendationRequest};
use super::service::{OutfitRecommendationService, RecommendationError};

/// Router builder exposing the recommendation, rating and catalog endpoints.
pub fn outfit_router(service: Arc<OutfitRecommendationService>) -> Router {
    Router::new()
        .route(
            "/recommendation",
            post(recommend_handler).get(recommend_query_handler),
        )
        .route("/rate", post(rate_handler))
        .route("/clothes", post(add_clothing_handler).get(list_clothes_handler))
        .route("/clothes/:id", delete(delete_clothing_handler))
        .route("/images/:id", get(image_handler))
        .with_state(service)
}

/// Query-string form of a recommendation request. `keywords` may repeat and
/// each value may itself be comma separated.
#[derive(Debug, Default)]
pub(crate) struct RecommendationParams {
    occasion: String,
    category: Option<String>,
    color: Option<String>,
    material: Option<String>,
    keywords: Vec<String>,
}

impl RecommendationParams {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "occasion" => params.occasion = value,
                "category" => params.category = Some(value),
                "color" => params.color = Some(value),
                "material" => params.material = Some(value),
                "keywords" | "keywords[]" => params.keywords.extend(split_csv(Some(&value))),
                _ => {}
            }
        }
        params
    }
}

impl From<RecommendationParams> for RecommendationRequest {
    fn from(params: RecommendationParams) -> Self {
        RecommendationRequest {
            occasion: params.occasion,
            category: params.category,
            color: params.color,
            material: params.material,
            keywords: params.keywords,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CatalogParams {
    occasion: Option<String>,
    preferences: Option<String>,
}

fn error_response(error: RecommendationError) -> Response {
    let status = match &error {
        RecommendationError::Validation(_) => StatusCode::BAD_REQUEST,
        RecommendationError::GarmentNotFound(_) => StatusCode::NOT_FOUND,
        RecommendationError::Storage(_) | RecommendationError::Catalog(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

/// Malformed bodies, query strings and path segments.
fn rejection_response(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

pub(crate) async fn recommend_handler(
    State(service): State<Arc<OutfitRecommendationService>>,
    request: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    match service.compose(request).await {
        Ok(outfit) => (StatusCode::OK, Json(outfit)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn recommend_query_handler(
    State(service): State<Arc<OutfitRecommendationService>>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let Query(pairs) = match pairs {
        Ok(pairs) => pairs,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    let params = RecommendationParams::from_pairs(pairs);
    match service.compose(params.into()).await {
        Ok(outfit) => (StatusCode::OK, Json(outfit)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rate_handler(
    State(service): State<Arc<OutfitRecommendationService>>,
    submission: Result<Json<RatingSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match submission {
        Ok(submission) => submission,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    match service.submit_rating(submission).await {
        Ok(receipt) => {
            let payload = json!({
                "status": "ok",
                "outfit_id": receipt.outfit_id,
                "recorded": receipt.recorded,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_clothing_handler(
    State(service): State<Arc<OutfitRecommendationService>>,
    garment: Result<Json<NewGarment>, JsonRejection>,
) -> Response {
    let Json(garment) = match garment {
        Ok(garment) => garment,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    match service.add_garment(garment).await {
        Ok(stored) => {
            let payload = json!({
                "message": "Clothing added successfully",
                "id": stored.id,
                "image_url": stored.image_url,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_clothes_handler(
    State(service): State<Arc<OutfitRecommendationService>>,
    params: Result<Query<CatalogParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    let filter = CatalogFilter::from_csv(params.occasion.as_deref(), params.preferences.as_deref());
    match service.list_garments(&filter).await {
        Ok(garments) => (StatusCode::OK, Json(garments)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_clothing_handler(
    State(service): State<Arc<OutfitRecommendationService>>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    match service.remove_garment(GarmentId(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn image_handler(
    State(service): State<Arc<OutfitRecommendationService>>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };
    match service.image_url(GarmentId(id)).await {
        Ok(image_url) => (StatusCode::OK, Json(json!({ "image_url": image_url }))).into_response(),
        Err(error) => error_response(error),
    }
}
