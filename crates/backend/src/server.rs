use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use geo_recommender_shared::geo::{is_valid_latitude, is_valid_longitude};
use geo_recommender_shared::models::{ProfileParams, ProfileResponse, QueryParams, QueryResponse};
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, info};

use crate::error::AppError;
use crate::profile::run_profiling;
use crate::store::KdTreeStore;

/// Neighbors returned by `/query`.
pub const QUERY_NEIGHBORS: usize = 10;
/// Age proximity used by `/query`.
pub const QUERY_AGE_PROXIMITY: u32 = 5;

/// Largest `num_loops` accepted by `/profile`.
pub const MAX_PROFILE_LOOPS: usize = 10_000;
/// Largest `num_neighbors` accepted by `/profile`.
pub const MAX_PROFILE_NEIGHBORS: usize = 1_000;

const ALLOWED_METHODS: &str = "PUT, GET, POST, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Origin, Accept, Content-Type, X-Requested-With, X-CSRF-Token";

async fn query(
    State(store): State<Arc<KdTreeStore>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Query(params) = params.map_err(|_| AppError::MissingQueryParams)?;
    if !is_valid_latitude(params.latitude) || !is_valid_longitude(params.longitude) {
        return Err(AppError::MissingQueryParams);
    }
    debug!(?params, "query");

    let result = tokio::task::spawn_blocking(move || {
        store.k_nearest_neighbors(&params, QUERY_NEIGHBORS, QUERY_AGE_PROXIMITY)
    })
    .await
    .map_err(|e| AppError::Task(e.to_string()))??;

    Ok(Json(QueryResponse { result }))
}

async fn profile(
    State(store): State<Arc<KdTreeStore>>,
    params: Result<Query<ProfileParams>, QueryRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Query(params) = params.map_err(|_| AppError::MissingProfileParams)?;
    if params.num_loops > MAX_PROFILE_LOOPS || params.num_neighbors > MAX_PROFILE_NEIGHBORS {
        return Err(AppError::MissingProfileParams);
    }

    let stats = tokio::task::spawn_blocking(move || {
        run_profiling(
            &store,
            params.num_loops,
            params.num_neighbors,
            params.age_proximity,
            &mut rand::thread_rng(),
        )
    })
    .await
    .map_err(|e| AppError::Task(e.to_string()))??;

    Ok(Json(ProfileResponse { stats }))
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::PUT,
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-csrf-token"),
        ])
}

/// Build the full application router.
pub fn build_app(store: Arc<KdTreeStore>) -> Router {
    Router::new()
        .route("/query", get(query))
        .route("/profile", get(profile))
        .with_state(store)
        // Preflight is answered by the CORS layer; plain responses still advertise the same policy
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(cors())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
