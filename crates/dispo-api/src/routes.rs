use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::authorize;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::{DispositionLedger, FieldEntry, Insert, ListFilter, NewDisposition, StoredDisposition};

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    ledger: Arc<DispositionLedger>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            ledger: Arc::new(DispositionLedger::default()),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/dispositions",
            get(list_dispositions).post(create_disposition),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    dispositions: usize,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        dispositions: state.ledger.len().await,
    })
}

async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(request.headers(), state.config.api_token.as_deref())?;
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDispositionRequest {
    #[serde(default)]
    fill_disposition: Option<Vec<FieldEntry>>,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    line_of_business_id: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

impl CreateDispositionRequest {
    fn validate(self) -> Result<NewDisposition, AppError> {
        let fill_disposition = self
            .fill_disposition
            .ok_or_else(|| AppError::bad_request("fillDisposition is required"))?;
        let agent_id = self
            .agent_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::bad_request("agentId is required"))?;

        Ok(NewDisposition {
            customer_id: non_blank(self.customer_id),
            agent_id,
            line_of_business_id: non_blank(self.line_of_business_id),
            fill_disposition,
            timestamp: self.timestamp,
        })
    }
}

async fn create_disposition(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateDispositionRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let submission = request.validate()?;
    let idempotency_key = idempotency_key(&headers)?;

    match state.ledger.insert(submission, idempotency_key).await {
        Insert::Created(item) => {
            tracing::info!(
                endpoint = "create_disposition",
                id = %item.id,
                agent = %item.agent_id,
                fields = item.fill_disposition.len(),
                "Stored disposition"
            );
            Ok((StatusCode::CREATED, Json(item)).into_response())
        }
        Insert::Replayed(item) => {
            tracing::info!(
                endpoint = "create_disposition",
                id = %item.id,
                "Replayed disposition for repeated idempotency key"
            );
            Ok((StatusCode::OK, Json(item)).into_response())
        }
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .map_err(|_| AppError::bad_request("Idempotency-Key header is not valid UTF-8"))?
        .trim();
    if key.is_empty() || key.len() > 128 {
        return Err(AppError::bad_request(
            "Idempotency-Key must be between 1 and 128 characters",
        ));
    }
    Ok(Some(key))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    customer_id: Option<String>,
    line_of_business_id: Option<String>,
    agent_id: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    data: Vec<StoredDisposition>,
    page: usize,
    limit: usize,
    total: usize,
}

async fn list_dispositions(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, AppError> {
    let Query(query) = query?;
    let page = query.page.unwrap_or(0);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, state.config.max_page_size);
    let filter = ListFilter {
        customer_id: non_blank(query.customer_id),
        line_of_business_id: non_blank(query.line_of_business_id),
        agent_id: non_blank(query.agent_id),
    };

    let (data, total) = state.ledger.list(&filter, page, limit).await;
    Ok(Json(ListResponse {
        data,
        page,
        limit,
        total,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
