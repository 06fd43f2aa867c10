use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use berth_core::service::{EnvelopeReply, SdpRequest, SignalingService};
use berth_core::SignalError;

pub struct AppState {
    pub service: SignalingService,
    pub metrics: PrometheusHandle,
    pub started_at: Instant,
}

pub type SharedState = Arc<AppState>;

/// Maps a core failure onto the wire contract: a JSON body carrying the
/// stable reason string, 400 for everything except a handoff deadline
/// expiry (408) and a server-side encoding fault (500).
pub struct SignalRejection(SignalError);

impl From<SignalError> for SignalRejection {
    fn from(error: SignalError) -> Self {
        Self(error)
    }
}

impl IntoResponse for SignalRejection {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SignalError::Timeout => StatusCode::REQUEST_TIMEOUT,
            SignalError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        counter!("berth_request_failures_total", 1, "reason" => self.0.reason());
        debug!(reason = self.0.reason(), "request rejected");
        (
            status,
            Json(json!({ "success": false, "reason": self.0.reason() })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub pending_handoffs: usize,
    pub stored_descriptors: usize,
    pub registered_resolvers: usize,
    pub uptime_secs: u64,
}

/// POST /handshake - blocking round trip against the id's registrant.
pub async fn handshake(
    State(state): State<SharedState>,
    Json(request): Json<SdpRequest>,
) -> Result<Json<EnvelopeReply>, SignalRejection> {
    let started = Instant::now();
    let reply = state.service.handshake(&request).await?;
    counter!("berth_handshakes_total", 1);
    histogram!(
        "berth_handshake_duration_ms",
        started.elapsed().as_secs_f64() * 1000.0
    );
    debug!(id = %request.id, "handshake completed");
    Ok(Json(reply))
}

/// POST /inform - fire-and-forget delivery to the id's registrant.
pub async fn inform(
    State(state): State<SharedState>,
    Json(request): Json<SdpRequest>,
) -> Result<Json<AckResponse>, SignalRejection> {
    state.service.inform(&request)?;
    counter!("berth_informs_total", 1);
    Ok(Json(AckResponse::ok()))
}

/// POST /store - insert-once into the non-destructive store.
pub async fn store(
    State(state): State<SharedState>,
    Json(request): Json<SdpRequest>,
) -> Result<Json<AckResponse>, SignalRejection> {
    state.service.store(&request)?;
    counter!("berth_stores_total", 1);
    Ok(Json(AckResponse::ok()))
}

/// GET /store/:id - repeatable read of a stored descriptor.
pub async fn fetch(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<EnvelopeReply>, SignalRejection> {
    let reply = state.service.fetch(&id)?;
    counter!("berth_fetches_total", 1);
    Ok(Json(reply))
}

/// POST /exchange - synchronous resolver exchange for the id.
pub async fn exchange(
    State(state): State<SharedState>,
    Json(request): Json<SdpRequest>,
) -> Result<Json<EnvelopeReply>, SignalRejection> {
    let reply = state.service.resolve(&request)?;
    counter!("berth_exchanges_total", 1);
    Ok(Json(reply))
}

/// GET /healthz - liveness probe.
pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /debug/stats - live registry counts.
pub async fn stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    let snapshot = state.service.stats();
    Json(StatsResponse {
        pending_handoffs: snapshot.handoffs,
        stored_descriptors: snapshot.stored,
        registered_resolvers: snapshot.callbacks,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// GET /metrics - Prometheus exposition.
pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
