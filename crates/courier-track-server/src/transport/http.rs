//! HTTP transport: the JSON tracking API, CORS, per-IP rate limiting on
//! `/api`, and static frontend assets for everything else.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use courier_track::{TrackError, Tracker, TrackingRequest, TrackingResult};

use super::rate_limit::{Decision, RateLimiter};
use crate::config::ServerConfig;
use crate::types::{HealthResponse, ServerError, ServerResult, TrackQuery};

const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment.";

/// Shared state handed to every handler.
pub struct AppState {
    pub tracker: Tracker,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(tracker: Tracker, config: &ServerConfig) -> Self {
        Self {
            tracker,
            limiter: RateLimiter::new(config.rate_limit, config.rate_window),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.origin_values()))
        .allow_methods([Method::GET]);

    let index = config.static_dir.join("index.html");
    let assets = ServeDir::new(&config.static_dir).fallback(ServeFile::new(&index));

    // Everything under /api counts toward the limit. Unknown API paths get
    // the frontend like any other unknown path.
    let api = Router::new()
        .route("/track", get(handle_track))
        .route("/health", get(handle_health))
        .fallback_service(ServeFile::new(&index))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_layer,
        ));

    Router::new()
        .nest("/api", api)
        .fallback_service(assets)
        .layer(cors)
        .with_state(state)
}

/// Serves the router until Ctrl-C.
pub struct HttpTransport {
    state: Arc<AppState>,
    config: ServerConfig,
}

impl HttpTransport {
    pub fn new(tracker: Tracker, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(tracker, &config)),
            config,
        }
    }

    pub async fn run(&self) -> ServerResult<()> {
        let addr = self.config.socket_addr();
        let app = router(self.state.clone(), &self.config);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP transport listening on http://{addr}");
        tracing::info!(
            "API: http://{addr}/api/track?courier=indiapost&number=EE123456789IN"
        );

        let sweeper = {
            let state = self.state.clone();
            let period = self.config.rate_window;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    state.limiter.purge_expired();
                }
            })
        };

        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;
        sweeper.abort();

        served.map_err(|e| ServerError::Transport(e.to_string()))
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down");
    }
}

/// Fixed-window limit per client IP on `/api` routes.
async fn rate_limit_layer(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    match state.limiter.check(addr.ip()) {
        Decision::Allowed { .. } => next.run(request).await,
        Decision::Limited { retry_after } => {
            tracing::warn!(client = %addr.ip(), "Rate limit exceeded");
            let secs = retry_after.as_secs_f64().ceil() as u64;
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(TrackingResult::failure(RATE_LIMITED_MESSAGE)),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

async fn handle_track(State(state): State<Arc<AppState>>, Query(query): Query<TrackQuery>) -> Response {
    let request = TrackingRequest::new(
        query.courier.as_deref().unwrap_or_default(),
        query.number.as_deref().unwrap_or_default(),
    );
    tracing::info!(
        courier = %request.courier_id,
        number = %request.tracking_number,
        "Tracking request"
    );

    match state.tracker.resolve(&request).await {
        Ok(success) => Json(TrackingResult::Success(success)).into_response(),
        Err(err) => {
            if let TrackError::Exhausted { courier, .. }
            | TrackError::DeadlineExceeded { courier, .. } = &err
            {
                tracing::warn!(
                    courier = %courier,
                    number = %request.tracking_number,
                    error = %err,
                    "Tracking unavailable"
                );
            }
            (status_for(&err), Json(TrackingResult::from_error(&err))).into_response()
        }
    }
}

/// Input problems are the client's fault; an unavailable courier is still a
/// well-formed answer.
fn status_for(err: &TrackError) -> StatusCode {
    match err {
        TrackError::MissingNumber | TrackError::UnknownCourier(_) => StatusCode::BAD_REQUEST,
        TrackError::Exhausted { .. } | TrackError::DeadlineExceeded { .. } => StatusCode::OK,
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.tracker.registry().ids()))
}
