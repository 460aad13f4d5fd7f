//! `PilotServer`: axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use pilot_msu::MsuManager;
use pilot_room::RoomManager;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{Span, error, info, info_span, warn};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::health::{self, HealthResponse};
use crate::sweeper;
use crate::websocket;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session table and frame routing.
    pub dispatcher: Arc<Dispatcher>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
    /// When the server started.
    pub start_time: Instant,
}

/// How long [`PilotServer::stop`] waits for the listener and sweeper.
const STOP_GRACE: Duration = Duration::from_secs(10);

/// The signaling hub server.
pub struct PilotServer {
    config: Arc<ServerConfig>,
    rooms: Arc<RoomManager>,
    msus: Arc<MsuManager>,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
    /// Listener and sweeper tasks, drained by `stop`.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
    span: Span,
}

impl PilotServer {
    /// Create a server with empty room and MSU registries.
    pub fn new(config: ServerConfig) -> Self {
        let span = info_span!("pilot");
        let rooms = Arc::new(RoomManager::new(info_span!(parent: &span, "rooms")));
        let msus = Arc::new(MsuManager::new(info_span!(parent: &span, "msus")));
        let dispatcher = Arc::new(Dispatcher::new(
            rooms.clone(),
            msus.clone(),
            info_span!(parent: &span, "dispatcher"),
        ));
        Self {
            config: Arc::new(config),
            rooms,
            msus,
            dispatcher,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            metrics: None,
            start_time: Instant::now(),
            span,
        }
    }

    /// Serve Prometheus metrics from `handle` on `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the axum router.
    ///
    /// # Panics
    ///
    /// If the configured subpath is not a valid route path.
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
        };

        let mut router = Router::new()
            .route(&self.config.subpath, get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(state);
        if let Some(handle) = self.metrics.clone() {
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }
        router.layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until [`stop`](Self::stop).
    ///
    /// Returns the bound address, which differs from the configured one
    /// when the port is `0`.
    pub async fn listen(&self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let service = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let token = self.shutdown.clone();
        let span = self.span.clone();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, service)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(parent: &span, error = %e, "server error");
            }
        });

        self.track(handle);
        info!(parent: &self.span, %addr, subpath = %self.config.subpath, "pilot server listening");
        Ok(addr)
    }

    /// Start the stale-MSU sweep if an interval is configured. Returns
    /// whether it was started.
    pub fn spawn_msu_sweeper(&self) -> bool {
        let Some(every) = self.config.msu_sweep_interval() else {
            return false;
        };
        info!(
            parent: &self.span,
            every_ms = self.config.msu_sweep_interval_ms,
            ttl_ms = self.config.msu_ttl_ms,
            "msu sweep enabled"
        );
        let handle = sweeper::start_msu_sweeper(
            self.msus.clone(),
            every,
            self.config.msu_ttl_ms,
            self.shutdown.clone(),
        );
        self.track(handle);
        true
    }

    fn track(&self, handle: JoinHandle<()>) {
        self.tasks.lock().push(handle);
    }

    /// Close every session, stop accepting connections and wait for the
    /// listener and sweeper to finish.
    pub async fn stop(&self) {
        self.stop_within(STOP_GRACE).await;
    }

    /// [`stop`](Self::stop) with an explicit grace period. Tasks still
    /// running when it expires are aborted.
    pub async fn stop_within(&self, grace: Duration) {
        info!(parent: &self.span, sessions = self.dispatcher.session_count(), "stopping");
        self.dispatcher.close_all().await;
        self.shutdown.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return;
        }
        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        if tokio::time::timeout(grace, futures::future::join_all(tasks))
            .await
            .is_err()
        {
            warn!(parent: &self.span, ?grace, "tasks still running after grace period, aborting");
            for task in aborts {
                task.abort();
            }
        }
        info!(parent: &self.span, "stopped");
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopping(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Room registry.
    pub fn rooms(&self) -> &Arc<RoomManager> {
        &self.rooms
    }

    /// MSU registry.
    pub fn msus(&self) -> &Arc<MsuManager> {
        &self.msus
    }

    /// Dispatcher and session table.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Cancelled once the server stops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// GET <subpath>: upgrade to a peer connection.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            websocket::run_connection(
                socket,
                addr.to_string(),
                state.dispatcher,
                state.config,
                state.shutdown,
            )
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let ctx = state.dispatcher.context();
    Json(health::health_check(
        state.start_time,
        state.dispatcher.session_count(),
        ctx.rooms.room_count(),
        ctx.msus.msu_count(),
    ))
}
