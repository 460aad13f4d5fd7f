//! Per-connection lifecycle: a writer task plus the inbound read loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use pilot_protocol::{Session, SharedSession};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info, info_span, trace, warn};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::metrics;
use crate::websocket::session::WsSession;

/// How long the writer may keep flushing after the read loop ends.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Serve one upgraded socket until the peer goes away, the session is
/// closed, or the server shuts down.
///
/// Frames are dispatched one at a time in arrival order. On exit the session
/// is closed and removed from the dispatcher. Room and MSU state that still
/// references it is left alone.
pub async fn run_connection(
    socket: WebSocket,
    peer: String,
    dispatcher: Arc<Dispatcher>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) {
    let span = info_span!(parent: &dispatcher.context().span, "connection", peer = %peer);
    let (tx, rx) = mpsc::channel(config.send_queue.max(1));
    let session = Arc::new(WsSession::new(peer, tx));
    let shared: SharedSession = session.clone();

    dispatcher.register_session(shared.clone());
    metrics::connection_opened();
    info!(parent: &span, "peer connected");

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(
        sink,
        rx,
        session.clone(),
        config.ping_interval(),
        config.pong_timeout(),
        span.clone(),
    ));

    loop {
        let next = tokio::select! {
            () = session.closed().cancelled() => break,
            () = shutdown.cancelled() => break,
            next = stream.next() => next,
        };
        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                debug!(parent: &span, error = %e, "read failed");
                break;
            }
            None => break,
        };
        session.mark_alive();

        match message {
            Message::Text(text) => dispatcher.handle_frame(&shared, text.as_str()).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => dispatcher.handle_frame(&shared, text).await,
                Err(_) => warn!(parent: &span, len = bytes.len(), "dropping non-utf8 binary frame"),
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    shared.close().await;
    let _ = dispatcher.remove_session(&shared);
    metrics::connection_closed();
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }
    info!(parent: &span, age_secs = session.age().as_secs(), "peer disconnected");
}

/// Drain queued frames into the socket and keep the peer alive with Pings.
///
/// Once the session is closed, frames already queued are flushed before a
/// Close frame is sent.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    session: Arc<WsSession>,
    ping_every: Duration,
    pong_timeout: Duration,
    span: Span,
) {
    let mut ping = tokio::time::interval(ping_every);
    let _ = ping.tick().await;

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(text) = frame else { break };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    session.close().await;
                    break;
                }
            }
            () = session.closed().cancelled() => {
                while let Ok(text) = rx.try_recv() {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            _ = ping.tick() => {
                let idle = session.idle_for();
                if idle >= pong_timeout {
                    warn!(parent: &span, idle_secs = idle.as_secs(), "peer timed out");
                    session.close().await;
                    continue;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    session.close().await;
                    break;
                }
                trace!(parent: &span, "sent ping");
            }
        }
    }
}
