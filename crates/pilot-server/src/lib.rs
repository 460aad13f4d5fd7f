//! # pilot-server
//!
//! WebSocket transport and protocol dispatcher for the pilot signaling hub.
//!
//! - [`server`]: `PilotServer`, the axum router and listener
//! - [`websocket`]: per-connection loop and the [`WsSession`] transport
//! - [`dispatch`]: frame classification, request handlers, notification routing
//! - [`sweeper`]: optional periodic stale-MSU sweep
//! - [`metrics`]: Prometheus recorder and counters
//! - [`health`], [`config`]: server plumbing

#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod health;
pub mod metrics;
pub mod server;
pub mod sweeper;
pub mod websocket;

pub use config::ServerConfig;
pub use dispatch::{DispatchContext, Dispatcher, RequestHandler, RequestRegistry};
pub use server::{AppState, PilotServer};
pub use websocket::WsSession;
