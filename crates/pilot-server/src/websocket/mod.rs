//! WebSocket transport: the session implementation and the connection loop.

pub mod connection;
pub mod session;

pub use connection::run_connection;
pub use session::WsSession;
