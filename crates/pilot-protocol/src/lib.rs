//! # pilot-protocol
//!
//! The request/response/notification wire protocol spoken between the hub
//! and its peers (end-user clients and media server units).
//!
//! - [`message`]: the three frame shapes and [`classify`] for inbound text
//! - [`session`]: the [`Session`] capability every transport implements
//! - [`errors`]: protocol, session and dispatch error types plus wire codes
//! - [`lenient`]: serde helpers for best-effort peer-supplied fields
//!
//! With the `test-utils` feature, [`testing::RecordingSession`] records every
//! frame sent to it so room and dispatcher logic can be exercised without a
//! socket.

#![deny(unsafe_code)]

pub mod errors;
pub mod lenient;
pub mod message;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use errors::{DispatchError, ProtocolError, SessionError};
pub use message::{Inbound, Notification, Request, Response, classify};
pub use session::{Session, SharedSession, same_session};
