//! # pilot-msu
//!
//! Registry of media server units (MSUs).
//!
//! MSUs register over their own session, are kept alive by re-registering,
//! and are swept out once stale. The first non-audience join of a room binds
//! it to one MSU for the rest of the process lifetime.

#![deny(unsafe_code)]

pub mod errors;
pub mod manager;
pub mod msu;

pub use errors::MsuError;
pub use manager::MsuManager;
pub use msu::{Msu, now_ms};
