//! # pilot-room
//!
//! In-memory room membership for the signaling hub.
//!
//! A [`RoomManager`] owns rooms by ID and creates them on first reference.
//! Each [`Room`] tracks its [`User`]s, the [`PushInfo`] streams they publish,
//! and the sessions that receive room broadcasts.

#![deny(unsafe_code)]

pub mod manager;
pub mod push;
pub mod room;
pub mod user;

pub use manager::RoomManager;
pub use push::{PushInfo, RtpParam};
pub use room::{JoinResult, MemberInfo, Room};
pub use user::User;
