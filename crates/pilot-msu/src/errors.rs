//! MSU error types.

use pilot_protocol::SessionError;
use thiserror::Error;

/// Errors surfaced by [`MsuManager`](crate::MsuManager).
#[derive(Debug, Error)]
pub enum MsuError {
    /// The assigned MSU could not be notified.
    #[error("failed to notify msu {msu_id}: {source}")]
    Notify {
        /// MSU that was being notified.
        msu_id: String,
        /// Underlying send failure.
        #[source]
        source: SessionError,
    },
}
