//! State shared by every request and notification handler.

use std::sync::Arc;

use pilot_msu::MsuManager;
use pilot_room::RoomManager;
use tracing::Span;

/// Coordination state and the logging span handlers emit under.
#[derive(Clone)]
pub struct DispatchContext {
    /// Room and user state.
    pub rooms: Arc<RoomManager>,
    /// MSU registry and room assignment.
    pub msus: Arc<MsuManager>,
    /// Parent span for handler events.
    pub span: Span,
}

impl DispatchContext {
    /// Bundle the managers with a span.
    pub fn new(rooms: Arc<RoomManager>, msus: Arc<MsuManager>, span: Span) -> Self {
        Self { rooms, msus, span }
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new(
            Arc::new(RoomManager::default()),
            Arc::new(MsuManager::default()),
            Span::none(),
        )
    }
}
