//! Broadcast of session state changes.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::IdentityId;

const EVENT_CAPACITY: usize = 256;

/// A change to a platform's identities or session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    IdentityAdded { id: IdentityId },
    IdentityUpdated { id: IdentityId },
    IdentityRemoved { id: IdentityId },
    LoggedIn {
        identity_id: Option<IdentityId>,
        claimed: bool,
    },
    LoggedOut,
    ProfileRefreshed { claimed: bool },
    AgentRuntimeChanged { enabled: bool },
}

impl SessionEvent {
    /// Event name, as used for SSE `event:` lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IdentityAdded { .. } => "identity_added",
            Self::IdentityUpdated { .. } => "identity_updated",
            Self::IdentityRemoved { .. } => "identity_removed",
            Self::LoggedIn { .. } => "logged_in",
            Self::LoggedOut => "logged_out",
            Self::ProfileRefreshed { .. } => "profile_refreshed",
            Self::AgentRuntimeChanged { .. } => "agent_runtime_changed",
        }
    }
}

/// Live fan-out of session events.
///
/// Events published while nobody listens are dropped.
pub struct EventHub {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    /// Create a new hub.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish an event to all live listeners.
    pub fn publish(&self, event: SessionEvent) {
        tracing::debug!(event = event.name(), "session event");
        let _ = self.sender.send(event);
    }

    /// Get a receiver for live events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Stream of live events. Lagged events are skipped.
    #[must_use]
    pub fn stream(&self) -> futures::stream::BoxStream<'static, SessionEvent> {
        BroadcastStream::new(self.subscribe())
            .filter_map(|res| async move { res.ok() })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_receives_published_events() {
        let hub = EventHub::new();
        let mut stream = hub.stream();

        hub.publish(SessionEvent::LoggedOut);
        hub.publish(SessionEvent::AgentRuntimeChanged { enabled: true });

        assert_eq!(stream.next().await, Some(SessionEvent::LoggedOut));
        assert_eq!(
            stream.next().await,
            Some(SessionEvent::AgentRuntimeChanged { enabled: true })
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::LoggedIn {
            identity_id: Some("abc".into()),
            claimed: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(json["identity_id"], "abc");
    }
}
