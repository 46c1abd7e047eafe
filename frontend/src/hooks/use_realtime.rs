//! Server-pushed changes arrive on topics shaped like
//! `{resource}.{action}.branch.{branch_id}`. A `RealtimeSync` listens for
//! its resource on one branch and folds each change into the cache.
//! Delivery order and duplicates are the publisher's business; the reducer
//! tolerates both.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Entity;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hooks::reducer::ResourceChange;
use crate::hooks::use_resource::DataLayer;
use crate::services::error::ApiError;

const DEFAULT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Create,
    Update,
    Delete,
}

impl EventAction {
    pub const ALL: [EventAction; 3] = [EventAction::Create, EventAction::Update, EventAction::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Create => "create",
            EventAction::Update => "update",
            EventAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    #[error("topic '{0}' is not of the form resource.action.branch.id")]
    Malformed(String),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

impl FromStr for EventAction {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(EventAction::Create),
            "update" => Ok(EventAction::Update),
            "delete" => Ok(EventAction::Delete),
            other => Err(TopicError::UnknownAction(other.to_string())),
        }
    }
}

/// A named event channel scoped to one branch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    pub resource: String,
    pub action: EventAction,
    pub branch_id: String,
}

impl Topic {
    pub fn new(resource: impl Into<String>, action: EventAction, branch_id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action,
            branch_id: branch_id.into(),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.branch.{}",
            self.resource,
            self.action.as_str(),
            self.branch_id
        )
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TopicError::Malformed(s.to_string());
        let mut parts = s.rsplitn(4, '.');
        let branch_id = parts.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
        let scope = parts.next().ok_or_else(malformed)?;
        let action = parts.next().ok_or_else(malformed)?;
        let resource = parts.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
        if scope != "branch" {
            return Err(malformed());
        }
        Ok(Topic {
            resource: resource.to_string(),
            action: action.parse()?,
            branch_id: branch_id.to_string(),
        })
    }
}

/// One pushed event as delivered by the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub payload: Value,
}

/// Turn an event payload into a change. Deletes may carry the whole
/// record, `{"id": ...}`, or the bare id string.
pub fn decode_change<T: DeserializeOwned>(
    action: EventAction,
    payload: Value,
) -> Result<ResourceChange<T>, ApiError> {
    match action {
        EventAction::Create => Ok(ResourceChange::Created(serde_json::from_value(payload)?)),
        EventAction::Update => Ok(ResourceChange::Updated(serde_json::from_value(payload)?)),
        EventAction::Delete => {
            let id = match &payload {
                Value::String(id) => Some(id.clone()),
                Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
                _ => None,
            };
            id.map(ResourceChange::Deleted)
                .ok_or_else(|| ApiError::Decode("delete event without an id".to_string()))
        }
    }
}

/// In-process fan-out of pushed events. The socket adapter publishes here;
/// every `RealtimeSync` subscribes.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RealtimeMessage>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns how many subscribers received the message
    pub fn publish(&self, topic: &Topic, payload: Value) -> usize {
        let message = RealtimeMessage {
            topic: topic.to_string(),
            payload,
        };
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.sender.subscribe()
    }
}

/// Keeps one resource's cache in step with pushed events for one branch
pub struct RealtimeSync<T, TRequest> {
    layer: DataLayer<T, TRequest>,
    branch_id: String,
}

impl<T, TRequest> RealtimeSync<T, TRequest>
where
    T: Entity + DeserializeOwned + Clone + Send + Sync + 'static,
    TRequest: Serialize + Send + 'static,
{
    pub fn new(layer: DataLayer<T, TRequest>, branch_id: impl Into<String>) -> Self {
        Self {
            layer,
            branch_id: branch_id.into(),
        }
    }

    /// Topics this sync listens on
    pub fn topics(&self) -> Vec<Topic> {
        EventAction::ALL
            .iter()
            .map(|action| Topic::new(self.layer.resource(), *action, self.branch_id.as_str()))
            .collect()
    }

    /// Apply one message. Returns `Ok(false)` for messages meant for other
    /// resources or branches.
    pub fn handle(&self, message: &RealtimeMessage) -> Result<bool, ApiError> {
        let topic: Topic = match message.topic.parse() {
            Ok(topic) => topic,
            Err(e) => {
                debug!(topic = %message.topic, error = %e, "ignoring unparseable topic");
                return Ok(false);
            }
        };
        if topic.resource != self.layer.resource() || topic.branch_id != self.branch_id {
            return Ok(false);
        }

        let change = decode_change::<T>(topic.action, message.payload.clone())?;
        let touched = self.layer.apply_change(&change);
        self.layer.invalidate();
        debug!(topic = %topic, id = change.id(), touched, "applied pushed change");
        Ok(true)
    }

    /// Consume messages until the bus closes
    pub async fn run(self, mut receiver: broadcast::Receiver<RealtimeMessage>) {
        info!(resource = %self.layer.resource(), branch_id = %self.branch_id, "realtime sync started");
        loop {
            match receiver.recv().await {
                Ok(message) => {
                    if let Err(e) = self.handle(&message) {
                        warn!(topic = %message.topic, error = %e, "dropping malformed event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // missed events cannot be replayed, refetch instead
                    warn!(skipped, resource = %self.layer.resource(), "realtime sync lagged");
                    self.layer.invalidate();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!(resource = %self.layer.resource(), "realtime sync stopped");
    }

    pub fn spawn(self, bus: &EventBus) -> JoinHandle<()> {
        let receiver = bus.subscribe();
        tokio::spawn(self.run(receiver))
    }
}
