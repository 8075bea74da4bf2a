use research_agent_model::ModelFinishReason;
use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "completed")]
    Completed(ModelFinishReason),
}

/// The preset response for one model request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request fails instead of producing the events.
    #[serde(default)]
    pub failure: Option<PresetFailure>,
}

/// How a preset request should fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetFailure {
    /// The request is rate limited.
    RateLimitExceeded,
    /// The service is unavailable.
    Unavailable,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failure: None,
        }
    }

    /// Creates a response that streams `text` in a few deltas and then
    /// completes normally.
    pub fn with_text(text: &str) -> Self {
        let mut events: Vec<PresetEvent> = text
            .split_inclusive('\n')
            .map(|line| PresetEvent::MessageDelta(line.to_owned()))
            .collect();
        events.push(PresetEvent::Completed(ModelFinishReason::Stop));
        Self::with_events(events)
    }

    /// Creates a response that fails with the given reason.
    #[inline]
    pub fn with_failure(failure: PresetFailure) -> Self {
        Self {
            events: vec![],
            failure: Some(failure),
        }
    }
}
