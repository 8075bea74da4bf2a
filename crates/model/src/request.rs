/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
    /// Sampling temperature. `None` leaves it to the provider's default.
    pub temperature: Option<f32>,
    /// Sequences where the model should stop generating further text.
    ///
    /// The matched sequence is not included in the output.
    pub stop: Vec<String>,
}

impl ModelRequest {
    /// Creates a request with the given messages and no sampling options.
    #[inline]
    pub fn with_messages(messages: impl Into<Vec<ModelMessage>>) -> Self {
        Self {
            messages: messages.into(),
            ..Default::default()
        }
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the text content of the message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            ModelMessage::System(text)
            | ModelMessage::User(text)
            | ModelMessage::Assistant(text) => text,
        }
    }
}
