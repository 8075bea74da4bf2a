//! Chat transcript types.

use std::fmt::{self, Display};

/// Who authored a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person asking questions.
    User,
    /// The research assistant.
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A turn in the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Returns the author of this turn.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the Markdown content of this turn.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// An append-only, ordered list of chat turns.
#[derive(Clone, Default, Debug)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates a transcript that opens with an assistant greeting.
    #[inline]
    pub fn with_greeting<S: Into<String>>(greeting: S) -> Self {
        let mut transcript = Self::default();
        transcript.push(Role::Assistant, greeting);
        transcript
    }

    /// Appends a turn.
    #[inline]
    pub fn push<S: Into<String>>(&mut self, role: Role, content: S) {
        self.turns.push(Turn {
            role,
            content: content.into(),
        });
    }

    /// Returns all turns in order.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if there are no turns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
