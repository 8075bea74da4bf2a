//! Tool call supports.

mod error;
mod executor;

use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The model writes the tool input as free text after `Action Input:`. If the
/// text is valid JSON it is deserialized into [`Tool::Input`] as-is, otherwise
/// it is deserialized from a JSON string holding the raw text. A tool taking a
/// plain query can therefore use `String` as its input type.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool, as the model should write it after
    /// `Action:`.
    fn name(&self) -> &str;

    /// Returns the description of the tool shown to the model.
    fn description(&self) -> &str;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

/// Name and description of a registered tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolDescription {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
}

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn execute(
        &self,
        raw_input: &str,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct AnyTool<T: Tool>(pub T);

impl<T: Tool> ToolObject for AnyTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn execute(
        &self,
        raw_input: &str,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        let input: T::Input = match decode_input(raw_input) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(std::future::ready(ToolResult::Err(
                    Error::invalid_input().with_reason(reason),
                )));
            }
        };
        Box::pin(self.0.execute(input))
    }
}

fn decode_input<I: DeserializeOwned>(
    raw_input: &str,
) -> Result<I, serde_json::Error> {
    if let Ok(value) = serde_json::from_str::<Value>(raw_input) {
        if let Ok(input) = serde_json::from_value(value) {
            return Ok(input);
        }
    }
    serde_json::from_value(Value::String(raw_input.to_owned()))
}
