//! Parsing model output written in the ReAct grammar.
//!
//! The model is expected to answer with either
//!
//! ```text
//! Thought: <reasoning>
//! Action: <tool name>
//! Action Input: <input>
//! ```
//!
//! or
//!
//! ```text
//! Thought: I now know the final answer
//! Final Answer: <markdown>
//! ```
//!
//! `Action: Final Answer` followed by an `Action Input:` is accepted as a
//! final answer as well.

use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;

/// Marker that introduces the final answer.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

const FINAL_ANSWER_ACTION: &str = "Final Answer";
const OBSERVATION_MARKER: &str = "\nObservation:";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)",
    )
    .expect("valid regex")
});
static ACTION_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action\s*\d*\s*:").expect("valid regex"));
static ACTION_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Action\s*\d*\s*Input\s*\d*\s*:").expect("valid regex")
});

/// A tool call requested by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Reasoning preceding the action.
    pub thought: String,
    /// Name of the requested tool.
    pub tool: String,
    /// Input for the tool, with surrounding spaces and quotes removed.
    pub tool_input: String,
    /// The full model output.
    pub log: String,
}

/// The model's final answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalAnswer {
    /// Reasoning preceding the answer.
    pub thought: String,
    /// The answer text.
    pub answer: String,
    /// The full model output.
    pub log: String,
}

/// What the model decided to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedOutput {
    /// Call a tool and observe the result.
    Action(ToolInvocation),
    /// Stop and answer.
    Finish(FinalAnswer),
}

/// Why an output could not be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// There is no `Action:` line.
    MissingAction,
    /// There is an `Action:` line but no `Action Input:` after it.
    MissingActionInput,
    /// The output contains both an action and a final answer.
    ActionAndFinalAnswer,
    /// Anything else.
    Unrecognized,
}

/// An output that does not follow the ReAct grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputParseError {
    kind: ParseErrorKind,
    output: String,
}

impl OutputParseError {
    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Returns the notice that is fed back to the model as an observation.
    pub fn notice(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::MissingAction => {
                "Invalid Format: Missing 'Action:' after 'Thought:'"
            }
            ParseErrorKind::MissingActionInput => {
                "Invalid Format: Missing 'Action Input:' after 'Action:'"
            }
            ParseErrorKind::ActionAndFinalAnswer => {
                "Invalid Format: Produced both a final answer and an action. Either call one tool, or give the Final Answer"
            }
            ParseErrorKind::Unrecognized => "Could not parse LLM output",
        }
    }

    /// Returns the raw output that failed to parse.
    #[inline]
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Display for OutputParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: `{}`", self.notice(), self.output)
    }
}

impl std::error::Error for OutputParseError {}

/// Parses one model output.
pub fn parse(output: &str) -> Result<ParsedOutput, OutputParseError> {
    let includes_answer = output.contains(FINAL_ANSWER_MARKER);

    if let Some(caps) = ACTION_RE.captures(output) {
        let (Some(whole), Some(action), Some(input)) =
            (caps.get(0), caps.get(1), caps.get(2))
        else {
            return Err(error(ParseErrorKind::Unrecognized, output));
        };
        let thought = extract_thought(&output[..whole.start()]);
        let tool = action.as_str().trim();
        let tool_input = clean_input(input.as_str());

        if tool.eq_ignore_ascii_case(FINAL_ANSWER_ACTION) {
            return Ok(ParsedOutput::Finish(FinalAnswer {
                thought,
                answer: tool_input,
                log: output.to_owned(),
            }));
        }
        if includes_answer {
            return Err(error(ParseErrorKind::ActionAndFinalAnswer, output));
        }
        return Ok(ParsedOutput::Action(ToolInvocation {
            thought,
            tool: tool.to_owned(),
            tool_input,
            log: output.to_owned(),
        }));
    }

    if let Some(idx) = output.rfind(FINAL_ANSWER_MARKER) {
        let thought = extract_thought(&output[..idx]);
        let answer = output[idx + FINAL_ANSWER_MARKER.len()..].trim();
        return Ok(ParsedOutput::Finish(FinalAnswer {
            thought,
            answer: answer.to_owned(),
            log: output.to_owned(),
        }));
    }

    let kind = if !ACTION_ONLY_RE.is_match(output) {
        ParseErrorKind::MissingAction
    } else if !ACTION_INPUT_RE.is_match(output) {
        ParseErrorKind::MissingActionInput
    } else {
        ParseErrorKind::Unrecognized
    };
    Err(error(kind, output))
}

#[inline]
fn error(kind: ParseErrorKind, output: &str) -> OutputParseError {
    OutputParseError {
        kind,
        output: output.to_owned(),
    }
}

fn extract_thought(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix("Thought:")
        .unwrap_or(text)
        .trim()
        .to_owned()
}

fn clean_input(input: &str) -> String {
    // Providers without stop-sequence support may run on into an invented
    // observation.
    let input = match input.find(OBSERVATION_MARKER) {
        Some(idx) => &input[..idx],
        None => input,
    };
    input.trim().trim_matches('"').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(output: &str) -> ToolInvocation {
        match parse(output).unwrap() {
            ParsedOutput::Action(invocation) => invocation,
            other => panic!("expected an action, got {other:?}"),
        }
    }

    fn finish(output: &str) -> FinalAnswer {
        match parse(output).unwrap() {
            ParsedOutput::Finish(answer) => answer,
            other => panic!("expected a final answer, got {other:?}"),
        }
    }

    #[test]
    fn test_action() {
        let output = "Thought: I need today's forecast.\nAction: tavily_search_results_json\nAction Input: \"weather in Paris today\"";
        let invocation = action(output);
        assert_eq!(invocation.thought, "I need today's forecast.");
        assert_eq!(invocation.tool, "tavily_search_results_json");
        assert_eq!(invocation.tool_input, "weather in Paris today");
        assert_eq!(invocation.log, output);
    }

    #[test]
    fn test_action_with_json_input_and_invented_observation() {
        let output = "Action: search\nAction Input: {\"query\": \"tsla\"}\nObservation: made up";
        let invocation = action(output);
        assert_eq!(invocation.thought, "");
        assert_eq!(invocation.tool_input, "{\"query\": \"tsla\"}");
    }

    #[test]
    fn test_final_answer() {
        let answer = finish(
            "Thought: I now know the final answer\nFinal Answer: **Recursion** is when a function calls itself.\n\n- base case\n",
        );
        assert_eq!(answer.thought, "I now know the final answer");
        assert_eq!(
            answer.answer,
            "**Recursion** is when a function calls itself.\n\n- base case"
        );
    }

    #[test]
    fn test_final_answer_as_action() {
        let answer =
            finish("Thought: done\nAction: Final Answer\nAction Input: 42");
        assert_eq!(answer.answer, "42");
        assert_eq!(answer.thought, "done");
    }

    #[test]
    fn test_errors() {
        let err = parse("I think the answer is 42.").unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::MissingAction);
        assert_eq!(
            err.notice(),
            "Invalid Format: Missing 'Action:' after 'Thought:'"
        );
        assert_eq!(err.output(), "I think the answer is 42.");

        let err = parse("Thought: search\nAction: search").unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::MissingActionInput);

        let err = parse(
            "Action: search\nAction Input: x\nFinal Answer: y",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::ActionAndFinalAnswer);

        let err = parse("").unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::MissingAction);
    }
}
