use std::future::ready;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use research_agent_model::{ErrorKind, ModelMessage, ModelRequest};
use research_agent_test_model::{
    PresetFailure, PresetResponse, TestModelProvider,
};

use super::{EARLY_STOP_SUFFIX, FORCED_STOP_ANSWER, STOP_SEQUENCE};
use crate::tool::{Error as ToolError, Tool, ToolResult};
use crate::{AgentBuilder, AgentError, EarlyStopping, StopReason};

const SEARCH_ACTION: &str =
    "Thought: I should look this up.\nAction: search\nAction Input: \"rust 2024 edition\"";

#[derive(Clone, Default)]
struct SearchTool {
    calls: Arc<AtomicUsize>,
}

impl Tool for SearchTool {
    type Input = String;

    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Searches the web."
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ready(if input == "fail" {
            Err(ToolError::execution_error().with_reason("service unavailable"))
        } else {
            Ok(format!("Results for {input}"))
        })
    }
}

fn system_message(req: &ModelRequest) -> &str {
    match req.messages.first() {
        Some(ModelMessage::System(content)) => content,
        other => panic!("expected a system message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_direct_answer() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response(
        "Thought: I now know the final answer\nFinal Answer: Recursion is when a function calls itself.",
    );
    let search = SearchTool::default();

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(search.clone())
        .with_temperature(0.2)
        .build();
    assert_eq!(agent.tool_names(), ["search"]);
    assert_eq!(agent.max_iterations(), 30);
    let output = agent.run("What is recursion?").await.unwrap();

    assert_eq!(output.answer, "Recursion is when a function calls itself.");
    assert_eq!(output.stop_reason, StopReason::FinalAnswer);
    assert_eq!(output.iterations, 1);
    assert!(output.intermediate_steps.is_empty());
    assert!(!output.used_tool("search"));
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature, Some(0.2));
    assert_eq!(requests[0].stop, [STOP_SEQUENCE]);
    assert_eq!(
        requests[0].messages.last(),
        Some(&ModelMessage::User("What is recursion?".to_owned()))
    );
    assert!(system_message(&requests[0]).contains("search: Searches the web."));
}

#[tokio::test]
async fn test_search_then_answer() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response(SEARCH_ACTION);
    model_provider.add_text_response(
        "Thought: I now know the final answer\nFinal Answer: It shipped in Rust 1.85.",
    );
    let search = SearchTool::default();

    let steps = Arc::new(Mutex::new(Vec::new()));
    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(search.clone())
        .on_step({
            let steps = steps.clone();
            move |step| steps.lock().unwrap().push(step.tool.clone())
        })
        .build();
    let output = agent.run("When did the 2024 edition ship?").await.unwrap();

    assert_eq!(output.answer, "It shipped in Rust 1.85.");
    assert_eq!(output.iterations, 2);
    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert!(output.used_tool("search"));
    assert_eq!(*steps.lock().unwrap(), ["search"]);

    let step = &output.intermediate_steps[0];
    assert_eq!(step.thought, "I should look this up.");
    assert_eq!(step.tool_input, "rust 2024 edition");
    assert_eq!(step.observation, "Results for rust 2024 edition");

    let requests = model_provider.requests();
    assert!(!system_message(&requests[0]).contains("Observation: Results"));
    assert!(system_message(&requests[1]).ends_with(
        "Action Input: \"rust 2024 edition\"\nObservation: Results for rust 2024 edition\nThought: "
    ));
}

#[tokio::test]
async fn test_tool_failures_become_observations() {
    let mut model_provider = TestModelProvider::default();
    model_provider
        .add_text_response("Action: calculator\nAction Input: 1 + 1");
    model_provider.add_text_response("Action: search\nAction Input: fail");
    model_provider.add_text_response("Final Answer: I could not find out.");

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(SearchTool::default())
        .build();
    let output = agent.run("?").await.unwrap();

    let observations = output
        .intermediate_steps
        .iter()
        .map(|step| step.observation.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        observations,
        [
            "calculator is not a valid tool, try one of [search].",
            "Error: Execution error: service unavailable",
        ]
    );
    assert_eq!(output.answer, "I could not find out.");
}

#[tokio::test]
async fn test_parse_recovery() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("I think the answer is 42.");
    model_provider.add_text_response("Thought: right\nFinal Answer: 42");

    let agent =
        AgentBuilder::with_model_provider(model_provider.clone()).build();
    let output = agent.run("What is the answer?").await.unwrap();

    assert_eq!(output.answer, "42");
    assert_eq!(output.intermediate_steps.len(), 1);
    assert!(output.intermediate_steps[0].is_exception());
    assert!(system_message(&model_provider.requests()[1]).contains(
        "I think the answer is 42.\nObservation: Invalid Format: Missing 'Action:' after 'Thought:'"
    ));
}

#[tokio::test]
async fn test_parse_failures_reset_after_valid_output() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("no format");
    model_provider.add_text_response(SEARCH_ACTION);
    model_provider.add_text_response("still no format");
    model_provider.add_text_response("Final Answer: done");

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(SearchTool::default())
        .build();
    let output = agent.run("?").await.unwrap();
    assert_eq!(output.answer, "done");
    assert_eq!(output.intermediate_steps.len(), 3);
}

#[tokio::test]
async fn test_parse_failures_exhausted() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("no format");
    model_provider.add_text_response("Action: search");

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(SearchTool::default())
        .build();
    let err = agent.run("?").await.unwrap_err();

    let AgentError::OutputParse {
        notice,
        output,
        attempts,
    } = err
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(attempts, 2);
    assert_eq!(output, "Action: search");
    assert_eq!(notice, "Invalid Format: Missing 'Action Input:' after 'Action:'");
}

#[tokio::test]
async fn test_iteration_limit_generates_answer() {
    let mut model_provider = TestModelProvider::default();
    for _ in 0..30 {
        model_provider.add_text_response(SEARCH_ACTION);
    }
    model_provider
        .add_text_response("Thought: enough\nFinal Answer: best effort answer");
    let search = SearchTool::default();

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(search.clone())
        .build();
    let output = agent.run("?").await.unwrap();

    assert_eq!(output.stop_reason, StopReason::IterationLimit);
    assert_eq!(output.answer, "best effort answer");
    assert_eq!(output.iterations, 30);
    assert_eq!(output.intermediate_steps.len(), 30);
    assert_eq!(search.calls.load(Ordering::SeqCst), 30);

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 31);
    let last = system_message(&requests[30]);
    assert!(last.ends_with(&format!("Thought: {EARLY_STOP_SUFFIX}")));
}

#[tokio::test]
async fn test_iteration_limit_uses_raw_output() {
    let mut model_provider = TestModelProvider::default();
    model_provider.set_repeated_response(PresetResponse::with_text(SEARCH_ACTION));

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(SearchTool::default())
        .with_max_iterations(3)
        .build();
    let output = agent.run("?").await.unwrap();

    assert_eq!(output.stop_reason, StopReason::IterationLimit);
    assert_eq!(output.answer, SEARCH_ACTION);
    assert_eq!(model_provider.request_count(), 4);
}

#[tokio::test]
async fn test_iteration_limit_forced() {
    let mut model_provider = TestModelProvider::default();
    model_provider.set_repeated_response(PresetResponse::with_text(SEARCH_ACTION));

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(SearchTool::default())
        .with_max_iterations(2)
        .with_early_stopping(EarlyStopping::Force)
        .build();
    let output = agent.run("?").await.unwrap();

    assert_eq!(output.answer, FORCED_STOP_ANSWER);
    assert_eq!(output.stop_reason, StopReason::IterationLimit);
    assert_eq!(model_provider.request_count(), 2);
}

#[tokio::test]
async fn test_model_error() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response(SEARCH_ACTION);
    model_provider
        .add_response(PresetResponse::with_failure(PresetFailure::Unavailable));

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(SearchTool::default())
        .build();
    let err = agent.run("?").await.unwrap_err();

    assert!(err.is_upstream());
    assert!(matches!(
        err,
        AgentError::Model {
            kind: ErrorKind::Unavailable,
            ..
        }
    ));
}
