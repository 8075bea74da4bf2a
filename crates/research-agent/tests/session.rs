use std::future::ready;

use research_agent::core::conversation::Role;
use research_agent::core::tool::{Tool, ToolResult};
use research_agent::{CredentialStatus, GREETING, SessionBuilder};
use research_agent_model::ModelFinishReason;
use research_agent_test_model::{
    PresetEvent, PresetFailure, PresetResponse, TestModelProvider,
};
struct FakeSearch;

impl Tool for FakeSearch {
    type Input = String;

    fn name(&self) -> &str {
        "tavily_search_results_json"
    }

    fn description(&self) -> &str {
        "Searches the web."
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(format!(
            r#"[{{"title":"TSLA","url":"https://finance.example/tsla","content":"{input}: $250"}}]"#
        )))
    }
}

#[tokio::test]
async fn test_transcript_grows_by_two_per_query() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response(
        "Thought: I need current data.\nAction: tavily_search_results_json\nAction Input: TSLA price today",
    );
    model_provider.add_text_response(
        "Thought: I now know the final answer\nFinal Answer: TSLA trades at **$250** ([source](https://finance.example/tsla)).",
    );
    model_provider.add_text_response("Final Answer: Recursion is self-reference.");

    let mut session = SessionBuilder::with_model_provider(model_provider.clone())
        .with_tool(FakeSearch)
        .build();
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.transcript().turns()[0].content(), GREETING);
    assert!(session.health().is_ready());

    let answer = session
        .submit("What is the latest news regarding TSLA today?")
        .await;
    assert!(answer.contains("$250"));

    let answer = session.submit("What is recursion?").await;
    assert_eq!(answer, "Recursion is self-reference.");

    let turns = session.transcript().turns();
    assert_eq!(turns.len(), 5);
    let roles = turns.iter().map(|t| t.role()).collect::<Vec<_>>();
    assert_eq!(
        roles,
        [
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant
        ]
    );
    assert_eq!(turns[3].content(), "What is recursion?");
    assert_eq!(turns[4].content(), answer);
    assert_eq!(model_provider.request_count(), 3);

    // The search observation reaches the second model call.
    let second = &model_provider.requests()[1];
    assert!(second.messages[0].content().contains("TSLA price today: $250"));
}

#[tokio::test]
async fn test_errors_become_answers() {
    let mut model_provider = TestModelProvider::default();
    model_provider
        .add_response(PresetResponse::with_failure(PresetFailure::RateLimitExceeded));
    model_provider.add_text_response("gibberish");
    model_provider.add_text_response("more gibberish");

    let mut session =
        SessionBuilder::with_model_provider(model_provider).build();

    let answer = session.submit("first").await;
    assert!(
        answer.starts_with("An error occurred during agent execution: model request failed"),
        "{answer}"
    );

    let answer = session.submit("second").await;
    assert!(answer.starts_with("An error occurred during agent execution:"));
    assert!(answer.contains("Missing 'Action:' after 'Thought:'"));

    assert_eq!(session.transcript().len(), 5);
    assert!(
        session
            .transcript()
            .turns()
            .iter()
            .all(|turn| !turn.content().is_empty())
    );
}

#[tokio::test]
async fn test_empty_answer_fallback() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("Final Answer:   ".to_owned()),
        PresetEvent::Completed(ModelFinishReason::Stop),
    ]));

    let mut session =
        SessionBuilder::with_model_provider(model_provider).build();
    let answer = session.submit("anything").await;
    assert_eq!(answer, "Agent did not return a structured output.");
    assert_eq!(session.transcript().turns()[2].content(), answer);
}

#[test]
fn test_health_override() {
    let session = SessionBuilder::with_model_provider(TestModelProvider::default())
        .with_health(CredentialStatus {
            model_api_key: true,
            search_api_key: false,
        })
        .build();
    assert_eq!(session.health().label(), "API keys missing");
}
