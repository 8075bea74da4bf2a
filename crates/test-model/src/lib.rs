//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use research_agent_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            let Some(event) = this.events.get(this.event_idx) else {
                // In case this method is called after completion.
                return Poll::Ready(Ok(None));
            };
            this.event_idx += 1;
            let event = match event {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::Completed(reason) => {
                    ModelResponseEvent::Completed(*reason)
                }
            };
            return Poll::Ready(Ok(Some(event)));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    repeated: Option<PresetResponse>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request. Requests consume the queued
/// responses in order; once the queue is drained, the repeated response is
/// used if there is one, otherwise an error is returned.
///
/// Clones share the same script, so a test can keep a clone around to
/// inspect the requests the agent has sent.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Queues a response for the next unanswered request.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.lock().responses.push_back(preset);
    }

    /// Queues a plain text response.
    #[inline]
    pub fn add_text_response(&mut self, text: &str) {
        self.add_response(PresetResponse::with_text(text));
    }

    /// Sets a response used for every request after the queue is drained.
    #[inline]
    pub fn set_repeated_response(&mut self, preset: PresetResponse) {
        self.lock().repeated = Some(preset);
    }

    /// Sets the pause before each event, 1ms by default.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let mut script = self.lock();
        script.requests.push(req.clone());

        let preset = script
            .responses
            .pop_front()
            .or_else(|| script.repeated.clone());
        let result = match preset {
            None => Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            }),
            Some(PresetResponse {
                failure: Some(failure),
                ..
            }) => Err(match failure {
                PresetFailure::RateLimitExceeded => Error {
                    message: "preset failure",
                    kind: ErrorKind::RateLimitExceeded,
                },
                PresetFailure::Unavailable => Error {
                    message: "preset failure",
                    kind: ErrorKind::Unavailable,
                },
            }),
            Some(preset) => Ok(TestModelResponse {
                events: preset.events,
                event_idx: 0,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
            }),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use research_agent_model::{ModelFinishReason, ModelMessage};

    use super::*;

    async fn collect_response(resp: TestModelResponse) -> String {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            match event {
                ModelResponseEvent::Completed(reason) => {
                    assert_eq!(reason, ModelFinishReason::Stop);
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
            }
        }
        msg
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response("Hello, world!");
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Sure, ".to_owned()),
            PresetEvent::MessageDelta("let me take a look.".to_owned()),
            PresetEvent::Completed(ModelFinishReason::Stop),
        ]));

        let req =
            ModelRequest::with_messages([ModelMessage::User("Hi".to_owned())]);
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await, "Hello, world!");

        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await, "Sure, let me take a look.");

        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_repeated_and_failures() {
        let mut provider = TestModelProvider::default();
        provider
            .add_response(PresetResponse::with_failure(PresetFailure::Unavailable));
        provider.set_repeated_response(PresetResponse::with_text("again"));

        let observer = provider.clone();
        let req = ModelRequest::default();
        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        for _ in 0..3 {
            let resp = provider.send_request(&req).await.unwrap();
            assert_eq!(collect_response(resp).await, "again");
        }
        assert_eq!(observer.request_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response("slow");
        provider.set_delay(Duration::from_millis(200));

        let started = tokio::time::Instant::now();
        let resp = provider.send_request(&ModelRequest::default()).await.unwrap();
        assert_eq!(collect_response(resp).await, "slow");
        // One delta and the completion, each preceded by the delay.
        assert!(started.elapsed() >= Duration::from_millis(400));
    }
}
