use std::fmt::{self, Debug};
use std::sync::Arc;

use reqwest::{Client, StatusCode, header};
use research_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// The Tavily search endpoint.
pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Number of results returned by a search unless configured otherwise.
pub const DEFAULT_MAX_RESULTS: usize = 3;

const SEARCH_DEPTH: &str = "basic";
const NO_RESULTS: &str = "No results found";

/// Errors of a single search call.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query was empty.
    #[error("search query is empty")]
    EmptyQuery,
    /// The request could not be sent or the body could not be read.
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("search service returned {status}: {body}")]
    Status {
        /// HTTP status of the response.
        status: StatusCode,
        /// Response body, trimmed.
        body: String,
    },
    /// The response body is not a search response.
    #[error("unexpected search response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A single ranked search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Relevant page content.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// Relevance score, higher is better.
    #[serde(default, skip_serializing)]
    pub score: Option<f64>,
}

/// Input of [`WebSearchTool`].
///
/// The model may write either the bare query or a JSON object with a
/// `query` field after `Action Input:`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SearchInput {
    /// A bare query.
    Query(String),
    /// `{"query": "..."}`.
    Object {
        /// The query.
        query: String,
    },
}

impl SearchInput {
    /// Returns the query text.
    #[inline]
    pub fn query(&self) -> &str {
        match self {
            SearchInput::Query(query) | SearchInput::Object { query } => query,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// A web search tool backed by the Tavily API.
#[derive(Clone)]
pub struct WebSearchTool {
    client: Client,
    api_key: Arc<str>,
    endpoint: Arc<str>,
    max_results: usize,
}

impl WebSearchTool {
    /// Creates a search tool with the given API key.
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: TAVILY_SEARCH_URL.into(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Sets how many results a search returns.
    #[inline]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Sends requests to a different endpoint.
    #[inline]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Runs a search and returns at most `max_results` results, best first.
    pub fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchResult>, SearchError>>
    + Send
    + 'static
    + use<> {
        let query = query.trim();
        let max_results = self.max_results;
        let resp_fut = (!query.is_empty()).then(|| {
            self.client
                .post(&*self.endpoint)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
                .json(&SearchRequest {
                    query,
                    max_results,
                    search_depth: SEARCH_DEPTH,
                })
                .send()
        });

        async move {
            let Some(resp_fut) = resp_fut else {
                return Err(SearchError::EmptyQuery);
            };
            let resp = resp_fut.await?;

            let status = resp.status();
            let body = resp.text().await?;
            if !status.is_success() {
                debug!("search failed with {status}: {body}");
                return Err(SearchError::Status {
                    status,
                    body: body.trim().to_owned(),
                });
            }

            let mut results = parse_results(&body)?;
            results.truncate(max_results);
            Ok(results)
        }
    }
}

impl Debug for WebSearchTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSearchTool")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl Tool for WebSearchTool {
    type Input = SearchInput;

    fn name(&self) -> &str {
        "tavily_search_results_json"
    }

    fn description(&self) -> &str {
        "A search engine optimized for comprehensive, accurate, and trusted results. \
Useful for when you need to answer questions about current events. \
Input should be a search query."
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search = self.search(input.query());
        async move {
            match search.await {
                Ok(results) => Ok(format_observation(&results)),
                Err(SearchError::EmptyQuery) => Err(ToolError::invalid_input()
                    .with_reason("the search query is empty")),
                Err(err) => {
                    warn!("search failed: {err}");
                    Err(ToolError::execution_error().with_reason(err.to_string()))
                }
            }
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn parse_results(body: &str) -> Result<Vec<SearchResult>, serde_json::Error> {
    let resp: SearchResponse = serde_json::from_str(body)?;
    Ok(resp.results)
}

/// Renders results as the JSON observation the model sees, keeping the
/// source URL next to each snippet.
pub fn format_observation(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_owned();
    }
    serde_json::to_string(results).unwrap_or_else(|err| {
        error!("failed to encode search results: {err}");
        NO_RESULTS.to_owned()
    })
}
