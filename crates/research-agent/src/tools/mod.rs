//! Tools the research agent can call.

mod web_search;

pub use web_search::{
    DEFAULT_MAX_RESULTS, SearchError, SearchInput, SearchResult,
    TAVILY_SEARCH_URL, WebSearchTool, format_observation,
};
