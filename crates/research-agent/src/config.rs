//! Validated start-up configuration.

use std::fmt::{self, Debug};

use research_agent_core::DEFAULT_MAX_ITERATIONS;
use research_agent_openai_model::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAIConfig, OpenAIConfigBuilder,
};
use thiserror::Error;

use crate::tools::{DEFAULT_MAX_RESULTS, WebSearchTool};

/// Environment variable holding the model API key.
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Environment variable holding the search API key.
pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";

/// Sampling temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

const MAX_TEMPERATURE: f32 = 2.0;
const MAX_SEARCH_RESULTS: usize = 20;

/// Errors found while validating the configuration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A required API key is missing or blank.
    #[error("{0} is not set")]
    MissingCredential(&'static str),
    /// The temperature is outside `0.0..=2.0`.
    #[error("temperature must be between 0.0 and 2.0, got {0}")]
    InvalidTemperature(f32),
    /// The iteration limit is zero.
    #[error("max iterations must be at least 1")]
    InvalidMaxIterations,
    /// The number of search results is outside `1..=20`.
    #[error("max results must be between 1 and 20, got {0}")]
    InvalidMaxResults(usize),
}

/// Which credentials are present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CredentialStatus {
    /// Whether the model API key is set.
    pub model_api_key: bool,
    /// Whether the search API key is set.
    pub search_api_key: bool,
}

impl CredentialStatus {
    /// A status with every credential present.
    pub const READY: Self = Self {
        model_api_key: true,
        search_api_key: true,
    };

    /// Returns `true` if every credential is present.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.model_api_key && self.search_api_key
    }

    /// Returns the short text shown in the health indicator.
    #[inline]
    pub fn label(&self) -> &'static str {
        if self.is_ready() {
            "Agent dependencies loaded"
        } else {
            "API keys missing"
        }
    }

    /// Returns the environment variables of the missing credentials.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if !self.model_api_key {
            missing.push(GOOGLE_API_KEY);
        }
        if !self.search_api_key {
            missing.push(TAVILY_API_KEY);
        }
        missing
    }
}

/// Builder for [`ResearchConfig`].
///
/// Every setting is optional here, validation happens in
/// [`ResearchConfigBuilder::build`].
#[derive(Clone, Default)]
pub struct ResearchConfigBuilder {
    google_api_key: Option<String>,
    tavily_api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    max_iterations: Option<usize>,
    max_results: Option<usize>,
}

impl ResearchConfigBuilder {
    /// Sets the model API key.
    #[inline]
    pub fn with_google_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    /// Sets the search API key.
    #[inline]
    pub fn with_tavily_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.tavily_api_key = Some(key.into());
        self
    }

    /// Sets the model identifier.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the model API base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the iteration limit of the agent.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Sets how many results a search returns.
    #[inline]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Reports which credentials are present, without validating anything
    /// else.
    pub fn credential_status(&self) -> CredentialStatus {
        CredentialStatus {
            model_api_key: non_blank(&self.google_api_key).is_some(),
            search_api_key: non_blank(&self.tavily_api_key).is_some(),
        }
    }

    /// Validates the settings.
    pub fn build(self) -> Result<ResearchConfig, ConfigError> {
        let google_api_key = non_blank(&self.google_api_key)
            .ok_or(ConfigError::MissingCredential(GOOGLE_API_KEY))?
            .to_owned();
        let tavily_api_key = non_blank(&self.tavily_api_key)
            .ok_or(ConfigError::MissingCredential(TAVILY_API_KEY))?
            .to_owned();

        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }
        let max_iterations =
            self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations);
        }
        let max_results = self.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if !(1..=MAX_SEARCH_RESULTS).contains(&max_results) {
            return Err(ConfigError::InvalidMaxResults(max_results));
        }

        Ok(ResearchConfig {
            google_api_key,
            tavily_api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            temperature,
            max_iterations,
            max_results,
        })
    }
}

impl Debug for ResearchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchConfigBuilder")
            .field("credentials", &self.credential_status())
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_iterations", &self.max_iterations)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// A validated configuration with both credentials present.
#[derive(Clone)]
pub struct ResearchConfig {
    google_api_key: String,
    tavily_api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_iterations: usize,
    max_results: usize,
}

impl ResearchConfig {
    /// Returns the model identifier.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the model API base URL.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the sampling temperature.
    #[inline]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Returns the iteration limit of the agent.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns how many results a search returns.
    #[inline]
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Creates the model provider configuration.
    pub fn model_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(&self.google_api_key)
            .with_model(&self.model)
            .with_base_url(&self.base_url)
            .build()
    }

    /// Creates the search tool.
    pub fn search_tool(&self) -> WebSearchTool {
        WebSearchTool::new(&self.tavily_api_key)
            .with_max_results(self.max_results)
    }
}

impl Debug for ResearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchConfig")
            .field("google_api_key", &"<redacted>")
            .field("tavily_api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_iterations", &self.max_iterations)
            .field("max_results", &self.max_results)
            .finish()
    }
}

#[inline]
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
            .with_google_api_key("g-key")
            .with_tavily_api_key("t-key")
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.temperature(), 0.2);
        assert_eq!(config.max_iterations(), 30);
        assert_eq!(config.max_results(), 3);
        assert_eq!(config.model_config().model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_missing_credentials() {
        let err = ResearchConfigBuilder::default()
            .with_tavily_api_key("t-key")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential(GOOGLE_API_KEY));
        assert_eq!(err.to_string(), "GOOGLE_API_KEY is not set");

        let builder = ResearchConfigBuilder::default()
            .with_google_api_key("g-key")
            .with_tavily_api_key("  ");
        let status = builder.credential_status();
        assert!(!status.is_ready());
        assert_eq!(status.label(), "API keys missing");
        assert_eq!(status.missing(), [TAVILY_API_KEY]);
        assert_eq!(
            builder.build().unwrap_err(),
            ConfigError::MissingCredential(TAVILY_API_KEY)
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            builder().with_temperature(2.5).build().unwrap_err(),
            ConfigError::InvalidTemperature(2.5)
        );
        assert_eq!(
            builder().with_max_iterations(0).build().unwrap_err(),
            ConfigError::InvalidMaxIterations
        );
        assert_eq!(
            builder().with_max_results(21).build().unwrap_err(),
            ConfigError::InvalidMaxResults(21)
        );
        assert!(builder().with_temperature(0.0).build().is_ok());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = builder().with_model("gemini-2.5-pro").build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("g-key"));
        assert!(!debug.contains("t-key"));
        assert!(debug.contains("gemini-2.5-pro"));
        assert!(!format!("{:?}", builder()).contains("g-key"));
    }
}
