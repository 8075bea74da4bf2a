//! A terminal chat front end for the research assistant.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use research_agent::core::AgentStep;
use research_agent::core::conversation::Role;
use research_agent::{
    CredentialStatus, ResearchConfigBuilder, Session, SessionBuilder,
};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const BAR_CHAR: &str = "▎";

#[derive(Parser)]
#[command(name = "research-agent", version)]
#[command(about = "An expert research assistant that searches the web for you")]
struct Cli {
    /// Ask a single question, print the answer and exit
    #[arg(short, long)]
    query: Option<String>,

    /// Print every Thought/Action/Observation step
    #[arg(short, long)]
    verbose: bool,

    /// Model to use
    #[arg(short, long, env = "RESEARCH_AGENT_MODEL")]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible model API
    #[arg(long, env = "RESEARCH_AGENT_BASE_URL")]
    base_url: Option<String>,

    /// Sampling temperature (0.0-2.0)
    #[arg(short, long, env = "RESEARCH_AGENT_TEMPERATURE")]
    temperature: Option<f32>,

    /// Maximum number of model calls per question
    #[arg(long, env = "RESEARCH_AGENT_MAX_ITERATIONS")]
    max_iterations: Option<usize>,

    /// Number of search results per search (1-20)
    #[arg(long)]
    max_results: Option<usize>,

    /// Model API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,

    /// Search API key
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    tavily_api_key: Option<String>,
}

impl Cli {
    fn config_builder(&self) -> ResearchConfigBuilder {
        let mut builder = ResearchConfigBuilder::default();
        if let Some(key) = &self.google_api_key {
            builder = builder.with_google_api_key(key);
        }
        if let Some(key) = &self.tavily_api_key {
            builder = builder.with_tavily_api_key(key);
        }
        if let Some(model) = &self.model {
            builder = builder.with_model(model);
        }
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.with_temperature(temperature);
        }
        if let Some(max_iterations) = self.max_iterations {
            builder = builder.with_max_iterations(max_iterations);
        }
        if let Some(max_results) = self.max_results {
            builder = builder.with_max_results(max_results);
        }
        builder
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load `.env` before parsing, so its values act as flag fallbacks.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("failed to load .env: {err}"),
    }

    let cli = Cli::parse();
    let config_builder = cli.config_builder();
    let health = config_builder.credential_status();

    print_header(health);
    let config = config_builder
        .build()
        .context("invalid configuration")?;
    debug!("starting with {config:?}");

    let (step_tx, mut step_rx) = mpsc::unbounded_channel();
    let mut session_builder =
        SessionBuilder::from_config(&config).with_health(health);
    if cli.verbose {
        session_builder = session_builder.on_step(move |step| {
            step_tx.send(step.clone()).ok();
        });
    }
    let mut session = session_builder.build();

    if let Some(query) = &cli.query {
        let answer = ask(&mut session, query, &mut step_rx).await;
        print_assistant(&answer);
        return Ok(());
    }

    for turn in session.transcript().turns() {
        match turn.role() {
            Role::Assistant => print_assistant(turn.content()),
            Role::User => println!("> {}", turn.content()),
        }
    }

    loop {
        print!("\n> ");
        std::io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = read_line().await else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        let answer = ask(&mut session, query, &mut step_rx).await;
        print_assistant(&answer);
    }

    Ok(())
}

/// Submits a query while showing a spinner, printing steps as they arrive.
async fn ask(
    session: &mut Session,
    query: &str,
    step_rx: &mut mpsc::UnboundedReceiver<AgentStep>,
) -> String {
    let progress_bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg}") {
        progress_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    progress_bar.set_message(format!("🔍 Running expert agent for: {query}..."));

    let mut submit = pin!(session.submit(query));
    let answer = loop {
        progress_bar.inc(1);

        let sleep = sleep(Duration::from_millis(100));
        select! {
            answer = &mut submit => break answer,
            Some(step) = step_rx.recv() => {
                progress_bar.suspend(|| print_step(&step));
            }
            _ = sleep => {}
        }
    };
    progress_bar.finish_and_clear();

    // Steps recorded right before the answer may still be queued.
    while let Ok(step) = step_rx.try_recv() {
        print_step(&step);
    }
    answer
}

fn print_header(health: CredentialStatus) {
    println!("{}", "🧠 Expert Research Agent".bold());
    if health.is_ready() {
        println!("{} {}", "●".bright_green(), health.label());
    } else {
        println!(
            "{} {} ({})",
            "●".bright_red(),
            health.label(),
            health.missing().join(", ")
        );
    }
    println!();
}

fn print_assistant(text: &str) {
    let bar = BAR_CHAR.bright_cyan();
    let mut lines = text.lines();
    if let Some(first) = lines.next() {
        println!("{bar}🤖 {}", first.bright_white());
    }
    for line in lines {
        println!("{bar}{}", line.bright_white());
    }
}

fn print_step(step: &AgentStep) {
    let bar = BAR_CHAR.bright_yellow();
    if !step.thought.is_empty() {
        println!("{bar}{} {}", "Thought:".bold(), step.thought);
    }
    println!("{bar}{} {}", "Action:".bold(), step.tool);
    println!("{bar}{} {}", "Action Input:".bold(), step.tool_input);
    println!("{bar}{} {}", "Observation:".bold(), step.observation.dimmed());
    println!();
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
