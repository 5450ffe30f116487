//! # Web Research Agent
//!
//! Command-line front end for the `research-flow` workflow: analyze a
//! query, search the web and news, evaluate and scrape sources, then
//! synthesize a Markdown report.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "What are the latest developments in Rust async?"
//! cargo run -- --interactive --no-news
//! cargo run -- --graph
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Environment configuration
mod config;

/// Provider wiring and report persistence
mod agent;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use research_flow::ResearchAgent;

use crate::agent::{build_agent, save_report, REPORTS_DIR};
use crate::config::{Config, Provider};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "web-research-agent",
    version,
    about = "Multi-stage web research agent: plan, search, evaluate, scrape, synthesize, report",
    long_about = r#"
Web Research Agent

Runs a research workflow for a natural-language query:
  1. Analyze the query and plan a search strategy
  2. Search the web (Tavily) and news (NewsAPI)
  3. Decide whether snippets suffice or pages must be scraped
  4. Synthesize the findings into a Markdown report

ENVIRONMENT:
  LLM_PROVIDER, LLM_MODEL, TAVILY_API_KEY, NEWS_API_KEY, GEMINI_API_KEY,
  OPENAI_API_KEY, OLLAMA_API_BASE_URL (a .env file is read if present)

EXAMPLES:
  web-research-agent "What are the latest developments in Rust async?"
  web-research-agent --provider ollama --model llama3.2 "Rust web frameworks"
  web-research-agent -i -o notes.txt
"#
)]
struct Args {
    /// The research query to investigate
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// Save the report under test_reports/ with this file name
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,

    /// Enable debug logging everywhere
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Enable debug logging for the search collaborators only
    #[arg(short = 'd', long = "debug-search")]
    debug_search: bool,

    /// Read queries from stdin until exit/quit
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,

    /// Disable news search (web search only)
    #[arg(short = 'n', long = "no-news")]
    no_news: bool,

    /// Model to use (overrides LLM_MODEL)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Generation provider (overrides LLM_PROVIDER)
    #[arg(long = "provider", value_enum)]
    provider: Option<Provider>,

    /// Print the workflow graph as a Mermaid flowchart and exit
    #[arg(long = "graph")]
    graph: bool,
}

impl Args {
    /// Apply command-line overrides on top of the environment.
    fn apply(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if self.no_news {
            config.disable_news_search = true;
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.debug_search)?;

    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    info!(
        provider = config.provider.name(),
        model = %config.model(),
        news_disabled = config.disable_news_search,
        "Configuration loaded"
    );

    let agent = build_agent(&config)?;

    if args.graph {
        println!("{}", agent.graph_mermaid());
        return Ok(());
    }

    if args.interactive {
        return run_interactive(&agent, args.output.as_deref()).await;
    }

    match args.query.as_deref() {
        Some(query) if !query.trim().is_empty() => run_query(&agent, query, args.output.as_deref()).await,
        _ => {
            anyhow::bail!("no query given; pass a QUERY or use --interactive (see --help)")
        }
    }
}

/// Research one query, print the report and optionally save it.
async fn run_query(agent: &ResearchAgent, query: &str, output: Option<&str>) -> Result<()> {
    println!("Researching: {}", query);
    println!("This may take a few minutes...");

    let outcome = agent.run(query).await;
    print_report(&outcome.final_report);

    if !outcome.error_log.is_empty() {
        info!(errors = outcome.error_log.len(), "Research finished with recoverable errors");
    }

    if let Some(output) = output {
        let path = save_report(&outcome.final_report, query, Some(output), Path::new(REPORTS_DIR))?;
        println!("Report saved to {}", path.display());
    }
    Ok(())
}

/// Read queries line by line until `exit`, `quit` or end of input.
async fn run_interactive(agent: &ResearchAgent, output: Option<&str>) -> Result<()> {
    println!("Web Research Agent - Interactive Mode");
    println!("Type 'exit' or 'quit' to end the session");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\nEnter research query: ");
        io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let query = line.context("failed to read query from stdin")?;
        let query = query.trim();

        if is_exit_command(query) {
            println!("Exiting...");
            break;
        }
        if query.is_empty() {
            continue;
        }

        // A failure for one query leaves the session running
        if let Err(e) = run_query(agent, query, output).await {
            error!(error = %e, "Error during research");
            eprintln!("An error occurred: {}", e);
        }
        println!("\nReady for next query.");
    }
    Ok(())
}

fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit")
}

fn print_report(report: &str) {
    println!("\n{}", "=".repeat(50));
    println!("RESEARCH REPORT");
    println!("{}", "=".repeat(50));
    println!("{}", report);
    println!("{}\n", "=".repeat(50));
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Directive for the requested verbosity; `RUST_LOG` wins when set.
fn log_directive(verbose: bool, debug_search: bool) -> String {
    if verbose {
        "debug".to_string()
    } else if debug_search {
        "info,research_flow::tools=debug".to_string()
    } else {
        "info".to_string()
    }
}

fn init_logging(verbose: bool, debug_search: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(verbose, debug_search)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
