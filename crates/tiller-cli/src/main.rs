//! tiller: run a tool-using agent loop against a decision service

mod presenter;
mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use loop_core::{
    AgentState, ConsoleChannel, Orchestrator, OrchestratorConfig, PolicyContext, RunStatus,
};
use policy_client::{ClientConfig, PolicyClient};

use presenter::{ConsolePresenter, ConsoleStream};

#[derive(Debug, Parser)]
#[command(name = "tiller")]
#[command(about = "Run a bounded agent loop against a decision service", version)]
struct Cli {
    /// Goal for the agent to achieve
    goal: String,

    /// User message(s) to include
    #[arg(short, long = "message")]
    messages: Vec<String>,

    /// Organization-level policies (highest priority)
    #[arg(long, default_value = "")]
    org_policies: String,

    /// Industry or regulatory rules
    #[arg(long, default_value = "")]
    industry_rules: String,

    /// Domain-specific guidelines
    #[arg(long, default_value = "")]
    domain_guidelines: String,

    /// Maximum number of steps before forced termination
    #[arg(long, default_value = "20")]
    max_steps: usize,

    /// Directory for audit logs
    #[arg(long)]
    audit_dir: Option<PathBuf>,

    /// Decision service base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Model name (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Suppress progress output, print only the final response
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut client_config = ClientConfig::load()?;
    if let Some(base_url) = cli.base_url {
        client_config.base_url = base_url;
    }
    if let Some(model) = cli.model {
        client_config.model = model;
    }

    let mut config = OrchestratorConfig::new().with_max_steps(cli.max_steps);
    if let Some(dir) = cli.audit_dir {
        config = config.with_audit_dir(dir);
    }

    let oracle = PolicyClient::new(client_config);
    let registry = tools::create_demo_registry();

    let mut orchestrator = Orchestrator::with_config(oracle, registry, config)
        .with_hitl(Arc::new(ConsoleChannel));
    if !cli.quiet {
        orchestrator = orchestrator
            .with_event_sink(ConsolePresenter::new())
            .with_stream(Arc::new(ConsoleStream::new()));
    }

    let mut state = AgentState::new(cli.goal, cli.messages);
    let ctx = PolicyContext {
        org_policies: cli.org_policies,
        industry_rules: cli.industry_rules,
        domain_guidelines: cli.domain_guidelines,
    };

    let status = orchestrator.run(&mut state, &ctx).await?;
    info!(status = ?status, history = state.history().len(), "Run complete");

    // The console channel answers synchronously, so a pending suspension can
    // only mean a misconfigured embedding.
    if let RunStatus::AwaitingHuman(request) = status {
        anyhow::bail!("Run suspended awaiting human input: {}", request);
    }

    if cli.quiet {
        if let Some(response) = state.final_response() {
            println!("{}", response);
        }
    }

    Ok(())
}
