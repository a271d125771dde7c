use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use wingman::a2a::{A2aClient, AgentName};
use wingman::agents::{ExecutorAgent, Orchestrator, PlannerAgent, RetrieverAgent};
use wingman::config::EnvConfig;
use wingman::events::EventBus;
use wingman::observability;
use wingman::repl::Repl;
use wingman::services::gemini::GeminiClient;
use wingman::services::vector::VectorStore;
use wingman::web;

#[derive(Parser)]
#[command(name = "wingman", version, about = "Multi-agent drone copilot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Orchestrator agent plus the user-facing web API
    Orchestrator,
    /// Planner agent (plan / reflect)
    Planner,
    /// Retriever agent (vector search over map knowledge)
    Retriever,
    /// Executor agent (drone MCP endpoint)
    Executor,
    /// Every agent in one process — development convenience
    All,
    /// Interactive terminal attached to the web API
    Repl {
        /// Base URL of the web API
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let debug = matches!(
        std::env::var("DEBUG").map(|v| v.to_lowercase()).as_deref(),
        Ok("1") | Ok("true") | Ok("yes") | Ok("on")
    );

    let otel_guard = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) if !endpoint.is_empty() => observability::init_otel_tracing(debug, &endpoint),
        _ => {
            observability::init_default_tracing(debug);
            None
        }
    };

    let config = EnvConfig::load();
    config.validate();

    let outcome = run(cli.command, config).await;
    if let Some(guard) = otel_guard {
        observability::shutdown_otel(guard);
    }
    if let Err(e) = outcome {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: EnvConfig) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Orchestrator => run_orchestrator(config).await,
        Command::Planner => run_planner(config).await,
        Command::Retriever => run_retriever(config).await,
        Command::Executor => run_executor(config).await,
        Command::All => run_all(config).await,
        Command::Repl { url } => {
            let base = url.unwrap_or_else(|| format!("http://127.0.0.1:{}", config.ports.web));
            Repl::new(base).run().await?;
            Ok(())
        }
    }
}

async fn run_planner(config: EnvConfig) -> Result<(), Box<dyn Error>> {
    let agent = Arc::new(PlannerAgent::new(GeminiClient::new(&config.gemini)));
    let url = config.ports.agent_url(AgentName::Planner);
    agent
        .server(&url)
        .serve(config.ports.planner, shutdown_signal())
        .await?;
    Ok(())
}

async fn run_retriever(config: EnvConfig) -> Result<(), Box<dyn Error>> {
    let agent = Arc::new(RetrieverAgent::new(
        GeminiClient::new(&config.gemini),
        VectorStore::new(&config.supabase),
    ));
    let url = config.ports.agent_url(AgentName::Retriever);
    agent
        .server(&url)
        .serve(config.ports.retriever, shutdown_signal())
        .await?;
    Ok(())
}

async fn run_executor(config: EnvConfig) -> Result<(), Box<dyn Error>> {
    let agent = Arc::new(ExecutorAgent::new(&config.mcp));
    let url = config.ports.agent_url(AgentName::Executor);
    agent
        .server(&url)
        .serve(config.ports.executor, shutdown_signal())
        .await?;
    // The child endpoint gets its terminate signal on the way out.
    agent.shutdown().await;
    Ok(())
}

async fn run_orchestrator(config: EnvConfig) -> Result<(), Box<dyn Error>> {
    let client = Arc::new(A2aClient::from_ports(&config.ports));
    let events = Arc::new(EventBus::new());
    let orchestrator = Arc::new(Orchestrator::new(
        client,
        events,
        config.mcp.mission_timeout,
    ));
    orchestrator.startup_probe().await;

    let url = config.ports.agent_url(AgentName::Orchestrator);
    let a2a = tokio::spawn(
        orchestrator
            .server(&url)
            .serve(config.ports.orchestrator, shutdown_signal()),
    );
    web::serve(orchestrator, config.ports.web, shutdown_signal()).await?;
    a2a.await??;
    info!("orchestrator stopped");
    Ok(())
}

async fn run_all(config: EnvConfig) -> Result<(), Box<dyn Error>> {
    let planner = Arc::new(PlannerAgent::new(GeminiClient::new(&config.gemini)));
    let retriever = Arc::new(RetrieverAgent::new(
        GeminiClient::new(&config.gemini),
        VectorStore::new(&config.supabase),
    ));
    let executor = Arc::new(ExecutorAgent::new(&config.mcp));

    let planner_task = tokio::spawn(
        planner
            .server(&config.ports.agent_url(AgentName::Planner))
            .serve(config.ports.planner, shutdown_signal()),
    );
    let retriever_task = tokio::spawn(
        retriever
            .server(&config.ports.agent_url(AgentName::Retriever))
            .serve(config.ports.retriever, shutdown_signal()),
    );
    let executor_task = tokio::spawn(
        executor
            .server(&config.ports.agent_url(AgentName::Executor))
            .serve(config.ports.executor, shutdown_signal()),
    );

    run_orchestrator(config).await?;

    planner_task.await??;
    retriever_task.await??;
    executor_task.await??;
    executor.shutdown().await;
    Ok(())
}

/// Resolves on ctrl-c; every server drains in-flight work and stops.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
