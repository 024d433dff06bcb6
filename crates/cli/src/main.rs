//! `summoner` binary: scaffold, inspect, and run summonable agents.

use clap::{Parser, Subcommand};
use colored::Colorize;
use sk_core::config::load_config;
use sk_core::engine::Engine;
use sk_core::init::{generate_summoner_kit_structure, InitOptions};
use sk_core::managers::TemplateRegistry;
use sk_core::runner::{Runner, RunnerConfig};
use sk_protocol::action_models::{ActionKind, CandidateAction};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "summoner", version, about = "Summonable agent runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scaffold a .summoner-kit/ directory with starter agents and a team.
    Init {
        /// Directory to scaffold under.
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing .summoner-kit/ directory.
        #[arg(long)]
        force: bool,

        /// Only create config.toml and one agent.
        #[arg(long)]
        minimal: bool,
    },

    /// List agents defined in .summoner-kit/.
    Agents {
        /// Project root containing .summoner-kit/.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// List the built-in agent templates.
    Templates,

    /// Summon an agent and drive it through an autonomous run.
    Run {
        /// Agent name from .summoner-kit/agents/, or a built-in template.
        agent: String,

        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Step cap for the run.
        #[arg(long, default_value_t = 10)]
        steps: u64,

        /// Observation fed into the first step.
        #[arg(long, default_value = "begin")]
        observation: String,

        /// Emit the run report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Init {
            path,
            force,
            minimal,
        } => init(path, force, minimal).await,
        Command::Agents { root } => list_agents(root).await,
        Command::Templates => {
            list_templates();
            Ok(())
        }
        Command::Run {
            agent,
            root,
            steps,
            observation,
            json,
        } => run_agent(agent, root, steps, observation, json).await,
    }
}

async fn init(path: PathBuf, force: bool, minimal: bool) -> color_eyre::Result<()> {
    let options = InitOptions {
        target_dir: path.clone(),
        force,
        minimal,
    };
    generate_summoner_kit_structure(options).await?;
    println!(
        "{} .summoner-kit/ in {}",
        "Scaffolded".green().bold(),
        path.display()
    );
    Ok(())
}

async fn list_agents(root: PathBuf) -> color_eyre::Result<()> {
    let config = load_config(&root).await?;
    if config.agents.is_empty() {
        println!("No agents defined. Run {} first.", "summoner init".bold());
        return Ok(());
    }
    for agent in &config.agents {
        println!(
            "{}  basis {:?}  {}",
            agent.name.cyan().bold(),
            agent.body_basis,
            agent.description.dimmed()
        );
    }
    Ok(())
}

fn list_templates() {
    let registry = TemplateRegistry::with_builtins();
    for name in registry.names() {
        if let Some(template) = registry.get(name) {
            println!(
                "{}  basis {:?}  {}",
                name.cyan().bold(),
                template.body_basis,
                template.description.dimmed()
            );
        }
    }
}

async fn run_agent(
    agent: String,
    root: PathBuf,
    steps: u64,
    observation: String,
    json: bool,
) -> color_eyre::Result<()> {
    let config = load_config(&root).await?;

    // Project agents shadow built-in templates of the same name.
    let definition = match config.agents.iter().find(|a| a.name == agent) {
        Some(spec) => spec.clone().into_definition(&config.global),
        None => TemplateRegistry::with_builtins()
            .instantiate(&agent)
            .map_err(|_| {
                color_eyre::eyre::eyre!("no agent or template named `{agent}`")
            })?,
    };

    let engine = Arc::new(Mutex::new(Engine::new(definition)?));
    let runner_config = RunnerConfig {
        max_steps: Some(steps),
        step_delay: Duration::from_millis(config.global.runner.step_delay_ms),
        max_retries: config.global.runner.max_retries,
        retry_base: Duration::from_millis(config.global.runner.retry_base_ms),
    };
    let mut runner = Runner::new(engine, default_menu())
        .with_config(runner_config)
        .with_generator(Box::new(|step| format!("ambient observation {step}")));

    let report = runner.run(&observation).await?;

    if json {
        let summary = serde_json::json!({
            "run_id": report.run_id,
            "agent_id": report.agent_id,
            "status": report.status,
            "steps": report.steps.iter().map(|s| serde_json::json!({
                "step": s.step,
                "kind": s.kind,
                "free_energy": s.free_energy,
                "entropy": s.entropy,
                "note": s.note,
            })).collect::<Vec<_>>(),
            "errors": report.errors.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for step in &report.steps {
        println!(
            "{} {}  {}  F={:.3}  H={:.3}",
            "step".dimmed(),
            step.step,
            step.kind.to_string().cyan(),
            step.free_energy,
            step.entropy
        );
    }
    println!(
        "{} after {} steps ({} errors)",
        format!("{:?}", report.status).green().bold(),
        report.steps.len(),
        report.errors.len()
    );
    Ok(())
}

/// The default candidate menu offered on every step.
fn default_menu() -> Vec<CandidateAction> {
    vec![
        CandidateAction::new(ActionKind::Response, "respond to the observation", 0.5),
        CandidateAction::new(ActionKind::Query, "probe for more detail", 0.3),
        CandidateAction::new(ActionKind::MemoryWrite, "record what was seen", 0.4),
        CandidateAction::new(ActionKind::MemoryRead, "recall prior phases", 0.2),
        CandidateAction::new(ActionKind::LayerShift, "shift attention", 0.6),
        CandidateAction::new(ActionKind::Wait, "hold position", 0.05),
    ]
}
