//! CLI command handlers.
//!
//! Thin composition layer: parse args, resolve the project root, load
//! config, and hand off to the library modules. No business logic lives
//! here - it's all in `scheduler`, `flow`, `config`, and `init`.

mod args;

pub use args::{Cli, Commands, FlowCommands};

use crate::client::{orchestrator_id, RemoteClient};
use crate::config::{octopoid_dir, AgentsConfig, ConfigLoader};
use crate::message_dispatch::{DispatcherConfig, MessageDispatcher};
use crate::result_handler::ResultHandler;
use crate::scheduler::{AgentPool, Scheduler};
use crate::subprocess::SubprocessManager;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Execute a parsed CLI command.
pub async fn execute_command(command: Option<Commands>, path: Option<PathBuf>, _verbose: u8) -> Result<()> {
    let project_root = match path {
        Some(p) => p,
        None => std::env::current_dir().context("failed to get current directory")?,
    };

    match command {
        Some(Commands::Init { force }) => crate::init::scaffold(&project_root, force).await,
        Some(Commands::Run { config, interval }) => run_loop(&project_root, config, interval).await,
        Some(Commands::Tick { config }) => run_tick(&project_root, config).await,
        Some(Commands::Flow { command }) => run_flow_command(&project_root, command).await,
        None => {
            eprintln!("no command given, try `octopoid --help`");
            std::process::exit(2);
        }
    }
}

async fn build_scheduler(project_root: &PathBuf, config_path: Option<PathBuf>) -> Result<Scheduler> {
    let loader = ConfigLoader::new(project_root.clone());
    let octopoid_config = loader
        .load_server_config(config_path.as_deref())
        .await
        .context("failed to load server config")?;
    let agents_config: AgentsConfig = loader
        .load_agents_config()
        .await
        .context("failed to load agents config")?;

    let client = RemoteClient::new(octopoid_config.server.url.clone(), octopoid_config.server.api_key.clone());
    let orchestrator_id = orchestrator_id(&octopoid_config.cluster);
    client
        .register_orchestrator(&orchestrator_id)
        .await
        .context("failed to register orchestrator")?;

    let octopoid_dir = octopoid_dir(project_root);
    let flows_dir = octopoid_dir.join("flows");

    for name in crate::flow::list_flows(&flows_dir).unwrap_or_default() {
        let flow = crate::flow::load_flow(&flows_dir, &name)?;
        client
            .register_flow(&name, &flow)
            .await
            .with_context(|| format!("failed to register flow '{name}'"))?;
    }

    let pools: Vec<AgentPool> = agents_config
        .effective_blueprints()
        .into_iter()
        .map(AgentPool::new)
        .collect();

    let subprocess = SubprocessManager::production();
    let result_handler = ResultHandler::new(client.clone(), flows_dir);

    let dispatch_instructions = std::fs::read_to_string(octopoid_dir.join("prompts").join("dispatcher.md"))
        .unwrap_or_else(|_| "Act on the operator's command, read-only unless explicitly permitted.".to_string());
    let dispatcher = MessageDispatcher::new(
        client.clone(),
        subprocess.runner(),
        octopoid_dir.clone(),
        project_root.clone(),
        dispatch_instructions,
        DispatcherConfig::default(),
    );

    Ok(Scheduler::new(
        pools,
        client,
        result_handler,
        subprocess,
        agents_config,
        octopoid_dir,
        project_root.clone(),
        orchestrator_id,
        dispatcher,
    ))
}

async fn run_tick(project_root: &PathBuf, config: Option<PathBuf>) -> Result<()> {
    let mut scheduler = build_scheduler(project_root, config).await?;
    scheduler.tick().await.context("scheduler tick failed")?;
    Ok(())
}

async fn run_loop(project_root: &PathBuf, config: Option<PathBuf>, interval_secs: u64) -> Result<()> {
    let mut scheduler = build_scheduler(project_root, config).await?;
    let interval = std::time::Duration::from_secs(interval_secs);

    info!(interval_secs, "starting scheduler loop");
    loop {
        tokio::select! {
            result = scheduler.tick() => {
                result.context("scheduler tick failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal, exiting after current tick");
                break;
            }
        }
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

async fn run_flow_command(project_root: &PathBuf, command: FlowCommands) -> Result<()> {
    let flows_dir = octopoid_dir(project_root).join("flows");
    match command {
        FlowCommands::List => {
            for name in crate::flow::list_flows(&flows_dir)? {
                println!("{name}");
            }
        }
        FlowCommands::Validate { name } => {
            let flow = crate::flow::load_flow(&flows_dir, &name)?;
            let errors = flow.validate();
            if errors.is_empty() {
                println!("flow '{name}' is valid: {} reachable state(s)", flow.all_states().len());
            } else {
                println!("flow '{name}' has {} issue(s):", errors.len());
                for error in &errors {
                    println!("  - {error}");
                }
            }
        }
    }
    Ok(())
}
