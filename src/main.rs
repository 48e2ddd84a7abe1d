//! `piv` CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use piv_supervisor::cli::commands::{deregister, init, monitor_cmd, status};
use piv_supervisor::cli::{Cli, Commands};
use piv_supervisor::infrastructure::ai_driver::{ClaudeCliConfig, ClaudeCliDriver};
use piv_supervisor::infrastructure::config::{expand_tilde, ConfigLoader};
use piv_supervisor::infrastructure::intervention_log::InterventionLog;
use piv_supervisor::infrastructure::logging::LoggerGuard;
use piv_supervisor::infrastructure::memory::{HttpFixMemory, NullFixMemory};
use piv_supervisor::infrastructure::process::OsProcessProbe;
use piv_supervisor::infrastructure::registry_store::RegistryStore;
use piv_supervisor::infrastructure::telegram::{NullNotifier, TelegramNotifier};
use piv_supervisor::infrastructure::validation::ShellValidator;
use piv_supervisor::services::{Interventor, Monitor};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _logger_guard = LoggerGuard::init(&config.logging).context("failed to initialize logging")?;

    let registry = Arc::new(
        RegistryStore::new(expand_tilde(&config.paths.registry_path))
            .with_lock_timeout(std::time::Duration::from_millis(config.paths.registry_lock_timeout_ms)),
    );

    if let Commands::Init { path, name, from, force } = cli.command {
        return match init::execute(path, name, from, force, &config, &registry, cli.json).await? {
            init::InitExit::Success(_) => Ok(ExitCode::SUCCESS),
            init::InitExit::PathConflict(message) => {
                eprintln!("{message}");
                Ok(ExitCode::from(2))
            }
        };
    }

    if let Commands::Status = cli.command {
        return match status::execute(&registry, cli.json) {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(e) => {
                eprintln!("{e:#}");
                Ok(ExitCode::FAILURE)
            }
        };
    }

    if let Commands::Deregister { name } = cli.command {
        return match deregister::execute(&name, &registry, cli.json) {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(e) => {
                eprintln!("{e:#}");
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let Commands::Monitor { once } = cli.command else {
        unreachable!("init, status, and deregister are handled above");
    };

    let process: Arc<dyn piv_supervisor::domain::ports::ProcessProbe> =
        Arc::new(OsProcessProbe::new(config.monitor.orchestrator_command.clone()));

    let ai_driver: Arc<dyn piv_supervisor::domain::ports::AiDriver> =
        Arc::new(ClaudeCliDriver::new(ClaudeCliConfig::default()));

    let memory: Arc<dyn piv_supervisor::domain::ports::FixMemory> = if config.memory.is_enabled() {
        Arc::new(HttpFixMemory::new(
            config.memory.base_url.clone().unwrap_or_default(),
            config.memory.token.clone().unwrap_or_default(),
        ))
    } else {
        Arc::new(NullFixMemory)
    };

    let notifier: Arc<dyn piv_supervisor::domain::ports::Notifier> = if config.telegram.is_enabled() {
        Arc::new(TelegramNotifier::new(
            config.telegram.bot_token.clone().unwrap_or_default(),
            config.telegram.chat_id.clone().unwrap_or_default(),
            config.retry.clone(),
        ))
    } else {
        Arc::new(NullNotifier)
    };

    let validator: Arc<dyn piv_supervisor::domain::ports::Validator> = Arc::new(ShellValidator::new());
    let intervention_log = InterventionLog::new(expand_tilde(&config.paths.intervention_log_path));

    let interventor = Arc::new(Interventor::new(
        ai_driver,
        memory,
        validator,
        process.clone(),
        registry.clone(),
        config.interventor.clone(),
        config.memory.search_threshold,
        config.memory.search_limit,
    ));

    let monitor = Arc::new(Monitor::new(registry, process, notifier, interventor, intervention_log, config.clone()));

    let exit_code = monitor_cmd::execute(monitor, once, &config.paths, cli.json).await?;
    Ok(ExitCode::from(exit_code as u8))
}
