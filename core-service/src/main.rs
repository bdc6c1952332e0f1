mod cli;

use anyhow::{Context, Result};
use bridge_traits::time::LogLevel;
use clap::Parser;
use cli::{Cli, Command, ConfigCmd, PairCmd};
use core_runtime::config::AppConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{CoreDependencies, TagSyncService};
use core_sync::MappingEntry;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_entries(file: &Path) -> Result<Vec<MappingEntry>> {
    let raw = if file == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        raw
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Cannot read pairings from {}", file.display()))?
    };
    serde_json::from_str(&raw).context("Pairings must be a JSON array of {sourceAPath, sourceBPath}")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(AppConfig::default_config_path);

    let config = AppConfig::load_or_init(&config_path)
        .with_context(|| format!("Cannot load config {}", config_path.display()))?;

    if let Command::Config { cmd } = &cli.command {
        match cmd {
            ConfigCmd::Show => print_json(&config)?,
            ConfigCmd::Init => println!("{}", config_path.display()),
        }
        return Ok(());
    }

    let mut logging = LoggingConfig::from_app_config(&config).with_format(LogFormat::Compact);
    if cli.verbose {
        logging = logging.with_level(LogLevel::Debug);
    }
    let _guard = init_logging(logging).context("Failed to initialize logging")?;

    let service = TagSyncService::from_config_file(&config_path, CoreDependencies::desktop())
        .await
        .context("Failed to start tag sync service")?;
    debug!(config = %config_path.display(), "Service started");

    match cli.command {
        Command::Scan => {
            let token = service.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, stopping scan");
                    token.cancel();
                }
            });
            print_json(&service.scan_library().await?)?;
        }
        Command::Members => print_json(&service.list_library_members().await?)?,
        Command::Pair { cmd } => match cmd {
            PairCmd::Suggest { save } => {
                let suggestions = service.suggest_pairings().await?;
                if save {
                    let entries: Vec<MappingEntry> = suggestions
                        .iter()
                        .filter_map(|s| {
                            s.source_b_path
                                .as_ref()
                                .map(|b| MappingEntry::new(&s.source_a_path, b))
                        })
                        .collect();
                    service.save_pairings(&entries).await?;
                }
                print_json(&suggestions)?;
            }
            PairCmd::Save { file } => {
                let entries = read_entries(&file)?;
                print_json(&service.save_pairings(&entries).await?)?;
            }
            PairCmd::List => print_json(&service.get_pairings().await?)?,
            PairCmd::Remove { source_a_path } => {
                print_json(&service.remove_pairing(&source_a_path).await?)?
            }
        },
        Command::Preview => print_json(&service.preview_sync().await?)?,
        Command::Run => print_json(&service.run_sync().await?)?,
        Command::Reconcile { source_a_path } => {
            print_json(&service.reconcile_bidirectional(&source_a_path).await?)?
        }
        Command::Prune => print_json(&service.prune_library().await?)?,
        Command::Config { .. } => {}
    }

    Ok(())
}
