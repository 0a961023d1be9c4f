use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rvsizer_core::{SizerConfig, SizingEngine, SizingSession};
use rvsizer_types::ScopeOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser)]
#[command(name = "rvsizer", about = "Size an RVTools export against the cloud sizer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List VM names and power states.
    Vms {
        workbook: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Aggregate all three policies and request recommendations.
    Size {
        workbook: PathBuf,
        #[arg(long)]
        include_powered_off: bool,
        /// VM to drop from every policy (repeatable).
        #[arg(long = "exclude", value_name = "NAME")]
        exclude: Vec<String>,
        #[arg(long)]
        offline: bool,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        show_tables: bool,
    },
}

fn open(path: &Path) -> anyhow::Result<SizingSession> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    SizingSession::from_workbook(&bytes).with_context(|| format!("loading {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Vms { workbook, json } => {
            let vms = open(&workbook)?.vms()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&vms)?);
            } else {
                for vm in vms {
                    println!("{}\t{}", vm.vm, vm.powerstate);
                }
            }
        }
        Command::Size {
            workbook,
            include_powered_off,
            exclude,
            offline,
            config,
            json,
            show_tables,
        } => {
            let session = open(&workbook)?;
            let mut cfg = match config {
                Some(path) => SizerConfig::from_path(path)?
                    .with_overrides(|key| std::env::var(key).ok())?,
                None => SizerConfig::from_env()?,
            };
            cfg.offline |= offline;
            info!(workbook = %workbook.display(), offline = cfg.offline, "sizing");

            let options = ScopeOptions::shared(!include_powered_off, exclude);
            let engine = SizingEngine::new(cfg.build_recommender()?);
            let report = engine.size(&session, &options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::report(&report)?);
            }
            if show_tables {
                let scoped = rvsizer_scope::apply(session.inventory(), &options)?;
                print!("{}", render::scope_tables(&scoped)?);
            }
        }
    }

    Ok(())
}
