use jobstream_core::{
    client::JobStreamClient,
    config::Config,
    envelope::{Callbacks, ProgressUpdate},
    jobs::{DownloadJob, DownloadOutcome, TrainingJob, TrainingResult},
    session::SessionHandle,
    stream::SessionOutcome,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Follow backend job progress streams", long_about = None)]
struct Cli {
    /// JSON or TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// API base url; overrides the config file
    #[arg(long)]
    base_url: Option<String>,
    /// Environment variable holding the bearer token; overrides the config file
    #[arg(long)]
    token_env: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream model-training progress for a dataset
    Train {
        #[arg(long)]
        dataset_id: String,
        #[arg(long)]
        chat_id: String,
    },
    /// Stream dataset-download progress
    Download {
        #[arg(long)]
        dataset_id: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = match (&cli.config, &cli.base_url) {
        (Some(path), _) => Config::from_path(path)?,
        (None, Some(base)) => Config::with_base_url(base.clone()),
        (None, None) => anyhow::bail!("either --config or --base-url is required"),
    };
    if let Some(base) = &cli.base_url {
        cfg.server.base_url = base.clone();
    }
    if let Some(var) = &cli.token_env {
        cfg.server.token_env = var.clone();
    }
    Ok(cfg)
}

/// Cancel the session on Ctrl-C.
fn cancel_on_ctrl_c(handle: SessionHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("[cancelling]");
            handle.cancel();
        }
    });
}

fn print_progress(update: ProgressUpdate) {
    match update.percent {
        Some(p) => println!("[{p:>5.1}%] {}", update.message),
        None => println!("        {}", update.message),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    let token = cfg.token()?;
    let client = JobStreamClient::new(&cfg.http)?;

    let outcome = match &cli.command {
        Commands::Train { dataset_id, chat_id } => {
            let session = TrainingJob::new(dataset_id.as_str(), chat_id.as_str())
                .start(&client, &cfg, &token)
                .await?;
            cancel_on_ctrl_c(session.handle());
            let mut callbacks = Callbacks {
                on_progress: print_progress,
                on_complete: |r: TrainingResult| {
                    println!("trained {} (best model: {})", r.model_id, r.best_model);
                    for (name, value) in &r.metrics {
                        println!("  {name}: {value}");
                    }
                },
                on_error: |m: String| eprintln!("[training failed: {m}]"),
            };
            session.run(&mut callbacks).await?
        }
        Commands::Download { dataset_id } => {
            let session = DownloadJob::new(dataset_id.as_str())
                .start(&client, &cfg, &token)
                .await?;
            cancel_on_ctrl_c(session.handle());
            let mut callbacks = Callbacks {
                on_progress: print_progress,
                on_complete: |o: DownloadOutcome| {
                    let r = o.result();
                    let name = r.name.as_deref().or(r.dataset_id.as_deref()).unwrap_or("dataset");
                    match &o {
                        DownloadOutcome::Full(_) => println!("downloaded {name}"),
                        DownloadOutcome::Partial { warning, .. } => {
                            println!("downloaded {name} partially: {warning}")
                        }
                    }
                    if let Some(rows) = r.rows {
                        println!("  rows: {rows}");
                    }
                },
                on_error: |m: String| eprintln!("[download failed: {m}]"),
            };
            session.run(&mut callbacks).await?
        }
    };

    info!(outcome = outcome.as_str(), "job stream finished");
    match outcome {
        SessionOutcome::Completed => Ok(()),
        SessionOutcome::Failed => std::process::exit(1),
        other => {
            eprintln!("[stream ended: {}]", other.as_str());
            std::process::exit(2);
        }
    }
}
