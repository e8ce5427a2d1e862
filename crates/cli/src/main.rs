//! lmsprov CLI - Main Entry Point
//!
//! Provisions the cloud footprint of an LMS deployment: network, private
//! service access, GKE, managed MySQL, Memorystore, Filestore, Artifact
//! Registry and the IAM binding between them. Every run is safe to repeat.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lmsprov_common::ResourceKind;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{apply, init, list, plan, validate, Backend, BackendArgs, Overrides};

/// lmsprov - Idempotent provisioning for LMS infrastructure
#[derive(Parser)]
#[command(name = "lmsprov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Deployment configuration file
    #[arg(
        short,
        long,
        env = "LMSPROV_CONFIG",
        default_value = lmsprov_common::DEFAULT_CONFIG_FILE,
        global = true
    )]
    config: PathBuf,

    /// Override the project id from the configuration
    #[arg(long, env = "LMSPROV_PROJECT", global = true)]
    project: Option<String>,

    /// Override the region from the configuration
    #[arg(long, env = "LMSPROV_REGION", global = true)]
    region: Option<String>,

    /// Override the zone from the configuration
    #[arg(long, env = "LMSPROV_ZONE", global = true)]
    zone: Option<String>,

    /// Provider backend
    #[arg(long, value_enum, env = "LMSPROV_BACKEND", default_value = "gcloud", global = true)]
    backend: Backend,

    /// State file for the local backend
    #[arg(long, env = "LMSPROV_STATE_FILE", global = true)]
    state_file: Option<PathBuf>,

    /// gcloud executable
    #[arg(
        long,
        env = "LMSPROV_GCLOUD",
        default_value = lmsprov_provider::gcloud::DEFAULT_BINARY,
        global = true
    )]
    gcloud_bin: String,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration and show the ordered plan (offline)
    Validate,

    /// Show which resources apply would create, without creating anything
    Plan,

    /// Create every missing resource, in dependency order
    Apply,

    /// List the identifiers the backend reports for one resource kind
    List {
        /// Resource kind (e.g. network, router_nat, managed_database)
        kind: ResourceKind,
    },

    /// Show version information
    Version,
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // stdout carries command output only
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let overrides = Overrides {
        project: cli.project,
        region: cli.region,
        zone: cli.zone,
    };
    let backend = BackendArgs {
        backend: cli.backend,
        state_file: cli.state_file,
        gcloud_bin: cli.gcloud_bin,
    };

    match cli.command {
        Commands::Init { force } => init::execute(&cli.config, force)?,
        Commands::Validate => {
            let config = commands::load_config(&cli.config, &overrides)?;
            validate::execute(&config, cli.format)?;
        }
        Commands::Plan => {
            let ctx = commands::Context::new(&cli.config, &overrides, backend, cli.format)?;
            plan::execute(&ctx).await?;
        }
        Commands::Apply => {
            let ctx = commands::Context::new(&cli.config, &overrides, backend, cli.format)?;
            let code = apply::execute(&ctx).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::List { kind } => {
            let ctx = commands::Context::new(&cli.config, &overrides, backend, cli.format)?;
            list::execute(&ctx, kind).await?;
        }
        Commands::Version => {
            println!("lmsprov v{}", lmsprov_common::VERSION);
            println!("Idempotent provisioning for LMS infrastructure");
            println!();
            println!("Backends: gcloud, local");
            println!("Resource kinds:");
            for kind in ResourceKind::ALL {
                println!("  {}", kind);
            }
        }
    }

    Ok(())
}
