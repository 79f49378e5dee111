//! OnBehalf CLI - Main entry point

use clap::{Parser, Subcommand};
use onbehalf_rpc::{commands, serve, AppContext, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "onbehalf")]
#[command(about = "OnBehalf - Delegated authority and audit engine", long_about = None)]
struct Cli {
    /// Data directory path (defaults to ONBEHALF_DATA or ./data)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// JSON file overriding engine thresholds
    #[arg(long)]
    engine_config: Option<PathBuf>,

    /// JSON staff roster; when set, callers must be listed in it
    #[arg(long)]
    staff_roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load proposals, policies, customers and claims from a JSON fixture file
    Seed {
        /// Fixture file path
        file: PathBuf,
    },

    /// Inspect the audit ledger
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// Inspect the review queue
    Reviews {
        #[command(subcommand)]
        command: ReviewCommands,
    },

    /// Ledger and store summary
    Stats,
}

#[derive(Subcommand)]
enum AuditCommands {
    /// Verify the hash chain
    Verify,

    /// List entries, newest first
    List {
        /// Filter by target ID
        #[arg(long)]
        target: Option<String>,
        /// Filter by operator ID
        #[arg(long)]
        operator: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ReviewCommands {
    /// Entries awaiting a reviewer
    Pending {
        /// Reviewer staff ID
        reviewer: String,
    },

    /// Entries pending longer than the threshold
    Stale {
        /// Override the configured threshold
        #[arg(long)]
        hours: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = ServerConfig::from_env();
    if let Some(data) = cli.data {
        config.data_dir = data;
    }
    if cli.engine_config.is_some() {
        config.engine_config = cli.engine_config;
    }
    if cli.staff_roster.is_some() {
        config.staff_roster = cli.staff_roster;
    }

    // Create application context
    let ctx = AppContext::from_config(&config)?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(Arc::new(ctx), &config.bind_address()).await?;
        }

        Commands::Seed { file } => {
            commands::seed(&ctx, &file)?;
        }

        Commands::Audit { command } => match command {
            AuditCommands::Verify => commands::audit_verify(&ctx)?,
            AuditCommands::List {
                target,
                operator,
                limit,
            } => commands::audit_list(&ctx, target, operator, limit)?,
        },

        Commands::Reviews { command } => match command {
            ReviewCommands::Pending { reviewer } => commands::reviews_pending(&ctx, &reviewer)?,
            ReviewCommands::Stale { hours } => commands::reviews_stale(&ctx, hours)?,
        },

        Commands::Stats => {
            commands::stats(&ctx)?;
        }
    }

    Ok(())
}
