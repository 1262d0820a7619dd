//! CLI structure and command definitions.

use clap::{Args, Parser, Subcommand};
use genesis_types::{Action, Result};
use std::path::PathBuf;

use crate::commands::secrets;

#[derive(Parser)]
#[command(name = "genesis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "BOSH Deployment Secret Lifecycle Manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress per-item progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Options shared by every secrets subcommand.
#[derive(Args)]
pub struct SecretsOpts {
    /// Environment name
    pub env: String,

    /// Path to the merged kit metadata (kit.yml)
    #[arg(short, long, default_value = "kit.yml")]
    pub kit: PathBuf,

    /// Kit features to enable (base is always active)
    #[arg(short, long = "feature")]
    pub features: Vec<String>,

    /// Secret store URL
    #[arg(long, default_value = "https://127.0.0.1:8200")]
    pub vault: String,

    /// Absolute store path of an external root CA
    #[arg(long)]
    pub root_ca: Option<String>,

    /// Narrow the run: plan paths, key=value, key!=value, or /regex/
    #[arg(value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Confirm each secret individually (y/n/q)
    #[arg(short, long)]
    pub interactive: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate missing secrets for an environment
    #[command(name = "add-secrets")]
    AddSecrets {
        #[command(flatten)]
        opts: SecretsOpts,
    },

    /// Regenerate secrets, overwriting all but fixed ones
    #[command(name = "rotate-secrets")]
    RotateSecrets {
        #[command(flatten)]
        opts: SecretsOpts,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Renew certificate lifetimes
    #[command(name = "renew-secrets")]
    RenewSecrets {
        #[command(flatten)]
        opts: SecretsOpts,
    },

    /// Remove secrets for an environment
    #[command(name = "remove-secrets")]
    RemoveSecrets {
        #[command(flatten)]
        opts: SecretsOpts,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Validate existing secrets against the kit's declarations
    #[command(name = "check-secrets")]
    CheckSecrets {
        #[command(flatten)]
        opts: SecretsOpts,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<i32> {
        match &self.command {
            Commands::AddSecrets { opts } => {
                secrets::run_action(Action::Add, opts, true, self.quiet).await
            }
            Commands::RotateSecrets { opts, yes } => {
                secrets::run_action(Action::Recreate, opts, *yes, self.quiet).await
            }
            Commands::RenewSecrets { opts } => {
                secrets::run_action(Action::Renew, opts, true, self.quiet).await
            }
            Commands::RemoveSecrets { opts, yes } => {
                secrets::run_action(Action::Remove, opts, *yes, self.quiet).await
            }
            Commands::CheckSecrets { opts } => secrets::check(opts, self.quiet).await,
        }
    }
}
