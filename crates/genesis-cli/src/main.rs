//! Genesis CLI entry point.

use clap::Parser;
use colored::Colorize;
use genesis_types::GenesisError;

mod cli;
mod commands;
mod ui;

use cli::Cli;

#[tokio::main]
async fn main() {
    genesis_core::log::init_default().ok();

    let cli = Cli::parse();
    let code = match cli.execute().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

/// 0 on success, 1 on operational failure, 2 on usage and parse errors.
fn exit_code_for(e: &GenesisError) -> i32 {
    match e {
        GenesisError::BadRequest(_)
        | GenesisError::BadFilter(_)
        | GenesisError::Kit(_)
        | GenesisError::Validation(_) => 2,
        _ => 1,
    }
}
