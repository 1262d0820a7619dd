//! Terminal progress sink.

use colored::Colorize;
use dialoguer::{Input, Password};
use genesis_core::term;
use genesis_secrets::{ProgressEvent, ProgressSink, PromptOptions};
use genesis_types::{CheckStatus, GenesisError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::BufRead;
use std::sync::Mutex;

/// Renders progress events to the terminal and runs operator prompts.
pub struct TermSink {
    quiet: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TermSink {
    /// Build a sink; `quiet` suppresses per-item chatter but not prompts
    /// or failures.
    pub fn new(quiet: bool) -> Self {
        Self { quiet, spinner: Mutex::new(None) }
    }

    fn glyph(status: CheckStatus) -> String {
        match status {
            CheckStatus::Ok => "✓".green().bold().to_string(),
            CheckStatus::Warn => "!".yellow().bold().to_string(),
            CheckStatus::Missing => "?".red().bold().to_string(),
            CheckStatus::Error => "✗".red().bold().to_string(),
        }
    }
}

impl ProgressSink for TermSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Wait { msg } => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap(),
                );
                pb.set_message(msg);
                pb.enable_steady_tick(std::time::Duration::from_millis(80));
                *self.spinner.lock().unwrap() = Some(pb);
            }
            ProgressEvent::WaitDone => {
                if let Some(pb) = self.spinner.lock().unwrap().take() {
                    pb.finish_and_clear();
                }
            }
            ProgressEvent::Init { action, total } => {
                if !self.quiet {
                    println!("{} {} secrets", action.green().bold(), total.to_string().cyan());
                }
            }
            ProgressEvent::StartItem { index, total, path, detail } => {
                if !self.quiet {
                    print!("  [{}/{}] {} ({}) ... ", index, total, path.cyan(), detail);
                }
            }
            ProgressEvent::DoneItem { status, notes, .. } => {
                if !self.quiet {
                    println!("{}", Self::glyph(status));
                } else if status != CheckStatus::Ok {
                    println!("{}", Self::glyph(status));
                }
                for note in notes {
                    println!("      {}", note.dimmed());
                }
            }
            ProgressEvent::Notify { level, msg } => {
                println!("{} {}", Self::glyph(level), msg);
            }
            ProgressEvent::Abort { msg } => {
                println!("{} {}", "Aborted:".yellow().bold(), msg);
            }
            ProgressEvent::Empty => {
                println!("{}", "Nothing to do".yellow());
            }
            ProgressEvent::Completed { summary } => {
                println!("{} {}", "✓".green().bold(), summary);
            }
        }
    }

    fn prompt(&self, msg: &str, opts: PromptOptions) -> Result<String> {
        if !term::in_controlling_terminal() {
            return Err(GenesisError::NoTty);
        }

        if opts.multiline {
            // capture until EOF; the executor ships this through an
            // ephemeral file rather than argv
            println!("{} (finish with ctrl-d):", msg);
            let mut buffer = String::new();
            for line in std::io::stdin().lock().lines() {
                buffer.push_str(&line?);
                buffer.push('\n');
            }
            return Ok(buffer);
        }

        if opts.secret {
            Password::new()
                .with_prompt(msg)
                .interact()
                .map_err(|e| GenesisError::Other(format!("prompt failed: {}", e)))
        } else {
            Input::new()
                .with_prompt(msg)
                .interact_text()
                .map_err(|e| GenesisError::Other(format!("prompt failed: {}", e)))
        }
    }

    fn inline_prompt(&self, msg: &str) -> Result<char> {
        if !term::in_controlling_terminal() {
            return Err(GenesisError::NoTty);
        }
        print!("{} ", msg);
        use std::io::Write;
        std::io::stdout().flush()?;
        console::Term::stderr()
            .read_char()
            .map_err(|e| GenesisError::Other(format!("prompt failed: {}", e)))
    }
}
