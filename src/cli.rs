//! Command-line argument parsing for keychord
//!
//! Supports:
//! - Resolving key presses against the layered keymap
//! - Looking up the bindings of a command
//! - Listing and checking keymap files
//! - Watching keymap files for changes

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::keymap::{override_paths, ContextValue, KeyContext};

/// Context-aware keybinding resolver
#[derive(Parser, Debug)]
#[command(
    name = "keychord",
    version,
    about = "Resolve key presses against layered keymaps"
)]
pub struct CliArgs {
    /// Extra keymap file, layered after the project and user keymaps
    #[arg(long, value_name = "FILE", global = true)]
    pub keymap: Vec<PathBuf>,

    /// Ignore the project-local and user keymaps
    #[arg(long, global = true)]
    pub no_user: bool,

    /// Log every resolution step to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Feed key presses through the resolver, carrying chord state between them
    Resolve {
        /// Context file (YAML or JSON object of context keys)
        #[arg(long, value_name = "FILE", conflicts_with = "set")]
        context: Option<PathBuf>,

        /// Set a context key; a bare KEY means KEY=true
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Key presses, e.g. `ctrl+k` or "ctrl+k ctrl+c"
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,
    },

    /// Print the bindings of a command, primary first
    Lookup {
        #[arg(value_name = "COMMAND")]
        command: String,
    },

    /// Print the merged keymap in priority order
    List {
        /// Print only the shipped defaults
        #[arg(long)]
        defaults: bool,
    },

    /// Load every keymap layer and report problems
    Check,

    /// Print a line whenever a keymap file is reloaded
    Watch,
}

impl CliArgs {
    /// Override files in load order
    pub fn override_paths(&self) -> Vec<PathBuf> {
        let mut paths = if self.no_user {
            Vec::new()
        } else {
            override_paths()
        };
        paths.extend(self.keymap.iter().cloned());
        paths
    }
}

/// Parse a `--set` argument
pub fn parse_assignment(arg: &str) -> Result<(String, ContextValue), String> {
    let (key, value) = match arg.split_once('=') {
        Some((key, value)) => (key.trim(), ContextValue::from_literal(value.trim())),
        None => (arg.trim(), ContextValue::Bool(true)),
    };

    if key.is_empty() {
        return Err(format!("Missing context key in '{}'", arg));
    }
    Ok((key.to_string(), value))
}

/// Build a context from `--set` arguments
pub fn context_from_assignments(args: &[String]) -> Result<KeyContext, String> {
    let mut context = KeyContext::new();
    for arg in args {
        let (key, value) = parse_assignment(arg)?;
        context.set(key, value);
    }
    Ok(context)
}
