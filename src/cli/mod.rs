//! Command-line interface.

pub mod serve;

use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pavo", version, about = "Pavo development server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Colorize terminal output
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the development server
    Serve {
        /// Project root (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Override the configured HTTP port
        #[arg(long)]
        port: Option<u16>,
    },
}
