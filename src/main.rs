//! Pavo - development server and request router for page-based web apps.

#![allow(dead_code)]

mod build;
mod bundler;
mod cli;
mod config;
mod core;
mod diagnostics;
mod handler;
mod logger;
mod page;
mod preview;
mod reload;
mod router;
mod static_paths;
mod utils;
mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};

use bundler::CommandBundler;
use cli::{Cli, Commands};
use cli::serve::DevServer;
use config::ProjectConfig;
use static_paths::DiskLoader;
use utils::normalize_path;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match cli.command {
        Commands::Serve { root, port } => serve(root, port),
    }
}

fn serve(root: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let root = match root {
        Some(root) => normalize_path(&root),
        None => std::env::current_dir()?,
    };

    let mut config = ProjectConfig::load(&root)?;
    if let Some(port) = port {
        config.serve.port = port;
    }
    let config = Arc::new(config);

    let bundler = Arc::new(CommandBundler::new(Arc::clone(&config)));
    let loader = Arc::new(DiskLoader::new(config.output_server_dir()));
    let server = Arc::new(DevServer::new(Arc::clone(&config), bundler, loader)?);

    // Bind first so early requests queue while subsystems start
    let bound = cli::serve::bind_server(&config)?;
    server.start()?;

    bound.run(server)
}
