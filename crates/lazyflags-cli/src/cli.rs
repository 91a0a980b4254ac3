use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lazyflags")]
#[command(bin_name = "lazyflags")]
#[command(version)]
#[command(about = "Browse feature flags across applications, profiles and environments")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Write a diagnostics log under ~/.config/lazyflags/diagnostics"
    )]
    pub diagnostics: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Serve data from a local fixture file instead of the configured source"
    )]
    pub fixture: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Run environment and configuration checks")]
    Doctor,
    #[command(about = "Inspect or clear the flag result cache")]
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    #[command(about = "List cache entries and when they expire")]
    Show,
    #[command(about = "Delete the cache file")]
    Clear,
}
