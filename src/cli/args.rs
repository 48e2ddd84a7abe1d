//! CLI type definitions: clap command structures for the `piv` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "piv")]
#[command(about = "piv-supervisor — watches a fleet of autonomous orchestrators", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bootstrap a new project and register it with the supervisor
    Init {
        /// Target directory for the new project
        path: PathBuf,

        /// Friendly project name (defaults to the directory's file name)
        #[arg(long)]
        name: Option<String>,

        /// Framework source directory to copy assets from (defaults to
        /// `interventor.framework_source_dir` in the supervisor config)
        #[arg(long)]
        from: Option<String>,

        /// Overwrite an existing non-empty target directory
        #[arg(long)]
        force: bool,
    },

    /// Print the registry contents
    Status,

    /// Remove a project from the registry (it is never watched or
    /// restarted by the supervisor again until re-registered)
    Deregister {
        /// Registered project name
        name: String,
    },

    /// Run the monitor loop
    Monitor {
        /// Run exactly one cycle and exit instead of looping
        #[arg(long)]
        once: bool,
    },
}
