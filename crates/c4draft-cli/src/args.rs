//! Command-line argument definitions for the c4draft CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Draft C4 context diagrams from plain-language descriptions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the settings file (JSON), instead of ~/.c4draft/settings.json
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether a description is ready for diagram generation
    Validate {
        /// Description file; stdin when omitted or `-`
        input: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print renderer configuration for a diagram file
    Layout {
        /// Diagram text file
        input: PathBuf,
    },

    /// Generate a diagram from a description
    Generate {
        /// Description file; stdin when omitted or `-`
        input: Option<PathBuf>,

        /// Write the diagram here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a diagram, then refine it interactively
    Edit {
        /// Description file; first stdin line when omitted
        input: Option<PathBuf>,

        /// Default path for `export`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Store AI provider or diagram service settings
    Configure {
        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// Leave empty to keep the stored key
        #[arg(long)]
        api_key: Option<String>,

        /// Base URL of a diagram REST service
        #[arg(long)]
        backend_url: Option<String>,
    },

    /// Print JSON Schemas of the request and response shapes
    Schema,
}
