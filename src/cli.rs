use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "confapply", about = "Apply declarative config file templates", version)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply a request file to the filesystem
    Apply {
        /// Request file (JSON), or `-` to read from stdin
        #[arg(default_value = "apply.json")]
        file: String,
    },
    /// Resolve a pid specifier and print the result
    Pid { spec: String },
    /// Write a sample apply.json to the current directory
    Init,
}
