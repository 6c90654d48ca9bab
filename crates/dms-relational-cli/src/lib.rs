mod command;
mod config;
mod input;
mod theme;

pub use config::*;
pub use input::load_effective_schema;

use anyhow::Result;
use clap::Parser;
use command::{BuildCommand, InspectCommand, ManifestCommand};
use std::path::PathBuf;

/// Command-line front end over the relational model builder
pub struct DmsRelationalCli {
    config: Option<Config>,
}

impl DmsRelationalCli {
    /// Create a CLI that reads its configuration from disk
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Create a CLI with a fixed configuration, ignoring config files
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Some(config),
        }
    }

    /// Parse and execute CLI commands from command-line arguments
    pub fn parse_and_run(&self) -> Result<()> {
        let cli = Cli::parse();
        self.run(cli)
    }

    /// Parse and execute CLI commands from an iterator of arguments
    pub fn parse_from<I, T>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::parse_from(args);
        self.run(cli)
    }

    fn run(&self, cli: Cli) -> Result<()> {
        let mut config = match &self.config {
            Some(config) => config.clone(),
            None => Config::load_or_default(cli.config.as_deref())?,
        };

        if let Some(dialect) = &cli.dialect {
            config = config.dialect(dialect.parse()?);
        }

        log::debug!("using dialect {}", config.dialect);

        match cli.command {
            Command::Build(cmd) => cmd.run(&config),
            Command::Manifest(cmd) => cmd.run(&config),
            Command::Inspect(cmd) => cmd.run(&config),
        }
    }
}

impl Default for DmsRelationalCli {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Parser, Debug)]
#[command(name = "dms-relational")]
#[command(about = "Derives the relational model of an Ed-Fi effective schema set")]
#[command(version)]
struct Cli {
    /// Configuration file; defaults to ./dms-relational.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target dialect (pgsql or mssql), overriding the configuration
    #[arg(long, global = true)]
    dialect: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Build the model and report a summary
    Build(BuildCommand),

    /// Build the model and write its manifests
    Manifest(ManifestCommand),

    /// Print the derived tables of one resource
    Inspect(InspectCommand),
}
