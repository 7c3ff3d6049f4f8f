//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "fabryk-redis", author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "FABRYK_REDIS_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<BaseCommand>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum BaseCommand {
    /// Schema operations (offline).
    Schema(SchemaCommand),

    /// Index operations against a live server.
    Index(IndexCommand),

    /// Configuration operations.
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

/// Schema-specific subcommands.
#[derive(Parser, Debug)]
pub struct SchemaCommand {
    /// Schema subcommand to execute.
    #[command(subcommand)]
    pub command: SchemaAction,
}

/// Available schema subcommands.
#[derive(Subcommand, Debug)]
pub enum SchemaAction {
    /// Compile a schema document into an `FT.CREATE` command and print it.
    Compile {
        /// Schema document (`.json`, `.yml` or `.yaml`).
        #[arg(short, long)]
        schema: String,

        /// Index name (defaults to the configured index).
        #[arg(short, long)]
        index: Option<String>,

        /// Key prefix; repeat for several (defaults to `doc:<index>`).
        #[arg(short, long = "prefix")]
        prefixes: Vec<String>,

        /// Storage kind: HASH or JSON (defaults to the configured kind).
        #[arg(long)]
        storage: Option<String>,
    },
}

/// Index-specific subcommands.
#[derive(Parser, Debug)]
pub struct IndexCommand {
    /// Index name (defaults to the configured index).
    #[arg(short, long, global = true)]
    pub index: Option<String>,

    /// Index subcommand to execute.
    #[command(subcommand)]
    pub command: IndexAction,
}

/// Available index subcommands.
#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Report whether the index exists.
    Exists,

    /// Create the index from a schema document if it does not exist.
    Create {
        /// Schema document (defaults to the configured `schema_path`).
        #[arg(short, long)]
        schema: Option<String>,
    },

    /// Drop the index.
    Drop {
        /// Also delete the indexed documents.
        #[arg(long)]
        delete_documents: bool,
    },
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration as TOML.
    Show,
}

// ============================================================================
// Tests
// ============================================================================
