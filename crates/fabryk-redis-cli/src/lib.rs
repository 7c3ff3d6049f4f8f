//! Command-line front end for `fabryk-redis`.
//!
//! - `schema compile`: turn a JSON/YAML schema document into the exact
//!   `FT.CREATE` command, without a server.
//! - `index exists|create|drop`: manage an index on the configured server.
//! - `config path|init|show`: locate, create and inspect the config file.

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod index_handlers;

pub use cli::CliArgs;
pub use config::RedisCliConfig;
