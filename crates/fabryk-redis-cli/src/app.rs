//! Command dispatch for the `fabryk-redis` binary.

use fabryk_redis::{RedisExecutor, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::{BaseCommand, CliArgs, IndexAction, IndexCommand, SchemaAction};
use crate::config::RedisCliConfig;
use crate::config_handlers;
use crate::index_handlers::{self, DefinitionOptions};

/// Binary name used in version output.
pub const APP_NAME: &str = "fabryk-redis";

/// Log targets of this tool and the library it drives.
const LOG_TARGETS: [&str; 2] = ["fabryk_redis", "fabryk_redis_cli"];

/// Filter directives for the verbosity flags.
///
/// Other crates (redis, tokio) stay at `warn` unless `--verbose` is given,
/// which lifts them to `info` and our own targets to `debug`.
pub fn filter_directives(verbose: bool, quiet: bool) -> String {
    let (ours, others) = match (quiet, verbose) {
        (true, _) => ("warn", "warn"),
        (false, true) => ("debug", "info"),
        (false, false) => ("info", "warn"),
    };
    std::iter::once(others.to_string())
        .chain(LOG_TARGETS.iter().map(|target| format!("{target}={ours}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the tracing subscriber; `RUST_LOG` overrides the flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbose, quiet)));

    // A subscriber may already be installed (tests).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run the CLI with the given arguments.
pub async fn run(args: CliArgs) -> Result<()> {
    init_logging(args.verbose, args.quiet);
    let config_path = args.config.as_deref();

    match args.command {
        Some(BaseCommand::Version) => {
            println!("{APP_NAME} {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(BaseCommand::Config(cmd)) => {
            config_handlers::handle_config_command(config_path, cmd.command)
        }
        Some(BaseCommand::Schema(cmd)) => {
            let config = RedisCliConfig::load(config_path)?;
            match cmd.command {
                SchemaAction::Compile {
                    schema,
                    index,
                    prefixes,
                    storage,
                } => {
                    let options = DefinitionOptions {
                        schema: Some(schema),
                        index,
                        prefixes,
                        storage,
                    };
                    println!(
                        "{}",
                        index_handlers::handle_schema_compile(&config.redis, options)?
                    );
                    Ok(())
                }
            }
        }
        Some(BaseCommand::Index(cmd)) => {
            let config = RedisCliConfig::load(config_path)?;
            handle_index(&config, cmd).await
        }
        None => {
            println!(
                "{APP_NAME} {} (use --help for usage)",
                env!("CARGO_PKG_VERSION")
            );
            Ok(())
        }
    }
}

async fn handle_index(config: &RedisCliConfig, cmd: IndexCommand) -> Result<()> {
    let name = cmd
        .index
        .clone()
        .unwrap_or_else(|| config.redis.index_name.clone());
    tracing::debug!(url = %config.redis.url, index = %name, "connecting");
    let executor = RedisExecutor::connect(&config.redis.url).await?;

    match cmd.command {
        IndexAction::Exists => {
            let exists = index_handlers::handle_index_exists(&executor, &name).await?;
            println!("{name}: {}", if exists { "exists" } else { "missing" });
        }
        IndexAction::Create { schema } => {
            let options = DefinitionOptions {
                schema,
                index: Some(name.clone()),
                ..Default::default()
            };
            let definition = index_handlers::build_definition(&config.redis, options)?;
            if index_handlers::handle_index_create(&executor, &definition).await? {
                println!("Created index {name}");
            } else {
                println!("Index {name} already exists");
            }
        }
        IndexAction::Drop { delete_documents } => {
            index_handlers::handle_index_drop(&executor, &name, delete_documents).await?;
            println!("Dropped index {name}");
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
