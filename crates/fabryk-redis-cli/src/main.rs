//! `fabryk-redis` binary entry point.

use clap::Parser;
use fabryk_redis_cli::{CliArgs, app};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = CliArgs::parse();
    match app::run(args).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
