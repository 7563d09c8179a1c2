use anyhow::Result;
use std::process::ExitCode;
use warden::cli::{self, telemetry};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let (action, globals) = cli::start()?;

    let code = action.execute(&globals).await;

    telemetry::shutdown_tracer();

    Ok(code)
}
