//! # Saorsa Canvas CLI
//!
//! Opens a stored scene and applies JSON commands to it.

use std::sync::Arc;

use canvas_cli::{run_commands, write_response, CliArgs, CliConfig};
use canvas_core::RandomIds;
use canvas_host::{CommandDispatcher, FileRepository};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing on stderr with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: warn,canvas_cli=info).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,canvas_cli=info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = CliConfig::from(CliArgs::parse());
    tracing::info!(
        "Opening scene {} in {}",
        config.scene,
        config.data_dir.display()
    );

    let repository = FileRepository::new(&config.data_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to prepare data directory {}: {}",
            config.data_dir.display(),
            e
        )
    })?;
    let dispatcher = CommandDispatcher::open(
        Arc::new(repository),
        config.scene.clone(),
        Box::new(RandomIds),
        config.load_timeout,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to open scene {}: {}", config.scene, e))?;

    let mut stdout = tokio::io::stdout();
    if let Some(raw) = config.command.as_deref() {
        let response = dispatcher.dispatch_json(raw).await;
        write_response(&mut stdout, &response).await?;
    } else {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        run_commands(&dispatcher, stdin, &mut stdout).await?;
    }

    // Pending saves must land before the runtime shuts down.
    dispatcher.flush().await;
    tracing::info!("Scene {} saved", config.scene);
    Ok(())
}
