use actix_web::dev::ServerHandle;
use anyhow::anyhow;
use blink_common::validation::is_valid_address;
use blink_server::{
    cli::Cli,
    demo::{donate_action, DonateConfig},
    runtime::ActionRuntime,
    services::{ServiceError, ServicesBuilder},
};
use clap::Parser;
use futures03::future::select_all;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), anyhow::Error> {
    let cli: Cli = Cli::parse();
    run_server(cli)
}

fn create_tracing_subscriber(verbose: bool) -> Result<(), anyhow::Error> {
    let log_level = if verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to set up logging subscriber: {e}"))
}

#[tokio::main]
async fn run_server(cli: Cli) -> Result<(), anyhow::Error> {
    create_tracing_subscriber(cli.verbose)?;

    if !is_valid_address(&cli.recipient) {
        return Err(anyhow!("Recipient `{}` is not a valid address", cli.recipient));
    }
    let definition = donate_action(&DonateConfig {
        recipient: cli.recipient.clone(),
        chain_id: cli.chain_id,
        icon: cli.icon.clone(),
        base_path: cli.donate_path(),
    })?;

    let (server_handle, server_task) = ServicesBuilder::new()
        .prefix(&cli.prefix)
        .bind(&cli.bind)
        .port(cli.port)
        .register_action("donate", ActionRuntime::new(definition))
        .run()?;
    let server_url = format!("http://{}:{}{}", cli.bind, cli.port, cli.donate_path());
    info!(server_url, "Action server started");

    let shutdown_task = tokio::spawn(shutdown_handler(server_handle));
    let (res, _, _) = select_all([server_task, shutdown_task]).await;
    res.map_err(|e| anyhow!("Server task failed: {e}"))??;
    Ok(())
}

async fn shutdown_handler(server_handle: ServerHandle) -> Result<(), ServiceError> {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm =
        signal(SignalKind::terminate()).map_err(|e| ServiceError::Server(e.to_string()))?;

    tokio::select! {
        _ = ctrl_c => {
            info!("SIGINT (Ctrl+C) received. Shutting down...");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM received. Shutting down...");
        },
    }

    server_handle.stop(true).await;
    Ok(())
}
