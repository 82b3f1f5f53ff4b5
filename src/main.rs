mod actuator;
mod board;
mod config;
mod http;

use actuator::DeliveryChannel;
use anyhow::{Context, Result};
use board::{FirmataBoard, ServoDriver};
use clap::Parser;
use config::{BridgeConfig, Cli};
use http::{create_router, serve, ServerContext};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How long open requests may hold up shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Exits with usage before anything is opened when --port is missing
    let config = BridgeConfig::try_from(Cli::parse())?;

    info!("Connecting to {}", config.board.port);
    let board = FirmataBoard::connect(&config.board).await?;
    let board_info = board.info().await;
    if let (Some(name), Some(version)) = (&board_info.firmware_name, board_info.firmware_version) {
        info!("Board firmware: {} {}", name, version);
    }
    if let Some(protocol) = board_info.protocol {
        info!("Board ready (Firmata {})", protocol);
    }

    let steering_servo = ServoDriver::new("steering", board.clone(), config.steering_pin)
        .with_pulse_range(config.pulse_range);
    info!("Using pin {} as steering", steering_servo.pin());
    let speed_servo = ServoDriver::new("speed", board, config.speed_pin)
        .with_pulse_range(config.pulse_range);
    info!("Using pin {} as speed", speed_servo.pin());

    // One worker per servo so each only sees one command at a time
    let (steering, steering_task) = DeliveryChannel::spawn(steering_servo);
    let (speed, speed_task) = DeliveryChannel::spawn(speed_servo);

    let ctx = ServerContext::new(steering, speed)
        .with_value_policy(config.value_policy)
        .with_hardware_errors(config.hardware_errors);
    let app = create_router(ctx);

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!("HTTP server listening on {}", config.listen);

    serve(listener, app, shutdown_signal(), SHUTDOWN_GRACE).await?;

    // Router is gone, so the workers stop once their last move returns
    info!("Shutting down");
    let drain = async {
        let _ = tokio::join!(steering_task, speed_task);
    };
    if timeout(Duration::from_secs(1), drain).await.is_err() {
        warn!("Servo workers still busy, exiting anyway");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
