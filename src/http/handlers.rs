//! Route handlers

use super::error::ApiError;
use super::state::ServerContext;
use super::value::parse_command_value;
use crate::actuator::DeliveryChannel;
use crate::config::HardwareErrorPolicy;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;

/// POST /steering/:value
pub async fn steering(
    State(ctx): State<ServerContext>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    forward(&ctx, &ctx.steering, &raw).await
}

/// POST /speed/:value
pub async fn speed(
    State(ctx): State<ServerContext>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    forward(&ctx, &ctx.speed, &raw).await
}

async fn forward(
    ctx: &ServerContext,
    channel: &DeliveryChannel,
    raw: &str,
) -> Result<StatusCode, ApiError> {
    let value = parse_command_value(raw, ctx.value_policy)?;
    info!("[HTTP] {} received value: {} -> {}", channel.name(), raw, value);

    match ctx.hardware_errors {
        HardwareErrorPolicy::Ignore => channel.deliver(value).await?,
        HardwareErrorPolicy::Report => channel.deliver_confirmed(value).await?,
    }

    Ok(StatusCode::OK)
}
