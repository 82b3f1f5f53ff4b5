//! Serving with a bounded shutdown

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{info, warn};

/// Serve `app` until `signal` resolves, then give open requests `grace` to finish
///
/// A request parked on a servo that never takes its value would hold a plain
/// graceful shutdown open forever, so whatever is left after `grace` is dropped.
pub async fn serve<F>(listener: TcpListener, app: Router, signal: F, grace: Duration) -> Result<()>
where
    F: Future<Output = ()>,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            return result.context("HTTP server task failed")?.context("HTTP server failed");
        }
        _ = signal => {}
    }

    info!("Shutdown requested, waiting up to {:?} for open requests", grace);
    let _ = stop_tx.send(());

    match timeout(grace, &mut server).await {
        Ok(result) => result
            .context("HTTP server task failed")?
            .context("HTTP server failed"),
        Err(_) => {
            warn!("Requests still in flight after {:?}, dropping them", grace);
            server.abort();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::mock::MockActuator;
    use crate::actuator::DeliveryChannel;
    use crate::http::{create_router, ServerContext};
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn send_post(addr: SocketAddr, path: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.expect("connect failed");
        let request = format!("POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n");
        stream
            .write_all(request.as_bytes())
            .await
            .expect("write failed");
        stream
    }

    async fn start(
        steering: MockActuator,
        grace: Duration,
    ) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<Result<()>>) {
        let (speed, _) = MockActuator::new("speed");
        let (steering, _) = DeliveryChannel::spawn(steering);
        let (speed, _) = DeliveryChannel::spawn(speed);
        let app = create_router(ServerContext::new(steering, speed));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = listener.local_addr().expect("no local address");
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            app,
            async move {
                let _ = stop_rx.await;
            },
            grace,
        ));

        (addr, stop_tx, server)
    }

    #[tokio::test]
    async fn test_idle_server_stops_on_signal() {
        let (steering, _) = MockActuator::new("steering");
        let (_addr, stop_tx, server) = start(steering, Duration::from_secs(5)).await;

        stop_tx.send(()).expect("server already gone");
        timeout(Duration::from_secs(1), server)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
            .expect("server failed");
    }

    #[tokio::test]
    async fn test_stuck_request_does_not_hold_shutdown() {
        let (steering, _log, _gate) = MockActuator::gated("steering");
        let (addr, stop_tx, server) = start(steering, Duration::from_millis(200)).await;

        // The worker takes the first value and parks inside the move
        let mut first = send_post(addr, "/steering/1").await;
        let mut reply = [0u8; 12];
        first.read_exact(&mut reply).await.expect("read failed");
        assert_eq!(&reply, b"HTTP/1.1 200");

        // The second is never taken, so its request stays open
        let _second = send_post(addr, "/steering/2").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        stop_tx.send(()).expect("server already gone");
        timeout(Duration::from_secs(2), server)
            .await
            .expect("shutdown waited on the stuck request")
            .expect("server task panicked")
            .expect("server failed");
    }
}
