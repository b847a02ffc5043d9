//! Shared fixtures for the socket-level integration tests.

use std::time::Duration;

use strider_server::server::bind_ephemeral;
use strider_shared::config::EngineConfig;
use tokio::{
    sync::oneshot::{self, error::TryRecvError},
    task::JoinHandle,
};

/// A server stepping in the background until [`RunningServer::stop`].
pub struct RunningServer {
    pub cfg: EngineConfig,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<u32>>,
}

impl RunningServer {
    /// Binds an ephemeral server, accepts `clients` connections, then steps
    /// every `step_every` until stopped.
    pub async fn start(clients: usize, step_every: Duration) -> anyhow::Result<Self> {
        let (mut server, cfg) = bind_ephemeral(64).await?;
        let (stop, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            for _ in 0..clients {
                server.accept_one().await?;
            }
            loop {
                match stop_rx.try_recv() {
                    Err(TryRecvError::Empty) => {}
                    _ => break,
                }
                server.step().await?;
                tokio::time::sleep(step_every).await;
            }
            Ok(server.tick())
        });

        Ok(Self { cfg, stop, handle })
    }

    /// Stops the loop and returns how many ticks ran.
    pub async fn stop(self) -> anyhow::Result<u32> {
        let _ = self.stop.send(());
        self.handle.await?
    }
}

/// Installs a test-friendly tracing subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}
