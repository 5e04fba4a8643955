//! shellplay-remote - Let an external harness drive and observe playback
//!
//! The HTTP endpoint never touches the render surface directly. Surface
//! reads go through a [`RenderBridge`] to a [`SurfaceHost`] thread and are
//! correlated by request id with per-request timeouts.

pub mod bridge;
pub mod host;
pub mod server;
pub mod service;

pub use bridge::{BridgeConfig, QueryError, RenderBridge, SurfaceReply, SurfaceRequest};
pub use host::SurfaceHost;
pub use server::{router, serve, RemoteConfig};
pub use service::{ControlService, PlaybackCommand};

use anyhow::{Context, Result};
use shellplay_core::player::PlayerCommands;
use shellplay_core::surface::SharedSurface;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::runtime::Runtime;
use tracing::error;

/// Bridge, render host and HTTP server on their own runtime, for sync callers
pub struct RemoteServer {
    runtime: Option<Runtime>,
    bridge: Arc<RenderBridge>,
    host: Option<JoinHandle<()>>,
    addr: SocketAddr,
}

impl RemoteServer {
    pub fn start(config: RemoteConfig, surface: SharedSurface, player: PlayerCommands) -> Result<Self> {
        Self::start_with(config, BridgeConfig::default(), surface, player)
    }

    pub fn start_with(
        config: RemoteConfig,
        bridge_config: BridgeConfig,
        surface: SharedSurface,
        player: PlayerCommands,
    ) -> Result<Self> {
        let (bridge, inbound) = RenderBridge::new(bridge_config);
        let host = SurfaceHost::new(surface, bridge.clone(), inbound)
            .highlight_duration(config.highlight_duration)
            .spawn()
            .context("Failed to spawn render host")?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("shellplay-remote")
            .build()
            .context("Failed to build tokio runtime")?;
        let listener = runtime
            .block_on(server::bind(&config))
            .with_context(|| format!("Failed to bind {}", config.addr()))?;
        let addr = listener.local_addr()?;

        let service = Arc::new(ControlService::new(bridge.clone(), player));
        runtime.spawn(async move {
            if let Err(e) = serve(listener, service).await {
                error!(error = %e, "remote control server failed");
            }
        });

        Ok(Self {
            runtime: Some(runtime),
            bridge,
            host: Some(host),
            addr,
        })
    }

    /// Actual bound address (useful with port 0)
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn bridge(&self) -> &Arc<RenderBridge> {
        &self.bridge
    }
}

impl Drop for RemoteServer {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        self.bridge.shutdown();
        if let Some(host) = self.host.take() {
            let _ = host.join();
        }
    }
}
