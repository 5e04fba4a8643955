//! Correlated requests from the control endpoint to the render context
//!
//! Each request gets a monotonically increasing id and a slot in the
//! pending table. The slot is removed on reply, on timeout, or when the
//! waiting future is dropped, whichever comes first.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use shellplay_core::surface::{ElementGeometry, GeometrySnapshot, WindowBounds};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("render surface did not answer within {0:?}")]
    Timeout(Duration),
    #[error("render host is not running")]
    Disconnected,
    #[error("request dropped before a reply arrived")]
    Dropped,
    #[error("render host sent an unexpected reply")]
    UnexpectedReply,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub geometry_timeout: Duration,
    pub focus_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            geometry_timeout: Duration::from_secs(3),
            focus_timeout: Duration::from_secs(1),
        }
    }
}

impl BridgeConfig {
    pub fn geometry_timeout(mut self, timeout: Duration) -> Self {
        self.geometry_timeout = timeout;
        self
    }

    pub fn focus_timeout(mut self, timeout: Duration) -> Self {
        self.focus_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceRequest {
    Status,
    Geometry,
    Element(String),
    Focused,
    Highlight(String),
    Focus(String),
    FocusWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceReply {
    Status {
        screen: Option<String>,
        window: WindowBounds,
    },
    Geometry(GeometrySnapshot),
    Element(Option<ElementGeometry>),
    Focused(Option<String>),
    Ack(bool),
}

#[derive(Debug)]
pub enum HostMessage {
    Request { id: u64, request: SurfaceRequest },
    Shutdown,
}

pub struct RenderBridge {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<SurfaceReply>>>,
    outbound: Sender<HostMessage>,
    config: BridgeConfig,
}

/// Evicts a pending slot however the request ends
struct PendingSlot<'a> {
    bridge: &'a RenderBridge,
    id: u64,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.bridge.pending.lock().remove(&self.id);
    }
}

impl RenderBridge {
    /// The receiver goes to whoever owns the render surface
    pub fn new(config: BridgeConfig) -> (Arc<Self>, Receiver<HostMessage>) {
        let (outbound, inbound) = unbounded();
        let bridge = Arc::new(Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            outbound,
            config,
        });
        (bridge, inbound)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub async fn request(
        &self,
        request: SurfaceRequest,
        timeout: Duration,
    ) -> Result<SurfaceReply, QueryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        let _slot = PendingSlot { bridge: self, id };

        debug!(id, ?request, "surface request");
        self.outbound
            .send(HostMessage::Request { id, request })
            .map_err(|_| QueryError::Disconnected)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(QueryError::Dropped),
            Err(_) => {
                warn!(id, ?timeout, "surface request timed out");
                Err(QueryError::Timeout(timeout))
            }
        }
    }

    /// Complete request `id`. False when it already timed out or was dropped.
    pub fn fulfil(&self, id: u64, reply: SurfaceReply) -> bool {
        let Some(tx) = self.pending.lock().remove(&id) else {
            debug!(id, "reply for evicted request");
            return false;
        };
        tx.send(reply).is_ok()
    }

    /// Fail every outstanding request, e.g. when the host shuts down
    pub fn abandon_all(&self) {
        let dropped = self.pending.lock().drain().count();
        if dropped > 0 {
            debug!(dropped, "abandoned pending surface requests");
        }
    }

    /// Ask the host thread to exit
    pub fn shutdown(&self) {
        let _ = self.outbound.send(HostMessage::Shutdown);
    }

    pub async fn status(&self) -> Result<(Option<String>, WindowBounds), QueryError> {
        match self.request(SurfaceRequest::Status, self.config.focus_timeout).await? {
            SurfaceReply::Status { screen, window } => Ok((screen, window)),
            _ => Err(QueryError::UnexpectedReply),
        }
    }

    pub async fn geometry(&self) -> Result<GeometrySnapshot, QueryError> {
        match self.request(SurfaceRequest::Geometry, self.config.geometry_timeout).await? {
            SurfaceReply::Geometry(snapshot) => Ok(snapshot),
            _ => Err(QueryError::UnexpectedReply),
        }
    }

    pub async fn element(&self, element_id: &str) -> Result<Option<ElementGeometry>, QueryError> {
        let request = SurfaceRequest::Element(element_id.to_string());
        match self.request(request, self.config.geometry_timeout).await? {
            SurfaceReply::Element(geometry) => Ok(geometry),
            _ => Err(QueryError::UnexpectedReply),
        }
    }

    pub async fn focused_element(&self) -> Result<Option<String>, QueryError> {
        match self.request(SurfaceRequest::Focused, self.config.focus_timeout).await? {
            SurfaceReply::Focused(id) => Ok(id),
            _ => Err(QueryError::UnexpectedReply),
        }
    }

    pub async fn highlight(&self, element_id: &str) -> Result<bool, QueryError> {
        self.ack(SurfaceRequest::Highlight(element_id.to_string())).await
    }

    pub async fn focus(&self, element_id: &str) -> Result<bool, QueryError> {
        self.ack(SurfaceRequest::Focus(element_id.to_string())).await
    }

    pub async fn focus_window(&self) -> Result<bool, QueryError> {
        self.ack(SurfaceRequest::FocusWindow).await
    }

    async fn ack(&self, request: SurfaceRequest) -> Result<bool, QueryError> {
        match self.request(request, self.config.focus_timeout).await? {
            SurfaceReply::Ack(ok) => Ok(ok),
            _ => Err(QueryError::UnexpectedReply),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out_and_is_evicted() {
        let (bridge, _inbound) = RenderBridge::new(BridgeConfig::default());
        let err = bridge.geometry().await.unwrap_err();
        assert_eq!(err, QueryError::Timeout(Duration::from_secs(3)));
        assert_eq!(bridge.pending_count(), 0);

        let err = bridge.focused_element().await.unwrap_err();
        assert_eq!(err, QueryError::Timeout(Duration::from_secs(1)));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn missing_host_reports_disconnected() {
        let (bridge, inbound) = RenderBridge::new(BridgeConfig::default());
        drop(inbound);
        assert_eq!(bridge.geometry().await.unwrap_err(), QueryError::Disconnected);
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn reply_resolves_matching_request() {
        let (bridge, inbound) = RenderBridge::new(BridgeConfig::default());
        let responder = bridge.clone();
        std::thread::spawn(move || {
            while let Ok(HostMessage::Request { id, .. }) = inbound.recv() {
                responder.fulfil(id, SurfaceReply::Focused(Some("email".into())));
            }
        });
        assert_eq!(bridge.focused_element().await.unwrap().as_deref(), Some("email"));
        assert_eq!(bridge.focused_element().await.unwrap().as_deref(), Some("email"));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn abandoned_requests_resolve_as_dropped() {
        let (bridge, inbound) = RenderBridge::new(BridgeConfig::default());
        let host = bridge.clone();
        std::thread::spawn(move || {
            if inbound.recv().is_ok() {
                host.abandon_all();
            }
        });
        assert_eq!(bridge.focus("x").await.unwrap_err(), QueryError::Dropped);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_future_evicts_the_slot() {
        let (bridge, _inbound) = RenderBridge::new(BridgeConfig::default());
        let mut pending = Box::pin(bridge.geometry());
        tokio::select! {
            _ = &mut pending => unreachable!(),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
        assert_eq!(bridge.pending_count(), 1);
        drop(pending);
        assert_eq!(bridge.pending_count(), 0);
    }
}
