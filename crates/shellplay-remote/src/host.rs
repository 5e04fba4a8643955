//! Render-context side of the bridge
//!
//! Owns query servicing for one surface: takes a brief lock per request,
//! answers with snapshot copies and clears highlights when they expire.

use crate::bridge::{HostMessage, RenderBridge, SurfaceReply, SurfaceRequest};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use shellplay_core::surface::{ElementGeometry, SharedSurface};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct SurfaceHost {
    surface: SharedSurface,
    bridge: Arc<RenderBridge>,
    inbound: Receiver<HostMessage>,
    highlight_duration: Duration,
    clear_at: Option<Instant>,
}

impl SurfaceHost {
    pub fn new(surface: SharedSurface, bridge: Arc<RenderBridge>, inbound: Receiver<HostMessage>) -> Self {
        Self {
            surface,
            bridge,
            inbound,
            highlight_duration: Duration::from_millis(500),
            clear_at: None,
        }
    }

    pub fn highlight_duration(mut self, duration: Duration) -> Self {
        self.highlight_duration = duration;
        self
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("shellplay-render-host".into())
            .spawn(move || self.run())
    }

    /// Serve until shutdown or until every bridge handle is gone
    pub fn run(mut self) {
        info!("render host started");
        loop {
            let next = match self.clear_at {
                Some(deadline) => self.inbound.recv_deadline(deadline),
                None => self.inbound.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok(HostMessage::Request { id, request }) => {
                    let reply = self.serve(request);
                    self.bridge.fulfil(id, reply);
                }
                Ok(HostMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    debug!("highlight expired");
                    self.surface.lock().set_highlight(None);
                    self.clear_at = None;
                }
            }
        }
        self.bridge.abandon_all();
        info!("render host stopped");
    }

    fn serve(&mut self, request: SurfaceRequest) -> SurfaceReply {
        let mut surface = self.surface.lock();
        match request {
            SurfaceRequest::Status => SurfaceReply::Status {
                screen: surface.current_screen(),
                window: surface.window_bounds(),
            },
            SurfaceRequest::Geometry => SurfaceReply::Geometry(surface.geometry()),
            SurfaceRequest::Element(id) => SurfaceReply::Element(
                surface
                    .element_bounds(&id)
                    .map(|bounds| ElementGeometry::from_box(&id, &bounds)),
            ),
            SurfaceRequest::Focused => SurfaceReply::Focused(surface.focused_element()),
            SurfaceRequest::Highlight(id) => {
                if surface.element_bounds(&id).is_none() {
                    return SurfaceReply::Ack(false);
                }
                surface.set_highlight(Some(&id));
                self.clear_at = Some(Instant::now() + self.highlight_duration);
                SurfaceReply::Ack(true)
            }
            SurfaceRequest::Focus(id) => SurfaceReply::Ack(surface.focus(&id)),
            SurfaceRequest::FocusWindow => {
                surface.focus_window();
                SurfaceReply::Ack(true)
            }
        }
    }
}
