//! Playback lifecycle notifications
//!
//! The engine publishes typed events to any number of subscribers over
//! crossbeam channels. It never calls observer code directly.

use crate::workflow::{Action, Screen};
pub use crossbeam_channel::{Receiver, Sender};
use crossbeam_channel::unbounded;
use serde::Serialize;
use std::time::Duration;

/// Identity of a screen as carried on events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenRef {
    pub id: String,
    pub name: String,
}

impl From<&Screen> for ScreenRef {
    fn from(screen: &Screen) -> Self {
        Self {
            id: screen.id.clone(),
            name: screen.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    Started { from_index: usize, total: usize },
    ScreenChanged { screen: ScreenRef },
    ActionExecuted { index: usize, action: Action, screen: ScreenRef },
    ActionSkipped { index: usize, action_id: String, reason: String },
    Paused { index: usize },
    Resumed { index: usize },
    Stopped { index: usize },
    Looped { iteration: u64 },
    Completed { total: usize },
    Reset,
}

/// Fan-out sender held by the engine
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<PlaybackEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        Subscription { rx }
    }

    /// Deliver to every live subscriber, dropping the ones that hung up
    pub fn emit(&mut self, event: PlaybackEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Receiving end of an [`EventBus`]
pub struct Subscription {
    rx: Receiver<PlaybackEvent>,
}

impl Subscription {
    /// Get the underlying receiver (for select! etc)
    pub fn receiver(&self) -> &Receiver<PlaybackEvent> {
        &self.rx
    }

    /// Try receive without blocking
    pub fn try_recv(&self) -> Option<PlaybackEvent> {
        self.rx.try_recv().ok()
    }

    /// Blocking receive
    pub fn recv(&self) -> Option<PlaybackEvent> {
        self.rx.recv().ok()
    }

    /// Receive with timeout
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PlaybackEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Everything queued so far
    pub fn drain(&self) -> Vec<PlaybackEvent> {
        self.rx.try_iter().collect()
    }
}

impl Iterator for Subscription {
    type Item = PlaybackEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}
