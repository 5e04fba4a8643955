//! Pause/stop flags shared between the engine, the simulator and drivers

use std::sync::atomic::{AtomicBool, Ordering};

/// Requests are observed cooperatively: pause between actions, stop
/// between motion samples and keystrokes.
#[derive(Debug, Default)]
pub struct PlaybackControl {
    pause: AtomicBool,
    stop: AtomicBool,
}

impl PlaybackControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn clear_pause(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.pause.store(false, Ordering::SeqCst);
        self.stop.store(false, Ordering::SeqCst);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
