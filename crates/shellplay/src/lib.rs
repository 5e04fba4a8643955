//! # shellplay
//!
//! Replays recorded business-application workflows with humanlike pointer
//! motion and typing, so capture and analysis tools can be exercised
//! against realistic, reproducible UI traffic.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shellplay::prelude::*;
//! use std::sync::Arc;
//!
//! let doc = WorkflowDocument::from_file("signup.json")?;
//! let surface = shellplay::share(HeadlessSurface::new(&doc));
//! let mut engine = WorkflowEngine::new(Arc::new(doc), surface, EngineConfig::default());
//! let events = engine.subscribe();
//!
//! let player = Player::spawn(engine)?;
//! player.start();
//! for event in events {
//!     println!("{:?}", event);
//!     if matches!(event, PlaybackEvent::Completed { .. }) {
//!         break;
//!     }
//! }
//! # Ok::<(), shellplay::Error>(())
//! ```

// Re-export the playback core
pub use shellplay_core::*;

// Re-export the remote control endpoint
pub use shellplay_remote as remote;

pub use shellplay_remote::{RemoteConfig, RemoteServer};

/// Prelude - import everything you need
pub mod prelude {
    pub use shellplay_core::prelude::*;

    pub use shellplay_remote::{BridgeConfig, ControlService, RemoteConfig, RemoteServer};
}
