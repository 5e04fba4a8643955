//! shellplay-core - Deterministic, humanlike replay of recorded UI workflows
//!
//! A [`WorkflowEngine`] walks the actions of a [`WorkflowDocument`] across
//! its screens, delegating pointer motion and keystroke timing to the
//! [`BehaviorSimulator`] and rendering through a [`RenderSurface`].
//! Lifecycle is reported as typed [`PlaybackEvent`]s on channels.
//!
//! Every wait goes through an injected [`Clock`] and every random draw
//! through a seedable [`Jitter`], so tests run on virtual time.

pub mod behavior;
pub mod clock;
pub mod control;
pub mod engine;
pub mod error;
pub mod events;
pub mod jitter;
pub mod player;
pub mod storage;
pub mod surface;
pub mod workflow;

pub use behavior::{BehaviorConfig, BehaviorSimulator, Motion};
pub use clock::{Clock, SystemClock, VirtualClock};
pub use control::PlaybackControl;
pub use engine::{EngineConfig, PlaybackState, PlaybackStats, PlaybackStatus, WorkflowEngine};
pub use error::{Error, ErrorCode, Result};
pub use events::{EventBus, PlaybackEvent, ScreenRef, Subscription};
pub use jitter::Jitter;
pub use player::{Player, PlayerCommands, PlayerHandle};
pub use storage::WorkflowStorage;
pub use surface::{HeadlessSurface, RenderSurface, SharedSurface};
pub use workflow::{
    Action, ActionType, BoundingBox, ElementType, Point, Screen, UIElement, WorkflowDocument,
};

pub mod prelude {
    pub use crate::behavior::{BehaviorConfig, BehaviorSimulator};
    pub use crate::clock::{Clock, SystemClock, VirtualClock};
    pub use crate::engine::{EngineConfig, PlaybackState, PlaybackStatus, WorkflowEngine};
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::events::{PlaybackEvent, Subscription};
    pub use crate::player::{Player, PlayerCommands, PlayerHandle};
    pub use crate::storage::WorkflowStorage;
    pub use crate::surface::{HeadlessSurface, RenderSurface, SharedSurface};
    pub use crate::workflow::{Action, ActionType, Point, Screen, UIElement, WorkflowDocument};
}

/// Wrap a surface for sharing between the engine and a render host
pub fn share<S: RenderSurface + 'static>(surface: S) -> SharedSurface {
    std::sync::Arc::new(parking_lot::Mutex::new(surface))
}
