//! Render surface abstraction
//!
//! The engine and simulator drive whatever renders the screens through
//! [`RenderSurface`]. [`HeadlessSurface`] keeps the rendered state in memory.

pub mod headless;

pub use headless::{FieldState, HeadlessSurface, SurfaceEvent, SurfaceEventKind};

use crate::workflow::{BoundingBox, Point, Screen};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The surface as shared between the engine (sole writer) and the render host
pub type SharedSurface = Arc<Mutex<dyn RenderSurface>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Move,
    Down,
    Up,
    Click,
    DoubleClick,
    ContextMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Point,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, position: Point) -> Self {
        Self { kind, position }
    }
}

/// Geometry of one rendered element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementGeometry {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl ElementGeometry {
    pub fn from_box(id: impl Into<String>, bounds: &BoundingBox) -> Self {
        let center = bounds.center();
        Self {
            id: id.into(),
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            center_x: center.x,
            center_y: center.y,
        }
    }
}

/// Snapshot of every element rendered on the active screen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    pub screen: Option<String>,
    pub elements: BTreeMap<String, ElementGeometry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 1200,
            height: 800,
        }
    }
}

pub trait RenderSurface: Send {
    /// Replace the visual tree with `screen`
    fn navigate(&mut self, screen: &Screen);

    fn current_screen(&self) -> Option<String>;

    fn element_bounds(&self, element_id: &str) -> Option<BoundingBox>;

    fn geometry(&self) -> GeometrySnapshot;

    /// Deliver a pointer event to whatever occupies `event.position`
    fn dispatch_pointer(&mut self, event: PointerEvent);

    /// Visual pressed state of the pointer
    fn set_pressed(&mut self, pressed: bool);

    /// Insert one character at the caret of the focused element.
    /// Returns false when nothing focused accepts text.
    fn insert_text(&mut self, ch: char) -> bool;

    fn press_key(&mut self, key: &str);

    fn select_option(&mut self, element_id: &str, option: &str) -> bool;

    fn scroll_by(&mut self, dx: f64, dy: f64);

    fn focus(&mut self, element_id: &str) -> bool;

    fn blur(&mut self);

    fn focused_element(&self) -> Option<String>;

    /// `None` clears the highlight
    fn set_highlight(&mut self, element_id: Option<&str>);

    fn focus_window(&mut self);

    fn window_bounds(&self) -> WindowBounds;
}
