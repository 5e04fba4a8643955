//! In-memory render surface
//!
//! Keeps the state a rendered screen would have (field values, carets,
//! focus, pressed pointer, highlight) and a timestamped log of everything
//! dispatched to it.

use super::{
    ElementGeometry, GeometrySnapshot, PointerEvent, PointerKind, RenderSurface, WindowBounds,
};
use crate::clock::{Clock, SystemClock};
use crate::workflow::{BoundingBox, ElementType, Point, Screen, UIElement, WorkflowDocument};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Editable state of one rendered element
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldState {
    pub value: String,
    /// Caret position in characters
    pub caret: usize,
    pub checked: bool,
}

impl FieldState {
    fn from_element(element: &UIElement) -> Self {
        let value = element.value.clone().unwrap_or_default();
        let checked = element.kind.is_checkable()
            && matches!(value.as_str(), "true" | "on" | "checked" | "1");
        Self {
            caret: value.chars().count(),
            value,
            checked,
        }
    }

    /// Insert at the caret and advance it
    pub fn insert(&mut self, ch: char) {
        let byte = self
            .value
            .char_indices()
            .nth(self.caret)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len());
        self.value.insert(byte, ch);
        self.caret += 1;
    }

    /// Delete the character before the caret
    pub fn backspace(&mut self) {
        if self.caret == 0 {
            return;
        }
        if let Some((byte, _)) = self.value.char_indices().nth(self.caret - 1) {
            self.value.remove(byte);
            self.caret -= 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceEventKind {
    Navigated { screen_id: String },
    Pointer { pointer: PointerKind, position: Point, target: Option<String> },
    Pressed { pressed: bool },
    Input { element_id: String, ch: char, value: String },
    Key { key: String, target: Option<String> },
    Selected { element_id: String, option: String },
    Scrolled { dx: f64, dy: f64 },
    Focused { element_id: String },
    Blurred { element_id: String },
    Highlighted { element_id: Option<String> },
    WindowFocused,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceEvent {
    pub at: Duration,
    #[serde(flatten)]
    pub kind: SurfaceEventKind,
}

/// Events kept before the oldest are dropped
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

pub struct HeadlessSurface {
    screens: HashMap<String, Screen>,
    current: Option<String>,
    fields: HashMap<String, FieldState>,
    focused: Option<String>,
    pointer: Point,
    pressed: bool,
    scroll: (f64, f64),
    highlighted: Option<String>,
    window: WindowBounds,
    window_focused: bool,
    log: VecDeque<SurfaceEvent>,
    log_capacity: usize,
    clock: Arc<dyn Clock>,
}

impl HeadlessSurface {
    pub fn new(document: &WorkflowDocument) -> Self {
        Self {
            screens: document
                .screens
                .iter()
                .map(|s| (s.id.clone(), s.clone()))
                .collect(),
            current: None,
            fields: HashMap::new(),
            focused: None,
            pointer: Point::default(),
            pressed: false,
            scroll: (0.0, 0.0),
            highlighted: None,
            window: WindowBounds::default(),
            window_focused: false,
            log: VecDeque::new(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            clock: Arc::new(SystemClock::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_window(mut self, window: WindowBounds) -> Self {
        self.window = window;
        self
    }

    /// Keep at most `capacity` events; zero disables the log
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self.trim_log();
        self
    }

    /// Most recent events, oldest first
    pub fn events(&self) -> &VecDeque<SurfaceEvent> {
        &self.log
    }

    pub fn clear_events(&mut self) {
        self.log.clear();
    }

    pub fn field(&self, element_id: &str) -> Option<&FieldState> {
        self.fields.get(element_id)
    }

    pub fn value(&self, element_id: &str) -> Option<&str> {
        self.fields.get(element_id).map(|f| f.value.as_str())
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn is_window_focused(&self) -> bool {
        self.window_focused
    }

    pub fn scroll_offset(&self) -> (f64, f64) {
        self.scroll
    }

    fn record(&mut self, kind: SurfaceEventKind) {
        let at = self.clock.now();
        self.log.push_back(SurfaceEvent { at, kind });
        self.trim_log();
    }

    fn trim_log(&mut self) {
        while self.log.len() > self.log_capacity {
            self.log.pop_front();
        }
    }

    fn screen(&self) -> Option<&Screen> {
        self.current.as_deref().and_then(|id| self.screens.get(id))
    }

    fn element(&self, element_id: &str) -> Option<&UIElement> {
        self.screen().and_then(|s| s.element(element_id))
    }

    /// Topmost visible, enabled element under `p`. Later elements paint over earlier ones.
    fn element_at(&self, p: Point) -> Option<&UIElement> {
        self.screen()?
            .elements
            .iter()
            .rev()
            .find(|e| e.visible && e.enabled && e.bounding_box.contains(p))
    }

    fn activate(&mut self, element_id: &str) {
        let Some(kind) = self.element(element_id).map(|e| e.kind) else {
            return;
        };
        if kind.is_checkable() {
            if let Some(field) = self.fields.get_mut(element_id) {
                field.checked = match kind {
                    ElementType::Radio => true,
                    _ => !field.checked,
                };
            }
        }
        if kind.is_focusable() {
            self.focus(element_id);
        }
    }

    fn move_focus(&mut self, forward: bool) {
        let Some(screen) = self.screen() else {
            return;
        };
        let order: Vec<String> = screen
            .elements
            .iter()
            .filter(|e| e.visible && e.enabled && e.kind.is_focusable())
            .map(|e| e.id.clone())
            .collect();
        if order.is_empty() {
            return;
        }
        let pos = self
            .focused
            .as_ref()
            .and_then(|f| order.iter().position(|id| id == f));
        let next = match (pos, forward) {
            (None, true) => 0,
            (None, false) => order.len() - 1,
            (Some(i), true) => (i + 1) % order.len(),
            (Some(i), false) => (i + order.len() - 1) % order.len(),
        };
        let id = order[next].clone();
        self.focus(&id);
    }
}

impl RenderSurface for HeadlessSurface {
    fn navigate(&mut self, screen: &Screen) {
        let screen = self
            .screens
            .entry(screen.id.clone())
            .or_insert_with(|| screen.clone())
            .clone();
        // A fresh render discards field edits and focus
        self.fields = screen
            .elements
            .iter()
            .map(|e| (e.id.clone(), FieldState::from_element(e)))
            .collect();
        self.focused = None;
        self.highlighted = None;
        self.scroll = (0.0, 0.0);
        self.current = Some(screen.id.clone());
        debug!(screen = %screen.id, "surface rendered screen");
        self.record(SurfaceEventKind::Navigated { screen_id: screen.id });
    }

    fn current_screen(&self) -> Option<String> {
        self.current.clone()
    }

    fn element_bounds(&self, element_id: &str) -> Option<BoundingBox> {
        self.element(element_id).map(|e| e.bounding_box)
    }

    fn geometry(&self) -> GeometrySnapshot {
        let elements = self
            .screen()
            .map(|s| {
                s.elements
                    .iter()
                    .filter(|e| e.visible)
                    .map(|e| (e.id.clone(), ElementGeometry::from_box(&e.id, &e.bounding_box)))
                    .collect()
            })
            .unwrap_or_default();
        GeometrySnapshot {
            screen: self.current.clone(),
            elements,
        }
    }

    fn dispatch_pointer(&mut self, event: PointerEvent) {
        self.pointer = event.position;
        let target = self.element_at(event.position).map(|e| e.id.clone());
        if event.kind == PointerKind::Click {
            match target.as_deref() {
                Some(id) => self.activate(id),
                None => self.blur(),
            }
        }
        self.record(SurfaceEventKind::Pointer {
            pointer: event.kind,
            position: event.position,
            target,
        });
    }

    fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
        self.record(SurfaceEventKind::Pressed { pressed });
    }

    fn insert_text(&mut self, ch: char) -> bool {
        let Some(id) = self.focused.clone() else {
            return false;
        };
        if !self.element(&id).map(|e| e.kind.is_text_entry()).unwrap_or(false) {
            return false;
        }
        let Some(field) = self.fields.get_mut(&id) else {
            return false;
        };
        field.insert(ch);
        let value = field.value.clone();
        self.record(SurfaceEventKind::Input {
            element_id: id,
            ch,
            value,
        });
        true
    }

    fn press_key(&mut self, key: &str) {
        let target = self.focused.clone();
        self.record(SurfaceEventKind::Key {
            key: key.to_string(),
            target: target.clone(),
        });
        match key {
            "Tab" => self.move_focus(true),
            "ShiftTab" => self.move_focus(false),
            "Backspace" => {
                if let Some(field) = target.and_then(|id| self.fields.get_mut(&id)) {
                    field.backspace();
                }
            }
            _ => {}
        }
    }

    fn select_option(&mut self, element_id: &str, option: &str) -> bool {
        let Some(element) = self.element(element_id) else {
            return false;
        };
        let chosen = if element.options.is_empty() {
            Some(option.to_string())
        } else {
            let needle = option.to_lowercase();
            element
                .options
                .iter()
                .find(|o| o.to_lowercase() == needle)
                .or_else(|| element.options.iter().find(|o| o.to_lowercase().starts_with(&needle)))
                .cloned()
        };
        let Some(chosen) = chosen else {
            return false;
        };
        if let Some(field) = self.fields.get_mut(element_id) {
            field.caret = chosen.chars().count();
            field.value = chosen.clone();
        }
        self.record(SurfaceEventKind::Selected {
            element_id: element_id.to_string(),
            option: chosen,
        });
        true
    }

    fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.scroll.0 += dx;
        self.scroll.1 += dy;
        self.record(SurfaceEventKind::Scrolled { dx, dy });
    }

    fn focus(&mut self, element_id: &str) -> bool {
        if self.element(element_id).is_none() {
            return false;
        }
        if self.focused.as_deref() == Some(element_id) {
            return true;
        }
        self.blur();
        if let Some(field) = self.fields.get_mut(element_id) {
            field.caret = field.value.chars().count();
        }
        self.focused = Some(element_id.to_string());
        self.record(SurfaceEventKind::Focused {
            element_id: element_id.to_string(),
        });
        true
    }

    fn blur(&mut self) {
        if let Some(id) = self.focused.take() {
            self.record(SurfaceEventKind::Blurred { element_id: id });
        }
    }

    fn focused_element(&self) -> Option<String> {
        self.focused.clone()
    }

    fn set_highlight(&mut self, element_id: Option<&str>) {
        let element_id = element_id
            .filter(|id| self.element(id).is_some())
            .map(str::to_string);
        if element_id == self.highlighted {
            return;
        }
        self.highlighted = element_id.clone();
        self.record(SurfaceEventKind::Highlighted { element_id });
    }

    fn focus_window(&mut self) {
        self.window_focused = true;
        self.record(SurfaceEventKind::WindowFocused);
    }

    fn window_bounds(&self) -> WindowBounds {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::UIElement;

    fn form() -> WorkflowDocument {
        WorkflowDocument::new("form").with_screen(
            Screen::new("login", "Login")
                .with_element(UIElement::new(
                    "user",
                    ElementType::TextInput,
                    BoundingBox::new(10.0, 10.0, 200.0, 30.0),
                ))
                .with_element(
                    UIElement::new("remember", ElementType::Checkbox, BoundingBox::new(10.0, 50.0, 20.0, 20.0)),
                )
                .with_element(
                    UIElement::new("plan", ElementType::Dropdown, BoundingBox::new(10.0, 80.0, 200.0, 30.0))
                        .with_options(vec!["Basic".into(), "Premium".into()]),
                )
                .with_element(UIElement::new(
                    "go",
                    ElementType::Button,
                    BoundingBox::new(10.0, 120.0, 100.0, 30.0),
                )),
        )
    }

    fn rendered() -> HeadlessSurface {
        let doc = form();
        let mut surface = HeadlessSurface::new(&doc);
        surface.navigate(&doc.screens[0]);
        surface
    }

    #[test]
    fn caret_insertion_mid_string() {
        let mut field = FieldState {
            value: "helo".into(),
            caret: 3,
            checked: false,
        };
        field.insert('l');
        assert_eq!(field.value, "hello");
        assert_eq!(field.caret, 4);
        field.backspace();
        assert_eq!(field.value, "helo");
    }

    #[test]
    fn log_drops_oldest_past_capacity() {
        let doc = form();
        let mut surface = HeadlessSurface::new(&doc).with_log_capacity(3);
        surface.navigate(&doc.screens[0]);
        for x in 1..=5 {
            surface.dispatch_pointer(PointerEvent::new(PointerKind::Move, Point::new(x as f64, 0.0)));
        }
        let xs: Vec<f64> = surface
            .events()
            .iter()
            .filter_map(|e| match &e.kind {
                SurfaceEventKind::Pointer { position, .. } => Some(position.x),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![3.0, 4.0, 5.0]);

        let mut silent = HeadlessSurface::new(&doc).with_log_capacity(0);
        silent.navigate(&doc.screens[0]);
        assert!(silent.events().is_empty());
    }

    #[test]
    fn click_focuses_and_typing_appends() {
        let mut surface = rendered();
        surface.dispatch_pointer(PointerEvent::new(PointerKind::Click, Point::new(50.0, 25.0)));
        assert_eq!(surface.focused_element().as_deref(), Some("user"));
        assert!(surface.insert_text('h'));
        assert!(surface.insert_text('i'));
        assert_eq!(surface.value("user"), Some("hi"));
    }

    #[test]
    fn typing_without_focus_is_dropped() {
        let mut surface = rendered();
        assert!(!surface.insert_text('x'));
        surface.focus("go");
        assert!(!surface.insert_text('x'));
    }

    #[test]
    fn click_toggles_checkbox_and_empty_space_blurs() {
        let mut surface = rendered();
        surface.dispatch_pointer(PointerEvent::new(PointerKind::Click, Point::new(20.0, 60.0)));
        assert!(surface.field("remember").unwrap().checked);
        surface.dispatch_pointer(PointerEvent::new(PointerKind::Click, Point::new(20.0, 60.0)));
        assert!(!surface.field("remember").unwrap().checked);
        surface.dispatch_pointer(PointerEvent::new(PointerKind::Click, Point::new(900.0, 700.0)));
        assert_eq!(surface.focused_element(), None);
    }

    #[test]
    fn select_matches_case_insensitive_prefix() {
        let mut surface = rendered();
        assert!(surface.select_option("plan", "prem"));
        assert_eq!(surface.value("plan"), Some("Premium"));
        assert!(!surface.select_option("plan", "Enterprise"));
    }

    #[test]
    fn tab_walks_focus_order() {
        let mut surface = rendered();
        surface.press_key("Tab");
        assert_eq!(surface.focused_element().as_deref(), Some("user"));
        surface.press_key("Tab");
        assert_eq!(surface.focused_element().as_deref(), Some("remember"));
        surface.press_key("ShiftTab");
        assert_eq!(surface.focused_element().as_deref(), Some("user"));
    }

    #[test]
    fn navigate_resets_fields_and_geometry_tracks_screen() {
        let doc = form();
        let mut surface = rendered();
        surface.focus("user");
        surface.insert_text('a');
        surface.navigate(&doc.screens[0]);
        assert_eq!(surface.value("user"), Some(""));
        assert_eq!(surface.focused_element(), None);

        let geometry = surface.geometry();
        assert_eq!(geometry.screen.as_deref(), Some("login"));
        let user = &geometry.elements["user"];
        assert_eq!((user.center_x, user.center_y), (110.0, 25.0));
    }
}
