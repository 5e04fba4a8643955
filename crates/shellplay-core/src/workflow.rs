//! Workflow document: screens plus the ordered actions that replay on them
//!
//! Keys are camelCase on the wire. The snake_case spellings produced by the
//! analysis pipeline are accepted as aliases.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A point in logical surface pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    TextInput,
    PasswordInput,
    Textarea,
    Dropdown,
    Checkbox,
    Radio,
    Toggle,
    Button,
    Link,
    Label,
    Heading,
    Table,
    Slider,
    DatePicker,
    #[serde(other)]
    Generic,
}

impl ElementType {
    /// Element accepts typed characters at a caret
    pub fn is_text_entry(&self) -> bool {
        matches!(
            self,
            Self::TextInput | Self::PasswordInput | Self::Textarea | Self::DatePicker
        )
    }

    pub fn is_checkable(&self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio | Self::Toggle)
    }

    pub fn is_focusable(&self) -> bool {
        self.is_text_entry()
            || self.is_checkable()
            || matches!(self, Self::Dropdown | Self::Button | Self::Link | Self::Slider)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UIElement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ElementType,
    #[serde(default, alias = "bounds", alias = "bounding_box")]
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub required: bool,
}

impl UIElement {
    pub fn new(id: impl Into<String>, kind: ElementType, bounding_box: BoundingBox) -> Self {
        Self {
            id: id.into(),
            kind,
            bounding_box,
            label: None,
            placeholder: None,
            value: None,
            options: Vec::new(),
            enabled: true,
            visible: true,
            required: false,
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub elements: Vec<UIElement>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Screen {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            elements: Vec::new(),
            width: default_width(),
            height: default_height(),
        }
    }

    pub fn with_element(mut self, element: UIElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn element(&self, element_id: &str) -> Option<&UIElement> {
        self.elements.iter().find(|e| e.id == element_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Click,
    DoubleClick,
    RightClick,
    Type,
    Select,
    Check,
    Uncheck,
    Toggle,
    Scroll,
    Drag,
    Drop,
    Hover,
    Focus,
    Blur,
    Submit,
    Navigate,
    Wait,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(alias = "screen_id")]
    pub screen_id: String,
    #[serde(default, alias = "element_id", skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Text to type, option to select, scroll delta or drag destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Milliseconds to wait before the action runs
    #[serde(default, alias = "delay_before", skip_serializing_if = "Option::is_none")]
    pub delay_before: Option<u64>,
    /// Milliseconds, for hover and wait
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Characters per second
    #[serde(default, alias = "typing_speed", skip_serializing_if = "Option::is_none")]
    pub typing_speed: Option<f64>,
    /// Pixels per second
    #[serde(default, alias = "mouse_speed", skip_serializing_if = "Option::is_none")]
    pub mouse_speed: Option<f64>,
    #[serde(default, alias = "next_screen_id", skip_serializing_if = "Option::is_none")]
    pub next_screen_id: Option<String>,
}

impl Action {
    pub fn new(id: impl Into<String>, kind: ActionType, screen_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            screen_id: screen_id.into(),
            element_id: None,
            x: None,
            y: None,
            value: None,
            delay_before: None,
            duration: None,
            typing_speed: None,
            mouse_speed: None,
            next_screen_id: None,
        }
    }

    pub fn on(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_before = Some(ms);
        self
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration = Some(ms);
        self
    }

    pub fn with_typing_speed(mut self, chars_per_sec: f64) -> Self {
        self.typing_speed = Some(chars_per_sec);
        self
    }

    pub fn then(mut self, next_screen_id: impl Into<String>) -> Self {
        self.next_screen_id = Some(next_screen_id.into());
        self
    }

    /// Explicit coordinates, only when both are present
    pub fn explicit_point(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        }
    }

    /// Payload rendered as text; numbers and booleans are stringified
    pub fn value_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub screens: Vec<Screen>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default, alias = "start_screen_id", skip_serializing_if = "Option::is_none")]
    pub start_screen_id: Option<String>,
}

impl WorkflowDocument {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            ..Default::default()
        }
    }

    pub fn with_screen(mut self, screen: Screen) -> Self {
        self.screens.push(screen);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn starting_at(mut self, screen_id: impl Into<String>) -> Self {
        self.start_screen_id = Some(screen_id.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e).with_context(serde_json::json!({ "path": path.display().to_string() }))
        })?;
        Self::from_json(&text)
    }

    pub fn screen(&self, screen_id: &str) -> Option<&Screen> {
        self.screens.iter().find(|s| s.id == screen_id)
    }

    /// `startScreenId` when it resolves, else the first screen
    pub fn start_screen(&self) -> Option<&Screen> {
        self.start_screen_id
            .as_deref()
            .and_then(|id| self.screen(id))
            .or_else(|| self.screens.first())
    }
}
