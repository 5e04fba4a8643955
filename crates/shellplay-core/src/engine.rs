//! Workflow playback state machine
//!
//! `Idle → Running ⇄ Paused → Completed`, with `Stopped` reachable from
//! `Running` and `Paused`. [`WorkflowEngine::step`] executes one action;
//! a driver (see [`crate::player`]) calls it repeatedly and interleaves
//! control commands between steps.

use crate::behavior::{BehaviorConfig, BehaviorSimulator, Motion};
use crate::clock::{millis, Clock, SystemClock};
use crate::control::PlaybackControl;
use crate::error::{Error, Result};
use crate::events::{EventBus, PlaybackEvent, ScreenRef, Subscription};
use crate::jitter::Jitter;
use crate::surface::SharedSurface;
use crate::workflow::{Action, ActionType, Point, Screen, WorkflowDocument};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_SCROLL_PX: f64 = 300.0;
const DEFAULT_HOVER_MS: f64 = 500.0;
const DEFAULT_WAIT_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

/// Snapshot of the engine, safe to hand to other threads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub is_running: bool,
    pub is_paused: bool,
    pub current_action_index: usize,
    pub total_actions: usize,
    pub current_screen_id: Option<String>,
    pub progress: f64,
    pub iteration: u64,
}

impl PlaybackStatus {
    fn idle(total_actions: usize) -> Self {
        Self {
            state: PlaybackState::Idle,
            is_running: false,
            is_paused: false,
            current_action_index: 0,
            total_actions,
            current_screen_id: None,
            progress: 0.0,
            iteration: 0,
        }
    }
}

/// Counters over everything the engine has dispatched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackStats {
    pub executed: usize,
    pub skipped: usize,
    pub clicks: usize,
    pub keystrokes: usize,
    pub scrolls: usize,
    pub navigations: usize,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Playback speed (1.0 = real-time, 2.0 = twice as fast)
    pub speed: f64,
    pub looping: bool,
    /// Pause before actions that carry no `delayBefore`
    pub default_delay_ms: f64,
    pub humanize: bool,
    pub typing_speed: f64,
    pub mouse_speed: f64,
    /// Added to every resolved pointer target
    pub offset: Point,
    /// Seed for the jitter source; entropy when unset
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            looping: false,
            default_delay_ms: 500.0,
            humanize: true,
            typing_speed: 8.0,
            mouse_speed: 800.0,
            offset: Point::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn default_delay_ms(mut self, ms: f64) -> Self {
        self.default_delay_ms = ms;
        self
    }

    pub fn humanize(mut self, humanize: bool) -> Self {
        self.humanize = humanize;
        self
    }

    pub fn typing_speed(mut self, chars_per_sec: f64) -> Self {
        self.typing_speed = chars_per_sec;
        self
    }

    pub fn mouse_speed(mut self, px_per_sec: f64) -> Self {
        self.mouse_speed = px_per_sec;
        self
    }

    pub fn offset(mut self, x: f64, y: f64) -> Self {
        self.offset = Point::new(x, y);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Duration multiplier, 1/speed; non-positive speeds play at real-time
    pub fn time_scale(&self) -> f64 {
        if self.speed.is_finite() && self.speed > 0.0 {
            1.0 / self.speed
        } else {
            1.0
        }
    }

    pub fn behavior(&self) -> BehaviorConfig {
        BehaviorConfig {
            humanize: self.humanize,
            mouse_speed: self.mouse_speed,
            typing_speed: self.typing_speed,
            time_scale: self.time_scale(),
        }
    }
}

pub struct WorkflowEngine {
    document: Arc<WorkflowDocument>,
    surface: SharedSurface,
    config: EngineConfig,
    simulator: BehaviorSimulator,
    clock: Arc<dyn Clock>,
    control: Arc<PlaybackControl>,
    events: EventBus,
    state: PlaybackState,
    cursor: usize,
    current_screen: Option<String>,
    iteration: u64,
    /// Actions executed since the cursor last wrapped
    pass_executed: usize,
    stats: PlaybackStats,
    shared: Arc<RwLock<PlaybackStatus>>,
}

impl WorkflowEngine {
    pub fn new(document: Arc<WorkflowDocument>, surface: SharedSurface, config: EngineConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let control = Arc::new(PlaybackControl::new());
        let simulator = build_simulator(&config, clock.clone(), control.clone());
        let shared = Arc::new(RwLock::new(PlaybackStatus::idle(document.actions.len())));
        Self {
            document,
            surface,
            config,
            simulator,
            clock,
            control,
            events: EventBus::new(),
            state: PlaybackState::Idle,
            cursor: 0,
            current_screen: None,
            iteration: 0,
            pass_executed: 0,
            stats: PlaybackStats::default(),
            shared,
        }
    }

    /// Route every wait through `clock`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.simulator = build_simulator(&self.config, clock.clone(), self.control.clone());
        self.clock = clock;
        self
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.events.subscribe()
    }

    pub fn document(&self) -> &Arc<WorkflowDocument> {
        &self.document
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    pub fn mouse_position(&self) -> Point {
        self.simulator.mouse_position()
    }

    /// Flags other threads may flip while a step is in flight
    pub fn control(&self) -> Arc<PlaybackControl> {
        self.control.clone()
    }

    /// Status cell republished after every mutation
    pub fn shared_status(&self) -> Arc<RwLock<PlaybackStatus>> {
        self.shared.clone()
    }

    pub fn status(&self) -> PlaybackStatus {
        let total = self.document.actions.len();
        PlaybackStatus {
            state: self.state,
            is_running: matches!(self.state, PlaybackState::Running | PlaybackState::Paused),
            is_paused: self.state == PlaybackState::Paused,
            current_action_index: self.cursor,
            total_actions: total,
            current_screen_id: self.current_screen.clone(),
            progress: if total == 0 { 0.0 } else { self.cursor as f64 / total as f64 },
            iteration: self.iteration,
        }
    }

    fn publish(&self) {
        *self.shared.write() = self.status();
    }

    /// Begin playback. From `Stopped` the preserved cursor is kept.
    ///
    /// Returns false when the request was ignored.
    pub fn start(&mut self) -> bool {
        if matches!(self.state, PlaybackState::Running | PlaybackState::Paused) {
            warn!(state = ?self.state, "start ignored, playback already active");
            return false;
        }
        let doc = Arc::clone(&self.document);
        let Some(start) = doc.start_screen() else {
            warn!(workflow = %doc.name, "workflow has no screens, nothing to play");
            return false;
        };

        self.control.clear();
        if self.state == PlaybackState::Stopped {
            info!(from = self.cursor, "continuing stopped playback");
        } else {
            self.cursor = 0;
            self.iteration = 0;
            self.pass_executed = 0;
            self.enter_screen(start);
        }
        self.state = PlaybackState::Running;
        info!(workflow = %doc.name, actions = doc.actions.len(), "playback started");
        self.events.emit(PlaybackEvent::Started {
            from_index: self.cursor,
            total: doc.actions.len(),
        });
        self.publish();
        true
    }

    /// Suspend after the in-flight action. Idempotent.
    pub fn pause(&mut self) {
        match self.state {
            PlaybackState::Running => self.enter_paused(),
            PlaybackState::Paused => {}
            state => debug!(?state, "pause ignored"),
        }
    }

    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            debug!(state = ?self.state, "resume ignored, not paused");
            return;
        }
        self.control.clear_pause();
        self.state = PlaybackState::Running;
        info!(index = self.cursor, "playback resumed");
        self.events.emit(PlaybackEvent::Resumed { index: self.cursor });
        self.publish();
    }

    /// Halt, keeping the cursor
    pub fn stop(&mut self) {
        if matches!(self.state, PlaybackState::Running | PlaybackState::Paused) {
            self.enter_stopped();
        } else {
            debug!(state = ?self.state, "stop ignored");
        }
    }

    /// Stop and zero the cursor and the current screen
    pub fn reset(&mut self) {
        self.control.clear();
        self.state = PlaybackState::Idle;
        self.cursor = 0;
        self.iteration = 0;
        self.pass_executed = 0;
        self.current_screen = None;
        info!("playback reset");
        self.events.emit(PlaybackEvent::Reset);
        self.publish();
    }

    /// Force the current screen, bypassing the action sequence
    pub fn navigate_to(&mut self, screen_id: &str) -> Result<()> {
        let doc = Arc::clone(&self.document);
        let screen = doc
            .screen(screen_id)
            .ok_or_else(|| Error::screen_not_found(screen_id))?;
        self.enter_screen(screen);
        Ok(())
    }

    /// Show the start screen without moving the cursor
    pub fn show_start_screen(&mut self) -> Result<String> {
        let doc = Arc::clone(&self.document);
        let screen = doc
            .start_screen()
            .ok_or_else(|| Error::workflow_invalid("workflow has no screens"))?;
        self.enter_screen(screen);
        Ok(screen.id.clone())
    }

    /// Steps until playback leaves `Running`
    pub fn run(&mut self) -> PlaybackState {
        while self.step() == PlaybackState::Running {}
        self.state
    }

    /// Execute the action under the cursor
    pub fn step(&mut self) -> PlaybackState {
        self.observe_control();
        if self.state != PlaybackState::Running {
            return self.state;
        }

        let doc = Arc::clone(&self.document);
        let index = self.cursor;
        let Some(action) = doc.actions.get(index) else {
            self.finish_pass();
            return self.state;
        };

        let Some(screen) = doc.screen(&action.screen_id) else {
            warn!(index, action = %action.id, screen = %action.screen_id, "screen not found, skipping action");
            self.stats.skipped += 1;
            self.events.emit(PlaybackEvent::ActionSkipped {
                index,
                action_id: action.id.clone(),
                reason: format!("screen '{}' not found", action.screen_id),
            });
            self.advance();
            return self.state;
        };

        if self.current_screen.as_deref() != Some(screen.id.as_str()) {
            self.enter_screen(screen);
        }

        let delay = action
            .delay_before
            .map(|ms| ms as f64)
            .unwrap_or(self.config.default_delay_ms);
        self.clock.sleep(millis(delay * self.config.time_scale()));

        if self.control.stop_requested() {
            self.observe_control();
            return self.state;
        }

        debug!(index, action = %action.id, kind = ?action.kind, "executing action");
        if self.dispatch(action, screen).is_cancelled() {
            debug!(index, "action interrupted by stop");
            self.observe_control();
            return self.state;
        }

        self.stats.executed += 1;
        self.pass_executed += 1;
        self.events.emit(PlaybackEvent::ActionExecuted {
            index,
            action: action.clone(),
            screen: ScreenRef::from(screen),
        });

        if let Some(next) = action.next_screen_id.as_deref() {
            match doc.screen(next) {
                Some(target) => self.enter_screen(target),
                None => warn!(index, screen = next, "next screen not found"),
            }
        }

        self.advance();
        self.state
    }

    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor >= self.document.actions.len() {
            self.finish_pass();
        } else {
            self.publish();
            self.observe_control();
        }
    }

    fn finish_pass(&mut self) {
        let total = self.document.actions.len();
        let playable = self.pass_executed > 0;
        if self.config.looping && !playable && total > 0 {
            warn!(total, "no action in the pass could be played, not looping");
        }
        if self.config.looping && playable && !self.control.stop_requested() {
            self.cursor = 0;
            self.pass_executed = 0;
            self.iteration += 1;
            info!(iteration = self.iteration, "looping playback");
            self.events.emit(PlaybackEvent::Looped { iteration: self.iteration });
            self.publish();
            self.observe_control();
            return;
        }
        self.cursor = total;
        self.state = PlaybackState::Completed;
        info!(total, "playback completed");
        self.events.emit(PlaybackEvent::Completed { total });
        self.publish();
    }

    fn observe_control(&mut self) {
        if !matches!(self.state, PlaybackState::Running | PlaybackState::Paused) {
            return;
        }
        if self.control.stop_requested() {
            self.enter_stopped();
        } else if self.state == PlaybackState::Running && self.control.pause_requested() {
            self.enter_paused();
        }
    }

    fn enter_paused(&mut self) {
        self.control.request_pause();
        self.state = PlaybackState::Paused;
        info!(index = self.cursor, "playback paused");
        self.events.emit(PlaybackEvent::Paused { index: self.cursor });
        self.publish();
    }

    fn enter_stopped(&mut self) {
        self.control.clear();
        self.state = PlaybackState::Stopped;
        info!(index = self.cursor, "playback stopped");
        self.events.emit(PlaybackEvent::Stopped { index: self.cursor });
        self.publish();
    }

    /// The one navigation path: surface render, pointer update, one event
    fn enter_screen(&mut self, screen: &Screen) {
        self.surface.lock().navigate(screen);
        self.current_screen = Some(screen.id.clone());
        self.stats.navigations += 1;
        info!(screen = %screen.id, name = %screen.name, "screen changed");
        self.events.emit(PlaybackEvent::ScreenChanged {
            screen: ScreenRef::from(screen),
        });
        self.publish();
    }

    /// Explicit coordinates, else the element centre, else the pointer
    fn resolve_target(&self, action: &Action, screen: &Screen) -> Option<Point> {
        let base = match action.explicit_point() {
            Some(p) => p,
            None => {
                let id = action.element_id.as_deref()?;
                match screen.element(id) {
                    Some(el) => el.bounding_box.center(),
                    None => {
                        warn!(screen = %screen.id, element = id, "element not found, using pointer position");
                        return None;
                    }
                }
            }
        };
        Some(Point::new(base.x + self.config.offset.x, base.y + self.config.offset.y))
    }

    /// Move to the resolved target, if any
    fn approach(&mut self, action: &Action, screen: &Screen) -> Motion {
        match self.resolve_target(action, screen) {
            Some(target) => {
                let speed = action.mouse_speed.unwrap_or(self.config.mouse_speed);
                self.simulator.move_mouse_at(&self.surface, target, speed)
            }
            None => Motion::Completed,
        }
    }

    fn has_target(action: &Action) -> bool {
        action.explicit_point().is_some() || action.element_id.is_some()
    }

    fn dispatch(&mut self, action: &Action, screen: &Screen) -> Motion {
        let surface = self.surface.clone();
        match action.kind {
            ActionType::Click
            | ActionType::Check
            | ActionType::Uncheck
            | ActionType::Toggle => {
                if self.approach(action, screen).is_cancelled() {
                    return Motion::Cancelled;
                }
                self.simulator.click(&surface);
                self.stats.clicks += 1;
            }
            ActionType::DoubleClick => {
                if self.approach(action, screen).is_cancelled() {
                    return Motion::Cancelled;
                }
                self.simulator.double_click(&surface);
                self.stats.clicks += 2;
            }
            ActionType::RightClick => {
                if self.approach(action, screen).is_cancelled() {
                    return Motion::Cancelled;
                }
                self.simulator.right_click(&surface);
                self.stats.clicks += 1;
            }
            ActionType::Type => {
                if Self::has_target(action) {
                    if self.approach(action, screen).is_cancelled() {
                        return Motion::Cancelled;
                    }
                    self.simulator.click(&surface);
                    self.stats.clicks += 1;
                }
                let text = action.value_text().unwrap_or_default();
                let speed = action.typing_speed.unwrap_or(self.config.typing_speed);
                if self.simulator.type_text(&surface, &text, speed).is_cancelled() {
                    return Motion::Cancelled;
                }
                self.stats.keystrokes += text.chars().count();
            }
            ActionType::Select => {
                if self.approach(action, screen).is_cancelled() {
                    return Motion::Cancelled;
                }
                self.simulator.click(&surface);
                self.stats.clicks += 1;
                match (action.element_id.as_deref(), action.value_text()) {
                    (Some(id), Some(option)) => {
                        if !surface.lock().select_option(id, &option) {
                            warn!(element = id, option = %option, "option not found");
                        }
                    }
                    _ => debug!(action = %action.id, "select without element or option"),
                }
            }
            ActionType::Scroll => {
                let (dx, dy) = parse_scroll(action.value_text().as_deref());
                if self.simulator.scroll(&surface, dx, dy).is_cancelled() {
                    return Motion::Cancelled;
                }
                self.stats.scrolls += 1;
            }
            ActionType::Drag => {
                if self.approach(action, screen).is_cancelled() {
                    return Motion::Cancelled;
                }
                self.simulator.press(&surface);
                if let Some(dest) = self.drag_destination(action, screen) {
                    let speed = action.mouse_speed.unwrap_or(self.config.mouse_speed);
                    if self.simulator.move_mouse_at(&surface, dest, speed).is_cancelled() {
                        self.simulator.release(&surface);
                        return Motion::Cancelled;
                    }
                }
                self.simulator.release(&surface);
            }
            ActionType::Drop => {
                if self.approach(action, screen).is_cancelled() {
                    return Motion::Cancelled;
                }
                self.simulator.release(&surface);
            }
            ActionType::Hover => {
                if self.approach(action, screen).is_cancelled() {
                    return Motion::Cancelled;
                }
                let ms = action.duration.map(|d| d as f64).unwrap_or(DEFAULT_HOVER_MS);
                self.simulator.dwell(ms);
            }
            ActionType::Focus => match action.element_id.as_deref() {
                Some(id) => {
                    if !surface.lock().focus(id) {
                        warn!(element = id, "element cannot take focus");
                    }
                }
                None => debug!(action = %action.id, "focus without element"),
            },
            ActionType::Blur => surface.lock().blur(),
            ActionType::Submit => self.simulator.press_key(&surface, "Enter"),
            ActionType::Navigate => {}
            ActionType::Wait => {
                let ms = action.duration.map(|d| d as f64).unwrap_or(DEFAULT_WAIT_MS);
                self.simulator.dwell(ms);
            }
            ActionType::Unknown => {
                warn!(action = %action.id, "unknown action type, treating as no-op");
            }
        }
        Motion::Completed
    }

    /// `value` names an element on the same screen or holds `x,y`
    fn drag_destination(&self, action: &Action, screen: &Screen) -> Option<Point> {
        let value = action.value_text()?;
        let base = match screen.element(&value) {
            Some(el) => el.bounding_box.center(),
            None => {
                let (x, y) = value.split_once(',')?;
                Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?)
            }
        };
        Some(Point::new(base.x + self.config.offset.x, base.y + self.config.offset.y))
    }
}

fn build_simulator(
    config: &EngineConfig,
    clock: Arc<dyn Clock>,
    control: Arc<PlaybackControl>,
) -> BehaviorSimulator {
    BehaviorSimulator::new(config.behavior())
        .with_jitter(Jitter::new(config.seed))
        .with_clock(clock)
        .with_control(control)
}

/// `dy` or `dx,dy`; defaults to 300px down
fn parse_scroll(value: Option<&str>) -> (f64, f64) {
    let Some(value) = value else {
        return (0.0, DEFAULT_SCROLL_PX);
    };
    match value.split_once(',') {
        Some((dx, dy)) => (
            dx.trim().parse().unwrap_or(0.0),
            dy.trim().parse().unwrap_or(DEFAULT_SCROLL_PX),
        ),
        None => (0.0, value.trim().parse().unwrap_or(DEFAULT_SCROLL_PX)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_values() {
        assert_eq!(parse_scroll(None), (0.0, 300.0));
        assert_eq!(parse_scroll(Some("-120")), (0.0, -120.0));
        assert_eq!(parse_scroll(Some("40, 80")), (40.0, 80.0));
        assert_eq!(parse_scroll(Some("down")), (0.0, 300.0));
    }

    #[test]
    fn time_scale_guards_bad_speed() {
        assert_eq!(EngineConfig::default().speed(2.0).time_scale(), 0.5);
        assert_eq!(EngineConfig::default().speed(0.0).time_scale(), 1.0);
        assert_eq!(EngineConfig::default().speed(f64::NAN).time_scale(), 1.0);
    }

    #[test]
    fn status_serializes_camel_case() {
        let json = serde_json::to_value(PlaybackStatus::idle(3)).unwrap();
        assert_eq!(json["isRunning"], false);
        assert_eq!(json["totalActions"], 3);
        assert_eq!(json["currentScreenId"], serde_json::Value::Null);
        assert_eq!(json["state"], "idle");
    }
}
