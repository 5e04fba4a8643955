//! Humanlike pointer motion and keystroke timing
//!
//! Holds only the pointer position. Every wait goes through the injected
//! [`Clock`] and every random draw through [`Jitter`], so a seeded simulator
//! on a virtual clock is fully deterministic.

use crate::clock::{millis, Clock, SystemClock};
use crate::control::PlaybackControl;
use crate::jitter::Jitter;
use crate::surface::{PointerEvent, PointerKind, SharedSurface};
use crate::workflow::Point;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Motion sampling rate
const SAMPLES_PER_SEC: f64 = 60.0;
const MIN_SAMPLES: usize = 10;

const CLICK_DWELL_MS: f64 = 100.0;
const DOUBLE_CLICK_GAP_MS: f64 = 80.0;
const PUNCTUATION_PAUSE_MS: f64 = 200.0;
const THINKING_PAUSE_MS: f64 = 500.0;
const THINKING_CHANCE: f64 = 0.02;

const SCROLL_STEPS: u32 = 10;
const SCROLL_CADENCE: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub struct BehaviorConfig {
    /// Apply jitter to timing and motion
    pub humanize: bool,
    /// Pixels per second
    pub mouse_speed: f64,
    /// Characters per second
    pub typing_speed: f64,
    /// Multiplier on every simulated duration except the scroll cadence
    pub time_scale: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            humanize: true,
            mouse_speed: 800.0,
            typing_speed: 8.0,
            time_scale: 1.0,
        }
    }
}

/// How a cancellable operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Motion {
    Completed,
    Cancelled,
}

impl Motion {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Motion::Cancelled)
    }
}

/// A sampled pointer path, evaluated one sample at a time
#[derive(Debug, Clone)]
pub struct MotionPlan {
    start: Point,
    cp1: Point,
    cp2: Point,
    target: Point,
    count: usize,
    /// Wait between consecutive samples
    pub step: Duration,
}

impl MotionPlan {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sample `i` of `1..=len()`; the last one is exactly the target
    pub fn sample(&self, i: usize) -> Point {
        if i >= self.count {
            return self.target;
        }
        let t = ease_in_out_cubic(i as f64 / self.count as f64);
        cubic_bezier(self.start, self.cp1, self.cp2, self.target, t)
    }

    pub fn samples(&self) -> impl Iterator<Item = Point> + '_ {
        (1..=self.count).map(move |i| self.sample(i))
    }
}

pub struct BehaviorSimulator {
    config: BehaviorConfig,
    position: Point,
    jitter: Jitter,
    clock: Arc<dyn Clock>,
    control: Arc<PlaybackControl>,
}

impl BehaviorSimulator {
    pub fn new(config: BehaviorConfig) -> Self {
        let jitter = Jitter::from_entropy().humanize(config.humanize);
        Self {
            config,
            position: Point::default(),
            jitter,
            clock: Arc::new(SystemClock::new()),
            control: Arc::new(PlaybackControl::new()),
        }
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter.humanize(self.config.humanize);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_control(mut self, control: Arc<PlaybackControl>) -> Self {
        self.control = control;
        self
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Copy of the current pointer position
    pub fn mouse_position(&self) -> Point {
        self.position
    }

    /// Teleport without motion, e.g. to sync with a real cursor
    pub fn set_mouse_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn add_variation(&mut self, value: f64, factor: f64) -> f64 {
        self.jitter.add_variation(value, factor)
    }

    fn scaled(&self, ms: f64) -> Duration {
        millis(ms * self.config.time_scale)
    }

    fn cancelled(&self) -> bool {
        self.control.stop_requested()
    }

    /// Bézier path from the current position to `target`
    pub fn plan_path(&mut self, target: Point, mouse_speed: f64) -> MotionPlan {
        let start = self.position;
        let distance = start.distance(&target);
        let speed = self.effective_speed(mouse_speed);

        let secs = self.jitter.add_variation(distance / speed, 0.2) * self.config.time_scale;
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        let count = ((secs * SAMPLES_PER_SEC).round() as usize).max(MIN_SAMPLES);

        let curviness = self.jitter.uniform(0.1, 0.4, 0.2);
        let offset = distance * curviness * self.jitter.sign();
        let (dx, dy) = (target.x - start.x, target.y - start.y);
        let (px, py) = if distance > 0.0 {
            (-dy / distance, dx / distance)
        } else {
            (0.0, 0.0)
        };
        let cp1 = Point::new(start.x + dx * 0.3 + px * offset, start.y + dy * 0.3 + py * offset);
        let cp2 = Point::new(start.x + dx * 0.7 + px * offset, start.y + dy * 0.7 + py * offset);

        MotionPlan {
            start,
            cp1,
            cp2,
            target,
            count,
            step: Duration::try_from_secs_f64(secs / count as f64).unwrap_or(Duration::MAX),
        }
    }

    /// Per-action speed, else the configured one, else the default
    fn effective_speed(&self, mouse_speed: f64) -> f64 {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if usable(mouse_speed) {
            mouse_speed
        } else if usable(self.config.mouse_speed) {
            self.config.mouse_speed
        } else {
            BehaviorConfig::default().mouse_speed
        }
    }

    pub fn move_mouse(&mut self, surface: &SharedSurface, target: Point) -> Motion {
        let speed = self.config.mouse_speed;
        self.move_mouse_at(surface, target, speed)
    }

    /// Move with a per-action speed override
    pub fn move_mouse_at(&mut self, surface: &SharedSurface, target: Point, mouse_speed: f64) -> Motion {
        let plan = self.plan_path(target, mouse_speed);
        debug!(
            from = ?self.position,
            to = ?target,
            samples = plan.len(),
            "moving pointer"
        );
        for sample in plan.samples() {
            if self.cancelled() {
                return Motion::Cancelled;
            }
            self.position = sample;
            surface
                .lock()
                .dispatch_pointer(PointerEvent::new(PointerKind::Move, sample));
            self.clock.sleep(plan.step);
        }
        Motion::Completed
    }

    /// Pressed dwell, then a click at the current position
    pub fn click(&mut self, surface: &SharedSurface) {
        self.press(surface);
        let dwell = self.jitter.add_variation(CLICK_DWELL_MS, 0.3);
        self.clock.sleep(self.scaled(dwell));
        self.release(surface);
        surface
            .lock()
            .dispatch_pointer(PointerEvent::new(PointerKind::Click, self.position));
    }

    pub fn double_click(&mut self, surface: &SharedSurface) {
        self.click(surface);
        let gap = self.jitter.add_variation(DOUBLE_CLICK_GAP_MS, 0.3);
        self.clock.sleep(self.scaled(gap));
        self.click(surface);
        surface
            .lock()
            .dispatch_pointer(PointerEvent::new(PointerKind::DoubleClick, self.position));
    }

    pub fn right_click(&mut self, surface: &SharedSurface) {
        surface.lock().set_pressed(true);
        let dwell = self.jitter.add_variation(CLICK_DWELL_MS, 0.3);
        self.clock.sleep(self.scaled(dwell));
        let mut s = surface.lock();
        s.set_pressed(false);
        s.dispatch_pointer(PointerEvent::new(PointerKind::ContextMenu, self.position));
    }

    pub fn press(&mut self, surface: &SharedSurface) {
        let mut s = surface.lock();
        s.set_pressed(true);
        s.dispatch_pointer(PointerEvent::new(PointerKind::Down, self.position));
    }

    pub fn release(&mut self, surface: &SharedSurface) {
        let mut s = surface.lock();
        s.set_pressed(false);
        s.dispatch_pointer(PointerEvent::new(PointerKind::Up, self.position));
    }

    /// Delay after typing `ch` at `speed` characters per second
    pub fn keystroke_delay(&mut self, ch: char, speed: f64) -> Duration {
        let speed = if speed > 0.0 { speed } else { self.config.typing_speed };
        let mut ms = self.jitter.add_variation(1000.0 / speed, 0.3);
        if self.jitter.is_enabled() {
            if matches!(ch, '.' | '!' | '?' | ',' | ';' | ':') {
                ms += self.jitter.add_variation(PUNCTUATION_PAUSE_MS, 0.3);
            }
            if self.jitter.chance(THINKING_CHANCE) {
                ms += self.jitter.add_variation(THINKING_PAUSE_MS, 0.5);
            }
        }
        self.scaled(ms)
    }

    /// Type one character at a time into the focused element
    pub fn type_text(&mut self, surface: &SharedSurface, text: &str, speed: f64) -> Motion {
        let mut dropped = 0usize;
        for ch in text.chars() {
            if self.cancelled() {
                return Motion::Cancelled;
            }
            if !surface.lock().insert_text(ch) {
                dropped += 1;
            }
            let delay = self.keystroke_delay(ch, speed);
            self.clock.sleep(delay);
        }
        if dropped > 0 {
            debug!(dropped, "keystrokes had no text-entry target");
        }
        Motion::Completed
    }

    pub fn press_key(&mut self, surface: &SharedSurface, key: &str) {
        surface.lock().press_key(key);
    }

    /// Ten equal steps at a fixed cadence
    pub fn scroll(&mut self, surface: &SharedSurface, dx: f64, dy: f64) -> Motion {
        let (sx, sy) = (dx / SCROLL_STEPS as f64, dy / SCROLL_STEPS as f64);
        for _ in 0..SCROLL_STEPS {
            if self.cancelled() {
                return Motion::Cancelled;
            }
            surface.lock().scroll_by(sx, sy);
            self.clock.sleep(SCROLL_CADENCE);
        }
        Motion::Completed
    }

    /// Scaled idle time, e.g. a hover dwell
    pub fn dwell(&self, ms: f64) {
        self.clock.sleep(self.scaled(ms));
    }
}

/// `t < 0.5 ? 4t³ : 1 - (-2t + 2)³ / 2`
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub fn cubic_bezier(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}
