//! Headless demo scene
//!
//! Wires a relay with actor, drawable, mouse and key handlers, fills it with
//! clickable targets and a key logger, and drives it from a scripted pointer
//! on the tick thread until a lifetime actor kills the root handler.

use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::config::TickConfig;
use super::input::{
    ButtonStatus, ContentType, EventSelector, KeyContent, KeyEvent, KeyHandler, KeyListener,
    MouseButton, MouseEvent, MouseHandler, MouseListener, MovementType, Position, Rect,
};
use super::runner::{StepHandler, TickStats};
use crate::handler::{
    Actor, ActorHandler, Drawable, DrawableHandler, Handled, HandlerRelay, HandlerType,
    Participant,
};
use crate::state::StateOperator;

const FIELD: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 400.0,
    height: 300.0,
};
const WORD: &str = "handled";

/// A rectangle that counts clicks and dies after enough of them
struct ClickTarget {
    name: &'static str,
    area: Rect,
    depth: i32,
    max_clicks: u32,
    dead: StateOperator,
    selector: EventSelector<MouseEvent>,
    clicks: AtomicU32,
    entered: AtomicU32,
}

impl ClickTarget {
    fn new(name: &'static str, area: Rect, depth: i32, max_clicks: u32) -> Arc<Self> {
        let selector = EventSelector::button(MouseButton::Left, &[ButtonStatus::Pressed])
            .and(EventSelector::local())
            .or(EventSelector::movement(&[MovementType::Enter]));
        Arc::new(Self {
            name,
            area,
            depth,
            max_clicks,
            dead: StateOperator::default(),
            selector,
            clicks: AtomicU32::new(0),
            entered: AtomicU32::new(0),
        })
    }

    fn report(&self) -> TargetReport {
        TargetReport {
            name: self.name,
            clicks: self.clicks.load(Ordering::Relaxed),
            entered: self.entered.load(Ordering::Relaxed),
            alive: !self.dead.get_state(),
        }
    }
}

impl Handled for ClickTarget {
    fn is_dead(&self) -> &StateOperator {
        &self.dead
    }
}

impl MouseListener for ClickTarget {
    fn on_mouse_event(&self, event: &MouseEvent) {
        if event.movement() == Some(MovementType::Enter) {
            self.entered.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let clicks = self.clicks.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(target_name = self.name, clicks, "Target clicked");
        if clicks >= self.max_clicks {
            info!(target_name = self.name, "Target used up");
            self.dead.set_state(true);
        }
    }

    fn event_selector(&self) -> &EventSelector<MouseEvent> {
        &self.selector
    }

    fn is_in_area_of_interest(&self, position: Position) -> bool {
        self.area.contains(position)
    }
}

impl Drawable for ClickTarget {
    fn draw(&self, surface: &mut dyn Any) {
        if let Some(frame) = surface.downcast_mut::<Vec<String>>() {
            frame.push(self.name.to_string());
        }
    }

    fn depth(&self) -> i32 {
        self.depth
    }
}

impl Participant for ClickTarget {
    fn as_drawable(self: Arc<Self>) -> Option<Arc<dyn Drawable>> {
        Some(self)
    }

    fn as_mouse_listener(self: Arc<Self>) -> Option<Arc<dyn MouseListener>> {
        Some(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Collects the characters of every key press
struct KeyLogger {
    dead: StateOperator,
    selector: EventSelector<KeyEvent>,
    typed: Mutex<String>,
}

impl KeyLogger {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            dead: StateOperator::default(),
            selector: EventSelector::status(&[ButtonStatus::Pressed])
                .and(EventSelector::content_type(ContentType::Char)),
            typed: Mutex::new(String::new()),
        })
    }
}

impl Handled for KeyLogger {
    fn is_dead(&self) -> &StateOperator {
        &self.dead
    }
}

impl KeyListener for KeyLogger {
    fn on_key_event(&self, event: &KeyEvent) {
        if let KeyContent::Char(c) = event.key {
            self.typed.lock().push(c);
        }
    }

    fn event_selector(&self) -> &EventSelector<KeyEvent> {
        &self.selector
    }
}

impl Participant for KeyLogger {
    fn as_key_listener(self: Arc<Self>) -> Option<Arc<dyn KeyListener>> {
        Some(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Feeds random pointer motion, clicks and keystrokes into the input handlers
struct ScriptedInput {
    dead: StateOperator,
    mouse: Arc<MouseHandler>,
    keys: Arc<KeyHandler>,
    rng: Mutex<StdRng>,
    tick: AtomicU32,
}

impl Handled for ScriptedInput {
    fn is_dead(&self) -> &StateOperator {
        &self.dead
    }
}

impl Actor for ScriptedInput {
    fn act(&self, _delta_time: f64) {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        let mut rng = self.rng.lock();

        let x = rng.random_range(FIELD.x..=FIELD.x + FIELD.width);
        let y = rng.random_range(FIELD.y..=FIELD.y + FIELD.height);
        self.mouse.set_position([x, y]);

        let pressing = rng.random_bool(0.3);
        self.mouse.set_button_state(MouseButton::Left, pressing);

        if tick % 10 == 0 {
            self.mouse.wheel_turn(0.0, 0);
        }

        let letter = (tick / 2) as usize % WORD.len();
        if let Some(c) = WORD[letter..].chars().next() {
            let code = c.to_ascii_uppercase() as u32;
            if tick % 2 == 0 {
                self.keys.on_key_pressed(c, code, false);
            } else {
                self.keys.on_key_released(c, code, false);
            }
        }
    }
}

/// Kills the handler it watches once its time runs out
struct Lifetime {
    dead: StateOperator,
    remaining: Mutex<f64>,
    root: Weak<ActorHandler>,
}

impl Handled for Lifetime {
    fn is_dead(&self) -> &StateOperator {
        &self.dead
    }
}

impl Actor for Lifetime {
    fn act(&self, delta_time: f64) {
        let mut remaining = self.remaining.lock();
        *remaining -= delta_time;
        if *remaining <= 0.0 {
            if let Some(root) = self.root.upgrade() {
                root.kill();
            }
            self.dead.set_state(true);
        }
    }
}

/// What happened to one target over a demo run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub name: &'static str,
    pub clicks: u32,
    pub entered: u32,
    pub alive: bool,
}

/// Outcome of [`run_demo`]
#[derive(Debug, Clone)]
pub struct DemoSummary {
    pub stats: TickStats,
    pub targets: Vec<TargetReport>,
    pub typed: String,
    /// Names of the targets still drawn after the run, back to front
    pub drawn: Vec<String>,
}

/// Runs the demo scene for `seconds` of simulated time
pub fn run_demo(tick: TickConfig, seconds: f64, seed: u64) -> anyhow::Result<DemoSummary> {
    let relay = HandlerRelay::new();
    let root = ActorHandler::new(HandlerType::Actor);
    let drawables = DrawableHandler::by_depth();
    let mouse = MouseHandler::new();
    let keys = KeyHandler::new();

    relay.register(root.clone(), false, false);
    relay.register(drawables.clone(), false, false);
    relay.register(mouse.clone(), false, false);
    relay.register(keys.clone(), false, false);

    // Input is scripted first so the handlers fold it in the same tick
    let script: Arc<dyn Actor> = Arc::new(ScriptedInput {
        dead: StateOperator::default(),
        mouse: mouse.clone(),
        keys: keys.clone(),
        rng: Mutex::new(StdRng::seed_from_u64(seed)),
        tick: AtomicU32::new(0),
    });
    root.add(script);
    root.add(mouse.clone());
    root.add(keys.clone());
    root.add(Arc::new(Lifetime {
        dead: StateOperator::default(),
        remaining: Mutex::new(seconds),
        root: Arc::downgrade(&root),
    }));

    let targets = [
        ClickTarget::new("backdrop", FIELD, 10, u32::MAX),
        ClickTarget::new("panel", Rect::new(50.0, 50.0, 200.0, 150.0), 5, 25),
        ClickTarget::new("button", Rect::new(100.0, 100.0, 40.0, 20.0), 1, 2),
    ];
    for target in &targets {
        let participant: Arc<dyn Participant> = target.clone();
        relay.broadcast_add(&participant);
    }
    let logger = KeyLogger::new();
    let participant: Arc<dyn Participant> = logger.clone();
    relay
        .add_to(HandlerType::Key, &participant)
        .context("registering the key logger")?;

    info!(seconds, seed, handlers = ?relay.handler_types(), "Demo scene ready");

    let stepper = Arc::new(StepHandler::new(root, tick).context("invalid tick settings")?);
    let stats = Arc::clone(&stepper)
        .spawn()
        .context("spawning the tick thread")?
        .join()
        .map_err(|_| anyhow!("tick thread panicked"))?;

    let mut frame: Vec<String> = Vec::new();
    drawables.draw(&mut frame);

    let typed = logger.typed.lock().clone();
    Ok(DemoSummary {
        stats,
        targets: targets.iter().map(|target| target.report()).collect(),
        typed,
        drawn: frame,
    })
}
