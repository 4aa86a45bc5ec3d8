//! Input pipeline health check

use std::sync::Arc;

use parking_lot::Mutex;

use crate::app::input::{
    ButtonStatus, EventSelector, KeyContent, KeyEvent, KeyHandler, KeyListener, MouseButton,
    MouseEvent, MouseHandler, MouseListener, MovementType, Position, Rect,
};
use crate::handler::{Actor, Handled};
use crate::health::check::{CheckResult, Findings, SystemCheck};
use crate::state::StateOperator;

/// Records every event it is offered
struct Recorder {
    dead: StateOperator,
    area: Rect,
    mouse_selector: EventSelector<MouseEvent>,
    key_selector: EventSelector<KeyEvent>,
    mouse: Mutex<Vec<MouseEvent>>,
    keys: Mutex<Vec<KeyEvent>>,
}

impl Recorder {
    fn new(area: Rect) -> Arc<Self> {
        Arc::new(Self {
            dead: StateOperator::default(),
            area,
            mouse_selector: EventSelector::movement(&[
                MovementType::Enter,
                MovementType::Over,
                MovementType::Exit,
            ])
            .or(EventSelector::button(
                MouseButton::Left,
                &[ButtonStatus::Pressed, ButtonStatus::Released],
            )),
            key_selector: EventSelector::key(KeyContent::Code(32)),
            mouse: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
        })
    }

    fn take_mouse(&self) -> Vec<String> {
        std::mem::take(&mut *self.mouse.lock())
            .iter()
            .map(|event| match (event.movement(), event.button()) {
                (Some(movement), _) => format!("{:?}", movement),
                (None, Some((_, status))) => format!("{:?}", status),
                (None, None) => "Wheel".to_string(),
            })
            .collect()
    }

    fn take_keys(&self) -> Vec<ButtonStatus> {
        std::mem::take(&mut *self.keys.lock())
            .iter()
            .map(|event| event.status)
            .collect()
    }
}

impl Handled for Recorder {
    fn is_dead(&self) -> &StateOperator {
        &self.dead
    }
}

impl MouseListener for Recorder {
    fn on_mouse_event(&self, event: &MouseEvent) {
        self.mouse.lock().push(*event);
    }

    fn event_selector(&self) -> &EventSelector<MouseEvent> {
        &self.mouse_selector
    }

    fn is_in_area_of_interest(&self, position: Position) -> bool {
        self.area.contains(position)
    }
}

impl KeyListener for Recorder {
    fn on_key_event(&self, event: &KeyEvent) {
        self.keys.lock().push(*event);
    }

    fn event_selector(&self) -> &EventSelector<KeyEvent> {
        &self.key_selector
    }
}

/// Feeds scripted signals through the mouse and key handlers
pub struct InputPipelineCheck;

impl InputPipelineCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InputPipelineCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for InputPipelineCheck {
    fn name(&self) -> &'static str {
        "Input"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates enter/over/exit and pressed/down/released edge pulses")
    }

    fn check(&self) -> CheckResult {
        let mut findings = Findings::new();
        let recorder = Recorder::new(Rect::new(0.0, 0.0, 100.0, 100.0));

        let mouse = MouseHandler::new();
        mouse.add(recorder.clone());
        let mut ticks = Vec::new();
        for position in [[50.0, 50.0], [60.0, 60.0], [150.0, 150.0], [50.0, 50.0]] {
            mouse.set_position(position);
            mouse.act(0.016);
            ticks.push(recorder.take_mouse().join(","));
        }
        findings.expect(
            ticks == ["Enter", "Over", "Exit", "Enter"],
            format!("Movement pulses: {}", ticks.join(" | ")),
        );

        mouse.set_button_state(MouseButton::Left, true);
        mouse.act(0.016);
        mouse.act(0.016);
        mouse.set_button_state(MouseButton::Left, false);
        mouse.act(0.016);
        let buttons = recorder.take_mouse();
        findings.expect(
            buttons == ["Over", "Pressed", "Over", "Over", "Released"],
            format!("Button pulses: {}", buttons.join(",")),
        );

        let keys = KeyHandler::new();
        keys.add(recorder.clone());
        keys.on_key_pressed(' ', 32, false);
        keys.act(0.016);
        keys.on_key_pressed(' ', 32, false);
        keys.act(0.016);
        keys.on_key_released(' ', 32, false);
        keys.act(0.016);
        keys.act(0.016);
        let statuses = recorder.take_keys();
        findings.expect(
            statuses
                == [
                    ButtonStatus::Pressed,
                    ButtonStatus::Down,
                    ButtonStatus::Down,
                    ButtonStatus::Released,
                ],
            format!("Key pulses: {:?}", statuses),
        );

        findings.finish("Edge detection behaves", "Edge detection broken")
    }
}
