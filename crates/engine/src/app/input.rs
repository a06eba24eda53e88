use std::collections::HashSet;

use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::rendering::Vec2;

/// Held inputs, sampled every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    PanUp,
    PanDown,
    PanLeft,
    PanRight,
    OrbitLeft,
    OrbitRight,
}

const ACTION_COUNT: usize = 6;

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::PanUp => 0,
            InputAction::PanDown => 1,
            InputAction::PanLeft => 2,
            InputAction::PanRight => 3,
            InputAction::OrbitLeft => 4,
            InputAction::OrbitRight => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

/// Edge-triggered inputs: one command per key press, never on auto-repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleAlarmFilter,
    TogglePlay,
    StepBackward,
    StepForward,
    SeekStart,
    SeekEnd,
    SlowDown,
    SpeedUp,
    Quit,
}

/// Which screen the keyboard drives. Replay claims Left/Right for stepping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Live,
    Replay,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    actions: ActionStates,
    commands: Vec<Command>,
    cursor_position_px: Option<Vec2>,
    cursor_moved: bool,
    left_click_pressed: bool,
    zoom_delta_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn has_command(&self, command: Command) -> bool {
        self.commands.contains(&command)
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn cursor_moved(&self) -> bool {
        self.cursor_moved
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn zoom_delta_steps(&self) -> i32 {
        self.zoom_delta_steps
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Unit pan direction from the held pan keys, +y up.
    pub fn pan_direction(&self) -> (f64, f64) {
        let axis = |positive: InputAction, negative: InputAction| {
            f64::from(i8::from(self.is_down(positive)) - i8::from(self.is_down(negative)))
        };
        (
            axis(InputAction::PanRight, InputAction::PanLeft),
            axis(InputAction::PanUp, InputAction::PanDown),
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    mode: InputMode,
    quit_requested: bool,
    keys_down: HashSet<KeyCode>,
    pending_commands: Vec<Command>,
    pending_zoom_steps: i32,
    action_states: ActionStates,
    cursor_position_px: Option<Vec2>,
    cursor_moved: bool,
    left_mouse_is_down: bool,
    left_click_pressed_edge: bool,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    pub(crate) fn new(mode: InputMode, window_width: u32, window_height: u32) -> Self {
        Self {
            mode,
            window_width,
            window_height,
            ..Self::default()
        }
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let is_pressed = state == ElementState::Pressed;
        if let Some(action) = held_action_for(self.mode, code) {
            self.action_states.set(action, is_pressed);
        }
        if !is_pressed {
            self.keys_down.remove(&code);
            return;
        }
        // `insert` is false while the key is already held.
        if !self.keys_down.insert(code) {
            return;
        }
        match code {
            KeyCode::Equal | KeyCode::NumpadAdd => {
                self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(1);
            }
            KeyCode::Minus | KeyCode::NumpadSubtract => {
                self.pending_zoom_steps = self.pending_zoom_steps.saturating_sub(1);
            }
            _ => {}
        }
        if let Some(command) = command_for(self.mode, code) {
            if command == Command::Quit {
                self.mark_quit_requested();
            }
            self.pending_commands.push(command);
        }
    }

    pub(crate) fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                if !self.left_mouse_is_down {
                    self.left_click_pressed_edge = true;
                }
                self.left_mouse_is_down = true;
            }
            ElementState::Released => self.left_mouse_is_down = false,
        }
    }

    pub(crate) fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = zoom_steps_from_scroll_delta(delta);
        self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(steps);
    }

    pub(crate) fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    pub(crate) fn set_cursor_position_px(&mut self, x: f64, y: f64) {
        self.cursor_position_px = Some(Vec2::new(x, y));
        self.cursor_moved = true;
    }

    pub(crate) fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
        self.cursor_moved = true;
    }

    /// Hands out everything gathered since the previous frame and resets the
    /// edge state.
    pub(crate) fn snapshot_for_frame(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            actions: self.action_states,
            commands: std::mem::take(&mut self.pending_commands),
            cursor_position_px: self.cursor_position_px,
            cursor_moved: self.cursor_moved,
            left_click_pressed: self.left_click_pressed_edge,
            zoom_delta_steps: self.pending_zoom_steps,
            window_width: self.window_width,
            window_height: self.window_height,
        };
        self.cursor_moved = false;
        self.left_click_pressed_edge = false;
        self.pending_zoom_steps = 0;
        snapshot
    }
}

fn held_action_for(mode: InputMode, code: KeyCode) -> Option<InputAction> {
    match (mode, code) {
        (_, KeyCode::KeyW | KeyCode::ArrowUp) => Some(InputAction::PanUp),
        (_, KeyCode::KeyS | KeyCode::ArrowDown) => Some(InputAction::PanDown),
        (_, KeyCode::KeyA) | (InputMode::Live, KeyCode::ArrowLeft) => Some(InputAction::PanLeft),
        (_, KeyCode::KeyD) | (InputMode::Live, KeyCode::ArrowRight) => Some(InputAction::PanRight),
        (_, KeyCode::KeyQ) => Some(InputAction::OrbitLeft),
        (_, KeyCode::KeyE) => Some(InputAction::OrbitRight),
        _ => None,
    }
}

fn command_for(mode: InputMode, code: KeyCode) -> Option<Command> {
    match (mode, code) {
        (_, KeyCode::Escape) => Some(Command::Quit),
        (InputMode::Live, KeyCode::KeyF) => Some(Command::ToggleAlarmFilter),
        (InputMode::Replay, KeyCode::Space) => Some(Command::TogglePlay),
        (InputMode::Replay, KeyCode::ArrowLeft) => Some(Command::StepBackward),
        (InputMode::Replay, KeyCode::ArrowRight) => Some(Command::StepForward),
        (InputMode::Replay, KeyCode::Home) => Some(Command::SeekStart),
        (InputMode::Replay, KeyCode::End) => Some(Command::SeekEnd),
        (InputMode::Replay, KeyCode::BracketLeft) => Some(Command::SlowDown),
        (InputMode::Replay, KeyCode::BracketRight) => Some(Command::SpeedUp),
        _ => None,
    }
}

pub(crate) fn zoom_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(position) => {
            if position.y > 0.0 {
                1
            } else if position.y < 0.0 {
                -1
            } else {
                0
            }
        }
    }
}
