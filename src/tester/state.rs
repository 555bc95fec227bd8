use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub const MIN_STEP: f64 = 0.25;
pub const MAX_STEP: f64 = 12.0;
pub const STEP_FACTOR: f64 = 1.5;

/// Keys the tester reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKey {
    Left,
    Right,
    Up,
    Down,
    Grow,
    Shrink,
    Quit,
}

impl ProbeKey {
    pub fn from_key_event(event: &KeyEvent) -> Option<Self> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        match event.code {
            KeyCode::Left => Some(ProbeKey::Left),
            KeyCode::Right => Some(ProbeKey::Right),
            KeyCode::Up => Some(ProbeKey::Up),
            KeyCode::Down => Some(ProbeKey::Down),
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(ProbeKey::Quit)
            }
            KeyCode::Char('+' | '=') => Some(ProbeKey::Grow),
            KeyCode::Char('-' | '_') => Some(ProbeKey::Shrink),
            KeyCode::Char('q') | KeyCode::Esc => Some(ProbeKey::Quit),
            _ => None,
        }
    }
}

/// Probe position and step, kept inside the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeState {
    pub x: f64,
    pub y: f64,
    pub step: f64,
    half_extent: f64,
}

impl ProbeState {
    pub fn new(half_extent: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            step: 1.0,
            half_extent: half_extent.abs(),
        }
    }

    pub fn half_extent(&self) -> f64 {
        self.half_extent
    }

    /// Apply one key. Returns false for `Quit`.
    pub fn apply(&mut self, key: ProbeKey) -> bool {
        let limit = self.half_extent;
        match key {
            ProbeKey::Left => self.x = (self.x - self.step).clamp(-limit, limit),
            ProbeKey::Right => self.x = (self.x + self.step).clamp(-limit, limit),
            ProbeKey::Up => self.y = (self.y + self.step).clamp(-limit, limit),
            ProbeKey::Down => self.y = (self.y - self.step).clamp(-limit, limit),
            ProbeKey::Grow => self.step = (self.step * STEP_FACTOR).min(MAX_STEP),
            ProbeKey::Shrink => self.step = (self.step / STEP_FACTOR).max(MIN_STEP),
            ProbeKey::Quit => return false,
        }
        true
    }
}
