use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use thiserror::Error;

use crate::engine::ZoneEngine;
use crate::error::ZoneError;

use super::map::FieldMap;
use super::panel::ProbePanel;
use super::state::{ProbeKey, ProbeState};

pub type DriverResult<T> = std::result::Result<T, ProbeDriverError>;

#[derive(Debug, Error)]
pub enum ProbeDriverError {
    #[error("engine error: {0}")]
    Zone(#[from] ZoneError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

const GUTTER: &str = "  ";

/// Terminal driver for the zone tester. Owns the engine and manages raw mode
/// and the alternate screen around the key loop.
pub struct ProbeDriver {
    engine: ZoneEngine,
    state: ProbeState,
    map: FieldMap,
    panel: ProbePanel,
}

impl ProbeDriver {
    pub fn new(engine: ZoneEngine) -> Self {
        let state = ProbeState::new(engine.config().grid.half_extent());
        Self {
            engine,
            state,
            map: FieldMap::default(),
            panel: ProbePanel::default(),
        }
    }

    pub fn with_map(mut self, map: FieldMap) -> Self {
        self.map = map;
        self
    }

    pub fn state(&self) -> &ProbeState {
        &self.state
    }

    pub fn engine(&self) -> &ZoneEngine {
        &self.engine
    }

    pub fn run(mut self) -> DriverResult<ProbeState> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.run_inner(&mut stdout);
        self.exit(&mut stdout);
        result.map(|_| self.state)
    }

    /// Feed a fixed key sequence, drawing one frame per key. Stops early on
    /// `Quit`.
    pub fn run_scripted<I>(&mut self, out: &mut impl Write, keys: I) -> DriverResult<ProbeState>
    where
        I: IntoIterator<Item = ProbeKey>,
    {
        self.draw(out)?;
        for key in keys {
            if !self.state.apply(key) {
                break;
            }
            self.draw(out)?;
        }
        Ok(self.state)
    }

    /// Map and panel side by side.
    pub fn frame(&mut self) -> Vec<String> {
        let map = self.map.render(&mut self.engine, &self.state);
        let panel = self.panel.render(&mut self.engine, &self.state);
        let blank = " ".repeat(self.map.cols);
        let rows = map.len().max(panel.len());
        (0..rows)
            .map(|idx| {
                let left = map.get(idx).map(String::as_str).unwrap_or(blank.as_str());
                let right = panel.get(idx).map(String::as_str).unwrap_or("");
                format!("{left}{GUTTER}{right}")
            })
            .collect()
    }

    fn run_inner(&mut self, stdout: &mut impl Write) -> DriverResult<()> {
        self.draw(stdout)?;
        loop {
            let Event::Key(key_event) = event::read()? else {
                continue;
            };
            let Some(key) = ProbeKey::from_key_event(&key_event) else {
                continue;
            };
            if !self.state.apply(key) {
                return Ok(());
            }
            self.draw(stdout)?;
        }
    }

    fn draw(&mut self, out: &mut impl Write) -> DriverResult<()> {
        let lines = self.frame();
        queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
        for (row, line) in lines.iter().enumerate() {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            queue!(out, MoveTo(0, row))?;
            out.write_all(line.as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }

    fn enter(&self, stdout: &mut impl Write) -> DriverResult<()> {
        terminal::enable_raw_mode().map_err(|err| ProbeDriverError::Terminal(err.to_string()))?;
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(stdout, Show, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}
