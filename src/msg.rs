use crossterm::event::KeyEvent;
use std::path::PathBuf;

/// Direction for list cursor movement.
#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Up,
    Down,
    Top,
    Bottom,
}

/// All possible messages that drive state transitions.
#[derive(Debug)]
#[allow(dead_code)] // The full message surface; key handlers construct only part of it.
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- Selection
    MoveCursor(Direction),
    ToggleUnderCursor,
    SelectAll,
    SelectNone,

    // -- Mode
    SetMode(crate::model::mode::Mode),

    // -- Config
    ConfigChanged(PathBuf),

    // -- System
    Accept,
    Tick,
    Quit,
}
