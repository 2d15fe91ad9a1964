//! Keyboard navigation over the marking grid.
//!
//! Rows are students in roster order. Column -1 is the name cell and columns
//! 0..N are the section cells in section order. Everything here is a pure
//! function of the event, the current focus and the grid shape; applying the
//! outcome is the controller's job.

use crate::model::{find_hotkey, HotkeyBinding};
use serde::Serialize;

pub const NAME_COL: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Up,
    Down,
    Left,
    Right,
    /// Enter or Tab.
    Advance,
    Char(char),
    Other,
}

impl KeyEvent {
    pub fn parse(key: &str) -> Self {
        match key {
            "ArrowUp" | "up" => Self::Up,
            "ArrowDown" | "down" => Self::Down,
            "ArrowLeft" | "left" => Self::Left,
            "ArrowRight" | "right" => Self::Right,
            "Enter" | "Tab" => Self::Advance,
            _ => {
                let mut it = key.chars();
                match (it.next(), it.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Other,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Name { row: usize },
    Section { row: usize, col: usize },
}

impl Focus {
    /// Grid coordinate with the name cell at column -1.
    pub fn from_coords(row: i64, col: i64) -> Option<Self> {
        let row = usize::try_from(row).ok()?;
        if col == NAME_COL {
            return Some(Self::Name { row });
        }
        let col = usize::try_from(col).ok()?;
        Some(Self::Section { row, col })
    }

    pub fn row(self) -> usize {
        match self {
            Self::Name { row } | Self::Section { row, .. } => row,
        }
    }

    pub fn col(self) -> i64 {
        match self {
            Self::Name { .. } => NAME_COL,
            Self::Section { col, .. } => col as i64,
        }
    }

    fn with_row(self, row: usize) -> Self {
        match self {
            Self::Name { .. } => Self::Name { row },
            Self::Section { col, .. } => Self::Section { row, col },
        }
    }

    /// Arriving on a section cell selects its value so typing overwrites it.
    pub fn selects_all(self) -> bool {
        matches!(self, Self::Section { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub rows: usize,
    pub sections: usize,
}

impl GridShape {
    pub fn contains(&self, focus: Focus) -> bool {
        match focus {
            Focus::Name { row } => row < self.rows,
            Focus::Section { row, col } => row < self.rows && col < self.sections,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    MoveFocus(Focus),
    /// Reduce the focused cell by this amount; focus stays put.
    ApplyDeduction(i64),
    AdvanceOrCreate,
    Stay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    MoveFocus(Focus),
    /// Last section of the last row: append a student, focus its name cell.
    AppendRow,
}

pub fn decide(
    event: KeyEvent,
    focus: Focus,
    shape: GridShape,
    hotkeys: &[HotkeyBinding],
) -> Decision {
    if !shape.contains(focus) {
        return Decision::Stay;
    }

    match event {
        KeyEvent::Up => match focus.row().checked_sub(1) {
            Some(row) => Decision::MoveFocus(focus.with_row(row)),
            None => Decision::Stay,
        },
        KeyEvent::Down => {
            let row = focus.row() + 1;
            if row < shape.rows {
                Decision::MoveFocus(focus.with_row(row))
            } else {
                Decision::Stay
            }
        }
        KeyEvent::Left => match focus {
            Focus::Name { .. } => Decision::Stay,
            Focus::Section { row, col: 0 } => Decision::MoveFocus(Focus::Name { row }),
            Focus::Section { row, col } => {
                Decision::MoveFocus(Focus::Section { row, col: col - 1 })
            }
        },
        KeyEvent::Right => step_right(focus, shape),
        KeyEvent::Advance => match focus {
            Focus::Name { .. } => step_right(focus, shape),
            Focus::Section { .. } => Decision::AdvanceOrCreate,
        },
        KeyEvent::Char(c) => match focus {
            Focus::Name { .. } => Decision::Stay,
            Focus::Section { .. } => match find_hotkey(hotkeys, c) {
                Some(hk) => Decision::ApplyDeduction(hk.deduction),
                None => Decision::Stay,
            },
        },
        KeyEvent::Other => Decision::Stay,
    }
}

fn step_right(focus: Focus, shape: GridShape) -> Decision {
    let next = match focus {
        Focus::Name { row } => Focus::Section { row, col: 0 },
        Focus::Section { row, col } => Focus::Section { row, col: col + 1 },
    };
    if shape.contains(next) {
        Decision::MoveFocus(next)
    } else {
        Decision::Stay
    }
}

pub fn resolve_advance(focus: Focus, shape: GridShape) -> Advance {
    let row = focus.row();
    if let Focus::Section { col, .. } = focus {
        let next = Focus::Section { row, col: col + 1 };
        if shape.contains(next) {
            return Advance::MoveFocus(next);
        }
    }
    if row + 1 >= shape.rows {
        Advance::AppendRow
    } else {
        Advance::MoveFocus(Focus::Name { row: row + 1 })
    }
}

/// Value left in a cell after a hotkey deduction.
pub fn deduct(current: i64, deduction: i64) -> i64 {
    current.saturating_sub(deduction).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusView {
    pub row: usize,
    pub col: i64,
    pub select_all: bool,
}

impl FocusView {
    /// Focus that just moved here.
    pub fn arrived(f: Focus) -> Self {
        Self {
            row: f.row(),
            col: f.col(),
            select_all: f.selects_all(),
        }
    }

    /// Focus that stayed where it was, e.g. after a deduction.
    pub fn held(f: Focus) -> Self {
        Self {
            row: f.row(),
            col: f.col(),
            select_all: false,
        }
    }
}
