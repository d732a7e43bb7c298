//! View modes and ply navigation.
//!
//! The review is either on the game's main line or inside an alternate line
//! branched off it. Each mode carries its own pointer, so there is no state
//! in which both are partially active.

use crate::api::AlternateLineResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Forward,
    Back,
    Start,
    End,
    Goto(usize),
}

/// Apply `cmd` to a pointer over `[0, last]`.
pub fn step(current: usize, last: usize, cmd: NavCommand) -> usize {
    let next = match cmd {
        NavCommand::Forward => current.saturating_add(1),
        NavCommand::Back => current.saturating_sub(1),
        NavCommand::Start => 0,
        NavCommand::End => last,
        NavCommand::Goto(ply) => ply,
    };
    next.min(last)
}

/// A continuation explored from `anchor`, navigable on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateLine {
    anchor: usize,
    /// Main-line ply to restore when leaving the branch
    return_ply: usize,
    start_ply: usize,
    fens: Vec<String>,
    moves_san: Vec<String>,
    index: usize,
}

impl AlternateLine {
    /// `None` if the service returned no positions.
    pub fn new(anchor: usize, return_ply: usize, line: AlternateLineResponse) -> Option<Self> {
        if line.fens.is_empty() {
            return None;
        }
        Some(Self {
            anchor,
            return_ply,
            start_ply: line.start_ply,
            fens: line.fens,
            moves_san: line.moves_san,
            index: 0,
        })
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn return_ply(&self) -> usize {
        self.return_ply
    }

    /// Main-line ply number of the branch's first position
    pub fn start_ply(&self) -> usize {
        self.start_ply
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.fens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fens.is_empty()
    }

    pub fn fen(&self) -> &str {
        &self.fens[self.index]
    }

    /// SAN of the move that reached the current branch position.
    pub fn move_san(&self) -> Option<&str> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.moves_san.get(i))
            .map(String::as_str)
    }

    pub fn moves_san(&self) -> &[String] {
        &self.moves_san
    }

    pub fn navigate(&mut self, cmd: NavCommand) {
        self.index = step(self.index, self.fens.len() - 1, cmd);
    }

    pub fn rewind(&mut self) {
        self.index = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    Main { ply: usize },
    Alternate(AlternateLine),
}

impl ViewMode {
    pub fn is_main(&self) -> bool {
        matches!(self, ViewMode::Main { .. })
    }

    /// Current main-line ply, or `None` while in an alternate line.
    pub fn main_ply(&self) -> Option<usize> {
        match self {
            ViewMode::Main { ply } => Some(*ply),
            ViewMode::Alternate(_) => None,
        }
    }

    pub fn alternate(&self) -> Option<&AlternateLine> {
        match self {
            ViewMode::Alternate(line) => Some(line),
            ViewMode::Main { .. } => None,
        }
    }
}

impl Default for ViewMode {
    fn default() -> Self {
        ViewMode::Main { ply: 0 }
    }
}
