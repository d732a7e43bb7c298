use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::board;

/// Identifier the analysis service assigns to an uploaded game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub i64);

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameHeaders {
    pub white_name: String,
    pub black_name: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
    pub winner: String, // "White", "Black", "Draw", "Unknown"
}

impl Default for GameHeaders {
    fn default() -> Self {
        Self {
            white_name: "White".to_string(),
            black_name: "Black".to_string(),
            result: "*".to_string(),
            winner: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameDataError {
    #[error("Game has no positions")]
    NoPositions,

    #[error("Expected {expected} moves for {positions} positions, got {actual}")]
    MoveCountMismatch {
        positions: usize,
        expected: usize,
        actual: usize,
    },
}

/// An uploaded game: one FEN per ply (ply 0 is the initial position) and
/// the SAN of each move played between consecutive positions.
///
/// Sessions are immutable; a new upload builds a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    game_id: GameId,
    headers: GameHeaders,
    positions: Vec<String>,
    moves_san: Vec<String>,
}

impl GameSession {
    pub fn new(
        game_id: GameId,
        headers: GameHeaders,
        positions: Vec<String>,
        moves_san: Vec<String>,
    ) -> Result<Self, GameDataError> {
        if positions.is_empty() {
            return Err(GameDataError::NoPositions);
        }
        let expected = positions.len() - 1;
        if moves_san.len() != expected {
            return Err(GameDataError::MoveCountMismatch {
                positions: positions.len(),
                expected,
                actual: moves_san.len(),
            });
        }

        Ok(Self {
            game_id,
            headers,
            positions,
            moves_san,
        })
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn headers(&self) -> &GameHeaders {
        &self.headers
    }

    /// Highest valid ply index.
    pub fn last_ply(&self) -> usize {
        self.positions.len() - 1
    }

    pub fn fen(&self, ply: usize) -> Option<&str> {
        self.positions.get(ply).map(String::as_str)
    }

    /// SAN of the move that produced the position at `ply`.
    pub fn move_san(&self, ply: usize) -> Option<&str> {
        ply.checked_sub(1)
            .and_then(|i| self.moves_san.get(i))
            .map(String::as_str)
    }

    /// Side that played the move leading to `ply`. Read from the FEN of the
    /// previous position, falling back to ply parity for a standard start.
    pub fn mover(&self, ply: usize) -> Option<Color> {
        let before = self.fen(ply.checked_sub(1)?)?;
        self.fen(ply)?;
        Some(board::side_to_move(before).unwrap_or(if ply % 2 == 1 {
            Color::White
        } else {
            Color::Black
        }))
    }

    pub fn positions(&self) -> &[String] {
        &self.positions
    }

    pub fn moves_san(&self) -> &[String] {
        &self.moves_san
    }
}

/// Engine evaluation of one position, from White's point of view.
/// Exactly one of the two scores is meaningful; mate wins when both are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
}

impl Evaluation {
    pub fn centipawns(cp: i32) -> Self {
        Self {
            score_cp: Some(cp),
            score_mate: None,
        }
    }

    pub fn mate(n: i32) -> Self {
        Self {
            score_cp: None,
            score_mate: Some(n),
        }
    }

    pub fn display(&self) -> String {
        match (self.score_mate, self.score_cp) {
            (Some(m), _) => format!("#{m}"),
            (None, Some(cp)) => format!("{:+.2}", cp as f64 / 100.0),
            (None, None) => "?".to_string(),
        }
    }
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
