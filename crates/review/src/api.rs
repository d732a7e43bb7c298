//! Request and response bodies of the analysis service.
//!
//! Only the fields the review client reads are modelled; everything else in
//! a response is ignored.

use chess_core::analysis::{MoveQuality, QualityCounts};
use chess_core::game_data::{Evaluation, GameDataError, GameHeaders, GameId, GameSession};
use serde::{Deserialize, Serialize};

// ---- Requests ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeFenRequest {
    pub fen: String,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeGameRequest {
    pub game_id: GameId,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainMoveRequest {
    pub game_id: GameId,
    pub ply: usize,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternateLineRequest {
    pub game_id: GameId,
    pub ply: usize,
    pub depth: u32,
    pub max_plies: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainAlternateRequest {
    pub game_id: GameId,
    pub ply: usize,
    pub depth: u32,
}

// ---- Responses ----

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub game_id: GameId,
    /// FEN per ply, starting position first
    pub moves: Vec<String>,
    #[serde(default)]
    pub moves_san: Vec<String>,
    /// Older services send the move list under this key instead
    #[serde(default)]
    pub moves_uci: Vec<String>,
    #[serde(default)]
    pub white_name: Option<String>,
    #[serde(default)]
    pub black_name: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub winner: Option<String>,
}

impl UploadResponse {
    pub fn into_session(self) -> Result<GameSession, GameDataError> {
        let defaults = GameHeaders::default();
        let headers = GameHeaders {
            white_name: self.white_name.unwrap_or(defaults.white_name),
            black_name: self.black_name.unwrap_or(defaults.black_name),
            result: self.result.unwrap_or(defaults.result),
            winner: self.winner.unwrap_or(defaults.winner),
        };
        let moves = if self.moves_san.is_empty() {
            self.moves_uci
        } else {
            self.moves_san
        };
        GameSession::new(self.game_id, headers, self.moves, moves)
    }
}

/// `analyze_fen` scores are White-POV. `score_cp` may arrive as a float.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FenEvaluation {
    #[serde(default)]
    pub score_cp: Option<f64>,
    #[serde(default)]
    pub score_mate: Option<i32>,
}

impl From<FenEvaluation> for Evaluation {
    fn from(raw: FenEvaluation) -> Self {
        match raw.score_mate {
            Some(m) => Evaluation::mate(m),
            None => Evaluation {
                score_cp: raw.score_cp.map(|cp| cp.round() as i32),
                score_mate: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExplanationWire")]
pub struct Explanation {
    pub played_move_san: String,
    pub best_move_san: Option<String>,
    pub quality: MoveQuality,
    pub eval_after: f64,
    pub bullets: Vec<String>,
    pub opponent_pv_san: Option<Vec<String>>,
}

/// `explain_move` body as sent. The `_uci` keys are the older names and
/// only fill in when the `_san` key is absent.
#[derive(Deserialize)]
struct ExplanationWire {
    #[serde(default)]
    played_move_san: Option<String>,
    #[serde(default)]
    played_move_uci: Option<String>,
    #[serde(default)]
    best_move_san: Option<String>,
    #[serde(default)]
    best_move_uci: Option<String>,
    quality: MoveQuality,
    eval_after: f64,
    #[serde(default)]
    bullets: Vec<String>,
    #[serde(default)]
    opponent_pv_san: Option<Vec<String>>,
}

impl TryFrom<ExplanationWire> for Explanation {
    type Error = String;

    fn try_from(wire: ExplanationWire) -> Result<Self, Self::Error> {
        let played_move_san = wire
            .played_move_san
            .or(wire.played_move_uci)
            .ok_or_else(|| "missing field `played_move_san`".to_string())?;
        Ok(Self {
            played_move_san,
            best_move_san: wire.best_move_san.or(wire.best_move_uci),
            quality: wire.quality,
            eval_after: wire.eval_after,
            bullets: wire.bullets,
            opponent_pv_san: wire.opponent_pv_san,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlternateLineResponse {
    pub fens: Vec<String>,
    #[serde(default)]
    pub moves_san: Vec<String>,
    #[serde(default)]
    pub start_ply: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlternateExplanation {
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameSummary {
    pub white_name: String,
    pub black_name: String,
    pub winner: String,
    pub result: String,
    #[serde(default)]
    pub counts_white: QualityCounts,
    #[serde(default)]
    pub counts_black: QualityCounts,
}
