//! Move-quality classification from a pair of engine evaluations.

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::game_data::Evaluation;

/// Impact thresholds (pawns lost by the mover)
const THRESHOLD_BLUNDER: f64 = -2.0;
const THRESHOLD_BAD: f64 = -0.75;

/// Pawn value a mate score saturates to
const MATE_PAWNS: f64 = 100.0;

/// Move quality as reported by the explanation service. The local
/// classifier only ever produces `Good`, `Bad` or `Blunder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    Perfect,
    Best,
    Good,
    Okay,
    Bad,
    Blunder,
}

impl MoveQuality {
    pub const ALL: [MoveQuality; 6] = [
        MoveQuality::Perfect,
        MoveQuality::Best,
        MoveQuality::Good,
        MoveQuality::Okay,
        MoveQuality::Bad,
        MoveQuality::Blunder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveQuality::Perfect => "perfect",
            MoveQuality::Best => "best",
            MoveQuality::Good => "good",
            MoveQuality::Okay => "okay",
            MoveQuality::Bad => "bad",
            MoveQuality::Blunder => "blunder",
        }
    }
}

impl std::fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-side quality tallies from the game summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCounts {
    pub perfect: u32,
    pub best: u32,
    pub good: u32,
    pub okay: u32,
    pub bad: u32,
    pub blunder: u32,
}

impl QualityCounts {
    pub fn get(&self, quality: MoveQuality) -> u32 {
        match quality {
            MoveQuality::Perfect => self.perfect,
            MoveQuality::Best => self.best,
            MoveQuality::Good => self.good,
            MoveQuality::Okay => self.okay,
            MoveQuality::Bad => self.bad,
            MoveQuality::Blunder => self.blunder,
        }
    }

    pub fn total(&self) -> u32 {
        MoveQuality::ALL.iter().map(|q| self.get(*q)).sum()
    }
}

/// White-POV pawn value. Mate saturates to ±100, a missing score counts as 0.
pub fn white_pawns(eval: &Evaluation) -> f64 {
    if let Some(m) = eval.score_mate {
        if m > 0 {
            MATE_PAWNS
        } else {
            -MATE_PAWNS
        }
    } else if let Some(cp) = eval.score_cp {
        cp as f64 / 100.0
    } else {
        0.0
    }
}

/// Pawns gained (positive) or lost (negative) by `mover` across one ply.
pub fn move_impact(before: &Evaluation, after: &Evaluation, mover: Color) -> f64 {
    let before = white_pawns(before);
    let after = white_pawns(after);
    match mover {
        Color::White => after - before,
        Color::Black => before - after,
    }
}

pub fn classify_impact(impact: f64) -> MoveQuality {
    if impact <= THRESHOLD_BLUNDER {
        MoveQuality::Blunder
    } else if impact <= THRESHOLD_BAD {
        MoveQuality::Bad
    } else {
        MoveQuality::Good
    }
}

/// Coarse label for the move between two consecutive evaluations.
pub fn classify_move(before: &Evaluation, after: &Evaluation, mover: Color) -> MoveQuality {
    classify_impact(move_impact(before, after, mover))
}
