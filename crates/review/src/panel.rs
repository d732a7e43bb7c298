//! Snapshot of what the review shows for the current position.
//!
//! A `ReviewPanel` is rebuilt from orchestrator state on every call, so a
//! late network response can only ever show up through the caches.

use std::fmt;

use chess_core::analysis::MoveQuality;
use chess_core::board::render_board;
use chess_core::game_data::{Evaluation, GameHeaders};
use shakmaty::Square;

use crate::api::{Explanation, GameSummary};
use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Evaluation,
    Explanation,
    AlternateLine,
    AlternateExplanation,
    Summary,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Upload => "upload",
            Operation::Evaluation => "evaluation",
            Operation::Explanation => "explanation",
            Operation::AlternateLine => "alternate line",
            Operation::AlternateExplanation => "alternate explanation",
            Operation::Summary => "summary",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyFailure {
    pub ply: usize,
    pub error: FetchError,
}

/// Last failure per operation. Cancellation never lands here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationErrors {
    pub upload: Option<FetchError>,
    pub evaluation: Option<PlyFailure>,
    pub explanation: Option<PlyFailure>,
    pub alternate_line: Option<PlyFailure>,
    pub alternate_explanation: Option<PlyFailure>,
    pub summary: Option<FetchError>,
}

impl OperationErrors {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(e) = &self.upload {
            out.push(format!("{}: {e}", Operation::Upload));
        }
        for (op, failure) in [
            (Operation::Evaluation, &self.evaluation),
            (Operation::Explanation, &self.explanation),
            (Operation::AlternateLine, &self.alternate_line),
            (Operation::AlternateExplanation, &self.alternate_explanation),
        ] {
            if let Some(f) = failure {
                out.push(format!("{op} (ply {}): {}", f.ply, f.error));
            }
        }
        if let Some(e) = &self.summary {
            out.push(format!("{}: {e}", Operation::Summary));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualitySource {
    /// From the explanation service; authoritative
    Server,
    /// Derived locally from the evaluation pair
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayedQuality {
    pub quality: MoveQuality,
    pub source: QualitySource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelMode {
    NoGame,
    Main {
        ply: usize,
        last_ply: usize,
    },
    Alternate {
        anchor: usize,
        index: usize,
        len: usize,
        start_ply: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPanel {
    pub mode: PanelMode,
    pub headers: Option<GameHeaders>,
    pub fen: Option<String>,
    pub last_move_san: Option<String>,
    /// `None` means "no evaluation"
    pub evaluation: Option<Evaluation>,
    pub quality: Option<DisplayedQuality>,
    /// Destination square of the classified move
    pub dot: Option<Square>,
    pub explanation: Option<Explanation>,
    pub alternate_notes: Option<Vec<String>>,
    pub summary: Option<GameSummary>,
    pub is_analyzing: bool,
    pub is_explaining: bool,
    pub is_branching: bool,
    pub errors: OperationErrors,
}

/// "3. Nf3" for White's move at ply 5, "3... Nc6" for Black's at ply 6.
pub fn move_label(ply: usize, san: &str) -> String {
    let number = (ply + 1) / 2;
    if ply % 2 == 1 {
        format!("{number}. {san}")
    } else {
        format!("{number}... {san}")
    }
}

impl fmt::Display for ReviewPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(h) = &self.headers {
            writeln!(f, "{} vs {} ({})", h.white_name, h.black_name, h.result)?;
        }

        let ply = match &self.mode {
            PanelMode::NoGame => return writeln!(f, "No game loaded"),
            PanelMode::Main { ply, last_ply } => {
                writeln!(f, "Main line, ply {ply}/{last_ply}")?;
                *ply
            }
            PanelMode::Alternate {
                anchor,
                index,
                len,
                start_ply,
            } => {
                writeln!(
                    f,
                    "Alternate line from ply {anchor}, position {}/{}",
                    index + 1,
                    len
                )?;
                start_ply + index
            }
        };

        if let Some(san) = &self.last_move_san {
            writeln!(f, "Last move: {}", move_label(ply, san))?;
        }

        if let Some(fen) = &self.fen {
            match render_board(fen, self.dot) {
                Ok(diagram) => write!(f, "{diagram}")?,
                Err(_) => writeln!(f, "{fen}")?,
            }
        }

        if matches!(self.mode, PanelMode::Main { .. }) {
            match (&self.evaluation, self.is_analyzing) {
                (Some(eval), _) => writeln!(f, "Eval: {eval}")?,
                (None, true) => writeln!(f, "Eval: analyzing...")?,
                (None, false) => writeln!(f, "Eval: no evaluation")?,
            }
            if let Some(q) = &self.quality {
                let source = match q.source {
                    QualitySource::Server => "engine",
                    QualitySource::Local => "local",
                };
                writeln!(f, "Quality: {} ({source})", q.quality)?;
            }
        }

        if let Some(explanation) = &self.explanation {
            if let Some(best) = &explanation.best_move_san {
                writeln!(f, "Played {}, engine best {best}", explanation.played_move_san)?;
            }
            for bullet in &explanation.bullets {
                writeln!(f, "  - {bullet}")?;
            }
            if let Some(pv) = &explanation.opponent_pv_san {
                if !pv.is_empty() {
                    writeln!(f, "  Opponent line: {}", pv.join(" "))?;
                }
            }
        } else if self.is_explaining {
            writeln!(f, "Explaining...")?;
        }

        if let Some(notes) = &self.alternate_notes {
            writeln!(f, "Why the game move was worse:")?;
            for note in notes {
                writeln!(f, "  - {note}")?;
            }
        }
        if self.is_branching {
            writeln!(f, "Loading alternate line...")?;
        }

        if let Some(summary) = &self.summary {
            writeln!(f, "Summary: {} wins ({})", summary.winner, summary.result)?;
            for (name, counts) in [
                (&summary.white_name, &summary.counts_white),
                (&summary.black_name, &summary.counts_black),
            ] {
                let tallies: Vec<String> = MoveQuality::ALL
                    .iter()
                    .map(|q| format!("{q} {}", counts.get(*q)))
                    .collect();
                writeln!(f, "  {name}: {}", tallies.join(", "))?;
            }
        }

        for message in self.errors.messages() {
            writeln!(f, "! {message}")?;
        }

        Ok(())
    }
}
