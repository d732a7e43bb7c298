//! FEN helpers for the review panel: side to move, the move-quality dot
//! square, and a plain-text board diagram.

use shakmaty::fen::ParseFenError;
use shakmaty::{Board, Color, File, Rank, Role, Square};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("FEN has no board field")]
    Empty,

    #[error("Invalid board FEN: {0}")]
    InvalidFen(#[from] ParseFenError),
}

/// Parse the piece-placement field of a full FEN.
pub fn parse_board(fen: &str) -> Result<Board, BoardError> {
    let placement = fen.split_whitespace().next().ok_or(BoardError::Empty)?;
    Ok(Board::from_ascii_board_fen(placement.as_bytes())?)
}

pub fn side_to_move(fen: &str) -> Option<Color> {
    match fen.split_whitespace().nth(1)? {
        "w" => Some(Color::White),
        "b" => Some(Color::Black),
        _ => None,
    }
}

/// Square the last move landed on, found by diffing two consecutive
/// positions for squares that became occupied by a different piece.
///
/// Castling changes two squares; the king's is used. Anything else that
/// does not narrow to one square yields `None` (no dot is drawn).
pub fn destination_square(fen_before: &str, fen_after: &str) -> Option<Square> {
    let before = parse_board(fen_before).ok()?;
    let after = parse_board(fen_after).ok()?;

    let changed: Vec<(Square, Role)> = Square::ALL
        .iter()
        .filter_map(|&sq| {
            let piece = after.piece_at(sq)?;
            (before.piece_at(sq) != Some(piece)).then_some((sq, piece.role))
        })
        .collect();

    match changed.as_slice() {
        [(sq, _)] => Some(*sq),
        [a, b] => [a, b]
            .into_iter()
            .find(|(_, role)| *role == Role::King)
            .map(|(sq, _)| *sq),
        _ => None,
    }
}

/// Eight-line text diagram, White at the bottom. `marker` is drawn in
/// brackets around the marked square.
pub fn render_board(fen: &str, marker: Option<Square>) -> Result<String, BoardError> {
    let board = parse_board(fen)?;
    let mut out = String::new();

    for rank in Rank::ALL.iter().rev() {
        out.push_str(&format!("{} ", rank.char()));
        for file in File::ALL {
            let sq = Square::from_coords(file, *rank);
            let ch = board.piece_at(sq).map(|p| p.char()).unwrap_or('.');
            if marker == Some(sq) {
                out.push_str(&format!("[{ch}]"));
            } else {
                out.push_str(&format!(" {ch} "));
            }
        }
        out.push('\n');
    }
    out.push_str("   a  b  c  d  e  f  g  h\n");

    Ok(out)
}
