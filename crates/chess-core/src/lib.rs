//! Domain types shared by the review client: game sessions, evaluations,
//! the local move classifier, and FEN board helpers.

pub mod analysis;
pub mod board;
pub mod game_data;

pub use analysis::{classify_move, MoveQuality, QualityCounts};
pub use game_data::{Evaluation, GameHeaders, GameId, GameSession};
