#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chess_core::analysis::MoveQuality;
use chess_core::game_data::{GameHeaders, GameId, GameSession};
use review::api::{
    AlternateExplanation, AlternateLineRequest, AlternateLineResponse, AnalyzeFenRequest,
    AnalyzeGameRequest, ExplainAlternateRequest, ExplainMoveRequest, Explanation, FenEvaluation,
    GameSummary, UploadResponse,
};
use review::{AnalysisService, FetchError};
use tokio::sync::Notify;

/// 1. e4 e5 2. Nf3 Nc6 3. Bb5 a6
pub const RUY_LOPEZ: [&str; 7] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2",
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2",
    "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
    "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
    "r1bqkbnr/1ppp1ppp/p1n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4",
];
pub const RUY_LOPEZ_SAN: [&str; 6] = ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"];

/// 1. d4 d5
pub const QUEENS_PAWN: [&str; 3] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq d3 0 1",
    "rnbqkbnr/ppp1pppp/8/3p4/3P4/8/PPP1PPPP/RNBQKBNR w KQkq d6 0 2",
];
pub const QUEENS_PAWN_SAN: [&str; 2] = ["d4", "d5"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn ruy_lopez() -> GameSession {
    GameSession::new(
        GameId(1),
        GameHeaders::default(),
        strings(&RUY_LOPEZ),
        strings(&RUY_LOPEZ_SAN),
    )
    .expect("valid session")
}

pub fn queens_pawn() -> GameSession {
    GameSession::new(
        GameId(2),
        GameHeaders::default(),
        strings(&QUEENS_PAWN),
        strings(&QUEENS_PAWN_SAN),
    )
    .expect("valid session")
}

pub fn cp(score: f64) -> FenEvaluation {
    FenEvaluation {
        score_cp: Some(score),
        score_mate: None,
    }
}

pub fn explanation(san: &str, quality: MoveQuality) -> Explanation {
    Explanation {
        played_move_san: san.to_string(),
        best_move_san: Some("d4".to_string()),
        quality,
        eval_after: 0.0,
        bullets: vec![format!("{san} was played.")],
        opponent_pv_san: None,
    }
}

pub fn branch(n: usize) -> AlternateLineResponse {
    AlternateLineResponse {
        fens: RUY_LOPEZ[..n].iter().map(|s| s.to_string()).collect(),
        moves_san: RUY_LOPEZ_SAN[..n.saturating_sub(1)]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        start_ply: 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    AnalyzeGame,
    AnalyzeFen(String),
    ExplainMove(usize),
    AlternateLine(usize),
    ExplainAlternate(usize),
}

/// Scripted analysis service. Unscripted requests fail with HTTP 500, and
/// any request can be held open until its gate is released.
#[derive(Default)]
pub struct FakeService {
    evaluations: Mutex<HashMap<String, FenEvaluation>>,
    failing: Mutex<HashSet<String>>,
    explanations: Mutex<HashMap<usize, Explanation>>,
    alternate_lines: Mutex<HashMap<usize, AlternateLineResponse>>,
    alternate_notes: Mutex<HashMap<usize, Vec<String>>>,
    summary: Mutex<Option<GameSummary>>,
    upload: Mutex<Option<UploadResponse>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_eval(&self, fen: &str, eval: FenEvaluation) {
        self.evaluations.lock().unwrap().insert(fen.to_string(), eval);
    }

    /// Score every position of `fens`, in order.
    pub fn set_evals(&self, fens: &[&str], scores: &[FenEvaluation]) {
        for (fen, eval) in fens.iter().zip(scores) {
            self.set_eval(fen, *eval);
        }
    }

    pub fn set_failing(&self, fen: &str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(fen.to_string());
        } else {
            set.remove(fen);
        }
    }

    pub fn set_explanation(&self, ply: usize, explanation: Explanation) {
        self.explanations.lock().unwrap().insert(ply, explanation);
    }

    pub fn set_alternate_line(&self, ply: usize, line: AlternateLineResponse) {
        self.alternate_lines.lock().unwrap().insert(ply, line);
    }

    pub fn set_alternate_notes(&self, ply: usize, bullets: &[&str]) {
        self.alternate_notes
            .lock()
            .unwrap()
            .insert(ply, strings(bullets));
    }

    pub fn set_summary(&self, summary: GameSummary) {
        *self.summary.lock().unwrap() = Some(summary);
    }

    pub fn set_upload(&self, upload: UploadResponse) {
        *self.upload.lock().unwrap() = Some(upload);
    }

    /// Hold every request matching `key` until `release(key)`.
    /// Keys: `fen:<fen>`, `explain:<ply>`, `alt:<ply>`, `notes:<ply>`, `summary`.
    pub fn hold(&self, key: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, key: &str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(key) {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn fen_calls(&self, fen: &str) -> usize {
        self.count(|c| matches!(c, Call::AnalyzeFen(f) if f == fen))
    }

    async fn enter(&self, call: Call, gate_key: String) {
        self.calls.lock().unwrap().push(call);
        let gate = self.gates.lock().unwrap().get(&gate_key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

fn unscripted(what: &str) -> FetchError {
    FetchError::Service {
        status: 500,
        message: format!("no scripted {what}"),
    }
}

impl AnalysisService for FakeService {
    async fn upload_pgn(
        &self,
        file_name: String,
        _pgn: String,
    ) -> Result<UploadResponse, FetchError> {
        self.enter(Call::Upload(file_name), "upload".to_string()).await;
        self.upload
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| FetchError::Service {
                status: 400,
                message: "Error parsing PGN".to_string(),
            })
    }

    async fn analyze_game(&self, _request: AnalyzeGameRequest) -> Result<GameSummary, FetchError> {
        self.enter(Call::AnalyzeGame, "summary".to_string()).await;
        self.summary
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unscripted("summary"))
    }

    async fn analyze_fen(&self, request: AnalyzeFenRequest) -> Result<FenEvaluation, FetchError> {
        self.enter(
            Call::AnalyzeFen(request.fen.clone()),
            format!("fen:{}", request.fen),
        )
        .await;
        if self.failing.lock().unwrap().contains(&request.fen) {
            return Err(FetchError::Transport("connection reset".to_string()));
        }
        self.evaluations
            .lock()
            .unwrap()
            .get(&request.fen)
            .copied()
            .ok_or_else(|| unscripted("evaluation"))
    }

    async fn explain_move(&self, request: ExplainMoveRequest) -> Result<Explanation, FetchError> {
        self.enter(
            Call::ExplainMove(request.ply),
            format!("explain:{}", request.ply),
        )
        .await;
        self.explanations
            .lock()
            .unwrap()
            .get(&request.ply)
            .cloned()
            .ok_or_else(|| unscripted("explanation"))
    }

    async fn alternate_line(
        &self,
        request: AlternateLineRequest,
    ) -> Result<AlternateLineResponse, FetchError> {
        self.enter(
            Call::AlternateLine(request.ply),
            format!("alt:{}", request.ply),
        )
        .await;
        self.alternate_lines
            .lock()
            .unwrap()
            .get(&request.ply)
            .cloned()
            .ok_or_else(|| unscripted("alternate line"))
    }

    async fn explain_alternate(
        &self,
        request: ExplainAlternateRequest,
    ) -> Result<AlternateExplanation, FetchError> {
        self.enter(
            Call::ExplainAlternate(request.ply),
            format!("notes:{}", request.ply),
        )
        .await;
        self.alternate_notes
            .lock()
            .unwrap()
            .get(&request.ply)
            .cloned()
            .map(|bullets| AlternateExplanation { bullets })
            .ok_or_else(|| unscripted("alternate explanation"))
    }
}

/// Let spawned fetch tasks run to completion without applying their
/// results to the orchestrator.
pub async fn run_spawned_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
