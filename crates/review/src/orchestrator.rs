//! Ply evaluation and navigation orchestrator.
//!
//! One `Orchestrator` owns everything for the active game: the session, both
//! caches, the view mode, and the request tracker. Fetches run as spawned
//! tasks; their results come back over a channel and are applied one at a
//! time by `next_event`, so all state changes happen on the caller's task.

use std::collections::VecDeque;
use std::sync::Arc;

use chess_core::analysis::{classify_move, MoveQuality};
use chess_core::board::destination_square;
use chess_core::game_data::{Evaluation, GameSession};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{
    AlternateExplanation, AlternateLineRequest, AlternateLineResponse, AnalyzeFenRequest,
    AnalyzeGameRequest, ExplainAlternateRequest, ExplainMoveRequest, Explanation, GameSummary,
};
use crate::cache::{EvaluationCache, ExplanationCache};
use crate::clients::AnalysisService;
use crate::config::ReviewConfig;
use crate::error::{FetchError, NavigationError, ReviewError};
use crate::navigation::{step, AlternateLine, NavCommand, ViewMode};
use crate::panel::{
    DisplayedQuality, Operation, OperationErrors, PanelMode, PlyFailure, QualitySource,
    ReviewPanel,
};
use crate::requests::{Completion, FetchKey, RequestTracker, Resolution, Settle};

enum Payload {
    Evaluation(Result<Evaluation, FetchError>),
    Explanation(Result<Explanation, FetchError>),
    AlternateLine(Result<AlternateLineResponse, FetchError>),
    AlternateNotes(Result<AlternateExplanation, FetchError>),
    Summary(Result<GameSummary, FetchError>),
}

/// Something observable changed. Consumers re-read `panel()` on receipt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewEvent {
    EvaluationReady { ply: usize },
    /// Both evaluations around the current ply are cached
    Classified { ply: usize, quality: MoveQuality },
    ExplanationReady { ply: usize },
    BranchOpened { anchor: usize },
    AlternateNotesReady { anchor: usize },
    SummaryReady,
    FetchFailed {
        operation: Operation,
        ply: Option<usize>,
        error: FetchError,
    },
}

/// Result of a cache-or-fetch request.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Ready(T),
    /// A fetch is outstanding; the result lands in the cache
    Pending,
    /// Not requestable in the current state
    Unavailable,
}

struct PendingBranch {
    anchor: usize,
    return_ply: usize,
}

pub struct Orchestrator<S> {
    service: Arc<S>,
    config: ReviewConfig,
    session: Option<GameSession>,
    view: ViewMode,
    evaluations: EvaluationCache,
    explanations: ExplanationCache,
    summary: Option<GameSummary>,
    pending_branch: Option<PendingBranch>,
    /// Bullets from `explain_alternate`, keyed by anchor ply
    alternate_notes: Option<(usize, Vec<String>)>,
    errors: OperationErrors,
    events: VecDeque<ReviewEvent>,
    requests: RequestTracker<Payload>,
    completions: mpsc::UnboundedReceiver<Completion<Payload>>,
}

impl<S: AnalysisService> Orchestrator<S> {
    pub fn new(service: S, config: ReviewConfig) -> Self {
        Self::with_shared(Arc::new(service), config)
    }

    pub fn with_shared(service: Arc<S>, config: ReviewConfig) -> Self {
        let (requests, completions) = RequestTracker::new();
        Self {
            service,
            config,
            session: None,
            view: ViewMode::default(),
            evaluations: EvaluationCache::new(),
            explanations: ExplanationCache::new(),
            summary: None,
            pending_branch: None,
            alternate_notes: None,
            errors: OperationErrors::default(),
            events: VecDeque::new(),
            requests,
            completions,
        }
    }

    // ---- Session lifecycle ----

    /// Upload a PGN and switch to the resulting session. On failure the
    /// current session is left as it was.
    pub async fn load_pgn(&mut self, file_name: &str, pgn: &str) -> Result<(), ReviewError> {
        let uploaded = self
            .service
            .upload_pgn(file_name.to_string(), pgn.to_string())
            .await
            .and_then(|resp| {
                resp.into_session()
                    .map_err(|e| FetchError::Decode(e.to_string()))
            });

        match uploaded {
            Ok(session) => {
                self.replace_session(session);
                Ok(())
            }
            Err(error) => {
                warn!(file_name, %error, "Upload failed");
                self.errors.upload = Some(error.clone());
                Err(error.into())
            }
        }
    }

    /// Install a new session. Every outstanding fetch is aborted and both
    /// caches are emptied; nothing issued before this call can reach the
    /// new session's state.
    pub fn replace_session(&mut self, session: GameSession) {
        info!(
            game_id = %session.game_id(),
            plies = session.last_ply(),
            "Session replaced"
        );
        self.requests.reset();
        self.evaluations.clear();
        self.explanations.clear();
        self.summary = None;
        self.pending_branch = None;
        self.alternate_notes = None;
        self.errors = OperationErrors::default();
        self.events.clear();
        self.view = ViewMode::default();
        self.session = Some(session);
    }

    // ---- Navigation ----

    /// Move within whichever line is active, clamped to its bounds.
    pub fn navigate(&mut self, cmd: NavCommand) -> Result<(), NavigationError> {
        let last = self
            .session
            .as_ref()
            .ok_or(NavigationError::NoSession)?
            .last_ply();

        if let ViewMode::Alternate(line) = &mut self.view {
            line.navigate(cmd);
            return Ok(());
        }

        let current = self.view.main_ply().unwrap_or(0);
        self.focus(step(current, last, cmd));
        Ok(())
    }

    pub fn go_to(&mut self, ply: usize) -> Result<(), NavigationError> {
        self.navigate(NavCommand::Goto(ply))
    }

    /// Point the main line at `ply` and start its fetch cycle: the
    /// evaluation pair (ply - 1, ply) and the explanation for ply.
    fn focus(&mut self, ply: usize) {
        let moved = self.view.main_ply() != Some(ply);
        self.view = ViewMode::Main { ply };

        let previous = ply.checked_sub(1);
        self.requests.cancel_where(
            |key| match *key {
                FetchKey::Evaluation(p) => ply == 0 || (p != ply && Some(p) != previous),
                FetchKey::Explanation(p) => p != ply,
                _ => false,
            },
            Settle::Merge,
        );

        if moved {
            self.abandon_pending_branch();
            self.alternate_notes = None;
        }
        self.errors.evaluation = None;
        self.errors.explanation = None;

        if ply == 0 {
            return;
        }

        self.request_evaluation(ply - 1);
        self.request_evaluation(ply);
        self.request_explanation(ply);
        self.announce_classification(ply);
    }

    /// Branch off the main line at `ply`. The view switches once the
    /// continuation arrives; the explanation is shown whenever it lands.
    /// An open branch from another anchor is closed straight away.
    pub fn explore_alternate(&mut self, ply: usize) -> Result<(), NavigationError> {
        let session = self.session.as_ref().ok_or(NavigationError::NoSession)?;
        if ply == 0 {
            return Err(NavigationError::BranchFromStart);
        }
        let last = session.last_ply();
        if ply > last {
            return Err(NavigationError::PlyOutOfRange { ply, last });
        }
        let anchor = ply;
        let game_id = session.game_id();

        let (return_ply, leaving_branch) = match &mut self.view {
            ViewMode::Alternate(line) if line.anchor() == anchor => {
                line.rewind();
                return Ok(());
            }
            ViewMode::Alternate(line) => (line.return_ply(), true),
            ViewMode::Main { ply } => (*ply, false),
        };

        // A branch from another anchor replaces the open one: back on the
        // main line while the new continuation loads
        if leaving_branch {
            self.requests.cancel_where(
                |key| matches!(key, FetchKey::AlternateNotes(_)),
                Settle::Discard,
            );
            self.focus(return_ply);
        }

        if let Some(pending) = &self.pending_branch {
            if pending.anchor != anchor {
                self.abandon_pending_branch();
            }
        }
        if self
            .alternate_notes
            .as_ref()
            .is_some_and(|(a, _)| *a != anchor)
        {
            self.alternate_notes = None;
        }
        self.errors.alternate_line = None;
        self.errors.alternate_explanation = None;

        info!(anchor, return_ply, "Exploring alternate line");
        self.pending_branch = Some(PendingBranch { anchor, return_ply });

        let line_request = AlternateLineRequest {
            game_id,
            ply: anchor,
            depth: self.config.alternate_depth,
            max_plies: self.config.alternate_max_plies,
        };
        let service = Arc::clone(&self.service);
        self.requests.issue(FetchKey::Branch(anchor), async move {
            Payload::AlternateLine(service.alternate_line(line_request).await)
        });

        let notes_request = ExplainAlternateRequest {
            game_id,
            ply: anchor,
            depth: self.config.alternate_depth,
        };
        let service = Arc::clone(&self.service);
        self.requests
            .issue(FetchKey::AlternateNotes(anchor), async move {
                Payload::AlternateNotes(service.explain_alternate(notes_request).await)
            });

        Ok(())
    }

    /// Leave the alternate line and restore the main-line ply that was
    /// active when it was opened. Also abandons a branch still loading.
    pub fn back_to_main(&mut self) -> Result<(), NavigationError> {
        let return_ply = match &self.view {
            ViewMode::Alternate(line) => {
                info!(anchor = line.anchor(), "Back to main line");
                line.return_ply()
            }
            ViewMode::Main { .. } if self.pending_branch.is_some() => {
                self.abandon_pending_branch();
                self.alternate_notes = None;
                return Ok(());
            }
            ViewMode::Main { .. } => return Err(NavigationError::NotInAlternate),
        };

        self.requests.cancel_where(
            |key| matches!(key, FetchKey::AlternateNotes(_)),
            Settle::Discard,
        );
        self.focus(return_ply);
        Ok(())
    }

    fn abandon_pending_branch(&mut self) {
        if let Some(pending) = self.pending_branch.take() {
            debug!(anchor = pending.anchor, "Abandoning pending alternate line");
            self.requests
                .cancel(&FetchKey::Branch(pending.anchor), Settle::Discard);
            self.requests
                .cancel(&FetchKey::AlternateNotes(pending.anchor), Settle::Discard);
        }
    }

    // ---- Cache-or-fetch ----

    /// Cached evaluation for `ply`, or start (or join) its fetch.
    pub fn request_evaluation(&mut self, ply: usize) -> Lookup<Evaluation> {
        let Some(session) = &self.session else {
            return Lookup::Unavailable;
        };
        let Some(fen) = session.fen(ply) else {
            return Lookup::Unavailable;
        };
        if let Some(eval) = self.evaluations.get(ply) {
            return Lookup::Ready(*eval);
        }

        let request = AnalyzeFenRequest {
            fen: fen.to_string(),
            depth: self.config.eval_depth,
        };
        let service = Arc::clone(&self.service);
        self.requests
            .issue(FetchKey::Evaluation(ply), async move {
                Payload::Evaluation(service.analyze_fen(request).await.map(Evaluation::from))
            });
        Lookup::Pending
    }

    /// Explanation for the current main-line ply. Unavailable outside the
    /// main line, at ply 0, or for any ply other than the current one.
    pub fn request_explanation(&mut self, ply: usize) -> Lookup<Explanation> {
        if ply == 0 || self.view.main_ply() != Some(ply) {
            return Lookup::Unavailable;
        }
        let Some(session) = &self.session else {
            return Lookup::Unavailable;
        };
        if let Some(explanation) = self.explanations.get(ply) {
            return Lookup::Ready(explanation.clone());
        }

        let request = ExplainMoveRequest {
            game_id: session.game_id(),
            ply,
            depth: self.config.explain_depth,
        };
        let service = Arc::clone(&self.service);
        self.requests
            .issue(FetchKey::Explanation(ply), async move {
                Payload::Explanation(service.explain_move(request).await)
            });
        Lookup::Pending
    }

    pub fn request_summary(&mut self) -> Lookup<GameSummary> {
        let Some(session) = &self.session else {
            return Lookup::Unavailable;
        };
        if let Some(summary) = &self.summary {
            return Lookup::Ready(summary.clone());
        }

        let request = AnalyzeGameRequest {
            game_id: session.game_id(),
            depth: self.config.summary_depth,
        };
        self.errors.summary = None;
        let service = Arc::clone(&self.service);
        self.requests.issue(FetchKey::Summary, async move {
            Payload::Summary(service.analyze_game(request).await)
        });
        Lookup::Pending
    }

    /// Evaluation for `ply`, waiting for the network if it is not cached.
    /// Other completions that arrive meanwhile are applied and queued as
    /// events as usual.
    pub async fn evaluate(&mut self, ply: usize) -> Result<Evaluation, ReviewError> {
        match self.request_evaluation(ply) {
            Lookup::Ready(eval) => return Ok(eval),
            Lookup::Pending => {}
            Lookup::Unavailable => {
                return Err(match &self.session {
                    None => NavigationError::NoSession.into(),
                    Some(session) => NavigationError::PlyOutOfRange {
                        ply,
                        last: session.last_ply(),
                    }
                    .into(),
                });
            }
        }

        let key = FetchKey::Evaluation(ply);
        while self.requests.is_in_flight(&key) {
            if !self.pump().await {
                break;
            }
        }

        if let Some(eval) = self.evaluations.get(ply) {
            return Ok(*eval);
        }
        match &self.errors.evaluation {
            Some(failure) if failure.ply == ply => Err(failure.error.clone().into()),
            _ => Err(ReviewError::Cancelled),
        }
    }

    // ---- Completions ----

    /// Apply completions until there is an event to report. Returns `None`
    /// once nothing is outstanding.
    pub async fn next_event(&mut self) -> Option<ReviewEvent> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }
            if !self.pump().await {
                return None;
            }
        }
    }

    /// Drain every outstanding fetch, returning the events produced.
    pub async fn settle(&mut self) -> Vec<ReviewEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    /// True while events are queued or fetches have yet to report.
    pub fn is_busy(&self) -> bool {
        !self.events.is_empty() || self.requests.has_unreported()
    }

    async fn pump(&mut self) -> bool {
        if !self.requests.has_unreported() {
            return false;
        }
        match self.completions.recv().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, completion: Completion<Payload>) {
        let resolution = self.requests.resolve(&completion);
        let Completion { key, payload, .. } = completion;
        let Some(payload) = payload else {
            return;
        };

        match resolution {
            Resolution::Current => self.apply_current(key, payload),
            Resolution::Late(settle) => self.apply_late(key, payload, settle),
            Resolution::Ignored => {
                debug!(kind = key.kind(), ply = ?key.ply(), "Ignored stale completion");
            }
        }
    }

    fn apply_current(&mut self, key: FetchKey, payload: Payload) {
        match (key, payload) {
            (FetchKey::Evaluation(ply), Payload::Evaluation(result)) => match result {
                Ok(eval) => self.store_evaluation(ply, eval),
                Err(error) => self.fail(Operation::Evaluation, Some(ply), error),
            },
            (FetchKey::Explanation(ply), Payload::Explanation(result)) => match result {
                Ok(explanation) => {
                    if self.explanations.insert(ply, explanation) {
                        self.events.push_back(ReviewEvent::ExplanationReady { ply });
                    }
                }
                Err(error) => self.fail(Operation::Explanation, Some(ply), error),
            },
            (FetchKey::Branch(anchor), Payload::AlternateLine(result)) => {
                self.open_branch(anchor, result)
            }
            (FetchKey::AlternateNotes(anchor), Payload::AlternateNotes(result)) => match result {
                Ok(notes) => {
                    self.alternate_notes = Some((anchor, notes.bullets));
                    self.events
                        .push_back(ReviewEvent::AlternateNotesReady { anchor });
                }
                Err(error) => self.fail(Operation::AlternateExplanation, Some(anchor), error),
            },
            (FetchKey::Summary, Payload::Summary(result)) => match result {
                Ok(summary) => {
                    self.summary = Some(summary);
                    self.events.push_back(ReviewEvent::SummaryReady);
                }
                Err(error) => self.fail(Operation::Summary, None, error),
            },
            (key, _) => warn!(kind = key.kind(), "Completion payload does not match its key"),
        }
    }

    /// A cancelled fetch finished anyway. Main-line results still go into
    /// the caches; nothing else is touched.
    fn apply_late(&mut self, key: FetchKey, payload: Payload, settle: Settle) {
        if settle == Settle::Discard {
            debug!(kind = key.kind(), ply = ?key.ply(), "Discarded late result");
            return;
        }

        match (key, payload) {
            (FetchKey::Evaluation(ply), Payload::Evaluation(Ok(eval))) => {
                debug!(ply, "Merged late evaluation");
                self.store_evaluation(ply, eval);
            }
            (FetchKey::Explanation(ply), Payload::Explanation(Ok(explanation))) => {
                debug!(ply, "Merged late explanation");
                if self.explanations.insert(ply, explanation) {
                    self.events.push_back(ReviewEvent::ExplanationReady { ply });
                }
            }
            (key, _) => debug!(kind = key.kind(), ply = ?key.ply(), "Dropped late result"),
        }
    }

    fn store_evaluation(&mut self, ply: usize, eval: Evaluation) {
        if self.evaluations.insert(ply, eval) {
            self.events.push_back(ReviewEvent::EvaluationReady { ply });
        }
        if let Some(current) = self.view.main_ply() {
            if current > 0 && (ply == current || ply + 1 == current) {
                self.announce_classification(current);
            }
        }
    }

    fn announce_classification(&mut self, ply: usize) {
        if let Some(quality) = self.local_quality(ply) {
            self.events
                .push_back(ReviewEvent::Classified { ply, quality });
        }
    }

    fn open_branch(&mut self, anchor: usize, result: Result<AlternateLineResponse, FetchError>) {
        let return_ply = match self.pending_branch.take() {
            Some(pending) if pending.anchor == anchor => pending.return_ply,
            other => {
                self.pending_branch = other;
                return;
            }
        };

        let line = match result {
            Ok(line) => line,
            Err(error) => return self.fail(Operation::AlternateLine, Some(anchor), error),
        };
        let Some(line) = AlternateLine::new(anchor, return_ply, line) else {
            let error = FetchError::Decode("alternate line has no positions".to_string());
            return self.fail(Operation::AlternateLine, Some(anchor), error);
        };

        // Leaving the main line: pending explanations are dropped, not cached
        self.requests.cancel_where(
            |key| matches!(key, FetchKey::Explanation(_)),
            Settle::Discard,
        );
        info!(anchor, plies = line.len(), "Alternate line opened");
        self.view = ViewMode::Alternate(line);
        self.events.push_back(ReviewEvent::BranchOpened { anchor });
    }

    fn fail(&mut self, operation: Operation, ply: Option<usize>, error: FetchError) {
        warn!(%operation, ?ply, %error, "Fetch failed");
        let failure = |ply: Option<usize>| PlyFailure {
            ply: ply.unwrap_or(0),
            error: error.clone(),
        };
        match operation {
            Operation::Upload => self.errors.upload = Some(error.clone()),
            Operation::Evaluation => self.errors.evaluation = Some(failure(ply)),
            Operation::Explanation => self.errors.explanation = Some(failure(ply)),
            Operation::AlternateLine => self.errors.alternate_line = Some(failure(ply)),
            Operation::AlternateExplanation => {
                self.errors.alternate_explanation = Some(failure(ply))
            }
            Operation::Summary => self.errors.summary = Some(error.clone()),
        }
        self.events.push_back(ReviewEvent::FetchFailed {
            operation,
            ply,
            error,
        });
    }

    // ---- Derived state ----

    fn local_quality(&self, ply: usize) -> Option<MoveQuality> {
        let session = self.session.as_ref()?;
        let mover = session.mover(ply)?;
        let before = self.evaluations.get(ply - 1)?;
        let after = self.evaluations.get(ply)?;
        Some(classify_move(before, after, mover))
    }

    /// Quality shown for the move into `ply`: the explanation's label when
    /// one is cached, otherwise the local classification.
    pub fn move_quality(&self, ply: usize) -> Option<DisplayedQuality> {
        if ply == 0 {
            return None;
        }
        if let Some(explanation) = self.explanations.get(ply) {
            return Some(DisplayedQuality {
                quality: explanation.quality,
                source: QualitySource::Server,
            });
        }
        self.local_quality(ply).map(|quality| DisplayedQuality {
            quality,
            source: QualitySource::Local,
        })
    }

    pub fn panel(&self) -> ReviewPanel {
        let mut panel = ReviewPanel {
            mode: PanelMode::NoGame,
            headers: None,
            fen: None,
            last_move_san: None,
            evaluation: None,
            quality: None,
            dot: None,
            explanation: None,
            alternate_notes: None,
            summary: self.summary.clone(),
            is_analyzing: self.is_analyzing(),
            is_explaining: self.is_explaining(),
            is_branching: self.is_branching(),
            errors: self.errors.clone(),
        };
        let Some(session) = &self.session else {
            return panel;
        };
        panel.headers = Some(session.headers().clone());

        let notes_anchor = match &self.view {
            ViewMode::Main { ply } => {
                let ply = *ply;
                panel.mode = PanelMode::Main {
                    ply,
                    last_ply: session.last_ply(),
                };
                panel.fen = session.fen(ply).map(String::from);
                panel.last_move_san = session.move_san(ply).map(String::from);
                if ply > 0 {
                    panel.evaluation = self.evaluations.get(ply).copied();
                    panel.quality = self.move_quality(ply);
                    panel.dot = panel.quality.and_then(|_| {
                        destination_square(session.fen(ply - 1)?, session.fen(ply)?)
                    });
                    panel.explanation = self.explanations.get(ply).cloned();
                }
                self.pending_branch.as_ref().map(|p| p.anchor)
            }
            ViewMode::Alternate(line) => {
                panel.mode = PanelMode::Alternate {
                    anchor: line.anchor(),
                    index: line.index(),
                    len: line.len(),
                    start_ply: line.start_ply(),
                };
                panel.fen = Some(line.fen().to_string());
                panel.last_move_san = line.move_san().map(String::from);
                Some(line.anchor())
            }
        };

        panel.alternate_notes = match (&self.alternate_notes, notes_anchor) {
            (Some((anchor, notes)), Some(current)) if *anchor == current => Some(notes.clone()),
            _ => None,
        };

        panel
    }

    // ---- Accessors ----

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn view(&self) -> &ViewMode {
        &self.view
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn evaluation(&self, ply: usize) -> Option<&Evaluation> {
        self.evaluations.get(ply)
    }

    pub fn explanation(&self, ply: usize) -> Option<&Explanation> {
        self.explanations.get(ply)
    }

    pub fn summary(&self) -> Option<&GameSummary> {
        self.summary.as_ref()
    }

    pub fn errors(&self) -> &OperationErrors {
        &self.errors
    }

    pub fn is_analyzing(&self) -> bool {
        self.requests
            .any_in_flight(|k| matches!(k, FetchKey::Evaluation(_)))
    }

    pub fn is_explaining(&self) -> bool {
        self.requests.any_in_flight(|k| {
            matches!(k, FetchKey::Explanation(_) | FetchKey::AlternateNotes(_))
        })
    }

    pub fn is_branching(&self) -> bool {
        self.requests
            .any_in_flight(|k| matches!(k, FetchKey::Branch(_)))
    }
}

impl<S> Drop for Orchestrator<S> {
    fn drop(&mut self) {
        self.requests.reset();
    }
}
