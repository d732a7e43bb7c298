pub mod analysis;

use std::future::Future;

use crate::api::{
    AlternateExplanation, AlternateLineRequest, AlternateLineResponse, AnalyzeFenRequest,
    AnalyzeGameRequest, ExplainAlternateRequest, ExplainMoveRequest, Explanation, FenEvaluation,
    GameSummary, UploadResponse,
};
use crate::error::FetchError;

pub use analysis::AnalysisClient;

/// The remote analysis service the orchestrator talks to. `AnalysisClient`
/// is the HTTP implementation; tests substitute scripted fakes.
pub trait AnalysisService: Send + Sync + 'static {
    fn upload_pgn(
        &self,
        file_name: String,
        pgn: String,
    ) -> impl Future<Output = Result<UploadResponse, FetchError>> + Send;

    fn analyze_game(
        &self,
        request: AnalyzeGameRequest,
    ) -> impl Future<Output = Result<GameSummary, FetchError>> + Send;

    fn analyze_fen(
        &self,
        request: AnalyzeFenRequest,
    ) -> impl Future<Output = Result<FenEvaluation, FetchError>> + Send;

    fn explain_move(
        &self,
        request: ExplainMoveRequest,
    ) -> impl Future<Output = Result<Explanation, FetchError>> + Send;

    fn alternate_line(
        &self,
        request: AlternateLineRequest,
    ) -> impl Future<Output = Result<AlternateLineResponse, FetchError>> + Send;

    fn explain_alternate(
        &self,
        request: ExplainAlternateRequest,
    ) -> impl Future<Output = Result<AlternateExplanation, FetchError>> + Send;
}
