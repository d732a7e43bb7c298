//! `AnalysisClient` against a local mock of the analysis service.
//!
//! Each test serves its own axum router on an ephemeral port.

mod common;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chess_core::analysis::MoveQuality;
use chess_core::game_data::GameId;
use review::api::{AnalyzeFenRequest, AnalyzeGameRequest, ExplainMoveRequest};
use review::panel::{DisplayedQuality, QualitySource};
use review::{AnalysisClient, AnalysisService, FetchError, Orchestrator, ReviewConfig, ReviewEvent};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use common::{RUY_LOPEZ, RUY_LOPEZ_SAN};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_for(base_url: String) -> AnalysisClient {
    let config = ReviewConfig {
        base_url,
        request_timeout_secs: 5,
        ..ReviewConfig::default()
    };
    AnalysisClient::new(&config).unwrap()
}

fn fen_request(fen: &str) -> AnalyzeFenRequest {
    AnalyzeFenRequest {
        fen: fen.to_string(),
        depth: 14,
    }
}

async fn score_fen(Json(body): Json<Value>) -> Json<Value> {
    let fen = body["fen"].as_str().unwrap_or_default();
    let score = match RUY_LOPEZ.iter().position(|f| *f == fen) {
        Some(1) => 35.4,
        _ => 20.0,
    };
    Json(json!({
        "fen": fen,
        "depth": body["depth"],
        "score_cp": score,
        "score_mate": null,
    }))
}

async fn explain(Json(body): Json<Value>) -> Json<Value> {
    let ply = body["ply"].as_u64().unwrap_or(0) as usize;
    Json(json!({
        "played_move_uci": RUY_LOPEZ_SAN.get(ply.saturating_sub(1)).copied().unwrap_or("?"),
        "best_move_uci": "e4",
        "quality": "best",
        "eval_after": 0.35,
        "bullets": ["Controls the centre."],
        "opponent_pv_san": ["e5", "Nf3"],
    }))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_analyze_fen_decodes_float_centipawns() {
    let base = serve(Router::new().route("/analyze_fen/", post(score_fen))).await;
    let client = client_for(base);

    let eval = client.analyze_fen(fen_request(RUY_LOPEZ[1])).await.unwrap();
    assert_eq!(eval.score_cp, Some(35.4));
    assert_eq!(eval.score_mate, None);
}

#[tokio::test]
async fn test_analyze_fen_reports_mate() {
    let router = Router::new().route(
        "/analyze_fen/",
        post(|| async { Json(json!({"score_cp": null, "score_mate": -3})) }),
    );
    let client = client_for(serve(router).await);

    let eval = client.analyze_fen(fen_request(RUY_LOPEZ[0])).await.unwrap();
    assert_eq!(eval.score_mate, Some(-3));
}

#[tokio::test]
async fn test_explain_move_accepts_uci_aliases() {
    let base = serve(Router::new().route("/explain_move/", post(explain))).await;
    let client = client_for(base);

    let explanation = client
        .explain_move(ExplainMoveRequest {
            game_id: GameId(4),
            ply: 3,
            depth: 14,
        })
        .await
        .unwrap();
    assert_eq!(explanation.played_move_san, "Nf3");
    assert_eq!(explanation.best_move_san.as_deref(), Some("e4"));
    assert_eq!(explanation.quality, MoveQuality::Best);
    assert_eq!(explanation.bullets, vec!["Controls the centre."]);
}

#[tokio::test]
async fn test_analyze_game_sends_game_id_and_depth() {
    let router = Router::new().route(
        "/analyze_game/",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body, json!({"game_id": 12, "depth": 12}));
            Json(json!({
                "white_name": "Anderssen",
                "black_name": "Kieseritzky",
                "winner": "White",
                "result": "1-0",
                "counts_white": {"best": 5, "blunder": 0},
                "counts_black": {"good": 3, "blunder": 2},
            }))
        }),
    );
    let client = client_for(serve(router).await);

    let summary = client
        .analyze_game(AnalyzeGameRequest {
            game_id: GameId(12),
            depth: 12,
        })
        .await
        .unwrap();
    assert_eq!(summary.white_name, "Anderssen");
    assert_eq!(summary.counts_white.best, 5);
    assert_eq!(summary.counts_black.blunder, 2);
    assert_eq!(summary.counts_black.total(), 5);
}

#[tokio::test]
async fn test_upload_sends_multipart_file() {
    let router = Router::new().route(
        "/upload_pgn/",
        post(|headers: HeaderMap, body: Bytes| async move {
            let content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let body = String::from_utf8_lossy(&body);
            let ok = content_type.starts_with("multipart/form-data")
                && body.contains(r#"name="file""#)
                && body.contains(r#"filename="immortal.pgn""#)
                && body.contains("1. e4 e5");
            if !ok {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"detail": "No file uploaded"})),
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "game_id": 7,
                    "moves": RUY_LOPEZ[..3],
                    "moves_san": RUY_LOPEZ_SAN[..2],
                    "white_name": "Anderssen",
                })),
            )
        }),
    );
    let client = client_for(serve(router).await);

    let upload = client
        .upload_pgn("immortal.pgn".into(), "1. e4 e5 *".into())
        .await
        .unwrap();
    assert_eq!(upload.game_id, GameId(7));

    let session = upload.into_session().unwrap();
    assert_eq!(session.last_ply(), 2);
    assert_eq!(session.move_san(2), Some("e5"));
    assert_eq!(session.headers().white_name, "Anderssen");
    assert_eq!(session.headers().result, "*");
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let router = Router::new()
        .route(
            "/analyze_fen/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"message": "Invalid FEN"})),
                )
            }),
        )
        .route(
            "/explain_move/",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"detail": "Invalid ply"})),
                )
            }),
        );
    let client = client_for(serve(router).await);

    let err = client.analyze_fen(fen_request("garbage")).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Service {
            status: 400,
            message: "Invalid FEN".into(),
        }
    );

    let err = client
        .explain_move(ExplainMoveRequest {
            game_id: GameId(1),
            ply: 400,
            depth: 14,
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FetchError::Service {
            status: 422,
            message: "Invalid ply".into(),
        }
    );
    assert_eq!(err.to_string(), "HTTP 422: Invalid ply");
}

#[tokio::test]
async fn test_plain_text_error_body_is_kept() {
    let router = Router::new().route(
        "/analyze_fen/",
        post(|| async { (StatusCode::BAD_GATEWAY, "engine pool exhausted\n") }),
    );
    let client = client_for(serve(router).await);

    let err = client.analyze_fen(fen_request(RUY_LOPEZ[0])).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Service {
            status: 502,
            message: "engine pool exhausted".into(),
        }
    );
}

#[tokio::test]
async fn test_unknown_endpoint_is_a_service_error() {
    let client = client_for(serve(Router::new()).await);

    let err = client.analyze_fen(fen_request(RUY_LOPEZ[0])).await.unwrap_err();
    assert!(matches!(err, FetchError::Service { status: 404, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let router = Router::new().route("/analyze_fen/", post(|| async { "not json" }));
    let client = client_for(serve(router).await);

    let err = client.analyze_fen(fen_request(RUY_LOPEZ[0])).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(format!("http://{addr}"));
    let err = client.analyze_fen(fen_request(RUY_LOPEZ[0])).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_review_first_move_over_http() {
    let router = Router::new()
        .route("/analyze_fen/", post(score_fen))
        .route("/explain_move/", post(explain))
        .route(
            "/upload_pgn/",
            post(|| async {
                Json(json!({
                    "game_id": 3,
                    "moves": RUY_LOPEZ,
                    "moves_san": RUY_LOPEZ_SAN,
                }))
            }),
        );
    let config = ReviewConfig {
        base_url: serve(router).await,
        ..ReviewConfig::default()
    };
    let client = AnalysisClient::new(&config).unwrap();
    let mut orch = Orchestrator::new(client, config);

    orch.load_pgn("ruy.pgn", "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *").await.unwrap();
    orch.go_to(1).unwrap();
    let events = orch.settle().await;

    assert!(events.contains(&ReviewEvent::Classified {
        ply: 1,
        quality: MoveQuality::Good,
    }));
    assert!(events.contains(&ReviewEvent::ExplanationReady { ply: 1 }));

    let panel = orch.panel();
    assert_eq!(panel.evaluation.unwrap().score_cp, Some(35));
    assert_eq!(
        panel.quality,
        Some(DisplayedQuality {
            quality: MoveQuality::Best,
            source: QualitySource::Server,
        })
    );
    assert!(panel.errors.is_empty());
}
