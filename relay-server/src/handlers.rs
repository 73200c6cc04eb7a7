//! HTTP surface: `/connect`, `/game/create`, `/game/join`.
//!
//! JSON error bodies and the 512 KiB body limit are grounded on
//! `original_source/common/requests_and_responses.go`'s
//! `UnmarshalJSONRequestBody`/`WriteErrorResponse` (400 on malformed/oversized
//! bodies, a flat `{"error": "..."}` body); close-code-on-upgrade-failure is
//! grounded on `hand_shake.rs::send_closing_message`'s pattern, generalized
//! to a per-failure-kind code table.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::StreamExt;
use protocol::{CreateGameRequest, CreateGameResponse, ErrorResponse, JoinGameQuery};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use engine::EngineError;
use tic_tac_toe::TicTacToeState;

use crate::auth::AuthProvider;
use crate::ws_player::WebSocketPlayer;
use crate::AppState;

fn engine_error_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::GameNotFound => StatusCode::NOT_FOUND,
        EngineError::GameFull => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(ErrorResponse::new(message.into()))).into_response()
}

/// `POST /connect` — caches the player's session.
pub async fn connect(State(state): State<Arc<AppState>>, headers: HeaderMap) -> axum::response::Response {
    match state.auth.authenticate_request(&headers).await {
        Ok(uid) => {
            state.host.connect(&uid).await;
            (StatusCode::OK, Json(serde_json::json!({}))).into_response()
        }
        Err(err) => error_response(engine_error_status(&err), err.to_string()),
    }
}

/// `POST /game/create` — allocates an instance and returns its id.
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateGameRequest>, axum::extract::rejection::JsonRejection>,
) -> axum::response::Response {
    if let Err(err) = state.auth.authenticate_request(&headers).await {
        return error_response(engine_error_status(&err), err.to_string());
    }

    let Json(req) = match body {
        Ok(req) => req,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    if req.num_players == 0 {
        return error_response(StatusCode::BAD_REQUEST, "numPlayers must be greater than zero");
    }

    let instance = state
        .host
        .create_game(
            req.num_players as usize,
            Duration::from_secs(req.wait_for_players_timeout),
            TicTacToeState::placeholder(),
            Arc::new(|err, handle| {
                let game_id = handle.id();
                match err {
                    Some(err) => tracing::warn!(%game_id, error = %err, "game completed with error"),
                    None => tracing::info!(%game_id, "game completed"),
                }
            }),
        )
        .await;

    (StatusCode::CREATED, Json(CreateGameResponse { game_id: instance.id().to_string() })).into_response()
}

/// `GET /game/join?id=<gameID>` — upgrades to the frame transport and
/// attaches the connection as a player.
pub async fn join_game(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<JoinGameQuery>,
    ws: WebSocketUpgrade,
) -> axum::response::Response {
    let uid = match state.auth.uid_from_request(&headers).await {
        Ok(uid) => uid,
        // Spec: a bad auth-derived id on this path is 400, not the generic
        // 401 `engine_error_status` gives `Unauthorized` elsewhere.
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let Ok(game_id) = Uuid::parse_str(&query.id) else {
        return error_response(StatusCode::BAD_REQUEST, "malformed game id");
    };

    ws.on_upgrade(move |socket| async move {
        let (sender, receiver) = socket.split();
        let player =
            Arc::new(WebSocketPlayer::new(uid, CancellationToken::new(), sender, receiver));

        if let Err(err) = state.host.join_game(game_id, player.clone()).await {
            tracing::warn!(error = %err, %game_id, "join rejected");
            // The upgrade has already completed, so a failed join closes
            // the socket immediately rather than returning an HTTP status.
            // The player was never attached to an instance, so
            // `close_with_error` only needs to close this one socket —
            // there is nothing else for the engine to tear down.
            engine::Player::close_with_error(player.as_ref(), &err).await;
        }
    })
}
