use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cbt_assistant_core::Error;

use crate::state::{
    AppState, ChatResponse, ConversationResponse, SessionCommand, SessionQuery, StatusResponse,
    UserMessage,
};

/// Error body in the `{"detail": ...}` shape clients already parse.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Validation failures become 422 and an exhausted session table 503;
    /// everything else is a 500 whose detail is prefixed with what the
    /// endpoint was doing.
    fn from_core(context: &str, err: Error) -> Self {
        match err {
            Error::Validation(detail) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                detail,
            },
            Error::Unavailable(detail) => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                detail,
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: format!("{}: {}", context, other),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.detail);
        } else {
            tracing::debug!("Rejected request: {}", self.detail);
        }
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<UserMessage>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    const CONTEXT: &str = "Error processing chat";

    let Json(payload) = payload.map_err(|rejection| {
        ApiError::from_core(CONTEXT, Error::Validation(rejection.body_text()))
    })?;
    let message = payload.text().map_err(|e| ApiError::from_core(CONTEXT, e))?;

    let outcome = state
        .dispatch(payload.session_key(), |reply| SessionCommand::Chat { message, reply })
        .await
        .and_then(|result| result)
        .map_err(|e| ApiError::from_core(CONTEXT, e))?;

    Ok(Json(outcome.into()))
}

pub async fn reset_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .dispatch(query.session_key(), |reply| SessionCommand::Reset { reply })
        .await
        .map_err(|e| ApiError::from_core("Error resetting conversation", e))?;

    Ok(Json(StatusResponse {
        status: "success".to_string(),
        message: "Conversation has been reset".to_string(),
    }))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy".to_string(),
        message: format!("{} is running", state.app.name),
    })
}

pub async fn conversation_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let history = state
        .dispatch(query.session_key(), |reply| SessionCommand::Conversation { reply })
        .await
        .map_err(|e| ApiError::from_core("Error reading conversation", e))?;

    Ok(Json(ConversationResponse {
        message_count: history.len(),
        conversation_history: history,
    }))
}
