use super::SharedState;
use crate::error::AppError;
use crate::prompt::{self, MAX_QUESTION_CHARS};
use crate::relay;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_core::Stream;
use serde::Deserialize;
use std::convert::Infallible;

pub const MISSING_CREDENTIAL: &str = "GEMINI_API_KEY is not configured on the server.";

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Trimmed question, or a validation error when it is empty or too long.
pub fn validate_question(raw: &str) -> Result<String, AppError> {
    let len = raw.trim().chars().count();
    if len == 0 {
        return Err(AppError::Validation("question: must not be empty".into()));
    }
    if len > MAX_QUESTION_CHARS {
        return Err(AppError::Validation(format!(
            "question: must be at most {MAX_QUESTION_CHARS} characters"
        )));
    }
    Ok(prompt::effective_question(raw))
}

pub async fn ask_stream(
    State(state): State<SharedState>,
    Json(payload): Json<AskRequest>,
) -> Result<Response, AppError> {
    let question = validate_question(&payload.question)?;

    let Some(provider) = state.provider.clone() else {
        tracing::warn!("answer requested but no provider credential is configured");
        return Ok(ndjson(relay::single_error(MISSING_CREDENTIAL)));
    };

    let req = prompt::compose(&state.site.owner, &state.context, &question);
    tracing::debug!(
        provider = provider.name(),
        question_chars = question.chars().count(),
        "streaming answer"
    );
    Ok(ndjson(relay::relay(provider.stream_chat(req))))
}

fn ndjson<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    (
        [
            (header::CONTENT_TYPE, "application/x-ndjson"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_bounds() {
        assert!(matches!(validate_question(""), Err(AppError::Validation(_))));
        assert!(matches!(validate_question(" \n\t "), Err(AppError::Validation(_))));
        assert!(matches!(
            validate_question(&"q".repeat(MAX_QUESTION_CHARS + 1)),
            Err(AppError::Validation(_))
        ));
        assert_eq!(validate_question("  hi  ").unwrap(), "hi");

        let at_limit = format!("  {}  ", "é".repeat(MAX_QUESTION_CHARS));
        assert_eq!(
            validate_question(&at_limit).unwrap().chars().count(),
            MAX_QUESTION_CHARS
        );
    }
}
