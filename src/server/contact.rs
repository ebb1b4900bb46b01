use super::SharedState;
use crate::error::AppError;
use crate::models::{ContactForm, ContactReceipt, MESSAGE_TOO_LONG};
use crate::store::CONTACTS_COLLECTION;
use anyhow::Context;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct StoredContact<'a> {
    #[serde(flatten)]
    form: &'a ContactForm,
    created_at: DateTime<Utc>,
}

pub async fn submit(
    State(state): State<SharedState>,
    Json(form): Json<ContactForm>,
) -> Result<Response, AppError> {
    // Answered inline so the page can show it next to the form.
    if form.message_too_long() {
        return Ok(Json(json!({ "error": MESSAGE_TOO_LONG })).into_response());
    }
    form.validate().map_err(AppError::Validation)?;

    let doc = serde_json::to_value(StoredContact {
        form: &form,
        created_at: Utc::now(),
    })
    .context("failed to encode contact")?;
    let id = state.store.insert(CONTACTS_COLLECTION, &doc).await?;
    tracing::info!(%id, "contact received");

    Ok(Json(ContactReceipt::new(id)).into_response())
}
