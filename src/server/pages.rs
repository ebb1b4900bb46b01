use super::SharedState;
use crate::error::AppError;
use crate::models::Resume;
use crate::store::RESUME_COLLECTION;
use anyhow::Context;
use axum::extract::State;
use axum::response::Html;
use serde_json::json;

pub async fn landing(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    let html = state.templates.render(
        "index",
        &json!({ "title": state.site.title(), "owner": state.site.owner }),
    )?;
    Ok(Html(html))
}

pub async fn resume(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    let Some(doc) = state.store.find_one(RESUME_COLLECTION).await? else {
        return Err(AppError::NotFound("Resume not found".into()));
    };
    let resume: Resume =
        serde_json::from_value(doc).context("stored resume document is malformed")?;

    let html = state.templates.render(
        "resume",
        &json!({
            "resume": resume,
            "title": format!("Resume | {}", state.site.owner),
        }),
    )?;
    Ok(Html(html))
}
