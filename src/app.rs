use crate::config::{ChatConfig, Config};
use crate::context::ContextDocument;
use crate::models::Resume;
use crate::provider::google::GoogleProvider;
use crate::provider::stub::StubProvider;
use crate::provider::SharedProvider;
use crate::render::Templates;
use crate::server::chat::MISSING_CREDENTIAL;
use crate::server::AppState;
use crate::store::{SqliteStore, RESUME_COLLECTION};
use crate::{paths, prompt};
use anyhow::Context;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_stream::StreamExt;

/// Build the configured provider. A Google provider without a key is `None`.
pub fn build_provider(
    http: &reqwest::Client,
    cfg: &ChatConfig,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Option<SharedProvider>> {
    match cfg.provider.as_str() {
        "google" => {
            let Some(key) = cfg.resolve_api_key(env) else {
                tracing::warn!("GEMINI_API_KEY not set; /ask-stream will answer with an error record");
                return Ok(None);
            };
            let p = GoogleProvider::new(http.clone(), key, cfg.generation_settings())?;
            Ok(Some(Arc::new(p)))
        }
        "stub" => Ok(Some(Arc::new(StubProvider::new(cfg.stub.clone())))),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}

pub fn open_store(cfg: &Config) -> anyhow::Result<SqliteStore> {
    let path = match &cfg.server.database {
        Some(p) => p.clone(),
        None => paths::default_database_path()?,
    };
    tracing::debug!(path = %path.display(), "opening document store");
    SqliteStore::open(&path)
}

pub fn build_state(cfg: &Config, provider: Option<SharedProvider>) -> anyhow::Result<AppState> {
    let context = ContextDocument::load(&cfg.chat.context_path);
    let templates = Templates::load(&cfg.server.templates_dir)?;
    let store = open_store(cfg)?;

    tracing::info!(
        owner = %cfg.site.owner,
        provider = provider.as_ref().map(|p| p.name()).unwrap_or("none"),
        model = %cfg.chat.model,
        context_chars = context.char_count(),
        "application state ready"
    );

    Ok(AppState {
        site: cfg.site.clone(),
        context,
        provider,
        templates,
        store,
        static_dir: cfg.server.static_dir.clone(),
    })
}

/// Stream one answer to `out` as plain text.
pub async fn cmd_ask<W: Write>(
    cfg: &Config,
    provider: Option<SharedProvider>,
    question: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    let question = prompt::effective_question(question);
    if question.is_empty() {
        anyhow::bail!("No question provided. Try: portfolio ask \"What are your main skills?\"");
    }
    let Some(provider) = provider else {
        anyhow::bail!("{MISSING_CREDENTIAL}");
    };

    let context = ContextDocument::load(&cfg.chat.context_path);
    let req = prompt::compose(&cfg.site.owner, &context, &question);

    let mut stream = provider
        .stream_chat(req)
        .await
        .context("provider failed to start streaming")?;

    while let Some(item) = stream.next().await {
        let piece = item.context("stream chunk error")?;
        write!(out, "{}", piece.text)?;
        out.flush().ok();
    }
    writeln!(out)?;

    Ok(())
}

/// Replace the stored resume with the contents of a JSON file.
pub async fn cmd_seed_resume(store: &SqliteStore, path: &Path) -> anyhow::Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read resume: {}", path.display()))?;
    let resume: Resume = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse resume JSON: {}", path.display()))?;

    let doc = serde_json::to_value(&resume)?;
    let id = store.replace_all(RESUME_COLLECTION, &doc).await?;
    tracing::info!(%id, name = %resume.name, "resume stored");
    Ok(id)
}
