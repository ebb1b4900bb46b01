use anyhow::Context;
use clap::Parser;
use portfolio::{app, cli, config, paths, server};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up GEMINI_API_KEY and RUST_LOG from a local .env before anything reads them.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Ok(path) = &dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let args = cli::Args::parse();

    let default_config = paths::default_config_path()?;
    let mut cfg = config::Config::load(args.config.as_deref(), &default_config)?;
    if let Some(model) = args.model.clone() {
        cfg.chat.model = model;
    }
    if let Some(provider) = args.provider.clone() {
        cfg.chat.provider = provider;
    }
    tracing::debug!(?cfg, "resolved config");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    let provider = app::build_provider(&http, &cfg.chat, |name| std::env::var(name).ok())?;

    match args.cmd.unwrap_or(cli::Command::Serve { bind: None }) {
        cli::Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            let state = app::build_state(&cfg, provider)?;
            server::serve(state, &bind).await
        }
        cli::Command::Ask { question } => {
            let mut out = std::io::stdout();
            app::cmd_ask(&cfg, provider, &question.join(" "), &mut out).await
        }
        cli::Command::SeedResume { path } => {
            let store = app::open_store(&cfg)?;
            let id = app::cmd_seed_resume(&store, &path).await?;
            println!("Stored resume {id} from {}", path.display());
            Ok(())
        }
    }
}
