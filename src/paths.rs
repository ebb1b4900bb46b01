//! Where the config file and the document store live.
//!
//! `PORTFOLIO_HOME` puts everything under one directory. Otherwise the XDG
//! base directories are used, falling back to `~/.config` and `~/.local/state`.

use anyhow::Context;
use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR: &str = "portfolio";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Config,
    State,
}

impl Kind {
    fn xdg_var(self) -> &'static str {
        match self {
            Kind::Config => "XDG_CONFIG_HOME",
            Kind::State => "XDG_STATE_HOME",
        }
    }

    /// Subdirectory of `PORTFOLIO_HOME`.
    fn home_subdir(self) -> &'static str {
        match self {
            Kind::Config => "config",
            Kind::State => "state",
        }
    }

    /// Path below `$HOME` when the XDG variable is unset.
    fn fallback(self) -> &'static [&'static str] {
        match self {
            Kind::Config => &[".config"],
            Kind::State => &[".local", "state"],
        }
    }
}

fn resolve(kind: Kind, env: impl Fn(&str) -> Option<OsString>) -> anyhow::Result<PathBuf> {
    let set = |name: &str| env(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    if let Some(base) = set("PORTFOLIO_HOME") {
        return Ok(base.join(kind.home_subdir()));
    }
    if let Some(xdg) = set(kind.xdg_var()) {
        return Ok(xdg.join(APP_DIR));
    }

    let mut dir = set("HOME").context("HOME is not set")?;
    dir.extend(kind.fallback());
    Ok(dir.join(APP_DIR))
}

fn ensured(kind: Kind) -> anyhow::Result<PathBuf> {
    let dir = resolve(kind, |name| std::env::var_os(name))?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    Ok(dir)
}

pub fn config_dir() -> anyhow::Result<PathBuf> {
    ensured(Kind::Config)
}

pub fn state_dir() -> anyhow::Result<PathBuf> {
    ensured(Kind::State)
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn default_database_path() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("portfolio.db"))
}
