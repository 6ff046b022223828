use std::path::PathBuf;

use anyhow::{bail, Context};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Postgres { database_url: String },
    /// Local CSV worksheet at `FOLLOWUP_SHEET_PATH`.
    ///
    /// `FOLLOWUP_SHEET_CREDENTIALS` is accepted for deployments that carry a
    /// credential blob alongside the sheet. It must be readable when set, but a
    /// local worksheet needs no authentication, so its contents are never read.
    Sheet { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: Backend,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Any missing or unusable value here is fatal: nothing runs without a backend.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = lookup("FOLLOWUP_BACKEND")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "postgres".to_string());

        let backend = match kind.as_str() {
            "postgres" => {
                let database_url = non_empty(lookup("DATABASE_URL"))
                    .context("DATABASE_URL must be set when FOLLOWUP_BACKEND=postgres")?;
                Backend::Postgres { database_url }
            }
            "sheet" => {
                let path = non_empty(lookup("FOLLOWUP_SHEET_PATH"))
                    .context("FOLLOWUP_SHEET_PATH must be set when FOLLOWUP_BACKEND=sheet")?;
                if let Some(credentials) = non_empty(lookup("FOLLOWUP_SHEET_CREDENTIALS")) {
                    std::fs::metadata(&credentials).with_context(|| {
                        format!("FOLLOWUP_SHEET_CREDENTIALS points at unreadable {credentials}")
                    })?;
                }
                Backend::Sheet {
                    path: PathBuf::from(path),
                }
            }
            other => bail!("unsupported FOLLOWUP_BACKEND {other:?}, expected postgres or sheet"),
        };

        Ok(Self { backend })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
