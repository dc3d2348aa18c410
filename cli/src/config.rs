use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use crate::openfoodfacts::DEFAULT_BASE_URL;

pub const DEFAULT_USER: &str = "local";

pub struct Config {
    pub db_path: PathBuf,
    pub off_base_url: String,
    pub user_id: String,
}

impl Config {
    /// Platform data directory, overridden by `LIFTLOG_DB`, `LIFTLOG_OFF_URL`
    /// and `LIFTLOG_USER`.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), default_db_path)
    }

    fn from_lookup(
        env: impl Fn(&str) -> Option<String>,
        default_db: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<Self> {
        let non_empty = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = match non_empty("LIFTLOG_DB") {
            Some(path) => PathBuf::from(path),
            None => default_db()?,
        };
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        Ok(Config {
            db_path,
            off_base_url: non_empty("LIFTLOG_OFF_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            user_id: non_empty("LIFTLOG_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "liftlog").context("Could not determine home directory")?;
    Ok(proj_dirs.data_dir().join("liftlog.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("data").join("liftlog.db");
        let expected = fallback.clone();
        let config = Config::from_lookup(lookup(&[]), move || Ok(fallback)).unwrap();

        assert_eq!(config.db_path, expected);
        assert!(dir.path().join("data").is_dir());
        assert_eq!(config.off_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.user_id, DEFAULT_USER);
    }

    #[test]
    fn test_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("custom.db");
        let db_text = db.to_string_lossy().to_string();
        let config = Config::from_lookup(
            lookup(&[
                ("LIFTLOG_DB", &db_text),
                ("LIFTLOG_OFF_URL", "http://localhost:8080"),
                ("LIFTLOG_USER", "ada"),
            ]),
            || panic!("default path should not be resolved"),
        )
        .unwrap();

        assert_eq!(config.db_path, db);
        assert_eq!(config.off_base_url, "http://localhost:8080");
        assert_eq!(config.user_id, "ada");
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("liftlog.db");
        let config = Config::from_lookup(
            lookup(&[("LIFTLOG_USER", "  "), ("LIFTLOG_OFF_URL", "")]),
            move || Ok(fallback),
        )
        .unwrap();
        assert_eq!(config.user_id, DEFAULT_USER);
        assert_eq!(config.off_base_url, DEFAULT_BASE_URL);
    }
}
