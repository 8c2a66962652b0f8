use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "argtree.json";
pub const CONFIG_PATH_ENV: &str = "ARGTREE_CONFIG";
pub const PROMPT_ENV: &str = "ARGTREE_PROMPT";
pub const EXIT_ENV: &str = "ARGTREE_EXIT";

const DEFAULT_EXIT: &str = "exit";

/// Contents of `argtree.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Line that ends the REPL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<String>,
}

/// Settings of the interactive loop after merging every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplConfig {
    pub prompt: String,
    pub exit: String,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(DEFAULT_EXIT),
            exit: DEFAULT_EXIT.to_string(),
        }
    }
}

fn default_prompt(exit: &str) -> String {
    format!("Input command (or \"{exit}\" to quit): ")
}

fn env_lookup<'e>(env: &'e [(String, String)], key: &str) -> Option<&'e str> {
    env.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl ReplConfig {
    /// Merge sources: environment over file over defaults.
    pub fn resolve(file: Option<&ConfigFile>, env: &[(String, String)]) -> Result<Self> {
        let exit = env_lookup(env, EXIT_ENV)
            .or_else(|| file.and_then(|f| f.exit.as_deref()))
            .unwrap_or(DEFAULT_EXIT)
            .trim()
            .to_string();
        if exit.is_empty() {
            bail!("the REPL exit word must not be empty");
        }

        let prompt = env_lookup(env, PROMPT_ENV)
            .or_else(|| file.and_then(|f| f.prompt.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| default_prompt(&exit));

        Ok(Self { prompt, exit })
    }

    /// Read the config file and the process environment.
    pub fn load() -> Result<Self> {
        let env: Vec<(String, String)> = std::env::vars().collect();
        let explicit = env_lookup(&env, CONFIG_PATH_ENV).map(PathBuf::from);
        let file = load_config_file(explicit.as_deref())?;
        let config = Self::resolve(file.as_ref(), &env)?;
        tracing::debug!(exit = %config.exit, "resolved REPL config");
        Ok(config)
    }
}

/// Load `argtree.json`, or the file at `path` when given.
///
/// A missing default file is not an error; a missing explicit one is.
pub fn load_config_file(path: Option<&Path>) -> Result<Option<ConfigFile>> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let (path, explicit) = match path {
        Some(p) if p.is_absolute() => (p.to_path_buf(), true),
        Some(p) => (cwd.join(p), true),
        None => (cwd.join(DEFAULT_CONFIG_NAME), false),
    };

    if !path.exists() {
        if explicit {
            bail!("config file not found: {}", path.display());
        }
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config: ConfigFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config JSON: {}", path.display()))?;

    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("argtree-{prefix}-{pid}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_sources() {
        let config = ReplConfig::resolve(None, &[]).unwrap();
        assert_eq!(config, ReplConfig::default());
        assert_eq!(config.prompt, "Input command (or \"exit\" to quit): ");
    }

    #[test]
    fn env_overrides_file() {
        let file = ConfigFile {
            prompt: Some("> ".to_string()),
            exit: Some("quit".to_string()),
        };
        let config = ReplConfig::resolve(Some(&file), &env(&[(EXIT_ENV, "bye")])).unwrap();
        assert_eq!(config.exit, "bye");
        assert_eq!(config.prompt, "> ");

        let config = ReplConfig::resolve(Some(&file), &env(&[(PROMPT_ENV, "$ ")])).unwrap();
        assert_eq!(config.exit, "quit");
        assert_eq!(config.prompt, "$ ");
    }

    #[test]
    fn default_prompt_names_configured_exit_word() {
        let config = ReplConfig::resolve(None, &env(&[(EXIT_ENV, " quit ")])).unwrap();
        assert_eq!(config.exit, "quit");
        assert_eq!(config.prompt, "Input command (or \"quit\" to quit): ");
    }

    #[test]
    fn empty_exit_word_is_rejected() {
        let err = ReplConfig::resolve(None, &env(&[(EXIT_ENV, "  ")])).unwrap_err();
        assert!(err.to_string().contains("exit word"));
    }

    #[test]
    fn config_file_uses_camel_case_keys() {
        let dir = make_temp_dir("config");
        let path = dir.join("custom.json");
        fs::write(&path, r#"{ "prompt": "argtree> ", "exit": "q" }"#).unwrap();

        let file = load_config_file(Some(&path)).unwrap().unwrap();
        assert_eq!(file.prompt.as_deref(), Some("argtree> "));
        assert_eq!(file.exit.as_deref(), Some("q"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = make_temp_dir("config-missing");
        let err = load_config_file(Some(&dir.join("nope.json"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn malformed_config_reports_path() {
        let dir = make_temp_dir("config-bad");
        let path = dir.join("argtree.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_config_file(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to parse config JSON"));
    }
}
