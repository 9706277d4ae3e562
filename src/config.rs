//! Configuration: `.env` discovery and settings loading.
//!
//! The `.env` file is found by walking up from the working directory. Values
//! are read with `dotenvy` without touching the process environment; a process
//! environment variable of the same name takes precedence over the file.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::message::DEFAULT_FILE_REF_THRESHOLD;

/// Name of the configuration file searched for.
pub const ENV_FILE_NAME: &str = ".env";
/// Key holding the API credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Key overriding the completion service root.
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
/// Key overriding the file-reference length threshold.
pub const THRESHOLD_VAR: &str = "AIAPP_FILE_REF_THRESHOLD";
/// Key naming a directory to record completion cassettes into.
pub const RECORD_VAR: &str = "AIAPP_RECORD";
/// Key naming a cassette to replay completions from.
pub const REPLAY_VAR: &str = "AIAPP_REPLAY";

/// Searches `start` and its ancestors for a file called `file_name`.
///
/// # Errors
///
/// Returns an [`io::ErrorKind::NotFound`] error once the filesystem root has
/// been checked without a match.
pub fn find_upward(start: &Path, file_name: &str) -> io::Result<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(io::ErrorKind::NotFound, format!("{file_name} file not found.")))
}

/// Locates the nearest `.env` at or above `start`.
///
/// # Errors
///
/// Returns a `NotFound` I/O error when no ancestor holds a `.env` file.
pub fn find_env_file(start: &Path) -> io::Result<PathBuf> {
    find_upward(start, ENV_FILE_NAME)
}

/// Settings read from the configuration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// API credential.
    pub api_key: String,
    /// Completion service root, if overridden.
    pub base_url: Option<String>,
    /// Values shorter than this may name a template file.
    pub file_ref_threshold: usize,
    /// Directory receiving recorded completion cassettes.
    pub record_dir: Option<PathBuf>,
    /// Cassette serving completions instead of the network.
    pub replay_cassette: Option<PathBuf>,
}

impl Settings {
    /// Settings with only a credential and defaults everywhere else.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            file_ref_threshold: DEFAULT_FILE_REF_THRESHOLD,
            record_dir: None,
            replay_cassette: None,
        }
    }

    /// Finds the nearest `.env` above `start` and loads it.
    ///
    /// # Errors
    ///
    /// Returns an error if no `.env` is found, it cannot be parsed, or the
    /// credential is missing.
    pub fn discover(start: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::discover_named(start, ENV_FILE_NAME)
    }

    /// Like [`Settings::discover`], searching for `file_name` instead of `.env`.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` I/O error if no ancestor holds `file_name`, or an
    /// error if the file cannot be loaded.
    pub fn discover_named(
        start: &Path,
        file_name: &str,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let path = find_upward(start, file_name)?;
        debug!(path = %path.display(), "using configuration file");
        Ok(Self::load(&path)?)
    }

    /// Loads settings from a `.env` file, letting process variables win.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, the credential is
    /// missing, or the threshold is not a number.
    pub fn load(path: &Path) -> Result<Self, String> {
        let file_values = read_env_file(path)?;
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_values.get(key).cloned()))
    }

    /// Builds settings from a key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is missing or the threshold is not
    /// a number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| format!("{API_KEY_VAR} not found. Declare it as envvar or define a default value."))?;

        let file_ref_threshold = match lookup(THRESHOLD_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| format!("Failed to parse {THRESHOLD_VAR}={raw:?}: {e}"))?,
            None => DEFAULT_FILE_REF_THRESHOLD,
        };

        Ok(Self {
            api_key,
            base_url: lookup(BASE_URL_VAR).filter(|v| !v.is_empty()),
            file_ref_threshold,
            record_dir: lookup(RECORD_VAR).filter(|v| !v.is_empty()).map(PathBuf::from),
            replay_cassette: lookup(REPLAY_VAR).filter(|v| !v.is_empty()).map(PathBuf::from),
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, String> {
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    iter.map(|item| item.map_err(|e| format!("Failed to parse {}: {e}", path.display())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn finds_file_in_ancestor_directory() {
        let root = scratch("aiapp_config_find_upward");
        let nested = root.join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join("a/marker.cfg"), "x").unwrap();

        let found = find_upward(&nested, "marker.cfg").unwrap();
        assert_eq!(found, root.join("a/marker.cfg"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn nearest_match_wins() {
        let root = scratch("aiapp_config_nearest");
        let nested = root.join("inner");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(ENV_FILE_NAME), "OPENAI_API_KEY=outer").unwrap();
        std::fs::write(nested.join(ENV_FILE_NAME), "OPENAI_API_KEY=inner").unwrap();

        assert_eq!(find_env_file(&nested).unwrap(), nested.join(ENV_FILE_NAME));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_file_is_not_found_error() {
        let root = scratch("aiapp_config_missing");
        let err = find_upward(&root, "aiapp-no-such-config-7f3a.cfg").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn loads_settings_from_env_file() {
        let root = scratch("aiapp_config_load");
        let path = root.join(ENV_FILE_NAME);
        std::fs::write(
            &path,
            "# credentials\nOPENAI_API_KEY=sk-file-only-test\nAIAPP_FILE_REF_THRESHOLD=20\nAIAPP_REPLAY=cassettes/demo.yaml\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.api_key, std::env::var(API_KEY_VAR).unwrap_or("sk-file-only-test".into()));
        assert_eq!(settings.replay_cassette, Some(PathBuf::from("cassettes/demo.yaml")));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn lookup_applies_defaults() {
        let settings =
            Settings::from_lookup(|key| (key == API_KEY_VAR).then(|| "sk-1".to_string())).unwrap();
        assert_eq!(settings, Settings::with_api_key("sk-1"));
    }

    #[test]
    fn lookup_requires_api_key() {
        let err = Settings::from_lookup(|_| None).unwrap_err();
        assert!(err.contains(API_KEY_VAR));
    }

    #[test]
    fn lookup_rejects_bad_threshold() {
        let err = Settings::from_lookup(|key| match key {
            API_KEY_VAR => Some("sk-1".into()),
            THRESHOLD_VAR => Some("many".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.starts_with("Failed to parse AIAPP_FILE_REF_THRESHOLD"));
    }

    #[test]
    fn lookup_reads_optional_keys() {
        let settings = Settings::from_lookup(|key| match key {
            API_KEY_VAR => Some("sk-1".into()),
            BASE_URL_VAR => Some("http://localhost:9000".into()),
            THRESHOLD_VAR => Some(" 10 ".into()),
            RECORD_VAR => Some("cassettes".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(settings.file_ref_threshold, 10);
        assert_eq!(settings.record_dir, Some(PathBuf::from("cassettes")));
        assert_eq!(settings.replay_cassette, None);
    }
}
