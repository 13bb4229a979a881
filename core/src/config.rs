//! Client settings: where the API lives and how long a call may take.
//!
//! # Design
//! Layers apply in a fixed order: built-in defaults, then an optional TOML
//! file, then `LOCO_BASE_URL` / `LOCO_TIMEOUT_SECS`. `read_settings` stops
//! there so a caller can overlay its own values (command-line flags) before
//! calling `ClientSettings::validate`; `load_settings` does both for callers
//! with nothing to add.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_CONFIG_FILE: &str = "loco.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub default_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            default_timeout_secs: 30,
        }
    }
}

impl ClientSettings {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Reject a zero timeout and a base URL that does not parse.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.default_timeout_secs == 0 {
            return Err(ApiError::Config("timeout must be at least one second".into()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base url '{}': {e}", self.base_url)))?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    default_timeout_secs: Option<u64>,
}

/// [`read_settings`] followed by [`ClientSettings::validate`].
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, ApiError> {
    let settings = read_settings(path)?;
    settings.validate()?;
    Ok(settings)
}

/// Defaults, then `path` (or `loco.toml` in the working directory) when it
/// exists, then `LOCO_BASE_URL` / `LOCO_TIMEOUT_SECS`. Not validated.
pub fn read_settings(path: Option<&Path>) -> Result<ClientSettings, ApiError> {
    let mut settings = ClientSettings::default();

    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(file) {
        Ok(raw) => apply_file(&mut settings, &raw)?,
        // An explicitly named file must exist; the implicit one is optional.
        Err(e) if path.is_some() => {
            return Err(ApiError::Config(format!(
                "failed to read '{}': {e}",
                file.display()
            )))
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, raw: &str) -> Result<(), ApiError> {
    let file_cfg: FileSettings =
        toml::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))?;
    if let Some(v) = file_cfg.base_url {
        settings.base_url = v;
    }
    if let Some(v) = file_cfg.default_timeout_secs {
        settings.default_timeout_secs = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ApiError> {
    if let Some(v) = lookup("LOCO_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = lookup("LOCO_TIMEOUT_SECS") {
        settings.default_timeout_secs = v
            .trim()
            .parse()
            .map_err(|_| ApiError::Config(format!("LOCO_TIMEOUT_SECS is not a number: '{v}'")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    #[test]
    fn defaults_match_fixed_call_site_timeout() {
        let settings = ClientSettings::default();
        assert_eq!(settings.default_timeout(), Duration::from_secs(30));
        assert_eq!(settings.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn file_overrides_defaults() {
        let mut settings = ClientSettings::default();
        apply_file(
            &mut settings,
            "base_url = \"http://analytics:9000\"\ndefault_timeout_secs = 10\n",
        )
        .unwrap();
        assert_eq!(settings.base_url, "http://analytics:9000");
        assert_eq!(settings.default_timeout_secs, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut settings = ClientSettings::default();
        apply_file(&mut settings, "default_timeout_secs = 5\n").unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.default_timeout_secs, 5);
    }

    #[test]
    fn env_overrides_file() {
        let vars: HashMap<&str, &str> = [
            ("LOCO_BASE_URL", "http://from-env:1234"),
            ("LOCO_TIMEOUT_SECS", " 45 "),
        ]
        .into_iter()
        .collect();
        let mut settings = ClientSettings::default();
        apply_file(&mut settings, "base_url = \"http://from-file\"\n").unwrap();
        apply_env(&mut settings, |key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.base_url, "http://from-env:1234");
        assert_eq!(settings.default_timeout_secs, 45);
    }

    #[test]
    fn bad_timeout_env_is_rejected() {
        let mut settings = ClientSettings::default();
        let err = apply_env(&mut settings, |key| {
            (key == "LOCO_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn zero_timeout_and_bad_url_fail_validation() {
        let zero = ClientSettings {
            default_timeout_secs: 0,
            ..ClientSettings::default()
        };
        assert!(zero.validate().is_err());

        let bad_url = ClientSettings {
            base_url: "not a url".into(),
            ..ClientSettings::default()
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn bad_env_url_can_be_replaced_before_validation() {
        let mut settings = ClientSettings::default();
        apply_env(&mut settings, |key| {
            (key == "LOCO_BASE_URL").then(|| "not a url".to_string())
        })
        .unwrap();
        assert!(settings.validate().is_err());

        settings.base_url = "http://127.0.0.1:9000".into();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let missing = env::temp_dir().join(format!("loco_missing_{suffix}.toml"));
        let err = load_settings(Some(&missing)).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("loco_settings_{suffix}.toml"));
        fs::write(&path, "base_url = \"http://10.0.0.5:8080\"\n").expect("write config");

        let settings = load_settings(Some(&path));
        fs::remove_file(&path).expect("cleanup");

        // LOCO_BASE_URL in the test environment would legitimately win.
        if env::var("LOCO_BASE_URL").is_err() {
            assert_eq!(settings.unwrap().base_url, "http://10.0.0.5:8080");
        }
    }
}
