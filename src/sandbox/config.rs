//! Boot-time sandbox options.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::runner::api::RuntimeLimits;

const DEFAULT_GRACE_MS: u64 = 25;

fn default_grace_ms() -> u64 {
    DEFAULT_GRACE_MS
}

/// Sandbox options as read from the host's configuration file.
///
/// `timeoutMs` has no default: a missing budget fails validation instead of
/// meaning "unlimited".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SandboxConfig {
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// How long the caller keeps waiting past the deadline for the worker to
    /// notice it before returning `Timeout` on its own.
    #[serde(default = "default_grace_ms")]
    pub termination_grace_ms: u64,
    #[serde(default)]
    pub limits: Limits,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            timeout_ms: None,
            termination_grace_ms: DEFAULT_GRACE_MS,
            limits: Limits::default(),
        }
    }
}

impl SandboxConfig {
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        SandboxConfig {
            timeout_ms: Some(timeout_ms),
            ..SandboxConfig::default()
        }
    }

    /// Read a `.json` or `.toml` file. The result is not validated yet, since
    /// the `sandbox.configure` hook may still adjust it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let parse_error = |message: String| ConfigurationError::Parse {
            path: path.to_path_buf(),
            message,
        };
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string())),
            Some("toml") => toml::from_str(&text).map_err(|e| parse_error(e.to_string())),
            _ => Err(ConfigurationError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Check the options and return the default budget.
    pub fn validate(&self) -> Result<Duration, ConfigurationError> {
        let timeout = match self.timeout_ms {
            None => return Err(ConfigurationError::MissingTimeout),
            Some(0) => return Err(ConfigurationError::InvalidTimeout),
            Some(ms) => Duration::from_millis(ms),
        };
        self.limits.validate()?;
        Ok(timeout)
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }
}

/// Resource ceilings applied to every evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Limits {
    pub max_script_bytes: usize,
    pub max_nesting_depth: usize,
    pub max_heap_bytes: usize,
    pub max_string_bytes: usize,
    pub max_collection_length: usize,
    pub max_concurrent: usize,
}

impl Default for Limits {
    fn default() -> Self {
        let runtime = RuntimeLimits::default();
        Limits {
            max_script_bytes: runtime.max_script_bytes,
            max_nesting_depth: runtime.max_nesting_depth,
            max_heap_bytes: runtime.max_heap_bytes,
            max_string_bytes: runtime.max_string_bytes,
            max_collection_length: runtime.max_collection_length,
            max_concurrent: 64,
        }
    }
}

impl Limits {
    fn validate(&self) -> Result<(), ConfigurationError> {
        let checks: [(&'static str, usize, usize); 6] = [
            ("maxScriptBytes", self.max_script_bytes, 16 * 1024 * 1024),
            ("maxNestingDepth", self.max_nesting_depth, 1024),
            ("maxHeapBytes", self.max_heap_bytes, 1024 * 1024 * 1024),
            ("maxStringBytes", self.max_string_bytes, 256 * 1024 * 1024),
            ("maxCollectionLength", self.max_collection_length, 10_000_000),
            ("maxConcurrent", self.max_concurrent, 4096),
        ];
        for (name, value, max) in checks {
            if value == 0 || value > max {
                return Err(ConfigurationError::InvalidLimit { name, value, max });
            }
        }
        Ok(())
    }

    /// The part of the limits enforced inside the interpreter.
    pub fn runtime(&self) -> RuntimeLimits {
        RuntimeLimits {
            max_script_bytes: self.max_script_bytes,
            max_nesting_depth: self.max_nesting_depth,
            max_heap_bytes: self.max_heap_bytes,
            max_string_bytes: self.max_string_bytes,
            max_collection_length: self.max_collection_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_required() {
        let config: SandboxConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.validate(), Err(ConfigurationError::MissingTimeout));

        let config: SandboxConfig = serde_json::from_str(r#"{"timeoutMs": 0}"#).unwrap();
        assert_eq!(config.validate(), Err(ConfigurationError::InvalidTimeout));

        assert!(serde_json::from_str::<SandboxConfig>(r#"{"timeoutMs": -5}"#).is_err());
    }

    #[test]
    fn test_json_and_toml_agree() {
        let json: SandboxConfig = serde_json::from_str(
            r#"{"timeoutMs": 100, "limits": {"maxConcurrent": 8}}"#,
        )
        .unwrap();
        let toml: SandboxConfig = toml::from_str(
            "timeoutMs = 100\n\n[limits]\nmaxConcurrent = 8\n",
        )
        .unwrap();
        assert_eq!(json, toml);
        assert_eq!(json.validate(), Ok(Duration::from_millis(100)));
        assert_eq!(json.limits.max_concurrent, 8);
        assert_eq!(json.limits.max_nesting_depth, 128);
        assert_eq!(json.termination_grace_ms, DEFAULT_GRACE_MS);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<SandboxConfig>(r#"{"timeoutMs": 1, "memory": 2}"#).is_err());
        assert!(
            serde_json::from_str::<SandboxConfig>(r#"{"timeoutMs": 1, "limits": {"cpu": 2}}"#)
                .is_err()
        );
    }

    #[test]
    fn test_limits_are_bounded() {
        let mut config = SandboxConfig::with_timeout_ms(10);
        config.limits.max_concurrent = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidLimit {
                name: "maxConcurrent",
                value: 0,
                max: 4096
            })
        );
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let dir = std::env::temp_dir();
        let id = uuid::Uuid::new_v4();

        let toml_path = dir.join(format!("formlogic-{}.toml", id));
        fs::write(&toml_path, "timeoutMs = 250\n").unwrap();
        let loaded = SandboxConfig::load(&toml_path);
        fs::remove_file(&toml_path).unwrap();
        assert_eq!(loaded, Ok(SandboxConfig::with_timeout_ms(250)));

        let yaml_path = dir.join(format!("formlogic-{}.yaml", id));
        fs::write(&yaml_path, "timeoutMs: 250\n").unwrap();
        let loaded = SandboxConfig::load(&yaml_path);
        fs::remove_file(&yaml_path).unwrap();
        assert_eq!(loaded, Err(ConfigurationError::UnsupportedFormat(yaml_path)));

        assert!(matches!(
            SandboxConfig::load(dir.join(format!("formlogic-{}.json", id))),
            Err(ConfigurationError::Io { .. })
        ));
    }
}
