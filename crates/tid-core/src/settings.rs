//! Determinator settings: `.tid.toml` with environment overrides.
//!
//! Load order: `.tid.toml` in the given root → environment variables →
//! defaults. Settings only provide defaults for command-line flags; the
//! engine itself never reads them and stays a pure function of its inputs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SETTINGS_FILE: &str = ".tid.toml";

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TidSettings {
    pub engine: EngineSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Default dependency-depth limit; `None` means unbounded.
    pub depth: Option<u64>,
    /// Run the dangling-reference check by default.
    pub check_dangling: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Impact-record schema version: 1 (legacy terse reason) or 2 (structured).
    pub schema_version: u32,
    /// Compression level for `.zst` output artifacts.
    pub zstd_level: i32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            schema_version: 2,
            zstd_level: 3,
        }
    }
}

/// Helper to parse an env var and apply it to a settings field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl TidSettings {
    /// Load settings from `.tid.toml` under the given root, with env var
    /// overrides. Falls back to defaults if no settings file exists.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE);

        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(v) = std::env::var("TID_DEPTH")
            && let Ok(n) = v.parse()
        {
            settings.engine.depth = Some(n);
        }
        env_override("TID_SCHEMA_VERSION", &mut settings.output.schema_version);
        env_override("TID_ZSTD_LEVEL", &mut settings.output.zstd_level);

        if !matches!(settings.output.schema_version, 1 | 2) {
            anyhow::bail!(
                "schema_version must be 1 or 2, got {}",
                settings.output.schema_version
            );
        }
        if !(1..=21).contains(&settings.output.zstd_level) {
            anyhow::bail!(
                "zstd_level must be between 1 and 21, got {}",
                settings.output.zstd_level
            );
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = TidSettings::default();
        assert_eq!(settings.engine.depth, None);
        assert!(!settings.engine.check_dangling);
        assert_eq!(settings.output.schema_version, 2);
        assert_eq!(settings.output.zstd_level, 3);
    }

    #[test]
    fn test_settings_from_toml() {
        let toml_str = r#"
[engine]
depth = 4
check_dangling = true

[output]
zstd_level = 9
"#;
        let settings: TidSettings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.engine.depth, Some(4));
        assert!(settings.engine.check_dangling);
        assert_eq!(settings.output.zstd_level, 9);
        // Defaults for unspecified fields
        assert_eq!(settings.output.schema_version, 2);
    }

    #[test]
    fn test_load_nonexistent() {
        let settings = TidSettings::load(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(settings.output.schema_version, 2);
    }

    #[test]
    fn test_load_rejects_bad_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "[output]\nschema_version = 7\n",
        )
        .unwrap();
        assert!(TidSettings::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_rejects_bad_zstd_level() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "[output]\nzstd_level = 0\n").unwrap();
        assert!(TidSettings::load(dir.path()).is_err());
    }
}
