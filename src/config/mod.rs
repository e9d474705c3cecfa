use crate::mappings::{BidirectionalMapping, MappingRegistry};
use crate::shell::{EnvSnapshot, DEFAULT_PROBE_TIMEOUT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the target shell
pub const SHELL_OVERRIDE_VAR: &str = "SHELLBRIDGE_SHELL";
/// Environment variable enabling debug logging
pub const DEBUG_VAR: &str = "SHELLBRIDGE_DEBUG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,

    /// Optional YAML file with extra command mappings
    #[serde(default)]
    pub mappings_file: Option<PathBuf>,

    /// Inline command mappings, appended after `mappings_file`
    #[serde(default)]
    pub mappings: Vec<BidirectionalMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Translate commands for the target shell; `false` passes everything through
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Target shell override: pwsh, powershell, cmd, bash...
    #[serde(default)]
    pub target_shell: Option<String>,

    /// Upper bound for the PowerShell version probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_shell: None,
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl TranslationConfig {
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("Failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path.as_ref(), contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get default configuration path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;

        Ok(home.join(".shellbridge").join("config.yaml"))
    }

    /// Apply `SHELLBRIDGE_SHELL` and `SHELLBRIDGE_DEBUG` from an environment snapshot
    pub fn apply_env(&mut self, env: &EnvSnapshot) {
        if let Some(shell) = env.get(SHELL_OVERRIDE_VAR).filter(|s| !s.trim().is_empty()) {
            debug!("{} overrides target shell with '{}'", SHELL_OVERRIDE_VAR, shell);
            self.translation.target_shell = Some(shell.trim().to_string());
        }
        if let Some(flag) = env.get(DEBUG_VAR) {
            self.debug = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Build the mapping registry: built-in table, then `mappings_file`, then
    /// inline `mappings`
    pub fn build_registry(&self) -> Result<MappingRegistry> {
        let mut registry = MappingRegistry::builtin();

        if let Some(path) = &self.mappings_file {
            let path = expand_home(path);
            registry
                .extend_from_file(&path)
                .with_context(|| format!("Failed to load mappings from {}", path.display()))?;
        }

        registry
            .extend(self.mappings.iter().cloned())
            .context("Invalid inline mapping in config")?;

        debug!("Mapping registry holds {} commands", registry.len());
        Ok(registry)
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Dialect;

    #[test]
    fn test_default_translation_config() {
        let config = TranslationConfig::default();
        assert!(config.enabled);
        assert!(config.target_shell.is_none());
        assert_eq!(config.probe_timeout(), DEFAULT_PROBE_TIMEOUT);
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
translation:
  enabled: false
  target_shell: cmd
debug: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.translation.enabled);
        assert_eq!(config.translation.target_shell.as_deref(), Some("cmd"));
        assert_eq!(config.translation.probe_timeout_ms, 1500);
        assert!(config.debug);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(config.translation.enabled);
        assert!(config.mappings.is_empty());
        assert!(config.mappings_file.is_none());
    }

    #[test]
    fn test_apply_env() {
        let env = EnvSnapshot::from_vars(
            [(SHELL_OVERRIDE_VAR, " ps5 "), (DEBUG_VAR, "TRUE")],
            false,
        );
        let mut config = Config::default();
        config.apply_env(&env);
        assert_eq!(config.translation.target_shell.as_deref(), Some("ps5"));
        assert!(config.debug);
    }

    #[test]
    fn test_apply_env_ignores_blank_override() {
        let env = EnvSnapshot::from_vars([(SHELL_OVERRIDE_VAR, "")], false);
        let mut config = Config::default();
        config.translation.target_shell = Some("cmd".into());
        config.apply_env(&env);
        assert_eq!(config.translation.target_shell.as_deref(), Some("cmd"));
    }

    #[test]
    fn test_inline_mappings() {
        let yaml = r#"
mappings:
  - unix: tree
    powershell: Get-ChildItem -Recurse
    cmd: tree
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let registry = config.build_registry().unwrap();
        let tree = registry
            .lookup("tree", Dialect::Unix, Dialect::Cmd)
            .unwrap();
        assert_eq!(tree.target_name, "tree");
    }

    #[test]
    fn test_invalid_inline_mapping() {
        let yaml = r#"
mappings:
  - unix: lonely
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.build_registry().is_err());
    }
}
