use std::path::PathBuf;
use std::time::Duration;

pub const TIMEOUT_ENV: &str = "STRATUM_TIMEOUT_SECS";
pub const ABSOLUTE_PATHS_ENV: &str = "STRATUM_ABSOLUTE_PATHS";
pub const WORKSPACE_DIR_ENV: &str = "STRATUM_WORKSPACE_DIR";
pub const MAVEN_ENV: &str = "STRATUM_MAVEN";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const MIN_TIMEOUT_SECS: u64 = 5;
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Hard limit for the classpath-resolution subprocess, independent of the operation timeout.
pub const CLASSPATH_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Budget for one wrapped operation.
    pub timeout: Duration,
    /// Report absolute paths instead of paths relative to the loaded tree.
    pub absolute_paths: bool,
    /// Base directory session workspaces are created under.
    pub workspace_base: PathBuf,
    pub maven_command: String,
    pub classpath_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            absolute_paths: false,
            workspace_base: default_workspace_base(),
            maven_command: default_maven_command().to_string(),
            classpath_timeout: CLASSPATH_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<i64>() {
                Ok(secs) => config.timeout = Duration::from_secs(clamp_timeout_secs(secs)),
                Err(_) => tracing::warn!("Ignoring non-numeric {}={:?}", TIMEOUT_ENV, raw),
            }
        }

        if let Some(raw) = lookup(ABSOLUTE_PATHS_ENV) {
            config.absolute_paths = parse_flag(&raw);
        }

        if let Some(dir) = lookup(WORKSPACE_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.workspace_base = PathBuf::from(dir.trim());
        }

        if let Some(cmd) = lookup(MAVEN_ENV).filter(|c| !c.trim().is_empty()) {
            config.maven_command = cmd.trim().to_string();
        }

        config
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(clamp_timeout_secs(secs as i64));
        self
    }

    pub fn with_workspace_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.workspace_base = base.into();
        self
    }

    pub fn with_absolute_paths(mut self, absolute: bool) -> Self {
        self.absolute_paths = absolute;
        self
    }

    pub fn with_maven_command(mut self, command: impl Into<String>) -> Self {
        self.maven_command = command.into();
        self
    }
}

pub fn clamp_timeout_secs(secs: i64) -> u64 {
    secs.clamp(MIN_TIMEOUT_SECS as i64, MAX_TIMEOUT_SECS as i64) as u64
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn default_workspace_base() -> PathBuf {
    std::env::temp_dir().join("stratum-workspaces")
}

fn default_maven_command() -> &'static str {
    if cfg!(windows) { "mvn.cmd" } else { "mvn" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ServiceConfig::from_lookup(|_| None);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.absolute_paths);
        assert_eq!(config.classpath_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_timeout_is_clamped() {
        let low = ServiceConfig::from_lookup(lookup_from(&[(TIMEOUT_ENV, "1")]));
        assert_eq!(low.timeout, Duration::from_secs(5));

        let high = ServiceConfig::from_lookup(lookup_from(&[(TIMEOUT_ENV, "9000")]));
        assert_eq!(high.timeout, Duration::from_secs(300));

        let negative = ServiceConfig::from_lookup(lookup_from(&[(TIMEOUT_ENV, "-4")]));
        assert_eq!(negative.timeout, Duration::from_secs(5));

        let ok = ServiceConfig::from_lookup(lookup_from(&[(TIMEOUT_ENV, " 45 ")]));
        assert_eq!(ok.timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_garbage_timeout_keeps_default() {
        let config = ServiceConfig::from_lookup(lookup_from(&[(TIMEOUT_ENV, "soon")]));
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_flags_and_paths() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            (ABSOLUTE_PATHS_ENV, "TRUE"),
            (WORKSPACE_DIR_ENV, "/tmp/ws-base"),
            (MAVEN_ENV, "/opt/maven/bin/mvn"),
        ]));
        assert!(config.absolute_paths);
        assert_eq!(config.workspace_base, PathBuf::from("/tmp/ws-base"));
        assert_eq!(config.maven_command, "/opt/maven/bin/mvn");

        let off = ServiceConfig::from_lookup(lookup_from(&[(ABSOLUTE_PATHS_ENV, "0")]));
        assert!(!off.absolute_paths);
    }
}
