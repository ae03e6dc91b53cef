//! Persistent run settings (JSON file); command-line flags override them.

use std::fs;
use std::path::{Path, PathBuf};

use clipset_core::{LoaderConfig, TargetSpec};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::logging::{LogConfig, DEFAULT_LOG_PREFIX};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct CliSettings {
    pub dataset_root: Option<PathBuf>,
    pub target: TargetSpec,
    pub loader: LoaderConfig,
    pub epochs: u64,
    pub log: LogConfig,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            dataset_root: None,
            target: TargetSpec::default(),
            loader: LoaderConfig::default(),
            epochs: 1,
            log: LogConfig::default(),
        }
    }
}

impl CliSettings {
    pub fn normalize(&mut self) {
        self.dataset_root = self
            .dataset_root
            .take()
            .filter(|p| !p.as_os_str().is_empty());
        if self.target.validate().is_err() {
            warn!(target_spec = ?self.target, "invalid target spec in settings, using defaults");
            self.target = TargetSpec::default();
        }
        self.loader.num_workers = self.loader.num_workers.clamp(1, 64);
        self.loader.channel_capacity = self.loader.channel_capacity.clamp(1, 4096);
        self.epochs = self.epochs.clamp(1, 10_000);
        self.log.file_prefix = normalize_file_prefix(&self.log.file_prefix);
        if self.log.filter.trim().is_empty() {
            self.log.filter = LogConfig::default().filter;
        }
    }
}

fn normalize_file_prefix(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
        DEFAULT_LOG_PREFIX.into()
    } else {
        trimmed.into()
    }
}

/// Missing or unparsable files fall back to defaults.
pub fn load_settings(path: &Path) -> CliSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<CliSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &CliSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let settings = load_settings(Path::new("/nonexistent/clipset.json"));
        assert_eq!(settings, CliSettings::default());
    }

    #[test]
    fn normalize_clamps_and_repairs() {
        let mut settings = CliSettings {
            dataset_root: Some(PathBuf::new()),
            target: TargetSpec {
                target_rate: 0,
                target_duration_secs: 2,
            },
            loader: LoaderConfig {
                num_workers: 0,
                channel_capacity: 0,
                ..LoaderConfig::default()
            },
            epochs: 0,
            log: LogConfig {
                file_prefix: "../escape".into(),
                filter: "  ".into(),
                ..LogConfig::default()
            },
        };
        settings.normalize();
        assert_eq!(settings.dataset_root, None);
        assert_eq!(settings.target, TargetSpec::default());
        assert_eq!(settings.loader.num_workers, 1);
        assert_eq!(settings.loader.channel_capacity, 1);
        assert_eq!(settings.epochs, 1);
        assert_eq!(settings.log.file_prefix, DEFAULT_LOG_PREFIX);
        assert_eq!(settings.log.filter, LogConfig::default().filter);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("clipset.json");
        let settings = CliSettings {
            dataset_root: Some(PathBuf::from("/data/train/wav")),
            target: TargetSpec {
                target_rate: 16_000,
                target_duration_secs: 1,
            },
            epochs: 3,
            ..CliSettings::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn partial_json_uses_camel_case_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipset.json");
        fs::write(
            &path,
            r#"{"datasetRoot": "/data", "loader": {"numWorkers": 8, "shuffle": true}}"#,
        )
        .unwrap();
        let settings = load_settings(&path);
        assert_eq!(settings.dataset_root, Some(PathBuf::from("/data")));
        assert_eq!(settings.loader.num_workers, 8);
        assert!(settings.loader.shuffle);
        assert_eq!(settings.target, TargetSpec::default());
    }
}
