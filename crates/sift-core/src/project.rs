//! Per-project configuration.
//!
//! Each project is an isolated topic context with its own source lists.
//! Projects live under a projects directory, one TOML file per project at
//! `<projects_dir>/<name>/config.toml`. Configuration is loaded once per
//! run and passed explicitly into adapters and classifiers; there is no
//! mutable global.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project '{name}' not found (expected config at {path})")]
    NotFound { name: String, path: PathBuf },
    #[error("failed to read project config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid project config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A project's full configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Topic focus passed verbatim into classification prompts.
    pub topic: String,
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub hn_keywords: Vec<String>,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    0.7
}

impl ProjectConfig {
    fn from_toml(name: &str, raw: &str) -> Result<ProjectConfig, ProjectError> {
        let mut config: ProjectConfig = toml::from_str(raw)?;
        if config.name.is_empty() {
            config.name = name.to_string();
        }
        Ok(config)
    }
}

/// Discovers and loads project configurations from a directory tree.
#[derive(Debug, Clone)]
pub struct ProjectLoader {
    projects_dir: PathBuf,
}

impl ProjectLoader {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
        }
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.projects_dir.join(name).join("config.toml")
    }

    /// Lists project names, sorted. A valid project is a directory holding
    /// a `config.toml`.
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.projects_dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().join("config.toml").is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    pub fn load(&self, name: &str) -> Result<ProjectConfig, ProjectError> {
        let path = self.config_path(name);
        if !path.is_file() {
            return Err(ProjectError::NotFound {
                name: name.to_string(),
                path,
            });
        }
        let raw = std::fs::read_to_string(&path)?;
        ProjectConfig::from_toml(name, &raw)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.config_path(name).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::{ProjectConfig, ProjectError, ProjectLoader};
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
description = "AI news triage"
topic = "AI and large language models"
subreddits = ["ClaudeAI", "LocalLLaMA"]
hn_keywords = ["claude", "llm"]
min_confidence = 0.8
"#;

    #[test]
    fn loads_project_from_toml() {
        let dir = tempdir().expect("tempdir");
        let project_dir = dir.path().join("claudeia");
        std::fs::create_dir_all(&project_dir).expect("mkdir");
        std::fs::write(project_dir.join("config.toml"), SAMPLE).expect("write config");

        let loader = ProjectLoader::new(dir.path());
        let project = loader.load("claudeia").expect("load project");
        assert_eq!(project.name, "claudeia");
        assert_eq!(project.subreddits.len(), 2);
        assert_eq!(project.hn_keywords, vec!["claude", "llm"]);
        assert!((project.min_confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_project_is_a_typed_error() {
        let dir = tempdir().expect("tempdir");
        let loader = ProjectLoader::new(dir.path());
        assert!(matches!(
            loader.load("nope"),
            Err(ProjectError::NotFound { .. })
        ));
    }

    #[test]
    fn list_discovers_only_configured_directories() {
        let dir = tempdir().expect("tempdir");
        for name in ["beta", "alpha"] {
            let project_dir = dir.path().join(name);
            std::fs::create_dir_all(&project_dir).expect("mkdir");
            std::fs::write(project_dir.join("config.toml"), SAMPLE).expect("write config");
        }
        std::fs::create_dir_all(dir.path().join("empty")).expect("mkdir");

        let loader = ProjectLoader::new(dir.path());
        assert_eq!(loader.list(), vec!["alpha", "beta"]);
        assert!(loader.exists("alpha"));
        assert!(!loader.exists("empty"));
    }

    #[test]
    fn min_confidence_defaults_when_absent() {
        let config =
            ProjectConfig::from_toml("p", "topic = \"wine\"").expect("parse minimal config");
        assert!((config.min_confidence - 0.7).abs() < f64::EPSILON);
        assert!(config.subreddits.is_empty());
    }
}
