use crate::error::{Result, SpecmapError};
use crate::paths;
use crate::timestamp;
use crate::types::{validate_agent, ProjectType, SUPPORTED_AGENTS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RULEMAP score a specification must reach before planning may begin.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 8.0;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    #[serde(
        default,
        deserialize_with = "timestamp::lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    #[serde(default = "default_project_version")]
    pub version: String,
}

fn default_project_version() -> String {
    "1.0.0".to_string()
}

// ---------------------------------------------------------------------------
// WorkflowConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_threshold")]
    pub scoring_threshold: f64,
    #[serde(default = "default_true")]
    pub clarification_required: bool,
    /// Collapse open questions found on the same source line into one entry.
    #[serde(default)]
    pub dedupe_questions: bool,
    /// Feature ids allowed to enter planning regardless of their score.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gate_overrides: Vec<String>,
}

fn default_threshold() -> f64 {
    DEFAULT_SCORE_THRESHOLD
}

fn default_true() -> bool {
    true
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            scoring_threshold: default_threshold(),
            clarification_required: true,
            dedupe_questions: false,
            gate_overrides: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    pub base_agent: String,
    #[serde(default = "default_supported")]
    pub supported: Vec<String>,
}

fn default_supported() -> Vec<String> {
    SUPPORTED_AGENTS.iter().map(|s| s.to_string()).collect()
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            base_agent: "claude".to_string(),
            supported: default_supported(),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_true")]
    pub constitution_check: bool,
    #[serde(default = "default_true")]
    pub rulemap_scoring: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            constitution_check: true,
            rulemap_scoring: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project: ProjectConfig,
    #[serde(default)]
    pub specmap: WorkflowConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Section names older releases used for what is now `specmap`.
const LEGACY_SECTIONS: &[&str] = &["speckit", "rulemap"];

/// Merge `speckit` and `rulemap` into `specmap`. Later sections win key by
/// key: `rulemap` over `speckit`, and `specmap` over both.
fn migrate_legacy_sections(doc: &mut serde_yaml::Value) {
    let Some(map) = doc.as_mapping_mut() else {
        return;
    };
    let mut merged = serde_yaml::Mapping::new();
    let mut found = false;
    for key in LEGACY_SECTIONS {
        if let Some(section) = map.remove(*key) {
            found = true;
            if let serde_yaml::Value::Mapping(section) = section {
                merged.extend(section);
            }
        }
    }
    if !found {
        return;
    }
    if let Some(serde_yaml::Value::Mapping(current)) = map.remove("specmap") {
        merged.extend(current);
    }
    tracing::debug!("folded legacy config sections into specmap");
    map.insert("specmap".into(), serde_yaml::Value::Mapping(merged));
}

impl Config {
    pub fn new(name: impl Into<String>, project_type: ProjectType, agent: &str) -> Self {
        Self {
            project: ProjectConfig {
                name: name.into(),
                project_type,
                created: Some(Utc::now()),
                version: default_project_version(),
            },
            specmap: WorkflowConfig::default(),
            agents: AgentsConfig {
                base_agent: agent.to_string(),
                supported: default_supported(),
            },
            validation: ValidationConfig::default(),
        }
    }

    /// Load `.specmap/config.yaml`. A project without a config file gets
    /// defaults named after its directory.
    pub fn load(root: &Path) -> Result<Self> {
        if !paths::specmap_dir(root).is_dir() {
            return Err(SpecmapError::NotAProject(root.display().to_string()));
        }
        let path = paths::config_path(root);
        if !path.exists() {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string());
            tracing::debug!(root = %root.display(), "no config.yaml, using defaults");
            return Ok(Self::new(name, ProjectType::WebApp, "claude"));
        }
        let data = std::fs::read_to_string(&path)?;
        Self::from_yaml(&data)
    }

    /// Parse config YAML, folding legacy sections into `specmap` first.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let mut doc: serde_yaml::Value = serde_yaml::from_str(data)?;
        migrate_legacy_sections(&mut doc);
        Ok(serde_yaml::from_value(doc)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn threshold(&self) -> f64 {
        self.specmap.scoring_threshold
    }

    pub fn is_gate_override(&self, feature_id: &str) -> bool {
        self.specmap.gate_overrides.iter().any(|f| f == feature_id)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let t = self.specmap.scoring_threshold;
        if !(0.0..=10.0).contains(&t) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("specmap.scoring_threshold {t} is outside 0-10"),
            });
        }

        if validate_agent(&self.agents.base_agent).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("agents.base_agent '{}' is not a known agent", self.agents.base_agent),
            });
        }

        for id in &self.specmap.gate_overrides {
            if paths::validate_feature_id(id).is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("specmap.gate_overrides entry '{id}' is not a feature id"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_roundtrip() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".specmap")).unwrap();
        let cfg = Config::new("demo", ProjectType::Api, "claude");
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.project.name, "demo");
        assert_eq!(loaded.project.project_type, ProjectType::Api);
        assert_eq!(loaded.threshold(), DEFAULT_SCORE_THRESHOLD);
        assert_eq!(loaded.agents.base_agent, "claude");
    }

    #[test]
    fn load_outside_project_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(SpecmapError::NotAProject(_))
        ));
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".specmap")).unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.threshold(), 8.0);
        assert!(!cfg.specmap.dedupe_questions);
    }

    #[test]
    fn legacy_rulemap_section_is_accepted() {
        let yaml = r#"
project:
  name: legacy
  type: api-service
  created: 2025-01-01T00:00:00Z
rulemap:
  scoring_threshold: 7.5
agents:
  base_agent: gemini
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.threshold(), 7.5);
        assert_eq!(cfg.project.project_type, ProjectType::Api);
        assert!(cfg.validation.constitution_check);
    }

    #[test]
    fn legacy_and_current_sections_are_merged() {
        let yaml = r#"
project:
  name: both
  type: web-app
speckit:
  clarification_required: false
  scoring_threshold: 6.0
rulemap:
  scoring_threshold: 7.0
specmap:
  dedupe_questions: true
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.threshold(), 7.0);
        assert!(!cfg.specmap.clarification_required);
        assert!(cfg.specmap.dedupe_questions);
    }

    #[test]
    fn current_section_wins_over_legacy() {
        let yaml = "project:\n  name: x\n  type: library\nrulemap:\n  scoring_threshold: 7.0\nspecmap:\n  scoring_threshold: 9.0\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.threshold(), 9.0);
    }

    #[test]
    fn loads_date_only_and_empty_created() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".specmap")).unwrap();
        let yaml = r#"
project:
  name: older
  type: web-app
  created: '2025-03-01'
  version: 2.0.0
specmap:
  constitution_enabled: true
  scoring_threshold: 8.0
agents:
  base_agent: claude
  prd_generator:
    enabled: true
    persona: brilliant-recent-graduate
automation:
  session_logging: true
validation:
  constitution_check: true
  rulemap_scoring: true
  dual_validation: true
"#;
        std::fs::write(dir.path().join(".specmap/config.yaml"), yaml).unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        let created = cfg.project.created.unwrap();
        assert_eq!(created.date_naive(), chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(cfg.project.version, "2.0.0");

        let cfg = Config::from_yaml("project:\n  name: blank\n  type: web-app\n  created: ''\n").unwrap();
        assert!(cfg.project.created.is_none());
    }

    #[test]
    fn validate_flags_bad_threshold_and_overrides() {
        let mut cfg = Config::new("demo", ProjectType::Library, "claude");
        cfg.specmap.scoring_threshold = 12.0;
        cfg.specmap.gate_overrides = vec!["not-an-id".to_string()];
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].level, WarnLevel::Error);
    }
}
