use crate::config::{ConfigWarning, WarnLevel};
use crate::error::{Result, SpecmapError};
use crate::io;
use crate::paths;
use crate::project::Project;
use crate::rulemap::{self, RulemapScore};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CONSTITUTION_HEADING: &str = "Constitution Compliance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    Rulemap,
    Constitution,
    Both,
}

impl ValidationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationKind::Rulemap => "rulemap",
            ValidationKind::Constitution => "constitution",
            ValidationKind::Both => "both",
        }
    }

    fn includes_rulemap(self) -> bool {
        matches!(self, ValidationKind::Rulemap | ValidationKind::Both)
    }

    fn includes_constitution(self) -> bool {
        matches!(self, ValidationKind::Constitution | ValidationKind::Both)
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValidationKind {
    type Err = SpecmapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rulemap" => Ok(ValidationKind::Rulemap),
            "constitution" => Ok(ValidationKind::Constitution),
            "both" => Ok(ValidationKind::Both),
            other => Err(SpecmapError::UnknownValidationKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub feature_id: String,
    pub kind: ValidationKind,
    /// Absent when RULEMAP scoring was not requested or is disabled.
    pub rulemap: Option<RulemapScore>,
    /// Absent when the constitution check was not requested or is disabled.
    pub constitution_compliant: Option<bool>,
    pub config_warnings: Vec<ConfigWarning>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn meets_threshold(&self) -> bool {
        self.rulemap.as_ref().is_some_and(|s| s.meets_threshold)
    }
}

/// Check a feature against the quality gates enabled in
/// `validation.rulemap_scoring` and `validation.constitution_check`.
///
/// A missing spec.md is reported as an issue, not an error.
pub fn validate_feature(
    project: &Project,
    feature_id: &str,
    kind: ValidationKind,
) -> Result<ValidationReport> {
    project.require_feature(feature_id)?;
    let config = project.config();
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    let spec = io::read_or_empty(&paths::spec_file(project.root(), feature_id))?;
    if spec.is_empty() {
        issues.push(format!("{} is missing or empty", paths::SPEC_MD));
        recommendations.push(format!("Run 'specmap specify' to recreate {feature_id}"));
    }

    let rulemap = if kind.includes_rulemap() && config.validation.rulemap_scoring {
        let score = rulemap::calculate_rulemap_score(project, feature_id);
        if !score.meets_threshold {
            issues.push(format!(
                "RULEMAP score {:.1} below threshold (need >= {:.1})",
                score.score,
                config.threshold()
            ));
            recommendations.push(format!(
                "Run 'specmap clarify {feature_id}' to find and resolve open questions"
            ));
        }
        if score.clarification_markers > 0 {
            recommendations.push(format!(
                "Resolve {} [NEEDS CLARIFICATION] marker(s)",
                score.clarification_markers
            ));
        }
        for (title, s) in &score.section_scores {
            if s.completion < rulemap::SECTION_COMPLETION_RATIO {
                recommendations.push(format!("Complete section '{title}' ({}/{})", s.score, s.total));
            }
        }
        Some(score)
    } else {
        None
    };

    let constitution_compliant =
        if kind.includes_constitution() && config.validation.constitution_check {
            let compliant = spec.contains(CONSTITUTION_HEADING);
            if !compliant {
                issues.push("Constitution compliance section missing".to_string());
                recommendations.push(format!(
                    "Add a '## {CONSTITUTION_HEADING}' section checking the feature against 00-governance/constitution.md"
                ));
            }
            Some(compliant)
        } else {
            None
        };

    let config_warnings = config.validate();
    for w in &config_warnings {
        if w.level == WarnLevel::Error {
            issues.push(format!("config: {}", w.message));
        }
    }

    tracing::debug!(
        feature = feature_id,
        kind = kind.as_str(),
        issues = issues.len(),
        "validation complete"
    );

    Ok(ValidationReport {
        feature_id: feature_id.to_string(),
        kind,
        rulemap,
        constitution_compliant,
        config_warnings,
        issues,
        recommendations,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rulemap::tests::FULL_SPEC;
    use crate::types::ProjectType;
    use tempfile::TempDir;

    fn setup(dir: &TempDir, spec: &str, edit: impl FnOnce(&mut Config)) -> Project {
        std::fs::create_dir_all(dir.path().join(paths::SPECMAP_DIR)).unwrap();
        let mut cfg = Config::new("demo", ProjectType::Api, "claude");
        edit(&mut cfg);
        cfg.save(dir.path()).unwrap();
        let fdir = paths::spec_dir(dir.path(), "001-auth");
        std::fs::create_dir_all(&fdir).unwrap();
        std::fs::write(fdir.join(paths::SPEC_MD), spec).unwrap();
        Project::open(dir.path()).unwrap()
    }

    #[test]
    fn complete_spec_passes() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, FULL_SPEC, |_| {});
        let r = validate_feature(&project, "001-auth", ValidationKind::Both).unwrap();
        assert!(r.passed(), "issues: {:?}", r.issues);
        assert!(r.meets_threshold());
        assert_eq!(r.constitution_compliant, Some(true));
    }

    #[test]
    fn draft_spec_reports_issues() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, "# draft\n[NEEDS CLARIFICATION: scope]\n", |_| {});
        let r = validate_feature(&project, "001-auth", ValidationKind::Both).unwrap();
        assert!(!r.passed());
        assert_eq!(r.issues.len(), 2);
        assert!(r.issues[0].starts_with("RULEMAP score 0.0 below threshold"));
        assert_eq!(r.constitution_compliant, Some(false));
        assert!(r.recommendations.iter().any(|s| s.contains("specmap clarify 001-auth")));
        assert!(r.recommendations.iter().any(|s| s.contains("1 [NEEDS CLARIFICATION]")));
    }

    #[test]
    fn kind_limits_checks() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, "# draft\n", |_| {});
        let r = validate_feature(&project, "001-auth", ValidationKind::Constitution).unwrap();
        assert!(r.rulemap.is_none());
        assert_eq!(r.issues, vec!["Constitution compliance section missing"]);
    }

    #[test]
    fn config_flags_disable_checks() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, "# draft\n", |c| {
            c.validation.rulemap_scoring = false;
            c.validation.constitution_check = false;
        });
        let r = validate_feature(&project, "001-auth", ValidationKind::Both).unwrap();
        assert!(r.rulemap.is_none());
        assert!(r.constitution_compliant.is_none());
        assert!(r.passed());
    }

    #[test]
    fn bad_threshold_is_an_issue() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, FULL_SPEC, |c| c.specmap.scoring_threshold = 12.0);
        let r = validate_feature(&project, "001-auth", ValidationKind::Rulemap).unwrap();
        assert!(r.issues.iter().any(|i| i.starts_with("config: ")));
    }

    #[test]
    fn kind_parses() {
        assert_eq!("both".parse::<ValidationKind>().unwrap(), ValidationKind::Both);
        assert!("all".parse::<ValidationKind>().is_err());
    }
}
