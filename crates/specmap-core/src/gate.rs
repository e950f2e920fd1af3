use crate::error::{Result, SpecmapError};
use crate::project::Project;
use crate::rulemap::{self, RulemapScore};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GateDecision
// ---------------------------------------------------------------------------

/// Why a feature was let through the planning gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    ThresholdMet,
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub feature_id: String,
    pub reason: GateReason,
    pub score: RulemapScore,
}

/// Planning may only start once the specification meets the configured
/// RULEMAP threshold, or the feature is listed in `gate_overrides`.
///
/// Rejection is `ThresholdNotMet`; nothing is written either way.
pub fn check_planning_gate(project: &Project, feature_id: &str) -> Result<GateDecision> {
    project.require_feature(feature_id)?;
    let score = rulemap::try_score_feature(project, feature_id)?;

    if score.meets_threshold {
        return Ok(GateDecision {
            feature_id: feature_id.to_string(),
            reason: GateReason::ThresholdMet,
            score,
        });
    }

    if project.config().is_gate_override(feature_id) {
        tracing::warn!(
            feature = feature_id,
            score = score.score,
            "planning gate overridden by config"
        );
        return Ok(GateDecision {
            feature_id: feature_id.to_string(),
            reason: GateReason::Override,
            score,
        });
    }

    Err(SpecmapError::ThresholdNotMet {
        feature: feature_id.to_string(),
        score: score.score,
        threshold: project.config().threshold(),
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

    fn setup(dir: &TempDir, spec: &str, overrides: &[&str]) -> Project {
        let mut cfg = Config::new("demo", ProjectType::Api, "claude");
        cfg.specmap.gate_overrides = overrides.iter().map(|s| s.to_string()).collect();
        std::fs::create_dir_all(dir.path().join(".specmap")).unwrap();
        cfg.save(dir.path()).unwrap();
        let fdir = dir.path().join("01-specifications/features/001-auth");
        std::fs::create_dir_all(&fdir).unwrap();
        std::fs::write(fdir.join("spec.md"), spec).unwrap();
        Project::open(dir.path()).unwrap()
    }

    #[test]
    fn passes_complete_spec() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, FULL_SPEC, &[]);
        let d = check_planning_gate(&project, "001-auth").unwrap();
        assert_eq!(d.reason, GateReason::ThresholdMet);
    }

    #[test]
    fn rejects_incomplete_spec() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, "# draft\n[NEEDS CLARIFICATION: all of it]\n", &[]);
        let err = check_planning_gate(&project, "001-auth").unwrap_err();
        match err {
            SpecmapError::ThresholdNotMet { score, threshold, .. } => {
                assert_eq!(score, 0.0);
                assert_eq!(threshold, 8.0);
            }
            other => panic!("expected ThresholdNotMet, got {other:?}"),
        }
        assert!(err_message_mentions_clarify(&project));
    }

    fn err_message_mentions_clarify(project: &Project) -> bool {
        check_planning_gate(project, "001-auth")
            .unwrap_err()
            .to_string()
            .contains("specmap clarify 001-auth")
    }

    #[test]
    fn override_lets_feature_through() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, "# draft\n", &["001-auth"]);
        let d = check_planning_gate(&project, "001-auth").unwrap();
        assert_eq!(d.reason, GateReason::Override);
    }

    #[test]
    fn unknown_feature_is_not_found() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, FULL_SPEC, &[]);
        assert!(matches!(
            check_planning_gate(&project, "002-nope"),
            Err(SpecmapError::FeatureNotFound { .. })
        ));
    }
}
