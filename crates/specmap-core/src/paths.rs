use crate::error::{Result, SpecmapError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SPECMAP_DIR: &str = ".specmap";
pub const TEMPLATES_DIR: &str = ".specmap/templates";
pub const CONFIG_FILE: &str = ".specmap/config.yaml";
pub const STATE_FILE: &str = ".specmap/workflow-state.json";

pub const GOVERNANCE_DIR: &str = "00-governance";
pub const SPEC_FEATURES_DIR: &str = "01-specifications/features";
pub const PLAN_FEATURES_DIR: &str = "02-planning/features";
pub const IMPL_FEATURES_DIR: &str = "03-implementation/features";
pub const AGENTS_DIR: &str = "04-agents";
pub const ACTIVE_SESSIONS_DIR: &str = "04-agents/sessions/active";
pub const ARCHIVED_SESSIONS_DIR: &str = "04-agents/sessions/archive";

pub const SPEC_MD: &str = "spec.md";
pub const CLARIFICATIONS_MD: &str = "clarifications.md";
pub const RESEARCH_MD: &str = "research.md";
pub const PLAN_MD: &str = "plan.md";
pub const CONTRACTS_MD: &str = "contracts.md";
pub const DATA_MODELS_MD: &str = "data-models.md";
pub const TASKS_MD: &str = "tasks.md";

/// Every directory created by `init`, relative to the project root.
pub const FOLDER_STRUCTURE: &[&str] = &[
    ".specmap",
    ".specmap/templates",
    "00-governance",
    "01-specifications",
    "01-specifications/features",
    "02-planning",
    "02-planning/features",
    "03-implementation",
    "03-implementation/features",
    "04-agents",
    "04-agents/session-summaries",
    "04-agents/sessions/active",
    "04-agents/sessions/archive",
    "04-agents/backups/daily",
    "04-agents/backups/sessions",
    "04-agents/backups/milestones",
    "04-agents/agent-configurations/claude",
    "04-agents/agent-configurations/gemini",
    "04-agents/agent-configurations/copilot",
    "04-agents/agent-configurations/cursor",
    "04-agents/agent-configurations/rulemap",
    "04-agents/agent-configurations/unified",
    "04-agents/agent-performance",
    "05-quality-assurance/constitution-validation",
    "05-quality-assurance/rulemap-scoring",
    "05-quality-assurance/validation-reports",
    "05-quality-assurance/user-feedback",
    "06-documentation/user-guides",
    "06-documentation/technical-docs",
    "06-documentation/api-specifications",
    "06-documentation/deployment-guides",
    "07-project-tracking",
    "08-deliverables/releases",
    "08-deliverables/presentations",
    "08-deliverables/final-reports",
    "08-deliverables/handover-documents",
];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn specmap_dir(root: &Path) -> PathBuf {
    root.join(SPECMAP_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn template_path(root: &Path, name: &str) -> PathBuf {
    root.join(TEMPLATES_DIR).join(format!("{name}.md"))
}

pub fn spec_features_dir(root: &Path) -> PathBuf {
    root.join(SPEC_FEATURES_DIR)
}

pub fn spec_dir(root: &Path, id: &str) -> PathBuf {
    root.join(SPEC_FEATURES_DIR).join(id)
}

pub fn plan_dir(root: &Path, id: &str) -> PathBuf {
    root.join(PLAN_FEATURES_DIR).join(id)
}

pub fn impl_dir(root: &Path, id: &str) -> PathBuf {
    root.join(IMPL_FEATURES_DIR).join(id)
}

pub fn spec_file(root: &Path, id: &str) -> PathBuf {
    spec_dir(root, id).join(SPEC_MD)
}

pub fn clarifications_file(root: &Path, id: &str) -> PathBuf {
    spec_dir(root, id).join(CLARIFICATIONS_MD)
}

pub fn plan_file(root: &Path, id: &str) -> PathBuf {
    plan_dir(root, id).join(PLAN_MD)
}

pub fn tasks_file(root: &Path, id: &str) -> PathBuf {
    plan_dir(root, id).join(TASKS_MD)
}

pub fn active_sessions_dir(root: &Path) -> PathBuf {
    root.join(ACTIVE_SESSIONS_DIR)
}

pub fn archived_sessions_dir(root: &Path) -> PathBuf {
    root.join(ARCHIVED_SESSIONS_DIR)
}

// ---------------------------------------------------------------------------
// Feature ids
// ---------------------------------------------------------------------------

static FEATURE_ID_RE: OnceLock<Regex> = OnceLock::new();

fn feature_id_re() -> &'static Regex {
    FEATURE_ID_RE.get_or_init(|| Regex::new(r"^\d{3}-[a-z0-9-]+$").unwrap())
}

pub fn validate_feature_id(id: &str) -> Result<()> {
    if !feature_id_re().is_match(id) {
        return Err(SpecmapError::InvalidFeatureId(id.to_string()));
    }
    Ok(())
}

/// The three-digit sequence prefix of a feature id (`"001-auth"` → `"001"`).
pub fn feature_num(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_feature_ids() {
        for id in ["001-add-oauth-login", "042-x", "999-a1-b2"] {
            validate_feature_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_feature_ids() {
        for id in ["", "1-short", "001_auth", "001-Upper", "abc-def", "0001-x"] {
            assert!(
                validate_feature_id(id).is_err(),
                "expected invalid: {id}"
            );
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            state_path(root),
            PathBuf::from("/tmp/proj/.specmap/workflow-state.json")
        );
        assert_eq!(
            spec_file(root, "001-auth"),
            PathBuf::from("/tmp/proj/01-specifications/features/001-auth/spec.md")
        );
        assert_eq!(
            tasks_file(root, "001-auth"),
            PathBuf::from("/tmp/proj/02-planning/features/001-auth/tasks.md")
        );
    }

    #[test]
    fn feature_num_prefix() {
        assert_eq!(feature_num("007-user-auth"), "007");
    }
}
