use crate::error::Result;
use crate::paths;
use crate::project::Project;
use crate::rulemap;
use crate::types::{FeatureStatus, ProjectType, WorkflowPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub id: String,
    pub description: String,
    pub status: FeatureStatus,
    /// False when the folder exists on disk but the workflow state has no
    /// record of it.
    pub tracked: bool,
    pub has_spec: bool,
    pub has_plan: bool,
    pub has_tasks: bool,
    pub rulemap_score: Option<f64>,
    pub clarifications_count: u32,
    pub total_tasks: Option<usize>,
    pub estimated_duration: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub specified: usize,
    pub planned: usize,
    pub tasks_generated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub name: String,
    pub project_type: ProjectType,
    pub version: String,
    pub base_agent: String,
    pub current_phase: WorkflowPhase,
    pub active_agent: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub threshold: f64,
    pub total_features: usize,
    pub features: Vec<FeatureSummary>,
    pub workflow_summary: WorkflowSummary,
}

/// Status for an untracked folder, read off the documents present.
fn status_from_files(has_plan: bool, has_tasks: bool) -> FeatureStatus {
    if has_tasks {
        FeatureStatus::TasksGenerated
    } else if has_plan {
        FeatureStatus::Planned
    } else {
        FeatureStatus::Specified
    }
}

/// Project summary plus one entry per feature folder.
///
/// Folders are the source of truth for which features exist; the workflow
/// state supplies status and counters where it has a record.
pub fn project_status(project: &Project) -> Result<ProjectStatus> {
    let root = project.root();
    let config = project.config();
    let state = project.state()?;

    let mut features = Vec::new();
    let mut summary = WorkflowSummary::default();
    for id in project.feature_ids()? {
        let has_spec = paths::spec_file(root, &id).is_file();
        let has_plan = paths::plan_file(root, &id).is_file();
        let has_tasks = paths::tasks_file(root, &id).is_file();
        if has_spec {
            summary.specified += 1;
        }
        if has_plan {
            summary.planned += 1;
        }
        if has_tasks {
            summary.tasks_generated += 1;
        }

        let rulemap_score = has_spec.then(|| rulemap::calculate_rulemap_score(project, &id).score);
        let entry = match state.feature(&id) {
            Some(rec) => FeatureSummary {
                id: id.clone(),
                description: rec.description.clone(),
                status: rec.status,
                tracked: true,
                has_spec,
                has_plan,
                has_tasks,
                rulemap_score,
                clarifications_count: rec.clarifications_count,
                total_tasks: rec.total_tasks,
                estimated_duration: rec.estimated_duration,
            },
            None => {
                tracing::warn!(feature = %id, "feature folder has no workflow state record");
                FeatureSummary {
                    id: id.clone(),
                    description: String::new(),
                    status: status_from_files(has_plan, has_tasks),
                    tracked: false,
                    has_spec,
                    has_plan,
                    has_tasks,
                    rulemap_score,
                    clarifications_count: 0,
                    total_tasks: None,
                    estimated_duration: None,
                }
            }
        };
        features.push(entry);
    }

    Ok(ProjectStatus {
        name: config.project.name.clone(),
        project_type: config.project.project_type,
        version: config.project.version.clone(),
        base_agent: config.agents.base_agent.clone(),
        current_phase: state.current_phase,
        active_agent: state.active_agent.clone(),
        last_updated: state.last_updated,
        threshold: config.threshold(),
        total_features: features.len(),
        features,
        workflow_summary: summary,
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
    use crate::state::{FeatureRecord, TrackingIds, WorkflowState};
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> Project {
        std::fs::create_dir_all(dir.path().join(paths::SPECMAP_DIR)).unwrap();
        Config::new("demo", ProjectType::Api, "claude").save(dir.path()).unwrap();
        Project::open(dir.path()).unwrap()
    }

    #[test]
    fn empty_project() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir);
        let s = project_status(&project).unwrap();
        assert_eq!(s.name, "demo");
        assert_eq!(s.total_features, 0);
        assert_eq!(s.current_phase, WorkflowPhase::Initialization);
        assert_eq!(s.workflow_summary, WorkflowSummary::default());
    }

    #[test]
    fn tracked_and_untracked_features() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir);
        let root = dir.path();

        std::fs::create_dir_all(paths::spec_dir(root, "001-auth")).unwrap();
        std::fs::write(paths::spec_file(root, "001-auth"), FULL_SPEC).unwrap();
        std::fs::create_dir_all(paths::plan_dir(root, "001-auth")).unwrap();
        std::fs::write(paths::plan_file(root, "001-auth"), "# plan\n").unwrap();

        std::fs::create_dir_all(paths::spec_dir(root, "002-billing")).unwrap();

        let mut state = WorkflowState::new();
        let mut rec = FeatureRecord::new("Add auth", TrackingIds::seed("001"));
        rec.advance(FeatureStatus::Planned);
        state.add_feature("001-auth", rec);
        state.save(root).unwrap();

        let s = project_status(&project).unwrap();
        assert_eq!(s.total_features, 2);
        assert_eq!(
            s.workflow_summary,
            WorkflowSummary { specified: 1, planned: 1, tasks_generated: 0 }
        );

        let auth = &s.features[0];
        assert!(auth.tracked);
        assert_eq!(auth.status, FeatureStatus::Planned);
        assert_eq!(auth.rulemap_score, Some(10.0));
        assert_eq!(auth.description, "Add auth");

        let billing = &s.features[1];
        assert!(!billing.tracked);
        assert!(!billing.has_spec);
        assert_eq!(billing.rulemap_score, None);
        assert_eq!(billing.status, FeatureStatus::Specified);
    }
}
