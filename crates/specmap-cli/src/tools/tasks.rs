use super::{failure, feature_arg, open, success, today, SpecmapTool};
use specmap_core::tasks::generate_tasks;
use std::path::Path;

pub struct TasksTool;

impl SpecmapTool for TasksTool {
    fn name(&self) -> &str {
        "specmap_tasks"
    }

    fn description(&self) -> &str {
        "Break a feature's plan into TDD-ordered tasks with dependencies, estimates and parallel groups"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "feature_id": {
                    "type": "string",
                    "description": "Feature id (default: the only feature)"
                }
            }
        })
    }

    fn call(&self, args: serde_json::Value, root: &Path) -> Result<serde_json::Value, String> {
        let project = open(root)?;
        let feature_id = feature_arg(&project, &args)?;

        let out = generate_tasks(&project, &feature_id, today())
            .map_err(|e| failure(e, format!("task generation failed for {feature_id}")))?;
        let b = out.breakdown;

        let message = format!(
            "{} task(s) generated for {}, estimated {} day(s)",
            b.total_tasks, b.feature_id, b.estimated_duration
        );
        Ok(success(
            serde_json::json!({
                "feature_id": b.feature_id,
                "tasks_file": out.tasks_file,
                "total_tasks": b.total_tasks,
                "total_hours": b.total_hours,
                "estimated_duration": b.estimated_duration,
                "parallel_groups": b.parallel_groups,
                "tasks_by_phase": b.tasks_by_phase,
            }),
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::plan::PlanTool;
    use crate::tools::test_support::{envelope, passing_feature};
    use tempfile::TempDir;

    #[test]
    fn tasks_require_a_plan() {
        let dir = TempDir::new().unwrap();
        passing_feature(dir.path());
        let err = TasksTool.call(serde_json::json!({}), dir.path()).unwrap_err();
        assert!(envelope(err)["error"].as_str().unwrap().contains("plan not found"));
    }

    #[test]
    fn tasks_after_plan() {
        let dir = TempDir::new().unwrap();
        passing_feature(dir.path());
        PlanTool.call(serde_json::json!({}), dir.path()).unwrap();

        let v = TasksTool.call(serde_json::json!({}), dir.path()).unwrap();
        assert_eq!(v["success"], true);
        assert!(v["total_tasks"].as_u64().unwrap() > 0);
        assert!(v["estimated_duration"].as_u64().unwrap() >= 1);
        assert!(specmap_core::paths::tasks_file(dir.path(), "001-add-oauth-login").exists());
    }
}
