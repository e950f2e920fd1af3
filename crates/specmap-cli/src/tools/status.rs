use super::{failure, open, success, SpecmapTool};
use specmap_core::status::project_status;
use std::path::Path;

pub struct StatusTool;

impl SpecmapTool for StatusTool {
    fn name(&self) -> &str {
        "specmap_status"
    }

    fn description(&self) -> &str {
        "Show the project's phase, active agent and per-feature workflow progress"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn call(&self, _args: serde_json::Value, root: &Path) -> Result<serde_json::Value, String> {
        let project = open(root)?;
        let status = project_status(&project).map_err(|e| failure(e, "failed to read project status"))?;
        let message = format!(
            "{}: {} feature(s), phase {}",
            status.name, status.total_features, status.current_phase
        );
        let fields = serde_json::to_value(&status).map_err(|e| failure(e, "failed to serialize status"))?;
        Ok(success(fields, message))
    }
}
