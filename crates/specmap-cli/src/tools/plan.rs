use super::{failure, feature_arg, open, success, today, SpecmapTool};
use specmap_core::plan::generate_plan;
use std::path::Path;

pub struct PlanTool;

impl SpecmapTool for PlanTool {
    fn name(&self) -> &str {
        "specmap_plan"
    }

    fn description(&self) -> &str {
        "Generate plan.md, contracts.md and data-models.md for a feature whose specification passes the RULEMAP gate"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "feature_id": {
                    "type": "string",
                    "description": "Feature id (default: the only feature)"
                },
                "force": {
                    "type": "boolean",
                    "description": "Regenerate an existing plan"
                }
            }
        })
    }

    fn call(&self, args: serde_json::Value, root: &Path) -> Result<serde_json::Value, String> {
        let project = open(root)?;
        let feature_id = feature_arg(&project, &args)?;
        let force = args["force"].as_bool().unwrap_or(false);

        let out = generate_plan(&project, &feature_id, today(), force)
            .map_err(|e| failure(e, format!("planning refused for {feature_id}")))?;

        let message = format!(
            "Plan generated for {} with {} decision(s) and {} milestone(s); next: specmap_tasks",
            out.feature_id,
            out.decisions.len(),
            out.milestones.len()
        );
        Ok(success(
            serde_json::json!({
                "feature_id": out.feature_id,
                "rulemap_score": out.gate.score.score,
                "gate": out.gate.reason,
                "plan_file": out.plan_file,
                "contracts_file": out.contracts_file,
                "data_models_file": out.data_models_file,
                "technical_decisions": out.decisions,
                "milestones": out.milestones,
                "estimated_duration": out.estimated_duration,
            }),
            message,
        ))
    }
}
