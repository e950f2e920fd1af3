use super::{failure, open, success, today, SpecmapTool};
use specmap_core::{feature, rulemap};
use std::path::Path;

pub struct SpecifyTool;

impl SpecmapTool for SpecifyTool {
    fn name(&self) -> &str {
        "specmap_specify"
    }

    fn description(&self) -> &str {
        "Create a feature specification (spec.md, clarifications.md, research.md) from a description"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "feature_description": {
                    "type": "string",
                    "description": "What the feature should do"
                },
                "feature_id": {
                    "type": "string",
                    "description": "Explicit NNN-slug id (default: next free number)"
                }
            },
            "required": ["feature_description"]
        })
    }

    fn call(&self, args: serde_json::Value, root: &Path) -> Result<serde_json::Value, String> {
        let description = args["feature_description"]
            .as_str()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| failure("missing required argument: feature_description", "invalid arguments"))?;
        let project = open(root)?;

        let out = feature::specify(&project, description, args["feature_id"].as_str(), today())
            .map_err(|e| failure(e, "failed to create specification"))?;
        let score = rulemap::calculate_rulemap_score(&project, &out.feature_id);

        let message = format!(
            "Specification {} created (RULEMAP {:.1}/10.0); next: specmap_clarify",
            out.feature_id, score.score
        );
        Ok(success(
            serde_json::json!({
                "feature_id": out.feature_id,
                "spec_file": out.spec_file,
                "clarifications_file": out.clarifications_file,
                "research_file": out.research_file,
                "tracking_ids": out.tracking_ids,
                "rulemap_score": score.score,
                "meets_threshold": score.meets_threshold,
            }),
            message,
        ))
    }
}
