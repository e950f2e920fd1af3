use super::{failure, feature_arg, open, success, SpecmapTool};
use specmap_core::validate::{validate_feature, ValidationKind};
use std::path::Path;

pub struct ValidateTool;

impl SpecmapTool for ValidateTool {
    fn name(&self) -> &str {
        "specmap_validate"
    }

    fn description(&self) -> &str {
        "Validate a feature against RULEMAP scoring, constitution compliance or both"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "feature_id": {
                    "type": "string",
                    "description": "Feature id (default: the only feature)"
                },
                "validation_type": {
                    "type": "string",
                    "enum": ["rulemap", "constitution", "both"],
                    "description": "What to check (default both)"
                }
            }
        })
    }

    fn call(&self, args: serde_json::Value, root: &Path) -> Result<serde_json::Value, String> {
        let kind: ValidationKind = args["validation_type"]
            .as_str()
            .unwrap_or("both")
            .parse()
            .map_err(|e| failure(e, "invalid validation type"))?;
        let project = open(root)?;
        let feature_id = feature_arg(&project, &args)?;

        let report = validate_feature(&project, &feature_id, kind)
            .map_err(|e| failure(e, format!("validation failed for {feature_id}")))?;

        // A failing validation is still a successful call; `passed` carries the verdict.
        let message = if report.passed() {
            format!("{feature_id} passed {kind} validation")
        } else {
            format!("{feature_id} has {} validation issue(s)", report.issues.len())
        };
        Ok(success(
            serde_json::json!({
                "feature_id": report.feature_id,
                "validation_type": report.kind,
                "passed": report.passed(),
                "meets_threshold": report.meets_threshold(),
                "rulemap_score": report.rulemap.as_ref().map(|s| s.score),
                "constitution_compliant": report.constitution_compliant,
                "issues": report.issues,
                "recommendations": report.recommendations,
            }),
            message,
        ))
    }
}
