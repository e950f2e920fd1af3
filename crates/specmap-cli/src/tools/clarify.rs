use super::{failure, feature_arg, open, success, SpecmapTool};
use specmap_core::clarify::{self, Answer};
use std::path::Path;

pub struct ClarifyTool;

impl SpecmapTool for ClarifyTool {
    fn name(&self) -> &str {
        "specmap_clarify"
    }

    fn description(&self) -> &str {
        "List a feature's open questions with its RULEMAP score, or record answers to them"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "feature_id": {
                    "type": "string",
                    "description": "Feature id (default: the only feature)"
                },
                "answers": {
                    "type": "array",
                    "description": "Answers to record",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "string",
                                "description": "Question id, or <source>#<id> (e.g. clarifications.md#auto-001) when an auto id appears in both files"
                            },
                            "answer": { "type": "string" }
                        },
                        "required": ["id", "answer"]
                    }
                }
            }
        })
    }

    fn call(&self, args: serde_json::Value, root: &Path) -> Result<serde_json::Value, String> {
        let project = open(root)?;
        let feature_id = feature_arg(&project, &args)?;

        let answers: Vec<Answer> = match args.get("answers") {
            Some(v) if !v.is_null() => serde_json::from_value(v.clone())
                .map_err(|e| failure(e, "answers must be a list of {id, answer}"))?,
            _ => Vec::new(),
        };

        if answers.is_empty() {
            let report = clarify::run_clarification(&project, &feature_id)
                .map_err(|e| failure(e, "clarification failed"))?;
            let message = format!(
                "{} open question(s); RULEMAP {:.1}/10.0; next phase: {}",
                report.questions.len(),
                report.score.score,
                report.next_phase.as_str()
            );
            return Ok(success(
                serde_json::json!({
                    "feature_id": report.feature_id,
                    "questions_found": report.questions.len(),
                    "questions": report.questions,
                    "rulemap_score": report.score.score,
                    "meets_threshold": report.score.meets_threshold,
                    "next_phase": report.next_phase.as_str(),
                }),
                message,
            ));
        }

        let out = clarify::apply_answers(&project, &feature_id, &answers, chrono::Utc::now())
            .map_err(|e| failure(e, "failed to record answers"))?;
        let score = specmap_core::rulemap::calculate_rulemap_score(&project, &feature_id);
        let message = format!(
            "Recorded {} answer(s), {} resolved; RULEMAP {:.1}/10.0",
            answers.len(),
            out.resolved,
            score.score
        );
        Ok(success(
            serde_json::json!({
                "feature_id": out.feature_id,
                "resolved": out.resolved,
                "unmatched": out.unmatched,
                "spec_updates": out.spec_updates,
                "clarifications_count": out.clarifications_count,
                "rulemap_score": score.score,
                "meets_threshold": score.meets_threshold,
            }),
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{envelope, project_at};
    use crate::tools::specify::SpecifyTool;
    use tempfile::TempDir;

    #[test]
    fn clarify_lists_questions_for_only_feature() {
        let dir = TempDir::new().unwrap();
        project_at(dir.path());
        SpecifyTool
            .call(serde_json::json!({"feature_description": "Add OAuth login"}), dir.path())
            .unwrap();

        let v = ClarifyTool.call(serde_json::json!({}), dir.path()).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["feature_id"], "001-add-oauth-login");
        assert!(v["questions_found"].as_u64().unwrap() > 0);
        assert_eq!(v["next_phase"], "specification_improvement");
    }

    #[test]
    fn clarify_records_answers() {
        let dir = TempDir::new().unwrap();
        project_at(dir.path());
        SpecifyTool
            .call(serde_json::json!({"feature_description": "Add OAuth login"}), dir.path())
            .unwrap();
        let listed = ClarifyTool.call(serde_json::json!({}), dir.path()).unwrap();
        let first = listed["questions"][0]["id"].as_str().unwrap().to_string();

        let v = ClarifyTool
            .call(
                serde_json::json!({
                    "feature_id": "001-add-oauth-login",
                    "answers": [{"id": first, "answer": "Dana owns it"}]
                }),
                dir.path(),
            )
            .unwrap();
        assert_eq!(v["resolved"], 1);
        assert_eq!(v["clarifications_count"], 1);
    }

    #[test]
    fn clarify_unknown_feature_fails() {
        let dir = TempDir::new().unwrap();
        project_at(dir.path());
        let err = ClarifyTool
            .call(serde_json::json!({"feature_id": "009-nope"}), dir.path())
            .unwrap_err();
        assert!(envelope(err)["error"].as_str().unwrap().contains("009-nope"));
    }
}
