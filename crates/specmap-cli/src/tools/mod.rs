use serde_json::Value;
use specmap_core::{Project, SpecmapError};
use std::fmt::Display;
use std::path::Path;

pub mod clarify;
pub mod init_project;
pub mod plan;
pub mod specify;
pub mod status;
pub mod tasks;
pub mod validate;

pub trait SpecmapTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;
    fn call(&self, args: Value, root: &Path) -> Result<Value, String>;
}

pub fn all_tools() -> Vec<Box<dyn SpecmapTool>> {
    vec![
        Box::new(init_project::InitProjectTool),
        Box::new(specify::SpecifyTool),
        Box::new(clarify::ClarifyTool),
        Box::new(plan::PlanTool),
        Box::new(tasks::TasksTool),
        Box::new(status::StatusTool),
        Box::new(validate::ValidateTool),
    ]
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

/// `{success: true, ...fields, message}`. Non-object `fields` end up under
/// `data`.
pub(crate) fn success(fields: Value, message: impl Into<String>) -> Value {
    let mut obj = match fields {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    obj.insert("success".to_string(), Value::Bool(true));
    obj.insert("message".to_string(), Value::String(message.into()));
    Value::Object(obj)
}

/// `{success: false, error, message}`, serialized for the error text of a
/// tool call.
pub(crate) fn failure(error: impl Display, message: impl Into<String>) -> String {
    let v = serde_json::json!({
        "success": false,
        "error": error.to_string(),
        "message": message.into(),
    });
    serde_json::to_string_pretty(&v).unwrap_or_else(|_| error.to_string())
}

pub(crate) fn open(root: &Path) -> Result<Project, String> {
    Project::open(root).map_err(|e| failure(&e, "not a specmap project"))
}

/// Feature argument, or the single feature when omitted.
pub(crate) fn feature_arg(project: &Project, args: &Value) -> Result<String, String> {
    project
        .resolve_feature(args["feature_id"].as_str())
        .map_err(|e: SpecmapError| failure(&e, "could not resolve feature"))
}

pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

#[cfg(test)]
pub(crate) mod test_support {
    use specmap_core::init::init_project;
    use specmap_core::types::ProjectType;
    use std::path::Path;

    pub fn project_at(dir: &Path) {
        init_project(dir, "demo", ProjectType::Api, "claude", true, chrono::Utc::now()).unwrap();
    }

    /// Scores 10.0; shared with the integration tests.
    pub const PASSING_SPEC: &str = include_str!("../../tests/fixtures/passing_spec.md");

    /// Project with one feature, `001-add-oauth-login`, whose spec passes
    /// the gate.
    pub fn passing_feature(dir: &Path) -> specmap_core::Project {
        project_at(dir);
        let project = specmap_core::Project::open(dir).unwrap();
        specmap_core::feature::specify(&project, "Add OAuth login", None, chrono::Utc::now().date_naive())
            .unwrap();
        std::fs::write(
            specmap_core::paths::spec_file(dir, "001-add-oauth-login"),
            PASSING_SPEC,
        )
        .unwrap();
        project
    }

    pub fn envelope(err: String) -> serde_json::Value {
        serde_json::from_str(&err).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_merges_fields() {
        let v = success(serde_json::json!({"feature_id": "001-x"}), "done");
        assert_eq!(v["success"], true);
        assert_eq!(v["feature_id"], "001-x");
        assert_eq!(v["message"], "done");
    }

    #[test]
    fn success_wraps_non_objects() {
        let v = success(serde_json::json!([1, 2]), "list");
        assert_eq!(v["data"][1], 2);
    }

    #[test]
    fn failure_is_json_envelope() {
        let text = failure("boom", "it broke");
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "boom");
        assert_eq!(v["message"], "it broke");
    }
}
