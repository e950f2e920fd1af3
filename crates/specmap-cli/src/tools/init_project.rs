use super::{failure, success, SpecmapTool};
use specmap_core::init::init_project;
use specmap_core::types::ProjectType;
use std::path::{Path, PathBuf};

pub struct InitProjectTool;

impl SpecmapTool for InitProjectTool {
    fn name(&self) -> &str {
        "specmap_init_project"
    }

    fn description(&self) -> &str {
        "Create a new specmap project with its folder structure, constitution and templates"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "project_name": {
                    "type": "string",
                    "description": "Project name; the project is created in <path>/<project_name>"
                },
                "project_type": {
                    "type": "string",
                    "enum": ["web-app", "mobile-app", "api", "desktop-app", "data-pipeline", "ml-model", "library"],
                    "description": "Project type (default web-app)"
                },
                "ai_agent": {
                    "type": "string",
                    "description": "Base AI agent (default claude)"
                },
                "here": {
                    "type": "boolean",
                    "description": "Initialize directly in <path> instead of a new subdirectory"
                },
                "path": {
                    "type": "string",
                    "description": "Base directory (default: the server root)"
                }
            },
            "required": ["project_name"]
        })
    }

    fn call(&self, args: serde_json::Value, root: &Path) -> Result<serde_json::Value, String> {
        let name = args["project_name"]
            .as_str()
            .ok_or_else(|| failure("missing required argument: project_name", "invalid arguments"))?;
        let project_type: ProjectType = args["project_type"]
            .as_str()
            .unwrap_or("web-app")
            .parse()
            .map_err(|e| failure(e, "invalid project type"))?;
        let agent = args["ai_agent"].as_str().unwrap_or("claude");
        let here = args["here"].as_bool().unwrap_or(false);
        let base = args["path"].as_str().map(PathBuf::from).unwrap_or_else(|| root.to_path_buf());

        let out = init_project(&base, name, project_type, agent, here, chrono::Utc::now())
            .map_err(|e| failure(e, format!("failed to initialize project {name}")))?;

        let message = format!("Project {} initialized at {}", out.name, out.path.display());
        Ok(success(
            serde_json::json!({
                "project_path": out.path,
                "project_type": out.project_type,
                "ai_agent": out.agent,
                "folders_created": out.folders_created,
                "files_created": out.files,
            }),
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::envelope;
    use tempfile::TempDir;

    #[test]
    fn init_creates_project_directory() {
        let dir = TempDir::new().unwrap();
        let v = InitProjectTool
            .call(
                serde_json::json!({"project_name": "demo", "project_type": "api"}),
                dir.path(),
            )
            .unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["project_type"], "api");
        assert!(dir.path().join("demo/.specmap/config.yaml").exists());
    }

    #[test]
    fn init_twice_is_refused() {
        let dir = TempDir::new().unwrap();
        let args = serde_json::json!({"project_name": "demo", "here": true});
        InitProjectTool.call(args.clone(), dir.path()).unwrap();
        let err = InitProjectTool.call(args, dir.path()).unwrap_err();
        let v = envelope(err);
        assert_eq!(v["success"], false);
        assert!(v["error"].as_str().unwrap().contains("already"));
    }

    #[test]
    fn unknown_project_type_fails() {
        let dir = TempDir::new().unwrap();
        let err = InitProjectTool
            .call(
                serde_json::json!({"project_name": "demo", "project_type": "spaceship"}),
                dir.path(),
            )
            .unwrap_err();
        assert_eq!(envelope(err)["success"], false);
        assert!(!dir.path().join("demo").exists());
    }
}
