use crate::output::print_json;
use anyhow::Context;
use specmap_core::init::init_project;
use specmap_core::types::ProjectType;
use std::path::Path;

pub fn run(
    base: &Path,
    name: Option<&str>,
    project_type: &str,
    agent: &str,
    here: bool,
    json: bool,
) -> anyhow::Result<()> {
    let name = match (name, here) {
        (Some(n), _) => n.to_string(),
        (None, true) => base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string()),
        (None, false) => anyhow::bail!("project name required (or pass --here to use the current directory)"),
    };
    let project_type: ProjectType = project_type.parse().with_context(|| {
        let known: Vec<&str> = ProjectType::all().iter().map(|t| t.as_str()).collect();
        format!("supported types: {}", known.join(", "))
    })?;

    let out = init_project(base, &name, project_type, agent, here, chrono::Utc::now())
        .context("failed to initialize project")?;

    if json {
        return print_json(&out);
    }

    println!("Initialized specmap project '{}' in {}", out.name, out.path.display());
    println!("  type:    {}", out.project_type);
    println!("  agent:   {}", out.agent);
    println!("  folders: {}", out.folders_created);
    for f in &out.files {
        println!("  created: {f}");
    }
    println!();
    if !here {
        println!("Next: cd {} && specmap specify \"<feature description>\"", out.name);
    } else {
        println!("Next: specmap specify \"<feature description>\"");
    }
    Ok(())
}
