use crate::cmd::open_project;
use crate::output::{fmt_score, print_json, print_table, yes_no};
use anyhow::Context;
use specmap_core::status::project_status;
use std::path::Path;

pub fn run(root: &Path, detailed: bool, json: bool) -> anyhow::Result<()> {
    let project = open_project(root)?;
    let s = project_status(&project).context("failed to read project status")?;

    if json {
        return print_json(&s);
    }

    println!("Project:       {} ({}, v{})", s.name, s.project_type, s.version);
    println!("Agent:         {}", s.base_agent);
    println!("Phase:         {}", s.current_phase);
    println!("Active agent:  {}", s.active_agent.as_deref().unwrap_or("none"));
    println!("Threshold:     {:.1}", s.threshold);
    println!(
        "Features:      {} total, {} specified, {} planned, {} with tasks",
        s.total_features,
        s.workflow_summary.specified,
        s.workflow_summary.planned,
        s.workflow_summary.tasks_generated
    );

    if s.features.is_empty() {
        println!();
        println!("No features yet. Next: specmap specify \"<feature description>\"");
        return Ok(());
    }

    println!();
    if detailed {
        let rows = s
            .features
            .iter()
            .map(|f| {
                vec![
                    f.id.clone(),
                    f.status.to_string(),
                    fmt_score(f.rulemap_score),
                    yes_no(f.has_spec).to_string(),
                    yes_no(f.has_plan).to_string(),
                    yes_no(f.has_tasks).to_string(),
                    f.total_tasks.map(|n| n.to_string()).unwrap_or_default(),
                    f.estimated_duration.map(|d| format!("{d}d")).unwrap_or_default(),
                ]
            })
            .collect();
        print_table(
            &["FEATURE", "STATUS", "SCORE", "SPEC", "PLAN", "TASKS", "COUNT", "DAYS"],
            rows,
        );
    } else {
        let rows = s
            .features
            .iter()
            .map(|f| vec![f.id.clone(), f.status.to_string(), fmt_score(f.rulemap_score)])
            .collect();
        print_table(&["FEATURE", "STATUS", "SCORE"], rows);
    }

    for f in s.features.iter().filter(|f| !f.tracked) {
        println!("warning: {} has no workflow state record", f.id);
    }
    Ok(())
}
