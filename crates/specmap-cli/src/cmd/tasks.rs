use crate::cmd::{open_project, today};
use crate::output::{print_json, print_table};
use anyhow::Context;
use specmap_core::tasks;
use std::path::Path;

pub fn run(root: &Path, feature: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project = open_project(root)?;
    let feature_id = project.resolve_feature(feature)?;
    let out = tasks::generate_tasks(&project, &feature_id, today())
        .with_context(|| format!("failed to generate tasks for {feature_id}"))?;
    let b = &out.breakdown;

    if json {
        let value = serde_json::json!({
            "feature_id": b.feature_id,
            "tasks_file": out.tasks_file,
            "total_tasks": b.total_tasks,
            "total_hours": b.total_hours,
            "estimated_duration": b.estimated_duration,
            "parallel_groups": b.parallel_groups,
            "tasks_by_phase": b.tasks_by_phase,
            "used_fallback": out.used_fallback,
        });
        return print_json(&value);
    }

    println!("Tasks generated: {}", b.feature_id);
    println!("  file:      {}", out.tasks_file.display());
    println!("  tasks:     {} ({} hours)", b.total_tasks, b.total_hours);
    println!("  duration:  {} days", b.estimated_duration);
    println!("  parallel:  {} group(s)", b.parallel_groups.len());
    println!();

    let rows = b
        .all_tasks
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.phase.heading().to_string(),
                if t.parallel { "P".to_string() } else { String::new() },
                t.estimated.clone(),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["TASK", "PHASE", "", "ESTIMATE", "TITLE"], rows);
    Ok(())
}
