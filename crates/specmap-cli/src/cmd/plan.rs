use crate::cmd::{open_project, today};
use crate::output::{print_json, print_table};
use anyhow::Context;
use specmap_core::gate::GateReason;
use specmap_core::plan;
use std::path::Path;

pub fn run(root: &Path, feature: Option<&str>, force: bool, json: bool) -> anyhow::Result<()> {
    let project = open_project(root)?;
    let feature_id = project.resolve_feature(feature)?;
    let out = plan::generate_plan(&project, &feature_id, today(), force)
        .with_context(|| format!("failed to generate plan for {feature_id}"))?;

    if json {
        let value = serde_json::json!({
            "feature_id": out.feature_id,
            "rulemap_score": out.gate.score.score,
            "gate": out.gate.reason,
            "plan_file": out.plan_file,
            "contracts_file": out.contracts_file,
            "data_models_file": out.data_models_file,
            "decisions": out.decisions,
            "milestones": out.milestones,
            "complexity": out.analysis.complexity,
            "estimated_duration": out.estimated_duration,
            "used_fallback": out.used_fallback,
        });
        return print_json(&value);
    }

    println!("Plan generated: {}", out.feature_id);
    match out.gate.reason {
        GateReason::ThresholdMet => {
            println!("  RULEMAP score:  {:.1}/10.0", out.gate.score.score)
        }
        GateReason::Override => println!(
            "  RULEMAP score:  {:.1}/10.0 (below threshold, allowed by gate_overrides)",
            out.gate.score.score
        ),
    }
    println!("  plan:           {}", out.plan_file.display());
    println!("  contracts:      {}", out.contracts_file.display());
    println!("  data models:    {}", out.data_models_file.display());
    println!("  duration:       {} days", out.estimated_duration);
    println!();

    let rows = out
        .decisions
        .iter()
        .map(|d| vec![d.id.clone(), d.category.to_string(), d.title.clone()])
        .collect();
    print_table(&["DECISION", "CATEGORY", "TITLE"], rows);
    println!();

    let rows = out
        .milestones
        .iter()
        .map(|m| vec![m.id.clone(), m.date.to_string(), m.title.clone()])
        .collect();
    print_table(&["MILESTONE", "TARGET", "TITLE"], rows);

    println!();
    println!("Next: specmap tasks {}", out.feature_id);
    Ok(())
}
