use crate::cmd::{open_project, today};
use crate::output::print_json;
use anyhow::Context;
use specmap_core::{feature, rulemap};
use std::path::Path;

pub fn run(root: &Path, description: &str, id: Option<&str>, json: bool) -> anyhow::Result<()> {
    if description.trim().is_empty() {
        anyhow::bail!("feature description must not be empty");
    }
    let project = open_project(root)?;
    let out = feature::specify(&project, description, id, today())
        .context("failed to create specification")?;
    let score = rulemap::calculate_rulemap_score(&project, &out.feature_id);

    if json {
        let value = serde_json::json!({
            "feature_id": out.feature_id,
            "spec_file": out.spec_file,
            "clarifications_file": out.clarifications_file,
            "research_file": out.research_file,
            "tracking_ids": out.tracking_ids,
            "used_fallback": out.used_fallback,
            "rulemap_score": score.score,
            "meets_threshold": score.meets_threshold,
            "clarification_markers": score.clarification_markers,
        });
        return print_json(&value);
    }

    println!("Created feature: {}", out.feature_id);
    println!("  spec:           {}", out.spec_file.display());
    println!("  clarifications: {}", out.clarifications_file.display());
    println!("  research:       {}", out.research_file.display());
    if out.used_fallback {
        println!("  (spec template missing, used the built-in layout)");
    }
    println!(
        "RULEMAP score: {:.1}/10.0 ({} clarification marker(s))",
        score.score, score.clarification_markers
    );
    println!();
    println!("Next: specmap clarify {}", out.feature_id);
    Ok(())
}
