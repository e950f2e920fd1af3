use crate::cmd::open_project;
use crate::output::{print_json, print_table};
use specmap_core::rulemap::{calculate_rulemap_score, RulemapScore};
use specmap_core::Project;
use std::path::Path;

pub fn run(root: &Path, feature: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project = open_project(root)?;
    match feature {
        Some(id) => {
            project.require_feature(id)?;
            one(&project, id, json)
        }
        None => all(&project, json),
    }
}

fn one(project: &Project, feature_id: &str, json: bool) -> anyhow::Result<()> {
    let score = calculate_rulemap_score(project, feature_id);
    if json {
        let value = serde_json::json!({ "feature_id": feature_id, "score": score });
        return print_json(&value);
    }

    if let Some(err) = &score.error {
        anyhow::bail!("cannot score {feature_id}: {err}");
    }

    println!("RULEMAP score for {feature_id}: {:.1}/10.0", score.score);
    println!(
        "  {}/{} sections complete, {} clarification marker(s), threshold {}",
        score.completed_sections,
        score.total_sections,
        score.clarification_markers,
        if score.meets_threshold { "met" } else { "not met" }
    );
    println!();

    let rows = score
        .section_scores
        .iter()
        .map(|(title, s)| {
            vec![
                title.clone(),
                format!("{}/{}", s.score, s.total),
                format!("{:.0}%", s.completion * 100.0),
            ]
        })
        .collect();
    print_table(&["SECTION", "KEYWORDS", "COMPLETION"], rows);
    Ok(())
}

fn all(project: &Project, json: bool) -> anyhow::Result<()> {
    let scores: Vec<(String, RulemapScore)> = project
        .feature_ids()?
        .into_iter()
        .map(|id| {
            let s = calculate_rulemap_score(project, &id);
            (id, s)
        })
        .collect();

    if json {
        let value: Vec<_> = scores
            .iter()
            .map(|(id, s)| serde_json::json!({ "feature_id": id, "score": s }))
            .collect();
        return print_json(&value);
    }

    if scores.is_empty() {
        println!("No features.");
        return Ok(());
    }

    let rows = scores
        .iter()
        .map(|(id, s)| {
            let score = match &s.error {
                Some(_) => "-".to_string(),
                None => format!("{:.1}", s.score),
            };
            vec![
                id.clone(),
                score,
                format!("{}/{}", s.completed_sections, s.total_sections),
                s.clarification_markers.to_string(),
                if s.meets_threshold { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["FEATURE", "SCORE", "SECTIONS", "MARKERS", "PASSES"], rows);
    Ok(())
}
